//! Blob sink selection.

use cairn_core::{
    Attachment, BatchResult, BlobSink, GatewayConfig, Result, Storage, UploadContext,
    UploadTokenProvider,
};

use crate::{
    GrantTokenProvider, MultipartSink, PinningConfig, PresignConfig, PresignedSink, ReqwestClient,
    TRACING_TARGET_UPLOAD,
};

/// The upload strategy, chosen once when the backend is built.
#[derive(Debug, Clone)]
pub enum StorageBackend<P = GrantTokenProvider> {
    /// One multipart POST per batch.
    Multipart(MultipartSink<P>),
    /// One presign request per batch, then one PUT per file.
    Presigned(PresignedSink<P>),
}

impl StorageBackend<GrantTokenProvider> {
    /// Builds a multipart backend with tokens from the grant endpoint.
    pub fn pinning(client: ReqwestClient, config: &PinningConfig) -> Result<Self> {
        let tokens = GrantTokenProvider::new(client.clone(), config)?;
        let sink = MultipartSink::new(client, config, tokens)?;

        tracing::debug!(
            target: TRACING_TARGET_UPLOAD,
            endpoint = %config.upload_endpoint,
            "Using multipart storage backend"
        );
        Ok(Self::Multipart(sink))
    }

    /// Builds a presigned-URL backend with tokens from the grant endpoint.
    pub fn presigned(
        client: ReqwestClient,
        tokens: &PinningConfig,
        config: &PresignConfig,
    ) -> Result<Self> {
        let tokens = GrantTokenProvider::new(client.clone(), tokens)?;
        let sink = PresignedSink::new(client, config, tokens)?;

        tracing::debug!(
            target: TRACING_TARGET_UPLOAD,
            endpoint = %config.presign_endpoint,
            "Using presigned storage backend"
        );
        Ok(Self::Presigned(sink))
    }
}

impl<P: UploadTokenProvider> StorageBackend<P> {
    /// Combines this backend with gateway reads through `client`.
    pub fn into_storage(
        self,
        client: ReqwestClient,
        gateway: GatewayConfig,
    ) -> Result<Storage<Self, ReqwestClient>> {
        Storage::new(self, gateway, client)
    }
}

#[async_trait::async_trait]
impl<P: UploadTokenProvider> BlobSink for StorageBackend<P> {
    async fn upload_batch(
        &self,
        files: &[Attachment],
        start_offset: u64,
        ctx: &UploadContext,
    ) -> Result<BatchResult> {
        match self {
            Self::Multipart(sink) => sink.upload_batch(files, start_offset, ctx).await,
            Self::Presigned(sink) => sink.upload_batch(files, start_offset, ctx).await,
        }
    }
}

impl<P> From<MultipartSink<P>> for StorageBackend<P> {
    fn from(sink: MultipartSink<P>) -> Self {
        Self::Multipart(sink)
    }
}

impl<P> From<PresignedSink<P>> for StorageBackend<P> {
    fn from(sink: PresignedSink<P>) -> Self {
        Self::Presigned(sink)
    }
}
