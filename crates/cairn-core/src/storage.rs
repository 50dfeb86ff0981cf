//! Upload and read facade over a blob sink and a gateway transport.

use serde_json::Value;

use crate::attachment::Attachment;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::gateway::{GatewayConfig, GatewayResolver};
use crate::provider::{BlobSink, GatewayTransport};
use crate::publish::MetadataPublisher;
use crate::types::{BatchItem, PublishResult, UploadContext};

/// Content-addressed storage: writes through a [`BlobSink`], reads through
/// a [`GatewayResolver`].
///
/// # Examples
///
/// ```rust,ignore
/// use cairn_core::{Attachment, GatewayConfig, Storage, UploadContext};
///
/// let storage = Storage::new(sink, GatewayConfig::default(), transport)?;
/// let uri = storage.upload(Attachment::from_file(bytes, "cover.png"), &UploadContext::new()).await?;
/// let url = storage.resolve_url(&uri);
/// ```
#[derive(Debug, Clone)]
pub struct Storage<S, T> {
    publisher: MetadataPublisher<S>,
    resolver: GatewayResolver<T>,
}

impl<S, T> Storage<S, T>
where
    S: BlobSink,
    T: GatewayTransport,
{
    /// Creates a storage facade.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `gateway` does not validate.
    pub fn new(sink: S, gateway: GatewayConfig, transport: T) -> Result<Self> {
        Ok(Self {
            publisher: MetadataPublisher::new(sink),
            resolver: GatewayResolver::new(gateway, transport)?,
        })
    }

    /// Returns the metadata publisher.
    pub fn publisher(&self) -> &MetadataPublisher<S> {
        &self.publisher
    }

    /// Returns the gateway resolver.
    pub fn resolver(&self) -> &GatewayResolver<T> {
        &self.resolver
    }

    /// Uploads one attachment and returns `storage://{cid}/{file_name}`.
    pub async fn upload(&self, attachment: Attachment, ctx: &UploadContext) -> Result<String> {
        let result = self
            .publisher
            .sink()
            .upload_batch(std::slice::from_ref(&attachment), 0, ctx)
            .await?;

        result.file_uris().into_iter().next().ok_or_else(|| {
            Error::internal().with_message("upload of one attachment returned no file name")
        })
    }

    /// Uploads `files` as one directory and returns `storage://{cid}/`.
    pub async fn upload_batch(
        &self,
        files: &[Attachment],
        start_offset: u64,
        ctx: &UploadContext,
    ) -> Result<String> {
        if files.is_empty() {
            return Err(Error::invalid_input().with_message("cannot upload an empty batch"));
        }

        let result = self
            .publisher
            .sink()
            .upload_batch(files, start_offset, ctx)
            .await?;
        Ok(result.base_uri())
    }

    /// Publishes one document and returns its URI.
    pub async fn upload_metadata(&self, document: Document, ctx: &UploadContext) -> Result<String> {
        self.publisher.publish_one(document, ctx).await
    }

    /// Publishes a metadata batch.
    pub async fn upload_metadata_batch(
        &self,
        items: Vec<BatchItem>,
        start_offset: u64,
        ctx: &UploadContext,
    ) -> Result<PublishResult> {
        self.publisher.publish(items, start_offset, ctx).await
    }

    /// Reads a JSON document, with nested storage references rewritten to the
    /// primary gateway.
    pub async fn get(&self, uri: &str) -> Result<Value> {
        self.resolver.fetch_metadata(uri).await
    }

    /// Reads content as text.
    pub async fn get_raw(&self, uri: &str) -> Result<String> {
        self.resolver.fetch_text(uri).await
    }

    /// Rewrites `uri` against the primary gateway.
    pub fn resolve_url(&self, uri: &str) -> String {
        self.resolver.resolve_url(uri)
    }
}
