//! Capabilities the publishing core consumes.
//!
//! Concrete HTTP implementations live in `cairn-reqwest`; in-memory ones live
//! in [`crate::mock`].

use std::sync::Arc;

use bytes::Bytes;
use url::Url;

use crate::attachment::Attachment;
use crate::error::Result;
use crate::types::{BatchResult, UploadContext};

/// Destination for a batch of attachments.
///
/// One call is one logical transaction: it either returns a single CID
/// covering every attachment, or fails without a usable result. There is no
/// retry inside a sink.
#[async_trait::async_trait]
pub trait BlobSink: Send + Sync {
    /// Uploads `files` as one pseudo-directory.
    ///
    /// File names follow [`derive_file_names`](crate::naming::derive_file_names)
    /// and are returned in submission order.
    async fn upload_batch(
        &self,
        files: &[Attachment],
        start_offset: u64,
        ctx: &UploadContext,
    ) -> Result<BatchResult>;
}

#[async_trait::async_trait]
impl<T: BlobSink + ?Sized> BlobSink for Arc<T> {
    async fn upload_batch(
        &self,
        files: &[Attachment],
        start_offset: u64,
        ctx: &UploadContext,
    ) -> Result<BatchResult> {
        (**self).upload_batch(files, start_offset, ctx).await
    }
}

/// Source of short-lived upload credentials.
#[async_trait::async_trait]
pub trait UploadTokenProvider: Send + Sync {
    /// Fetches a bearer token scoped to `contract_address`.
    async fn upload_token(&self, contract_address: &str) -> Result<String>;
}

#[async_trait::async_trait]
impl<T: UploadTokenProvider + ?Sized> UploadTokenProvider for Arc<T> {
    async fn upload_token(&self, contract_address: &str) -> Result<String> {
        (**self).upload_token(contract_address).await
    }
}

/// Plain HTTP GET used by the gateway resolver.
///
/// Implementations return the body of a 2xx response and a
/// [`ErrorKind::Fetch`](crate::ErrorKind::Fetch) error for anything else.
#[async_trait::async_trait]
pub trait GatewayTransport: Send + Sync {
    /// Fetches `url` and returns the response body.
    async fn get(&self, url: &Url) -> Result<Bytes>;
}

#[async_trait::async_trait]
impl<T: GatewayTransport + ?Sized> GatewayTransport for Arc<T> {
    async fn get(&self, url: &Url) -> Result<Bytes> {
        (**self).get(url).await
    }
}

/// Read access to token URIs stored on chain.
#[async_trait::async_trait]
pub trait ContractReader: Send + Sync {
    /// Returns the URI stored for `token_id`, or the contract-level URI when
    /// `token_id` is `None`. An empty string means nothing is stored.
    async fn read_uri(&self, contract_address: &str, token_id: Option<u64>) -> Result<String>;
}

/// Access to the currently connected signer, if any.
#[async_trait::async_trait]
pub trait SignerProvider: Send + Sync {
    /// Returns the signer address, or `None` for read-only connections.
    async fn signer_address(&self) -> Option<String>;
}
