//! In-memory implementations of the storage capabilities for testing.
//!
//! [`MemoryStore`] is a blob sink, token provider and gateway transport at
//! once: uploaded batches are kept in memory and served back to any gateway
//! URL ending in `{cid}/{file_name}`. Every call is recorded so tests can
//! assert on what was sent and in which order.
//!
//! # Feature Flag
//!
//! This module is only available when the `test-utils` feature is enabled:
//!
//! ```toml
//! [dev-dependencies]
//! cairn-core = { version = "...", features = ["test-utils"] }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use url::Url;

use crate::attachment::Attachment;
use crate::error::{Error, Result};
use crate::naming::derive_file_names;
use crate::provider::{
    BlobSink, ContractReader, GatewayTransport, SignerProvider, UploadTokenProvider,
};
use crate::types::{BatchResult, ContentId, UploadContext};

/// One batch accepted by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedUpload {
    /// CID minted for the batch.
    pub cid: ContentId,
    /// Derived file names in submission order.
    pub file_names: Vec<String>,
    /// Uploaded bodies in submission order.
    pub files: Vec<Bytes>,
    /// Offset the batch was submitted with.
    pub start_offset: u64,
    /// Caller identity the batch was submitted with.
    pub context: UploadContext,
}

#[derive(Debug, Default)]
struct State {
    next_cid: u64,
    content: HashMap<String, Bytes>,
    uploads: Vec<RecordedUpload>,
    requests: Vec<String>,
    token_requests: Vec<String>,
}

#[derive(Debug, Clone, Default)]
struct Behavior {
    fail_uploads: bool,
    fail_tokens: bool,
    failing_gateways: Vec<String>,
    slow_gateways: Vec<(String, Duration)>,
}

/// In-memory content-addressed store.
///
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    behavior: Arc<Behavior>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds content served for URLs ending in `/{path}`.
    pub fn with_content(self, path: impl Into<String>, body: impl Into<Bytes>) -> Self {
        self.state().content.insert(path.into(), body.into());
        self
    }

    /// Makes every upload fail with an upload error.
    pub fn with_failing_uploads(self) -> Self {
        self.configure(|behavior| behavior.fail_uploads = true)
    }

    /// Makes every token request fail with a fetch error.
    pub fn with_failing_tokens(self) -> Self {
        self.configure(|behavior| behavior.fail_tokens = true)
    }

    /// Makes reads from URLs starting with `gateway` fail with a 503.
    pub fn with_failing_gateway(self, gateway: impl Into<String>) -> Self {
        let gateway = gateway.into();
        self.configure(|behavior| behavior.failing_gateways.push(gateway))
    }

    /// Delays reads from URLs starting with `gateway` by `delay`.
    pub fn with_slow_gateway(self, gateway: impl Into<String>, delay: Duration) -> Self {
        let gateway = gateway.into();
        self.configure(|behavior| behavior.slow_gateways.push((gateway, delay)))
    }

    /// Returns the accepted uploads in order.
    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.state().uploads.clone()
    }

    /// Returns every gateway URL requested, in order.
    pub fn requests(&self) -> Vec<String> {
        self.state().requests.clone()
    }

    /// Returns the contract address of every token request, in order.
    pub fn token_requests(&self) -> Vec<String> {
        self.state().token_requests.clone()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn configure(mut self, apply: impl FnOnce(&mut Behavior)) -> Self {
        let mut behavior = (*self.behavior).clone();
        apply(&mut behavior);
        self.behavior = Arc::new(behavior);
        self
    }
}

#[async_trait::async_trait]
impl BlobSink for MemoryStore {
    async fn upload_batch(
        &self,
        files: &[Attachment],
        start_offset: u64,
        ctx: &UploadContext,
    ) -> Result<BatchResult> {
        let file_names = derive_file_names(files, start_offset)?;
        if files.is_empty() {
            return Err(Error::invalid_input().with_message("cannot upload an empty batch"));
        }
        if self.behavior.fail_uploads {
            return Err(Error::upload()
                .with_message("upload rejected by memory store")
                .with_status(500));
        }

        let mut state = self.state();
        state.next_cid += 1;
        let cid = ContentId::new(format!("mem{}", state.next_cid));

        let bodies: Vec<Bytes> = files.iter().map(Attachment::body).collect();
        for (name, body) in file_names.iter().zip(&bodies) {
            state.content.insert(format!("{cid}/{name}"), body.clone());
        }
        state.uploads.push(RecordedUpload {
            cid: cid.clone(),
            file_names: file_names.clone(),
            files: bodies,
            start_offset,
            context: ctx.clone(),
        });

        Ok(BatchResult::new(cid, file_names))
    }
}

#[async_trait::async_trait]
impl UploadTokenProvider for MemoryStore {
    async fn upload_token(&self, contract_address: &str) -> Result<String> {
        self.state().token_requests.push(contract_address.to_owned());
        if self.behavior.fail_tokens {
            return Err(Error::fetch()
                .with_message("token grant rejected by memory store")
                .with_status(401));
        }
        Ok(format!("memory-token-{contract_address}"))
    }
}

#[async_trait::async_trait]
impl GatewayTransport for MemoryStore {
    async fn get(&self, url: &Url) -> Result<Bytes> {
        let url = url.as_str();
        self.state().requests.push(url.to_owned());

        let delay = self
            .behavior
            .slow_gateways
            .iter()
            .find(|(gateway, _)| url.starts_with(gateway.as_str()))
            .map(|(_, delay)| *delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self
            .behavior
            .failing_gateways
            .iter()
            .any(|gateway| url.starts_with(gateway.as_str()))
        {
            return Err(Error::fetch()
                .with_message("gateway unavailable")
                .with_status(503)
                .with_context(url.to_owned()));
        }

        let state = self.state();
        state
            .content
            .iter()
            .find(|(path, _)| url.ends_with(&format!("/{path}")))
            .map(|(_, body)| body.clone())
            .ok_or_else(|| {
                Error::fetch()
                    .with_message("content not found")
                    .with_status(404)
                    .with_context(url.to_owned())
            })
    }
}

/// Contract reader returning URIs registered up front.
#[derive(Debug, Clone, Default)]
pub struct MockContractReader {
    contract_uri: String,
    token_uris: HashMap<u64, String>,
}

impl MockContractReader {
    /// Creates a reader with no URIs stored.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the contract-level URI.
    pub fn with_contract_uri(mut self, uri: impl Into<String>) -> Self {
        self.contract_uri = uri.into();
        self
    }

    /// Stores the URI of one token.
    pub fn with_token_uri(mut self, token_id: u64, uri: impl Into<String>) -> Self {
        self.token_uris.insert(token_id, uri.into());
        self
    }
}

#[async_trait::async_trait]
impl ContractReader for MockContractReader {
    async fn read_uri(&self, _contract_address: &str, token_id: Option<u64>) -> Result<String> {
        Ok(match token_id {
            Some(id) => self.token_uris.get(&id).cloned().unwrap_or_default(),
            None => self.contract_uri.clone(),
        })
    }
}

/// Signer with a fixed address, or none for read-only connections.
#[derive(Debug, Clone, Default)]
pub struct StaticSigner(Option<String>);

impl StaticSigner {
    /// Creates a connected signer.
    pub fn new(address: impl Into<String>) -> Self {
        Self(Some(address.into()))
    }

    /// Creates a read-only connection without a signer.
    pub fn read_only() -> Self {
        Self(None)
    }
}

#[async_trait::async_trait]
impl SignerProvider for StaticSigner {
    async fn signer_address(&self) -> Option<String> {
        self.0.clone()
    }
}
