//! Shared reqwest HTTP client.

use std::sync::Arc;

use cairn_core::{Error, Result};
use reqwest::{Client, Response};

use crate::{ReqwestConfig, TRACING_TARGET_CLIENT};

/// Maximum number of characters of a response body kept in an error.
pub(crate) const MAX_ERROR_BODY_CHARS: usize = 1024;

/// Inner client that holds the HTTP client and configuration.
struct ReqwestClientInner {
    http: Client,
    config: ReqwestConfig,
}

/// Reqwest-based HTTP client shared by the upload sinks, the token provider
/// and gateway reads.
///
/// Cloning is cheap: clones share one connection pool.
///
/// # Examples
///
/// ```rust,ignore
/// use cairn_core::{GatewayConfig, GatewayResolver};
/// use cairn_reqwest::{ReqwestClient, ReqwestConfig};
///
/// let client = ReqwestClient::new(ReqwestConfig::default())?;
/// let resolver = GatewayResolver::new(GatewayConfig::default(), client)?;
/// let metadata = resolver.fetch_metadata("storage://bafy.../0").await?;
/// ```
#[derive(Clone)]
pub struct ReqwestClient {
    inner: Arc<ReqwestClientInner>,
}

impl std::fmt::Debug for ReqwestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestClient")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl ReqwestClient {
    /// Creates a new reqwest client with the given configuration.
    pub fn new(config: ReqwestConfig) -> Result<Self> {
        let timeout = config.effective_timeout();
        let user_agent = config.effective_user_agent();

        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            timeout_ms = timeout.as_millis(),
            user_agent = %user_agent,
            "Creating reqwest client"
        );

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(&user_agent)
            .build()
            .map_err(|e| {
                Error::configuration()
                    .with_message("failed to create HTTP client")
                    .with_source(e)
            })?;

        let inner = ReqwestClientInner { http, config };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Gets the underlying HTTP client.
    pub(crate) fn http(&self) -> &Client {
        &self.inner.http
    }

    /// Gets the client configuration.
    pub fn config(&self) -> &ReqwestConfig {
        &self.inner.config
    }
}

/// Reads the body of a failed response, truncated for error reporting.
pub(crate) async fn error_body(response: Response) -> Option<String> {
    response
        .text()
        .await
        .ok()
        .filter(|body| !body.is_empty())
        .map(|body| body.chars().take(MAX_ERROR_BODY_CHARS).collect())
}
