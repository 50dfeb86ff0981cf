//! HTTP client and endpoint configuration.

use std::time::Duration;

use cairn_core::{Error, Result};
#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use url::Url;

/// Default timeout for HTTP requests: 30 seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default multipart pinning endpoint.
pub const DEFAULT_UPLOAD_ENDPOINT: &str = "https://api.pinata.cloud/pinning/pinFileToIPFS";

/// Default upload token grant endpoint.
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://upload.nftlabs.co/grant";

/// Default client identifier sent with token requests.
pub const DEFAULT_CLIENT_ID: &str = "CONSOLE-TS-SDK";

/// Configuration for the reqwest HTTP client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct ReqwestConfig {
    /// HTTP request timeout in seconds
    #[cfg_attr(
        feature = "config",
        arg(long = "http-timeout", env = "HTTP_TIMEOUT", default_value = "30")
    )]
    #[serde(default = "default_timeout_secs")]
    pub http_timeout: u64,

    /// User-Agent header to send with requests
    #[cfg_attr(
        feature = "config",
        arg(long = "http-user-agent", env = "HTTP_USER_AGENT")
    )]
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for ReqwestConfig {
    fn default() -> Self {
        Self {
            http_timeout: default_timeout_secs(),
            user_agent: None,
        }
    }
}

impl ReqwestConfig {
    /// Create a new configuration with the specified timeout.
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            http_timeout: timeout_secs,
            user_agent: None,
        }
    }

    /// Returns the effective timeout, using default if zero.
    pub fn effective_timeout(&self) -> Duration {
        if self.http_timeout == 0 {
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        } else {
            Duration::from_secs(self.http_timeout)
        }
    }

    /// Returns the effective user agent, using default if not set.
    pub fn effective_user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("cairn/{}", env!("CARGO_PKG_VERSION")))
    }

    /// Set the timeout in seconds.
    #[must_use]
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.http_timeout = timeout_secs;
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// Endpoints of the multipart pinning backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct PinningConfig {
    /// Multipart upload endpoint
    #[cfg_attr(
        feature = "config",
        arg(long = "upload-endpoint", env = "UPLOAD_ENDPOINT", default_value = DEFAULT_UPLOAD_ENDPOINT)
    )]
    #[serde(default = "default_upload_endpoint")]
    pub upload_endpoint: String,

    /// Upload token grant endpoint
    #[cfg_attr(
        feature = "config",
        arg(long = "token-endpoint", env = "TOKEN_ENDPOINT", default_value = DEFAULT_TOKEN_ENDPOINT)
    )]
    #[serde(default = "default_token_endpoint")]
    pub token_endpoint: String,

    /// Client identifier prefixed to the contract address in token requests
    #[cfg_attr(
        feature = "config",
        arg(long = "client-id", env = "CLIENT_ID", default_value = DEFAULT_CLIENT_ID)
    )]
    #[serde(default = "default_client_id")]
    pub client_id: String,
}

fn default_upload_endpoint() -> String {
    DEFAULT_UPLOAD_ENDPOINT.to_owned()
}

fn default_token_endpoint() -> String {
    DEFAULT_TOKEN_ENDPOINT.to_owned()
}

fn default_client_id() -> String {
    DEFAULT_CLIENT_ID.to_owned()
}

impl Default for PinningConfig {
    fn default() -> Self {
        Self {
            upload_endpoint: default_upload_endpoint(),
            token_endpoint: default_token_endpoint(),
            client_id: default_client_id(),
        }
    }
}

impl PinningConfig {
    /// Creates a configuration from explicit endpoints.
    pub fn new(upload_endpoint: impl Into<String>, token_endpoint: impl Into<String>) -> Self {
        Self {
            upload_endpoint: upload_endpoint.into(),
            token_endpoint: token_endpoint.into(),
            client_id: default_client_id(),
        }
    }

    /// Sets the client identifier.
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Parses the upload endpoint.
    pub fn upload_url(&self) -> Result<Url> {
        parse_endpoint("upload", &self.upload_endpoint)
    }

    /// Parses the token endpoint.
    pub fn token_url(&self) -> Result<Url> {
        parse_endpoint("token", &self.token_endpoint)
    }
}

/// Endpoint of the presigned-URL backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct PresignConfig {
    /// Endpoint returning a CID and one upload URL per file
    #[cfg_attr(
        feature = "config",
        arg(long = "presign-endpoint", env = "PRESIGN_ENDPOINT")
    )]
    pub presign_endpoint: String,
}

impl PresignConfig {
    /// Creates a configuration from an endpoint URL.
    pub fn new(presign_endpoint: impl Into<String>) -> Self {
        Self {
            presign_endpoint: presign_endpoint.into(),
        }
    }

    /// Parses the presign endpoint.
    pub fn presign_url(&self) -> Result<Url> {
        parse_endpoint("presign", &self.presign_endpoint)
    }
}

fn parse_endpoint(name: &str, endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint)
        .map_err(|e| Error::from(e).with_context(format!("{name} endpoint '{endpoint}'")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::configuration()
            .with_message(format!("{name} endpoint must use http or https")));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use cairn_core::ErrorKind;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReqwestConfig::default();
        assert_eq!(config.http_timeout, 30);
        assert!(config.user_agent.is_none());
        assert_eq!(config.effective_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_effective_timeout_uses_default_when_zero() {
        let config = ReqwestConfig::new(0);
        assert_eq!(
            config.effective_timeout(),
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_builder_pattern() {
        let config = ReqwestConfig::default()
            .with_timeout(5)
            .with_user_agent("custom-agent/1.0");

        assert_eq!(config.http_timeout, 5);
        assert_eq!(config.effective_user_agent(), "custom-agent/1.0");
        assert!(ReqwestConfig::default().effective_user_agent().starts_with("cairn/"));
    }

    #[test]
    fn test_pinning_defaults() {
        let config = PinningConfig::default();
        assert_eq!(config.upload_url().unwrap().as_str(), DEFAULT_UPLOAD_ENDPOINT);
        assert_eq!(config.token_url().unwrap().as_str(), DEFAULT_TOKEN_ENDPOINT);
        assert_eq!(config.client_id, "CONSOLE-TS-SDK");

        let parsed: PinningConfig = serde_json::from_str(r#"{"client_id": "APP"}"#).unwrap();
        assert_eq!(parsed.client_id, "APP");
        assert_eq!(parsed.upload_endpoint, DEFAULT_UPLOAD_ENDPOINT);
    }

    #[test]
    fn test_invalid_endpoint_is_configuration_error() {
        let config = PinningConfig::new("not a url", DEFAULT_TOKEN_ENDPOINT);
        assert_eq!(config.upload_url().unwrap_err().kind(), ErrorKind::Configuration);
        assert!(config.token_url().is_ok());

        let error = PresignConfig::new("ftp://files.example/").presign_url().unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Configuration);
    }
}
