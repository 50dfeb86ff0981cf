//! Gateway configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Default primary gateway.
pub const DEFAULT_GATEWAY: &str = "https://ipfs.filebase.io/ipfs/";

/// Public gateways tried, in order, after the primary one fails.
pub const PUBLIC_GATEWAYS: &[&str] = &[
    "https://gateway.ipfscdn.io/ipfs/",
    "https://gateway2.ipfscdn.io/ipfs/",
    "https://ipfs.filebase.io/ipfs/",
    "https://gateway.pinata.cloud/ipfs/",
    "https://ipfs.infura.io/ipfs/",
    "https://infura-ipfs.io/ipfs/",
    "https://nftstorage.link/ipfs/",
    "https://cloudflare-ipfs.com/ipfs/",
];

/// Default per-attempt timeout in milliseconds.
pub const DEFAULT_ATTEMPT_TIMEOUT_MS: u64 = 10_000;

/// Primary gateway plus ordered fallbacks.
///
/// Base URLs are normalized to end with `/` when the resolver is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct GatewayConfig {
    /// Gateway used for URI rewriting and the first read attempt
    #[cfg_attr(
        feature = "config",
        arg(long = "gateway-url", env = "GATEWAY_URL", default_value = DEFAULT_GATEWAY)
    )]
    #[serde(default = "default_primary")]
    pub primary: String,

    /// Gateways tried in order when the primary one fails
    #[cfg_attr(
        feature = "config",
        arg(long = "gateway-fallback", env = "GATEWAY_FALLBACKS", value_delimiter = ',')
    )]
    #[serde(default = "default_fallbacks")]
    pub fallbacks: Vec<String>,

    /// Timeout of a single read attempt in milliseconds
    #[cfg_attr(
        feature = "config",
        arg(long = "gateway-timeout-ms", env = "GATEWAY_TIMEOUT_MS", default_value = "10000")
    )]
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,
}

fn default_primary() -> String {
    DEFAULT_GATEWAY.to_owned()
}

fn default_fallbacks() -> Vec<String> {
    PUBLIC_GATEWAYS
        .iter()
        .filter(|url| **url != DEFAULT_GATEWAY)
        .map(|url| (*url).to_owned())
        .collect()
}

fn default_attempt_timeout_ms() -> u64 {
    DEFAULT_ATTEMPT_TIMEOUT_MS
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            fallbacks: default_fallbacks(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
        }
    }
}

impl GatewayConfig {
    /// Creates a configuration with a single gateway and no fallbacks.
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            fallbacks: Vec::new(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
        }
    }

    /// Sets the fallback gateways.
    #[must_use]
    pub fn with_fallbacks<I, S>(mut self, fallbacks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fallbacks = fallbacks.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Returns the per-attempt timeout.
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    /// Returns a copy with every base URL ending in `/` and fallbacks equal
    /// to the primary, or repeated, removed.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let primary = normalize_base(&self.primary);
        let mut fallbacks: Vec<String> = Vec::with_capacity(self.fallbacks.len());
        for fallback in &self.fallbacks {
            let fallback = normalize_base(fallback);
            if fallback != primary && !fallbacks.contains(&fallback) {
                fallbacks.push(fallback);
            }
        }

        Self {
            primary,
            fallbacks,
            attempt_timeout_ms: self.attempt_timeout_ms,
        }
    }

    /// Returns the primary gateway followed by the fallbacks.
    pub fn gateways(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary.as_str()).chain(self.fallbacks.iter().map(String::as_str))
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.attempt_timeout_ms == 0 {
            return Err(Error::configuration().with_message("gateway attempt timeout cannot be zero"));
        }
        for gateway in self.gateways() {
            if gateway.trim().is_empty() {
                return Err(Error::configuration().with_message("gateway URL cannot be empty"));
            }
            let url = Url::parse(gateway).map_err(|e| {
                Error::from(e).with_context(format!("gateway '{gateway}'"))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(Error::configuration()
                    .with_message(format!("gateway '{gateway}' must use http or https")));
            }
        }
        Ok(())
    }
}

/// Appends a trailing `/` unless one is already present.
pub fn normalize_base(base: &str) -> String {
    let trimmed = base.trim();
    if trimmed.ends_with('/') {
        trimmed.to_owned()
    } else {
        format!("{trimmed}/")
    }
}
