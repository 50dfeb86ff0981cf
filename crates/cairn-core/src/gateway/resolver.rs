//! Reads through an ordered list of gateways.

use std::time::Instant;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use super::config::GatewayConfig;
use super::rewrite::{is_http_url, resolve_uri, rewrite_json, strip_scheme};
use crate::TRACING_TARGET_GATEWAY;
use crate::error::{Error, Result};
use crate::provider::GatewayTransport;

/// Resolves `storage://` references and reads them with gateway fallback.
///
/// Every attempt races the configured per-attempt timeout. A transport
/// failure, non-2xx status or timeout moves on to the next gateway; the first
/// successful response wins. Parse failures are never retried since the
/// content was fetched.
#[derive(Debug, Clone)]
pub struct GatewayResolver<T> {
    config: GatewayConfig,
    transport: T,
}

impl<T: GatewayTransport> GatewayResolver<T> {
    /// Creates a resolver, normalizing and validating `config`.
    pub fn new(config: GatewayConfig, transport: T) -> Result<Self> {
        let config = config.normalized();
        config.validate()?;

        Ok(Self { config, transport })
    }

    /// Returns the normalized configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Returns the transport used for reads.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Rewrites `uri` against the primary gateway.
    pub fn resolve_url(&self, uri: &str) -> String {
        resolve_uri(uri, &self.config.primary)
    }

    /// Rewrites every `storage://` string inside `value` against the primary
    /// gateway.
    pub fn rewrite(&self, value: Value) -> Value {
        rewrite_json(value, &self.config.primary)
    }

    /// Reads the raw bytes behind `uri`.
    ///
    /// `uri` is either a `storage://` reference or an HTTP(S) URL. A URL that
    /// starts with one of the configured gateways gets the same fallback as
    /// a storage reference; any other URL is fetched once.
    pub async fn fetch_raw(&self, uri: &str) -> Result<Bytes> {
        let candidates = self.candidates(uri)?;
        let total = candidates.len();
        let timeout = self.config.attempt_timeout();
        let mut last_error: Option<Error> = None;

        for (attempt, url) in candidates.into_iter().enumerate() {
            let started = Instant::now();
            tracing::debug!(
                target: TRACING_TARGET_GATEWAY,
                gateway = %url,
                attempt = attempt + 1,
                total,
                "Fetching from gateway"
            );

            let error = match tokio::time::timeout(timeout, self.transport.get(&url)).await {
                Ok(Ok(body)) => {
                    tracing::debug!(
                        target: TRACING_TARGET_GATEWAY,
                        gateway = %url,
                        attempt = attempt + 1,
                        body_len = body.len(),
                        elapsed_ms = started.elapsed().as_millis(),
                        "Gateway responded"
                    );
                    return Ok(body);
                }
                Ok(Err(error)) if !error.is_retryable() => return Err(error),
                Ok(Err(error)) => error,
                Err(_) => Error::fetch()
                    .with_message(format!("attempt timed out after {}ms", timeout.as_millis()))
                    .with_context(url.to_string()),
            };

            tracing::warn!(
                target: TRACING_TARGET_GATEWAY,
                gateway = %url,
                attempt = attempt + 1,
                total,
                status_code = error.status,
                elapsed_ms = started.elapsed().as_millis(),
                error = %error,
                "Gateway attempt failed"
            );
            last_error = Some(error);
        }

        let mut exhausted = Error::fetch()
            .with_message(format!("all {total} gateways exhausted"))
            .with_context(uri.to_owned());
        if let Some(error) = last_error {
            exhausted = exhausted.with_source(error);
        }
        Err(exhausted)
    }

    /// Reads `uri` as UTF-8 text.
    pub async fn fetch_text(&self, uri: &str) -> Result<String> {
        let body = self.fetch_raw(uri).await?;
        Ok(String::from_utf8(body.to_vec())?)
    }

    /// Reads `uri` and deserializes it from JSON.
    pub async fn fetch_json<D: DeserializeOwned>(&self, uri: &str) -> Result<D> {
        let body = self.fetch_raw(uri).await?;
        serde_json::from_slice(&body)
            .map_err(|e| Error::from(e).with_context(uri.to_owned()))
    }

    /// Reads a JSON document and rewrites its storage references against the
    /// primary gateway.
    pub async fn fetch_metadata(&self, uri: &str) -> Result<Value> {
        let value: Value = self.fetch_json(uri).await?;
        Ok(self.rewrite(value))
    }

    /// Builds the URLs to try for `uri`, primary gateway first.
    fn candidates(&self, uri: &str) -> Result<Vec<Url>> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(Error::not_found().with_message("empty content reference"));
        }

        let path = match strip_scheme(uri) {
            Some(path) => path,
            None if is_http_url(uri) => match self.gateway_path(uri) {
                Some(path) => path,
                None => return Ok(vec![parse_url(uri)?]),
            },
            None => {
                return Err(Error::invalid_input()
                    .with_message("expected a storage:// reference or an HTTP(S) URL")
                    .with_context(uri.to_owned()));
            }
        };

        self.config
            .gateways()
            .map(|gateway| parse_url(&format!("{gateway}{path}")))
            .collect()
    }

    /// Returns the path of a URL that points into one of the gateways.
    fn gateway_path<'a>(&self, url: &'a str) -> Option<&'a str> {
        self.config.gateways().find_map(|gateway| url.strip_prefix(gateway))
    }
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| {
        Error::invalid_input()
            .with_message("invalid content URL")
            .with_source(e)
            .with_context(url.to_owned())
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::ErrorKind;
    use crate::mock::MemoryStore;

    const PRIMARY: &str = "https://primary.example/ipfs/";
    const SECOND: &str = "https://second.example/ipfs/";
    const THIRD: &str = "https://third.example/ipfs/";

    fn resolver(store: &MemoryStore) -> GatewayResolver<MemoryStore> {
        let config = GatewayConfig::new(PRIMARY)
            .with_fallbacks([SECOND, THIRD])
            .with_attempt_timeout(Duration::from_millis(500));
        GatewayResolver::new(config, store.clone()).unwrap()
    }

    #[tokio::test]
    async fn test_primary_success_short_circuits() {
        let store = MemoryStore::new().with_content("cid/0", "hello");
        let text = resolver(&store).fetch_text("storage://cid/0").await.unwrap();

        assert_eq!(text, "hello");
        assert_eq!(store.requests(), [format!("{PRIMARY}cid/0")]);
    }

    #[tokio::test]
    async fn test_fallbacks_tried_in_order() {
        let store = MemoryStore::new()
            .with_content("cid/0", "hello")
            .with_failing_gateway(PRIMARY);
        let text = resolver(&store).fetch_text("storage://cid/0").await.unwrap();

        assert_eq!(text, "hello");
        assert_eq!(
            store.requests(),
            [format!("{PRIMARY}cid/0"), format!("{SECOND}cid/0")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_moves_to_next_gateway() {
        let store = MemoryStore::new()
            .with_content("cid/0", "late")
            .with_slow_gateway(PRIMARY, Duration::from_secs(5));
        let text = resolver(&store).fetch_text("storage://cid/0").await.unwrap();

        assert_eq!(text, "late");
        assert_eq!(store.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_exhaustion_is_terminal_fetch_error() {
        let store = MemoryStore::new()
            .with_failing_gateway(PRIMARY)
            .with_failing_gateway(SECOND)
            .with_failing_gateway(THIRD);
        let error = resolver(&store).fetch_raw("storage://cid/0").await.unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Fetch);
        assert!(error.to_string().contains("exhausted"));
        assert_eq!(store.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_parse_error_is_not_retried() {
        let store = MemoryStore::new().with_content("cid/0", "not json");
        let error = resolver(&store)
            .fetch_json::<Value>("storage://cid/0")
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Parse);
        assert_eq!(store.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_resolved_gateway_url_gets_fallback() {
        let store = MemoryStore::new()
            .with_content("cid/0", "x")
            .with_failing_gateway(PRIMARY);
        let url = format!("{PRIMARY}cid/0");
        resolver(&store).fetch_raw(&url).await.unwrap();

        assert_eq!(store.requests(), [url, format!("{SECOND}cid/0")]);
    }

    #[tokio::test]
    async fn test_foreign_url_fetched_once() {
        let store = MemoryStore::new().with_failing_gateway("https://elsewhere.example/");
        let error = resolver(&store)
            .fetch_raw("https://elsewhere.example/cid/0")
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Fetch);
        assert_eq!(store.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_and_unknown_references() {
        let store = MemoryStore::new();
        let resolver = resolver(&store);

        assert_eq!(resolver.fetch_raw("").await.unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(
            resolver.fetch_raw("ftp://x/y").await.unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
        assert!(store.requests().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_metadata_rewrites_references() {
        let store = MemoryStore::new()
            .with_content("meta/0", r#"{"name":"a","image":"storage://img/0"}"#);
        let value = resolver(&store).fetch_metadata("storage://meta/0").await.unwrap();

        assert_eq!(value, json!({"name": "a", "image": format!("{PRIMARY}img/0")}));
    }

    #[test]
    fn test_new_normalizes_and_validates() {
        let store = MemoryStore::new();
        let resolver =
            GatewayResolver::new(GatewayConfig::new("https://gw.example"), store.clone()).unwrap();
        assert_eq!(resolver.resolve_url("storage://c/1"), "https://gw.example/c/1");

        let error = GatewayResolver::new(GatewayConfig::new(""), store).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Configuration);
    }
}
