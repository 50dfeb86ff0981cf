//! Gateway reads over reqwest.

use bytes::Bytes;
use cairn_core::{Error, GatewayTransport, Result};
use url::Url;

use crate::client::{ReqwestClient, error_body};
use crate::{Error as ReqwestError, TRACING_TARGET_GATEWAY};

#[async_trait::async_trait]
impl GatewayTransport for ReqwestClient {
    async fn get(&self, url: &Url) -> Result<Bytes> {
        let response = self
            .http()
            .get(url.clone())
            .send()
            .await
            .map_err(ReqwestError::from)?;

        let status = response.status();
        tracing::debug!(
            target: TRACING_TARGET_GATEWAY,
            url = %url,
            status_code = status.as_u16(),
            "Gateway response received"
        );

        if !status.is_success() {
            let mut error = Error::fetch()
                .with_message(format!("gateway returned {status}"))
                .with_status(status.as_u16());
            if let Some(body) = error_body(response).await {
                error = error.with_context(body);
            }
            return Err(error);
        }

        Ok(response.bytes().await.map_err(ReqwestError::from)?)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::get;
    use cairn_core::{ErrorKind, GatewayConfig, GatewayResolver};

    use super::*;
    use crate::ReqwestConfig;
    use crate::test_server::spawn;

    #[tokio::test]
    async fn test_get_returns_body() {
        let addr = spawn(Router::new().route("/ipfs/cid/0", get(|| async { "hello" }))).await;
        let client = ReqwestClient::new(ReqwestConfig::default()).unwrap();

        let url = Url::parse(&format!("http://{addr}/ipfs/cid/0")).unwrap();
        assert_eq!(client.get(&url).await.unwrap(), Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn test_non_success_is_fetch_error() {
        let addr = spawn(Router::new().route(
            "/ipfs/cid/0",
            get(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
        ))
        .await;
        let client = ReqwestClient::new(ReqwestConfig::default()).unwrap();

        let url = Url::parse(&format!("http://{addr}/ipfs/cid/0")).unwrap();
        let error = client.get(&url).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Fetch);
        assert_eq!(error.status, Some(502));
        assert_eq!(error.context.as_deref(), Some("upstream down"));
    }

    #[tokio::test]
    async fn test_resolver_falls_back_over_http() {
        let failing = spawn(Router::new().route(
            "/ipfs/cid/0",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        ))
        .await;
        let slow = spawn(Router::new().route(
            "/ipfs/cid/0",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "too late"
            }),
        ))
        .await;
        let healthy = spawn(Router::new().route(
            "/ipfs/cid/0",
            get(|| async { r#"{"name":"a","image":"storage://img/0"}"# }),
        ))
        .await;

        let config = GatewayConfig::new(format!("http://{failing}/ipfs/"))
            .with_fallbacks([format!("http://{slow}/ipfs/"), format!("http://{healthy}/ipfs/")])
            .with_attempt_timeout(Duration::from_millis(200));
        let client = ReqwestClient::new(ReqwestConfig::default()).unwrap();
        let resolver = GatewayResolver::new(config, client).unwrap();

        let value = resolver.fetch_metadata("storage://cid/0").await.unwrap();
        assert_eq!(value["name"], "a");
        assert_eq!(value["image"], format!("http://{failing}/ipfs/img/0"));
    }

    #[tokio::test]
    async fn test_resolver_exhaustion_over_http() {
        let failing = spawn(Router::new()).await;

        let config = GatewayConfig::new(format!("http://{failing}/ipfs/"));
        let client = ReqwestClient::new(ReqwestConfig::default()).unwrap();
        let resolver = GatewayResolver::new(config, client).unwrap();

        let error = resolver.fetch_raw("storage://cid/0").await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Fetch);
        assert!(error.to_string().contains("exhausted"));
    }
}
