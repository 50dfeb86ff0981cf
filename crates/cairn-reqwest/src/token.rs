//! Upload token grants.

use cairn_core::{Error, Result, UploadTokenProvider};
use serde::Deserialize;
use url::Url;

use crate::client::{ReqwestClient, error_body};
use crate::{Error as ReqwestError, PinningConfig, TRACING_TARGET_TOKEN};

/// Header carrying the client identifier and contract address.
pub const APP_NAME_HEADER: &str = "X-App-Name";

/// Fetches short-lived upload tokens from a grant endpoint.
///
/// Each request carries `X-App-Name: {client_id}-{contract_address}`. The
/// response body is either the raw token or a JSON object with a `token`
/// field.
#[derive(Debug, Clone)]
pub struct GrantTokenProvider {
    client: ReqwestClient,
    token_endpoint: Url,
    client_id: String,
}

#[derive(Deserialize)]
struct TokenEnvelope {
    token: String,
}

impl GrantTokenProvider {
    /// Creates a token provider from the pinning configuration.
    pub fn new(client: ReqwestClient, config: &PinningConfig) -> Result<Self> {
        Ok(Self {
            client,
            token_endpoint: config.token_url()?,
            client_id: config.client_id.clone(),
        })
    }

    fn app_name(&self, contract_address: &str) -> String {
        format!("{}-{contract_address}", self.client_id)
    }
}

#[async_trait::async_trait]
impl UploadTokenProvider for GrantTokenProvider {
    async fn upload_token(&self, contract_address: &str) -> Result<String> {
        tracing::debug!(
            target: TRACING_TARGET_TOKEN,
            endpoint = %self.token_endpoint,
            contract_address,
            "Requesting upload token"
        );

        let response = self
            .client
            .http()
            .get(self.token_endpoint.clone())
            .header(APP_NAME_HEADER, self.app_name(contract_address))
            .send()
            .await
            .map_err(ReqwestError::from)?;

        let status = response.status();
        if !status.is_success() {
            let mut error = Error::fetch()
                .with_message("failed to get upload token")
                .with_status(status.as_u16());
            if let Some(body) = error_body(response).await {
                error = error.with_context(body);
            }
            tracing::warn!(
                target: TRACING_TARGET_TOKEN,
                status_code = status.as_u16(),
                "Upload token request rejected"
            );
            return Err(error);
        }

        let body = response.text().await.map_err(ReqwestError::from)?;
        let token = parse_token(&body).ok_or_else(|| {
            Error::fetch().with_message("token endpoint returned an empty token")
        })?;

        tracing::debug!(
            target: TRACING_TARGET_TOKEN,
            has_token = true,
            "Upload token granted"
        );

        Ok(token)
    }
}

/// Extracts the token from a raw or JSON body.
fn parse_token(body: &str) -> Option<String> {
    let body = body.trim();
    let token = match serde_json::from_str::<TokenEnvelope>(body) {
        Ok(envelope) => envelope.token,
        Err(_) => body.trim_matches('"').to_owned(),
    };

    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use cairn_core::ErrorKind;

    use super::*;
    use crate::ReqwestConfig;
    use crate::test_server::spawn;

    fn provider(addr: std::net::SocketAddr) -> GrantTokenProvider {
        let client = ReqwestClient::new(ReqwestConfig::default()).unwrap();
        let config = PinningConfig::new("http://unused.example/", format!("http://{addr}/grant"));
        GrantTokenProvider::new(client, &config).unwrap()
    }

    #[test]
    fn test_parse_token_variants() {
        assert_eq!(parse_token("abc\n").as_deref(), Some("abc"));
        assert_eq!(parse_token(r#"{"token":"xyz"}"#).as_deref(), Some("xyz"));
        assert_eq!(parse_token(r#""quoted""#).as_deref(), Some("quoted"));
        assert_eq!(parse_token("  "), None);
    }

    #[tokio::test]
    async fn test_token_request_sends_app_name() {
        let router = Router::new().route(
            "/grant",
            get(|headers: HeaderMap| async move {
                let app = headers
                    .get(APP_NAME_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_owned();
                format!("token-for-{app}")
            }),
        );
        let addr = spawn(router).await;

        let token = provider(addr).upload_token("0xabc").await.unwrap();
        assert_eq!(token, "token-for-CONSOLE-TS-SDK-0xabc");
    }

    #[tokio::test]
    async fn test_json_token_body() {
        let router = Router::new().route("/grant", get(|| async { r#"{"token":"jwt"}"# }));
        let addr = spawn(router).await;

        assert_eq!(provider(addr).upload_token("").await.unwrap(), "jwt");
    }

    #[tokio::test]
    async fn test_rejected_grant_is_fetch_error() {
        let router = Router::new().route(
            "/grant",
            get(|| async { (StatusCode::UNAUTHORIZED, "no quota") }),
        );
        let addr = spawn(router).await;

        let error = provider(addr).upload_token("0xabc").await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Fetch);
        assert_eq!(error.status, Some(401));
    }
}
