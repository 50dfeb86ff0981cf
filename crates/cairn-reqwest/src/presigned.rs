//! Upload through presigned per-file URLs.

use std::time::Instant;

use cairn_core::naming::derive_file_names;
use cairn_core::{
    Attachment, BatchResult, BlobSink, Error, ErrorKind, Result, UploadContext,
    UploadTokenProvider,
};
use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::client::{ReqwestClient, error_body};
use crate::{Error as ReqwestError, PresignConfig, TRACING_TARGET_UPLOAD};

/// Uploads a batch by requesting one presigned URL per file and PUTting
/// each body to it.
///
/// The presign endpoint reserves the directory and returns its CID along
/// with the upload URLs, one per file name in request order. Files are sent
/// one after another; the first failed PUT fails the batch.
#[derive(Debug, Clone)]
pub struct PresignedSink<P> {
    client: ReqwestClient,
    presign_endpoint: Url,
    tokens: P,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PresignRequest<'a> {
    file_names: &'a [String],
    contract_address: Option<&'a str>,
    signer_address: Option<&'a str>,
}

#[derive(Deserialize)]
struct PresignResponse {
    cid: String,
    urls: Vec<Url>,
}

impl<P: UploadTokenProvider> PresignedSink<P> {
    /// Creates a sink using the configured presign endpoint.
    pub fn new(client: ReqwestClient, config: &PresignConfig, tokens: P) -> Result<Self> {
        Ok(Self {
            client,
            presign_endpoint: config.presign_url()?,
            tokens,
        })
    }

    async fn presign(
        &self,
        file_names: &[String],
        ctx: &UploadContext,
    ) -> Result<PresignResponse> {
        let token = self.tokens.upload_token(ctx.contract_or_empty()).await?;
        let mut authorization = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(ReqwestError::from)?;
        authorization.set_sensitive(true);

        let request = PresignRequest {
            file_names,
            contract_address: ctx.contract_address.as_deref(),
            signer_address: ctx.signer_address.as_deref(),
        };

        let response = self
            .client
            .http()
            .post(self.presign_endpoint.clone())
            .header(AUTHORIZATION, authorization)
            .json(&request)
            .send()
            .await
            .map_err(|e| ReqwestError::from(e).into_kind(ErrorKind::Upload))?;

        let status = response.status();
        if !status.is_success() {
            let mut error = Error::upload()
                .with_message(format!("presign endpoint returned {status}"))
                .with_status(status.as_u16());
            if let Some(body) = error_body(response).await {
                error = error.with_context(body);
            }
            return Err(error);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ReqwestError::from(e).into_kind(ErrorKind::Upload))?;
        let presigned: PresignResponse = serde_json::from_slice(&body).map_err(|e| {
            ReqwestError::from(e)
                .into_kind(ErrorKind::Upload)
                .with_context("response is not a presign envelope")
        })?;

        if presigned.urls.len() != file_names.len() {
            return Err(Error::upload().with_message(format!(
                "presign endpoint returned {} URLs for {} files",
                presigned.urls.len(),
                file_names.len()
            )));
        }

        Ok(presigned)
    }

    async fn put(&self, url: &Url, file: &Attachment, file_name: &str) -> Result<()> {
        let response = self
            .client
            .http()
            .put(url.clone())
            .body(file.body())
            .send()
            .await
            .map_err(|e| {
                ReqwestError::from(e)
                    .into_kind(ErrorKind::Upload)
                    .with_context(format!("file '{file_name}'"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let mut error = Error::upload()
                .with_message(format!("PUT of '{file_name}' returned {status}"))
                .with_status(status.as_u16());
            if let Some(body) = error_body(response).await {
                error = error.with_context(body);
            }
            return Err(error);
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl<P: UploadTokenProvider> BlobSink for PresignedSink<P> {
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

        let started = Instant::now();
        let presigned = self.presign(&file_names, ctx).await?;

        tracing::debug!(
            target: TRACING_TARGET_UPLOAD,
            cid = %presigned.cid,
            file_count = files.len(),
            start_offset,
            "Presigned URLs received"
        );

        for ((file, file_name), url) in files.iter().zip(&file_names).zip(&presigned.urls) {
            if let Err(error) = self.put(url, file, file_name).await {
                tracing::warn!(
                    target: TRACING_TARGET_UPLOAD,
                    cid = %presigned.cid,
                    file_name = %file_name,
                    status_code = error.status,
                    "Presigned upload failed"
                );
                return Err(error);
            }
        }

        tracing::debug!(
            target: TRACING_TARGET_UPLOAD,
            cid = %presigned.cid,
            file_count = files.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "Presigned upload completed"
        );

        Ok(BatchResult::new(presigned.cid, file_names))
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    use axum::body::Bytes;
    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::routing::{post, put};
    use axum::{Json, Router};
    use cairn_core::mock::MemoryStore;
    use serde_json::{Value, json};

    use super::*;
    use crate::ReqwestConfig;
    use crate::test_server::{spawn, spawn_with};

    #[derive(Debug, Default)]
    struct Captured {
        request: Option<Value>,
        puts: Vec<(String, Vec<u8>)>,
    }

    type Shared = Arc<Mutex<Captured>>;

    /// Starts a presign backend. `url_count` overrides the number of URLs
    /// returned, and PUTs to `reject` fail with 500.
    async fn backend(
        captured: Shared,
        url_count: Option<usize>,
        reject: Option<&'static str>,
    ) -> SocketAddr {
        spawn_with(move |addr| {
            Router::new()
                .route(
                    "/presign",
                    post(move |State(captured): State<Shared>, Json(request): Json<Value>| async move {
                        let names: Vec<String> = request["fileNames"]
                            .as_array()
                            .unwrap()
                            .iter()
                            .map(|n| n.as_str().unwrap().to_owned())
                            .collect();
                        captured.lock().unwrap().request = Some(request);

                        let count = url_count.unwrap_or(names.len());
                        let urls: Vec<String> = names
                            .iter()
                            .cycle()
                            .take(count)
                            .map(|name| format!("http://{addr}/put/{name}"))
                            .collect();
                        Json(json!({"cid": "bafypresigned", "urls": urls}))
                    }),
                )
                .route(
                    "/put/{name}",
                    put(move |State(captured): State<Shared>, Path(name): Path<String>, body: Bytes| async move {
                        if reject == Some(name.as_str()) {
                            return StatusCode::INTERNAL_SERVER_ERROR;
                        }
                        captured.lock().unwrap().puts.push((name, body.to_vec()));
                        StatusCode::OK
                    }),
                )
                .with_state(captured)
        })
        .await
    }

    fn sink(addr: SocketAddr, tokens: MemoryStore) -> PresignedSink<MemoryStore> {
        let client = ReqwestClient::new(ReqwestConfig::default()).unwrap();
        let config = PresignConfig::new(format!("http://{addr}/presign"));
        PresignedSink::new(client, &config, tokens).unwrap()
    }

    #[tokio::test]
    async fn test_presigned_upload_puts_every_file() {
        let captured = Shared::default();
        let addr = backend(captured.clone(), None, None).await;
        let sink = sink(addr, MemoryStore::new());

        let files = [Attachment::anonymous(vec![1u8]), Attachment::from_file(vec![2u8], "b.gif")];
        let ctx = UploadContext::new().with_contract("0xabc");
        let result = sink.upload_batch(&files, 10, &ctx).await.unwrap();

        assert_eq!(result.cid.as_str(), "bafypresigned");
        assert_eq!(result.file_names, ["10", "11.gif"]);

        let captured = captured.lock().unwrap();
        assert_eq!(
            captured.request,
            Some(json!({"fileNames": ["10", "11.gif"], "contractAddress": "0xabc", "signerAddress": null}))
        );
        assert_eq!(
            captured.puts,
            [("10".to_owned(), vec![1u8]), ("11.gif".to_owned(), vec![2u8])]
        );
    }

    #[tokio::test]
    async fn test_url_count_mismatch_is_upload_error() {
        let captured = Shared::default();
        let addr = backend(captured.clone(), Some(1), None).await;
        let sink = sink(addr, MemoryStore::new());

        let files = [Attachment::anonymous(vec![1u8]), Attachment::anonymous(vec![2u8])];
        let error = sink
            .upload_batch(&files, 0, &UploadContext::new())
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Upload);
        assert!(captured.lock().unwrap().puts.is_empty());
    }

    #[tokio::test]
    async fn test_failed_put_fails_batch() {
        let captured = Shared::default();
        let addr = backend(captured.clone(), None, Some("1")).await;
        let sink = sink(addr, MemoryStore::new());

        let files = [
            Attachment::anonymous(vec![1u8]),
            Attachment::anonymous(vec![2u8]),
            Attachment::anonymous(vec![3u8]),
        ];
        let error = sink
            .upload_batch(&files, 0, &UploadContext::new())
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Upload);
        assert_eq!(error.status, Some(500));
        assert_eq!(captured.lock().unwrap().puts.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_names_fail_before_network() {
        let tokens = MemoryStore::new();
        let sink = sink(spawn(Router::new()).await, tokens.clone());

        let files = [
            Attachment::named(vec![1u8], "x/a.png"),
            Attachment::named(vec![2u8], "y/a.png"),
        ];
        let error = sink
            .upload_batch(&files, 0, &UploadContext::new())
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::DuplicateFileName);
        assert!(tokens.token_requests().is_empty());
    }
}
