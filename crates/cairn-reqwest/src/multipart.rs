//! Direct multipart upload to a pinning service.

use std::time::Instant;

use cairn_core::naming::{batch_path, derive_file_names};
use cairn_core::{
    Attachment, BatchResult, BlobSink, Error, ErrorKind, Result, UploadContext,
    UploadTokenProvider,
};
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::client::{ReqwestClient, error_body};
use crate::{Error as ReqwestError, PinningConfig, TRACING_TARGET_UPLOAD};

/// SDK identifier recorded in the pin metadata.
const SDK_NAME: &str = "rust";

/// Uploads a batch as one `multipart/form-data` POST.
///
/// Every attachment becomes a `file` part whose file name is
/// `files/{file_name}`, followed by a `pinataMetadata` part naming the
/// collection after the caller identity. The response must be a JSON object
/// carrying the CID in `IpfsHash`.
#[derive(Debug, Clone)]
pub struct MultipartSink<P> {
    client: ReqwestClient,
    upload_endpoint: Url,
    client_id: String,
    tokens: P,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PinMetadata<'a> {
    name: String,
    keyvalues: PinKeyValues<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PinKeyValues<'a> {
    sdk: &'a str,
    contract_address: Option<&'a str>,
    signer_address: Option<&'a str>,
}

#[derive(Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

impl<P: UploadTokenProvider> MultipartSink<P> {
    /// Creates a sink posting to the configured upload endpoint.
    pub fn new(client: ReqwestClient, config: &PinningConfig, tokens: P) -> Result<Self> {
        Ok(Self {
            client,
            upload_endpoint: config.upload_url()?,
            client_id: config.client_id.clone(),
            tokens,
        })
    }

    fn build_form(
        &self,
        files: &[Attachment],
        file_names: &[String],
        ctx: &UploadContext,
    ) -> Result<Form> {
        let mut form = Form::new().percent_encode_noop();
        for (file, name) in files.iter().zip(file_names) {
            let part = Part::stream(file.body()).file_name(batch_path(name));
            form = form.part("file", part);
        }

        let metadata = PinMetadata {
            name: format!("{}-{}", self.client_id, ctx.contract_or_empty()),
            keyvalues: PinKeyValues {
                sdk: SDK_NAME,
                contract_address: ctx.contract_address.as_deref(),
                signer_address: ctx.signer_address.as_deref(),
            },
        };
        let metadata = serde_json::to_string(&metadata).map_err(ReqwestError::from)?;

        Ok(form.text("pinataMetadata", metadata))
    }
}

#[async_trait::async_trait]
impl<P: UploadTokenProvider> BlobSink for MultipartSink<P> {
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

        let token = self.tokens.upload_token(ctx.contract_or_empty()).await?;
        let mut authorization = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(ReqwestError::from)?;
        authorization.set_sensitive(true);

        let form = self.build_form(files, &file_names, ctx)?;
        let started = Instant::now();

        tracing::debug!(
            target: TRACING_TARGET_UPLOAD,
            endpoint = %self.upload_endpoint,
            file_count = files.len(),
            start_offset,
            has_token = true,
            "Sending multipart upload"
        );

        let response = self
            .client
            .http()
            .post(self.upload_endpoint.clone())
            .header(AUTHORIZATION, authorization)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ReqwestError::from(e).into_kind(ErrorKind::Upload))?;

        let status = response.status();
        if !status.is_success() {
            let mut error = Error::upload()
                .with_message(format!("upload endpoint returned {status}"))
                .with_status(status.as_u16());
            if let Some(body) = error_body(response).await {
                error = error.with_context(body);
            }
            tracing::warn!(
                target: TRACING_TARGET_UPLOAD,
                status_code = status.as_u16(),
                file_count = files.len(),
                "Multipart upload rejected"
            );
            return Err(error);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ReqwestError::from(e).into_kind(ErrorKind::Upload))?;
        let pinned: PinResponse = serde_json::from_slice(&body).map_err(|e| {
            ReqwestError::from(e)
                .into_kind(ErrorKind::Upload)
                .with_status(status.as_u16())
                .with_context("response is not a pin envelope")
        })?;

        tracing::debug!(
            target: TRACING_TARGET_UPLOAD,
            cid = %pinned.ipfs_hash,
            file_count = files.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "Multipart upload completed"
        );

        Ok(BatchResult::new(pinned.ipfs_hash, file_names))
    }
}
