//! Two-phase publishing of metadata batches.
//!
//! Phase one uploads every attachment of every structured item as a single
//! batch and stitches the resulting URIs back into the documents. Phase two
//! uploads the stitched documents themselves as a second batch whose file
//! names follow batch positions, so `base_uri + (start_offset + i)` is the
//! URI of item `i`.

use std::collections::VecDeque;
use std::time::Instant;

use bytes::Bytes;
use strum::{AsRefStr, Display, IntoStaticStr};

use crate::TRACING_TARGET_PUBLISH;
use crate::attachment::Attachment;
use crate::collect::collect_batch;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::naming::sequence_number;
use crate::provider::BlobSink;
use crate::stitch::stitch_document;
use crate::types::{BatchItem, BatchResult, PublishResult, UploadContext};

/// Stages a publish moves through.
///
/// A publish either reaches [`PublishStage::Done`] or stops at
/// [`PublishStage::Failed`]; it never resumes from an intermediate stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum PublishStage {
    /// Nothing has happened yet.
    Idle,
    /// Attachments are being gathered from the documents.
    Collecting,
    /// The attachment batch is being uploaded.
    UploadingAssets,
    /// Attachment leaves are being replaced with their URIs.
    Stitching,
    /// Stitched documents are being rendered to text.
    Serializing,
    /// The document batch is being uploaded.
    UploadingDocuments,
    /// Every item has a URI.
    Done,
    /// A step failed and the publish stopped.
    Failed,
}

/// Publishes metadata batches through a [`BlobSink`].
#[derive(Debug, Clone)]
pub struct MetadataPublisher<S> {
    sink: S,
}

impl<S: BlobSink> MetadataPublisher<S> {
    /// Creates a publisher writing to `sink`.
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    /// Returns the underlying sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Publishes a single document at offset zero and returns its URI.
    pub async fn publish_one(&self, document: Document, ctx: &UploadContext) -> Result<String> {
        let result = self.publish(vec![document.into()], 0, ctx).await?;
        result.metadata_uris.into_iter().next().ok_or_else(|| {
            Error::internal().with_message("publish of one document returned no URI")
        })
    }

    /// Publishes `items` and returns one URI per item, in input order.
    ///
    /// Literal URIs are returned unchanged and cost no network call. When the
    /// batch holds no structured document nothing is uploaded and the base
    /// URI is empty.
    ///
    /// # Errors
    ///
    /// Any sink error aborts the publish. A CID minted by phase one is left
    /// unreferenced when phase two fails.
    pub async fn publish(
        &self,
        items: Vec<BatchItem>,
        start_offset: u64,
        ctx: &UploadContext,
    ) -> Result<PublishResult> {
        let started = Instant::now();
        let mut stage = PublishStage::Idle;

        let result = self.run(items, start_offset, ctx, &mut stage).await;
        match &result {
            Ok(published) => {
                advance(&mut stage, PublishStage::Done);
                tracing::debug!(
                    target: TRACING_TARGET_PUBLISH,
                    base_uri = %published.base_uri,
                    item_count = published.metadata_uris.len(),
                    elapsed_ms = started.elapsed().as_millis(),
                    "Publish completed"
                );
            }
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET_PUBLISH,
                    stage = %PublishStage::Failed,
                    failed_at = %stage,
                    error = %error,
                    elapsed_ms = started.elapsed().as_millis(),
                    "Publish failed"
                );
            }
        }

        result
    }

    async fn run(
        &self,
        items: Vec<BatchItem>,
        start_offset: u64,
        ctx: &UploadContext,
        stage: &mut PublishStage,
    ) -> Result<PublishResult> {
        let mut documents: Vec<(usize, Document)> = Vec::new();
        let mut metadata_uris: Vec<Option<String>> = Vec::with_capacity(items.len());
        for (position, item) in items.into_iter().enumerate() {
            match item {
                BatchItem::Uri(uri) => metadata_uris.push(Some(uri)),
                BatchItem::Metadata(document) => {
                    documents.push((position, document));
                    metadata_uris.push(None);
                }
            }
        }

        if documents.is_empty() {
            tracing::debug!(
                target: TRACING_TARGET_PUBLISH,
                item_count = metadata_uris.len(),
                "Batch holds only literal URIs, nothing to upload"
            );
            return Ok(PublishResult {
                base_uri: String::new(),
                metadata_uris: metadata_uris.into_iter().flatten().collect(),
            });
        }

        // Document names must fit before anything is uploaded.
        if let Some((last, _)) = documents.last() {
            sequence_number(start_offset, *last)?;
        }

        advance(stage, PublishStage::Collecting);
        let assets = collect_batch(documents.iter().map(|(_, document)| document));

        if !assets.is_empty() {
            advance(stage, PublishStage::UploadingAssets);
            let uploaded = self.upload_checked(&assets, start_offset, ctx).await?;

            advance(stage, PublishStage::Stitching);
            let mut file_names: VecDeque<String> = uploaded.file_names.into();
            for (_, document) in &mut documents {
                stitch_document(document, &uploaded.cid, &mut file_names)?;
            }
            if !file_names.is_empty() {
                return Err(Error::internal().with_message(format!(
                    "{} uploaded asset names were not stitched",
                    file_names.len()
                )));
            }
        }

        advance(stage, PublishStage::Serializing);
        let mut serialized = Vec::with_capacity(documents.len());
        for (position, document) in &documents {
            let text = document.to_canonical_string()?;
            let name = sequence_number(start_offset, *position)?.to_string();
            serialized.push(Attachment::named(Bytes::from(text), name));
        }

        advance(stage, PublishStage::UploadingDocuments);
        let uploaded = self.upload_checked(&serialized, start_offset, ctx).await?;

        for ((position, _), file_name) in documents.iter().zip(&uploaded.file_names) {
            metadata_uris[*position] = Some(uploaded.cid.file_uri(file_name));
        }

        Ok(PublishResult {
            base_uri: uploaded.base_uri(),
            metadata_uris: metadata_uris.into_iter().flatten().collect(),
        })
    }

    /// Uploads one batch and checks the sink returned a name per file.
    async fn upload_checked(
        &self,
        files: &[Attachment],
        start_offset: u64,
        ctx: &UploadContext,
    ) -> Result<BatchResult> {
        tracing::debug!(
            target: TRACING_TARGET_PUBLISH,
            file_count = files.len(),
            start_offset,
            "Uploading batch"
        );

        let result = self.sink.upload_batch(files, start_offset, ctx).await?;
        if result.file_names.len() != files.len() {
            return Err(Error::internal().with_message(format!(
                "sink returned {} file names for {} files",
                result.file_names.len(),
                files.len()
            )));
        }

        tracing::debug!(
            target: TRACING_TARGET_PUBLISH,
            cid = %result.cid,
            file_count = files.len(),
            "Batch uploaded"
        );

        Ok(result)
    }
}

fn advance(stage: &mut PublishStage, next: PublishStage) {
    tracing::debug!(
        target: TRACING_TARGET_PUBLISH,
        from = %stage,
        stage = %next,
        "Publish stage changed"
    );
    *stage = next;
}
