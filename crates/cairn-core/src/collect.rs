//! Extraction of attachment leaves from documents.

use crate::TRACING_TARGET_COLLECT;
use crate::attachment::Attachment;
use crate::document::Document;

/// Returns every attachment leaf of `doc` in traversal order.
///
/// Calling this twice on an unmutated document yields the same sequence.
/// Byte-identical attachments are kept as separate entries.
pub fn collect_attachments(doc: &Document) -> Vec<Attachment> {
    let mut files = Vec::new();
    doc.visit_attachments(&mut |attachment| files.push(attachment.clone()));
    tracing::trace!(target: TRACING_TARGET_COLLECT, file_count = files.len(), "Collected attachments");
    files
}

/// Concatenates the attachments of several documents, in input order.
pub fn collect_batch<'a>(docs: impl IntoIterator<Item = &'a Document>) -> Vec<Attachment> {
    let mut files = Vec::new();
    let mut doc_count = 0usize;
    for doc in docs {
        doc.visit_attachments(&mut |attachment| files.push(attachment.clone()));
        doc_count += 1;
    }

    tracing::debug!(
        target: TRACING_TARGET_COLLECT,
        doc_count,
        file_count = files.len(),
        "Collected attachments across batch"
    );
    files
}
