//! Replacement of attachment leaves with their uploaded URIs.

use std::collections::VecDeque;

use crate::document::Document;
use crate::error::{Error, Result};
use crate::types::ContentId;

/// Replaces each attachment leaf of `doc` with `storage://{cid}/{name}`.
///
/// Names are taken from the front of `file_names` in the same order
/// [`collect_attachments`](crate::collect::collect_attachments) produced the
/// attachments, so one queue can be shared across several documents.
///
/// # Errors
///
/// Returns [`ErrorKind::Internal`](crate::ErrorKind::Internal) if the queue
/// runs out before every attachment is replaced. That only happens when the
/// document changed between collection and stitching.
pub fn stitch_document(
    doc: &mut Document,
    cid: &ContentId,
    file_names: &mut VecDeque<String>,
) -> Result<()> {
    doc.visit_attachment_slots(&mut |slot| {
        let name = file_names.pop_front().ok_or_else(|| {
            Error::internal()
                .with_message("file name queue exhausted before every attachment was stitched")
                .with_context(format!("cid {cid}"))
        })?;
        *slot = Document::String(cid.file_uri(&name));
        Ok(())
    })
}
