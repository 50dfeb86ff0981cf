//! File name derivation for uploaded batches.
//!
//! Names are derived per attachment, in submission order:
//!
//! 1. a named attachment uses the basename of its display name;
//! 2. an anonymous attachment with an extension hint uses `{index + offset}.{ext}`;
//! 3. everything else uses `{index + offset}`.
//!
//! Downstream token numbering depends on rule 3, so it must not change.

use std::collections::HashSet;

use crate::attachment::Attachment;
use crate::error::{Error, Result};

/// Directory prefix every file carries inside an uploaded batch.
pub const BATCH_DIRECTORY: &str = "files";

/// Returns `start_offset + index`.
///
/// # Errors
///
/// Returns [`ErrorKind::InvalidInput`](crate::ErrorKind::InvalidInput) when the
/// sum does not fit in a `u64`.
pub fn sequence_number(start_offset: u64, index: usize) -> Result<u64> {
    u64::try_from(index)
        .ok()
        .and_then(|index| start_offset.checked_add(index))
        .ok_or_else(|| {
            Error::invalid_input().with_message(format!(
                "start offset {start_offset} overflows at index {index}"
            ))
        })
}

/// Derives the file name of the attachment at `index`.
pub fn file_name(attachment: &Attachment, index: usize, start_offset: u64) -> Result<String> {
    let name = match attachment {
        Attachment::Named { name, .. } => basename(name).to_owned(),
        Attachment::Anonymous {
            extension: Some(ext),
            ..
        } => format!("{}.{ext}", sequence_number(start_offset, index)?),
        Attachment::Anonymous { .. } | Attachment::Literal(_) => {
            sequence_number(start_offset, index)?.to_string()
        }
    };
    Ok(name)
}

/// Derives file names for a whole batch.
///
/// # Errors
///
/// Returns [`ErrorKind::DuplicateFileName`](crate::ErrorKind::DuplicateFileName)
/// if two attachments resolve to the same name, and
/// [`ErrorKind::InvalidInput`](crate::ErrorKind::InvalidInput) if a display name
/// has no basename or a sequential name overflows. All are raised before
/// anything is sent.
pub fn derive_file_names(files: &[Attachment], start_offset: u64) -> Result<Vec<String>> {
    let mut seen = HashSet::with_capacity(files.len());
    let mut names = Vec::with_capacity(files.len());

    for (index, attachment) in files.iter().enumerate() {
        let name = file_name(attachment, index, start_offset)?;
        if name.is_empty() {
            return Err(Error::invalid_input()
                .with_message(format!("attachment at index {index} has an empty file name")));
        }
        if !seen.insert(name.clone()) {
            return Err(Error::duplicate_file_name(name));
        }
        names.push(name);
    }

    Ok(names)
}

/// Path of a file inside the uploaded pseudo-directory.
pub fn batch_path(file_name: &str) -> String {
    format!("{BATCH_DIRECTORY}/{file_name}")
}

/// Strips directory components, accepting both separators.
fn basename(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}
