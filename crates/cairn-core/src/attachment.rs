//! Binary and literal values eligible for upload.
//!
//! An [`Attachment`] is decided once, when the caller builds a document or a
//! batch. Traversals never inspect payloads to guess what they are.

use bytes::Bytes;

/// A value that is uploaded as one file of a batch.
///
/// Identity is positional: two byte-identical attachments are two distinct
/// files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    /// Bytes uploaded under an explicit display name.
    ///
    /// Only the basename of `name` is used as the file name.
    Named {
        /// File contents.
        data: Bytes,
        /// Display name, possibly carrying directory components.
        name: String,
    },
    /// Bytes uploaded under a sequential numeric file name.
    Anonymous {
        /// File contents.
        data: Bytes,
        /// Optional extension hint without the leading dot.
        extension: Option<String>,
    },
    /// Text uploaded verbatim under a sequential numeric file name.
    Literal(String),
}

impl Attachment {
    /// Creates a named attachment.
    pub fn named(data: impl Into<Bytes>, name: impl Into<String>) -> Self {
        Self::Named {
            data: data.into(),
            name: name.into(),
        }
    }

    /// Creates an anonymous attachment without an extension hint.
    pub fn anonymous(data: impl Into<Bytes>) -> Self {
        Self::Anonymous {
            data: data.into(),
            extension: None,
        }
    }

    /// Creates an anonymous attachment whose file name keeps the extension of
    /// `file_name`, if it has one.
    ///
    /// This is how a file picked from disk is uploaded: `photo.png` at index 3
    /// becomes `3.png`.
    pub fn from_file(data: impl Into<Bytes>, file_name: &str) -> Self {
        let extension = file_name
            .rfind('.')
            .map(|dot| &file_name[dot + 1..])
            .filter(|ext| !ext.is_empty() && !ext.contains(['/', '\\']))
            .map(str::to_owned);

        Self::Anonymous {
            data: data.into(),
            extension,
        }
    }

    /// Creates a literal text attachment.
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal(text.into())
    }

    /// Returns the payload that is uploaded for this attachment.
    pub fn body(&self) -> Bytes {
        match self {
            Self::Named { data, .. } | Self::Anonymous { data, .. } => data.clone(),
            Self::Literal(text) => Bytes::from(text.clone()),
        }
    }

    /// Returns the payload size in bytes.
    pub fn len(&self) -> usize {
        match self {
            Self::Named { data, .. } | Self::Anonymous { data, .. } => data.len(),
            Self::Literal(text) => text.len(),
        }
    }

    /// Returns `true` if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the explicit display name, if any.
    pub fn display_name(&self) -> Option<&str> {
        match self {
            Self::Named { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Returns the extension hint, if any.
    pub fn extension(&self) -> Option<&str> {
        match self {
            Self::Anonymous { extension, .. } => extension.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_file_keeps_extension() {
        let attachment = Attachment::from_file(vec![1u8, 2, 3], "photo.final.png");
        assert_eq!(attachment.extension(), Some("png"));
        assert_eq!(attachment.len(), 3);
    }

    #[test]
    fn test_from_file_without_extension() {
        assert_eq!(Attachment::from_file(vec![0u8], "README").extension(), None);
        assert_eq!(Attachment::from_file(vec![0u8], "trailing.").extension(), None);
        assert_eq!(Attachment::from_file(vec![0u8], "dir.d/file").extension(), None);
    }

    #[test]
    fn test_literal_body() {
        let attachment = Attachment::literal("{\"name\":\"a\"}");
        assert_eq!(attachment.body(), Bytes::from_static(b"{\"name\":\"a\"}"));
        assert!(attachment.display_name().is_none());
    }
}
