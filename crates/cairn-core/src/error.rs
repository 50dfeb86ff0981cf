//! Structured error handling for publishing and gateway operations.

use strum::{AsRefStr, Display, EnumString, IntoStaticStr};
use thiserror::Error;

/// Type alias for boxed dynamic errors that can be sent across threads.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for Results with our custom Error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Categories of errors that can occur while publishing or resolving content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// A GET failed: transport error, timeout, non-2xx status or exhausted gateways.
    Fetch,
    /// The upload request failed or returned an unparseable envelope.
    Upload,
    /// Two attachments in one batch resolved to the same file name.
    DuplicateFileName,
    /// A referenced content pointer was empty or missing upstream.
    NotFound,
    /// Content was fetched but could not be parsed into the requested shape.
    Parse,
    /// Configuration is invalid.
    Configuration,
    /// Caller supplied invalid input.
    InvalidInput,
    /// Internal invariant violated.
    Internal,
}

impl ErrorKind {
    /// Check if a read failing with this kind may succeed against another gateway.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Fetch)
    }
}

/// Structured error type with classification and context tracking.
#[must_use]
#[derive(Debug, Error)]
#[error("[{kind}]{}", message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Primary error message.
    pub message: Option<String>,
    /// HTTP status returned by the remote side, if any.
    pub status: Option<u16>,
    /// Underlying source error, if any.
    #[source]
    pub source: Option<BoxedError>,
    /// Additional context information.
    pub context: Option<String>,
}

impl Error {
    /// Creates a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            status: None,
            source: None,
            context: None,
        }
    }

    /// Creates a new error from a source error.
    pub fn from_source(kind: ErrorKind, source: impl Into<BoxedError>) -> Self {
        Self::new(kind).with_source(source)
    }

    /// Creates a new fetch error.
    pub fn fetch() -> Self {
        Self::new(ErrorKind::Fetch)
    }

    /// Creates a new upload error.
    pub fn upload() -> Self {
        Self::new(ErrorKind::Upload)
    }

    /// Creates a duplicate file name error naming the offending file.
    pub fn duplicate_file_name(file_name: impl AsRef<str>) -> Self {
        Self::new(ErrorKind::DuplicateFileName).with_message(format!(
            "file name '{}' appears more than once in the batch",
            file_name.as_ref()
        ))
    }

    /// Creates a new not found error.
    pub fn not_found() -> Self {
        Self::new(ErrorKind::NotFound)
    }

    /// Creates a new parse error.
    pub fn parse() -> Self {
        Self::new(ErrorKind::Parse)
    }

    /// Creates a new configuration error.
    pub fn configuration() -> Self {
        Self::new(ErrorKind::Configuration)
    }

    /// Creates a new invalid input error.
    pub fn invalid_input() -> Self {
        Self::new(ErrorKind::InvalidInput)
    }

    /// Creates a new internal error.
    pub fn internal() -> Self {
        Self::new(ErrorKind::Internal)
    }

    /// Adds a message to this error.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Records the HTTP status returned by the remote side.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the source of the error.
    pub fn with_source(mut self, source: impl Into<BoxedError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Adds context to the error.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Check if this error is retryable based on its kind.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::from_source(ErrorKind::Parse, error).with_message("Invalid JSON content")
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(error: std::string::FromUtf8Error) -> Self {
        Self::from_source(ErrorKind::Parse, error).with_message("Invalid UTF-8 encoding")
    }
}

impl From<url::ParseError> for Error {
    fn from(error: url::ParseError) -> Self {
        Self::from_source(ErrorKind::Configuration, error).with_message("Invalid URL")
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_error_new() {
        let error = Error::new(ErrorKind::Upload);
        assert_eq!(error.kind, ErrorKind::Upload);
        assert!(error.message.is_none());
        assert!(error.status.is_none());
        assert!(error.source.is_none());
        assert!(error.context.is_none());
    }

    #[test]
    fn test_error_builder_pattern() {
        let error = Error::upload()
            .with_message("backend rejected batch")
            .with_status(401)
            .with_context("contract 0xabc");

        assert_eq!(error.kind, ErrorKind::Upload);
        assert_eq!(error.message.as_deref(), Some("backend rejected batch"));
        assert_eq!(error.status, Some(401));
        assert_eq!(error.context.as_deref(), Some("contract 0xabc"));
    }

    #[test]
    fn test_error_display() {
        let error = Error::duplicate_file_name("a.png");

        let display_str = error.to_string();
        assert!(display_str.contains("duplicate_file_name"));
        assert!(display_str.contains("a.png"));
    }

    #[test]
    fn test_error_from_json() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error = Error::from(json_error);

        assert_eq!(error.kind, ErrorKind::Parse);
        assert!(error.source.is_some());
    }

    #[test]
    fn test_retryable() {
        assert!(ErrorKind::Fetch.is_retryable());

        assert!(!ErrorKind::Upload.is_retryable());
        assert!(!ErrorKind::Parse.is_retryable());
        assert!(!ErrorKind::NotFound.is_retryable());
        assert!(!ErrorKind::DuplicateFileName.is_retryable());
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            ErrorKind::from_str("not_found").unwrap(),
            ErrorKind::NotFound
        );
        assert_eq!(
            ErrorKind::from_str("duplicate_file_name").unwrap(),
            ErrorKind::DuplicateFileName
        );
        assert!(ErrorKind::from_str("invalid").is_err());
    }
}
