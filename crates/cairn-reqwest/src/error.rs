//! Error types for reqwest-based storage clients.

use cairn_core::ErrorKind;
use thiserror::Error;

/// Result type alias for reqwest operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for reqwest operations.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// A header value could not be built.
    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

impl Error {
    /// Converts into a core error of the given kind, keeping the source.
    pub(crate) fn into_kind(self, kind: ErrorKind) -> cairn_core::Error {
        let message = match &self {
            Error::Reqwest(e) if e.is_timeout() => format!("request timed out: {e}"),
            Error::Reqwest(e) if e.is_connect() => "connection failed".to_owned(),
            other => other.to_string(),
        };

        let status = match &self {
            Error::Reqwest(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        };

        let error = cairn_core::Error::new(kind)
            .with_message(message)
            .with_source(self);
        match status {
            Some(status) => error.with_status(status),
            None => error,
        }
    }
}

impl From<Error> for cairn_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Reqwest(_) => err.into_kind(ErrorKind::Fetch),
            Error::Serde(_) => err.into_kind(ErrorKind::Parse),
            Error::InvalidHeader(_) => err.into_kind(ErrorKind::InvalidInput),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_maps_to_parse() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: cairn_core::Error = Error::from(source).into();
        assert_eq!(error.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_invalid_header_maps_to_invalid_input() {
        let source = reqwest::header::HeaderValue::from_str("bad\nvalue").unwrap_err();
        let error: cairn_core::Error = Error::from(source).into();
        assert_eq!(error.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_into_kind_overrides_kind() {
        let source = serde_json::from_str::<serde_json::Value>("[").unwrap_err();
        let error = Error::from(source).into_kind(ErrorKind::Upload);
        assert_eq!(error.kind(), ErrorKind::Upload);
        assert!(error.source.is_some());
    }
}
