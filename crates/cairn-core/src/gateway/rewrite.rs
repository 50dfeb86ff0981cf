//! Rewriting of `storage://` references to gateway URLs.

use serde_json::Value;

use crate::document::Document;
use crate::types::STORAGE_SCHEME;

/// Returns the part after the storage scheme if `uri` starts with it.
///
/// The scheme is matched case-insensitively and only at position zero.
pub fn strip_scheme(uri: &str) -> Option<&str> {
    let prefix = uri.get(..STORAGE_SCHEME.len())?;
    prefix
        .eq_ignore_ascii_case(STORAGE_SCHEME)
        .then(|| &uri[STORAGE_SCHEME.len()..])
}

/// Returns `true` if `uri` is an `http://` or `https://` URL.
pub fn is_http_url(uri: &str) -> bool {
    ["http://", "https://"].iter().any(|scheme| {
        uri.get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

/// Replaces a leading storage scheme with `gateway`.
///
/// Any other string, including one that embeds the scheme later on, is
/// returned unchanged, so applying this twice is the same as applying it once.
pub fn resolve_uri(uri: &str, gateway: &str) -> String {
    match strip_scheme(uri) {
        Some(path) => format!("{gateway}{path}"),
        None => uri.to_owned(),
    }
}

/// Rewrites every string of a JSON value with [`resolve_uri`].
pub fn rewrite_json(value: Value, gateway: &str) -> Value {
    match value {
        Value::String(s) => Value::String(resolve_uri(&s, gateway)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| rewrite_json(item, gateway))
                .collect(),
        ),
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(key, value)| (key, rewrite_json(value, gateway)))
                .collect(),
        ),
        other => other,
    }
}

/// Rewrites every string of a document with [`resolve_uri`].
///
/// Attachment leaves are left in place.
pub fn rewrite_document(document: Document, gateway: &str) -> Document {
    match document {
        Document::String(s) => Document::String(resolve_uri(&s, gateway)),
        Document::Array(items) => Document::Array(
            items
                .into_iter()
                .map(|item| rewrite_document(item, gateway))
                .collect(),
        ),
        Document::Map(fields) => Document::Map(
            fields
                .into_iter()
                .map(|(key, value)| (key, rewrite_document(value, gateway)))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::attachment::Attachment;

    const GATEWAY: &str = "https://gw.example/ipfs/";

    #[test]
    fn test_prefix_is_case_insensitive() {
        assert_eq!(resolve_uri("storage://cid/0", GATEWAY), "https://gw.example/ipfs/cid/0");
        assert_eq!(resolve_uri("STORAGE://cid/0", GATEWAY), "https://gw.example/ipfs/cid/0");
    }

    #[test]
    fn test_embedded_scheme_is_untouched() {
        let uri = "see storage://cid/0";
        assert_eq!(resolve_uri(uri, GATEWAY), uri);
        assert_eq!(resolve_uri("", GATEWAY), "");
        assert_eq!(resolve_uri("stor", GATEWAY), "stor");
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let once = resolve_uri("storage://cid/1.png", GATEWAY);
        assert_eq!(resolve_uri(&once, GATEWAY), once);
        assert!(is_http_url(&once));
    }

    #[test]
    fn test_non_ascii_prefix_boundary() {
        assert_eq!(resolve_uri("ストレージ", GATEWAY), "ストレージ");
    }

    #[test]
    fn test_rewrite_json_recurses() {
        let value = json!({
            "image": "storage://a/0",
            "list": ["storage://b/1", 3, {"deep": "storage://c/2"}],
            "text": "prefix storage://d/3",
        });

        assert_eq!(
            rewrite_json(value, GATEWAY),
            json!({
                "image": "https://gw.example/ipfs/a/0",
                "list": ["https://gw.example/ipfs/b/1", 3, {"deep": "https://gw.example/ipfs/c/2"}],
                "text": "prefix storage://d/3",
            })
        );
    }

    #[test]
    fn test_rewrite_document_keeps_attachments() {
        let doc = Document::map()
            .with("image", "storage://a/0")
            .with("file", Attachment::anonymous(vec![1u8]));

        let rewritten = rewrite_document(doc, GATEWAY);
        assert_eq!(
            rewritten.get("image").and_then(Document::as_str),
            Some("https://gw.example/ipfs/a/0")
        );
        assert!(rewritten.get("file").and_then(Document::as_attachment).is_some());
    }
}
