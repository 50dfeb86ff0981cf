//! Value types shared by uploaders, the publisher and the gateway resolver.

use derive_more::{AsRef, Deref, Display, From};
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::provider::SignerProvider;

/// URI scheme of content-addressed references.
pub const STORAGE_SCHEME: &str = "storage://";

/// Opaque identifier the storage backend returns for an uploaded batch.
///
/// A CID names a pseudo-directory; individual files are addressed as
/// `storage://{cid}/{file_name}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRef, Deref, Display, From)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Wraps a backend-provided identifier.
    pub fn new(cid: impl Into<String>) -> Self {
        Self(cid.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the directory URI `storage://{cid}/`.
    pub fn base_uri(&self) -> String {
        format!("{STORAGE_SCHEME}{}/", self.0)
    }

    /// Returns the URI of one file inside this directory.
    pub fn file_uri(&self, file_name: &str) -> String {
        format!("{STORAGE_SCHEME}{}/{file_name}", self.0)
    }
}

impl From<&str> for ContentId {
    fn from(cid: &str) -> Self {
        Self(cid.to_owned())
    }
}

/// Outcome of uploading one batch of attachments.
///
/// `file_names[i]` is the name of the i-th submitted attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    /// Identifier of the uploaded pseudo-directory.
    pub cid: ContentId,
    /// File names in submission order.
    pub file_names: Vec<String>,
}

impl BatchResult {
    /// Creates a new batch result.
    pub fn new(cid: impl Into<ContentId>, file_names: Vec<String>) -> Self {
        Self {
            cid: cid.into(),
            file_names,
        }
    }

    /// Returns the directory URI of this batch.
    pub fn base_uri(&self) -> String {
        self.cid.base_uri()
    }

    /// Returns the URIs of every uploaded file in submission order.
    pub fn file_uris(&self) -> Vec<String> {
        self.file_names
            .iter()
            .map(|name| self.cid.file_uri(name))
            .collect()
    }
}

/// Outcome of publishing a batch of metadata items.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResult {
    /// `storage://{cid}/` of the uploaded documents, or empty if nothing was uploaded.
    pub base_uri: String,
    /// One URI per input item, in input order.
    pub metadata_uris: Vec<String>,
}

/// Caller identity forwarded to the storage backend for bookkeeping.
///
/// These values are never used to authorize anything locally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadContext {
    /// Contract the content belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    /// Address of the signer publishing the content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer_address: Option<String>,
}

impl UploadContext {
    /// Creates an anonymous context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the contract address.
    pub fn with_contract(mut self, contract_address: impl Into<String>) -> Self {
        self.contract_address = Some(contract_address.into());
        self
    }

    /// Sets the signer address.
    pub fn with_signer(mut self, signer_address: impl Into<String>) -> Self {
        self.signer_address = Some(signer_address.into());
        self
    }

    /// Builds a context for `contract_address` using whatever signer is connected.
    pub async fn from_signer(
        contract_address: impl Into<String>,
        signer: &dyn SignerProvider,
    ) -> Self {
        Self {
            contract_address: Some(contract_address.into()),
            signer_address: signer.signer_address().await,
        }
    }

    /// Returns the contract address, or an empty string when absent.
    pub fn contract_or_empty(&self) -> &str {
        self.contract_address.as_deref().unwrap_or_default()
    }
}

/// One entry of a metadata publish batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchItem {
    /// An already-published URI, returned unchanged.
    Uri(String),
    /// A document to upload.
    Metadata(Document),
}

impl BatchItem {
    /// Returns the document if this item is structured.
    pub fn as_metadata(&self) -> Option<&Document> {
        match self {
            Self::Metadata(doc) => Some(doc),
            Self::Uri(_) => None,
        }
    }
}

impl From<Document> for BatchItem {
    fn from(doc: Document) -> Self {
        Self::Metadata(doc)
    }
}

impl From<String> for BatchItem {
    fn from(uri: String) -> Self {
        Self::Uri(uri)
    }
}

impl From<&str> for BatchItem {
    fn from(uri: &str) -> Self {
        Self::Uri(uri.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_id_uris() {
        let cid = ContentId::new("bafy123");
        assert_eq!(cid.base_uri(), "storage://bafy123/");
        assert_eq!(cid.file_uri("0"), "storage://bafy123/0");
        assert_eq!(cid.to_string(), "bafy123");
    }

    #[test]
    fn test_batch_result_file_uris() {
        let result = BatchResult::new("cid", vec!["0".into(), "a.png".into()]);
        assert_eq!(result.base_uri(), "storage://cid/");
        assert_eq!(result.file_uris(), ["storage://cid/0", "storage://cid/a.png"]);
    }

    #[test]
    fn test_upload_context_serialization() {
        let ctx = UploadContext::new().with_contract("0xabc");
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json, serde_json::json!({"contractAddress": "0xabc"}));
        assert_eq!(UploadContext::new().contract_or_empty(), "");
    }
}
