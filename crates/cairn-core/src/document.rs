//! Metadata documents with embedded attachments.
//!
//! A [`Document`] is a JSON-like tree whose leaves may be [`Attachment`]s.
//! Map keys keep insertion order, so two traversals of an unmutated document
//! visit attachments in the same order. The collect, upload and stitch steps
//! of a publish rely on that.

use indexmap::IndexMap;
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value};

use crate::attachment::Attachment;
use crate::error::{Error, Result};

/// Insertion-ordered map of document fields.
pub type Fields = IndexMap<String, Document>;

/// A metadata tree of maps, sequences, scalars and attachment leaves.
///
/// # Examples
///
/// ```rust,ignore
/// use cairn_core::{Attachment, Document};
///
/// let doc = Document::map()
///     .with("name", "NFT 1")
///     .with("image", Attachment::anonymous(vec![0u8; 10]));
/// assert_eq!(doc.attachment_count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Document {
    /// JSON `null`.
    #[default]
    Null,
    /// JSON boolean.
    Bool(bool),
    /// JSON number.
    Number(Number),
    /// JSON string. Never uploaded.
    String(String),
    /// Ordered sequence.
    Array(Vec<Document>),
    /// Map with insertion-ordered keys.
    Map(Fields),
    /// Binary or literal value to be uploaded and replaced by its URI.
    Attachment(Attachment),
}

impl Document {
    /// Creates an empty map document.
    pub fn map() -> Self {
        Self::Map(Fields::new())
    }

    /// Inserts a field, turning `self` into a map if it is not one already.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Document>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts a field, turning `self` into a map if it is not one already.
    ///
    /// Replacing an existing key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Document>) {
        if !matches!(self, Self::Map(_)) {
            *self = Self::map();
        }
        if let Self::Map(fields) = self {
            fields.insert(key.into(), value.into());
        }
    }

    /// Returns the value stored under `key` if this is a map.
    pub fn get(&self, key: &str) -> Option<&Document> {
        match self {
            Self::Map(fields) => fields.get(key),
            _ => None,
        }
    }

    /// Returns the string value if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the attachment if this is an attachment leaf.
    pub fn as_attachment(&self) -> Option<&Attachment> {
        match self {
            Self::Attachment(attachment) => Some(attachment),
            _ => None,
        }
    }

    /// Counts attachment leaves reachable from this node.
    pub fn attachment_count(&self) -> usize {
        let mut count = 0;
        self.visit_attachments(&mut |_| count += 1);
        count
    }

    /// Returns `true` if no attachment leaf is reachable from this node.
    pub fn is_stitched(&self) -> bool {
        self.attachment_count() == 0
    }

    /// Visits attachment leaves depth-first, left-to-right.
    ///
    /// Sequences are walked in index order and maps in key insertion order.
    pub fn visit_attachments<'a>(&'a self, visit: &mut impl FnMut(&'a Attachment)) {
        match self {
            Self::Attachment(attachment) => visit(attachment),
            Self::Array(items) => items.iter().for_each(|item| item.visit_attachments(visit)),
            Self::Map(fields) => fields
                .values()
                .for_each(|value| value.visit_attachments(visit)),
            Self::Null | Self::Bool(_) | Self::Number(_) | Self::String(_) => {}
        }
    }

    /// Visits attachment slots in the same order as [`Document::visit_attachments`].
    ///
    /// The callback receives the slot holding the attachment so it can be
    /// replaced in place. Traversal stops at the first error.
    pub fn visit_attachment_slots(
        &mut self,
        visit: &mut impl FnMut(&mut Document) -> Result<()>,
    ) -> Result<()> {
        match self {
            Self::Attachment(_) => visit(self),
            Self::Array(items) => items
                .iter_mut()
                .try_for_each(|item| item.visit_attachment_slots(visit)),
            Self::Map(fields) => fields
                .values_mut()
                .try_for_each(|value| value.visit_attachment_slots(visit)),
            Self::Null | Self::Bool(_) | Self::Number(_) | Self::String(_) => Ok(()),
        }
    }

    /// Converts a stitched document into a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidInput`](crate::ErrorKind::InvalidInput) if
    /// an attachment leaf is still present.
    pub fn to_json(&self) -> Result<Value> {
        Ok(match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::String(s) => Value::String(s.clone()),
            Self::Array(items) => Value::Array(
                items
                    .iter()
                    .map(Document::to_json)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Self::Map(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(key, value)| Ok((key.clone(), value.to_json()?)))
                    .collect::<Result<serde_json::Map<_, _>>>()?,
            ),
            Self::Attachment(_) => {
                return Err(Error::invalid_input()
                    .with_message("document still contains an unstitched attachment"));
            }
        })
    }

    /// Serializes a stitched document to its canonical JSON text.
    pub fn to_canonical_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_json()?)?)
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (key, value) in fields {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Self::Attachment(_) => Err(S::Error::custom(
                "document still contains an unstitched attachment",
            )),
        }
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Document::from)
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Document::from).collect()),
            Value::Object(fields) => Self::Map(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, Document::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<Attachment> for Document {
    fn from(attachment: Attachment) -> Self {
        Self::Attachment(attachment)
    }
}

impl From<&str> for Document {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Document {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Document {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Document {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<u64> for Document {
    fn from(n: u64) -> Self {
        Self::Number(n.into())
    }
}

impl From<Vec<Document>> for Document {
    fn from(items: Vec<Document>) -> Self {
        Self::Array(items)
    }
}

impl From<Fields> for Document {
    fn from(fields: Fields) -> Self {
        Self::Map(fields)
    }
}
