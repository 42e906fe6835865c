use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Scalar value attached to a document. Nested structures are not stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl MetadataValue {
    /// Converts a JSON scalar. Arrays, objects and nulls yield `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| n.as_f64().map(Self::Float)),
            serde_json::Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

pub type Metadata = BTreeMap<String, MetadataValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    /// Builds a document for an uploaded file under a freshly generated id.
    ///
    /// The upload bookkeeping keys (`filename`, `upload_time`, `content_length`)
    /// always win over caller-supplied metadata with the same name.
    pub fn from_upload(
        filename: impl Into<String>,
        content: impl Into<String>,
        extra: Metadata,
        uploaded_at: DateTime<Utc>,
    ) -> Self {
        let content = content.into();
        let mut metadata = extra;
        metadata.insert("filename".into(), MetadataValue::Text(filename.into()));
        metadata.insert(
            "upload_time".into(),
            MetadataValue::Text(uploaded_at.to_rfc3339_opts(SecondsFormat::Secs, true)),
        );
        metadata.insert(
            "content_length".into(),
            MetadataValue::Integer(content.len() as i64),
        );

        Self {
            id: Uuid::new_v4().to_string(),
            content,
            metadata,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A stored document returned by a nearest-neighbour query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub id: String,
    pub content: String,
    pub metadata: Metadata,
    /// Distance to the query vector; lower is closer.
    pub distance: f32,
}
