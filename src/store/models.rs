// SPDX-License-Identifier: GPL-3.0-only
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub type RecordId = i64;

/// Custom field joining a local record to its remote ad
pub const EXTERNAL_ID_FIELD: &str = "_gedeon_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Published,
    Draft,
    Trashed,
}

impl RecordStatus {
    pub const ALL: [RecordStatus; 3] = [Self::Published, Self::Draft, Self::Trashed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::Draft => "draft",
            Self::Trashed => "trashed",
        }
    }
}

impl FromStr for RecordStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "published" => Ok(Self::Published),
            "draft" => Ok(Self::Draft),
            "trashed" => Ok(Self::Trashed),
            other => Err(anyhow::anyhow!("Unknown record status: {}", other)),
        }
    }
}

/// Scalar custom field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// Values that are never stored: false, 0, "" and "0"
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Bool(b) => !b,
            Self::Integer(i) => *i == 0,
            Self::Float(f) => *f == 0.0,
            Self::Text(s) => s.is_empty() || s == "0",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(true) => f.write_str("1"),
            Self::Bool(false) => Ok(()),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Custom fields produced by a mapping. `None` and empty values mean "remove".
pub type Metas = BTreeMap<String, Option<FieldValue>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalRecord {
    pub id: RecordId,
    pub record_type: String,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub author_id: Option<i64>,

    /// Stored values per key, in insertion order
    pub custom_fields: BTreeMap<String, Vec<String>>,
}

impl LocalRecord {
    /// First stored value of a custom field
    pub fn field(&self, key: &str) -> Option<&str> {
        self.custom_fields
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn external_id(&self) -> Option<&str> {
        self.field(EXTERNAL_ID_FIELD).filter(|id| !id.is_empty())
    }
}

/// Content written on create and update. The store stamps the modification time.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDraft {
    pub record_type: String,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub author_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: RecordId,
    pub parent_id: RecordId,
    pub name: String,
    pub title: String,
    pub position: i64,
    pub mime_type: String,
    pub location: String,
    pub modified_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AttachmentDraft {
    pub parent_id: RecordId,
    pub name: String,
    pub title: String,
    pub position: i64,
    pub mime_type: String,
    pub content: Vec<u8>,
}

/// Partial attachment update; `None` leaves the attribute untouched
#[derive(Debug, Clone, Default)]
pub struct AttachmentUpdate {
    pub title: Option<String>,
    pub position: Option<i64>,
    pub content: Option<Vec<u8>>,
    /// Format of the new content, when it replaces the old one
    pub mime_type: Option<String>,
}
