//! Data points submitted to a sink

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tag carrying the worker identity on every generated point
pub const WORKER_TAG: &str = "id";

/// Field carrying the generated reading
pub const READING_FIELD: &str = "temperature";

/// A single field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Signed integer
    Integer(i64),
    /// Floating point
    Float(f64),
    /// String
    Text(String),
    /// Boolean
    Bool(bool),
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

/// A measurement reading with its tags and timestamp
///
/// The timestamp is a synthetic index rather than wall-clock time: within one
/// worker every point carries a distinct index, while points from different
/// workers may share one and are told apart by their `id` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    measurement: String,
    tags: BTreeMap<String, String>,
    fields: BTreeMap<String, FieldValue>,
    timestamp: u64,
}

impl DataPoint {
    /// Create a point without tags or fields
    pub fn new(measurement: impl Into<String>, timestamp: u64) -> Self {
        Self {
            measurement: measurement.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            timestamp,
        }
    }

    /// Add a tag
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Add a field
    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Measurement (series) name
    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    /// Tags, sorted by key
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Fields, sorted by key
    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    /// Synthetic timestamp (nanosecond precision on the wire)
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Worker id parsed back from the [`WORKER_TAG`] tag
    pub fn worker_id(&self) -> Option<usize> {
        self.tags.get(WORKER_TAG).and_then(|id| id.parse().ok())
    }
}
