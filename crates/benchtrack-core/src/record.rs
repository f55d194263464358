//! Performance records: the atomic unit persisted into a metrics store.
//!
//! A record carries a single metric readout together with free-form metadata
//! describing the benchmark that produced it. Records are built through the
//! [`PerformanceRecord::latency`] and [`PerformanceRecord::throughput`] factories
//! and flattened with [`PerformanceRecord::as_document`] before indexing.

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::{Map, Number, Value};

use crate::error::{CoreError, CoreResult};

/// Document fields written by every record; metadata may not reuse them.
pub const RESERVED_DOCUMENT_KEYS: [&str; 4] = ["date", "metric", "kind", "value"];

/// What a record's value measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Milliseconds.
    Latency,
    /// Samples per second.
    Throughput,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Latency => "latency",
            Self::Throughput => "throughput",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar metadata value.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl MetaValue {
    fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Integer(i) => Value::Number((*i).into()),
            // Non-finite floats have no JSON representation.
            Self::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Self::String(s) => Value::String(s.clone()),
        }
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for MetaValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<i64> for MetaValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for MetaValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Ordered metadata entries with unique, non-reserved keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Meta {
    entries: Vec<(String, MetaValue)>,
}

impl Meta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    ///
    /// # Errors
    ///
    /// - `CoreError::ReservedMetaKey` if `key` is one of [`RESERVED_DOCUMENT_KEYS`]
    /// - `CoreError::DuplicateMetaKey` if `key` is already present
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> CoreResult<()> {
        let key = key.into();
        if RESERVED_DOCUMENT_KEYS.contains(&key.as_str()) {
            return Err(CoreError::ReservedMetaKey { key });
        }
        if self.contains_key(&key) {
            return Err(CoreError::DuplicateMetaKey { key });
        }
        self.entries.push((key, value.into()));
        Ok(())
    }

    /// Builder form of [`Meta::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> CoreResult<Self> {
        self.insert(key, value)?;
        Ok(self)
    }

    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetaValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Parses `key=value` pairs, splitting on the first `=`.
    pub fn from_pairs<I, S>(pairs: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut meta = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                CoreError::ValidationError(format!("meta `{pair}` is not of the form key=value"))
            })?;
            if key.is_empty() {
                return Err(CoreError::ValidationError(format!(
                    "meta `{pair}` has an empty key"
                )));
            }
            meta.insert(key, value)?;
        }
        Ok(meta)
    }
}

/// A single metric readout, immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceRecord {
    metric: String,
    kind: RecordKind,
    value: f64,
    when: DateTime<Utc>,
    meta: Meta,
}

impl PerformanceRecord {
    fn new(
        metric: impl Into<String>,
        kind: RecordKind,
        value: f64,
        meta: Option<Meta>,
        when: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            metric: metric.into(),
            kind,
            value,
            when: when.unwrap_or_else(Utc::now),
            meta: meta.unwrap_or_default(),
        }
    }

    /// Record tracking a latency, in milliseconds.
    ///
    /// `when` defaults to now.
    pub fn latency(
        metric: impl Into<String>,
        value_ms: f64,
        meta: Option<Meta>,
        when: Option<DateTime<Utc>>,
    ) -> Self {
        Self::new(metric, RecordKind::Latency, value_ms, meta, when)
    }

    /// Record tracking a throughput, in samples per second.
    ///
    /// `when` defaults to now.
    pub fn throughput(
        metric: impl Into<String>,
        value_samples_per_sec: f64,
        meta: Option<Meta>,
        when: Option<DateTime<Utc>>,
    ) -> Self {
        Self::new(metric, RecordKind::Throughput, value_samples_per_sec, meta, when)
    }

    pub fn metric(&self) -> &str {
        &self.metric
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn when(&self) -> DateTime<Utc> {
        self.when
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Epoch seconds with sub-second precision.
    pub fn timestamp(&self) -> f64 {
        self.when.timestamp_micros() as f64 / 1_000_000.0
    }

    /// Flattens the record into a document suitable for indexing.
    ///
    /// The document holds `date` (numeric epoch seconds), `metric`, `kind` and
    /// `value`, followed by every metadata entry.
    pub fn as_document(&self) -> Map<String, Value> {
        let mut doc = Map::new();
        doc.insert(
            "date".to_string(),
            Number::from_f64(self.timestamp()).map_or(Value::Null, Value::Number),
        );
        doc.insert("metric".to_string(), Value::String(self.metric.clone()));
        doc.insert("kind".to_string(), Value::String(self.kind.as_str().to_string()));
        doc.insert(
            "value".to_string(),
            Number::from_f64(self.value).map_or(Value::Null, Value::Number),
        );
        for (key, value) in self.meta.iter() {
            doc.insert(key.to_string(), value.to_json());
        }
        doc
    }
}
