//! Core data types for normalized sessions and request specifications.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// One request or response header. Names compare case-insensitively but
/// keep their original casing for output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderPair {
    pub name: String,
    pub value: String,
}

impl HeaderPair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Case-insensitive name comparison (header names are ASCII).
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Request body of a captured entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestBody {
    /// Decomposable form fields (HAR `postData.params`).
    Form(Vec<(String, String)>),
    /// Opaque body text.
    Text(String),
}

/// Response half of a captured exchange.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub status: u16,
    pub headers: Vec<HeaderPair>,
    pub mime: Option<String>,
    pub body: Option<String>,
}

/// One normalized captured exchange. Immutable once normalization is done;
/// `index` defines chronological order within the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub index: usize,
    pub started: Option<DateTime<FixedOffset>>,
    pub method: String,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
    pub headers: Vec<HeaderPair>,
    pub body: Option<RequestBody>,
    pub response: ResponseRecord,
}

/// Headers carried with an identical value by every request in the session.
/// Order and casing follow the first request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baseline {
    headers: Vec<HeaderPair>,
}

impl Baseline {
    pub fn from_pairs(headers: Vec<HeaderPair>) -> Self {
        Self { headers }
    }

    /// Look up a baseline value by case-insensitive name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.is_named(name))
            .map(|h| h.value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h.is_named(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &HeaderPair> {
        self.headers.iter()
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

/// Where a value was observed inside an earlier response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseLocation {
    /// A complete response header value.
    Header { name: String },
    /// A string leaf of the JSON-parsed body, addressed by key path.
    JsonField { path: Vec<String> },
    /// A byte range of the raw body text.
    BodySpan { start: usize, len: usize },
}

/// Origin of a request value: a plain constant, or data copied from an
/// earlier response in the same session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "origin", content = "value", rename_all = "snake_case")]
pub enum Provenance {
    Literal(String),
    /// `entry` is always strictly smaller than the ordinal of the request
    /// that carries the value.
    FromResponse {
        entry: usize,
        location: ResponseLocation,
        value: String,
    },
}

impl Provenance {
    pub fn value(&self) -> &str {
        match self {
            Provenance::Literal(v) => v,
            Provenance::FromResponse { value, .. } => value,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Provenance::Literal(_))
    }

    /// Ordinal of the response the value was copied from, if any.
    pub fn source_entry(&self) -> Option<usize> {
        match self {
            Provenance::Literal(_) => None,
            Provenance::FromResponse { entry, .. } => Some(*entry),
        }
    }
}

/// Request body with provenance-resolved values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SpecBody {
    Form(Vec<(String, Provenance)>),
    Opaque(Provenance),
}

/// One output unit: a request with baseline headers factored out and every
/// remaining value tagged with its origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestSpec {
    pub index: usize,
    pub method: String,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
    pub headers: Vec<(String, Provenance)>,
    pub body: Option<SpecBody>,
    pub status: u16,
}

/// Result of analyzing a normalized session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionAnalysis {
    pub baseline: Baseline,
    pub requests: Vec<RequestSpec>,
}

/// A schema deviation tolerated in lenient mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeWarning {
    pub entry: usize,
    pub field: String,
    pub message: String,
}

impl NormalizeWarning {
    pub fn new(entry: usize, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            entry,
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors produced by session analysis.
#[derive(thiserror::Error, Debug)]
pub enum AnalysisError {
    #[error("entry {entry}, field `{field}`: {message}")]
    Schema {
        entry: usize,
        field: String,
        message: String,
    },

    #[error("no entries survived normalization")]
    EmptySession,

    #[error("invalid HAR document: {0}")]
    Har(#[from] serde_json::Error),
}

/// Convenience result type.
pub type AnalysisResult<T> = Result<T, AnalysisError>;
