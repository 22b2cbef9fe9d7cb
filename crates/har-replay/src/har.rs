//! Serde model of the HAR interchange format.
//!
//! The entry list is kept as raw JSON values so a single malformed entry
//! cannot poison the whole document; `normalize` decodes entries one at a
//! time and decides per entry whether a deviation is fatal.

use serde::Deserialize;
use serde_json::Value;

/// A parsed HAR document.
#[derive(Debug, Deserialize)]
pub struct HarDocument {
    pub log: HarLog,
}

#[derive(Debug, Default, Deserialize)]
pub struct HarLog {
    #[serde(default)]
    pub entries: Vec<Value>,
}

impl HarDocument {
    /// Parse a HAR document from JSON text.
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// One capture entry with every field optional; missing pieces default.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawEntry {
    pub started_date_time: Option<String>,
    pub request: Option<RawRequest>,
    pub response: Option<RawResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawRequest {
    pub method: Option<String>,
    pub url: Option<String>,
    pub headers: Vec<RawPair>,
    pub query_string: Vec<RawPair>,
    pub cookies: Vec<RawPair>,
    pub post_data: Option<RawPostData>,
    pub body_size: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawPostData {
    pub mime_type: Option<String>,
    pub text: Option<String>,
    pub params: Option<Vec<RawPair>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawResponse {
    pub status: Option<u16>,
    pub headers: Vec<RawPair>,
    pub content: Option<RawContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawContent {
    pub size: Option<i64>,
    pub mime_type: Option<String>,
    pub text: Option<String>,
}

/// HAR name/value pair, used for headers, cookies, query and form params.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawPair {
    pub name: String,
    pub value: String,
}
