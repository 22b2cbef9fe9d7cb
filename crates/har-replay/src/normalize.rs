//! Record normalization: raw HAR entries into an ordered `Entry` list.
//!
//! Strict mode turns any structural deviation into a fatal
//! `AnalysisError::Schema`; lenient mode records the same deviations as
//! warnings and keeps whatever can be recovered. An entry is dropped only
//! when no request method/URL is recoverable at all.

use chrono::DateTime;
use serde_json::Value;

use crate::config::AnalysisConfig;
use crate::har::{HarDocument, RawEntry, RawPair};
use crate::types::{
    AnalysisError, AnalysisResult, Entry, HeaderPair, NormalizeWarning, RequestBody,
    ResponseRecord,
};

/// Normalized session: ordered entries plus the deviations tolerated while
/// building them. Warnings are returned, never printed.
#[derive(Debug)]
pub struct NormalizedSession {
    pub entries: Vec<Entry>,
    pub warnings: Vec<NormalizeWarning>,
}

/// Normalize a parsed HAR document into an ordered entry list.
///
/// OPTIONS preflights are filtered out unless configured otherwise, entries
/// are sorted by start time when every entry carries one, and ordinals are
/// re-derived afterwards. Zero surviving entries is fatal.
pub fn normalize(doc: &HarDocument, config: &AnalysisConfig) -> AnalysisResult<NormalizedSession> {
    let mut entries = Vec::with_capacity(doc.log.entries.len());
    let mut warnings = Vec::new();

    for (index, raw) in doc.log.entries.iter().enumerate() {
        if let Some(entry) = normalize_entry(index, raw, config, &mut warnings)? {
            entries.push(entry);
        }
    }

    if !config.include_options {
        entries.retain(|e| !e.method.eq_ignore_ascii_case("OPTIONS"));
    }

    // Sort by capture time only when every entry has a parseable timestamp;
    // a partial sort would scramble the causal order.
    if entries.iter().all(|e| e.started.is_some()) {
        entries.sort_by_key(|e| e.started);
    } else if entries.iter().any(|e| e.started.is_some()) {
        let first_missing = entries
            .iter()
            .find(|e| e.started.is_none())
            .map(|e| e.index)
            .unwrap_or(0);
        warnings.push(NormalizeWarning::new(
            first_missing,
            "startedDateTime",
            "not every entry has a parseable timestamp; keeping capture order",
        ));
    }

    for (index, entry) in entries.iter_mut().enumerate() {
        entry.index = index;
    }

    if entries.is_empty() {
        return Err(AnalysisError::EmptySession);
    }

    tracing::debug!(
        entries = entries.len(),
        warnings = warnings.len(),
        "session normalized"
    );
    Ok(NormalizedSession { entries, warnings })
}

fn normalize_entry(
    index: usize,
    raw: &Value,
    config: &AnalysisConfig,
    warnings: &mut Vec<NormalizeWarning>,
) -> AnalysisResult<Option<Entry>> {
    let entry: RawEntry = match serde_json::from_value(raw.clone()) {
        Ok(entry) => entry,
        Err(e) => {
            deviation(config, warnings, index, "entry", &e.to_string())?;
            return Ok(recover_entry(index, raw, warnings));
        }
    };
    build_entry(index, entry, config, warnings)
}

fn build_entry(
    index: usize,
    entry: RawEntry,
    config: &AnalysisConfig,
    warnings: &mut Vec<NormalizeWarning>,
) -> AnalysisResult<Option<Entry>> {
    let Some(request) = entry.request else {
        deviation(config, warnings, index, "request", "required field missing")?;
        return Ok(None);
    };

    let Some(method) = request.method.filter(|m| !m.is_empty()) else {
        deviation(config, warnings, index, "request.method", "required field missing")?;
        return Ok(None);
    };
    let Some(mut url) = request.url.filter(|u| !u.is_empty()) else {
        deviation(config, warnings, index, "request.url", "required field missing")?;
        return Ok(None);
    };

    // When the capture carries decoded query pairs, prefer them and strip
    // the query component from the URL.
    let query: Vec<(String, String)> = pairs(&request.query_string);
    if !query.is_empty() {
        if let Some((base, _)) = url.split_once('?') {
            url = base.to_string();
        }
    }

    let body = normalize_body(
        index,
        &method,
        request.body_size,
        request.post_data,
        config,
        warnings,
    )?;

    let raw_response = entry.response.unwrap_or_default();
    let content = raw_response.content.unwrap_or_default();
    if content.size.unwrap_or(0) > 0 && content.text.as_deref().unwrap_or("").is_empty() {
        warnings.push(NormalizeWarning::new(
            index,
            "response.content",
            "content size > 0 but text is empty",
        ));
    }
    let response = ResponseRecord {
        status: raw_response.status.unwrap_or(0),
        headers: header_pairs(&raw_response.headers),
        mime: content.mime_type,
        body: content.text,
    };

    let started = match entry.started_date_time.as_deref() {
        None => None,
        Some(s) => match DateTime::parse_from_rfc3339(s) {
            Ok(ts) => Some(ts),
            Err(e) => {
                warnings.push(NormalizeWarning::new(
                    index,
                    "startedDateTime",
                    format!("unparseable timestamp `{s}`: {e}"),
                ));
                None
            }
        },
    };

    Ok(Some(Entry {
        index,
        started,
        method,
        url,
        query,
        cookies: pairs(&request.cookies),
        headers: header_pairs(&request.headers),
        body,
        response,
    }))
}

fn normalize_body(
    index: usize,
    method: &str,
    body_size: Option<i64>,
    post_data: Option<crate::har::RawPostData>,
    config: &AnalysisConfig,
    warnings: &mut Vec<NormalizeWarning>,
) -> AnalysisResult<Option<RequestBody>> {
    let carries_body = matches!(method, "POST" | "PUT") && body_size != Some(0);
    let Some(post_data) = post_data.filter(|_| carries_body) else {
        return Ok(None);
    };

    if post_data.text.is_some() == post_data.params.is_some() {
        deviation(
            config,
            warnings,
            index,
            "request.postData",
            "expected exactly one of `text` or `params`",
        )?;
    }
    // Params win when both are present; neither means no recoverable body.
    if let Some(params) = post_data.params {
        return Ok(Some(RequestBody::Form(pairs(&params))));
    }
    Ok(post_data.text.map(RequestBody::Text))
}

/// Best-effort recovery for an entry that failed structured decoding:
/// dig method and URL out of the raw JSON, drop the entry otherwise.
fn recover_entry(index: usize, raw: &Value, warnings: &mut Vec<NormalizeWarning>) -> Option<Entry> {
    let request = raw.get("request")?;
    let method = request.get("method")?.as_str().filter(|m| !m.is_empty())?;
    let url = request.get("url")?.as_str().filter(|u| !u.is_empty())?;
    warnings.push(NormalizeWarning::new(
        index,
        "entry",
        "recovered method and URL only; other fields defaulted",
    ));
    Some(Entry {
        index,
        started: None,
        method: method.to_string(),
        url: url.to_string(),
        query: Vec::new(),
        cookies: Vec::new(),
        headers: Vec::new(),
        body: None,
        response: ResponseRecord::default(),
    })
}

fn deviation(
    config: &AnalysisConfig,
    warnings: &mut Vec<NormalizeWarning>,
    entry: usize,
    field: &str,
    message: &str,
) -> AnalysisResult<()> {
    if config.strict {
        return Err(AnalysisError::Schema {
            entry,
            field: field.to_string(),
            message: message.to_string(),
        });
    }
    warnings.push(NormalizeWarning::new(entry, field, message));
    Ok(())
}

fn pairs(raw: &[RawPair]) -> Vec<(String, String)> {
    raw.iter().map(|p| (p.name.clone(), p.value.clone())).collect()
}

fn header_pairs(raw: &[RawPair]) -> Vec<HeaderPair> {
    raw.iter().map(|p| HeaderPair::new(&p.name, &p.value)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::har::HarDocument;

    fn lenient() -> AnalysisConfig {
        AnalysisConfig {
            strict: false,
            ..AnalysisConfig::default()
        }
    }

    fn entry_json(method: &str, url: &str) -> String {
        format!(
            r#"{{"startedDateTime":"2024-01-01T00:00:00Z",
                "request":{{"method":"{method}","url":"{url}","headers":[],"queryString":[],"cookies":[],"bodySize":0}},
                "response":{{"status":200,"headers":[],"content":{{"size":0}}}}}}"#
        )
    }

    fn doc_of(entries: &[String]) -> HarDocument {
        let json = format!(r#"{{"log":{{"entries":[{}]}}}}"#, entries.join(","));
        HarDocument::parse(&json).unwrap()
    }

    #[test]
    fn test_basic_normalization() {
        let doc = doc_of(&[entry_json("GET", "https://example.com/a")]);
        let session = normalize(&doc, &AnalysisConfig::default()).unwrap();
        assert_eq!(session.entries.len(), 1);
        assert_eq!(session.entries[0].method, "GET");
        assert_eq!(session.entries[0].response.status, 200);
        assert!(session.warnings.is_empty());
    }

    #[test]
    fn test_options_filtered_and_ordinals_rederived() {
        let doc = doc_of(&[
            entry_json("GET", "https://example.com/a"),
            entry_json("OPTIONS", "https://example.com/a"),
            entry_json("GET", "https://example.com/b"),
        ]);
        let session = normalize(&doc, &AnalysisConfig::default()).unwrap();
        assert_eq!(session.entries.len(), 2);
        assert_eq!(session.entries[0].index, 0);
        assert_eq!(session.entries[1].index, 1);
        assert_eq!(session.entries[1].url, "https://example.com/b");
    }

    #[test]
    fn test_options_kept_when_configured() {
        let doc = doc_of(&[
            entry_json("GET", "https://example.com/a"),
            entry_json("OPTIONS", "https://example.com/a"),
        ]);
        let config = AnalysisConfig {
            include_options: true,
            ..AnalysisConfig::default()
        };
        let session = normalize(&doc, &config).unwrap();
        assert_eq!(session.entries.len(), 2);
    }

    #[test]
    fn test_missing_method_fatal_in_strict_mode() {
        let doc = doc_of(&[r#"{"request":{"url":"https://example.com"}}"#.to_string()]);
        let err = normalize(&doc, &AnalysisConfig::default()).unwrap_err();
        match err {
            AnalysisError::Schema { entry, field, .. } => {
                assert_eq!(entry, 0);
                assert_eq!(field, "request.method");
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_lenient_mode_recovers_method_and_url() {
        // `headers` has the wrong type, so structured decoding fails.
        let doc = doc_of(&[
            r#"{"request":{"method":"GET","url":"https://example.com","headers":"nope"}}"#
                .to_string(),
            entry_json("GET", "https://example.com/b"),
        ]);
        assert!(normalize(&doc, &AnalysisConfig::default()).is_err());

        let session = normalize(&doc, &lenient()).unwrap();
        assert_eq!(session.entries.len(), 2);
        assert_eq!(session.entries[0].url, "https://example.com");
        assert!(session.entries[0].headers.is_empty());
        assert!(!session.warnings.is_empty());
    }

    #[test]
    fn test_lenient_mode_drops_unrecoverable_entry() {
        let doc = doc_of(&[
            r#"{"request":{"headers":"nope"}}"#.to_string(),
            entry_json("GET", "https://example.com/b"),
        ]);
        let session = normalize(&doc, &lenient()).unwrap();
        assert_eq!(session.entries.len(), 1);
        assert_eq!(session.entries[0].url, "https://example.com/b");
    }

    #[test]
    fn test_empty_session_is_fatal() {
        let doc = doc_of(&[]);
        assert!(matches!(
            normalize(&doc, &AnalysisConfig::default()),
            Err(AnalysisError::EmptySession)
        ));

        // All entries filtered away counts as empty too.
        let doc = doc_of(&[entry_json("OPTIONS", "https://example.com")]);
        assert!(matches!(
            normalize(&doc, &AnalysisConfig::default()),
            Err(AnalysisError::EmptySession)
        ));
    }

    #[test]
    fn test_query_pairs_strip_url_query() {
        let doc = doc_of(&[r#"{
            "request":{"method":"GET","url":"https://example.com/search?q=rust",
                       "queryString":[{"name":"q","value":"rust"}]},
            "response":{"status":200}
        }"#
        .to_string()]);
        let session = normalize(&doc, &AnalysisConfig::default()).unwrap();
        assert_eq!(session.entries[0].url, "https://example.com/search");
        assert_eq!(
            session.entries[0].query,
            vec![("q".to_string(), "rust".to_string())]
        );
    }

    #[test]
    fn test_form_body_decomposed() {
        let doc = doc_of(&[r#"{
            "request":{"method":"POST","url":"https://example.com/login","bodySize":17,
                       "postData":{"mimeType":"application/x-www-form-urlencoded",
                                   "params":[{"name":"user","value":"alice"}]}},
            "response":{"status":200}
        }"#
        .to_string()]);
        let session = normalize(&doc, &AnalysisConfig::default()).unwrap();
        assert_eq!(
            session.entries[0].body,
            Some(RequestBody::Form(vec![(
                "user".to_string(),
                "alice".to_string()
            )]))
        );
    }

    #[test]
    fn test_post_data_with_both_text_and_params_is_strict_error() {
        let doc = doc_of(&[r#"{
            "request":{"method":"POST","url":"https://example.com","bodySize":5,
                       "postData":{"text":"a=b","params":[{"name":"a","value":"b"}]}},
            "response":{"status":200}
        }"#
        .to_string()]);
        assert!(normalize(&doc, &AnalysisConfig::default()).is_err());

        // Lenient mode keeps the entry; params win.
        let session = normalize(&doc, &lenient()).unwrap();
        assert_eq!(
            session.entries[0].body,
            Some(RequestBody::Form(vec![("a".to_string(), "b".to_string())]))
        );
        assert!(!session.warnings.is_empty());
    }

    #[test]
    fn test_entries_sorted_by_start_time() {
        let late = r#"{"startedDateTime":"2024-01-01T00:00:05Z",
            "request":{"method":"GET","url":"https://example.com/late"},
            "response":{"status":200}}"#;
        let early = r#"{"startedDateTime":"2024-01-01T00:00:01Z",
            "request":{"method":"GET","url":"https://example.com/early"},
            "response":{"status":200}}"#;
        let doc = doc_of(&[late.to_string(), early.to_string()]);
        let session = normalize(&doc, &AnalysisConfig::default()).unwrap();
        assert_eq!(session.entries[0].url, "https://example.com/early");
        assert_eq!(session.entries[0].index, 0);
        assert_eq!(session.entries[1].index, 1);
    }

    #[test]
    fn test_missing_timestamp_keeps_capture_order() {
        let with_ts = entry_json("GET", "https://example.com/a");
        let without_ts = r#"{"request":{"method":"GET","url":"https://example.com/b"},
            "response":{"status":200}}"#;
        let doc = doc_of(&[with_ts, without_ts.to_string()]);
        let session = normalize(&doc, &AnalysisConfig::default()).unwrap();
        assert_eq!(session.entries[0].url, "https://example.com/a");
        assert!(session
            .warnings
            .iter()
            .any(|w| w.field == "startedDateTime"));
    }

    #[test]
    fn test_content_size_mismatch_is_a_warning() {
        let doc = doc_of(&[r#"{
            "request":{"method":"GET","url":"https://example.com"},
            "response":{"status":200,"content":{"size":10}}
        }"#
        .to_string()]);
        let session = normalize(&doc, &AnalysisConfig::default()).unwrap();
        assert_eq!(session.entries.len(), 1);
        assert!(session
            .warnings
            .iter()
            .any(|w| w.field == "response.content"));
    }
}
