//! Value-origin inference: finds where a request value (commonly an
//! authorization token) first appeared among the responses that preceded it.
//!
//! Matching is two-phase. The exact phase scans earlier entries from most
//! recent to oldest for the value as a complete response-header value, a
//! string leaf of the JSON-parsed body, or a raw body substring. Only when
//! nothing matches exactly does the approximate phase score each earlier
//! body by longest-common-substring ratio and accept the best hit above
//! the configured threshold. Inference never errors; a failed search
//! degrades to a literal.

use std::collections::HashMap;

use serde_json::Value;

use crate::config::AnalysisConfig;
use crate::similarity;
use crate::types::{Entry, Provenance, ResponseLocation};

/// Resolves request values against the responses that preceded them.
/// Parsed JSON bodies are cached for the resolver's lifetime.
pub struct OriginResolver<'a> {
    entries: &'a [Entry],
    config: &'a AnalysisConfig,
    parsed_bodies: HashMap<usize, Option<Value>>,
}

impl<'a> OriginResolver<'a> {
    pub fn new(entries: &'a [Entry], config: &'a AnalysisConfig) -> Self {
        Self {
            entries,
            config,
            parsed_bodies: HashMap::new(),
        }
    }

    /// Resolve one value belonging to the request at ordinal `before`.
    ///
    /// Only entries with a strictly smaller ordinal are searched, so a
    /// value can never reference its own or a later response. The most
    /// recent match wins.
    pub fn resolve(&mut self, value: &str, before: usize) -> Provenance {
        if !self.config.infer_origins || value.len() < self.config.min_token_len {
            return Provenance::Literal(value.to_string());
        }

        if let Some((entry, location)) = self.find_exact(value, before) {
            return Provenance::FromResponse {
                entry,
                location,
                value: value.to_string(),
            };
        }
        if let Some((entry, location)) = self.find_approximate(value, before) {
            return Provenance::FromResponse {
                entry,
                location,
                value: value.to_string(),
            };
        }
        Provenance::Literal(value.to_string())
    }

    fn find_exact(&mut self, value: &str, before: usize) -> Option<(usize, ResponseLocation)> {
        let entries = self.entries;
        for j in (0..before.min(entries.len())).rev() {
            for header in &entries[j].response.headers {
                if header.value == value {
                    return Some((
                        j,
                        ResponseLocation::Header {
                            name: header.name.clone(),
                        },
                    ));
                }
            }
            if let Some(path) = self.find_json_leaf(j, |leaf| leaf == value) {
                return Some((j, ResponseLocation::JsonField { path }));
            }
            if let Some(body) = self.searchable_body(j) {
                if let Some(start) = body.find(value) {
                    return Some((
                        j,
                        ResponseLocation::BodySpan {
                            start,
                            len: value.len(),
                        },
                    ));
                }
            }
        }
        None
    }

    fn find_approximate(
        &mut self,
        value: &str,
        before: usize,
    ) -> Option<(usize, ResponseLocation)> {
        let threshold = self.config.match_threshold;
        let mut best: Option<(f64, usize, ResponseLocation)> = None;

        // Most recent first with strictly-greater replacement, so ties
        // keep the most plausible causal source.
        for j in (0..before.min(self.entries.len())).rev() {
            let Some(body) = self.searchable_body(j) else {
                continue;
            };
            // A body shorter than value·threshold can never clear the bar.
            if (body.len() as f64) < value.len() as f64 * threshold {
                continue;
            }
            let (ratio, m) = similarity::overlap_ratio(value, body);
            if ratio > threshold && best.as_ref().map_or(true, |(b, ..)| ratio > *b) {
                best = Some((
                    ratio,
                    j,
                    ResponseLocation::BodySpan {
                        start: m.haystack_start,
                        len: m.len,
                    },
                ));
            }
        }

        let (_, entry, location) = best?;
        // Prefer a structured field address over a raw span when a JSON
        // leaf of the source body accounts for the match.
        if let Some(path) = self.find_json_leaf(entry, |leaf| {
            !leaf.is_empty()
                && value.contains(leaf)
                && leaf.len() as f64 / value.len() as f64 > threshold
        }) {
            return Some((entry, ResponseLocation::JsonField { path }));
        }
        Some((entry, location))
    }

    /// Response body of entry `j`, if present, non-empty, and within the
    /// configured search cap.
    fn searchable_body(&self, j: usize) -> Option<&'a str> {
        let body = self.entries[j].response.body.as_deref()?;
        (!body.is_empty() && body.len() <= self.config.max_search_body_len).then_some(body)
    }

    fn find_json_leaf<F>(&mut self, j: usize, accept: F) -> Option<Vec<String>>
    where
        F: Fn(&str) -> bool,
    {
        let entries = self.entries;
        let cap = self.config.max_search_body_len;
        let parsed = self.parsed_bodies.entry(j).or_insert_with(|| {
            entries[j]
                .response
                .body
                .as_deref()
                .filter(|b| !b.is_empty() && b.len() <= cap)
                .and_then(|b| serde_json::from_str(b).ok())
        });
        let root = parsed.as_ref()?;
        let mut path = Vec::new();
        json_find(root, &accept, &mut path)
    }
}

/// Depth-first search over JSON objects for a string leaf the predicate
/// accepts, returning its key path. Arrays and non-string leaves are
/// skipped, matching the interchange format's typical token placement.
fn json_find<F>(node: &Value, accept: &F, path: &mut Vec<String>) -> Option<Vec<String>>
where
    F: Fn(&str) -> bool,
{
    let map = node.as_object()?;
    for (key, child) in map {
        path.push(key.clone());
        match child {
            Value::String(s) if accept(s) => return Some(path.clone()),
            Value::Object(_) => {
                if let Some(found) = json_find(child, accept, path) {
                    return Some(found);
                }
            }
            _ => {}
        }
        path.pop();
    }
    None
}
