//! Baseline extraction: headers shared by every request in the session.

use crate::config::AnalysisConfig;
use crate::types::{Baseline, Entry};

/// Compute the headers carried with an identical value by every request.
///
/// A candidate must appear exactly once per request with a byte-identical
/// value (names compare case-insensitively). Order and casing follow the
/// first request. Fewer than two requests yield an empty baseline, since
/// there is nothing to factor out.
pub fn extract_baseline(entries: &[Entry], config: &AnalysisConfig) -> Baseline {
    if entries.len() < 2 {
        return Baseline::default();
    }

    let mut shared = Vec::new();
    let mut seen: Vec<String> = Vec::new();
    for header in &entries[0].headers {
        let lower = header.name.to_ascii_lowercase();
        if seen.contains(&lower) {
            continue;
        }
        seen.push(lower);

        if !config.baseline_eligible(&header.name) {
            continue;
        }

        let everywhere = entries.iter().all(|entry| {
            let mut found = entry.headers.iter().filter(|h| h.is_named(&header.name));
            let first = found.next();
            first.map(|h| h.value == header.value).unwrap_or(false) && found.next().is_none()
        });
        if everywhere {
            shared.push(header.clone());
        }
    }

    Baseline::from_pairs(shared)
}
