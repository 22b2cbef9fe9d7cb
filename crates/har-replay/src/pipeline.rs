//! Analysis pipeline: baseline extraction plus per-request provenance
//! resolution, producing the ordered request specification list.

use crate::baseline::extract_baseline;
use crate::config::AnalysisConfig;
use crate::har::HarDocument;
use crate::inference::OriginResolver;
use crate::normalize::{normalize, NormalizedSession};
use crate::types::{
    AnalysisResult, Entry, RequestBody, RequestSpec, SessionAnalysis, SpecBody,
};

/// Analyze a normalized session.
///
/// One `RequestSpec` per entry, in ordinal order; baseline headers are
/// dropped from each request's local header list and every remaining value
/// is resolved against earlier responses.
pub fn analyze(entries: &[Entry], config: &AnalysisConfig) -> SessionAnalysis {
    let baseline = extract_baseline(entries, config);
    let mut resolver = OriginResolver::new(entries, config);

    let mut requests = Vec::with_capacity(entries.len());
    for entry in entries {
        let headers = entry
            .headers
            .iter()
            .filter(|h| !baseline.contains(&h.name))
            .map(|h| (h.name.clone(), resolver.resolve(&h.value, entry.index)))
            .collect();

        let body = entry.body.as_ref().map(|body| match body {
            RequestBody::Form(fields) => SpecBody::Form(
                fields
                    .iter()
                    .map(|(name, value)| (name.clone(), resolver.resolve(value, entry.index)))
                    .collect(),
            ),
            RequestBody::Text(text) => SpecBody::Opaque(resolver.resolve(text, entry.index)),
        });

        requests.push(RequestSpec {
            index: entry.index,
            method: entry.method.clone(),
            url: entry.url.clone(),
            query: entry.query.clone(),
            cookies: entry.cookies.clone(),
            headers,
            body,
            status: entry.response.status,
        });
    }

    tracing::debug!(
        requests = requests.len(),
        baseline = baseline.len(),
        "session analyzed"
    );
    SessionAnalysis { baseline, requests }
}

/// Parse, normalize, and analyze a HAR document in one call.
pub fn analyze_har(
    json: &str,
    config: &AnalysisConfig,
) -> AnalysisResult<(NormalizedSession, SessionAnalysis)> {
    let doc = HarDocument::parse(json)?;
    let session = normalize(&doc, config)?;
    let analysis = analyze(&session.entries, config);
    Ok((session, analysis))
}
