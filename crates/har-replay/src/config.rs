//! Analysis configuration and tuning policy.

use std::collections::BTreeSet;

/// Default minimum value length eligible for origin inference. Shorter
/// values ("true", single digits) produce too many false positives.
pub const DEFAULT_MIN_TOKEN_LEN: usize = 16;

/// Default fraction of a value that must be covered by a common substring
/// for an approximate match to be accepted.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.5;

/// Default cap on response body size searched during inference.
pub const DEFAULT_MAX_SEARCH_BODY_LEN: usize = 100_000;

/// Configuration consumed by the analysis pipeline.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Fail on schema deviations instead of collecting warnings.
    pub strict: bool,
    /// Keep OPTIONS preflight entries instead of filtering them out.
    pub include_options: bool,
    /// Run origin inference; when disabled every value is a literal.
    pub infer_origins: bool,
    /// Keep the Cookie header out of the baseline.
    pub exclude_cookie_headers: bool,
    /// Header names (lowercase) never eligible for the baseline, even when
    /// textually constant across the session.
    pub baseline_exclusions: BTreeSet<String>,
    /// Values shorter than this are never inferred, always literal.
    pub min_token_len: usize,
    /// Minimum longest-common-substring ratio for an approximate match.
    pub match_threshold: f64,
    /// Response bodies longer than this are skipped during inference.
    pub max_search_body_len: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            strict: true,
            include_options: false,
            infer_origins: true,
            exclude_cookie_headers: false,
            baseline_exclusions: BTreeSet::from(["content-length".to_string()]),
            min_token_len: DEFAULT_MIN_TOKEN_LEN,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            max_search_body_len: DEFAULT_MAX_SEARCH_BODY_LEN,
        }
    }
}

impl AnalysisConfig {
    /// Whether a header name may enter the shared baseline.
    pub fn baseline_eligible(&self, name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        if self.baseline_exclusions.contains(&lower) {
            return false;
        }
        if self.exclude_cookie_headers && lower == "cookie" {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_length_excluded_by_default() {
        let config = AnalysisConfig::default();
        assert!(!config.baseline_eligible("Content-Length"));
        assert!(config.baseline_eligible("Accept"));
    }

    #[test]
    fn test_cookie_exclusion_is_opt_in() {
        let mut config = AnalysisConfig::default();
        assert!(config.baseline_eligible("Cookie"));
        config.exclude_cookie_headers = true;
        assert!(!config.baseline_eligible("Cookie"));
        assert!(!config.baseline_eligible("COOKIE"));
    }

    #[test]
    fn test_extra_exclusions() {
        let mut config = AnalysisConfig::default();
        config.baseline_exclusions.insert("x-request-id".to_string());
        assert!(!config.baseline_eligible("X-Request-Id"));
    }
}
