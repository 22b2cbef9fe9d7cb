//! Approximate string matching for origin inference.
//!
//! The similarity measure is the longest-common-substring ratio: the
//! length of the longest substring shared by the candidate value and a
//! response body, divided by the value's length.

/// Longest common substring of two strings, with its byte position in the
/// haystack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubstringMatch {
    pub len: usize,
    pub haystack_start: usize,
}

/// Rolling dynamic program over bytes: O(needle) memory,
/// O(needle · haystack) time.
pub fn longest_common_substring(needle: &str, haystack: &str) -> SubstringMatch {
    let n = needle.as_bytes();
    let h = haystack.as_bytes();
    if n.is_empty() || h.is_empty() {
        return SubstringMatch::default();
    }

    let mut prev = vec![0usize; n.len() + 1];
    let mut cur = vec![0usize; n.len() + 1];
    let mut best = SubstringMatch::default();

    for (j, &hb) in h.iter().enumerate() {
        for (i, &nb) in n.iter().enumerate() {
            cur[i + 1] = if nb == hb { prev[i] + 1 } else { 0 };
            if cur[i + 1] > best.len {
                best = SubstringMatch {
                    len: cur[i + 1],
                    haystack_start: j + 1 - cur[i + 1],
                };
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    best
}

/// Fraction of `value` covered by its longest common substring with `text`,
/// together with the match itself.
pub fn overlap_ratio(value: &str, text: &str) -> (f64, SubstringMatch) {
    if value.is_empty() {
        return (0.0, SubstringMatch::default());
    }
    let m = longest_common_substring(value, text);
    (m.len as f64 / value.len() as f64, m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_containment() {
        let m = longest_common_substring("token", "xx token yy");
        assert_eq!(m.len, 5);
        assert_eq!(m.haystack_start, 3);
        let m = longest_common_substring("token", "token");
        assert_eq!(m.len, 5);
        assert_eq!(m.haystack_start, 0);
    }

    #[test]
    fn test_partial_overlap() {
        let m = longest_common_substring("Bearer SECRET123", "{\"t\":\"SECRET123\"}");
        assert_eq!(m.len, "SECRET123".len());
        assert_eq!(m.haystack_start, 6);
    }

    #[test]
    fn test_no_overlap() {
        let m = longest_common_substring("abc", "xyz");
        assert_eq!(m.len, 0);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(longest_common_substring("", "abc").len, 0);
        assert_eq!(longest_common_substring("abc", "").len, 0);
    }

    #[test]
    fn test_overlap_ratio() {
        let (ratio, m) = overlap_ratio("abcdefgh", "xxxabcdyyy");
        assert!((ratio - 0.5).abs() < 1e-9);
        assert_eq!(m.len, 4);
        assert_eq!(m.haystack_start, 3);

        let (ratio, _) = overlap_ratio("", "anything");
        assert_eq!(ratio, 0.0);
    }
}
