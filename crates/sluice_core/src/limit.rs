//! Output limits: clamping caller-supplied caps and truncating content.

use serde::{Deserialize, Serialize};

/// Clamp a caller-supplied row or result limit.
///
/// A missing or non-positive value falls back to `default`; anything above
/// `max` is cut down to `max`.
#[must_use]
pub fn clamp_limit(requested: Option<i64>, default: u64, max: u64) -> u64 {
    let default = default.min(max);
    match requested {
        Some(n) if n > 0 => (n as u64).min(max),
        _ => default,
    }
}

/// Text cut to a character budget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Truncated {
    /// Returned text
    pub content: String,
    /// Whether anything was dropped
    pub truncated: bool,
    /// Characters in the returned text
    pub returned_chars: usize,
    /// Characters in the full text
    pub total_chars: usize,
}

impl Truncated {
    /// Convert to a JSON payload
    #[must_use]
    pub fn into_payload(self) -> serde_json::Value {
        serde_json::json!({
            "content": self.content,
            "truncated": self.truncated,
            "returned_chars": self.returned_chars,
            "total_chars": self.total_chars,
        })
    }
}

/// Keep at most `max_chars` characters of `text`
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> Truncated {
    let total_chars = text.chars().count();
    if total_chars <= max_chars {
        return Truncated {
            content: text.to_string(),
            truncated: false,
            returned_chars: total_chars,
            total_chars,
        };
    }

    let cut = text
        .char_indices()
        .nth(max_chars)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    Truncated {
        content: text[..cut].to_string(),
        truncated: true,
        returned_chars: max_chars,
        total_chars,
    }
}

/// Keep at most `max` items; reports whether any were dropped
#[must_use]
pub fn truncate_items<T>(mut items: Vec<T>, max: usize) -> (Vec<T>, bool) {
    if items.len() > max {
        items.truncate(max);
        (items, true)
    } else {
        (items, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_clamp_limit_defaults() {
        assert_eq!(clamp_limit(None, 1000, 10_000), 1000);
        assert_eq!(clamp_limit(Some(0), 1000, 10_000), 1000);
        assert_eq!(clamp_limit(Some(-5), 1000, 10_000), 1000);
    }

    #[test]
    fn test_clamp_limit_caps() {
        assert_eq!(clamp_limit(Some(50), 1000, 10_000), 50);
        assert_eq!(clamp_limit(Some(1_000_000), 1000, 10_000), 10_000);
        assert_eq!(clamp_limit(None, 50_000, 10_000), 10_000);
    }

    #[test]
    fn test_truncate_chars_short_text() {
        let t = truncate_chars("hello", 10);
        assert_eq!(t.content, "hello");
        assert!(!t.truncated);
        assert_eq!(t.total_chars, 5);
    }

    #[test]
    fn test_truncate_chars_long_text() {
        let t = truncate_chars("hello world", 5);
        assert_eq!(t.content, "hello");
        assert!(t.truncated);
        assert_eq!(t.returned_chars, 5);
        assert_eq!(t.total_chars, 11);
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        let t = truncate_chars("héllo", 2);
        assert_eq!(t.content, "hé");
        assert!(t.truncated);
    }

    #[test]
    fn test_truncate_items() {
        let (rows, truncated) = truncate_items(vec![1, 2, 3, 4], 2);
        assert_eq!(rows, vec![1, 2]);
        assert!(truncated);

        let (rows, truncated) = truncate_items(vec![1, 2], 2);
        assert_eq!(rows, vec![1, 2]);
        assert!(!truncated);
    }

    proptest! {
        #[test]
        fn prop_truncate_exact_length(text in ".{0,200}", max in 0usize..250) {
            let total = text.chars().count();
            let t = truncate_chars(&text, max);
            if max < total {
                prop_assert!(t.truncated);
                prop_assert_eq!(t.content.chars().count(), max);
            } else {
                prop_assert!(!t.truncated);
                prop_assert_eq!(&t.content, &text);
            }
        }

        #[test]
        fn prop_clamp_never_exceeds_max(requested in proptest::option::of(any::<i64>()), max in 1u64..100_000) {
            let n = clamp_limit(requested, 1000, max);
            prop_assert!(n <= max);
            prop_assert!(n >= 1);
        }
    }
}
