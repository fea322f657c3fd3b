//! 429 / rate-limit classification of backend failure descriptions.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Substrings (matched case-insensitively) that mark a rate-limit condition.
const RATE_LIMIT_INDICATORS: &[&str] = &[
    "rate limit",
    "rate_limit",
    "429",
    "too many requests",
    "quota exceeded",
    "overloaded",
];

/// Explicit-wait extractors, evaluated in order. The first match wins.
const RETRY_HINT_PATTERNS: &[&str] = &[
    r"retry[-_]after[:\s]+(\d+)",
    r"wait\s+(\d+)\s*(?:seconds?|s)",
    r"try again in\s+(\d+)",
    r"(\d+)\s*seconds?\s+(?:before|until)",
];

/// Result of classifying a failure description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RateLimitClass {
    NotRateLimited,
    RateLimited {
        /// Wait recovered from the description; `None` means use the fallback policy.
        retry_after_secs: Option<u64>,
    },
}

impl RateLimitClass {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Classify an opaque failure description.
///
/// Pure and total: anything not recognised is `NotRateLimited`.
pub fn classify_failure(description: &str) -> RateLimitClass {
    let lowered = description.to_lowercase();

    let is_rate_limit = RATE_LIMIT_INDICATORS
        .iter()
        .any(|indicator| lowered.contains(indicator));
    if !is_rate_limit {
        return RateLimitClass::NotRateLimited;
    }

    RateLimitClass::RateLimited {
        retry_after_secs: extract_retry_after(&lowered),
    }
}

fn retry_hint_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        RETRY_HINT_PATTERNS
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect()
    })
}

fn extract_retry_after(lowered: &str) -> Option<u64> {
    retry_hint_patterns().iter().find_map(|pattern| {
        let digits = pattern.captures(lowered)?.get(1)?.as_str();
        // Oversized hints saturate; callers clamp to their maximum wait.
        Some(digits.parse::<u64>().unwrap_or(u64::MAX))
    })
}
