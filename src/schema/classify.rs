//! Per-column type classification
//!
//! A column is assigned the first type, in priority order, whose grammar
//! matches at least `confidence` of its non-null values:
//!
//! 1. INT64 (no leading zeros, fits in `i64`)
//! 2. BOOL (`true`/`false`/`yes`/`no`, any case)
//! 3. BIGNUMERIC (decimal or scientific notation, INT64 matches excluded)
//! 4. BIGNUMERIC again for INT64 + BIGNUMERIC combined
//! 5. TIMESTAMP
//! 6. DATE
//!
//! Anything else, or fewer than `min_non_null` values, is STRING.
//! Numeric checks never go through floating point.

use super::types::PrimitiveType;
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::LazyLock;

/// Minimum number of non-null values before any type other than STRING is considered
pub const DEFAULT_MIN_NON_NULL: usize = 10;

/// Fraction of non-null values that must match a grammar
pub const DEFAULT_CONFIDENCE: f64 = 0.95;

static DECIMAL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").expect("Invalid decimal regex")
});

static TIMESTAMP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2}|\d{4}/\d{2}/\d{2}) \d{2}:\d{2}:\d{2}(\.\d+)?$")
        .expect("Invalid timestamp regex")
});

static DATE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2}|\d{4}/\d{2}/\d{2})$").expect("Invalid date regex"));

/// Type classifier with configurable thresholds
#[derive(Debug, Clone, Copy)]
pub struct TypeClassifier {
    min_non_null: usize,
    confidence: f64,
}

impl Default for TypeClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeClassifier {
    /// Create a classifier with the default thresholds
    pub fn new() -> Self {
        Self {
            min_non_null: DEFAULT_MIN_NON_NULL,
            confidence: DEFAULT_CONFIDENCE,
        }
    }

    /// Set the minimum non-null value count
    #[must_use]
    pub fn with_min_non_null(mut self, min: usize) -> Self {
        self.min_non_null = min;
        self
    }

    /// Set the confidence threshold (0.0..=1.0)
    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Classify a column from its sampled values
    pub fn classify(&self, values: &[Option<String>]) -> PrimitiveType {
        let candidates: Vec<&str> = values
            .iter()
            .filter_map(|v| v.as_deref())
            .map(str::trim)
            .filter(|v| !is_null_marker(v))
            .collect();

        if candidates.is_empty() || candidates.len() < self.min_non_null {
            return PrimitiveType::String;
        }

        let total = candidates.len();
        let mut ints = 0usize;
        let mut bools = 0usize;
        let mut decimals = 0usize;
        let mut timestamps = 0usize;
        let mut dates = 0usize;

        for value in &candidates {
            if is_int64(value) {
                ints += 1;
            } else if is_decimal(value) {
                decimals += 1;
            } else if is_bool(value) {
                bools += 1;
            } else if is_timestamp(value) {
                timestamps += 1;
            } else if is_date(value) {
                dates += 1;
            }
        }

        let confident = |count: usize| count as f64 / total as f64 >= self.confidence;

        if confident(ints) {
            PrimitiveType::Int64
        } else if confident(bools) {
            PrimitiveType::Bool
        } else if confident(decimals) || confident(ints + decimals) {
            PrimitiveType::BigNumeric
        } else if confident(timestamps) {
            PrimitiveType::Timestamp
        } else if confident(dates) {
            PrimitiveType::Date
        } else {
            PrimitiveType::String
        }
    }
}

/// Classify a column with the default thresholds
pub fn classify(values: &[Option<String>]) -> PrimitiveType {
    TypeClassifier::new().classify(values)
}

/// Empty strings and the literal markers `null` / `none`
pub fn is_null_marker(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.eq_ignore_ascii_case("null") || value.eq_ignore_ascii_case("none")
}

/// Signed 64-bit integer without leading zeros
pub fn is_int64(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return false;
    }
    if digits == "0" && value.starts_with('-') {
        return false;
    }
    value.parse::<i64>().is_ok()
}

/// Case-insensitive `true`, `false`, `yes`, `no`
pub fn is_bool(value: &str) -> bool {
    ["true", "false", "yes", "no"]
        .iter()
        .any(|b| value.eq_ignore_ascii_case(b))
}

/// Decimal or scientific numeral that is not already an INT64
pub fn is_decimal(value: &str) -> bool {
    DECIMAL_REGEX.is_match(value) && !is_int64(value)
}

/// `YYYY-MM-DD HH:MM:SS[.fff]` or with `/` date separators throughout
pub fn is_timestamp(value: &str) -> bool {
    if !TIMESTAMP_REGEX.is_match(value) {
        return false;
    }
    let normalized = value.replace('/', "-");
    NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S%.f").is_ok()
}

/// `YYYY-MM-DD` or `YYYY/MM/DD`
pub fn is_date(value: &str) -> bool {
    if !DATE_REGEX.is_match(value) {
        return false;
    }
    let normalized = value.replace('/', "-");
    NaiveDate::parse_from_str(&normalized, "%Y-%m-%d").is_ok()
}
