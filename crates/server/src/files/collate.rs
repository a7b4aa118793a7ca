//! Locale-aware name collation and natural ordering.
//!
//! Two orderings live here and stay separate:
//!
//! - [`NameCollator::compare`]: a plain locale-aware comparison of whole
//!   strings. The listing's `name` sort uses this.
//! - [`NameCollator::natural_cmp`]: splits names into digit and non-digit runs
//!   and compares digit runs by numeric value (`file2` < `file10`), the rest
//!   with the collator.

use std::cmp::Ordering;

use icu_collator::{Collator, CollatorOptions, Strength};
use icu_locid::Locale;
use thiserror::Error;

/// Errors that can occur while building a collator.
#[derive(Debug, Error)]
pub enum CollateError {
    /// The locale tag could not be parsed.
    #[error("invalid locale tag: {0}")]
    InvalidLocale(String),

    /// No collation data is available for the locale.
    #[error("collation data unavailable for {locale}: {reason}")]
    Unavailable { locale: String, reason: String },
}

/// Locale-aware string comparator.
pub struct NameCollator {
    collator: Collator,
}

impl NameCollator {
    /// Build a collator for a BCP-47 locale tag such as `ja` or `en-US`.
    pub fn new(locale: &str) -> Result<Self, CollateError> {
        let parsed: Locale = locale
            .parse()
            .map_err(|_| CollateError::InvalidLocale(locale.to_string()))?;

        let mut options = CollatorOptions::new();
        options.strength = Some(Strength::Tertiary);

        let collator = Collator::try_new(&(&parsed).into(), options).map_err(|e| {
            CollateError::Unavailable {
                locale: locale.to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self { collator })
    }

    /// Compare two whole strings by the locale's collation rules.
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        self.collator.compare(a, b)
    }

    /// Natural comparison: digit runs by value, everything else collated.
    ///
    /// Positions past the end of the shorter token list compare as empty
    /// strings. Digit runs that are numerically equal compare equal even if
    /// their text differs (`01` vs `1`).
    pub fn natural_cmp(&self, a: &str, b: &str) -> Ordering {
        let a_tokens = tokenize(a);
        let b_tokens = tokenize(b);
        let len = a_tokens.len().max(b_tokens.len());

        for i in 0..len {
            let a_part = a_tokens.get(i).copied().unwrap_or("");
            let b_part = b_tokens.get(i).copied().unwrap_or("");

            let ordering = if is_digits(a_part) && is_digits(b_part) {
                compare_numeric(a_part, b_part)
            } else {
                self.compare(a_part, b_part)
            };

            if ordering != Ordering::Equal {
                return ordering;
            }
        }

        Ordering::Equal
    }
}

/// Split a string into maximal runs of ASCII digits and non-digits.
///
/// `"file10.txt"` → `["file", "10", ".txt"]`.
pub fn tokenize(s: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_digits = None;

    for (idx, ch) in s.char_indices() {
        let digit = ch.is_ascii_digit();
        match in_digits {
            Some(prev) if prev != digit => {
                tokens.push(&s[start..idx]);
                start = idx;
            }
            _ => {}
        }
        in_digits = Some(digit);
    }

    if start < s.len() {
        tokens.push(&s[start..]);
    }

    tokens
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Compare two digit strings by value, with no width limit.
fn compare_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
