use std::cmp::Ordering;

use super::normalizer::fold_digits;

/// Comparison key that treats embedded digit runs as numbers.
///
/// `"EMP-2"` orders before `"EMP-10"` because the trailing runs compare as
/// `2 < 10` rather than character by character. Keys that tokenize
/// identically (for example `"EMP-02"` and `"EMP-2"`) fall back to the raw
/// identifier so the order stays total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NaturalKey {
    tokens: Vec<Token>,
    raw: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Token {
    // Digit runs are stored without leading zeros; comparing (len, digits)
    // equals numeric comparison for arbitrarily long runs.
    Number { len: usize, digits: String },
    Text(String),
}

impl NaturalKey {
    pub fn new(identifier: &str) -> Self {
        let folded = fold_digits(identifier.trim());
        let mut tokens = Vec::new();
        let mut current = String::new();
        let mut in_digits = false;

        for ch in folded.chars() {
            let is_digit = ch.is_ascii_digit();
            if !current.is_empty() && is_digit != in_digits {
                tokens.push(Token::from_run(&current, in_digits));
                current.clear();
            }
            in_digits = is_digit;
            current.push(ch);
        }
        if !current.is_empty() {
            tokens.push(Token::from_run(&current, in_digits));
        }

        Self {
            tokens,
            raw: folded,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Token {
    fn from_run(run: &str, digits: bool) -> Self {
        if digits {
            let trimmed = run.trim_start_matches('0');
            Token::Number {
                len: trimmed.len(),
                digits: trimmed.to_string(),
            }
        } else {
            Token::Text(run.to_lowercase())
        }
    }
}

impl Ord for NaturalKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tokens
            .cmp(&other.tokens)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for NaturalKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub fn natural_key(identifier: &str) -> NaturalKey {
    NaturalKey::new(identifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn digit_runs_compare_numerically() {
        assert!(natural_key("EMP-2") < natural_key("EMP-10"));
        assert!(natural_key("a9b") < natural_key("a10a"));
        assert!(natural_key("EMP-10") > natural_key("EMP-9"));
    }

    #[test]
    fn leading_zeros_do_not_change_magnitude() {
        assert!(natural_key("EMP-002") < natural_key("EMP-10"));
        assert_ne!(natural_key("EMP-02"), natural_key("EMP-2"));
    }

    #[test]
    fn persian_digits_sort_like_ascii() {
        assert!(natural_key("EMP-۲") < natural_key("EMP-10"));
    }

    #[test]
    fn numbers_order_before_text_at_the_same_position() {
        assert!(natural_key("1abc") < natural_key("abc"));
    }

    proptest! {
        #[test]
        fn numeric_suffix_order_matches_numeric_order(
            prefix in "[A-Za-z-]{0,6}",
            a in 0u64..1_000_000,
            b in 0u64..1_000_000,
        ) {
            let left = natural_key(&format!("{prefix}{a}"));
            let right = natural_key(&format!("{prefix}{b}"));
            prop_assert_eq!(left.cmp(&right), a.cmp(&b));
        }
    }
}
