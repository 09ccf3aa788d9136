use std::collections::HashSet;

pub const MIN_CHUNK_CHARS: usize = 50;
pub const MIN_DISTINCT_CHARS: usize = 10;
pub const MIN_ALPHA_RATIO: f64 = 0.3;

// Counts are in chars over the trimmed text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityFilter {
    pub min_chars: usize,
    pub min_distinct_chars: usize,
    pub min_alpha_ratio: f64,
}

impl Default for QualityFilter {
    fn default() -> Self {
        Self {
            min_chars: MIN_CHUNK_CHARS,
            min_distinct_chars: MIN_DISTINCT_CHARS,
            min_alpha_ratio: MIN_ALPHA_RATIO,
        }
    }
}

impl QualityFilter {
    pub fn is_valid(&self, text: &str) -> bool {
        let trimmed = text.trim();
        let length = trimmed.chars().count();
        if length < self.min_chars || length == 0 {
            return false;
        }

        let distinct = trimmed.chars().collect::<HashSet<_>>().len();
        if distinct < self.min_distinct_chars {
            return false;
        }

        let alphabetic = trimmed.chars().filter(|ch| ch.is_alphabetic()).count();
        (alphabetic as f64 / length as f64) >= self.min_alpha_ratio
    }
}

pub fn is_valid(text: &str) -> bool {
    QualityFilter::default().is_valid(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_repeated_characters() {
        assert!(!is_valid(""));
        assert!(!is_valid("   \n\t  "));
        assert!(!is_valid(&"a".repeat(50)));
    }

    #[test]
    fn accepts_ordinary_sentence() {
        assert!(is_valid(
            "The quick brown fox jumps over the lazy dog repeatedly today."
        ));
    }

    #[test]
    fn length_threshold_applies_to_trimmed_text() {
        let fifty = "abcdefghij".repeat(5);
        assert!(is_valid(&fifty));
        assert!(!is_valid(&fifty[..49]));
        assert!(!is_valid(&format!("    {}    ", &fifty[..49])));
    }

    #[test]
    fn distinct_character_threshold() {
        assert!(is_valid(&"abcdefghij".repeat(6)));
        assert!(!is_valid(&"abcdefghi".repeat(7)));
    }

    #[test]
    fn alphabetic_ratio_threshold() {
        let at_ratio = format!("{}{}", "abcdefghij".repeat(3), "0123456789".repeat(7));
        assert_eq!(at_ratio.chars().count(), 100);
        assert!(is_valid(&at_ratio));

        let below_ratio = format!("{}{}1", "abcdefghij".repeat(2) + "abcdefghi", "0123456789".repeat(7));
        assert_eq!(below_ratio.chars().count(), 100);
        assert!(!is_valid(&below_ratio));
    }

    #[test]
    fn counts_characters_not_bytes() {
        let accented = "Ça été très économique à côté de la rivière, même l'été dernier.";
        assert!(is_valid(accented));
    }

    #[test]
    fn thresholds_are_configurable() {
        let lenient = QualityFilter {
            min_chars: 5,
            min_distinct_chars: 3,
            min_alpha_ratio: 0.0,
        };
        assert!(lenient.is_valid("12-34"));
        assert!(!lenient.is_valid("1111"));
    }
}
