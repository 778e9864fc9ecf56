//! Token counting port.
//!
//! The buffer never tokenizes text itself; it asks a [`TokenCounter`]. The
//! BPE-backed implementation lives in `parley-infra`. [`CharEstimateCounter`]
//! is the character heuristic used in tests and as the last-resort fallback.

/// Counts tokens for a given model.
///
/// Implementations must be total: an unknown model falls back to a default
/// encoding instead of failing.
pub trait TokenCounter: Send + Sync {
    fn count(&self, model: &str, text: &str) -> u32;
}

/// Heuristic counter: roughly four characters per token, rounded up.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharEstimateCounter;

impl CharEstimateCounter {
    const CHARS_PER_TOKEN: usize = 4;

    pub fn estimate(text: &str) -> u32 {
        let chars = text.chars().count();
        u32::try_from(chars.div_ceil(Self::CHARS_PER_TOKEN)).unwrap_or(u32::MAX)
    }
}

impl TokenCounter for CharEstimateCounter {
    fn count(&self, _model: &str, text: &str) -> u32 {
        Self::estimate(text)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_estimate_rounds_up() {
        assert_eq!(CharEstimateCounter::estimate(""), 0);
        assert_eq!(CharEstimateCounter::estimate("abc"), 1);
        assert_eq!(CharEstimateCounter::estimate("abcd"), 1);
        assert_eq!(CharEstimateCounter::estimate("abcde"), 2);
    }

    #[test]
    fn test_char_estimate_ignores_model() {
        let counter = CharEstimateCounter;
        assert_eq!(
            counter.count("gpt-4", "hello world"),
            counter.count("no-such-model", "hello world")
        );
    }

    #[test]
    fn test_counts_chars_not_bytes() {
        assert_eq!(CharEstimateCounter::estimate("ééééé"), 2);
    }
}
