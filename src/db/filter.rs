use super::models::Quote;

/// Selection criteria for quote reads.
///
/// - `tokens`: only pairs whose source AND destination are both in the set
/// - `start`: inclusive lower timestamp bound
/// - `end`: exclusive upper timestamp bound
///
/// An absent or empty token set does not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteFilter {
    pub tokens: Option<Vec<String>>,
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl QuoteFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tokens = Some(tokens.into_iter().map(|t| t.as_ref().to_lowercase()).collect());
        self
    }

    pub fn with_start(mut self, start: i64) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_end(mut self, end: i64) -> Self {
        self.end = Some(end);
        self
    }

    /// The token set, if it constrains the result.
    pub fn token_set(&self) -> Option<&Vec<String>> {
        self.tokens.as_ref().filter(|t| !t.is_empty())
    }

    pub fn matches(&self, quote: &Quote) -> bool {
        if let Some(tokens) = self.token_set() {
            if !tokens.contains(&quote.src) || !tokens.contains(&quote.dst) {
                return false;
            }
        }
        if self.start.is_some_and(|start| quote.timestamp < start) {
            return false;
        }
        if self.end.is_some_and(|end| quote.timestamp >= end) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    fn quote(src: &str, dst: &str, timestamp: i64) -> Quote {
        Quote::new(src, dst, BigInt::from(100), BigInt::from(100), timestamp).unwrap()
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = QuoteFilter::new();
        assert!(filter.matches(&quote("a", "b", i64::MIN)));
        assert!(filter.matches(&quote("x", "y", i64::MAX)));
    }

    #[test]
    fn test_token_set_requires_both_sides() {
        let filter = QuoteFilter::new().with_tokens(["A", "B"]);
        assert!(filter.matches(&quote("a", "b", 0)));
        assert!(filter.matches(&quote("b", "a", 0)));
        assert!(!filter.matches(&quote("a", "c", 0)));
        assert!(!filter.matches(&quote("c", "b", 0)));
    }

    #[test]
    fn test_empty_token_set_does_not_filter() {
        let filter = QuoteFilter::new().with_tokens(Vec::<String>::new());
        assert!(filter.token_set().is_none());
        assert!(filter.matches(&quote("a", "c", 0)));
    }

    #[test]
    fn test_time_range_is_half_open() {
        let filter = QuoteFilter::new().with_start(100).with_end(200);
        assert!(!filter.matches(&quote("a", "b", 99)));
        assert!(filter.matches(&quote("a", "b", 100)));
        assert!(filter.matches(&quote("a", "b", 199)));
        assert!(!filter.matches(&quote("a", "b", 200)));
    }

    #[test]
    fn test_zero_start_still_filters() {
        let filter = QuoteFilter::new().with_start(0);
        assert!(!filter.matches(&quote("a", "b", -1)));
    }
}
