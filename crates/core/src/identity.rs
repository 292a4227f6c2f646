//! Test identity extraction from free-text titles.
//!
//! A title carries its identity as bracketed tokens, e.g.
//! `"checkout total [SHOP-T42] [SHOP-R7]"`. When several tokens of the same
//! kind appear, the first one (in order of appearance) wins.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{TestCaseKey, TestCycleKey};

static TEST_CASE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"\[([A-Z]+-T\d+)\]").unwrap()
});

static TEST_CYCLE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"\[([A-Z]+-R\d+)\]").unwrap()
});

/// Keys found in a title. `None` is a signal, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedKeys {
    /// First `[..-T..]` token.
    pub test_case_key: Option<TestCaseKey>,
    /// First `[..-R..]` token.
    pub test_cycle_key: Option<TestCycleKey>,
}

/// Extracts the test case and test cycle keys from `title`.
pub fn extract_keys(title: &str) -> ExtractedKeys {
    ExtractedKeys {
        test_case_key: first_capture(&TEST_CASE_TOKEN, title).map(TestCaseKey::new),
        test_cycle_key: first_capture(&TEST_CYCLE_TOKEN, title).map(TestCycleKey::new),
    }
}

fn first_capture<'a>(re: &Regex, haystack: &'a str) -> Option<&'a str> {
    re.captures(haystack)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_test_case_key_without_brackets() {
        let keys = extract_keys("user can log in [ABC-T123]");
        assert_eq!(keys.test_case_key, Some(TestCaseKey::new("ABC-T123")));
        assert_eq!(keys.test_cycle_key, None);
    }

    #[test]
    fn no_token_is_none() {
        assert_eq!(extract_keys("plain title"), ExtractedKeys::default());
        // unbracketed or lowercase project keys do not count
        assert_eq!(extract_keys("ABC-T1 [abc-T2]").test_case_key, None);
    }

    #[test]
    fn both_kinds_extracted_independently_of_order() {
        let a = extract_keys("[ABC-R9] flow [ABC-T5]");
        let b = extract_keys("[ABC-T5] flow [ABC-R9]");
        assert_eq!(a, b);
        assert_eq!(a.test_case_key.unwrap().as_str(), "ABC-T5");
        assert_eq!(a.test_cycle_key.unwrap().as_str(), "ABC-R9");
    }

    #[test]
    fn first_match_wins() {
        let keys = extract_keys("[ABC-T2] duplicate [ABC-T1] [X-R1] [X-R2]");
        assert_eq!(keys.test_case_key.unwrap().as_str(), "ABC-T2");
        assert_eq!(keys.test_cycle_key.unwrap().as_str(), "X-R1");
    }

    #[test]
    fn kinds_do_not_cross_match() {
        let keys = extract_keys("[ABC-R12]");
        assert_eq!(keys.test_case_key, None);
        assert!(keys.test_cycle_key.is_some());
    }
}
