//! Reserved token shape.
//!
//! Every protected occurrence is replaced by `__CWORD_<n>__`. The shape is
//! reserved: ordinary input is not expected to contain it, and
//! [`validate_no_collisions`] flags input that does.

use std::collections::HashSet;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

/// Prefix of every masking token.
pub const TOKEN_PREFIX: &str = "__CWORD_";

/// Suffix of every masking token.
pub const TOKEN_SUFFIX: &str = "__";

// ASCII digits only; `\d` would also accept other Unicode digits.
static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__CWORD_([0-9]+)__").expect("Invalid token pattern"));

/// Build the token for the given index.
#[must_use]
pub fn token_for(index: usize) -> String {
    format!("{TOKEN_PREFIX}{index}{TOKEN_SUFFIX}")
}

/// Parse the index out of a complete token string.
#[must_use]
pub fn token_index(token: &str) -> Option<usize> {
    token
        .strip_prefix(TOKEN_PREFIX)?
        .strip_suffix(TOKEN_SUFFIX)
        .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))?
        .parse()
        .ok()
}

/// Returns `false` if `text` already contains a token-shaped substring.
///
/// Such input may be misread after a mask/unmask round trip. This is an
/// advisory check: masking still proceeds.
#[must_use]
pub fn validate_no_collisions(text: &str) -> bool {
    !TOKEN_PATTERN.is_match(text)
}

/// Byte ranges of every token-shaped substring in `text`.
pub(crate) fn token_spans(text: &str) -> Vec<Range<usize>> {
    TOKEN_PATTERN.find_iter(text).map(|m| m.range()).collect()
}

/// Index digit strings that `text` could complete into a token once a token
/// is placed next to them: every prefix of each digit run after `CWORD_`.
///
/// A token issued with one of these indices could be confused with the
/// token-shaped text formed at its neighbour's edge.
pub(crate) fn claimed_indices(text: &str) -> HashSet<&str> {
    let marker = TOKEN_PREFIX.trim_start_matches('_');
    let mut claimed = HashSet::new();
    for (at, _) in text.match_indices(marker) {
        let rest = &text[at + marker.len()..];
        let run = rest.bytes().take_while(u8::is_ascii_digit).count();
        claimed.extend((1..=run).map(|end| &rest[..end]));
    }
    claimed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_for() {
        assert_eq!(token_for(0), "__CWORD_0__");
        assert_eq!(token_for(42), "__CWORD_42__");
    }

    #[test]
    fn test_token_index_roundtrip() {
        assert_eq!(token_index(&token_for(7)), Some(7));
        assert_eq!(token_index("__CWORD__"), None);
        assert_eq!(token_index("__CWORD_x__"), None);
        assert_eq!(token_index("CWORD_1"), None);
    }

    #[test]
    fn test_validate_no_collisions_flags_token_shape() {
        assert!(!validate_no_collisions("see __CWORD_0__ here"));
        assert!(!validate_no_collisions("__CWORD_123__"));
    }

    #[test]
    fn test_validate_no_collisions_ordinary_text() {
        assert!(validate_no_collisions("An ordinary sentence."));
        assert!(validate_no_collisions("__CWORD__ and __CWORD_a__"));
        assert!(validate_no_collisions(""));
    }

    #[test]
    fn test_non_ascii_digits_are_not_tokens() {
        assert!(validate_no_collisions("__CWORD_\u{0663}__"));
    }

    #[test]
    fn test_token_spans() {
        let text = "a __CWORD_0__ b __CWORD_12__";
        let spans = token_spans(text);
        assert_eq!(spans.len(), 2);
        assert_eq!(&text[spans[0].clone()], "__CWORD_0__");
        assert_eq!(&text[spans[1].clone()], "__CWORD_12__");
    }

    #[test]
    fn test_claimed_indices() {
        let claimed = claimed_indices("x __CWORD_12 and CWORD_7__ and CWORD_ and CWORD_a");
        let mut found: Vec<&str> = claimed.into_iter().collect();
        found.sort_unstable();
        assert_eq!(found, ["1", "12", "7"]);
        assert!(claimed_indices("plain text").is_empty());
    }
}
