//! Mask and unmask protected words.
//!
//! Matching runs longest word first over the progressively masked text, so a
//! protected phrase is consumed before a shorter word inside it can split it,
//! and text already replaced by a token is never matched again.

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use regex::{Regex, RegexBuilder};
use tracing::{debug, trace, warn};

use super::token::{claimed_indices, token_for, token_index, token_spans};
use crate::words::ProtectedWord;

/// One masked occurrence: the token and the exact text it replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskedSpan {
    /// The token inserted into the masked text.
    pub token: String,

    /// The occurrence as it appeared in the source, original casing kept.
    pub original: String,
}

/// Result of masking a piece of text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaskingResult {
    /// Text with every protected occurrence replaced by a token.
    pub masked_text: String,

    /// Token to original pairs, in the order tokens were issued.
    pub mapping: Vec<MaskedSpan>,

    /// Original substrings in the order they were masked.
    pub tokens_used_in_order: Vec<String>,

    /// Number of distinct matchers compiled for this call.
    pub rules_evaluated: usize,
}

impl MaskingResult {
    /// A result that leaves `text` untouched.
    #[must_use]
    pub fn unchanged(text: &str) -> Self {
        Self {
            masked_text: text.to_string(),
            ..Self::default()
        }
    }

    /// Number of masked occurrences.
    #[must_use]
    pub fn match_count(&self) -> usize {
        self.mapping.len()
    }

    /// Whether nothing was masked.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.mapping.is_empty()
    }
}

/// Word characters for whole-word anchoring: letters, digits, underscore.
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn overlaps(range: &Range<usize>, reserved: &[Range<usize>]) -> bool {
    reserved
        .iter()
        .any(|r| range.start < r.end && r.start < range.end)
}

/// Take the next index whose digits the input does not already spell out.
fn next_free_index(next: &mut usize, claimed: &HashSet<&str>) -> usize {
    while claimed.contains(next.to_string().as_str()) {
        *next += 1;
    }
    let index = *next;
    *next += 1;
    index
}

/// Move spans at or after `from` to account for `removed` bytes being
/// replaced by `inserted` bytes just before them.
fn shift_spans(spans: &mut [Range<usize>], from: usize, removed: usize, inserted: usize) {
    for span in spans.iter_mut().filter(|span| span.start >= from) {
        span.start = span.start + inserted - removed;
        span.end = span.end + inserted - removed;
    }
}

/// A compiled rule for one protected word.
#[derive(Debug)]
struct WordMatcher {
    regex: Regex,
    whole_word_only: bool,
}

impl WordMatcher {
    fn build(word: &ProtectedWord) -> std::result::Result<Self, regex::Error> {
        let regex = RegexBuilder::new(&regex::escape(&word.text))
            .case_insensitive(!word.case_sensitive)
            .build()?;
        Ok(Self {
            regex,
            whole_word_only: word.whole_word_only,
        })
    }

    /// Whole-word check on the characters around a match. Anchoring on the
    /// neighbours (not on `\b`) keeps words that start or end with
    /// punctuation, like `C++`, matchable.
    fn is_anchored(&self, text: &str, range: &Range<usize>) -> bool {
        if !self.whole_word_only {
            return true;
        }
        let before = text[..range.start].chars().next_back();
        let after = text[range.end..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    }

    /// All non-overlapping accepted matches, left to right.
    fn find_all(&self, text: &str, reserved: &[Range<usize>]) -> Vec<Range<usize>> {
        let mut found = Vec::new();
        let mut pos = 0;

        while pos <= text.len() {
            let Some(m) = self.regex.find_at(text, pos) else {
                break;
            };
            let range = m.range();
            if range.is_empty() {
                break;
            }

            if self.is_anchored(text, &range) && !overlaps(&range, reserved) {
                pos = range.end;
                found.push(range);
            } else {
                // A rejected candidate may hide an accepted one starting
                // inside it, so resume one character later.
                let step = text[range.start..].chars().next().map_or(1, char::len_utf8);
                pos = range.start + step;
            }
        }

        found
    }
}

/// Matchers compiled during one masking call, keyed by
/// `(text, case_sensitive, whole_word_only)`.
#[derive(Debug, Default)]
struct MatcherCache {
    matchers: HashMap<(String, bool, bool), Option<WordMatcher>>,
}

impl MatcherCache {
    fn get(&mut self, word: &ProtectedWord) -> Option<&WordMatcher> {
        let key = (word.text.clone(), word.case_sensitive, word.whole_word_only);
        self.matchers
            .entry(key)
            .or_insert_with(|| match WordMatcher::build(word) {
                Ok(matcher) => Some(matcher),
                Err(e) => {
                    warn!(word_id = word.id, error = %e, "Skipping unmatchable protected word");
                    None
                }
            })
            .as_ref()
    }

    fn len(&self) -> usize {
        self.matchers.len()
    }
}

/// Replace every protected occurrence in `text` with a unique token.
///
/// Empty text or an empty word list returns the input unchanged without
/// compiling anything. Token indices start at 0 for every call and skip any
/// index whose digits follow `CWORD_` in the input, so an issued token never
/// reappears in token-shaped text formed at another token's edge.
#[must_use]
pub fn mask(text: &str, words: &[ProtectedWord]) -> MaskingResult {
    if text.is_empty() || words.is_empty() {
        return MaskingResult::unchanged(text);
    }

    let mut ordered: Vec<&ProtectedWord> = words.iter().filter(|w| !w.text.is_empty()).collect();
    // Stable: equal lengths keep their configured order.
    ordered.sort_by_key(|w| std::cmp::Reverse(w.char_len()));

    let mut cache = MatcherCache::default();
    let mut masked = text.to_string();
    let mut mapping = Vec::new();
    let mut tokens_used_in_order = Vec::new();
    let mut next_index = 0usize;
    // Issued tokens plus any token-shaped text already in the input. Tracked
    // by position so text that merely abuts a token is never mistaken for it.
    let mut reserved = token_spans(text);
    let claimed = claimed_indices(text);

    for word in ordered {
        let Some(matcher) = cache.get(word) else {
            continue;
        };

        let matches = matcher.find_all(&masked, &reserved);
        if matches.is_empty() {
            continue;
        }
        trace!(word_id = word.id, count = matches.len(), "Protected word matched");

        // Back to front so earlier offsets stay valid.
        for range in matches.into_iter().rev() {
            let original = masked[range.clone()].to_string();
            let token = token_for(next_free_index(&mut next_index, &claimed));
            shift_spans(&mut reserved, range.end, range.len(), token.len());
            reserved.push(range.start..range.start + token.len());
            masked.replace_range(range, &token);
            tokens_used_in_order.push(original.clone());
            mapping.push(MaskedSpan { token, original });
        }
    }

    debug!(
        words = words.len(),
        rules = cache.len(),
        masked = mapping.len(),
        "Masked protected words"
    );

    MaskingResult {
        masked_text: masked,
        mapping,
        tokens_used_in_order,
        rules_evaluated: cache.len(),
    }
}

/// A place in the masked text where a mapped token literally occurs.
#[derive(Debug)]
struct Occurrence {
    entry: usize,
    span: Range<usize>,
    live: bool,
}

/// Every occurrence of each entry's token, overlapping ones included.
fn find_occurrences(text: &str, entries: &[&MaskedSpan]) -> Vec<Occurrence> {
    let mut found = Vec::new();
    for (entry, span) in entries.iter().enumerate() {
        let token = span.token.as_str();
        let step = token.chars().next().map_or(1, char::len_utf8);
        let mut from = 0;
        while let Some(offset) = text[from..].find(token) {
            let start = from + offset;
            found.push(Occurrence {
                entry,
                span: start..start + token.len(),
                live: true,
            });
            from = start + step;
        }
    }
    found
}

/// Restore `pick` and retire every occurrence that conflicts with it.
fn claim(occurrences: &mut [Occurrence], chosen: &mut [Option<usize>], pick: usize) {
    let entry = occurrences[pick].entry;
    let span = occurrences[pick].span.clone();
    chosen[entry] = Some(pick);
    for (i, occurrence) in occurrences.iter_mut().enumerate() {
        if i != pick
            && (occurrence.entry == entry
                || overlaps(&occurrence.span, std::slice::from_ref(&span)))
        {
            occurrence.live = false;
        }
    }
}

/// Put the original text back in place of every token.
///
/// Only the literal tokens in `mapping` are searched for, each is restored at
/// most once, and restored text is never scanned again. Token-like text next
/// to a real token can make occurrences overlap: a token with a single
/// possible place is settled first, and the remaining ones go, in ascending
/// token index, to their leftmost free occurrence. Tokens with no entry, and
/// extra copies of a token, are left verbatim.
#[must_use]
pub fn unmask(masked_text: &str, mapping: &[MaskedSpan]) -> String {
    if masked_text.is_empty() || mapping.is_empty() {
        return masked_text.to_string();
    }

    let mut seen = HashSet::with_capacity(mapping.len());
    let mut entries: Vec<&MaskedSpan> = mapping
        .iter()
        .filter(|span| !span.token.is_empty() && seen.insert(span.token.as_str()))
        .collect();
    entries.sort_by_key(|span| token_index(&span.token).unwrap_or(usize::MAX));

    let mut occurrences = find_occurrences(masked_text, &entries);
    let mut chosen: Vec<Option<usize>> = vec![None; entries.len()];

    loop {
        let mut settled = false;
        for entry in 0..entries.len() {
            if chosen[entry].is_some() {
                continue;
            }
            let mut live = occurrences
                .iter()
                .enumerate()
                .filter(|(_, o)| o.live && o.entry == entry)
                .map(|(i, _)| i);
            if let (Some(only), None) = (live.next(), live.next()) {
                claim(&mut occurrences, &mut chosen, only);
                settled = true;
            }
        }
        if !settled {
            break;
        }
    }

    for entry in 0..entries.len() {
        if chosen[entry].is_none() {
            if let Some(first) = occurrences
                .iter()
                .position(|o| o.live && o.entry == entry)
            {
                claim(&mut occurrences, &mut chosen, first);
            }
        }
    }

    let mut picks: Vec<(Range<usize>, &str)> = chosen
        .iter()
        .flatten()
        .map(|&i| {
            let occurrence = &occurrences[i];
            (
                occurrence.span.clone(),
                entries[occurrence.entry].original.as_str(),
            )
        })
        .collect();
    picks.sort_by_key(|(span, _)| span.start);

    let mut out = String::with_capacity(masked_text.len());
    let mut last = 0;
    for (span, original) in &picks {
        out.push_str(&masked_text[last..span.start]);
        out.push_str(original);
        last = span.end;
    }
    out.push_str(&masked_text[last..]);

    let missing = entries.len() - picks.len();
    let verbatim = occurrences.len() - picks.len();
    if missing > 0 || verbatim > 0 {
        debug!(
            verbatim,
            missing,
            "Unmask found repeated, overlapping or dropped tokens"
        );
    }

    out
}
