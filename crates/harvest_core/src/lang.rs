//! Language detection for harvested pages.
//!
//! Detection prefers an explicit `lang` attribute on the page; this module
//! normalizes such attributes and provides the stop-word frequency fallback
//! that decides between two configured candidate languages when the page
//! declares nothing.

use std::collections::HashSet;

/// One candidate language: its ISO 639-1 code and a stop-word list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LangProfile {
    /// Two-letter lowercase language code.
    pub code: String,
    /// Common function words of the language, lowercase.
    pub stop_words: Vec<String>,
}

impl LangProfile {
    /// Builds a profile from a code and a word list.
    pub fn new(code: impl Into<String>, stop_words: &[&str]) -> Self {
        Self {
            code: code.into(),
            stop_words: stop_words.iter().map(|w| w.to_string()).collect(),
        }
    }
}

/// The two candidate languages the fallback heuristic decides between.
///
/// The primary language doubles as the default: it is reported whenever
/// neither candidate's stop words show up in the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LangConfig {
    /// Preferred candidate, reported on ties and on no signal.
    pub primary: LangProfile,
    /// Second candidate, reported only on strictly more hits.
    pub secondary: LangProfile,
}

impl Default for LangConfig {
    fn default() -> Self {
        Self {
            primary: LangProfile::new(
                "de",
                &[
                    "der", "die", "das", "und", "ist", "nicht", "mit", "für", "auf", "von",
                    "den", "dem", "ein", "eine", "sich", "auch", "werden", "oder", "wird",
                    "bei",
                ],
            ),
            secondary: LangProfile::new(
                "en",
                &[
                    "the", "and", "for", "with", "that", "this", "from", "are", "was",
                    "have", "not", "you", "but", "all", "can", "will", "has", "they",
                    "which", "their",
                ],
            ),
        }
    }
}

/// Picks a language code for the given text by stop-word frequency.
///
/// Counts whole-word stop-word hits for both candidates over the lowercased
/// text; the secondary language wins only with strictly more hits.
pub fn detect_language(text: &str, config: &LangConfig) -> String {
    let primary: HashSet<&str> = config.primary.stop_words.iter().map(String::as_str).collect();
    let secondary: HashSet<&str> = config
        .secondary
        .stop_words
        .iter()
        .map(String::as_str)
        .collect();

    let mut primary_hits = 0usize;
    let mut secondary_hits = 0usize;
    for token in text.split(|c: char| !c.is_alphanumeric()) {
        if token.is_empty() {
            continue;
        }
        let token = token.to_lowercase();
        if primary.contains(token.as_str()) {
            primary_hits += 1;
        }
        if secondary.contains(token.as_str()) {
            secondary_hits += 1;
        }
    }

    if secondary_hits > primary_hits {
        config.secondary.code.clone()
    } else {
        config.primary.code.clone()
    }
}

/// Normalizes a `lang` attribute value to a bare ISO 639-1 code.
///
/// Takes the primary subtag of values like `de-DE`, `en_US`, or `fra` and
/// keeps its first two characters, lowercased. A declared attribute beats
/// the heuristic even when it only approximates a 639-1 code, so three
/// letter tags map to their leading pair. Returns `None` when the subtag
/// does not start with two ASCII letters.
pub fn normalize_lang_attr(attr: &str) -> Option<String> {
    let subtag = attr
        .trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default();
    let mut chars = subtag.chars();
    let (first, second) = (chars.next()?, chars.next()?);
    if first.is_ascii_alphabetic() && second.is_ascii_alphabetic() {
        Some(
            [first.to_ascii_lowercase(), second.to_ascii_lowercase()]
                .into_iter()
                .collect(),
        )
    } else {
        None
    }
}
