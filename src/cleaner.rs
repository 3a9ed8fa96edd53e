//! Text normalisation for extracted article bodies.
//!
//! Two forms are produced from the same raw text:
//!
//! - [`normalize_for_display`]: lightly cleaned, case and punctuation kept,
//!   suitable for showing to a reader.
//! - [`normalize_for_machine`]: lowercased, de-boilerplated, stopword-free,
//!   lemmatised token stream for the summarisation backend. Idempotent:
//!   re-normalising already-normalised text is a no-op.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    static ref TAG_RE: Regex = Regex::new(r"<[^>]+>").unwrap();
    static ref URL_RE: Regex = Regex::new(r"https?://\S+|www\.\S+").unwrap();
    static ref EMAIL_RE: Regex = Regex::new(r"[\w.+-]+@[\w-]+\.[\w.-]+").unwrap();
    /// Recurring non-article phrases seen on news pages. Matched on word
    /// boundaries, before lowercasing, so the patterns see recognisable text.
    static ref BOILERPLATE_RE: Regex = Regex::new(
        r"(?i)\b(subscribe now|read more|advertisements?|all rights reserved|cookies?|newsletters?|click here|follow us|sign up)\b",
    )
    .unwrap();
    static ref NUM_RE: Regex = Regex::new(r"\d+").unwrap();
    static ref WS_RE: Regex = Regex::new(r"\s+").unwrap();
    static ref STOPWORD_SET: HashSet<&'static str> = STOPWORDS.iter().copied().collect();
}

/// English stopwords, the standard corpus list plus the apostrophe-merged
/// contraction forms that punctuation deletion produces ("don't" -> "dont").
const STOPWORDS: &[&str] = &[
    "about", "above", "after", "again", "against", "all", "and", "any", "are", "arent", "because",
    "been", "before", "being", "below", "between", "both", "but", "cant", "could", "couldnt",
    "did", "didnt", "does", "doesnt", "doing", "dont", "down", "during", "each", "few", "for",
    "from", "further", "had", "hadnt", "has", "hasnt", "have", "havent", "having", "her", "here",
    "hers", "herself", "him", "himself", "his", "how", "into", "isnt", "its", "itself", "just",
    "more", "most", "myself", "nor", "not", "now", "off", "once", "only", "other", "our", "ours",
    "ourselves", "out", "over", "own", "same", "she", "should", "shouldnt", "some", "such", "than",
    "that", "the", "their", "theirs", "them", "themselves", "then", "there", "these", "they",
    "this", "those", "through", "too", "under", "until", "very", "was", "wasnt", "were", "werent",
    "what", "when", "where", "which", "while", "who", "whom", "why", "will", "with", "wont",
    "would", "wouldnt", "you", "your", "yours", "yourself", "yourselves",
];

/// Irregular plurals mapped straight to their singular
const IRREGULAR_PLURALS: &[(&str, &str)] = &[
    ("children", "child"),
    ("feet", "foot"),
    ("geese", "goose"),
    ("knives", "knife"),
    ("lives", "life"),
    ("men", "man"),
    ("mice", "mouse"),
    ("people", "person"),
    ("teeth", "tooth"),
    ("wives", "wife"),
    ("women", "woman"),
];

/// Words ending in "s" that are already singular and must not be stripped
const SINGULAR_S_WORDS: &[&str] = &[
    "analysis", "atlas", "basis", "crisis", "gas", "lens", "mars", "news", "paris", "series",
    "species", "texas", "virus", "yes",
];

/// Lightly clean text for human display: strip markup remnants and URLs,
/// normalise whitespace. Case and punctuation are preserved.
pub fn normalize_for_display(text: &str) -> String {
    let text = TAG_RE.replace_all(text, " ");
    let text = URL_RE.replace_all(&text, " ");
    let text = WS_RE.replace_all(&text, " ");
    text.trim().to_string()
}

/// Reduce text to a lemmatised, stopword-free token stream for the backend.
///
/// Boilerplate phrase removal runs before lowercasing and punctuation
/// stripping so the patterns still match recognisable text. Repeated lines
/// are collapsed to their first occurrence, in order of first appearance.
/// Zero surviving tokens yield an empty string; callers must treat that as
/// having nothing to summarise.
pub fn normalize_for_machine(text: &str) -> String {
    let text = TAG_RE.replace_all(text, " ");
    let text = URL_RE.replace_all(&text, " ");
    let text = EMAIL_RE.replace_all(&text, " ");
    let text = BOILERPLATE_RE.replace_all(&text, " ");

    let text = dedupe_lines(&text);
    let text = text.to_lowercase();
    let text = NUM_RE.replace_all(&text, "");
    let text: String = text.chars().filter(|c| !c.is_ascii_punctuation()).collect();

    let tokens: Vec<String> = text
        .split_whitespace()
        .filter(|token| is_content_token(token))
        .map(lemmatize)
        // lemmatisation can shorten a token back into the filtered range
        .filter(|lemma| is_content_token(lemma))
        .collect();

    tokens.join(" ")
}

/// True for tokens worth keeping: at least 3 chars, purely alphabetic,
/// and not a stopword.
fn is_content_token(token: &str) -> bool {
    token.len() >= 3
        && token.chars().all(|c| c.is_alphabetic())
        && !STOPWORD_SET.contains(token)
}

/// Collapse duplicate lines to their first occurrence, joining the
/// survivors with spaces. Repeated boilerplate blocks collapse to one.
fn dedupe_lines(text: &str) -> String {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut unique: Vec<&str> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed) {
            unique.push(trimmed);
        }
    }

    unique.join(" ")
}

/// Reduce an already-lowercased token to its dictionary base form.
///
/// Rule-based noun lemmatisation, iterated to a fixpoint so possessive
/// leftovers like "childrens" still land on "child". Applying it to its
/// own output is a no-op.
fn lemmatize(token: &str) -> String {
    let mut current = token.to_string();
    loop {
        let next = lemmatize_step(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// One reduction step: irregular plurals first, then ordered suffix rules
fn lemmatize_step(token: &str) -> String {
    if let Ok(idx) = IRREGULAR_PLURALS.binary_search_by_key(&token, |(plural, _)| plural) {
        return IRREGULAR_PLURALS[idx].1.to_string();
    }

    if !token.ends_with('s') || SINGULAR_S_WORDS.contains(&token) {
        return token.to_string();
    }
    // "class", "status", "basis" style endings are not plural markers
    if token.ends_with("ss") || token.ends_with("us") || token.ends_with("is") {
        return token.to_string();
    }

    if token.len() > 4 && token.ends_with("ies") {
        return format!("{}y", &token[..token.len() - 3]);
    }
    for suffix in ["sses", "ches", "shes", "xes", "zes"] {
        if token.ends_with(suffix) {
            return token[..token.len() - 2].to_string();
        }
    }

    token[..token.len() - 1].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_form_strips_markup_and_urls_but_keeps_case() {
        let input = "<p>Breaking: Rover lands!</p> Details at https://example.com/full-story.";
        assert_eq!(
            normalize_for_display(input),
            "Breaking: Rover lands! Details at"
        );
    }

    #[test]
    fn display_form_collapses_whitespace() {
        assert_eq!(normalize_for_display("  a \n\t b  "), "a b");
    }

    #[test]
    fn machine_form_drops_boilerplate_and_stopwords() {
        let input = "Subscribe now! Scientists found water on Mars. Click here for more.";
        assert_eq!(normalize_for_machine(input), "scientist found water mars");
    }

    #[test]
    fn machine_form_is_idempotent() {
        let inputs = [
            "Subscribe now! Scientists found water on Mars. Click here for more.",
            "<h1>Cookies &amp; newsletters</h1> Read more at www.example.com today.",
            "The committees reviewed 45 studies; children's outcomes improved.",
            "Sign the update sheet before leaving.",
            "",
        ];
        for input in inputs {
            let once = normalize_for_machine(input);
            assert_eq!(normalize_for_machine(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn machine_form_tokens_are_clean() {
        let input = "In 2024, 3 rovers sent 10GB of data — e-mail us at tips@example.com!";
        let output = normalize_for_machine(input);
        for token in output.split_whitespace() {
            assert!(token.len() >= 3, "short token {token:?}");
            assert!(
                token.chars().all(|c| c.is_alphabetic() && c.is_lowercase()),
                "dirty token {token:?}"
            );
            assert!(!STOPWORD_SET.contains(token), "stopword {token:?}");
        }
    }

    #[test]
    fn machine_form_of_noise_only_input_is_empty() {
        assert_eq!(normalize_for_machine("Subscribe now! Click here."), "");
        assert_eq!(normalize_for_machine("<div></div> 123 !!!"), "");
        assert_eq!(normalize_for_machine(""), "");
    }

    #[test]
    fn duplicate_lines_collapse_to_first_occurrence() {
        let input = "Scientists celebrate\nShare this story\nScientists celebrate\nShare this story\nRover digs deeper";
        assert_eq!(
            normalize_for_machine(input),
            "scientist celebrate share story rover dig deeper"
        );
    }

    #[test]
    fn lemmatizer_handles_regular_and_irregular_forms() {
        assert_eq!(lemmatize("scientists"), "scientist");
        assert_eq!(lemmatize("stories"), "story");
        assert_eq!(lemmatize("classes"), "class");
        assert_eq!(lemmatize("boxes"), "box");
        assert_eq!(lemmatize("children"), "child");
        assert_eq!(lemmatize("women"), "woman");
        // already singular
        assert_eq!(lemmatize("glass"), "glass");
        assert_eq!(lemmatize("mars"), "mars");
        assert_eq!(lemmatize("news"), "news");
        assert_eq!(lemmatize("water"), "water");
    }
}
