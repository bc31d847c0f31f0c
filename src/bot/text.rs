//! Cleaning of incoming message text before it reaches the corpus.

use regex::Regex;
use std::sync::LazyLock;

static EMOJI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x{1F000}-\x{1FFFF}]").expect("emoji regex"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));

static UNDERSCORE_JOIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\p{L}\p{N}])_([\p{L}\p{N}])").expect("underscore regex"));

/// Greetings and farewells that add nothing to the corpus.
const DEFAULT_BOILERPLATE: &[&str] = &[
    r"\bпривет\b",
    r"\bздравствуй\b",
    r"\bпока\b",
    r"\bдосвидания\b",
    r"\bхай\b",
    r"\bхеллоу\b",
    r"\bбай\b",
    r"\bгудбай\b",
];

/// Remove pictographic symbols and trim the result.
pub fn filter_emoji(text: &str) -> String {
    EMOJI.replace_all(text, "").trim().to_string()
}

/// Collapse whitespace and split `word_word` into `word word`.
pub fn normalize(text: &str) -> String {
    let mut out = WHITESPACE.replace_all(text, " ").trim().to_string();
    // Overlapping pairs (a_b_c) need more than one pass.
    while UNDERSCORE_JOIN.is_match(&out) {
        out = UNDERSCORE_JOIN.replace_all(&out, "$1 $2").into_owned();
    }
    out
}

/// Matches greeting/farewell chatter that should not grow the corpus.
#[derive(Debug, Clone)]
pub struct BoilerplateFilter {
    patterns: Vec<Regex>,
}

impl BoilerplateFilter {
    pub fn new(patterns: Vec<Regex>) -> Self {
        Self { patterns }
    }

    /// The built-in list plus `extra`.
    pub fn with_extra(extra: impl IntoIterator<Item = Regex>) -> Self {
        let mut filter = Self::default();
        filter.patterns.extend(extra);
        filter
    }

    pub fn patterns(&self) -> &[Regex] {
        &self.patterns
    }

    pub fn is_boilerplate(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.patterns.iter().any(|p| p.is_match(&lowered))
    }
}

impl Default for BoilerplateFilter {
    fn default() -> Self {
        Self::new(
            DEFAULT_BOILERPLATE
                .iter()
                .map(|p| Regex::new(p).expect("default boilerplate regex"))
                .collect(),
        )
    }
}

/// Filter and normalize `raw`. Returns `None` when nothing worth keeping is left.
pub fn clean_for_corpus(raw: &str, filter: &BoilerplateFilter) -> Option<String> {
    let filtered = filter_emoji(raw);
    if filtered.is_empty() || filter.is_boilerplate(&filtered) {
        return None;
    }
    let normalized = normalize(&filtered);
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}
