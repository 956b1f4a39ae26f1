//! Text statistics reported alongside the generated analysis.

use std::sync::LazyLock;

use regex::Regex;

/// Parenthetical author-year citations: `(Smith, 2020)`, `(Smith et al., 2020)`
static CITATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(\w+\s*(?:et al\.?)?,\s*\d{4}\)").expect("citation pattern is valid")
});

/// Number of whitespace-separated tokens. Blank text has none.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Number of author-year citations in the text.
pub fn count_citations(text: &str) -> usize {
    CITATION_PATTERN.find_iter(text).count()
}
