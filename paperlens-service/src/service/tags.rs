//! Post-processing of raw model output.

use regex::{Captures, Regex};
use std::collections::HashSet;
use std::sync::LazyLock;

/// Reports always carry at least this many topic tags
const MIN_TAGS: usize = 6;
/// and never more than this many
const MAX_TAGS: usize = 8;

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w\S*").expect("word pattern is valid"));

/// Normalize a model-produced tag list.
///
/// Tags are split on commas and newlines, title-cased and kept only when
/// they are 2-4 words long. Duplicates are dropped keeping first
/// occurrence. Short lists are padded with `Research Area N` placeholders
/// and long ones truncated.
pub fn format_tags(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut tags: Vec<String> = raw
        .split([',', '\n'])
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(title_case)
        .filter(|tag| (2..=4).contains(&tag.split_whitespace().count()))
        .filter(|tag| seen.insert(tag.clone()))
        .collect();

    let mut next = tags.len() + 1;
    while tags.len() < MIN_TAGS {
        let generic = format!("Research Area {next}");
        next += 1;
        if seen.insert(generic.clone()) {
            tags.push(generic);
        }
    }

    tags.truncate(MAX_TAGS);
    tags
}

/// Upper-case the first character of each word, lower-case the rest
fn title_case(text: &str) -> String {
    WORD.replace_all(text, |caps: &Captures| {
        let word = &caps[0];
        let mut chars = word.chars();
        match chars.next() {
            Some(first) => first
                .to_uppercase()
                .chain(chars.as_str().to_lowercase().chars())
                .collect::<String>(),
            None => String::new(),
        }
    })
    .into_owned()
}

/// Split multi-line model output into trimmed, non-empty lines
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
