//! Title normalization for fuzzy comparison
//!
//! Both sides of every comparison go through [`normalize_title`]. Stored
//! titles are never rewritten; only the compared forms are.

use regex::Regex;
use std::sync::LazyLock;

static LEADING_ARTICLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(the|a|an)\s+").expect("valid article regex"));

static TRAILING_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(\d{4}\)\s*$").expect("valid year regex"));

static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("valid punctuation regex"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Normalize a title for fuzzy comparison.
///
/// - Lowercase and trim
/// - Replace `&` (and `&amp;`) with `and`
/// - Strip one leading article (the, a, an)
/// - Strip a trailing year like `(2014)`
/// - Remove punctuation (Unicode letters, digits and `_` are kept)
/// - Collapse whitespace
///
/// The pipeline is repeated until the output stops changing, so a step that
/// exposes new work for an earlier one (`"'The Wire'"` only loses its article
/// once the quotes are gone) still ends in a canonical form.
pub fn normalize_title(title: &str) -> String {
    let mut current = normalize_once(title);
    loop {
        let next = normalize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn normalize_once(title: &str) -> String {
    let t = title.trim().to_lowercase();
    let t = t.replace("&amp;", "and").replace('&', "and");
    let t = LEADING_ARTICLE.replace(&t, "");
    let t = TRAILING_YEAR.replace(&t, "");
    let t = PUNCTUATION.replace_all(&t, "");
    let t = WHITESPACE.replace_all(&t, " ");
    t.trim().to_string()
}
