//! Best-match search of a source title against a candidate pool
//!
//! Matching strategy:
//! - `ratio` and `token_sort_ratio` are always computed
//! - `partial_ratio` only counts when the normalized lengths are within 2x,
//!   so short titles cannot match inside unrelated long ones ("kin" inside
//!   "workin moms")
//! - The best candidate is picked by `(combined, ratio)`, so on equal combined
//!   scores the closer exact-order match wins ("Castlevania" over
//!   "Castlevania: Nocturne")
//! - A match is accepted only if the combined score reaches the threshold and
//!   the exact-order ratio reaches [`GUARD_RAIL_RATIO`]

use crate::normalize::normalize_title;
use crate::similarity::{partial_ratio, ratio, token_sort_ratio};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Minimum exact-order ratio for any accepted match, independent of the
/// configured threshold.
pub const GUARD_RAIL_RATIO: u8 = 70;

/// Maximum length ratio between two normalized titles for `partial_ratio`.
const PARTIAL_MAX_LENGTH_RATIO: f64 = 2.0;

/// Stable identity of a catalog item (Plex `ratingKey`).
///
/// Ordered numerically when both keys are integers, lexically otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemKey(pub String);

impl Ord for ItemKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0.parse::<u64>(), other.0.parse::<u64>()) {
            (Ok(a), Ok(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for ItemKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemKey {
    fn from(s: &str) -> Self {
        ItemKey(s.to_string())
    }
}

impl From<String> for ItemKey {
    fn from(s: String) -> Self {
        ItemKey(s)
    }
}

impl From<u64> for ItemKey {
    fn from(n: u64) -> Self {
        ItemKey(n.to_string())
    }
}

/// One item of the live catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub key: ItemKey,
    pub title: String,
}

impl Candidate {
    pub fn new(key: impl Into<ItemKey>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
        }
    }
}

/// Result of matching one source title against the pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub source_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate: Option<Candidate>,
    /// Best combined score found (kept when unmatched, for diagnostics)
    pub score: u8,
    /// Exact-order ratio of the best candidate
    pub ratio: u8,
    pub matched: bool,
    /// Title of the best-scoring candidate, even when it was rejected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closest: Option<String>,
}

impl MatchResult {
    /// Matched candidate's identity, if any
    pub fn key(&self) -> Option<&ItemKey> {
        self.candidate.as_ref().map(|c| &c.key)
    }

    /// Matched candidate's display title, if any
    pub fn matched_title(&self) -> Option<&str> {
        self.candidate.as_ref().map(|c| c.title.as_str())
    }
}

/// The three similarity scores of one comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scores {
    pub ratio: u8,
    pub token_sort: u8,
    pub partial: u8,
}

impl Scores {
    pub fn combined(&self) -> u8 {
        self.ratio.max(self.token_sort).max(self.partial)
    }
}

/// Score two already-normalized titles.
pub fn score_normalized(a: &str, b: &str) -> Scores {
    let len_a = a.chars().count();
    let len_b = b.chars().count();

    let partial = if len_a > 0 && len_b > 0 {
        let length_ratio = len_a.max(len_b) as f64 / len_a.min(len_b) as f64;
        if length_ratio <= PARTIAL_MAX_LENGTH_RATIO {
            partial_ratio(a, b)
        } else {
            0
        }
    } else {
        0
    };

    Scores {
        ratio: ratio(a, b),
        token_sort: token_sort_ratio(a, b),
        partial,
    }
}

/// Candidates sorted by identity with their titles normalized once.
///
/// Scanning in identity order makes true ties resolve to the smallest key,
/// whatever order the catalog returned items in.
pub struct CandidatePool<'a> {
    entries: Vec<(&'a Candidate, String)>,
}

impl<'a> CandidatePool<'a> {
    pub fn new(candidates: &'a [Candidate]) -> Self {
        let mut entries: Vec<(&Candidate, String)> = candidates
            .iter()
            .map(|c| (c, normalize_title(&c.title)))
            .collect();
        entries.sort_by(|a, b| a.0.key.cmp(&b.0.key));
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the best match for `source_title` in this pool.
    pub fn best_match(&self, source_title: &str, threshold: u8) -> MatchResult {
        let normalized = normalize_title(source_title);
        let mut best_score = 0;
        let mut best_ratio = 0;
        let mut best: Option<&Candidate> = None;

        for (candidate, normalized_candidate) in &self.entries {
            let scores = score_normalized(&normalized, normalized_candidate);
            let score = scores.combined();

            if (score, scores.ratio) > (best_score, best_ratio) {
                best_score = score;
                best_ratio = scores.ratio;
                best = Some(*candidate);
            }
        }

        let accepted = best_score >= threshold && best_ratio >= GUARD_RAIL_RATIO;

        match best {
            Some(candidate) if accepted => MatchResult {
                source_title: source_title.to_string(),
                candidate: Some(candidate.clone()),
                score: best_score,
                ratio: best_ratio,
                matched: true,
                closest: Some(candidate.title.clone()),
            },
            _ => MatchResult {
                source_title: source_title.to_string(),
                candidate: None,
                score: best_score,
                ratio: best_ratio,
                matched: false,
                closest: best.map(|c| c.title.clone()),
            },
        }
    }
}

/// Find the best fuzzy match for a title among `candidates`.
pub fn find_best_match(source_title: &str, candidates: &[Candidate], threshold: u8) -> MatchResult {
    CandidatePool::new(candidates).best_match(source_title, threshold)
}

/// Match every title against the pool.
///
/// Results are returned in the order of `titles`.
pub fn match_titles(
    titles: &[String],
    candidates: &[Candidate],
    threshold: u8,
) -> Vec<MatchResult> {
    let pool = CandidatePool::new(candidates);
    titles
        .iter()
        .map(|title| pool.best_match(title, threshold))
        .collect()
}
