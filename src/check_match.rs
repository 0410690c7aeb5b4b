//! check-match command: Score one title against candidate titles offline
//!
//! Shows every intermediate score so threshold and guard-rail decisions can
//! be inspected without a Plex server. JSON compact on stdout.

use crate::config::DEFAULT_THRESHOLD;
use crate::matcher::{
    find_best_match, score_normalized, Candidate, ItemKey, MatchResult, GUARD_RAIL_RATIO,
};
use crate::normalize::normalize_title;
use anyhow::Result;
use clap::Args;
use serde::Serialize;

#[derive(Args)]
pub struct CheckMatchArgs {
    /// Title to match
    #[arg(value_name = "TITLE")]
    title: String,

    /// Candidate title (repeat for several)
    #[arg(short, long = "candidate", value_name = "CANDIDATE", required = true)]
    candidates: Vec<String>,

    /// Fuzzy match threshold 0-100
    #[arg(
        short,
        long,
        default_value_t = DEFAULT_THRESHOLD,
        value_parser = clap::value_parser!(u8).range(0..=100)
    )]
    threshold: u8,
}

/// Scores of one candidate
#[derive(Debug, Serialize)]
pub struct CandidateScore {
    pub key: ItemKey,
    pub title: String,
    pub normalized: String,
    pub ratio: u8,
    pub token_sort: u8,
    pub partial: u8,
    pub combined: u8,
}

#[derive(Debug, Serialize)]
pub struct CheckMatchReport {
    pub title: String,
    pub normalized: String,
    pub threshold: u8,
    pub guard_rail: u8,
    pub result: MatchResult,
    pub scores: Vec<CandidateScore>,
}

/// Run the check-match command
pub async fn run_check_match(args: CheckMatchArgs) -> Result<()> {
    let report = check_match(&args.title, &args.candidates, args.threshold);
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}

/// Match `title` against `candidates`, keyed 1..n in the given order.
pub fn check_match(title: &str, candidates: &[String], threshold: u8) -> CheckMatchReport {
    let pool: Vec<Candidate> = candidates
        .iter()
        .enumerate()
        .map(|(i, t)| Candidate::new((i + 1) as u64, t.as_str()))
        .collect();

    let normalized = normalize_title(title);
    let scores = pool
        .iter()
        .map(|c| {
            let candidate_normalized = normalize_title(&c.title);
            let s = score_normalized(&normalized, &candidate_normalized);
            CandidateScore {
                key: c.key.clone(),
                title: c.title.clone(),
                normalized: candidate_normalized,
                ratio: s.ratio,
                token_sort: s.token_sort,
                partial: s.partial,
                combined: s.combined(),
            }
        })
        .collect();

    CheckMatchReport {
        title: title.to_string(),
        normalized,
        threshold,
        guard_rail: GUARD_RAIL_RATIO,
        result: find_best_match(title, &pool, threshold),
        scores,
    }
}
