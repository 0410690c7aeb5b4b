//! Sync report and its renderings
//!
//! The report is plain data assembled after each pass; rendering is a pure
//! function of it.

use crate::config::SyncMode;
use crate::matcher::MatchResult;
use crate::reconcile::{ApplyOutcome, Delta, FailedMutation, Mutation};
use anyhow::Result;
use serde::Serialize;
use std::fmt::Write;

const RULE_WIDTH: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    #[default]
    Text,
    /// Compact JSON
    Json,
    Yaml,
}

/// A source title without an accepted match
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotFound {
    pub title: String,
    pub best_score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closest: Option<String>,
}

impl From<&MatchResult> for NotFound {
    fn from(result: &MatchResult) -> Self {
        NotFound {
            title: result.source_title.clone(),
            best_score: result.score,
            closest: result.closest.clone(),
        }
    }
}

/// Result of one reconciliation pass against one target
#[derive(Debug, Clone, Serialize)]
pub struct TargetReport {
    pub mode: SyncMode,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub already_synced: Vec<String>,
    /// Source titles whose show was already claimed by another title
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub duplicates: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<FailedMutation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<Mutation>,
    /// The pass could not start (snapshot failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TargetReport {
    pub fn from_pass(mode: SyncMode, delta: &Delta, outcome: &ApplyOutcome) -> Self {
        TargetReport {
            mode,
            added: outcome.added.iter().map(|c| c.title.clone()).collect(),
            removed: outcome.removed.iter().map(|c| c.title.clone()).collect(),
            already_synced: delta
                .already_synced
                .iter()
                .filter_map(|r| r.matched_title().map(str::to_string))
                .collect(),
            duplicates: delta.duplicates.iter().map(|r| r.source_title.clone()).collect(),
            failed: outcome.failed.clone(),
            skipped: outcome.skipped.clone(),
            error: None,
        }
    }

    pub fn aborted(mode: SyncMode, error: String) -> Self {
        TargetReport {
            mode,
            added: Vec::new(),
            removed: Vec::new(),
            already_synced: Vec::new(),
            duplicates: Vec::new(),
            failed: None,
            skipped: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.failed.is_none() && self.error.is_none()
    }
}

/// Everything a sync run did
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub generated: String,
    pub playlist: String,
    pub target: String,
    pub dry_run: bool,
    pub threshold: u8,
    pub total_titles: usize,
    pub library_size: usize,
    pub matched: usize,
    pub matches: Vec<MatchResult>,
    pub not_found: Vec<NotFound>,
    pub targets: Vec<TargetReport>,
}

impl SyncReport {
    pub fn has_failures(&self) -> bool {
        self.targets.iter().any(|t| !t.is_ok())
    }
}

/// Render the report in the requested format.
pub fn render(report: &SyncReport, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => render_summary(report),
        OutputFormat::Json => serde_json::to_string(report)?,
        OutputFormat::Yaml => serde_yaml::to_string(report)?,
    })
}

/// Human-readable summary of a sync run.
pub fn render_summary(report: &SyncReport) -> String {
    let mut out = String::new();
    let rule = "=".repeat(RULE_WIDTH);
    let prefix = if report.dry_run { "[DRY RUN] " } else { "" };

    // Writing to a String cannot fail
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "  {}Sync Summary: {}", prefix, report.target);
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "  {:<23}{}", "Playlist titles:", report.total_titles);
    let _ = writeln!(out, "  {:<23}{}", "Plex library size:", report.library_size);
    let _ = writeln!(out, "  {:<23}{}", "Matched:", report.matched);

    let multi = report.targets.len() > 1;
    for target in &report.targets {
        if multi {
            let _ = writeln!(out, "  --- {} ---", target.mode.label());
        }
        if let Some(error) = &target.error {
            let _ = writeln!(out, "  {:<23}{}", "Not synced:", error);
            continue;
        }

        let _ = writeln!(out, "  {:<23}{}", "Already synced:", target.already_synced.len());
        let _ = writeln!(out, "  {:<23}{}", "Added:", target.added.len());
        for title in &target.added {
            let _ = writeln!(out, "    + {}", title);
        }
        let _ = writeln!(out, "  {:<23}{}", "Removed:", target.removed.len());
        for title in &target.removed {
            let _ = writeln!(out, "    - {}", title);
        }
        if !target.duplicates.is_empty() {
            let _ = writeln!(out, "  {:<23}{}", "Duplicate matches:", target.duplicates.join(", "));
        }
        if let Some(failed) = &target.failed {
            let _ = writeln!(
                out,
                "  {:<23}{} '{}': {}",
                "FAILED:", failed.action, failed.item.title, failed.error
            );
            let _ = writeln!(out, "  {:<23}{}", "Skipped:", target.skipped.len());
        }
    }

    if !report.not_found.is_empty() {
        let _ = writeln!(out, "  {:<23}{}", "Not found in Plex:", report.not_found.len());
        for missing in &report.not_found {
            match &missing.closest {
                Some(closest) => {
                    let _ = writeln!(
                        out,
                        "    • {} (best {}%: '{}')",
                        missing.title, missing.best_score, closest
                    );
                }
                None => {
                    let _ = writeln!(out, "    • {}", missing.title);
                }
            }
        }
    }

    let _ = writeln!(out, "{}", rule);
    out
}
