//! sync command: Kodi Smart Playlist -> Plex collection and/or playlist
//!
//! Full sync: adds missing shows, removes stale ones, reports titles that did
//! not match anything in the configured libraries.

use crate::config::{Config, SyncMode};
use crate::logging;
use crate::matcher::{match_titles, MatchResult};
use crate::playlist::parse_playlist;
use crate::plex::PlexClient;
use crate::reconcile::{apply_delta, reconcile, SyncTarget};
use crate::report::{render, NotFound, OutputFormat, SyncReport, TargetReport};
use crate::targets::{CollectionTarget, PlaylistTarget};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Args;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Args)]
pub struct SyncArgs {
    /// Path to JSON config file
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// Path to Kodi Smart Playlist XML (overrides config)
    #[arg(short, long)]
    pub playlist: Option<PathBuf>,

    /// Target collection/playlist name (overrides config)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Sync mode(s): collection, playlist, or both (overrides config)
    #[arg(short, long, value_enum, num_args = 1..)]
    pub mode: Option<Vec<SyncMode>>,

    /// Fuzzy match threshold 0-100 (overrides config)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub threshold: Option<u8>,

    /// Preview changes without modifying Plex
    #[arg(long)]
    pub dry_run: bool,

    /// Log file path (overrides config)
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Plex server URL (overrides config)
    #[arg(long, env = "PLEX_URL")]
    pub url: Option<String>,

    /// Plex token (overrides config)
    #[arg(long, env = "PLEX_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Report format
    #[arg(short, long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

impl SyncArgs {
    /// CLI values win over the config file.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(playlist) = &self.playlist {
            config.playlist_path = playlist.clone();
        }
        if let Some(name) = &self.name {
            config.collection_name = Some(name.clone());
        }
        if let Some(modes) = &self.mode {
            config.sync_modes = modes.clone();
        }
        if let Some(threshold) = self.threshold {
            config.fuzzy_threshold = threshold;
        }
        if self.dry_run {
            config.dry_run = true;
        }
        if let Some(log) = &self.log {
            config.log_file = Some(log.clone());
        }
        if let Some(url) = &self.url {
            config.plex_url = url.clone();
        }
        if let Some(token) = &self.token {
            config.plex_token = token.clone();
        }
        config.dedup_modes();
    }
}

/// Run the sync command
pub async fn run_sync_command(args: SyncArgs) -> Result<()> {
    let mut config = Config::from_file(&args.config)?;
    args.apply_overrides(&mut config);
    config.validate()?;

    logging::init(config.log_file.as_deref())?;

    let report = run_sync(&config).await?;
    print!("{}", render(&report, args.format)?);
    if args.format != OutputFormat::Text {
        println!();
    }

    if report.has_failures() {
        bail!("Sync incomplete: see failures above");
    }
    Ok(())
}

/// Parse the playlist, match it against Plex and sync every configured mode.
pub async fn run_sync(config: &Config) -> Result<SyncReport> {
    let playlist = parse_playlist(&config.playlist_path).await?;
    let target_name = config
        .collection_name
        .clone()
        .unwrap_or_else(|| playlist.name.clone());
    let titles = playlist.sorted_titles();
    let modes_label = config
        .sync_modes
        .iter()
        .map(SyncMode::label)
        .collect::<Vec<_>>()
        .join(" + ");

    info!("Playlist:    {}", playlist.name);
    info!("Shows:       {}", titles.len());
    info!("Sync mode:   {}", modes_label);
    info!("Target:      {}", target_name);
    info!("Libraries:   {}", config.library_names.join(", "));
    info!("Threshold:   {}%", config.fuzzy_threshold);
    if config.dry_run {
        info!("Mode:        *** DRY RUN ***");
    }

    info!("Connecting to Plex at {}...", config.plex_url);
    let client = PlexClient::new(&config.plex_url, &config.plex_token)?;
    let catalog = client
        .load_catalog(&config.library_names)
        .await
        .context("Failed to load Plex libraries")?;
    if config.library_names.len() > 1 {
        info!("Total across all libraries: {} shows", catalog.shows.len());
    }

    info!("Matching playlist titles to Plex libraries...");
    let matches = match_titles(&titles, &catalog.shows, config.fuzzy_threshold);
    log_matches(&matches);

    let matched: Vec<MatchResult> = matches.iter().filter(|r| r.matched).cloned().collect();
    let not_found: Vec<NotFound> = matches
        .iter()
        .filter(|r| !r.matched)
        .map(NotFound::from)
        .collect();
    info!("Matched {}/{} titles", matched.len(), titles.len());

    let mut targets = Vec::with_capacity(config.sync_modes.len());
    for mode in &config.sync_modes {
        info!("Syncing to {}: {}", mode.label(), target_name);
        let report = match mode {
            SyncMode::Collection => {
                let mut target = CollectionTarget::new(&client, &target_name, &catalog);
                sync_target(&mut target, *mode, &matched, config.dry_run).await
            }
            SyncMode::Playlist => {
                let mut target = PlaylistTarget::new(&client, &target_name);
                sync_target(&mut target, *mode, &matched, config.dry_run).await
            }
        };
        targets.push(report);
    }

    Ok(SyncReport {
        generated: Utc::now().to_rfc3339(),
        playlist: playlist.name,
        target: target_name,
        dry_run: config.dry_run,
        threshold: config.fuzzy_threshold,
        total_titles: titles.len(),
        library_size: catalog.shows.len(),
        matched: matched.len(),
        matches,
        not_found,
        targets,
    })
}

/// One reconciliation pass: snapshot, delta, apply.
///
/// A failed snapshot aborts the pass before anything is mutated.
pub async fn sync_target<T: SyncTarget>(
    target: &mut T,
    mode: SyncMode,
    matched: &[MatchResult],
    dry_run: bool,
) -> TargetReport {
    let live = match target.snapshot().await {
        Ok(live) => live,
        Err(e) => {
            warn!("Skipping {}: {:#}", mode, e);
            return TargetReport::aborted(mode, format!("{:#}", e));
        }
    };

    let delta = reconcile(matched, &live);
    if delta.to_add.is_empty() {
        info!("No shows to add.");
    }
    if delta.to_remove.is_empty() {
        info!("No shows to remove.");
    }
    for duplicate in &delta.duplicates {
        warn!(
            "  '{}' matched '{}', already claimed by another title",
            duplicate.source_title,
            duplicate.matched_title().unwrap_or_default()
        );
    }

    let outcome = apply_delta(target, &delta, dry_run).await;
    TargetReport::from_pass(mode, &delta, &outcome)
}

fn log_matches(matches: &[MatchResult]) {
    for result in matches {
        match result.matched_title() {
            Some(title) if title.to_lowercase() != result.source_title.to_lowercase() => {
                info!("  ✓ '{}' → '{}' ({}%)", result.source_title, title, result.score);
            }
            Some(_) => info!("  ✓ '{}' ({}%)", result.source_title, result.score),
            None => warn!(
                "  ✗ '{}' — no match (best score: {}%)",
                result.source_title, result.score
            ),
        }
    }
}
