//! kodi2plex CLI
//!
//! Syncs the TV show titles of a Kodi Smart Playlist into a Plex collection
//! or playlist using fuzzy title matching.

use anyhow::Result;
use clap::{Parser, Subcommand};

use kodi2plex::check_match::{run_check_match, CheckMatchArgs};
use kodi2plex::init::{run_init, InitArgs};
use kodi2plex::sync::{run_sync_command, SyncArgs};

#[derive(Parser)]
#[command(name = "kodi2plex")]
#[command(version)]
#[command(about = "Sync a Kodi Smart Playlist to a Plex Collection or Playlist")]
#[command(long_about = "Reads TV show titles from a Kodi Smart Playlist (.xsp) and syncs them into a Plex collection and/or playlist using fuzzy title matching.\n\nCommands:\n  sync          Add missing shows, remove stale ones\n  init          Create a config.json template\n  check-match   Score a title against candidate titles offline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync playlist titles into Plex (adds missing, removes stale)
    Sync(SyncArgs),
    /// Create a config.json template
    Init(InitArgs),
    /// Score a title against candidate titles without contacting Plex
    CheckMatch(CheckMatchArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Sync(args) => run_sync_command(args).await,
        Commands::Init(args) => run_init(args).await,
        Commands::CheckMatch(args) => run_check_match(args).await,
    }
}
