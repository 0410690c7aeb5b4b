//! kodi2plex: Kodi Smart Playlist -> Plex collection/playlist sync
//!
//! Core:
//! - normalize: title normalization
//! - matcher: best-match search with tie-break and guard rail
//! - reconcile: add/remove delta and its application
//!
//! Collaborators: playlist (.xsp reader), config, plex (HTTP client),
//! targets (collection/playlist), report, and the CLI commands.

pub mod check_match;
pub mod config;
pub mod init;
pub mod logging;
pub mod matcher;
pub mod normalize;
pub mod playlist;
pub mod plex;
pub mod reconcile;
pub mod report;
pub mod similarity;
pub mod sync;
pub mod targets;

pub use config::{Config, SyncMode};
pub use matcher::{find_best_match, match_titles, Candidate, ItemKey, MatchResult, GUARD_RAIL_RATIO};
pub use normalize::normalize_title;
pub use reconcile::{apply_delta, reconcile, ApplyOutcome, Delta, SyncTarget};
pub use report::{render_summary, SyncReport};
pub use sync::run_sync;
