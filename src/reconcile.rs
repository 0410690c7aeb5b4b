//! Set reconciliation between matched titles and a live collection
//!
//! [`reconcile`] computes the delta from a snapshot; [`apply_delta`] pushes it
//! through a [`SyncTarget`], stopping at the first failed mutation so the
//! next run starts from a known state.

use crate::matcher::{Candidate, ItemKey, MatchResult};
use anyhow::Result;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, warn};

/// A remote collection that can be read and mutated one item at a time.
///
/// Implementations are awaited sequentially; none of the calls retry.
#[allow(async_fn_in_trait)]
pub trait SyncTarget {
    /// Items currently in the collection
    async fn snapshot(&mut self) -> Result<Vec<Candidate>>;

    /// Associate `item` with the collection
    async fn add(&mut self, item: &Candidate) -> Result<()>;

    /// Disassociate `item` from the collection
    async fn remove(&mut self, item: &Candidate) -> Result<()>;
}

/// What has to change for the live collection to equal the matched set
#[derive(Debug, Clone, Default, Serialize)]
pub struct Delta {
    /// Matched results missing from the live set, in match order
    pub to_add: Vec<MatchResult>,
    /// Live items no title matched, in snapshot order
    pub to_remove: Vec<Candidate>,
    /// Matched results already present in the live set
    pub already_synced: Vec<MatchResult>,
    /// Results whose candidate was already claimed by an earlier title
    pub duplicates: Vec<MatchResult>,
}

impl Delta {
    pub fn is_in_sync(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Mutations in application order: adds first, then removes.
    pub fn mutations(&self) -> Vec<Mutation> {
        let adds = self.to_add.iter().filter_map(|r| {
            r.candidate.clone().map(|item| Mutation {
                action: Action::Add,
                item,
            })
        });
        let removes = self.to_remove.iter().map(|item| Mutation {
            action: Action::Remove,
            item: item.clone(),
        });
        adds.chain(removes).collect()
    }
}

/// Compute the delta between matched results and a live snapshot.
///
/// Unmatched results are ignored. Identities are compared, never titles.
pub fn reconcile(matched: &[MatchResult], live: &[Candidate]) -> Delta {
    let live_ids: HashSet<&ItemKey> = live.iter().map(|c| &c.key).collect();
    let mut desired_ids: HashSet<&ItemKey> = HashSet::new();
    let mut delta = Delta::default();

    for result in matched {
        let Some(candidate) = result.candidate.as_ref().filter(|_| result.matched) else {
            continue;
        };

        if !desired_ids.insert(&candidate.key) {
            delta.duplicates.push(result.clone());
        } else if live_ids.contains(&candidate.key) {
            delta.already_synced.push(result.clone());
        } else {
            delta.to_add.push(result.clone());
        }
    }

    let mut removed_ids: HashSet<&ItemKey> = HashSet::new();
    for item in live {
        if !desired_ids.contains(&item.key) && removed_ids.insert(&item.key) {
            delta.to_remove.push(item.clone());
        }
    }

    delta
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Add,
    Remove,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Add => write!(f, "add"),
            Action::Remove => write!(f, "remove"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mutation {
    pub action: Action,
    pub item: Candidate,
}

/// The mutation that aborted a pass
#[derive(Debug, Clone, Serialize)]
pub struct FailedMutation {
    pub action: Action,
    pub item: Candidate,
    pub error: String,
}

/// What [`apply_delta`] actually did
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplyOutcome {
    pub dry_run: bool,
    /// Added (or, in dry run, planned to be added)
    pub added: Vec<Candidate>,
    /// Removed (or, in dry run, planned to be removed)
    pub removed: Vec<Candidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<FailedMutation>,
    /// Mutations not attempted because an earlier one failed
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<Mutation>,
}

impl ApplyOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_none()
    }
}

/// Apply `delta` to `target`, one call per mutation.
///
/// With `dry_run` nothing is sent; every mutation is reported as planned.
/// The first failure aborts the rest of the pass.
pub async fn apply_delta<T: SyncTarget>(
    target: &mut T,
    delta: &Delta,
    dry_run: bool,
) -> ApplyOutcome {
    let mut outcome = ApplyOutcome {
        dry_run,
        ..Default::default()
    };
    let mut pending = delta.mutations().into_iter();

    while let Some(mutation) = pending.next() {
        if !dry_run {
            let result = match mutation.action {
                Action::Add => target.add(&mutation.item).await,
                Action::Remove => target.remove(&mutation.item).await,
            };

            if let Err(e) = result {
                warn!(
                    action = %mutation.action,
                    key = %mutation.item.key,
                    "Failed to {} '{}': {:#}",
                    mutation.action,
                    mutation.item.title,
                    e
                );
                outcome.failed = Some(FailedMutation {
                    action: mutation.action,
                    item: mutation.item,
                    error: format!("{:#}", e),
                });
                outcome.skipped = pending.collect();
                return outcome;
            }
        }

        match mutation.action {
            Action::Add => {
                info!(key = %mutation.item.key, "  + {}", mutation.item.title);
                outcome.added.push(mutation.item);
            }
            Action::Remove => {
                info!(key = %mutation.item.key, "  - {}", mutation.item.title);
                outcome.removed.push(mutation.item);
            }
        }
    }

    debug!(
        added = outcome.added.len(),
        removed = outcome.removed.len(),
        dry_run,
        "Pass complete"
    );
    outcome
}
