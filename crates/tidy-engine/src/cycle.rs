//! Phase model and the pure reconciliation steps of an analysis cycle.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tidy_core::ids::CycleId;
use tidy_core::task::ZoneState;
use tidy_core::text::normalize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    Capturing,
    Analyzing,
    Filtering,
    Reconciling,
    Notifying,
    Persisting,
}

impl CyclePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Capturing => "capturing",
            Self::Analyzing => "analyzing",
            Self::Filtering => "filtering",
            Self::Reconciling => "reconciling",
            Self::Notifying => "notifying",
            Self::Persisting => "persisting",
        }
    }

    /// Phases after which a cancellation request is no longer honored.
    pub fn is_committing(self) -> bool {
        matches!(self, Self::Reconciling | Self::Notifying | Self::Persisting)
    }
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a completed cycle did.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CycleReport {
    pub cycle_id: CycleId,
    pub zone: String,
    pub score: u8,
    pub tasks_found: usize,
    pub ignored: Vec<String>,
    /// Descriptions pushed to the task list this cycle.
    pub created: Vec<String>,
    /// Net-new candidates the task list refused; retried next cycle.
    pub failed: Vec<String>,
    /// Tracked tasks observed as completed this cycle.
    pub completed: Vec<String>,
    pub archived: usize,
    pub notifications_sent: usize,
    /// False when the zone state file could not be written.
    pub persisted: bool,
}

/// Candidates not already open, de-duplicated within the batch. The first
/// spelling of each normalized description wins.
pub fn net_new_tasks(candidates: &[String], open_keys: &HashSet<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    candidates
        .iter()
        .filter(|c| {
            let key = normalize(c);
            !key.is_empty() && !open_keys.contains(&key) && seen.insert(key)
        })
        .cloned()
        .collect()
}

/// Drops tasks completed in an earlier cycle. Returns how many were dropped.
pub fn archive_completed(state: &mut ZoneState) -> usize {
    let before = state.tasks.len();
    state.tasks.retain(|t| t.is_open());
    before - state.tasks.len()
}

/// Flips open tasks whose description was checked off on the external list
/// since the previous lookup. Items that were already checked off last time
/// are stale and never complete anything. Returns the descriptions that
/// changed and remembers the current list in `completed_seen`.
pub fn apply_completions(
    state: &mut ZoneState,
    completed_items: &[String],
    at: DateTime<Utc>,
) -> Vec<String> {
    let mut current: BTreeMap<String, u32> = BTreeMap::new();
    for key in completed_items.iter().map(|s| normalize(s)) {
        if !key.is_empty() {
            *current.entry(key).or_default() += 1;
        }
    }
    let fresh: HashSet<&String> = current
        .iter()
        .filter(|(key, count)| **count > state.completed_seen.get(*key).copied().unwrap_or(0))
        .map(|(key, _)| key)
        .collect();

    let mut flipped = Vec::new();
    if !fresh.is_empty() {
        for task in state.tasks.iter_mut().filter(|t| t.is_open()) {
            if fresh.contains(&task.normalized()) {
                task.complete(at);
                flipped.push(task.description.clone());
            }
        }
    }
    state.completed_total += flipped.len() as u64;
    state.completed_seen = current;
    flipped
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidy_core::task::TrackedTask;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn net_new_skips_open_and_batch_duplicates() {
        let open: HashSet<String> = ["sweep floor".to_string()].into();
        let fresh = net_new_tasks(
            &strings(&["Sweep Floor", "Wipe table", "wipe TABLE ", "  ", "Take out trash"]),
            &open,
        );
        assert_eq!(fresh, strings(&["Wipe table", "Take out trash"]));
    }

    #[test]
    fn completions_flip_matching_open_tasks() {
        let mut state = ZoneState {
            tasks: vec![
                TrackedTask::open("kitchen", "Sweep floor"),
                TrackedTask::open("kitchen", "Wipe table"),
            ],
            ..Default::default()
        };
        let now = Utc::now();
        let flipped = apply_completions(&mut state, &strings(&["SWEEP FLOOR", "Unrelated"]), now);
        assert_eq!(flipped, strings(&["Sweep floor"]));
        assert_eq!(state.open_count(), 1);
        assert_eq!(state.completed_total, 1);
        assert_eq!(state.tasks[0].completed_at, Some(now));
    }

    #[test]
    fn stale_completed_items_complete_nothing() {
        let mut state = ZoneState::default();
        let listed = strings(&["Sweep floor"]);
        assert!(apply_completions(&mut state, &listed, Utc::now()).is_empty());
        assert_eq!(state.completed_seen.get("sweep floor"), Some(&1));

        // Re-detected after the item was already checked off.
        state.tasks.push(TrackedTask::open("kitchen", "Sweep floor"));
        assert!(apply_completions(&mut state, &listed, Utc::now()).is_empty());
        assert_eq!(state.open_count(), 1);
        assert_eq!(state.completed_total, 0);
    }

    #[test]
    fn repeated_completion_of_same_text_is_detected() {
        let mut state = ZoneState {
            tasks: vec![TrackedTask::open("kitchen", "Sweep floor")],
            ..Default::default()
        };
        let _ = state.completed_seen.insert("sweep floor".into(), 1);
        let listed = strings(&["Sweep floor", "sweep floor"]);
        assert_eq!(apply_completions(&mut state, &listed, Utc::now()), strings(&["Sweep floor"]));
        assert_eq!(state.completed_seen.get("sweep floor"), Some(&2));
    }

    #[test]
    fn archive_drops_only_completed() {
        let mut done = TrackedTask::open("kitchen", "Wipe table");
        done.complete(Utc::now());
        let mut state = ZoneState {
            tasks: vec![TrackedTask::open("kitchen", "Sweep floor"), done],
            ..Default::default()
        };
        assert_eq!(archive_completed(&mut state), 1);
        assert_eq!(state.tasks.len(), 1);
        assert!(state.tasks[0].is_open());
    }

    #[test]
    fn committing_phases() {
        assert!(!CyclePhase::Analyzing.is_committing());
        assert!(CyclePhase::Reconciling.is_committing());
        assert_eq!(CyclePhase::Persisting.to_string(), "persisting");
    }
}
