use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::TaskId;
use crate::text::normalize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    Completed,
}

/// A task already surfaced to the external task list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackedTask {
    pub id: TaskId,
    pub description: String,
    pub zone: String,
    pub first_seen: DateTime<Utc>,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl TrackedTask {
    pub fn open(zone: &str, description: &str) -> Self {
        Self {
            id: TaskId::new(),
            description: description.to_string(),
            zone: zone.to_string(),
            first_seen: Utc::now(),
            status: TaskStatus::Open,
            completed_at: None,
        }
    }

    pub fn normalized(&self) -> String {
        normalize(&self.description)
    }

    pub fn is_open(&self) -> bool {
        self.status == TaskStatus::Open
    }

    pub fn complete(&mut self, at: DateTime<Utc>) {
        self.status = TaskStatus::Completed;
        self.completed_at = Some(at);
    }
}

/// Durable per-zone state. Owned by exactly one zone and replaced wholesale
/// at the end of each successful cycle.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneState {
    #[serde(default)]
    pub tasks: Vec<TrackedTask>,
    #[serde(default)]
    pub last_score: Option<u8>,
    #[serde(default)]
    pub last_analyzed_at: Option<DateTime<Utc>>,
    /// Running total of tasks observed completed, across archived tasks too.
    #[serde(default)]
    pub completed_total: u64,
    /// Checked-off items on the external list as of the last lookup, keyed
    /// by normalized text. Only growth past these counts is a new completion.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub completed_seen: BTreeMap<String, u32>,
}

impl ZoneState {
    pub fn open_tasks(&self) -> impl Iterator<Item = &TrackedTask> {
        self.tasks.iter().filter(|t| t.is_open())
    }

    pub fn open_count(&self) -> usize {
        self.open_tasks().count()
    }

    /// Normalized descriptions of every open task.
    pub fn open_keys(&self) -> HashSet<String> {
        self.open_tasks().map(TrackedTask::normalized).collect()
    }
}
