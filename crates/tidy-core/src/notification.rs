use std::fmt;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::personality::Personality;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }

    /// Urgency derived from a cleanliness score: dirtier rooms shout louder.
    pub fn from_score(score: u8) -> Self {
        if score < 50 {
            Self::High
        } else if score < 70 {
            Self::Normal
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TaskCreated,
    AnalysisComplete,
    AnalysisError,
    SystemStatus,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TaskCreated => "task_created",
            Self::AnalysisComplete => "analysis_complete",
            Self::AnalysisError => "analysis_error",
            Self::SystemStatus => "system_status",
        }
    }
}

/// A newly created task, announced to the user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskMessage {
    pub zone: String,
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
}

/// End-of-cycle summary for one zone.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub zone: String,
    pub score: u8,
    pub tasks_found: usize,
    pub tasks_created: usize,
    pub tasks_completed: usize,
    /// Descriptions of the tasks counted in `tasks_completed`.
    #[serde(default)]
    pub completed_tasks: Vec<String>,
}

impl AnalysisSummary {
    /// Completed share of everything seen this cycle, 0.0 when nothing was.
    pub fn completion_rate(&self) -> f64 {
        let total = self.tasks_found + self.tasks_completed;
        if total == 0 {
            0.0
        } else {
            self.tasks_completed as f64 / total as f64
        }
    }
}

/// Daily window in which routine notifications are held back. Both ends are
/// inclusive; a window whose start is after its end wraps midnight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuietHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl QuietHours {
    /// Parses `HH:MM` bounds. `None` if either is malformed.
    pub fn parse(start: &str, end: &str) -> Option<Self> {
        let time = |s: &str| NaiveTime::parse_from_str(s.trim(), "%H:%M").ok();
        Some(Self {
            start: time(start)?,
            end: time(end)?,
        })
    }

    pub fn contains(&self, at: NaiveTime) -> bool {
        if self.start <= self.end {
            self.start <= at && at <= self.end
        } else {
            at >= self.start || at <= self.end
        }
    }
}

/// A cycle that aborted before persisting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisFailure {
    pub zone: String,
    pub phase: String,
    pub reason: String,
}

/// Whole-home snapshot across all zones.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub total_zones: usize,
    pub active_tasks: usize,
    pub completion_rate: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationPayload {
    TaskCreated(TaskMessage),
    AnalysisComplete(AnalysisSummary),
    AnalysisError(AnalysisFailure),
    SystemStatus(SystemStatus),
}

impl NotificationPayload {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::TaskCreated(_) => NotificationKind::TaskCreated,
            Self::AnalysisComplete(_) => NotificationKind::AnalysisComplete,
            Self::AnalysisError(_) => NotificationKind::AnalysisError,
            Self::SystemStatus(_) => NotificationKind::SystemStatus,
        }
    }
}

/// One notification call, built per send and discarded afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub payload: NotificationPayload,
    pub priority: Priority,
    pub personality: Personality,
}

impl NotificationRequest {
    pub fn kind(&self) -> NotificationKind {
        self.payload.kind()
    }
}
