use serde::{Deserialize, Serialize};

use crate::ids::CycleId;

/// Orchestrator lifecycle events, broadcast to observers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CycleEvent {
    #[serde(rename = "cycle_started")]
    CycleStarted { zone: String, cycle_id: CycleId },

    #[serde(rename = "cycle_completed")]
    CycleCompleted {
        zone: String,
        cycle_id: CycleId,
        score: u8,
        new_tasks: usize,
        completed: usize,
    },

    #[serde(rename = "cycle_aborted")]
    CycleAborted {
        zone: String,
        cycle_id: CycleId,
        phase: String,
        reason: String,
    },

    /// A trigger arrived while the zone already had a cycle in flight.
    #[serde(rename = "cycle_coalesced")]
    CycleCoalesced { zone: String },

    #[serde(rename = "unknown_zone")]
    UnknownZone { zone: String },
}

impl CycleEvent {
    pub fn zone(&self) -> &str {
        match self {
            Self::CycleStarted { zone, .. }
            | Self::CycleCompleted { zone, .. }
            | Self::CycleAborted { zone, .. }
            | Self::CycleCoalesced { zone }
            | Self::UnknownZone { zone } => zone,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::CycleStarted { .. } => "cycle_started",
            Self::CycleCompleted { .. } => "cycle_completed",
            Self::CycleAborted { .. } => "cycle_aborted",
            Self::CycleCoalesced { .. } => "cycle_coalesced",
            Self::UnknownZone { .. } => "unknown_zone",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_accessor() {
        let evt = CycleEvent::CycleCoalesced {
            zone: "kitchen".into(),
        };
        assert_eq!(evt.zone(), "kitchen");
        assert_eq!(evt.event_type(), "cycle_coalesced");
    }

    #[test]
    fn serde_tags_with_type() {
        let evt = CycleEvent::CycleAborted {
            zone: "garage".into(),
            cycle_id: CycleId::from_raw("cycle_1"),
            phase: "capturing".into(),
            reason: "camera offline".into(),
        };
        let json = serde_json::to_value(&evt).unwrap();
        assert_eq!(json["type"], "cycle_aborted");
        assert_eq!(json["phase"], "capturing");
        let back: CycleEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, evt);
    }
}
