use tidy_core::ids::CycleId;
use tidy_core::ServiceError;

use crate::cycle::CyclePhase;

/// An analysis cycle that stopped before Reconciling. Nothing was persisted
/// and the zone keeps its prior state.
#[derive(Debug, thiserror::Error)]
#[error("{zone}: cycle aborted while {phase}: {source}")]
pub struct CycleError {
    pub zone: String,
    pub cycle_id: CycleId,
    pub phase: CyclePhase,
    pub source: ServiceError,
}

impl CycleError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self.source, ServiceError::Cancelled)
    }
}
