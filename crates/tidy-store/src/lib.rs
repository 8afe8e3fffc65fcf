pub mod atomic;
pub mod error;
pub mod rules;
pub mod zone_state;

pub use atomic::AtomicJsonFile;
pub use error::StoreError;
pub use rules::{RuleRecord, RuleStore};
pub use zone_state::ZoneStateStore;
