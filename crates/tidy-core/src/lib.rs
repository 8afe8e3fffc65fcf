pub mod analysis;
pub mod errors;
pub mod events;
pub mod gateway;
pub mod ids;
pub mod notification;
pub mod personality;
pub mod task;
pub mod text;

pub use analysis::AnalysisResult;
pub use errors::ServiceError;
pub use events::CycleEvent;
pub use gateway::{AnalysisContext, HomeHub, VisionAnalyzer};
pub use notification::Priority;
pub use personality::Personality;
pub use task::{TaskStatus, TrackedTask, ZoneState};
