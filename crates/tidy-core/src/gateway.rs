use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Map, Value};

use crate::analysis::AnalysisResult;
use crate::errors::ServiceError;

/// Home-automation hub operations the cycle depends on.
#[async_trait]
pub trait HomeHub: Send + Sync {
    /// Fresh JPEG snapshot from a camera entity.
    async fn get_snapshot(&self, camera_ref: &str) -> Result<Bytes, ServiceError>;

    async fn update_sensor(
        &self,
        sensor_ref: &str,
        state: &str,
        attributes: Map<String, Value>,
    ) -> Result<(), ServiceError>;

    async fn add_task_item(&self, task_list_ref: &str, text: &str) -> Result<(), ServiceError>;

    /// Hub-native notification (`notify.<service>`).
    async fn send_notification(
        &self,
        service: &str,
        title: &str,
        message: &str,
    ) -> Result<(), ServiceError>;

    /// Summaries of items the user has checked off on a task list.
    /// Hubs without task-list read support report none.
    async fn completed_items(&self, _task_list_ref: &str) -> Result<Vec<String>, ServiceError> {
        Ok(Vec::new())
    }
}

/// Zone context handed to the vision service alongside the image.
#[derive(Clone, Debug, Default)]
pub struct AnalysisContext {
    pub zone: String,
    pub purpose: String,
    pub open_tasks: Vec<String>,
}

#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    fn name(&self) -> &str;

    async fn analyze(
        &self,
        image: &[u8],
        context: &AnalysisContext,
    ) -> Result<AnalysisResult, ServiceError>;
}
