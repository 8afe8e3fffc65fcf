//! In-memory hub and vision doubles for deterministic tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use tidy_core::gateway::{AnalysisContext, HomeHub, VisionAnalyzer};
use tidy_core::{AnalysisResult, ServiceError};

#[derive(Clone, Debug, PartialEq)]
pub struct SensorUpdate {
    pub sensor_ref: String,
    pub state: String,
    pub attributes: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HubNotification {
    pub service: String,
    pub title: String,
    pub message: String,
}

#[derive(Default)]
struct HubScript {
    snapshot_error: Option<ServiceError>,
    snapshot_delay: Option<Duration>,
    sensor_error: Option<ServiceError>,
    notify_error: Option<ServiceError>,
    completed_error: Option<ServiceError>,
    /// Normalized texts whose add_task_item call fails.
    failing_items: HashSet<String>,
    completed: Vec<String>,
}

/// Hub double that records every write.
#[derive(Default)]
pub struct MockHub {
    script: Mutex<HubScript>,
    snapshot_calls: AtomicUsize,
    task_items: Mutex<Vec<(String, String)>>,
    sensor_updates: Mutex<Vec<SensorUpdate>>,
    notifications: Mutex<Vec<HubNotification>>,
}

impl MockHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_snapshot(&self, error: ServiceError) {
        self.script.lock().snapshot_error = Some(error);
    }

    pub fn restore_snapshot(&self) {
        self.script.lock().snapshot_error = None;
    }

    /// Hold each snapshot call for `delay` before answering.
    pub fn delay_snapshot(&self, delay: Duration) {
        self.script.lock().snapshot_delay = Some(delay);
    }

    pub fn fail_sensor(&self, error: ServiceError) {
        self.script.lock().sensor_error = Some(error);
    }

    pub fn fail_notifications(&self, error: ServiceError) {
        self.script.lock().notify_error = Some(error);
    }

    pub fn fail_completed_lookup(&self, error: ServiceError) {
        self.script.lock().completed_error = Some(error);
    }

    pub fn fail_task_item(&self, text: &str) {
        self.script
            .lock()
            .failing_items
            .insert(text.trim().to_lowercase());
    }

    pub fn clear_task_item_failures(&self) {
        self.script.lock().failing_items.clear();
    }

    /// Items the hub will report as checked off.
    pub fn set_completed(&self, items: &[&str]) {
        self.script.lock().completed = items.iter().map(|s| s.to_string()).collect();
    }

    pub fn snapshot_calls(&self) -> usize {
        self.snapshot_calls.load(Ordering::SeqCst)
    }

    /// `(task_list_ref, text)` pairs accepted so far.
    pub fn task_items(&self) -> Vec<(String, String)> {
        self.task_items.lock().clone()
    }

    pub fn task_texts(&self) -> Vec<String> {
        self.task_items.lock().iter().map(|(_, t)| t.clone()).collect()
    }

    pub fn sensor_updates(&self) -> Vec<SensorUpdate> {
        self.sensor_updates.lock().clone()
    }

    pub fn notifications(&self) -> Vec<HubNotification> {
        self.notifications.lock().clone()
    }
}

#[async_trait]
impl HomeHub for MockHub {
    async fn get_snapshot(&self, camera_ref: &str) -> Result<Bytes, ServiceError> {
        let _ = self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
        let (error, delay) = {
            let script = self.script.lock();
            (script.snapshot_error.clone(), script.snapshot_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match error {
            Some(e) => Err(e),
            None => Ok(Bytes::from(format!("jpeg:{camera_ref}"))),
        }
    }

    async fn update_sensor(
        &self,
        sensor_ref: &str,
        state: &str,
        attributes: Map<String, Value>,
    ) -> Result<(), ServiceError> {
        if let Some(e) = self.script.lock().sensor_error.clone() {
            return Err(e);
        }
        self.sensor_updates.lock().push(SensorUpdate {
            sensor_ref: sensor_ref.to_string(),
            state: state.to_string(),
            attributes,
        });
        Ok(())
    }

    async fn add_task_item(&self, task_list_ref: &str, text: &str) -> Result<(), ServiceError> {
        let failing = self
            .script
            .lock()
            .failing_items
            .contains(&text.trim().to_lowercase());
        if failing {
            return Err(ServiceError::from_status(500, format!("rejected {text}")));
        }
        self.task_items
            .lock()
            .push((task_list_ref.to_string(), text.to_string()));
        Ok(())
    }

    async fn send_notification(
        &self,
        service: &str,
        title: &str,
        message: &str,
    ) -> Result<(), ServiceError> {
        if let Some(e) = self.script.lock().notify_error.clone() {
            return Err(e);
        }
        self.notifications.lock().push(HubNotification {
            service: service.to_string(),
            title: title.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }

    async fn completed_items(&self, _task_list_ref: &str) -> Result<Vec<String>, ServiceError> {
        let script = self.script.lock();
        match &script.completed_error {
            Some(e) => Err(e.clone()),
            None => Ok(script.completed.clone()),
        }
    }
}

/// Pre-programmed vision replies.
#[derive(Clone, Debug)]
pub enum MockAnalysis {
    /// Raw JSON, validated exactly as a real reply would be.
    Json(Value),
    Error(ServiceError),
    Delay(Duration, Box<MockAnalysis>),
}

impl MockAnalysis {
    pub fn scored(score: i64, tasks: &[&str]) -> Self {
        Self::Json(serde_json::json!({ "score": score, "tasks": tasks }))
    }
}

/// Vision double returning responses in sequence; the last one repeats.
pub struct MockVision {
    responses: Vec<MockAnalysis>,
    call_count: AtomicUsize,
    contexts: Mutex<Vec<AnalysisContext>>,
}

impl MockVision {
    pub fn new(responses: Vec<MockAnalysis>) -> Self {
        Self {
            responses,
            call_count: AtomicUsize::new(0),
            contexts: Mutex::new(Vec::new()),
        }
    }

    pub fn always(response: MockAnalysis) -> Self {
        Self::new(vec![response])
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Context passed on each call, in order.
    pub fn contexts(&self) -> Vec<AnalysisContext> {
        self.contexts.lock().clone()
    }
}

#[async_trait]
impl VisionAnalyzer for MockVision {
    fn name(&self) -> &str {
        "mock"
    }

    async fn analyze(
        &self,
        _image: &[u8],
        context: &AnalysisContext,
    ) -> Result<AnalysisResult, ServiceError> {
        let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
        self.contexts.lock().push(context.clone());

        let Some(mut current) = self
            .responses
            .get(idx)
            .or_else(|| self.responses.last())
            .cloned()
        else {
            return Err(ServiceError::Malformed(format!(
                "MockVision: no response configured for call {idx}"
            )));
        };

        loop {
            match current {
                MockAnalysis::Json(value) => return AnalysisResult::from_value(value),
                MockAnalysis::Error(e) => return Err(e),
                MockAnalysis::Delay(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    current = *inner;
                }
            }
        }
    }
}
