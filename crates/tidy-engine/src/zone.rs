//! One monitored area and its analysis cycle.
//!
//! A cycle walks Capturing → Analyzing → Filtering → Reconciling →
//! Notifying → Persisting. A failure in the first three phases aborts with a
//! [`CycleError`] and leaves the zone untouched. From Reconciling on the
//! cycle always runs to completion: external writes are best-effort and the
//! new state replaces the old one in memory even if the state file could
//! not be written.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Map, Value};
use tidy_core::gateway::{AnalysisContext, HomeHub, VisionAnalyzer};
use tidy_core::ids::CycleId;
use tidy_core::notification::{AnalysisFailure, AnalysisSummary};
use tidy_core::task::{TrackedTask, ZoneState};
use tidy_core::{Priority, ServiceError};
use tidy_notify::{NotificationEngine, NotificationSender, RetryPolicy, SenderConfig};
use tidy_settings::{NotificationSettings, ZoneSettings};
use tidy_store::{RuleStore, ZoneStateStore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};

use crate::cycle::{apply_completions, archive_completed, net_new_tasks, CyclePhase, CycleReport};
use crate::error::CycleError;
use crate::rules::IgnoreRulesManager;

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, ServiceError>
where
    F: Future<Output = Result<T, ServiceError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ServiceError::Timeout(limit)),
    }
}

/// Delivery settings for one zone: the shared webhook plus the zone's own
/// hub notify service, or the global one when the zone names none.
pub fn sender_config(zone: &ZoneSettings, notifications: &NotificationSettings) -> SenderConfig {
    let hub_service = Some(zone.notification_channel.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| notifications.hub_notification_channel.clone());
    SenderConfig {
        webhook_url: notifications.webhook_url.clone(),
        hub_service,
        timeout: Some(Duration::from_secs(notifications.timeout_seconds)),
        retry: RetryPolicy {
            attempts: notifications.retry_count,
            ..RetryPolicy::default()
        },
    }
}

pub struct Zone {
    settings: ZoneSettings,
    rules: IgnoreRulesManager,
    state: ZoneState,
    state_store: Option<ZoneStateStore>,
    notifier: NotificationEngine,
    call_timeout: Duration,
}

impl Zone {
    pub fn new(
        settings: ZoneSettings,
        rules: IgnoreRulesManager,
        state_store: Option<ZoneStateStore>,
        notifier: NotificationEngine,
    ) -> Self {
        let state = state_store.as_ref().map(ZoneStateStore::load).unwrap_or_default();
        Self {
            settings,
            rules,
            state,
            state_store,
            notifier,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Zone backed by its rule and state files under `data_dir`.
    pub fn open(settings: ZoneSettings, data_dir: &Path, notifier: NotificationEngine) -> Self {
        let rules = IgnoreRulesManager::new(RuleStore::new(data_dir, &settings.name));
        let store = ZoneStateStore::new(data_dir, &settings.name);
        Self::new(settings, rules, Some(store), notifier)
    }

    /// Wires the zone's notifier from global notification settings.
    pub fn from_settings(
        settings: ZoneSettings,
        notifications: &NotificationSettings,
        data_dir: &Path,
        hub: Arc<dyn HomeHub>,
    ) -> Self {
        let sender =
            NotificationSender::from_config(&sender_config(&settings, notifications), Some(hub));
        let notifier = NotificationEngine::new(&settings.personality, sender)
            .with_quiet_hours(notifications.quiet_window());
        Self::open(settings, data_dir, notifier)
    }

    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn settings(&self) -> &ZoneSettings {
        &self.settings
    }

    pub fn rules(&self) -> &IgnoreRulesManager {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut IgnoreRulesManager {
        &mut self.rules
    }

    pub fn state(&self) -> &ZoneState {
        &self.state
    }

    pub fn notifier(&self) -> &NotificationEngine {
        &self.notifier
    }

    pub fn set_personality(&mut self, name: &str) -> bool {
        let known = self.notifier.set_personality(name);
        self.settings.personality = self.notifier.personality().as_str().to_string();
        known
    }

    pub async fn run_analysis_cycle(
        &mut self,
        hub: &dyn HomeHub,
        vision: &dyn VisionAnalyzer,
        cancel: &CancellationToken,
    ) -> Result<CycleReport, CycleError> {
        self.run_cycle(CycleId::new(), hub, vision, cancel).await
    }

    /// Same as [`run_analysis_cycle`](Self::run_analysis_cycle) with a
    /// caller-chosen id, so events can be correlated before the cycle starts.
    pub async fn run_cycle(
        &mut self,
        cycle_id: CycleId,
        hub: &dyn HomeHub,
        vision: &dyn VisionAnalyzer,
        cancel: &CancellationToken,
    ) -> Result<CycleReport, CycleError> {
        let span = info_span!(
            "analysis_cycle",
            zone = %self.settings.name,
            cycle_id = %cycle_id,
            phase = tracing::field::Empty,
        );
        let result = self
            .execute(cycle_id, hub, vision, cancel)
            .instrument(span.clone())
            .await;
        if let Err(err) = &result {
            self.report_failure(err).instrument(span).await;
        }
        result
    }

    fn abort(&self, cycle_id: &CycleId, phase: CyclePhase, source: ServiceError) -> CycleError {
        CycleError {
            zone: self.settings.name.clone(),
            cycle_id: cycle_id.clone(),
            phase,
            source,
        }
    }

    async fn report_failure(&self, err: &CycleError) {
        if err.is_cancelled() {
            info!(phase = err.phase.as_str(), "analysis cycle cancelled");
            return;
        }
        warn!(
            phase = err.phase.as_str(),
            error_kind = err.source.error_kind(),
            error = %err.source,
            "analysis cycle aborted"
        );
        if self.settings.notifications_enabled {
            let _ = self
                .notifier
                .send_analysis_error_notification(AnalysisFailure {
                    zone: self.settings.name.clone(),
                    phase: err.phase.as_str().to_string(),
                    reason: err.source.to_string(),
                })
                .await;
        }
    }

    async fn execute(
        &mut self,
        cycle_id: CycleId,
        hub: &dyn HomeHub,
        vision: &dyn VisionAnalyzer,
        cancel: &CancellationToken,
    ) -> Result<CycleReport, CycleError> {
        let limit = self.call_timeout;
        let zone = self.settings.name.clone();

        let phase = CyclePhase::Capturing;
        enter(phase);
        ensure_live(cancel).map_err(|e| self.abort(&cycle_id, phase, e))?;
        let image = bounded(limit, hub.get_snapshot(&self.settings.camera_ref))
            .await
            .map_err(|e| self.abort(&cycle_id, phase, e))?;

        let phase = CyclePhase::Analyzing;
        enter(phase);
        ensure_live(cancel).map_err(|e| self.abort(&cycle_id, phase, e))?;
        let context = AnalysisContext {
            zone: zone.clone(),
            purpose: self.settings.purpose.clone(),
            open_tasks: self.state.open_tasks().map(|t| t.description.clone()).collect(),
        };
        let analysis = bounded(limit, vision.analyze(&image, &context))
            .await
            .map_err(|e| self.abort(&cycle_id, phase, e))?;
        let score = analysis.score();
        let tasks_found = analysis.tasks().len();

        let phase = CyclePhase::Filtering;
        enter(phase);
        ensure_live(cancel).map_err(|e| self.abort(&cycle_id, phase, e))?;
        let (kept, ignored) = self.rules.filter(analysis.into_tasks());
        for task in &ignored {
            debug!(task = %task, "task suppressed by ignore rule");
        }

        // Past this point the cycle commits; cancellation is no longer checked.
        enter(CyclePhase::Reconciling);
        let mut next = self.state.clone();
        let archived = archive_completed(&mut next);
        let list = self.settings.task_list_ref.as_str();
        let completed = match bounded(limit, hub.completed_items(list)).await {
            Ok(items) => apply_completions(&mut next, &items, Utc::now()),
            Err(e) => {
                warn!(error_kind = e.error_kind(), error = %e, "completed-item lookup failed");
                Vec::new()
            }
        };
        let mut created = Vec::new();
        let mut failed = Vec::new();
        for description in net_new_tasks(&kept, &next.open_keys()) {
            match bounded(limit, hub.add_task_item(list, &description)).await {
                Ok(()) => {
                    next.tasks.push(TrackedTask::open(&zone, &description));
                    created.push(description);
                }
                Err(e) => {
                    warn!(
                        task = %description,
                        error_kind = e.error_kind(),
                        error = %e,
                        "task list write failed"
                    );
                    failed.push(description);
                }
            }
        }

        enter(CyclePhase::Notifying);
        let mut notifications_sent = 0;
        if self.settings.notifications_enabled {
            if self.settings.notify_on_create {
                let priority = Priority::from_score(score);
                for description in &created {
                    if self.notifier.send_task_notification(&zone, description, priority).await {
                        notifications_sent += 1;
                    }
                }
            }
            if self.settings.notify_on_complete && !completed.is_empty() {
                let summary = AnalysisSummary {
                    zone: zone.clone(),
                    score,
                    tasks_found,
                    tasks_created: created.len(),
                    tasks_completed: completed.len(),
                    completed_tasks: completed.clone(),
                };
                if self.notifier.send_analysis_complete_notification(summary).await {
                    notifications_sent += 1;
                }
            }
        }

        enter(CyclePhase::Persisting);
        let now = Utc::now();
        next.last_score = Some(score);
        next.last_analyzed_at = Some(now);

        let attributes = sensor_attributes(&zone, &next, now);
        if let Err(e) = bounded(
            limit,
            hub.update_sensor(&self.settings.sensor_ref(), &score.to_string(), attributes),
        )
        .await
        {
            warn!(error_kind = e.error_kind(), error = %e, "score sensor update failed");
        }

        let persisted = match &self.state_store {
            Some(store) => match store.try_save(&next) {
                Ok(()) => true,
                Err(e) => {
                    error!(
                        path = %store.path().display(),
                        error = %e,
                        "zone state not saved; kept in memory"
                    );
                    false
                }
            },
            None => true,
        };
        self.state = next;

        info!(
            score,
            tasks_found,
            created = created.len(),
            completed = completed.len(),
            ignored = ignored.len(),
            "analysis cycle complete"
        );

        Ok(CycleReport {
            cycle_id,
            zone,
            score,
            tasks_found,
            ignored,
            created,
            failed,
            completed,
            archived,
            notifications_sent,
            persisted,
        })
    }
}

/// Marks the phase on the cycle span.
fn enter(phase: CyclePhase) {
    let _ = Span::current().record("phase", phase.as_str());
    debug!(committing = phase.is_committing(), "phase entered");
}

/// Checked at each phase boundary before the cycle starts committing.
fn ensure_live(cancel: &CancellationToken) -> Result<(), ServiceError> {
    if cancel.is_cancelled() {
        Err(ServiceError::Cancelled)
    } else {
        Ok(())
    }
}

fn sensor_attributes(
    zone: &str,
    state: &ZoneState,
    at: chrono::DateTime<Utc>,
) -> Map<String, Value> {
    let mut attributes = Map::new();
    let _ = attributes.insert("unit_of_measurement".into(), json!("%"));
    let _ = attributes.insert("friendly_name".into(), json!(format!("{zone} Cleanliness Score")));
    let _ = attributes.insert("open_tasks".into(), json!(state.open_count()));
    let _ = attributes.insert("completed_tasks".into(), json!(state.completed_total));
    let _ = attributes.insert("last_analyzed".into(), json!(at.to_rfc3339()));
    attributes
}
