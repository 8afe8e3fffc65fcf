//! Scheduler for every zone.
//!
//! Each zone sits behind its own async mutex; a cycle only starts when the
//! lock is free, so a trigger that lands while the same zone is mid-cycle is
//! coalesced into the running one. Zones never share a lock and run in
//! parallel.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use futures::future::join_all;
use tidy_core::gateway::{HomeHub, VisionAnalyzer};
use tidy_core::ids::CycleId;
use tidy_core::notification::SystemStatus;
use tidy_core::text::normalize;
use tidy_core::CycleEvent;
use tidy_notify::NotificationEngine;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cycle::CycleReport;
use crate::error::CycleError;
use crate::zone::Zone;

const EVENT_CAPACITY: usize = 256;
const TRIGGER_CAPACITY: usize = 32;
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(60);

/// A "run now" request. `None` means every zone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TriggerRequest {
    pub zone: Option<String>,
}

/// Sending half of the manual-trigger inbox.
#[derive(Clone, Debug)]
pub struct TriggerHandle {
    tx: mpsc::Sender<TriggerRequest>,
}

impl TriggerHandle {
    pub fn channel() -> (Self, mpsc::Receiver<TriggerRequest>) {
        let (tx, rx) = mpsc::channel(TRIGGER_CAPACITY);
        (Self { tx }, rx)
    }

    /// False when the orchestrator has stopped or the inbox is full.
    pub fn run_zone(&self, zone: &str) -> bool {
        self.send(TriggerRequest {
            zone: Some(zone.to_string()),
        })
    }

    pub fn run_all(&self) -> bool {
        self.send(TriggerRequest { zone: None })
    }

    fn send(&self, request: TriggerRequest) -> bool {
        match self.tx.try_send(request) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "trigger dropped");
                false
            }
        }
    }
}

#[derive(Debug)]
pub enum CycleOutcome {
    Completed(CycleReport),
    Aborted(CycleError),
    /// The zone was already mid-cycle.
    Coalesced,
}

struct ZoneSlot {
    name: String,
    key: String,
    period: Duration,
    zone: Arc<Mutex<Zone>>,
}

pub struct Orchestrator {
    zones: Vec<ZoneSlot>,
    hub: Arc<dyn HomeHub>,
    vision: Arc<dyn VisionAnalyzer>,
    events: broadcast::Sender<CycleEvent>,
    /// Start of the most recent attempt per zone key, successful or not.
    last_attempt: DashMap<String, Instant>,
    tick_interval: Duration,
    status_notifier: Option<NotificationEngine>,
}

impl Orchestrator {
    pub fn new(zones: Vec<Zone>, hub: Arc<dyn HomeHub>, vision: Arc<dyn VisionAnalyzer>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let zones = zones
            .into_iter()
            .map(|zone| ZoneSlot {
                name: zone.name().to_string(),
                key: normalize(zone.name()),
                period: Duration::from_secs(
                    u64::from(zone.settings().update_frequency_hours.max(1)) * 3600,
                ),
                zone: Arc::new(Mutex::new(zone)),
            })
            .collect();
        Self {
            zones,
            hub,
            vision,
            events,
            last_attempt: DashMap::new(),
            tick_interval: DEFAULT_TICK_INTERVAL,
            status_notifier: None,
        }
    }

    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Engine used for whole-home status messages.
    #[must_use]
    pub fn with_status_notifier(mut self, notifier: NotificationEngine) -> Self {
        self.status_notifier = Some(notifier);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CycleEvent> {
        self.events.subscribe()
    }

    pub fn zone_names(&self) -> Vec<String> {
        self.zones.iter().map(|s| s.name.clone()).collect()
    }

    /// Shared handle to a zone, e.g. for editing its ignore rules.
    pub fn zone(&self, name: &str) -> Option<Arc<Mutex<Zone>>> {
        self.slot(name).map(|s| Arc::clone(&s.zone))
    }

    fn slot(&self, name: &str) -> Option<&ZoneSlot> {
        let key = normalize(name);
        self.zones.iter().find(|s| s.key == key)
    }

    fn emit(&self, event: CycleEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn is_due(&self, slot: &ZoneSlot, now: Instant) -> bool {
        match self.last_attempt.get(&slot.key) {
            Some(last) => now.saturating_duration_since(*last) >= slot.period,
            None => true,
        }
    }

    async fn run_slot(&self, slot: &ZoneSlot, cancel: &CancellationToken) -> CycleOutcome {
        let Ok(mut zone) = slot.zone.try_lock() else {
            debug!(zone = %slot.name, "cycle already running; trigger coalesced");
            self.emit(CycleEvent::CycleCoalesced {
                zone: slot.name.clone(),
            });
            return CycleOutcome::Coalesced;
        };
        let _ = self.last_attempt.insert(slot.key.clone(), Instant::now());

        let cycle_id = CycleId::new();
        self.emit(CycleEvent::CycleStarted {
            zone: slot.name.clone(),
            cycle_id: cycle_id.clone(),
        });
        let result = zone
            .run_cycle(cycle_id, self.hub.as_ref(), self.vision.as_ref(), cancel)
            .await;
        drop(zone);
        match result {
            Ok(report) => {
                self.emit(CycleEvent::CycleCompleted {
                    zone: report.zone.clone(),
                    cycle_id: report.cycle_id.clone(),
                    score: report.score,
                    new_tasks: report.created.len(),
                    completed: report.completed.len(),
                });
                CycleOutcome::Completed(report)
            }
            Err(err) => {
                self.emit(CycleEvent::CycleAborted {
                    zone: err.zone.clone(),
                    cycle_id: err.cycle_id.clone(),
                    phase: err.phase.as_str().to_string(),
                    reason: err.source.to_string(),
                });
                CycleOutcome::Aborted(err)
            }
        }
    }

    /// Runs one zone now. `None` (plus an `UnknownZone` event) when no zone
    /// has that name.
    pub async fn run_zone(&self, name: &str, cancel: &CancellationToken) -> Option<CycleOutcome> {
        match self.slot(name) {
            Some(slot) => Some(self.run_slot(slot, cancel).await),
            None => {
                warn!(zone = %name, "trigger for unknown zone");
                self.emit(CycleEvent::UnknownZone {
                    zone: name.to_string(),
                });
                None
            }
        }
    }

    /// Runs every zone concurrently and waits for all of them.
    pub async fn sweep(&self, cancel: &CancellationToken) -> Vec<(String, CycleOutcome)> {
        join_all(self.zones.iter().map(|slot| async move {
            (slot.name.clone(), self.run_slot(slot, cancel).await)
        }))
        .await
    }

    /// Aggregate of every zone's tracked tasks. Waits for in-flight cycles.
    pub async fn system_status(&self) -> SystemStatus {
        let mut active = 0usize;
        let mut completed = 0u64;
        for slot in &self.zones {
            let zone = slot.zone.lock().await;
            active += zone.state().open_count();
            completed += zone.state().completed_total;
        }
        let total = active as u64 + completed;
        SystemStatus {
            total_zones: self.zones.len(),
            active_tasks: active,
            completion_rate: if total == 0 {
                0.0
            } else {
                completed as f64 / total as f64
            },
        }
    }

    /// Sends the system status through the status notifier. False when
    /// none is configured or delivery failed.
    pub async fn report_status(&self) -> bool {
        let Some(notifier) = &self.status_notifier else {
            return false;
        };
        let status = self.system_status().await;
        notifier.send_system_status_notification(status).await
    }

    fn spawn_zone(
        self: &Arc<Self>,
        tasks: &mut JoinSet<()>,
        index: usize,
        cancel: &CancellationToken,
    ) {
        let this = Arc::clone(self);
        let cancel = cancel.clone();
        let _ = tasks.spawn(async move {
            let _ = this.run_slot(&this.zones[index], &cancel).await;
        });
    }

    fn handle_trigger(
        self: &Arc<Self>,
        request: TriggerRequest,
        tasks: &mut JoinSet<()>,
        cancel: &CancellationToken,
    ) {
        match request.zone {
            None => {
                info!(zones = self.zones.len(), "manual trigger for all zones");
                for index in 0..self.zones.len() {
                    self.spawn_zone(tasks, index, cancel);
                }
            }
            Some(name) => {
                let key = normalize(&name);
                match self.zones.iter().position(|s| s.key == key) {
                    Some(index) => {
                        info!(zone = %self.zones[index].name, "manual trigger");
                        self.spawn_zone(tasks, index, cancel);
                    }
                    None => {
                        warn!(zone = %name, "trigger for unknown zone");
                        self.emit(CycleEvent::UnknownZone { zone: name });
                    }
                }
            }
        }
    }

    /// Drives scheduled cycles and drains `triggers` until `cancel` fires,
    /// then waits for in-flight cycles to reach a phase boundary.
    pub async fn run(
        self: Arc<Self>,
        mut triggers: mpsc::Receiver<TriggerRequest>,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut tasks = JoinSet::new();
        let mut inbox_open = true;
        info!(
            zones = self.zones.len(),
            tick_secs = self.tick_interval.as_secs(),
            "orchestrator started"
        );

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let now = Instant::now();
                    for index in 0..self.zones.len() {
                        if self.is_due(&self.zones[index], now) {
                            self.spawn_zone(&mut tasks, index, &cancel);
                        }
                    }
                }
                request = triggers.recv(), if inbox_open => match request {
                    Some(request) => self.handle_trigger(request, &mut tasks, &cancel),
                    None => inbox_open = false,
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        warn!(error = %e, "zone cycle task failed");
                    }
                }
            }
        }

        info!(in_flight = tasks.len(), "orchestrator stopping");
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "zone cycle task failed");
            }
        }
    }
}
