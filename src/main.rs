use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tidy_core::gateway::{HomeHub, VisionAnalyzer};
use tidy_engine::{CycleOutcome, Orchestrator, TriggerHandle, Zone};
use tidy_gateway::{GeminiAnalyzer, HomeAssistantClient};
use tidy_notify::{NotificationEngine, NotificationSender, RetryPolicy, SenderConfig};
use tidy_settings::TidySettings;
use tidy_telemetry::{init_telemetry, parse_level, TelemetryConfig};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::Level;

/// Camera-driven cleanliness scoring and task tracking.
#[derive(Debug, Parser)]
#[command(name = "tidy", version)]
struct Cli {
    /// Settings file (defaults to ~/.tidy/settings.json).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run one sweep and exit.
    #[arg(long)]
    once: bool,

    /// Limit `--once` to a single zone.
    #[arg(long, requires = "once")]
    zone: Option<String>,
}

fn load(cli: &Cli) -> anyhow::Result<TidySettings> {
    let settings = match &cli.config {
        Some(path) => tidy_settings::load_settings_from_path(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => tidy_settings::load_settings().context("loading settings")?,
    };
    tidy_settings::validate(&settings)?;
    Ok(settings)
}

fn telemetry_config(settings: &TidySettings) -> TelemetryConfig {
    TelemetryConfig {
        log_level: parse_level(&settings.logging.level).unwrap_or(Level::INFO),
        json: settings.logging.json,
        log_to_sqlite: settings.logging.log_to_sqlite,
        log_db_path: settings.data_dir_path().join("logs.db"),
        ..TelemetryConfig::default()
    }
}

fn build_orchestrator(settings: &TidySettings) -> anyhow::Result<Orchestrator> {
    let call_timeout = Duration::from_secs(settings.scheduler.call_timeout_secs);
    let data_dir = settings.data_dir_path();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;

    let hub: Arc<dyn HomeHub> = Arc::new(HomeAssistantClient::new(
        &settings.hub.url,
        settings.hub.token.clone(),
        call_timeout,
    )?);
    let vision: Arc<dyn VisionAnalyzer> = Arc::new(GeminiAnalyzer::new(
        &settings.vision.endpoint,
        &settings.vision.model,
        settings.vision.api_key.clone(),
        call_timeout,
    )?);
    if settings.vision.api_key.is_empty() {
        tracing::warn!("no vision API key configured; every cycle will abort while analyzing");
    }

    let zones = settings
        .zones
        .iter()
        .cloned()
        .map(|zone| {
            Zone::from_settings(zone, &settings.notifications, &data_dir, Arc::clone(&hub))
                .with_call_timeout(call_timeout)
        })
        .collect();

    let status_sender = NotificationSender::from_config(
        &SenderConfig {
            webhook_url: settings.notifications.webhook_url.clone(),
            hub_service: settings.notifications.hub_notification_channel.clone(),
            timeout: Some(Duration::from_secs(settings.notifications.timeout_seconds)),
            retry: RetryPolicy {
                attempts: settings.notifications.retry_count,
                ..RetryPolicy::default()
            },
        },
        Some(Arc::clone(&hub)),
    );

    Ok(Orchestrator::new(zones, hub, vision)
        .with_tick_interval(Duration::from_secs(settings.scheduler.tick_interval_secs))
        .with_status_notifier(
            NotificationEngine::new("default", status_sender)
                .with_quiet_hours(settings.notifications.quiet_window()),
        ))
}

fn log_outcome(zone: &str, outcome: &CycleOutcome) -> bool {
    match outcome {
        CycleOutcome::Completed(report) => {
            tracing::info!(
                zone,
                score = report.score,
                created = report.created.len(),
                completed = report.completed.len(),
                "zone analyzed"
            );
            true
        }
        CycleOutcome::Aborted(err) => {
            tracing::error!(zone, phase = err.phase.as_str(), error = %err.source, "zone failed");
            false
        }
        CycleOutcome::Coalesced => true,
    }
}

async fn run_once(orchestrator: &Orchestrator, zone: Option<&str>) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let outcomes = match zone {
        Some(name) => match orchestrator.run_zone(name, &cancel).await {
            Some(outcome) => vec![(name.to_string(), outcome)],
            None => bail!("unknown zone: {name}"),
        },
        None => orchestrator.sweep(&cancel).await,
    };

    let failed = outcomes
        .iter()
        .filter(|(zone, outcome)| !log_outcome(zone, outcome))
        .count();
    let _ = orchestrator.report_status().await;
    if failed > 0 {
        bail!("{failed} of {} zone(s) failed", outcomes.len());
    }
    Ok(())
}

/// SIGUSR1 asks for an immediate sweep of every zone.
#[cfg(unix)]
fn spawn_signal_trigger(trigger: TriggerHandle, cancel: CancellationToken) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut usr1 = match signal(SignalKind::user_defined1()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "manual trigger signal unavailable");
            return;
        }
    };
    let _ = tokio::spawn(async move {
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                received = usr1.recv() => {
                    if received.is_none() {
                        break;
                    }
                    tracing::info!("SIGUSR1 received, triggering all zones");
                    let _ = trigger.run_all();
                }
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_signal_trigger(_trigger: TriggerHandle, _cancel: CancellationToken) {}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = load(&cli)?;
    let _telemetry = init_telemetry(telemetry_config(&settings));

    let orchestrator = build_orchestrator(&settings)?;
    tracing::info!(zones = ?orchestrator.zone_names(), "tidy starting");

    if cli.once {
        return run_once(&orchestrator, cli.zone.as_deref()).await;
    }

    let orchestrator = Arc::new(orchestrator);
    let cancel = CancellationToken::new();
    let (trigger, inbox) = TriggerHandle::channel();
    spawn_signal_trigger(trigger, cancel.clone());

    let mut events = orchestrator.subscribe();
    let _ = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    tracing::debug!(event = event.event_type(), zone = event.zone(), "cycle event");
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "cycle event observer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let runner = tokio::spawn(Arc::clone(&orchestrator).run(inbox, cancel.clone()));

    tokio::signal::ctrl_c()
        .await
        .context("listening for ctrl-c")?;
    tracing::info!("shutting down");
    cancel.cancel();
    runner.await.context("orchestrator task")?;
    Ok(())
}
