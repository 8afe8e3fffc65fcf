//! End-to-end runs of a single zone against in-memory hub and vision doubles.

use std::sync::Arc;

use tidy_core::ServiceError;
use tidy_engine::{CyclePhase, IgnoreRulesManager, Zone};
use tidy_gateway::mock::{MockAnalysis, MockHub, MockVision};
use tidy_notify::{HubChannel, NotificationEngine, NotificationSender, RetryPolicy};
use tidy_settings::ZoneSettings;
use tidy_store::ZoneStateStore;
use tokio_util::sync::CancellationToken;

fn kitchen() -> ZoneSettings {
    ZoneSettings {
        name: "kitchen".into(),
        camera_ref: "camera.kitchen".into(),
        task_list_ref: "todo.kitchen".into(),
        ..Default::default()
    }
}

fn silent() -> NotificationEngine {
    NotificationEngine::new("default", NotificationSender::default())
}

fn notifying(hub: &Arc<MockHub>, personality: &str) -> NotificationEngine {
    let sender = NotificationSender::new(
        std::time::Duration::from_secs(5),
        RetryPolicy {
            attempts: 1,
            base_delay: std::time::Duration::from_millis(1),
        },
    )
    .with_channel(Arc::new(HubChannel::new(hub.clone(), "notify.phone")));
    NotificationEngine::new(personality, sender)
}

fn zone_with_rules(rules: &[&str]) -> Zone {
    let mut manager = IgnoreRulesManager::in_memory();
    for rule in rules {
        assert!(manager.add_rule(rule));
    }
    Zone::new(kitchen(), manager, None, silent())
}

#[tokio::test]
async fn ignored_task_never_reaches_task_list() {
    let hub = MockHub::new();
    let vision = MockVision::always(MockAnalysis::scored(
        40,
        &["Clean dirty dishes on counter", "Sweep floor"],
    ));
    let mut zone = zone_with_rules(&["dirty dishes"]);

    let report = zone
        .run_analysis_cycle(&hub, &vision, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.created, vec!["Sweep floor"]);
    assert_eq!(report.ignored, vec!["Clean dirty dishes on counter"]);
    assert_eq!(hub.task_items(), vec![("todo.kitchen".to_string(), "Sweep floor".to_string())]);
    let tracked: Vec<_> = zone.state().tasks.iter().map(|t| t.description.as_str()).collect();
    assert_eq!(tracked, vec!["Sweep floor"]);
}

#[tokio::test]
async fn unchanged_scene_creates_nothing_the_second_time() {
    let hub = MockHub::new();
    let vision = MockVision::always(MockAnalysis::scored(55, &["Sweep floor", "Wipe table"]));
    let mut zone = zone_with_rules(&[]);
    let cancel = CancellationToken::new();

    let first = zone.run_analysis_cycle(&hub, &vision, &cancel).await.unwrap();
    let second = zone.run_analysis_cycle(&hub, &vision, &cancel).await.unwrap();

    assert_eq!(first.created.len(), 2);
    assert!(second.created.is_empty());
    assert_eq!(hub.task_items().len(), 2);
    assert_eq!(zone.state().open_count(), 2);
}

#[tokio::test]
async fn out_of_range_scores_abort_without_side_effects() {
    for score in [0, 101] {
        let hub = MockHub::new();
        let vision = MockVision::always(MockAnalysis::scored(score, &["Sweep floor"]));
        let mut zone = zone_with_rules(&[]);

        let err = zone
            .run_analysis_cycle(&hub, &vision, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.phase, CyclePhase::Analyzing, "score {score}");
        assert!(matches!(err.source, ServiceError::Malformed(_)));
        assert!(hub.task_items().is_empty());
        assert!(hub.sensor_updates().is_empty());
        assert!(zone.state().tasks.is_empty());
        assert!(zone.state().last_score.is_none());
    }
}

#[tokio::test]
async fn missing_tasks_field_aborts() {
    let hub = MockHub::new();
    let vision = MockVision::always(MockAnalysis::Json(serde_json::json!({ "score": 50 })));
    let mut zone = zone_with_rules(&[]);
    let err = zone
        .run_analysis_cycle(&hub, &vision, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.phase, CyclePhase::Analyzing);
}

#[tokio::test]
async fn camera_failure_aborts_at_capture() {
    let hub = MockHub::new();
    hub.fail_snapshot(ServiceError::NotFound("camera.kitchen".into()));
    let vision = MockVision::always(MockAnalysis::scored(50, &["Sweep floor"]));
    let mut zone = zone_with_rules(&[]);

    let err = zone
        .run_analysis_cycle(&hub, &vision, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.phase, CyclePhase::Capturing);
    assert_eq!(err.zone, "kitchen");
    assert_eq!(vision.call_count(), 0);
    assert!(hub.sensor_updates().is_empty());

    hub.restore_snapshot();
    let report = zone
        .run_analysis_cycle(&hub, &vision, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.created, vec!["Sweep floor"]);
}

#[tokio::test]
async fn rejected_task_item_is_retried_next_cycle() {
    let hub = MockHub::new();
    hub.fail_task_item("Wipe table");
    let vision = MockVision::always(MockAnalysis::scored(60, &["Sweep floor", "Wipe table"]));
    let mut zone = zone_with_rules(&[]);
    let cancel = CancellationToken::new();

    let first = zone.run_analysis_cycle(&hub, &vision, &cancel).await.unwrap();
    assert_eq!(first.created, vec!["Sweep floor"]);
    assert_eq!(first.failed, vec!["Wipe table"]);
    assert_eq!(zone.state().open_count(), 1);

    hub.clear_task_item_failures();
    let second = zone.run_analysis_cycle(&hub, &vision, &cancel).await.unwrap();
    assert_eq!(second.created, vec!["Wipe table"]);
    assert_eq!(hub.task_texts(), vec!["Sweep floor", "Wipe table"]);
}

#[tokio::test]
async fn unwritable_state_file_keeps_memory_state() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not_a_dir");
    std::fs::write(&blocker, b"file").unwrap();
    let store = ZoneStateStore::at(blocker.join("zone_state_kitchen.json"));

    let hub = MockHub::new();
    let vision = MockVision::always(MockAnalysis::scored(45, &["Sweep floor"]));
    let mut zone = Zone::new(kitchen(), IgnoreRulesManager::in_memory(), Some(store), silent());
    let cancel = CancellationToken::new();

    let first = zone.run_analysis_cycle(&hub, &vision, &cancel).await.unwrap();
    assert!(!first.persisted);
    assert_eq!(zone.state().open_count(), 1);
    assert_eq!(zone.state().last_score, Some(45));

    let second = zone.run_analysis_cycle(&hub, &vision, &cancel).await.unwrap();
    assert!(second.created.is_empty());
    assert_eq!(hub.task_items().len(), 1);
}

#[tokio::test]
async fn state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let hub = MockHub::new();
    let vision = MockVision::always(MockAnalysis::scored(45, &["Sweep floor"]));
    let cancel = CancellationToken::new();

    {
        let mut zone = Zone::open(kitchen(), dir.path(), silent());
        assert!(zone.rules_mut().add_rule("dirty dishes"));
        let report = zone.run_analysis_cycle(&hub, &vision, &cancel).await.unwrap();
        assert!(report.persisted);
    }

    let mut zone = Zone::open(kitchen(), dir.path(), silent());
    assert_eq!(zone.rules().len(), 1);
    assert_eq!(zone.state().open_count(), 1);
    let report = zone.run_analysis_cycle(&hub, &vision, &cancel).await.unwrap();
    assert!(report.created.is_empty());
    assert_eq!(hub.task_items().len(), 1);
}

#[tokio::test]
async fn external_completion_is_observed_then_archived() {
    let hub = Arc::new(MockHub::new());
    let vision = MockVision::new(vec![
        MockAnalysis::scored(40, &["Sweep floor", "Wipe table"]),
        MockAnalysis::scored(80, &["Wipe table"]),
    ]);
    let settings = ZoneSettings {
        notifications_enabled: true,
        notify_on_create: false,
        ..kitchen()
    };
    let mut zone = Zone::new(
        settings,
        IgnoreRulesManager::in_memory(),
        None,
        notifying(&hub, "default"),
    );
    let cancel = CancellationToken::new();

    let _ = zone.run_analysis_cycle(&*hub, &vision, &cancel).await.unwrap();
    assert!(hub.notifications().is_empty());

    hub.set_completed(&["Sweep floor"]);
    let second = zone.run_analysis_cycle(&*hub, &vision, &cancel).await.unwrap();
    assert_eq!(second.completed, vec!["Sweep floor"]);
    assert_eq!(second.notifications_sent, 1);
    assert_eq!(zone.state().open_count(), 1);
    assert_eq!(zone.state().completed_total, 1);
    let summary = &hub.notifications()[0];
    assert!(summary.message.contains("1 completed"));
    assert!(summary.message.contains("Done: Sweep floor."));

    let third = zone.run_analysis_cycle(&*hub, &vision, &cancel).await.unwrap();
    assert_eq!(third.archived, 1);
    assert!(third.completed.is_empty());
    assert_eq!(zone.state().tasks.len(), 1);
}

#[tokio::test]
async fn previously_checked_off_item_does_not_complete_new_task() {
    let hub = MockHub::new();
    hub.set_completed(&["Sweep floor"]);
    let vision = MockVision::always(MockAnalysis::scored(60, &["Sweep floor"]));
    let mut zone = zone_with_rules(&[]);
    let cancel = CancellationToken::new();

    let first = zone.run_analysis_cycle(&hub, &vision, &cancel).await.unwrap();
    let second = zone.run_analysis_cycle(&hub, &vision, &cancel).await.unwrap();
    let third = zone.run_analysis_cycle(&hub, &vision, &cancel).await.unwrap();

    assert_eq!(first.created, vec!["Sweep floor"]);
    assert!(second.completed.is_empty());
    assert!(second.created.is_empty());
    assert!(third.created.is_empty());
    assert_eq!(hub.task_items().len(), 1);
    assert_eq!(zone.state().open_count(), 1);
}

#[tokio::test]
async fn redetected_task_after_completion_is_written_once() {
    let hub = MockHub::new();
    let vision = MockVision::new(vec![
        MockAnalysis::scored(50, &["Sweep floor"]),
        MockAnalysis::scored(90, &[]),
        MockAnalysis::scored(50, &["Sweep floor"]),
    ]);
    let mut zone = zone_with_rules(&[]);
    let cancel = CancellationToken::new();

    let _ = zone.run_analysis_cycle(&hub, &vision, &cancel).await.unwrap();
    hub.set_completed(&["Sweep floor"]);

    let cleaned = zone.run_analysis_cycle(&hub, &vision, &cancel).await.unwrap();
    assert_eq!(cleaned.completed, vec!["Sweep floor"]);

    // Dirty again: the completed task is archived and the task re-added.
    let dirty = zone.run_analysis_cycle(&hub, &vision, &cancel).await.unwrap();
    assert_eq!(dirty.archived, 1);
    assert!(dirty.completed.is_empty());
    assert_eq!(dirty.created, vec!["Sweep floor"]);

    let unchanged = zone.run_analysis_cycle(&hub, &vision, &cancel).await.unwrap();
    assert!(unchanged.completed.is_empty());
    assert!(unchanged.created.is_empty());
    assert_eq!(hub.task_texts(), vec!["Sweep floor", "Sweep floor"]);
    assert_eq!(zone.state().open_count(), 1);
    assert_eq!(zone.state().completed_total, 1);
}

#[tokio::test]
async fn completed_lookup_failure_does_not_abort() {
    let hub = MockHub::new();
    hub.fail_completed_lookup(ServiceError::Unreachable("todo offline".into()));
    let vision = MockVision::always(MockAnalysis::scored(50, &["Sweep floor"]));
    let mut zone = zone_with_rules(&[]);
    let report = zone
        .run_analysis_cycle(&hub, &vision, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.created, vec!["Sweep floor"]);
}

#[tokio::test]
async fn new_tasks_are_announced_in_zone_voice() {
    let hub = Arc::new(MockHub::new());
    let vision = MockVision::always(MockAnalysis::scored(30, &["Sweep floor"]));
    let settings = ZoneSettings {
        notifications_enabled: true,
        ..kitchen()
    };
    let mut zone = Zone::new(
        settings,
        IgnoreRulesManager::in_memory(),
        None,
        notifying(&hub, "coach"),
    );

    let report = zone
        .run_analysis_cycle(&*hub, &vision, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.notifications_sent, 1);
    let sent = hub.notifications();
    assert_eq!(sent[0].service, "notify.phone");
    assert!(sent[0].message.contains("Sweep floor"));
    assert!(sent[0].message.contains("champion"));
}

#[tokio::test]
async fn disabled_notifications_send_nothing() {
    let hub = Arc::new(MockHub::new());
    let vision = MockVision::always(MockAnalysis::scored(30, &["Sweep floor"]));
    let mut zone = Zone::new(
        kitchen(),
        IgnoreRulesManager::in_memory(),
        None,
        notifying(&hub, "zen"),
    );
    let report = zone
        .run_analysis_cycle(&*hub, &vision, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.notifications_sent, 0);
    assert!(hub.notifications().is_empty());
}

#[tokio::test]
async fn notification_failure_does_not_fail_cycle() {
    let hub = Arc::new(MockHub::new());
    hub.fail_notifications(ServiceError::Unreachable("push service down".into()));
    let vision = MockVision::always(MockAnalysis::scored(30, &["Sweep floor"]));
    let settings = ZoneSettings {
        notifications_enabled: true,
        ..kitchen()
    };
    let mut zone = Zone::new(
        settings,
        IgnoreRulesManager::in_memory(),
        None,
        notifying(&hub, "default"),
    );
    let report = zone
        .run_analysis_cycle(&*hub, &vision, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.notifications_sent, 0);
    assert_eq!(report.created, vec!["Sweep floor"]);
}

#[tokio::test]
async fn aborted_cycle_sends_error_notification() {
    let hub = Arc::new(MockHub::new());
    let vision = MockVision::always(MockAnalysis::Error(ServiceError::Unreachable(
        "vision quota exceeded".into(),
    )));
    let settings = ZoneSettings {
        notifications_enabled: true,
        ..kitchen()
    };
    let mut zone = Zone::new(
        settings,
        IgnoreRulesManager::in_memory(),
        None,
        notifying(&hub, "default"),
    );
    let err = zone
        .run_analysis_cycle(&*hub, &vision, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.phase, CyclePhase::Analyzing);

    let sent = hub.notifications();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].message.contains("vision quota exceeded"));
    assert_eq!(sent[0].title, "Tidy: kitchen analysis failed");
}

#[tokio::test]
async fn sensor_failure_is_not_fatal() {
    let hub = MockHub::new();
    hub.fail_sensor(ServiceError::from_status(500, "boom".into()));
    let vision = MockVision::always(MockAnalysis::scored(50, &["Sweep floor"]));
    let mut zone = zone_with_rules(&[]);
    let report = zone
        .run_analysis_cycle(&hub, &vision, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.score, 50);
    assert_eq!(zone.state().last_score, Some(50));
}
