use chrono::{Local, NaiveTime};
use tidy_core::notification::{
    AnalysisFailure, AnalysisSummary, NotificationKind, NotificationPayload, NotificationRequest,
    QuietHours, SystemStatus, TaskMessage,
};
use tidy_core::Priority;
use tracing::debug;

use crate::channel::OutgoingMessage;
use crate::personality::PersonalityFormatter;
use crate::sender::NotificationSender;

/// Formats notifications in the zone's voice and hands them to the sender.
#[derive(Clone)]
pub struct NotificationEngine {
    formatter: PersonalityFormatter,
    sender: NotificationSender,
    quiet_hours: Option<QuietHours>,
}

impl NotificationEngine {
    pub fn new(personality: &str, sender: NotificationSender) -> Self {
        Self {
            formatter: PersonalityFormatter::new(personality),
            sender,
            quiet_hours: None,
        }
    }

    /// Holds back everything but analysis errors inside `window` (local time).
    #[must_use]
    pub fn with_quiet_hours(mut self, window: Option<QuietHours>) -> Self {
        self.quiet_hours = window;
        self
    }

    pub fn personality(&self) -> tidy_core::Personality {
        self.formatter.personality()
    }

    pub fn set_personality(&mut self, name: &str) -> bool {
        self.formatter.set_personality(name)
    }

    pub fn formatter(&self) -> &PersonalityFormatter {
        &self.formatter
    }

    pub fn sender(&self) -> &NotificationSender {
        &self.sender
    }

    pub async fn send_task_notification(
        &self,
        zone: &str,
        description: &str,
        priority: Priority,
    ) -> bool {
        self.send(&self.request(
            NotificationPayload::TaskCreated(TaskMessage {
                zone: zone.to_string(),
                description: description.to_string(),
                priority,
            }),
            priority,
        ))
        .await
    }

    pub async fn send_analysis_complete_notification(&self, summary: AnalysisSummary) -> bool {
        let priority = Priority::from_score(summary.score);
        self.send(&self.request(
            NotificationPayload::AnalysisComplete(summary),
            priority,
        ))
        .await
    }

    pub async fn send_analysis_error_notification(&self, failure: AnalysisFailure) -> bool {
        self.send(&self.request(
            NotificationPayload::AnalysisError(failure),
            Priority::High,
        ))
        .await
    }

    pub async fn send_system_status_notification(&self, status: SystemStatus) -> bool {
        self.send(&self.request(
            NotificationPayload::SystemStatus(status),
            Priority::Low,
        ))
        .await
    }

    fn request(&self, payload: NotificationPayload, priority: Priority) -> NotificationRequest {
        NotificationRequest {
            payload,
            priority,
            personality: self.formatter.personality(),
        }
    }

    /// Formats in the request's personality, which may differ from the
    /// engine's own. False when held back by quiet hours.
    pub async fn send(&self, request: &NotificationRequest) -> bool {
        self.send_at(request, Local::now().time()).await
    }

    async fn send_at(&self, request: &NotificationRequest, now: NaiveTime) -> bool {
        let quiet = self.quiet_hours.is_some_and(|window| window.contains(now));
        if quiet && request.kind() != NotificationKind::AnalysisError {
            debug!(kind = request.kind().as_str(), "held back during quiet hours");
            return false;
        }
        let body = if request.personality == self.formatter.personality() {
            self.formatter.format(&request.payload)
        } else {
            PersonalityFormatter::with_personality(request.personality).format(&request.payload)
        };
        let title = self.formatter.template().title(&request.payload);
        debug!(
            kind = request.kind().as_str(),
            priority = request.priority.as_str(),
            "sending notification"
        );
        self.sender
            .send(&OutgoingMessage::new(title, body, request.priority))
            .await
    }
}
