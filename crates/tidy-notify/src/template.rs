use tidy_core::notification::{
    AnalysisFailure, AnalysisSummary, NotificationPayload, SystemStatus, TaskMessage,
};

/// Neutral, tone-free rendering of notification data. Zone names and task
/// descriptions are copied through unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct MessageTemplate;

impl MessageTemplate {
    pub fn new() -> Self {
        Self
    }

    pub fn format_task_notification(&self, task: &TaskMessage) -> String {
        format!(
            "New task in {}: {} (priority: {})",
            task.zone, task.description, task.priority
        )
    }

    pub fn format_analysis_complete(&self, summary: &AnalysisSummary) -> String {
        let mut msg = format!(
            "Analysis complete for {}: score {}/100, {} tasks found, {} new, {} completed.",
            summary.zone,
            summary.score,
            summary.tasks_found,
            summary.tasks_created,
            summary.tasks_completed
        );
        if !summary.completed_tasks.is_empty() {
            msg.push_str(" Done: ");
            msg.push_str(&summary.completed_tasks.join("; "));
            msg.push('.');
        }
        msg
    }

    pub fn format_analysis_error(&self, failure: &AnalysisFailure) -> String {
        format!(
            "Analysis of {} failed while {}: {}",
            failure.zone, failure.phase, failure.reason
        )
    }

    pub fn format_system_status(&self, status: &SystemStatus) -> String {
        format!(
            "System status: {} zones, {} active tasks, {:.0}% completion rate.",
            status.total_zones,
            status.active_tasks,
            status.completion_rate * 100.0
        )
    }

    pub fn render(&self, payload: &NotificationPayload) -> String {
        match payload {
            NotificationPayload::TaskCreated(t) => self.format_task_notification(t),
            NotificationPayload::AnalysisComplete(s) => self.format_analysis_complete(s),
            NotificationPayload::AnalysisError(f) => self.format_analysis_error(f),
            NotificationPayload::SystemStatus(s) => self.format_system_status(s),
        }
    }

    /// Short heading for channels that carry one.
    pub fn title(&self, payload: &NotificationPayload) -> String {
        match payload {
            NotificationPayload::TaskCreated(t) => format!("Tidy: {}", t.zone),
            NotificationPayload::AnalysisComplete(s) => format!("Tidy: {} analyzed", s.zone),
            NotificationPayload::AnalysisError(f) => format!("Tidy: {} analysis failed", f.zone),
            NotificationPayload::SystemStatus(_) => "Tidy: status".to_string(),
        }
    }
}
