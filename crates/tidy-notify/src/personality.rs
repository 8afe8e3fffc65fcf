use tidy_core::notification::{
    AnalysisFailure, AnalysisSummary, NotificationKind, NotificationPayload, SystemStatus,
    TaskMessage,
};
use tidy_core::Personality;

use crate::template::MessageTemplate;

/// Tone words for one personality. Every voiced message is the neutral
/// [`MessageTemplate`] rendering framed by an opener and a closer; new-task
/// announcements get their own pair.
struct Voice {
    task_opener: &'static str,
    task_closer: &'static str,
    opener: &'static str,
    closer: &'static str,
}

const fn voice(p: Personality) -> Voice {
    match p {
        Personality::Default => Voice {
            task_opener: "",
            task_closer: "",
            opener: "",
            closer: "",
        },
        Personality::Snarky => Voice {
            task_opener: "Oh look, another mess. ",
            task_closer: " Surprise, surprise.",
            opener: "Well, well. ",
            closer: " Seriously, who could have guessed?",
        },
        Personality::Jarvis => Voice {
            task_opener: "Sir, I recommend attending to this at your earliest opportunity. ",
            task_closer: "",
            opener: "Sir, I must inform you: ",
            closer: " Shall I assist with anything else?",
        },
        Personality::Roaster => Voice {
            task_opener: "Yikes, somebody is being lazy. ",
            task_closer: " What a disaster.",
            opener: "Oh no. ",
            closer: " Houston, we have a messy problem.",
        },
        Personality::Butler => Voice {
            task_opener: "If you will, kindly see to the following. ",
            task_closer: " At your convenience.",
            opener: "Pardon the interruption. ",
            closer: " At your convenience, of course.",
        },
        Personality::Coach => Voice {
            task_opener: "Let's go, champion! ",
            task_closer: " You got this!",
            opener: "Team huddle! ",
            closer: " Power through, you're unstoppable!",
        },
        Personality::Zen => Voice {
            task_opener: "Mindfully restore balance. ",
            task_closer: " Peace follows a clear space.",
            opener: "Breathe. ",
            closer: " Serenity lives in simple order.",
        },
    }
}

/// Applies one of the seven voices to notification data.
#[derive(Clone, Debug, Default)]
pub struct PersonalityFormatter {
    personality: Personality,
    template: MessageTemplate,
}

impl PersonalityFormatter {
    /// Unknown names fall back to [`Personality::Default`].
    pub fn new(name: &str) -> Self {
        let mut formatter = Self::default();
        formatter.set_personality(name);
        formatter
    }

    pub fn with_personality(personality: Personality) -> Self {
        Self {
            personality,
            template: MessageTemplate::new(),
        }
    }

    pub fn personality(&self) -> Personality {
        self.personality
    }

    /// Returns false (and selects `default`) for unrecognized names.
    pub fn set_personality(&mut self, name: &str) -> bool {
        match Personality::from_name(name) {
            Some(p) => {
                self.personality = p;
                true
            }
            None => {
                tracing::warn!(personality = name, "unknown personality, using default");
                self.personality = Personality::Default;
                false
            }
        }
    }

    /// Frames an already rendered neutral message in this voice.
    fn voiced(&self, kind: NotificationKind, neutral: String) -> String {
        let v = voice(self.personality);
        let (opener, closer) = match kind {
            NotificationKind::TaskCreated => (v.task_opener, v.task_closer),
            _ => (v.opener, v.closer),
        };
        format!("{opener}{neutral}{closer}")
    }

    pub fn format_task_message(&self, task: &TaskMessage) -> String {
        self.voiced(
            NotificationKind::TaskCreated,
            self.template.format_task_notification(task),
        )
    }

    pub fn format_analysis_message(&self, summary: &AnalysisSummary) -> String {
        self.voiced(
            NotificationKind::AnalysisComplete,
            self.template.format_analysis_complete(summary),
        )
    }

    pub fn format_error_message(&self, failure: &AnalysisFailure) -> String {
        self.voiced(
            NotificationKind::AnalysisError,
            self.template.format_analysis_error(failure),
        )
    }

    pub fn format_status_message(&self, status: &SystemStatus) -> String {
        self.voiced(
            NotificationKind::SystemStatus,
            self.template.format_system_status(status),
        )
    }

    pub fn format(&self, payload: &NotificationPayload) -> String {
        self.voiced(payload.kind(), self.template.render(payload))
    }

    pub fn template(&self) -> &MessageTemplate {
        &self.template
    }
}
