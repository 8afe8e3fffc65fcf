pub mod channel;
pub mod engine;
pub mod payload;
pub mod personality;
pub mod sender;
pub mod template;

pub use channel::{HubChannel, NotificationChannel, OutgoingMessage, WebhookChannel};
pub use engine::NotificationEngine;
pub use payload::WebhookDialect;
pub use personality::PersonalityFormatter;
pub use sender::{NotificationSender, RetryPolicy, SenderConfig, SenderStatus};
pub use template::MessageTemplate;
