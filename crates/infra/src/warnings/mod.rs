//! Delivery and activation warnings for open orders.

mod notifier;
mod scheduler;

pub use notifier::{
    display_name, LogNotifier, Notification, Notifier, NotifyError, RecordingNotifier,
    WebhookNotifier,
};
pub use scheduler::{Warning, WarningDispatch, WarningKind, WarningScheduler};
