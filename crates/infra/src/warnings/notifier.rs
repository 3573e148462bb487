//! Delivery of warning messages to staff.

use std::sync::Mutex;

use serde::Serialize;
use serde_json::json;
use tracing::info;

/// Errors raised while delivering a notification.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),

    #[error("notification channel returned status {0}")]
    Status(u16),
}

/// A rendered message addressed to one person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Email-like identifier of the recipient.
    pub recipient: String,
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn new(
        recipient: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            title: title.into(),
            body: body.into(),
        }
    }

    /// Display name of the recipient.
    pub fn recipient_name(&self) -> String {
        display_name(&self.recipient)
    }

    /// Text as posted to a chat channel.
    pub fn text(&self) -> String {
        format!("*{}*\n{}, {}", self.title, self.recipient_name(), self.body)
    }
}

/// Display name derived from an email-like identifier.
///
/// `jane.doe@example.com` becomes `Jane`.
pub fn display_name(identifier: &str) -> String {
    let local = identifier.split('@').next().unwrap_or_default();
    let first = local.split('.').next().unwrap_or_default();
    let mut chars = first.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Outbound notification channel.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

#[async_trait::async_trait]
impl<N> Notifier for std::sync::Arc<N>
where
    N: Notifier + ?Sized,
{
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        (**self).notify(notification).await
    }
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        info!(
            recipient = %notification.recipient,
            title = %notification.title,
            body = %notification.body,
            "notification (not delivered)"
        );
        Ok(())
    }
}

/// Posts notifications to a chat webhook as `{"text": ...}`.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "text": notification.text() }))
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        Ok(())
    }
}

/// In-memory notifier for tests/dev.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every delivery fails (after recording the attempt).
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .map_err(|_| NotifyError::Delivery("recording lock poisoned".to_string()))?
            .push(notification.clone());
        if self.fail {
            return Err(NotifyError::Delivery("channel unavailable".to_string()));
        }
        Ok(())
    }
}
