use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Something an admin should hear about, e.g. a new contact message.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub event: &'static str,
    pub subject: String,
    pub record: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("webhook answered {0}")]
    Status(reqwest::StatusCode),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Writes notifications to the log. Used when no webhook is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            event = notification.event,
            "Notification: {}",
            notification.subject
        );
        Ok(())
    }
}

/// POSTs each notification as JSON to a fixed URL.
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

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .timeout(Duration::from_secs(10))
            .json(notification)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::Status(response.status()));
        }
        Ok(())
    }
}

/// Pick the notifier for the configured webhook, if any.
pub fn from_config(webhook_url: Option<&str>) -> Arc<dyn Notifier> {
    match webhook_url {
        Some(url) => {
            tracing::info!("Notifications go to webhook {}", url);
            Arc::new(WebhookNotifier::new(url))
        }
        None => Arc::new(LogNotifier),
    }
}

/// Fire and forget. The caller's response never waits on delivery; failures
/// only reach the log.
pub fn dispatch(notifier: Arc<dyn Notifier>, notification: Notification) {
    tokio::spawn(async move {
        if let Err(e) = notifier.send(&notification).await {
            tracing::warn!(
                event = notification.event,
                "Notification delivery failed: {}",
                e
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    /// Collects notifications so tests can assert on them.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<Notification>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
            self.sent.lock().await.push(notification.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn dispatch_runs_in_background() {
        let recorder = Arc::new(RecordingNotifier::default());
        dispatch(
            recorder.clone(),
            Notification {
                event: "contact",
                subject: "New contact from Ann".to_string(),
                record: serde_json::json!({"name": "Ann"}),
            },
        );

        for _ in 0..50 {
            if !recorder.sent.lock().await.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let sent = recorder.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].event, "contact");
    }

    #[tokio::test]
    async fn unreachable_webhook_is_an_error_not_a_panic() {
        let notifier = WebhookNotifier::new("http://127.0.0.1:9/hook");
        let result = notifier
            .send(&Notification {
                event: "contact",
                subject: "x".to_string(),
                record: Value::Null,
            })
            .await;
        assert!(result.is_err());
    }
}
