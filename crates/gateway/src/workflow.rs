//! Extraction workflow webhook
//!
//! Each upload is announced to the external workflow with one JSON POST.
//! The workflow later reports the extracted text on `/analyze/callback`.

use acadhelper_common::config::WorkflowConfig;
use acadhelper_common::errors::{AppError, Result};
use serde::Serialize;
use std::time::Duration;

/// Payload announcing a new upload
#[derive(Debug, Clone, Serialize)]
pub struct UploadEvent<'a> {
    pub assignment_id: i32,
    pub filename: &'a str,
    pub topic: &'a str,
}

/// Client for the workflow webhook
pub struct WorkflowNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl WorkflowNotifier {
    pub fn new(config: &WorkflowConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            webhook_url: config.webhook_url.clone(),
        })
    }

    pub fn webhook_url(&self) -> &str {
        &self.webhook_url
    }

    /// POST the event; non-2xx answers count as failures
    pub async fn notify(&self, event: &UploadEvent<'_>) -> Result<()> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(event)
            .send()
            .await
            .map_err(|e| AppError::WorkflowError {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::WorkflowError {
                message: format!("webhook answered {}", status),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_payload_shape() {
        let event = UploadEvent {
            assignment_id: 12,
            filename: "abc_essay.pdf",
            topic: "Ethics",
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"assignment_id": 12, "filename": "abc_essay.pdf", "topic": "Ethics"})
        );
    }

    #[tokio::test]
    async fn test_unreachable_webhook_is_an_error() {
        let notifier = WorkflowNotifier::new(&WorkflowConfig {
            webhook_url: "http://127.0.0.1:1/webhook/assignment".into(),
            timeout_secs: 1,
        })
        .unwrap();

        let err = notifier
            .notify(&UploadEvent { assignment_id: 1, filename: "f", topic: "t" })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::WorkflowError { .. }));
    }
}
