//! Submission dispatch and history listing.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use readyboard_core::api::{SubmissionList, SubmissionTriggerResponse};
use readyboard_core::model::SubmissionEntry;
use readyboard_core::submission::{
    status_label, SubmissionStore, ERROR_LABEL, TRANSPORT_FAILURE_STATUS,
};
use readyboard_core::{new_ulid, now_ms, Error, Result};
use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};

/// Where and what to submit.
#[derive(Debug, Clone, Default)]
pub struct SubmissionTarget {
    pub endpoint: Option<String>,
    pub token: Option<String>,
    pub payload: Option<Value>,
}

pub struct SubmissionDispatcher {
    client: Client,
    target: SubmissionTarget,
    history: Arc<dyn SubmissionStore>,
}

impl SubmissionDispatcher {
    pub fn new(
        target: SubmissionTarget,
        history: Arc<dyn SubmissionStore>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("build submission http client")?;
        Ok(Self {
            client,
            target,
            history,
        })
    }

    /// Newest-first history.
    pub fn history(&self) -> Result<SubmissionList> {
        let submissions = self.history.list()?;
        Ok(SubmissionList {
            count: submissions.len(),
            submissions,
            last_checked_ms: now_ms(),
        })
    }

    /// Post the configured payload once and record the outcome.
    ///
    /// Transport failures are recorded, not returned; only a missing or
    /// unusable configuration is an error.
    pub async fn trigger(&self) -> Result<SubmissionTriggerResponse> {
        let endpoint = self
            .target
            .endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| Error::invalid_input("submission endpoint not configured"))?;
        let token = self
            .target
            .token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Error::invalid_input("submission token not configured"))?;
        let payload = match &self.target.payload {
            Some(p @ Value::Object(_)) => p,
            _ => return Err(Error::invalid_input("submission payload must be a JSON object")),
        };

        let id = new_ulid().to_string();
        let timestamp_ms = now_ms();
        let sent = self
            .client
            .post(endpoint)
            .bearer_auth(token)
            .json(payload)
            .send()
            .await;

        let (status, http_status, body, error) = match sent {
            Ok(resp) => {
                let code = resp.status().as_u16();
                let body = resp.json::<Value>().await.ok();
                (status_label(code), code, body, None)
            }
            Err(e) => {
                warn!(endpoint, error = %e, "submission not delivered");
                (
                    ERROR_LABEL.to_string(),
                    TRANSPORT_FAILURE_STATUS,
                    None,
                    Some(e.to_string()),
                )
            }
        };

        let entry = SubmissionEntry {
            id: id.clone(),
            timestamp_ms,
            status: status.clone(),
            endpoint: endpoint.to_string(),
            name: payload.get("name").and_then(Value::as_str).map(str::to_string),
            http_status: Some(http_status),
        };
        let history = Arc::clone(&self.history);
        match tokio::task::spawn_blocking(move || history.append(entry)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(id = %id, error = %e, "failed to record submission"),
            Err(e) => warn!(id = %id, error = %e, "submission history task failed"),
        }
        info!(id = %id, status = %status, http_status, "submission dispatched");

        Ok(SubmissionTriggerResponse {
            id,
            status,
            http_status: Some(http_status),
            endpoint: endpoint.to_string(),
            timestamp_ms,
            body,
            error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use readyboard_core::submission::MemorySubmissionStore;
    use serde_json::json;

    fn dispatcher(target: SubmissionTarget) -> SubmissionDispatcher {
        SubmissionDispatcher::new(
            target,
            Arc::new(MemorySubmissionStore::default()),
            Duration::from_secs(2),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn missing_configuration_is_invalid_input() {
        let d = dispatcher(SubmissionTarget::default());
        assert!(matches!(d.trigger().await, Err(Error::InvalidInput(_))));

        let d = dispatcher(SubmissionTarget {
            endpoint: Some("http://127.0.0.1:9/submit".into()),
            token: Some("  ".into()),
            payload: Some(json!({"name": "x"})),
        });
        assert!(matches!(d.trigger().await, Err(Error::InvalidInput(_))));

        let d = dispatcher(SubmissionTarget {
            endpoint: Some("http://127.0.0.1:9/submit".into()),
            token: Some("secret".into()),
            payload: Some(json!(["not", "an", "object"])),
        });
        assert!(matches!(d.trigger().await, Err(Error::InvalidInput(_))));
        assert_eq!(d.history().unwrap().count, 0);
    }

    #[tokio::test]
    async fn transport_failure_is_recorded_as_error() {
        // Port 9 (discard) is closed on test hosts; the connect is refused.
        let d = dispatcher(SubmissionTarget {
            endpoint: Some("http://127.0.0.1:9/submit".into()),
            token: Some("secret".into()),
            payload: Some(json!({"name": "Ada"})),
        });
        let resp = d.trigger().await.unwrap();
        assert_eq!(resp.status, ERROR_LABEL);
        assert_eq!(resp.http_status, Some(TRANSPORT_FAILURE_STATUS));
        assert!(resp.error.is_some());
        assert_eq!(resp.id.len(), 26);

        let list = d.history().unwrap();
        assert_eq!(list.count, 1);
        assert_eq!(list.submissions[0].id, resp.id);
        assert_eq!(list.submissions[0].name.as_deref(), Some("Ada"));
    }
}
