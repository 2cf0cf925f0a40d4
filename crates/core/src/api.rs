//! Request and response bodies of the HTTP API.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{EpochMs, HealthSnapshot, Overall, ServiceStatus, SubmissionEntry};

/// Classification request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyRequest {
    /// Utterance to classify.
    pub text: String,
}

impl ClassifyRequest {
    /// Extract from an arbitrary JSON body so a missing or non-string `text`
    /// becomes `InvalidInput` instead of a decoding failure.
    pub fn from_json(body: &serde_json::Value) -> Result<Self> {
        match body.get("text") {
            Some(serde_json::Value::String(text)) if !text.trim().is_empty() => Ok(Self {
                text: text.clone(),
            }),
            _ => Err(Error::invalid_input("missing or invalid \"text\" field")),
        }
    }
}

/// Reply from a remote classification backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteClassification {
    /// Language tag or name.
    pub language: String,
    /// Snake_case intent label.
    #[serde(default)]
    pub intent: Option<String>,
    /// Reply text chosen by the backend.
    #[serde(default)]
    pub response: Option<String>,
    /// Backend-reported confidence.
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Provisioning action request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionAction {
    /// Bring the on-demand dependency up.
    Start,
    /// Take it down.
    Stop,
}

impl ProvisionAction {
    /// Parse `{"action": "start" | "stop"}`.
    pub fn from_json(body: &serde_json::Value) -> Result<Self> {
        match body.get("action").and_then(|v| v.as_str()) {
            Some("start") => Ok(Self::Start),
            Some("stop") => Ok(Self::Stop),
            _ => Err(Error::invalid_input("invalid action")),
        }
    }
}

/// Gating view of the monitored dependencies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProvisioningStatus {
    /// Reduced readiness.
    pub overall: Overall,
    /// Per-dependency states in target order.
    pub services: Vec<ServiceStatus>,
    /// Start of the active session, if any.
    #[serde(default)]
    pub started_at_ms: Option<EpochMs>,
    /// Whole minutes since the session started.
    pub elapsed_minutes: u64,
    /// Session ceiling.
    pub max_minutes: u64,
}

impl ProvisioningStatus {
    /// State held before the first poll settles.
    pub fn loading(max_minutes: u64) -> Self {
        Self {
            overall: Overall::Loading,
            services: vec![],
            started_at_ms: None,
            elapsed_minutes: 0,
            max_minutes,
        }
    }
}

/// What a start command did to the on-demand dependency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum StartOutcome {
    /// Endpoint was already in service.
    AlreadyRunning,
    /// Endpoint was already being created or updated.
    AlreadyStarting,
    /// Endpoint exists in some other lifecycle state.
    Exists {
        /// Lifecycle label reported by the control plane.
        status: String,
    },
    /// Creation was requested.
    Starting,
    /// The control plane rejected the request.
    Failed {
        /// Human readable cause.
        reason: String,
    },
}

/// What a stop command did to the on-demand dependency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum StopOutcome {
    /// Deletion was requested.
    Stopping,
    /// Endpoint was already being deleted.
    AlreadyStopping,
    /// Nothing to delete.
    NotFound,
    /// The control plane rejected the request.
    Failed {
        /// Human readable cause.
        reason: String,
    },
}

/// Response to a start command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StartResponse {
    /// Readiness after the start request.
    pub overall: Overall,
    /// Per-dependency states.
    pub services: Vec<ServiceStatus>,
    /// Session start, unless the request failed.
    #[serde(default)]
    pub started_at_ms: Option<EpochMs>,
    /// What was done.
    pub action: StartOutcome,
}

/// Response to a stop command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StopResponse {
    /// False only when the control plane rejected the stop.
    pub acknowledged: bool,
    /// What was done.
    pub action: StopOutcome,
    /// When local state was reset.
    pub timestamp_ms: EpochMs,
}

/// Combined read-only view handed to the display layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusSnapshot {
    /// Informational health view.
    pub health: HealthSnapshot,
    /// Gating provisioning view.
    pub provisioning: ProvisioningStatus,
    /// Recent submissions, newest first.
    pub submissions: Vec<SubmissionEntry>,
}

/// Submission history listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmissionList {
    /// Entries, newest first.
    pub submissions: Vec<SubmissionEntry>,
    /// Number of entries.
    pub count: usize,
    /// When the history was read.
    pub last_checked_ms: EpochMs,
}

/// Result of dispatching one submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmissionTriggerResponse {
    /// ULID of the recorded entry.
    pub id: String,
    /// Outcome label.
    pub status: String,
    /// HTTP status, or 502 for transport failures.
    #[serde(default)]
    pub http_status: Option<u16>,
    /// Target URL.
    pub endpoint: String,
    /// When the request was sent.
    pub timestamp_ms: EpochMs,
    /// JSON reply from the endpoint, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    /// Transport error text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
