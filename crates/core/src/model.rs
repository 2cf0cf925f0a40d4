//! Domain types shared by the daemon and its clients.

use serde::{Deserialize, Serialize};

/// Milliseconds since UNIX epoch.
pub type EpochMs = i64;

/// Lifecycle of one monitored dependency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    /// Serving requests.
    Up,
    /// Being created; not yet serving.
    Starting,
    /// Being torn down.
    Stopping,
    /// Unreachable or failed.
    Down,
    /// Absent and not being created.
    NotDeployed,
}

/// Observed state of one dependency. Recomputed on every poll.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceStatus {
    /// Display name of the dependency.
    pub name: String,
    /// Coarse lifecycle state.
    pub state: ServiceState,
    /// Optional note, e.g. "served via fallback function".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ServiceStatus {
    /// Status without detail.
    pub fn new(name: impl Into<String>, state: ServiceState) -> Self {
        Self {
            name: name.into(),
            state,
            detail: None,
        }
    }

    /// Attach a detail note.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Overall readiness derived from a list of [`ServiceStatus`].
///
/// `Loading` is only ever held before the first poll has settled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Overall {
    /// Every dependency is up.
    Ready,
    /// Nothing is up yet but something is starting.
    Provisioning,
    /// Some dependencies are up.
    Partial,
    /// Nothing is up or starting.
    Down,
    /// No poll has settled yet.
    Loading,
}

/// Informational per-probe state used by the health view.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// Probe succeeded.
    Up,
    /// Probe failed.
    Down,
    /// Reachable but impaired or served via fallback.
    Degraded,
}

/// Slot of the health view a probe target reports into.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum HealthSlot {
    /// Voice classification backend.
    Voice,
    /// Submission handler.
    Submission,
    /// Hosted chat model.
    ChatModel,
    /// Hosted embedding model.
    EmbeddingModel,
    /// On-demand inference endpoint.
    InferenceEndpoint,
}

/// Per-probe health, independent of [`Overall`]. Never gates content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthSnapshot {
    /// The dashboard backend itself.
    pub dashboard: HealthState,
    /// See [`HealthSlot::Voice`].
    pub voice: HealthState,
    /// See [`HealthSlot::Submission`].
    pub submission: HealthState,
    /// See [`HealthSlot::ChatModel`].
    pub chat_model: HealthState,
    /// See [`HealthSlot::EmbeddingModel`].
    pub embedding_model: HealthState,
    /// See [`HealthSlot::InferenceEndpoint`].
    pub inference_endpoint: HealthState,
    /// When the probes settled.
    pub last_check_ms: EpochMs,
}

impl HealthSnapshot {
    /// Everything down. Used before the first poll settles.
    pub fn pessimistic(last_check_ms: EpochMs) -> Self {
        Self {
            dashboard: HealthState::Down,
            voice: HealthState::Down,
            submission: HealthState::Down,
            chat_model: HealthState::Down,
            embedding_model: HealthState::Down,
            inference_endpoint: HealthState::Down,
            last_check_ms,
        }
    }

    /// Build a snapshot from slot readings. The dashboard is up by
    /// construction; slots without a reading are down.
    pub fn from_slots<I>(readings: I, last_check_ms: EpochMs) -> Self
    where
        I: IntoIterator<Item = (HealthSlot, HealthState)>,
    {
        let mut snap = Self::pessimistic(last_check_ms);
        snap.dashboard = HealthState::Up;
        for (slot, state) in readings {
            *snap.slot_mut(slot) = state;
        }
        snap
    }

    /// Reading for one slot.
    pub fn slot(&self, slot: HealthSlot) -> HealthState {
        match slot {
            HealthSlot::Voice => self.voice,
            HealthSlot::Submission => self.submission,
            HealthSlot::ChatModel => self.chat_model,
            HealthSlot::EmbeddingModel => self.embedding_model,
            HealthSlot::InferenceEndpoint => self.inference_endpoint,
        }
    }

    fn slot_mut(&mut self, slot: HealthSlot) -> &mut HealthState {
        match slot {
            HealthSlot::Voice => &mut self.voice,
            HealthSlot::Submission => &mut self.submission,
            HealthSlot::ChatModel => &mut self.chat_model,
            HealthSlot::EmbeddingModel => &mut self.embedding_model,
            HealthSlot::InferenceEndpoint => &mut self.inference_endpoint,
        }
    }

    /// True when the UI should show the degraded banner.
    pub fn is_degraded(&self) -> bool {
        [
            self.dashboard,
            self.voice,
            self.submission,
            self.chat_model,
            self.embedding_model,
            self.inference_endpoint,
        ]
        .iter()
        .any(|s| *s != HealthState::Up)
    }
}

/// Supported utterance languages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    /// English.
    En,
    /// Swahili.
    Sw,
    /// French.
    Fr,
}

impl Language {
    /// Short language tag.
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Sw => "sw",
            Language::Fr => "fr",
        }
    }

    /// Parse a tag or a language name as returned by remote backends.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "en" | "english" => Some(Language::En),
            "sw" | "swahili" | "kiswahili" => Some(Language::Sw),
            "fr" | "french" | "français" | "francais" => Some(Language::Fr),
            _ => None,
        }
    }
}

/// Intent categories understood by the voice demo.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Balance inquiry.
    CheckBalance,
    /// Money transfer.
    SendMoney,
    /// Account or profile details.
    AccountInfo,
    /// Request for assistance.
    Help,
    /// Salutation.
    Greeting,
    /// Nothing matched.
    Unknown,
}

impl Intent {
    /// Parse a snake_case intent label. Anything unrecognised is `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "check_balance" => Intent::CheckBalance,
            "send_money" => Intent::SendMoney,
            "account_info" => Intent::AccountInfo,
            "help" => Intent::Help,
            "greeting" => Intent::Greeting,
            _ => Intent::Unknown,
        }
    }
}

/// Which path produced a classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    /// The remote backend answered.
    Remote,
    /// Local keyword rules answered.
    LocalFallback,
}

/// Result of classifying one utterance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassificationResult {
    /// Detected language.
    pub language: Language,
    /// Detected intent.
    pub intent: Intent,
    /// Trust tier in `[0, 1]`.
    pub confidence: f64,
    /// Canned agent reply.
    pub response: String,
    /// Wall-clock duration of the whole call.
    pub latency_ms: u64,
    /// Which path produced the answer.
    pub source: ClassificationSource,
}

/// One submission attempt as kept by the history store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmissionEntry {
    /// ULID of the attempt.
    pub id: String,
    /// When the attempt was made.
    #[serde(rename = "timestamp")]
    pub timestamp_ms: EpochMs,
    /// Outcome label, e.g. `delivered` or `rate_limited`.
    pub status: String,
    /// Target URL.
    pub endpoint: String,
    /// `name` field of the payload, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// HTTP status, or 502 for transport failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
}
