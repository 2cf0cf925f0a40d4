use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use readyboard_core::model::HealthSlot;
use readyboard_core::session::DEFAULT_MAX_SESSION_MINUTES;
use readyboard_core::status::ReducePolicy;
use readyboard_core::submission::DEFAULT_MAX_ENTRIES;
use serde::Deserialize;

use crate::probes::ProbeTarget;
use crate::provisioning::OnDemandEndpoint;
use crate::submissions::SubmissionTarget;

#[derive(Debug, Parser)]
#[command(name = "readyboard-daemon", version, about = "Readiness dashboard backend")]
pub struct Cli {
    /// Where the HTTP API listens.
    #[arg(long, default_value = "127.0.0.1:8787")]
    pub listen: SocketAddr,

    /// Base URL of the control-plane gateway fronting functions, endpoints and models.
    #[arg(long, default_value = "http://127.0.0.1:9000")]
    pub gateway_url: String,

    /// Remote voice classifier. Local keyword rules only when unset.
    #[arg(long)]
    pub voice_url: Option<String>,

    /// TOML file overriding the probe targets and the on-demand endpoint.
    #[arg(long)]
    pub targets: Option<PathBuf>,

    /// Per-probe deadline in milliseconds.
    #[arg(long, default_value_t = 8_000)]
    pub probe_timeout_ms: u64,

    /// Remote classifier deadline in milliseconds before falling back to keywords.
    #[arg(long, default_value_t = 10_000)]
    pub classify_timeout_ms: u64,

    /// Seconds between provisioning status polls.
    #[arg(long, default_value_t = 15)]
    pub provision_poll_secs: u64,

    /// Seconds between health snapshots.
    #[arg(long, default_value_t = 30)]
    pub health_poll_secs: u64,

    /// Seconds between submission history refreshes.
    #[arg(long, default_value_t = 30)]
    pub submissions_poll_secs: u64,

    /// Seconds between session cap checks.
    #[arg(long, default_value_t = 30)]
    pub session_check_secs: u64,

    /// Delay before the first provisioning poll.
    #[arg(long, default_value_t = 500)]
    pub initial_poll_delay_ms: u64,

    /// Ceiling on how long the on-demand endpoint may stay up.
    #[arg(long, default_value_t = DEFAULT_MAX_SESSION_MINUTES)]
    pub max_session_minutes: u64,

    /// strict | legacy
    #[arg(long, default_value = "strict")]
    pub reduce_policy: ReducePolicy,

    /// URL the submission payload is posted to.
    #[arg(long)]
    pub submission_endpoint: Option<String>,

    /// Bearer token for the submission endpoint.
    #[arg(long, env = "READYBOARD_SUBMISSION_TOKEN", hide_env_values = true)]
    pub submission_token: Option<String>,

    /// JSON file holding the submission payload (must be an object).
    #[arg(long)]
    pub submission_payload: Option<PathBuf>,

    /// Submission request deadline in milliseconds.
    #[arg(long, default_value_t = 30_000)]
    pub submission_timeout_ms: u64,

    /// Persist submission history to this JSON file.
    #[arg(long)]
    pub history_file: Option<PathBuf>,

    /// Submission entries kept, newest first.
    #[arg(long, default_value_t = DEFAULT_MAX_ENTRIES)]
    pub history_max: usize,

    /// How long shutdown waits for the teardown stop to reach the endpoint.
    #[arg(long, default_value_t = 500)]
    pub teardown_grace_ms: u64,

    /// Log filter (env-filter syntax).
    #[arg(long, default_value = "info")]
    pub log: String,
}

#[derive(Debug, Clone)]
pub struct Intervals {
    pub provision_poll: Duration,
    pub health_poll: Duration,
    pub submissions_poll: Duration,
    pub session_check: Duration,
    pub initial_poll_delay: Duration,
}

impl Default for Intervals {
    fn default() -> Self {
        Self {
            provision_poll: Duration::from_secs(15),
            health_poll: Duration::from_secs(30),
            submissions_poll: Duration::from_secs(30),
            session_check: Duration::from_secs(30),
            initial_poll_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub listen: SocketAddr,
    pub gateway_url: String,
    pub voice_url: Option<String>,
    pub targets: Vec<ProbeTarget>,
    pub on_demand: OnDemandEndpoint,
    pub probe_timeout: Duration,
    pub classify_timeout: Duration,
    pub intervals: Intervals,
    pub max_session_minutes: u64,
    pub reduce_policy: ReducePolicy,
    pub submission: SubmissionTarget,
    pub submission_timeout: Duration,
    pub history_file: Option<PathBuf>,
    pub history_max: usize,
    pub teardown_grace: Duration,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8787)),
            gateway_url: "http://127.0.0.1:9000".into(),
            voice_url: None,
            targets: default_targets(),
            on_demand: default_on_demand(),
            probe_timeout: Duration::from_millis(8_000),
            classify_timeout: Duration::from_millis(10_000),
            intervals: Intervals::default(),
            max_session_minutes: DEFAULT_MAX_SESSION_MINUTES,
            reduce_policy: ReducePolicy::Strict,
            submission: SubmissionTarget::default(),
            submission_timeout: Duration::from_millis(30_000),
            history_file: None,
            history_max: DEFAULT_MAX_ENTRIES,
            teardown_grace: Duration::from_millis(500),
        }
    }
}

impl Cli {
    /// Resolve flags and referenced files into a [`DaemonConfig`].
    pub fn into_config(self) -> Result<DaemonConfig> {
        let (targets, on_demand) = match &self.targets {
            Some(path) => {
                let file = TargetsFile::load(path)?;
                let targets = if file.targets.is_empty() {
                    default_targets()
                } else {
                    file.targets
                };
                (targets, file.on_demand.unwrap_or_else(default_on_demand))
            }
            None => (default_targets(), default_on_demand()),
        };

        let payload = match &self.submission_payload {
            Some(path) => Some(load_payload(path)?),
            None => None,
        };

        Ok(DaemonConfig {
            listen: self.listen,
            gateway_url: self.gateway_url,
            voice_url: self.voice_url.filter(|u| !u.trim().is_empty()),
            targets,
            on_demand,
            probe_timeout: Duration::from_millis(self.probe_timeout_ms),
            classify_timeout: Duration::from_millis(self.classify_timeout_ms),
            intervals: Intervals {
                provision_poll: Duration::from_secs(self.provision_poll_secs.max(1)),
                health_poll: Duration::from_secs(self.health_poll_secs.max(1)),
                submissions_poll: Duration::from_secs(self.submissions_poll_secs.max(1)),
                session_check: Duration::from_secs(self.session_check_secs.max(1)),
                initial_poll_delay: Duration::from_millis(self.initial_poll_delay_ms),
            },
            max_session_minutes: self.max_session_minutes,
            reduce_policy: self.reduce_policy,
            submission: SubmissionTarget {
                endpoint: self.submission_endpoint,
                token: self.submission_token,
                payload,
            },
            submission_timeout: Duration::from_millis(self.submission_timeout_ms),
            history_file: self.history_file,
            history_max: self.history_max,
            teardown_grace: Duration::from_millis(self.teardown_grace_ms),
        })
    }
}

/// On-disk probe target list.
#[derive(Debug, Default, Deserialize)]
pub struct TargetsFile {
    #[serde(default)]
    pub targets: Vec<ProbeTarget>,
    #[serde(default)]
    pub on_demand: Option<OnDemandEndpoint>,
}

impl TargetsFile {
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).context("parse targets toml")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read targets file {}", path.display()))?;
        Self::parse(&s)
    }
}

fn load_payload(path: &Path) -> Result<serde_json::Value> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("read submission payload {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_slice(&bytes).context("parse submission payload")?;
    if !value.is_object() {
        bail!("submission payload {} is not a JSON object", path.display());
    }
    Ok(value)
}

/// The five monitored dependencies.
pub fn default_targets() -> Vec<ProbeTarget> {
    vec![
        ProbeTarget::function("Submission handler", HealthSlot::Submission, "submission-handler"),
        ProbeTarget::function("Voice handler", HealthSlot::Voice, "voice-handler"),
        ProbeTarget::model(
            "Chat model",
            HealthSlot::ChatModel,
            "us.anthropic.claude-3-5-haiku-20241022-v1:0",
            Some("sentiment-handler"),
        ),
        ProbeTarget::model(
            "Embedding model",
            HealthSlot::EmbeddingModel,
            "amazon.titan-embed-text-v2:0",
            None,
        ),
        ProbeTarget::endpoint(
            "Language detection endpoint",
            HealthSlot::InferenceEndpoint,
            "lang-detect",
            Some("lang-detect-handler"),
        ),
    ]
}

pub fn default_on_demand() -> OnDemandEndpoint {
    OnDemandEndpoint {
        endpoint: "lang-detect".into(),
        config_name: "lang-detect-config".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn every_flag_has_help_text() {
        let cmd = Cli::command();
        let bare: Vec<_> = cmd
            .get_arguments()
            .filter(|a| !a.is_positional() && a.get_help().is_none())
            .map(|a| a.get_id().to_string())
            .collect();
        assert!(bare.is_empty(), "flags without help: {bare:?}");
    }

    #[test]
    fn cli_defaults_match_documented_values() {
        let cli = Cli::parse_from(["readyboard-daemon"]);
        let cfg = cli.into_config().unwrap();
        assert_eq!(cfg.listen.port(), 8787);
        assert_eq!(cfg.probe_timeout, Duration::from_secs(8));
        assert_eq!(cfg.classify_timeout, Duration::from_secs(10));
        assert_eq!(cfg.intervals.provision_poll, Duration::from_secs(15));
        assert_eq!(cfg.intervals.initial_poll_delay, Duration::from_millis(500));
        assert_eq!(cfg.max_session_minutes, 59);
        assert_eq!(cfg.reduce_policy, ReducePolicy::Strict);
        assert_eq!(cfg.targets.len(), 5);
        assert!(cfg.voice_url.is_none());
        assert_eq!(cfg.teardown_grace, Duration::from_millis(500));
    }

    #[test]
    fn reduce_policy_flag_parses() {
        let cli = Cli::parse_from(["readyboard-daemon", "--reduce-policy", "legacy"]);
        assert_eq!(cli.reduce_policy, ReducePolicy::Legacy);
    }

    #[test]
    fn targets_file_overrides_on_demand() {
        let file = TargetsFile::parse(
            r#"
            [[targets]]
            name = "Inference"
            slot = "inference_endpoint"
            kind = "endpoint"
            endpoint = "ep-1"

            [on_demand]
            endpoint = "ep-1"
            config_name = "ep-1-config"
            "#,
        )
        .unwrap();
        assert_eq!(file.targets.len(), 1);
        assert_eq!(file.on_demand.unwrap().config_name, "ep-1-config");
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = TargetsFile::parse(
            r#"
            [[targets]]
            name = "Queue"
            slot = "voice"
            kind = "queue"
            "#,
        );
        assert!(err.is_err());
    }
}
