//! Per-dependency probes.
//!
//! A probe never fails: every collaborator error is folded into a
//! [`ProbeOutcome`] carrying both the gating [`ServiceState`] and the
//! informational [`HealthState`].

use std::sync::Arc;

use readyboard_core::model::{HealthSlot, HealthState, ServiceState, ServiceStatus};
use readyboard_core::Error;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::ports::{
    EndpointApi, EndpointError, EndpointLifecycle, FunctionApi, FunctionError, ModelApi,
    ModelError,
};

/// What a target is and how to reach it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeKind {
    Function {
        function: String,
    },
    Endpoint {
        endpoint: String,
        #[serde(default)]
        fallback_function: Option<String>,
    },
    Model {
        model_id: String,
        #[serde(default)]
        fallback_function: Option<String>,
    },
}

/// One monitored dependency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProbeTarget {
    pub name: String,
    pub slot: HealthSlot,
    #[serde(flatten)]
    pub kind: ProbeKind,
}

impl ProbeTarget {
    pub fn function(name: &str, slot: HealthSlot, function: &str) -> Self {
        Self {
            name: name.to_string(),
            slot,
            kind: ProbeKind::Function {
                function: function.to_string(),
            },
        }
    }

    pub fn endpoint(name: &str, slot: HealthSlot, endpoint: &str, fallback: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            slot,
            kind: ProbeKind::Endpoint {
                endpoint: endpoint.to_string(),
                fallback_function: fallback.map(str::to_string),
            },
        }
    }

    pub fn model(name: &str, slot: HealthSlot, model_id: &str, fallback: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            slot,
            kind: ProbeKind::Model {
                model_id: model_id.to_string(),
                fallback_function: fallback.map(str::to_string),
            },
        }
    }
}

/// Result of probing one target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub name: String,
    pub slot: HealthSlot,
    pub state: ServiceState,
    pub health: HealthState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ProbeOutcome {
    fn new(target: &ProbeTarget, state: ServiceState, health: HealthState) -> Self {
        Self {
            name: target.name.clone(),
            slot: target.slot,
            state,
            health,
            detail: None,
        }
    }

    fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Most pessimistic outcome, used when the probe itself could not finish.
    pub fn failed(target: &ProbeTarget, reason: impl Into<String>) -> Self {
        let err = Error::ProbeFailure {
            target: target.name.clone(),
            reason: reason.into(),
        };
        warn!(probe = %target.name, error = %err, "probe failed");
        Self::new(target, ServiceState::Down, HealthState::Down).detail(err.to_string())
    }

    pub fn to_status(&self) -> ServiceStatus {
        ServiceStatus {
            name: self.name.clone(),
            state: self.state,
            detail: self.detail.clone(),
        }
    }
}

/// Handles to every collaborator a probe may need.
#[derive(Clone)]
pub struct Collaborators {
    pub functions: Arc<dyn FunctionApi>,
    pub endpoints: Arc<dyn EndpointApi>,
    pub models: Arc<dyn ModelApi>,
}

/// Cheapest valid request for a model: one token for chat models, a short
/// low-dimension embedding for the rest.
pub fn minimal_body(model_id: &str) -> Value {
    if model_id.contains("anthropic") {
        json!({
            "anthropic_version": "bedrock-2023-05-31",
            "max_tokens": 1,
            "messages": [{ "role": "user", "content": "hi" }],
        })
    } else {
        json!({ "inputText": "test", "dimensions": 256, "normalize": true })
    }
}

/// Probe one target.
pub async fn run_probe(c: &Collaborators, target: &ProbeTarget) -> ProbeOutcome {
    let outcome = match &target.kind {
        ProbeKind::Function { function } => probe_function(c, target, function).await,
        ProbeKind::Endpoint {
            endpoint,
            fallback_function,
        } => probe_endpoint(c, target, endpoint, fallback_function.as_deref()).await,
        ProbeKind::Model {
            model_id,
            fallback_function,
        } => probe_model(c, target, model_id, fallback_function.as_deref()).await,
    };
    debug!(probe = %outcome.name, state = ?outcome.state, health = ?outcome.health, "probe settled");
    outcome
}

async fn probe_function(c: &Collaborators, target: &ProbeTarget, function: &str) -> ProbeOutcome {
    use HealthState as H;
    use ServiceState as S;

    match c.functions.dry_run(function).await {
        Ok(()) => ProbeOutcome::new(target, S::Up, H::Up),
        Err(FunctionError::NotFound) => {
            ProbeOutcome::new(target, S::NotDeployed, H::Degraded).detail("function not deployed")
        }
        // The function exists; only the caller's credentials are wrong.
        Err(FunctionError::AccessDenied(msg)) => ProbeOutcome::new(target, S::Up, H::Degraded)
            .detail(format!("reachable, access denied: {msg}")),
        Err(FunctionError::Other(msg)) => ProbeOutcome::failed(target, msg),
    }
}

async fn probe_endpoint(
    c: &Collaborators,
    target: &ProbeTarget,
    endpoint: &str,
    fallback: Option<&str>,
) -> ProbeOutcome {
    use HealthState as H;
    use ServiceState as S;

    match c.endpoints.describe(endpoint).await {
        Ok(EndpointLifecycle::InService) => ProbeOutcome::new(target, S::Up, H::Up),
        Ok(l @ (EndpointLifecycle::Creating | EndpointLifecycle::Updating)) => {
            ProbeOutcome::new(target, S::Starting, H::Degraded).detail(l.to_string())
        }
        Ok(EndpointLifecycle::Deleting) => {
            ProbeOutcome::new(target, S::Stopping, H::Down).detail("Deleting")
        }
        Ok(other) => ProbeOutcome::new(target, S::Down, H::Down).detail(other.to_string()),
        Err(EndpointError::NotFound) => {
            let Some(function) = fallback else {
                return ProbeOutcome::new(target, S::NotDeployed, H::Degraded)
                    .detail("endpoint not deployed");
            };
            match c.functions.dry_run(function).await {
                Ok(()) => ProbeOutcome::new(target, S::Up, H::Up)
                    .detail(format!("endpoint stopped, served via fallback function {function}")),
                Err(e) => ProbeOutcome::new(target, S::NotDeployed, H::Degraded)
                    .detail(format!("endpoint not deployed, fallback failed: {e}")),
            }
        }
        Err(EndpointError::AccessDenied(msg)) => {
            ProbeOutcome::new(target, S::Down, H::Degraded).detail(format!("access denied: {msg}"))
        }
        Err(EndpointError::Other(msg)) => ProbeOutcome::failed(target, msg),
    }
}

async fn probe_model(
    c: &Collaborators,
    target: &ProbeTarget,
    model_id: &str,
    fallback: Option<&str>,
) -> ProbeOutcome {
    use HealthState as H;
    use ServiceState as S;

    match c.models.invoke(model_id, minimal_body(model_id)).await {
        Ok(()) => ProbeOutcome::new(target, S::Up, H::Up),
        // Throttling proves the service answered.
        Err(ModelError::Throttled) => ProbeOutcome::new(target, S::Up, H::Up).detail("throttled"),
        Err(e @ (ModelError::NotFound | ModelError::AccessDenied(_))) => match fallback {
            Some(function) => match c.functions.dry_run(function).await {
                Ok(()) => ProbeOutcome::new(target, S::Up, H::Up)
                    .detail(format!("model {e}, served via fallback function {function}")),
                Err(fe) => ProbeOutcome::new(target, S::Down, H::Degraded)
                    .detail(format!("model {e}, fallback failed: {fe}")),
            },
            None => ProbeOutcome::new(target, S::Down, H::Degraded).detail(e.to_string()),
        },
        Err(e @ (ModelError::Validation(_) | ModelError::NotReady)) => {
            ProbeOutcome::new(target, S::Down, H::Degraded).detail(e.to_string())
        }
        Err(ModelError::Other(msg)) => ProbeOutcome::failed(target, msg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anthropic_models_get_a_message_body() {
        let body = minimal_body("us.anthropic.claude-3-5-haiku-20241022-v1:0");
        assert_eq!(body["max_tokens"], 1);
        let body = minimal_body("amazon.titan-embed-text-v2:0");
        assert_eq!(body["dimensions"], 256);
    }

    #[test]
    fn targets_parse_from_tagged_toml() {
        #[derive(Deserialize)]
        struct File {
            targets: Vec<ProbeTarget>,
        }
        let file: File = toml::from_str(
            r#"
            [[targets]]
            name = "Voice"
            slot = "voice"
            kind = "function"
            function = "voice-handler"

            [[targets]]
            name = "Chat"
            slot = "chat_model"
            kind = "model"
            model_id = "anthropic.claude"
            fallback_function = "chat-handler"
            "#,
        )
        .unwrap();
        assert_eq!(
            file.targets[0],
            ProbeTarget::function("Voice", HealthSlot::Voice, "voice-handler")
        );
        assert_eq!(
            file.targets[1],
            ProbeTarget::model("Chat", HealthSlot::ChatModel, "anthropic.claude", Some("chat-handler"))
        );
    }
}
