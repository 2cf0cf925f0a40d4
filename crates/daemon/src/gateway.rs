//! reqwest adapters for the collaborator ports.
//!
//! `HttpGateway` speaks to a JSON control-plane gateway that fronts the
//! function, endpoint and model services. Failures carry a service error
//! code in `{"code": .., "message": ..}` which is folded into the typed port
//! errors here.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use readyboard_core::api::RemoteClassification;
use readyboard_core::Error;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::ports::{
    EndpointApi, EndpointError, EndpointLifecycle, FunctionApi, FunctionError, ModelApi,
    ModelError, RemoteClassifier,
};

/// Coarse class of a gateway failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NotFound,
    AccessDenied,
    Throttled,
    Validation,
    NotReady,
    Other,
}

/// Classify a failed gateway call.
///
/// A "Could not find" message wins over the code because the endpoint
/// service reports absent endpoints as validation errors.
pub fn classify_failure(status: u16, code: Option<&str>, message: &str) -> FailureKind {
    if message.contains("Could not find") {
        return FailureKind::NotFound;
    }
    match code {
        Some("ResourceNotFoundException") => FailureKind::NotFound,
        Some("AccessDeniedException") | Some("UnrecognizedClientException") => {
            FailureKind::AccessDenied
        }
        Some("ThrottlingException") => FailureKind::Throttled,
        Some("ValidationException") => FailureKind::Validation,
        Some("ModelNotReadyException") => FailureKind::NotReady,
        _ => match status {
            404 => FailureKind::NotFound,
            401 | 403 => FailureKind::AccessDenied,
            429 => FailureKind::Throttled,
            _ => FailureKind::Other,
        },
    }
}

#[derive(Debug, Clone)]
struct Failure {
    kind: FailureKind,
    message: String,
}

impl Failure {
    fn transport(e: reqwest::Error) -> Self {
        Self {
            kind: FailureKind::Other,
            message: e.to_string(),
        }
    }
}

impl From<Failure> for FunctionError {
    fn from(f: Failure) -> Self {
        match f.kind {
            FailureKind::NotFound => Self::NotFound,
            FailureKind::AccessDenied => Self::AccessDenied(f.message),
            _ => Self::Other(f.message),
        }
    }
}

impl From<Failure> for EndpointError {
    fn from(f: Failure) -> Self {
        match f.kind {
            FailureKind::NotFound => Self::NotFound,
            FailureKind::AccessDenied => Self::AccessDenied(f.message),
            _ => Self::Other(f.message),
        }
    }
}

impl From<Failure> for ModelError {
    fn from(f: Failure) -> Self {
        match f.kind {
            FailureKind::NotFound => Self::NotFound,
            FailureKind::AccessDenied => Self::AccessDenied(f.message),
            FailureKind::Throttled => Self::Throttled,
            FailureKind::Validation => Self::Validation(f.message),
            FailureKind::NotReady => Self::NotReady,
            FailureKind::Other => Self::Other(f.message),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Client for the control-plane gateway.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    /// Every request carries `timeout`; expiry surfaces as an `Other` failure.
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("build gateway http client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, req: RequestBuilder) -> Result<Value, Failure> {
        let resp = req.send().await.map_err(Failure::transport)?;
        let status = resp.status();
        let bytes = resp.bytes().await.map_err(Failure::transport)?;
        if status.is_success() {
            return Ok(serde_json::from_slice(&bytes).unwrap_or(Value::Null));
        }
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap_or_default();
        let message = body
            .message
            .unwrap_or_else(|| String::from_utf8_lossy(&bytes).into_owned());
        Err(Failure {
            kind: classify_failure(status.as_u16(), body.code.as_deref(), &message),
            message,
        })
    }
}

#[async_trait]
impl FunctionApi for HttpGateway {
    async fn dry_run(&self, function: &str) -> Result<(), FunctionError> {
        let req = self
            .client
            .post(self.url(&format!("/functions/{function}/invoke")))
            .json(&json!({ "invocation_type": "DryRun" }));
        self.send(req).await?;
        Ok(())
    }
}

#[async_trait]
impl EndpointApi for HttpGateway {
    async fn describe(&self, endpoint: &str) -> Result<EndpointLifecycle, EndpointError> {
        let req = self.client.get(self.url(&format!("/endpoints/{endpoint}")));
        let body = self.send(req).await?;
        body.get("status")
            .and_then(Value::as_str)
            .map(EndpointLifecycle::parse)
            .ok_or_else(|| EndpointError::Other("describe response missing status".into()))
    }

    async fn create(&self, endpoint: &str, config_name: &str) -> Result<(), EndpointError> {
        let req = self.client.post(self.url("/endpoints")).json(&json!({
            "endpoint_name": endpoint,
            "endpoint_config_name": config_name,
        }));
        self.send(req).await?;
        Ok(())
    }

    async fn delete(&self, endpoint: &str) -> Result<(), EndpointError> {
        let req = self.client.delete(self.url(&format!("/endpoints/{endpoint}")));
        self.send(req).await?;
        Ok(())
    }
}

#[async_trait]
impl ModelApi for HttpGateway {
    async fn invoke(&self, model_id: &str, body: Value) -> Result<(), ModelError> {
        let req = self
            .client
            .post(self.url(&format!("/models/{model_id}/invoke")))
            .json(&body);
        self.send(req).await?;
        Ok(())
    }
}

/// Remote voice classifier reached with `POST {url} {"text": ..}`.
#[derive(Debug, Clone)]
pub struct HttpVoiceClassifier {
    client: Client,
    url: String,
}

impl HttpVoiceClassifier {
    pub fn new(url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("build voice http client")?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl RemoteClassifier for HttpVoiceClassifier {
    async fn classify(&self, text: &str) -> readyboard_core::Result<RemoteClassification> {
        self.client
            .post(self.url.as_str())
            .json(&json!({ "text": text }))
            .send()
            .await
            .map_err(Error::backend)?
            .error_for_status()
            .map_err(Error::backend)?
            .json::<RemoteClassification>()
            .await
            .map_err(Error::backend)
    }
}
