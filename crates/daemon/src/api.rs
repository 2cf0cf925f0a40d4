//! HTTP surface.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use readyboard_core::api::{
    ClassifyRequest, ProvisionAction, ProvisioningStatus, StatusSnapshot, SubmissionList,
    SubmissionTriggerResponse,
};
use readyboard_core::model::{ClassificationResult, HealthSnapshot};
use readyboard_core::submission::SubmissionStore;
use serde_json::{json, Value};
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::aggregator::Aggregator;
use crate::classify::IntentService;
use crate::config::{DaemonConfig, Intervals};
use crate::ports::RemoteClassifier;
use crate::probes::Collaborators;
use crate::provisioning::ProvisioningService;
use crate::store::StatusStore;
use crate::submissions::SubmissionDispatcher;

#[derive(Clone)]
pub struct AppState {
    pub store: StatusStore,
    pub aggregator: Aggregator,
    pub provisioning: Arc<ProvisioningService>,
    pub intents: Arc<IntentService>,
    pub submissions: Arc<SubmissionDispatcher>,
    pub intervals: Intervals,
}

impl AppState {
    /// Wire services from configuration and collaborator handles.
    pub fn build(
        config: &DaemonConfig,
        collaborators: Collaborators,
        remote: Option<Arc<dyn RemoteClassifier>>,
        history: Arc<dyn SubmissionStore>,
    ) -> anyhow::Result<Self> {
        let store = StatusStore::new(config.max_session_minutes);
        let aggregator = Aggregator::new(
            collaborators,
            config.targets.clone(),
            config.probe_timeout,
            config.reduce_policy,
        );
        let provisioning = Arc::new(ProvisioningService::new(
            aggregator.clone(),
            store.clone(),
            config.on_demand.clone(),
            config.max_session_minutes,
        ));
        let intents = Arc::new(IntentService::new(remote, config.classify_timeout));
        let submissions = Arc::new(SubmissionDispatcher::new(
            config.submission.clone(),
            history,
            config.submission_timeout,
        )?);
        Ok(Self {
            store,
            aggregator,
            provisioning,
            intents,
            submissions,
            intervals: config.intervals.clone(),
        })
    }

    /// Probe, publish and return a fresh health snapshot.
    pub async fn refresh_health(&self) -> HealthSnapshot {
        let health = self.aggregator.health_snapshot().await;
        self.store.set_health(health.clone());
        health
    }

    /// Re-read the submission history into the snapshot.
    pub fn refresh_submissions(&self) -> readyboard_core::Result<SubmissionList> {
        let list = self.submissions.history()?;
        self.store.set_submissions(list.submissions.clone());
        Ok(list)
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(e: E) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<readyboard_core::Error> for ApiError {
    fn from(e: readyboard_core::Error) -> Self {
        match e {
            readyboard_core::Error::InvalidInput(msg) => Self::BadRequest(msg),
            other => Self::internal(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(r: JsonRejection) -> Self {
        Self::BadRequest(r.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, msg) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (code, Json(json!({ "error": msg }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/status", get(status))
        .route("/v1/health", get(health))
        .route("/v1/provision", get(provision_status).post(provision_action))
        .route("/v1/voice", post(voice))
        .route("/v1/submissions", get(submissions))
        .route("/v1/submissions/trigger", post(trigger_submission))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn status(State(state): State<AppState>) -> Json<StatusSnapshot> {
    Json(state.store.current().as_ref().clone())
}

async fn health(State(state): State<AppState>) -> Json<HealthSnapshot> {
    Json(state.refresh_health().await)
}

async fn provision_status(State(state): State<AppState>) -> Json<ProvisioningStatus> {
    Json(state.provisioning.status().await)
}

async fn provision_action(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let resp = match ProvisionAction::from_json(&body)? {
        ProvisionAction::Start => Json(state.provisioning.start().await).into_response(),
        ProvisionAction::Stop => Json(state.provisioning.stop().await).into_response(),
    };
    Ok(resp)
}

async fn voice(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ClassificationResult>, ApiError> {
    let Json(body) = body?;
    let req = ClassifyRequest::from_json(&body)?;
    Ok(Json(state.intents.classify(&req.text).await?))
}

async fn submissions(State(state): State<AppState>) -> Result<Json<SubmissionList>, ApiError> {
    Ok(Json(state.refresh_submissions()?))
}

async fn trigger_submission(
    State(state): State<AppState>,
) -> Result<Json<SubmissionTriggerResponse>, ApiError> {
    let resp = state.submissions.trigger().await?;
    if let Err(e) = state.refresh_submissions() {
        tracing::warn!(error = %e, "submission history refresh failed");
    }
    Ok(Json(resp))
}
