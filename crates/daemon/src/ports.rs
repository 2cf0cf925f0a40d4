//! Collaborator seams. Everything the daemon talks to over the network sits
//! behind one of these traits so probes and services can run against fakes.

use std::fmt;

use async_trait::async_trait;
use readyboard_core::api::RemoteClassification;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FunctionError {
    #[error("function not found")]
    NotFound,
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EndpointError {
    #[error("endpoint not found")]
    NotFound,
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("throttled")]
    Throttled,
    #[error("validation error: {0}")]
    Validation(String),
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("model not found")]
    NotFound,
    #[error("model not ready")]
    NotReady,
    #[error("{0}")]
    Other(String),
}

/// Lifecycle status reported by the managed inference endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointLifecycle {
    InService,
    Creating,
    Updating,
    Deleting,
    Failed,
    OutOfService,
    Other(String),
}

impl EndpointLifecycle {
    pub fn parse(status: &str) -> Self {
        match status {
            "InService" => Self::InService,
            "Creating" => Self::Creating,
            "Updating" | "SystemUpdating" | "RollingBack" => Self::Updating,
            "Deleting" => Self::Deleting,
            "Failed" => Self::Failed,
            "OutOfService" => Self::OutOfService,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for EndpointLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InService => f.write_str("InService"),
            Self::Creating => f.write_str("Creating"),
            Self::Updating => f.write_str("Updating"),
            Self::Deleting => f.write_str("Deleting"),
            Self::Failed => f.write_str("Failed"),
            Self::OutOfService => f.write_str("OutOfService"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// Serverless compute functions.
#[async_trait]
pub trait FunctionApi: Send + Sync {
    /// Dry-run invocation: checks existence and permissions without running.
    async fn dry_run(&self, function: &str) -> Result<(), FunctionError>;
}

/// Managed inference endpoints that can be created and deleted on demand.
#[async_trait]
pub trait EndpointApi: Send + Sync {
    async fn describe(&self, endpoint: &str) -> Result<EndpointLifecycle, EndpointError>;
    async fn create(&self, endpoint: &str, config_name: &str) -> Result<(), EndpointError>;
    async fn delete(&self, endpoint: &str) -> Result<(), EndpointError>;
}

/// Hosted foundation models.
#[async_trait]
pub trait ModelApi: Send + Sync {
    async fn invoke(&self, model_id: &str, body: serde_json::Value) -> Result<(), ModelError>;
}

/// Remote intent classification backend.
#[async_trait]
pub trait RemoteClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> readyboard_core::Result<RemoteClassification>;
}
