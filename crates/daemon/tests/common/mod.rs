//! In-memory collaborators that count the calls they receive.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use readyboard_core::api::RemoteClassification;
use readyboard_core::submission::MemorySubmissionStore;
use readyboard_core::Error;
use readyboard_daemon::api::AppState;
use readyboard_daemon::config::DaemonConfig;
use readyboard_daemon::ports::{
    EndpointApi, EndpointError, EndpointLifecycle, FunctionApi, FunctionError, ModelApi,
    ModelError, RemoteClassifier,
};
use readyboard_daemon::probes::Collaborators;

#[derive(Default)]
pub struct FakeFunctions {
    pub failures: Mutex<HashMap<String, FunctionError>>,
    pub panics: Mutex<HashSet<String>>,
    pub hangs: Mutex<HashSet<String>>,
    pub calls: AtomicUsize,
}

impl FakeFunctions {
    pub fn fail(&self, function: &str, err: FunctionError) {
        self.failures.lock().unwrap().insert(function.into(), err);
    }

    pub fn panic_on(&self, function: &str) {
        self.panics.lock().unwrap().insert(function.into());
    }

    pub fn hang_on(&self, function: &str) {
        self.hangs.lock().unwrap().insert(function.into());
    }
}

#[async_trait]
impl FunctionApi for FakeFunctions {
    async fn dry_run(&self, function: &str) -> Result<(), FunctionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panics.lock().unwrap().contains(function) {
            panic!("dry run of {function} exploded");
        }
        let hang = self.hangs.lock().unwrap().contains(function);
        if hang {
            std::future::pending::<()>().await;
        }
        match self.failures.lock().unwrap().get(function) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// A single endpoint whose lifecycle follows create and delete calls.
/// `None` means absent.
pub struct FakeEndpoints {
    pub state: Mutex<Option<EndpointLifecycle>>,
    pub delete_delay: Mutex<Option<Duration>>,
    pub describe_error: Mutex<Option<EndpointError>>,
    pub describes: AtomicUsize,
    pub creates: AtomicUsize,
    pub deletes: AtomicUsize,
}

impl FakeEndpoints {
    pub fn with_state(state: Option<EndpointLifecycle>) -> Self {
        Self {
            state: Mutex::new(state),
            delete_delay: Mutex::new(None),
            describe_error: Mutex::new(None),
            describes: AtomicUsize::new(0),
            creates: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        }
    }

    pub fn absent() -> Self {
        Self::with_state(None)
    }

    pub fn set(&self, state: Option<EndpointLifecycle>) {
        *self.state.lock().unwrap() = state;
    }

    /// Deletes only land after `delay`, like a remote call on the wire.
    pub fn delay_deletes(&self, delay: Duration) {
        *self.delete_delay.lock().unwrap() = Some(delay);
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EndpointApi for FakeEndpoints {
    async fn describe(&self, _endpoint: &str) -> Result<EndpointLifecycle, EndpointError> {
        self.describes.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.describe_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.state.lock().unwrap().clone().ok_or(EndpointError::NotFound)
    }

    async fn create(&self, _endpoint: &str, _config_name: &str) -> Result<(), EndpointError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        *self.state.lock().unwrap() = Some(EndpointLifecycle::Creating);
        Ok(())
    }

    async fn delete(&self, _endpoint: &str) -> Result<(), EndpointError> {
        let delay = *self.delete_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.deletes.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        if state.is_none() {
            return Err(EndpointError::NotFound);
        }
        *state = None;
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeModels {
    pub failures: Mutex<HashMap<String, ModelError>>,
    pub calls: AtomicUsize,
}

impl FakeModels {
    pub fn fail(&self, model_id: &str, err: ModelError) {
        self.failures.lock().unwrap().insert(model_id.into(), err);
    }
}

#[async_trait]
impl ModelApi for FakeModels {
    async fn invoke(&self, model_id: &str, _body: serde_json::Value) -> Result<(), ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failures.lock().unwrap().get(model_id) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

pub enum RemoteBehavior {
    Reply(RemoteClassification),
    Fail,
    Hang,
}

pub struct FakeRemote {
    pub behavior: RemoteBehavior,
    pub calls: AtomicUsize,
}

impl FakeRemote {
    pub fn new(behavior: RemoteBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RemoteClassifier for FakeRemote {
    async fn classify(&self, _text: &str) -> readyboard_core::Result<RemoteClassification> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            RemoteBehavior::Reply(r) => Ok(r.clone()),
            RemoteBehavior::Fail => Err(Error::backend("connection refused")),
            RemoteBehavior::Hang => {
                std::future::pending::<()>().await;
                Err(Error::backend("unreachable"))
            }
        }
    }
}

pub struct Fakes {
    pub functions: Arc<FakeFunctions>,
    pub endpoints: Arc<FakeEndpoints>,
    pub models: Arc<FakeModels>,
}

impl Fakes {
    /// Everything healthy except the on-demand endpoint, which is absent.
    pub fn new() -> Self {
        Self::with_endpoint(None)
    }

    pub fn with_endpoint(state: Option<EndpointLifecycle>) -> Self {
        Self {
            functions: Arc::new(FakeFunctions::default()),
            endpoints: Arc::new(FakeEndpoints::with_state(state)),
            models: Arc::new(FakeModels::default()),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            functions: self.functions.clone(),
            endpoints: self.endpoints.clone(),
            models: self.models.clone(),
        }
    }
}

/// Default targets with short timeouts.
pub fn test_config() -> DaemonConfig {
    DaemonConfig {
        probe_timeout: Duration::from_millis(200),
        classify_timeout: Duration::from_millis(200),
        ..DaemonConfig::default()
    }
}

pub fn app_state(fakes: &Fakes, remote: Option<Arc<dyn RemoteClassifier>>) -> AppState {
    AppState::build(
        &test_config(),
        fakes.collaborators(),
        remote,
        Arc::new(MemorySubmissionStore::default()),
    )
    .unwrap()
}
