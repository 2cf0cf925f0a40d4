//! On-demand endpoint lifecycle and the session cap that bounds it.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use readyboard_core::api::{
    ProvisioningStatus, StartOutcome, StartResponse, StatusSnapshot, StopOutcome, StopResponse,
};
use readyboard_core::model::{EpochMs, Overall};
use readyboard_core::session::{CapCheck, SessionCap};
use readyboard_core::status::reduce_with;
use readyboard_core::{now_ms, Error};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::aggregator::{health_from, statuses, Aggregator};
use crate::ports::{EndpointError, EndpointLifecycle};
use crate::store::StatusStore;

/// The endpoint that is created on start and deleted on stop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OnDemandEndpoint {
    pub endpoint: String,
    pub config_name: String,
}

pub struct ProvisioningService {
    aggregator: Aggregator,
    store: StatusStore,
    on_demand: OnDemandEndpoint,
    session: Mutex<SessionCap>,
}

impl ProvisioningService {
    pub fn new(
        aggregator: Aggregator,
        store: StatusStore,
        on_demand: OnDemandEndpoint,
        max_session_minutes: u64,
    ) -> Self {
        Self {
            aggregator,
            store,
            on_demand,
            session: Mutex::new(SessionCap::new(max_session_minutes)),
        }
    }

    fn session(&self) -> MutexGuard<'_, SessionCap> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn started_at_ms(&self) -> Option<EpochMs> {
        self.session().started_at_ms()
    }

    /// Probe everything, reduce and publish both views.
    pub async fn status(&self) -> ProvisioningStatus {
        let outcomes = self.aggregator.probe_all().await;
        let now = now_ms();
        let services = statuses(&outcomes);
        let overall = reduce_with(&services, self.aggregator.policy());
        let (started_at_ms, elapsed_minutes, max_minutes) = {
            let s = self.session();
            (s.started_at_ms(), s.elapsed_minutes(now), s.max_minutes())
        };
        let status = ProvisioningStatus {
            overall,
            services,
            started_at_ms,
            elapsed_minutes,
            max_minutes,
        };
        let health = health_from(&outcomes, now);
        let provisioning = status.clone();
        self.store.publish(move |cur| StatusSnapshot {
            health,
            provisioning,
            submissions: cur.submissions.clone(),
        });
        debug!(overall = ?status.overall, "provisioning status refreshed");
        status
    }

    /// Bring the on-demand endpoint up. Safe to call repeatedly.
    pub async fn start(&self) -> StartResponse {
        self.store.publish(|cur| {
            let mut next = cur.clone();
            next.provisioning.overall = Overall::Provisioning;
            next
        });

        let action = self.ensure_running().await;
        if !matches!(action, StartOutcome::Failed { .. }) {
            let started = self.session().start(now_ms());
            info!(endpoint = %self.on_demand.endpoint, started_at_ms = started, ?action, "provisioning started");
        }

        let status = self.status().await;
        StartResponse {
            overall: status.overall,
            services: status.services,
            started_at_ms: status.started_at_ms,
            action,
        }
    }

    async fn ensure_running(&self) -> StartOutcome {
        let endpoints = &self.aggregator.collaborators().endpoints;
        let name = &self.on_demand.endpoint;
        match endpoints.describe(name).await {
            Ok(EndpointLifecycle::InService) => StartOutcome::AlreadyRunning,
            Ok(EndpointLifecycle::Creating | EndpointLifecycle::Updating) => {
                StartOutcome::AlreadyStarting
            }
            Ok(other) => StartOutcome::Exists {
                status: other.to_string(),
            },
            Err(EndpointError::NotFound) => {
                match endpoints.create(name, &self.on_demand.config_name).await {
                    Ok(()) => StartOutcome::Starting,
                    Err(e) => failed_start(name, e),
                }
            }
            Err(e) => failed_start(name, e),
        }
    }

    /// Take the on-demand endpoint down and reset local state.
    ///
    /// The endpoint is described first so an absent or already deleting
    /// endpoint never receives a second delete.
    pub async fn stop(&self) -> StopResponse {
        let action = self.request_delete().await;
        self.session().clear();

        self.store.publish(|cur| {
            let mut next = cur.clone();
            next.provisioning.overall = Overall::Down;
            next.provisioning.started_at_ms = None;
            next.provisioning.elapsed_minutes = 0;
            next
        });

        info!(endpoint = %self.on_demand.endpoint, ?action, "provisioning stopped");
        StopResponse {
            acknowledged: !matches!(action, StopOutcome::Failed { .. }),
            action,
            timestamp_ms: now_ms(),
        }
    }

    async fn request_delete(&self) -> StopOutcome {
        let endpoints = &self.aggregator.collaborators().endpoints;
        let name = &self.on_demand.endpoint;
        match endpoints.describe(name).await {
            Err(EndpointError::NotFound) => StopOutcome::NotFound,
            Ok(EndpointLifecycle::Deleting) => StopOutcome::AlreadyStopping,
            Ok(_) => match endpoints.delete(name).await {
                Ok(()) => StopOutcome::Stopping,
                Err(EndpointError::NotFound) => StopOutcome::NotFound,
                Err(e) => failed_stop(name, e),
            },
            Err(e) => failed_stop(name, e),
        }
    }

    /// Session-cap tick. Stops the endpoint the first time the cap is hit.
    pub async fn check_session_at(&self, now: EpochMs) -> CapCheck {
        let check = self.session().check(now);
        self.store.publish(|cur| {
            let mut next = cur.clone();
            next.provisioning.elapsed_minutes = check.elapsed_minutes;
            next
        });
        if check.expired {
            warn!(
                endpoint = %self.on_demand.endpoint,
                elapsed_minutes = check.elapsed_minutes,
                "session cap reached; stopping"
            );
            self.stop().await;
        }
        check
    }

    pub async fn check_session(&self) -> CapCheck {
        self.check_session_at(now_ms()).await
    }

    /// Fire a delete for an active session without waiting for it.
    ///
    /// Delivery is not guaranteed: the task dies with the runtime. Returns
    /// `None` when no session is active.
    pub fn dispatch_teardown_stop(&self) -> Option<JoinHandle<()>> {
        let was_active = {
            let mut s = self.session();
            let active = s.is_active();
            s.clear();
            active
        };
        if !was_active {
            return None;
        }
        let endpoints = Arc::clone(&self.aggregator.collaborators().endpoints);
        let name = self.on_demand.endpoint.clone();
        info!(endpoint = %name, "dispatching teardown stop");
        Some(tokio::spawn(async move {
            if let Err(e) = endpoints.delete(&name).await {
                debug!(endpoint = %name, error = %e, "teardown stop not delivered");
            }
        }))
    }

    /// Dispatch the teardown stop and give it up to `grace` to reach the
    /// endpoint. Returns true when the delete finished inside the window.
    pub async fn teardown(&self, grace: Duration) -> bool {
        let Some(handle) = self.dispatch_teardown_stop() else {
            return false;
        };
        match tokio::time::timeout(grace, handle).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                debug!(error = %e, "teardown stop task failed");
                false
            }
            Err(_) => {
                debug!(grace_ms = grace.as_millis() as u64, "teardown stop still in flight at exit");
                false
            }
        }
    }
}

fn failed_start(endpoint: &str, e: EndpointError) -> StartOutcome {
    let err = Error::action(format!("start {endpoint}: {e}"));
    warn!(error = %err, "start failed");
    StartOutcome::Failed {
        reason: err.to_string(),
    }
}

fn failed_stop(endpoint: &str, e: EndpointError) -> StopOutcome {
    let err = Error::action(format!("stop {endpoint}: {e}"));
    warn!(error = %err, "stop failed");
    StopOutcome::Failed {
        reason: err.to_string(),
    }
}
