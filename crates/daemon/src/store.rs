use std::sync::Arc;

use readyboard_core::api::{ProvisioningStatus, StatusSnapshot};
use readyboard_core::model::{HealthSnapshot, SubmissionEntry};
use readyboard_core::now_ms;
use tokio::sync::watch;

/// Holder of the latest [`StatusSnapshot`].
///
/// Writers replace the whole snapshot through [`StatusStore::publish`];
/// readers only ever see complete snapshots.
#[derive(Clone)]
pub struct StatusStore {
    tx: Arc<watch::Sender<Arc<StatusSnapshot>>>,
}

impl StatusStore {
    /// Provisioning `loading`, health all `down`, no submissions.
    pub fn new(max_session_minutes: u64) -> Self {
        let initial = StatusSnapshot {
            health: HealthSnapshot::pessimistic(now_ms()),
            provisioning: ProvisioningStatus::loading(max_session_minutes),
            submissions: Vec::new(),
        };
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> Arc<StatusSnapshot> {
        Arc::clone(&self.tx.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<StatusSnapshot>> {
        self.tx.subscribe()
    }

    /// Derive the next snapshot from the current one and swap it in.
    pub fn publish<F>(&self, f: F) -> Arc<StatusSnapshot>
    where
        F: FnOnce(&StatusSnapshot) -> StatusSnapshot,
    {
        let mut published = None;
        self.tx.send_modify(|current| {
            let next = Arc::new(f(current.as_ref()));
            *current = Arc::clone(&next);
            published = Some(next);
        });
        published.unwrap_or_else(|| self.current())
    }

    pub fn set_health(&self, health: HealthSnapshot) -> Arc<StatusSnapshot> {
        self.publish(|cur| StatusSnapshot {
            health,
            ..cur.clone()
        })
    }

    pub fn set_provisioning(&self, provisioning: ProvisioningStatus) -> Arc<StatusSnapshot> {
        self.publish(|cur| StatusSnapshot {
            provisioning,
            ..cur.clone()
        })
    }

    pub fn set_submissions(&self, submissions: Vec<SubmissionEntry>) -> Arc<StatusSnapshot> {
        self.publish(|cur| StatusSnapshot {
            submissions,
            ..cur.clone()
        })
    }
}
