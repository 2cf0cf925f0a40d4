//! Concurrent probe fan-out.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use readyboard_core::model::{EpochMs, HealthSlot, HealthSnapshot, HealthState, ServiceStatus};
use readyboard_core::now_ms;
use readyboard_core::status::ReducePolicy;

use crate::probes::{run_probe, Collaborators, ProbeOutcome, ProbeTarget};

/// Probes a fixed, ordered list of targets.
#[derive(Clone)]
pub struct Aggregator {
    collaborators: Collaborators,
    targets: Arc<Vec<ProbeTarget>>,
    probe_timeout: Duration,
    policy: ReducePolicy,
}

impl Aggregator {
    pub fn new(
        collaborators: Collaborators,
        targets: Vec<ProbeTarget>,
        probe_timeout: Duration,
        policy: ReducePolicy,
    ) -> Self {
        Self {
            collaborators,
            targets: Arc::new(targets),
            probe_timeout,
            policy,
        }
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    pub fn targets(&self) -> &[ProbeTarget] {
        &self.targets
    }

    pub fn policy(&self) -> ReducePolicy {
        self.policy
    }

    /// Run every probe concurrently and wait for all of them.
    ///
    /// Each probe runs in its own task under its own timeout, so a panic or
    /// a hang only costs that target (reported `down`). The result has one
    /// entry per target, in target order.
    pub async fn probe_all(&self) -> Vec<ProbeOutcome> {
        let pending = self.targets.iter().map(|target| {
            let c = self.collaborators.clone();
            let t = target.clone();
            let handle = tokio::spawn(async move { run_probe(&c, &t).await });
            let abort = handle.abort_handle();
            let timeout = self.probe_timeout;
            async move {
                match tokio::time::timeout(timeout, handle).await {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(join)) => ProbeOutcome::failed(target, format!("probe task aborted: {join}")),
                    Err(_) => {
                        abort.abort();
                        ProbeOutcome::failed(
                            target,
                            format!("timed out after {}ms", timeout.as_millis()),
                        )
                    }
                }
            }
        });
        join_all(pending).await
    }

    /// Fresh informational snapshot.
    pub async fn health_snapshot(&self) -> HealthSnapshot {
        let outcomes = self.probe_all().await;
        health_from(&outcomes, now_ms())
    }
}

/// Gating view of a probe round.
pub fn statuses(outcomes: &[ProbeOutcome]) -> Vec<ServiceStatus> {
    outcomes.iter().map(ProbeOutcome::to_status).collect()
}

fn severity(h: HealthState) -> u8 {
    match h {
        HealthState::Up => 0,
        HealthState::Degraded => 1,
        HealthState::Down => 2,
    }
}

/// Informational view of a probe round. Targets sharing a slot report the
/// worst of their readings.
pub fn health_from(outcomes: &[ProbeOutcome], last_check_ms: EpochMs) -> HealthSnapshot {
    let mut slots: HashMap<HealthSlot, HealthState> = HashMap::new();
    for o in outcomes {
        slots
            .entry(o.slot)
            .and_modify(|h| {
                if severity(o.health) > severity(*h) {
                    *h = o.health;
                }
            })
            .or_insert(o.health);
    }
    HealthSnapshot::from_slots(slots, last_check_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use readyboard_core::model::ServiceState;

    fn outcome(slot: HealthSlot, health: HealthState) -> ProbeOutcome {
        ProbeOutcome {
            name: format!("{slot:?}"),
            slot,
            state: ServiceState::Up,
            health,
            detail: None,
        }
    }

    #[test]
    fn shared_slot_reports_worst() {
        let snap = health_from(
            &[
                outcome(HealthSlot::Voice, HealthState::Up),
                outcome(HealthSlot::Voice, HealthState::Degraded),
                outcome(HealthSlot::Submission, HealthState::Up),
            ],
            7,
        );
        assert_eq!(snap.voice, HealthState::Degraded);
        assert_eq!(snap.submission, HealthState::Up);
        assert_eq!(snap.chat_model, HealthState::Down);
        assert_eq!(snap.dashboard, HealthState::Up);
        assert_eq!(snap.last_check_ms, 7);
    }
}
