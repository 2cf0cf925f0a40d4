//! Reduction of per-dependency states to overall readiness.

use serde::{Deserialize, Serialize};

use crate::model::{Overall, ServiceState, ServiceStatus};

/// How a list of service states is reduced to an [`Overall`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReducePolicy {
    /// `provisioning` is reported when nothing is up but something is
    /// starting. An empty list is `down`.
    #[default]
    Strict,
    /// Original branch order: `partial` absorbs the all-starting case, so
    /// `provisioning` is never produced. An empty list is `ready`.
    Legacy,
}

impl std::str::FromStr for ReducePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "legacy" => Ok(Self::Legacy),
            other => Err(format!("unknown reduce policy '{other}' (expected strict|legacy)")),
        }
    }
}

/// Counts that drive the reduction. Arrival order never matters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateCounts {
    /// Number of statuses.
    pub total: usize,
    /// Statuses that are up.
    pub up: usize,
    /// Statuses that are starting.
    pub starting: usize,
}

impl StateCounts {
    /// Tally a status list.
    pub fn of(statuses: &[ServiceStatus]) -> Self {
        statuses.iter().fold(Self::default(), |mut c, s| {
            c.total += 1;
            match s.state {
                ServiceState::Up => c.up += 1,
                ServiceState::Starting => c.starting += 1,
                ServiceState::Stopping | ServiceState::Down | ServiceState::NotDeployed => {}
            }
            c
        })
    }
}

/// Reduce with the default [`ReducePolicy::Strict`].
pub fn reduce(statuses: &[ServiceStatus]) -> Overall {
    reduce_with(statuses, ReducePolicy::Strict)
}

/// Reduce a status list to a single overall readiness value.
pub fn reduce_with(statuses: &[ServiceStatus], policy: ReducePolicy) -> Overall {
    let c = StateCounts::of(statuses);
    match policy {
        ReducePolicy::Strict => {
            if c.total == 0 {
                Overall::Down
            } else if c.up == c.total {
                Overall::Ready
            } else if c.up > 0 {
                Overall::Partial
            } else if c.starting > 0 {
                Overall::Provisioning
            } else {
                Overall::Down
            }
        }
        ReducePolicy::Legacy => {
            if c.up == c.total {
                Overall::Ready
            } else if c.up > 0 || c.starting > 0 {
                Overall::Partial
            } else {
                Overall::Down
            }
        }
    }
}
