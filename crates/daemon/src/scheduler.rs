//! Background poll loops.

use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::AppState;
use crate::config::Intervals;

/// Owner of the poll loops. Dropping it aborts them too, but
/// [`Scheduler::shutdown`] also waits for them to finish.
pub struct Scheduler {
    tasks: JoinSet<()>,
}

impl Scheduler {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub async fn shutdown(mut self) {
        self.tasks.abort_all();
        while self.tasks.join_next().await.is_some() {}
        info!("scheduler stopped");
    }
}

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tick
}

/// Start the provisioning, health, submission-history and session-cap loops.
pub fn spawn_scheduler(state: AppState) -> Scheduler {
    let mut tasks = JoinSet::new();
    let Intervals {
        provision_poll,
        health_poll,
        submissions_poll,
        session_check,
        initial_poll_delay,
    } = state.intervals.clone();

    {
        let state = state.clone();
        tasks.spawn(async move {
            sleep(initial_poll_delay).await;
            let mut tick = ticker(provision_poll);
            loop {
                tick.tick().await;
                let status = state.provisioning.status().await;
                debug!(overall = ?status.overall, "provisioning poll");
            }
        });
    }

    {
        let state = state.clone();
        tasks.spawn(async move {
            let mut tick = ticker(health_poll);
            loop {
                tick.tick().await;
                state.refresh_health().await;
            }
        });
    }

    {
        let state = state.clone();
        tasks.spawn(async move {
            let mut tick = ticker(submissions_poll);
            loop {
                tick.tick().await;
                // Keep the last published list on failure; retry next tick.
                if let Err(e) = state.refresh_submissions() {
                    warn!(error = %e, "submission history poll failed");
                }
            }
        });
    }

    tasks.spawn(async move {
        let mut tick = ticker(session_check);
        loop {
            tick.tick().await;
            state.provisioning.check_session().await;
        }
    });

    Scheduler { tasks }
}
