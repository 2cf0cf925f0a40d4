#![forbid(unsafe_code)]

//! Readiness dashboard daemon: probes dependencies, gates on-demand
//! provisioning, classifies voice intents and dispatches submissions.

pub mod aggregator;
pub mod api;
pub mod classify;
pub mod config;
pub mod gateway;
pub mod history;
pub mod ports;
pub mod probes;
pub mod provisioning;
pub mod scheduler;
pub mod store;
pub mod submissions;
