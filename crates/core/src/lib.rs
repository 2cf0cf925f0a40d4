#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Shared models and pure logic for the readiness dashboard backend.

pub mod api;
pub mod classifier;
pub mod error;
pub mod model;
pub mod session;
pub mod status;
pub mod submission;

mod util;

pub use error::{Error, Result};
pub use util::{new_ulid, now_ms};
