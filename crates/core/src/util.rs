use std::time::{SystemTime, UNIX_EPOCH};

use ulid::Ulid;

use crate::model::EpochMs;

/// Returns current unix epoch milliseconds.
pub fn now_ms() -> EpochMs {
    let dur = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    dur.as_millis() as EpochMs
}

/// Generates a new ULID.
pub fn new_ulid() -> Ulid {
    Ulid::new()
}
