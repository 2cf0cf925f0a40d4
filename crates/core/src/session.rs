//! Session cap for the on-demand dependency.

use crate::model::EpochMs;

/// Ceiling on how long the on-demand dependency may stay up.
pub const DEFAULT_MAX_SESSION_MINUTES: u64 = 59;

const MS_PER_MINUTE: i64 = 60_000;

/// Result of one elapsed-time check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapCheck {
    /// Whole minutes since the session started (0 when idle).
    pub elapsed_minutes: u64,
    /// True only on the first check at or past the ceiling.
    pub expired: bool,
}

/// Session cap bookkeeping for the on-demand dependency.
///
/// Expiry is reported once per session; later checks keep reporting the
/// elapsed time but never expire again until a new session starts.
#[derive(Debug, Clone)]
pub struct SessionCap {
    max_minutes: u64,
    started_at_ms: Option<EpochMs>,
    tripped: bool,
}

impl SessionCap {
    /// Idle cap with the given ceiling.
    pub fn new(max_minutes: u64) -> Self {
        Self {
            max_minutes,
            started_at_ms: None,
            tripped: false,
        }
    }

    /// Ceiling in minutes.
    pub fn max_minutes(&self) -> u64 {
        self.max_minutes
    }

    /// Start of the active session.
    pub fn started_at_ms(&self) -> Option<EpochMs> {
        self.started_at_ms
    }

    /// True while a session is recorded.
    pub fn is_active(&self) -> bool {
        self.started_at_ms.is_some()
    }

    /// Record a session start. An already active session keeps its start
    /// time so repeated starts cannot extend the cap.
    pub fn start(&mut self, now_ms: EpochMs) -> EpochMs {
        if let Some(at) = self.started_at_ms {
            return at;
        }
        self.started_at_ms = Some(now_ms);
        self.tripped = false;
        now_ms
    }

    /// Forget the session.
    pub fn clear(&mut self) {
        self.started_at_ms = None;
        self.tripped = false;
    }

    /// Floored whole minutes since start; 0 when idle.
    pub fn elapsed_minutes(&self, now_ms: EpochMs) -> u64 {
        match self.started_at_ms {
            Some(at) => ((now_ms - at).max(0) / MS_PER_MINUTE) as u64,
            None => 0,
        }
    }

    /// Elapsed-time tick. Reports expiry at most once per session.
    pub fn check(&mut self, now_ms: EpochMs) -> CapCheck {
        let elapsed_minutes = self.elapsed_minutes(now_ms);
        let expired =
            self.started_at_ms.is_some() && !self.tripped && elapsed_minutes >= self.max_minutes;
        if expired {
            self.tripped = true;
        }
        CapCheck {
            elapsed_minutes,
            expired,
        }
    }
}

impl Default for SessionCap {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SESSION_MINUTES)
    }
}
