//! Retransmission timer policy
//!
//! ZRTP retransmits its outstanding packet with exponential backoff. Two
//! profiles exist: T1 drives Hello retransmission, T2 everything else.
//! The arithmetic here is pure; arming the real timer is left to the
//! negotiation context (or to [`scheduler::TimerScheduler`]).

pub mod scheduler;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Initial T1 interval in milliseconds
pub const T1_START_MS: u64 = 50;
/// T1 interval cap in milliseconds
pub const T1_CAP_MS: u64 = 200;
/// Maximum number of Hello resends
pub const T1_MAX_RETRIES: u32 = 20;

/// Initial T2 interval in milliseconds
pub const T2_START_MS: u64 = 150;
/// T2 interval cap in milliseconds
pub const T2_CAP_MS: u64 = 600;
/// Maximum number of resends for all non-Hello packets
pub const T2_MAX_RETRIES: u32 = 10;

/// Logical timer identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// Hello retransmission
    T1,
    /// Commit, DHPart2, Confirm2, GoClear and Error retransmission
    T2,
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerId::T1 => write!(f, "T1"),
            TimerId::T2 => write!(f, "T2"),
        }
    }
}

/// Backoff parameters of one timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerProfile {
    pub start_ms: u64,
    pub cap_ms: u64,
    pub max_retries: u32,
}

impl TimerProfile {
    pub const fn t1() -> Self {
        Self {
            start_ms: T1_START_MS,
            cap_ms: T1_CAP_MS,
            max_retries: T1_MAX_RETRIES,
        }
    }

    pub const fn t2() -> Self {
        Self {
            start_ms: T2_START_MS,
            cap_ms: T2_CAP_MS,
            max_retries: T2_MAX_RETRIES,
        }
    }
}

/// Result of advancing a timer after it fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reschedule {
    /// Re-arm with this interval
    Next(Duration),
    /// Retry budget used up
    Exhausted,
}

/// Runtime state of one retransmission timer
#[derive(Debug, Clone)]
pub struct RetransmitTimer {
    profile: TimerProfile,
    interval_ms: u64,
    counter: u32,
}

impl RetransmitTimer {
    pub fn new(profile: TimerProfile) -> Self {
        Self {
            profile,
            interval_ms: profile.start_ms,
            counter: 0,
        }
    }

    /// Reset the retry counter and return the initial interval
    pub fn start(&mut self) -> Duration {
        self.interval_ms = self.profile.start_ms;
        self.counter = 0;
        Duration::from_millis(self.interval_ms)
    }

    /// Double the interval (clamped to the cap) and count one retry.
    ///
    /// Returns [`Reschedule::Exhausted`] once the counter exceeds the
    /// profile's retry limit.
    pub fn reschedule(&mut self) -> Reschedule {
        self.interval_ms = self.interval_ms.saturating_mul(2).min(self.profile.cap_ms);
        self.counter = self.counter.saturating_add(1);
        if self.counter > self.profile.max_retries {
            return Reschedule::Exhausted;
        }
        Reschedule::Next(Duration::from_millis(self.interval_ms))
    }

    pub fn profile(&self) -> &TimerProfile {
        &self.profile
    }

    /// Current interval
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Number of reschedules since the last start
    pub fn retries(&self) -> u32 {
        self.counter
    }
}
