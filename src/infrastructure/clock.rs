//! Coarse wall-clock source.
//!
//! Timestamp correlation only needs epoch seconds; injecting the clock
//! keeps the aggregation path deterministic in tests.

use std::time::{SystemTime, UNIX_EPOCH};

pub trait Clock: Send {
    /// Current time as epoch seconds.
    fn now(&self) -> u64;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}
