//! Time-bounded cache for the scoring baseline

use crate::clock::Clock;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Holds one computed baseline value and when it was computed.
///
/// Owned by the composition root and shared by every scorer built from it.
/// Concurrent readers may briefly observe a stale value.
pub struct BaselineCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    slot: Mutex<Option<(f64, DateTime<Utc>)>>,
}

impl BaselineCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            slot: Mutex::new(None),
        }
    }

    /// The cached value if it is younger than the TTL
    pub fn get(&self) -> Option<f64> {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let (value, computed_at) = (*slot)?;
        // A clock that moved backwards reads as fresh
        let fresh = match (self.clock.now() - computed_at).to_std() {
            Ok(age) => age < self.ttl,
            Err(_) => true,
        };
        fresh.then_some(value)
    }

    pub fn set(&self, value: f64) {
        let now = self.clock.now();
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some((value, now));
    }

    pub fn invalidate(&self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
