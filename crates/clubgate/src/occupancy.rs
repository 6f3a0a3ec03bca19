//! Shared occupancy counters.
//!
//! `OccupancyStore` does no locking of its own. It is only reachable through a
//! [`VenueGuard`](crate::venue::VenueGuard), so every mutation happens with the
//! venue lock held.

use std::fmt;

use serde::Serialize;

/// Current occupancy per class, plus running tallies used for end-of-run accounting.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OccupancyStore {
    primary: usize,
    constrained: usize,
    primary_entries: usize,
    primary_exits: usize,
    constrained_entries: usize,
    constrained_exits: usize,
    peak_primary: usize,
    peak_constrained: usize,
}

impl OccupancyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn primary(&self) -> usize {
        self.primary
    }

    pub fn constrained(&self) -> usize {
        self.constrained
    }

    pub fn increment_primary(&mut self) {
        self.primary += 1;
        self.primary_entries += 1;
        self.peak_primary = self.peak_primary.max(self.primary);
    }

    pub fn decrement_primary(&mut self) {
        if self.primary == 0 {
            // Bug: more departures than arrivals
            debug_assert!(false, "primary occupancy underflow");
            tracing::error!("Bug: primary occupancy would drop below zero");
            return;
        }
        self.primary -= 1;
        self.primary_exits += 1;
    }

    pub fn increment_constrained(&mut self) {
        self.constrained += 1;
        self.constrained_entries += 1;
        self.peak_constrained = self.peak_constrained.max(self.constrained);
    }

    pub fn decrement_constrained(&mut self) {
        if self.constrained == 0 {
            debug_assert!(false, "constrained occupancy underflow");
            tracing::error!("Bug: constrained occupancy would drop below zero");
            return;
        }
        self.constrained -= 1;
        self.constrained_exits += 1;
    }

    pub fn primary_entries(&self) -> usize {
        self.primary_entries
    }

    pub fn primary_exits(&self) -> usize {
        self.primary_exits
    }

    pub fn constrained_entries(&self) -> usize {
        self.constrained_entries
    }

    pub fn constrained_exits(&self) -> usize {
        self.constrained_exits
    }

    pub fn peak_primary(&self) -> usize {
        self.peak_primary
    }

    pub fn peak_constrained(&self) -> usize {
        self.peak_constrained
    }

    /// Permits the gate should hold: `max(0, ratio * primary - constrained)`.
    pub fn permit_target(&self, ratio: usize) -> usize {
        ratio
            .saturating_mul(self.primary)
            .saturating_sub(self.constrained)
    }
}

/// Point-in-time view of the venue, taken under the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OccupancySnapshot {
    pub primary: usize,
    pub constrained: usize,
    /// `ratio * primary`: Constrained-class occupancy licensed by present Primary-class patrons.
    pub capacity: usize,
    pub permits: usize,
}

impl OccupancySnapshot {
    /// `max(0, capacity - constrained)`.
    pub fn target(&self) -> usize {
        self.capacity.saturating_sub(self.constrained)
    }
}

impl fmt::Display for OccupancySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[snapshot] primary={} constrained={}/{} permits={}",
            self.primary, self.constrained, self.capacity, self.permits
        )
    }
}
