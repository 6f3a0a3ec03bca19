//! Admission gate: a counting synchronizer for Constrained-class entry.
//!
//! Permits are adjusted by delta in O(1) (`add_permits` / `forget_permits`), never
//! by posting or waiting in a loop. Only `try_enter` can suspend.
//!
//! `grant`, `revoke` and `available` are crate-private; outside the crate they are
//! reached through [`VenueGuard`](crate::venue::VenueGuard), i.e. with the venue lock held.

use tokio::sync::Semaphore;

use crate::error::GateError;

pub struct AdmissionGate {
    permits: Semaphore,
    capacity: usize,
}

impl AdmissionGate {
    /// Largest capacity the underlying semaphore can represent.
    pub const MAX_CAPACITY: usize = Semaphore::MAX_PERMITS;

    /// Create an empty gate that will never be asked to hold more than `capacity` permits.
    ///
    /// Returns `None` if `capacity` exceeds [`Self::MAX_CAPACITY`].
    pub fn with_capacity(capacity: usize) -> Option<Self> {
        if capacity > Self::MAX_CAPACITY {
            return None;
        }
        Some(Self {
            permits: Semaphore::new(0),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Wait for a permit and consume it.
    ///
    /// No timeout and no fairness among waiters. The permit is consumed for good:
    /// it is not returned when the caller leaves.
    pub async fn try_enter(&self) -> Result<(), GateError> {
        let permit = self.permits.acquire().await.map_err(|_| GateError::Closed)?;
        permit.forget();
        Ok(())
    }

    /// Add `n` permits, waking up to `n` waiters.
    pub(crate) fn grant(&self, n: usize) {
        if n == 0 {
            return;
        }
        let headroom = Self::MAX_CAPACITY - self.permits.available_permits();
        if n > headroom {
            tracing::error!(
                requested = n,
                headroom,
                "Bug: grant exceeds gate headroom - clamping"
            );
        }
        self.permits.add_permits(n.min(headroom));
    }

    /// Remove up to `n` unconsumed permits. Never blocks, never goes below zero.
    ///
    /// Returns how many permits were actually removed.
    pub(crate) fn revoke(&self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        self.permits.forget_permits(n)
    }

    pub(crate) fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

impl std::fmt::Debug for AdmissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionGate")
            .field("available", &self.available())
            .field("capacity", &self.capacity)
            .finish()
    }
}
