//! The venue: occupancy counters and admission gate behind one lock.
//!
//! [`Venue::lock`] is the mutation lock. The returned [`VenueGuard`] is the only
//! path to the occupancy mutators and to the gate's `grant`/`revoke`/`query`,
//! so both halves are always adjusted together.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use uuid::Uuid;

use crate::config::VenueConfig;
use crate::error::{GateError, Result, VenueError};
use crate::gate::AdmissionGate;
use crate::occupancy::{OccupancySnapshot, OccupancyStore};

/// Identity of one provisioned venue. Fresh per provisioning attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

pub struct Venue {
    run_id: RunId,
    ratio: usize,
    occupancy: Mutex<OccupancyStore>,
    gate: AdmissionGate,
}

impl Venue {
    /// Provision counters, lock and gate for a new run.
    ///
    /// Each attempt runs under a fresh [`RunId`]; whatever an attempt built is
    /// dropped before the next one starts.
    pub fn provision(config: &VenueConfig) -> Result<Arc<Venue>> {
        config.validate()?;
        Self::provision_validated(config)
    }

    fn provision_validated(config: &VenueConfig) -> Result<Arc<Venue>> {
        let mut last_failure = String::new();
        for attempt in 1..=config.provision_attempts {
            let run_id = RunId::new();
            match Self::build(run_id, config) {
                Ok(venue) => {
                    tracing::debug!(
                        run_id = %run_id,
                        attempt,
                        ratio = venue.ratio,
                        capacity = venue.gate.capacity(),
                        "Venue provisioned"
                    );
                    return Ok(Arc::new(venue));
                }
                Err(reason) => {
                    tracing::warn!(
                        run_id = %run_id,
                        attempt,
                        max_attempts = config.provision_attempts,
                        reason = %reason,
                        "Venue provisioning attempt failed"
                    );
                    last_failure = reason;
                }
            }
        }

        Err(VenueError::ResourceCreation {
            attempts: config.provision_attempts,
            reason: last_failure,
        })
    }

    fn build(run_id: RunId, config: &VenueConfig) -> std::result::Result<Venue, String> {
        let occupancy = Mutex::new(OccupancyStore::new());

        // The occupancy store built above is dropped on either early return.
        let capacity = config
            .ratio
            .checked_mul(config.max_patrons)
            .ok_or_else(|| {
                format!(
                    "gate capacity overflows: ratio {} x {} patrons",
                    config.ratio, config.max_patrons
                )
            })?;
        let gate = AdmissionGate::with_capacity(capacity).ok_or_else(|| {
            format!(
                "gate capacity {capacity} exceeds maximum of {}",
                AdmissionGate::MAX_CAPACITY
            )
        })?;

        Ok(Venue {
            run_id,
            ratio: config.ratio,
            occupancy,
            gate,
        })
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn ratio(&self) -> usize {
        self.ratio
    }

    /// Acquire the mutation lock. A poisoned lock is logged and recovered.
    pub fn lock(&self) -> VenueGuard<'_> {
        let occupancy = match self.occupancy.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!(run_id = %self.run_id, "Venue lock poisoned - recovering");
                self.occupancy.clear_poison();
                poisoned.into_inner()
            }
        };

        VenueGuard {
            occupancy,
            gate: &self.gate,
            ratio: self.ratio,
        }
    }

    /// Wait for and consume one admission permit. Called without the lock held.
    pub async fn try_enter(&self) -> std::result::Result<(), GateError> {
        self.gate.try_enter().await
    }

    /// Take a snapshot under the lock.
    pub fn snapshot(&self) -> OccupancySnapshot {
        self.lock().snapshot()
    }
}

impl fmt::Debug for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Venue")
            .field("run_id", &self.run_id)
            .field("ratio", &self.ratio)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

/// Held mutation lock. Derefs to the [`OccupancyStore`].
pub struct VenueGuard<'a> {
    occupancy: MutexGuard<'a, OccupancyStore>,
    gate: &'a AdmissionGate,
    ratio: usize,
}

impl VenueGuard<'_> {
    pub fn ratio(&self) -> usize {
        self.ratio
    }

    /// Current permit count, without side effect.
    pub fn query(&self) -> usize {
        self.gate.available()
    }

    pub fn grant(&mut self, n: usize) {
        tracing::trace!(n, before = self.gate.available(), "grant");
        self.gate.grant(n);
    }

    /// Remove up to `n` unconsumed permits; returns how many were removed.
    pub fn revoke(&mut self, n: usize) -> usize {
        let revoked = self.gate.revoke(n);
        tracing::trace!(n, revoked, after = self.gate.available(), "revoke");
        revoked
    }

    /// `max(0, ratio * primary - constrained)`.
    pub fn target(&self) -> usize {
        self.occupancy.permit_target(self.ratio)
    }

    pub fn snapshot(&self) -> OccupancySnapshot {
        OccupancySnapshot {
            primary: self.occupancy.primary(),
            constrained: self.occupancy.constrained(),
            capacity: self.ratio.saturating_mul(self.occupancy.primary()),
            permits: self.gate.available(),
        }
    }
}

impl Deref for VenueGuard<'_> {
    type Target = OccupancyStore;

    fn deref(&self) -> &OccupancyStore {
        &self.occupancy
    }
}

impl DerefMut for VenueGuard<'_> {
    fn deref_mut(&mut self) -> &mut OccupancyStore {
        &mut self.occupancy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn venue() -> Arc<Venue> {
        Venue::provision(&VenueConfig::new()).unwrap()
    }

    #[test]
    fn provision_starts_empty() {
        let venue = venue();
        assert_eq!(venue.ratio(), 3);
        let snapshot = venue.snapshot();
        assert_eq!(
            snapshot,
            OccupancySnapshot {
                primary: 0,
                constrained: 0,
                capacity: 0,
                permits: 0,
            }
        );
    }

    #[test]
    fn each_provision_gets_a_fresh_run_id() {
        assert_ne!(venue().run_id(), venue().run_id());
    }

    #[test]
    fn invalid_config_fails_before_provisioning() {
        let err = Venue::provision(&VenueConfig::new().with_ratio(0)).unwrap_err();
        assert!(matches!(err, VenueError::Config(_)));
    }

    #[test]
    fn oversized_ratio_is_a_config_error() {
        let config = VenueConfig::new().with_ratio(AdmissionGate::MAX_CAPACITY);
        let err = Venue::provision(&config).unwrap_err();
        assert!(matches!(err, VenueError::Config(_)));
    }

    #[test]
    fn oversized_gate_fails_after_bounded_attempts() {
        let config = VenueConfig::new()
            .with_ratio(AdmissionGate::MAX_CAPACITY)
            .with_max_patrons(2)
            .with_provision_attempts(3);
        match Venue::provision_validated(&config) {
            Err(VenueError::ResourceCreation { attempts, reason }) => {
                assert_eq!(attempts, 3);
                assert!(reason.contains("exceeds maximum"), "{reason}");
            }
            other => panic!("expected ResourceCreation, got {other:?}"),
        }
    }

    #[test]
    fn overflowing_capacity_is_a_resource_error() {
        let config = VenueConfig::new()
            .with_ratio(usize::MAX)
            .with_max_patrons(2)
            .with_provision_attempts(1);
        let err = Venue::provision_validated(&config).unwrap_err();
        assert!(matches!(
            err,
            VenueError::ResourceCreation { attempts: 1, .. }
        ));
    }

    #[test]
    fn guard_exposes_counters_and_permits() {
        let venue = venue();
        let mut guard = venue.lock();
        guard.increment_primary();
        assert_eq!(guard.target(), 3);
        let missing = guard.target() - guard.query();
        guard.grant(missing);
        assert_eq!(guard.query(), 3);
        assert_eq!(guard.snapshot().capacity, 3);
    }

    #[test]
    fn revoke_excess_after_primary_departure() {
        let venue = venue();
        {
            let mut guard = venue.lock();
            guard.increment_primary();
            guard.increment_primary();
            guard.grant(6);
            guard.increment_constrained();
            guard.revoke(1);
        }
        let mut guard = venue.lock();
        guard.decrement_primary();
        let target = guard.target();
        let current = guard.query();
        assert_eq!((target, current), (2, 5));
        assert_eq!(guard.revoke(current - target), 3);
        assert_eq!(guard.query(), 2);
    }

    #[test]
    fn revoke_returns_only_what_was_available() {
        let venue = venue();
        let mut guard = venue.lock();
        guard.grant(1);
        assert_eq!(guard.revoke(4), 1);
        assert_eq!(guard.query(), 0);
    }
}
