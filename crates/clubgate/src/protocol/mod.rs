//! Per-patron admission protocols.
//!
//! Each worker runs the protocol for its patron's class from arrival to
//! departure:
//! 1. Emit `arrives`
//! 2. Gain admission (Constrained-class patrons may wait at the gate here)
//! 3. Update occupancy and permits under the venue lock, emit `enters`
//! 4. Stay for the patron's residency
//! 5. Update occupancy and permits under the venue lock, emit `leaves`

mod constrained;
mod primary;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::GateError;
use crate::event::{EventSink, PatronPhase, VenueEvent};
use crate::patron::{Patron, PatronClass};
use crate::venue::{Venue, VenueGuard};

pub use constrained::ConstrainedProtocol;
pub use primary::PrimaryProtocol;

/// Shared handles given to every worker.
#[derive(Clone)]
pub struct WorkerContext {
    pub venue: Arc<Venue>,
    pub sink: Arc<dyn EventSink>,
    pub tick: Duration,
    pub snapshots: bool,
}

impl WorkerContext {
    pub fn new(venue: Arc<Venue>, sink: Arc<dyn EventSink>, tick: Duration) -> Self {
        Self {
            venue,
            sink,
            tick,
            snapshots: false,
        }
    }

    pub fn with_snapshots(mut self, snapshots: bool) -> Self {
        self.snapshots = snapshots;
        self
    }

    pub(crate) fn emit(&self, patron: &Patron, phase: PatronPhase) {
        tracing::debug!(phase = phase.as_str(), "Patron transition");
        self.sink.emit(&VenueEvent::patron(patron, phase));
    }

    /// Emit an occupancy snapshot if enabled. Takes the guard to prove the lock is held.
    pub(crate) fn snapshot(&self, venue: &VenueGuard<'_>) {
        if self.snapshots {
            self.sink.emit(&VenueEvent::Snapshot(venue.snapshot()));
        }
    }

    pub(crate) fn residency(&self, patron: &Patron) -> Duration {
        self.tick
            .saturating_mul(u32::try_from(patron.residency).unwrap_or(u32::MAX))
    }

    pub(crate) async fn stay(&self, patron: &Patron) {
        let residency = self.residency(patron);
        if !residency.is_zero() {
            tokio::time::sleep(residency).await;
        }
    }
}

#[async_trait]
pub trait AdmissionProtocol: Send + Sync {
    fn class(&self) -> PatronClass;

    /// Drive `patron` from arrival to departure.
    ///
    /// Only fails if the admission gate is closed underneath a waiting worker.
    async fn run(&self, patron: &Patron, ctx: &WorkerContext) -> Result<(), GateError>;
}

static PRIMARY: PrimaryProtocol = PrimaryProtocol;
static CONSTRAINED: ConstrainedProtocol = ConstrainedProtocol;

pub fn for_class(class: PatronClass) -> &'static dyn AdmissionProtocol {
    match class {
        PatronClass::Primary => &PRIMARY,
        PatronClass::Constrained => &CONSTRAINED,
    }
}
