//! Dispatcher - spawns one worker per patron and waits for all of them.
//!
//! Flow:
//! 1. Sleep the patron's arrival delay (relative to the previous spawn)
//! 2. Spawn a worker running the protocol for the patron's class
//! 3. Repeat for the whole roster, in order
//! 4. Join every worker and report
//!
//! A worker stuck at the admission gate keeps `run` from returning. That only
//! happens for rosters that never license enough Constrained-class places.

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::config::VenueConfig;
use crate::event::EventSink;
use crate::patron::{Patron, PatronClass};
use crate::protocol::{self, WorkerContext};
use crate::venue::{RunId, Venue};

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    /// RFC 3339.
    pub started_at: String,
    /// RFC 3339.
    pub completed_at: String,
    pub spawned: usize,
    pub departed_primary: usize,
    pub departed_constrained: usize,
    /// Workers that ended without departing (closed gate or panic).
    pub abandoned: usize,
    pub peak_primary: usize,
    pub peak_constrained: usize,
}

impl RunReport {
    pub fn departed(&self) -> usize {
        self.departed_primary + self.departed_constrained
    }
}

pub struct Dispatcher {
    venue: Arc<Venue>,
    sink: Arc<dyn EventSink>,
    config: VenueConfig,
}

impl Dispatcher {
    pub fn new(venue: Arc<Venue>, sink: Arc<dyn EventSink>, config: VenueConfig) -> Self {
        Self {
            venue,
            sink,
            config,
        }
    }

    pub fn venue(&self) -> &Arc<Venue> {
        &self.venue
    }

    fn context(&self) -> WorkerContext {
        WorkerContext::new(
            Arc::clone(&self.venue),
            Arc::clone(&self.sink),
            self.config.tick,
        )
        .with_snapshots(self.config.snapshots)
    }

    pub async fn run(&self, patrons: &[Patron]) -> RunReport {
        let span = tracing::info_span!("run", run_id = %self.venue.run_id());
        self.run_inner(patrons).instrument(span).await
    }

    async fn run_inner(&self, patrons: &[Patron]) -> RunReport {
        let started_at = chrono::Utc::now().to_rfc3339();
        let (primary, constrained) = class_counts(patrons);
        tracing::info!(
            patrons = patrons.len(),
            primary,
            constrained,
            ratio = self.venue.ratio(),
            "Opening venue"
        );

        let mut workers = JoinSet::new();
        for patron in patrons.iter().copied() {
            let delay = self.config.ticks(patron.delay);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let ctx = self.context();
            let span = tracing::debug_span!("patron", id = %patron.id, class = %patron.class);
            workers.spawn(
                async move {
                    let outcome = protocol::for_class(patron.class).run(&patron, &ctx).await;
                    (patron, outcome)
                }
                .instrument(span),
            );
        }

        let mut abandoned = 0;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((patron, Ok(()))) => {
                    tracing::trace!(patron = %patron.id, "Worker finished");
                }
                Ok((patron, Err(e))) => {
                    abandoned += 1;
                    tracing::error!(
                        patron = %patron.id,
                        class = %patron.class,
                        error = %e,
                        "Patron abandoned"
                    );
                }
                Err(e) => {
                    abandoned += 1;
                    tracing::error!(error = %e, "Patron worker failed");
                }
            }
        }

        let venue = self.venue.lock();
        let report = RunReport {
            run_id: self.venue.run_id(),
            started_at,
            completed_at: chrono::Utc::now().to_rfc3339(),
            spawned: patrons.len(),
            departed_primary: venue.primary_exits(),
            departed_constrained: venue.constrained_exits(),
            abandoned,
            peak_primary: venue.peak_primary(),
            peak_constrained: venue.peak_constrained(),
        };
        tracing::info!(departed = report.departed(), abandoned, "Venue closed");
        report
    }
}

/// Count of patrons per class.
pub fn class_counts(patrons: &[Patron]) -> (usize, usize) {
    patrons.iter().fold((0, 0), |(p, c), patron| match patron.class {
        PatronClass::Primary => (p + 1, c),
        PatronClass::Constrained => (p, c + 1),
    })
}
