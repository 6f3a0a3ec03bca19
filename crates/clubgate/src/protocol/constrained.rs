use async_trait::async_trait;

use super::{AdmissionProtocol, WorkerContext};
use crate::error::GateError;
use crate::event::PatronPhase;
use crate::patron::{Patron, PatronClass};

/// Constrained-class patrons need a permit from the admission gate. They may
/// wait indefinitely if no Primary-class patron ever licenses a place.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstrainedProtocol;

#[async_trait]
impl AdmissionProtocol for ConstrainedProtocol {
    fn class(&self) -> PatronClass {
        PatronClass::Constrained
    }

    async fn run(&self, patron: &Patron, ctx: &WorkerContext) -> Result<(), GateError> {
        ctx.emit(patron, PatronPhase::Arrives);

        tracing::debug!("Waiting for admission permit");
        ctx.venue.try_enter().await?;

        {
            let mut venue = ctx.venue.lock();
            venue.increment_constrained();
            ctx.snapshot(&venue);
        }

        ctx.emit(patron, PatronPhase::Enters);
        ctx.stay(patron).await;

        {
            let mut venue = ctx.venue.lock();
            venue.decrement_constrained();
            // The place just vacated goes back to the gate if the ratio still allows it.
            if venue.target() > 0 {
                venue.grant(1);
            }
            ctx.snapshot(&venue);
        }

        ctx.emit(patron, PatronPhase::Leaves);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::patron::PatronId;
    use crate::protocol::tests::context;

    #[tokio::test(start_paused = true)]
    async fn waits_without_permit() {
        let (ctx, sink) = context(false);
        let patron = Patron::constrained(1, 0, 1);

        let outcome =
            tokio::time::timeout(Duration::from_secs(600), ConstrainedProtocol.run(&patron, &ctx))
                .await;

        assert!(outcome.is_err(), "should block with no permits");
        assert_eq!(sink.phases_of(PatronId(1)), vec![PatronPhase::Arrives]);
        assert_eq!(ctx.venue.lock().constrained(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn enters_with_permit_and_returns_place_on_departure() {
        let (ctx, sink) = context(true);
        {
            let mut venue = ctx.venue.lock();
            venue.increment_primary();
            venue.grant(3);
        }

        ConstrainedProtocol
            .run(&Patron::constrained(4, 0, 1), &ctx)
            .await
            .unwrap();

        assert_eq!(
            sink.lines(),
            vec![
                "patron #4 [M] arrives",
                "[snapshot] primary=1 constrained=1/3 permits=2",
                "patron #4 [M] enters",
                "[snapshot] primary=1 constrained=0/3 permits=3",
                "patron #4 [M] leaves",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn departure_without_headroom_grants_nothing() {
        let (ctx, sink) = context(true);
        {
            // Over-occupied: the only Primary left while two Constrained stayed.
            let mut venue = ctx.venue.lock();
            venue.increment_constrained();
            venue.increment_constrained();
            venue.grant(1);
        }

        ConstrainedProtocol
            .run(&Patron::constrained(5, 0, 0), &ctx)
            .await
            .unwrap();

        let last = sink.snapshots().last().copied().unwrap();
        assert_eq!(last.constrained, 2);
        assert_eq!(last.permits, 0);
    }
}
