use async_trait::async_trait;

use super::{AdmissionProtocol, WorkerContext};
use crate::error::GateError;
use crate::event::PatronPhase;
use crate::patron::{Patron, PatronClass};

/// Primary-class patrons are never held back. Their arrival licenses `ratio`
/// Constrained-class places; their departure withdraws whatever of that
/// license is still unused.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrimaryProtocol;

#[async_trait]
impl AdmissionProtocol for PrimaryProtocol {
    fn class(&self) -> PatronClass {
        PatronClass::Primary
    }

    async fn run(&self, patron: &Patron, ctx: &WorkerContext) -> Result<(), GateError> {
        ctx.emit(patron, PatronPhase::Arrives);

        {
            let mut venue = ctx.venue.lock();
            venue.increment_primary();
            let target = venue.target();
            let current = venue.query();
            if target > current {
                venue.grant(target - current);
            }
            tracing::debug!(
                wanted = target,
                before = current,
                after = venue.query(),
                "Permits raised"
            );
            ctx.snapshot(&venue);
        }

        ctx.emit(patron, PatronPhase::Enters);
        ctx.stay(patron).await;

        {
            let mut venue = ctx.venue.lock();
            venue.decrement_primary();
            let target = venue.target();
            let current = venue.query();
            if current > target {
                // Only unconsumed permits can be reclaimed.
                venue.revoke(current - target);
            }
            tracing::debug!(
                wanted = target,
                before = current,
                after = venue.query(),
                "Permits lowered"
            );
            ctx.snapshot(&venue);
        }

        ctx.emit(patron, PatronPhase::Leaves);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::VenueEvent;
    use crate::occupancy::OccupancySnapshot;
    use crate::protocol::tests::context;

    #[tokio::test(start_paused = true)]
    async fn primary_grants_then_revokes_ratio() {
        let (ctx, sink) = context(true);
        let patron = Patron::primary(1, 0, 2);

        PrimaryProtocol.run(&patron, &ctx).await.unwrap();

        assert_eq!(
            sink.lines(),
            vec![
                "patron #1 [F] arrives",
                "[snapshot] primary=1 constrained=0/3 permits=3",
                "patron #1 [F] enters",
                "[snapshot] primary=0 constrained=0/0 permits=0",
                "patron #1 [F] leaves",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn arrival_only_tops_up_missing_permits() {
        let (ctx, sink) = context(true);
        {
            let mut venue = ctx.venue.lock();
            venue.increment_primary();
            venue.increment_constrained();
            venue.grant(2);
        }

        PrimaryProtocol
            .run(&Patron::primary(2, 0, 0), &ctx)
            .await
            .unwrap();

        let snapshots = sink.snapshots();
        assert_eq!(
            snapshots[0],
            OccupancySnapshot {
                primary: 2,
                constrained: 1,
                capacity: 6,
                permits: 5,
            }
        );
        assert_eq!(
            snapshots[1],
            OccupancySnapshot {
                primary: 1,
                constrained: 1,
                capacity: 3,
                permits: 2,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn departure_with_over_occupancy_clears_gate() {
        let (ctx, sink) = context(true);
        {
            let mut venue = ctx.venue.lock();
            venue.increment_constrained();
            venue.increment_constrained();
        }

        PrimaryProtocol
            .run(&Patron::primary(3, 0, 1), &ctx)
            .await
            .unwrap();

        // 3 * 1 - 2 = 1 permit on arrival, none left once the Primary is gone.
        let permits: Vec<usize> = sink.snapshots().iter().map(|s| s.permits).collect();
        assert_eq!(permits, vec![1, 0]);
        assert!(matches!(sink.events()[0], VenueEvent::Patron { .. }));
    }
}
