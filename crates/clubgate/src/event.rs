//! Patron status events and the sinks that receive them.
//!
//! Events are emitted in order per worker; events of different workers interleave.

use std::fmt;
use std::io::Write;
use std::sync::Mutex;

use serde::Serialize;

use crate::occupancy::OccupancySnapshot;
use crate::patron::{Patron, PatronClass, PatronId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatronPhase {
    Arrives,
    Enters,
    Leaves,
}

impl PatronPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatronPhase::Arrives => "arrives",
            PatronPhase::Enters => "enters",
            PatronPhase::Leaves => "leaves",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum VenueEvent {
    Patron {
        id: PatronId,
        class: PatronClass,
        phase: PatronPhase,
    },
    Snapshot(OccupancySnapshot),
}

impl VenueEvent {
    pub fn patron(patron: &Patron, phase: PatronPhase) -> Self {
        VenueEvent::Patron {
            id: patron.id,
            class: patron.class,
            phase,
        }
    }

    /// `(id, phase)` for patron events, `None` for snapshots.
    pub fn patron_phase(&self) -> Option<(PatronId, PatronPhase)> {
        match self {
            VenueEvent::Patron { id, phase, .. } => Some((*id, *phase)),
            VenueEvent::Snapshot(_) => None,
        }
    }
}

impl fmt::Display for VenueEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VenueEvent::Patron { id, class, phase } => {
                write!(f, "patron #{id} [{class}] {}", phase.as_str())
            }
            VenueEvent::Snapshot(snapshot) => fmt::Display::fmt(snapshot, f),
        }
    }
}

/// Receives the event stream. Called from worker tasks, sometimes with the
/// venue lock held, so implementations must not block for long.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &VenueEvent);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EventFormat {
    /// `patron #<id> [<tag>] <phase>` lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Writes events to stdout, one per line.
#[derive(Debug, Default)]
pub struct StdoutSink {
    format: EventFormat,
}

impl StdoutSink {
    pub fn new(format: EventFormat) -> Self {
        Self { format }
    }

    fn render(&self, event: &VenueEvent) -> String {
        match self.format {
            EventFormat::Text => event.to_string(),
            EventFormat::Json => serde_json::to_string(event).unwrap_or_else(|e| {
                tracing::error!(error = %e, "Failed to serialize event");
                event.to_string()
            }),
        }
    }
}

impl EventSink for StdoutSink {
    fn emit(&self, event: &VenueEvent) {
        let line = self.render(event);
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{line}").and_then(|()| stdout.flush()) {
            tracing::warn!(error = %e, "Failed to write event to stdout");
        }
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<VenueEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<VenueEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.events().iter().map(ToString::to_string).collect()
    }

    pub fn snapshots(&self) -> Vec<OccupancySnapshot> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                VenueEvent::Snapshot(snapshot) => Some(snapshot),
                VenueEvent::Patron { .. } => None,
            })
            .collect()
    }

    /// Phases of one patron, in the order they were emitted.
    pub fn phases_of(&self, id: PatronId) -> Vec<PatronPhase> {
        self.events()
            .iter()
            .filter_map(VenueEvent::patron_phase)
            .filter(|(event_id, _)| *event_id == id)
            .map(|(_, phase)| phase)
            .collect()
    }

    /// Position of the first `(id, phase)` event in the stream.
    pub fn position(&self, id: PatronId, phase: PatronPhase) -> Option<usize> {
        self.events()
            .iter()
            .position(|event| event.patron_phase() == Some((id, phase)))
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &VenueEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(*event),
            Err(poisoned) => poisoned.into_inner().push(*event),
        }
    }
}
