//! clubgate: ratio-enforcing admission control for two classes of patrons.
//!
//! Primary-class patrons enter freely. Constrained-class patrons must take a
//! permit from the [`AdmissionGate`], whose count tracks
//! `max(0, ratio * primary - constrained)` as patrons come and go.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod gate;
pub mod occupancy;
pub mod patron;
pub mod protocol;
pub mod roster;
pub mod telemetry;
pub mod venue;

pub use config::VenueConfig;
pub use dispatcher::{Dispatcher, RunReport};
pub use error::{GateError, VenueError};
pub use event::{EventFormat, EventSink, PatronPhase, RecordingSink, StdoutSink, VenueEvent};
pub use gate::AdmissionGate;
pub use occupancy::{OccupancySnapshot, OccupancyStore};
pub use patron::{Patron, PatronClass, PatronId};
pub use protocol::{AdmissionProtocol, ConstrainedProtocol, PrimaryProtocol, WorkerContext};
pub use roster::Roster;
pub use venue::{RunId, Venue, VenueGuard};
