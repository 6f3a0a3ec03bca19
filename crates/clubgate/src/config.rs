//! Run configuration.

use std::time::Duration;

use crate::error::{Result, VenueError};
use crate::gate::AdmissionGate;

/// Default Constrained-per-Primary ratio.
pub const DEFAULT_RATIO: usize = 3;
/// Default roster cap.
pub const DEFAULT_MAX_PATRONS: usize = 100;
/// Default number of provisioning attempts before giving up.
pub const DEFAULT_PROVISION_ATTEMPTS: u32 = 3;

/// Parameters fixed for the lifetime of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueConfig {
    /// At most `ratio` Constrained-class patrons are licensed per Primary-class patron present.
    pub ratio: usize,
    /// Wall-clock length of one roster tick.
    pub tick: Duration,
    /// Roster records past this count are dropped.
    pub max_patrons: usize,
    pub provision_attempts: u32,
    /// Emit occupancy snapshots from every critical section.
    pub snapshots: bool,
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            ratio: DEFAULT_RATIO,
            tick: Duration::from_secs(1),
            max_patrons: DEFAULT_MAX_PATRONS,
            provision_attempts: DEFAULT_PROVISION_ATTEMPTS,
            snapshots: false,
        }
    }
}

impl VenueConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ratio(mut self, ratio: usize) -> Self {
        self.ratio = ratio;
        self
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn with_max_patrons(mut self, max_patrons: usize) -> Self {
        self.max_patrons = max_patrons;
        self
    }

    pub fn with_provision_attempts(mut self, attempts: u32) -> Self {
        self.provision_attempts = attempts;
        self
    }

    pub fn with_snapshots(mut self, snapshots: bool) -> Self {
        self.snapshots = snapshots;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.ratio == 0 {
            return Err(VenueError::Config("ratio must be positive".to_string()));
        }
        if self.max_patrons == 0 {
            return Err(VenueError::Config(
                "max_patrons must be positive".to_string(),
            ));
        }
        if self.provision_attempts == 0 {
            return Err(VenueError::Config(
                "provision_attempts must be positive".to_string(),
            ));
        }
        let max_ratio = AdmissionGate::MAX_CAPACITY / self.max_patrons;
        if self.ratio > max_ratio {
            return Err(VenueError::Config(format!(
                "ratio {} too large for {} patrons (max {max_ratio})",
                self.ratio, self.max_patrons
            )));
        }
        Ok(())
    }

    /// Wall-clock duration of `ticks` roster ticks.
    pub fn ticks(&self, ticks: u64) -> Duration {
        self.tick.saturating_mul(u32::try_from(ticks).unwrap_or(u32::MAX))
    }
}
