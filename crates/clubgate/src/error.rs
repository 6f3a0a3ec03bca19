use std::path::PathBuf;

use thiserror::Error;

/// Fatal setup-phase failures. Once workers are spawned nothing surfaces here.
#[derive(Debug, Error)]
pub enum VenueError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read roster '{}': {source}", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to provision venue after {attempts} attempt(s): {reason}")]
    ResourceCreation { attempts: u32, reason: String },
}

impl VenueError {
    /// Process exit code for this failure. Usage problems get 2.
    pub fn exit_code(&self) -> i32 {
        match self {
            VenueError::Config(_) => 2,
            VenueError::Input { .. } | VenueError::ResourceCreation { .. } => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("admission gate closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, VenueError>;
