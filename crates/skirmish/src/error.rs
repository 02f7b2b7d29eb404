//! # Simulation Error Types

use skirmish_networking::TransportError;
use thiserror::Error;

/// Errors from setting up or driving a [`crate::Simulation`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimulationError {
    /// The transport refused the operation.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The player snapshot has not finished its initial read.
    #[error("player snapshot is not ready")]
    SnapshotNotReady,
}

/// Result type for simulation operations.
pub type SimulationResult<T> = Result<T, SimulationError>;
