//! # Transport Error Types

use skirmish_shared::InvalidJoinCode;
use thiserror::Error;

/// Errors surfaced by session creation, joining and the backend.
///
/// Every variant renders a message fit for the lobby screen.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The backend could not be reached.
    #[error("cannot reach the game server: {0}")]
    Connectivity(String),

    /// A session record could not be created.
    #[error("could not create a session: {0}")]
    SessionCreate(String),

    /// No live session uses this join code.
    #[error("no open session with join code {0}")]
    SessionNotFound(String),

    /// The join code is malformed.
    #[error(transparent)]
    InvalidJoinCode(#[from] InvalidJoinCode),

    /// A uniqueness constraint was violated.
    #[error("already exists: {0}")]
    DuplicateConstraint(String),

    /// The session has no free slot.
    #[error("session {0} is full")]
    SessionFull(String),

    /// A host-only operation was attempted by another peer.
    #[error("only the host can {0}")]
    NotHost(&'static str),

    /// The transport was disconnected.
    #[error("not connected to a session")]
    Disconnected,

    /// A background task was requested outside an async runtime.
    #[error("no async runtime available: {0}")]
    NoRuntime(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
