//! Unified error type for playmesh.

use playmesh_protocol::SnapshotError;
use playmesh_session::{ServiceError, SessionError};

/// Top-level error wrapping every crate-specific error.
///
/// Embedders using the `playmesh` crate only deal with this one type;
/// `?` converts the sub-crate errors through the `#[from]` impls.
#[derive(Debug, thiserror::Error)]
pub enum PlaymeshError {
    /// A room snapshot failed validation.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// A session rejected an operation.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The room service failed a call.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Client configuration could not be parsed.
    #[error("invalid client config: {0}")]
    Config(#[from] serde_json::Error),

    /// Neither the builder nor the config named the local player.
    #[error("no local player id configured")]
    MissingLocalPlayer,
}
