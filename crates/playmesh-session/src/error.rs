//! Error types for the session layer.
//!
//! None of these reach the game as a panic or a listener callback. They
//! are returned from the data-path calls (send) and from
//! `start_room_creation`, and logged where they occur; lifecycle failures
//! are reported through the listener instead.

use playmesh_protocol::{ParticipantId, RoomId};

use crate::Phase;

/// Errors reported by a [`RoomService`](crate::RoomService) implementation.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ServiceError {
    /// The client is not (or no longer) in this room.
    #[error("room {0} is not joined")]
    RoomNotJoined(RoomId),

    /// The recipient is not reachable over the mesh.
    #[error("participant {0} is not reachable")]
    Unreachable(ParticipantId),

    /// The platform layer refused or failed the call.
    #[error("room service unavailable: {0}")]
    Unavailable(String),
}

/// Errors that can occur during session operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    /// `start_room_creation` was called a second time.
    #[error("room creation already started for this session")]
    CreationAlreadyStarted,

    /// The session was left before room creation started.
    #[error("session was torn down before room creation started")]
    TornDown,

    /// Sending needs a room that is connecting or active.
    #[error("messaging is not available while {0}")]
    MessagingUnavailable(Phase),

    /// The recipient is not in the current room snapshot.
    #[error("unknown participant {0}")]
    UnknownParticipant(ParticipantId),

    #[error(transparent)]
    Service(#[from] ServiceError),
}
