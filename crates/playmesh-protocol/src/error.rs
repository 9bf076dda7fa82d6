//! Error types for the protocol layer.

use crate::ParticipantId;

/// Errors raised while building a [`Room`](crate::Room) snapshot.
///
/// A snapshot that fails validation is rejected as a whole; the session
/// never sees a half-valid room.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SnapshotError {
    /// The room id was empty. The service always assigns one.
    #[error("room snapshot has an empty room id")]
    EmptyRoomId,

    /// Two participants in the same room share an id.
    #[error("participant {0} appears more than once in the room")]
    DuplicateParticipant(ParticipantId),

    /// A participant was reported with an empty id.
    #[error("participant with empty id in room {0}")]
    EmptyParticipantId(String),
}
