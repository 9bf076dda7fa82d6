//! Session states and the per-state data they own.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use playmesh_protocol::{ParticipantId, Room};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Which lifecycle state a session is in, without the state's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Phase {
    /// Created, waiting for the facade to start room creation (it may
    /// first have to show UI or look up an invitation).
    BeforeRoomCreateStarted,
    /// The create/accept request is with the service.
    RoomCreationPending,
    /// The room exists; peers are building the mesh.
    Connecting,
    /// Every participant is connected.
    Active,
    /// The leave request is being issued.
    LeavingRoom,
    /// Left while creation was pending; waiting for the service's answer
    /// so a room created anyway can be left.
    AbortingRoomCreation,
    /// Terminal.
    Shutdown,
}

impl Phase {
    /// Whether the session still counts as the client's live session.
    ///
    /// Only states on their way out report `false`. A session with room
    /// creation in flight is active: a second create must wait for an
    /// explicit leave.
    pub fn is_active(self) -> bool {
        match self {
            Self::BeforeRoomCreateStarted
            | Self::RoomCreationPending
            | Self::Connecting
            | Self::Active => true,
            Self::LeavingRoom | Self::AbortingRoomCreation | Self::Shutdown => false,
        }
    }

    /// Whether messages can be sent and received.
    pub fn is_messaging_enabled(self) -> bool {
        matches!(self, Self::Connecting | Self::Active)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BeforeRoomCreateStarted => "BeforeRoomCreateStarted",
            Self::RoomCreationPending => "RoomCreationPending",
            Self::Connecting => "Connecting",
            Self::Active => "Active",
            Self::LeavingRoom => "LeavingRoom",
            Self::AbortingRoomCreation => "AbortingRoomCreation",
            Self::Shutdown => "Shutdown",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// What the listener hears once a leave issued by the session completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LeaveNotice {
    /// The room never became active: `on_room_connected(false)`.
    SetupFailed,
    /// The room was active: `on_left_room()`.
    LeftRoom,
}

/// Mesh formation in progress.
#[derive(Debug)]
pub(crate) struct Connecting {
    pub(crate) room: Arc<Room>,
    /// Participants seen connected so far. Only ever grows; a shrink fails
    /// the session.
    pub(crate) connected: BTreeSet<ParticipantId>,
    pub(crate) percent_complete: f32,
    pub(crate) percent_per_participant: f32,
}

impl Connecting {
    pub(crate) fn new(room: Arc<Room>, initial_percent: f32) -> Self {
        let seats = room.participant_count().max(1) as f32;
        Self {
            room,
            connected: BTreeSet::new(),
            percent_complete: initial_percent,
            percent_per_participant: (100.0 - initial_percent) / seats,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Active {
    pub(crate) room: Arc<Room>,
}

/// The state itself. Each variant owns exactly the data that state needs;
/// the room snapshot lives only in the two messaging states.
#[derive(Debug)]
pub(crate) enum State {
    BeforeRoomCreateStarted,
    RoomCreationPending,
    Connecting(Connecting),
    Active(Active),
    /// Transient: entered and left within one transition.
    LeavingRoom,
    AbortingRoomCreation,
    Shutdown,
}

impl State {
    pub(crate) fn phase(&self) -> Phase {
        match self {
            Self::BeforeRoomCreateStarted => Phase::BeforeRoomCreateStarted,
            Self::RoomCreationPending => Phase::RoomCreationPending,
            Self::Connecting(_) => Phase::Connecting,
            Self::Active(_) => Phase::Active,
            Self::LeavingRoom => Phase::LeavingRoom,
            Self::AbortingRoomCreation => Phase::AbortingRoomCreation,
            Self::Shutdown => Phase::Shutdown,
        }
    }

    /// The current snapshot, in the states that hold one.
    pub(crate) fn room(&self) -> Option<&Arc<Room>> {
        match self {
            Self::Connecting(c) => Some(&c.room),
            Self::Active(a) => Some(&a.room),
            Self::BeforeRoomCreateStarted
            | Self::RoomCreationPending
            | Self::LeavingRoom
            | Self::AbortingRoomCreation
            | Self::Shutdown => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playmesh_protocol::{Participant, ParticipantStatus, RoomId, RoomStatus};

    #[test]
    fn test_phase_is_active_only_before_teardown() {
        assert!(Phase::BeforeRoomCreateStarted.is_active());
        assert!(Phase::RoomCreationPending.is_active());
        assert!(Phase::Connecting.is_active());
        assert!(Phase::Active.is_active());
        assert!(!Phase::LeavingRoom.is_active());
        assert!(!Phase::AbortingRoomCreation.is_active());
        assert!(!Phase::Shutdown.is_active());
    }

    #[test]
    fn test_phase_messaging_enabled() {
        assert!(Phase::Connecting.is_messaging_enabled());
        assert!(Phase::Active.is_messaging_enabled());
        assert!(!Phase::RoomCreationPending.is_messaging_enabled());
        assert!(!Phase::Shutdown.is_messaging_enabled());
    }

    #[test]
    fn test_connecting_splits_remaining_progress_per_seat() {
        let seats = ["a", "b", "c"]
            .iter()
            .map(|id| Participant::new(*id, *id, ParticipantStatus::Joined))
            .collect();
        let room = Room::new(RoomId::from("r"), RoomStatus::Connecting, seats).unwrap();
        let c = Connecting::new(Arc::new(room), 20.0);
        assert_eq!(c.percent_complete, 20.0);
        assert!((c.percent_per_participant - 80.0 / 3.0).abs() < 1e-4);
    }
}
