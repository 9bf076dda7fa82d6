//! Room snapshots.
//!
//! A [`Room`] is what the service reports on every room event: the room's
//! status plus the full, ordered participant list. Snapshots are immutable.
//! When something changes the service sends a new one and the holder drops
//! the old one; nobody patches a snapshot in place, so a reader holding an
//! `Arc<Room>` can never observe a half-applied update.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Participant, ParticipantId, PlayerId, RoomId, SnapshotError};

// ---------------------------------------------------------------------------
// RoomStatus
// ---------------------------------------------------------------------------

/// Server-side status of a room.
///
/// ```text
/// Inviting | AutoMatching → Connecting → Active → Deleted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    /// Waiting for invited players to accept.
    Inviting,
    /// Waiting for the server to fill automatch seats.
    AutoMatching,
    /// All seats filled; peers are building the mesh.
    Connecting,
    /// Mesh complete.
    Active,
    /// The room is gone.
    Deleted,
}

impl RoomStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Deleted)
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Inviting => "Inviting",
            Self::AutoMatching => "AutoMatching",
            Self::Connecting => "Connecting",
            Self::Active => "Active",
            Self::Deleted => "Deleted",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// Serde shape of a room. Deserialization goes through [`Room::new`] so a
/// decoded snapshot is validated exactly like a constructed one.
#[derive(Serialize, Deserialize)]
struct RoomRepr {
    id: RoomId,
    status: RoomStatus,
    participants: Vec<Participant>,
}

/// An immutable snapshot of one room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RoomRepr", into = "RoomRepr")]
pub struct Room {
    id: RoomId,
    status: RoomStatus,
    participants: Vec<Participant>,
    /// Participant id → index into `participants`.
    index: HashMap<ParticipantId, usize>,
}

impl Room {
    /// Builds a snapshot, keeping the participant order as given.
    ///
    /// # Errors
    /// - [`SnapshotError::EmptyRoomId`] if `id` is empty
    /// - [`SnapshotError::EmptyParticipantId`] if any seat has an empty id
    /// - [`SnapshotError::DuplicateParticipant`] if two seats share an id
    pub fn new(
        id: RoomId,
        status: RoomStatus,
        participants: Vec<Participant>,
    ) -> Result<Self, SnapshotError> {
        if id.is_empty() {
            return Err(SnapshotError::EmptyRoomId);
        }

        let mut index = HashMap::with_capacity(participants.len());
        for (i, participant) in participants.iter().enumerate() {
            if participant.id.is_empty() {
                return Err(SnapshotError::EmptyParticipantId(id.to_string()));
            }
            if index.insert(participant.id.clone(), i).is_some() {
                return Err(SnapshotError::DuplicateParticipant(
                    participant.id.clone(),
                ));
            }
        }

        Ok(Self {
            id,
            status,
            participants,
            index,
        })
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn status(&self) -> RoomStatus {
        self.status
    }

    /// All participants in service order.
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Looks up a participant by id.
    pub fn participant(&self, id: &ParticipantId) -> Option<&Participant> {
        self.index.get(id).map(|&i| &self.participants[i])
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.index.contains_key(id)
    }

    /// The seat linked to `player_id`, if any.
    pub fn participant_for_player(&self, player_id: &PlayerId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.is_player(player_id))
    }

    /// Ids of participants currently in the mesh.
    pub fn connected_ids(&self) -> BTreeSet<ParticipantId> {
        self.participants
            .iter()
            .filter(|p| p.connected)
            .map(|p| p.id.clone())
            .collect()
    }

    /// Participants currently in the mesh, sorted by participant id.
    pub fn connected_participants(&self) -> Vec<Participant> {
        let mut connected: Vec<Participant> = self
            .participants
            .iter()
            .filter(|p| p.connected)
            .cloned()
            .collect();
        connected.sort_by(|a, b| a.id.cmp(&b.id));
        connected
    }

    /// Returns `true` once every seat is in the mesh.
    pub fn is_fully_connected(&self) -> bool {
        !self.participants.is_empty() && self.participants.iter().all(|p| p.connected)
    }
}

impl TryFrom<RoomRepr> for Room {
    type Error = SnapshotError;

    fn try_from(repr: RoomRepr) -> Result<Self, Self::Error> {
        Room::new(repr.id, repr.status, repr.participants)
    }
}

impl From<Room> for RoomRepr {
    fn from(room: Room) -> Self {
        RoomRepr {
            id: room.id,
            status: room.status,
            participants: room.participants,
        }
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "room {} ({}, {}/{} connected)",
            self.id,
            self.status,
            self.participants.iter().filter(|p| p.connected).count(),
            self.participants.len()
        )
    }
}
