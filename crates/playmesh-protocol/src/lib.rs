//! Room snapshots and room-service value types for playmesh.
//!
//! This crate defines the data that flows between the room service (the
//! platform layer that actually creates rooms and moves packets) and the
//! session state machine:
//!
//! - **Identity** ([`PlayerId`], [`ParticipantId`], [`RoomId`],
//!   [`InvitationId`]): server-assigned string identifiers.
//! - **Snapshots** ([`Room`], [`Participant`]): immutable views of room
//!   membership. The service hands out a fresh snapshot on every event; the
//!   session replaces its copy wholesale and never edits one in place.
//! - **Requests and responses** ([`RoomConfig`], [`RoomResponse`],
//!   [`Invitation`], ...): what goes into and comes back from the service.
//!
//! # How it fits in the stack
//!
//! ```text
//! Facade (playmesh)        ← one current session per client
//!     ↕
//! Session (playmesh-session) ← state machine, consumes these snapshots
//!     ↕
//! Protocol (this crate)    ← ids, rooms, participants, responses
//! ```

mod config;
mod error;
mod ids;
mod participant;
mod response;
mod room;

pub use config::RoomConfig;
pub use error::SnapshotError;
pub use ids::{InvitationId, ParticipantId, PlayerId, RoomId};
pub use participant::{Participant, ParticipantStatus, Player};
pub use response::{
    FetchInvitationsResponse, InboxResponse, Invitation, InvitationKind,
    PlayerSelectResponse, ResponseStatus, RoomResponse, UiStatus,
};
pub use room::{Room, RoomStatus};
