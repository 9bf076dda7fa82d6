//! # playmesh
//!
//! Real-time multiplayer rooms for games: create or join a room, watch the
//! peer mesh form, exchange messages, leave.
//!
//! A game talks to one [`RealtimeClient`]. The client runs at most one
//! room session at a time and reports everything through a
//! [`RealTimeListener`] the game implements, always on the game thread.
//! The platform underneath is anything implementing [`RoomService`];
//! [`sim::SimulatedRoomService`] is an in-process one for tests and demos.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use playmesh::prelude::*;
//! use playmesh::sim::SimulatedRoomService;
//!
//! struct Game;
//!
//! impl RealTimeListener for Game {
//!     fn on_room_setup_progress(&self, percent: f32) { println!("{percent:.0}%"); }
//!     fn on_room_connected(&self, success: bool) { println!("connected: {success}"); }
//!     fn on_left_room(&self) {}
//!     fn on_peers_connected(&self, _: &[ParticipantId]) {}
//!     fn on_peers_disconnected(&self, _: &[ParticipantId]) {}
//!     fn on_real_time_message_received(&self, _: bool, _: &ParticipantId, _: &[u8]) {}
//! }
//!
//! # fn main() -> Result<(), PlaymeshError> {
//! let client = RealtimeClientBuilder::new()
//!     .local_player("g_me")
//!     .build(Arc::new(SimulatedRoomService::new()))?;
//! client.create_quick_game(1, 3, 0, Arc::new(Game));
//! loop {
//!     client.queue().run_pending();
//!     // ... game update ...
//! #   break;
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
pub mod logging;
pub mod sim;

pub use client::{RealtimeClient, RealtimeClientBuilder};
pub use config::ClientConfig;
pub use error::PlaymeshError;

pub use playmesh_dispatch as dispatch;
pub use playmesh_protocol as protocol;
pub use playmesh_session as session;

/// Everything a game needs in one import.
pub mod prelude {
    pub use crate::{ClientConfig, PlaymeshError, RealtimeClient, RealtimeClientBuilder};
    pub use playmesh_dispatch::{DispatchConfig, FrameDriver, FrameDriverConfig, GameThreadQueue};
    pub use playmesh_protocol::{
        Invitation, InvitationId, Participant, ParticipantId, ParticipantStatus, Player,
        PlayerId, Room, RoomId, RoomStatus,
    };
    pub use playmesh_session::{
        Phase, RealTimeListener, RoomService, SelfDisconnectPolicy, SessionConfig,
    };
}
