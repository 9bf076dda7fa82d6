//! Real-time room session state machine for playmesh.
//!
//! One [`RoomSession`] follows one multiplayer room from "about to create"
//! to "left", turning the room service's raw callbacks into the small set
//! of events a game cares about: setup progress, connected/failed, peers
//! joining and dropping, messages, and left.
//!
//! # Lifecycle
//!
//! ```text
//! BeforeRoomCreateStarted ──start──→ RoomCreationPending ──room──→ Connecting ──mesh──→ Active
//!        │                                │        │                   │                  │
//!      leave                            leave    failure          peer lost/leave      leave
//!        ▼                                ▼        ▼                   ▼                  ▼
//!     Shutdown ←── failure ── AbortingRoomCreation Shutdown        LeavingRoom ─────→ Shutdown
//! ```
//!
//! # Locking
//!
//! Everything that can change the state takes the session's lifecycle
//! lock, so the listener sees one total order of lifecycle events even
//! when service callbacks race each other and the game's own calls.
//! Sending and the participant queries never take that lock: they read an
//! immutable [`SessionView`] that is swapped wholesale after each
//! transition.
//!
//! # Key types
//!
//! - [`RoomSession`]: the state machine plus its locks
//! - [`RealTimeListener`]: what the game implements
//! - [`RoomService`] / [`RoomEvents`]: the platform seam
//! - [`ForwardingListener`]: delivers listener calls on the game thread

mod config;
mod error;
mod listener;
mod machine;
mod service;
mod session;
mod state;

pub use config::{SelfDisconnectPolicy, SessionConfig};
pub use error::{ServiceError, SessionError};
pub use listener::{ForwardingListener, NoopListener, RealTimeListener};
pub use service::{
    FetchInvitationsCallback, InboxCallback, LeaveCallback, PlayerSelectCallback,
    RoomEvents, RoomResponseCallback, RoomService,
};
pub use session::{RoomSession, SessionView};
pub use state::Phase;
