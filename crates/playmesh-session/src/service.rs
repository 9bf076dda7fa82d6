//! The seam between sessions and the platform's room service.
//!
//! [`RoomService`] is what the session calls into; [`RoomEvents`] is what
//! the service calls back. Both sides are asynchronous: requests return
//! immediately and results arrive later through the boxed callbacks, on
//! whatever thread the service likes. A service may also answer
//! synchronously from inside the request; sessions never hold their
//! lifecycle lock while calling into the service, so that is safe.

use std::sync::Arc;

use playmesh_protocol::{
    FetchInvitationsResponse, InboxResponse, Invitation, Participant, ParticipantId,
    PlayerSelectResponse, ResponseStatus, Room, RoomConfig, RoomId, RoomResponse,
};

use crate::ServiceError;

pub type RoomResponseCallback = Box<dyn FnOnce(RoomResponse) + Send + 'static>;
pub type LeaveCallback = Box<dyn FnOnce(ResponseStatus) + Send + 'static>;
pub type PlayerSelectCallback = Box<dyn FnOnce(PlayerSelectResponse) + Send + 'static>;
pub type InboxCallback = Box<dyn FnOnce(InboxResponse) + Send + 'static>;
pub type FetchInvitationsCallback =
    Box<dyn FnOnce(FetchInvitationsResponse) + Send + 'static>;

/// Room events pushed by the service for one room.
///
/// Every room event carries a complete new snapshot; receivers replace
/// what they hold rather than merging.
pub trait RoomEvents: Send + Sync + 'static {
    fn on_room_status_changed(&self, room: Room);

    /// Some participant joined or dropped out of the mesh.
    fn on_connected_set_changed(&self, room: Room);

    /// `participant` is the seat whose status changed, as it is now.
    fn on_participant_status_changed(&self, room: Room, participant: Participant);

    fn on_data_received(
        &self,
        room_id: &RoomId,
        sender: ParticipantId,
        data: Vec<u8>,
        reliable: bool,
    );
}

/// Room creation, invitations, transport and leaving, as provided by the
/// platform.
pub trait RoomService: Send + Sync + 'static {
    /// Creates a room. Events for it go to `events` until it is left.
    fn create_room(
        &self,
        config: RoomConfig,
        events: Arc<dyn RoomEvents>,
        on_response: RoomResponseCallback,
    );

    /// Joins the room behind `invitation`.
    fn accept_invitation(
        &self,
        invitation: Invitation,
        events: Arc<dyn RoomEvents>,
        on_response: RoomResponseCallback,
    );

    fn decline_invitation(&self, invitation: Invitation);

    /// Shows the platform's opponent picker.
    fn show_player_select_ui(
        &self,
        min_players: u32,
        max_players: u32,
        allow_automatch: bool,
        on_result: PlayerSelectCallback,
    );

    /// Shows the platform's invitation inbox.
    fn show_room_inbox_ui(&self, on_result: InboxCallback);

    fn fetch_invitations(&self, on_result: FetchInvitationsCallback);

    /// Leaves `room`. `on_complete` runs once the platform has finished.
    fn leave_room(&self, room: &Room, on_complete: LeaveCallback);

    fn send_reliable(
        &self,
        room: &Room,
        recipient: &ParticipantId,
        data: &[u8],
    ) -> Result<(), ServiceError>;

    fn send_unreliable(
        &self,
        room: &Room,
        recipients: &[ParticipantId],
        data: &[u8],
    ) -> Result<(), ServiceError>;

    /// Broadcasts to every other participant in one call.
    fn send_unreliable_to_all(&self, room: &Room, data: &[u8]) -> Result<(), ServiceError>;
}
