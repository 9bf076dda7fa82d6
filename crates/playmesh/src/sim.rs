//! An in-process room service for tests, demos and offline play.
//!
//! [`SimulatedRoomService`] implements [`RoomService`] without a network.
//! Every request is recorded and every callback is parked until a driver
//! method answers it, so callers script exactly what "the platform" does
//! and when. The one exception is `fetch_invitations`, which answers
//! immediately from the list given to [`set_invitations`].
//!
//! Callbacks always run after the simulator's own lock is released, so
//! sessions may call back into the service from inside them.
//!
//! [`set_invitations`]: SimulatedRoomService::set_invitations

use std::sync::Arc;

use parking_lot::Mutex;
use playmesh_protocol::{
    FetchInvitationsResponse, InboxResponse, Invitation, InvitationId, Participant,
    ParticipantId, ParticipantStatus, Player, PlayerId, PlayerSelectResponse, ResponseStatus,
    Room, RoomConfig, RoomId, RoomResponse, RoomStatus,
};
use playmesh_session::{
    FetchInvitationsCallback, InboxCallback, LeaveCallback, PlayerSelectCallback, RoomEvents,
    RoomResponseCallback, RoomService, ServiceError,
};
use rand::Rng;
use tracing::{debug, warn};

use crate::PlaymeshError;

/// A request the simulator received.
#[derive(Debug, Clone, PartialEq)]
pub enum SimCall {
    CreateRoom(RoomConfig),
    AcceptInvitation(InvitationId),
    DeclineInvitation(InvitationId),
    ShowPlayerSelect {
        min_players: u32,
        max_players: u32,
        allow_automatch: bool,
    },
    ShowInbox,
    FetchInvitations,
    LeaveRoom(RoomId),
}

/// Who a recorded message went to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipients {
    One(ParticipantId),
    Many(Vec<ParticipantId>),
    All,
}

/// A message the simulator was asked to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub room: RoomId,
    pub recipients: Recipients,
    pub reliable: bool,
    pub data: Vec<u8>,
}

#[derive(Default)]
struct SimState {
    calls: Vec<SimCall>,
    sent: Vec<SentMessage>,
    pending_creation: Option<(Arc<dyn RoomEvents>, RoomResponseCallback)>,
    /// The joined room and its event sink.
    room: Option<(Room, Arc<dyn RoomEvents>)>,
    player_select: Option<PlayerSelectCallback>,
    inbox: Option<InboxCallback>,
    invitations: Vec<Invitation>,
    fetch_status: Option<ResponseStatus>,
    pending_leaves: Vec<(RoomId, LeaveCallback)>,
}

/// Scripted [`RoomService`]. See the module docs.
#[derive(Default)]
pub struct SimulatedRoomService {
    state: Mutex<SimState>,
}

impl SimulatedRoomService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds seats for a match: the local player first, then `opponents`
    /// automatch seats. Participant ids are random, like the platform's.
    pub fn seats(local: &Player, opponents: usize) -> Vec<Participant> {
        let mut seats = Vec::with_capacity(opponents + 1);
        seats.push(
            Participant::new(random_id("p"), local.display_name.clone(), ParticipantStatus::Joined)
                .with_player(local.clone()),
        );
        for n in 1..=opponents {
            seats.push(Participant::new(
                random_id("p"),
                format!("Opponent {n}"),
                ParticipantStatus::Joined,
            ));
        }
        seats
    }

    // -- Inspection -------------------------------------------------------

    pub fn calls(&self) -> Vec<SimCall> {
        self.state.lock().calls.clone()
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.state.lock().sent.clone()
    }

    /// The joined room's latest snapshot.
    pub fn room(&self) -> Option<Room> {
        self.state.lock().room.as_ref().map(|(room, _)| room.clone())
    }

    pub fn has_pending_creation(&self) -> bool {
        self.state.lock().pending_creation.is_some()
    }

    // -- Driving ----------------------------------------------------------

    /// Answers the outstanding create/accept request with a new room
    /// holding `participants`, none of them connected yet.
    ///
    /// Returns `Ok(None)` if nothing was pending.
    ///
    /// # Errors
    /// [`PlaymeshError::Snapshot`] if `participants` do not form a valid room.
    pub fn complete_pending_creation(
        &self,
        participants: Vec<Participant>,
    ) -> Result<Option<Room>, PlaymeshError> {
        let participants = participants
            .into_iter()
            .map(|p| p.with_connected(false))
            .collect();
        let room = Room::new(
            RoomId::new(random_id("room")),
            RoomStatus::Connecting,
            participants,
        )?;

        let on_response = {
            let mut state = self.state.lock();
            let Some((events, on_response)) = state.pending_creation.take() else {
                return Ok(None);
            };
            state.room = Some((room.clone(), events));
            on_response
        };
        debug!(room_id = %room.id(), seats = room.participant_count(), "sim: room created");
        on_response(RoomResponse::success(room.clone()));
        Ok(Some(room))
    }

    /// Fails the outstanding create/accept request. Returns `false` if
    /// nothing was pending.
    pub fn fail_pending_creation(&self, status: ResponseStatus) -> bool {
        let Some((_, on_response)) = self.state.lock().pending_creation.take() else {
            return false;
        };
        debug!(?status, "sim: room creation failed");
        on_response(RoomResponse::failure(status));
        true
    }

    /// Marks exactly `connected` as in the mesh and pushes the new
    /// snapshot. The room turns Active once everyone is connected.
    pub fn push_connected_set(&self, connected: &[ParticipantId]) -> bool {
        let pushed = self.update_room(|room| {
            let participants: Vec<Participant> = room
                .participants()
                .iter()
                .map(|p| p.clone().with_connected(connected.contains(&p.id)))
                .collect();
            let status = if participants.iter().all(|p| p.connected) {
                RoomStatus::Active
            } else {
                room.status()
            };
            rebuild(room, status, participants)
        });
        match pushed {
            Some((room, events)) => {
                events.on_connected_set_changed(room);
                true
            }
            None => false,
        }
    }

    /// Connects every seat.
    pub fn connect_everyone(&self) -> bool {
        let Some(room) = self.room() else {
            return false;
        };
        let everyone: Vec<ParticipantId> =
            room.participants().iter().map(|p| p.id.clone()).collect();
        self.push_connected_set(&everyone)
    }

    /// Changes one participant's status and pushes the event.
    ///
    /// Statuses only move forward: an unknown participant, or a change
    /// [`ParticipantStatus::can_become`] rejects, leaves the room untouched
    /// and returns `false`.
    pub fn push_participant_status(
        &self,
        participant: &ParticipantId,
        status: ParticipantStatus,
    ) -> bool {
        let pushed = self.update_room(|room| {
            let Some(current) = room.participant(participant) else {
                warn!(%participant, "sim: no such participant");
                return None;
            };
            if !current.status.can_become(status) {
                warn!(
                    %participant,
                    from = %current.status,
                    to = %status,
                    "sim: participant status cannot move backwards"
                );
                return None;
            }
            let participants = room
                .participants()
                .iter()
                .cloned()
                .map(|mut p| {
                    if &p.id == participant {
                        p.status = status;
                    }
                    p
                })
                .collect();
            rebuild(room, room.status(), participants)
        });
        let Some((room, events)) = pushed else {
            return false;
        };
        let Some(changed) = room.participant(participant).cloned() else {
            return false;
        };
        events.on_participant_status_changed(room, changed);
        true
    }

    pub fn push_room_status(&self, status: RoomStatus) -> bool {
        let pushed =
            self.update_room(|room| rebuild(room, status, room.participants().to_vec()));
        match pushed {
            Some((room, events)) => {
                events.on_room_status_changed(room);
                true
            }
            None => false,
        }
    }

    /// Delivers a message from `sender` into the joined room.
    pub fn deliver_data(&self, sender: &ParticipantId, data: &[u8], reliable: bool) -> bool {
        let Some((room_id, events)) = self
            .state
            .lock()
            .room
            .as_ref()
            .map(|(room, events)| (room.id().clone(), Arc::clone(events)))
        else {
            return false;
        };
        events.on_data_received(&room_id, sender.clone(), data.to_vec(), reliable);
        true
    }

    /// Answers the open player-selection screen.
    pub fn answer_player_select(&self, response: PlayerSelectResponse) -> bool {
        let Some(on_result) = self.state.lock().player_select.take() else {
            return false;
        };
        on_result(response);
        true
    }

    /// Answers the open invitation inbox.
    pub fn answer_inbox(&self, response: InboxResponse) -> bool {
        let Some(on_result) = self.state.lock().inbox.take() else {
            return false;
        };
        on_result(response);
        true
    }

    /// Invitations returned by later `fetch_invitations` calls.
    pub fn set_invitations(&self, invitations: Vec<Invitation>) {
        self.state.lock().invitations = invitations;
    }

    /// Makes later `fetch_invitations` calls fail with `status`.
    pub fn fail_invitation_fetches(&self, status: ResponseStatus) {
        self.state.lock().fetch_status = Some(status);
    }

    /// Completes every outstanding leave. Returns how many there were.
    pub fn complete_leaves(&self) -> usize {
        let leaves = {
            let mut state = self.state.lock();
            let leaves = std::mem::take(&mut state.pending_leaves);
            let left_current = state
                .room
                .as_ref()
                .is_some_and(|(room, _)| leaves.iter().any(|(id, _)| id == room.id()));
            if left_current {
                state.room = None;
            }
            leaves
        };
        let count = leaves.len();
        for (room_id, on_complete) in leaves {
            debug!(%room_id, "sim: left room");
            on_complete(ResponseStatus::Valid);
        }
        count
    }

    /// Applies `f` to the joined room and stores the result. Returns the
    /// new snapshot and the sink to push it to, or `None` if there is no
    /// room or `f` declined the update.
    fn update_room(
        &self,
        f: impl FnOnce(&Room) -> Option<Room>,
    ) -> Option<(Room, Arc<dyn RoomEvents>)> {
        let mut state = self.state.lock();
        let (room, events) = state.room.as_mut()?;
        let next = f(room)?;
        *room = next.clone();
        Some((next, Arc::clone(events)))
    }

    fn record_send(
        &self,
        room: &Room,
        recipients: Recipients,
        reliable: bool,
        data: &[u8],
    ) -> Result<(), ServiceError> {
        let mut state = self.state.lock();
        let Some((joined, _)) = state.room.as_ref() else {
            return Err(ServiceError::RoomNotJoined(room.id().clone()));
        };
        if joined.id() != room.id() {
            return Err(ServiceError::RoomNotJoined(room.id().clone()));
        }
        let unknown = match &recipients {
            Recipients::One(id) => (!joined.contains(id)).then(|| id.clone()),
            Recipients::Many(ids) => ids.iter().find(|id| !joined.contains(id)).cloned(),
            Recipients::All => None,
        };
        if let Some(id) = unknown {
            return Err(ServiceError::Unreachable(id));
        }
        state.sent.push(SentMessage {
            room: room.id().clone(),
            recipients,
            reliable,
            data: data.to_vec(),
        });
        Ok(())
    }
}

impl RoomService for SimulatedRoomService {
    fn create_room(
        &self,
        config: RoomConfig,
        events: Arc<dyn RoomEvents>,
        on_response: RoomResponseCallback,
    ) {
        debug!(max_seats = config.max_seats(), variant = config.variant, "sim: room requested");
        let mut state = self.state.lock();
        state.calls.push(SimCall::CreateRoom(config));
        state.pending_creation = Some((events, on_response));
    }

    fn accept_invitation(
        &self,
        invitation: Invitation,
        events: Arc<dyn RoomEvents>,
        on_response: RoomResponseCallback,
    ) {
        let mut state = self.state.lock();
        state.calls.push(SimCall::AcceptInvitation(invitation.id));
        state.pending_creation = Some((events, on_response));
    }

    fn decline_invitation(&self, invitation: Invitation) {
        let mut state = self.state.lock();
        state.invitations.retain(|inv| inv.id != invitation.id);
        state.calls.push(SimCall::DeclineInvitation(invitation.id));
    }

    fn show_player_select_ui(
        &self,
        min_players: u32,
        max_players: u32,
        allow_automatch: bool,
        on_result: PlayerSelectCallback,
    ) {
        let mut state = self.state.lock();
        state.calls.push(SimCall::ShowPlayerSelect {
            min_players,
            max_players,
            allow_automatch,
        });
        state.player_select = Some(on_result);
    }

    fn show_room_inbox_ui(&self, on_result: InboxCallback) {
        let mut state = self.state.lock();
        state.calls.push(SimCall::ShowInbox);
        state.inbox = Some(on_result);
    }

    fn fetch_invitations(&self, on_result: FetchInvitationsCallback) {
        let response = {
            let mut state = self.state.lock();
            state.calls.push(SimCall::FetchInvitations);
            match state.fetch_status {
                Some(status) => FetchInvitationsResponse {
                    status,
                    invitations: Vec::new(),
                },
                None => FetchInvitationsResponse {
                    status: ResponseStatus::Valid,
                    invitations: state.invitations.clone(),
                },
            }
        };
        on_result(response);
    }

    fn leave_room(&self, room: &Room, on_complete: LeaveCallback) {
        let mut state = self.state.lock();
        state.calls.push(SimCall::LeaveRoom(room.id().clone()));
        state.pending_leaves.push((room.id().clone(), on_complete));
    }

    fn send_reliable(
        &self,
        room: &Room,
        recipient: &ParticipantId,
        data: &[u8],
    ) -> Result<(), ServiceError> {
        self.record_send(room, Recipients::One(recipient.clone()), true, data)
    }

    fn send_unreliable(
        &self,
        room: &Room,
        recipients: &[ParticipantId],
        data: &[u8],
    ) -> Result<(), ServiceError> {
        self.record_send(room, Recipients::Many(recipients.to_vec()), false, data)
    }

    fn send_unreliable_to_all(&self, room: &Room, data: &[u8]) -> Result<(), ServiceError> {
        self.record_send(room, Recipients::All, false, data)
    }
}

impl std::fmt::Debug for SimulatedRoomService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SimulatedRoomService")
            .field("calls", &state.calls.len())
            .field("room", &state.room.as_ref().map(|(room, _)| room.id().clone()))
            .field("pending_leaves", &state.pending_leaves.len())
            .finish()
    }
}

/// Rebuilds `room` with new contents, logging a snapshot that fails
/// validation.
fn rebuild(room: &Room, status: RoomStatus, participants: Vec<Participant>) -> Option<Room> {
    Room::new(room.id().clone(), status, participants)
        .map_err(|e| warn!(error = %e, "sim: invalid room update"))
        .ok()
}

/// A random id like `room_3f9a0c1d2e4b5a69`.
fn random_id(prefix: &str) -> String {
    let n: u64 = rand::rng().random();
    format!("{prefix}_{n:016x}")
}

/// Shorthand for a player-select result that invites `players` and allows
/// no automatching.
pub fn invite_only(players: impl IntoIterator<Item = PlayerId>) -> PlayerSelectResponse {
    PlayerSelectResponse {
        status: playmesh_protocol::UiStatus::Valid,
        invited_players: players.into_iter().collect(),
        min_automatch_players: 0,
        max_automatch_players: 0,
    }
}
