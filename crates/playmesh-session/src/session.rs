//! [`RoomSession`]: one room, from creation to leaving.
//!
//! Two locks, never nested in the wrong order:
//!
//! - the lifecycle lock (`machine`) serializes every state change
//! - the view lock guards an `Arc<SessionView>` published at the end of each
//!   transition, while the lifecycle lock is still held
//!
//! Data-path calls (sends, queries, incoming data) only touch the view.
//! Service calls produced by a transition run after the lifecycle lock is
//! released.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::{Mutex, RwLock};
use playmesh_protocol::{Participant, ParticipantId, PlayerId, Room, RoomId, RoomResponse};
use tracing::{debug, debug_span, error, warn};

use crate::machine::{Ctx, Effect, Machine};
use crate::state::LeaveNotice;
use crate::{
    ForwardingListener, Phase, RoomEvents, RoomResponseCallback, RoomService, SessionConfig,
    SessionError,
};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

// ---------------------------------------------------------------------------
// SessionView
// ---------------------------------------------------------------------------

/// An immutable picture of a session, as of its last transition.
#[derive(Debug, Clone)]
pub struct SessionView {
    phase: Phase,
    room: Option<Arc<Room>>,
}

impl SessionView {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The room snapshot. Present only while connecting or active.
    pub fn room(&self) -> Option<&Room> {
        self.room.as_deref()
    }

    fn of(machine: &Machine) -> Self {
        Self {
            phase: machine.phase(),
            room: machine.room().cloned(),
        }
    }
}

// ---------------------------------------------------------------------------
// RoomSession
// ---------------------------------------------------------------------------

/// The state machine for a single room.
///
/// Always handled through an `Arc`: the service keeps a weak event sink
/// pointing back at the session, and response callbacks hold a strong
/// reference until they fire.
pub struct RoomSession {
    id: u64,
    service: Arc<dyn RoomService>,
    listener: ForwardingListener,
    self_player: OnceLock<PlayerId>,
    machine: Mutex<Machine>,
    view: RwLock<Arc<SessionView>>,
}

impl RoomSession {
    /// A fresh session in `BeforeRoomCreateStarted`.
    pub fn new(
        service: Arc<dyn RoomService>,
        listener: ForwardingListener,
        config: SessionConfig,
    ) -> Arc<Self> {
        let machine = Machine::new(config);
        let view = SessionView::of(&machine);
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        debug!(session = id, "session created");

        Arc::new(Self {
            id,
            service,
            listener,
            self_player: OnceLock::new(),
            machine: Mutex::new(machine),
            view: RwLock::new(Arc::new(view)),
        })
    }

    /// A session that is already `Shutdown` and never notifies anyone.
    /// Stands in as the current session before the first real one.
    pub fn terminated(service: Arc<dyn RoomService>, listener: ForwardingListener) -> Arc<Self> {
        let session = Self::new(service, listener, SessionConfig::default());
        {
            let mut machine = session.machine.lock();
            machine.terminate_silently();
            session.publish(&machine);
        }
        session
    }

    /// Process-unique id, used in log lines.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.view.read().phase
    }

    /// Whether this session still blocks a new one from starting.
    pub fn is_active(&self) -> bool {
        self.phase().is_active()
    }

    /// The current published view.
    pub fn view(&self) -> Arc<SessionView> {
        Arc::clone(&*self.view.read())
    }

    /// The local player, once room creation has started.
    pub fn self_player_id(&self) -> Option<&PlayerId> {
        self.self_player.get()
    }

    // -- Lifecycle --------------------------------------------------------

    /// Starts creating (or joining) the room.
    ///
    /// `create` runs once, after the session has moved to
    /// `RoomCreationPending` and released its lock. It receives the service,
    /// the event sink to register for the room and the callback for the
    /// service's answer.
    ///
    /// # Errors
    /// - [`SessionError::TornDown`] if the session was left first
    /// - [`SessionError::CreationAlreadyStarted`] on a repeated call
    pub fn start_room_creation<F>(
        self: &Arc<Self>,
        player_id: PlayerId,
        create: F,
    ) -> Result<(), SessionError>
    where
        F: FnOnce(&dyn RoomService, Arc<dyn RoomEvents>, RoomResponseCallback) + Send + 'static,
    {
        let service = Arc::clone(&self.service);
        let events: Arc<dyn RoomEvents> = Arc::new(EventSink {
            session: Arc::downgrade(self),
        });
        let session = Arc::clone(self);
        let on_response: RoomResponseCallback =
            Box::new(move |response| session.handle_room_response(response));
        let action = Box::new(move || create(service.as_ref(), events, on_response));

        // Recorded before the lock is released so a service that answers
        // synchronously already sees the local player.
        let result = self.transition(|machine, cx| {
            machine.start_creation(action, cx)?;
            if self.self_player.set(player_id.clone()).is_err() {
                debug!(session = self.id, "local player already set");
            }
            Ok(())
        });
        match &result {
            Ok(()) => debug!(session = self.id, player = %player_id, "room creation started"),
            Err(e) => error!(session = self.id, error = %e, "cannot start room creation"),
        }
        result
    }

    /// Feeds the service's answer to a create/accept request.
    pub fn handle_room_response(&self, response: RoomResponse) {
        self.transition(|machine, cx| machine.room_response(response, cx));
    }

    /// Leaves the room, or abandons its creation. Safe to call in any
    /// state; a session that is already on its way out ignores it.
    pub fn leave_room(&self) {
        self.transition(|machine, cx| machine.leave_room(cx));
    }

    // -- Data path --------------------------------------------------------

    /// Sends `data` to every participant except the local player.
    ///
    /// Reliable messages go out one per recipient; every recipient is
    /// attempted and the first failure is returned. Unreliable messages
    /// use the service's broadcast.
    ///
    /// # Errors
    /// - [`SessionError::MessagingUnavailable`] outside Connecting/Active
    /// - [`SessionError::Service`] if the service refused a send
    pub fn send_to_all(&self, reliable: bool, data: &[u8]) -> Result<(), SessionError> {
        let view = self.view();
        let room = messaging_room(&view)?;

        if !reliable {
            return Ok(self.service.send_unreliable_to_all(room, data)?);
        }

        let self_id = self.self_participant_id(room);
        let mut first_error = None;
        for recipient in room
            .participants()
            .iter()
            .map(|p| &p.id)
            .filter(|id| Some(*id) != self_id.as_ref())
        {
            if let Err(e) = self.service.send_reliable(room, recipient, data) {
                warn!(session = self.id, %recipient, error = %e, "reliable send failed");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Sends `data` to one participant.
    ///
    /// # Errors
    /// - [`SessionError::MessagingUnavailable`] outside Connecting/Active
    /// - [`SessionError::UnknownParticipant`] if `recipient` is not in the room
    /// - [`SessionError::Service`] if the service refused the send
    pub fn send_to(
        &self,
        reliable: bool,
        recipient: &ParticipantId,
        data: &[u8],
    ) -> Result<(), SessionError> {
        let view = self.view();
        let room = messaging_room(&view)?;
        if !room.contains(recipient) {
            return Err(SessionError::UnknownParticipant(recipient.clone()));
        }

        if reliable {
            self.service.send_reliable(room, recipient, data)?;
        } else {
            self.service
                .send_unreliable(room, std::slice::from_ref(recipient), data)?;
        }
        Ok(())
    }

    /// Participants currently in the mesh, sorted by id. Empty unless
    /// connecting or active.
    pub fn connected_participants(&self) -> Vec<Participant> {
        let view = self.view();
        match view.room() {
            Some(room) if view.phase.is_messaging_enabled() => room.connected_participants(),
            _ => Vec::new(),
        }
    }

    /// The local player's seat. Only known once the room is active.
    pub fn self_participant(&self) -> Option<Participant> {
        let view = self.view();
        let room = active_room(&view)?;
        let player = self.self_player_id()?;
        room.participant_for_player(player).cloned()
    }

    /// Looks up a participant in the active room.
    pub fn participant(&self, id: &ParticipantId) -> Option<Participant> {
        let view = self.view();
        let room = active_room(&view)?;
        let found = room.participant(id).cloned();
        if found.is_none() {
            warn!(session = self.id, participant = %id, "no such participant in room");
        }
        found
    }

    pub fn is_room_connected(&self) -> bool {
        self.phase() == Phase::Active
    }

    // -- Internals --------------------------------------------------------

    fn self_participant_id(&self, room: &Room) -> Option<ParticipantId> {
        let player = self.self_player_id()?;
        room.participant_for_player(player).map(|p| p.id.clone())
    }

    fn publish(&self, machine: &Machine) {
        *self.view.write() = Arc::new(SessionView::of(machine));
    }

    /// Runs `f` under the lifecycle lock, publishes the resulting view,
    /// then runs the service calls `f` produced.
    fn transition<R>(&self, f: impl FnOnce(&mut Machine, &mut Ctx<'_>) -> R) -> R {
        let _span = debug_span!("session", id = self.id).entered();
        let (result, effects) = {
            let mut machine = self.machine.lock();
            let mut cx = Ctx::new(&self.listener, self.self_player.get());
            let result = f(&mut machine, &mut cx);
            self.publish(&machine);
            (result, cx.effects)
        };
        for effect in effects {
            self.run_effect(effect);
        }
        result
    }

    fn run_effect(&self, effect: Effect) {
        match effect {
            Effect::CreateRoom(create) => create(),
            Effect::LeaveRoom { room, notice } => {
                let listener = self.listener.clone();
                let session = self.id;
                debug!(session, room_id = %room.id(), "leaving room");
                self.service.leave_room(
                    &room,
                    Box::new(move |status| {
                        debug!(session, ?status, "leave completed");
                        match notice {
                            LeaveNotice::SetupFailed => listener.room_connected(false),
                            LeaveNotice::LeftRoom => listener.left_room(),
                        }
                    }),
                );
            }
        }
    }
}

impl std::fmt::Debug for RoomSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomSession")
            .field("id", &self.id)
            .field("phase", &self.phase())
            .field("self_player", &self.self_player_id())
            .finish_non_exhaustive()
    }
}

fn messaging_room(view: &SessionView) -> Result<&Room, SessionError> {
    match view.room() {
        Some(room) if view.phase.is_messaging_enabled() => Ok(room),
        _ => Err(SessionError::MessagingUnavailable(view.phase)),
    }
}

fn active_room(view: &SessionView) -> Option<&Room> {
    match view.phase {
        Phase::Active => view.room(),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Room events
// ---------------------------------------------------------------------------

impl RoomEvents for RoomSession {
    fn on_room_status_changed(&self, room: Room) {
        self.transition(|machine, cx| machine.room_status_changed(room, cx));
    }

    fn on_connected_set_changed(&self, room: Room) {
        self.transition(|machine, cx| machine.connected_set_changed(room, cx));
    }

    fn on_participant_status_changed(&self, room: Room, participant: Participant) {
        self.transition(|machine, cx| machine.participant_status_changed(room, participant, cx));
    }

    /// Forwards a message to the listener if this session is connecting or
    /// active in `room_id`; drops it otherwise.
    fn on_data_received(
        &self,
        room_id: &RoomId,
        sender: ParticipantId,
        data: Vec<u8>,
        reliable: bool,
    ) {
        let view = self.view();
        match view.room() {
            Some(room) if view.phase.is_messaging_enabled() && room.id() == room_id => {
                self.listener.message_received(reliable, sender, data);
            }
            _ => debug!(
                session = self.id,
                phase = %view.phase,
                %room_id,
                "dropping message for inactive room"
            ),
        }
    }
}

/// What the service holds on to. Weak, so a service that never forgets a
/// room does not keep the session alive.
struct EventSink {
    session: Weak<RoomSession>,
}

impl EventSink {
    fn with(&self, f: impl FnOnce(&RoomSession)) {
        match self.session.upgrade() {
            Some(session) => f(&session),
            None => debug!("room event for a dropped session"),
        }
    }
}

impl RoomEvents for EventSink {
    fn on_room_status_changed(&self, room: Room) {
        self.with(|s| s.on_room_status_changed(room));
    }

    fn on_connected_set_changed(&self, room: Room) {
        self.with(|s| s.on_connected_set_changed(room));
    }

    fn on_participant_status_changed(&self, room: Room, participant: Participant) {
        self.with(|s| s.on_participant_status_changed(room, participant));
    }

    fn on_data_received(
        &self,
        room_id: &RoomId,
        sender: ParticipantId,
        data: Vec<u8>,
        reliable: bool,
    ) {
        self.with(|s| s.on_data_received(room_id, sender, data, reliable));
    }
}
