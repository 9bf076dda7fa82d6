//! Transition logic.
//!
//! [`Machine`] owns the current [`State`] and applies one event at a time.
//! It never talks to the room service directly: service calls a transition
//! needs are pushed onto [`Ctx::effects`] and run by the session after the
//! lifecycle lock is released. Listener notifications go straight to the
//! forwarding listener, which only queues them, so their order matches the
//! order of transitions.
//!
//! Every event matches every state explicitly. Adding a state means
//! deciding, at each of these matches, what it does.

use std::sync::Arc;

use playmesh_protocol::{
    Participant, ParticipantId, ParticipantStatus, PlayerId, Room, RoomResponse,
};
use tracing::{debug, error, warn};

use crate::state::{Active, Connecting, LeaveNotice, State};
use crate::{ForwardingListener, Phase, SelfDisconnectPolicy, SessionConfig, SessionError};

/// A service call produced by a transition.
pub(crate) enum Effect {
    /// Issue the create/accept request.
    CreateRoom(Box<dyn FnOnce() + Send + 'static>),
    /// Leave `room`, then tell the listener per `notice`.
    LeaveRoom { room: Arc<Room>, notice: LeaveNotice },
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreateRoom(_) => f.write_str("CreateRoom"),
            Self::LeaveRoom { room, notice } => f
                .debug_struct("LeaveRoom")
                .field("room", room.id())
                .field("notice", notice)
                .finish(),
        }
    }
}

/// Everything a transition may touch besides the state.
pub(crate) struct Ctx<'a> {
    pub(crate) listener: &'a ForwardingListener,
    pub(crate) self_player: Option<&'a PlayerId>,
    pub(crate) effects: Vec<Effect>,
}

impl<'a> Ctx<'a> {
    pub(crate) fn new(listener: &'a ForwardingListener, self_player: Option<&'a PlayerId>) -> Self {
        Self {
            listener,
            self_player,
            effects: Vec::new(),
        }
    }
}

/// What a messaging state decided after looking at an event.
enum Next {
    Stay,
    Leave { room: Arc<Room>, notice: LeaveNotice },
    Activate(Arc<Room>),
}

/// Participant statuses that make a full mesh impossible during setup.
fn fails_setup(status: ParticipantStatus) -> bool {
    status.is_terminal() || status == ParticipantStatus::Unresponsive
}

/// Logs a status update that moves a participant backwards. The service
/// stays authoritative, so the new snapshot is still taken.
fn check_status_order(previous: &Room, participant: &Participant) {
    let Some(before) = previous.participant(&participant.id) else {
        return;
    };
    if !before.status.can_become(participant.status) {
        warn!(
            participant = %participant.id,
            from = %before.status,
            to = %participant.status,
            "participant status moved backwards"
        );
    }
}

pub(crate) struct Machine {
    state: State,
    config: SessionConfig,
}

impl Machine {
    pub(crate) fn new(config: SessionConfig) -> Self {
        Self {
            state: State::BeforeRoomCreateStarted,
            config: config.validated(),
        }
    }

    pub(crate) fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub(crate) fn room(&self) -> Option<&Arc<Room>> {
        self.state.room()
    }

    fn set(&mut self, next: State) {
        debug!(from = %self.state.phase(), to = %next.phase(), "entering state");
        self.state = next;
    }

    /// Moves straight to Shutdown without notifying anyone. Used for the
    /// placeholder session a client holds before its first match.
    pub(crate) fn terminate_silently(&mut self) {
        self.set(State::Shutdown);
    }

    // -- Transition helpers ---------------------------------------------

    fn enter_connecting(&mut self, room: Arc<Room>, cx: &mut Ctx<'_>) {
        let connecting = Connecting::new(room, self.config.initial_progress_percent);
        let percent = connecting.percent_complete;
        self.set(State::Connecting(connecting));
        cx.listener.room_setup_progress(percent);
    }

    fn enter_active(&mut self, room: Arc<Room>, cx: &mut Ctx<'_>) {
        let has_self = cx
            .self_player
            .is_some_and(|player| room.participant_for_player(player).is_some());
        if !has_self {
            error!(room_id = %room.id(), "room fully connected but the local player has no seat");
            self.leave_via(room, LeaveNotice::SetupFailed, cx);
            return;
        }

        let automatch = room.participants().iter().filter(|p| p.is_automatch()).count();
        debug!(room_id = %room.id(), automatch, "fully connected");
        self.set(State::Active(Active { room }));
        cx.listener.room_connected(true);
    }

    /// LeavingRoom → Shutdown, queuing the leave call.
    fn leave_via(&mut self, room: Arc<Room>, notice: LeaveNotice, cx: &mut Ctx<'_>) {
        self.set(State::LeavingRoom);
        cx.effects.push(Effect::LeaveRoom { room, notice });
        self.set(State::Shutdown);
    }

    fn apply(&mut self, next: Next, cx: &mut Ctx<'_>) {
        match next {
            Next::Stay => {}
            Next::Leave { room, notice } => self.leave_via(room, notice, cx),
            Next::Activate(room) => self.enter_active(room, cx),
        }
    }

    // -- Events -----------------------------------------------------------

    /// Leaves BeforeRoomCreateStarted for RoomCreationPending and queues
    /// `create`.
    ///
    /// # Errors
    /// - [`SessionError::TornDown`] if the session was already left
    /// - [`SessionError::CreationAlreadyStarted`] on a second call
    pub(crate) fn start_creation(
        &mut self,
        create: Box<dyn FnOnce() + Send + 'static>,
        cx: &mut Ctx<'_>,
    ) -> Result<(), SessionError> {
        match self.state {
            State::BeforeRoomCreateStarted => {
                self.set(State::RoomCreationPending);
                cx.effects.push(Effect::CreateRoom(create));
                Ok(())
            }
            State::LeavingRoom | State::AbortingRoomCreation | State::Shutdown => {
                Err(SessionError::TornDown)
            }
            State::RoomCreationPending | State::Connecting(_) | State::Active(_) => {
                Err(SessionError::CreationAlreadyStarted)
            }
        }
    }

    pub(crate) fn room_response(&mut self, response: RoomResponse, cx: &mut Ctx<'_>) {
        let status = response.status;
        match self.state {
            State::RoomCreationPending => match response.into_room() {
                Some(room) => self.enter_connecting(Arc::new(room), cx),
                None => {
                    warn!(?status, "room creation failed");
                    self.set(State::Shutdown);
                    cx.listener.room_connected(false);
                }
            },
            State::AbortingRoomCreation => match response.into_room() {
                // Created a room nobody wants any more: leave it, then
                // report the failed setup.
                Some(room) => self.leave_via(Arc::new(room), LeaveNotice::SetupFailed, cx),
                None => {
                    debug!(?status, "aborted room creation also failed");
                    self.set(State::Shutdown);
                    cx.listener.room_connected(false);
                }
            },
            State::BeforeRoomCreateStarted
            | State::Connecting(_)
            | State::Active(_)
            | State::LeavingRoom
            | State::Shutdown => {
                warn!(phase = %self.phase(), ?status, "unexpected room response, ignoring");
            }
        }
    }

    pub(crate) fn room_status_changed(&mut self, room: Room, _cx: &mut Ctx<'_>) {
        let phase = self.state.phase();
        match &mut self.state {
            State::Connecting(Connecting { room: current, .. })
            | State::Active(Active { room: current }) => {
                if room.status().is_terminal() {
                    warn!(room_id = %room.id(), "service reports the room as deleted");
                } else {
                    debug!(room_id = %room.id(), status = %room.status(), "room status changed");
                }
                *current = Arc::new(room);
            }
            State::BeforeRoomCreateStarted
            | State::RoomCreationPending
            | State::LeavingRoom
            | State::AbortingRoomCreation
            | State::Shutdown => {
                debug!(phase = %phase, "room status event ignored");
            }
        }
    }

    pub(crate) fn connected_set_changed(&mut self, room: Room, cx: &mut Ctx<'_>) {
        let phase = self.state.phase();
        let policy = self.config.self_disconnect;
        let next = match &mut self.state {
            State::Connecting(connecting) => connecting_set_changed(connecting, room, cx),
            State::Active(active) => active_set_changed(active, room, policy, cx),
            State::BeforeRoomCreateStarted
            | State::RoomCreationPending
            | State::LeavingRoom
            | State::AbortingRoomCreation
            | State::Shutdown => {
                debug!(phase = %phase, "connected set event ignored");
                Next::Stay
            }
        };
        self.apply(next, cx);
    }

    pub(crate) fn participant_status_changed(
        &mut self,
        room: Room,
        participant: Participant,
        cx: &mut Ctx<'_>,
    ) {
        let phase = self.state.phase();
        let next = match &mut self.state {
            State::Connecting(connecting) => {
                check_status_order(&connecting.room, &participant);
                let room = Arc::new(room);
                if fails_setup(participant.status) {
                    error!(
                        participant = %participant.id,
                        status = %participant.status,
                        "participant can no longer join, room will never be fully connected"
                    );
                    Next::Leave {
                        room,
                        notice: LeaveNotice::SetupFailed,
                    }
                } else {
                    connecting.room = room;
                    Next::Stay
                }
            }
            State::Active(active) => {
                check_status_order(&active.room, &participant);
                debug!(
                    participant = %participant.id,
                    status = %participant.status,
                    "participant status changed"
                );
                active.room = Arc::new(room);
                Next::Stay
            }
            State::BeforeRoomCreateStarted
            | State::RoomCreationPending
            | State::LeavingRoom
            | State::AbortingRoomCreation
            | State::Shutdown => {
                debug!(phase = %phase, "participant status event ignored");
                Next::Stay
            }
        };
        self.apply(next, cx);
    }

    pub(crate) fn leave_room(&mut self, cx: &mut Ctx<'_>) {
        let phase = self.state.phase();
        match &self.state {
            State::BeforeRoomCreateStarted => {
                debug!("session torn down before room creation started");
                self.set(State::Shutdown);
                cx.listener.room_connected(false);
            }
            State::RoomCreationPending => {
                debug!("leave requested during room creation, aborting");
                self.set(State::AbortingRoomCreation);
            }
            State::Connecting(connecting) => {
                let room = Arc::clone(&connecting.room);
                self.leave_via(room, LeaveNotice::SetupFailed, cx);
            }
            State::Active(active) => {
                let room = Arc::clone(&active.room);
                self.leave_via(room, LeaveNotice::LeftRoom, cx);
            }
            State::LeavingRoom | State::AbortingRoomCreation | State::Shutdown => {
                debug!(phase = %phase, "already leaving, ignoring leave");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Connected-set handling per messaging state
// ---------------------------------------------------------------------------

fn connecting_set_changed(connecting: &mut Connecting, room: Room, cx: &mut Ctx<'_>) -> Next {
    let now_connected = room.connected_ids();
    let room = Arc::new(room);

    // Services may repeat an event; nothing to do but keep the snapshot.
    if now_connected == connecting.connected {
        debug!(room_id = %room.id(), "connected set unchanged");
        connecting.room = room;
        return Next::Stay;
    }

    let lost: Vec<&ParticipantId> = connecting.connected.difference(&now_connected).collect();
    if !lost.is_empty() {
        error!(
            room_id = %room.id(),
            lost = ?lost,
            "participants disconnected during room setup, failing"
        );
        return Next::Leave {
            room,
            notice: LeaveNotice::SetupFailed,
        };
    }

    let newly_connected = now_connected.difference(&connecting.connected).count();
    debug!(
        room_id = %room.id(),
        newly_connected,
        connected = now_connected.len(),
        seats = room.participant_count(),
        "participants connected"
    );

    if room.is_fully_connected() {
        return Next::Activate(room);
    }

    connecting.percent_complete = (connecting.percent_complete
        + connecting.percent_per_participant * newly_connected as f32)
        .min(100.0);
    connecting.connected = now_connected;
    connecting.room = room;
    cx.listener.room_setup_progress(connecting.percent_complete);
    Next::Stay
}

fn active_set_changed(
    active: &mut Active,
    room: Room,
    policy: SelfDisconnectPolicy,
    cx: &mut Ctx<'_>,
) -> Next {
    let before = active.room.connected_ids();
    let after = room.connected_ids();

    let self_id = cx.self_player.and_then(|player| {
        room.participant_for_player(player)
            .or_else(|| active.room.participant_for_player(player))
            .map(|p| p.id.clone())
    });
    let is_peer = |id: &&ParticipantId| Some(*id) != self_id.as_ref();

    // BTreeSet differences come out sorted.
    let joined: Vec<ParticipantId> = after.difference(&before).filter(is_peer).cloned().collect();
    let dropped: Vec<ParticipantId> = before.difference(&after).filter(is_peer).cloned().collect();
    let self_lost = self_id
        .as_ref()
        .is_some_and(|id| before.contains(id) && !after.contains(id));

    active.room = Arc::new(room);
    debug!(
        room_id = %active.room.id(),
        joined = joined.len(),
        dropped = dropped.len(),
        "peer connectivity changed"
    );

    if !joined.is_empty() {
        cx.listener.peers_connected(joined);
    }
    if !dropped.is_empty() {
        cx.listener.peers_disconnected(dropped);
    }

    if self_lost {
        warn!(room_id = %active.room.id(), "local player was disconnected from the room");
        cx.listener.self_disconnected();
        if policy == SelfDisconnectPolicy::Leave {
            return Next::Leave {
                room: Arc::clone(&active.room),
                notice: LeaveNotice::LeftRoom,
            };
        }
    }
    Next::Stay
}

#[cfg(test)]
mod tests {
    //! Transition tests that drive a bare `Machine`.
    //!
    //! Listener calls go through a real game-thread queue; each test
    //! drains it and compares the recorded callbacks.

    use super::*;
    use parking_lot::Mutex;
    use playmesh_dispatch::GameThreadQueue;
    use playmesh_protocol::{Player, ResponseStatus, RoomId, RoomStatus};

    use crate::RealTimeListener;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Progress(f32),
        Connected(bool),
        Left,
        PeersJoined(Vec<String>),
        PeersDropped(Vec<String>),
        SelfLost,
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Call>>);

    impl RealTimeListener for Recorder {
        fn on_room_setup_progress(&self, percent: f32) {
            self.0.lock().push(Call::Progress(percent));
        }
        fn on_room_connected(&self, success: bool) {
            self.0.lock().push(Call::Connected(success));
        }
        fn on_left_room(&self) {
            self.0.lock().push(Call::Left);
        }
        fn on_peers_connected(&self, ids: &[ParticipantId]) {
            self.0
                .lock()
                .push(Call::PeersJoined(ids.iter().map(|i| i.to_string()).collect()));
        }
        fn on_peers_disconnected(&self, ids: &[ParticipantId]) {
            self.0
                .lock()
                .push(Call::PeersDropped(ids.iter().map(|i| i.to_string()).collect()));
        }
        fn on_real_time_message_received(&self, _: bool, _: &ParticipantId, _: &[u8]) {}
        fn on_self_disconnected(&self) {
            self.0.lock().push(Call::SelfLost);
        }
    }

    struct Harness {
        machine: Machine,
        queue: GameThreadQueue,
        recorder: Arc<Recorder>,
        listener: ForwardingListener,
        me: PlayerId,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_config(SessionConfig::default())
        }

        fn with_config(config: SessionConfig) -> Self {
            let queue = GameThreadQueue::default();
            let recorder = Arc::new(Recorder::default());
            let listener = ForwardingListener::new(recorder.clone(), queue.handle());
            Self {
                machine: Machine::new(config),
                queue,
                recorder,
                listener,
                me: PlayerId::from("g_me"),
            }
        }

        /// Runs one event and returns the effects it produced.
        fn step(&mut self, f: impl FnOnce(&mut Machine, &mut Ctx<'_>)) -> Vec<Effect> {
            let mut cx = Ctx::new(&self.listener, Some(&self.me));
            f(&mut self.machine, &mut cx);
            cx.effects
        }

        fn calls(&self) -> Vec<Call> {
            self.queue.run_pending();
            std::mem::take(&mut *self.recorder.0.lock())
        }

        fn start(&mut self) {
            let effects = self.step(|m, cx| m.start_creation(Box::new(|| {}), cx).unwrap());
            assert!(matches!(effects.as_slice(), [Effect::CreateRoom(_)]));
        }

        fn to_connecting(&mut self, room: Room) {
            self.start();
            self.step(|m, cx| m.room_response(RoomResponse::success(room), cx));
            assert_eq!(self.machine.phase(), Phase::Connecting);
        }

        fn to_active(&mut self, seats: &[&str]) {
            self.to_connecting(room(seats, &[]));
            self.step(|m, cx| m.connected_set_changed(room(seats, seats), cx));
            assert_eq!(self.machine.phase(), Phase::Active);
            self.calls();
        }
    }

    /// Builds a room where `me` is the local player's seat.
    fn room(seats: &[&str], connected: &[&str]) -> Room {
        let participants = seats
            .iter()
            .map(|id| {
                let mut p = Participant::new(*id, id.to_uppercase(), ParticipantStatus::Joined)
                    .with_connected(connected.contains(id));
                if *id == "me" {
                    p = p.with_player(Player::new("g_me", "Me"));
                }
                p
            })
            .collect();
        Room::new(RoomId::from("room-1"), RoomStatus::Connecting, participants).unwrap()
    }

    fn leave_notice(effects: &[Effect]) -> Option<LeaveNotice> {
        match effects {
            [Effect::LeaveRoom { notice, .. }] => Some(*notice),
            _ => None,
        }
    }

    // =====================================================================
    // start_creation()
    // =====================================================================

    #[test]
    fn test_start_creation_twice_returns_already_started() {
        let mut h = Harness::new();
        h.start();
        let mut second = Ok(());
        let effects = h.step(|m, cx| second = m.start_creation(Box::new(|| {}), cx));
        assert_eq!(second, Err(SessionError::CreationAlreadyStarted));
        assert!(effects.is_empty());
    }

    #[test]
    fn test_start_creation_after_leave_returns_torn_down() {
        let mut h = Harness::new();
        h.step(|m, cx| m.leave_room(cx));
        let mut result = Ok(());
        let effects = h.step(|m, cx| result = m.start_creation(Box::new(|| {}), cx));
        assert_eq!(result, Err(SessionError::TornDown));
        assert!(effects.is_empty());
    }

    // =====================================================================
    // room_response()
    // =====================================================================

    #[test]
    fn test_room_response_failure_shuts_down_and_reports() {
        let mut h = Harness::new();
        h.start();
        h.step(|m, cx| m.room_response(RoomResponse::failure(ResponseStatus::Timeout), cx));
        assert_eq!(h.machine.phase(), Phase::Shutdown);
        assert_eq!(h.calls(), vec![Call::Connected(false)]);
    }

    #[test]
    fn test_room_response_success_enters_connecting_with_initial_progress() {
        let mut h = Harness::new();
        h.to_connecting(room(&["me", "a", "b"], &[]));
        assert_eq!(h.calls(), vec![Call::Progress(20.0)]);
    }

    #[test]
    fn test_leave_during_creation_then_room_arrives_leaves_it() {
        let mut h = Harness::new();
        h.start();
        h.step(|m, cx| m.leave_room(cx));
        assert_eq!(h.machine.phase(), Phase::AbortingRoomCreation);
        assert!(!h.machine.phase().is_active());

        let effects = h.step(|m, cx| {
            m.room_response(RoomResponse::success(room(&["me", "a"], &[])), cx)
        });
        assert_eq!(leave_notice(&effects), Some(LeaveNotice::SetupFailed));
        assert_eq!(h.machine.phase(), Phase::Shutdown);
        // Notification waits for the leave to complete.
        assert!(h.calls().is_empty());
    }

    #[test]
    fn test_leave_during_creation_then_failure_reports_once() {
        let mut h = Harness::new();
        h.start();
        h.step(|m, cx| m.leave_room(cx));
        let effects = h.step(|m, cx| {
            m.room_response(RoomResponse::failure(ResponseStatus::Internal), cx)
        });
        assert!(effects.is_empty());
        assert_eq!(h.machine.phase(), Phase::Shutdown);
        assert_eq!(h.calls(), vec![Call::Connected(false)]);
    }

    // =====================================================================
    // Connecting
    // =====================================================================

    #[test]
    fn test_connecting_progress_per_participant() {
        let seats = ["me", "a", "b"];
        let mut h = Harness::new();
        h.to_connecting(room(&seats, &[]));
        h.calls();

        h.step(|m, cx| m.connected_set_changed(room(&seats, &["me"]), cx));
        let calls = h.calls();
        let [Call::Progress(p)] = calls.as_slice() else {
            panic!("expected one progress call, got {calls:?}");
        };
        assert!((p - (20.0 + 80.0 / 3.0)).abs() < 1e-3, "progress was {p}");
    }

    #[test]
    fn test_connecting_full_mesh_activates_once() {
        let seats = ["me", "a", "b"];
        let mut h = Harness::new();
        h.to_connecting(room(&seats, &[]));
        h.step(|m, cx| m.connected_set_changed(room(&seats, &["me"]), cx));
        h.step(|m, cx| m.connected_set_changed(room(&seats, &["me", "a", "b"]), cx));
        assert_eq!(h.machine.phase(), Phase::Active);

        let connected: Vec<Call> = h
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Connected(_)))
            .collect();
        assert_eq!(connected, vec![Call::Connected(true)]);

        // A repeat of the final event does not announce again.
        h.step(|m, cx| m.connected_set_changed(room(&seats, &["me", "a", "b"]), cx));
        assert!(h.calls().is_empty());
    }

    #[test]
    fn test_connecting_progress_is_monotonic_and_bounded() {
        let seats = ["me", "a", "b", "c"];
        let mut h = Harness::new();
        h.to_connecting(room(&seats, &[]));
        h.step(|m, cx| m.connected_set_changed(room(&seats, &["a"]), cx));
        h.step(|m, cx| m.connected_set_changed(room(&seats, &["a"]), cx));
        h.step(|m, cx| m.connected_set_changed(room(&seats, &["a", "b", "me"]), cx));

        let progress: Vec<f32> = h
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Progress(p) => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(progress.len(), 3);
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert!(progress.iter().all(|p| (20.0..=100.0).contains(p)));
    }

    #[test]
    fn test_connecting_participant_dropping_fails_setup() {
        let seats = ["me", "a", "b"];
        let mut h = Harness::new();
        h.to_connecting(room(&seats, &[]));
        h.step(|m, cx| m.connected_set_changed(room(&seats, &["me", "a"]), cx));
        let effects = h.step(|m, cx| m.connected_set_changed(room(&seats, &["me"]), cx));

        assert_eq!(leave_notice(&effects), Some(LeaveNotice::SetupFailed));
        assert_eq!(h.machine.phase(), Phase::Shutdown);
    }

    #[test]
    fn test_connecting_declined_participant_fails_setup() {
        let seats = ["me", "a"];
        let mut h = Harness::new();
        h.to_connecting(room(&seats, &[]));
        let declined = Participant::new("a", "A", ParticipantStatus::Declined);
        let effects = h.step(|m, cx| {
            m.participant_status_changed(room(&seats, &[]), declined, cx)
        });
        assert_eq!(leave_notice(&effects), Some(LeaveNotice::SetupFailed));
    }

    #[test]
    fn test_connecting_left_participant_fails_setup() {
        let seats = ["me", "a", "b"];
        let mut h = Harness::new();
        h.to_connecting(room(&seats, &[]));
        h.calls();
        let left = Participant::new("b", "B", ParticipantStatus::Left);
        let effects = h.step(|m, cx| m.participant_status_changed(room(&seats, &["me"]), left, cx));

        assert_eq!(leave_notice(&effects), Some(LeaveNotice::SetupFailed));
        assert_eq!(h.machine.phase(), Phase::Shutdown);
        assert!(h.calls().is_empty());
    }

    #[test]
    fn test_connecting_unresponsive_participant_fails_setup() {
        let seats = ["me", "a"];
        let mut h = Harness::new();
        h.to_connecting(room(&seats, &[]));
        let slow = Participant::new("a", "A", ParticipantStatus::Unresponsive);
        let effects = h.step(|m, cx| m.participant_status_changed(room(&seats, &[]), slow, cx));

        assert_eq!(leave_notice(&effects), Some(LeaveNotice::SetupFailed));
        assert_eq!(h.machine.phase(), Phase::Shutdown);
    }

    #[test]
    fn test_connecting_finished_participant_fails_setup() {
        let seats = ["me", "a"];
        let mut h = Harness::new();
        h.to_connecting(room(&seats, &[]));
        let done = Participant::new("a", "A", ParticipantStatus::Finished);
        let effects = h.step(|m, cx| m.participant_status_changed(room(&seats, &[]), done, cx));
        assert_eq!(leave_notice(&effects), Some(LeaveNotice::SetupFailed));
    }

    #[test]
    fn test_active_unresponsive_participant_stays_active() {
        let mut h = Harness::new();
        h.to_active(&["me", "a"]);
        let slow = Participant::new("a", "A", ParticipantStatus::Unresponsive);
        let effects = h.step(|m, cx| {
            m.participant_status_changed(room(&["me", "a"], &["me", "a"]), slow, cx)
        });
        assert!(effects.is_empty());
        assert_eq!(h.machine.phase(), Phase::Active);
    }

    #[test]
    fn test_connecting_joined_participant_keeps_connecting() {
        let seats = ["me", "a"];
        let mut h = Harness::new();
        h.to_connecting(room(&seats, &[]));
        let joined = Participant::new("a", "A", ParticipantStatus::Joined);
        let effects = h.step(|m, cx| m.participant_status_changed(room(&seats, &[]), joined, cx));
        assert!(effects.is_empty());
        assert_eq!(h.machine.phase(), Phase::Connecting);
    }

    #[test]
    fn test_fully_connected_without_local_seat_fails_setup() {
        let seats = ["x", "y"];
        let mut h = Harness::new();
        h.to_connecting(room(&seats, &[]));
        h.calls();
        let effects = h.step(|m, cx| m.connected_set_changed(room(&seats, &seats), cx));
        assert_eq!(leave_notice(&effects), Some(LeaveNotice::SetupFailed));
        assert!(!h.calls().contains(&Call::Connected(true)));
    }

    // =====================================================================
    // Active
    // =====================================================================

    #[test]
    fn test_active_peer_drop_excludes_self() {
        let seats = ["me", "a", "b"];
        let mut h = Harness::new();
        h.to_active(&seats);

        h.step(|m, cx| m.connected_set_changed(room(&seats, &["me", "b"]), cx));
        assert_eq!(h.calls(), vec![Call::PeersDropped(vec!["a".into()])]);
        assert_eq!(h.machine.phase(), Phase::Active);
    }

    #[test]
    fn test_active_peer_rejoin_sorted() {
        let seats = ["me", "c", "a", "b"];
        let mut h = Harness::new();
        h.to_active(&seats);
        h.step(|m, cx| m.connected_set_changed(room(&seats, &["me"]), cx));
        h.calls();

        h.step(|m, cx| m.connected_set_changed(room(&seats, &seats), cx));
        assert_eq!(
            h.calls(),
            vec![Call::PeersJoined(vec!["a".into(), "b".into(), "c".into()])]
        );
    }

    #[test]
    fn test_active_self_loss_notifies_without_leaving() {
        let seats = ["me", "a"];
        let mut h = Harness::new();
        h.to_active(&seats);

        let effects = h.step(|m, cx| m.connected_set_changed(room(&seats, &["a"]), cx));
        assert!(effects.is_empty());
        assert_eq!(h.calls(), vec![Call::SelfLost]);
        assert_eq!(h.machine.phase(), Phase::Active);
    }

    #[test]
    fn test_active_self_loss_leaves_under_leave_policy() {
        let seats = ["me", "a"];
        let mut h = Harness::with_config(SessionConfig {
            self_disconnect: SelfDisconnectPolicy::Leave,
            ..SessionConfig::default()
        });
        h.to_active(&seats);

        let effects = h.step(|m, cx| m.connected_set_changed(room(&seats, &["a"]), cx));
        assert_eq!(leave_notice(&effects), Some(LeaveNotice::LeftRoom));
        assert_eq!(h.machine.phase(), Phase::Shutdown);
    }

    #[test]
    fn test_active_participant_missing_from_snapshot_counts_as_dropped() {
        let mut h = Harness::new();
        h.to_active(&["me", "a", "b"]);
        h.step(|m, cx| m.connected_set_changed(room(&["me", "b"], &["me", "b"]), cx));
        assert_eq!(h.calls(), vec![Call::PeersDropped(vec!["a".into()])]);
    }

    // =====================================================================
    // leave_room()
    // =====================================================================

    #[test]
    fn test_leave_before_creation_reports_failure() {
        let mut h = Harness::new();
        let effects = h.step(|m, cx| m.leave_room(cx));
        assert!(effects.is_empty());
        assert_eq!(h.machine.phase(), Phase::Shutdown);
        assert_eq!(h.calls(), vec![Call::Connected(false)]);
    }

    #[test]
    fn test_leave_active_then_leave_again_is_noop() {
        let mut h = Harness::new();
        h.to_active(&["me", "a"]);

        let first = h.step(|m, cx| m.leave_room(cx));
        assert_eq!(leave_notice(&first), Some(LeaveNotice::LeftRoom));

        let second = h.step(|m, cx| m.leave_room(cx));
        assert!(second.is_empty());
        assert!(h.calls().is_empty());
        assert_eq!(h.machine.phase(), Phase::Shutdown);
    }

    #[test]
    fn test_leave_while_connecting_reports_setup_failure() {
        let mut h = Harness::new();
        h.to_connecting(room(&["me", "a"], &[]));
        let effects = h.step(|m, cx| m.leave_room(cx));
        assert_eq!(leave_notice(&effects), Some(LeaveNotice::SetupFailed));
    }

    #[test]
    fn test_room_status_change_refreshes_snapshot() {
        let mut h = Harness::new();
        h.to_active(&["me", "a"]);
        let deleted = Room::new(
            RoomId::from("room-1"),
            RoomStatus::Deleted,
            room(&["me", "a"], &["me", "a"]).participants().to_vec(),
        )
        .unwrap();
        h.step(|m, cx| m.room_status_changed(deleted, cx));
        assert_eq!(
            h.machine.room().map(|r| r.status()),
            Some(RoomStatus::Deleted)
        );
    }
}
