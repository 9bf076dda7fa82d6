//! The game-facing listener and its game-thread forwarder.

use std::sync::Arc;

use playmesh_dispatch::DispatchHandle;
use playmesh_protocol::ParticipantId;

/// Callbacks a game receives about its current room.
///
/// Every call arrives on the game thread (whatever drains the
/// [`GameThreadQueue`](playmesh_dispatch::GameThreadQueue)), never on a
/// room-service thread. A session ends with exactly one terminal signal:
/// `on_room_connected(false)` if the room never became active, or
/// `on_left_room()` if it did.
pub trait RealTimeListener: Send + Sync + 'static {
    /// Mesh setup progress, 0–100, non-decreasing within a session.
    fn on_room_setup_progress(&self, percent: f32);

    /// `true` once every participant is connected; `false` if setup failed
    /// or was abandoned.
    fn on_room_connected(&self, success: bool);

    /// The local player has left an active room.
    fn on_left_room(&self);

    /// Peers (never the local player) joined the mesh. Sorted by id.
    fn on_peers_connected(&self, participant_ids: &[ParticipantId]);

    /// Peers (never the local player) dropped out of the mesh. Sorted by id.
    fn on_peers_disconnected(&self, participant_ids: &[ParticipantId]);

    fn on_real_time_message_received(
        &self,
        reliable: bool,
        sender: &ParticipantId,
        data: &[u8],
    );

    /// The local player dropped out of an active room's mesh.
    /// Default: ignore.
    fn on_self_disconnected(&self) {}
}

/// A listener that ignores everything. Stands in wherever a session needs
/// a listener but nobody is listening.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl RealTimeListener for NoopListener {
    fn on_room_setup_progress(&self, _percent: f32) {}
    fn on_room_connected(&self, _success: bool) {}
    fn on_left_room(&self) {}
    fn on_peers_connected(&self, _participant_ids: &[ParticipantId]) {}
    fn on_peers_disconnected(&self, _participant_ids: &[ParticipantId]) {}
    fn on_real_time_message_received(
        &self,
        _reliable: bool,
        _sender: &ParticipantId,
        _data: &[u8],
    ) {
    }
}

/// Wraps a [`RealTimeListener`] so each call is queued for the game thread
/// instead of running on the caller's thread.
///
/// Cheap to clone; clones share the listener and the queue.
#[derive(Clone)]
pub struct ForwardingListener {
    listener: Arc<dyn RealTimeListener>,
    dispatch: DispatchHandle,
}

impl ForwardingListener {
    pub fn new(listener: Arc<dyn RealTimeListener>, dispatch: DispatchHandle) -> Self {
        Self { listener, dispatch }
    }

    pub fn room_setup_progress(&self, percent: f32) {
        let listener = Arc::clone(&self.listener);
        self.dispatch
            .run_on_game_thread(move || listener.on_room_setup_progress(percent));
    }

    pub fn room_connected(&self, success: bool) {
        let listener = Arc::clone(&self.listener);
        self.dispatch
            .run_on_game_thread(move || listener.on_room_connected(success));
    }

    pub fn left_room(&self) {
        let listener = Arc::clone(&self.listener);
        self.dispatch.run_on_game_thread(move || listener.on_left_room());
    }

    pub fn peers_connected(&self, participant_ids: Vec<ParticipantId>) {
        let listener = Arc::clone(&self.listener);
        self.dispatch
            .run_on_game_thread(move || listener.on_peers_connected(&participant_ids));
    }

    pub fn peers_disconnected(&self, participant_ids: Vec<ParticipantId>) {
        let listener = Arc::clone(&self.listener);
        self.dispatch.run_on_game_thread(move || {
            listener.on_peers_disconnected(&participant_ids)
        });
    }

    pub fn message_received(&self, reliable: bool, sender: ParticipantId, data: Vec<u8>) {
        let listener = Arc::clone(&self.listener);
        self.dispatch.run_on_game_thread(move || {
            listener.on_real_time_message_received(reliable, &sender, &data)
        });
    }

    pub fn self_disconnected(&self) {
        let listener = Arc::clone(&self.listener);
        self.dispatch
            .run_on_game_thread(move || listener.on_self_disconnected());
    }
}

impl std::fmt::Debug for ForwardingListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwardingListener")
            .field("dispatch", &self.dispatch)
            .finish_non_exhaustive()
    }
}
