//! `RealtimeClient`: the game's entry point.
//!
//! The client owns at most one live [`RoomSession`] at a time. Every
//! create/accept call builds a fresh session; if the current one is still
//! active the new session is left straight away (its listener hears
//! `on_room_connected(false)`) and the current one is kept. All other
//! calls are forwarded to whichever session is current.

use std::sync::Arc;

use parking_lot::Mutex;
use playmesh_dispatch::{FrameDriver, GameThreadQueue};
use playmesh_protocol::{
    Invitation, InvitationId, Participant, ParticipantId, PlayerId, RoomConfig,
};
use playmesh_session::{
    ForwardingListener, NoopListener, Phase, RealTimeListener, RoomEvents,
    RoomResponseCallback, RoomService, RoomSession,
};
use tracing::{debug, error, info, warn};

use crate::{ClientConfig, PlaymeshError};

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for a [`RealtimeClient`].
///
/// ```rust,ignore
/// let client = RealtimeClientBuilder::new()
///     .local_player("g_123")
///     .build(service)?;
/// ```
#[derive(Debug, Default)]
pub struct RealtimeClientBuilder {
    config: ClientConfig,
}

impl RealtimeClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration. A local player set earlier is
    /// kept unless `config` names one.
    pub fn config(mut self, config: ClientConfig) -> Self {
        let local_player = config.local_player.clone().or(self.config.local_player);
        self.config = ClientConfig {
            local_player,
            ..config
        };
        self
    }

    pub fn local_player(mut self, player: impl Into<PlayerId>) -> Self {
        self.config.local_player = Some(player.into());
        self
    }

    /// Builds the client on top of `service`.
    ///
    /// # Errors
    /// [`PlaymeshError::MissingLocalPlayer`] if no local player was given.
    pub fn build<S: RoomService>(self, service: Arc<S>) -> Result<RealtimeClient<S>, PlaymeshError> {
        let config = self.config.validated();
        let local_player = config
            .local_player
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or(PlaymeshError::MissingLocalPlayer)?;

        let queue = Arc::new(GameThreadQueue::new(config.dispatch.clone()));
        let initial = RoomSession::terminated(
            Arc::clone(&service) as Arc<dyn RoomService>,
            ForwardingListener::new(Arc::new(NoopListener), queue.handle()),
        );
        info!(player = %local_player, "realtime client ready");

        Ok(RealtimeClient {
            service,
            queue,
            local_player,
            config,
            current: Mutex::new(initial),
        })
    }
}

// ---------------------------------------------------------------------------
// RealtimeClient
// ---------------------------------------------------------------------------

/// Real-time multiplayer for one signed-in player.
///
/// Listener callbacks are queued on the client's [`GameThreadQueue`]; the
/// game drains it once per frame with
/// [`run_pending`](GameThreadQueue::run_pending), or hands it to a
/// [`FrameDriver`].
pub struct RealtimeClient<S: RoomService> {
    service: Arc<S>,
    queue: Arc<GameThreadQueue>,
    local_player: PlayerId,
    config: ClientConfig,
    /// Held only long enough to check or swap.
    current: Mutex<Arc<RoomSession>>,
}

impl<S: RoomService> RealtimeClient<S> {
    pub fn local_player(&self) -> &PlayerId {
        &self.local_player
    }

    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    /// The queue listener callbacks are delivered through.
    pub fn queue(&self) -> &Arc<GameThreadQueue> {
        &self.queue
    }

    /// A driver that drains [`queue`](Self::queue) at the configured rate.
    pub fn frame_driver(&self) -> FrameDriver {
        FrameDriver::new(Arc::clone(&self.queue), self.config.frame.clone())
    }

    // -- Starting a room --------------------------------------------------

    /// Automatches into a new room with `min_opponents..=max_opponents`
    /// other players.
    pub fn create_quick_game(
        &self,
        min_opponents: u32,
        max_opponents: u32,
        variant: u32,
        listener: Arc<dyn RealTimeListener>,
    ) {
        let Some(session) = self.install(listener, "create a quick game") else {
            return;
        };
        let config = RoomConfig::new()
            .variant(variant)
            .min_automatch_players(min_opponents)
            .max_automatch_players(max_opponents);
        start_creation(&session, self.local_player.clone(), move |service, events, on_response| {
            service.create_room(config, events, on_response)
        });
    }

    /// Lets the player pick opponents on the platform's selection screen,
    /// then creates the room.
    pub fn create_with_invitation_screen(
        &self,
        min_opponents: u32,
        max_opponents: u32,
        variant: u32,
        listener: Arc<dyn RealTimeListener>,
    ) {
        let Some(session) = self.install(listener, "create a room from the invitation screen")
        else {
            return;
        };
        let player = self.local_player.clone();
        self.service.show_player_select_ui(
            min_opponents,
            max_opponents,
            true,
            Box::new(move |response| {
                if !response.status.is_valid() {
                    debug!(status = ?response.status, "player selection not completed");
                    session.leave_room();
                    return;
                }
                let config = RoomConfig::new()
                    .variant(variant)
                    .populate_from_selection(&response);
                start_creation(&session, player, move |service, events, on_response| {
                    service.create_room(config, events, on_response)
                });
            }),
        );
    }

    /// Lets the player pick an invitation from the platform's inbox, then
    /// joins its room.
    pub fn accept_from_inbox(&self, listener: Arc<dyn RealTimeListener>) {
        let Some(session) = self.install(listener, "accept an invitation from the inbox") else {
            return;
        };
        let player = self.local_player.clone();
        self.service.show_room_inbox_ui(Box::new(move |response| {
            if !response.status.is_valid() {
                debug!(status = ?response.status, "invitation inbox not completed");
                session.leave_room();
                return;
            }
            let Some(invitation) = response.invitation else {
                warn!("inbox reported success without an invitation");
                session.leave_room();
                return;
            };
            debug!(invitation = %invitation.id, "accepting invitation from inbox");
            accept(&session, player, invitation);
        }));
    }

    /// Joins the room behind a known invitation id.
    pub fn accept_invitation(
        &self,
        invitation_id: impl Into<InvitationId>,
        listener: Arc<dyn RealTimeListener>,
    ) {
        let Some(session) = self.install(listener, "accept an invitation") else {
            return;
        };
        let invitation_id = invitation_id.into();
        let player = self.local_player.clone();
        self.service.fetch_invitations(Box::new(move |response| {
            if !response.status.is_success() {
                error!(status = ?response.status, "could not load invitations");
                session.leave_room();
                return;
            }
            match response.find(&invitation_id) {
                Some(invitation) => accept(&session, player, invitation.clone()),
                None => {
                    error!(invitation = %invitation_id, "no invitation with this id");
                    session.leave_room();
                }
            }
        }));
    }

    /// Declines an invitation by id. Does not touch the current session.
    pub fn decline_invitation(&self, invitation_id: impl Into<InvitationId>) {
        let invitation_id = invitation_id.into();
        let service = Arc::clone(&self.service);
        self.service.fetch_invitations(Box::new(move |response| {
            if !response.status.is_success() {
                error!(status = ?response.status, "could not load invitations");
                return;
            }
            match response.find(&invitation_id) {
                Some(invitation) => {
                    debug!(invitation = %invitation_id, "declining invitation");
                    service.decline_invitation(invitation.clone());
                }
                None => warn!(invitation = %invitation_id, "no invitation with this id to decline"),
            }
        }));
    }

    // -- Current session --------------------------------------------------

    pub fn leave_room(&self) {
        self.current().leave_room();
    }

    /// Sends to every other participant. The local seat never receives its
    /// own message, even when `reliable` sends go out one by one. Failures
    /// are logged, not returned.
    pub fn send_message_to_all(&self, reliable: bool, data: &[u8]) {
        let session = self.current();
        if let Err(e) = session.send_to_all(reliable, data) {
            error!(session = session.id(), reliable, error = %e, "send to all failed");
        }
    }

    /// Sends to one participant. Failures, including an unknown
    /// recipient, are logged and the message is dropped.
    pub fn send_message(&self, reliable: bool, participant_id: &ParticipantId, data: &[u8]) {
        let session = self.current();
        if let Err(e) = session.send_to(reliable, participant_id, data) {
            error!(
                session = session.id(),
                reliable,
                participant = %participant_id,
                error = %e,
                "send failed"
            );
        }
    }

    pub fn connected_participants(&self) -> Vec<Participant> {
        self.current().connected_participants()
    }

    pub fn self_participant(&self) -> Option<Participant> {
        self.current().self_participant()
    }

    pub fn participant(&self, participant_id: &ParticipantId) -> Option<Participant> {
        self.current().participant(participant_id)
    }

    pub fn is_room_connected(&self) -> bool {
        self.current().is_room_connected()
    }

    pub fn current_phase(&self) -> Phase {
        self.current().phase()
    }

    // -- Internals --------------------------------------------------------

    fn current(&self) -> Arc<RoomSession> {
        Arc::clone(&*self.current.lock())
    }

    /// Makes a new session current unless the current one is still active.
    /// A rejected session is left before returning.
    fn install(
        &self,
        listener: Arc<dyn RealTimeListener>,
        what: &'static str,
    ) -> Option<Arc<RoomSession>> {
        let session = RoomSession::new(
            Arc::clone(&self.service) as Arc<dyn RoomService>,
            ForwardingListener::new(listener, self.queue.handle()),
            self.config.session.clone(),
        );

        let rejected_by = {
            let mut current = self.current.lock();
            if current.is_active() {
                Some(current.id())
            } else {
                *current = Arc::clone(&session);
                None
            }
        };

        match rejected_by {
            Some(active) => {
                error!(
                    active_session = active,
                    "tried to {what} while another session is still active; leave it first"
                );
                session.leave_room();
                None
            }
            None => {
                debug!(session = session.id(), "new current session");
                Some(session)
            }
        }
    }
}

impl<S: RoomService> std::fmt::Debug for RealtimeClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeClient")
            .field("local_player", &self.local_player)
            .field("current", &*self.current.lock())
            .finish_non_exhaustive()
    }
}

/// Starts room creation. A failure here means the session was left in the
/// meantime; the session has already logged it.
fn start_creation<F>(session: &Arc<RoomSession>, player: PlayerId, create: F)
where
    F: FnOnce(&dyn RoomService, Arc<dyn RoomEvents>, RoomResponseCallback) + Send + 'static,
{
    if session.start_room_creation(player, create).is_err() {
        debug!(session = session.id(), "room creation not started");
    }
}

fn accept(session: &Arc<RoomSession>, player: PlayerId, invitation: Invitation) {
    start_creation(session, player, move |service, events, on_response| {
        service.accept_invitation(invitation, events, on_response)
    });
}
