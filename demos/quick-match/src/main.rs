//! A four-player quick match against the simulated room service.
//!
//! The "platform" is scripted: the room is created, peers connect one by
//! one, a peer sends a message, one drops out, and the local player
//! leaves. Listener callbacks are delivered by a frame driver at 30 Hz.
//!
//! Run with `RUST_LOG=debug` to see every state transition.

use std::sync::Arc;
use std::time::Duration;

use playmesh::prelude::*;
use playmesh::sim::SimulatedRoomService;
use tokio::sync::watch;
use tracing::info;

// ---------------------------------------------------------------------------
// Game side
// ---------------------------------------------------------------------------

struct Lobby;

impl RealTimeListener for Lobby {
    fn on_room_setup_progress(&self, percent: f32) {
        info!("setting up room: {percent:.0}%");
    }

    fn on_room_connected(&self, success: bool) {
        if success {
            info!("everyone is here, starting the match");
        } else {
            info!("could not set up the room");
        }
    }

    fn on_left_room(&self) {
        info!("left the room");
    }

    fn on_peers_connected(&self, participant_ids: &[ParticipantId]) {
        info!(?participant_ids, "peers back");
    }

    fn on_peers_disconnected(&self, participant_ids: &[ParticipantId]) {
        info!(?participant_ids, "peers dropped");
    }

    fn on_real_time_message_received(&self, reliable: bool, sender: &ParticipantId, data: &[u8]) {
        info!(%sender, reliable, "message: {}", String::from_utf8_lossy(data));
    }
}

// ---------------------------------------------------------------------------
// Platform script
// ---------------------------------------------------------------------------

async fn frame() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    playmesh::logging::init();

    let service = Arc::new(SimulatedRoomService::new());
    let config = ClientConfig::from_json(r#"{ "frame": { "frame_rate_hz": 30 } }"#)?;
    let client = RealtimeClientBuilder::new()
        .config(config)
        .local_player("g_local")
        .build(Arc::clone(&service))?;

    let (stop_tx, stop_rx) = watch::channel(false);
    let driver = tokio::spawn(client.frame_driver().run(stop_rx));

    client.create_quick_game(3, 3, 0, Arc::new(Lobby));

    let me = Player::new("g_local", "Local");
    let Some(room) = service.complete_pending_creation(SimulatedRoomService::seats(&me, 3))?
    else {
        return Err("room creation was never requested".into());
    };
    info!(room_id = %room.id(), "room created");
    frame().await;

    let ids: Vec<ParticipantId> = room.participants().iter().map(|p| p.id.clone()).collect();
    for n in 1..=ids.len() {
        service.push_connected_set(&ids[..n]);
        frame().await;
    }

    client.send_message_to_all(true, b"ready");
    service.deliver_data(&ids[1], b"gl hf", true);
    frame().await;

    service.push_connected_set(&[ids[0].clone(), ids[1].clone(), ids[3].clone()]);
    frame().await;
    info!(
        connected = client.connected_participants().len(),
        sent = service.sent().len(),
        "match in progress"
    );

    client.leave_room();
    service.complete_leaves();
    frame().await;

    stop_tx.send(true)?;
    let frames = driver.await?;
    info!(frames, phase = %client.current_phase(), "done");
    Ok(())
}
