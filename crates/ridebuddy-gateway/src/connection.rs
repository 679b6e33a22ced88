use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tracing::{info, warn};
use uuid::Uuid;

use ridebuddy_types::events::{GatewayCommand, GatewayEvent};

use crate::chat::{ChatService, log_rejected};
use crate::registry::ConnId;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Handle a WebSocket whose token was already validated at the HTTP upgrade.
///
/// Lifecycle: the session is registered (joining the user's personal room),
/// `ready` is sent, then commands are processed one at a time until the
/// socket closes or the heartbeat times out. Events still queued at that
/// point are dropped.
pub async fn handle_connection(socket: WebSocket, chat: ChatService, user_id: Uuid, name: String) {
    let (mut sender, receiver) = socket.split();

    let registration = chat.connect(user_id).await;
    let conn_id = registration.conn_id;
    info!("{} ({}) connected to gateway [conn={}]", name, user_id, conn_id);

    let ready = GatewayEvent::Ready {
        user_id,
        name: name.clone(),
    };
    if send_event(&mut sender, &ready).await {
        run_connection_loop(sender, receiver, registration.events, &chat, conn_id, user_id).await;
    }

    chat.disconnect(conn_id).await;
    info!("{} ({}) disconnected from gateway [conn={}]", name, user_id, conn_id);
}

async fn run_connection_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    mut events: tokio::sync::mpsc::UnboundedReceiver<GatewayEvent>,
    chat: &ChatService,
    conn_id: ConnId,
    user_id: Uuid,
) {
    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received;

    // Forward room events -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else { break };
                    if !send_event(&mut sender, &event).await {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(Default::default())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read commands from client; each runs to completion before the next
    let chat = chat.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => handle_text_frame(&chat, conn_id, user_id, &text).await,
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
}

/// Decode and run one client frame. Anything that fails, from a malformed
/// frame to a store error, is answered with an `error` event on this
/// connection only.
pub async fn handle_text_frame(chat: &ChatService, conn_id: ConnId, user_id: Uuid, text: &str) {
    match serde_json::from_str::<GatewayCommand>(text) {
        Ok(cmd) => handle_command(chat, conn_id, user_id, cmd).await,
        Err(e) => {
            warn!("{} bad command: {} -- raw: {}", user_id, e, truncate(text, 200));
            reply_error(chat, conn_id, format!("malformed command: {}", e)).await;
        }
    }
}

async fn handle_command(chat: &ChatService, conn_id: ConnId, user_id: Uuid, cmd: GatewayCommand) {
    let result = match cmd {
        GatewayCommand::JoinChat { match_id } => chat
            .join_chat(conn_id, user_id, match_id)
            .await
            .map(|_| ())
            .map_err(|e| ("join_chat", e)),

        GatewayCommand::SendMessage {
            match_id,
            receiver_id,
            content,
        } => chat
            .send_message(user_id, match_id, receiver_id, &content)
            .await
            .map(|_| ())
            .map_err(|e| ("send_message", e)),

        GatewayCommand::TypingStart { match_id } => chat
            .typing(conn_id, user_id, match_id, true)
            .await
            .map_err(|e| ("typing_start", e)),

        GatewayCommand::TypingStop { match_id } => chat
            .typing(conn_id, user_id, match_id, false)
            .await
            .map_err(|e| ("typing_stop", e)),
    };

    if let Err((what, err)) = result {
        log_rejected(user_id, what, &err);
        reply_error(chat, conn_id, err.client_message()).await;
    }
}

/// Errors go to the offending connection only.
async fn reply_error(chat: &ChatService, conn_id: ConnId, message: String) {
    chat.registry()
        .emit_to_session(conn_id, GatewayEvent::Error { message })
        .await;
}

/// Serialize and send one event. Returns false once the socket is gone.
async fn send_event(sender: &mut SplitSink<WebSocket, Message>, event: &GatewayEvent) -> bool {
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to encode gateway event: {}", e);
            return true;
        }
    };
    sender.send(Message::Text(text.into())).await.is_ok()
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
