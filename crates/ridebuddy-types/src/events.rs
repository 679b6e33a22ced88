use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::MessageResponse;

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum GatewayEvent {
    /// Server confirms the handshake
    Ready { user_id: Uuid, name: String },

    /// A message was posted in a match room
    NewMessage(MessageResponse),

    /// The reader opened the chat and their unread messages were marked read
    MessagesRead {
        match_id: Uuid,
        reader_id: Uuid,
        count: usize,
    },

    /// Ephemeral typing state of the other participant
    TypingIndicator {
        match_id: Uuid,
        user_id: Uuid,
        is_typing: bool,
    },

    /// Lightweight notice delivered to the receiver's personal room
    /// while they are not in the chat
    MessageNotification {
        match_id: Uuid,
        sender_id: Uuid,
        content: String,
    },

    /// A match partner came online or went offline
    PresenceUpdate {
        user_id: Uuid,
        online: bool,
        last_active: chrono::DateTime<chrono::Utc>,
    },

    /// A command from this connection was rejected
    Error { message: String },
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum GatewayCommand {
    /// Enter a match room and mark its unread messages as read
    JoinChat { match_id: Uuid },

    SendMessage {
        match_id: Uuid,
        receiver_id: Uuid,
        content: String,
    },

    TypingStart { match_id: Uuid },

    TypingStop { match_id: Uuid },
}
