//! Chat operations shared by the WebSocket gateway and the REST API.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use uuid::Uuid;

use ridebuddy_db::Database;
use ridebuddy_db::models::{MatchRow, MessageRow};
use ridebuddy_types::api::MessageResponse;
use ridebuddy_types::events::GatewayEvent;

use crate::registry::{ConnId, Registration, Room, SessionRegistry};

pub const MAX_MESSAGE_LEN: usize = 2000;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("match not found")]
    MatchNotFound,
    #[error("not a participant of this match")]
    NotParticipant,
    #[error("receiver is not the other participant of this match")]
    InvalidReceiver,
    #[error("{0}")]
    InvalidContent(&'static str),
    #[error("join the chat first")]
    NotInRoom,
    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl ChatError {
    /// Text safe to show the client. Store details stay in the logs.
    pub fn client_message(&self) -> String {
        match self {
            Self::Store(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

pub fn message_response(row: MessageRow) -> MessageResponse {
    MessageResponse {
        id: row.id,
        match_id: row.match_id,
        sender_id: row.sender_id,
        receiver_id: row.receiver_id,
        content: row.content,
        timestamp: row.created_at,
        read: row.read,
    }
}

/// Owns the store handle and the session registry. Cheap to clone.
#[derive(Clone)]
pub struct ChatService {
    db: Arc<Database>,
    registry: SessionRegistry,
    /// Serializes presence writes so the stored flag follows the registry.
    presence: Arc<Mutex<()>>,
}

impl ChatService {
    pub fn new(db: Arc<Database>, registry: SessionRegistry) -> Self {
        Self {
            db,
            registry,
            presence: Arc::new(Mutex::new(())),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Run a blocking store call off the async runtime.
    async fn store<F, T>(&self, f: F) -> Result<T, ChatError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| ChatError::Store(anyhow::anyhow!("spawn_blocking join error: {}", e)))?
            .map_err(ChatError::Store)
    }

    /// Load a match and check that `user_id` takes part in it.
    pub async fn participant_match(&self, match_id: Uuid, user_id: Uuid) -> Result<MatchRow, ChatError> {
        let row = self
            .store(move |db| db.get_match(match_id))
            .await?
            .ok_or(ChatError::MatchNotFound)?;

        if !row.has_participant(user_id) {
            return Err(ChatError::NotParticipant);
        }
        Ok(row)
    }

    /// Open a session for an authenticated user. The first session of a user
    /// flips their presence online.
    pub async fn connect(&self, user_id: Uuid) -> Registration {
        let registration = self.registry.register(user_id).await;
        if registration.first_session {
            self.presence_changed(user_id).await;
        }
        registration
    }

    /// Tear a session down. When it was the user's last one, presence goes
    /// offline with the disconnect time.
    pub async fn disconnect(&self, conn_id: ConnId) {
        if let Some((user_id, true)) = self.registry.unregister(conn_id).await {
            self.presence_changed(user_id).await;
        }
    }

    /// Persist and announce the user's presence as the registry sees it at
    /// write time, not as it was when the session opened or closed. A late
    /// offline write racing a fresh connect then still stores online.
    async fn presence_changed(&self, user_id: Uuid) {
        let _guard = self.presence.lock().await;
        let online = self.registry.is_online(user_id).await;
        let at = Utc::now();
        let result = self
            .store(move |db| {
                db.set_presence(user_id, online, at)?;
                db.match_partners(user_id)
            })
            .await;

        let partners = match result {
            Ok(partners) => partners,
            Err(e) => {
                error!("Failed to persist presence for {}: {}", user_id, e);
                return;
            }
        };

        let event = GatewayEvent::PresenceUpdate {
            user_id,
            online,
            last_active: at,
        };
        for partner in partners {
            self.registry.emit(Room::User(partner), event.clone()).await;
        }
    }

    /// Enter a match room: unread messages addressed to the caller are
    /// marked read and the other members get a read receipt.
    pub async fn join_chat(&self, conn_id: ConnId, user_id: Uuid, match_id: Uuid) -> Result<usize, ChatError> {
        self.participant_match(match_id, user_id).await?;

        let count = self.store(move |db| db.mark_read(match_id, user_id)).await?;

        let room = Room::Match(match_id);
        self.registry.join(conn_id, room).await;
        debug!("{} joined chat {} ({} marked read)", user_id, match_id, count);

        self.registry
            .emit_except(
                room,
                conn_id,
                GatewayEvent::MessagesRead {
                    match_id,
                    reader_id: user_id,
                    count,
                },
            )
            .await;

        Ok(count)
    }

    /// Persist one message and fan it out. The receiver also gets a
    /// notification in their personal room when none of their sessions is
    /// in the chat.
    pub async fn send_message(
        &self,
        sender_id: Uuid,
        match_id: Uuid,
        receiver_id: Uuid,
        content: &str,
    ) -> Result<MessageResponse, ChatError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ChatError::InvalidContent("message content is empty"));
        }
        if content.chars().count() > MAX_MESSAGE_LEN {
            return Err(ChatError::InvalidContent("message content is too long"));
        }

        let row = self.participant_match(match_id, sender_id).await?;
        if row.other(sender_id) != Some(receiver_id) {
            return Err(ChatError::InvalidReceiver);
        }

        let content = content.to_string();
        let stored = self
            .store(move |db| db.insert_message(match_id, sender_id, receiver_id, &content))
            .await?;
        let message = message_response(stored);

        let room = Room::Match(match_id);
        let delivered = self
            .registry
            .emit(room, GatewayEvent::NewMessage(message.clone()))
            .await;
        debug!("Message {} in {} delivered to {} sessions", message.id, match_id, delivered);

        if !self.registry.user_in_room(receiver_id, room).await {
            self.registry
                .emit(
                    Room::User(receiver_id),
                    GatewayEvent::MessageNotification {
                        match_id,
                        sender_id,
                        content: message.content.clone(),
                    },
                )
                .await;
        }

        Ok(message)
    }

    /// Relay a typing state to the other members of a room the session is in.
    pub async fn typing(
        &self,
        conn_id: ConnId,
        user_id: Uuid,
        match_id: Uuid,
        is_typing: bool,
    ) -> Result<(), ChatError> {
        let room = Room::Match(match_id);
        if !self.registry.is_in_room(conn_id, room).await {
            return Err(ChatError::NotInRoom);
        }

        self.registry
            .emit_except(
                room,
                conn_id,
                GatewayEvent::TypingIndicator {
                    match_id,
                    user_id,
                    is_typing,
                },
            )
            .await;
        Ok(())
    }
}

pub(crate) fn log_rejected(user_id: Uuid, what: &str, err: &ChatError) {
    match err {
        ChatError::Store(e) => error!("{} {} failed: {}", user_id, what, e),
        other => info!("{} {} rejected: {}", user_id, what, other),
    }
}
