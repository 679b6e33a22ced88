use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use ridebuddy_types::events::GatewayEvent;

/// Identifies one WebSocket connection. A user may hold several.
pub type ConnId = Uuid;

/// Broadcast scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Room {
    /// Personal room every session of a user joins on connect
    User(Uuid),
    /// Chat room of one match
    Match(Uuid),
}

struct Session {
    user_id: Uuid,
    tx: mpsc::UnboundedSender<GatewayEvent>,
    rooms: HashSet<Room>,
}

#[derive(Default)]
struct RegistryState {
    sessions: HashMap<ConnId, Session>,
    rooms: HashMap<Room, HashSet<ConnId>>,
}

impl RegistryState {
    fn join(&mut self, conn_id: ConnId, room: Room) -> bool {
        let Some(session) = self.sessions.get_mut(&conn_id) else {
            return false;
        };
        session.rooms.insert(room);
        self.rooms.entry(room).or_default().insert(conn_id);
        true
    }

    fn user_session_count(&self, user_id: Uuid) -> usize {
        self.rooms.get(&Room::User(user_id)).map_or(0, |c| c.len())
    }
}

/// Tracks live sessions and their room memberships, and fans events out to
/// rooms. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RwLock<RegistryState>>,
}

/// Returned by [`SessionRegistry::register`].
pub struct Registration {
    pub conn_id: ConnId,
    pub events: mpsc::UnboundedReceiver<GatewayEvent>,
    /// True when this is the user's only live session.
    pub first_session: bool,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session for `user_id`; it joins the user's personal room.
    pub async fn register(&self, user_id: Uuid) -> Registration {
        let conn_id = Uuid::new_v4();
        let (tx, events) = mpsc::unbounded_channel();

        let mut state = self.inner.write().await;
        state.sessions.insert(
            conn_id,
            Session {
                user_id,
                tx,
                rooms: HashSet::new(),
            },
        );
        state.join(conn_id, Room::User(user_id));
        let first_session = state.user_session_count(user_id) == 1;

        Registration {
            conn_id,
            events,
            first_session,
        }
    }

    /// Drop a session from every room. Returns its user and whether that was
    /// the user's last session, or `None` if the id was unknown.
    pub async fn unregister(&self, conn_id: ConnId) -> Option<(Uuid, bool)> {
        let mut state = self.inner.write().await;
        let session = state.sessions.remove(&conn_id)?;

        for room in &session.rooms {
            if let Some(members) = state.rooms.get_mut(room) {
                members.remove(&conn_id);
                if members.is_empty() {
                    state.rooms.remove(room);
                }
            }
        }

        let last = state.user_session_count(session.user_id) == 0;
        Some((session.user_id, last))
    }

    /// Add a session to a room. Returns false for an unknown session.
    pub async fn join(&self, conn_id: ConnId, room: Room) -> bool {
        self.inner.write().await.join(conn_id, room)
    }

    pub async fn is_in_room(&self, conn_id: ConnId, room: Room) -> bool {
        self.inner
            .read()
            .await
            .rooms
            .get(&room)
            .is_some_and(|members| members.contains(&conn_id))
    }

    /// Whether `user_id` holds at least one live session right now.
    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.inner.read().await.user_session_count(user_id) > 0
    }

    /// Whether any session of `user_id` is in `room`.
    pub async fn user_in_room(&self, user_id: Uuid, room: Room) -> bool {
        let state = self.inner.read().await;
        let Some(members) = state.rooms.get(&room) else {
            return false;
        };
        members
            .iter()
            .filter_map(|c| state.sessions.get(c))
            .any(|s| s.user_id == user_id)
    }

    /// Deliver to every session in `room`. Returns how many sessions got it.
    pub async fn emit(&self, room: Room, event: GatewayEvent) -> usize {
        self.emit_filtered(room, None, event).await
    }

    /// Deliver to every session in `room` except `origin`.
    pub async fn emit_except(&self, room: Room, origin: ConnId, event: GatewayEvent) -> usize {
        self.emit_filtered(room, Some(origin), event).await
    }

    /// Deliver to one session regardless of its rooms.
    pub async fn emit_to_session(&self, conn_id: ConnId, event: GatewayEvent) -> bool {
        self.inner
            .read()
            .await
            .sessions
            .get(&conn_id)
            .is_some_and(|s| s.tx.send(event).is_ok())
    }

    async fn emit_filtered(&self, room: Room, skip: Option<ConnId>, event: GatewayEvent) -> usize {
        let state = self.inner.read().await;
        let Some(members) = state.rooms.get(&room) else {
            return 0;
        };

        let mut delivered = 0;
        for conn_id in members {
            if Some(*conn_id) == skip {
                continue;
            }
            if let Some(session) = state.sessions.get(conn_id) {
                // A closed receiver means the connection is tearing down
                if session.tx.send(event.clone()).is_ok() {
                    delivered += 1;
                }
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typing(match_id: Uuid) -> GatewayEvent {
        GatewayEvent::TypingIndicator {
            match_id,
            user_id: Uuid::nil(),
            is_typing: true,
        }
    }

    #[tokio::test]
    async fn register_joins_personal_room() {
        let registry = SessionRegistry::new();
        let user = Uuid::new_v4();
        let mut reg = registry.register(user).await;

        assert!(reg.first_session);
        assert!(registry.is_in_room(reg.conn_id, Room::User(user)).await);

        let match_id = Uuid::new_v4();
        assert_eq!(registry.emit(Room::User(user), typing(match_id)).await, 1);
        assert_eq!(reg.events.recv().await, Some(typing(match_id)));
    }

    #[tokio::test]
    async fn emit_except_skips_origin() {
        let registry = SessionRegistry::new();
        let room = Room::Match(Uuid::new_v4());
        let mut a = registry.register(Uuid::new_v4()).await;
        let mut b = registry.register(Uuid::new_v4()).await;
        registry.join(a.conn_id, room).await;
        registry.join(b.conn_id, room).await;

        assert_eq!(registry.emit_except(room, a.conn_id, typing(Uuid::nil())).await, 1);
        assert!(b.events.try_recv().is_ok());
        assert!(a.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn last_session_is_reported_on_unregister() {
        let registry = SessionRegistry::new();
        let user = Uuid::new_v4();
        let first = registry.register(user).await;
        let second = registry.register(user).await;
        assert!(!second.first_session);

        assert_eq!(registry.unregister(first.conn_id).await, Some((user, false)));
        assert_eq!(registry.unregister(second.conn_id).await, Some((user, true)));
        assert_eq!(registry.unregister(second.conn_id).await, None);
    }

    #[tokio::test]
    async fn unregister_leaves_all_rooms() {
        let registry = SessionRegistry::new();
        let user = Uuid::new_v4();
        let room = Room::Match(Uuid::new_v4());
        let reg = registry.register(user).await;
        registry.join(reg.conn_id, room).await;
        assert!(registry.user_in_room(user, room).await);

        registry.unregister(reg.conn_id).await;
        assert!(!registry.user_in_room(user, room).await);
        assert_eq!(registry.emit(room, typing(Uuid::nil())).await, 0);
    }

    #[tokio::test]
    async fn join_requires_live_session() {
        let registry = SessionRegistry::new();
        assert!(!registry.join(Uuid::new_v4(), Room::Match(Uuid::new_v4())).await);
    }
}
