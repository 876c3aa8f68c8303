//! Room membership registry for the broadcast relay.
//!
//! Maps each room name (a project id) to the set of connections currently
//! joined to it. Membership is ephemeral and lost on restart, like the
//! connection table itself. Rooms with no members are dropped.

use std::collections::{BTreeSet, HashMap};

use tokio::sync::RwLock;

/// Server-assigned identifier of one WebSocket connection.
pub type ConnectionId = u64;

/// In-memory directory of room memberships.
///
/// Thread-safe via [`RwLock`].
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, BTreeSet<ConnectionId>>>,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomRegistry {
    /// Creates a new, empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Adds a connection to a room. Returns `false` if it was already a member.
    pub async fn join(&self, room: &str, conn: ConnectionId) -> bool {
        let mut rooms = self.rooms.write().await;
        rooms.entry(room.to_string()).or_default().insert(conn)
    }

    /// Removes a connection from a room. Returns `false` if it was not a member.
    pub async fn leave(&self, room: &str, conn: ConnectionId) -> bool {
        let mut rooms = self.rooms.write().await;
        let Some(members) = rooms.get_mut(room) else {
            return false;
        };
        let removed = members.remove(&conn);
        if members.is_empty() {
            rooms.remove(room);
        }
        drop(rooms);
        removed
    }

    /// Removes a connection from every room it joined, returning those rooms.
    pub async fn leave_all(&self, conn: ConnectionId) -> Vec<String> {
        let mut rooms = self.rooms.write().await;
        let mut left = Vec::new();
        rooms.retain(|room, members| {
            if members.remove(&conn) {
                left.push(room.clone());
            }
            !members.is_empty()
        });
        drop(rooms);
        left.sort();
        left
    }

    /// Returns the connections currently joined to a room.
    pub async fn members(&self, room: &str) -> Vec<ConnectionId> {
        let rooms = self.rooms.read().await;
        rooms
            .get(room)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Returns whether a connection is a member of a room.
    pub async fn is_member(&self, room: &str, conn: ConnectionId) -> bool {
        let rooms = self.rooms.read().await;
        rooms.get(room).is_some_and(|m| m.contains(&conn))
    }

    /// Number of rooms with at least one member.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn join_and_list_members() {
        let registry = RoomRegistry::new();
        assert!(registry.join("p1", 1).await);
        assert!(registry.join("p1", 2).await);

        assert_eq!(registry.members("p1").await, vec![1, 2]);
        assert!(registry.is_member("p1", 1).await);
        assert!(!registry.is_member("p2", 1).await);
    }

    #[tokio::test]
    async fn double_join_is_idempotent() {
        let registry = RoomRegistry::new();
        assert!(registry.join("p1", 1).await);
        assert!(!registry.join("p1", 1).await);
        assert_eq!(registry.members("p1").await, vec![1]);
    }

    #[tokio::test]
    async fn leave_removes_member_and_empty_room() {
        let registry = RoomRegistry::new();
        registry.join("p1", 1).await;

        assert!(registry.leave("p1", 1).await);
        assert!(registry.members("p1").await.is_empty());
        assert_eq!(registry.room_count().await, 0);
    }

    #[tokio::test]
    async fn leave_unjoined_room_is_noop() {
        let registry = RoomRegistry::new();
        registry.join("p1", 1).await;

        assert!(!registry.leave("p2", 1).await);
        assert!(!registry.leave("p1", 9).await);
        assert_eq!(registry.members("p1").await, vec![1]);
    }

    #[tokio::test]
    async fn leave_all_drops_every_membership() {
        let registry = RoomRegistry::new();
        registry.join("p1", 1).await;
        registry.join("p2", 1).await;
        registry.join("p2", 2).await;

        let left = registry.leave_all(1).await;
        assert_eq!(left, vec!["p1".to_string(), "p2".to_string()]);
        assert_eq!(registry.members("p2").await, vec![2]);
        assert_eq!(registry.room_count().await, 1);
    }

    #[tokio::test]
    async fn unknown_room_has_no_members() {
        let registry = RoomRegistry::new();
        assert!(registry.members("nowhere").await.is_empty());
    }
}
