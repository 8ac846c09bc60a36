//! Room membership registry.
//!
//! Maintains bidirectional mappings: room → member connections (for
//! broadcast) and connection → room (for cleanup on disconnect). Rooms are
//! keyed by [`RoomId`] in an ordered map, so every scan runs in ascending
//! numeric order without re-sorting.
//!
//! Rooms live exactly as long as they have members: `remove_member` deletes
//! a room the instant it empties, which frees its number for reassignment.
//! The registry enforces capacity and the membership indices; placement
//! *policy* lives in [`crate::assignment`].

use std::collections::{BTreeMap, HashMap, HashSet};

use worldchat_proto::RoomId;

/// Connection identifier assigned by the server runtime.
pub type ConnectionId = u64;

/// Errors from registry mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Room already exists.
    #[error("room already exists: {0}")]
    AlreadyExists(RoomId),

    /// Room does not exist; callers create rooms explicitly.
    #[error("room not found: {0}")]
    NotFound(RoomId),

    /// Room is at capacity.
    #[error("room is full: {0}")]
    RoomFull(RoomId),
}

/// Aggregate occupancy counters, served over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    /// Number of live (non-empty) rooms.
    pub total_rooms: usize,
    /// Number of placed connections across all rooms.
    pub total_users: usize,
    /// Configured per-room capacity.
    pub capacity: u32,
}

/// Registry of rooms and their member connections.
#[derive(Debug)]
pub struct RoomRegistry {
    /// Per-room member cap.
    capacity: u32,
    /// Room → member set, ordered by numeric room id.
    rooms: BTreeMap<RoomId, HashSet<ConnectionId>>,
    /// Connection → room reverse index.
    placements: HashMap<ConnectionId, RoomId>,
}

impl RoomRegistry {
    /// Create an empty registry with the given per-room capacity.
    pub fn new(capacity: u32) -> Self {
        Self { capacity, rooms: BTreeMap::new(), placements: HashMap::new() }
    }

    /// Configured per-room capacity.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Check if a room exists.
    pub fn has_room(&self, room: RoomId) -> bool {
        self.rooms.contains_key(&room)
    }

    /// Create an empty room.
    ///
    /// # Errors
    ///
    /// [`RegistryError::AlreadyExists`] if the room is present.
    pub fn create_room(&mut self, room: RoomId) -> Result<(), RegistryError> {
        if self.has_room(room) {
            return Err(RegistryError::AlreadyExists(room));
        }
        self.rooms.insert(room, HashSet::new());
        Ok(())
    }

    /// Add a connection to a room, returning the new member count.
    ///
    /// The caller must have removed the connection from any previous room;
    /// a connection is never a member of two rooms.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] if the room is absent,
    /// [`RegistryError::RoomFull`] at capacity.
    pub fn add_member(
        &mut self,
        room: RoomId,
        conn: ConnectionId,
    ) -> Result<u32, RegistryError> {
        debug_assert!(
            !self.placements.contains_key(&conn),
            "connection {conn} is already placed"
        );

        let members = self.rooms.get_mut(&room).ok_or(RegistryError::NotFound(room))?;
        if members.len() as u32 >= self.capacity {
            return Err(RegistryError::RoomFull(room));
        }

        members.insert(conn);
        let count = members.len() as u32;
        self.placements.insert(conn, room);
        Ok(count)
    }

    /// Remove a connection from whatever room it occupies.
    ///
    /// Deletes the room if it is now empty. Returns the vacated room id, or
    /// `None` if the connection was unplaced.
    pub fn remove_member(&mut self, conn: ConnectionId) -> Option<RoomId> {
        let room = self.placements.remove(&conn)?;

        if let Some(members) = self.rooms.get_mut(&room) {
            members.remove(&conn);
            if members.is_empty() {
                self.rooms.remove(&room);
            }
        }

        Some(room)
    }

    /// Room the connection currently occupies, if any.
    pub fn room_of(&self, conn: ConnectionId) -> Option<RoomId> {
        self.placements.get(&conn).copied()
    }

    /// Member count of a room; zero for an absent room.
    pub fn member_count(&self, room: RoomId) -> u32 {
        self.rooms.get(&room).map_or(0, |m| m.len() as u32)
    }

    /// Whether a room is at capacity.
    pub fn is_full(&self, room: RoomId) -> bool {
        self.member_count(room) >= self.capacity
    }

    /// Member connections of a room.
    pub fn members_of(&self, room: RoomId) -> impl Iterator<Item = ConnectionId> + '_ {
        self.rooms.get(&room).into_iter().flat_map(|m| m.iter().copied())
    }

    /// All rooms with their member counts, ascending by numeric room id.
    pub fn all_rooms(&self) -> impl Iterator<Item = (RoomId, u32)> + '_ {
        self.rooms.iter().map(|(room, members)| (*room, members.len() as u32))
    }

    /// Aggregate occupancy counters.
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            total_rooms: self.rooms.len(),
            total_users: self.placements.len(),
            capacity: self.capacity,
        }
    }
}
