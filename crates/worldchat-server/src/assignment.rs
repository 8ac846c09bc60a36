//! Room placement policy.
//!
//! Two policies over one [`RoomRegistry`]:
//!
//! - Auto-assignment walks rooms in ascending numeric order and takes the
//!   first free seat; when every room is full it creates the smallest room
//!   number not currently in use (gap-filling, not max+1) so numbers stay
//!   dense as rooms come and go. Clients display the number directly.
//! - Explicit assignment honors a requested room, creating it on demand and
//!   reporting [`RegistryError::RoomFull`] so the caller can fall back to
//!   auto-assignment instead of failing the connection.
//!
//! Every membership mutation funnels through this type, and the runtime
//! serializes calls behind one lock, so a placement's scan-then-insert never
//! interleaves with another placement.

use worldchat_proto::RoomId;

use crate::registry::{ConnectionId, RegistryError, RegistryStats, RoomRegistry};

/// Outcome of a successful placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Room the connection now occupies.
    pub room_id: RoomId,
    /// Member count after placement, including the placed connection.
    pub member_count: u32,
    /// Per-room capacity, for the placement confirmation event.
    pub capacity: u32,
}

/// Placement policy over an owned room registry.
#[derive(Debug)]
pub struct AssignmentService {
    registry: RoomRegistry,
}

impl AssignmentService {
    /// Create a service with an empty registry of the given capacity.
    pub fn new(capacity: u32) -> Self {
        Self { registry: RoomRegistry::new(capacity) }
    }

    /// Read access to the underlying registry.
    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Place a connection in the lowest-numbered room with a free seat,
    /// creating the smallest unused room number when all rooms are full.
    ///
    /// Removes the connection from any room it currently occupies first; a
    /// connection is never a member of two rooms.
    pub fn assign(&mut self, conn: ConnectionId) -> Result<Placement, RegistryError> {
        self.registry.remove_member(conn);

        let room = match self.first_open_room() {
            Some(room) => room,
            None => {
                let room = self.lowest_free_number();
                self.registry.create_room(room)?;
                room
            },
        };

        let member_count = self.registry.add_member(room, conn)?;
        Ok(self.placement(room, member_count))
    }

    /// Place a connection in a specific room, creating the room on demand.
    ///
    /// Rejoining the room the connection already occupies is a no-op that
    /// leaves the member count unchanged. On [`RegistryError::RoomFull`] the
    /// connection keeps its current seat (if any); the caller is expected to
    /// fall back to [`Self::assign`].
    pub fn assign_to_room(
        &mut self,
        conn: ConnectionId,
        room: RoomId,
    ) -> Result<Placement, RegistryError> {
        if self.registry.room_of(conn) == Some(room) {
            return Ok(self.placement(room, self.registry.member_count(room)));
        }

        if self.registry.has_room(room) && self.registry.is_full(room) {
            return Err(RegistryError::RoomFull(room));
        }

        self.registry.remove_member(conn);

        if !self.registry.has_room(room) {
            self.registry.create_room(room)?;
        }

        let member_count = self.registry.add_member(room, conn)?;
        Ok(self.placement(room, member_count))
    }

    /// Remove a connection from its room, returning the vacated room and the
    /// member count left behind (zero means the room was deleted).
    pub fn release(&mut self, conn: ConnectionId) -> Option<(RoomId, u32)> {
        let room = self.registry.remove_member(conn)?;
        Some((room, self.registry.member_count(room)))
    }

    /// Aggregate occupancy counters.
    pub fn stats(&self) -> RegistryStats {
        self.registry.stats()
    }

    fn first_open_room(&self) -> Option<RoomId> {
        let capacity = self.registry.capacity();
        self.registry.all_rooms().find(|&(_, count)| count < capacity).map(|(room, _)| room)
    }

    /// Smallest positive room number not currently in use.
    ///
    /// Relies on `all_rooms()` being ascending: the first gap in the
    /// sequence is the answer, and a gapless sequence yields max+1.
    fn lowest_free_number(&self) -> RoomId {
        let mut candidate = RoomId::first();
        for (room, _) in self.registry.all_rooms() {
            if room == candidate {
                candidate = candidate.next();
            } else {
                break;
            }
        }
        candidate
    }

    fn placement(&self, room: RoomId, member_count: u32) -> Placement {
        Placement { room_id: room, member_count, capacity: self.registry.capacity() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(n: u32) -> RoomId {
        RoomId::from_number(n).unwrap()
    }

    #[test]
    fn first_assignment_creates_room_one() {
        let mut service = AssignmentService::new(2);

        let placement = service.assign(1).unwrap();
        assert_eq!(placement.room_id, room(1));
        assert_eq!(placement.member_count, 1);
        assert_eq!(placement.capacity, 2);
    }

    #[test]
    fn rooms_fill_left_to_right() {
        let mut service = AssignmentService::new(2);

        assert_eq!(service.assign(1).unwrap().room_id, room(1));
        assert_eq!(service.assign(2).unwrap().room_id, room(1));
        assert_eq!(service.assign(3).unwrap().room_id, room(2));
    }

    #[test]
    fn freed_numbers_are_reused_before_new_ones() {
        let mut service = AssignmentService::new(1);

        service.assign(1).unwrap(); // room_1
        service.assign(2).unwrap(); // room_2
        service.assign(3).unwrap(); // room_3

        // Emptying room_2 deletes it; the next assignment must recreate it
        // rather than opening room_4.
        service.release(2).unwrap();
        assert_eq!(service.assign(4).unwrap().room_id, room(2));
    }

    #[test]
    fn explicit_join_creates_absent_rooms() {
        let mut service = AssignmentService::new(2);

        let placement = service.assign_to_room(1, room(5)).unwrap();
        assert_eq!(placement.room_id, room(5));
        assert_eq!(placement.member_count, 1);
    }

    #[test]
    fn explicit_join_to_full_room_reports_room_full() {
        let mut service = AssignmentService::new(1);
        service.assign_to_room(1, room(1)).unwrap();

        assert_eq!(
            service.assign_to_room(2, room(1)),
            Err(RegistryError::RoomFull(room(1)))
        );
        // The rejected connection was never seated anywhere.
        assert_eq!(service.registry().room_of(2), None);
    }

    #[test]
    fn rejoining_the_occupied_room_is_idempotent() {
        let mut service = AssignmentService::new(2);
        service.assign_to_room(1, room(3)).unwrap();
        service.assign_to_room(2, room(3)).unwrap();

        let placement = service.assign_to_room(1, room(3)).unwrap();
        assert_eq!(placement.member_count, 2);
        assert_eq!(service.registry().member_count(room(3)), 2);
    }

    #[test]
    fn idempotent_rejoin_holds_even_when_the_room_is_full() {
        let mut service = AssignmentService::new(1);
        service.assign_to_room(1, room(1)).unwrap();

        let placement = service.assign_to_room(1, room(1)).unwrap();
        assert_eq!(placement.room_id, room(1));
        assert_eq!(placement.member_count, 1);
    }

    #[test]
    fn switching_rooms_never_leaves_a_double_membership() {
        let mut service = AssignmentService::new(2);
        service.assign_to_room(1, room(1)).unwrap();
        service.assign_to_room(1, room(2)).unwrap();

        assert_eq!(service.registry().room_of(1), Some(room(2)));
        assert!(!service.registry().has_room(room(1)), "vacated room is deleted");
    }

    #[test]
    fn sole_member_switching_away_frees_the_number() {
        let mut service = AssignmentService::new(5);
        service.assign_to_room(1, room(2)).unwrap();
        service.assign_to_room(1, room(7)).unwrap();

        // room_2 emptied and vanished; auto-assignment starts over at 1.
        assert_eq!(service.assign(2).unwrap().room_id, room(1));
    }

    #[test]
    fn release_reports_remaining_members() {
        let mut service = AssignmentService::new(5);
        service.assign(1).unwrap();
        service.assign(2).unwrap();

        assert_eq!(service.release(1), Some((room(1), 1)));
        assert_eq!(service.release(2), Some((room(1), 0)));
        assert_eq!(service.release(2), None);
    }
}
