//! Fuzz target for the placement policy
//!
//! Ensure registry invariants survive arbitrary operation sequences
//!
//! # Strategy
//!
//! - Small pools: connection and room ids drawn from narrow ranges so
//!   sequences actually collide
//! - Boundary numbers: room number 0 (invalid), small values, u32::MAX
//! - Mixed policies: auto-assignment, explicit joins, releases interleaved
//!
//! # Invariants
//!
//! - No room ever exceeds capacity
//! - A connection occupies at most one room
//! - Empty rooms never appear in the listing
//! - Both membership indices agree after every operation

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use worldchat_proto::RoomId;
use worldchat_server::{AssignmentService, RegistryError};

#[derive(Debug, Clone, Arbitrary)]
enum PlacementOp {
    Auto { conn: u8 },
    Join { conn: u8, number: RoomNumberChoice },
    Release { conn: u8 },
}

#[derive(Debug, Clone, Arbitrary)]
enum RoomNumberChoice {
    Small(u8),
    MaxU32,
}

fn room_number(choice: &RoomNumberChoice) -> u32 {
    match choice {
        RoomNumberChoice::Small(n) => u32::from(*n),
        RoomNumberChoice::MaxU32 => u32::MAX,
    }
}

fuzz_target!(|input: (u8, Vec<PlacementOp>)| {
    let (capacity_raw, ops) = input;
    let capacity = u32::from(capacity_raw % 4) + 1;
    let mut service = AssignmentService::new(capacity);

    for op in &ops {
        match op {
            PlacementOp::Auto { conn } => {
                let placement = service
                    .assign(u64::from(*conn))
                    .expect("auto-assignment must always find or create a room");
                assert!(placement.member_count <= capacity);
            }
            PlacementOp::Join { conn, number } => {
                match RoomId::from_number(room_number(number)) {
                    Ok(target) => {
                        match service.assign_to_room(u64::from(*conn), target) {
                            Ok(placement) => {
                                assert_eq!(placement.room_id, target);
                                assert!(placement.member_count <= capacity);
                            }
                            Err(RegistryError::RoomFull(full)) => {
                                assert_eq!(full, target);
                            }
                            Err(other) => {
                                panic!("unexpected explicit-join failure: {other:?}");
                            }
                        }
                    }
                    Err(_) => {
                        // Room number 0 never reaches the registry.
                        assert_eq!(room_number(number), 0);
                    }
                }
            }
            PlacementOp::Release { conn } => {
                service.release(u64::from(*conn));
            }
        }

        let registry = service.registry();
        let mut listed_members = 0usize;

        for (room, count) in registry.all_rooms() {
            if count == 0 {
                panic!("empty room {room} survived in the listing");
            }
            if count > capacity {
                panic!("room {room} holds {count} members above capacity {capacity}");
            }

            for conn in registry.members_of(room) {
                assert_eq!(
                    registry.room_of(conn),
                    Some(room),
                    "membership indices disagree for connection {conn}"
                );
                listed_members += 1;
            }
        }

        // Every placed connection is listed exactly once: single membership.
        assert_eq!(listed_members, registry.stats().total_users);
    }
});
