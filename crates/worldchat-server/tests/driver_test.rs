//! Driver scenario tests.
//!
//! Exercise the protocol flows at the driver level, without a socket:
//! sequential auto-assignment, full-room fallback, freed-number reuse, and
//! the announcement rules.

use std::time::Duration;

use worldchat_core::Environment;
use worldchat_proto::{ClientEvent, RoomId, ServerEvent};
use worldchat_server::{DriverAction, DriverConfig, DriverEvent, ServerDriver};

#[derive(Clone)]
struct TestEnv {
    now_ms: u64,
}

impl Environment for TestEnv {
    fn wall_clock_ms(&self) -> u64 {
        self.now_ms
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        buffer.fill(7);
    }

    fn sleep(&self, _duration: Duration) -> impl Future<Output = ()> + Send {
        async {}
    }
}

fn driver(capacity: u32) -> ServerDriver<TestEnv> {
    ServerDriver::new(
        TestEnv { now_ms: 1_000 },
        DriverConfig { capacity, max_connections: 100 },
    )
}

fn room(n: u32) -> RoomId {
    RoomId::from_number(n).unwrap()
}

fn open(driver: &mut ServerDriver<TestEnv>, conn: u64) -> Vec<DriverAction> {
    driver.process_event(DriverEvent::ConnectionOpened { conn }).unwrap()
}

fn feed(driver: &mut ServerDriver<TestEnv>, conn: u64, event: ClientEvent) -> Vec<DriverAction> {
    driver.process_event(DriverEvent::EventReceived { conn, event }).unwrap()
}

fn auto(driver: &mut ServerDriver<TestEnv>, conn: u64) -> Vec<DriverAction> {
    feed(driver, conn, ClientEvent::RequestAutoRoomAssignment)
}

fn join(driver: &mut ServerDriver<TestEnv>, conn: u64, number: i64) -> Vec<DriverAction> {
    feed(driver, conn, ClientEvent::JoinSpecificRoom { room_number: number })
}

fn identify(driver: &mut ServerDriver<TestEnv>, conn: u64, name: &str) -> Vec<DriverAction> {
    feed(driver, conn, ClientEvent::Identify { nickname: name.to_string() })
}

fn close(driver: &mut ServerDriver<TestEnv>, conn: u64) -> Vec<DriverAction> {
    driver.process_event(DriverEvent::ConnectionClosed { conn }).unwrap()
}

/// The room confirmed to the acting connection, from the actions.
fn assigned_room(actions: &[DriverAction]) -> RoomId {
    actions
        .iter()
        .find_map(|action| match action {
            DriverAction::SendTo { event: ServerEvent::RoomAssigned { room_id, .. }, .. } => {
                Some(*room_id)
            },
            _ => None,
        })
        .expect("no placement confirmation in actions")
}

#[test]
fn sequential_auto_assignments_fill_rooms_left_to_right() {
    let mut driver = driver(2);
    for conn in 1..=3 {
        open(&mut driver, conn);
    }

    assert_eq!(assigned_room(&auto(&mut driver, 1)), room(1));
    assert_eq!(assigned_room(&auto(&mut driver, 2)), room(1));
    assert_eq!(assigned_room(&auto(&mut driver, 3)), room(2));
}

#[test]
fn full_room_explicit_join_reports_then_reassigns() {
    let mut driver = driver(2);
    for conn in 1..=3 {
        open(&mut driver, conn);
    }
    join(&mut driver, 1, 1);
    join(&mut driver, 2, 1);

    let actions = join(&mut driver, 3, 1);

    // The requester learns which room was full before which room it got.
    let DriverAction::SendTo { conn: 3, event: ServerEvent::RoomFull { message } } = &actions[0]
    else {
        panic!("expected RoomFull first, got {actions:?}");
    };
    assert!(message.contains('1'), "room-full message names the requested room");

    assert_eq!(assigned_room(&actions), room(2));
}

#[test]
fn emptied_room_number_is_reused_not_skipped() {
    let mut driver = driver(1);
    for conn in 1..=4 {
        open(&mut driver, conn);
    }
    assert_eq!(assigned_room(&auto(&mut driver, 1)), room(1));
    assert_eq!(assigned_room(&auto(&mut driver, 2)), room(2));
    assert_eq!(assigned_room(&auto(&mut driver, 3)), room(3));

    // Room 2 empties and is deleted; the next assignment recreates it.
    close(&mut driver, 2);
    assert_eq!(assigned_room(&auto(&mut driver, 4)), room(2));
}

#[test]
fn identify_after_placement_announces_to_others_only() {
    let mut driver = driver(10);
    open(&mut driver, 1);
    open(&mut driver, 2);
    join(&mut driver, 1, 5);
    join(&mut driver, 2, 5);

    let actions = identify(&mut driver, 2, "mira");

    assert_eq!(actions.len(), 1, "exactly one announcement: {actions:?}");
    let DriverAction::Broadcast {
        room: r,
        event: ServerEvent::UserJoined { member_count, message, .. },
        exclude,
    } = &actions[0]
    else {
        panic!("expected a join announcement, got {actions:?}");
    };
    assert_eq!(*r, room(5));
    assert_eq!(*member_count, 2);
    assert!(message.contains("mira"));
    assert_eq!(*exclude, Some(2), "the identifying member hears nothing");
}

#[test]
fn identify_while_unplaced_announces_nothing() {
    let mut driver = driver(10);
    open(&mut driver, 1);

    assert!(identify(&mut driver, 1, "mira").is_empty());
}

#[test]
fn confirmation_precedes_join_announcement() {
    let mut driver = driver(10);
    open(&mut driver, 1);
    identify(&mut driver, 1, "ana");

    let actions = join(&mut driver, 1, 3);

    assert!(
        matches!(
            &actions[0],
            DriverAction::SendTo { conn: 1, event: ServerEvent::RoomAssigned { nickname, .. } }
                if nickname.as_deref() == Some("ana")
        ),
        "confirmation first: {actions:?}"
    );
    assert!(
        matches!(
            &actions[1],
            DriverAction::Broadcast { event: ServerEvent::UserJoined { .. }, exclude: Some(1), .. }
        ),
        "announcement second: {actions:?}"
    );
}

#[test]
fn anonymous_placement_confirms_without_announcing() {
    let mut driver = driver(10);
    open(&mut driver, 1);

    let actions = join(&mut driver, 1, 3);

    assert_eq!(actions.len(), 1);
    assert!(matches!(
        &actions[0],
        DriverAction::SendTo { event: ServerEvent::RoomAssigned { nickname: None, .. }, .. }
    ));
}

#[test]
fn messages_fan_out_to_the_whole_room_with_server_time() {
    let mut driver = driver(10);
    open(&mut driver, 1);
    identify(&mut driver, 1, "ana");
    join(&mut driver, 1, 1);

    let actions = feed(
        &mut driver,
        1,
        ClientEvent::SendMessage { nickname: "ana".to_string(), text: "hello".to_string() },
    );

    assert_eq!(actions.len(), 1);
    let DriverAction::Broadcast {
        event: ServerEvent::Message { user, text, timestamp_ms },
        exclude: None,
        ..
    } = &actions[0]
    else {
        panic!("expected a message broadcast, got {actions:?}");
    };
    assert_eq!(user, "ana");
    assert_eq!(text, "hello");
    assert_eq!(*timestamp_ms, 1_000, "server clock stamps the message");
}

#[test]
fn messages_from_unplaced_or_unidentified_connections_are_dropped() {
    let mut driver = driver(10);
    open(&mut driver, 1);
    open(&mut driver, 2);

    // Identified but unplaced.
    identify(&mut driver, 1, "ana");
    let event = ClientEvent::SendMessage { nickname: "ana".to_string(), text: "hi".to_string() };
    assert!(feed(&mut driver, 1, event.clone()).is_empty());

    // Placed but never identified.
    join(&mut driver, 2, 1);
    assert!(feed(&mut driver, 2, event).is_empty());
}

#[test]
fn disconnect_announces_to_remaining_members() {
    let mut driver = driver(10);
    open(&mut driver, 1);
    open(&mut driver, 2);
    identify(&mut driver, 1, "ana");
    join(&mut driver, 1, 1);
    join(&mut driver, 2, 1);

    let actions = close(&mut driver, 1);

    assert_eq!(actions.len(), 1);
    let DriverAction::Broadcast {
        event: ServerEvent::UserLeft { member_count, message, .. },
        ..
    } = &actions[0]
    else {
        panic!("expected a leave announcement, got {actions:?}");
    };
    assert_eq!(*member_count, 1);
    assert!(message.contains("ana"));
}

#[test]
fn last_member_leaving_announces_nothing() {
    let mut driver = driver(10);
    open(&mut driver, 1);
    join(&mut driver, 1, 1);

    assert!(close(&mut driver, 1).is_empty());
    assert!(driver.rooms().is_empty(), "the room was deleted");
}

#[test]
fn invalid_room_numbers_fall_back_to_auto_assignment() {
    let mut driver = driver(10);
    open(&mut driver, 1);
    open(&mut driver, 2);

    for (conn, bad_number) in [(1, 0i64), (2, -5)] {
        let actions = join(&mut driver, conn, bad_number);
        assert!(
            !actions
                .iter()
                .any(|a| matches!(a, DriverAction::SendTo { event: ServerEvent::RoomFull { .. }, .. })),
            "invalid numbers are not a capacity failure"
        );
        assert_eq!(assigned_room(&actions), room(1));
    }
}

#[test]
fn rejoining_the_current_room_leaves_the_count_unchanged() {
    let mut driver = driver(10);
    open(&mut driver, 1);
    open(&mut driver, 2);
    join(&mut driver, 1, 4);
    join(&mut driver, 2, 4);

    let actions = join(&mut driver, 1, 4);
    assert_eq!(assigned_room(&actions), room(4));
    assert_eq!(driver.rooms(), vec![(room(4), 2)]);
}

#[test]
fn connections_beyond_the_limit_are_refused() {
    let mut driver = ServerDriver::new(
        TestEnv { now_ms: 0 },
        DriverConfig { capacity: 50, max_connections: 2 },
    );

    assert!(open(&mut driver, 1).is_empty());
    assert!(open(&mut driver, 2).is_empty());

    let actions = open(&mut driver, 3);
    assert!(matches!(actions[0], DriverAction::CloseConnection { conn: 3, .. }));
    assert_eq!(driver.connection_count(), 2);
}

#[test]
fn stats_track_occupancy() {
    let mut driver = driver(2);
    for conn in 1..=3 {
        open(&mut driver, conn);
        auto(&mut driver, conn);
    }

    let stats = driver.stats();
    assert_eq!(stats.total_rooms, 2);
    assert_eq!(stats.total_users, 3);
    assert_eq!(stats.capacity, 2);
}
