//! Fuzz target for the client session state machine
//!
//! Drive the sans-IO session through arbitrary event orders, including the
//! orders a well-behaved server never produces (confirmations before
//! connect, announcements after teardown, navigation mid-resolution).
//!
//! # Invariants
//!
//! - The session never panics, whatever the event order
//! - A torn-down session produces no actions for server events
//! - The session only reports a current room while it is active

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use worldchat_client::{MemoryStore, Session, SessionConfig, SessionEvent};
use worldchat_core::SystemEnv;
use worldchat_proto::{RoomId, ServerEvent};

#[derive(Debug, Clone, Arbitrary)]
enum SessionOp {
    Start,
    Connected,
    Assigned { number: u8, member_count: u8 },
    Joined { number: u8, member_count: u8 },
    Left { number: u8, member_count: u8 },
    Chat { text: String },
    RoomFull,
    ConnectionLost,
    Navigate { number: u8 },
    NavigateHome,
    Submit { text: String },
    Leave,
}

fn room(number: u8) -> RoomId {
    // Clamp into the valid range; zero is covered by NavigateHome.
    RoomId::from_number(u32::from(number).max(1)).unwrap()
}

fn event(op: SessionOp) -> SessionEvent {
    match op {
        SessionOp::Start => SessionEvent::Start,
        SessionOp::Connected => SessionEvent::Connected,
        SessionOp::Assigned { number, member_count } => {
            let room = room(number);
            SessionEvent::Server(ServerEvent::RoomAssigned {
                room_id: room,
                member_count: u32::from(member_count),
                capacity: 50,
                nickname: None,
                room_number: room.number(),
            })
        }
        SessionOp::Joined { number, member_count } => {
            SessionEvent::Server(ServerEvent::UserJoined {
                room_id: room(number),
                member_count: u32::from(member_count),
                message: "someone joined".to_string(),
            })
        }
        SessionOp::Left { number, member_count } => {
            SessionEvent::Server(ServerEvent::UserLeft {
                room_id: room(number),
                member_count: u32::from(member_count),
                message: "someone left".to_string(),
            })
        }
        SessionOp::Chat { text } => SessionEvent::Server(ServerEvent::Message {
            user: "peer".to_string(),
            text,
            timestamp_ms: 0,
        }),
        SessionOp::RoomFull => SessionEvent::Server(ServerEvent::RoomFull {
            message: "full".to_string(),
        }),
        SessionOp::ConnectionLost => SessionEvent::ConnectionLost {
            reason: "fuzzed drop".to_string(),
        },
        SessionOp::Navigate { number } => SessionEvent::LocationChanged {
            fragment: format!("#world?number={number}"),
        },
        SessionOp::NavigateHome => SessionEvent::LocationChanged {
            fragment: String::new(),
        },
        SessionOp::Submit { text } => SessionEvent::SubmitMessage { text },
        SessionOp::Leave => SessionEvent::Leave,
    }
}

fuzz_target!(|ops: Vec<SessionOp>| {
    let mut session =
        Session::new(SystemEnv::new(), MemoryStore::new(), SessionConfig::default());

    for op in ops {
        let was_server_event = matches!(
            op,
            SessionOp::Assigned { .. }
                | SessionOp::Joined { .. }
                | SessionOp::Left { .. }
                | SessionOp::Chat { .. }
                | SessionOp::RoomFull
        );
        let was_active = session.is_active();

        let actions = session.handle(event(op));

        if was_server_event && !was_active {
            assert!(
                actions.is_empty(),
                "inactive session reacted to a server event: {actions:?}"
            );
        }
        if session.current_room().is_some() {
            assert!(session.is_active(), "placed session must be active");
        }
    }
});
