//! Session state machine.
//!
//! Owns one connection's lifecycle end-to-end: resolve the display name,
//! connect, identify, resolve a room (location fragment, then stored record,
//! then automatic assignment), and keep the visible state in step with the
//! server's events. The machine is sans-IO: it returns [`SessionAction`]s
//! and never performs them.
//!
//! Phases: `Inactive → Connecting → Resolving → Placed`, back to
//! `Connecting` on transport loss and back to `Inactive` on explicit leave.
//! Server events that arrive outside the phase that expects them are
//! dropped, so a response landing after teardown cannot corrupt state.

use worldchat_core::Environment;
use worldchat_proto::{ClientEvent, RoomId, ServerEvent};

use crate::{
    event::{ResolutionSource, SessionAction, SessionEvent},
    identity::{self, NameSources},
    location,
    store::{SessionRecord, SessionStore},
};

/// Capacity assumed before the first placement confirmation reports the
/// real value.
const DEFAULT_ROOM_CAPACITY: u32 = 50;

/// Session construction parameters.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Location fragment at start, with or without its leading `#`.
    pub initial_fragment: String,
    /// Display-name candidates, in descending priority.
    pub names: NameSources,
}

/// Lifecycle phase of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Not started, or torn down after an explicit leave.
    Inactive,
    /// Connection requested, waiting for the transport.
    Connecting,
    /// Placement request in flight.
    Resolving(ResolutionSource),
    /// Seated in a room.
    Placed(RoomId),
}

/// Action-based client session.
pub struct Session<E: Environment, S: SessionStore> {
    env: E,
    store: S,
    nickname: String,
    fragment: String,
    capacity: u32,
    phase: Phase,
}

impl<E: Environment, S: SessionStore> Session<E, S> {
    /// Create an inactive session.
    ///
    /// The display name is resolved here, once per session.
    pub fn new(env: E, store: S, config: SessionConfig) -> Self {
        let nickname = identity::resolve_display_name(&env, &config.names);
        Self {
            env,
            store,
            nickname,
            fragment: config.initial_fragment,
            capacity: DEFAULT_ROOM_CAPACITY,
            phase: Phase::Inactive,
        }
    }

    /// Resolved display name.
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// The record store, for inspection.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Room the session currently occupies, if any.
    pub fn current_room(&self) -> Option<RoomId> {
        match self.phase {
            Phase::Placed(room) => Some(room),
            _ => None,
        }
    }

    /// Source of the in-flight resolution attempt, if one is in flight.
    pub fn resolution_in_flight(&self) -> Option<ResolutionSource> {
        match self.phase {
            Phase::Resolving(source) => Some(source),
            _ => None,
        }
    }

    /// Whether the session has started and not been torn down.
    pub fn is_active(&self) -> bool {
        self.phase != Phase::Inactive
    }

    /// Process one event and return the actions to execute.
    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionAction> {
        match event {
            SessionEvent::Start => self.handle_start(),
            SessionEvent::Connected => self.handle_connected(),
            SessionEvent::Server(server_event) => self.handle_server_event(server_event),
            SessionEvent::ConnectionLost { reason } => self.handle_connection_lost(&reason),
            SessionEvent::LocationChanged { fragment } => self.handle_location_changed(fragment),
            SessionEvent::SubmitMessage { text } => self.handle_submit(&text),
            SessionEvent::Leave => self.handle_leave(),
        }
    }

    fn handle_start(&mut self) -> Vec<SessionAction> {
        if self.phase != Phase::Inactive {
            return vec![];
        }

        self.phase = Phase::Connecting;
        vec![SessionAction::Connect]
    }

    fn handle_connected(&mut self) -> Vec<SessionAction> {
        if self.phase != Phase::Connecting {
            tracing::debug!(phase = ?self.phase, "ignoring connected signal");
            return vec![];
        }

        let mut actions = vec![
            SessionAction::Send(ClientEvent::Identify { nickname: self.nickname.clone() }),
            SessionAction::AppendSystem { text: "Connected to the chat server.".to_string() },
        ];

        let (source, request) = self.resolve_room_request();
        tracing::debug!(?source, "requesting placement");
        self.phase = Phase::Resolving(source);
        actions.push(SessionAction::Send(request));
        actions
    }

    /// Pick the placement request by fixed precedence: location fragment,
    /// then stored record, then automatic assignment.
    fn resolve_room_request(&mut self) -> (ResolutionSource, ClientEvent) {
        if let Some(room) = location::room_from_fragment(&self.fragment) {
            return (
                ResolutionSource::Location,
                ClientEvent::JoinSpecificRoom { room_number: i64::from(room.number()) },
            );
        }

        if let Some(record) = self.load_valid_record() {
            return (
                ResolutionSource::Stored,
                ClientEvent::JoinSpecificRoom {
                    room_number: i64::from(record.room_id.number()),
                },
            );
        }

        (ResolutionSource::Auto, ClientEvent::RequestAutoRoomAssignment)
    }

    fn handle_server_event(&mut self, event: ServerEvent) -> Vec<SessionAction> {
        match event {
            ServerEvent::RoomAssigned { room_id, member_count, capacity, .. } => {
                self.handle_room_assigned(room_id, member_count, capacity)
            },
            ServerEvent::UserJoined { room_id, member_count, message }
            | ServerEvent::UserLeft { room_id, member_count, message } => {
                self.handle_occupancy_change(room_id, member_count, message)
            },
            ServerEvent::Message { user, text, timestamp_ms } => {
                if matches!(self.phase, Phase::Placed(_)) {
                    vec![SessionAction::AppendChat { user, text, timestamp_ms }]
                } else {
                    vec![]
                }
            },
            ServerEvent::RoomFull { message } => {
                if self.is_active() {
                    vec![SessionAction::AppendSystem { text: message }]
                } else {
                    vec![]
                }
            },
        }
    }

    fn handle_room_assigned(
        &mut self,
        room_id: RoomId,
        member_count: u32,
        capacity: u32,
    ) -> Vec<SessionAction> {
        // A confirmation is only meaningful while resolving or seated (a
        // location change can re-resolve from Placed); anything else is a
        // late response after teardown.
        if !matches!(self.phase, Phase::Resolving(_) | Phase::Placed(_)) {
            tracing::debug!(room = %room_id, "discarding late placement confirmation");
            return vec![];
        }

        self.capacity = capacity;
        self.phase = Phase::Placed(room_id);
        self.fragment = location::fragment_for_room(room_id);

        let record = SessionRecord {
            room_id,
            member_count,
            capacity,
            saved_at_ms: self.env.wall_clock_ms(),
        };
        if let Err(e) = self.store.save(&record) {
            tracing::warn!(error = %e, "failed to persist session record");
        }

        vec![
            SessionAction::RoomStatusChanged { room_id, member_count, capacity },
            SessionAction::SetLocation { fragment: self.fragment.clone() },
            SessionAction::AppendSystem {
                text: format!(
                    "Entered world channel {} ({member_count}/{capacity}).",
                    room_id.number()
                ),
            },
        ]
    }

    fn handle_occupancy_change(
        &mut self,
        room_id: RoomId,
        member_count: u32,
        message: String,
    ) -> Vec<SessionAction> {
        if !matches!(self.phase, Phase::Placed(_) | Phase::Resolving(_)) {
            return vec![];
        }

        // Keep the stored member count current without refreshing the
        // record's age; announcements are not placement confirmations.
        match self.store.load() {
            Ok(Some(mut record)) if record.room_id == room_id => {
                record.member_count = member_count;
                if let Err(e) = self.store.save(&record) {
                    tracing::warn!(error = %e, "failed to update session record");
                }
            },
            Ok(_) => {},
            Err(e) => tracing::debug!(error = %e, "unreadable session record left alone"),
        }

        vec![
            SessionAction::AppendSystem { text: message },
            SessionAction::RoomStatusChanged { room_id, member_count, capacity: self.capacity },
        ]
    }

    fn handle_connection_lost(&mut self, reason: &str) -> Vec<SessionAction> {
        if self.phase == Phase::Inactive {
            return vec![];
        }

        tracing::info!(reason, "connection lost, reconnecting");
        self.phase = Phase::Connecting;

        // The server kept nothing about us; the reconnect repeats the full
        // resolution sequence once the transport is back.
        vec![
            SessionAction::AppendSystem {
                text: "Connection to the chat server was lost.".to_string(),
            },
            SessionAction::Connect,
        ]
    }

    fn handle_location_changed(&mut self, fragment: String) -> Vec<SessionAction> {
        self.fragment = fragment;

        if self.phase == Phase::Inactive {
            return vec![];
        }

        match location::room_from_fragment(&self.fragment) {
            Some(room) => match self.phase {
                // Already there, or a resolution is in flight; either way
                // this trigger is suppressed.
                Phase::Placed(current) if current == room => vec![],
                Phase::Resolving(_) => {
                    tracing::debug!(room = %room, "resolution in flight, navigation suppressed");
                    vec![]
                },
                // Still connecting: the pending resolution reads the
                // fragment when the transport is ready.
                Phase::Connecting => vec![],
                Phase::Placed(_) => {
                    self.phase = Phase::Resolving(ResolutionSource::Location);
                    vec![SessionAction::Send(ClientEvent::JoinSpecificRoom {
                        room_number: i64::from(room.number()),
                    })]
                },
                Phase::Inactive => vec![],
            },
            // Navigated back to the room-less state: tear the room down,
            // but leave the location alone - it already shows home.
            None => {
                self.clear_record();
                self.phase = Phase::Inactive;
                vec![SessionAction::Disconnect, SessionAction::ResetRoomUi]
            },
        }
    }

    fn handle_submit(&mut self, text: &str) -> Vec<SessionAction> {
        let text = text.trim();
        if text.is_empty() || !matches!(self.phase, Phase::Placed(_)) {
            return vec![];
        }

        vec![SessionAction::Send(ClientEvent::SendMessage {
            nickname: self.nickname.clone(),
            text: text.to_string(),
        })]
    }

    fn handle_leave(&mut self) -> Vec<SessionAction> {
        if self.phase == Phase::Inactive {
            return vec![];
        }

        self.clear_record();
        self.fragment = String::new();
        self.phase = Phase::Inactive;

        vec![
            SessionAction::Disconnect,
            SessionAction::ResetLocation,
            SessionAction::ResetRoomUi,
        ]
    }

    /// Load the stored record, discarding and purging anything expired or
    /// malformed.
    fn load_valid_record(&mut self) -> Option<SessionRecord> {
        match self.store.load() {
            Ok(Some(record)) if record.is_fresh(self.env.wall_clock_ms()) => Some(record),
            Ok(Some(_)) => {
                tracing::debug!("stored session record expired, purging");
                self.clear_record();
                None
            },
            Ok(None) => None,
            Err(e) => {
                tracing::debug!(error = %e, "stored session record invalid, purging");
                self.clear_record();
                None
            },
        }
    }

    fn clear_record(&mut self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "failed to clear session record");
        }
    }
}

impl<E: Environment, S: SessionStore> std::fmt::Debug for Session<E, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("nickname", &self.nickname)
            .field("phase", &self.phase)
            .finish()
    }
}
