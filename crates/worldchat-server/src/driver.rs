//! Server driver.
//!
//! Ties the placement policy to the wire protocol. The runtime feeds
//! [`DriverEvent`]s in and executes the returned [`DriverAction`]s; the
//! driver itself never touches a socket, which keeps every protocol decision
//! unit-testable without I/O.
//!
//! Ordering matters in two places and both are encoded here: a placement
//! confirmation for the acting connection is always emitted before the join
//! announcement for the rest of the room, and announcements always carry the
//! member count as of the moment they are generated.

use std::collections::HashMap;

use worldchat_core::Environment;
use worldchat_proto::{ClientEvent, RoomId, ServerEvent};

use crate::{
    assignment::{AssignmentService, Placement},
    error::ServerError,
    registry::{ConnectionId, RegistryError, RegistryStats},
};

/// Default number of members a room holds.
pub const ROOM_CAPACITY: u32 = 50;

/// Driver configuration.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Members per room.
    pub capacity: u32,
    /// Maximum concurrent connections.
    pub max_connections: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self { capacity: ROOM_CAPACITY, max_connections: 10_000 }
    }
}

/// Events the runtime feeds into the driver.
#[derive(Debug, Clone)]
pub enum DriverEvent {
    /// A new connection was accepted by the transport.
    ConnectionOpened {
        /// Runtime-assigned connection id.
        conn: ConnectionId,
    },

    /// A wire event arrived from a connection.
    EventReceived {
        /// Sending connection.
        conn: ConnectionId,
        /// Decoded event.
        event: ClientEvent,
    },

    /// A connection went away (clean close or transport loss alike).
    ConnectionClosed {
        /// Closed connection.
        conn: ConnectionId,
    },
}

/// Actions the driver produces for the runtime to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverAction {
    /// Send an event to one connection.
    SendTo {
        /// Target connection.
        conn: ConnectionId,
        /// Event to deliver.
        event: ServerEvent,
    },

    /// Send an event to every member of a room.
    Broadcast {
        /// Target room.
        room: RoomId,
        /// Event to deliver.
        event: ServerEvent,
        /// Member to skip, if any.
        exclude: Option<ConnectionId>,
    },

    /// Drop a connection.
    CloseConnection {
        /// Connection to drop.
        conn: ConnectionId,
        /// Human-readable reason, for the log.
        reason: String,
    },
}

/// Per-connection protocol state.
#[derive(Debug, Default)]
struct ConnectionState {
    /// Display name, set by the most recent identify event.
    nickname: Option<String>,
}

/// Protocol driver owning the placement policy and per-connection state.
pub struct ServerDriver<E: Environment> {
    env: E,
    config: DriverConfig,
    assignment: AssignmentService,
    connections: HashMap<ConnectionId, ConnectionState>,
}

impl<E: Environment> ServerDriver<E> {
    /// Create a driver with an empty registry.
    pub fn new(env: E, config: DriverConfig) -> Self {
        let assignment = AssignmentService::new(config.capacity);
        Self { env, config, assignment, connections: HashMap::new() }
    }

    /// Process one event and return the actions to execute.
    pub fn process_event(&mut self, event: DriverEvent) -> Result<Vec<DriverAction>, ServerError> {
        match event {
            DriverEvent::ConnectionOpened { conn } => self.handle_opened(conn),
            DriverEvent::EventReceived { conn, event } => self.handle_event(conn, event),
            DriverEvent::ConnectionClosed { conn } => Ok(self.handle_closed(conn)),
        }
    }

    /// Member connections of a room, for broadcast fan-out.
    pub fn members_of(&self, room: RoomId) -> Vec<ConnectionId> {
        self.assignment.registry().members_of(room).collect()
    }

    /// All rooms with member counts, ascending by room number.
    pub fn rooms(&self) -> Vec<(RoomId, u32)> {
        self.assignment.registry().all_rooms().collect()
    }

    /// Aggregate occupancy counters.
    pub fn stats(&self) -> RegistryStats {
        self.assignment.stats()
    }

    /// Number of open connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn handle_opened(&mut self, conn: ConnectionId) -> Result<Vec<DriverAction>, ServerError> {
        if self.connections.len() >= self.config.max_connections {
            return Ok(vec![DriverAction::CloseConnection {
                conn,
                reason: "max connections exceeded".to_string(),
            }]);
        }

        self.connections.insert(conn, ConnectionState::default());
        tracing::debug!(conn, "connection opened");
        Ok(vec![])
    }

    fn handle_event(
        &mut self,
        conn: ConnectionId,
        event: ClientEvent,
    ) -> Result<Vec<DriverAction>, ServerError> {
        if !self.connections.contains_key(&conn) {
            return Err(ServerError::UnknownConnection(conn));
        }

        match event {
            ClientEvent::Identify { nickname } => Ok(self.handle_identify(conn, nickname)),
            ClientEvent::SendMessage { nickname, text } => {
                Ok(self.handle_send_message(conn, nickname, text))
            },
            ClientEvent::JoinSpecificRoom { room_number } => {
                self.handle_join_specific(conn, room_number)
            },
            ClientEvent::RequestAutoRoomAssignment => {
                tracing::debug!(conn, "auto assignment requested");
                let placement = self.assignment.assign(conn)?;
                Ok(self.confirm_and_announce(conn, placement))
            },
        }
    }

    fn handle_identify(&mut self, conn: ConnectionId, nickname: String) -> Vec<DriverAction> {
        tracing::debug!(conn, nickname = %nickname, "identify");

        if let Some(state) = self.connections.get_mut(&conn) {
            state.nickname = Some(nickname.clone());
        }

        // A connection that identifies after being seated announces itself
        // to the rest of its room; the identifying member hears nothing.
        let Some(room) = self.assignment.registry().room_of(conn) else {
            return vec![];
        };

        let member_count = self.assignment.registry().member_count(room);
        vec![DriverAction::Broadcast {
            room,
            event: ServerEvent::UserJoined {
                room_id: room,
                member_count,
                message: join_line(&nickname, room),
            },
            exclude: Some(conn),
        }]
    }

    fn handle_send_message(
        &mut self,
        conn: ConnectionId,
        nickname: String,
        text: String,
    ) -> Vec<DriverAction> {
        let Some(room) = self.assignment.registry().room_of(conn) else {
            tracing::debug!(conn, "dropping message from unplaced connection");
            return vec![];
        };

        let identified =
            self.connections.get(&conn).is_some_and(|state| state.nickname.is_some());
        if !identified {
            tracing::debug!(conn, "dropping message from unidentified connection");
            return vec![];
        }

        vec![DriverAction::Broadcast {
            room,
            event: ServerEvent::Message {
                user: nickname,
                text,
                timestamp_ms: self.env.wall_clock_ms(),
            },
            exclude: None,
        }]
    }

    fn handle_join_specific(
        &mut self,
        conn: ConnectionId,
        room_number: i64,
    ) -> Result<Vec<DriverAction>, ServerError> {
        let target = u32::try_from(room_number).ok().and_then(|n| RoomId::from_number(n).ok());

        let Some(room) = target else {
            // Invalid numbers mean "no room requested": fall through to
            // auto-assignment rather than failing the connection.
            tracing::debug!(conn, room_number, "invalid room number, auto-assigning");
            let placement = self.assignment.assign(conn)?;
            return Ok(self.confirm_and_announce(conn, placement));
        };

        tracing::debug!(conn, room = %room, "specific room requested");

        match self.assignment.assign_to_room(conn, room) {
            Ok(placement) => Ok(self.confirm_and_announce(conn, placement)),
            Err(RegistryError::RoomFull(full)) => {
                // The requester learns which room was full before hearing
                // which room it actually got.
                let mut actions = vec![DriverAction::SendTo {
                    conn,
                    event: ServerEvent::RoomFull { message: full_line(full) },
                }];

                let placement = self.assignment.assign(conn)?;
                actions.extend(self.confirm_and_announce(conn, placement));
                Ok(actions)
            },
            Err(other) => Err(other.into()),
        }
    }

    fn handle_closed(&mut self, conn: ConnectionId) -> Vec<DriverAction> {
        let state = self.connections.remove(&conn);

        let Some((room, remaining)) = self.assignment.release(conn) else {
            tracing::debug!(conn, "connection closed while unplaced");
            return vec![];
        };

        tracing::info!(conn, room = %room, remaining, "connection closed");

        if remaining == 0 {
            return vec![];
        }

        let nickname = state
            .and_then(|state| state.nickname)
            .unwrap_or_else(|| DEFAULT_NICKNAME.to_string());

        vec![DriverAction::Broadcast {
            room,
            event: ServerEvent::UserLeft {
                room_id: room,
                member_count: remaining,
                message: leave_line(&nickname, room),
            },
            exclude: None,
        }]
    }

    /// Placement confirmation for the acting connection, then the join
    /// announcement to everyone else. The confirmation must come first so
    /// the actor learns its own room before hearing about itself.
    fn confirm_and_announce(
        &self,
        conn: ConnectionId,
        placement: Placement,
    ) -> Vec<DriverAction> {
        let Placement { room_id, member_count, capacity } = placement;
        let nickname = self.connections.get(&conn).and_then(|state| state.nickname.clone());

        tracing::info!(conn, room = %room_id, member_count, "placed");

        let mut actions = vec![DriverAction::SendTo {
            conn,
            event: ServerEvent::RoomAssigned {
                room_id,
                member_count,
                capacity,
                nickname: nickname.clone(),
                room_number: room_id.number(),
            },
        }];

        // Only identified connections are announced; an anonymous seat
        // announces itself later, when it identifies.
        if let Some(name) = nickname {
            actions.push(DriverAction::Broadcast {
                room: room_id,
                event: ServerEvent::UserJoined {
                    room_id,
                    member_count,
                    message: join_line(&name, room_id),
                },
                exclude: Some(conn),
            });
        }

        actions
    }
}

impl<E: Environment> std::fmt::Debug for ServerDriver<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerDriver")
            .field("connection_count", &self.connections.len())
            .field("stats", &self.assignment.stats())
            .finish()
    }
}

/// Fallback name for connections that never identified.
const DEFAULT_NICKNAME: &str = "guest";

fn join_line(nickname: &str, room: RoomId) -> String {
    format!("{nickname} joined world channel {}.", room.number())
}

fn leave_line(nickname: &str, room: RoomId) -> String {
    format!("{nickname} left world channel {}.", room.number())
}

fn full_line(room: RoomId) -> String {
    format!("World channel {} is full, assigning another room.", room.number())
}
