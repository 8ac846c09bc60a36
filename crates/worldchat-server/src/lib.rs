//! Worldchat production server.
//!
//! Production glue wrapping the action-based [`ServerDriver`] with real I/O:
//! one actix-web listener serves both the WebSocket endpoint (`/ws`) and the
//! read-only occupancy endpoints (`/rooms`, `/stats`, `/status`), and
//! `SystemEnv` supplies wall-clock time.
//!
//! # Architecture
//!
//! - [`ServerDriver`]: event→actions orchestrator (pure logic, no I/O)
//! - [`Server`]: runtime that executes driver actions over WebSocket
//! - [`RoomRegistry`] / [`AssignmentService`]: room bookkeeping and the
//!   placement policy
//!
//! Every inbound event takes the single driver mutex, so registry mutation
//! is one critical section and a placement's capacity scan never interleaves
//! with another placement. Each connection's outbound events flow through
//! one mpsc queue drained by that connection's own loop, so delivery order
//! matches emission order - the placement-confirmed-before-announcement
//! guarantee rests on that.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod assignment;
mod driver;
mod error;
mod http;
mod registry;

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};
use actix_ws::{CloseReason, Message, MessageStream, Session};
pub use assignment::{AssignmentService, Placement};
pub use driver::{
    DriverAction, DriverConfig, DriverEvent, ROOM_CAPACITY, ServerDriver,
};
pub use error::ServerError;
use futures_util::StreamExt;
pub use registry::{ConnectionId, RegistryError, RegistryStats, RoomRegistry};
use tokio::sync::{Mutex, RwLock, mpsc};
use worldchat_core::SystemEnv;
use worldchat_proto::{ClientEvent, ServerEvent};

/// Outbound queue depth per connection. Fan-out is best-effort: a client
/// whose queue stays full misses events rather than stalling the room.
const OUTBOUND_QUEUE: usize = 64;

/// How often heartbeat pings are sent.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// How long before lack of client response causes a timeout.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g. "0.0.0.0:8000").
    pub bind_address: String,
    /// Driver configuration (room capacity, connection limit).
    pub driver: DriverConfig,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self { bind_address: "0.0.0.0:8000".to_string(), driver: DriverConfig::default() }
    }
}

/// Shared state behind every connection task and HTTP handler.
pub(crate) struct AppState {
    /// The protocol driver; this mutex is the placement critical section.
    pub(crate) driver: Mutex<ServerDriver<SystemEnv>>,
    /// Per-connection outbound queues.
    outbound: RwLock<HashMap<ConnectionId, mpsc::Sender<ServerEvent>>>,
    /// Next connection id.
    next_conn: AtomicU64,
}

/// Production worldchat server.
pub struct Server {
    server: actix_web::dev::Server,
    addr: SocketAddr,
}

impl Server {
    /// Bind the listener and prepare the runtime.
    pub fn bind(config: ServerRuntimeConfig) -> Result<Self, ServerError> {
        let driver = ServerDriver::new(SystemEnv::new(), config.driver);
        let state = web::Data::new(AppState {
            driver: Mutex::new(driver),
            outbound: RwLock::new(HashMap::new()),
            next_conn: AtomicU64::new(1),
        });

        let http = HttpServer::new(move || {
            App::new()
                .app_data(state.clone())
                .route("/ws", web::get().to(ws_route))
                .route("/rooms", web::get().to(http::rooms))
                .route("/stats", web::get().to(http::stats))
                .route("/status", web::get().to(http::status))
        })
        .bind(&config.bind_address)?;

        let addr = http.addrs().first().copied().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::AddrNotAvailable, "listener has no address")
        })?;

        Ok(Self { server: http.run(), addr })
    }

    /// Local address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serve until the listener fails or the process is stopped.
    pub async fn run(self) -> Result<(), ServerError> {
        self.server.await?;
        Ok(())
    }
}

/// Upgrade `/ws` and hand the connection to its own task.
async fn ws_route(
    req: HttpRequest,
    body: web::Payload,
    state: web::Data<AppState>,
) -> actix_web::Result<HttpResponse> {
    let (response, session, msg_stream) = actix_ws::handle(&req, body)?;
    actix_web::rt::spawn(handle_connection(state, session, msg_stream));
    Ok(response)
}

/// Drive one WebSocket connection through the driver for its whole life.
async fn handle_connection(
    state: web::Data<AppState>,
    mut session: Session,
    mut msg_stream: MessageStream,
) {
    let conn = state.next_conn.fetch_add(1, Ordering::Relaxed);

    let (tx, mut rx) = mpsc::channel::<ServerEvent>(OUTBOUND_QUEUE);
    state.outbound.write().await.insert(conn, tx);

    let admitted = {
        let mut driver = state.driver.lock().await;
        match driver.process_event(DriverEvent::ConnectionOpened { conn }) {
            Ok(actions) => {
                !execute_actions(&driver, state.get_ref(), actions).await.contains(&conn)
            },
            Err(e) => {
                tracing::error!(conn, error = %e, "admission failed");
                false
            },
        }
    };

    let close_reason = if admitted {
        connection_loop(state.get_ref(), conn, &mut session, &mut msg_stream, &mut rx).await
    } else {
        None
    };

    state.outbound.write().await.remove(&conn);

    {
        let mut driver = state.driver.lock().await;
        match driver.process_event(DriverEvent::ConnectionClosed { conn }) {
            Ok(actions) => {
                execute_actions(&driver, state.get_ref(), actions).await;
            },
            Err(e) => tracing::error!(conn, error = %e, "teardown failed"),
        }
    }

    let _ = session.close(close_reason).await;
}

/// Shuttle events until the socket ends, the heartbeat times out, or the
/// driver drops the connection. Returns the peer's close reason, if any.
async fn connection_loop(
    state: &AppState,
    conn: ConnectionId,
    session: &mut Session,
    msg_stream: &mut MessageStream,
    rx: &mut mpsc::Receiver<ServerEvent>,
) -> Option<CloseReason> {
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    let mut last_seen = tokio::time::Instant::now();

    loop {
        tokio::select! {
            inbound = msg_stream.next() => {
                let message = match inbound {
                    Some(Ok(message)) => message,
                    Some(Err(e)) => {
                        tracing::debug!(conn, error = %e, "socket error");
                        return None;
                    },
                    None => return None,
                };

                last_seen = tokio::time::Instant::now();

                match message {
                    Message::Text(text) => {
                        let event = match ClientEvent::from_json(&text) {
                            Ok(event) => event,
                            Err(e) => {
                                tracing::warn!(conn, error = %e, "undecodable event");
                                continue;
                            },
                        };

                        let mut driver = state.driver.lock().await;
                        match driver.process_event(DriverEvent::EventReceived { conn, event }) {
                            Ok(actions) => {
                                if execute_actions(&driver, state, actions).await.contains(&conn) {
                                    return None;
                                }
                            },
                            Err(e) => tracing::warn!(conn, error = %e, "event rejected"),
                        }
                    },
                    Message::Ping(bytes) => {
                        if session.pong(&bytes).await.is_err() {
                            return None;
                        }
                    },
                    Message::Pong(_) => {},
                    Message::Close(reason) => return reason,
                    Message::Binary(_) => tracing::debug!(conn, "ignoring binary message"),
                    _ => {},
                }
            },

            outbound = rx.recv() => {
                let Some(event) = outbound else { return None };
                let text = match event.to_json() {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to encode outbound event");
                        continue;
                    },
                };
                if session.text(text).await.is_err() {
                    return None;
                }
            },

            _ = heartbeat.tick() => {
                if last_seen.elapsed() > CLIENT_TIMEOUT {
                    tracing::info!(conn, "client heartbeat timed out");
                    return None;
                }
                if session.ping(b"").await.is_err() {
                    return None;
                }
            },
        }
    }
}

/// Execute driver actions. Returns the connections the driver asked to drop.
async fn execute_actions(
    driver: &ServerDriver<SystemEnv>,
    state: &AppState,
    actions: Vec<DriverAction>,
) -> Vec<ConnectionId> {
    let mut closed = Vec::new();

    for action in actions {
        match action {
            DriverAction::SendTo { conn, event } => {
                deliver(state, conn, event).await;
            },

            DriverAction::Broadcast { room, event, exclude } => {
                for member in driver.members_of(room) {
                    if Some(member) != exclude {
                        deliver(state, member, event.clone()).await;
                    }
                }
            },

            DriverAction::CloseConnection { conn, reason } => {
                tracing::info!(conn, reason = %reason, "closing connection");
                state.outbound.write().await.remove(&conn);
                closed.push(conn);
            },
        }
    }

    closed
}

async fn deliver(state: &AppState, conn: ConnectionId, event: ServerEvent) {
    let outbound = state.outbound.read().await;
    let Some(tx) = outbound.get(&conn) else {
        tracing::debug!(conn, "send to vanished connection");
        return;
    };

    if let Err(e) = tx.try_send(event) {
        tracing::debug!(conn, error = %e, "outbound queue refused event");
    }
}
