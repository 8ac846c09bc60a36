//! WebSocket transport for the session.
//!
//! Provides [`ConnectedSession`], a thin layer that moves wire events
//! between channels and the socket. Protocol decisions stay in the sans-IO
//! [`crate::Session`]; when this connection drops, the caller feeds a
//! `ConnectionLost` event into the session and reconnects if asked to.

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message,
};
use worldchat_proto::{ClientEvent, ServerEvent};

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection could not be established.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Socket failed mid-stream.
    #[error("stream error: {0}")]
    Stream(String),
}

/// Handle to a connected session transport.
///
/// Events are sent and received via the channels; an internal task bridges
/// them to the socket. Dropping `from_server`'s counterpart (the internal
/// sender) signals connection loss: `from_server.recv()` returns `None`.
pub struct ConnectedSession {
    /// Send wire events to the server.
    pub to_server: mpsc::Sender<ClientEvent>,
    /// Receive wire events from the server.
    pub from_server: mpsc::Receiver<ServerEvent>,
    /// Abort handle to stop the bridge task.
    abort_handle: tokio::task::AbortHandle,
}

impl ConnectedSession {
    /// Stop the connection.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}

/// Connect to a worldchat server, e.g. `ws://localhost:8000/ws`.
pub async fn connect(url: &str) -> Result<ConnectedSession, TransportError> {
    let (socket, _response) = connect_async(url)
        .await
        .map_err(|e| TransportError::Connection(e.to_string()))?;

    let (to_server_tx, to_server_rx) = mpsc::channel::<ClientEvent>(32);
    let (from_server_tx, from_server_rx) = mpsc::channel::<ServerEvent>(32);

    let handle = tokio::spawn(run_connection(socket, to_server_rx, from_server_tx));

    Ok(ConnectedSession {
        to_server: to_server_tx,
        from_server: from_server_rx,
        abort_handle: handle.abort_handle(),
    })
}

/// Bridge between the channels and the socket until either side ends.
async fn run_connection(
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    mut to_server: mpsc::Receiver<ClientEvent>,
    from_server: mpsc::Sender<ServerEvent>,
) {
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            outbound = to_server.recv() => {
                let Some(event) = outbound else { break };
                let text = match event.to_json() {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to encode outbound event");
                        continue;
                    },
                };
                if sink.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            },

            inbound = stream.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        match ServerEvent::from_json(text.as_str()) {
                            Ok(event) => {
                                if from_server.send(event).await.is_err() {
                                    break;
                                }
                            },
                            Err(e) => {
                                tracing::warn!(error = %e, "undecodable server event");
                            },
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {},
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "socket error");
                        break;
                    },
                }
            },
        }
    }
}
