//! Server core: shared state, WebSocket room relay, and server startup.
//!
//! The relay accepts WebSocket connections on `/ws`, tracks which rooms each
//! connection has joined, and fans every published [`EventFrame`] out to all
//! members of the target room, the publisher included. Frames are forwarded
//! unchanged so the publisher can recognise its own echo by origin tag.
//!
//! [`EventFrame`]: taskboard_proto::EventFrame

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use taskboard_proto::channel::ChannelMessage;
use taskboard_proto::codec::{self, DEFAULT_MAX_FRAME_SIZE};
use tokio::sync::{RwLock, mpsc};

use crate::rooms::{ConnectionId, RoomRegistry};
use crate::store::{BoardStore, DEFAULT_MAX_EVENT_LOG};

/// Shared server state: the board store, the connection table and rooms.
pub struct ServerState {
    /// Persisted projects, tasks and the event log.
    pub board: BoardStore,
    /// Room memberships.
    pub rooms: RoomRegistry,
    /// Maps connection id to a channel sender for its WebSocket writer.
    connections: RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<Message>>>,
    next_connection: AtomicU64,
    /// Maximum accepted channel frame size in bytes.
    max_frame_size: usize,
}

impl ServerState {
    /// Creates state around `board` with the default frame size limit.
    #[must_use]
    pub fn new(board: BoardStore) -> Self {
        Self::with_config(DEFAULT_MAX_FRAME_SIZE, board)
    }

    /// Creates state with a custom frame size limit and board store.
    #[must_use]
    pub fn with_config(max_frame_size: usize, board: BoardStore) -> Self {
        Self {
            board,
            rooms: RoomRegistry::new(),
            connections: RwLock::new(HashMap::new()),
            next_connection: AtomicU64::new(1),
            max_frame_size,
        }
    }

    /// Registers a connection's writer channel and returns its new id.
    pub async fn register(&self, sender: mpsc::UnboundedSender<Message>) -> ConnectionId {
        let id = self.next_connection.fetch_add(1, Ordering::Relaxed);
        self.connections.write().await.insert(id, sender);
        id
    }

    /// Removes a connection from the table and from all of its rooms.
    pub async fn unregister(&self, conn: ConnectionId) -> Vec<String> {
        self.connections.write().await.remove(&conn);
        self.rooms.leave_all(conn).await
    }

    /// Returns a clone of the sender for a connection, if still registered.
    pub async fn get_sender(&self, conn: ConnectionId) -> Option<mpsc::UnboundedSender<Message>> {
        self.connections.read().await.get(&conn).cloned()
    }

    /// Number of open connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

/// Handles an upgraded WebSocket connection for a single client.
///
/// The connection lifecycle:
/// 1. Register the connection and spawn its writer task.
/// 2. Process `Join`, `Leave` and `Publish` messages until the socket closes.
/// 3. On disconnect, leave every joined room and unregister.
pub async fn handle_socket(socket: WebSocket, state: Arc<ServerState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let conn = state.register(tx).await;
    tracing::info!(conn = conn, "client connected");

    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                tracing::warn!(conn = conn, "WebSocket write failed");
                break;
            }
        }
    });

    let reader_state = Arc::clone(&state);
    let mut read_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            match msg {
                Message::Binary(data) => {
                    handle_binary_message(conn, &data, &reader_state).await;
                }
                Message::Close(_) => {
                    tracing::info!(conn = conn, "received close frame");
                    break;
                }
                _ => {
                    // Ignore text, ping, pong frames.
                }
            }
        }
    });

    tokio::select! {
        _ = &mut read_task => {
            write_task.abort();
        }
        _ = &mut write_task => {
            read_task.abort();
        }
    }

    let left = state.unregister(conn).await;
    tracing::info!(conn = conn, rooms = left.len(), "client disconnected");
}

/// Handles a binary WebSocket message from a connected client.
async fn handle_binary_message(conn: ConnectionId, data: &[u8], state: &Arc<ServerState>) {
    let msg = match codec::decode_bounded(data, state.max_frame_size) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(conn = conn, size = data.len(), error = %e, "rejected frame");
            let err = ChannelMessage::Error {
                reason: e.to_string(),
            };
            send_to_connection(state, conn, &err).await;
            return;
        }
    };

    match msg {
        ChannelMessage::Join { room } => {
            state.rooms.join(&room, conn).await;
            tracing::debug!(conn = conn, room = %room, "joined room");
            send_to_connection(state, conn, &ChannelMessage::Joined { room }).await;
        }
        ChannelMessage::Leave { room } => {
            let was_member = state.rooms.leave(&room, conn).await;
            tracing::debug!(conn = conn, room = %room, was_member, "left room");
            send_to_connection(state, conn, &ChannelMessage::Left { room }).await;
        }
        ChannelMessage::Publish { room, frame } => {
            tracing::debug!(
                conn = conn,
                room = %room,
                event = frame.event.name(),
                origin = ?frame.origin,
                "publishing event"
            );
            let event = ChannelMessage::Event { room, frame };
            broadcast(state, &event).await;
        }
        other => {
            tracing::warn!(conn = conn, kind = other.kind(), "unexpected message type from client");
        }
    }
}

/// Fans an `Event` out to every member of its room.
async fn broadcast(state: &Arc<ServerState>, msg: &ChannelMessage) {
    let ChannelMessage::Event { room, .. } = msg else {
        return;
    };
    let bytes = match codec::encode(msg) {
        Ok(b) => b,
        Err(e) => {
            tracing::error!(error = %e, "failed to encode event for fan-out");
            return;
        }
    };
    for member in state.rooms.members(room).await {
        if let Some(sender) = state.get_sender(member).await
            && sender.send(Message::Binary(bytes.clone().into())).is_err()
        {
            tracing::warn!(conn = member, room = %room, "fan-out to closed connection");
        }
    }
}

/// Sends a channel message to one connection via its writer channel.
async fn send_to_connection(state: &Arc<ServerState>, conn: ConnectionId, msg: &ChannelMessage) {
    if let Some(sender) = state.get_sender(conn).await
        && let Ok(bytes) = codec::encode(msg)
    {
        let _ = sender.send(Message::Binary(bytes.into()));
    }
}

/// Starts the server (HTTP API and `/ws` relay) on the given address with a
/// fresh in-memory board and returns the bound address and a join handle.
///
/// This is the primary entry point used by both `main.rs` and test code.
///
/// # Errors
///
/// Returns an error if the board cannot be created or the TCP listener
/// cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let board = BoardStore::in_memory(DEFAULT_MAX_EVENT_LOG)?;
    start_server_with_state(addr, Arc::new(ServerState::new(board))).await
}

/// Starts the server with a pre-configured [`ServerState`].
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<ServerState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = crate::api::router()
        .route("/ws", axum::routing::get(ws_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "server error");
        }
    });

    Ok((bound_addr, handle))
}

/// Starts the server in-process for testing on an OS-assigned port.
#[cfg(test)]
pub async fn start_test_server() -> (std::net::SocketAddr, tokio::task::JoinHandle<()>) {
    start_server("127.0.0.1:0")
        .await
        .expect("failed to start test server")
}

/// axum handler that upgrades an HTTP request to a WebSocket connection.
async fn ws_handler(
    ws: axum::extract::ws::WebSocketUpgrade,
    axum::extract::State(state): axum::extract::State<Arc<ServerState>>,
) -> impl axum::response::IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}
