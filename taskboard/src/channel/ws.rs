//! WebSocket broadcast channel to the `taskboard-server` relay.
//!
//! Frames are postcard-encoded [`ChannelMessage`] values, one per binary
//! WebSocket frame. A background reader task decodes incoming frames, pushes
//! room events into a bounded queue and completes pending joins when the
//! relay acknowledges them.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use taskboard_proto::EventFrame;
use taskboard_proto::channel::ChannelMessage;
use taskboard_proto::codec;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::{BroadcastChannel, ChannelError};

/// Type alias for the write half of a WebSocket connection.
type WsSender = futures_util::stream::SplitSink<
    WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
    Message,
>;

/// Type alias for the read half of a WebSocket connection.
type WsReader =
    futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>>;

/// Joins waiting for a `Joined` acknowledgment, keyed by room.
type PendingJoins = Arc<parking_lot::Mutex<HashMap<String, Vec<oneshot::Sender<()>>>>>;

/// Timeout for the relay to acknowledge a `Join`.
const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection settings for [`WsChannel::connect`].
#[derive(Debug, Clone)]
pub struct WsChannelOptions {
    /// How long to wait for the WebSocket handshake.
    pub connect_timeout: Duration,
    /// Capacity of the incoming event queue.
    pub buffer: usize,
    /// Largest frame accepted in either direction.
    pub max_frame_size: usize,
}

impl Default for WsChannelOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            buffer: 256,
            max_frame_size: codec::DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// [`BroadcastChannel`] over a WebSocket connection to the relay.
///
/// Created via [`WsChannel::connect`], which establishes the connection and
/// spawns the background reader task.
pub struct WsChannel {
    /// The relay URL (ws:// or wss://).
    url: String,
    /// Write half of the WebSocket connection (shared for concurrent sends).
    ws_sender: Arc<Mutex<WsSender>>,
    /// Events received by the background reader task.
    incoming: Mutex<mpsc::Receiver<(String, EventFrame)>>,
    pending_joins: PendingJoins,
    /// Whether the WebSocket connection to the relay is active.
    connected: Arc<AtomicBool>,
    max_frame_size: usize,
    reader_handle: tokio::task::JoinHandle<()>,
}

impl WsChannel {
    /// Connect to the relay at `url` (e.g. `ws://127.0.0.1:4000/ws`).
    ///
    /// # Errors
    ///
    /// - [`ChannelError::Timeout`] if the handshake does not finish in time.
    /// - [`ChannelError::Unreachable`] if nothing is listening at `url`.
    /// - [`ChannelError::Io`] for TLS, HTTP or other connection failures.
    pub async fn connect(url: &str, options: &WsChannelOptions) -> Result<Self, ChannelError> {
        let (ws_stream, _response) =
            tokio::time::timeout(options.connect_timeout, connect_async(url))
                .await
                .map_err(|_| {
                    tracing::warn!(url = url, "relay WebSocket connect timed out");
                    ChannelError::Timeout
                })?
                .map_err(|e| {
                    tracing::warn!(url = url, err = %e, "relay WebSocket connect failed");
                    map_ws_connect_error(url, e)
                })?;

        let (ws_sender, ws_reader) = ws_stream.split();

        let (tx, rx) = mpsc::channel(options.buffer);
        let connected = Arc::new(AtomicBool::new(true));
        let pending_joins = PendingJoins::default();

        let reader_handle = tokio::spawn(reader_loop(
            ws_reader,
            tx,
            Arc::clone(&pending_joins),
            Arc::clone(&connected),
            options.max_frame_size,
        ));

        tracing::info!(url = url, "connected to relay");

        Ok(Self {
            url: url.to_string(),
            ws_sender: Arc::new(Mutex::new(ws_sender)),
            incoming: Mutex::new(rx),
            pending_joins,
            connected,
            max_frame_size: options.max_frame_size,
            reader_handle,
        })
    }

    /// Return the relay URL this channel is connected to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn send(&self, msg: &ChannelMessage) -> Result<(), ChannelError> {
        if !self.connected.load(Ordering::Relaxed) {
            return Err(ChannelError::ConnectionClosed);
        }
        let bytes = codec::encode_bounded(msg, self.max_frame_size)?;

        let mut sender = self.ws_sender.lock().await;
        sender
            .send(Message::Binary(bytes.into()))
            .await
            .map_err(|e| {
                tracing::warn!(err = %e, kind = msg.kind(), "relay send failed");
                self.connected.store(false, Ordering::Relaxed);
                ChannelError::ConnectionClosed
            })
    }
}

impl Drop for WsChannel {
    fn drop(&mut self) {
        self.reader_handle.abort();
    }
}

impl BroadcastChannel for WsChannel {
    /// Send `Join` and wait for the relay's `Joined` acknowledgment, so that
    /// every frame published after this returns is delivered to us.
    async fn join(&self, room: &str) -> Result<(), ChannelError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.pending_joins
            .lock()
            .entry(room.to_string())
            .or_default()
            .push(ack_tx);

        self.send(&ChannelMessage::Join {
            room: room.to_string(),
        })
        .await?;

        match tokio::time::timeout(JOIN_TIMEOUT, ack_rx).await {
            Ok(Ok(())) => {
                tracing::debug!(room = %room, "joined room");
                Ok(())
            }
            Ok(Err(_)) => Err(ChannelError::ConnectionClosed),
            Err(_) => {
                tracing::warn!(room = %room, "join acknowledgment timed out");
                Err(ChannelError::Timeout)
            }
        }
    }

    async fn leave(&self, room: &str) -> Result<(), ChannelError> {
        self.send(&ChannelMessage::Leave {
            room: room.to_string(),
        })
        .await
    }

    async fn publish(&self, room: &str, frame: &EventFrame) -> Result<(), ChannelError> {
        self.send(&ChannelMessage::Publish {
            room: room.to_string(),
            frame: frame.clone(),
        })
        .await
    }

    async fn recv(&self) -> Result<(String, EventFrame), ChannelError> {
        let mut rx = self.incoming.lock().await;
        rx.recv().await.ok_or(ChannelError::ConnectionClosed)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

/// Background task that reads WebSocket messages and dispatches them.
///
/// Room events go to `tx`. `Joined` completes pending joins for that room.
/// `Left` and `Error` are logged. Malformed frames are logged and skipped.
///
/// Sets `connected` to `false` and fails every pending join when the
/// WebSocket closes or errors out.
async fn reader_loop(
    mut ws_reader: WsReader,
    tx: mpsc::Sender<(String, EventFrame)>,
    pending_joins: PendingJoins,
    connected: Arc<AtomicBool>,
    max_frame_size: usize,
) {
    while let Some(msg_result) = ws_reader.next().await {
        match msg_result {
            Ok(Message::Binary(data)) => match codec::decode_bounded(&data, max_frame_size) {
                Ok(ChannelMessage::Event { room, frame }) => {
                    if tx.send((room, frame)).await.is_err() {
                        // Receiver dropped, the channel is gone.
                        break;
                    }
                }
                Ok(ChannelMessage::Joined { room }) => {
                    let waiters = pending_joins.lock().remove(&room).unwrap_or_default();
                    for waiter in waiters {
                        let _ = waiter.send(());
                    }
                }
                Ok(ChannelMessage::Left { room }) => {
                    tracing::debug!(room = %room, "left room");
                }
                Ok(ChannelMessage::Error { reason }) => {
                    tracing::warn!(reason = %reason, "relay server error");
                }
                Ok(other) => {
                    tracing::debug!(kind = other.kind(), "unexpected relay message type");
                }
                Err(e) => {
                    tracing::warn!(err = %e, "malformed relay frame, skipping");
                }
            },
            Ok(Message::Close(_)) => {
                tracing::info!("relay WebSocket closed by server");
                break;
            }
            Ok(_) => {
                // Ping, pong, text and raw frames carry nothing for us.
            }
            Err(e) => {
                tracing::warn!(err = %e, "relay WebSocket read error");
                break;
            }
        }
    }
    connected.store(false, Ordering::Relaxed);
    pending_joins.lock().clear();
    tracing::info!("relay reader task exiting");
}

/// Map a `tokio_tungstenite` connection error to a [`ChannelError`].
fn map_ws_connect_error(url: &str, err: tokio_tungstenite::tungstenite::Error) -> ChannelError {
    use tokio_tungstenite::tungstenite::Error as WsError;
    match err {
        WsError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::ConnectionRefused
                || io_err.kind() == std::io::ErrorKind::AddrNotAvailable
            {
                ChannelError::Unreachable(url.to_string())
            } else {
                ChannelError::Io(io_err)
            }
        }
        WsError::Tls(_) => ChannelError::Io(std::io::Error::other(format!("TLS error: {err}"))),
        WsError::Http(response) => ChannelError::Io(std::io::Error::other(format!(
            "relay HTTP error: status {}",
            response.status()
        ))),
        other => ChannelError::Io(std::io::Error::other(format!(
            "relay connection error: {other}"
        ))),
    }
}
