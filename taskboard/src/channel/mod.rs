//! Broadcast channel abstraction.
//!
//! Defines the [`BroadcastChannel`] trait used to share task events between
//! every client viewing the same project. A project's room is named after its
//! id. Publishing into a room delivers the frame to all members, the
//! publisher included. Concrete implementations:
//! - [`ws::WsChannel`] — WebSocket connection to the `taskboard-server` relay
//! - [`loopback::LoopbackChannel`] — in-process hub for testing

pub mod loopback;
pub mod ws;

use taskboard_proto::EventFrame;
use taskboard_proto::codec::CodecError;

/// Errors that can occur on a broadcast channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The connection to the relay is gone.
    #[error("channel connection closed")]
    ConnectionClosed,

    /// Connecting or waiting for an acknowledgment took too long.
    #[error("channel operation timed out")]
    Timeout,

    /// The relay could not be reached at all.
    #[error("relay unreachable: {0}")]
    Unreachable(String),

    /// The relay refused a request.
    #[error("relay rejected request: {0}")]
    Rejected(String),

    /// A frame could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// An underlying I/O or WebSocket error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Room-scoped publish/subscribe channel for task events.
///
/// Delivery is at most once, and only to members present when the frame is
/// fanned out. Frames published by one member reach the others in the order
/// they were published.
pub trait BroadcastChannel: Send + Sync {
    /// Become a member of `room`. Joining twice is harmless.
    fn join(&self, room: &str) -> impl std::future::Future<Output = Result<(), ChannelError>> + Send;

    /// Stop receiving frames from `room`. Leaving a room never joined is a no-op.
    fn leave(&self, room: &str) -> impl std::future::Future<Output = Result<(), ChannelError>> + Send;

    /// Publish `frame` into `room`.
    fn publish(
        &self,
        room: &str,
        frame: &EventFrame,
    ) -> impl std::future::Future<Output = Result<(), ChannelError>> + Send;

    /// Wait for the next frame from any joined room, with the room name.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::ConnectionClosed`] once the channel is gone.
    fn recv(&self) -> impl std::future::Future<Output = Result<(String, EventFrame), ChannelError>> + Send;

    /// Whether the channel still believes it is connected.
    fn is_connected(&self) -> bool;
}
