//! Broadcast channel wire protocol.
//!
//! Defines the [`ChannelMessage`] enum that is postcard-encoded and sent over
//! WebSocket binary frames between board clients and the room relay.

use serde::{Deserialize, Serialize};

use crate::event::EventFrame;

/// Messages exchanged between board clients and the room relay.
///
/// Clients join the room of each project they watch, then publish event
/// frames into it. The relay fans every published frame out to all current
/// members of the room, publisher included, and never inspects the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelMessage {
    /// Client asks to become a member of a room.
    ///
    /// Server responds with [`ChannelMessage::Joined`].
    Join {
        /// Room name (the project id).
        room: String,
    },

    /// Client asks to leave a room. Leaving a room it never joined is a no-op.
    Leave {
        /// Room name.
        room: String,
    },

    /// Client publishes an event frame into a room.
    Publish {
        /// Target room.
        room: String,
        /// Event with its origin tag.
        frame: EventFrame,
    },

    /// Server confirms room membership.
    Joined {
        /// Room that was joined.
        room: String,
    },

    /// Server confirms the client left a room.
    Left {
        /// Room that was left.
        room: String,
    },

    /// Server delivers an event published into a room the client is in.
    Event {
        /// Room the event was published to.
        room: String,
        /// Event with its origin tag, forwarded unchanged.
        frame: EventFrame,
    },

    /// Server reports an error condition.
    Error {
        /// Human-readable error description.
        reason: String,
    },
}

impl ChannelMessage {
    /// Short name for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Leave { .. } => "leave",
            Self::Publish { .. } => "publish",
            Self::Joined { .. } => "joined",
            Self::Left { .. } => "left",
            Self::Event { .. } => "event",
            Self::Error { .. } => "error",
        }
    }
}
