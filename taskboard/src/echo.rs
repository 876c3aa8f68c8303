//! Recognition of this client's own broadcast echoes.
//!
//! Every local mutation is announced with an [`OriginTag`] minted by
//! [`EchoSuppressor::arm`]. The broadcast channel delivers the frame back to
//! the publisher, and [`EchoSuppressor::try_consume`] recognises it by tag so
//! the already-applied change is not applied twice. Tags are tracked
//! individually, so several in-flight mutations never swallow each other's
//! echoes or a foreign event.
//!
//! The configured client id is only a display name. Each suppressor mints
//! its own session nonce and matches on that, so two processes started with
//! the same client id still tell their frames apart.

use std::collections::BTreeSet;

use taskboard_proto::{EventFrame, OriginTag};
use uuid::Uuid;

/// Tracks origin tags of local mutations still awaiting their echo.
#[derive(Debug)]
pub struct EchoSuppressor {
    client_id: String,
    session: String,
    next_seq: u64,
    awaiting: BTreeSet<u64>,
}

impl EchoSuppressor {
    /// Creates a disarmed suppressor with a fresh session nonce.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            session: Uuid::now_v7().to_string(),
            next_seq: 1,
            awaiting: BTreeSet::new(),
        }
    }

    /// Client name embedded in every minted tag.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Session nonce embedded in every minted tag.
    #[must_use]
    pub fn session(&self) -> &str {
        &self.session
    }

    /// Mints a fresh tag and records it as awaiting its echo.
    pub fn arm(&mut self) -> OriginTag {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.awaiting.insert(seq);
        OriginTag {
            client_id: self.client_id.clone(),
            session: self.session.clone(),
            seq,
        }
    }

    /// Returns `true` and forgets the tag if `frame` is the echo of a
    /// mutation this suppressor is awaiting. Frames with a foreign or absent
    /// tag return `false` and leave the state unchanged.
    pub fn try_consume(&mut self, frame: &EventFrame) -> bool {
        match &frame.origin {
            Some(tag) if tag.session == self.session => self.awaiting.remove(&tag.seq),
            _ => false,
        }
    }

    /// Forgets a tag whose publish failed, so no echo will ever arrive.
    pub fn disarm(&mut self, tag: &OriginTag) {
        if tag.session == self.session {
            self.awaiting.remove(&tag.seq);
        }
    }

    /// Whether any tag is awaiting its echo.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        !self.awaiting.is_empty()
    }

    /// Number of tags awaiting their echo.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.awaiting.len()
    }
}
