//! Loopback broadcast channel for testing.
//!
//! A [`LoopbackHub`] plays the relay: every [`LoopbackChannel`] obtained from
//! [`LoopbackHub::connect`] is one client connection, and publishing fans the
//! frame out to all members of the room, the publisher included.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use taskboard_proto::EventFrame;
use tokio::sync::{Mutex, mpsc};

use super::{BroadcastChannel, ChannelError};

type Delivery = (String, EventFrame);

#[derive(Debug, Default)]
struct HubState {
    next_id: u64,
    endpoints: HashMap<u64, mpsc::Sender<Delivery>>,
    rooms: HashMap<String, BTreeSet<u64>>,
}

/// In-process stand-in for the room relay.
#[derive(Debug, Clone)]
pub struct LoopbackHub {
    state: Arc<parking_lot::Mutex<HubState>>,
    buffer: usize,
}

impl LoopbackHub {
    /// Creates a hub whose endpoints buffer up to `buffer` undelivered frames.
    #[must_use]
    pub fn new(buffer: usize) -> Self {
        Self {
            state: Arc::new(parking_lot::Mutex::new(HubState::default())),
            buffer,
        }
    }

    /// Opens a new client connection to the hub.
    #[must_use]
    pub fn connect(&self) -> LoopbackChannel {
        let (tx, rx) = mpsc::channel(self.buffer);
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.endpoints.insert(id, tx);
        drop(state);

        LoopbackChannel {
            id,
            hub: self.clone(),
            rx: Mutex::new(rx),
            closed: AtomicBool::new(false),
        }
    }

    /// Number of endpoints currently in `room`.
    #[must_use]
    pub fn member_count(&self, room: &str) -> usize {
        self.state.lock().rooms.get(room).map_or(0, BTreeSet::len)
    }

    /// Publishes a frame that carries no client behind it, as an outside
    /// writer would.
    pub async fn inject(&self, room: &str, frame: EventFrame) {
        self.fan_out(room, &frame).await;
    }

    async fn fan_out(&self, room: &str, frame: &EventFrame) {
        // Collect senders first so the lock is not held across `send().await`.
        let senders: Vec<_> = {
            let state = self.state.lock();
            state
                .rooms
                .get(room)
                .into_iter()
                .flatten()
                .filter_map(|id| state.endpoints.get(id).cloned())
                .collect()
        };
        for tx in senders {
            if tx.send((room.to_string(), frame.clone())).await.is_err() {
                tracing::debug!(room = %room, "loopback member went away during fan-out");
            }
        }
    }

    fn disconnect(&self, id: u64) {
        let mut state = self.state.lock();
        state.endpoints.remove(&id);
        state.rooms.retain(|_, members| {
            members.remove(&id);
            !members.is_empty()
        });
    }
}

/// One client connection to a [`LoopbackHub`].
pub struct LoopbackChannel {
    id: u64,
    hub: LoopbackHub,
    rx: Mutex<mpsc::Receiver<Delivery>>,
    closed: AtomicBool,
}

impl LoopbackChannel {
    /// Simulates losing the connection: the endpoint leaves every room and
    /// further joins and publishes fail.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
        self.hub.disconnect(self.id);
    }

    fn ensure_open(&self) -> Result<(), ChannelError> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(ChannelError::ConnectionClosed);
        }
        Ok(())
    }
}

impl Drop for LoopbackChannel {
    fn drop(&mut self) {
        self.hub.disconnect(self.id);
    }
}

impl BroadcastChannel for LoopbackChannel {
    async fn join(&self, room: &str) -> Result<(), ChannelError> {
        self.ensure_open()?;
        self.hub
            .state
            .lock()
            .rooms
            .entry(room.to_string())
            .or_default()
            .insert(self.id);
        Ok(())
    }

    async fn leave(&self, room: &str) -> Result<(), ChannelError> {
        self.ensure_open()?;
        let mut state = self.hub.state.lock();
        if let Some(members) = state.rooms.get_mut(room) {
            members.remove(&self.id);
            if members.is_empty() {
                state.rooms.remove(room);
            }
        }
        Ok(())
    }

    async fn publish(&self, room: &str, frame: &EventFrame) -> Result<(), ChannelError> {
        self.ensure_open()?;
        self.hub.fan_out(room, frame).await;
        Ok(())
    }

    async fn recv(&self) -> Result<(String, EventFrame), ChannelError> {
        if self.closed.load(Ordering::Relaxed) {
            // Drain what was delivered before the close, then report it.
            let mut rx = self.rx.lock().await;
            return rx.try_recv().map_err(|_| ChannelError::ConnectionClosed);
        }
        let mut rx = self.rx.lock().await;
        rx.recv().await.ok_or(ChannelError::ConnectionClosed)
    }

    fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::Relaxed)
    }
}
