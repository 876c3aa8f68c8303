//! Taskboard server library.
//!
//! Exposes the server for use in tests and embedding. The server persists
//! projects and tasks behind a JSON HTTP API and relays task events between
//! clients through WebSocket rooms, one room per project.

pub mod api;
pub mod config;
pub mod relay;
pub mod rooms;
pub mod store;
