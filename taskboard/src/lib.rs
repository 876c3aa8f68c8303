//! `taskboard` — collaborative task board client with optimistic updates
//! and per-project undo/redo.
//!
//! - [`sync`]: the coordinator every mutation goes through
//! - [`store`], [`echo`], [`history`]: its local state
//! - [`persistence`], [`channel`]: the remote services it talks to
//! - [`config`], [`shell`]: the command-line front end

pub mod channel;
pub mod config;
pub mod echo;
pub mod history;
pub mod persistence;
pub mod shell;
pub mod store;
pub mod sync;
