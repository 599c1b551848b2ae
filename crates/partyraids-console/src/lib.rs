//! Party Raids console host.
//!
//! Runs the orchestrator outside a game server: worlds are plain directories
//! under a container folder, the host tick is driven by a timer, and `/raids`
//! commands are read from standard input.

pub mod console;
pub mod error;
pub mod local_host;
pub mod settings;
pub mod state;
