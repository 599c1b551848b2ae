//! Party Raids Core — shared domain abstractions.
//!
//! This crate defines the value types, error taxonomy, and host capability
//! contracts that every other party-raids crate depends on. Host services
//! (worlds, players, parties, scheduling) are reached only through the traits
//! in [`host`]; nothing here talks to a concrete game server.

pub mod atomic_io;
pub mod clock;
pub mod error;
pub mod host;
pub mod location;
pub mod repository;
pub mod scheduler;
