//! Party Raids — world lifecycle orchestration.
//!
//! Provisions per-party raid worlds from dungeon templates, tracks them as
//! managed worlds with an explicit state machine, moves party members in and
//! back out, and reclaims expired worlds on a periodic scrubber tick.

pub mod application;
pub mod domain;

pub use application::command_handlers::{help, process_command, tab_complete};
pub use application::raids_manager::RaidsManager;
pub use domain::commands::RaidsVerb;
pub use domain::managed_world::{ManagedWorld, ManagedWorldKind, RaidInstance, RaidState};
