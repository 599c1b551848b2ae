//! Party Raids — raid definitions.
//!
//! Responsible for the raid model (join criteria, startup effects, mobs) and
//! for turning the YAML definitions document into a [`RaidsConfig`]. Parsing
//! is lenient per entry: one broken raid never hides the others.

pub mod application;
pub mod domain;

pub use application::parser::{DEFAULT_CONFIG_YAML, load_raids_config, parse_raids_config};
pub use domain::raid::{JoinCriteria, Mob, Raid, RaidSetup};
pub use domain::raids_config::RaidsConfig;
