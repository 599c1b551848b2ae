//! Environment-driven settings for the console host.

use std::path::PathBuf;
use std::time::Duration;

use partyraids_core::host::TICKS_PER_SECOND;

use crate::error::AppError;

/// Plugin data directory (raid definitions, locations, dungeon archives).
pub const DATA_DIR_VAR: &str = "RAIDS_DATA_DIR";
/// Directory holding world folders.
pub const WORLD_CONTAINER_VAR: &str = "RAIDS_WORLD_CONTAINER";
/// Optional directory of bundled dungeon archives.
pub const BUNDLED_DUNGEONS_VAR: &str = "RAIDS_BUNDLED_DUNGEONS";
/// Host tick length in milliseconds.
pub const TICK_MILLIS_VAR: &str = "RAIDS_TICK_MILLIS";

const DEFAULT_DATA_DIR: &str = "plugins/PartyRaids";
const DEFAULT_WORLD_CONTAINER: &str = "worlds";

/// Resolved console host settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub world_container: PathBuf,
    pub bundled_dungeons: Option<PathBuf>,
    pub tick_interval: Duration,
}

impl Settings {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `RAIDS_TICK_MILLIS` is not a positive
    /// integer.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, which returns the value of a
    /// variable if set.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `RAIDS_TICK_MILLIS` is not a positive
    /// integer.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let data_dir = lookup(DATA_DIR_VAR).unwrap_or_else(|| DEFAULT_DATA_DIR.to_owned());
        let world_container =
            lookup(WORLD_CONTAINER_VAR).unwrap_or_else(|| DEFAULT_WORLD_CONTAINER.to_owned());
        let bundled_dungeons = lookup(BUNDLED_DUNGEONS_VAR)
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from);

        let tick_millis = match lookup(TICK_MILLIS_VAR) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|millis| *millis > 0)
                .ok_or_else(|| {
                    AppError::Config(format!(
                        "{TICK_MILLIS_VAR} must be a positive integer, got \"{raw}\""
                    ))
                })?,
            None => 1000 / TICKS_PER_SECOND,
        };

        Ok(Self {
            data_dir: PathBuf::from(data_dir),
            world_container: PathBuf::from(world_container),
            bundled_dungeons,
            tick_interval: Duration::from_millis(tick_millis),
        })
    }
}
