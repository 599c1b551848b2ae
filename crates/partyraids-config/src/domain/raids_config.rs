//! The parsed raid definitions document.

use std::sync::Arc;

use super::raid::Raid;

/// Scrubber interval used when the document omits `clean-cycle`.
pub const DEFAULT_CLEAN_CYCLE_SECONDS: u32 = 15;

/// Lowest scrubber interval the manager accepts.
pub const MIN_CLEAN_CYCLE_SECONDS: u32 = 5;

/// World-name prefix used when the document omits `raid-world-prefix`.
pub const DEFAULT_RAID_WORLD_PREFIX: &str = "partyraids";

/// Raid definitions plus global settings.
#[derive(Debug, Clone)]
pub struct RaidsConfig {
    raids: Vec<Arc<Raid>>,
    clean_cycle_seconds: u32,
    raid_world_prefix: String,
}

impl Default for RaidsConfig {
    fn default() -> Self {
        Self {
            raids: Vec::new(),
            clean_cycle_seconds: DEFAULT_CLEAN_CYCLE_SECONDS,
            raid_world_prefix: DEFAULT_RAID_WORLD_PREFIX.to_owned(),
        }
    }
}

impl RaidsConfig {
    /// An empty config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the scrubber interval, raising it to the 5 second floor.
    #[must_use]
    pub fn with_clean_cycle_seconds(mut self, seconds: u32) -> Self {
        self.clean_cycle_seconds = seconds.max(MIN_CLEAN_CYCLE_SECONDS);
        self
    }

    /// Sets the raid world prefix.
    #[must_use]
    pub fn with_raid_world_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.raid_world_prefix = prefix.into();
        self
    }

    /// Adds a raid, replacing any existing raid with the same name.
    pub fn add_raid(&mut self, raid: Raid) {
        let raid = Arc::new(raid);
        match self.raids.iter_mut().find(|r| r.name == raid.name) {
            Some(existing) => *existing = raid,
            None => self.raids.push(raid),
        }
    }

    /// Looks up a raid by name.
    #[must_use]
    pub fn raid(&self, name: &str) -> Option<Arc<Raid>> {
        self.raids.iter().find(|r| r.name == name).cloned()
    }

    /// All raids, in document order.
    #[must_use]
    pub fn raids(&self) -> &[Arc<Raid>] {
        &self.raids
    }

    /// Raid names, in document order.
    #[must_use]
    pub fn raid_names(&self) -> Vec<String> {
        self.raids.iter().map(|r| r.name.clone()).collect()
    }

    /// Scrubber interval in seconds (never below 5).
    #[must_use]
    pub fn clean_cycle_seconds(&self) -> u32 {
        self.clean_cycle_seconds
    }

    /// Prefix stamped on every provisioned raid world.
    #[must_use]
    pub fn raid_world_prefix(&self) -> &str {
        &self.raid_world_prefix
    }

    /// Whether `world_name` belongs to a raid world.
    #[must_use]
    pub fn is_raid_world(&self, world_name: &str) -> bool {
        world_name.starts_with(&self.raid_world_prefix)
    }
}
