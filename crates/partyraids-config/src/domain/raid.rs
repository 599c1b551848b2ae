//! A single raid definition.

use partyraids_core::host::Difficulty;
use partyraids_core::location::Point;

/// Countdown used when a definition omits `join-in`.
pub const DEFAULT_JOIN_IN_SECONDS: u32 = 15;

/// Template used when a definition omits `dungeon`.
pub const DEFAULT_DUNGEON: &str = "arena";

/// Placeholder replaced by the provisioned world's name in startup commands.
pub const WORLD_PLACEHOLDER: &str = "@w";

/// Requirements a party must meet before a raid can start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinCriteria {
    /// Minimum number of party members.
    pub minimum_party_size: u32,
    /// Minimum level every member must have.
    pub minimum_level: u32,
}

/// A mob spawned when a raid world is provisioned.
#[derive(Debug, Clone, PartialEq)]
pub struct Mob {
    /// Host entity type name.
    pub entity_type: String,
    /// Spawn coordinate inside the raid world.
    pub point: Point,
}

/// Effects applied to a freshly provisioned raid world.
#[derive(Debug, Clone, PartialEq)]
pub struct RaidSetup {
    /// Whether existing entities are removed before mobs spawn.
    pub clear_mobs: bool,
    /// Mobs to spawn, in definition order.
    pub mobs: Vec<Mob>,
    /// Console commands to run, in definition order.
    pub commands: Vec<String>,
}

impl Default for RaidSetup {
    fn default() -> Self {
        Self {
            clear_mobs: true,
            mobs: Vec::new(),
            commands: Vec::new(),
        }
    }
}

impl RaidSetup {
    /// Startup commands with the world placeholder substituted.
    #[must_use]
    pub fn commands_for(&self, world_name: &str) -> Vec<String> {
        self.commands
            .iter()
            .map(|command| command.replace(WORLD_PLACEHOLDER, world_name))
            .collect()
    }
}

/// A named, configured dungeon experience.
#[derive(Debug, Clone, PartialEq)]
pub struct Raid {
    /// Unique raid name.
    pub name: String,
    /// Dungeon template id the raid world is built from.
    pub dungeon: String,
    /// Where the party lands when the raid starts.
    pub spawn: Point,
    /// Difficulty applied to the raid world.
    pub difficulty: Difficulty,
    /// Countdown between queueing and teleporting, in seconds.
    pub join_in_seconds: u32,
    /// Party requirements.
    pub join_criteria: JoinCriteria,
    /// Startup effects.
    pub setup: RaidSetup,
}

impl Raid {
    /// Creates a raid with default settings for everything but its name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dungeon: DEFAULT_DUNGEON.to_owned(),
            spawn: Point::ORIGIN,
            difficulty: Difficulty::default(),
            join_in_seconds: DEFAULT_JOIN_IN_SECONDS,
            join_criteria: JoinCriteria::default(),
            setup: RaidSetup::default(),
        }
    }
}
