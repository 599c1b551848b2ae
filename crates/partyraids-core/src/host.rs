//! Capability contracts for the game host.
//!
//! The orchestrator never reaches into a concrete server. Everything it needs
//! from the host (worlds, players, parties, scheduling, console commands) is
//! expressed by the traits in this module and injected at construction time.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::RaidsError;
use crate::location::{Point, WorldLocation};

/// Host scheduler ticks per wall-clock second.
pub const TICKS_PER_SECOND: u64 = 20;

/// Converts whole seconds into host ticks.
#[must_use]
pub fn seconds_to_ticks(seconds: u32) -> u64 {
    u64::from(seconds) * TICKS_PER_SECOND
}

/// A deferred unit of work handed to the host scheduler.
pub type ScheduledTask = Box<dyn FnOnce() + Send + 'static>;

/// World difficulty levels understood by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Difficulty {
    /// No hostile mobs.
    Peaceful,
    /// Reduced damage.
    Easy,
    /// The host default.
    #[default]
    Normal,
    /// Increased damage.
    Hard,
}

impl Difficulty {
    /// Lowercase name as used in raid definitions.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Peaceful => "peaceful",
            Self::Easy => "easy",
            Self::Normal => "normal",
            Self::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = RaidsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "peaceful" => Ok(Self::Peaceful),
            "easy" => Ok(Self::Easy),
            "normal" => Ok(Self::Normal),
            "hard" => Ok(Self::Hard),
            other => Err(RaidsError::Format(format!("unknown difficulty \"{other}\""))),
        }
    }
}

/// Anything that can receive a text message.
pub trait MessageReceiver: Send + Sync {
    /// Delivers a message to the receiver.
    fn send_message(&self, message: &str);
}

/// A connected player.
pub trait Player: MessageReceiver {
    /// Stable player identifier.
    fn id(&self) -> Uuid;

    /// Display name, also used for console lookups.
    fn name(&self) -> String;

    /// Current position.
    fn location(&self) -> WorldLocation;

    /// Moves the player.
    fn teleport(&self, location: &WorldLocation);

    /// The world the player currently occupies.
    fn world(&self) -> Arc<dyn World>;

    /// Experience level, used by join criteria.
    fn level(&self) -> u32;
}

/// A loaded world.
pub trait World: Send + Sync {
    /// Unique world name.
    fn name(&self) -> String;

    /// On-disk directory holding the world's data.
    fn folder(&self) -> PathBuf;

    /// Current spawn point.
    fn spawn_point(&self) -> Point;

    /// Replaces the spawn point.
    fn set_spawn_point(&self, point: Point);

    /// Players currently inside the world.
    fn players(&self) -> Vec<Arc<dyn Player>>;

    /// Applies a difficulty level.
    fn set_difficulty(&self, difficulty: Difficulty);

    /// Spawns an entity of the named type at `point`.
    ///
    /// # Errors
    ///
    /// Returns `RaidsError::NotFound` if the host does not know the type.
    fn spawn_entity(&self, entity_type: &str, point: Point) -> Result<(), RaidsError>;

    /// Removes every non-player entity.
    fn clear_entities(&self);
}

/// The host server.
pub trait Server: Send + Sync {
    /// Looks up a loaded world by name.
    fn world(&self, name: &str) -> Option<Arc<dyn World>>;

    /// All loaded worlds.
    fn worlds(&self) -> Vec<Arc<dyn World>>;

    /// Loads (creating if necessary) the world stored in
    /// `world_container()/name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the host cannot load the world.
    fn create_world(&self, name: &str) -> Result<Arc<dyn World>, RaidsError>;

    /// Unloads a world, returning `false` if it was not loaded or refused.
    fn unload_world(&self, name: &str) -> bool;

    /// Looks up an online player by name.
    fn player(&self, name: &str) -> Option<Arc<dyn Player>>;

    /// Looks up an online player by id.
    fn player_by_id(&self, id: Uuid) -> Option<Arc<dyn Player>>;

    /// Directory under which world folders live.
    fn world_container(&self) -> PathBuf;

    /// Runs `task` once after `delay_ticks` host ticks. Armed tasks cannot
    /// be revoked.
    fn schedule_once(&self, delay_ticks: u64, task: ScheduledTask);

    /// Executes a console command.
    fn dispatch_command(&self, command: &str);
}

/// A group of players that raid together.
pub trait Party: Send + Sync {
    /// Stable party identifier.
    fn id(&self) -> Uuid;

    /// Display name.
    fn name(&self) -> String;

    /// Member player ids.
    fn members(&self) -> Vec<Uuid>;

    /// Sends a message to every online member.
    fn broadcast(&self, message: &str);
}

/// Party membership lookups.
pub trait PartyService: Send + Sync {
    /// Looks up a party by id.
    fn party(&self, party_id: Uuid) -> Option<Arc<dyn Party>>;

    /// The party the player belongs to, if any.
    fn party_for_player(&self, player_id: Uuid) -> Option<Uuid>;
}

/// The originator of a command.
#[derive(Clone)]
pub enum CommandSender {
    /// An in-game player.
    Player(Arc<dyn Player>),
    /// The server console or another non-player source.
    Console(Arc<dyn MessageReceiver>),
}

impl CommandSender {
    /// Returns the player if the sender is one.
    #[must_use]
    pub fn as_player(&self) -> Option<&Arc<dyn Player>> {
        match self {
            Self::Player(player) => Some(player),
            Self::Console(_) => None,
        }
    }
}

impl MessageReceiver for CommandSender {
    fn send_message(&self, message: &str) {
        match self {
            Self::Player(player) => player.send_message(message),
            Self::Console(console) => console.send_message(message),
        }
    }
}
