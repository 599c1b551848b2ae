//! YAML parsing for the raid definitions document.
//!
//! Global keys fall back to their defaults when absent or mistyped. Each raid
//! section is deserialized on its own, so a malformed raid is logged and
//! skipped while the rest of the document still loads.

use std::fs;
use std::path::Path;

use partyraids_core::error::RaidsError;
use partyraids_core::host::Difficulty;
use partyraids_core::location::Point;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use tracing::{debug, error, warn};

use crate::domain::raid::{
    DEFAULT_DUNGEON, DEFAULT_JOIN_IN_SECONDS, JoinCriteria, Mob, Raid, RaidSetup,
};
use crate::domain::raids_config::{
    DEFAULT_CLEAN_CYCLE_SECONDS, DEFAULT_RAID_WORLD_PREFIX, RaidsConfig,
};

/// Definitions document written on first start when none exists.
pub const DEFAULT_CONFIG_YAML: &str = include_str!("../../resources/config.yml");

const CLEAN_CYCLE_KEY: &str = "clean-cycle";
const PREFIX_KEY: &str = "raid-world-prefix";
const RAIDS_KEY: &str = "raids";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawRaid {
    #[serde(default = "default_dungeon")]
    dungeon: String,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default = "default_join_in")]
    join_in: u32,
    #[serde(default)]
    spawn_location: Option<String>,
    #[serde(default)]
    join_criteria: Option<RawJoinCriteria>,
    #[serde(default)]
    on_startup: Option<RawSetup>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawJoinCriteria {
    #[serde(default)]
    minimum_rank: u32,
    #[serde(default)]
    minimum_party_size: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawSetup {
    #[serde(default = "default_clear_mobs")]
    clear_mobs: bool,
    #[serde(default)]
    commands: Vec<String>,
    #[serde(default)]
    mobs: Option<Mapping>,
}

#[derive(Debug, Deserialize)]
struct RawMob {
    #[serde(rename = "type")]
    entity_type: String,
    location: String,
}

fn default_dungeon() -> String {
    DEFAULT_DUNGEON.to_owned()
}

fn default_join_in() -> u32 {
    DEFAULT_JOIN_IN_SECONDS
}

fn default_clear_mobs() -> bool {
    true
}

/// Reads and parses the definitions document at `path`.
///
/// # Errors
///
/// Returns `RaidsError::Io` if the file cannot be read and
/// `RaidsError::Config` if it is not a YAML mapping.
pub fn load_raids_config(path: &Path) -> Result<RaidsConfig, RaidsError> {
    let source = fs::read_to_string(path).map_err(|e| {
        RaidsError::io(
            format!("unable to read raid definitions {}", path.display()),
            e,
        )
    })?;
    parse_raids_config(&source)
}

/// Parses a definitions document.
///
/// # Errors
///
/// Returns `RaidsError::Config` if the document is not valid YAML or its top
/// level is not a mapping. Problems inside individual raids are logged and
/// the raid is skipped.
pub fn parse_raids_config(source: &str) -> Result<RaidsConfig, RaidsError> {
    let document: Value = serde_yaml::from_str(source)
        .map_err(|e| RaidsError::Config(format!("malformed raid definitions: {e}")))?;

    let root = match document {
        Value::Null => Mapping::new(),
        Value::Mapping(mapping) => mapping,
        other => {
            return Err(RaidsError::Config(format!(
                "raid definitions must be a mapping, found {}",
                describe(&other)
            )));
        }
    };

    let mut config = RaidsConfig::new()
        .with_clean_cycle_seconds(clean_cycle(&root))
        .with_raid_world_prefix(raid_world_prefix(&root));

    match root.get(RAIDS_KEY) {
        Some(Value::Mapping(sections)) => {
            for (key, section) in sections {
                let Some(name) = section_name(key) else {
                    warn!(key = ?key, "skipping raid with a non-scalar name");
                    continue;
                };

                match parse_raid(&name, section) {
                    Ok(raid) => {
                        debug!(raid = %name, dungeon = %raid.dungeon, "loaded raid");
                        config.add_raid(raid);
                    }
                    Err(err) => error!(raid = %name, error = %err, "unable to load raid"),
                }
            }
        }
        Some(Value::Null) | None => warn!("raid definitions contain no raids section"),
        Some(other) => warn!(
            found = describe(other),
            "raids section is not a mapping; no raids loaded"
        ),
    }

    Ok(config)
}

fn clean_cycle(root: &Mapping) -> u32 {
    match root.get(CLEAN_CYCLE_KEY) {
        None | Some(Value::Null) => DEFAULT_CLEAN_CYCLE_SECONDS,
        Some(Value::Number(n)) => match (n.as_u64(), n.as_i64()) {
            (Some(seconds), _) => u32::try_from(seconds).unwrap_or(u32::MAX),
            (None, Some(_)) => 0,
            (None, None) => {
                warn!(value = %n, "clean-cycle must be a whole number of seconds");
                DEFAULT_CLEAN_CYCLE_SECONDS
            }
        },
        Some(other) => {
            warn!(found = describe(other), "clean-cycle must be a number");
            DEFAULT_CLEAN_CYCLE_SECONDS
        }
    }
}

fn raid_world_prefix(root: &Mapping) -> String {
    match root.get(PREFIX_KEY) {
        Some(Value::String(prefix)) if !prefix.trim().is_empty() => prefix.trim().to_owned(),
        None | Some(Value::Null) => DEFAULT_RAID_WORLD_PREFIX.to_owned(),
        Some(other) => {
            warn!(
                found = describe(other),
                "raid-world-prefix must be a non-empty string"
            );
            DEFAULT_RAID_WORLD_PREFIX.to_owned()
        }
    }
}

fn section_name(key: &Value) -> Option<String> {
    match key {
        Value::String(name) => Some(name.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_raid(name: &str, section: &Value) -> Result<Raid, RaidsError> {
    let raw: RawRaid = serde_yaml::from_value(section.clone())
        .map_err(|e| RaidsError::Config(format!("raid {name}: {e}")))?;

    let mut raid = Raid::new(name);
    raid.dungeon = raw.dungeon;
    raid.join_in_seconds = raw.join_in;

    if let Some(difficulty) = raw.difficulty {
        raid.difficulty = difficulty.parse::<Difficulty>()?;
    }

    if let Some(spawn) = raw.spawn_location {
        raid.spawn = Point::parse(&spawn)?;
    }

    if let Some(criteria) = raw.join_criteria {
        raid.join_criteria = JoinCriteria {
            minimum_party_size: criteria.minimum_party_size,
            minimum_level: criteria.minimum_rank,
        };
    }

    if let Some(setup) = raw.on_startup {
        raid.setup = RaidSetup {
            clear_mobs: setup.clear_mobs,
            mobs: parse_mobs(name, setup.mobs.unwrap_or_default())?,
            commands: setup.commands,
        };
    }

    Ok(raid)
}

fn parse_mobs(raid_name: &str, mobs: Mapping) -> Result<Vec<Mob>, RaidsError> {
    mobs.into_iter()
        .map(|(key, value)| {
            let raw: RawMob = serde_yaml::from_value(value).map_err(|e| {
                RaidsError::Config(format!("raid {raid_name}, mob {key:?}: {e}"))
            })?;
            Ok(Mob {
                entity_type: raw.entity_type,
                point: Point::parse(&raw.location)?,
            })
        })
        .collect()
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
