//! Naming rules for template archives and their entries.

use std::path::{Component, Path};

use partyraids_core::error::RaidsError;

/// File extension of a template archive.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Entries whose names end with one of these are host-owned per-world state
/// and are never extracted into a new world.
pub const EXCLUDED_ENTRY_SUFFIXES: [&str; 2] = ["uid.dat", "session.lock"];

/// Whether an archive entry must be skipped during extraction.
#[must_use]
pub fn is_excluded_entry(name: &str) -> bool {
    EXCLUDED_ENTRY_SUFFIXES
        .iter()
        .any(|suffix| name.ends_with(suffix))
}

/// Archive file name for a dungeon id.
#[must_use]
pub fn archive_file_name(dungeon_id: &str) -> String {
    format!("{dungeon_id}.{ARCHIVE_EXTENSION}")
}

/// Rejects ids that would escape the dungeon directory.
///
/// # Errors
///
/// Returns `RaidsError::Format` if the id is empty, contains a path
/// separator, or starts with a dot.
pub fn validate_dungeon_id(dungeon_id: &str) -> Result<(), RaidsError> {
    let invalid = dungeon_id.trim().is_empty()
        || dungeon_id.starts_with('.')
        || dungeon_id.contains(['/', '\\', ':']);
    if invalid {
        return Err(RaidsError::Format(format!(
            "invalid dungeon name \"{dungeon_id}\""
        )));
    }
    Ok(())
}

/// Archive entry name for a path relative to the world root. Separators are
/// always `/` and directory entries carry a trailing `/`.
#[must_use]
pub fn entry_name(relative: &Path, is_dir: bool) -> String {
    let mut name = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");
    if is_dir {
        name.push('/');
    }
    name
}
