//! Filesystem-backed dungeon template repository.
//!
//! Archives are written to a sibling temp file and renamed into place, so a
//! failed package never leaves a truncated template behind.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use partyraids_core::atomic_io::{replace_file, temp_path_for};
use partyraids_core::error::RaidsError;
use tracing::{debug, info, instrument, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::domain::archive::{
    ARCHIVE_EXTENSION, archive_file_name, entry_name, is_excluded_entry, validate_dungeon_id,
};

/// Stores dungeon templates as zip archives in one directory, with an
/// optional read-only directory of bundled templates used as a fallback.
#[derive(Debug, Clone)]
pub struct DungeonRepository {
    dir: PathBuf,
    bundled_dir: Option<PathBuf>,
}

impl DungeonRepository {
    /// Creates a repository over `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, bundled_dir: Option<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            bundled_dir,
        }
    }

    /// Directory holding the archives.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the archive for `dungeon_id`, whether or not it exists.
    #[must_use]
    pub fn archive_path(&self, dungeon_id: &str) -> PathBuf {
        self.dir.join(archive_file_name(dungeon_id))
    }

    /// Whether an archive for `dungeon_id` is present in the repository.
    #[must_use]
    pub fn contains(&self, dungeon_id: &str) -> bool {
        self.archive_path(dungeon_id).is_file()
    }

    /// Ids of the stored templates, sorted.
    ///
    /// # Errors
    ///
    /// Returns `RaidsError::Io` if the directory exists but cannot be listed.
    pub fn available(&self) -> Result<Vec<String>, RaidsError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(RaidsError::io(
                    format!("listing {}", self.dir.display()),
                    e,
                ));
            }
        };

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| RaidsError::io(format!("listing {}", self.dir.display()), e))?
                .path();
            let is_archive = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION));
            if !is_archive || !path.is_file() {
                continue;
            }
            if let Some(stem) = path.file_stem() {
                ids.push(stem.to_string_lossy().into_owned());
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Zips the tree under `source_dir` as template `dungeon_id`.
    ///
    /// # Errors
    ///
    /// Returns `RaidsError::Conflict` if the template exists and `force` is
    /// false, `RaidsError::NotFound` if `source_dir` is not a directory,
    /// `RaidsError::Format` for an unusable id, and `RaidsError::Io` if the
    /// archive cannot be written.
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    pub fn package(
        &self,
        source_dir: &Path,
        dungeon_id: &str,
        force: bool,
    ) -> Result<PathBuf, RaidsError> {
        validate_dungeon_id(dungeon_id)?;
        let archive = self.archive_path(dungeon_id);
        if archive.exists() && !force {
            return Err(RaidsError::Conflict(format!(
                "Dungeon {dungeon_id} already exists"
            )));
        }
        if !source_dir.is_dir() {
            return Err(RaidsError::NotFound(format!(
                "world folder {}",
                source_dir.display()
            )));
        }

        fs::create_dir_all(&self.dir)
            .map_err(|e| RaidsError::io(format!("creating {}", self.dir.display()), e))?;

        let tmp = temp_path_for(&archive);
        let written = write_archive(source_dir, &tmp).and_then(|entries| {
            replace_file(&tmp, &archive)
                .map_err(|e| RaidsError::io(format!("writing {}", archive.display()), e))?;
            Ok(entries)
        });
        let entries = match written {
            Ok(entries) => entries,
            Err(err) => {
                if let Err(cleanup) = fs::remove_file(&tmp) {
                    debug!(error = %cleanup, "no temporary archive to clean up");
                }
                return Err(err);
            }
        };

        info!(dungeon = %dungeon_id, entries, "packaged dungeon template");
        Ok(archive)
    }

    /// Extracts template `dungeon_id` into `world_dir`, skipping host-owned
    /// per-world files. Returns the number of entries written.
    ///
    /// # Errors
    ///
    /// Returns `RaidsError::NotFound` if neither the repository nor the
    /// bundled directory holds the template, `RaidsError::Format` if the
    /// archive is corrupt, and `RaidsError::Io` on filesystem failures.
    #[instrument(skip(self))]
    pub fn materialize(&self, dungeon_id: &str, world_dir: &Path) -> Result<usize, RaidsError> {
        let archive_path = self.stage(dungeon_id)?;
        let file = File::open(&archive_path)
            .map_err(|e| RaidsError::io(format!("opening {}", archive_path.display()), e))?;
        let mut archive =
            ZipArchive::new(file).map_err(|e| zip_error(&archive_path, e))?;

        fs::create_dir_all(world_dir)
            .map_err(|e| RaidsError::io(format!("creating {}", world_dir.display()), e))?;

        let mut written = 0;
        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .map_err(|e| zip_error(&archive_path, e))?;
            if is_excluded_entry(entry.name()) {
                debug!(entry = entry.name(), "skipping per-world file");
                continue;
            }
            let Some(relative) = entry.enclosed_name() else {
                warn!(entry = entry.name(), "skipping archive entry outside world root");
                continue;
            };
            let target = world_dir.join(relative);

            if entry.is_dir() {
                fs::create_dir_all(&target)
                    .map_err(|e| RaidsError::io(format!("creating {}", target.display()), e))?;
            } else {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).map_err(|e| {
                        RaidsError::io(format!("creating {}", parent.display()), e)
                    })?;
                }
                let mut out = File::create(&target)
                    .map_err(|e| RaidsError::io(format!("creating {}", target.display()), e))?;
                io::copy(&mut entry, &mut out)
                    .map_err(|e| RaidsError::io(format!("extracting {}", target.display()), e))?;
            }
            written += 1;
        }

        info!(dungeon = %dungeon_id, world_dir = %world_dir.display(), entries = written, "materialized dungeon template");
        Ok(written)
    }

    /// Ensures the archive for `dungeon_id` is in the repository, copying it
    /// in from the bundled directory when missing.
    fn stage(&self, dungeon_id: &str) -> Result<PathBuf, RaidsError> {
        validate_dungeon_id(dungeon_id)?;
        let archive = self.archive_path(dungeon_id);
        if archive.is_file() {
            return Ok(archive);
        }

        let bundled = self
            .bundled_dir
            .as_ref()
            .map(|dir| dir.join(archive_file_name(dungeon_id)))
            .filter(|path| path.is_file())
            .ok_or_else(|| RaidsError::NotFound(format!("dungeon {dungeon_id}")))?;

        fs::create_dir_all(&self.dir)
            .map_err(|e| RaidsError::io(format!("creating {}", self.dir.display()), e))?;
        fs::copy(&bundled, &archive)
            .map_err(|e| RaidsError::io(format!("staging {}", bundled.display()), e))?;
        info!(dungeon = %dungeon_id, from = %bundled.display(), "staged bundled dungeon template");
        Ok(archive)
    }
}

fn write_archive(source_dir: &Path, target: &Path) -> Result<usize, RaidsError> {
    let file = File::create(target)
        .map_err(|e| RaidsError::io(format!("creating {}", target.display()), e))?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries = 0;
    add_tree(&mut writer, options, source_dir, Path::new(""), &mut entries)
        .map_err(|e| zip_error(target, e))?;
    writer.finish().map_err(|e| zip_error(target, e))?;
    Ok(entries)
}

fn add_tree(
    writer: &mut ZipWriter<File>,
    options: SimpleFileOptions,
    dir: &Path,
    relative: &Path,
    entries: &mut usize,
) -> zip::result::ZipResult<()> {
    let mut children = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    children.sort();

    for path in children {
        let Some(file_name) = path.file_name() else {
            continue;
        };
        let child = relative.join(file_name);
        if path.is_dir() {
            writer.add_directory(entry_name(&child, true), options)?;
            *entries += 1;
            add_tree(writer, options, &path, &child, entries)?;
        } else {
            writer.start_file(entry_name(&child, false), options)?;
            let mut source = File::open(&path)?;
            io::copy(&mut source, writer)?;
            *entries += 1;
        }
    }
    Ok(())
}

fn zip_error(archive: &Path, err: zip::result::ZipError) -> RaidsError {
    match err {
        zip::result::ZipError::Io(source) => {
            RaidsError::io(format!("archive {}", archive.display()), source)
        }
        other => RaidsError::Format(format!("archive {}: {other}", archive.display())),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use tempfile::TempDir;

    use super::*;

    fn world_tree(root: &Path) {
        fs::create_dir_all(root.join("region")).unwrap();
        fs::create_dir_all(root.join("data")).unwrap();
        fs::write(root.join("level.dat"), b"level").unwrap();
        fs::write(root.join("uid.dat"), b"uid").unwrap();
        fs::write(root.join("session.lock"), b"lock").unwrap();
        fs::write(root.join("region").join("r.0.0.mca"), b"chunks").unwrap();
    }

    fn entry_names(archive: &Path) -> Vec<String> {
        let mut zip = ZipArchive::new(File::open(archive).unwrap()).unwrap();
        (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_owned())
            .collect()
    }

    #[test]
    fn test_package_writes_tree_with_directory_entries() {
        // Arrange
        let dir = TempDir::new().unwrap();
        let world = dir.path().join("world");
        world_tree(&world);
        let repo = DungeonRepository::new(dir.path().join("dungeons"), None);

        // Act
        let archive = repo.package(&world, "arena", false).unwrap();

        // Assert
        assert_eq!(archive, dir.path().join("dungeons").join("arena.zip"));
        let names = entry_names(&archive);
        assert!(names.contains(&"data/".to_owned()));
        assert!(names.contains(&"region/".to_owned()));
        assert!(names.contains(&"region/r.0.0.mca".to_owned()));
        assert!(names.contains(&"level.dat".to_owned()));
        assert!(names.contains(&"uid.dat".to_owned()));
        assert!(!dir.path().join("dungeons").join("arena.zip.tmp").exists());
    }

    #[test]
    fn test_package_conflicts_unless_forced() {
        let dir = TempDir::new().unwrap();
        let world = dir.path().join("world");
        world_tree(&world);
        let repo = DungeonRepository::new(dir.path().join("dungeons"), None);
        repo.package(&world, "arena", false).unwrap();
        fs::write(world.join("extra.dat"), b"new").unwrap();

        match repo.package(&world, "arena", false).unwrap_err() {
            RaidsError::Conflict(msg) => assert_eq!(msg, "Dungeon arena already exists"),
            other => panic!("expected Conflict, got {other:?}"),
        }
        assert!(!entry_names(&repo.archive_path("arena")).contains(&"extra.dat".to_owned()));

        repo.package(&world, "arena", true).unwrap();
        assert!(entry_names(&repo.archive_path("arena")).contains(&"extra.dat".to_owned()));
    }

    #[test]
    fn test_package_missing_source_is_not_found() {
        let dir = TempDir::new().unwrap();
        let repo = DungeonRepository::new(dir.path().join("dungeons"), None);

        let result = repo.package(&dir.path().join("missing"), "arena", false);

        assert!(matches!(result, Err(RaidsError::NotFound(_))));
    }

    #[test]
    fn test_materialize_skips_per_world_files() {
        // Arrange
        let dir = TempDir::new().unwrap();
        let world = dir.path().join("world");
        world_tree(&world);
        let repo = DungeonRepository::new(dir.path().join("dungeons"), None);
        repo.package(&world, "arena", false).unwrap();
        let target = dir.path().join("partyraids_copy");

        // Act
        let written = repo.materialize("arena", &target).unwrap();

        // Assert
        assert_eq!(written, 4);
        assert!(target.join("level.dat").is_file());
        assert!(target.join("data").is_dir());
        assert!(!target.join("uid.dat").exists());
        assert!(!target.join("session.lock").exists());
        let mut chunks = String::new();
        File::open(target.join("region").join("r.0.0.mca"))
            .unwrap()
            .read_to_string(&mut chunks)
            .unwrap();
        assert_eq!(chunks, "chunks");
    }

    #[test]
    fn test_materialize_stages_bundled_template() {
        let dir = TempDir::new().unwrap();
        let world = dir.path().join("world");
        world_tree(&world);
        let bundled = DungeonRepository::new(dir.path().join("bundled"), None);
        bundled.package(&world, "arena", false).unwrap();
        let repo =
            DungeonRepository::new(dir.path().join("dungeons"), Some(dir.path().join("bundled")));
        assert!(!repo.contains("arena"));

        repo.materialize("arena", &dir.path().join("copy")).unwrap();

        assert!(repo.contains("arena"));
        assert_eq!(repo.available().unwrap(), vec!["arena"]);
    }

    #[test]
    fn test_materialize_unknown_template_is_not_found() {
        let dir = TempDir::new().unwrap();
        let repo =
            DungeonRepository::new(dir.path().join("dungeons"), Some(dir.path().join("bundled")));

        match repo.materialize("crypt", &dir.path().join("copy")).unwrap_err() {
            RaidsError::NotFound(msg) => assert_eq!(msg, "dungeon crypt"),
            other => panic!("expected NotFound, got {other:?}"),
        }
        assert!(!dir.path().join("copy").exists());
    }

    #[test]
    fn test_materialize_corrupt_archive_is_format_error() {
        let dir = TempDir::new().unwrap();
        let repo = DungeonRepository::new(dir.path().join("dungeons"), None);
        fs::create_dir_all(repo.dir()).unwrap();
        fs::write(repo.archive_path("broken"), b"not a zip").unwrap();

        let result = repo.materialize("broken", &dir.path().join("copy"));

        assert!(matches!(result, Err(RaidsError::Format(_))));
    }

    #[test]
    fn test_available_lists_sorted_archive_stems() {
        let dir = TempDir::new().unwrap();
        let repo = DungeonRepository::new(dir.path(), None);
        fs::write(dir.path().join("crypt.zip"), b"").unwrap();
        fs::write(dir.path().join("arena.zip"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();
        fs::create_dir(dir.path().join("folder.zip")).unwrap();

        assert_eq!(repo.available().unwrap(), vec!["arena", "crypt"]);
    }

    #[test]
    fn test_available_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let repo = DungeonRepository::new(dir.path().join("absent"), None);

        assert!(repo.available().unwrap().is_empty());
    }
}
