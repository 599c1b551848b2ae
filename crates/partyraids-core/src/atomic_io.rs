//! Filesystem helpers shared by the template archive and document stores.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Writes `bytes` to a sibling temp file, then renames it over `path`.
///
/// # Errors
///
/// Returns the underlying I/O error; the temp file is removed on failure.
pub fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = temp_path_for(path);
    fs::write(&tmp_path, bytes)?;
    replace_file(&tmp_path, path)
}

/// Renames `tmp_path` over `final_path`, removing any existing file first.
///
/// # Errors
///
/// Returns the underlying I/O error; `tmp_path` is removed on failure.
pub fn replace_file(tmp_path: &Path, final_path: &Path) -> io::Result<()> {
    match fs::remove_file(final_path) {
        Ok(()) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => {
            let _ = fs::remove_file(tmp_path);
            return Err(error);
        }
    }

    if let Err(error) = fs::rename(tmp_path, final_path) {
        let _ = fs::remove_file(tmp_path);
        return Err(error);
    }
    Ok(())
}

/// Sibling path used for staging writes to `path`.
#[must_use]
pub fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("partyraids");
    let tmp_name = format!("{file_name}.tmp");
    match path.parent() {
        Some(parent) => parent.join(tmp_name),
        None => PathBuf::from(tmp_name),
    }
}

/// Recursively deletes a file or directory tree. A missing path is not an
/// error.
///
/// # Errors
///
/// Returns the underlying I/O error for anything other than `NotFound`.
pub fn remove_tree(path: &Path) -> io::Result<()> {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match result {
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_write_bytes_atomic_replaces_existing_file() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("nested").join("doc.yml");

        write_bytes_atomic(&path, b"first").expect("first write");
        write_bytes_atomic(&path, b"second").expect("second write");

        assert_eq!(fs::read(&path).expect("read"), b"second");
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn test_remove_tree_deletes_nested_directories() {
        let temp = TempDir::new().expect("tempdir");
        let root = temp.path().join("world");
        fs::create_dir_all(root.join("region")).expect("mkdir");
        fs::write(root.join("region").join("r.0.0.mca"), b"data").expect("write");

        remove_tree(&root).expect("remove");

        assert!(!root.exists());
    }

    #[test]
    fn test_remove_tree_ignores_missing_paths() {
        let temp = TempDir::new().expect("tempdir");

        remove_tree(&temp.path().join("absent")).expect("missing path is fine");
    }
}
