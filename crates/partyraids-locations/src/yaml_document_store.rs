//! YAML-file implementation of the `DocumentStore` trait.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use partyraids_core::atomic_io::write_bytes_atomic;
use partyraids_core::error::RaidsError;
use partyraids_core::repository::{Document, DocumentStore};
use serde_yaml::{Mapping, Value};
use tracing::warn;

/// Top-level key holding the player location entries.
pub const LOCATIONS_SECTION: &str = "locations";

/// Stores a flat key/value document as one named section of a YAML file.
#[derive(Debug, Clone)]
pub struct YamlDocumentStore {
    path: PathBuf,
    section: String,
}

impl YamlDocumentStore {
    /// Creates a store for `section` inside the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, section: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            section: section.into(),
        }
    }

    /// Creates the store for the `locations` section.
    #[must_use]
    pub fn locations(path: impl Into<PathBuf>) -> Self {
        Self::new(path, LOCATIONS_SECTION)
    }

    /// Backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentStore for YamlDocumentStore {
    fn load(&self) -> Result<Option<Document>, RaidsError> {
        let source = match fs::read_to_string(&self.path) {
            Ok(source) => source,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(RaidsError::io(
                    format!("reading {}", self.path.display()),
                    e,
                ));
            }
        };

        let root: Value = serde_yaml::from_str(&source).map_err(|e| {
            RaidsError::Config(format!("malformed document {}: {e}", self.path.display()))
        })?;

        let section = match root {
            Value::Null => return Ok(Some(Document::new())),
            Value::Mapping(mut root) => root.remove(self.section.as_str()),
            _ => {
                return Err(RaidsError::Config(format!(
                    "document {} is not a mapping",
                    self.path.display()
                )));
            }
        };

        let mut document = Document::new();
        let Some(Value::Mapping(entries)) = section else {
            return Ok(Some(document));
        };
        for (key, value) in entries {
            match (scalar(&key), scalar(&value)) {
                (Some(key), Some(value)) => {
                    document.insert(key, value);
                }
                _ => warn!(
                    path = %self.path.display(),
                    key = ?key,
                    "skipping non-scalar document entry"
                ),
            }
        }
        Ok(Some(document))
    }

    fn save(&self, document: &Document) -> Result<(), RaidsError> {
        let entries: Mapping = document
            .iter()
            .map(|(k, v)| (Value::String(k.clone()), Value::String(v.clone())))
            .collect();
        let mut root = Mapping::new();
        root.insert(Value::String(self.section.clone()), Value::Mapping(entries));

        let yaml = serde_yaml::to_string(&root)
            .map_err(|e| RaidsError::Config(format!("serializing {}: {e}", self.section)))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| RaidsError::io(format!("creating {}", parent.display()), e))?;
        }
        write_bytes_atomic(&self.path, yaml.as_bytes())
            .map_err(|e| RaidsError::io(format!("writing {}", self.path.display()), e))
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
