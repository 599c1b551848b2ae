//! Test document stores: mock `DocumentStore` implementations.

use std::io;
use std::sync::Mutex;

use partyraids_core::error::RaidsError;
use partyraids_core::repository::{Document, DocumentStore};

/// A store that serves a fixed document and records every save.
#[derive(Debug, Default)]
pub struct RecordingDocumentStore {
    initial: Option<Document>,
    saved: Mutex<Vec<Document>>,
}

impl RecordingDocumentStore {
    /// Creates a store whose `load` returns `initial`.
    #[must_use]
    pub fn new(initial: Option<Document>) -> Self {
        Self {
            initial,
            saved: Mutex::new(Vec::new()),
        }
    }

    /// Returns every document passed to `save`, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn saved_documents(&self) -> Vec<Document> {
        self.saved.lock().unwrap().clone()
    }

    /// Returns the most recently saved document.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn last_saved(&self) -> Option<Document> {
        self.saved.lock().unwrap().last().cloned()
    }
}

impl DocumentStore for RecordingDocumentStore {
    fn load(&self) -> Result<Option<Document>, RaidsError> {
        Ok(self.initial.clone())
    }

    fn save(&self, document: &Document) -> Result<(), RaidsError> {
        self.saved.lock().unwrap().push(document.clone());
        Ok(())
    }
}

/// A store with no backing document that silently accepts saves.
#[derive(Debug)]
pub struct EmptyDocumentStore;

impl DocumentStore for EmptyDocumentStore {
    fn load(&self) -> Result<Option<Document>, RaidsError> {
        Ok(None)
    }

    fn save(&self, _document: &Document) -> Result<(), RaidsError> {
        Ok(())
    }
}

/// A store whose every operation fails with an I/O error.
#[derive(Debug)]
pub struct FailingDocumentStore;

impl DocumentStore for FailingDocumentStore {
    fn load(&self) -> Result<Option<Document>, RaidsError> {
        Err(RaidsError::io(
            "locations.yml",
            io::Error::new(io::ErrorKind::PermissionDenied, "read-only filesystem"),
        ))
    }

    fn save(&self, _document: &Document) -> Result<(), RaidsError> {
        Err(RaidsError::io(
            "locations.yml",
            io::Error::new(io::ErrorKind::PermissionDenied, "read-only filesystem"),
        ))
    }
}
