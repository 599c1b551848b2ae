//! Key/value document repository abstraction.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::RaidsError;

/// Flat string-to-string document as persisted by a [`DocumentStore`].
pub type Document = BTreeMap<String, String>;

/// Repository trait for loading and saving a durable key/value document.
///
/// Implementations replace the whole document on every save; callers own the
/// in-memory copy and treat the store as a mirror of their last good write.
pub trait DocumentStore: Send + Sync {
    /// Loads the document, returning `None` if it has never been written.
    ///
    /// # Errors
    ///
    /// Returns `RaidsError::Io` if the backing store cannot be read and
    /// `RaidsError::Config` if its contents are not a key/value document.
    fn load(&self) -> Result<Option<Document>, RaidsError>;

    /// Replaces the stored document with `document`.
    ///
    /// # Errors
    ///
    /// Returns `RaidsError::Io` if the document cannot be written.
    fn save(&self, document: &Document) -> Result<(), RaidsError>;
}

impl<T: DocumentStore + ?Sized> DocumentStore for Arc<T> {
    fn load(&self) -> Result<Option<Document>, RaidsError> {
        (**self).load()
    }

    fn save(&self, document: &Document) -> Result<(), RaidsError> {
        (**self).save(document)
    }
}
