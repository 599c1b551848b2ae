//! Per-player return locations.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use partyraids_core::host::Server;
use partyraids_core::location::WorldLocation;
use partyraids_core::repository::{Document, DocumentStore};
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Remembers where each player stood before being moved into a raid.
///
/// Every mutation is mirrored to the backing store. Store failures are
/// logged and the in-memory map stays authoritative.
pub struct LocationManager {
    entries: Mutex<HashMap<Uuid, WorldLocation>>,
    store: Box<dyn DocumentStore>,
}

impl LocationManager {
    /// Loads stored locations, resolving world names against `server`.
    ///
    /// Entries with a malformed player id, malformed coordinates, or a world
    /// the server does not know are skipped with a warning. A store that
    /// cannot be read yields an empty manager.
    #[must_use]
    pub fn load(store: Box<dyn DocumentStore>, server: &dyn Server) -> Self {
        let document = match store.load() {
            Ok(document) => document.unwrap_or_default(),
            Err(err) => {
                warn!(error = %err, "unable to read stored locations; starting empty");
                Document::new()
            }
        };

        let mut entries = HashMap::with_capacity(document.len());
        for (key, value) in &document {
            let Ok(player_id) = Uuid::parse_str(key) else {
                warn!(key = %key, "skipping location with invalid player id");
                continue;
            };
            match WorldLocation::parse(value, server) {
                Ok(location) => {
                    entries.insert(player_id, location);
                }
                Err(err) => {
                    warn!(player = %player_id, value = %value, error = %err, "skipping stored location");
                }
            }
        }
        debug!(count = entries.len(), "loaded stored locations");

        Self {
            entries: Mutex::new(entries),
            store,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, WorldLocation>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records `location` for `player_id`, replacing any previous entry.
    pub fn store(&self, player_id: Uuid, location: WorldLocation) {
        let snapshot = {
            let mut entries = self.lock();
            entries.insert(player_id, location);
            snapshot(&entries)
        };
        self.persist(&snapshot);
    }

    /// Last stored location for `player_id`.
    #[must_use]
    pub fn get(&self, player_id: Uuid) -> Option<WorldLocation> {
        self.lock().get(&player_id).cloned()
    }

    /// Removes and returns the entry for `player_id`. The store is only
    /// rewritten when something was removed.
    pub fn remove(&self, player_id: Uuid) -> Option<WorldLocation> {
        let (removed, snapshot) = {
            let mut entries = self.lock();
            let removed = entries.remove(&player_id);
            let snapshot = removed.as_ref().map(|_| snapshot(&entries));
            (removed, snapshot)
        };
        if let Some(snapshot) = snapshot {
            self.persist(&snapshot);
        }
        removed
    }

    /// Number of stored locations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no locations are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn persist(&self, document: &Document) {
        if let Err(err) = self.store.save(document) {
            error!(error = %err, "unable to persist player locations");
        }
    }
}

fn snapshot(entries: &HashMap<Uuid, WorldLocation>) -> Document {
    entries
        .iter()
        .map(|(id, location)| (id.to_string(), location.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use partyraids_core::host::World;
    use partyraids_core::location::Point;
    use partyraids_test_support::{
        EmptyDocumentStore, FailingDocumentStore, RecordingDocumentStore, TestServer,
    };
    use tempfile::TempDir;

    use super::*;
    use crate::YamlDocumentStore;

    fn lobby_location(server: &TestServer, point: Point) -> WorldLocation {
        WorldLocation::new(server.add_world("lobby") as Arc<dyn World>, point)
    }

    #[test]
    fn test_load_skips_invalid_entries() {
        // Arrange
        let dir = TempDir::new().unwrap();
        let server = TestServer::new(dir.path());
        server.add_world("lobby");
        let good = Uuid::new_v4();
        let mut document = Document::new();
        document.insert(good.to_string(), "lobby:1.00,2.00,3.00".to_owned());
        document.insert("not-a-uuid".to_owned(), "lobby:1,2,3".to_owned());
        document.insert(Uuid::new_v4().to_string(), "lobby:1,2".to_owned());
        document.insert(Uuid::new_v4().to_string(), "nowhere:1,2,3".to_owned());
        document.insert(Uuid::new_v4().to_string(), "lobby".to_owned());
        let store = RecordingDocumentStore::new(Some(document));

        // Act
        let manager = LocationManager::load(Box::new(store), &server);

        // Assert
        assert_eq!(manager.len(), 1);
        let location = manager.get(good).unwrap();
        assert_eq!(location.to_string(), "lobby:1.00,2.00,3.00");
    }

    #[test]
    fn test_store_persists_every_mutation() {
        let dir = TempDir::new().unwrap();
        let server = TestServer::new(dir.path());
        let store = Arc::new(RecordingDocumentStore::new(None));
        let manager = LocationManager::load(Box::new(Arc::clone(&store)), &server);
        let player = Uuid::new_v4();

        manager.store(player, lobby_location(&server, Point::new(1.0, 2.0, 3.0)));
        manager.store(player, lobby_location(&server, Point::new(4.0, 5.0, 6.0)));

        let saved = store.saved_documents();
        assert_eq!(saved.len(), 2);
        assert_eq!(
            saved[1].get(&player.to_string()).map(String::as_str),
            Some("lobby:4.00,5.00,6.00")
        );
    }

    #[test]
    fn test_remove_persists_only_when_entry_existed() {
        let dir = TempDir::new().unwrap();
        let server = TestServer::new(dir.path());
        let store = Arc::new(RecordingDocumentStore::new(None));
        let manager = LocationManager::load(Box::new(Arc::clone(&store)), &server);
        let player = Uuid::new_v4();
        manager.store(player, lobby_location(&server, Point::ORIGIN));

        assert!(manager.remove(Uuid::new_v4()).is_none());
        assert_eq!(store.saved_documents().len(), 1);

        let removed = manager.remove(player).unwrap();
        assert_eq!(removed.point(), Point::ORIGIN);
        assert_eq!(store.saved_documents().len(), 2);
        assert_eq!(store.last_saved(), Some(Document::new()));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_store_failure_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let server = TestServer::new(dir.path());
        let manager = LocationManager::load(Box::new(FailingDocumentStore), &server);
        let player = Uuid::new_v4();

        manager.store(player, lobby_location(&server, Point::ORIGIN));

        assert!(manager.get(player).is_some());
    }

    #[test]
    fn test_empty_store_starts_empty() {
        let dir = TempDir::new().unwrap();
        let server = TestServer::new(dir.path());

        let manager = LocationManager::load(Box::new(EmptyDocumentStore), &server);

        assert!(manager.is_empty());
    }

    #[test]
    fn test_locations_survive_reload_from_yaml() {
        // Arrange
        let dir = TempDir::new().unwrap();
        let server = TestServer::new(dir.path().join("worlds"));
        let path = dir.path().join("locations.yml");
        let player = Uuid::new_v4();
        let first =
            LocationManager::load(Box::new(YamlDocumentStore::locations(&path)), &server);
        first.store(player, lobby_location(&server, Point::new(-7.25, 70.0, 12.5)));

        // Act
        let second =
            LocationManager::load(Box::new(YamlDocumentStore::locations(&path)), &server);

        // Assert
        assert_eq!(
            second.get(player).map(|l| l.to_string()),
            Some("lobby:-7.25,70.00,12.50".to_owned())
        );
    }
}
