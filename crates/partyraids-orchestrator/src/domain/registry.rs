//! The set of worlds currently owned by the orchestrator.
//!
//! Every public operation takes the lock once and completes before
//! returning, so a lookup and the mutation that depends on it never
//! interleave with another caller. Entries handed out are snapshots.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use partyraids_core::error::RaidsError;
use uuid::Uuid;

use super::managed_world::{ManagedWorld, RaidState};

/// Mutex-guarded list of managed worlds, in registration order.
#[derive(Debug, Default)]
pub struct ManagedWorldRegistry {
    entries: Mutex<Vec<ManagedWorld>>,
}

impl ManagedWorldRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ManagedWorld>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a template world.
    pub fn register(&self, entry: ManagedWorld) {
        self.lock().push(entry);
    }

    /// Adds a raid world unless its party already has an active raid.
    ///
    /// # Errors
    ///
    /// Returns `RaidsError::Conflict` if the party already has a non-expired
    /// raid entry.
    pub fn register_raid(&self, entry: ManagedWorld, now: DateTime<Utc>) -> Result<(), RaidsError> {
        let mut entries = self.lock();
        if let Some(party_id) = entry.party_id() {
            if find_active_raid(&entries, party_id, now).is_some() {
                return Err(RaidsError::Conflict(
                    "Your party already has an active raid".to_owned(),
                ));
            }
        }
        entries.push(entry);
        Ok(())
    }

    /// The party's non-expired raid entry.
    #[must_use]
    pub fn raid_by_party(&self, party_id: Uuid, now: DateTime<Utc>) -> Option<ManagedWorld> {
        let entries = self.lock();
        find_active_raid(&entries, party_id, now).map(|i| entries[i].clone())
    }

    /// Cancels the party's raid if it is still queued.
    #[must_use]
    pub fn cancel_queued(&self, party_id: Uuid, now: DateTime<Utc>) -> Option<ManagedWorld> {
        self.transition_queued(party_id, None, now, ManagedWorld::cancel)
    }

    /// Starts the party's raid if it is still queued in `world_name`.
    #[must_use]
    pub fn start_queued(
        &self,
        party_id: Uuid,
        world_name: &str,
        now: DateTime<Utc>,
    ) -> Option<ManagedWorld> {
        self.transition_queued(party_id, Some(world_name), now, ManagedWorld::start)
    }

    fn transition_queued(
        &self,
        party_id: Uuid,
        world_name: Option<&str>,
        now: DateTime<Utc>,
        apply: fn(&mut ManagedWorld) -> Result<(), RaidsError>,
    ) -> Option<ManagedWorld> {
        let mut entries = self.lock();
        let index = find_active_raid(&entries, party_id, now)?;
        let entry = &mut entries[index];
        if entry.state() != Some(RaidState::Queued) {
            return None;
        }
        if world_name.is_some_and(|name| name != entry.name()) {
            return None;
        }
        apply(entry).ok()?;
        Some(entry.clone())
    }

    /// Drops expired entries and returns them.
    pub fn remove_expired(&self, now: DateTime<Utc>) -> Vec<ManagedWorld> {
        let mut entries = self.lock();
        let (expired, kept): (Vec<_>, Vec<_>) =
            entries.drain(..).partition(|entry| entry.is_expired(now));
        *entries = kept;
        expired
    }

    /// Names of all registered worlds.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.lock().iter().map(ManagedWorld::name).collect()
    }

    /// Looks up an entry by world name.
    #[must_use]
    pub fn get(&self, world_name: &str) -> Option<ManagedWorld> {
        self.lock()
            .iter()
            .find(|entry| entry.name() == world_name)
            .cloned()
    }

    /// All template-edit entries.
    #[must_use]
    pub fn editable_templates(&self) -> Vec<ManagedWorld> {
        self.lock()
            .iter()
            .filter(|entry| entry.template_id().is_some())
            .cloned()
            .collect()
    }

    /// Removes every entry and returns them.
    pub fn clear(&self) -> Vec<ManagedWorld> {
        std::mem::take(&mut *self.lock())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

fn find_active_raid(entries: &[ManagedWorld], party_id: Uuid, now: DateTime<Utc>) -> Option<usize> {
    entries
        .iter()
        .position(|entry| entry.party_id() == Some(party_id) && entry.is_active(now))
}
