//! In-memory host doubles: server, worlds, players, and parties.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, Weak};

use chrono::{TimeDelta, TimeZone, Utc};
use partyraids_core::error::RaidsError;
use partyraids_core::host::{
    Difficulty, MessageReceiver, Party, PartyService, Player, ScheduledTask, Server,
    TICKS_PER_SECOND, World,
};
use partyraids_core::location::{Point, WorldLocation};
use partyraids_core::scheduler::TickScheduler;
use uuid::Uuid;

use crate::clock::ManualClock;

type Roster = Mutex<Vec<Arc<TestPlayer>>>;

const MILLIS_PER_TICK: i64 = 50;

/// A world that records what the orchestrator does to it.
///
/// Occupancy is derived from the owning server's player roster: a player is
/// inside this world when its current location names it.
#[derive(Debug)]
pub struct TestWorld {
    name: String,
    folder: PathBuf,
    spawn: Mutex<Point>,
    difficulty: Mutex<Difficulty>,
    spawned: Mutex<Vec<(String, Point)>>,
    clears: Mutex<u32>,
    roster: Weak<Roster>,
}

impl TestWorld {
    fn new(name: &str, folder: PathBuf, roster: Weak<Roster>) -> Self {
        Self {
            name: name.to_owned(),
            folder,
            spawn: Mutex::new(Point::ORIGIN),
            difficulty: Mutex::new(Difficulty::default()),
            spawned: Mutex::new(Vec::new()),
            clears: Mutex::new(0),
            roster,
        }
    }

    /// Current difficulty.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn difficulty(&self) -> Difficulty {
        *self.difficulty.lock().unwrap()
    }

    /// Entities spawned so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn spawned_entities(&self) -> Vec<(String, Point)> {
        self.spawned.lock().unwrap().clone()
    }

    /// Number of times `clear_entities` was called.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn clear_count(&self) -> u32 {
        *self.clears.lock().unwrap()
    }
}

impl World for TestWorld {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn folder(&self) -> PathBuf {
        self.folder.clone()
    }

    fn spawn_point(&self) -> Point {
        *self.spawn.lock().unwrap()
    }

    fn set_spawn_point(&self, point: Point) {
        *self.spawn.lock().unwrap() = point;
    }

    fn players(&self) -> Vec<Arc<dyn Player>> {
        let Some(roster) = self.roster.upgrade() else {
            return Vec::new();
        };
        let roster = roster.lock().unwrap();
        roster
            .iter()
            .filter(|p| p.location().world_name() == self.name)
            .map(|p| Arc::clone(p) as Arc<dyn Player>)
            .collect()
    }

    fn set_difficulty(&self, difficulty: Difficulty) {
        *self.difficulty.lock().unwrap() = difficulty;
    }

    fn spawn_entity(&self, entity_type: &str, point: Point) -> Result<(), RaidsError> {
        let known = !entity_type.is_empty()
            && entity_type
                .chars()
                .all(|c| c.is_ascii_lowercase() || c == '_');
        if !known {
            return Err(RaidsError::NotFound(format!("entity type {entity_type}")));
        }
        self.spawned
            .lock()
            .unwrap()
            .push((entity_type.to_owned(), point));
        Ok(())
    }

    fn clear_entities(&self) {
        *self.clears.lock().unwrap() += 1;
    }
}

/// A player that records messages and teleports.
pub struct TestPlayer {
    id: Uuid,
    name: String,
    level: u32,
    location: Mutex<WorldLocation>,
    messages: Mutex<Vec<String>>,
    teleports: Mutex<u32>,
}

impl std::fmt::Debug for TestPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestPlayer")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl TestPlayer {
    /// Messages received so far, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    /// Number of teleports performed.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn teleport_count(&self) -> u32 {
        *self.teleports.lock().unwrap()
    }
}

impl MessageReceiver for TestPlayer {
    fn send_message(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_owned());
    }
}

impl Player for TestPlayer {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn location(&self) -> WorldLocation {
        self.location.lock().unwrap().clone()
    }

    fn teleport(&self, location: &WorldLocation) {
        *self.location.lock().unwrap() = location.clone();
        *self.teleports.lock().unwrap() += 1;
    }

    fn world(&self) -> Arc<dyn World> {
        Arc::clone(self.location.lock().unwrap().world())
    }

    fn level(&self) -> u32 {
        self.level
    }
}

/// A party backed by a fixed member list.
#[derive(Debug)]
pub struct TestParty {
    id: Uuid,
    name: String,
    members: Vec<Arc<TestPlayer>>,
    broadcasts: Mutex<Vec<String>>,
}

impl TestParty {
    /// Creates a party with the given members.
    #[must_use]
    pub fn new(name: &str, members: &[&Arc<TestPlayer>]) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            members: members.iter().map(|p| Arc::clone(*p)).collect(),
            broadcasts: Mutex::new(Vec::new()),
        }
    }

    /// Broadcasts sent so far, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn broadcasts(&self) -> Vec<String> {
        self.broadcasts.lock().unwrap().clone()
    }
}

impl Party for TestParty {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn members(&self) -> Vec<Uuid> {
        self.members.iter().map(|p| p.id).collect()
    }

    fn broadcast(&self, message: &str) {
        self.broadcasts.lock().unwrap().push(message.to_owned());
        for member in &self.members {
            member.send_message(message);
        }
    }
}

/// Party membership lookups over registered `TestParty` values.
#[derive(Debug, Default)]
pub struct TestPartyService {
    parties: Mutex<Vec<Arc<TestParty>>>,
}

impl TestPartyService {
    /// Creates an empty service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a party.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn add(&self, party: &Arc<TestParty>) {
        self.parties.lock().unwrap().push(Arc::clone(party));
    }
}

impl PartyService for TestPartyService {
    fn party(&self, party_id: Uuid) -> Option<Arc<dyn Party>> {
        self.parties
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == party_id)
            .map(|p| Arc::clone(p) as Arc<dyn Party>)
    }

    fn party_for_player(&self, player_id: Uuid) -> Option<Uuid> {
        self.parties
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.members.iter().any(|m| m.id == player_id))
            .map(|p| p.id)
    }
}

/// A receiver that records messages, standing in for the console.
#[derive(Debug, Default)]
pub struct RecordingReceiver {
    messages: Mutex<Vec<String>>,
}

impl RecordingReceiver {
    /// Messages received so far, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl MessageReceiver for RecordingReceiver {
    fn send_message(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_owned());
    }
}

/// A server whose worlds are directories under a scratch container.
///
/// Scheduled tasks only run when the test advances ticks, and each tick moves
/// the attached `ManualClock` forward by 50 ms.
pub struct TestServer {
    container: PathBuf,
    clock: Arc<ManualClock>,
    scheduler: TickScheduler,
    worlds: Mutex<BTreeMap<String, Arc<TestWorld>>>,
    roster: Arc<Roster>,
    dispatched: Mutex<Vec<String>>,
    pinned: Mutex<BTreeSet<String>>,
}

impl TestServer {
    /// Creates a server with no worlds, storing world folders in `container`.
    /// The clock starts at 2026-01-15 10:00:00 UTC.
    ///
    /// # Panics
    ///
    /// Panics if the fixed start timestamp is invalid.
    #[must_use]
    pub fn new(container: impl Into<PathBuf>) -> Self {
        let start = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        Self {
            container: container.into(),
            clock: Arc::new(ManualClock::new(start)),
            scheduler: TickScheduler::new(),
            worlds: Mutex::new(BTreeMap::new()),
            roster: Arc::new(Mutex::new(Vec::new())),
            dispatched: Mutex::new(Vec::new()),
            pinned: Mutex::new(BTreeSet::new()),
        }
    }

    /// The clock advanced alongside host ticks.
    #[must_use]
    pub fn clock(&self) -> Arc<ManualClock> {
        Arc::clone(&self.clock)
    }

    /// Loads (creating the folder if needed) a world named `name`.
    ///
    /// # Panics
    ///
    /// Panics if the world folder cannot be created.
    pub fn add_world(&self, name: &str) -> Arc<TestWorld> {
        self.load_world(name).unwrap()
    }

    /// Looks up a loaded world with its concrete type.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn test_world(&self, name: &str) -> Option<Arc<TestWorld>> {
        self.worlds.lock().unwrap().get(name).cloned()
    }

    /// Adds an online player standing at `point` in `world`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn add_player(
        &self,
        name: &str,
        world: &Arc<TestWorld>,
        point: Point,
        level: u32,
    ) -> Arc<TestPlayer> {
        let player = Arc::new(TestPlayer {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            level,
            location: Mutex::new(WorldLocation::new(
                Arc::clone(world) as Arc<dyn World>,
                point,
            )),
            messages: Mutex::new(Vec::new()),
            teleports: Mutex::new(0),
        });
        self.roster.lock().unwrap().push(Arc::clone(&player));
        player
    }

    /// Runs `ticks` host ticks, one at a time.
    pub fn advance_ticks(&self, ticks: u64) {
        for _ in 0..ticks {
            self.clock.advance(TimeDelta::milliseconds(MILLIS_PER_TICK));
            self.scheduler.advance(1);
        }
    }

    /// Runs `seconds` worth of host ticks.
    pub fn advance_seconds(&self, seconds: u32) {
        self.advance_ticks(u64::from(seconds) * TICKS_PER_SECOND);
    }

    /// Tasks armed but not yet run.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.scheduler.pending()
    }

    /// Console commands dispatched so far, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn dispatched_commands(&self) -> Vec<String> {
        self.dispatched.lock().unwrap().clone()
    }

    /// Makes `unload_world` refuse the named world, as a host does when a
    /// world cannot be unloaded.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn refuse_unload(&self, name: &str) {
        self.pinned.lock().unwrap().insert(name.to_owned());
    }

    fn load_world(&self, name: &str) -> Result<Arc<TestWorld>, RaidsError> {
        let mut worlds = self.worlds.lock().unwrap();
        if let Some(world) = worlds.get(name) {
            return Ok(Arc::clone(world));
        }
        let folder = self.container.join(name);
        fs::create_dir_all(&folder)
            .map_err(|e| RaidsError::io(format!("creating world folder {name}"), e))?;
        let world = Arc::new(TestWorld::new(name, folder, Arc::downgrade(&self.roster)));
        worlds.insert(name.to_owned(), Arc::clone(&world));
        Ok(world)
    }
}

impl Server for TestServer {
    fn world(&self, name: &str) -> Option<Arc<dyn World>> {
        self.test_world(name).map(|w| w as Arc<dyn World>)
    }

    fn worlds(&self) -> Vec<Arc<dyn World>> {
        self.worlds
            .lock()
            .unwrap()
            .values()
            .map(|w| Arc::clone(w) as Arc<dyn World>)
            .collect()
    }

    fn create_world(&self, name: &str) -> Result<Arc<dyn World>, RaidsError> {
        self.load_world(name).map(|w| w as Arc<dyn World>)
    }

    fn unload_world(&self, name: &str) -> bool {
        if self.pinned.lock().unwrap().contains(name) {
            return false;
        }
        self.worlds.lock().unwrap().remove(name).is_some()
    }

    fn player(&self, name: &str) -> Option<Arc<dyn Player>> {
        self.roster
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.name == name)
            .map(|p| Arc::clone(p) as Arc<dyn Player>)
    }

    fn player_by_id(&self, id: Uuid) -> Option<Arc<dyn Player>> {
        self.roster
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .map(|p| Arc::clone(p) as Arc<dyn Player>)
    }

    fn world_container(&self) -> PathBuf {
        self.container.clone()
    }

    fn schedule_once(&self, delay_ticks: u64, task: ScheduledTask) {
        self.scheduler.schedule(delay_ticks, task);
    }

    fn dispatch_command(&self, command: &str) {
        self.dispatched.lock().unwrap().push(command.to_owned());
    }
}

#[cfg(test)]
mod tests {
    use partyraids_core::clock::Clock;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_world_occupancy_follows_player_location() {
        // Arrange
        let dir = TempDir::new().unwrap();
        let server = TestServer::new(dir.path());
        let lobby = server.add_world("lobby");
        let arena = server.add_world("arena");
        let player = server.add_player("alice", &lobby, Point::ORIGIN, 1);

        // Act
        player.teleport(&WorldLocation::new(
            Arc::clone(&arena) as Arc<dyn World>,
            Point::new(1.0, 2.0, 3.0),
        ));

        // Assert
        assert!(lobby.players().is_empty());
        assert_eq!(arena.players().len(), 1);
        assert_eq!(player.teleport_count(), 1);
        assert!(dir.path().join("arena").is_dir());
    }

    #[test]
    fn test_advance_seconds_runs_due_tasks_and_moves_clock() {
        let dir = TempDir::new().unwrap();
        let server = TestServer::new(dir.path());
        let clock = server.clock();
        let start = clock.now();
        let fired = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&fired);
        server.schedule_once(40, Box::new(move || *flag.lock().unwrap() = true));

        server.advance_seconds(1);
        assert!(!*fired.lock().unwrap());

        server.advance_seconds(1);
        assert!(*fired.lock().unwrap());
        assert_eq!(clock.now() - start, TimeDelta::seconds(2));
    }

    #[test]
    fn test_refused_world_stays_loaded() {
        let dir = TempDir::new().unwrap();
        let server = TestServer::new(dir.path());
        server.add_world("pinned");
        server.add_world("loose");

        server.refuse_unload("pinned");

        assert!(!server.unload_world("pinned"));
        assert!(server.unload_world("loose"));
        assert!(server.world("pinned").is_some());
    }

    #[test]
    fn test_party_service_finds_party_by_member() {
        let dir = TempDir::new().unwrap();
        let server = TestServer::new(dir.path());
        let lobby = server.add_world("lobby");
        let alice = server.add_player("alice", &lobby, Point::ORIGIN, 1);
        let bob = server.add_player("bob", &lobby, Point::ORIGIN, 1);
        let party = Arc::new(TestParty::new("heroes", &[&alice]));
        let parties = TestPartyService::new();
        parties.add(&party);

        assert_eq!(parties.party_for_player(alice.id()), Some(party.id()));
        assert_eq!(parties.party_for_player(bob.id()), None);
    }
}
