//! A directory-backed host for running the orchestrator without a game
//! server.
//!
//! Every sub-directory of the world container is a loaded world. There are
//! no players or parties, so raids cannot be started from here, but
//! packaging, template editing, and world cleanup all work against real
//! folders.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use partyraids_core::error::RaidsError;
use partyraids_core::host::{
    Difficulty, Party, PartyService, Player, ScheduledTask, Server, World,
};
use partyraids_core::location::Point;
use partyraids_core::scheduler::TickScheduler;
use tracing::{debug, info};
use uuid::Uuid;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A world folder with in-memory spawn and difficulty settings.
#[derive(Debug)]
pub struct LocalWorld {
    name: String,
    folder: PathBuf,
    spawn: Mutex<Point>,
    difficulty: Mutex<Difficulty>,
}

impl LocalWorld {
    fn new(name: &str, folder: PathBuf) -> Self {
        Self {
            name: name.to_owned(),
            folder,
            spawn: Mutex::new(Point::ORIGIN),
            difficulty: Mutex::new(Difficulty::default()),
        }
    }

    /// Current difficulty.
    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        *lock(&self.difficulty)
    }
}

impl World for LocalWorld {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn folder(&self) -> PathBuf {
        self.folder.clone()
    }

    fn spawn_point(&self) -> Point {
        *lock(&self.spawn)
    }

    fn set_spawn_point(&self, point: Point) {
        *lock(&self.spawn) = point;
    }

    fn players(&self) -> Vec<Arc<dyn Player>> {
        Vec::new()
    }

    fn set_difficulty(&self, difficulty: Difficulty) {
        *lock(&self.difficulty) = difficulty;
    }

    fn spawn_entity(&self, entity_type: &str, point: Point) -> Result<(), RaidsError> {
        if entity_type.trim().is_empty() {
            return Err(RaidsError::NotFound("entity type \"\"".to_owned()));
        }
        debug!(world = %self.name, entity = %entity_type, at = %point, "spawn requested");
        Ok(())
    }

    fn clear_entities(&self) {
        debug!(world = %self.name, "entity clear requested");
    }
}

/// Host server over a world container directory.
pub struct LocalServer {
    container: PathBuf,
    scheduler: TickScheduler,
    worlds: Mutex<BTreeMap<String, Arc<LocalWorld>>>,
}

impl LocalServer {
    /// Opens `container`, creating it if missing, and loads every
    /// sub-directory as a world.
    ///
    /// # Errors
    ///
    /// Returns `RaidsError::Io` if the container cannot be created or listed.
    pub fn open(container: impl Into<PathBuf>) -> Result<Self, RaidsError> {
        let container = container.into();
        fs::create_dir_all(&container)
            .map_err(|e| RaidsError::io(format!("creating {}", container.display()), e))?;

        let mut worlds = BTreeMap::new();
        let entries = fs::read_dir(&container)
            .map_err(|e| RaidsError::io(format!("listing {}", container.display()), e))?;
        for entry in entries {
            let entry =
                entry.map_err(|e| RaidsError::io(format!("listing {}", container.display()), e))?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            worlds.insert(name.clone(), Arc::new(LocalWorld::new(&name, entry.path())));
        }
        info!(container = %container.display(), worlds = worlds.len(), "world container opened");

        Ok(Self {
            container,
            scheduler: TickScheduler::new(),
            worlds: Mutex::new(worlds),
        })
    }

    /// Advances the host by one tick, running any task that comes due.
    pub fn tick(&self) -> usize {
        self.scheduler.advance(1)
    }

    /// Tasks armed but not yet run.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.scheduler.pending()
    }

    /// Looks up a loaded world with its concrete type.
    #[must_use]
    pub fn local_world(&self, name: &str) -> Option<Arc<LocalWorld>> {
        lock(&self.worlds).get(name).cloned()
    }
}

impl std::fmt::Debug for LocalServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalServer")
            .field("container", &self.container)
            .field("worlds", &lock(&self.worlds).len())
            .finish_non_exhaustive()
    }
}

impl Server for LocalServer {
    fn world(&self, name: &str) -> Option<Arc<dyn World>> {
        self.local_world(name).map(|w| w as Arc<dyn World>)
    }

    fn worlds(&self) -> Vec<Arc<dyn World>> {
        lock(&self.worlds)
            .values()
            .map(|w| Arc::clone(w) as Arc<dyn World>)
            .collect()
    }

    fn create_world(&self, name: &str) -> Result<Arc<dyn World>, RaidsError> {
        let mut worlds = lock(&self.worlds);
        if let Some(world) = worlds.get(name) {
            return Ok(Arc::clone(world) as Arc<dyn World>);
        }
        let folder = self.container.join(name);
        fs::create_dir_all(&folder)
            .map_err(|e| RaidsError::io(format!("creating {}", folder.display()), e))?;
        let world = Arc::new(LocalWorld::new(name, folder));
        worlds.insert(name.to_owned(), Arc::clone(&world));
        info!(world = %name, "world loaded");
        Ok(world)
    }

    fn unload_world(&self, name: &str) -> bool {
        let unloaded = lock(&self.worlds).remove(name).is_some();
        if unloaded {
            info!(world = %name, "world unloaded");
        }
        unloaded
    }

    fn player(&self, _name: &str) -> Option<Arc<dyn Player>> {
        None
    }

    fn player_by_id(&self, _id: Uuid) -> Option<Arc<dyn Player>> {
        None
    }

    fn world_container(&self) -> PathBuf {
        self.container.clone()
    }

    fn schedule_once(&self, delay_ticks: u64, task: ScheduledTask) {
        self.scheduler.schedule(delay_ticks, task);
    }

    fn dispatch_command(&self, command: &str) {
        info!(command = %command, "console command");
    }
}

/// Party service for a host without players.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoParties;

impl PartyService for NoParties {
    fn party(&self, _party_id: Uuid) -> Option<Arc<dyn Party>> {
        None
    }

    fn party_for_player(&self, _player_id: Uuid) -> Option<Uuid> {
        None
    }
}
