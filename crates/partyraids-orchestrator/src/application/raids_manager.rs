//! The raid orchestrator.
//!
//! `RaidsManager` owns the managed-world registry, the return-location store
//! and the dungeon template repository. Host services are injected at
//! construction. Deferred work (raid countdowns and the scrubber) is handed
//! to the host scheduler as closures holding a weak reference back to the
//! manager, so a dropped manager never runs stale work.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use partyraids_config::{DEFAULT_CONFIG_YAML, Raid, RaidsConfig, load_raids_config};
use partyraids_core::atomic_io::{remove_tree, write_bytes_atomic};
use partyraids_core::clock::Clock;
use partyraids_core::error::RaidsError;
use partyraids_core::host::{Party, PartyService, Player, Server, World, seconds_to_ticks};
use partyraids_core::location::WorldLocation;
use partyraids_dungeons::DungeonRepository;
use partyraids_locations::{LocationManager, YamlDocumentStore};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::managed_world::ManagedWorld;
use crate::domain::registry::ManagedWorldRegistry;

/// Raid definitions file inside the data directory.
pub const CONFIG_FILE: &str = "config.yml";
/// Return-location store inside the data directory.
pub const LOCATIONS_FILE: &str = "locations.yml";
/// Template archive directory inside the data directory.
pub const DUNGEONS_DIR: &str = "dungeons";

/// Why a party may not start a raid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinRejection {
    /// Fewer members than the raid requires.
    PartyTooSmall { required: u32 },
    /// At least one member is below the required level.
    LevelTooLow { required: u32 },
}

impl fmt::Display for JoinRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PartyTooSmall { required } => {
                write!(f, "Your party must have {required} members to start raid")
            }
            Self::LevelTooLow { required } => write!(
                f,
                "All members of your party must have at least a level of {required}"
            ),
        }
    }
}

/// Orchestrates raid world provisioning, lifecycle, and teardown.
pub struct RaidsManager {
    data_dir: PathBuf,
    server: Arc<dyn Server>,
    parties: Arc<dyn PartyService>,
    clock: Arc<dyn Clock>,
    dungeons: DungeonRepository,
    locations: LocationManager,
    registry: ManagedWorldRegistry,
    config: Mutex<Option<Arc<RaidsConfig>>>,
    running: AtomicBool,
    this: Weak<Self>,
}

impl RaidsManager {
    /// Creates the manager over `data_dir` and arms the scrubber.
    ///
    /// A default raid definitions document is written if none exists.
    /// Templates missing from `<data_dir>/dungeons` are looked up in
    /// `bundled_dungeons` before giving up.
    ///
    /// # Errors
    ///
    /// Returns `RaidsError::Io` if the data directory or the default
    /// definitions document cannot be created.
    pub fn new(
        data_dir: impl Into<PathBuf>,
        server: Arc<dyn Server>,
        parties: Arc<dyn PartyService>,
        clock: Arc<dyn Clock>,
        bundled_dungeons: Option<PathBuf>,
    ) -> Result<Arc<Self>, RaidsError> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)
            .map_err(|e| RaidsError::io(format!("creating {}", data_dir.display()), e))?;

        let config_path = data_dir.join(CONFIG_FILE);
        if !config_path.exists() {
            write_bytes_atomic(&config_path, DEFAULT_CONFIG_YAML.as_bytes()).map_err(|e| {
                RaidsError::io(format!("writing {}", config_path.display()), e)
            })?;
            info!(path = %config_path.display(), "wrote default raid definitions");
        }

        let locations = LocationManager::load(
            Box::new(YamlDocumentStore::locations(data_dir.join(LOCATIONS_FILE))),
            server.as_ref(),
        );
        let dungeons = DungeonRepository::new(data_dir.join(DUNGEONS_DIR), bundled_dungeons);

        let manager = Arc::new_cyclic(|this| Self {
            data_dir,
            server,
            parties,
            clock,
            dungeons,
            locations,
            registry: ManagedWorldRegistry::new(),
            config: Mutex::new(None),
            running: AtomicBool::new(true),
            this: this.clone(),
        });

        manager.arm_scrubber();
        info!(data_dir = %manager.data_dir.display(), "raids manager started");
        Ok(manager)
    }

    /// The data directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// The template repository.
    #[must_use]
    pub fn dungeons(&self) -> &DungeonRepository {
        &self.dungeons
    }

    /// The return-location store.
    #[must_use]
    pub fn locations(&self) -> &LocationManager {
        &self.locations
    }

    /// The party service.
    #[must_use]
    pub fn parties(&self) -> &Arc<dyn PartyService> {
        &self.parties
    }

    /// The host server.
    #[must_use]
    pub fn server(&self) -> &Arc<dyn Server> {
        &self.server
    }

    /// Whether the manager has not been shut down.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn cached_config(&self) -> MutexGuard<'_, Option<Arc<RaidsConfig>>> {
        self.config.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The current raid definitions, loading them on first use.
    ///
    /// A document that cannot be read at all yields an empty configuration.
    pub fn config(&self) -> Arc<RaidsConfig> {
        if let Some(config) = self.cached_config().as_ref() {
            return Arc::clone(config);
        }

        let path = self.data_dir.join(CONFIG_FILE);
        let loaded = match load_raids_config(&path) {
            Ok(config) => config,
            Err(err) => {
                error!(path = %path.display(), error = %err, "unable to load raid definitions");
                RaidsConfig::default()
            }
        };
        info!(raids = loaded.raids().len(), "loaded raid definitions");

        Arc::clone(self.cached_config().get_or_insert_with(|| Arc::new(loaded)))
    }

    /// Drops the cached definitions; the next access reloads them.
    pub fn reload(&self) {
        *self.cached_config() = None;
        info!("raid definitions invalidated");
    }

    /// Names of the configured raids, in document order.
    pub fn available_raids(&self) -> Vec<String> {
        self.config().raid_names()
    }

    /// Looks up a configured raid.
    pub fn raid(&self, name: &str) -> Option<Arc<Raid>> {
        self.config().raid(name)
    }

    /// Ids of the stored dungeon templates.
    ///
    /// # Errors
    ///
    /// Returns `RaidsError::Io` if the template directory cannot be listed.
    pub fn available_dungeons(&self) -> Result<Vec<String>, RaidsError> {
        self.dungeons.available()
    }

    /// The party's non-expired raid world.
    #[must_use]
    pub fn raid_by_party(&self, party_id: Uuid) -> Option<ManagedWorld> {
        self.registry.raid_by_party(party_id, self.clock.now())
    }

    /// Looks up a managed world by name.
    #[must_use]
    pub fn managed_world(&self, world_name: &str) -> Option<ManagedWorld> {
        self.registry.get(world_name)
    }

    /// Names of all managed worlds.
    #[must_use]
    pub fn managed_world_names(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Worlds currently open for template editing.
    #[must_use]
    pub fn editable_templates(&self) -> Vec<ManagedWorld> {
        self.registry.editable_templates()
    }

    /// Checks the raid's join criteria against the party. Offline members
    /// count as level zero.
    ///
    /// # Errors
    ///
    /// Returns the first criterion the party fails.
    pub fn check_join_criteria(&self, party: &dyn Party, raid: &Raid) -> Result<(), JoinRejection> {
        let criteria = raid.join_criteria;
        let members = party.members();

        let size = u32::try_from(members.len()).unwrap_or(u32::MAX);
        if size < criteria.minimum_party_size {
            return Err(JoinRejection::PartyTooSmall {
                required: criteria.minimum_party_size,
            });
        }

        let lowest = members
            .iter()
            .map(|id| self.server.player_by_id(*id).map_or(0, |p| p.level()))
            .min()
            .unwrap_or(0);
        if criteria.minimum_level > 0 && lowest < criteria.minimum_level {
            return Err(JoinRejection::LevelTooLow {
                required: criteria.minimum_level,
            });
        }
        Ok(())
    }

    /// Registers `world` as the party's queued raid and arms the countdown.
    ///
    /// # Errors
    ///
    /// Returns `RaidsError::Conflict` if the party already has an active raid.
    #[instrument(skip_all, fields(party = %party.id(), world = %world.name(), raid = %raid.name))]
    pub fn start_raid(
        &self,
        party: Arc<dyn Party>,
        world: Arc<dyn World>,
        raid: Arc<Raid>,
    ) -> Result<(), RaidsError> {
        let party_id = party.id();
        let world_name = world.name();
        let join_in = raid.join_in_seconds;

        let entry = ManagedWorld::queued_raid(world, raid, Arc::clone(&party), self.clock.now());
        self.registry.register_raid(entry, self.clock.now())?;

        if join_in > 0 {
            party.broadcast("Party is queued for a raid.");
            party.broadcast(&format!("Starting in {join_in} seconds."));
            party.broadcast("Use /raids cancel to abort.");
        }

        let this = self.this.clone();
        self.server.schedule_once(
            seconds_to_ticks(join_in),
            Box::new(move || {
                if let Some(manager) = this.upgrade() {
                    manager.begin_raid(party_id, &world_name);
                }
            }),
        );
        info!(join_in, "raid queued");
        Ok(())
    }

    /// Countdown action: moves the party in if its raid is still queued.
    fn begin_raid(&self, party_id: Uuid, world_name: &str) {
        let Some(entry) = self
            .registry
            .start_queued(party_id, world_name, self.clock.now())
        else {
            debug!(party = %party_id, world = %world_name, "countdown fired for a raid that is no longer queued");
            return;
        };
        let Some(instance) = entry.raid_instance() else {
            return;
        };

        let world = entry.world();
        let spawn = WorldLocation::new(Arc::clone(world), world.spawn_point());
        for member_id in instance.party().members() {
            let Some(player) = self.server.player_by_id(member_id) else {
                warn!(player = %member_id, "party member offline at raid start");
                continue;
            };
            self.locations.store(member_id, player.location());
            player.teleport(&spawn);
        }
        info!(party = %party_id, world = %world_name, raid = %instance.raid().name, "raid started");
    }

    /// Cancels the party's raid if it has not started yet.
    #[instrument(skip(self))]
    pub fn cancel_raid(&self, party_id: Uuid) -> bool {
        let Some(entry) = self.registry.cancel_queued(party_id, self.clock.now()) else {
            return false;
        };
        if let Some(instance) = entry.raid_instance() {
            instance.party().broadcast("Raid canceled");
        }
        info!(world = %entry.name(), "raid canceled");
        true
    }

    /// Builds a fresh world for `raid` from its dungeon template and applies
    /// the raid's startup setup.
    ///
    /// # Errors
    ///
    /// Returns an error if the template cannot be found or extracted, or the
    /// host cannot load the world.
    #[instrument(skip_all, fields(raid = %raid.name, dungeon = %raid.dungeon))]
    pub fn setup_raid_world(&self, raid: &Raid) -> Result<Arc<dyn World>, RaidsError> {
        let world_name = self.new_world_name();
        let world = self.provision_world(&raid.dungeon, &world_name)?;

        world.set_spawn_point(raid.spawn);
        if raid.setup.clear_mobs {
            world.clear_entities();
        }
        world.set_difficulty(raid.difficulty);

        for mob in &raid.setup.mobs {
            if let Err(err) = world.spawn_entity(&mob.entity_type, mob.point) {
                warn!(world = %world_name, mob = %mob.entity_type, error = %err, "unable to spawn raid mob");
            }
        }
        for command in raid.setup.commands_for(&world_name) {
            self.server.dispatch_command(&command);
        }

        info!(world = %world_name, "raid world ready");
        Ok(world)
    }

    /// Extracts `template_id` into a new world and registers it for editing.
    ///
    /// # Errors
    ///
    /// Returns an error if the template cannot be found or extracted, or the
    /// host cannot load the world.
    #[instrument(skip(self))]
    pub fn open_template_for_edit(&self, template_id: &str) -> Result<Arc<dyn World>, RaidsError> {
        let world_name = self.new_world_name();
        let world = self.provision_world(template_id, &world_name)?;
        self.registry.register(ManagedWorld::editable_template(
            Arc::clone(&world),
            template_id,
            self.clock.now(),
        ));
        info!(world = %world_name, "template opened for editing");
        Ok(world)
    }

    /// Writes a template world back over its source archive.
    ///
    /// # Errors
    ///
    /// Returns `RaidsError::NotFound` if `world_name` is not a template world
    /// and `RaidsError::Io` if the archive cannot be written.
    #[instrument(skip(self))]
    pub fn save_template(&self, world_name: &str) -> Result<PathBuf, RaidsError> {
        let entry = self
            .registry
            .get(world_name)
            .filter(|entry| entry.template_id().is_some())
            .ok_or_else(|| RaidsError::NotFound(format!("template world {world_name}")))?;
        let template_id = entry.template_id().unwrap_or_default();
        self.dungeons
            .package(&entry.world().folder(), template_id, true)
    }

    /// Archives a live world as dungeon template `dungeon_id`.
    ///
    /// # Errors
    ///
    /// Returns `RaidsError::NotFound` for an unknown world,
    /// `RaidsError::Conflict` if the template exists and `force` is false,
    /// and `RaidsError::Io` if the archive cannot be written.
    #[instrument(skip(self))]
    pub fn package_world(
        &self,
        world_name: &str,
        dungeon_id: &str,
        force: bool,
    ) -> Result<PathBuf, RaidsError> {
        let world = self
            .server
            .world(world_name)
            .ok_or_else(|| RaidsError::NotFound(format!("world {world_name}")))?;
        self.dungeons.package(&world.folder(), dungeon_id, force)
    }

    /// Sends `player` back to their stored location, clearing the entry.
    /// Returns whether a location was stored.
    pub fn return_last_location(&self, player: &dyn Player) -> bool {
        match self.locations.remove(player.id()) {
            Some(location) => {
                player.teleport(&location);
                debug!(player = %player.name(), to = %location, "returned player");
                true
            }
            None => false,
        }
    }

    /// Ends the raid `player` is in: everyone in the player's world is sent
    /// back. Does nothing unless `player` has a stored location. Returns the
    /// number of players moved.
    pub fn end_raid_for(&self, player: &dyn Player) -> usize {
        if self.locations.get(player.id()).is_none() {
            return 0;
        }
        let mut moved = 0;
        for occupant in player.world().players() {
            if self.return_last_location(occupant.as_ref()) {
                moved += 1;
            }
        }
        moved
    }

    /// Drops expired managed worlds, then unloads and deletes every prefixed
    /// host world the registry no longer tracks.
    #[instrument(skip(self))]
    pub fn clean_managed_worlds(&self) {
        for expired in self.registry.remove_expired(self.clock.now()) {
            debug!(world = %expired.name(), "managed world expired");
        }

        let tracked: HashSet<String> = self.registry.names().into_iter().collect();
        let config = self.config();
        for world in self.server.worlds() {
            let name = world.name();
            if !config.is_raid_world(&name) || tracked.contains(&name) {
                continue;
            }
            info!(world = %name, "removing unused world");
            if let Err(err) = self.remove_world(world.as_ref()) {
                warn!(world = %name, error = %err, "unable to remove world");
            }
        }
    }

    /// Unloads `world` and deletes its folder. Returns `false` if the host
    /// refused to unload it, in which case nothing is deleted.
    ///
    /// # Errors
    ///
    /// Returns `RaidsError::Io` if the folder cannot be deleted.
    pub fn remove_world(&self, world: &dyn World) -> Result<bool, RaidsError> {
        let name = world.name();
        if !self.server.unload_world(&name) {
            warn!(world = %name, "host refused to unload world");
            return Ok(false);
        }
        let folder = world.folder();
        remove_tree(&folder)
            .map_err(|e| RaidsError::io(format!("deleting {}", folder.display()), e))?;
        info!(world = %name, "world removed");
        Ok(true)
    }

    /// Stops the scrubber, returns everyone in a raid world to their stored
    /// location, deletes all raid worlds, and forgets every managed world.
    /// Only the first call has any effect.
    #[instrument(skip(self))]
    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        let config = self.config();
        for world in self.server.worlds() {
            if !config.is_raid_world(&world.name()) {
                continue;
            }
            for player in world.players() {
                self.return_last_location(player.as_ref());
            }
            if let Err(err) = self.remove_world(world.as_ref()) {
                error!(world = %world.name(), error = %err, "unable to remove world");
            }
        }

        let forgotten = self.registry.clear().len();
        info!(forgotten, "raids manager stopped");
    }

    fn new_world_name(&self) -> String {
        format!("{}_{}", self.config().raid_world_prefix(), Uuid::new_v4())
    }

    /// Extracts a template into `<container>/<world_name>` and loads it. A
    /// partially extracted folder is deleted on failure.
    fn provision_world(
        &self,
        template_id: &str,
        world_name: &str,
    ) -> Result<Arc<dyn World>, RaidsError> {
        let world_dir = self.server.world_container().join(world_name);
        let provisioned = self
            .dungeons
            .materialize(template_id, &world_dir)
            .and_then(|_| self.server.create_world(world_name));

        provisioned.inspect_err(|err| {
            warn!(world = %world_name, error = %err, "provisioning failed");
            if let Err(cleanup) = remove_tree(&world_dir) {
                warn!(world = %world_name, error = %cleanup, "unable to delete partial world");
            }
        })
    }

    fn arm_scrubber(&self) {
        let delay = seconds_to_ticks(self.config().clean_cycle_seconds());
        let this = self.this.clone();
        self.server.schedule_once(
            delay,
            Box::new(move || {
                if let Some(manager) = this.upgrade() {
                    manager.scrub();
                }
            }),
        );
    }

    fn scrub(&self) {
        if !self.is_running() {
            debug!("scrubber stopped");
            return;
        }
        self.clean_managed_worlds();
        if self.is_running() {
            self.arm_scrubber();
        }
    }
}

impl fmt::Debug for RaidsManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RaidsManager")
            .field("data_dir", &self.data_dir)
            .field("managed_worlds", &self.registry.len())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
