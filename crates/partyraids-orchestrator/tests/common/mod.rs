//! Shared test helpers for orchestrator integration tests.
#![allow(dead_code)]

use std::fs;
use std::sync::Arc;

use partyraids_core::host::{CommandSender, PartyService, Player, Server, World};
use partyraids_core::location::Point;
use partyraids_orchestrator::{RaidsManager, RaidsVerb};
use partyraids_test_support::{TestParty, TestPartyService, TestPlayer, TestServer, TestWorld};
use tempfile::TempDir;

/// Raid definitions used by the scenarios: a quick five-second raid and a
/// raid that only accepts parties of three.
pub const SCENARIO_CONFIG: &str = r"
clean-cycle: 5
raids:
  example:
    dungeon: arena
    difficulty: hard
    join-in: 5
    spawn-location: 10, 10, 10
    on-startup:
      commands:
        - say @w is ready
      mobs:
        boss:
          type: zombie
          location: 1, 2, 3
  trio:
    dungeon: arena
    join-in: 5
    join-criteria:
      minimum-party-size: 3
";

/// A manager wired to in-memory host doubles, with an `arena` template
/// packaged from a world called `template` and two lobby players in a party.
pub struct Harness {
    pub dir: TempDir,
    pub server: Arc<TestServer>,
    pub parties: Arc<TestPartyService>,
    pub manager: Arc<RaidsManager>,
    pub lobby: Arc<TestWorld>,
    pub alice: Arc<TestPlayer>,
    pub bob: Arc<TestPlayer>,
    pub party: Arc<TestParty>,
}

impl Harness {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("data");
        fs::create_dir_all(&data_dir).unwrap();
        fs::write(data_dir.join("config.yml"), SCENARIO_CONFIG).unwrap();

        let server = Arc::new(TestServer::new(dir.path().join("worlds")));
        let lobby = server.add_world("lobby");
        let template = server.add_world("template");
        fs::create_dir_all(template.folder().join("region")).unwrap();
        fs::write(template.folder().join("level.dat"), b"level").unwrap();
        fs::write(template.folder().join("uid.dat"), b"uid").unwrap();
        fs::write(template.folder().join("region").join("r.0.0.mca"), b"chunks").unwrap();

        let alice = server.add_player("alice", &lobby, Point::new(1.0, 64.0, 1.0), 10);
        let bob = server.add_player("bob", &lobby, Point::new(-4.0, 64.0, 2.5), 12);
        let party = Arc::new(TestParty::new("heroes", &[&alice, &bob]));
        let parties = Arc::new(TestPartyService::new());
        parties.add(&party);

        let manager = RaidsManager::new(
            data_dir,
            Arc::clone(&server) as Arc<dyn Server>,
            Arc::clone(&parties) as Arc<dyn PartyService>,
            server.clock(),
            None,
        )
        .unwrap();
        manager.package_world("template", "arena", false).unwrap();

        Self {
            dir,
            server,
            parties,
            manager,
            lobby,
            alice,
            bob,
            party,
        }
    }

    pub fn sender(player: &Arc<TestPlayer>) -> CommandSender {
        CommandSender::Player(Arc::clone(player) as Arc<dyn Player>)
    }

    /// Runs `/raids <args>` as `player` with every permission.
    pub fn run(&self, player: &Arc<TestPlayer>, args: &[&str]) -> bool {
        let args: Vec<String> = args.iter().map(|a| (*a).to_owned()).collect();
        partyraids_orchestrator::process_command(
            &self.manager,
            &Self::sender(player),
            "raids",
            &args,
            &all_permissions(),
        )
    }

    /// Names of loaded host worlds carrying the raid prefix.
    pub fn raid_world_names(&self) -> Vec<String> {
        self.server
            .worlds()
            .iter()
            .map(|w| w.name())
            .filter(|n| n.starts_with("partyraids"))
            .collect()
    }
}

pub fn all_permissions() -> Vec<String> {
    RaidsVerb::COMPLETION_ORDER
        .iter()
        .map(|verb| verb.permission())
        .collect()
}
