//! `/raids` command dispatch, help, and tab completion.
//!
//! Every outcome is reported to the sender as a single text message; domain
//! errors are rendered with their `Display` text.

use std::sync::Arc;

use partyraids_core::host::{CommandSender, MessageReceiver, Player};
use tracing::{debug, info};

use super::raids_manager::RaidsManager;
use crate::domain::commands::{RAIDS_LABEL, RaidsVerb};

const FORCE_FLAG: &str = "-f";

/// Handles `/<label> <args...>` from `sender`. Returns `false` only when the
/// label is not `raids`.
///
/// A console sender names the target player as the last argument; that
/// argument is removed before the verb's own arguments are checked. A verb
/// the caller lacks permission for is silently ignored.
pub fn process_command(
    manager: &RaidsManager,
    sender: &CommandSender,
    label: &str,
    args: &[String],
    permissions: &[String],
) -> bool {
    if label != RAIDS_LABEL {
        return false;
    }
    let Some(first) = args.first() else {
        sender.send_message("Command /raids requires at least one parameter");
        return true;
    };
    let Some(verb) = RaidsVerb::parse(first) else {
        sender.send_message(&format!("Unknown command: /raids {first}"));
        return true;
    };
    if !verb.is_permitted(permissions) {
        debug!(verb = %verb, "ignoring command without permission");
        return true;
    }

    let (player, rest) = resolve_player(manager, sender, &args[1..]);

    match verb {
        RaidsVerb::Reload => {
            manager.reload();
            let count = manager.available_raids().len();
            sender.send_message(&format!("Config reloaded. Found {count} raids."));
        }
        RaidsVerb::Help => {
            for line in help(permissions) {
                sender.send_message(&line);
            }
        }
        RaidsVerb::Package => handle_package(manager, sender, rest),
        RaidsVerb::Start => match player {
            Some(player) => handle_start(manager, sender, &player, rest),
            None => sender.send_message("Player not specified as last parameter"),
        },
        RaidsVerb::Cancel => handle_cancel(manager, sender),
        RaidsVerb::Exit => match player {
            Some(player) => {
                manager.return_last_location(player.as_ref());
            }
            None => sender.send_message("Player not specified as last parameter"),
        },
        RaidsVerb::End => match player {
            Some(player) => {
                let moved = manager.end_raid_for(player.as_ref());
                debug!(player = %player.name(), moved, "raid ended");
            }
            None => sender.send_message("Player not specified as last parameter"),
        },
    }
    true
}

/// Usage lines for the verbs `permissions` allows.
#[must_use]
pub fn help(permissions: &[String]) -> Vec<String> {
    RaidsVerb::HELP_ORDER
        .iter()
        .filter(|verb| verb.is_permitted(permissions))
        .filter_map(|verb| verb.help_line())
        .map(str::to_owned)
        .collect()
}

/// Completion candidates for the argument currently being typed.
#[must_use]
pub fn tab_complete(
    manager: &RaidsManager,
    label: &str,
    permissions: &[String],
    args: &[String],
) -> Vec<String> {
    if label != RAIDS_LABEL {
        return Vec::new();
    }
    match args {
        [_] => RaidsVerb::COMPLETION_ORDER
            .iter()
            .filter(|verb| verb.is_permitted(permissions))
            .map(|verb| verb.as_str().to_owned())
            .collect(),
        [verb, _] => match RaidsVerb::parse(verb) {
            Some(RaidsVerb::Start) if RaidsVerb::Start.is_permitted(permissions) => {
                manager.available_raids()
            }
            Some(RaidsVerb::Package) if RaidsVerb::Package.is_permitted(permissions) => {
                let config = manager.config();
                manager
                    .server()
                    .worlds()
                    .iter()
                    .map(|world| world.name())
                    .filter(|name| !config.is_raid_world(name))
                    .collect()
            }
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Works out which player a command acts on and which arguments remain.
fn resolve_player<'a>(
    manager: &RaidsManager,
    sender: &CommandSender,
    rest: &'a [String],
) -> (Option<Arc<dyn Player>>, &'a [String]) {
    match sender {
        CommandSender::Player(player) => (Some(Arc::clone(player)), rest),
        CommandSender::Console(_) => match rest.split_last() {
            Some((name, remaining)) => match manager.server().player(name) {
                Some(player) => (Some(player), remaining),
                None => (None, rest),
            },
            None => (None, rest),
        },
    }
}

fn handle_package(manager: &RaidsManager, sender: &CommandSender, args: &[String]) {
    let [world_name, dungeon_id, flags @ ..] = args else {
        sender.send_message("/raids package requires 2 arguments");
        return;
    };
    let force = flags.first().is_some_and(|flag| flag == FORCE_FLAG);

    match manager.package_world(world_name, dungeon_id, force) {
        Ok(_) => sender.send_message(&format!(
            "World {world_name} has been packaged as dungeon {dungeon_id}"
        )),
        Err(err) => sender.send_message(&err.to_string()),
    }
}

fn handle_start(
    manager: &RaidsManager,
    sender: &CommandSender,
    player: &Arc<dyn Player>,
    args: &[String],
) {
    let [raid_name] = args else {
        sender.send_message("/raids start requires 1 argument");
        return;
    };

    let parties = manager.parties();
    let Some(party) = parties
        .party_for_player(player.id())
        .and_then(|party_id| parties.party(party_id))
    else {
        sender.send_message("Player must belong to party");
        return;
    };
    let Some(raid) = manager.raid(raid_name) else {
        sender.send_message(&format!("Could not find raid {raid_name}"));
        return;
    };
    if manager.raid_by_party(party.id()).is_some() {
        sender.send_message("Your party already has an active raid");
        return;
    }
    if let Err(rejection) = manager.check_join_criteria(party.as_ref(), &raid) {
        sender.send_message(&rejection.to_string());
        return;
    }

    sender.send_message("Creating raid dungeon");
    let world = match manager.setup_raid_world(&raid) {
        Ok(world) => world,
        Err(err) => {
            sender.send_message(&format!("Error creating raid: {err}"));
            return;
        }
    };
    if let Err(err) = manager.start_raid(party, world, raid) {
        sender.send_message(&err.to_string());
        return;
    }
    info!(player = %player.name(), raid = %raid_name, "raid requested");
}

fn handle_cancel(manager: &RaidsManager, sender: &CommandSender) {
    let Some(player) = sender.as_player() else {
        sender.send_message("Only players can cancel raids");
        return;
    };
    let Some(party_id) = manager.parties().party_for_player(player.id()) else {
        sender.send_message("You must belong to party in order cancel a raid");
        return;
    };
    if !manager.cancel_raid(party_id) {
        sender.send_message("Your party is not starting a raid");
    }
}

#[cfg(test)]
mod tests {
    use partyraids_core::host::Server;
    use partyraids_test_support::{RecordingReceiver, TestPartyService, TestServer};
    use tempfile::TempDir;

    use super::*;

    fn all_permissions() -> Vec<String> {
        RaidsVerb::COMPLETION_ORDER
            .iter()
            .map(|verb| verb.permission())
            .collect()
    }

    fn manager(dir: &TempDir) -> (Arc<TestServer>, Arc<RaidsManager>) {
        let server = Arc::new(TestServer::new(dir.path().join("worlds")));
        server.add_world("lobby");
        server.add_world("partyraids_leftover");
        let manager = RaidsManager::new(
            dir.path().join("data"),
            Arc::clone(&server) as Arc<dyn Server>,
            Arc::new(TestPartyService::new()),
            server.clock(),
            None,
        )
        .unwrap();
        (server, manager)
    }

    #[test]
    fn test_help_without_permissions_is_empty() {
        assert!(help(&[]).is_empty());
    }

    #[test]
    fn test_help_with_all_permissions_lists_six_lines() {
        let lines = help(&all_permissions());

        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "/raids start <raid> - Start specified raid");
        assert_eq!(lines[5], "/raids reload - Reload config for plugin");
    }

    #[test]
    fn test_tab_complete_verbs_follow_permissions() {
        let dir = TempDir::new().unwrap();
        let (_server, manager) = manager(&dir);
        let args = vec![String::new()];

        let all = tab_complete(&manager, "raids", &all_permissions(), &args);
        let some = tab_complete(&manager, "raids", &["raids.exit".to_owned()], &args);

        assert_eq!(
            all,
            vec!["start", "cancel", "exit", "end", "reload", "help", "package"]
        );
        assert_eq!(some, vec!["exit"]);
        assert!(tab_complete(&manager, "other", &all_permissions(), &args).is_empty());
    }

    #[test]
    fn test_tab_complete_arguments() {
        let dir = TempDir::new().unwrap();
        let (_server, manager) = manager(&dir);
        let perms = all_permissions();

        let raids = tab_complete(&manager, "raids", &perms, &["start".into(), String::new()]);
        let worlds = tab_complete(&manager, "raids", &perms, &["package".into(), String::new()]);
        let denied = tab_complete(&manager, "raids", &[], &["start".into(), String::new()]);

        assert_eq!(raids, vec!["example"]);
        assert_eq!(worlds, vec!["lobby"]);
        assert!(denied.is_empty());
    }

    #[test]
    fn test_process_command_ignores_other_labels() {
        let dir = TempDir::new().unwrap();
        let (_server, manager) = manager(&dir);
        let console = Arc::new(RecordingReceiver::default());
        let sender = CommandSender::Console(Arc::clone(&console) as Arc<dyn MessageReceiver>);

        assert!(!process_command(&manager, &sender, "party", &["start".into()], &all_permissions()));
        assert!(console.messages().is_empty());
    }

    #[test]
    fn test_process_command_reports_usage_errors() {
        // Arrange
        let dir = TempDir::new().unwrap();
        let (_server, manager) = manager(&dir);
        let console = Arc::new(RecordingReceiver::default());
        let sender = CommandSender::Console(Arc::clone(&console) as Arc<dyn MessageReceiver>);
        let perms = all_permissions();

        // Act
        assert!(process_command(&manager, &sender, "raids", &[], &perms));
        assert!(process_command(&manager, &sender, "raids", &["dance".into()], &[]));
        assert!(process_command(&manager, &sender, "raids", &["start".into(), "example".into()], &perms));
        assert!(process_command(&manager, &sender, "raids", &["cancel".into()], &perms));
        assert!(process_command(&manager, &sender, "raids", &["package".into(), "lobby".into()], &perms));

        // Assert
        assert_eq!(
            console.messages(),
            vec![
                "Command /raids requires at least one parameter",
                "Unknown command: /raids dance",
                "Player not specified as last parameter",
                "Only players can cancel raids",
                "/raids package requires 2 arguments",
            ]
        );
    }

    #[test]
    fn test_process_command_without_permission_is_silent() {
        let dir = TempDir::new().unwrap();
        let (_server, manager) = manager(&dir);
        let console = Arc::new(RecordingReceiver::default());
        let sender = CommandSender::Console(Arc::clone(&console) as Arc<dyn MessageReceiver>);

        assert!(process_command(&manager, &sender, "raids", &["reload".into()], &[]));
        assert!(console.messages().is_empty());
    }

    #[test]
    fn test_reload_reports_raid_count() {
        let dir = TempDir::new().unwrap();
        let (_server, manager) = manager(&dir);
        let console = Arc::new(RecordingReceiver::default());
        let sender = CommandSender::Console(Arc::clone(&console) as Arc<dyn MessageReceiver>);

        process_command(&manager, &sender, "raids", &["reload".into()], &all_permissions());

        assert_eq!(console.messages(), vec!["Config reloaded. Found 1 raids."]);
    }
}
