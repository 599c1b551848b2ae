mod common;

use std::fs;

use partyraids_console::console::{ConsoleAction, handle_line};
use partyraids_core::host::Server;
use tempfile::TempDir;

#[test]
fn test_quit_commands_end_the_session() {
    let dir = TempDir::new().unwrap();
    let (state, receiver) = common::build_state(&dir);

    assert_eq!(handle_line(&state, "stop"), ConsoleAction::Quit);
    assert_eq!(handle_line(&state, "/quit"), ConsoleAction::Quit);
    assert_eq!(handle_line(&state, "   "), ConsoleAction::Continue);
    assert!(receiver.messages().is_empty());
}

#[test]
fn test_unknown_label_is_reported() {
    let dir = TempDir::new().unwrap();
    let (state, receiver) = common::build_state(&dir);

    handle_line(&state, "party invite bob");

    assert_eq!(receiver.messages(), vec!["Unknown command: party"]);
}

#[test]
fn test_help_lists_every_verb_for_console() {
    let dir = TempDir::new().unwrap();
    let (state, receiver) = common::build_state(&dir);

    handle_line(&state, "/raids help");

    let messages = receiver.messages();
    assert_eq!(messages.len(), 6);
    assert_eq!(messages[0], "/raids start <raid> - Start specified raid");
}

#[test]
fn test_package_and_reload_from_console() {
    // Arrange
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("worlds").join("castle")).unwrap();
    fs::write(dir.path().join("worlds").join("castle").join("level.dat"), b"lvl").unwrap();
    let (state, receiver) = common::build_state(&dir);

    // Act
    handle_line(&state, "raids package castle keep");
    handle_line(&state, "raids reload");

    // Assert
    assert_eq!(
        receiver.messages(),
        vec![
            "World castle has been packaged as dungeon keep",
            "Config reloaded. Found 1 raids.",
        ]
    );
    assert!(
        dir.path()
            .join("data")
            .join("dungeons")
            .join("keep.zip")
            .is_file()
    );
}

#[test]
fn test_console_start_needs_an_online_player() {
    let dir = TempDir::new().unwrap();
    let (state, receiver) = common::build_state(&dir);

    handle_line(&state, "raids start example nobody");

    assert_eq!(
        receiver.messages(),
        vec!["Player not specified as last parameter"]
    );
}

#[test]
fn test_complete_prints_candidates() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("worlds").join("castle")).unwrap();
    let (state, receiver) = common::build_state(&dir);

    handle_line(&state, "complete raids");
    handle_line(&state, "complete raids start ex");
    handle_line(&state, "complete raids package c");

    assert_eq!(
        receiver.messages(),
        vec![
            "start cancel exit end reload help package",
            "example",
            "castle",
        ]
    );
}

#[test]
fn test_scrubber_removes_leftover_raid_worlds() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let leftover = dir.path().join("worlds").join("partyraids_1234");
    fs::create_dir_all(&leftover).unwrap();
    fs::write(leftover.join("level.dat"), b"lvl").unwrap();
    let (state, _receiver) = common::build_state(&dir);

    // Act
    common::run_ticks(&state, 15 * 20);

    // Assert
    assert!(state.server.world("partyraids_1234").is_none());
    assert!(!leftover.exists());
}

#[test]
fn test_shutdown_deletes_template_worlds() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("worlds").join("castle")).unwrap();
    let (state, _receiver) = common::build_state(&dir);
    handle_line(&state, "raids package castle keep");
    let world = state.manager.open_template_for_edit("keep").unwrap();
    let folder = world.folder();

    state.manager.shutdown();

    assert!(!folder.exists());
    assert!(state.server.world("castle").is_some());
}
