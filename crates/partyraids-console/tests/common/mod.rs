//! Shared test helpers for console integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use partyraids_console::settings::Settings;
use partyraids_console::state::AppState;
use partyraids_core::host::MessageReceiver;
use partyraids_test_support::RecordingReceiver;
use tempfile::TempDir;

/// Builds console state over scratch directories, recording output.
pub fn build_state(dir: &TempDir) -> (AppState, Arc<RecordingReceiver>) {
    let receiver = Arc::new(RecordingReceiver::default());
    let settings = Settings {
        data_dir: dir.path().join("data"),
        world_container: dir.path().join("worlds"),
        bundled_dungeons: None,
        tick_interval: Duration::from_millis(50),
    };
    let state = AppState::new(&settings, Arc::clone(&receiver) as Arc<dyn MessageReceiver>)
        .unwrap();
    (state, receiver)
}

/// Runs `ticks` host ticks.
pub fn run_ticks(state: &AppState, ticks: u64) {
    for _ in 0..ticks {
        state.server.tick();
    }
}
