//! Line-oriented command input for the console host.
//!
//! A line is `[/]<label> <args...>`. The console holds every `raids.*`
//! permission. `complete <label> <args...>` prints tab-completion candidates
//! for the last argument, and `stop` or `quit` ends the session.

use std::sync::Arc;

use partyraids_core::host::{CommandSender, MessageReceiver};
use partyraids_orchestrator::{RaidsVerb, process_command, tab_complete};
use tracing::debug;

use crate::state::AppState;

const COMPLETE_COMMAND: &str = "complete";
const QUIT_COMMANDS: [&str; 2] = ["stop", "quit"];

/// What the console loop should do after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleAction {
    Continue,
    Quit,
}

/// Writes command output to standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReceiver;

impl MessageReceiver for ConsoleReceiver {
    fn send_message(&self, message: &str) {
        println!("{message}");
    }
}

/// Every permission node, as held by the console.
#[must_use]
pub fn console_permissions() -> Vec<String> {
    RaidsVerb::COMPLETION_ORDER
        .iter()
        .map(|verb| verb.permission())
        .collect()
}

/// Runs one line of console input.
pub fn handle_line(state: &AppState, line: &str) -> ConsoleAction {
    let line = line.trim();
    let line = line.strip_prefix('/').unwrap_or(line);
    let mut words = line.split_whitespace().map(str::to_owned);
    let Some(label) = words.next() else {
        return ConsoleAction::Continue;
    };
    let args: Vec<String> = words.collect();
    let permissions = console_permissions();

    if QUIT_COMMANDS.contains(&label.as_str()) {
        return ConsoleAction::Quit;
    }

    if label == COMPLETE_COMMAND {
        let Some((target, rest)) = args.split_first() else {
            state.receiver.send_message("Usage: complete <label> <args...>");
            return ConsoleAction::Continue;
        };
        let mut rest = rest.to_vec();
        if rest.is_empty() {
            rest.push(String::new());
        }
        let candidates = tab_complete(&state.manager, target, &permissions, &rest);
        state.receiver.send_message(&candidates.join(" "));
        return ConsoleAction::Continue;
    }

    let sender = CommandSender::Console(Arc::clone(&state.receiver));
    if !process_command(&state.manager, &sender, &label, &args, &permissions) {
        debug!(label = %label, "unhandled console command");
        state
            .receiver
            .send_message(&format!("Unknown command: {label}"));
    }
    ConsoleAction::Continue
}
