//! Party Raids console host entry point.

use std::error::Error;
use std::sync::Arc;

use partyraids_console::console::{ConsoleAction, ConsoleReceiver, handle_line};
use partyraids_console::settings::Settings;
use partyraids_console::state::AppState;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Logs go to stderr so command output on stdout stays readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting Party Raids console host");

    let settings = Settings::from_env()?;
    let state = AppState::new(&settings, Arc::new(ConsoleReceiver))?;

    let mut ticker = tokio::time::interval(settings.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                state.server.tick();
            }
            line = lines.next_line() => match line? {
                Some(line) => {
                    if handle_line(&state, &line) == ConsoleAction::Quit {
                        break;
                    }
                }
                None => break,
            },
            _ = &mut interrupt => {
                tracing::info!("Interrupt received");
                break;
            }
        }
    }

    state.manager.shutdown();
    tracing::info!("Party Raids console host stopped");
    Ok(())
}
