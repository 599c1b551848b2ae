//! Party Raids console — startup and runtime error types.

use partyraids_core::error::RaidsError;
use thiserror::Error;

/// Startup and runtime errors for the console host.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The orchestrator could not be started.
    #[error(transparent)]
    Raids(#[from] RaidsError),

    /// Reading standard input failed.
    #[error("console error: {0}")]
    Console(#[from] std::io::Error),
}
