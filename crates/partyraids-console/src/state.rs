//! Shared console host state.

use std::sync::Arc;

use partyraids_core::clock::SystemClock;
use partyraids_core::host::{MessageReceiver, Server};
use partyraids_orchestrator::RaidsManager;

use crate::error::AppError;
use crate::local_host::{LocalServer, NoParties};
use crate::settings::Settings;

/// Everything the console loop needs to service a line of input.
#[derive(Clone)]
pub struct AppState {
    /// The local host the orchestrator runs against.
    pub server: Arc<LocalServer>,
    /// The raid orchestrator.
    pub manager: Arc<RaidsManager>,
    /// Where command output is written.
    pub receiver: Arc<dyn MessageReceiver>,
}

impl AppState {
    /// Opens the world container and starts the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Raids` if the world container or data directory
    /// cannot be prepared.
    pub fn new(settings: &Settings, receiver: Arc<dyn MessageReceiver>) -> Result<Self, AppError> {
        let server = Arc::new(LocalServer::open(&settings.world_container)?);
        let manager = RaidsManager::new(
            settings.data_dir.clone(),
            Arc::clone(&server) as Arc<dyn Server>,
            Arc::new(NoParties),
            Arc::new(SystemClock),
            settings.bundled_dungeons.clone(),
        )?;
        Ok(Self {
            server,
            manager,
            receiver,
        })
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("server", &self.server)
            .field("manager", &self.manager)
            .finish_non_exhaustive()
    }
}
