//! Shared test doubles for the party raids workspace.
//!
//! `TestServer` wires a `TickScheduler` to a `ManualClock` so that advancing
//! host ticks also advances wall-clock time, which keeps countdowns and
//! expiry checks in step.

mod clock;
mod host;
mod repository;

pub use clock::ManualClock;
pub use host::{
    RecordingReceiver, TestParty, TestPartyService, TestPlayer, TestServer, TestWorld,
};
pub use repository::{EmptyDocumentStore, FailingDocumentStore, RecordingDocumentStore};
