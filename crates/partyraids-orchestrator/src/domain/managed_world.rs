//! Managed worlds and the raid lifecycle state machine.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use partyraids_config::Raid;
use partyraids_core::error::RaidsError;
use partyraids_core::host::{Party, World};
use uuid::Uuid;

/// Idle time after which an unoccupied template world may be reclaimed.
pub const TEMPLATE_IDLE_MILLIS: i64 = 10_000;

/// Lifecycle of a raid instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RaidState {
    /// Provisioned and counting down.
    Queued,
    /// Party has been moved in.
    Started,
    /// Aborted before the countdown fired.
    Canceled,
}

impl fmt::Display for RaidState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Queued => "queued",
            Self::Started => "started",
            Self::Canceled => "canceled",
        })
    }
}

/// A raid world bound to the party running it.
#[derive(Clone)]
pub struct RaidInstance {
    raid: Arc<Raid>,
    party: Arc<dyn Party>,
    state: RaidState,
}

impl RaidInstance {
    /// The raid definition the world was built from.
    #[must_use]
    pub fn raid(&self) -> &Arc<Raid> {
        &self.raid
    }

    /// The party that owns the world.
    #[must_use]
    pub fn party(&self) -> &Arc<dyn Party> {
        &self.party
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> RaidState {
        self.state
    }

    fn transition(&mut self, to: RaidState) -> Result<(), RaidsError> {
        match (self.state, to) {
            (RaidState::Queued, RaidState::Started | RaidState::Canceled) => {
                self.state = to;
                Ok(())
            }
            (from, to) => Err(RaidsError::Conflict(format!(
                "raid {} cannot move from {from} to {to}",
                self.raid.name
            ))),
        }
    }
}

impl fmt::Debug for RaidInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RaidInstance")
            .field("raid", &self.raid.name)
            .field("party", &self.party.id())
            .field("state", &self.state)
            .finish()
    }
}

/// What a managed world is being used for.
#[derive(Debug, Clone)]
pub enum ManagedWorldKind {
    /// A template opened for editing.
    EditableTemplate {
        /// Dungeon id the world was extracted from.
        template_id: String,
    },
    /// A party's raid.
    RaidInstance(RaidInstance),
}

/// A world whose lifetime is owned by the orchestrator.
#[derive(Clone)]
pub struct ManagedWorld {
    world: Arc<dyn World>,
    created_at: DateTime<Utc>,
    kind: ManagedWorldKind,
}

impl ManagedWorld {
    /// Wraps a world opened for template editing.
    #[must_use]
    pub fn editable_template(
        world: Arc<dyn World>,
        template_id: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            world,
            created_at,
            kind: ManagedWorldKind::EditableTemplate {
                template_id: template_id.into(),
            },
        }
    }

    /// Wraps a freshly provisioned raid world in the `Queued` state.
    #[must_use]
    pub fn queued_raid(
        world: Arc<dyn World>,
        raid: Arc<Raid>,
        party: Arc<dyn Party>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            world,
            created_at,
            kind: ManagedWorldKind::RaidInstance(RaidInstance {
                raid,
                party,
                state: RaidState::Queued,
            }),
        }
    }

    #[must_use]
    pub fn world(&self) -> &Arc<dyn World> {
        &self.world
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.world.name()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn kind(&self) -> &ManagedWorldKind {
        &self.kind
    }

    /// The raid details, if this is a raid world.
    #[must_use]
    pub fn raid_instance(&self) -> Option<&RaidInstance> {
        match &self.kind {
            ManagedWorldKind::RaidInstance(instance) => Some(instance),
            ManagedWorldKind::EditableTemplate { .. } => None,
        }
    }

    /// The template id, if this is a template world.
    #[must_use]
    pub fn template_id(&self) -> Option<&str> {
        match &self.kind {
            ManagedWorldKind::EditableTemplate { template_id } => Some(template_id),
            ManagedWorldKind::RaidInstance(_) => None,
        }
    }

    /// Id of the owning party, if this is a raid world.
    #[must_use]
    pub fn party_id(&self) -> Option<Uuid> {
        self.raid_instance().map(|r| r.party.id())
    }

    /// Raid state, if this is a raid world.
    #[must_use]
    pub fn state(&self) -> Option<RaidState> {
        self.raid_instance().map(RaidInstance::state)
    }

    /// Time since the world was registered; never negative.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> TimeDelta {
        (now - self.created_at).max(TimeDelta::zero())
    }

    /// Whether the world may be reclaimed.
    ///
    /// Template worlds expire once older than ten seconds with nobody inside.
    /// Raid worlds expire when canceled, or when started and empty; a queued
    /// raid never expires on its own.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match &self.kind {
            ManagedWorldKind::EditableTemplate { .. } => {
                self.age(now) > TimeDelta::milliseconds(TEMPLATE_IDLE_MILLIS)
                    && self.world.players().is_empty()
            }
            ManagedWorldKind::RaidInstance(instance) => match instance.state {
                RaidState::Queued => false,
                RaidState::Canceled => true,
                RaidState::Started => self.world.players().is_empty(),
            },
        }
    }

    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired(now)
    }

    /// Moves a queued raid to `Started`.
    ///
    /// # Errors
    ///
    /// Returns `RaidsError::Conflict` unless this is a raid in `Queued`.
    pub fn start(&mut self) -> Result<(), RaidsError> {
        self.transition(RaidState::Started)
    }

    /// Moves a queued raid to `Canceled`.
    ///
    /// # Errors
    ///
    /// Returns `RaidsError::Conflict` unless this is a raid in `Queued`.
    pub fn cancel(&mut self) -> Result<(), RaidsError> {
        self.transition(RaidState::Canceled)
    }

    fn transition(&mut self, to: RaidState) -> Result<(), RaidsError> {
        match &mut self.kind {
            ManagedWorldKind::RaidInstance(instance) => instance.transition(to),
            ManagedWorldKind::EditableTemplate { .. } => Err(RaidsError::Conflict(format!(
                "world {} is not a raid",
                self.world.name()
            ))),
        }
    }
}

impl fmt::Debug for ManagedWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedWorld")
            .field("world", &self.world.name())
            .field("created_at", &self.created_at)
            .field("kind", &self.kind)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use partyraids_core::host::{Player, Server};
    use partyraids_core::location::{Point, WorldLocation};
    use partyraids_test_support::{TestParty, TestServer};
    use tempfile::TempDir;

    use super::*;

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
    }

    struct Fixture {
        _dir: TempDir,
        server: TestServer,
        party: Arc<TestParty>,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let server = TestServer::new(dir.path());
        let lobby = server.add_world("lobby");
        let alice = server.add_player("alice", &lobby, Point::ORIGIN, 5);
        let party = Arc::new(TestParty::new("heroes", &[&alice]));
        Fixture {
            _dir: dir,
            server,
            party,
        }
    }

    fn raid_world(fx: &Fixture) -> ManagedWorld {
        ManagedWorld::queued_raid(
            fx.server.add_world("partyraids_a") as Arc<dyn World>,
            Arc::new(Raid::new("example")),
            Arc::clone(&fx.party) as Arc<dyn Party>,
            created(),
        )
    }

    #[test]
    fn test_queued_raid_never_expires() {
        // Arrange
        let fx = fixture();
        let managed = raid_world(&fx);

        // Act
        let later = created() + TimeDelta::hours(1);

        // Assert
        assert_eq!(managed.state(), Some(RaidState::Queued));
        assert!(managed.is_active(later));
        assert_eq!(managed.party_id(), Some(fx.party.id()));
    }

    #[test]
    fn test_canceled_raid_expires_immediately() {
        let fx = fixture();
        let mut managed = raid_world(&fx);

        managed.cancel().unwrap();

        assert!(managed.is_expired(created()));
    }

    #[test]
    fn test_started_raid_expires_only_when_empty() {
        // Arrange
        let fx = fixture();
        let mut managed = raid_world(&fx);
        managed.start().unwrap();
        let alice = fx.server.player("alice").unwrap();

        // Act
        alice.teleport(&WorldLocation::new(Arc::clone(managed.world()), Point::ORIGIN));

        // Assert
        assert!(managed.is_active(created()));

        let lobby = fx.server.add_world("lobby") as Arc<dyn World>;
        alice.teleport(&WorldLocation::new(lobby, Point::ORIGIN));
        assert!(managed.is_expired(created()));
    }

    #[test]
    fn test_transitions_only_leave_queued() {
        let fx = fixture();
        let mut started = raid_world(&fx);
        started.start().unwrap();

        match started.cancel().unwrap_err() {
            RaidsError::Conflict(msg) => {
                assert_eq!(msg, "raid example cannot move from started to canceled");
            }
            other => panic!("expected Conflict, got {other:?}"),
        }
        assert!(matches!(started.start(), Err(RaidsError::Conflict(_))));

        let mut canceled = raid_world(&fx);
        canceled.cancel().unwrap();
        assert!(matches!(canceled.start(), Err(RaidsError::Conflict(_))));
        assert_eq!(canceled.state(), Some(RaidState::Canceled));
    }

    #[test]
    fn test_template_world_expires_after_idle_grace() {
        // Arrange
        let fx = fixture();
        let mut template = ManagedWorld::editable_template(
            fx.server.add_world("partyraids_edit") as Arc<dyn World>,
            "arena",
            created(),
        );

        // Act / Assert
        assert!(template.is_active(created() + TimeDelta::seconds(10)));
        assert!(template.is_expired(created() + TimeDelta::milliseconds(10_001)));
        assert_eq!(template.template_id(), Some("arena"));
        assert!(template.raid_instance().is_none());
        assert!(matches!(template.start(), Err(RaidsError::Conflict(_))));
    }

    #[test]
    fn test_occupied_template_world_stays_active() {
        let fx = fixture();
        let template = ManagedWorld::editable_template(
            fx.server.add_world("partyraids_edit") as Arc<dyn World>,
            "arena",
            created(),
        );
        let alice = fx.server.player("alice").unwrap();
        alice.teleport(&WorldLocation::new(Arc::clone(template.world()), Point::ORIGIN));

        assert!(template.is_active(created() + TimeDelta::minutes(5)));
    }

    #[test]
    fn test_age_is_clamped_at_zero() {
        let fx = fixture();
        let managed = raid_world(&fx);

        assert_eq!(managed.age(created() - TimeDelta::seconds(3)), TimeDelta::zero());
    }
}
