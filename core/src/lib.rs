#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the TurfCash simulation.
//!
//! This crate defines the message surface that connects the session adapter,
//! the authoritative world, and the pure tick systems. The session submits
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! describing what changed. Systems read immutable [`TurfView`] snapshots and
//! respond exclusively with new command batches.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

mod catalog;
mod config;
mod error;
pub mod geo;

pub use catalog::{
    build_in_progress, build_progress, defense_value, StructureKind, WeaponPack,
    STRUCTURE_COST_GROWTH,
};
pub use config::{ConfigError, SimulationConfig, MAX_NEARBY_CELL_RADIUS};
pub use error::ActionError;

/// Stable identifier of a player, supplied by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(String);

impl PlayerId {
    /// Wraps the provided identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrows the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Deterministic key of a grid cell, formatted as `"{lat}:{lon}"`.
///
/// Keys order lexicographically, which gives tick systems a reproducible
/// processing order.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellKey(String);

impl CellKey {
    /// Wraps a preformatted key. Use [`geo::cell_key`] to derive one.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrows the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier assigned to a structure by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StructureId(u32);

impl StructureId {
    /// Creates a new structure identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for StructureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Geographic coordinate in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    /// Creates a coordinate from latitude and longitude in degrees.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Wall-clock instant expressed as the time elapsed since the UNIX epoch.
///
/// Timers are stored as timestamps rather than tick counters so that a
/// process that misses ticks recomputes the real elapsed time on the next one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(Duration);

impl Timestamp {
    /// The UNIX epoch.
    pub const EPOCH: Self = Self(Duration::ZERO);

    /// Creates a timestamp from the time elapsed since the epoch.
    #[must_use]
    pub const fn from_duration(since_epoch: Duration) -> Self {
        Self(since_epoch)
    }

    /// Creates a timestamp from whole seconds since the epoch.
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    /// Time elapsed between the epoch and this timestamp.
    #[must_use]
    pub const fn since_epoch(&self) -> Duration {
        self.0
    }

    /// Seconds elapsed since `earlier`, or zero when `earlier` is later.
    #[must_use]
    pub fn seconds_since(self, earlier: Timestamp) -> f64 {
        self.0.saturating_sub(earlier.0).as_secs_f64()
    }

    /// Returns the timestamp shifted forward by `delta`.
    #[must_use]
    pub fn saturating_add(self, delta: Duration) -> Self {
        Self(self.0.saturating_add(delta))
    }
}

/// Outcome recorded for an attack in the audit log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackOutcome {
    /// The attacker depleted the defense before the TTL expired.
    Win,
    /// Reserved for an explicit defeat rule; never produced by the resolver.
    Loss,
    /// The TTL expired before the defense was depleted.
    Timeout,
    /// The attack was rejected because another attacker held the turf.
    Conflict,
}

/// Immutable audit record produced when an attack reaches a terminal outcome.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttackLog {
    /// Turf that was attacked.
    pub turf: CellKey,
    /// Player that launched the attack.
    pub attacker: PlayerId,
    /// Owner of the turf when the attack was resolved.
    pub defender: Option<PlayerId>,
    /// Attack value committed to the attack.
    pub attack_value: f64,
    /// Defense value snapshot taken when the attack started.
    pub defense_value: f64,
    /// Terminal outcome of the attack.
    pub outcome: AttackOutcome,
    /// Time at which the outcome was recorded.
    pub timestamp: Timestamp,
    /// Cash moved from the defender's vault to the attacker.
    pub loot: f64,
}

/// Ownership milestones reported to the achievement collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Milestone {
    /// The player captured their first turf.
    FirstCapture,
    /// The player owns ten turfs.
    TenTurfs,
}

impl Milestone {
    /// Identifier reported to the achievement collaborator.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::FirstCapture => "first_capture",
            Self::TenTurfs => "ten_turfs",
        }
    }

    /// Milestone reached when a player's owned-turf count becomes `owned`.
    #[must_use]
    pub const fn for_owned_count(owned: usize) -> Option<Self> {
        match owned {
            1 => Some(Self::FirstCapture),
            10 => Some(Self::TenTurfs),
            _ => None,
        }
    }
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Registers a player with the starting wallet balance.
    RegisterPlayer {
        /// Identifier supplied by the identity provider.
        player: PlayerId,
    },
    /// Materializes the square neighborhood around a coordinate as neutral turfs.
    SurveyArea {
        /// Coordinate at the center of the neighborhood.
        center: Coordinate,
        /// Radius of the neighborhood measured in cells.
        radius: u32,
    },
    /// Claims a neutral turf for the player.
    CaptureTurf {
        /// Acting player.
        player: PlayerId,
        /// Turf to capture.
        turf: CellKey,
        /// Whether the location provider reports the player within range.
        in_range: bool,
    },
    /// Moves the whole vault of an owned turf into the player's wallet.
    CollectFromTurf {
        /// Acting player.
        player: PlayerId,
        /// Turf to collect from.
        turf: CellKey,
        /// Whether the location provider reports the player within range.
        in_range: bool,
    },
    /// Moves cash from the player's wallet into an owned turf's vault.
    InvestInTurf {
        /// Acting player.
        player: PlayerId,
        /// Turf to invest in.
        turf: CellKey,
        /// Amount to move from the wallet into the vault.
        amount: f64,
        /// Whether the location provider reports the player within range.
        in_range: bool,
    },
    /// Raises the defense multiplier of an owned turf by one.
    RaiseDefense {
        /// Acting player.
        player: PlayerId,
        /// Turf to fortify.
        turf: CellKey,
        /// Whether the location provider reports the player within range.
        in_range: bool,
    },
    /// Starts construction of a new structure on an owned turf.
    BuildStructure {
        /// Acting player.
        player: PlayerId,
        /// Turf to build on.
        turf: CellKey,
        /// Kind of structure to build.
        kind: StructureKind,
    },
    /// Starts a timed upgrade of an existing structure.
    UpgradeStructure {
        /// Acting player.
        player: PlayerId,
        /// Turf carrying the structure.
        turf: CellKey,
        /// Structure to upgrade.
        structure: StructureId,
    },
    /// Launches an attack on a rival turf using a purchased weapon pack.
    AttackTurf {
        /// Attacking player.
        player: PlayerId,
        /// Turf to attack.
        turf: CellKey,
        /// Weapon pack purchased for the attack.
        weapon: WeaponPack,
        /// Whether the location provider reports the player within range.
        in_range: bool,
    },
    /// Spends wallet cash to restore defense health during an attack.
    ReinforceTurf {
        /// Owner of the attacked turf.
        player: PlayerId,
        /// Turf under attack.
        turf: CellKey,
        /// Amount spent on reinforcement.
        amount: f64,
    },
    /// Marks every structure on a turf whose build finished as complete.
    CompleteStructures {
        /// Turf carrying the structures.
        turf: CellKey,
    },
    /// Credits passive income accrued since `since` to a turf's vault.
    AccrueIncome {
        /// Turf receiving the income.
        turf: CellKey,
        /// Owner the income was computed for.
        owner: PlayerId,
        /// `last_income_at` value the income was computed from.
        since: Timestamp,
        /// Income to credit.
        amount: f64,
    },
    /// Persists the decremented defense health of an ongoing attack.
    AdvanceAttack {
        /// Turf under attack.
        turf: CellKey,
        /// Attacker the damage was computed for.
        attacker: PlayerId,
        /// Start of the attack the damage was computed for.
        started_at: Timestamp,
        /// Defense health remaining after the damage.
        defense_health: f64,
    },
    /// Ends an ongoing attack with a terminal outcome.
    ResolveAttack {
        /// Turf under attack.
        turf: CellKey,
        /// Attacker the outcome was computed for.
        attacker: PlayerId,
        /// Start of the attack the outcome was computed for.
        started_at: Timestamp,
        /// Terminal outcome to apply.
        outcome: AttackOutcome,
    },
    /// Transfers cash from an enemy vault into a tower-owning turf's vault.
    SiphonVault {
        /// Enemy turf losing cash.
        from: CellKey,
        /// Tower-owning turf receiving cash.
        to: CellKey,
        /// Amount to transfer.
        amount: f64,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that a player joined the session.
    PlayerRegistered {
        /// Identifier of the new player.
        player: PlayerId,
        /// Starting wallet balance.
        wallet_balance: f64,
    },
    /// Announces that a previously unknown cell was materialized as a neutral turf.
    TurfDiscovered {
        /// Key of the new turf.
        turf: CellKey,
    },
    /// Carries the updated record of a turf whose state changed.
    TurfUpdated {
        /// Snapshot taken after the change.
        turf: TurfSnapshot,
    },
    /// Confirms that a player captured a neutral turf.
    TurfCaptured {
        /// Capturing player.
        player: PlayerId,
        /// Captured turf.
        turf: CellKey,
    },
    /// Confirms that a vault was emptied into a wallet.
    CashCollected {
        /// Collecting player.
        player: PlayerId,
        /// Turf collected from.
        turf: CellKey,
        /// Amount moved into the wallet.
        amount: f64,
    },
    /// Confirms that wallet cash was moved into a vault.
    CashInvested {
        /// Investing player.
        player: PlayerId,
        /// Turf invested in.
        turf: CellKey,
        /// Amount moved into the vault.
        amount: f64,
    },
    /// Confirms that a turf's defense multiplier was raised.
    DefenseRaised {
        /// Turf that was fortified.
        turf: CellKey,
        /// New defense multiplier.
        multiplier: u8,
    },
    /// Confirms that construction of a new structure started.
    StructureBuildStarted {
        /// Turf carrying the structure.
        turf: CellKey,
        /// Identifier allocated to the structure.
        structure: StructureId,
        /// Kind of structure under construction.
        kind: StructureKind,
    },
    /// Confirms that an upgrade of an existing structure started.
    StructureUpgradeStarted {
        /// Turf carrying the structure.
        turf: CellKey,
        /// Structure being upgraded.
        structure: StructureId,
        /// Level the structure is being upgraded to.
        level: u32,
    },
    /// Reports that a structure's build or upgrade was latched complete.
    StructureCompleted {
        /// Turf carrying the structure.
        turf: CellKey,
        /// Structure that finished.
        structure: StructureId,
    },
    /// Reports that passive income was credited to a vault.
    IncomeAccrued {
        /// Turf that received income.
        turf: CellKey,
        /// Amount credited.
        amount: f64,
    },
    /// Confirms that an attack started or was stacked by the same attacker.
    AttackStarted {
        /// Turf under attack.
        turf: CellKey,
        /// Attacking player.
        attacker: PlayerId,
        /// Weapon pack used.
        weapon: WeaponPack,
    },
    /// Confirms that the owner reinforced an attacked turf.
    AttackReinforced {
        /// Turf under attack.
        turf: CellKey,
        /// Defense health after reinforcement.
        defense_health: f64,
    },
    /// Reports the terminal outcome of an attack.
    AttackResolved {
        /// Audit record describing the outcome.
        log: AttackLog,
    },
    /// Reports that a tower siphoned cash from an enemy vault.
    VaultSiphoned {
        /// Enemy turf that lost cash.
        from: CellKey,
        /// Tower-owning turf that gained cash.
        to: CellKey,
        /// Amount transferred.
        amount: f64,
    },
    /// Reports that a player reached an ownership milestone.
    MilestoneReached {
        /// Player reaching the milestone.
        player: PlayerId,
        /// Milestone reached.
        milestone: Milestone,
    },
}

/// Immutable representation of a single structure used for queries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StructureSnapshot {
    /// Identifier allocated by the world.
    pub id: StructureId,
    /// Kind of structure.
    pub kind: StructureKind,
    /// Current level, starting at one.
    pub level: u32,
    /// Start of the current build or upgrade, cleared once latched complete.
    pub build_started_at: Option<Timestamp>,
}

impl StructureSnapshot {
    /// Reports whether the structure is still under construction at `now`.
    #[must_use]
    pub fn is_building(&self, now: Timestamp) -> bool {
        build_in_progress(self.build_started_at, self.kind.build_time(), now)
    }

    /// Fraction of the current build completed at `now`.
    #[must_use]
    pub fn progress(&self, now: Timestamp) -> f64 {
        build_progress(self.build_started_at, self.kind.build_time(), now)
    }

    /// Cost of the structure's current level.
    #[must_use]
    pub fn current_cost(&self) -> f64 {
        self.kind.cost_at_level(self.level)
    }

    /// Defense bonus at the current level, ignoring construction state.
    #[must_use]
    pub fn current_defense_bonus(&self) -> f64 {
        self.kind.defense_bonus_at_level(self.level)
    }

    /// Income bonus at the current level, ignoring construction state.
    #[must_use]
    pub fn current_income_bonus(&self) -> f64 {
        self.kind.income_bonus_at_level(self.level)
    }
}

/// Immutable representation of an ongoing attack.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttackSnapshot {
    /// Attacking player.
    pub attacker: PlayerId,
    /// Time the attack started.
    pub started_at: Timestamp,
    /// Attack value delivered linearly over the TTL window.
    pub pending_attack_value: f64,
    /// Time damage was last applied.
    pub last_processed_at: Timestamp,
    /// Defense health remaining.
    pub defense_health: f64,
    /// Defense value snapshot taken when the attack started.
    pub defense_at_start: f64,
}

/// Immutable representation of a single turf used for queries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurfSnapshot {
    /// Deterministic cell key.
    pub key: CellKey,
    /// Procedural display name.
    pub name: String,
    /// Aligned centroid of the cell.
    pub coordinate: Coordinate,
    /// Current owner; `None` for neutral turfs.
    pub owner: Option<PlayerId>,
    /// Cash held in the turf's vault.
    pub vault_cash: f64,
    /// Defense multiplier between one and the configured maximum.
    pub defense_multiplier: u8,
    /// Time income was last credited.
    pub last_income_at: Timestamp,
    /// Structures built on the turf, in construction order.
    pub structures: Vec<StructureSnapshot>,
    /// TTL applied to attacks on this turf.
    pub attack_ttl: Duration,
    /// Ongoing attack, if any.
    pub attack: Option<AttackSnapshot>,
    /// Time before which the turf cannot be attacked again.
    pub attack_cooldown_until: Option<Timestamp>,
}

impl TurfSnapshot {
    /// Reports whether the turf has no owner.
    #[must_use]
    pub fn is_neutral(&self) -> bool {
        self.owner.is_none()
    }

    /// Reports whether an attack is in progress.
    #[must_use]
    pub fn is_under_attack(&self) -> bool {
        self.attack.is_some()
    }

    /// Defense value at `now`; structures still under construction contribute nothing.
    #[must_use]
    pub fn defense_value(&self, now: Timestamp) -> f64 {
        let bonus: f64 = self
            .structures
            .iter()
            .filter(|structure| !structure.is_building(now))
            .map(StructureSnapshot::current_defense_bonus)
            .sum();
        defense_value(self.vault_cash, self.defense_multiplier, bonus)
    }

    /// Completed structures of the provided kind at `now`.
    pub fn completed_structures(
        &self,
        kind: StructureKind,
        now: Timestamp,
    ) -> impl Iterator<Item = &StructureSnapshot> {
        self.structures
            .iter()
            .filter(move |structure| structure.kind == kind && !structure.is_building(now))
    }
}

/// Read-only snapshot describing a set of turfs in ascending key order.
#[derive(Clone, Debug, Default)]
pub struct TurfView {
    snapshots: Vec<TurfSnapshot>,
}

impl TurfView {
    /// Creates a new turf view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<TurfSnapshot>) -> Self {
        snapshots.sort_by(|left, right| left.key.cmp(&right.key));
        Self { snapshots }
    }

    /// Iterator over the captured turf snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &TurfSnapshot> {
        self.snapshots.iter()
    }

    /// Looks up the snapshot of the turf with the provided key.
    #[must_use]
    pub fn get(&self, key: &CellKey) -> Option<&TurfSnapshot> {
        self.snapshots
            .binary_search_by(|snapshot| snapshot.key.cmp(key))
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Number of turfs captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view captured no turfs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<TurfSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a player used for queries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// Stable identifier.
    pub id: PlayerId,
    /// Spendable cash outside of any vault.
    pub wallet_balance: f64,
    /// Time the player was registered.
    pub created_at: Timestamp,
    /// Time of the player's last successful action.
    pub last_active_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turf(key: &str) -> TurfSnapshot {
        TurfSnapshot {
            key: CellKey::new(key),
            name: String::from("Sector 0000-0000"),
            coordinate: Coordinate::new(0.0, 0.0),
            owner: None,
            vault_cash: 0.0,
            defense_multiplier: 1,
            last_income_at: Timestamp::EPOCH,
            structures: Vec::new(),
            attack_ttl: Duration::from_secs(90),
            attack: None,
            attack_cooldown_until: None,
        }
    }

    #[test]
    fn seconds_since_saturates_at_zero() {
        let earlier = Timestamp::from_secs(10);
        let later = Timestamp::from_secs(25);
        assert!((later.seconds_since(earlier) - 15.0).abs() < f64::EPSILON);
        assert!(earlier.seconds_since(later).abs() < f64::EPSILON);
    }

    #[test]
    fn turf_view_orders_by_key_and_supports_lookup() {
        let view = TurfView::from_snapshots(vec![turf("2:0"), turf("1:0"), turf("1:5")]);
        let keys: Vec<&str> = view.iter().map(|snapshot| snapshot.key.as_str()).collect();
        assert_eq!(keys, vec!["1:0", "1:5", "2:0"]);
        assert!(view.get(&CellKey::new("1:5")).is_some());
        assert!(view.get(&CellKey::new("3:3")).is_none());
    }

    #[test]
    fn building_structures_do_not_defend() {
        let mut snapshot = turf("0:0");
        snapshot.vault_cash = 40.0;
        snapshot.structures.push(StructureSnapshot {
            id: StructureId::new(0),
            kind: StructureKind::DefenseTower,
            level: 1,
            build_started_at: Some(Timestamp::from_secs(100)),
        });
        assert!((snapshot.defense_value(Timestamp::from_secs(110)) - 40.0).abs() < 1e-9);
        assert!((snapshot.defense_value(Timestamp::from_secs(130)) - 65.0).abs() < 1e-9);
    }

    #[test]
    fn milestones_fire_on_first_and_tenth_turf() {
        assert_eq!(Milestone::for_owned_count(1), Some(Milestone::FirstCapture));
        assert_eq!(Milestone::for_owned_count(2), None);
        assert_eq!(Milestone::for_owned_count(10), Some(Milestone::TenTurfs));
        assert_eq!(Milestone::TenTurfs.name(), "ten_turfs");
    }

    #[test]
    fn attack_log_round_trips_through_bincode() {
        let log = AttackLog {
            turf: CellKey::new("1:2"),
            attacker: PlayerId::new("attacker"),
            defender: Some(PlayerId::new("defender")),
            attack_value: 75.0,
            defense_value: 40.0,
            outcome: AttackOutcome::Win,
            timestamp: Timestamp::from_secs(42),
            loot: 10.0,
        };
        let bytes = bincode::serialize(&log).expect("serialize");
        let restored: AttackLog = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, log);
    }
}
