#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for TurfCash.
//!
//! The world owns every turf and player record. It is mutated exclusively
//! through [`apply`], which validates a [`Command`] in full before changing
//! anything, and it is observed through the read-only functions in [`query`].

use std::collections::BTreeMap;

use turfcash_core::{
    ActionError, AttackLog, Command, Event, PlayerId, SimulationConfig, Timestamp,
};

mod combat;
mod invariants;
mod ownership;
mod registry;
mod structures;
mod turf;
mod vaults;

pub use invariants::{check_invariants, InvariantViolation};

use registry::TurfRegistry;

/// Wallet and activity record of a registered player.
#[derive(Clone, Debug)]
struct Player {
    wallet_balance: f64,
    created_at: Timestamp,
    last_active_at: Timestamp,
}

/// Represents the authoritative TurfCash world state.
#[derive(Debug)]
pub struct World {
    config: SimulationConfig,
    registry: TurfRegistry,
    players: BTreeMap<PlayerId, Player>,
    attack_log: Vec<AttackLog>,
}

impl World {
    /// Creates an empty world driven by the provided configuration.
    #[must_use]
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            registry: TurfRegistry::new(config.hex_size, config.attack_ttl),
            players: BTreeMap::new(),
            attack_log: Vec::new(),
            config,
        }
    }

    fn wallet_of(&self, player: &PlayerId) -> Result<f64, ActionError> {
        self.players
            .get(player)
            .map(|state| state.wallet_balance)
            .ok_or_else(|| ActionError::UnknownPlayer {
                player: player.clone(),
            })
    }

    /// Charges a validated cost and records the player as active.
    fn debit(&mut self, player: &PlayerId, amount: f64, now: Timestamp) {
        if let Some(state) = self.players.get_mut(player) {
            state.wallet_balance -= amount;
            state.last_active_at = now;
        }
    }

    fn credit(&mut self, player: &PlayerId, amount: f64) {
        if let Some(state) = self.players.get_mut(player) {
            state.wallet_balance += amount;
        }
    }

    fn touch(&mut self, player: &PlayerId, now: Timestamp) {
        if let Some(state) = self.players.get_mut(player) {
            state.last_active_at = now;
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

/// Applies the provided command to the world at wall-clock time `now`.
///
/// Preconditions are checked before any state changes, so a rejected command
/// leaves the world untouched. The one exception is an attack rejected
/// because another attacker holds the turf, which still appends a
/// [`turfcash_core::AttackOutcome::Conflict`] entry to the audit log.
pub fn apply(
    world: &mut World,
    command: Command,
    now: Timestamp,
    out_events: &mut Vec<Event>,
) -> Result<(), ActionError> {
    match command {
        Command::RegisterPlayer { player } => {
            ownership::register_player(world, player, now, out_events)
        }
        Command::SurveyArea { center, radius } => {
            ownership::survey(world, center, radius, now, out_events);
            Ok(())
        }
        Command::CaptureTurf {
            player,
            turf,
            in_range,
        } => ownership::capture(world, player, turf, in_range, now, out_events),
        Command::CollectFromTurf {
            player,
            turf,
            in_range,
        } => vaults::collect(world, player, turf, in_range, now, out_events),
        Command::InvestInTurf {
            player,
            turf,
            amount,
            in_range,
        } => vaults::invest(world, player, turf, amount, in_range, now, out_events),
        Command::RaiseDefense {
            player,
            turf,
            in_range,
        } => ownership::raise_defense(world, player, turf, in_range, now, out_events),
        Command::BuildStructure { player, turf, kind } => {
            structures::build(world, player, turf, kind, now, out_events)
        }
        Command::UpgradeStructure {
            player,
            turf,
            structure,
        } => structures::upgrade(world, player, turf, structure, now, out_events),
        Command::AttackTurf {
            player,
            turf,
            weapon,
            in_range,
        } => combat::attack(world, player, turf, weapon, in_range, now, out_events),
        Command::ReinforceTurf {
            player,
            turf,
            amount,
        } => combat::reinforce(world, player, turf, amount, now, out_events),
        Command::CompleteStructures { turf } => {
            structures::complete(world, turf, now, out_events)
        }
        Command::AccrueIncome {
            turf,
            owner,
            since,
            amount,
        } => vaults::accrue_income(world, turf, owner, since, amount, now, out_events),
        Command::AdvanceAttack {
            turf,
            attacker,
            started_at,
            defense_health,
        } => combat::advance(world, turf, attacker, started_at, defense_health, now, out_events),
        Command::ResolveAttack {
            turf,
            attacker,
            started_at,
            outcome,
        } => combat::resolve(world, turf, attacker, started_at, outcome, now, out_events),
        Command::SiphonVault { from, to, amount } => {
            vaults::siphon(world, from, to, amount, now, out_events)
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use turfcash_core::{
        geo, AttackLog, CellKey, Coordinate, PlayerId, PlayerSnapshot, SimulationConfig,
        TurfSnapshot, TurfView,
    };

    use super::World;

    /// Provides read-only access to the configuration driving the world.
    #[must_use]
    pub fn config(world: &World) -> &SimulationConfig {
        &world.config
    }

    /// Captures the record of a registered player.
    #[must_use]
    pub fn player(world: &World, player: &PlayerId) -> Option<PlayerSnapshot> {
        world.players.get(player).map(|state| PlayerSnapshot {
            id: player.clone(),
            wallet_balance: state.wallet_balance,
            created_at: state.created_at,
            last_active_at: state.last_active_at,
        })
    }

    /// Identifiers of every registered player in ascending order.
    #[must_use]
    pub fn players(world: &World) -> Vec<PlayerId> {
        world.players.keys().cloned().collect()
    }

    /// Captures the record of the turf with the provided key.
    #[must_use]
    pub fn turf(world: &World, key: &CellKey) -> Option<TurfSnapshot> {
        world.registry.get(key).map(|turf| turf.snapshot())
    }

    /// Captures every materialized turf.
    #[must_use]
    pub fn turf_view(world: &World) -> TurfView {
        TurfView::from_snapshots(world.registry.iter().map(|turf| turf.snapshot()).collect())
    }

    /// Captures every turf owned by a registered player.
    #[must_use]
    pub fn owned_turf_view(world: &World) -> TurfView {
        TurfView::from_snapshots(
            world
                .registry
                .iter()
                .filter(|turf| {
                    turf.owner
                        .as_ref()
                        .is_some_and(|owner| world.players.contains_key(owner))
                })
                .map(|turf| turf.snapshot())
                .collect(),
        )
    }

    /// Captures every turf with an attack in progress.
    #[must_use]
    pub fn attack_view(world: &World) -> TurfView {
        TurfView::from_snapshots(
            world
                .registry
                .iter()
                .filter(|turf| turf.attack().is_some())
                .map(|turf| turf.snapshot())
                .collect(),
        )
    }

    /// Captures the turfs owned by `player`.
    #[must_use]
    pub fn turfs_owned_by(world: &World, player: &PlayerId) -> TurfView {
        TurfView::from_snapshots(
            world
                .registry
                .all_owned_by(player)
                .map(|turf| turf.snapshot())
                .collect(),
        )
    }

    /// Captures the materialized turfs within `radius` cells of `center`.
    ///
    /// Cells that were never surveyed are skipped.
    #[must_use]
    pub fn turfs_near(world: &World, center: Coordinate, radius: u32) -> TurfView {
        TurfView::from_snapshots(
            geo::neighborhood(center, world.config.hex_size, radius)
                .iter()
                .filter_map(|cell| world.registry.get(cell.key()))
                .map(|turf| turf.snapshot())
                .collect(),
        )
    }

    /// Audit log of resolved and rejected attacks in the order they were recorded.
    #[must_use]
    pub fn attack_log(world: &World) -> &[AttackLog] {
        &world.attack_log
    }

    /// Wallet balance plus the vault cash of every turf the player owns.
    #[must_use]
    pub fn net_worth(world: &World, player: &PlayerId) -> Option<f64> {
        let wallet = world.players.get(player)?.wallet_balance;
        let vaults: f64 = world
            .registry
            .all_owned_by(player)
            .map(|turf| turf.vault_cash)
            .sum();
        Some(wallet + vaults)
    }
}
