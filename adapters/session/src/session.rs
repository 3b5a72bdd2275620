//! The session owns the world, runs the periodic systems and exposes the
//! player actions.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use crossbeam_channel::{Receiver, Sender};
use tracing::debug;
use turfcash_core::{
    geo, ActionError, AttackLog, CellKey, Command, ConfigError, Coordinate, Event, PlayerId,
    PlayerSnapshot, SimulationConfig, StructureId, StructureKind, Timestamp, TurfSnapshot,
    TurfView, WeaponPack,
};
use turfcash_system_combat::CombatResolver;
use turfcash_system_economy::Economy;
use turfcash_system_siphon::ProximitySiphon;
use turfcash_world::{apply, query, World};

use crate::{
    collaborators::{AchievementSink, Clock, Collaborators, LocationProvider},
    tickers::{TickSummary, Ticker},
};

const NET_WORTH_NOTIFICATION: &str = "net_worth";

/// Aggregated figures shown on a player's profile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerStats {
    /// Cash held in the wallet.
    pub wallet_balance: f64,
    /// Wallet plus the vaults of every owned turf.
    pub net_worth: f64,
    /// Number of turfs owned by the player.
    pub owned_turfs: usize,
    /// Sum of the defense multipliers of every owned turf.
    pub total_defense_level: u32,
}

struct SessionState {
    world: World,
    economy: Economy,
    combat: CombatResolver,
    siphon: ProximitySiphon,
}

struct Shared {
    state: Mutex<SessionState>,
    subscribers: Mutex<Vec<Sender<Event>>>,
    clock: Arc<dyn Clock>,
    location: Arc<dyn LocationProvider>,
    achievements: Arc<dyn AchievementSink>,
}

/// Running game session shared by every player.
///
/// The world and the three systems sit behind a single mutex, so player
/// actions and tick batches are applied one at a time. Events produced by
/// either path are forwarded to subscribers once the lock is released.
pub struct Session {
    shared: Arc<Shared>,
    tickers: Vec<Ticker>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("tickers", &self.tickers)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a session over an empty world.
    ///
    /// Tickers are not started; call [`Session::start`] to run them on
    /// background threads or drive the `run_*_tick` methods directly.
    pub fn new(config: SimulationConfig, collaborators: Collaborators) -> Result<Self, ConfigError> {
        config.validate()?;
        let Collaborators {
            clock,
            location,
            achievements,
        } = collaborators;
        let state = SessionState {
            world: World::new(config),
            economy: Economy::new(),
            combat: CombatResolver::new(),
            siphon: ProximitySiphon::new(),
        };
        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                subscribers: Mutex::new(Vec::new()),
                clock,
                location,
                achievements,
            }),
            tickers: Vec::new(),
        })
    }

    /// Starts the income, combat and proximity tickers.
    ///
    /// Calling this on a running session does nothing.
    pub fn start(&mut self) -> Result<()> {
        if !self.tickers.is_empty() {
            return Ok(());
        }
        let config = self.config();

        let shared = Arc::clone(&self.shared);
        self.tickers.push(Ticker::spawn("income", config.income_interval, move || {
            shared.run_income_tick()
        })?);
        let shared = Arc::clone(&self.shared);
        self.tickers.push(Ticker::spawn("combat", config.combat_interval, move || {
            shared.run_combat_tick()
        })?);
        let shared = Arc::clone(&self.shared);
        self.tickers.push(Ticker::spawn(
            "proximity",
            config.proximity_interval,
            move || shared.run_proximity_tick(),
        )?);
        Ok(())
    }

    /// Reports whether the background tickers are running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.tickers.is_empty()
    }

    /// Stops every background ticker and waits for its thread to exit.
    pub fn shutdown(&mut self) {
        for ticker in self.tickers.drain(..) {
            ticker.stop();
        }
    }

    /// Returns a receiver that gets every event produced from now on.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<Event> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        self.shared.lock_subscribers().push(sender);
        receiver
    }

    /// Parameters the session runs with.
    #[must_use]
    pub fn config(&self) -> SimulationConfig {
        query::config(&self.shared.lock_state().world).clone()
    }

    /// Runs one income tick immediately.
    pub fn run_income_tick(&self) -> TickSummary {
        self.shared.run_income_tick()
    }

    /// Runs one combat tick immediately.
    pub fn run_combat_tick(&self) -> TickSummary {
        self.shared.run_combat_tick()
    }

    /// Runs one proximity siphon tick immediately.
    pub fn run_proximity_tick(&self) -> TickSummary {
        self.shared.run_proximity_tick()
    }

    /// Registers `player` with the starting wallet balance.
    pub fn register_player(&self, player: &PlayerId) -> Result<PlayerSnapshot, ActionError> {
        self.shared.execute(|_| Command::RegisterPlayer {
            player: player.clone(),
        })?;
        self.player(player).ok_or_else(|| ActionError::UnknownPlayer {
            player: player.clone(),
        })
    }

    /// Claims a neutral turf within capture range of the player.
    pub fn capture(&self, player: &PlayerId, turf: &CellKey) -> Result<(), ActionError> {
        self.shared.execute(|world| Command::CaptureTurf {
            player: player.clone(),
            turf: turf.clone(),
            in_range: self.shared.in_range(world, player, turf),
        })
    }

    /// Moves the whole vault of an owned turf into the player's wallet.
    pub fn collect(&self, player: &PlayerId, turf: &CellKey) -> Result<(), ActionError> {
        self.shared.execute(|world| Command::CollectFromTurf {
            player: player.clone(),
            turf: turf.clone(),
            in_range: self.shared.in_range(world, player, turf),
        })
    }

    /// Moves `amount` from the player's wallet into an owned turf's vault.
    pub fn invest(&self, player: &PlayerId, turf: &CellKey, amount: f64) -> Result<(), ActionError> {
        self.shared.execute(|world| Command::InvestInTurf {
            player: player.clone(),
            turf: turf.clone(),
            amount,
            in_range: self.shared.in_range(world, player, turf),
        })
    }

    /// Raises the defense multiplier of an owned turf by one.
    pub fn raise_defense(&self, player: &PlayerId, turf: &CellKey) -> Result<(), ActionError> {
        self.shared.execute(|world| Command::RaiseDefense {
            player: player.clone(),
            turf: turf.clone(),
            in_range: self.shared.in_range(world, player, turf),
        })
    }

    /// Starts construction of a structure on an owned turf.
    pub fn build(
        &self,
        player: &PlayerId,
        turf: &CellKey,
        kind: StructureKind,
    ) -> Result<(), ActionError> {
        self.shared.execute(|_| Command::BuildStructure {
            player: player.clone(),
            turf: turf.clone(),
            kind,
        })
    }

    /// Starts a timed upgrade of a completed structure.
    pub fn upgrade(
        &self,
        player: &PlayerId,
        turf: &CellKey,
        structure: StructureId,
    ) -> Result<(), ActionError> {
        self.shared.execute(|_| Command::UpgradeStructure {
            player: player.clone(),
            turf: turf.clone(),
            structure,
        })
    }

    /// Attacks a rival turf within range using `weapon`.
    pub fn attack(
        &self,
        player: &PlayerId,
        turf: &CellKey,
        weapon: WeaponPack,
    ) -> Result<(), ActionError> {
        self.shared.execute(|world| Command::AttackTurf {
            player: player.clone(),
            turf: turf.clone(),
            weapon,
            in_range: self.shared.in_range(world, player, turf),
        })
    }

    /// Spends `amount` to restore defense health on an attacked turf.
    pub fn reinforce(&self, player: &PlayerId, turf: &CellKey, amount: f64) -> Result<(), ActionError> {
        self.shared.execute(|_| Command::ReinforceTurf {
            player: player.clone(),
            turf: turf.clone(),
            amount,
        })
    }

    /// Turfs around the player's current position.
    ///
    /// Missing cells in the neighborhood are materialized as neutral turfs
    /// first. A player without a location fix sees nothing.
    pub fn nearby_turfs(&self, player: &PlayerId) -> TurfView {
        let Some(center) = self.shared.location.current_location(player) else {
            return TurfView::default();
        };
        let radius = self.config().nearby_cell_radius;
        if let Err(error) = self.shared.execute(|_| Command::SurveyArea { center, radius }) {
            debug!(target: "turfcash::session", player = %player, %error, "survey.rejected");
        }
        query::turfs_near(&self.shared.lock_state().world, center, radius)
    }

    /// Turf covering `coordinate`, materialized as neutral when first seen.
    pub fn turf_at(&self, coordinate: Coordinate) -> Option<TurfSnapshot> {
        if let Err(error) = self.shared.execute(|_| Command::SurveyArea {
            center: coordinate,
            radius: 0,
        }) {
            debug!(target: "turfcash::session", %error, "survey.rejected");
        }
        let state = self.shared.lock_state();
        let (key, _) = geo::cell_key(coordinate, query::config(&state.world).hex_size);
        query::turf(&state.world, &key)
    }

    /// Current record of the turf with the provided key.
    #[must_use]
    pub fn turf(&self, key: &CellKey) -> Option<TurfSnapshot> {
        query::turf(&self.shared.lock_state().world, key)
    }

    /// Current record of `player`.
    #[must_use]
    pub fn player(&self, player: &PlayerId) -> Option<PlayerSnapshot> {
        query::player(&self.shared.lock_state().world, player)
    }

    /// Turfs owned by `player`.
    #[must_use]
    pub fn player_turfs(&self, player: &PlayerId) -> TurfView {
        query::turfs_owned_by(&self.shared.lock_state().world, player)
    }

    /// Wallet balance of `player`.
    #[must_use]
    pub fn wallet_balance(&self, player: &PlayerId) -> Option<f64> {
        self.player(player).map(|snapshot| snapshot.wallet_balance)
    }

    /// Wallet plus every owned vault of `player`.
    #[must_use]
    pub fn net_worth(&self, player: &PlayerId) -> Option<f64> {
        query::net_worth(&self.shared.lock_state().world, player)
    }

    /// Profile figures of `player`.
    #[must_use]
    pub fn player_stats(&self, player: &PlayerId) -> Option<PlayerStats> {
        let state = self.shared.lock_state();
        let snapshot = query::player(&state.world, player)?;
        let net_worth = query::net_worth(&state.world, player)?;
        let owned = query::turfs_owned_by(&state.world, player);
        Some(PlayerStats {
            wallet_balance: snapshot.wallet_balance,
            net_worth,
            owned_turfs: owned.len(),
            total_defense_level: owned
                .iter()
                .map(|turf| u32::from(turf.defense_multiplier))
                .sum(),
        })
    }

    /// Audit log of every resolved or rejected attack.
    #[must_use]
    pub fn attack_log(&self) -> Vec<AttackLog> {
        query::attack_log(&self.shared.lock_state().world).to_vec()
    }

    /// Submits the player's net worth to the leaderboard sink.
    ///
    /// Returns the submitted score, rounded to the nearest whole unit.
    pub fn submit_net_worth(&self, player: &PlayerId) -> Option<i64> {
        let score = self.net_worth(player)?.round() as i64;
        self.shared
            .achievements
            .notify(player, NET_WORTH_NOTIFICATION, Some(score));
        Some(score)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_subscribers(&self) -> MutexGuard<'_, Vec<Sender<Event>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether `player` stands within capture range of `turf`.
    ///
    /// Unknown turfs and players without a fix are out of range.
    fn in_range(&self, world: &World, player: &PlayerId, turf: &CellKey) -> bool {
        query::turf(world, turf).is_some_and(|snapshot| {
            self.location.is_within_range(
                player,
                snapshot.coordinate,
                query::config(world).capture_range_m,
            )
        })
    }

    /// Applies the command built from the current world under the lock.
    fn execute<F>(&self, build: F) -> Result<(), ActionError>
    where
        F: FnOnce(&World) -> Command,
    {
        let mut events = Vec::new();
        let result = {
            let mut state = self.lock_state();
            let now = self.clock.now();
            let command = build(&state.world);
            let result = apply(&mut state.world, command, now, &mut events);
            self.broadcast(&events);
            result
        };
        if let Err(error) = &result {
            debug!(target: "turfcash::session", %error, "action.rejected");
        }
        self.notify_milestones(&events);
        result
    }

    fn run_income_tick(&self) -> TickSummary {
        self.run_tick("income", |state, now, out| {
            let SessionState { world, economy, .. } = state;
            economy.handle(&query::owned_turf_view(world), now, query::config(world), out);
        })
    }

    fn run_combat_tick(&self) -> TickSummary {
        self.run_tick("combat", |state, now, out| {
            let SessionState { world, combat, .. } = state;
            combat.handle(&query::attack_view(world), now, out);
        })
    }

    fn run_proximity_tick(&self) -> TickSummary {
        self.run_tick("proximity", |state, now, out| {
            let SessionState { world, siphon, .. } = state;
            siphon.handle(&query::owned_turf_view(world), now, query::config(world), out);
        })
    }

    /// Plans a batch of tick commands and applies it in one critical section.
    ///
    /// Commands the world rejects are skipped; the next tick recomputes them
    /// from fresh state.
    fn run_tick<F>(&self, ticker: &'static str, plan: F) -> TickSummary
    where
        F: FnOnce(&mut SessionState, Timestamp, &mut Vec<Command>),
    {
        let mut events = Vec::new();
        let mut summary = TickSummary::default();
        {
            let mut state = self.lock_state();
            let now = self.clock.now();
            let mut commands = Vec::new();
            plan(&mut *state, now, &mut commands);
            for command in commands {
                match apply(&mut state.world, command, now, &mut events) {
                    Ok(()) => summary.applied += 1,
                    Err(error) => {
                        summary.skipped += 1;
                        debug!(target: "turfcash::session", ticker, %error, "tick.command_skipped");
                    }
                }
            }
            self.broadcast(&events);
        }
        self.notify_milestones(&events);
        summary
    }

    /// Forwards events to subscribers.
    ///
    /// Callers hold the state lock so subscribers see events in the order
    /// the world applied them.
    fn broadcast(&self, events: &[Event]) {
        if events.is_empty() {
            return;
        }
        self.lock_subscribers().retain(|subscriber| {
            events
                .iter()
                .all(|event| subscriber.send(event.clone()).is_ok())
        });
    }

    fn notify_milestones(&self, events: &[Event]) {
        for event in events {
            if let Event::MilestoneReached { player, milestone } = event {
                self.achievements.notify(player, milestone.name(), None);
            }
        }
    }
}
