//! Collaborators the session consumes but does not implement: wall clock,
//! player location, and the achievement/leaderboard sink.

use std::{
    collections::BTreeMap,
    fmt,
    sync::{Mutex, PoisonError},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use turfcash_core::{geo, Coordinate, PlayerId, Timestamp};

/// Source of the wall-clock time used to stamp every command.
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> Timestamp;
}

/// Clock backed by the operating system's real-time clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        Timestamp::from_duration(since_epoch)
    }
}

/// Clock that only moves when told to; used to replay scenarios deterministically.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    #[must_use]
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now = now.saturating_add(delta);
    }

    /// Moves the clock to `at`.
    pub fn set(&self, at: Timestamp) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Supplies player positions for range-gated actions.
pub trait LocationProvider: Send + Sync {
    /// Last known position of `player`, or `None` without a fix.
    fn current_location(&self, player: &PlayerId) -> Option<Coordinate>;

    /// Reports whether `player` is within `threshold_m` metres of `target`.
    ///
    /// A player without a fix is never in range.
    fn is_within_range(&self, player: &PlayerId, target: Coordinate, threshold_m: f64) -> bool {
        self.current_location(player)
            .is_some_and(|here| geo::distance_m(here, target) <= threshold_m)
    }
}

/// Location provider fed with explicit positions, one per player.
#[derive(Debug, Default)]
pub struct PlayerLocations {
    positions: Mutex<BTreeMap<PlayerId, Coordinate>>,
}

impl PlayerLocations {
    /// Creates a provider with no known positions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the current position of `player`.
    pub fn place(&self, player: PlayerId, at: Coordinate) {
        let _ = self
            .positions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(player, at);
    }

    /// Forgets the position of `player`, as when the location fix is lost.
    pub fn remove(&self, player: &PlayerId) {
        let _ = self
            .positions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(player);
    }
}

impl LocationProvider for PlayerLocations {
    fn current_location(&self, player: &PlayerId) -> Option<Coordinate> {
        self.positions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(player)
            .copied()
    }
}

/// Fire-and-forget receiver of achievement and leaderboard notifications.
pub trait AchievementSink: Send + Sync {
    /// Reports `name` for `player` with an optional numeric payload.
    fn notify(&self, player: &PlayerId, name: &str, value: Option<i64>);
}

/// Sink that discards every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullAchievements;

impl AchievementSink for NullAchievements {
    fn notify(&self, _player: &PlayerId, _name: &str, _value: Option<i64>) {}
}

/// Bundle of collaborators handed to a session.
#[derive(Clone)]
pub struct Collaborators {
    /// Clock stamping every command.
    pub clock: std::sync::Arc<dyn Clock>,
    /// Provider answering range checks.
    pub location: std::sync::Arc<dyn LocationProvider>,
    /// Sink receiving milestone and leaderboard notifications.
    pub achievements: std::sync::Arc<dyn AchievementSink>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            clock: std::sync::Arc::new(SystemClock),
            location: std::sync::Arc::new(PlayerLocations::new()),
            achievements: std::sync::Arc::new(NullAchievements),
        }
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
