//! Fixed catalogs: purchasable weapon packs and constructible structures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Timestamp;

/// Growth factor applied to a structure's cost for every level above the first.
pub const STRUCTURE_COST_GROWTH: f64 = 1.5;

/// Purchasable weapon pack used to launch an attack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WeaponPack {
    /// Cheap pack that only threatens lightly defended turfs.
    Basic,
    /// Mid-tier pack.
    Advanced,
    /// Most expensive pack with the highest attack value.
    Elite,
}

impl WeaponPack {
    /// Every weapon pack offered by the catalog, cheapest first.
    pub const ALL: [Self; 3] = [Self::Basic, Self::Advanced, Self::Elite];

    /// Display name of the pack.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Basic => "Basic",
            Self::Advanced => "Advanced",
            Self::Elite => "Elite",
        }
    }

    /// Wallet cost charged when the pack is used.
    #[must_use]
    pub const fn cost(self) -> f64 {
        match self {
            Self::Basic => 10.0,
            Self::Advanced => 25.0,
            Self::Elite => 50.0,
        }
    }

    /// Total damage the pack delivers over an attack's TTL window.
    #[must_use]
    pub const fn attack_value(self) -> f64 {
        match self {
            Self::Basic => 25.0,
            Self::Advanced => 75.0,
            Self::Elite => 150.0,
        }
    }
}

/// Types of structures that can be built on an owned turf.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StructureKind {
    /// Adds defense and siphons cash from nearby enemy vaults once complete.
    DefenseTower,
    /// Adds a per-interval income bonus once complete.
    IncomeGenerator,
}

impl StructureKind {
    /// Every structure kind offered by the catalog.
    pub const ALL: [Self; 2] = [Self::DefenseTower, Self::IncomeGenerator];

    /// Display name of the structure kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::DefenseTower => "Defense Tower",
            Self::IncomeGenerator => "Income Generator",
        }
    }

    /// Cost of a level-one structure.
    #[must_use]
    pub const fn base_cost(self) -> f64 {
        match self {
            Self::DefenseTower => 50.0,
            Self::IncomeGenerator => 75.0,
        }
    }

    /// Defense bonus contributed per level once complete.
    #[must_use]
    pub const fn base_defense_bonus(self) -> f64 {
        match self {
            Self::DefenseTower => 25.0,
            Self::IncomeGenerator => 0.0,
        }
    }

    /// Income bonus contributed per level and income interval once complete.
    #[must_use]
    pub const fn base_income_bonus(self) -> f64 {
        match self {
            Self::DefenseTower => 0.0,
            Self::IncomeGenerator => 0.5,
        }
    }

    /// Time a build or upgrade of this kind takes to complete.
    #[must_use]
    pub const fn build_time(self) -> Duration {
        match self {
            Self::DefenseTower => Duration::from_secs(30),
            Self::IncomeGenerator => Duration::from_secs(45),
        }
    }

    /// Radius in metres within which a defense tower siphons enemy vaults.
    #[must_use]
    pub const fn steal_radius_m(self) -> Option<f64> {
        match self {
            Self::DefenseTower => Some(10.0),
            Self::IncomeGenerator => None,
        }
    }

    /// Fraction of the base income rate a defense tower siphons per proximity tick.
    #[must_use]
    pub const fn steal_rate(self) -> Option<f64> {
        match self {
            Self::DefenseTower => Some(0.1),
            Self::IncomeGenerator => None,
        }
    }

    /// Cost of building or upgrading to the provided level.
    ///
    /// `baseCost × 1.5^(level − 1)`; level zero is treated as level one.
    #[must_use]
    pub fn cost_at_level(self, level: u32) -> f64 {
        let exponent = i32::try_from(level.saturating_sub(1)).unwrap_or(i32::MAX);
        self.base_cost() * STRUCTURE_COST_GROWTH.powi(exponent)
    }

    /// Defense bonus of a completed structure at the provided level.
    #[must_use]
    pub fn defense_bonus_at_level(self, level: u32) -> f64 {
        self.base_defense_bonus() * f64::from(level)
    }

    /// Income bonus of a completed structure at the provided level.
    #[must_use]
    pub fn income_bonus_at_level(self, level: u32) -> f64 {
        self.base_income_bonus() * f64::from(level)
    }
}

/// Reports whether a build started at `started_at` is still in progress at `now`.
///
/// A structure without a start timestamp is idle and therefore complete.
#[must_use]
pub fn build_in_progress(started_at: Option<Timestamp>, build_time: Duration, now: Timestamp) -> bool {
    match started_at {
        Some(start) => now.seconds_since(start) < build_time.as_secs_f64(),
        None => false,
    }
}

/// Fraction of a build completed at `now`, clamped to `0.0..=1.0`.
#[must_use]
pub fn build_progress(started_at: Option<Timestamp>, build_time: Duration, now: Timestamp) -> f64 {
    let Some(start) = started_at else {
        return 1.0;
    };
    let total = build_time.as_secs_f64();
    if total <= 0.0 {
        return 1.0;
    }
    (now.seconds_since(start) / total).clamp(0.0, 1.0)
}

/// Computes a turf's defense value from its vault, multiplier and completed bonuses.
#[must_use]
pub fn defense_value(vault_cash: f64, defense_multiplier: u8, completed_defense_bonus: f64) -> f64 {
    vault_cash * f64::from(defense_multiplier) + completed_defense_bonus
}
