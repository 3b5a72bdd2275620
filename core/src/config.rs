//! Tunable simulation parameters gathered into a single structure.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Largest neighborhood radius, in cells, a nearby query may materialize.
pub const MAX_NEARBY_CELL_RADIUS: u32 = 20;

/// Named parameters that drive the simulation.
///
/// Durations are written as (fractional) seconds when serialized so that
/// configuration files stay readable. Missing fields fall back to the
/// defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Grid cell size in degrees on both axes.
    pub hex_size: f64,
    /// Maximum distance in metres at which range-gated actions are allowed.
    pub capture_range_m: f64,
    /// Passive income credited to a vault per income interval.
    pub base_income_rate: f64,
    /// Length of one income interval and period of the income ticker.
    #[serde(with = "duration_secs")]
    pub income_interval: Duration,
    /// Period of the combat ticker.
    #[serde(with = "duration_secs")]
    pub combat_interval: Duration,
    /// Period of the proximity siphon ticker.
    #[serde(with = "duration_secs")]
    pub proximity_interval: Duration,
    /// Fraction of the defender's vault transferred to a winning attacker.
    pub loot_percentage: f64,
    /// Window over which an attack delivers its damage before timing out.
    #[serde(with = "duration_secs")]
    pub attack_ttl: Duration,
    /// Minimum time between a resolved attack and the next one on the same turf.
    #[serde(with = "duration_secs")]
    pub attack_cooldown: Duration,
    /// Highest defense multiplier a turf can be raised to.
    pub max_defense_multiplier: u8,
    /// Cost per current multiplier level of raising a turf's defense.
    pub defense_upgrade_cost: f64,
    /// Wallet balance granted to a newly registered player.
    pub starting_wallet: f64,
    /// Radius, in cells, of the neighborhood materialized around a player.
    ///
    /// At most [`MAX_NEARBY_CELL_RADIUS`].
    pub nearby_cell_radius: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            hex_size: 0.0001,
            capture_range_m: 25.0,
            base_income_rate: 1.0,
            income_interval: Duration::from_secs(60),
            combat_interval: Duration::from_secs(1),
            proximity_interval: Duration::from_secs(5),
            loot_percentage: 0.25,
            attack_ttl: Duration::from_secs(90),
            attack_cooldown: Duration::from_secs(120),
            max_defense_multiplier: 5,
            defense_upgrade_cost: 50.0,
            starting_wallet: 100.0,
            nearby_cell_radius: 3,
        }
    }
}

/// Reasons a [`SimulationConfig`] is unusable.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A value that must be strictly positive was zero, negative or not finite.
    #[error("`{field}` must be positive, got {value}")]
    NotPositive {
        /// Name of the offending field.
        field: &'static str,
        /// Value that was rejected.
        value: f64,
    },
    /// A fraction was outside the `0.0..=1.0` range.
    #[error("`{field}` must lie within 0.0..=1.0, got {value}")]
    NotAFraction {
        /// Name of the offending field.
        field: &'static str,
        /// Value that was rejected.
        value: f64,
    },
    /// A value that must be non-negative was negative or not finite.
    #[error("`{field}` must not be negative, got {value}")]
    Negative {
        /// Name of the offending field.
        field: &'static str,
        /// Value that was rejected.
        value: f64,
    },
    /// A count exceeded its upper bound.
    #[error("`{field}` must be at most {max}, got {value}")]
    TooLarge {
        /// Name of the offending field.
        field: &'static str,
        /// Value that was rejected.
        value: u32,
        /// Largest accepted value.
        max: u32,
    },
}

impl SimulationConfig {
    /// Checks that every parameter lies within its usable range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("hex_size", self.hex_size)?;
        positive("capture_range_m", self.capture_range_m)?;
        positive("income_interval", self.income_interval.as_secs_f64())?;
        positive("combat_interval", self.combat_interval.as_secs_f64())?;
        positive("proximity_interval", self.proximity_interval.as_secs_f64())?;
        positive("attack_ttl", self.attack_ttl.as_secs_f64())?;
        positive(
            "max_defense_multiplier",
            f64::from(self.max_defense_multiplier),
        )?;
        non_negative("base_income_rate", self.base_income_rate)?;
        non_negative("defense_upgrade_cost", self.defense_upgrade_cost)?;
        non_negative("starting_wallet", self.starting_wallet)?;
        if !(0.0..=1.0).contains(&self.loot_percentage) {
            return Err(ConfigError::NotAFraction {
                field: "loot_percentage",
                value: self.loot_percentage,
            });
        }
        if self.nearby_cell_radius > MAX_NEARBY_CELL_RADIUS {
            return Err(ConfigError::TooLarge {
                field: "nearby_cell_radius",
                value: self.nearby_cell_radius,
                max: MAX_NEARBY_CELL_RADIUS,
            });
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}
