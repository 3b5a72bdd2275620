//! World invariants: sanity checks that detect bugs in command handling.
//!
//! A correctly implemented world never violates these, whatever sequence of
//! commands it receives. Tests call [`check_invariants`] after every step.

use std::fmt;

use crate::{turf::CombatState, World};

/// Invariant violation error.
#[derive(Debug, Clone)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub message: String,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invariant violation: {}", self.message)
    }
}

impl std::error::Error for InvariantViolation {}

/// Checks every world invariant.
///
/// Returns the violations found, or an empty list if all invariants hold.
#[must_use]
pub fn check_invariants(world: &World) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    let max_multiplier = world.config.max_defense_multiplier;

    for (player, state) in &world.players {
        if !(state.wallet_balance.is_finite() && state.wallet_balance >= 0.0) {
            violations.push(InvariantViolation {
                message: format!("player {player} has wallet {}", state.wallet_balance),
            });
        }
    }

    for turf in world.registry.iter() {
        if !(turf.vault_cash.is_finite() && turf.vault_cash >= 0.0) {
            violations.push(InvariantViolation {
                message: format!("turf {} has vault {}", turf.key, turf.vault_cash),
            });
        }
        if turf.defense_multiplier < 1 || turf.defense_multiplier > max_multiplier {
            violations.push(InvariantViolation {
                message: format!(
                    "turf {} has multiplier {} outside 1..={max_multiplier}",
                    turf.key, turf.defense_multiplier
                ),
            });
        }
        for (index, structure) in turf.structures.iter().enumerate() {
            if structure.level < 1 {
                violations.push(InvariantViolation {
                    message: format!("structure {} on {} has level 0", structure.id, turf.key),
                });
            }
            if turf.structures[..index]
                .iter()
                .any(|earlier| earlier.kind == structure.kind)
            {
                violations.push(InvariantViolation {
                    message: format!(
                        "turf {} carries more than one {}",
                        turf.key,
                        structure.kind.name()
                    ),
                });
            }
        }
        if let CombatState::Attacking(attack) = &turf.combat {
            match &turf.owner {
                None => violations.push(InvariantViolation {
                    message: format!("neutral turf {} is under attack", turf.key),
                }),
                Some(owner) if *owner == attack.attacker => violations.push(InvariantViolation {
                    message: format!("turf {} is attacked by its own owner", turf.key),
                }),
                Some(_) => {}
            }
            if attack.defense_health > attack.defense_at_start + 1e-9 {
                violations.push(InvariantViolation {
                    message: format!(
                        "turf {} defense health {} exceeds start value {}",
                        turf.key, attack.defense_health, attack.defense_at_start
                    ),
                });
            }
        }
    }

    violations
}
