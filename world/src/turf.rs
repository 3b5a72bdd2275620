//! Authoritative turf records and their combat state.

use std::time::Duration;

use turfcash_core::{
    defense_value, geo, AttackSnapshot, CellKey, Coordinate, PlayerId, StructureId, Timestamp,
    TurfSnapshot,
};

use crate::structures::Structure;

/// Ongoing attack embedded in a turf.
#[derive(Clone, Debug)]
pub(crate) struct Attack {
    pub(crate) attacker: PlayerId,
    pub(crate) started_at: Timestamp,
    pub(crate) pending_attack_value: f64,
    pub(crate) last_processed_at: Timestamp,
    pub(crate) defense_health: f64,
    pub(crate) defense_at_start: f64,
}

impl Attack {
    /// Reports whether this is the attack a tick command was computed for.
    pub(crate) fn matches(&self, attacker: &PlayerId, started_at: Timestamp) -> bool {
        &self.attacker == attacker && self.started_at == started_at
    }
}

/// Combat state of a turf; attack fields only exist while attacking.
#[derive(Clone, Debug)]
pub(crate) enum CombatState {
    Idle,
    Attacking(Attack),
}

/// Authoritative state of a single turf.
#[derive(Clone, Debug)]
pub(crate) struct Turf {
    pub(crate) key: CellKey,
    pub(crate) name: String,
    pub(crate) coordinate: Coordinate,
    pub(crate) owner: Option<PlayerId>,
    pub(crate) vault_cash: f64,
    pub(crate) defense_multiplier: u8,
    pub(crate) last_income_at: Timestamp,
    pub(crate) structures: Vec<Structure>,
    pub(crate) attack_ttl: Duration,
    pub(crate) combat: CombatState,
    pub(crate) attack_cooldown_until: Option<Timestamp>,
}

impl Turf {
    /// Creates a neutral turf for the cell with the provided key and centroid.
    pub(crate) fn neutral(key: CellKey, centroid: Coordinate, attack_ttl: Duration, now: Timestamp) -> Self {
        Self {
            key,
            name: geo::sector_name(centroid),
            coordinate: centroid,
            owner: None,
            vault_cash: 0.0,
            defense_multiplier: 1,
            last_income_at: now,
            structures: Vec::new(),
            attack_ttl,
            combat: CombatState::Idle,
            attack_cooldown_until: None,
        }
    }

    pub(crate) fn is_owned_by(&self, player: &PlayerId) -> bool {
        self.owner.as_ref() == Some(player)
    }

    pub(crate) fn attack(&self) -> Option<&Attack> {
        match &self.combat {
            CombatState::Idle => None,
            CombatState::Attacking(attack) => Some(attack),
        }
    }

    pub(crate) fn attack_mut(&mut self) -> Option<&mut Attack> {
        match &mut self.combat {
            CombatState::Idle => None,
            CombatState::Attacking(attack) => Some(attack),
        }
    }

    /// Defense value at `now`; structures still under construction contribute nothing.
    pub(crate) fn defense_value(&self, now: Timestamp) -> f64 {
        let bonus: f64 = self
            .structures
            .iter()
            .filter(|structure| !structure.is_building(now))
            .map(Structure::current_defense_bonus)
            .sum();
        defense_value(self.vault_cash, self.defense_multiplier, bonus)
    }

    /// Clears the build timer of every structure whose build finished by `now`
    /// and returns the latched structures.
    pub(crate) fn latch_completed_structures(&mut self, now: Timestamp) -> Vec<StructureId> {
        self.structures
            .iter_mut()
            .filter_map(|structure| structure.latch_if_complete(now).then_some(structure.id))
            .collect()
    }

    pub(crate) fn snapshot(&self) -> TurfSnapshot {
        TurfSnapshot {
            key: self.key.clone(),
            name: self.name.clone(),
            coordinate: self.coordinate,
            owner: self.owner.clone(),
            vault_cash: self.vault_cash,
            defense_multiplier: self.defense_multiplier,
            last_income_at: self.last_income_at,
            structures: self.structures.iter().map(Structure::snapshot).collect(),
            attack_ttl: self.attack_ttl,
            attack: self.attack().map(|attack| AttackSnapshot {
                attacker: attack.attacker.clone(),
                started_at: attack.started_at,
                pending_attack_value: attack.pending_attack_value,
                last_processed_at: attack.last_processed_at,
                defense_health: attack.defense_health,
                defense_at_start: attack.defense_at_start,
            }),
            attack_cooldown_until: self.attack_cooldown_until,
        }
    }
}
