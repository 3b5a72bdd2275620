//! Attack lifecycle: launching, reinforcing, advancing and resolving attacks.

use tracing::{debug, info};
use turfcash_core::{
    ActionError, AttackLog, AttackOutcome, CellKey, Event, PlayerId, Timestamp, WeaponPack,
};

use crate::{
    turf::{Attack, CombatState},
    World,
};

pub(crate) fn attack(
    world: &mut World,
    player: PlayerId,
    turf_key: CellKey,
    weapon: WeaponPack,
    in_range: bool,
    now: Timestamp,
    out_events: &mut Vec<Event>,
) -> Result<(), ActionError> {
    let wallet = world.wallet_of(&player)?;
    let turf = world.registry.require(&turf_key)?;
    let Some(defender) = turf.owner.clone() else {
        return Err(ActionError::NeutralTurf { turf: turf_key });
    };
    if defender == player {
        return Err(ActionError::AlreadyOwned { turf: turf_key });
    }
    if !in_range {
        return Err(ActionError::NotInRange { turf: turf_key });
    }
    let cost = weapon.cost();
    if wallet < cost {
        return Err(ActionError::InsufficientFunds {
            required: cost,
            available: wallet,
        });
    }

    let mut updated = turf.clone();
    match &mut updated.combat {
        CombatState::Attacking(ongoing) if ongoing.attacker != player => {
            let log = AttackLog {
                turf: turf_key.clone(),
                attacker: player,
                defender: Some(defender),
                attack_value: weapon.attack_value(),
                defense_value: ongoing.defense_at_start,
                outcome: AttackOutcome::Conflict,
                timestamp: now,
                loot: 0.0,
            };
            let attacker = ongoing.attacker.clone();
            debug!(target: "turfcash::world", turf = %turf_key, attacker = %log.attacker, holder = %attacker, "attack.conflict");
            world.attack_log.push(log.clone());
            out_events.push(Event::AttackResolved { log });
            return Err(ActionError::TurfAlreadyUnderAttack {
                turf: turf_key,
                attacker,
            });
        }
        CombatState::Attacking(ongoing) => {
            ongoing.pending_attack_value += weapon.attack_value();
        }
        CombatState::Idle => {
            if let Some(until) = updated.attack_cooldown_until.filter(|until| *until > now) {
                return Err(ActionError::AttackOnCooldown {
                    turf: turf_key,
                    remaining_secs: until.seconds_since(now),
                });
            }
            let _ = updated.latch_completed_structures(now);
            let defense = updated.defense_value(now);
            updated.combat = CombatState::Attacking(Attack {
                attacker: player.clone(),
                started_at: now,
                pending_attack_value: weapon.attack_value(),
                last_processed_at: now,
                defense_health: defense,
                defense_at_start: defense,
            });
        }
    }

    world.debit(&player, cost, now);
    info!(target: "turfcash::world", turf = %turf_key, attacker = %player, weapon = weapon.name(), "attack.started");
    out_events.push(Event::AttackStarted {
        turf: turf_key,
        attacker: player,
        weapon,
    });
    out_events.push(Event::TurfUpdated {
        turf: updated.snapshot(),
    });
    world.registry.put(updated);
    Ok(())
}

pub(crate) fn reinforce(
    world: &mut World,
    player: PlayerId,
    turf_key: CellKey,
    amount: f64,
    now: Timestamp,
    out_events: &mut Vec<Event>,
) -> Result<(), ActionError> {
    let wallet = world.wallet_of(&player)?;
    let turf = world.registry.require(&turf_key)?;
    if !turf.is_owned_by(&player) {
        return Err(ActionError::NotOwner {
            turf: turf_key,
            owner: turf.owner.clone(),
        });
    }
    if turf.attack().is_none() {
        return Err(ActionError::NotUnderAttack { turf: turf_key });
    }
    if !(amount.is_finite() && amount > 0.0) {
        return Err(ActionError::InvalidAmount { amount });
    }
    if wallet < amount {
        return Err(ActionError::InsufficientFunds {
            required: amount,
            available: wallet,
        });
    }

    let mut updated = turf.clone();
    let Some(ongoing) = updated.attack_mut() else {
        return Err(ActionError::NotUnderAttack { turf: turf_key });
    };
    ongoing.defense_health = (ongoing.defense_health + amount).min(ongoing.defense_at_start);
    let defense_health = ongoing.defense_health;
    world.debit(&player, amount, now);
    debug!(target: "turfcash::world", turf = %turf_key, amount, defense_health, "attack.reinforced");
    out_events.push(Event::AttackReinforced {
        turf: turf_key,
        defense_health,
    });
    out_events.push(Event::TurfUpdated {
        turf: updated.snapshot(),
    });
    world.registry.put(updated);
    Ok(())
}

pub(crate) fn advance(
    world: &mut World,
    turf_key: CellKey,
    attacker: PlayerId,
    started_at: Timestamp,
    defense_health: f64,
    now: Timestamp,
    out_events: &mut Vec<Event>,
) -> Result<(), ActionError> {
    let turf = world.registry.require(&turf_key)?;
    let mut updated = turf.clone();
    let Some(ongoing) = updated
        .attack_mut()
        .filter(|ongoing| ongoing.matches(&attacker, started_at))
    else {
        return Err(ActionError::StaleUpdate { turf: turf_key });
    };
    ongoing.defense_health = defense_health;
    ongoing.last_processed_at = now;
    out_events.push(Event::TurfUpdated {
        turf: updated.snapshot(),
    });
    world.registry.put(updated);
    Ok(())
}

pub(crate) fn resolve(
    world: &mut World,
    turf_key: CellKey,
    attacker: PlayerId,
    started_at: Timestamp,
    outcome: AttackOutcome,
    now: Timestamp,
    out_events: &mut Vec<Event>,
) -> Result<(), ActionError> {
    if !matches!(outcome, AttackOutcome::Win | AttackOutcome::Timeout) {
        return Err(ActionError::UnresolvableOutcome {
            turf: turf_key,
            outcome,
        });
    }
    let turf = world.registry.require(&turf_key)?;
    let Some(ongoing) = turf
        .attack()
        .filter(|ongoing| ongoing.matches(&attacker, started_at))
        .cloned()
    else {
        return Err(ActionError::StaleUpdate { turf: turf_key });
    };

    let mut updated = turf.clone();
    let defender = updated.owner.clone();
    let mut loot = 0.0;
    if outcome == AttackOutcome::Win {
        loot = (updated.vault_cash * world.config.loot_percentage).min(updated.vault_cash);
        updated.vault_cash -= loot;
        updated.owner = Some(attacker.clone());
        updated.last_income_at = now;
        if world.players.contains_key(&attacker) {
            world.credit(&attacker, loot);
        }
    }
    updated.combat = CombatState::Idle;
    updated.attack_cooldown_until = Some(now.saturating_add(world.config.attack_cooldown));

    let log = AttackLog {
        turf: turf_key,
        attacker,
        defender,
        attack_value: ongoing.pending_attack_value,
        defense_value: ongoing.defense_at_start,
        outcome,
        timestamp: now,
        loot,
    };
    info!(
        target: "turfcash::world",
        turf = %log.turf,
        attacker = %log.attacker,
        outcome = ?outcome,
        loot,
        "attack.resolved"
    );
    world.attack_log.push(log.clone());
    out_events.push(Event::AttackResolved { log });
    out_events.push(Event::TurfUpdated {
        turf: updated.snapshot(),
    });
    world.registry.put(updated);
    Ok(())
}
