//! Vault economics: collection, investment, passive income and siphoning.

use tracing::{debug, trace};
use turfcash_core::{geo, ActionError, CellKey, Event, PlayerId, StructureKind, Timestamp};

use crate::World;

fn validate_amount(amount: f64) -> Result<(), ActionError> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(ActionError::InvalidAmount { amount })
    }
}

pub(crate) fn collect(
    world: &mut World,
    player: PlayerId,
    turf_key: CellKey,
    in_range: bool,
    now: Timestamp,
    out_events: &mut Vec<Event>,
) -> Result<(), ActionError> {
    let _ = world.wallet_of(&player)?;
    let turf = world.registry.require(&turf_key)?;
    if !turf.is_owned_by(&player) {
        return Err(ActionError::NotOwner {
            turf: turf_key,
            owner: turf.owner.clone(),
        });
    }
    if !in_range {
        return Err(ActionError::NotInRange { turf: turf_key });
    }
    if turf.vault_cash <= 0.0 {
        return Err(ActionError::NothingToCollect { turf: turf_key });
    }

    let mut updated = turf.clone();
    let amount = updated.vault_cash;
    updated.vault_cash = 0.0;
    world.credit(&player, amount);
    world.touch(&player, now);
    debug!(target: "turfcash::world", player = %player, turf = %turf_key, amount, "vault.collected");
    out_events.push(Event::CashCollected {
        player,
        turf: turf_key,
        amount,
    });
    out_events.push(Event::TurfUpdated {
        turf: updated.snapshot(),
    });
    world.registry.put(updated);
    Ok(())
}

pub(crate) fn invest(
    world: &mut World,
    player: PlayerId,
    turf_key: CellKey,
    amount: f64,
    in_range: bool,
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
    if !in_range {
        return Err(ActionError::NotInRange { turf: turf_key });
    }
    validate_amount(amount)?;
    if wallet < amount {
        return Err(ActionError::InsufficientFunds {
            required: amount,
            available: wallet,
        });
    }

    let mut updated = turf.clone();
    updated.vault_cash += amount;
    world.debit(&player, amount, now);
    debug!(target: "turfcash::world", player = %player, turf = %turf_key, amount, "vault.invested");
    out_events.push(Event::CashInvested {
        player,
        turf: turf_key,
        amount,
    });
    out_events.push(Event::TurfUpdated {
        turf: updated.snapshot(),
    });
    world.registry.put(updated);
    Ok(())
}

/// Credits income computed by the economy engine.
///
/// The command is rejected as stale when the owner or `last_income_at`
/// changed after the income was computed, so no interval is paid twice.
pub(crate) fn accrue_income(
    world: &mut World,
    turf_key: CellKey,
    owner: PlayerId,
    since: Timestamp,
    amount: f64,
    now: Timestamp,
    out_events: &mut Vec<Event>,
) -> Result<(), ActionError> {
    let turf = world.registry.require(&turf_key)?;
    if !turf.is_owned_by(&owner) || turf.last_income_at != since {
        return Err(ActionError::StaleUpdate { turf: turf_key });
    }
    if !(amount.is_finite() && amount >= 0.0) {
        return Err(ActionError::InvalidAmount { amount });
    }

    let mut updated = turf.clone();
    let _ = updated.latch_completed_structures(now);
    updated.vault_cash += amount;
    updated.last_income_at = now;
    trace!(target: "turfcash::world", turf = %turf_key, amount, "vault.income_accrued");
    out_events.push(Event::IncomeAccrued {
        turf: turf_key,
        amount,
    });
    out_events.push(Event::TurfUpdated {
        turf: updated.snapshot(),
    });
    world.registry.put(updated);
    Ok(())
}

/// Moves cash from a rival vault into the vault of a turf whose completed
/// defense tower reaches it.
///
/// A single transfer never exceeds one tower's per-tick rate.
pub(crate) fn siphon(
    world: &mut World,
    from: CellKey,
    to: CellKey,
    amount: f64,
    now: Timestamp,
    out_events: &mut Vec<Event>,
) -> Result<(), ActionError> {
    validate_amount(amount)?;
    let source = world.registry.require(&from)?;
    let target = world.registry.require(&to)?;
    let rivals = matches!(
        (&source.owner, &target.owner),
        (Some(victim), Some(thief)) if victim != thief
    );
    if !rivals || source.vault_cash < amount {
        return Err(ActionError::StaleUpdate { turf: from });
    }
    let distance = geo::distance_m(target.coordinate, source.coordinate);
    let Some(rate) = target
        .structures
        .iter()
        .filter(|structure| structure.kind == StructureKind::DefenseTower && !structure.is_building(now))
        .filter(|structure| structure.kind.steal_radius_m().is_some_and(|radius| distance <= radius))
        .find_map(|structure| structure.kind.steal_rate())
    else {
        return Err(ActionError::OutOfTowerReach { from, to });
    };
    if amount > world.config.base_income_rate * rate {
        return Err(ActionError::InvalidAmount { amount });
    }

    let mut drained = source.clone();
    let mut filled = target.clone();
    drained.vault_cash -= amount;
    filled.vault_cash += amount;
    trace!(target: "turfcash::world", from = %from, to = %to, amount, "vault.siphoned");
    out_events.push(Event::VaultSiphoned { from, to, amount });
    out_events.push(Event::TurfUpdated {
        turf: drained.snapshot(),
    });
    out_events.push(Event::TurfUpdated {
        turf: filled.snapshot(),
    });
    world.registry.put(drained);
    world.registry.put(filled);
    Ok(())
}
