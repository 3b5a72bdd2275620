//! Player registration, area surveys, captures and fortification.

use tracing::{debug, info};
use turfcash_core::{ActionError, CellKey, Coordinate, Event, Milestone, PlayerId, Timestamp};

use crate::{Player, World};

pub(crate) fn register_player(
    world: &mut World,
    player: PlayerId,
    now: Timestamp,
    out_events: &mut Vec<Event>,
) -> Result<(), ActionError> {
    if world.players.contains_key(&player) {
        return Err(ActionError::PlayerAlreadyRegistered { player });
    }
    let wallet_balance = world.config.starting_wallet;
    let _ = world.players.insert(
        player.clone(),
        Player {
            wallet_balance,
            created_at: now,
            last_active_at: now,
        },
    );
    info!(target: "turfcash::world", player = %player, wallet_balance, "player.registered");
    out_events.push(Event::PlayerRegistered {
        player,
        wallet_balance,
    });
    Ok(())
}

pub(crate) fn survey(
    world: &mut World,
    center: Coordinate,
    radius: u32,
    now: Timestamp,
    out_events: &mut Vec<Event>,
) {
    let (_, created) = world.registry.all_near(center, radius, now);
    if !created.is_empty() {
        debug!(target: "turfcash::world", created = created.len(), "turfs.discovered");
    }
    out_events.extend(created.into_iter().map(|turf| Event::TurfDiscovered { turf }));
}

pub(crate) fn capture(
    world: &mut World,
    player: PlayerId,
    turf_key: CellKey,
    in_range: bool,
    now: Timestamp,
    out_events: &mut Vec<Event>,
) -> Result<(), ActionError> {
    let _ = world.wallet_of(&player)?;
    let turf = world.registry.require(&turf_key)?;
    if let Some(owner) = &turf.owner {
        return Err(ActionError::NotNeutral {
            turf: turf_key,
            owner: owner.clone(),
        });
    }
    if !in_range {
        return Err(ActionError::NotInRange { turf: turf_key });
    }

    let mut updated = turf.clone();
    updated.owner = Some(player.clone());
    updated.last_income_at = now;
    out_events.push(Event::TurfUpdated {
        turf: updated.snapshot(),
    });
    world.registry.put(updated);
    world.touch(&player, now);

    let owned = world.registry.all_owned_by(&player).count();
    info!(target: "turfcash::world", player = %player, turf = %turf_key, owned, "turf.captured");
    out_events.push(Event::TurfCaptured {
        player: player.clone(),
        turf: turf_key,
    });
    if let Some(milestone) = Milestone::for_owned_count(owned) {
        out_events.push(Event::MilestoneReached { player, milestone });
    }
    Ok(())
}

pub(crate) fn raise_defense(
    world: &mut World,
    player: PlayerId,
    turf_key: CellKey,
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
    if let Some(attack) = turf.attack() {
        return Err(ActionError::TurfAlreadyUnderAttack {
            turf: turf_key,
            attacker: attack.attacker.clone(),
        });
    }
    let max = world.config.max_defense_multiplier;
    if turf.defense_multiplier >= max {
        return Err(ActionError::DefenseAtMaximum { turf: turf_key, max });
    }
    let cost = world.config.defense_upgrade_cost * f64::from(turf.defense_multiplier);
    if wallet < cost {
        return Err(ActionError::InsufficientFunds {
            required: cost,
            available: wallet,
        });
    }

    let mut updated = turf.clone();
    updated.defense_multiplier += 1;
    let multiplier = updated.defense_multiplier;
    world.debit(&player, cost, now);
    debug!(target: "turfcash::world", turf = %turf_key, multiplier, cost, "turf.defense_raised");
    out_events.push(Event::DefenseRaised {
        turf: turf_key,
        multiplier,
    });
    out_events.push(Event::TurfUpdated {
        turf: updated.snapshot(),
    });
    world.registry.put(updated);
    Ok(())
}
