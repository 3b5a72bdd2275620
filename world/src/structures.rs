//! Construction queue: structure records plus the build and upgrade actions.
//!
//! Build progress is a pure function of the elapsed wall-clock time, so no
//! background process has to finish a build. Completion is evaluated lazily
//! wherever a bonus is read and latched (timer cleared) by the income tick
//! and at attack start.

use tracing::debug;
use turfcash_core::{
    build_in_progress, ActionError, CellKey, Event, PlayerId, StructureId, StructureKind,
    StructureSnapshot, Timestamp,
};

use crate::World;

/// Structure standing on a turf.
#[derive(Clone, Debug)]
pub(crate) struct Structure {
    pub(crate) id: StructureId,
    pub(crate) kind: StructureKind,
    pub(crate) level: u32,
    pub(crate) build_started_at: Option<Timestamp>,
}

impl Structure {
    /// Creates a level-one structure whose construction starts at `now`.
    pub(crate) fn started(id: StructureId, kind: StructureKind, now: Timestamp) -> Self {
        Self {
            id,
            kind,
            level: 1,
            build_started_at: Some(now),
        }
    }

    pub(crate) fn is_building(&self, now: Timestamp) -> bool {
        build_in_progress(self.build_started_at, self.kind.build_time(), now)
    }

    /// Seconds left until the current build completes; zero when idle.
    pub(crate) fn remaining_secs(&self, now: Timestamp) -> f64 {
        match self.build_started_at {
            Some(start) => (self.kind.build_time().as_secs_f64() - now.seconds_since(start)).max(0.0),
            None => 0.0,
        }
    }

    pub(crate) fn current_cost(&self) -> f64 {
        self.kind.cost_at_level(self.level)
    }

    pub(crate) fn current_defense_bonus(&self) -> f64 {
        self.kind.defense_bonus_at_level(self.level)
    }

    /// Clears the build timer once the build finished; reports whether it did.
    pub(crate) fn latch_if_complete(&mut self, now: Timestamp) -> bool {
        if self.build_started_at.is_some() && !self.is_building(now) {
            self.build_started_at = None;
            true
        } else {
            false
        }
    }

    pub(crate) fn snapshot(&self) -> StructureSnapshot {
        StructureSnapshot {
            id: self.id,
            kind: self.kind,
            level: self.level,
            build_started_at: self.build_started_at,
        }
    }
}

pub(crate) fn build(
    world: &mut World,
    player: PlayerId,
    turf_key: CellKey,
    kind: StructureKind,
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
    if turf.structures.iter().any(|structure| structure.kind == kind) {
        return Err(ActionError::StructureAlreadyExists {
            turf: turf_key,
            kind,
        });
    }
    let cost = kind.cost_at_level(1);
    if wallet < cost {
        return Err(ActionError::InsufficientFunds {
            required: cost,
            available: wallet,
        });
    }

    let mut updated = turf.clone();
    let id = world.registry.allocate_structure_id();
    updated.structures.push(Structure::started(id, kind, now));
    world.debit(&player, cost, now);
    debug!(target: "turfcash::world", turf = %turf_key, structure = %id, kind = kind.name(), "structure.build_started");
    out_events.push(Event::StructureBuildStarted {
        turf: turf_key,
        structure: id,
        kind,
    });
    out_events.push(Event::TurfUpdated {
        turf: updated.snapshot(),
    });
    world.registry.put(updated);
    Ok(())
}

pub(crate) fn upgrade(
    world: &mut World,
    player: PlayerId,
    turf_key: CellKey,
    structure_id: StructureId,
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
    let Some(index) = turf
        .structures
        .iter()
        .position(|structure| structure.id == structure_id)
    else {
        return Err(ActionError::StructureNotFound {
            turf: turf_key,
            structure: structure_id,
        });
    };
    let structure = &turf.structures[index];
    if structure.is_building(now) {
        return Err(ActionError::StructureStillBuilding {
            structure: structure_id,
            remaining_secs: structure.remaining_secs(now),
        });
    }
    let cost = structure.current_cost();
    if wallet < cost {
        return Err(ActionError::InsufficientFunds {
            required: cost,
            available: wallet,
        });
    }

    let mut updated = turf.clone();
    let target = &mut updated.structures[index];
    target.level += 1;
    target.build_started_at = Some(now);
    let level = target.level;
    world.debit(&player, cost, now);
    debug!(target: "turfcash::world", turf = %turf_key, structure = %structure_id, level, "structure.upgrade_started");
    out_events.push(Event::StructureUpgradeStarted {
        turf: turf_key,
        structure: structure_id,
        level,
    });
    out_events.push(Event::TurfUpdated {
        turf: updated.snapshot(),
    });
    world.registry.put(updated);
    Ok(())
}

/// Latches every structure on the turf whose build finished by `now`.
///
/// A turf with nothing to latch is left untouched and emits no events.
pub(crate) fn complete(
    world: &mut World,
    turf_key: CellKey,
    now: Timestamp,
    out_events: &mut Vec<Event>,
) -> Result<(), ActionError> {
    let turf = world.registry.require(&turf_key)?;
    let mut updated = turf.clone();
    let latched = updated.latch_completed_structures(now);
    if latched.is_empty() {
        return Ok(());
    }
    debug!(target: "turfcash::world", turf = %turf_key, completed = latched.len(), "structure.completed");
    out_events.extend(latched.into_iter().map(|structure| Event::StructureCompleted {
        turf: turf_key.clone(),
        structure,
    }));
    out_events.push(Event::TurfUpdated {
        turf: updated.snapshot(),
    });
    world.registry.put(updated);
    Ok(())
}
