#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that computes passive income for owned turfs.
//!
//! Income is paid in proportion to the time elapsed since a turf's
//! `last_income_at` once at least one interval has passed, so a process that
//! misses ticks pays the missed time on the next one. Structures whose build
//! finished are latched on every tick, whether or not income is due.

use turfcash_core::{
    Command, SimulationConfig, StructureKind, StructureSnapshot, Timestamp, TurfSnapshot, TurfView,
};

/// Economy engine that queues income accrual commands.
#[derive(Debug, Default)]
pub struct Economy {
    scratch: Vec<Command>,
}

impl Economy {
    /// Creates a new economy engine with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits `Command::CompleteStructures` for every owned turf with a
    /// finished but unlatched build, then `Command::AccrueIncome` for every
    /// owned turf with at least one income interval elapsed at `now`.
    pub fn handle(
        &mut self,
        owned_turfs: &TurfView,
        now: Timestamp,
        config: &SimulationConfig,
        out: &mut Vec<Command>,
    ) {
        if owned_turfs.is_empty() {
            return;
        }

        self.scratch.clear();

        for turf in owned_turfs.iter() {
            let Some(owner) = &turf.owner else {
                continue;
            };
            if has_finished_builds(turf, now) {
                self.scratch.push(Command::CompleteStructures {
                    turf: turf.key.clone(),
                });
            }
            if let Some(amount) = income_due(turf, now, config) {
                self.scratch.push(Command::AccrueIncome {
                    turf: turf.key.clone(),
                    owner: owner.clone(),
                    since: turf.last_income_at,
                    amount,
                });
            }
        }

        if self.scratch.is_empty() {
            return;
        }

        out.reserve(self.scratch.len());
        out.append(&mut self.scratch);
    }
}

/// Income owed to `turf` at `now`, or `None` before one interval elapsed.
///
/// Each interval pays the base rate plus the bonus of every completed
/// income generator; partial intervals beyond the first are paid pro rata.
#[must_use]
pub fn income_due(turf: &TurfSnapshot, now: Timestamp, config: &SimulationConfig) -> Option<f64> {
    let interval = config.income_interval.as_secs_f64();
    if interval <= 0.0 {
        return None;
    }
    let intervals = now.seconds_since(turf.last_income_at) / interval;
    if intervals < 1.0 {
        return None;
    }
    let bonus: f64 = turf
        .completed_structures(StructureKind::IncomeGenerator, now)
        .map(StructureSnapshot::current_income_bonus)
        .sum();
    Some((config.base_income_rate + bonus) * intervals)
}

fn has_finished_builds(turf: &TurfSnapshot, now: Timestamp) -> bool {
    turf.structures
        .iter()
        .any(|structure| structure.build_started_at.is_some() && !structure.is_building(now))
}
