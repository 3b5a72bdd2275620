#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that advances and resolves ongoing attacks.
//!
//! An attack delivers its pending attack value linearly over the turf's TTL
//! window. Damage is derived from the wall-clock time elapsed since the last
//! processed tick, so missed ticks are caught up on the next one.

use turfcash_core::{AttackOutcome, AttackSnapshot, Command, Timestamp, TurfSnapshot, TurfView};

/// Combat resolver that queues attack progress and resolution commands.
#[derive(Debug, Default)]
pub struct CombatResolver {
    scratch: Vec<Command>,
}

impl CombatResolver {
    /// Creates a new combat resolver with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits `Command::AdvanceAttack` or `Command::ResolveAttack` for every
    /// turf with an attack in progress.
    pub fn handle(&mut self, attacked_turfs: &TurfView, now: Timestamp, out: &mut Vec<Command>) {
        if attacked_turfs.is_empty() {
            return;
        }

        self.scratch.clear();

        for turf in attacked_turfs.iter() {
            if let Some(attack) = &turf.attack {
                self.scratch.push(step(turf, attack, now));
            }
        }

        if self.scratch.is_empty() {
            return;
        }

        out.reserve(self.scratch.len());
        out.append(&mut self.scratch);
    }
}

fn step(turf: &TurfSnapshot, attack: &AttackSnapshot, now: Timestamp) -> Command {
    let resolve = |outcome: AttackOutcome| Command::ResolveAttack {
        turf: turf.key.clone(),
        attacker: attack.attacker.clone(),
        started_at: attack.started_at,
        outcome,
    };

    let ttl = turf.attack_ttl.as_secs_f64();
    if now.seconds_since(attack.started_at) >= ttl {
        return resolve(AttackOutcome::Timeout);
    }

    let elapsed = now.seconds_since(attack.last_processed_at);
    let damage = attack.pending_attack_value * elapsed / ttl;
    let defense_health = attack.defense_health - damage;
    if defense_health <= 0.0 {
        return resolve(AttackOutcome::Win);
    }

    Command::AdvanceAttack {
        turf: turf.key.clone(),
        attacker: attack.attacker.clone(),
        started_at: attack.started_at,
        defense_health,
    }
}
