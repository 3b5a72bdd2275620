#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that lets completed defense towers siphon nearby enemy vaults.

use std::collections::BTreeMap;

use turfcash_core::{
    geo, CellKey, Command, SimulationConfig, StructureKind, Timestamp, TurfSnapshot, TurfView,
};

/// Proximity siphon that queues vault transfer commands.
///
/// Towers are processed in ascending turf key order and enemies in ascending
/// key order within each tower's radius. Balances are tracked across the
/// batch so that the emitted transfers stay valid when applied in sequence.
#[derive(Debug, Default)]
pub struct ProximitySiphon {
    balances: BTreeMap<CellKey, f64>,
    scratch: Vec<Command>,
}

impl ProximitySiphon {
    /// Creates a new proximity siphon with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits `Command::SiphonVault` for every enemy vault within reach of a
    /// completed defense tower.
    pub fn handle(
        &mut self,
        owned_turfs: &TurfView,
        now: Timestamp,
        config: &SimulationConfig,
        out: &mut Vec<Command>,
    ) {
        if owned_turfs.len() < 2 {
            return;
        }

        self.scratch.clear();
        self.balances.clear();
        self.balances.extend(
            owned_turfs
                .iter()
                .map(|turf| (turf.key.clone(), turf.vault_cash)),
        );

        for tower_turf in owned_turfs.iter() {
            for tower in tower_turf.completed_structures(StructureKind::DefenseTower, now) {
                let (Some(radius), Some(rate)) =
                    (tower.kind.steal_radius_m(), tower.kind.steal_rate())
                else {
                    continue;
                };
                let per_victim = config.base_income_rate * rate;
                if per_victim <= 0.0 {
                    continue;
                }
                for victim in owned_turfs.iter() {
                    if !is_rival(tower_turf, victim)
                        || geo::distance_m(tower_turf.coordinate, victim.coordinate) > radius
                    {
                        continue;
                    }
                    let remaining = self.balances.get(&victim.key).copied().unwrap_or(0.0);
                    if remaining <= 0.0 {
                        continue;
                    }
                    let amount = per_victim.min(remaining);
                    self.transfer(&victim.key, &tower_turf.key, amount);
                    self.scratch.push(Command::SiphonVault {
                        from: victim.key.clone(),
                        to: tower_turf.key.clone(),
                        amount,
                    });
                }
            }
        }

        if self.scratch.is_empty() {
            return;
        }

        out.reserve(self.scratch.len());
        out.append(&mut self.scratch);
    }

    fn transfer(&mut self, from: &CellKey, to: &CellKey, amount: f64) {
        if let Some(balance) = self.balances.get_mut(from) {
            *balance -= amount;
        }
        if let Some(balance) = self.balances.get_mut(to) {
            *balance += amount;
        }
    }
}

fn is_rival(tower_turf: &TurfSnapshot, victim: &TurfSnapshot) -> bool {
    match (&tower_turf.owner, &victim.owner) {
        (Some(owner), Some(other)) => owner != other,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use turfcash_core::{Coordinate, PlayerId, StructureId, StructureSnapshot};

    const NOW: Timestamp = Timestamp::from_secs(1_000);

    #[test]
    fn towers_siphon_nearby_rivals() {
        let mut system = ProximitySiphon::new();
        let view = TurfView::from_snapshots(vec![
            turf("a", "alice", 0.0, 5.0, true),
            turf("b", "bob", 0.0001, 2.0, false),
        ]);
        let mut out = Vec::new();

        system.handle(&view, NOW, &SimulationConfig::default(), &mut out);

        assert_eq!(
            out,
            vec![Command::SiphonVault {
                from: CellKey::new("b"),
                to: CellKey::new("a"),
                amount: 0.1,
            }],
        );
    }

    #[test]
    fn distant_and_friendly_turfs_are_safe() {
        let mut system = ProximitySiphon::new();
        let view = TurfView::from_snapshots(vec![
            turf("a", "alice", 0.0, 0.0, true),
            turf("b", "alice", 0.0001, 9.0, false),
            turf("c", "bob", 0.0010, 9.0, false),
        ]);
        let mut out = Vec::new();

        system.handle(&view, NOW, &SimulationConfig::default(), &mut out);

        assert!(out.is_empty(), "friendly turfs and turfs 88 m away are out of reach");
    }

    #[test]
    fn siphon_never_exceeds_remaining_vault() {
        let mut system = ProximitySiphon::new();
        let view = TurfView::from_snapshots(vec![
            turf("a", "alice", 0.0, 0.0, true),
            turf("b", "bob", 0.0001, 0.04, false),
            turf("c", "carol", -0.0001, 0.0, true),
        ]);
        let mut out = Vec::new();

        system.handle(&view, NOW, &SimulationConfig::default(), &mut out);

        let drained: f64 = out
            .iter()
            .filter_map(|command| match command {
                Command::SiphonVault { from, amount, .. } if from.as_str() == "b" => Some(*amount),
                _ => None,
            })
            .sum();
        assert!((drained - 0.04).abs() < 1e-12, "drained {drained}");
        assert!(out.iter().all(|command| match command {
            Command::SiphonVault { amount, .. } => *amount > 0.0,
            _ => false,
        }));
    }

    #[test]
    fn unfinished_towers_do_not_siphon() {
        let mut system = ProximitySiphon::new();
        let mut tower = turf("a", "alice", 0.0, 0.0, true);
        tower.structures[0].build_started_at = Some(NOW);
        let view = TurfView::from_snapshots(vec![tower, turf("b", "bob", 0.0001, 5.0, false)]);
        let mut out = Vec::new();

        system.handle(&view, NOW, &SimulationConfig::default(), &mut out);

        assert!(out.is_empty());
    }

    fn turf(key: &str, owner: &str, longitude: f64, vault_cash: f64, tower: bool) -> TurfSnapshot {
        let structures = if tower {
            vec![StructureSnapshot {
                id: StructureId::new(0),
                kind: StructureKind::DefenseTower,
                level: 1,
                build_started_at: None,
            }]
        } else {
            Vec::new()
        };
        TurfSnapshot {
            key: CellKey::new(key),
            name: String::from("Sector 7749-0000"),
            coordinate: Coordinate::new(37.7749, longitude),
            owner: Some(PlayerId::new(owner)),
            vault_cash,
            defense_multiplier: 1,
            last_income_at: Timestamp::EPOCH,
            structures,
            attack_ttl: Duration::from_secs(90),
            attack: None,
            attack_cooldown_until: None,
        }
    }
}
