//! Turf registry: single authoritative store of turfs keyed by cell.

use std::{collections::BTreeMap, time::Duration};

use turfcash_core::{geo, ActionError, CellKey, Coordinate, PlayerId, StructureId, Timestamp};

use crate::turf::Turf;

/// Registry that stores turfs and manages structure identifier allocation.
#[derive(Debug)]
pub(crate) struct TurfRegistry {
    entries: BTreeMap<CellKey, Turf>,
    hex_size: f64,
    attack_ttl: Duration,
    next_structure_id: StructureId,
}

impl TurfRegistry {
    /// Creates an empty registry aligned on cells of `hex_size` degrees.
    pub(crate) fn new(hex_size: f64, attack_ttl: Duration) -> Self {
        Self {
            entries: BTreeMap::new(),
            hex_size,
            attack_ttl,
            next_structure_id: StructureId::new(0),
        }
    }

    /// Returns the turf covering `coordinate`, materializing a neutral one if absent.
    ///
    /// The flag reports whether the turf was created by this call.
    pub(crate) fn get_or_create(&mut self, coordinate: Coordinate, now: Timestamp) -> (&Turf, bool) {
        let (key, centroid) = geo::cell_key(coordinate, self.hex_size);
        let attack_ttl = self.attack_ttl;
        let mut created = false;
        let turf = self.entries.entry(key).or_insert_with_key(|key| {
            created = true;
            Turf::neutral(key.clone(), centroid, attack_ttl, now)
        });
        (turf, created)
    }

    pub(crate) fn get(&self, key: &CellKey) -> Option<&Turf> {
        self.entries.get(key)
    }

    pub(crate) fn require(&self, key: &CellKey) -> Result<&Turf, ActionError> {
        self.get(key).ok_or_else(|| ActionError::UnknownTurf { turf: key.clone() })
    }

    /// Replaces the stored turf with the same key in a single step.
    pub(crate) fn put(&mut self, turf: Turf) {
        let _ = self.entries.insert(turf.key.clone(), turf);
    }

    /// Turfs owned by `player` in ascending key order.
    pub(crate) fn all_owned_by<'a>(&'a self, player: &'a PlayerId) -> impl Iterator<Item = &'a Turf> + 'a {
        self.entries.values().filter(move |turf| turf.is_owned_by(player))
    }

    /// Materializes every cell within `radius` cells of `center`.
    ///
    /// Returns the keys of the whole neighborhood together with the keys of
    /// the cells that were newly created.
    pub(crate) fn all_near(
        &mut self,
        center: Coordinate,
        radius: u32,
        now: Timestamp,
    ) -> (Vec<CellKey>, Vec<CellKey>) {
        let mut keys = Vec::new();
        let mut created = Vec::new();
        for cell in geo::neighborhood(center, self.hex_size, radius) {
            let (turf, is_new) = self.get_or_create(cell.centroid(), now);
            if is_new {
                created.push(turf.key.clone());
            }
            keys.push(turf.key.clone());
        }
        (keys, created)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Turf> {
        self.entries.values()
    }

    pub(crate) fn allocate_structure_id(&mut self) -> StructureId {
        let id = self.next_structure_id;
        self.next_structure_id = StructureId::new(id.get().saturating_add(1));
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX: f64 = 0.0001;

    fn registry() -> TurfRegistry {
        TurfRegistry::new(HEX, Duration::from_secs(90))
    }

    #[test]
    fn registry_starts_empty_with_zero_identifier() {
        let registry = registry();
        assert!(registry.entries.is_empty());
        assert_eq!(registry.next_structure_id.get(), 0);
    }

    #[test]
    fn get_or_create_is_idempotent_per_cell() {
        let mut registry = registry();
        let now = Timestamp::from_secs(1);
        let (first, created) = registry.get_or_create(Coordinate::new(37.774_91, -122.419_41), now);
        let first_key = first.key.clone();
        assert!(created, "first lookup materializes the turf");

        let (second, created_again) =
            registry.get_or_create(Coordinate::new(37.774_92, -122.419_38), now);
        assert!(!created_again, "second lookup reuses the stored turf");
        assert_eq!(second.key, first_key);
        assert_eq!(registry.entries.len(), 1);
    }

    #[test]
    fn put_replaces_whole_record() {
        let mut registry = registry();
        let now = Timestamp::from_secs(1);
        let (turf, _) = registry.get_or_create(Coordinate::new(1.0, 1.0), now);
        let mut updated = turf.clone();
        updated.owner = Some(PlayerId::new("alice"));
        updated.vault_cash = 12.0;
        let key = updated.key.clone();
        registry.put(updated);

        let stored = registry.get(&key).expect("turf stored");
        assert_eq!(stored.owner, Some(PlayerId::new("alice")));
        assert!((stored.vault_cash - 12.0).abs() < f64::EPSILON);
    }

    #[test]
    fn all_near_materializes_neighborhood_once() {
        let mut registry = registry();
        let now = Timestamp::from_secs(1);
        let (keys, created) = registry.all_near(Coordinate::new(10.0, 10.0), 3, now);
        assert_eq!(keys.len(), 49);
        assert_eq!(created.len(), 49);

        let (again, created_again) = registry.all_near(Coordinate::new(10.0, 10.0), 3, now);
        assert_eq!(again, keys);
        assert!(created_again.is_empty(), "survey is idempotent");
    }

    #[test]
    fn all_owned_by_filters_on_owner() {
        let mut registry = registry();
        let now = Timestamp::from_secs(1);
        let (keys, _) = registry.all_near(Coordinate::new(0.5, 0.5), 1, now);
        let alice = PlayerId::new("alice");
        for key in keys.iter().take(2) {
            let mut turf = registry.get(key).cloned().expect("turf exists");
            turf.owner = Some(alice.clone());
            registry.put(turf);
        }
        assert_eq!(registry.all_owned_by(&alice).count(), 2);
        assert_eq!(registry.all_owned_by(&PlayerId::new("bob")).count(), 0);
    }

    #[test]
    fn structure_identifiers_are_sequential() {
        let mut registry = registry();
        assert_eq!(registry.allocate_structure_id(), StructureId::new(0));
        assert_eq!(registry.allocate_structure_id(), StructureId::new(1));
    }
}
