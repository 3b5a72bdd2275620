use std::time::Duration;

use turfcash_core::{geo, CellKey, Command, Coordinate, PlayerId, StructureKind, Timestamp};
use turfcash_system_economy::Economy;
use turfcash_world::{apply, query, World};

const ORIGIN: Coordinate = Coordinate::new(37.7749, -122.4194);
const T0: Timestamp = Timestamp::from_secs(5_000);

fn at(secs: u64) -> Timestamp {
    T0.saturating_add(Duration::from_secs(secs))
}

fn owned_turf(world: &mut World) -> CellKey {
    let mut events = Vec::new();
    apply(world, Command::RegisterPlayer { player: PlayerId::new("alice") }, T0, &mut events)
        .expect("register");
    apply(world, Command::SurveyArea { center: ORIGIN, radius: 0 }, T0, &mut events)
        .expect("survey");
    let (key, _) = geo::cell_key(ORIGIN, query::config(world).hex_size);
    apply(
        world,
        Command::CaptureTurf {
            player: PlayerId::new("alice"),
            turf: key.clone(),
            in_range: true,
        },
        T0,
        &mut events,
    )
    .expect("capture");
    key
}

/// Runs one income tick and returns how many income payments it made.
fn income_tick(world: &mut World, economy: &mut Economy, now: Timestamp) -> usize {
    let mut commands = Vec::new();
    economy.handle(&query::owned_turf_view(world), now, query::config(world), &mut commands);
    let emitted = commands
        .iter()
        .filter(|command| matches!(command, Command::AccrueIncome { .. }))
        .count();
    let mut events = Vec::new();
    for command in commands {
        apply(world, command, now, &mut events).expect("income applies");
    }
    emitted
}

fn vault(world: &World, key: &CellKey) -> f64 {
    query::turf(world, key).expect("turf").vault_cash
}

#[test]
fn base_income_is_paid_once_per_interval() {
    let mut world = World::default();
    let key = owned_turf(&mut world);
    let mut economy = Economy::new();

    assert_eq!(income_tick(&mut world, &mut economy, at(59)), 0);
    assert_eq!(income_tick(&mut world, &mut economy, at(60)), 1);
    assert!((vault(&world, &key) - 1.0).abs() < 1e-9);

    assert_eq!(
        income_tick(&mut world, &mut economy, at(61)),
        0,
        "the clock restarted at the last payment"
    );
    assert_eq!(income_tick(&mut world, &mut economy, at(120)), 1);
    assert!((vault(&world, &key) - 2.0).abs() < 1e-9);
}

#[test]
fn completed_income_generator_boosts_income() {
    let mut world = World::default();
    let key = owned_turf(&mut world);
    let mut economy = Economy::new();
    let mut events = Vec::new();
    apply(
        &mut world,
        Command::BuildStructure {
            player: PlayerId::new("alice"),
            turf: key.clone(),
            kind: StructureKind::IncomeGenerator,
        },
        T0,
        &mut events,
    )
    .expect("build generator");

    assert_eq!(income_tick(&mut world, &mut economy, at(60)), 1);

    assert!(
        (vault(&world, &key) - 1.5).abs() < 1e-9,
        "generator finished after 45 s and adds 0.5 per interval"
    );
    let snapshot = query::turf(&world, &key).expect("turf");
    assert_eq!(
        snapshot.structures[0].build_started_at, None,
        "income tick latches finished builds"
    );
}

#[test]
fn missed_ticks_are_caught_up() {
    let mut world = World::default();
    let key = owned_turf(&mut world);
    let mut economy = Economy::new();

    assert_eq!(income_tick(&mut world, &mut economy, at(60 * 5 + 30)), 1);

    assert!((vault(&world, &key) - 5.5).abs() < 1e-9);
}

#[test]
fn uneven_ticks_lose_no_income() {
    let mut world = World::default();
    let key = owned_turf(&mut world);
    let mut economy = Economy::new();

    assert_eq!(income_tick(&mut world, &mut economy, at(90)), 1);
    assert_eq!(income_tick(&mut world, &mut economy, at(180)), 1);

    assert!(
        (vault(&world, &key) - 3.0).abs() < 1e-9,
        "180 s is three intervals, got {}",
        vault(&world, &key)
    );
}

#[test]
fn late_tick_pays_the_elapsed_time() {
    let mut world = World::default();
    let key = owned_turf(&mut world);
    let mut economy = Economy::new();

    assert_eq!(income_tick(&mut world, &mut economy, at(59)), 0);
    assert_eq!(income_tick(&mut world, &mut economy, at(119)), 1);

    let paid = vault(&world, &key);
    assert!((paid - 119.0 / 60.0).abs() < 1e-9, "paid {paid}");
}

#[test]
fn finished_build_is_latched_without_income_due() {
    let mut world = World::default();
    let key = owned_turf(&mut world);
    let mut economy = Economy::new();
    let mut events = Vec::new();
    apply(
        &mut world,
        Command::BuildStructure {
            player: PlayerId::new("alice"),
            turf: key.clone(),
            kind: StructureKind::IncomeGenerator,
        },
        T0,
        &mut events,
    )
    .expect("build generator");

    assert_eq!(income_tick(&mut world, &mut economy, at(50)), 0);

    let snapshot = query::turf(&world, &key).expect("turf");
    assert_eq!(snapshot.structures[0].build_started_at, None);
    assert!(snapshot.vault_cash.abs() < 1e-9);
}
