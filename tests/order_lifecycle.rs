// tests/order_lifecycle.rs
//! Fleet order execution rules: movement, merges, salvage, colonization
//! races and spy deployment.

mod common;

use common::*;
use stellar_throne::config::Config;
use stellar_throne::core::SpyState;
use stellar_throne::core::orders::FleetOrderCommand;
use stellar_throne::core::types::*;
use stellar_throne::core::{GameEvent, OrderKind};
use stellar_throne::CommandPacket;

#[test]
fn test_move_order_advances_one_jump_per_turn() {
    let config = Config::builtin();
    let mut state = state_with_line_map(5);
    let house = add_house(&mut state, "Mover", 1000);
    add_colony(&mut state, house, 0, 5_000_000, 10);
    let fleet = add_fleet(&mut state, house, 0, &[ShipClass::Frigate]);

    let mut packet = CommandPacket::empty(house);
    packet.fleet_orders.push(FleetOrderCommand {
        fleet,
        kind: OrderKind::Move,
        target_system: Some(3),
        target_fleet: None,
        priority: 0,
        roe: None,
    });
    // Turn 1: stored in Command, first jump at Maintenance activation.
    advance(&mut state, &config, &[packet]);
    assert_eq!(state.fleets.get(fleet).unwrap().system, 1);
    advance(&mut state, &config, &[]);
    assert_eq!(state.fleets.get(fleet).unwrap().system, 2);
    let out = advance(&mut state, &config, &[]);
    assert_eq!(state.fleets.get(fleet).unwrap().system, 3);
    assert!(out.events.iter().any(|e| matches!(
        e,
        GameEvent::OrderCompleted {
            order: OrderKind::Move,
            ..
        }
    )));
}

#[test]
fn test_reserve_fleet_rejects_movement_orders() {
    let config = Config::builtin();
    let mut state = state_with_line_map(3);
    let house = add_house(&mut state, "Docked", 1000);
    add_colony(&mut state, house, 0, 5_000_000, 10);
    let fleet = add_fleet(&mut state, house, 0, &[ShipClass::Frigate]);
    state.fleets.get_mut(fleet).unwrap().status = FleetStatus::Reserve;

    let mut packet = CommandPacket::empty(house);
    packet.fleet_orders.push(FleetOrderCommand {
        fleet,
        kind: OrderKind::Move,
        target_system: Some(2),
        target_fleet: None,
        priority: 0,
        roe: None,
    });
    let out = advance(&mut state, &config, &[packet]);
    assert!(out
        .events
        .iter()
        .any(|e| matches!(e, GameEvent::EngineWarning { .. })));
    assert!(state.fleet_orders.is_empty());
    assert_eq!(state.fleets.get(fleet).unwrap().system, 0);
}

/// Scenario: two ETAC fleets race for the same empty system. The lower
/// fleet id wins; the loser keeps its fleet and gets a failure it can
/// react to next turn.
#[test]
fn test_simultaneous_colonize_lowest_fleet_id_wins() {
    let config = Config::builtin();
    let mut state = state_with_line_map(5);
    let house_a = add_house(&mut state, "Alpha", 1000);
    let house_b = add_house(&mut state, "Beta", 1000);
    // B's fleet is created first and gets the lower id.
    let fleet_b = add_fleet(&mut state, house_b, 2, &[ShipClass::Etac]);
    let fleet_a = add_fleet(&mut state, house_a, 2, &[ShipClass::Etac]);
    assert!(fleet_b < fleet_a);
    load_colonists(&mut state, fleet_b, 20);
    load_colonists(&mut state, fleet_a, 20);
    active_order(&mut state, house_b, fleet_b, OrderKind::Colonize, Some(2));
    active_order(&mut state, house_a, fleet_a, OrderKind::Colonize, Some(2));

    let out = advance(&mut state, &config, &[]);

    let colony_id = state.colonies.colony_in_system(2).unwrap();
    assert_eq!(state.colonies.get(colony_id).unwrap().house, house_b);
    // B's ETAC was expended, emptying the fleet; A's survives on station.
    assert!(!state.fleets.contains(fleet_b));
    assert!(state.fleets.contains(fleet_a));
    assert!(out.events.iter().any(|e| matches!(
        e,
        GameEvent::OrderFailed {
            fleet,
            order: OrderKind::Colonize,
            ..
        } if *fleet == fleet_a
    )));
    assert!(out
        .events
        .iter()
        .any(|e| matches!(e, GameEvent::ColonyColonized { house, .. } if *house == house_b)));
}

/// Scenario: spy deployment consumes the scout but not the escorts.
#[test]
fn test_spy_deployment_leaves_the_escort_fleet_standing() {
    let config = Config::builtin();
    let mut state = state_with_line_map(5);
    let house = add_house(&mut state, "Watcher", 1000);
    let enemy = add_house(&mut state, "Watched", 1000);
    make_enemies(&mut state, house, enemy);
    add_colony(&mut state, house, 0, 5_000_000, 10);
    add_colony(&mut state, enemy, 4, 5_000_000, 10);
    let fleet = add_fleet(
        &mut state,
        house,
        0,
        &[ShipClass::Scout, ShipClass::Frigate, ShipClass::Frigate],
    );
    active_order(&mut state, house, fleet, OrderKind::SpyPlanet, Some(4));

    let out = advance(&mut state, &config, &[]);

    let f = state.fleets.get(fleet).unwrap();
    assert_eq!(f.ships().count(), 2);
    assert!(!f.has_scout());
    assert_eq!(state.scouts.len(), 1);
    let scout = state.scouts.iter().next().unwrap();
    assert_eq!(scout.house, house);
    assert!(matches!(
        scout.state,
        SpyState::Traveling | SpyState::OnMission
    ));
    assert!(out
        .events
        .iter()
        .any(|e| matches!(e, GameEvent::SpyScoutDeployed { .. })));
}

/// Scenario: three fleets rendezvous; the lowest id hosts, the others are
/// folded in and their orders die with them.
#[test]
fn test_rendezvous_merges_into_lowest_fleet_id() {
    let config = Config::builtin();
    let mut state = state_with_line_map(5);
    let house = add_house(&mut state, "Gather", 1000);
    add_colony(&mut state, house, 2, 5_000_000, 10);
    let f1 = add_fleet(&mut state, house, 2, &[ShipClass::Frigate]);
    let f2 = add_fleet(&mut state, house, 2, &[ShipClass::Destroyer]);
    let f3 = add_fleet(&mut state, house, 2, &[ShipClass::Corvette]);
    for &fleet in &[f1, f2, f3] {
        active_order(&mut state, house, fleet, OrderKind::Rendezvous, Some(2));
    }

    let out = advance(&mut state, &config, &[]);

    assert!(state.fleets.contains(f1));
    assert!(!state.fleets.contains(f2));
    assert!(!state.fleets.contains(f3));
    assert_eq!(state.fleets.get(f1).unwrap().squadrons.len(), 3);
    assert!(!state.fleet_orders.contains_key(&f2));
    assert!(!state.fleet_orders.contains_key(&f3));
    let merges = out
        .events
        .iter()
        .filter(|e| matches!(e, GameEvent::FleetMerged { into, .. } if *into == f1))
        .count();
    assert_eq!(merges, 2);
}

/// Salvage runs home and breaks the fleet up for half its paid price.
#[test]
fn test_salvage_credits_half_price_and_deletes_the_fleet() {
    let config = Config::builtin();
    let mut state = state_with_line_map(4);
    let house = add_house(&mut state, "Breaker", 0);
    let colony = add_colony(&mut state, house, 0, 5_000_000, 10);
    add_facility(&mut state, colony, FacilityKind::Spaceport, 5);
    let fleet = add_fleet(&mut state, house, 0, &[ShipClass::Frigate, ShipClass::Corvette]);
    active_order(&mut state, house, fleet, OrderKind::Salvage, None);

    let expected: i64 = state
        .fleets
        .get(fleet)
        .unwrap()
        .ships()
        .map(|s| s.cost_paid / 2)
        .sum();
    let out = advance(&mut state, &config, &[]);

    assert!(!state.fleets.contains(fleet));
    assert!(!state.fleet_orders.contains_key(&fleet));
    let credited: i64 = out
        .events
        .iter()
        .filter_map(|e| match e {
            GameEvent::SalvageCredited { amount, .. } => Some(*amount),
            _ => None,
        })
        .sum();
    assert_eq!(credited, expected);
}

/// JoinFleet folds the source into the target and removes its order in
/// the same transaction.
#[test]
fn test_join_fleet_merges_and_cleans_up() {
    let config = Config::builtin();
    let mut state = state_with_line_map(4);
    let house = add_house(&mut state, "Joiner", 1000);
    add_colony(&mut state, house, 1, 5_000_000, 10);
    let target = add_fleet(&mut state, house, 1, &[ShipClass::Destroyer]);
    let source = add_fleet(&mut state, house, 1, &[ShipClass::Frigate]);
    state.fleet_orders.insert(
        source,
        stellar_throne::core::orders::FleetOrder {
            fleet: source,
            house,
            kind: OrderKind::JoinFleet,
            target_system: None,
            target_fleet: Some(target),
            priority: 0,
            roe: None,
            active: true,
            issued_turn: 0,
        },
    );

    advance(&mut state, &config, &[]);

    assert!(!state.fleets.contains(source));
    assert!(!state.fleet_orders.contains_key(&source));
    assert_eq!(state.fleets.get(target).unwrap().squadrons.len(), 2);
}

/// Mothballing needs a spaceport; a bare colony refuses the order.
#[test]
fn test_mothball_requires_a_spaceport() {
    let config = Config::builtin();
    let mut state = state_with_line_map(3);
    let house = add_house(&mut state, "Mothless", 1000);
    add_colony(&mut state, house, 0, 5_000_000, 10);
    let fleet = add_fleet(&mut state, house, 0, &[ShipClass::Frigate]);
    active_order(&mut state, house, fleet, OrderKind::Mothball, None);

    let out = advance(&mut state, &config, &[]);
    assert!(out.events.iter().any(|e| matches!(
        e,
        GameEvent::OrderFailed {
            order: OrderKind::Mothball,
            ..
        }
    )));
    assert_eq!(
        state.fleets.get(fleet).unwrap().status,
        FleetStatus::Active
    );
}
