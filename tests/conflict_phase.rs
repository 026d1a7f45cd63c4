// tests/conflict_phase.rs
//! Conflict phase behavior: combat set construction with stealth gating,
//! invasion capture, spy detection and covert strikes.

mod common;

use common::*;
use stellar_throne::config::Config;
use stellar_throne::core::entities::{GroundUnit, SpyScout};
use stellar_throne::core::types::*;
use stellar_throne::core::{GameEvent, OrderKind};
use stellar_throne::CommandPacket;

#[test]
fn test_hostile_fleets_in_one_system_fight() {
    let config = Config::builtin();
    let mut state = state_with_line_map(3);
    let a = add_house(&mut state, "Hammer", 10_000);
    let b = add_house(&mut state, "Anvil", 10_000);
    make_enemies(&mut state, a, b);
    add_colony(&mut state, a, 0, 5_000_000, 10);
    add_colony(&mut state, b, 2, 5_000_000, 10);
    add_fleet(&mut state, a, 1, &[ShipClass::Dreadnought, ShipClass::Dreadnought]);
    add_fleet(&mut state, b, 1, &[ShipClass::Corvette]);

    let out = advance(&mut state, &config, &[]);

    assert_eq!(out.reports.len(), 1);
    let report = &out.reports[0];
    assert_eq!(report.system, 1);
    assert_eq!(report.participants, vec![a, b]);
    assert!(out
        .events
        .iter()
        .any(|e| matches!(e, GameEvent::CombatResolved { system: 1, .. })));
    // The corvette cannot have come through three dreadnought volleys
    // untouched.
    assert!(!report.destroyed.is_empty() || !report.crippled.is_empty());
    // Empty-fleet law still holds after the shooting.
    for id in state.fleets.ids() {
        assert!(!state.fleets.get(id).unwrap().is_empty());
    }
}

#[test]
fn test_cloaked_raider_is_not_engaged_without_a_scout() {
    let config = Config::builtin();
    let mut state = state_with_line_map(3);
    let a = add_house(&mut state, "Ghost", 10_000);
    let b = add_house(&mut state, "Blind", 10_000);
    make_enemies(&mut state, a, b);
    add_colony(&mut state, a, 0, 5_000_000, 10);
    add_colony(&mut state, b, 2, 5_000_000, 10);
    add_fleet(&mut state, a, 1, &[ShipClass::Raider]);
    add_fleet(&mut state, b, 1, &[ShipClass::Destroyer]);

    let out = advance(&mut state, &config, &[]);
    assert!(out.reports.is_empty());
}

#[test]
fn test_scout_reveals_the_cloaked_raider() {
    let config = Config::builtin();
    let mut state = state_with_line_map(3);
    let a = add_house(&mut state, "Ghost", 10_000);
    let b = add_house(&mut state, "Keen", 10_000);
    make_enemies(&mut state, a, b);
    add_colony(&mut state, a, 0, 5_000_000, 10);
    add_colony(&mut state, b, 2, 5_000_000, 10);
    add_fleet(&mut state, a, 1, &[ShipClass::Raider]);
    add_fleet(&mut state, b, 1, &[ShipClass::Destroyer, ShipClass::Scout]);

    let out = advance(&mut state, &config, &[]);
    assert_eq!(out.reports.len(), 1);
}

#[test]
fn test_invasion_with_no_defenders_captures_the_colony() {
    let config = Config::builtin();
    let mut state = state_with_line_map(3);
    let attacker = add_house(&mut state, "Landing", 10_000);
    let owner = add_house(&mut state, "Holdout", 10_000);
    make_enemies(&mut state, attacker, owner);
    add_colony(&mut state, attacker, 0, 5_000_000, 10);
    let colony = add_colony(&mut state, owner, 2, 5_000_000, 10);
    let fleet = add_fleet(
        &mut state,
        attacker,
        2,
        &[ShipClass::HeavyCruiser, ShipClass::TroopTransport],
    );
    load_marines(&mut state, fleet, 500);
    active_order(&mut state, attacker, fleet, OrderKind::Invade, Some(2));

    let out = advance(&mut state, &config, &[]);

    assert_eq!(state.colonies.get(colony).unwrap().house, attacker);
    assert!(out.events.iter().any(|e| matches!(
        e,
        GameEvent::InvasionResolved {
            success: true,
            ..
        }
    )));
    assert!(out
        .events
        .iter()
        .any(|e| matches!(e, GameEvent::ColonyCaptured { .. })));
    // The garrison landed.
    assert!(!state.colonies.get(colony).unwrap().ground_units.is_empty());
}

#[test]
fn test_blitz_requires_two_to_one_marines() {
    let config = Config::builtin();
    let mut state = state_with_line_map(3);
    let attacker = add_house(&mut state, "Rash", 10_000);
    let owner = add_house(&mut state, "Dug-in", 10_000);
    make_enemies(&mut state, attacker, owner);
    add_colony(&mut state, attacker, 0, 5_000_000, 10);
    let colony = add_colony(&mut state, owner, 2, 5_000_000, 10);
    {
        let c = state.colonies.get_mut(colony).unwrap();
        c.ground_units.push(GroundUnit {
            id: 900,
            kind: GroundUnitKind::Army,
            strength: 400,
        });
    }
    let fleet = add_fleet(
        &mut state,
        attacker,
        2,
        &[ShipClass::HeavyCruiser, ShipClass::TroopTransport],
    );
    // 500 marines against 400 defenders: short of 2:1.
    load_marines(&mut state, fleet, 500);
    active_order(&mut state, attacker, fleet, OrderKind::Blitz, Some(2));

    let out = advance(&mut state, &config, &[]);

    assert_eq!(state.colonies.get(colony).unwrap().house, owner);
    assert!(out.events.iter().any(|e| matches!(
        e,
        GameEvent::OrderFailed {
            order: OrderKind::Blitz,
            ..
        }
    )));
}

#[test]
fn test_oversized_scout_mesh_is_detected_and_runs_home() {
    let config = Config::builtin();
    let mut state = state_with_line_map(5);
    let spy = add_house(&mut state, "Eyes", 1000);
    let patroller = add_house(&mut state, "Watch", 1000);
    make_enemies(&mut state, spy, patroller);
    add_colony(&mut state, spy, 0, 5_000_000, 10);
    add_fleet(&mut state, patroller, 4, &[ShipClass::Destroyer]);
    // A fifteen-strong mesh lights up every sensor: threshold drops to 1.
    let scout_id = state.ids.scout();
    state.scouts.insert(SpyScout {
        id: scout_id,
        house: spy,
        system: 4,
        eli: 1,
        mission: SpyMission::SpySystem,
        target: 4,
        state: stellar_throne::core::SpyState::OnMission,
        path: vec![4],
        path_index: 0,
        merged_count: 15,
    });

    let out = advance(&mut state, &config, &[]);

    assert!(out
        .events
        .iter()
        .any(|e| matches!(e, GameEvent::SpyScoutDetected { .. })));
    let scout = state.scouts.get(scout_id).unwrap();
    assert_eq!(
        scout.state,
        stellar_throne::core::SpyState::Returning
    );
}

/// An assault on a colony drags the defender's allies in: symmetric Enemy
/// escalation, recorded in both houses' violation histories.
#[test]
fn test_assault_escalates_the_defenders_allies() {
    let config = Config::builtin();
    let mut state = state_with_line_map(3);
    let attacker = add_house(&mut state, "Aggressor", 10_000);
    let owner = add_house(&mut state, "Victim", 10_000);
    let friend = add_house(&mut state, "Sworn", 10_000);
    make_enemies(&mut state, attacker, owner);
    state
        .houses
        .get_mut(friend)
        .unwrap()
        .relations
        .insert(owner, DiplomaticStatus::Ally);
    add_colony(&mut state, attacker, 0, 5_000_000, 10);
    add_colony(&mut state, owner, 2, 5_000_000, 10);
    let fleet = add_fleet(
        &mut state,
        attacker,
        2,
        &[ShipClass::HeavyCruiser, ShipClass::TroopTransport],
    );
    load_marines(&mut state, fleet, 500);
    active_order(&mut state, attacker, fleet, OrderKind::Invade, Some(2));

    advance(&mut state, &config, &[]);

    let friend_house = state.houses.get(friend).unwrap();
    assert_eq!(
        friend_house.relation_to(attacker),
        DiplomaticStatus::Enemy
    );
    assert!(!friend_house.violations.is_empty());
    assert_eq!(friend_house.violations[0].against, attacker);
    let attacker_house = state.houses.get(attacker).unwrap();
    assert_eq!(attacker_house.relation_to(friend), DiplomaticStatus::Enemy);
    assert!(attacker_house
        .violations
        .iter()
        .any(|v| v.against == friend));
}

/// Rules of engagement reach the resolver: an evasive posture fires once
/// at half effect and fades, a pressing one finishes the job.
#[test]
fn test_rules_of_engagement_scale_the_default_resolver() {
    use std::collections::{BTreeMap, BTreeSet};

    use stellar_throne::core::entities::{Fleet, Ship, Squadron};
    use stellar_throne::core::rng::TurnRng;
    use stellar_throne::core::types::TechLevels;
    use stellar_throne::systems::combat::{BattleContext, CombatResolver, DefaultCombatResolver};

    let config = Config::builtin();
    let one_ship_fleet = |fleet_id: FleetId, house: HouseId, ship_id: ShipId, class: ShipClass| {
        Fleet {
            id: fleet_id,
            house,
            system: 1,
            squadrons: vec![Squadron {
                id: ship_id,
                flagship: Ship::new(ship_id, class, 100),
                escorts: Vec::new(),
                kind: class.squadron_type(),
            }],
            spacelift: Vec::new(),
            status: FleetStatus::Active,
        }
    };
    let mut hostile_pairs: BTreeSet<(HouseId, HouseId)> = BTreeSet::new();
    hostile_pairs.insert((0, 1));
    let tech: BTreeMap<HouseId, TechLevels> = BTreeMap::new();

    for (posture, expected_kills) in [(0u8, 0usize), (10u8, 1usize)] {
        let mut fleets = vec![
            one_ship_fleet(1, 0, 10, ShipClass::SuperDreadnought),
            one_ship_fleet(2, 1, 20, ShipClass::Corvette),
        ];
        let mut starbases = Vec::new();
        let mut roe = BTreeMap::new();
        roe.insert(0u8, posture);
        let battle = BattleContext {
            hostile_pairs: &hostile_pairs,
            tech: &tech,
            roe: &roe,
            config: &config,
        };
        let mut rng = TurnRng::new(42);
        let report = DefaultCombatResolver::new().resolve_space_battle(
            1,
            &mut fleets,
            &mut starbases,
            &battle,
            &mut rng,
        );
        assert_eq!(report.destroyed.len(), expected_kills);
    }
}

#[test]
fn test_covert_strike_lands_next_conflict() {
    let config = Config::builtin();
    let mut state = state_with_line_map(3);
    let attacker = add_house(&mut state, "Knife", 1000);
    let target = add_house(&mut state, "Mark", 1000);
    add_colony(&mut state, attacker, 0, 5_000_000, 10);
    add_colony(&mut state, target, 2, 5_000_000, 10);
    state.houses.get_mut(attacker).unwrap().ebp = 200;
    state.houses.get_mut(attacker).unwrap().tech.electronic_intel = 20;
    state.houses.get_mut(target).unwrap().tax_rate = 45;
    let prestige_before = state.houses.get(target).unwrap().prestige;

    let mut packet = CommandPacket::empty(attacker);
    packet
        .covert_actions
        .push(stellar_throne::core::orders::CovertAction {
            mission: CovertMission::Assassination,
            target,
        });
    // Turn 1 queues and charges; turn 2's Conflict resolves.
    advance(&mut state, &config, &[packet]);
    assert!(state.houses.get(attacker).unwrap().ebp < 200);
    let out = advance(&mut state, &config, &[]);

    assert!(out.events.iter().any(|e| matches!(
        e,
        GameEvent::EspionageResolved { success: true, .. }
    )));
    assert_eq!(
        state.houses.get(target).unwrap().prestige,
        prestige_before - 3
    );
}
