// tests/construction_commissioning.rs
//! Dock queues and the two commissioning paths: submission ordering,
//! capacity refusal, cross-phase handoff, and the shipyard-loss race.

mod common;

use common::*;
use stellar_throne::config::Config;
use stellar_throne::core::entities::ProjectKind;
use stellar_throne::core::orders::{BuildCommand, ProjectKindSpec};
use stellar_throne::core::types::*;
use stellar_throne::core::GameEvent;
use stellar_throne::CommandPacket;

fn frigate_build(colony: ColonyId) -> BuildCommand {
    BuildCommand {
        colony,
        facility: None,
        project: ProjectKindSpec::Ship(ShipClass::Frigate),
    }
}

/// Scenario: seven frigates at a five-dock spaceport. Five go active at
/// once, two wait in queue, and over three turns all seven commission.
#[test]
fn test_queue_ordering_at_a_five_dock_spaceport() {
    let config = Config::builtin();
    let mut state = state_with_line_map(3);
    let house = add_house(&mut state, "Builder", 10_000);
    let colony = add_colony(&mut state, house, 0, 10_000_000, 50);
    let spaceport = add_facility(&mut state, colony, FacilityKind::Spaceport, 5);

    let mut packet = CommandPacket::empty(house);
    for _ in 0..7 {
        packet.builds.push(frigate_build(colony));
    }
    advance(&mut state, &config, &[packet]);

    // The five actives completed in Maintenance and now wait for Command;
    // the two queued moved into the freed docks.
    assert_eq!(state.pending_military_commissions.len(), 5);
    let facility = state.colonies.facility(spaceport).unwrap();
    assert_eq!(facility.active_construction.len(), 2);
    assert!(facility.construction_queue.is_empty());

    let out = advance(&mut state, &config, &[]);
    let commissioned = out
        .events
        .iter()
        .filter(|e| matches!(e, GameEvent::ShipCommissioned { .. }))
        .count();
    assert_eq!(commissioned, 5);
    assert_eq!(state.pending_military_commissions.len(), 2);

    let out = advance(&mut state, &config, &[]);
    let commissioned = out
        .events
        .iter()
        .filter(|e| matches!(e, GameEvent::ShipCommissioned { .. }))
        .count();
    assert_eq!(commissioned, 2);
    // No frigate lost: seven hulls in fleets at the colony.
    let hulls: usize = state
        .fleets
        .iter()
        .filter(|f| f.house == house)
        .flat_map(|f| f.ships())
        .filter(|s| s.class == ShipClass::Frigate)
        .count();
    assert_eq!(hulls, 7);
}

/// Dual-slot capacity: one active and one waiting per dock. The eleventh
/// submission at a five-dock facility is refused.
#[test]
fn test_submission_past_dock_capacity_is_dropped() {
    let config = Config::builtin();
    let mut state = state_with_line_map(3);
    let house = add_house(&mut state, "Greedy", 100_000);
    let colony = add_colony(&mut state, house, 0, 10_000_000, 50);
    let spaceport = add_facility(&mut state, colony, FacilityKind::Spaceport, 5);

    let mut packet = CommandPacket::empty(house);
    for _ in 0..11 {
        packet.builds.push(BuildCommand {
            colony,
            facility: Some(spaceport),
            project: ProjectKindSpec::Ship(ShipClass::Frigate),
        });
    }
    let out = advance(&mut state, &config, &[packet]);

    let facility = state.colonies.facility(spaceport).unwrap();
    // Five completed already (1-turn builds), five still active.
    assert_eq!(state.pending_military_commissions.len(), 5);
    assert_eq!(facility.active_construction.len(), 5);
    assert!(facility.construction_queue.is_empty());
    assert!(out
        .events
        .iter()
        .any(|e| matches!(e, GameEvent::EngineWarning { .. })));
    // Ten were charged, the eleventh was not.
    let charged: i64 = out
        .events
        .iter()
        .filter_map(|e| match e {
            GameEvent::BuildCharged { amount, .. } => Some(*amount),
            _ => None,
        })
        .sum();
    let frigate_cost = config.ship(ShipClass::Frigate).cost;
    assert_eq!(charged, 10 * frigate_cost * 2);
}

/// Planet-side builds pay double at the spaceport; shipyard docks charge
/// list price.
#[test]
fn test_spaceport_builds_cost_double() {
    let config = Config::builtin();
    let mut state = state_with_line_map(3);
    let house = add_house(&mut state, "Thrifty", 10_000);
    let colony = add_colony(&mut state, house, 0, 10_000_000, 50);
    let spaceport = add_facility(&mut state, colony, FacilityKind::Spaceport, 5);
    let shipyard = add_facility(&mut state, colony, FacilityKind::Shipyard, 8);

    let mut packet = CommandPacket::empty(house);
    packet.builds.push(BuildCommand {
        colony,
        facility: Some(spaceport),
        project: ProjectKindSpec::Ship(ShipClass::Destroyer),
    });
    packet.builds.push(BuildCommand {
        colony,
        facility: Some(shipyard),
        project: ProjectKindSpec::Ship(ShipClass::Destroyer),
    });
    let out = advance(&mut state, &config, &[packet]);

    let charges: Vec<i64> = out
        .events
        .iter()
        .filter_map(|e| match e {
            GameEvent::BuildCharged { amount, .. } => Some(*amount),
            _ => None,
        })
        .collect();
    let list = config.ship(ShipClass::Destroyer).cost;
    assert_eq!(charges, vec![list * 2, list]);
}

/// Scenario: commissioning race. Hulls finished before the shipyard fell
/// still commission; only in-progress work dies with the yard (and the
/// strict flag tightens that).
#[test]
fn test_completed_hulls_survive_shipyard_loss() {
    let config = Config::builtin();
    let mut state = state_with_line_map(3);
    let house = add_house(&mut state, "Racer", 10_000);
    let colony = add_colony(&mut state, house, 0, 10_000_000, 50);
    let shipyard = add_facility(&mut state, colony, FacilityKind::Shipyard, 8);

    // Three destroyers one turn from completion.
    {
        let facility = state.colonies.facility_mut(shipyard).unwrap();
        for _ in 0..3 {
            facility
                .active_construction
                .push(stellar_throne::core::entities::ConstructionProject {
                    kind: ProjectKind::Ship(ShipClass::Destroyer),
                    cost: 70,
                    cost_paid: 70,
                    turns_remaining: 1,
                });
        }
    }
    advance(&mut state, &config, &[]);
    assert_eq!(state.pending_military_commissions.len(), 3);

    // The yard burns down between turns.
    state.colonies.remove_facility(shipyard).unwrap();

    let out = advance(&mut state, &config, &[]);
    let commissioned = out
        .events
        .iter()
        .filter(|e| matches!(e, GameEvent::ShipCommissioned { .. }))
        .count();
    assert_eq!(commissioned, 3);
    assert!(!out
        .events
        .iter()
        .any(|e| matches!(e, GameEvent::ShipProductionLost { .. })));
}

#[test]
fn test_strict_commissioning_drops_orphaned_hulls() {
    let mut config = Config::builtin();
    config.strict_commissioning = true;
    let mut state = state_with_line_map(3);
    let house = add_house(&mut state, "Strict", 10_000);
    let colony = add_colony(&mut state, house, 0, 10_000_000, 50);
    let shipyard = add_facility(&mut state, colony, FacilityKind::Shipyard, 8);

    state
        .pending_military_commissions
        .push(stellar_throne::core::entities::PendingCommission {
            house,
            colony,
            facility: shipyard,
            class: ShipClass::Destroyer,
            cost_paid: 70,
        });
    state.colonies.remove_facility(shipyard).unwrap();

    let out = advance(&mut state, &config, &[]);
    assert!(out
        .events
        .iter()
        .any(|e| matches!(e, GameEvent::ShipProductionLost { .. })));
    assert!(!out
        .events
        .iter()
        .any(|e| matches!(e, GameEvent::ShipCommissioned { .. })));
}

/// Fighters are planetary defense: they commission in the same
/// Maintenance and never touch the military pending queue.
#[test]
fn test_fighters_commission_same_turn_into_the_colony() {
    let config = Config::builtin();
    let mut state = state_with_line_map(3);
    let house = add_house(&mut state, "Wing", 10_000);
    let colony = add_colony(&mut state, house, 0, 10_000_000, 50);
    add_facility(&mut state, colony, FacilityKind::Spaceport, 5);

    let mut packet = CommandPacket::empty(house);
    packet.builds.push(BuildCommand {
        colony,
        facility: None,
        project: ProjectKindSpec::Ship(ShipClass::Fighter),
    });
    advance(&mut state, &config, &[packet]);

    assert!(state.pending_military_commissions.is_empty());
    assert_eq!(state.colonies.get(colony).unwrap().fighters.len(), 1);
}

/// Army recruitment conscripts souls, but never below minimum viability.
#[test]
fn test_recruitment_respects_minimum_population() {
    let config = Config::builtin();
    let mut state = state_with_line_map(3);
    let house = add_house(&mut state, "Levy", 10_000);
    // Just above the 1M floor: recruiting 100k souls must refund.
    let colony = add_colony(&mut state, house, 0, 1_020_000, 10);

    let mut packet = CommandPacket::empty(house);
    packet.builds.push(BuildCommand {
        colony,
        facility: None,
        project: ProjectKindSpec::GroundUnit(GroundUnitKind::Army),
    });
    advance(&mut state, &config, &[]); // spin one turn so growth settles
    let souls_before = state.colonies.get(colony).unwrap().souls;
    let out = advance(&mut state, &config, &[packet]);
    let _ = out;
    // Build takes two turns; resolve it.
    let out = advance(&mut state, &config, &[]);
    assert!(!out
        .events
        .iter()
        .any(|e| matches!(e, GameEvent::UnitRecruited { .. })));
    assert!(out
        .events
        .iter()
        .any(|e| matches!(e, GameEvent::SalvageCredited { .. })));
    let colony_ref = state.colonies.get(colony).unwrap();
    assert!(colony_ref.ground_units.is_empty());
    assert!(colony_ref.souls >= souls_before);
}
