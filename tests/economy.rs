// tests/economy.rs
//! Income math, blockade pressure, research scaling, the shortfall
//! cascade and capacity enforcement.

mod common;

use common::*;
use stellar_throne::config::Config;
use stellar_throne::core::types::*;
use stellar_throne::core::{GameEvent, ShortfallStep};
use stellar_throne::CommandPacket;

#[test]
fn test_income_matches_the_gco_formula() {
    let config = Config::builtin();
    let mut state = state_with_line_map(3);
    let house = add_house(&mut state, "Fisc", 0);
    // 10M souls -> 20 PU; 50 IU; Benign/Abundant -> RAW 1.10.
    add_colony(&mut state, house, 0, 10_000_000, 50);
    state.houses.get_mut(house).unwrap().tax_rate = 20;

    let out = advance(&mut state, &config, &[]);

    // GCO = 20*1.10 + 50*1.0*(1 + 0.06) = 75; NCV = 75*0.20 = 15.
    let income: i64 = out
        .events
        .iter()
        .filter_map(|e| match e {
            GameEvent::IncomeCollected { amount, .. } => Some(*amount),
            _ => None,
        })
        .sum();
    assert_eq!(income, 15);
}

#[test]
fn test_blockade_cuts_colonial_output() {
    let config = Config::builtin();
    let mut state = state_with_line_map(3);
    let owner = add_house(&mut state, "Sieged", 0);
    let raider = add_house(&mut state, "Raider", 1000);
    make_enemies(&mut state, owner, raider);
    let colony = add_colony(&mut state, owner, 0, 10_000_000, 50);
    state.houses.get_mut(owner).unwrap().tax_rate = 20;
    // Unescorted blockade: owner has no ships so combat never triggers.
    let fleet = add_fleet(&mut state, raider, 0, &[ShipClass::Destroyer]);
    active_order(
        &mut state,
        raider,
        fleet,
        stellar_throne::core::OrderKind::Blockade,
        Some(0),
    );

    let out = advance(&mut state, &config, &[]);

    let c = state.colonies.get(colony).unwrap();
    assert!(c.blockaded);
    assert_eq!(c.blockade_turns, 1);
    assert!(c.blockaded_by.contains(&raider));
    let income: i64 = out
        .events
        .iter()
        .filter_map(|e| match e {
            GameEvent::IncomeCollected { house, amount } if *house == owner => Some(*amount),
            _ => None,
        })
        .sum();
    // Blockade factor 0.4: NCV drops from 15 to floor(75*0.4)*0.2 = 6.
    assert_eq!(income, 6);
    assert!(out
        .events
        .iter()
        .any(|e| matches!(e, GameEvent::ColonyBlockaded { .. })));
}

/// Scenario: treasury 40 against upkeep 100. One active hull worth 60
/// covers 30 at salvage, infrastructure stripping covers the remaining
/// 30, the treasury zeroes out and the first shortfall penalty lands.
#[test]
fn test_shortfall_cascade_salvage_then_strip() {
    let mut config = Config::builtin();
    config.ships.get_mut(&ShipClass::Frigate).unwrap().upkeep = 100;
    config.ships.get_mut(&ShipClass::Frigate).unwrap().cost = 60;
    let mut state = state_with_line_map(3);
    let house = add_house(&mut state, "Broke", 40);
    // No output: the 40 PP premise must survive the Income phase.
    let colony = add_colony(&mut state, house, 0, 0, 0);
    state.houses.get_mut(house).unwrap().tax_rate = 45;
    let fleet = add_fleet(&mut state, house, 0, &[ShipClass::Frigate]);
    let ship_id = state.fleets.get(fleet).unwrap().ships().next().unwrap().id;
    state
        .fleets
        .get_mut(fleet)
        .unwrap()
        .find_ship_mut(ship_id)
        .unwrap()
        .cost_paid = 60;

    let out = advance(&mut state, &config, &[]);

    let house_ref = state.houses.get(house).unwrap();
    assert_eq!(house_ref.treasury, 0);
    assert_eq!(house_ref.consecutive_shortfall_turns, 1);
    assert_eq!(house_ref.prestige, -config.prestige.shortfall_base_penalty);
    // The hull went for 30, then three units of infrastructure at 10 PP.
    assert!(out.events.iter().any(|e| matches!(
        e,
        GameEvent::MaintenanceShortfall {
            step: ShortfallStep::SalvageActive,
            amount: 30,
            ..
        }
    )));
    assert!(out.events.iter().any(|e| matches!(
        e,
        GameEvent::MaintenanceShortfall {
            step: ShortfallStep::StripInfrastructure,
            amount: 30,
            ..
        }
    )));
    assert!(out.events.iter().any(|e| matches!(
        e,
        GameEvent::UpkeepPaid { amount: 100, .. }
    )));
    let c = state.colonies.get(colony).unwrap();
    assert!((c.infrastructure_damage - 0.06).abs() < 1e-9);
    assert!(!state.fleets.contains(fleet));
}

#[test]
fn test_research_request_scales_to_the_treasury() {
    let config = Config::builtin();
    let mut state = state_with_line_map(3);
    let house = add_house(&mut state, "Scholar", 100);
    add_colony(&mut state, house, 0, 5_000_000, 10);

    let mut packet = CommandPacket::empty(house);
    packet.research.economic = 150;
    packet.research.science = 50;
    let out = advance(&mut state, &config, &[packet]);

    // 200 requested against 100: every field halves.
    let allocated: i64 = out
        .events
        .iter()
        .filter_map(|e| match e {
            GameEvent::ResearchAllocated { amount, .. } => Some(*amount),
            _ => None,
        })
        .sum();
    assert_eq!(allocated, 100);
    let h = state.houses.get(house).unwrap();
    // gho below the divisor: 1 PP per RP at level 1.
    assert_eq!(h.economic_rp, 75);
    assert_eq!(h.science_rp, 25);
}

#[test]
fn test_research_cancelled_when_treasury_is_empty() {
    let config = Config::builtin();
    let mut state = state_with_line_map(3);
    let house = add_house(&mut state, "Pauper", 0);
    add_colony(&mut state, house, 0, 0, 0);

    let mut packet = CommandPacket::empty(house);
    packet.research.science = 50;
    let out = advance(&mut state, &config, &[packet]);

    assert!(!out
        .events
        .iter()
        .any(|e| matches!(e, GameEvent::ResearchAllocated { .. })));
    assert_eq!(state.houses.get(house).unwrap().science_rp, 0);
}

/// Squadron cap: over-cap starts a two-turn grace, then exactly one
/// squadron per turn is disbanded, oldest first.
#[test]
fn test_squadron_cap_grace_then_one_disband_per_turn() {
    let config = Config::builtin();
    let mut state = state_with_line_map(3);
    let house = add_house(&mut state, "Horde", 100_000);
    add_colony(&mut state, house, 0, 5_000_000, 0);
    // Ten one-ship squadrons against the base cap of eight.
    let fleet = add_fleet(
        &mut state,
        house,
        0,
        &[ShipClass::Corvette; 10],
    );

    // Turn 1: grace begins.
    advance(&mut state, &config, &[]);
    assert_eq!(state.fleets.get(fleet).unwrap().squadrons.len(), 10);
    // Turn 2: still inside grace.
    advance(&mut state, &config, &[]);
    assert_eq!(state.fleets.get(fleet).unwrap().squadrons.len(), 10);
    // Turn 3: grace expired, one squadron goes.
    let out = advance(&mut state, &config, &[]);
    assert_eq!(state.fleets.get(fleet).unwrap().squadrons.len(), 9);
    assert!(out
        .events
        .iter()
        .any(|e| matches!(e, GameEvent::SquadronDisbanded { .. })));
    // Turn 4: the next one.
    advance(&mut state, &config, &[]);
    assert_eq!(state.fleets.get(fleet).unwrap().squadrons.len(), 8);
    // At the cap: no further disbands.
    advance(&mut state, &config, &[]);
    assert_eq!(state.fleets.get(fleet).unwrap().squadrons.len(), 8);
}

/// Planet breakers over the colony count are scrapped at once, without
/// salvage, newest first.
#[test]
fn test_planet_breaker_cap_scraps_excess_without_salvage() {
    let config = Config::builtin();
    let mut state = state_with_line_map(3);
    let house = add_house(&mut state, "Cracker", 100_000);
    add_colony(&mut state, house, 0, 5_000_000, 500);
    let fleet = add_fleet(
        &mut state,
        house,
        0,
        &[
            ShipClass::PlanetBreaker,
            ShipClass::PlanetBreaker,
            ShipClass::PlanetBreaker,
        ],
    );

    let out = advance(&mut state, &config, &[]);

    // One colony, so one breaker stays; no salvage events for the scrap.
    assert_eq!(
        state.fleets.get(fleet).unwrap().ships().count(),
        1
    );
    assert!(!out
        .events
        .iter()
        .any(|e| matches!(e, GameEvent::SalvageCredited { .. })));
}

#[test]
fn test_high_average_tax_bleeds_prestige() {
    let config = Config::builtin();
    let mut state = state_with_line_map(3);
    let house = add_house(&mut state, "Tyrant", 100_000);
    add_colony(&mut state, house, 0, 10_000_000, 50);
    state.houses.get_mut(house).unwrap().tax_rate = 80;

    let out = advance(&mut state, &config, &[]);
    // Average 80: penalty 1 + (80-51)/5 = 6.
    assert!(out.events.iter().any(|e| matches!(
        e,
        GameEvent::PrestigeAdjusted { delta: -6, .. }
    )));
}

#[test]
fn test_gentle_taxes_earn_prestige_per_colony() {
    let config = Config::builtin();
    let mut state = state_with_line_map(4);
    let house = add_house(&mut state, "Gentle", 100_000);
    add_colony(&mut state, house, 0, 10_000_000, 50);
    add_colony(&mut state, house, 1, 10_000_000, 50);
    state.houses.get_mut(house).unwrap().tax_rate = 10;

    let out = advance(&mut state, &config, &[]);
    // Rate 10: +3 per colony across two colonies.
    assert!(out.events.iter().any(|e| matches!(
        e,
        GameEvent::PrestigeAdjusted { delta: 6, .. }
    )));
}
