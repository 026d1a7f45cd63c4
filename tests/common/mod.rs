// tests/common/mod.rs
//! Shared scaffolding for the integration tests: a hand-built line-shaped
//! star map and direct entity construction, so each scenario controls ids
//! and quantities exactly.
#![allow(dead_code)]

use std::collections::BTreeSet;

use stellar_throne::config::Config;
use stellar_throne::core::entities::{Cargo, Colony, Facility, Ship};
use stellar_throne::core::events::OrderKind;
use stellar_throne::core::orders::FleetOrder;
use stellar_throne::core::starmap::{Planet, StarSystem};
use stellar_throne::core::types::*;
use stellar_throne::core::{GameState, TurnOutput};
use stellar_throne::systems::DefaultCombatResolver;
use stellar_throne::CommandPacket;

pub const SEED: u64 = 0x5EED;

/// Systems 0..n joined in a line, every one with a Benign/Abundant planet.
pub fn state_with_line_map(n: u16) -> GameState {
    let mut state = GameState::new(SEED);
    for id in 0..n {
        state.starmap.add_system(StarSystem {
            id,
            name: format!("SYS-{:03}", id),
            planet: Some(Planet {
                class: PlanetClass::Benign,
                resources: ResourceRating::Abundant,
            }),
        });
    }
    for id in 1..n {
        state.starmap.add_lane(id - 1, id).unwrap();
    }
    state
}

pub fn add_house(state: &mut GameState, name: &str, treasury: i64) -> HouseId {
    let id = state.houses.create_house(name.to_string()).unwrap();
    state.houses.get_mut(id).unwrap().treasury = treasury;
    id
}

pub fn make_enemies(state: &mut GameState, a: HouseId, b: HouseId) {
    state
        .houses
        .get_mut(a)
        .unwrap()
        .relations
        .insert(b, DiplomaticStatus::Enemy);
    state
        .houses
        .get_mut(b)
        .unwrap()
        .relations
        .insert(a, DiplomaticStatus::Enemy);
}

pub fn add_colony(
    state: &mut GameState,
    house: HouseId,
    system: SystemId,
    souls: i64,
    iu: i64,
) -> ColonyId {
    let id = state.ids.colony();
    let colony = Colony {
        id,
        house,
        system,
        souls,
        pu: souls / 500_000,
        iu,
        infrastructure_damage: 0.0,
        planet_class: PlanetClass::Benign,
        resources: ResourceRating::Abundant,
        spaceports: Vec::new(),
        shipyards: Vec::new(),
        drydocks: Vec::new(),
        starbases: Vec::new(),
        ground_units: Vec::new(),
        fighters: Vec::new(),
        tax_override: None,
        auto_repair: false,
        auto_load_fighters: false,
        blockaded: false,
        blockaded_by: BTreeSet::new(),
        blockade_turns: 0,
        terraforming: None,
        construction_slot: None,
        construction_queue: Default::default(),
        fighter_cap_grace_until: None,
        unassigned_ships: Vec::new(),
    };
    state.colonies.insert_colony(colony).unwrap()
}

pub fn add_facility(
    state: &mut GameState,
    colony: ColonyId,
    kind: FacilityKind,
    docks: u8,
) -> FacilityId {
    let id = state.ids.facility();
    state.colonies.insert_facility(Facility {
        id,
        colony,
        kind,
        base_docks: docks,
        effective_docks: docks,
        crippled: false,
        cost_paid: 100,
        active_construction: Vec::new(),
        construction_queue: Default::default(),
        active_repairs: Vec::new(),
        repair_queue: Default::default(),
    });
    state
        .colonies
        .get_mut(colony)
        .unwrap()
        .facility_list_mut(kind)
        .push(id);
    id
}

/// One-ship-per-squadron fleet (spacelift classes land in the spacelift
/// list). Ships record a plausible paid price from the builtin tables.
pub fn add_fleet(
    state: &mut GameState,
    house: HouseId,
    system: SystemId,
    classes: &[ShipClass],
) -> FleetId {
    let config = Config::builtin();
    let fleet = state.ids.fleet();
    state.fleets.create_fleet(fleet, house, system);
    for &class in classes {
        let ship = Ship::new(state.ids.ship(), class, config.ship(class).cost);
        state.fleets.add_ship(fleet, ship, &mut state.ids).unwrap();
    }
    fleet
}

pub fn load_colonists(state: &mut GameState, fleet: FleetId, ptu: i64) {
    let f = state.fleets.get_mut(fleet).unwrap();
    let etac = f
        .spacelift
        .iter_mut()
        .find(|s| s.class == ShipClass::Etac)
        .unwrap();
    etac.cargo = Cargo::Colonists { ptu };
}

pub fn load_marines(state: &mut GameState, fleet: FleetId, units: i64) {
    let f = state.fleets.get_mut(fleet).unwrap();
    let transport = f
        .spacelift
        .iter_mut()
        .find(|s| s.class == ShipClass::TroopTransport)
        .unwrap();
    transport.cargo = Cargo::Marines { units };
}

/// Stores an already-activated order, as if submitted last turn and
/// activated in last Maintenance.
pub fn active_order(
    state: &mut GameState,
    house: HouseId,
    fleet: FleetId,
    kind: OrderKind,
    target_system: Option<SystemId>,
) {
    state.fleet_orders.insert(
        fleet,
        FleetOrder {
            fleet,
            house,
            kind,
            target_system,
            target_fleet: None,
            priority: 0,
            roe: None,
            active: true,
            issued_turn: 0,
        },
    );
}

pub fn advance(state: &mut GameState, config: &Config, packets: &[CommandPacket]) -> TurnOutput {
    let seed = stellar_throne::core::rng::TurnRng::turn_seed(state.game_seed, state.turn);
    let mut resolver = DefaultCombatResolver::new();
    state.advance(packets, seed, config, &mut resolver)
}
