// src/core/setup.rs
//! New-game initialization: a deterministic star map from the game seed,
//! one homeworld per house with a spaceport, a shipyard and a small
//! starting fleet. Everything is derived from `(seed, params)`, so two
//! games started with the same inputs are identical.

use std::collections::BTreeSet;

use crate::config::Config;
use crate::core::entities::{Colony, Facility, Ship};
use crate::core::rng::TurnRng;
use crate::core::starmap::{Planet, StarSystem};
use crate::core::types::*;
use crate::core::GameState;

#[derive(Debug, Clone)]
pub struct NewGameParams {
    pub seed: u64,
    pub houses: u8,
    pub systems: u16,
}

impl Default for NewGameParams {
    fn default() -> Self {
        Self {
            seed: 0,
            houses: 4,
            systems: 24,
        }
    }
}

const HOUSE_NAMES: [&str; 8] = [
    "House Atreus",
    "House Corvinus",
    "House Draken",
    "House Meridian",
    "House Okonkwo",
    "House Sforza",
    "House Tyrell",
    "House Volkov",
];

pub fn new_game(config: &Config, params: &NewGameParams) -> GameResult<GameState> {
    if params.houses < 2 || usize::from(params.houses) > HOUSE_NAMES.len() {
        return Err(GameError::InvalidCommand(format!(
            "house count {} out of range (2-{})",
            params.houses,
            HOUSE_NAMES.len()
        )));
    }
    if params.systems < params.houses as u16 * 3 {
        return Err(GameError::InvalidCommand(
            "star map too small for that many houses".into(),
        ));
    }

    let mut state = GameState::new(params.seed);
    let mut rng = TurnRng::new(params.seed);

    generate_starmap(&mut state, &mut rng, params.systems)?;

    let spacing = params.systems / u16::from(params.houses);
    for i in 0..params.houses {
        let home_system = u16::from(i) * spacing;
        let house_id = state
            .houses
            .create_house(HOUSE_NAMES[usize::from(i)].to_string())?;
        place_homeworld(&mut state, config, house_id, home_system)?;
    }
    Ok(state)
}

/// Ring topology with chord lanes every third system: every system is
/// reachable and most pairs have more than one route.
fn generate_starmap(state: &mut GameState, rng: &mut TurnRng, count: u16) -> GameResult<()> {
    for id in 0..count {
        let planet = if rng.percent(85) {
            Some(Planet {
                class: roll_planet_class(rng),
                resources: roll_resources(rng),
            })
        } else {
            None
        };
        state.starmap.add_system(StarSystem {
            id,
            name: format!("SYS-{:03}", id),
            planet,
        });
    }
    for id in 0..count {
        state.starmap.add_lane(id, (id + 1) % count)?;
        if id % 3 == 0 {
            state.starmap.add_lane(id, (id + count / 3) % count)?;
        }
    }
    Ok(())
}

fn roll_planet_class(rng: &mut TurnRng) -> PlanetClass {
    match rng.roll(20) {
        0 => PlanetClass::Extreme,
        1..=2 => PlanetClass::Desolate,
        3..=5 => PlanetClass::Hostile,
        6..=9 => PlanetClass::Harsh,
        10..=14 => PlanetClass::Benign,
        15..=17 => PlanetClass::Lush,
        _ => PlanetClass::Eden,
    }
}

fn roll_resources(rng: &mut TurnRng) -> ResourceRating {
    match rng.roll(20) {
        0..=1 => ResourceRating::VeryPoor,
        2..=6 => ResourceRating::Poor,
        7..=13 => ResourceRating::Abundant,
        14..=17 => ResourceRating::Rich,
        _ => ResourceRating::VeryRich,
    }
}

/// Every house starts the same way: a Benign/Abundant homeworld, 20M
/// souls, 100 IU, one spaceport, one shipyard and a frigate picket with a
/// scout.
fn place_homeworld(
    state: &mut GameState,
    config: &Config,
    house: HouseId,
    system: SystemId,
) -> GameResult<()> {
    // Homeworlds are normalized regardless of the rolled planet.
    let sys = state.starmap.system(system)?.clone();
    state.starmap.add_system(StarSystem {
        planet: Some(Planet {
            class: PlanetClass::Benign,
            resources: ResourceRating::Abundant,
        }),
        ..sys
    });

    let colony_id = state.ids.colony();
    let souls = 20_000_000i64;
    let colony = Colony {
        id: colony_id,
        house,
        system,
        souls,
        pu: souls / config.economy.souls_per_pu,
        iu: 100,
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
    state.colonies.insert_colony(colony)?;

    for kind in [FacilityKind::Spaceport, FacilityKind::Shipyard] {
        let spec = config.facility(kind);
        let id = state.ids.facility();
        state.colonies.insert_facility(Facility {
            id,
            colony: colony_id,
            kind,
            base_docks: spec.base_docks,
            effective_docks: spec.base_docks,
            crippled: false,
            cost_paid: spec.cost,
            active_construction: Vec::new(),
            construction_queue: Default::default(),
            active_repairs: Vec::new(),
            repair_queue: Default::default(),
        });
        if let Ok(c) = state.colonies.get_mut(colony_id) {
            c.facility_list_mut(kind).push(id);
        }
    }

    if let Ok(h) = state.houses.get_mut(house) {
        h.treasury = 500;
    }

    let fleet_id = state.ids.fleet();
    state.fleets.create_fleet(fleet_id, house, system);
    for class in [ShipClass::Frigate, ShipClass::Frigate, ShipClass::Corvette] {
        let ship = Ship::new(state.ids.ship(), class, config.ship(class).cost);
        state.fleets.add_ship(fleet_id, ship, &mut state.ids)?;
    }
    // The scout rides in its own pure-scout fleet.
    let scout_fleet = state.ids.fleet();
    state.fleets.create_fleet(scout_fleet, house, system);
    let scout = Ship::new(
        state.ids.ship(),
        ShipClass::Scout,
        config.ship(ShipClass::Scout).cost,
    );
    state.fleets.add_ship(scout_fleet, scout, &mut state.ids)?;
    Ok(())
}
