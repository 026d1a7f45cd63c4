// src/systems/commissioning.rs
//! The two commissioning entry points. Planetary defenses (fighters,
//! facilities, ground units) go operational in the same Maintenance that
//! finishes them, so they defend next turn's Conflict. Military hulls wait
//! in `pending_military_commissions` and join fleets at the start of the
//! next Command phase, after Conflict has had its chance to burn down the
//! shipyard that built them.

use crate::core::entities::{
    Cargo, Facility, GroundUnit, PendingCommission, ProjectKind, Ship,
};
use crate::core::events::GameEvent;
use crate::core::types::*;
use crate::core::GameState;
use crate::systems::TurnContext;

/// Command step 1: drain the pending queue and put hulls into fleets.
/// Scouts pool into a pure-scout fleet; everything else joins a combat
/// fleet; a new fleet forms when none qualifies. Completed hulls survive
/// the loss of their shipyard unless strict commissioning is configured.
pub fn commission_military(state: &mut GameState, ctx: &mut TurnContext<'_>) {
    let pending = std::mem::take(&mut state.pending_military_commissions);
    for entry in pending {
        if ctx.config.strict_commissioning && !state.colonies.has_facility(entry.facility) {
            ctx.push(GameEvent::ShipProductionLost {
                colony: entry.colony,
                facility: entry.facility,
                class: entry.class,
            });
            continue;
        }
        if !state.colonies.contains(entry.colony) {
            // The colony itself fell; the hull is lost with it.
            ctx.push(GameEvent::ShipProductionLost {
                colony: entry.colony,
                facility: entry.facility,
                class: entry.class,
            });
            continue;
        }
        commission_one(state, &entry, ctx);
    }
}

fn commission_one(state: &mut GameState, entry: &PendingCommission, ctx: &mut TurnContext<'_>) {
    let Ok(colony) = state.colonies.get(entry.colony) else {
        return;
    };
    let system = colony.system;
    let ship_id = state.ids.ship();
    let ship = Ship::new(ship_id, entry.class, entry.cost_paid);

    if entry.class == ShipClass::Fighter {
        // Fighters are colony defense; they only leave on a carrier.
        if let Ok(colony) = state.colonies.get_mut(entry.colony) {
            colony.fighters.push(ship);
        }
        ctx.push(GameEvent::ShipCommissioned {
            house: entry.house,
            colony: entry.colony,
            ship: ship_id,
            class: entry.class,
            fleet: None,
        });
        return;
    }

    let fleet_id = find_or_create_receiving_fleet(state, entry.house, system, entry.class);
    if state.fleets.add_ship(fleet_id, ship, &mut state.ids).is_ok() {
        log::debug!(
            "commissioned {:?} {} into fleet {}",
            entry.class,
            ship_id,
            fleet_id
        );
        ctx.push(GameEvent::ShipCommissioned {
            house: entry.house,
            colony: entry.colony,
            ship: ship_id,
            class: entry.class,
            fleet: Some(fleet_id),
        });
    }
}

fn find_or_create_receiving_fleet(
    state: &mut GameState,
    house: HouseId,
    system: SystemId,
    class: ShipClass,
) -> FleetId {
    let mut candidates = state.fleets.ids_at_system(system);
    candidates.retain(|&id| {
        state
            .fleets
            .get(id)
            .map(|f| f.house == house && f.status == FleetStatus::Active)
            .unwrap_or(false)
    });
    candidates.sort_unstable();

    let wanted = if class == ShipClass::Scout {
        // Scouts form or join a pure-scout fleet.
        candidates
            .iter()
            .copied()
            .find(|&id| state.fleets.get(id).map(|f| f.is_pure_scout()).unwrap_or(false))
    } else {
        // Everything else joins a combat fleet, never a pure scout or
        // auxiliary formation.
        candidates.iter().copied().find(|&id| {
            state
                .fleets
                .get(id)
                .map(|f| {
                    !f.is_pure_scout()
                        && (f.squadrons.iter().any(|s| s.kind == SquadronType::Combat)
                            || !f.spacelift.is_empty())
                })
                .unwrap_or(false)
        })
    };
    match wanted {
        Some(id) => id,
        None => {
            let id = state.ids.fleet();
            state.fleets.create_fleet(id, house, system)
        }
    }
}

/// Maintenance-side commissioning of a finished planet-side project.
/// Armies and marines conscript souls; a recruit that would push the
/// colony below minimum viable population is refunded instead.
pub fn commission_planetside(
    state: &mut GameState,
    colony_id: ColonyId,
    project: ProjectKind,
    cost_paid: i64,
    ctx: &mut TurnContext<'_>,
) {
    let Ok(colony) = state.colonies.get(colony_id) else {
        return;
    };
    let house = colony.house;
    let cst = state
        .houses
        .get(house)
        .map(|h| h.tech.construction)
        .unwrap_or(1);

    match project {
        ProjectKind::Facility(kind) => {
            let spec = *ctx.config.facility(kind);
            let id = state.ids.facility();
            let scale = 1.0 + ctx.config.construction.cst_dock_bonus * f64::from(cst.saturating_sub(1));
            let effective = ((f64::from(spec.base_docks) * scale).floor() as u8).max(1);
            state.colonies.insert_facility(Facility {
                id,
                colony: colony_id,
                kind,
                base_docks: spec.base_docks,
                effective_docks: if spec.base_docks == 0 { 0 } else { effective },
                crippled: false,
                cost_paid,
                active_construction: Vec::new(),
                construction_queue: Default::default(),
                active_repairs: Vec::new(),
                repair_queue: Default::default(),
            });
            if let Ok(colony) = state.colonies.get_mut(colony_id) {
                colony.facility_list_mut(kind).push(id);
            }
            ctx.push(GameEvent::BuildingCompleted {
                colony: colony_id,
                facility: id,
                kind,
            });
        }
        ProjectKind::GroundUnit(kind) => {
            let spec = *ctx.config.ground_unit(kind);
            let min_viable = ctx.config.economy.min_viable_souls;
            if spec.population_cost > 0 {
                let souls = state.colonies.get(colony_id).map(|c| c.souls).unwrap_or(0);
                if souls - spec.population_cost < min_viable {
                    // Refund the recruit rather than hollow out the colony.
                    let _ = state.houses.credit(house, cost_paid);
                    ctx.push(GameEvent::SalvageCredited {
                        house,
                        amount: cost_paid,
                    });
                    ctx.warn(format!(
                        "recruitment at colony {} refunded; population too low",
                        colony_id
                    ));
                    return;
                }
            }
            let unit_id = state.ids.ground_unit();
            if let Ok(colony) = state.colonies.get_mut(colony_id) {
                colony.souls -= spec.population_cost;
                colony.ground_units.push(GroundUnit {
                    id: unit_id,
                    kind,
                    strength: spec.strength,
                });
            }
            ctx.push(GameEvent::UnitRecruited {
                colony: colony_id,
                unit: unit_id,
                kind,
            });
        }
        ProjectKind::Industrial { units } => {
            if let Ok(colony) = state.colonies.get_mut(colony_id) {
                colony.iu += units;
            }
        }
        ProjectKind::Infrastructure { units } => {
            let repair = ctx.config.economy.infra_repair_per_unit * units as f64;
            if let Ok(colony) = state.colonies.get_mut(colony_id) {
                colony.infrastructure_damage = (colony.infrastructure_damage - repair).max(0.0);
            }
        }
        ProjectKind::Ship(_) => {
            // Ships never complete planet-side.
            ctx.warn(format!(
                "ship project completed in colony {} planet slot",
                colony_id
            ));
        }
    }
}

/// Loads colony fighters onto co-located friendly carriers, FIFO by
/// fighter id, until each hangar is full. Remainder stays home.
pub fn auto_load_fighters(state: &mut GameState, colony_id: ColonyId, ctx: &mut TurnContext<'_>) {
    let Ok(colony) = state.colonies.get(colony_id) else {
        return;
    };
    let house = colony.house;
    let system = colony.system;

    let mut fighters = match state.colonies.get_mut(colony_id) {
        Ok(c) => std::mem::take(&mut c.fighters),
        Err(_) => return,
    };
    fighters.sort_by_key(|f| f.id);

    let mut fleet_ids = state.fleets.ids_at_system(system);
    fleet_ids.retain(|&id| {
        state
            .fleets
            .get(id)
            .map(|f| f.house == house)
            .unwrap_or(false)
    });
    fleet_ids.sort_unstable();

    for fleet_id in fleet_ids {
        if fighters.is_empty() {
            break;
        }
        let Ok(fleet) = state.fleets.get_mut(fleet_id) else {
            continue;
        };
        let mut carrier_ids: Vec<ShipId> = fleet
            .ships()
            .filter(|s| s.class.is_carrier())
            .map(|s| s.id)
            .collect();
        carrier_ids.sort_unstable();
        for carrier_id in carrier_ids {
            if fighters.is_empty() {
                break;
            }
            let hangar = ctx
                .config
                .ship(
                    fleet
                        .find_ship(carrier_id)
                        .map(|s| s.class)
                        .unwrap_or(ShipClass::Carrier),
                )
                .hangar_capacity as usize;
            let Some(carrier) = fleet.find_ship_mut(carrier_id) else {
                continue;
            };
            if !matches!(carrier.cargo, Cargo::Fighters { .. }) {
                carrier.cargo = Cargo::Fighters { ships: Vec::new() };
            }
            if let Cargo::Fighters { ships } = &mut carrier.cargo {
                while ships.len() < hangar && !fighters.is_empty() {
                    ships.push(fighters.remove(0));
                }
            }
        }
    }

    if let Ok(c) = state.colonies.get_mut(colony_id) {
        c.fighters = fighters;
    }
}
