// src/systems/construction.rs
//! Build submission and dock bookkeeping. Ship hulls occupy docks at a
//! spaceport or shipyard: each dock runs one active project and holds one
//! waiting in queue, so a facility refuses ship submissions past twice its
//! effective docks. Planet-side projects (facilities, ground units, IU,
//! infrastructure) run through the colony's own slot and unbounded queue.
//! Spaceport berths are planet-side work and pay double.

use crate::core::entities::{
    ConstructionProject, ProjectKind, RepairProject, RepairTarget, REPAIR_PRIORITY_SHIP,
    REPAIR_PRIORITY_STARBASE,
};
use crate::core::events::GameEvent;
use crate::core::orders::{BuildCommand, ProjectKindSpec, RepairCommand, RepairTargetSpec};
use crate::core::types::*;
use crate::core::GameState;
use crate::systems::TurnContext;

/// Command step 7 entry point for one build command. Charges the treasury
/// up front; a command the house cannot pay for is dropped whole.
pub fn submit_build(
    state: &mut GameState,
    house: HouseId,
    cmd: &BuildCommand,
    ctx: &mut TurnContext<'_>,
) -> GameResult<()> {
    let colony = state.colonies.get(cmd.colony)?;
    if colony.house != house {
        return Err(GameError::NotOwner(format!("colony {}", cmd.colony)));
    }

    match cmd.project {
        ProjectKindSpec::Ship(class) => submit_ship(state, house, cmd, class, ctx),
        ProjectKindSpec::Facility(kind) => submit_planetside(
            state,
            house,
            cmd.colony,
            ProjectKind::Facility(kind),
            ctx,
        ),
        ProjectKindSpec::GroundUnit(kind) => submit_planetside(
            state,
            house,
            cmd.colony,
            ProjectKind::GroundUnit(kind),
            ctx,
        ),
        ProjectKindSpec::Industrial { units } => {
            if units <= 0 {
                return Err(GameError::InvalidCommand(
                    "industrial build needs a positive unit count".into(),
                ));
            }
            submit_planetside(state, house, cmd.colony, ProjectKind::Industrial { units }, ctx)
        }
        ProjectKindSpec::Infrastructure { units } => {
            if units <= 0 {
                return Err(GameError::InvalidCommand(
                    "infrastructure build needs a positive unit count".into(),
                ));
            }
            submit_planetside(
                state,
                house,
                cmd.colony,
                ProjectKind::Infrastructure { units },
                ctx,
            )
        }
    }
}

fn submit_ship(
    state: &mut GameState,
    house: HouseId,
    cmd: &BuildCommand,
    class: ShipClass,
    ctx: &mut TurnContext<'_>,
) -> GameResult<()> {
    let spec = *ctx.config.ship(class);
    let cst = state.houses.get(house)?.tech.construction;
    if cst < spec.min_cst {
        return Err(GameError::MissingPrerequisite(format!(
            "{:?} needs construction tech {}",
            class, spec.min_cst
        )));
    }

    let facility_id = match cmd.facility {
        Some(id) => {
            let facility = state.colonies.facility(id)?;
            if facility.colony != cmd.colony {
                return Err(GameError::InvalidCommand(format!(
                    "facility {} does not belong to colony {}",
                    id, cmd.colony
                )));
            }
            if !facility.kind.can_construct() {
                return Err(GameError::InvalidCommand(format!(
                    "{:?} cannot lay down hulls",
                    facility.kind
                )));
            }
            if facility.crippled {
                return Err(GameError::InvalidCommand(format!(
                    "facility {} is crippled",
                    id
                )));
            }
            if facility.construction_load() >= facility.construction_capacity() {
                return Err(GameError::DockCapacityExceeded(id));
            }
            id
        }
        None => pick_dock(state, cmd.colony)?,
    };

    let facility_kind = state.colonies.facility(facility_id)?.kind;
    let mult = if facility_kind == FacilityKind::Spaceport {
        ctx.config.construction.spaceport_cost_mult
    } else {
        1
    };
    let cost = spec.cost * mult;
    charge(state, house, cost, ctx)?;

    let project = ConstructionProject {
        kind: ProjectKind::Ship(class),
        cost,
        cost_paid: cost,
        turns_remaining: spec.build_turns,
    };
    let facility = state.colonies.facility_mut(facility_id)?;
    if facility.active_total() < facility.effective_docks as usize {
        facility.active_construction.push(project);
    } else {
        facility.construction_queue.push_back(project);
    }
    Ok(())
}

/// Lowest-id spaceport or shipyard with free capacity.
fn pick_dock(state: &GameState, colony: ColonyId) -> GameResult<FacilityId> {
    let c = state.colonies.get(colony)?;
    let mut candidates: Vec<FacilityId> = c
        .spaceports
        .iter()
        .chain(c.shipyards.iter())
        .copied()
        .collect();
    candidates.sort_unstable();
    for id in candidates {
        let Ok(facility) = state.colonies.facility(id) else {
            continue;
        };
        if facility.crippled {
            continue;
        }
        if facility.construction_load() < facility.construction_capacity() {
            return Ok(id);
        }
    }
    Err(GameError::MissingPrerequisite(format!(
        "no free dock at colony {}",
        colony
    )))
}

fn submit_planetside(
    state: &mut GameState,
    house: HouseId,
    colony_id: ColonyId,
    kind: ProjectKind,
    ctx: &mut TurnContext<'_>,
) -> GameResult<()> {
    let (cost, turns) = match &kind {
        ProjectKind::Facility(fk) => {
            check_facility_prereqs(state, colony_id, *fk)?;
            let spec = ctx.config.facility(*fk);
            (spec.cost, spec.build_turns)
        }
        ProjectKind::GroundUnit(gk) => {
            let spec = ctx.config.ground_unit(*gk);
            (spec.cost, spec.build_turns)
        }
        ProjectKind::Industrial { units } => (units * ctx.config.economy.iu_unit_cost, 1),
        ProjectKind::Infrastructure { units } => {
            (units * ctx.config.economy.infrastructure_unit_cost, 1)
        }
        ProjectKind::Ship(_) => {
            return Err(GameError::InvalidCommand(
                "ships build at docks, not planet-side".into(),
            ))
        }
    };
    charge(state, house, cost, ctx)?;

    let project = ConstructionProject {
        kind,
        cost,
        cost_paid: cost,
        turns_remaining: turns,
    };
    let colony = state.colonies.get_mut(colony_id)?;
    if colony.construction_slot.is_none() {
        colony.construction_slot = Some(project);
    } else {
        colony.construction_queue.push_back(project);
    }
    Ok(())
}

/// Shipyard requires a spaceport already on the ground; starbase requires
/// a shipyard.
fn check_facility_prereqs(
    state: &GameState,
    colony_id: ColonyId,
    kind: FacilityKind,
) -> GameResult<()> {
    let colony = state.colonies.get(colony_id)?;
    match kind {
        FacilityKind::Spaceport => Ok(()),
        FacilityKind::Shipyard | FacilityKind::Drydock => {
            if colony.spaceports.is_empty() {
                Err(GameError::MissingPrerequisite(format!(
                    "{:?} needs a spaceport",
                    kind
                )))
            } else {
                Ok(())
            }
        }
        FacilityKind::Starbase => {
            if colony.shipyards.is_empty() {
                Err(GameError::MissingPrerequisite(
                    "a starbase needs a shipyard".into(),
                ))
            } else {
                Ok(())
            }
        }
    }
}

fn charge(
    state: &mut GameState,
    house: HouseId,
    cost: i64,
    ctx: &mut TurnContext<'_>,
) -> GameResult<()> {
    state.houses.debit(house, cost)?;
    if let Ok(h) = state.houses.get_mut(house) {
        h.telemetry.build_spent += cost;
    }
    ctx.push(GameEvent::BuildCharged {
        house,
        amount: cost,
    });
    Ok(())
}

/// Command step 7: manual repair submission. Repairs queue at a shipyard
/// (ships and starbases both; spaceports cannot repair) and cost a quarter
/// of the build price.
pub fn submit_repair(
    state: &mut GameState,
    house: HouseId,
    cmd: &RepairCommand,
    ctx: &mut TurnContext<'_>,
) -> GameResult<()> {
    let colony = state.colonies.get(cmd.colony)?;
    if colony.house != house {
        return Err(GameError::NotOwner(format!("colony {}", cmd.colony)));
    }
    let colony_system = colony.system;
    let shipyard_id = *colony
        .shipyards
        .first()
        .ok_or_else(|| GameError::MissingPrerequisite("repairs need a shipyard".into()))?;

    let (target, cost_basis) = match cmd.target {
        RepairTargetSpec::Ship { fleet, ship } => {
            let f = state.fleets.get(fleet)?;
            if f.house != house {
                return Err(GameError::NotOwner(format!("fleet {}", fleet)));
            }
            if f.system != colony_system {
                return Err(GameError::InvalidCommand(format!(
                    "fleet {} is not at colony {}",
                    fleet, cmd.colony
                )));
            }
            let s = f.find_ship(ship).ok_or(GameError::ShipNotFound(ship))?;
            if !s.crippled {
                return Err(GameError::InvalidCommand(format!(
                    "ship {} is not crippled",
                    ship
                )));
            }
            (RepairTarget::Ship { fleet, ship }, s.cost_paid)
        }
        RepairTargetSpec::Starbase { facility } => {
            let f = state.colonies.facility(facility)?;
            if f.colony != cmd.colony || f.kind != FacilityKind::Starbase {
                return Err(GameError::InvalidCommand(format!(
                    "facility {} is not a starbase of colony {}",
                    facility, cmd.colony
                )));
            }
            if !f.crippled {
                return Err(GameError::InvalidCommand(format!(
                    "starbase {} is not crippled",
                    facility
                )));
            }
            (
                RepairTarget::Starbase {
                    colony: cmd.colony,
                    facility,
                },
                f.cost_paid,
            )
        }
    };

    let cost = (cost_basis as f64 * ctx.config.construction.repair_cost_rate).ceil() as i64;
    charge(state, house, cost, ctx)?;
    enqueue_repair(state, shipyard_id, target, cost, ctx.config.construction.repair_turns)?;
    Ok(())
}

/// Appends a repair to a shipyard's queue. All overflow is absorbed FIFO;
/// the dock scheduler drains by priority as berths free up.
pub fn enqueue_repair(
    state: &mut GameState,
    shipyard: FacilityId,
    target: RepairTarget,
    cost: i64,
    turns: u8,
) -> GameResult<()> {
    let priority = match target {
        RepairTarget::Ship { .. } => REPAIR_PRIORITY_SHIP,
        RepairTarget::Starbase { .. } => REPAIR_PRIORITY_STARBASE,
    };
    let facility = state.colonies.facility_mut(shipyard)?;
    if !facility.kind.can_repair() {
        return Err(GameError::InvalidCommand(format!(
            "{:?} cannot repair",
            facility.kind
        )));
    }
    facility.repair_queue.push_back(RepairProject {
        target,
        cost,
        turns_remaining: turns,
        priority,
    });
    Ok(())
}

/// Refill free berths from the queues: construction first (priority 0),
/// then ship repairs, then starbase repairs, FIFO within each band.
pub fn refill_work_slots(state: &mut GameState, facility_id: FacilityId) {
    let Ok(facility) = state.colonies.facility_mut(facility_id) else {
        return;
    };
    if facility.crippled {
        return;
    }
    while facility.active_total() < facility.effective_docks as usize {
        if let Some(project) = facility.construction_queue.pop_front() {
            facility.active_construction.push(project);
            continue;
        }
        // Lowest priority value wins; stable within a band.
        let next = facility
            .repair_queue
            .iter()
            .enumerate()
            .min_by_key(|(i, r)| (r.priority, *i))
            .map(|(i, _)| i);
        match next.and_then(|i| facility.repair_queue.remove(i)) {
            Some(repair) => facility.active_repairs.push(repair),
            None => break,
        }
    }
}
