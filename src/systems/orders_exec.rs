// src/systems/orders_exec.rs
//! Fleet order lifecycle: validation at submission (Command step 5),
//! activation and movement (Maintenance step 3), and the execution rules
//! for the orders that resolve outside the Conflict phase (joins,
//! rendezvous, salvage, status changes). Combat-flavored orders execute in
//! the Conflict phase; this module only walks their fleets toward the
//! target.

use crate::core::events::{GameEvent, OrderKind};
use crate::core::orders::{FleetOrder, FleetOrderCommand};
use crate::core::types::*;
use crate::core::GameState;
use crate::systems::TurnContext;

/// Precondition checks for a submitted fleet order. Returns the storable
/// order; any failure drops just this command.
pub fn validate_order(
    state: &GameState,
    house: HouseId,
    cmd: &FleetOrderCommand,
    turn: u32,
) -> GameResult<FleetOrder> {
    let fleet = state.fleets.get(cmd.fleet)?;
    if fleet.house != house {
        return Err(GameError::NotOwner(format!("fleet {}", cmd.fleet)));
    }
    if let Some(roe) = cmd.roe {
        if roe > 10 {
            return Err(GameError::InvalidCommand(format!(
                "rules of engagement {} out of range",
                roe
            )));
        }
    }

    let order = FleetOrder {
        fleet: cmd.fleet,
        house,
        kind: cmd.kind,
        target_system: cmd.target_system,
        target_fleet: cmd.target_fleet,
        priority: cmd.priority,
        roe: cmd.roe,
        active: false,
        issued_turn: turn,
    };

    if order.requires_motion() && fleet.status != FleetStatus::Active {
        return Err(GameError::FleetNotMobile(cmd.fleet));
    }

    match cmd.kind {
        OrderKind::Hold | OrderKind::SeekHome | OrderKind::Salvage => {}
        OrderKind::Move | OrderKind::Rendezvous => {
            let target = cmd
                .target_system
                .ok_or_else(|| GameError::InvalidCommand("order needs a target system".into()))?;
            if !state.starmap.contains(target) {
                return Err(GameError::SystemNotFound(target));
            }
        }
        OrderKind::Patrol | OrderKind::GuardStarbase | OrderKind::GuardPlanet => {
            if !fleet.has_combat_ships() {
                return Err(GameError::MissingPrerequisite(
                    "guard and patrol duty needs combat ships".into(),
                ));
            }
        }
        OrderKind::Blockade => {
            if !fleet.has_combat_ships() {
                return Err(GameError::MissingPrerequisite(
                    "a blockade needs combat ships".into(),
                ));
            }
            let target = cmd
                .target_system
                .ok_or_else(|| GameError::InvalidCommand("blockade needs a target system".into()))?;
            let colony_id = state
                .colonies
                .colony_in_system(target)
                .ok_or(GameError::NoColonyInSystem(target))?;
            let colony = state.colonies.get(colony_id)?;
            if !state.houses.are_belligerent(house, colony.house) {
                return Err(GameError::InvalidCommand(
                    "blockade target is not a hostile colony".into(),
                ));
            }
        }
        OrderKind::Bombard | OrderKind::Invade | OrderKind::Blitz => {
            if !fleet.has_combat_ships() {
                return Err(GameError::MissingPrerequisite(
                    "planetary assault needs combat ships".into(),
                ));
            }
            let target = cmd
                .target_system
                .ok_or_else(|| GameError::InvalidCommand("assault needs a target system".into()))?;
            let colony_id = state
                .colonies
                .colony_in_system(target)
                .ok_or(GameError::NoColonyInSystem(target))?;
            let colony = state.colonies.get(colony_id)?;
            if !state.houses.are_belligerent(house, colony.house) {
                return Err(GameError::InvalidCommand(
                    "assault target is not hostile".into(),
                ));
            }
            if matches!(cmd.kind, OrderKind::Invade | OrderKind::Blitz)
                && fleet.loaded_marines() == 0
            {
                return Err(GameError::MissingPrerequisite(
                    "invasion needs loaded troop transports".into(),
                ));
            }
        }
        OrderKind::SpyPlanet | OrderKind::HackStarbase | OrderKind::SpySystem => {
            if fleet.scout_count() != 1 {
                return Err(GameError::MissingPrerequisite(
                    "spy missions need exactly one scout in the fleet".into(),
                ));
            }
            let target = cmd
                .target_system
                .ok_or_else(|| GameError::InvalidCommand("spy mission needs a target".into()))?;
            if !state.starmap.contains(target) {
                return Err(GameError::SystemNotFound(target));
            }
        }
        OrderKind::Colonize => {
            let target = cmd
                .target_system
                .ok_or_else(|| GameError::InvalidCommand("colonize needs a target system".into()))?;
            let system = state.starmap.system(target)?;
            if system.planet.is_none() {
                return Err(GameError::InvalidCommand(format!(
                    "system {} has no planet",
                    target
                )));
            }
            if state.colonies.colony_in_system(target).is_some() {
                return Err(GameError::InvalidCommand(format!(
                    "system {} is already colonized",
                    target
                )));
            }
            if fleet.loaded_colonists() == 0 {
                return Err(GameError::MissingPrerequisite(
                    "colonization needs an ETAC with loaded colonists".into(),
                ));
            }
        }
        OrderKind::JoinFleet => {
            let target = cmd
                .target_fleet
                .ok_or_else(|| GameError::InvalidCommand("join needs a target fleet".into()))?;
            let target_fleet = state.fleets.get(target)?;
            if target_fleet.house != house {
                return Err(GameError::NotOwner(format!("fleet {}", target)));
            }
            if target == cmd.fleet {
                return Err(GameError::InvalidCommand(
                    "fleet cannot join itself".into(),
                ));
            }
        }
        OrderKind::Reserve | OrderKind::Reactivate => {
            // Location is checked again at execution; the fleet may still
            // be moving home when the order is stored.
        }
        OrderKind::Mothball => {}
    }
    Ok(order)
}

/// Maintenance step 3: activate stored orders, advance movement one jump,
/// and execute the orders that resolve in this phase.
pub fn activate_and_execute(state: &mut GameState, ctx: &mut TurnContext<'_>) {
    let order_fleets: Vec<FleetId> = state.fleet_orders.keys().copied().collect();

    for fleet_id in order_fleets {
        // Rendezvous merges may have consumed this fleet already.
        let Some(order) = state.fleet_orders.get(&fleet_id).cloned() else {
            continue;
        };
        if !state.fleets.contains(fleet_id) {
            state.fleet_orders.remove(&fleet_id);
            continue;
        }
        if let Some(stored) = state.fleet_orders.get_mut(&fleet_id) {
            stored.active = true;
        }

        match order.kind {
            OrderKind::Hold
            | OrderKind::Patrol
            | OrderKind::GuardStarbase
            | OrderKind::GuardPlanet => {
                // Standing orders; guards and patrols act in Conflict.
            }
            OrderKind::Move => {
                let target = order.target_system.unwrap_or_else(|| {
                    state.fleets.get(fleet_id).map(|f| f.system).unwrap_or(0)
                });
                if advance_one_jump(state, fleet_id, target, ctx) == Arrival::AtTarget {
                    complete(ctx, fleet_id, OrderKind::Move);
                }
            }
            OrderKind::SeekHome => {
                // Re-evaluated every turn: if the chosen colony fell, the
                // next closest takes over.
                let from = match state.fleets.get(fleet_id) {
                    Ok(f) => f.system,
                    Err(_) => continue,
                };
                match state.closest_friendly_colony(order.house, from, false) {
                    Some(colony_id) => {
                        let target = state
                            .colonies
                            .get(colony_id)
                            .map(|c| c.system)
                            .unwrap_or(from);
                        if advance_one_jump(state, fleet_id, target, ctx) == Arrival::AtTarget {
                            complete(ctx, fleet_id, OrderKind::SeekHome);
                        }
                    }
                    None => {
                        abort(ctx, fleet_id, OrderKind::SeekHome, "no friendly colony");
                    }
                }
            }
            OrderKind::Blockade
            | OrderKind::Bombard
            | OrderKind::Invade
            | OrderKind::Blitz
            | OrderKind::Colonize
            | OrderKind::SpyPlanet
            | OrderKind::HackStarbase
            | OrderKind::SpySystem => {
                // Walk toward the target; the Conflict phase executes.
                if let Some(target) = order.target_system {
                    advance_one_jump(state, fleet_id, target, ctx);
                }
            }
            OrderKind::JoinFleet => {
                execute_join(state, ctx, &order);
            }
            OrderKind::Rendezvous => {
                if let Some(target) = order.target_system {
                    if advance_one_jump(state, fleet_id, target, ctx) == Arrival::AtTarget {
                        execute_rendezvous(state, ctx, order.house, target);
                    }
                }
            }
            OrderKind::Salvage => {
                execute_salvage(state, ctx, &order);
            }
            OrderKind::Reserve => {
                execute_status_change(state, ctx, &order, FleetStatus::Reserve);
            }
            OrderKind::Mothball => {
                execute_status_change(state, ctx, &order, FleetStatus::Mothballed);
            }
            OrderKind::Reactivate => {
                execute_status_change(state, ctx, &order, FleetStatus::Active);
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Arrival {
    AtTarget,
    EnRoute,
    Stuck,
}

/// One jump per turn along the shortest lane path.
fn advance_one_jump(
    state: &mut GameState,
    fleet_id: FleetId,
    target: SystemId,
    ctx: &mut TurnContext<'_>,
) -> Arrival {
    let Ok(fleet) = state.fleets.get(fleet_id) else {
        return Arrival::Stuck;
    };
    if fleet.system == target {
        return Arrival::AtTarget;
    }
    if fleet.status != FleetStatus::Active {
        return Arrival::Stuck;
    }
    match state.starmap.next_hop(fleet.system, target) {
        Some(next) => {
            if let Ok(fleet) = state.fleets.get_mut(fleet_id) {
                fleet.system = next;
                if next == target {
                    return Arrival::AtTarget;
                }
            }
            Arrival::EnRoute
        }
        None => {
            ctx.warn(format!(
                "fleet {} has no jump path to system {}",
                fleet_id, target
            ));
            Arrival::Stuck
        }
    }
}

fn complete(ctx: &mut TurnContext<'_>, fleet: FleetId, order: OrderKind) {
    ctx.push(GameEvent::OrderCompleted { fleet, order });
}

fn fail(ctx: &mut TurnContext<'_>, fleet: FleetId, order: OrderKind, reason: &str) {
    ctx.push(GameEvent::OrderFailed {
        fleet,
        order,
        reason: reason.to_string(),
    });
}

fn abort(ctx: &mut TurnContext<'_>, fleet: FleetId, order: OrderKind, reason: &str) {
    ctx.push(GameEvent::OrderAborted {
        fleet,
        order,
        reason: reason.to_string(),
    });
}

/// JoinFleet: chase the target fleet, merge when co-located. The source
/// fleet and its pending order disappear in the same transaction.
fn execute_join(state: &mut GameState, ctx: &mut TurnContext<'_>, order: &FleetOrder) {
    let Some(target_id) = order.target_fleet else {
        abort(ctx, order.fleet, OrderKind::JoinFleet, "no target fleet");
        return;
    };
    let Ok(target) = state.fleets.get(target_id) else {
        abort(ctx, order.fleet, OrderKind::JoinFleet, "target fleet is gone");
        return;
    };
    let target_system = target.system;
    if advance_one_jump(state, order.fleet, target_system, ctx) != Arrival::AtTarget {
        return;
    }
    match state.fleets.merge(order.fleet, target_id) {
        Ok(()) => {
            ctx.push(GameEvent::FleetMerged {
                into: target_id,
                from: order.fleet,
            });
            complete(ctx, order.fleet, OrderKind::JoinFleet);
            state.fleet_orders.remove(&order.fleet);
        }
        Err(e) => {
            fail(ctx, order.fleet, OrderKind::JoinFleet, &e.to_string());
        }
    }
}

/// Rendezvous: once two or more same-house fleets with this order stand at
/// the target, they merge into the lowest-id host.
fn execute_rendezvous(
    state: &mut GameState,
    ctx: &mut TurnContext<'_>,
    house: HouseId,
    target: SystemId,
) {
    let mut gathered: Vec<FleetId> = state
        .fleet_orders
        .values()
        .filter(|o| {
            o.house == house && o.kind == OrderKind::Rendezvous && o.target_system == Some(target)
        })
        .map(|o| o.fleet)
        .filter(|&id| {
            state
                .fleets
                .get(id)
                .map(|f| f.system == target)
                .unwrap_or(false)
        })
        .collect();
    gathered.sort_unstable();
    if gathered.len() < 2 {
        return;
    }
    let host = gathered[0];
    for &source in &gathered[1..] {
        match state.fleets.merge(source, host) {
            Ok(()) => {
                ctx.push(GameEvent::FleetMerged {
                    into: host,
                    from: source,
                });
                complete(ctx, source, OrderKind::Rendezvous);
                state.fleet_orders.remove(&source);
            }
            Err(e) => {
                fail(ctx, source, OrderKind::Rendezvous, &e.to_string());
            }
        }
    }
    complete(ctx, host, OrderKind::Rendezvous);
}

/// Salvage: run for the closest friendly dock, then break the fleet up for
/// half its paid price.
fn execute_salvage(state: &mut GameState, ctx: &mut TurnContext<'_>, order: &FleetOrder) {
    let from = match state.fleets.get(order.fleet) {
        Ok(f) => f.system,
        Err(_) => return,
    };
    let Some(colony_id) = state.closest_friendly_colony(order.house, from, true) else {
        abort(ctx, order.fleet, OrderKind::Salvage, "no friendly colony with a dock");
        return;
    };
    let target = match state.colonies.get(colony_id) {
        Ok(c) => c.system,
        Err(_) => return,
    };
    if advance_one_jump(state, order.fleet, target, ctx) != Arrival::AtTarget {
        return;
    }
    let Ok(fleet) = state.fleets.get(order.fleet) else {
        return;
    };
    let rate = ctx.config.shortfall.salvage_rate;
    let credit: i64 = fleet
        .ships()
        .map(|s| (s.cost_paid as f64 * rate).floor() as i64)
        .sum();
    let house = fleet.house;
    if state.houses.credit(house, credit).is_ok() {
        if let Ok(h) = state.houses.get_mut(house) {
            h.telemetry.salvage_credited += credit;
        }
        ctx.push(GameEvent::SalvageCredited {
            house,
            amount: credit,
        });
    }
    complete(ctx, order.fleet, OrderKind::Salvage);
    state.destroy_fleet(order.fleet, "salvaged", &mut ctx.events);
}

/// Reserve / Mothball / Reactivate: status tier changes at a friendly
/// colony (mothballing additionally needs a spaceport).
fn execute_status_change(
    state: &mut GameState,
    ctx: &mut TurnContext<'_>,
    order: &FleetOrder,
    status: FleetStatus,
) {
    let Ok(fleet) = state.fleets.get(order.fleet) else {
        return;
    };
    let Some(colony_id) = state.colonies.colony_in_system(fleet.system) else {
        fail(ctx, order.fleet, order.kind, "not at a friendly colony");
        return;
    };
    let Ok(colony) = state.colonies.get(colony_id) else {
        return;
    };
    if colony.house != order.house {
        fail(ctx, order.fleet, order.kind, "not at a friendly colony");
        return;
    }
    if status == FleetStatus::Mothballed && colony.spaceports.is_empty() {
        fail(ctx, order.fleet, order.kind, "mothballing needs a spaceport");
        return;
    }
    if let Ok(fleet) = state.fleets.get_mut(order.fleet) {
        fleet.status = status;
    }
    complete(ctx, order.fleet, order.kind);
}
