// src/systems/maintenance.rs
//! Maintenance phase: advance construction and repair queues, activate
//! fleet orders, collect upkeep (with the shortfall cascade when the
//! treasury cannot cover it), and enforce the capacity rules.

use crate::core::entities::{ProjectKind, RepairTarget, Ship};
use crate::core::events::{GameEvent, ShortfallStep};
use crate::core::types::*;
use crate::core::GameState;
use crate::systems::{commissioning, construction, orders_exec, TurnContext};

pub fn run(state: &mut GameState, ctx: &mut TurnContext<'_>) {
    advance_construction(state, ctx);
    advance_repairs(state, ctx);
    orders_exec::activate_and_execute(state, ctx);
    collect_upkeep(state, ctx);
    enforce_capacity(state, ctx);
}

/// Step 1: construction advancement. Ship hulls finish at their dock and
/// either commission on the spot (fighters, planetary defense) or wait in
/// `pending_military_commissions` for next turn's Command. Planet-side
/// projects and terraforming tick in the colony slot. Crippled facilities
/// stall completely but keep their queues.
fn advance_construction(state: &mut GameState, ctx: &mut TurnContext<'_>) {
    for colony_id in state.colonies.ids() {
        advance_colony_slot(state, colony_id, ctx);
        advance_terraform(state, colony_id, ctx);

        let facility_ids: Vec<FacilityId> = match state.colonies.get(colony_id) {
            Ok(c) => c.facility_ids().collect(),
            Err(_) => continue,
        };
        for facility_id in facility_ids {
            advance_facility_construction(state, colony_id, facility_id, ctx);
        }
    }
}

fn advance_colony_slot(state: &mut GameState, colony_id: ColonyId, ctx: &mut TurnContext<'_>) {
    let completed = {
        let Ok(colony) = state.colonies.get_mut(colony_id) else {
            return;
        };
        if let Some(project) = colony.construction_slot.as_mut() {
            project.turns_remaining = project.turns_remaining.saturating_sub(1);
        }
        let finished = colony
            .construction_slot
            .as_ref()
            .map_or(false, |p| p.turns_remaining == 0);
        let done = if finished {
            colony.construction_slot.take()
        } else {
            None
        };
        if colony.construction_slot.is_none() {
            colony.construction_slot = colony.construction_queue.pop_front();
        }
        done
    };
    if let Some(project) = completed {
        commissioning::commission_planetside(state, colony_id, project.kind, project.cost_paid, ctx);
    }
}

fn advance_terraform(state: &mut GameState, colony_id: ColonyId, ctx: &mut TurnContext<'_>) {
    let finished = {
        let Ok(colony) = state.colonies.get_mut(colony_id) else {
            return;
        };
        if let Some(project) = colony.terraforming.as_mut() {
            project.turns_remaining = project.turns_remaining.saturating_sub(1);
        }
        let done = colony
            .terraforming
            .as_ref()
            .map_or(false, |p| p.turns_remaining == 0);
        if done {
            colony.terraforming = None;
        }
        done
    };
    if finished {
        let Ok(colony) = state.colonies.get_mut(colony_id) else {
            return;
        };
        if let Some(next) = colony.planet_class.improved() {
            colony.planet_class = next;
            ctx.push(GameEvent::TerraformCompleted {
                colony: colony_id,
                class: next,
            });
        }
    }
}

fn advance_facility_construction(
    state: &mut GameState,
    colony_id: ColonyId,
    facility_id: FacilityId,
    ctx: &mut TurnContext<'_>,
) {
    let (house, completed) = {
        let Ok(colony) = state.colonies.get(colony_id) else {
            return;
        };
        let house = colony.house;
        let Ok(facility) = state.colonies.facility_mut(facility_id) else {
            return;
        };
        if facility.crippled {
            return;
        }
        for project in facility.active_construction.iter_mut() {
            project.turns_remaining = project.turns_remaining.saturating_sub(1);
        }
        let mut done = Vec::new();
        facility.active_construction.retain(|p| {
            if p.turns_remaining == 0 {
                done.push(p.clone());
                false
            } else {
                true
            }
        });
        (house, done)
    };

    for project in completed {
        match project.kind {
            ProjectKind::Ship(ShipClass::Fighter) => {
                // Planetary defense: operational this very turn.
                let ship_id = state.ids.ship();
                if let Ok(colony) = state.colonies.get_mut(colony_id) {
                    colony
                        .fighters
                        .push(Ship::new(ship_id, ShipClass::Fighter, project.cost_paid));
                }
                ctx.push(GameEvent::ShipCommissioned {
                    house,
                    colony: colony_id,
                    ship: ship_id,
                    class: ShipClass::Fighter,
                    fleet: None,
                });
            }
            ProjectKind::Ship(class) => {
                state
                    .pending_military_commissions
                    .push(crate::core::entities::PendingCommission {
                        house,
                        colony: colony_id,
                        facility: facility_id,
                        class,
                        cost_paid: project.cost_paid,
                    });
            }
            other => {
                // Facilities and ground work normally run planet-side, but
                // a queued dock project commissions all the same.
                commissioning::commission_planetside(
                    state,
                    colony_id,
                    other,
                    project.cost_paid,
                    ctx,
                );
            }
        }
    }
    construction::refill_work_slots(state, facility_id);
}

/// Step 2: repair advancement. Completion clears the crippled flag on the
/// target, wherever it is now; a vanished target just retires the job.
fn advance_repairs(state: &mut GameState, ctx: &mut TurnContext<'_>) {
    for facility_id in state.colonies.facility_ids() {
        let completed = {
            let Ok(facility) = state.colonies.facility_mut(facility_id) else {
                continue;
            };
            if facility.crippled {
                continue;
            }
            for repair in facility.active_repairs.iter_mut() {
                repair.turns_remaining = repair.turns_remaining.saturating_sub(1);
            }
            let mut done = Vec::new();
            facility.active_repairs.retain(|r| {
                if r.turns_remaining == 0 {
                    done.push(r.clone());
                    false
                } else {
                    true
                }
            });
            done
        };
        for repair in completed {
            match repair.target {
                RepairTarget::Ship { fleet, ship } => {
                    let repaired = state
                        .fleets
                        .get_mut(fleet)
                        .ok()
                        .and_then(|f| f.find_ship_mut(ship))
                        .map(|s| {
                            s.crippled = false;
                        })
                        .is_some();
                    if !repaired {
                        ctx.warn(format!(
                            "repair finished for ship {} but it is gone",
                            ship
                        ));
                    }
                }
                RepairTarget::Starbase { facility, .. } => {
                    if let Ok(f) = state.colonies.facility_mut(facility) {
                        f.crippled = false;
                    }
                }
            }
        }
        construction::refill_work_slots(state, facility_id);
    }
}

/// Step 4: upkeep and the shortfall cascade. Every house pays for ships
/// (crippled 1.5x, Reserve half, Mothballed free), facilities and ground
/// units. A house that cannot pay salvages its way down the cascade and
/// takes an escalating prestige hit; enough consecutive shortfalls end it.
fn collect_upkeep(state: &mut GameState, ctx: &mut TurnContext<'_>) {
    let crippled_mult = ctx.config.shortfall.crippled_upkeep_mult;
    for house_id in state.houses.ids() {
        let Ok(house) = state.houses.get(house_id) else {
            continue;
        };
        if house.is_eliminated() {
            continue;
        }

        let mut upkeep = 0i64;
        for fleet in state.fleets.iter().filter(|f| f.house == house_id) {
            let factor = fleet.status.upkeep_factor();
            for ship in fleet.ships() {
                let base = ctx.config.ship(ship.class).upkeep as f64 * factor;
                let cost = if ship.crippled {
                    base * crippled_mult
                } else {
                    base
                };
                upkeep += cost.round() as i64;
            }
        }
        for colony_id in state.colonies.ids_of_house(house_id) {
            let Ok(colony) = state.colonies.get(colony_id) else {
                continue;
            };
            for facility_id in colony.facility_ids() {
                if let Ok(facility) = state.colonies.facility(facility_id) {
                    upkeep += ctx.config.facility(facility.kind).upkeep;
                }
            }
            for unit in &colony.ground_units {
                upkeep += ctx.config.ground_unit(unit.kind).upkeep;
            }
        }

        let treasury = state.houses.get(house_id).map(|h| h.treasury).unwrap_or(0);
        if treasury >= upkeep {
            let _ = state.houses.debit(house_id, upkeep);
            if let Ok(h) = state.houses.get_mut(house_id) {
                h.telemetry.upkeep_paid = upkeep;
                h.consecutive_shortfall_turns = 0;
            }
            ctx.push(GameEvent::UpkeepPaid {
                house: house_id,
                amount: upkeep,
            });
        } else {
            shortfall_cascade(state, ctx, house_id, upkeep);
        }
    }
}

/// The deterministic sequence for an underfunded house: mothballed ships
/// first, then reserve, then active, then infrastructure, then the bill
/// comes due anyway.
fn shortfall_cascade(
    state: &mut GameState,
    ctx: &mut TurnContext<'_>,
    house_id: HouseId,
    upkeep: i64,
) {
    log::info!("house {} cannot cover upkeep {}", house_id, upkeep);

    // Phases (a) and (b): salvage by status tier, lowest value first.
    for (status, step) in [
        (FleetStatus::Mothballed, ShortfallStep::SalvageMothballed),
        (FleetStatus::Reserve, ShortfallStep::SalvageReserve),
        (FleetStatus::Active, ShortfallStep::SalvageActive),
    ] {
        if state.houses.get(house_id).map(|h| h.treasury).unwrap_or(0) >= upkeep {
            break;
        }
        salvage_tier(state, ctx, house_id, upkeep, status, step);
    }

    // Phase (c): strip infrastructure.
    let mut treasury = state.houses.get(house_id).map(|h| h.treasury).unwrap_or(0);
    if treasury < upkeep {
        let pp_per_unit = ctx.config.economy.infra_strip_pp_per_unit;
        let damage_per_unit = ctx.config.economy.infra_strip_damage_per_unit;
        for colony_id in state.colonies.ids_of_house(house_id) {
            treasury = state.houses.get(house_id).map(|h| h.treasury).unwrap_or(0);
            if treasury >= upkeep {
                break;
            }
            let deficit = upkeep - treasury;
            let units_needed = (deficit + pp_per_unit - 1) / pp_per_unit;
            let Ok(colony) = state.colonies.get_mut(colony_id) else {
                continue;
            };
            let strippable =
                ((1.0 - colony.infrastructure_damage) / damage_per_unit).floor() as i64;
            let units = units_needed.min(strippable.max(0));
            if units <= 0 {
                continue;
            }
            colony.infrastructure_damage =
                (colony.infrastructure_damage + units as f64 * damage_per_unit).min(1.0);
            let recovered = units * pp_per_unit;
            let _ = state.houses.credit(house_id, recovered);
            ctx.push(GameEvent::MaintenanceShortfall {
                house: house_id,
                step: ShortfallStep::StripInfrastructure,
                amount: recovered,
            });
        }
    }

    // Phase (d): the bill comes due. Pay in full if the cascade covered
    // it; otherwise pay everything and zero out.
    let treasury = state.houses.get(house_id).map(|h| h.treasury).unwrap_or(0);
    let paid = treasury.min(upkeep);
    if let Ok(h) = state.houses.get_mut(house_id) {
        h.treasury = (treasury - upkeep).max(0);
        h.telemetry.upkeep_paid = paid;
        h.consecutive_shortfall_turns += 1;
    }
    ctx.push(GameEvent::UpkeepPaid {
        house: house_id,
        amount: paid,
    });
    if paid < upkeep {
        ctx.push(GameEvent::MaintenanceShortfall {
            house: house_id,
            step: ShortfallStep::TreasuryZeroed,
            amount: upkeep - paid,
        });
    }

    let (n, base, increment) = {
        let n = state
            .houses
            .get(house_id)
            .map(|h| h.consecutive_shortfall_turns)
            .unwrap_or(1);
        (
            n,
            ctx.config.prestige.shortfall_base_penalty,
            ctx.config.prestige.shortfall_penalty_increment,
        )
    };
    let penalty = base + increment * i32::from(n.saturating_sub(1));
    if let Ok(h) = state.houses.get_mut(house_id) {
        h.prestige -= penalty;
    }
    ctx.push(GameEvent::PrestigeAdjusted {
        house: house_id,
        delta: -penalty,
        reason: "maintenance shortfall".into(),
    });

    if n >= ctx.config.shortfall.elimination_threshold {
        eliminate_house(state, ctx, house_id);
    }
}

/// Salvage one status tier, cheapest hull first, until upkeep is covered.
/// Fleets emptied on the way are deleted with their orders.
fn salvage_tier(
    state: &mut GameState,
    ctx: &mut TurnContext<'_>,
    house_id: HouseId,
    upkeep: i64,
    status: FleetStatus,
    step: ShortfallStep,
) {
    let rate = ctx.config.shortfall.salvage_rate;
    let mut candidates: Vec<(i64, FleetId, ShipId)> = state
        .fleets
        .iter()
        .filter(|f| f.house == house_id && f.status == status)
        .flat_map(|f| f.ships().map(move |s| (s.cost_paid, f.id, s.id)))
        .collect();
    candidates.sort_unstable();

    for (cost_paid, fleet_id, ship_id) in candidates {
        let treasury = state.houses.get(house_id).map(|h| h.treasury).unwrap_or(0);
        if treasury >= upkeep {
            return;
        }
        if state.fleets.remove_ship(fleet_id, ship_id).is_err() {
            continue;
        }
        let credit = (cost_paid as f64 * rate).floor() as i64;
        let _ = state.houses.credit(house_id, credit);
        if let Ok(h) = state.houses.get_mut(house_id) {
            h.telemetry.salvage_credited += credit;
        }
        ctx.push(GameEvent::MaintenanceShortfall {
            house: house_id,
            step,
            amount: credit,
        });
        ctx.push(GameEvent::SalvageCredited {
            house: house_id,
            amount: credit,
        });
        if state
            .fleets
            .get(fleet_id)
            .map(|f| f.is_empty())
            .unwrap_or(false)
        {
            state.destroy_fleet(fleet_id, "salvaged for upkeep", &mut ctx.events);
        }
    }
}

/// One-step elimination: the house folds, remaining ships are broken up
/// for a final salvage accounting, colonies stay on the books for audit.
fn eliminate_house(state: &mut GameState, ctx: &mut TurnContext<'_>, house_id: HouseId) {
    let rate = ctx.config.shortfall.salvage_rate;
    let fleet_ids = state.fleets.ids_of_house(house_id);
    let mut credit = 0i64;
    for fleet_id in fleet_ids {
        if let Ok(fleet) = state.fleets.get(fleet_id) {
            credit += fleet
                .ships()
                .map(|s| (s.cost_paid as f64 * rate).floor() as i64)
                .sum::<i64>();
        }
        state.destroy_fleet(fleet_id, "house collapsed", &mut ctx.events);
    }
    if credit > 0 {
        let _ = state.houses.credit(house_id, credit);
        ctx.push(GameEvent::SalvageCredited {
            house: house_id,
            amount: credit,
        });
    }
    if let Ok(h) = state.houses.get_mut(house_id) {
        h.status = HouseStatus::DefensiveCollapse;
    }
    log::info!("house {} eliminated (shortfall collapse)", house_id);
    ctx.push(GameEvent::HouseEliminated { house: house_id });
}

/// Step 5: capacity enforcement with two-turn grace periods. One excess
/// squadron (or fighter) is disbanded per turn once grace runs out, never
/// all at once. Planet breakers over the colony cap go immediately and
/// without salvage.
fn enforce_capacity(state: &mut GameState, ctx: &mut TurnContext<'_>) {
    enforce_squadron_cap(state, ctx);
    enforce_fighter_cap(state, ctx);
    enforce_planet_breaker_cap(state, ctx);
}

fn enforce_squadron_cap(state: &mut GameState, ctx: &mut TurnContext<'_>) {
    let cap_cfg = ctx.config.capacity.clone();
    for house_id in state.houses.ids() {
        let Ok(house) = state.houses.get(house_id) else {
            continue;
        };
        if house.is_eliminated() {
            continue;
        }
        let iu_total: i64 = state
            .colonies
            .ids_of_house(house_id)
            .into_iter()
            .filter_map(|id| state.colonies.get(id).ok())
            .map(|c| c.iu)
            .sum();
        let cap = cap_cfg
            .squadron_cap_base
            .max((iu_total / cap_cfg.squadron_iu_divisor) as usize * cap_cfg.squadron_cap_mult);
        let count = state.fleets.squadron_count_for_cap(house_id);

        if count <= cap {
            if let Ok(h) = state.houses.get_mut(house_id) {
                h.squadron_cap_grace_until = None;
            }
            continue;
        }
        let grace_until = state
            .houses
            .get(house_id)
            .ok()
            .and_then(|h| h.squadron_cap_grace_until);
        match grace_until {
            None => {
                if let Ok(h) = state.houses.get_mut(house_id) {
                    h.squadron_cap_grace_until = Some(ctx.turn + cap_cfg.grace_turns);
                }
                ctx.warn(format!(
                    "house {} over squadron cap ({} > {}); grace begins",
                    house_id, count, cap
                ));
            }
            Some(expiry) if ctx.turn >= expiry => {
                disband_oldest_squadron(state, ctx, house_id);
            }
            Some(_) => {}
        }
    }
}

/// The oldest (lowest-id) non-scout squadron goes, ships and all, no
/// salvage.
fn disband_oldest_squadron(state: &mut GameState, ctx: &mut TurnContext<'_>, house_id: HouseId) {
    let mut oldest: Option<(SquadronId, FleetId)> = None;
    for fleet in state.fleets.iter().filter(|f| f.house == house_id) {
        for squadron in &fleet.squadrons {
            if squadron.kind == SquadronType::Intel {
                continue;
            }
            if oldest.map_or(true, |(sid, _)| squadron.id < sid) {
                oldest = Some((squadron.id, fleet.id));
            }
        }
    }
    let Some((squadron_id, fleet_id)) = oldest else {
        return;
    };
    if let Ok(fleet) = state.fleets.get_mut(fleet_id) {
        fleet.squadrons.retain(|s| s.id != squadron_id);
    }
    ctx.push(GameEvent::SquadronDisbanded {
        fleet: fleet_id,
        squadron: squadron_id,
        reason: "over squadron cap".into(),
    });
    if state
        .fleets
        .get(fleet_id)
        .map(|f| f.is_empty())
        .unwrap_or(false)
    {
        state.destroy_fleet(fleet_id, "disbanded for cap", &mut ctx.events);
    }
}

fn enforce_fighter_cap(state: &mut GameState, ctx: &mut TurnContext<'_>) {
    let cap_cfg = ctx.config.capacity.clone();
    for colony_id in state.colonies.ids() {
        let Ok(colony) = state.colonies.get(colony_id) else {
            continue;
        };
        let infra_cap =
            (colony.iu as f64 * (1.0 - colony.infrastructure_damage) * cap_cfg.fighters_per_iu)
                .floor() as usize;
        let pop_cap = (colony.pu as f64 * cap_cfg.fighters_per_pu).floor() as usize;
        let cap = infra_cap.min(pop_cap);
        let count = colony.fighters.len();

        if count <= cap {
            if colony.fighter_cap_grace_until.is_some() {
                if let Ok(c) = state.colonies.get_mut(colony_id) {
                    c.fighter_cap_grace_until = None;
                }
            }
            continue;
        }
        match colony.fighter_cap_grace_until {
            None => {
                if let Ok(c) = state.colonies.get_mut(colony_id) {
                    c.fighter_cap_grace_until = Some(ctx.turn + cap_cfg.grace_turns);
                }
                ctx.warn(format!(
                    "colony {} over fighter capacity ({} > {}); grace begins",
                    colony_id, count, cap
                ));
            }
            Some(expiry) if ctx.turn >= expiry => {
                if let Ok(c) = state.colonies.get_mut(colony_id) {
                    c.fighters.sort_by_key(|f| f.id);
                    if !c.fighters.is_empty() {
                        let removed = c.fighters.remove(0);
                        ctx.warn(format!(
                            "colony {} scrapped fighter {} over capacity",
                            colony_id, removed.id
                        ));
                    }
                }
            }
            Some(_) => {}
        }
    }
}

/// A house may field at most one planet breaker per colony it holds. The
/// excess is scrapped immediately, newest hulls first, without salvage.
fn enforce_planet_breaker_cap(state: &mut GameState, ctx: &mut TurnContext<'_>) {
    for house_id in state.houses.ids() {
        let colonies = state.colonies.count_of_house(house_id);
        let breakers = state.fleets.count_class(house_id, ShipClass::PlanetBreaker);
        if breakers <= colonies {
            continue;
        }
        let mut excess = breakers - colonies;
        let mut hulls: Vec<(ShipId, FleetId)> = state
            .fleets
            .iter()
            .filter(|f| f.house == house_id)
            .flat_map(|f| {
                f.ships()
                    .filter(|s| s.class == ShipClass::PlanetBreaker)
                    .map(move |s| (s.id, f.id))
            })
            .collect();
        hulls.sort_unstable_by_key(|&(ship, _)| std::cmp::Reverse(ship));
        for (ship_id, fleet_id) in hulls {
            if excess == 0 {
                break;
            }
            if state.fleets.remove_ship(fleet_id, ship_id).is_ok() {
                excess -= 1;
                ctx.warn(format!(
                    "house {} scrapped planet breaker {} over colony cap",
                    house_id, ship_id
                ));
                if state
                    .fleets
                    .get(fleet_id)
                    .map(|f| f.is_empty())
                    .unwrap_or(false)
                {
                    state.destroy_fleet(fleet_id, "planet breaker cap", &mut ctx.events);
                }
            }
        }
    }
}
