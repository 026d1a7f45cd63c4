// src/systems/espionage.rs
//! Spy scouts, covert-budget missions and starbase surveillance. All
//! randomness comes off the turn stream (one die per scout per check, in
//! (house, scout) order) except surveillance, which runs on its own derived
//! sub-stream so passive sweeps never perturb mission rolls.

use crate::core::entities::SpyScout;
use crate::core::events::{EspionageKind, GameEvent, OrderKind};
use crate::core::orders::QueuedCovertAction;
use crate::core::rng::SURVEILLANCE_STREAM;
use crate::core::types::*;
use crate::core::GameState;
use crate::systems::simultaneous::{into_groups, Submission};
use crate::systems::TurnContext;

/// Conflict step 1: pre-combat detection sweep. A detected scout sits out
/// the turn and runs for home afterwards.
pub fn spy_detection(state: &mut GameState, ctx: &mut TurnContext<'_>) {
    for scout_id in state.scouts.ids_by_house() {
        let Ok(scout) = state.scouts.get(scout_id) else {
            continue;
        };
        if scout.state == SpyState::Detected {
            continue;
        }
        let (house, system, merged) = (scout.house, scout.system, scout.merged_count);
        if !hostiles_present(state, house, system) {
            continue;
        }
        let roll = ctx.rng.d20();
        if detected(state, ctx, merged, house, system, roll) {
            if let Ok(scout) = state.scouts.get_mut(scout_id) {
                scout.state = SpyState::Detected;
            }
            ctx.push(GameEvent::SpyScoutDetected {
                scout: scout_id,
                house,
                system,
            });
        }
    }
}

fn hostiles_present(state: &GameState, house: HouseId, system: SystemId) -> bool {
    state
        .fleets
        .houses_at_system(system)
        .iter()
        .any(|&h| state.houses.are_belligerent(house, h))
}

/// 1d20 >= base - merged scouts + defender ELI + starbase bonus. The
/// defender is the hostile house with the best electronic intelligence
/// present; ties break toward the lower house id.
fn detected(
    state: &GameState,
    ctx: &TurnContext<'_>,
    merged: u8,
    house: HouseId,
    system: SystemId,
    roll: i32,
) -> bool {
    let mut defender_eli = 0i32;
    for h in state.fleets.houses_at_system(system) {
        if !state.houses.are_belligerent(house, h) {
            continue;
        }
        let eli = state
            .houses
            .get(h)
            .map(|hh| i32::from(hh.tech.electronic_intel))
            .unwrap_or(0);
        if eli > defender_eli {
            defender_eli = eli;
        }
    }
    let starbase_bonus = match state.colonies.colony_in_system(system) {
        Some(colony_id) => state
            .colonies
            .get(colony_id)
            .ok()
            .filter(|c| state.houses.are_belligerent(house, c.house))
            .map(|c| {
                let operational = c.starbases.iter().any(|&id| {
                    state
                        .colonies
                        .facility(id)
                        .map(|f| !f.crippled)
                        .unwrap_or(false)
                });
                if operational {
                    ctx.config.espionage.starbase_detect_bonus
                } else {
                    0
                }
            })
            .unwrap_or(0),
        None => 0,
    };
    let threshold = ctx.config.espionage.detect_base - i32::from(merged) + defender_eli + starbase_bonus;
    roll >= threshold
}

/// Conflict step 6b: fleet-based spy missions consume the fleet's scout and
/// launch it as an independent entity. The carrying fleet dies with the
/// deployment if the scout was all it had.
pub fn deploy_fleet_spies(state: &mut GameState, ctx: &mut TurnContext<'_>) {
    let mut deployments: Vec<(HouseId, FleetId, OrderKind, SystemId)> = state
        .fleet_orders
        .values()
        .filter(|o| {
            o.active
                && matches!(
                    o.kind,
                    OrderKind::SpyPlanet | OrderKind::HackStarbase | OrderKind::SpySystem
                )
        })
        .filter_map(|o| o.target_system.map(|t| (o.house, o.fleet, o.kind, t)))
        .collect();
    deployments.sort_unstable();

    for (house, fleet_id, kind, target) in deployments {
        let Ok(fleet) = state.fleets.get(fleet_id) else {
            continue;
        };
        let scout_ship = fleet
            .ships()
            .find(|s| s.class == ShipClass::Scout)
            .map(|s| s.id);
        let Some(ship_id) = scout_ship else {
            ctx.push(GameEvent::OrderFailed {
                fleet: fleet_id,
                order: kind,
                reason: "no scout left in fleet".into(),
            });
            continue;
        };
        let origin = fleet.system;
        if state.fleets.remove_ship(fleet_id, ship_id).is_err() {
            continue;
        }

        let mission = match kind {
            OrderKind::SpyPlanet => SpyMission::SpyPlanet,
            OrderKind::HackStarbase => SpyMission::HackStarbase,
            _ => SpyMission::SpySystem,
        };
        let eli = state
            .houses
            .get(house)
            .map(|h| h.tech.electronic_intel)
            .unwrap_or(1);
        let path = state
            .starmap
            .shortest_path(origin, target)
            .unwrap_or_else(|| vec![origin]);
        let scout_id = state.ids.scout();
        let at_target = origin == target;
        state.scouts.insert(SpyScout {
            id: scout_id,
            house,
            system: origin,
            eli,
            mission,
            target,
            state: if at_target {
                SpyState::OnMission
            } else {
                SpyState::Traveling
            },
            path,
            path_index: 0,
            merged_count: 1,
        });
        ctx.push(GameEvent::SpyScoutDeployed {
            scout: scout_id,
            house,
            target,
        });
        ctx.push(GameEvent::OrderCompleted {
            fleet: fleet_id,
            order: kind,
        });
        if let Ok(h) = state.houses.get_mut(house) {
            h.telemetry.espionage_attempts += 1;
        }

        let emptied = state
            .fleets
            .get(fleet_id)
            .map(|f| f.is_empty())
            .unwrap_or(false);
        if emptied {
            state.destroy_fleet(fleet_id, "scout deployed", &mut ctx.events);
        }
    }
}

/// Conflict step 6c: covert-budget strikes, resolved simultaneously per
/// target house. EBP was charged at submission; here every roll for a
/// conflict group is drawn before any effect is applied.
pub fn resolve_covert(state: &mut GameState, ctx: &mut TurnContext<'_>) {
    let queued = std::mem::take(&mut state.pending_covert_actions);
    if queued.is_empty() {
        return;
    }
    let submissions: Vec<Submission<QueuedCovertAction>> = queued
        .into_iter()
        .map(|q| Submission {
            target: u64::from(q.action.target),
            house: q.house,
            fleet: 0,
            payload: q,
        })
        .collect();

    for (_, group) in into_groups(submissions) {
        // Draw everything first.
        let rolls: Vec<i32> = group.iter().map(|_| ctx.rng.d20()).collect();
        for (sub, roll) in group.into_iter().zip(rolls) {
            apply_covert(state, ctx, &sub.payload, roll);
        }
    }
}

fn apply_covert(
    state: &mut GameState,
    ctx: &mut TurnContext<'_>,
    queued: &QueuedCovertAction,
    roll: i32,
) {
    let attacker = queued.house;
    let target = queued.action.target;
    let mission = queued.action.mission;
    if !state.houses.contains(target) {
        ctx.warn(format!("covert action against unknown house {}", target));
        return;
    }
    let attacker_eli = state
        .houses
        .get(attacker)
        .map(|h| i32::from(h.tech.electronic_intel))
        .unwrap_or(0);
    let (defender_eli, defender_cip) = state
        .houses
        .get(target)
        .map(|h| (i32::from(h.tech.electronic_intel), h.cip))
        .unwrap_or((0, 0));

    // CIP buys a flat screen, capped so budgets cannot make a house immune.
    let screen = (defender_cip / 20).min(5) as i32;
    let success = roll + attacker_eli > 10 + defender_eli + screen;

    if success {
        match mission {
            CovertMission::TechTheft => {
                let stolen = state
                    .houses
                    .get(target)
                    .map(|h| h.science_rp / 10)
                    .unwrap_or(0);
                if let Ok(h) = state.houses.get_mut(target) {
                    h.science_rp -= stolen;
                }
                if let Ok(h) = state.houses.get_mut(attacker) {
                    h.science_rp += stolen;
                }
            }
            CovertMission::Sabotage => {
                sabotage_facility(state, target);
            }
            CovertMission::Assassination => {
                adjust_prestige(state, ctx, target, -3, "assassination");
            }
            CovertMission::CyberAttack => {
                if let Ok(h) = state.houses.get_mut(target) {
                    h.ebp -= h.ebp / 4;
                    h.cip -= h.cip / 4;
                }
            }
            CovertMission::Psyops => {
                adjust_prestige(state, ctx, target, -2, "psyops");
            }
        }
        if let Ok(h) = state.houses.get_mut(target) {
            h.violations.push(crate::core::entities::Violation {
                turn: ctx.turn,
                against: attacker,
                description: format!("{:?} strike", mission),
            });
        }
    } else if let Ok(h) = state.houses.get_mut(target) {
        // A foiled strike still burns some of the defender's CIP.
        h.cip = (h.cip - 5).max(0);
    }
    if let Ok(h) = state.houses.get_mut(attacker) {
        h.telemetry.espionage_attempts += 1;
    }
    ctx.push(GameEvent::EspionageResolved {
        house: attacker,
        target,
        mission: EspionageKind::Covert(mission),
        success,
    });
}

/// Cripples the lowest-id operational facility at the target's lowest-id
/// colony. Deterministic, so two saboteurs in one turn hit two facilities.
fn sabotage_facility(state: &mut GameState, target: HouseId) {
    let mut colony_ids = state.colonies.ids_of_house(target);
    colony_ids.sort_unstable();
    for colony_id in colony_ids {
        let Ok(colony) = state.colonies.get(colony_id) else {
            continue;
        };
        let mut facility_ids: Vec<FacilityId> = colony.facility_ids().collect();
        facility_ids.sort_unstable();
        for fid in facility_ids {
            let Ok(facility) = state.colonies.facility_mut(fid) else {
                continue;
            };
            if !facility.crippled {
                facility.crippled = true;
                return;
            }
        }
    }
}

fn adjust_prestige(
    state: &mut GameState,
    ctx: &mut TurnContext<'_>,
    house: HouseId,
    delta: i32,
    reason: &str,
) {
    if let Ok(h) = state.houses.get_mut(house) {
        h.prestige += delta;
        ctx.push(GameEvent::PrestigeAdjusted {
            house,
            delta,
            reason: reason.to_string(),
        });
    }
}

/// Conflict step 6d: every operational starbase sweeps its own system on
/// the surveillance sub-stream.
pub fn surveillance(state: &mut GameState, ctx: &mut TurnContext<'_>) {
    let mut srng = ctx.rng.substream(SURVEILLANCE_STREAM);
    for colony_id in state.colonies.ids() {
        let Ok(colony) = state.colonies.get(colony_id) else {
            continue;
        };
        let owner = colony.house;
        let system = colony.system;
        let mut starbases = colony.starbases.clone();
        starbases.sort_unstable();
        for sb in starbases {
            let operational = state
                .colonies
                .facility(sb)
                .map(|f| !f.crippled)
                .unwrap_or(false);
            if !operational {
                continue;
            }
            if !srng.percent(ctx.config.espionage.surveillance_chance) {
                continue;
            }
            for watched in state.fleets.houses_at_system(system) {
                if watched == owner {
                    continue;
                }
                ctx.push(GameEvent::EspionageResolved {
                    house: owner,
                    target: watched,
                    mission: EspionageKind::Surveillance,
                    success: true,
                });
            }
        }
    }
}

/// Conflict step 7: scout movement. Travelers cover one jump per turn (two
/// with good ELI) with a detection check at every intermediate stop;
/// arrivals flip to OnMission, deliver intel, then turn for home. Detected
/// scouts abandon the mission and run.
pub fn spy_travel(state: &mut GameState, ctx: &mut TurnContext<'_>) {
    for scout_id in state.scouts.ids_by_house() {
        let Ok(scout) = state.scouts.get(scout_id) else {
            continue;
        };
        match scout.state {
            SpyState::Detected => {
                turn_for_home(state, scout_id);
            }
            SpyState::Traveling => {
                travel(state, ctx, scout_id, false);
                let arrived = state
                    .scouts
                    .get(scout_id)
                    .map(|s| s.system == s.target && s.state == SpyState::Traveling)
                    .unwrap_or(false);
                if arrived {
                    if let Ok(s) = state.scouts.get_mut(scout_id) {
                        s.state = SpyState::OnMission;
                    }
                }
            }
            SpyState::OnMission => {
                resolve_mission(state, ctx, scout_id);
            }
            SpyState::Returning => {
                travel(state, ctx, scout_id, true);
            }
        }
    }
}

fn travel(state: &mut GameState, ctx: &mut TurnContext<'_>, scout_id: ScoutId, homeward: bool) {
    let Ok(scout) = state.scouts.get(scout_id) else {
        return;
    };
    let jumps = if scout.eli >= ctx.config.espionage.fast_travel_eli {
        2
    } else {
        1
    };
    for _ in 0..jumps {
        let Ok(scout) = state.scouts.get(scout_id) else {
            return;
        };
        if scout.path_index + 1 >= scout.path.len() {
            break;
        }
        let (house, merged) = (scout.house, scout.merged_count);
        let next = scout.path[scout.path_index + 1];
        if let Ok(s) = state.scouts.get_mut(scout_id) {
            s.path_index += 1;
            s.system = next;
        }
        if homeward {
            continue;
        }
        // Per-hop detection at each intermediate system.
        if hostiles_present(state, house, next) {
            let roll = ctx.rng.d20();
            if detected(state, ctx, merged, house, next, roll) {
                if let Ok(s) = state.scouts.get_mut(scout_id) {
                    s.state = SpyState::Detected;
                }
                ctx.push(GameEvent::SpyScoutDetected {
                    scout: scout_id,
                    house,
                    system: next,
                });
                return;
            }
        }
    }
    if homeward {
        let done = state
            .scouts
            .get(scout_id)
            .map(|s| s.path_index + 1 >= s.path.len())
            .unwrap_or(true);
        if done {
            // Home: intel delivered, entity retires.
            let _ = state.scouts.remove(scout_id);
        }
    }
}

fn resolve_mission(state: &mut GameState, ctx: &mut TurnContext<'_>, scout_id: ScoutId) {
    let Ok(scout) = state.scouts.get(scout_id) else {
        return;
    };
    let (house, target_system, mission) = (scout.house, scout.target, scout.mission);
    let target_house = state
        .colonies
        .colony_in_system(target_system)
        .and_then(|id| state.colonies.get(id).ok())
        .map(|c| c.house);
    let success = match mission {
        SpyMission::SpyPlanet | SpyMission::HackStarbase => target_house.is_some(),
        SpyMission::SpySystem => true,
    };
    ctx.push(GameEvent::EspionageResolved {
        house,
        target: target_house.unwrap_or(house),
        mission: EspionageKind::FleetMission(mission),
        success,
    });
    turn_for_home(state, scout_id);
}

/// Point the scout at the closest friendly colony and put it in Returning.
/// A scout with nowhere to go retires on the spot.
fn turn_for_home(state: &mut GameState, scout_id: ScoutId) {
    let Ok(scout) = state.scouts.get(scout_id) else {
        return;
    };
    let (house, system) = (scout.house, scout.system);
    let home = state
        .closest_friendly_colony(house, system, false)
        .and_then(|id| state.colonies.get(id).ok())
        .map(|c| c.system);
    match home.and_then(|h| state.starmap.shortest_path(system, h)) {
        Some(path) => {
            if let Ok(s) = state.scouts.get_mut(scout_id) {
                s.path = path;
                s.path_index = 0;
                s.state = SpyState::Returning;
            }
        }
        None => {
            let _ = state.scouts.remove(scout_id);
        }
    }
}
