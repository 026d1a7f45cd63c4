// src/systems/conflict.rs
//! Conflict phase: all violence and espionage queued last turn, in seven
//! fixed sub-steps. Systems and conflict groups are walked in ascending id
//! order and every group's dice are drawn before its effects land, so the
//! phase is replayable from the seed alone.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::entities::{Cargo, Fleet, GroundUnit, Violation};
use crate::core::events::{GameEvent, OrderKind};
use crate::core::orders::FleetOrder;
use crate::core::types::*;
use crate::core::GameState;
use crate::systems::combat::{BattleContext, CombatResolver};
use crate::systems::simultaneous::{into_groups, winner_index, Submission};
use crate::systems::{espionage, TurnContext};

pub fn run(state: &mut GameState, ctx: &mut TurnContext<'_>, resolver: &mut dyn CombatResolver) {
    espionage::spy_detection(state, ctx);
    space_combat(state, ctx, resolver);
    resolve_blockades(state, ctx);
    resolve_planetary(state, ctx);
    resolve_colonization(state, ctx);
    espionage::deploy_fleet_spies(state, ctx);
    espionage::resolve_covert(state, ctx);
    espionage::surveillance(state, ctx);
    espionage::spy_travel(state, ctx);
}

/// Step 2: space and orbital combat. A system fights when, after stealth
/// gating, two or more mutually belligerent houses can see each other.
/// Cloaked contingents stay invisible unless the opposing side fields a
/// scout; a colony with a starbase always defends its orbit.
fn space_combat(state: &mut GameState, ctx: &mut TurnContext<'_>, resolver: &mut dyn CombatResolver) {
    let systems: Vec<SystemId> = state.starmap.system_ids().collect();
    for system in systems {
        let fleet_houses = state.fleets.houses_at_system(system);
        let colony = state
            .colonies
            .colony_in_system(system)
            .and_then(|id| state.colonies.get(id).ok());
        let colony_owner = colony.map(|c| c.house);
        let colony_id = colony.map(|c| c.id);
        let colony_has_starbase = colony
            .map(|c| {
                c.starbases.iter().any(|&id| {
                    state
                        .colonies
                        .facility(id)
                        .map(|f| !f.crippled)
                        .unwrap_or(false)
                })
            })
            .unwrap_or(false);

        let mut houses = fleet_houses.clone();
        if let Some(owner) = colony_owner {
            if colony_has_starbase && !houses.contains(&owner) {
                houses.push(owner);
                houses.sort_unstable();
            }
        }
        if houses.len() < 2 {
            continue;
        }

        // Stealth gating: house -> (has visible ships, has a scout).
        let mut presence: BTreeMap<HouseId, (bool, bool)> = BTreeMap::new();
        for &h in &houses {
            let mut visible = colony_owner == Some(h);
            let mut scout = false;
            for fleet in state.fleets.iter().filter(|f| f.system == system && f.house == h) {
                if !fleet.is_cloaked() {
                    visible = true;
                }
                if fleet.has_scout() {
                    scout = true;
                }
            }
            presence.insert(h, (visible, scout));
        }
        let sees = |viewer: HouseId, subject: HouseId| -> bool {
            let subject_visible = presence.get(&subject).map(|p| p.0).unwrap_or(false);
            let viewer_has_scout = presence.get(&viewer).map(|p| p.1).unwrap_or(false);
            subject_visible || viewer_has_scout
        };

        let mut hostile_pairs: BTreeSet<(HouseId, HouseId)> = BTreeSet::new();
        for (i, &a) in houses.iter().enumerate() {
            for &b in houses.iter().skip(i + 1) {
                if !state.houses.are_belligerent(a, b) {
                    continue;
                }
                // An invisible contingent is out of the battle entirely:
                // both sides must be able to see each other to engage.
                if sees(a, b) && sees(b, a) {
                    hostile_pairs.insert((a.min(b), a.max(b)));
                }
            }
        }
        if hostile_pairs.is_empty() {
            continue;
        }
        let mut participants: Vec<HouseId> = hostile_pairs
            .iter()
            .flat_map(|&(a, b)| [a, b])
            .collect();
        participants.sort_unstable();
        participants.dedup();

        // Patrol and guard orders standing in the system carry their rules
        // of engagement into the battle; the most aggressive posture per
        // house wins. Gathered before the fleets leave the manager.
        let mut roe: BTreeMap<HouseId, u8> = BTreeMap::new();
        for order in state.fleet_orders.values() {
            if !order.active
                || !matches!(
                    order.kind,
                    OrderKind::Patrol | OrderKind::GuardStarbase | OrderKind::GuardPlanet
                )
            {
                continue;
            }
            let Some(posture) = order.roe else {
                continue;
            };
            if !participants.contains(&order.house) {
                continue;
            }
            let on_station = state
                .fleets
                .get(order.fleet)
                .map(|f| f.system == system)
                .unwrap_or(false);
            if !on_station {
                continue;
            }
            roe.entry(order.house)
                .and_modify(|cur| *cur = (*cur).max(posture))
                .or_insert(posture);
        }

        // Hand the participants' fleets and the defending starbases to the
        // resolver by value; the world gets them back afterwards.
        let mut fleet_ids: Vec<FleetId> = state
            .fleets
            .ids_at_system(system)
            .into_iter()
            .filter(|&id| {
                state
                    .fleets
                    .get(id)
                    .map(|f| participants.contains(&f.house))
                    .unwrap_or(false)
            })
            .collect();
        fleet_ids.sort_unstable();
        let mut fleets: Vec<Fleet> = Vec::with_capacity(fleet_ids.len());
        for id in fleet_ids {
            if let Ok(f) = state.fleets.remove(id) {
                fleets.push(f);
            }
        }

        let mut starbases = Vec::new();
        if let (Some(owner), Some(cid)) = (colony_owner, colony_id) {
            if participants.contains(&owner) {
                let ids = state.colonies.facilities_of_kind(cid, FacilityKind::Starbase);
                for id in ids {
                    if let Some(f) = state.colonies.take_facility(id) {
                        starbases.push(f);
                    }
                }
            }
        }

        let mut tech: BTreeMap<HouseId, TechLevels> = BTreeMap::new();
        for &h in &participants {
            if let Ok(house) = state.houses.get(h) {
                tech.insert(h, house.tech);
            }
        }

        log::debug!(
            "combat in system {} between houses {:?}",
            system,
            participants
        );
        let battle = BattleContext {
            hostile_pairs: &hostile_pairs,
            tech: &tech,
            roe: &roe,
            config: ctx.config,
        };
        let report = resolver.resolve_space_battle(
            system,
            &mut fleets,
            &mut starbases,
            &battle,
            &mut ctx.rng,
        );

        for fleet in fleets {
            state.fleets.insert(fleet);
        }
        for sb in starbases {
            state.colonies.restore_facility(sb);
        }

        // Strip wrecks and account the losses.
        for loss in &report.destroyed {
            if state.fleets.remove_ship(loss.fleet, loss.ship).is_ok() {
                if let Ok(h) = state.houses.get_mut(loss.house) {
                    h.telemetry.ships_lost += 1;
                }
                for &h in &report.participants {
                    if h != loss.house {
                        if let Ok(other) = state.houses.get_mut(h) {
                            other.telemetry.ships_destroyed += 1;
                        }
                    }
                }
            }
        }
        let emptied: Vec<FleetId> = state
            .fleets
            .ids_at_system(system)
            .into_iter()
            .filter(|&id| state.fleets.get(id).map(|f| f.is_empty()).unwrap_or(false))
            .collect();
        for id in emptied {
            state.destroy_fleet(id, "destroyed in combat", &mut ctx.events);
        }

        ctx.push(GameEvent::CombatResolved {
            system,
            participants: report.participants.clone(),
        });
        ctx.reports.push(report);
    }
}

/// Step 3: blockades, simultaneous per colony. Blockade sets are rebuilt
/// from scratch each turn; the consecutive-turn counter survives only
/// while at least one blockader holds station.
fn resolve_blockades(state: &mut GameState, ctx: &mut TurnContext<'_>) {
    let mut submissions: Vec<Submission<()>> = Vec::new();
    for order in state.fleet_orders.values() {
        if !order.active || order.kind != OrderKind::Blockade {
            continue;
        }
        let Some(target) = order.target_system else {
            continue;
        };
        let Ok(fleet) = state.fleets.get(order.fleet) else {
            continue;
        };
        if fleet.system != target || !fleet.has_combat_ships() {
            continue;
        }
        let Some(colony_id) = state.colonies.colony_in_system(target) else {
            continue;
        };
        let Ok(colony) = state.colonies.get(colony_id) else {
            continue;
        };
        if !state.houses.are_belligerent(order.house, colony.house) {
            ctx.push(GameEvent::OrderFailed {
                fleet: order.fleet,
                order: OrderKind::Blockade,
                reason: "target colony is no longer hostile".into(),
            });
            continue;
        }
        submissions.push(Submission {
            target: u64::from(colony_id),
            house: order.house,
            fleet: order.fleet,
            payload: (),
        });
    }

    let groups = into_groups(submissions);
    let mut sustained: BTreeMap<ColonyId, BTreeSet<HouseId>> = BTreeMap::new();
    for (target, group) in &groups {
        let entry = sustained.entry(*target as ColonyId).or_default();
        for sub in group {
            entry.insert(sub.house);
        }
    }

    for colony_id in state.colonies.ids() {
        let Ok(colony) = state.colonies.get_mut(colony_id) else {
            continue;
        };
        match sustained.get(&colony_id) {
            Some(blockaders) => {
                colony.blockaded = true;
                colony.blockaded_by = blockaders.clone();
                colony.blockade_turns += 1;
                let by: Vec<HouseId> = blockaders.iter().copied().collect();
                ctx.push(GameEvent::ColonyBlockaded {
                    colony: colony_id,
                    by,
                });
            }
            None => {
                colony.blockaded = false;
                colony.blockaded_by.clear();
                colony.blockade_turns = 0;
            }
        }
    }
}

/// Step 4: planetary combat, simultaneous per colony. Bombardment damage
/// stacks; invasions run their three rounds on pre-drawn dice.
fn resolve_planetary(state: &mut GameState, ctx: &mut TurnContext<'_>) {
    let mut submissions: Vec<Submission<FleetOrder>> = Vec::new();
    for order in state.fleet_orders.values() {
        if !order.active
            || !matches!(
                order.kind,
                OrderKind::Bombard | OrderKind::Invade | OrderKind::Blitz
            )
        {
            continue;
        }
        let Some(target) = order.target_system else {
            continue;
        };
        let Ok(fleet) = state.fleets.get(order.fleet) else {
            continue;
        };
        if fleet.system != target {
            continue;
        }
        let Some(colony_id) = state.colonies.colony_in_system(target) else {
            ctx.push(GameEvent::OrderFailed {
                fleet: order.fleet,
                order: order.kind,
                reason: "no colony at target".into(),
            });
            continue;
        };
        let Ok(colony) = state.colonies.get(colony_id) else {
            continue;
        };
        if !state.houses.are_belligerent(order.house, colony.house) {
            ctx.push(GameEvent::OrderFailed {
                fleet: order.fleet,
                order: order.kind,
                reason: "target colony is no longer hostile".into(),
            });
            continue;
        }
        submissions.push(Submission {
            target: u64::from(colony_id),
            house: order.house,
            fleet: order.fleet,
            payload: order.clone(),
        });
    }

    for (target, group) in into_groups(submissions) {
        let colony_id = target as ColonyId;
        // All dice for the group come off the stream before any effect.
        let rolls: Vec<[i32; 3]> = group
            .iter()
            .map(|_| [ctx.rng.d20(), ctx.rng.d20(), ctx.rng.d20()])
            .collect();
        for (sub, dice) in group.into_iter().zip(rolls) {
            match sub.payload.kind {
                OrderKind::Bombard => bombard(state, ctx, colony_id, &sub.payload, dice[0]),
                OrderKind::Invade => invade(state, ctx, colony_id, &sub.payload, dice, false),
                OrderKind::Blitz => invade(state, ctx, colony_id, &sub.payload, dice, true),
                _ => {}
            }
        }
    }
}

/// A strike on a colony is a treaty breach: every ally of the defender
/// escalates to Enemy with the attacker, symmetrically, and the breach is
/// recorded in both houses' violation histories. Houses already at Enemy
/// are left alone so a siege does not pile up duplicate entries.
fn escalate_against_allies(
    state: &mut GameState,
    ctx: &mut TurnContext<'_>,
    attacker: HouseId,
    defender: HouseId,
) {
    if attacker == defender {
        return;
    }
    let allies: Vec<HouseId> = state
        .houses
        .iter()
        .filter(|h| h.id != attacker && h.id != defender)
        .filter(|h| {
            h.relation_to(defender) == DiplomaticStatus::Ally
                || state
                    .houses
                    .get(defender)
                    .map(|d| d.relation_to(h.id) == DiplomaticStatus::Ally)
                    .unwrap_or(false)
        })
        .map(|h| h.id)
        .collect();

    for ally in allies {
        let already_enemy = state
            .houses
            .get(ally)
            .map(|h| h.relation_to(attacker) == DiplomaticStatus::Enemy)
            .unwrap_or(true);
        if already_enemy {
            continue;
        }
        log::info!(
            "house {} joins house {} against house {}",
            ally,
            defender,
            attacker
        );
        if let Ok(h) = state.houses.get_mut(ally) {
            h.relations.insert(attacker, DiplomaticStatus::Enemy);
            h.violations.push(Violation {
                turn: ctx.turn,
                against: attacker,
                description: format!("assault on allied house {}", defender),
            });
        }
        if let Ok(h) = state.houses.get_mut(attacker) {
            h.relations.insert(ally, DiplomaticStatus::Enemy);
            h.violations.push(Violation {
                turn: ctx.turn,
                against: ally,
                description: format!("treaty breach against house {}", defender),
            });
        }
    }
}

fn attacker_bombard_strength(state: &GameState, ctx: &TurnContext<'_>, order: &FleetOrder) -> i64 {
    let Ok(fleet) = state.fleets.get(order.fleet) else {
        return 0;
    };
    let tech = state
        .houses
        .get(order.house)
        .map(|h| h.tech)
        .unwrap_or_default();
    fleet
        .ships()
        .filter(|s| s.class.is_combat() && !s.crippled)
        .map(|s| ctx.config.attack_strength(s.class, &tech))
        .sum()
}

/// Bombardment chips infrastructure and can cripple a facility on a high
/// roll. Damage from several attackers in one turn accumulates.
fn bombard(
    state: &mut GameState,
    ctx: &mut TurnContext<'_>,
    colony_id: ColonyId,
    order: &FleetOrder,
    roll: i32,
) {
    let strength = attacker_bombard_strength(state, ctx, order);
    if strength == 0 {
        return;
    }
    // Shields soak a share of the barrage.
    let shield = state
        .colonies
        .get(colony_id)
        .map(|c| c.ground_strength(GroundUnitKind::PlanetaryShield))
        .unwrap_or(0);
    let effective = (strength - shield).max(0);
    let damage = (effective as f64 / 2000.0) * (roll as f64 / 20.0);
    if let Ok(colony) = state.colonies.get_mut(colony_id) {
        colony.infrastructure_damage = (colony.infrastructure_damage + damage).min(1.0);
    }
    if roll >= 15 {
        cripple_one_facility(state, colony_id);
    }
    ctx.push(GameEvent::ColonyBombarded {
        colony: colony_id,
        house: order.house,
        damage,
    });
    let defender = state
        .colonies
        .get(colony_id)
        .map(|c| c.house)
        .unwrap_or(order.house);
    escalate_against_allies(state, ctx, order.house, defender);
}

fn cripple_one_facility(state: &mut GameState, colony_id: ColonyId) {
    let Ok(colony) = state.colonies.get(colony_id) else {
        return;
    };
    let mut ids: Vec<FacilityId> = colony.facility_ids().collect();
    ids.sort_unstable();
    for id in ids {
        if let Ok(f) = state.colonies.facility_mut(id) {
            if !f.crippled {
                f.crippled = true;
                return;
            }
        }
    }
}

/// Invasion: round one silences the ground batteries, round two bombards
/// population and troops, round three lands the marines. A blitz skips
/// round one but demands two-to-one marine superiority up front.
fn invade(
    state: &mut GameState,
    ctx: &mut TurnContext<'_>,
    colony_id: ColonyId,
    order: &FleetOrder,
    dice: [i32; 3],
    blitz: bool,
) {
    let strength = attacker_bombard_strength(state, ctx, order);
    let marines = state
        .fleets
        .get(order.fleet)
        .map(|f| f.loaded_marines())
        .unwrap_or(0);
    let defender_ground = state
        .colonies
        .get(colony_id)
        .map(|c| {
            c.ground_strength(GroundUnitKind::Army) + c.ground_strength(GroundUnitKind::Marine)
        })
        .unwrap_or(0);

    if blitz && marines < defender_ground * 2 {
        ctx.push(GameEvent::OrderFailed {
            fleet: order.fleet,
            order: OrderKind::Blitz,
            reason: "blitz needs 2:1 marine superiority".into(),
        });
        return;
    }

    // The landing is committed: the defender's allies come off the fence.
    let defender = state
        .colonies
        .get(colony_id)
        .map(|c| c.house)
        .unwrap_or(order.house);
    escalate_against_allies(state, ctx, order.house, defender);

    // Round 1: silence the batteries (skipped by a blitz).
    let mut batteries_standing = state
        .colonies
        .get(colony_id)
        .map(|c| c.ground_strength(GroundUnitKind::Battery))
        .unwrap_or(0);
    if !blitz && batteries_standing > 0 {
        let suppression = strength * i64::from(dice[0]) / 20;
        let destroyed = suppression.min(batteries_standing);
        remove_ground_strength(state, colony_id, GroundUnitKind::Battery, destroyed);
        batteries_standing -= destroyed;
    }

    // Round 2: orbital fire on population and troops.
    let barrage = strength * i64::from(dice[1]) / 20;
    if let Ok(colony) = state.colonies.get_mut(colony_id) {
        let casualties = (barrage * 10_000).min(colony.souls / 10);
        colony.souls = (colony.souls - casualties).max(0);
    }
    remove_ground_strength(state, colony_id, GroundUnitKind::Army, barrage / 4);
    remove_ground_strength(state, colony_id, GroundUnitKind::Marine, barrage / 4);

    // Round 3: marines go down only once the batteries are silent (a blitz
    // drops into their teeth regardless).
    if !blitz && batteries_standing > 0 {
        ctx.push(GameEvent::OrderFailed {
            fleet: order.fleet,
            order: order_kind(blitz),
            reason: "ground batteries still firing".into(),
        });
        ctx.push(GameEvent::InvasionResolved {
            colony: colony_id,
            attacker: order.house,
            success: false,
        });
        return;
    }
    let defender_left = state
        .colonies
        .get(colony_id)
        .map(|c| {
            c.ground_strength(GroundUnitKind::Army) + c.ground_strength(GroundUnitKind::Marine)
        })
        .unwrap_or(0);
    let assault = marines * i64::from(dice[2]) / 10;
    let success = assault > defender_left;

    if success {
        capture_colony(state, ctx, colony_id, order.house, marines);
        ctx.push(GameEvent::OrderCompleted {
            fleet: order.fleet,
            order: order_kind(blitz),
        });
    } else {
        // The assault force is spent either way.
        consume_marines(state, order.fleet);
        ctx.push(GameEvent::OrderFailed {
            fleet: order.fleet,
            order: order_kind(blitz),
            reason: "ground assault repulsed".into(),
        });
    }
    ctx.push(GameEvent::InvasionResolved {
        colony: colony_id,
        attacker: order.house,
        success,
    });
}

fn order_kind(blitz: bool) -> OrderKind {
    if blitz {
        OrderKind::Blitz
    } else {
        OrderKind::Invade
    }
}

/// Strips `amount` strength from units of one kind, lowest id first.
fn remove_ground_strength(
    state: &mut GameState,
    colony_id: ColonyId,
    kind: GroundUnitKind,
    mut amount: i64,
) {
    if amount <= 0 {
        return;
    }
    let Ok(colony) = state.colonies.get_mut(colony_id) else {
        return;
    };
    colony.ground_units.sort_by_key(|u| u.id);
    for unit in colony.ground_units.iter_mut() {
        if amount <= 0 {
            break;
        }
        if unit.kind != kind {
            continue;
        }
        let hit = unit.strength.min(amount);
        unit.strength -= hit;
        amount -= hit;
    }
    colony.ground_units.retain(|u| u.strength > 0);
}

fn consume_marines(state: &mut GameState, fleet_id: FleetId) {
    if let Ok(fleet) = state.fleets.get_mut(fleet_id) {
        for ship in fleet.spacelift.iter_mut() {
            if matches!(ship.cargo, Cargo::Marines { .. }) {
                ship.cargo = Cargo::None;
            }
        }
    }
}

fn capture_colony(
    state: &mut GameState,
    ctx: &mut TurnContext<'_>,
    colony_id: ColonyId,
    attacker: HouseId,
    marines: i64,
) {
    let Ok(colony) = state.colonies.get_mut(colony_id) else {
        return;
    };
    let previous = colony.house;
    colony.house = attacker;
    colony.blockaded = false;
    colony.blockaded_by.clear();
    colony.blockade_turns = 0;
    colony.ground_units.clear();
    colony.tax_override = None;
    let garrison_id = state.ids.ground_unit();
    if let Ok(colony) = state.colonies.get_mut(colony_id) {
        // Half the landing force stays on as garrison.
        colony.ground_units.push(GroundUnit {
            id: garrison_id,
            kind: GroundUnitKind::Marine,
            strength: (marines / 2).max(1),
        });
    }
    // Landing force came off the transports.
    let attacker_fleets = state.fleets.ids_of_house(attacker);
    for fleet_id in attacker_fleets {
        let at_colony = state
            .fleets
            .get(fleet_id)
            .map(|f| {
                state
                    .colonies
                    .get(colony_id)
                    .map(|c| c.system == f.system)
                    .unwrap_or(false)
            })
            .unwrap_or(false);
        if at_colony {
            consume_marines(state, fleet_id);
        }
    }
    log::info!(
        "colony {} captured by house {} from house {}",
        colony_id,
        attacker,
        previous
    );
    ctx.push(GameEvent::ColonyCaptured {
        colony: colony_id,
        from: previous,
        to: attacker,
    });
}

/// Step 5: colonization races. At most one claimant per empty system; the
/// survivors keep their fleets and their failed orders are logged so the
/// AI can rebind next turn.
fn resolve_colonization(state: &mut GameState, ctx: &mut TurnContext<'_>) {
    let mut submissions: Vec<Submission<()>> = Vec::new();
    for order in state.fleet_orders.values() {
        if !order.active || order.kind != OrderKind::Colonize {
            continue;
        }
        let Some(target) = order.target_system else {
            continue;
        };
        let Ok(fleet) = state.fleets.get(order.fleet) else {
            continue;
        };
        if fleet.system != target || fleet.loaded_colonists() == 0 {
            continue;
        }
        if state.colonies.colony_in_system(target).is_some() {
            ctx.push(GameEvent::OrderFailed {
                fleet: order.fleet,
                order: OrderKind::Colonize,
                reason: "system already colonized".into(),
            });
            continue;
        }
        let has_planet = state
            .starmap
            .system(target)
            .map(|s| s.planet.is_some())
            .unwrap_or(false);
        if !has_planet {
            ctx.push(GameEvent::OrderFailed {
                fleet: order.fleet,
                order: OrderKind::Colonize,
                reason: "no planet to settle".into(),
            });
            continue;
        }
        submissions.push(Submission {
            target: u64::from(target),
            house: order.house,
            fleet: order.fleet,
            payload: (),
        });
    }

    for (target, group) in into_groups(submissions) {
        let system = target as SystemId;
        let Some(win) = winner_index(&group) else {
            continue;
        };
        for (i, sub) in group.iter().enumerate() {
            if i == win {
                settle(state, ctx, system, sub.house, sub.fleet);
            } else {
                ctx.push(GameEvent::OrderFailed {
                    fleet: sub.fleet,
                    order: OrderKind::Colonize,
                    reason: "another house claimed the system first".into(),
                });
            }
        }
    }
}

fn settle(
    state: &mut GameState,
    ctx: &mut TurnContext<'_>,
    system: SystemId,
    house: HouseId,
    fleet_id: FleetId,
) {
    let planet = match state.starmap.system(system) {
        Ok(s) => match &s.planet {
            Some(p) => p.clone(),
            None => return,
        },
        Err(_) => return,
    };
    // The ETAC is expended: hull and cargo become the colony seed.
    let etac = state.fleets.get(fleet_id).ok().and_then(|f| {
        f.spacelift
            .iter()
            .find(|s| s.class == ShipClass::Etac && !s.cargo.is_empty())
            .map(|s| s.id)
    });
    let Some(etac_id) = etac else {
        return;
    };
    let Ok(ship) = state.fleets.remove_ship(fleet_id, etac_id) else {
        return;
    };
    let ptu = match ship.cargo {
        Cargo::Colonists { ptu } => ptu,
        _ => 0,
    };
    let souls = ptu * ctx.config.economy.ptu_souls;
    let colony_id = state.ids.colony();
    let colony = crate::core::entities::Colony {
        id: colony_id,
        house,
        system,
        souls,
        pu: souls / ctx.config.economy.souls_per_pu,
        iu: 0,
        infrastructure_damage: 0.0,
        planet_class: planet.class,
        resources: planet.resources,
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
    if let Err(e) = state.colonies.insert_colony(colony) {
        ctx.warn(format!("colonization of system {} failed: {}", system, e));
        return;
    }
    log::info!("house {} colonized system {}", house, system);
    ctx.push(GameEvent::ColonyColonized {
        system,
        colony: colony_id,
        house,
    });
    ctx.push(GameEvent::OrderCompleted {
        fleet: fleet_id,
        order: OrderKind::Colonize,
    });
    let emptied = state
        .fleets
        .get(fleet_id)
        .map(|f| f.is_empty())
        .unwrap_or(false);
    if emptied {
        state.destroy_fleet(fleet_id, "expended in colonization", &mut ctx.events);
    }
}
