// src/systems/combat.rs
//! The combat-resolver seam. Damage math is an external collaborator: the
//! engine hands over the participating fleets and starbases, the resolver
//! mutates crippled flags and reports destroyed hulls, and the engine does
//! the cleanup (wreck removal, empty-fleet deletion, order teardown).

use std::collections::{BTreeMap, BTreeSet};

use crate::config::Config;
use crate::core::entities::{Facility, Fleet};
use crate::core::events::{CombatReport, ShipLoss};
use crate::core::rng::TurnRng;
use crate::core::types::*;

/// Posture a house fights at when none of its standing orders says
/// otherwise.
pub const DEFAULT_ROE: u8 = 5;

/// Immutable context for one battle.
pub struct BattleContext<'a> {
    /// Unordered belligerent pairs, normalized (low, high).
    pub hostile_pairs: &'a BTreeSet<(HouseId, HouseId)>,
    pub tech: &'a BTreeMap<HouseId, TechLevels>,
    /// Per-house rules of engagement, gathered from the patrol and guard
    /// orders standing in the system. 0 evades, 10 presses home.
    pub roe: &'a BTreeMap<HouseId, u8>,
    pub config: &'a Config,
}

impl BattleContext<'_> {
    pub fn are_hostile(&self, a: HouseId, b: HouseId) -> bool {
        a != b && self.hostile_pairs.contains(&(a.min(b), a.max(b)))
    }

    pub fn roe(&self, house: HouseId) -> u8 {
        self.roe.get(&house).copied().unwrap_or(DEFAULT_ROE)
    }
}

pub trait CombatResolver {
    /// Resolve one system battle. `fleets` and `starbases` are taken out of
    /// the world for the duration of the call; mutate crippled flags in
    /// place and list destroyed ships in the report. Everything listed as
    /// destroyed is stripped by the engine afterwards.
    fn resolve_space_battle(
        &mut self,
        system: SystemId,
        fleets: &mut [Fleet],
        starbases: &mut [Facility],
        battle: &BattleContext<'_>,
        rng: &mut TurnRng,
    ) -> CombatReport;
}

/// Deterministic stock resolver: aggregate strength exchange over up to
/// three rounds. Fresh hits cripple, hits on crippled hulls destroy.
#[derive(Debug, Default)]
pub struct DefaultCombatResolver;

impl DefaultCombatResolver {
    pub fn new() -> Self {
        Self
    }

    fn house_attack(
        fleets: &[Fleet],
        house: HouseId,
        dead: &BTreeSet<ShipId>,
        battle: &BattleContext<'_>,
        rng: &mut TurnRng,
    ) -> i64 {
        let tech = battle.tech.get(&house).copied().unwrap_or_default();
        let base: i64 = fleets
            .iter()
            .filter(|f| f.house == house && f.status != FleetStatus::Mothballed)
            .flat_map(|f| f.ships())
            .filter(|s| !dead.contains(&s.id))
            .map(|s| {
                let strength = battle.config.attack_strength(s.class, &tech);
                if s.crippled {
                    strength / 2
                } else {
                    strength
                }
            })
            .sum();
        // Posture scales weight of fire: ROE 0 fights at half effect,
        // 10 at one and a half.
        let posture = base * (50 + 10 * i64::from(battle.roe(house))) / 100;
        // 50%..150% swing, one draw per firing house per round.
        posture * rng.range_inclusive(50, 150) / 100
    }
}

impl CombatResolver for DefaultCombatResolver {
    fn resolve_space_battle(
        &mut self,
        system: SystemId,
        fleets: &mut [Fleet],
        starbases: &mut [Facility],
        battle: &BattleContext<'_>,
        rng: &mut TurnRng,
    ) -> CombatReport {
        let mut houses: Vec<HouseId> = fleets.iter().map(|f| f.house).collect();
        houses.sort_unstable();
        houses.dedup();

        let mut destroyed: Vec<ShipLoss> = Vec::new();
        let mut crippled: Vec<ShipLoss> = Vec::new();
        let mut dead: BTreeSet<ShipId> = BTreeSet::new();
        let mut rounds = 0;

        for round in 0..3 {
            // Draw all fire for the round before applying any of it, so
            // resolution order cannot favor the first house in id order.
            let mut incoming: BTreeMap<HouseId, i64> = BTreeMap::new();
            for &attacker in &houses {
                // Evasive postures fire once and fade.
                if round > 0 && battle.roe(attacker) <= 2 {
                    continue;
                }
                let strength = Self::house_attack(fleets, attacker, &dead, battle, rng);
                if strength == 0 {
                    continue;
                }
                let targets: Vec<HouseId> = houses
                    .iter()
                    .copied()
                    .filter(|&h| battle.are_hostile(attacker, h))
                    .collect();
                if targets.is_empty() {
                    continue;
                }
                let share = strength / targets.len() as i64;
                for target in targets {
                    *incoming.entry(target).or_insert(0) += share;
                }
            }
            if incoming.values().all(|&d| d == 0) {
                break;
            }
            rounds += 1;

            for (&house, &damage) in incoming.iter() {
                let mut damage = damage;
                let tech = battle.tech.get(&house).copied().unwrap_or_default();
                // Starbases screen first, then ships in fleet/ship id order.
                for sb in starbases.iter_mut().filter(|s| !s.crippled) {
                    if damage <= 0 {
                        break;
                    }
                    // Starbase soak scales with config cost as a proxy for
                    // size.
                    let soak = battle.config.facility(FacilityKind::Starbase).cost / 10;
                    if damage >= soak {
                        sb.crippled = true;
                        damage -= soak;
                    }
                }
                for fleet in fleets.iter_mut().filter(|f| f.house == house) {
                    if damage <= 0 {
                        break;
                    }
                    let fleet_id = fleet.id;
                    let mut ship_ids: Vec<ShipId> = fleet.ships().map(|s| s.id).collect();
                    ship_ids.sort_unstable();
                    for ship_id in ship_ids {
                        if damage <= 0 {
                            break;
                        }
                        if dead.contains(&ship_id) {
                            continue;
                        }
                        let Some(ship) = fleet.find_ship_mut(ship_id) else {
                            continue;
                        };
                        let hull = i64::from(battle.config.ship(ship.class).hull)
                            + battle.config.defense_strength(ship.class, &tech) / 2;
                        if damage < hull {
                            break;
                        }
                        damage -= hull;
                        let loss = ShipLoss {
                            house,
                            fleet: fleet_id,
                            ship: ship.id,
                            class: ship.class,
                        };
                        if ship.crippled {
                            dead.insert(ship.id);
                            destroyed.push(loss);
                        } else {
                            ship.crippled = true;
                            crippled.push(loss);
                        }
                    }
                }
            }
        }

        // Winner: the side with surviving combat strength when all its
        // opponents have none.
        let mut standing: Vec<HouseId> = houses
            .iter()
            .copied()
            .filter(|&h| {
                fleets.iter().any(|f| {
                    f.house == h
                        && f.ships().any(|s| s.class.is_combat() && !dead.contains(&s.id))
                })
            })
            .collect();
        standing.sort_unstable();
        let winner = match standing.len() {
            1 => Some(standing[0]),
            _ => None,
        };

        CombatReport {
            system,
            participants: houses,
            destroyed,
            crippled,
            winner,
            rounds,
        }
    }
}
