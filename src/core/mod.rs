// src/core/mod.rs
pub mod entities;
pub mod events;
pub mod orders;
pub mod rng;
pub mod setup;
pub mod starmap;
pub mod types;

// Re-export commonly used types
pub use entities::*;
pub use events::{CombatReport, EspionageKind, GameEvent, OrderKind, ShipLoss, ShortfallStep};
pub use orders::*;
pub use rng::TurnRng;
pub use starmap::{Planet, StarMap, StarSystem};
pub use types::*;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::managers::{ColonyManager, FleetManager, HouseManager, ScoutManager};
use crate::systems::combat::CombatResolver;
use crate::systems::{command, conflict, income, maintenance, TurnContext};

/// Output of one resolved turn. The event log is ordered and, together
/// with the new state, fully describes what happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnOutput {
    pub events: Vec<GameEvent>,
    pub reports: Vec<CombatReport>,
}

/// The whole world. Serializes as a single document; persisting it and the
/// per-turn packets is the caller's job, the engine has no side effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub turn: u32,
    pub game_seed: u64,
    pub starmap: StarMap,
    pub houses: HouseManager,
    pub colonies: ColonyManager,
    pub fleets: FleetManager,
    pub scouts: ScoutManager,
    pub ids: IdGenerator,
    /// Stored fleet orders, keyed by fleet. One pending order per fleet;
    /// resubmission overwrites.
    pub fleet_orders: BTreeMap<FleetId, FleetOrder>,
    /// Hulls completed last Maintenance, commissioned next Command.
    pub pending_military_commissions: Vec<PendingCommission>,
    /// Covert actions queued in Command, resolved next Conflict.
    pub pending_covert_actions: Vec<QueuedCovertAction>,
    /// Previous turn's log, used by Command step 0 to clear finished orders.
    pub last_turn_events: Vec<GameEvent>,
}

impl GameState {
    pub fn new(game_seed: u64) -> Self {
        Self {
            turn: 1,
            game_seed,
            starmap: StarMap::new(),
            houses: HouseManager::new(),
            colonies: ColonyManager::new(),
            fleets: FleetManager::new(),
            scouts: ScoutManager::new(),
            ids: IdGenerator::new(),
            fleet_orders: BTreeMap::new(),
            pending_military_commissions: Vec::new(),
            pending_covert_actions: Vec::new(),
            last_turn_events: Vec::new(),
        }
    }

    /// Resolve one full turn: Conflict, Command, Income, Maintenance, in
    /// that order. Pure with respect to `(self, packets, rng_seed)`; the
    /// same inputs produce byte-identical outputs. The turn never aborts:
    /// bad commands degrade into `EngineWarning` events.
    pub fn advance(
        &mut self,
        packets: &[CommandPacket],
        rng_seed: u64,
        config: &Config,
        resolver: &mut dyn CombatResolver,
    ) -> TurnOutput {
        log::info!("resolving turn {}", self.turn);
        let mut ctx = TurnContext::new(config, TurnRng::new(rng_seed), self.turn);

        // Index packets by house; duplicates keep the first submission.
        let mut by_house: BTreeMap<HouseId, &CommandPacket> = BTreeMap::new();
        for packet in packets {
            if !self.houses.contains(packet.house) {
                ctx.warn(format!("packet from unknown house {}", packet.house));
                continue;
            }
            if by_house.contains_key(&packet.house) {
                ctx.warn(format!(
                    "duplicate packet from house {}; keeping the first",
                    packet.house
                ));
                continue;
            }
            by_house.insert(packet.house, packet);
        }

        for id in self.houses.ids() {
            if let Ok(house) = self.houses.get_mut(id) {
                house.telemetry = HouseTelemetry::default();
            }
        }

        conflict::run(self, &mut ctx, resolver);
        self.enforce_invariants("conflict", &mut ctx);

        command::run(self, &by_house, &mut ctx);
        self.enforce_invariants("command", &mut ctx);

        income::run(self, &mut ctx);
        self.enforce_invariants("income", &mut ctx);

        maintenance::run(self, &mut ctx);
        self.enforce_invariants("maintenance", &mut ctx);

        self.update_house_status(&mut ctx);

        self.turn += 1;
        self.last_turn_events = ctx.events.clone();
        TurnOutput {
            events: ctx.events,
            reports: ctx.reports,
        }
    }

    /// Deletes a fleet and its pending order in one transaction. Safe to
    /// call for an already-deleted fleet.
    pub fn destroy_fleet(&mut self, fleet: FleetId, reason: &str, events: &mut Vec<GameEvent>) {
        if let Ok(f) = self.fleets.remove(fleet) {
            log::debug!("fleet {} destroyed: {}", fleet, reason);
            events.push(GameEvent::FleetDestroyed {
                fleet,
                house: f.house,
                reason: reason.to_string(),
            });
        }
        self.fleet_orders.remove(&fleet);
    }

    /// Closest friendly colony by jump count; ties break toward the lower
    /// system id. `None` when the house has no reachable colony.
    pub fn closest_friendly_colony(
        &self,
        house: HouseId,
        from: SystemId,
        needs_dock: bool,
    ) -> Option<ColonyId> {
        let mut best: Option<(u32, SystemId, ColonyId)> = None;
        for id in self.colonies.ids() {
            let Ok(colony) = self.colonies.get(id) else {
                continue;
            };
            if colony.house != house {
                continue;
            }
            if needs_dock && colony.spaceports.is_empty() && colony.shipyards.is_empty() {
                continue;
            }
            let Some(distance) = self.starmap.distance(from, colony.system) else {
                continue;
            };
            let key = (distance, colony.system, id);
            if best.map_or(true, |b| key < b) {
                best = Some(key);
            }
        }
        best.map(|(_, _, id)| id)
    }

    /// Post-phase invariant sweep: best-effort repair plus a warning per
    /// breach. The turn keeps going regardless.
    pub fn enforce_invariants(&mut self, phase: &str, ctx: &mut TurnContext<'_>) {
        // No fleet with zero squadrons and zero spacelift ships.
        for id in self.fleets.ids() {
            let empty = self.fleets.get(id).map(|f| f.is_empty()).unwrap_or(false);
            if empty {
                ctx.warn(format!(
                    "{}: fleet {} left empty; deleting with its orders",
                    phase, id
                ));
                self.destroy_fleet(id, "emptied", &mut ctx.events);
            }
        }
        // Pending orders must key existing fleets.
        let stale: Vec<FleetId> = self
            .fleet_orders
            .keys()
            .copied()
            .filter(|id| !self.fleets.contains(*id))
            .collect();
        for id in stale {
            ctx.warn(format!("{}: dropping order for missing fleet {}", phase, id));
            self.fleet_orders.remove(&id);
        }
        // Fleets must sit in known systems and belong to known houses.
        for id in self.fleets.ids() {
            let Ok(fleet) = self.fleets.get(id) else { continue };
            if !self.starmap.contains(fleet.system) {
                ctx.warn(format!(
                    "{}: fleet {} in unknown system {}",
                    phase, id, fleet.system
                ));
            }
            if !self.houses.contains(fleet.house) {
                ctx.warn(format!(
                    "{}: fleet {} owned by unknown house {}",
                    phase, id, fleet.house
                ));
            }
        }
        // Blockade bookkeeping stays consistent.
        for id in self.colonies.ids() {
            let Ok(colony) = self.colonies.get_mut(id) else { continue };
            let flagged = colony.blockaded;
            let has_blockaders = !colony.blockaded_by.is_empty();
            if flagged != has_blockaders {
                colony.blockaded = has_blockaders;
                if !has_blockaders {
                    colony.blockade_turns = 0;
                }
            }
        }
    }

    /// End-of-turn status transitions: prestige collapse tracking. The MIA
    /// counter is maintained by the Command phase, where packet presence is
    /// known.
    fn update_house_status(&mut self, ctx: &mut TurnContext<'_>) {
        let collapse_after = ctx.config.collapse_threshold;
        for id in self.houses.ids() {
            let Ok(house) = self.houses.get_mut(id) else { continue };
            if house.status == HouseStatus::DefensiveCollapse {
                continue;
            }
            if house.prestige < 0 {
                house.negative_prestige_turns += 1;
            } else {
                house.negative_prestige_turns = 0;
            }
            if house.negative_prestige_turns >= collapse_after {
                house.status = HouseStatus::DefensiveCollapse;
                log::info!("house {} eliminated (prestige collapse)", id);
                ctx.push(GameEvent::HouseEliminated { house: id });
                // Assets stay on the books for audit; standing orders die.
                let orphaned: Vec<FleetId> = self
                    .fleet_orders
                    .values()
                    .filter(|o| o.house == id)
                    .map(|o| o.fleet)
                    .collect();
                for fleet in orphaned {
                    self.fleet_orders.remove(&fleet);
                }
            }
        }
    }
}
