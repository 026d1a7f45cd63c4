// src/managers/fleet_manager.rs
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::entities::{Fleet, Ship, Squadron};
use crate::core::types::*;

/// Owns the fleet/squadron/ship tree. Structural mutations (merge, detach,
/// flagship promotion, squadron dissolution) live here so every caller gets
/// the same cleanup behavior. Callers are responsible for deleting fleets
/// this manager reports as emptied, in the same transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetManager {
    fleets: BTreeMap<FleetId, Fleet>,
}

impl FleetManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_fleet(&mut self, id: FleetId, house: HouseId, system: SystemId) -> FleetId {
        self.fleets.insert(
            id,
            Fleet {
                id,
                house,
                system,
                squadrons: Vec::new(),
                spacelift: Vec::new(),
                status: FleetStatus::Active,
            },
        );
        id
    }

    pub fn get(&self, id: FleetId) -> GameResult<&Fleet> {
        self.fleets.get(&id).ok_or(GameError::FleetNotFound(id))
    }

    pub fn get_mut(&mut self, id: FleetId) -> GameResult<&mut Fleet> {
        self.fleets.get_mut(&id).ok_or(GameError::FleetNotFound(id))
    }

    pub fn contains(&self, id: FleetId) -> bool {
        self.fleets.contains_key(&id)
    }

    pub fn remove(&mut self, id: FleetId) -> GameResult<Fleet> {
        self.fleets.remove(&id).ok_or(GameError::FleetNotFound(id))
    }

    /// Reinsert a fleet taken out with `remove` (combat hands fleets to the
    /// resolver by value).
    pub fn insert(&mut self, fleet: Fleet) {
        self.fleets.insert(fleet.id, fleet);
    }

    /// Ascending id order.
    pub fn ids(&self) -> Vec<FleetId> {
        self.fleets.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fleet> {
        self.fleets.values()
    }

    pub fn len(&self) -> usize {
        self.fleets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fleets.is_empty()
    }

    pub fn ids_at_system(&self, system: SystemId) -> Vec<FleetId> {
        self.fleets
            .values()
            .filter(|f| f.system == system)
            .map(|f| f.id)
            .collect()
    }

    pub fn ids_of_house(&self, house: HouseId) -> Vec<FleetId> {
        self.fleets
            .values()
            .filter(|f| f.house == house)
            .map(|f| f.id)
            .collect()
    }

    /// Houses with at least one fleet in the system, ascending.
    pub fn houses_at_system(&self, system: SystemId) -> Vec<HouseId> {
        let mut houses: Vec<HouseId> = self
            .fleets
            .values()
            .filter(|f| f.system == system)
            .map(|f| f.house)
            .collect();
        houses.sort_unstable();
        houses.dedup();
        houses
    }

    /// Moves every squadron and spacelift ship of `from` into `into` and
    /// deletes `from`. Both fleets must share house and system.
    pub fn merge(&mut self, from: FleetId, into: FleetId) -> GameResult<()> {
        if from == into {
            return Err(GameError::InvalidCommand(
                "cannot merge a fleet into itself".into(),
            ));
        }
        {
            let src = self.get(from)?;
            let dst = self.get(into)?;
            if src.house != dst.house {
                return Err(GameError::NotOwner(format!("fleet {}", from)));
            }
            if src.system != dst.system {
                return Err(GameError::InvalidCommand(format!(
                    "fleets {} and {} are in different systems",
                    from, into
                )));
            }
        }
        let mut src = self.remove(from)?;
        let dst = self.get_mut(into)?;
        dst.squadrons.append(&mut src.squadrons);
        dst.spacelift.append(&mut src.spacelift);
        Ok(())
    }

    /// Adds a commissioned ship to a fleet: spacelift classes join the
    /// spacelift list, everything else forms a fresh one-ship squadron.
    pub fn add_ship(&mut self, fleet: FleetId, ship: Ship, ids: &mut IdGenerator) -> GameResult<()> {
        let squadron_type = ship.class.squadron_type();
        let f = self.get_mut(fleet)?;
        if ship.class.is_spacelift() {
            f.spacelift.push(ship);
        } else {
            let squadron = Squadron {
                id: ids.squadron(),
                flagship: ship,
                escorts: Vec::new(),
                kind: squadron_type,
            };
            f.squadrons.push(squadron);
        }
        Ok(())
    }

    /// Removes one ship from the fleet tree. Removing a flagship promotes
    /// the strongest escort; a squadron with no escorts left is dissolved.
    /// The caller must check `is_empty` afterwards and delete the fleet in
    /// the same transaction.
    pub fn remove_ship(&mut self, fleet: FleetId, ship: ShipId) -> GameResult<Ship> {
        let f = self.get_mut(fleet)?;

        if let Some(pos) = f.spacelift.iter().position(|s| s.id == ship) {
            return Ok(f.spacelift.remove(pos));
        }

        for si in 0..f.squadrons.len() {
            if let Some(pos) = f.squadrons[si].escorts.iter().position(|s| s.id == ship) {
                return Ok(f.squadrons[si].escorts.remove(pos));
            }
            if f.squadrons[si].flagship.id == ship {
                let squadron = &mut f.squadrons[si];
                if squadron.escorts.is_empty() {
                    let squadron = f.squadrons.remove(si);
                    return Ok(squadron.flagship);
                }
                let strongest = Self::strongest_escort(&squadron.escorts);
                let new_flag = squadron.escorts.remove(strongest);
                let old_flag = std::mem::replace(&mut squadron.flagship, new_flag);
                return Ok(old_flag);
            }
        }
        Err(GameError::ShipNotFound(ship))
    }

    /// Largest hull first; ties break toward the lower ship id.
    fn strongest_escort(escorts: &[Ship]) -> usize {
        let mut best = 0;
        for (i, ship) in escorts.iter().enumerate().skip(1) {
            let cur = (ship.class as u8, std::cmp::Reverse(ship.id));
            let top = (escorts[best].class as u8, std::cmp::Reverse(escorts[best].id));
            if cur > top {
                best = i;
            }
        }
        best
    }

    /// Detaches the listed ships into a brand-new fleet at the same system.
    pub fn detach_ships(
        &mut self,
        fleet: FleetId,
        ships: &[ShipId],
        ids: &mut IdGenerator,
    ) -> GameResult<FleetId> {
        let (house, system) = {
            let f = self.get(fleet)?;
            (f.house, f.system)
        };
        // Pull the ships out first so a bad id aborts before any new fleet
        // exists.
        let mut pulled = Vec::with_capacity(ships.len());
        for &ship in ships {
            match self.remove_ship(fleet, ship) {
                Ok(s) => pulled.push(s),
                Err(e) => {
                    // Put the already-pulled ships back before failing.
                    for s in pulled {
                        let _ = self.add_ship(fleet, s, ids);
                    }
                    return Err(e);
                }
            }
        }
        let new_id = ids.fleet();
        self.create_fleet(new_id, house, system);
        for ship in pulled {
            self.add_ship(new_id, ship, ids)?;
        }
        Ok(new_id)
    }

    /// Moves ships between two same-house fleets in the same system.
    pub fn transfer_ships(
        &mut self,
        from: FleetId,
        to: FleetId,
        ships: &[ShipId],
        ids: &mut IdGenerator,
    ) -> GameResult<()> {
        {
            let src = self.get(from)?;
            let dst = self.get(to)?;
            if src.house != dst.house {
                return Err(GameError::NotOwner(format!("fleet {}", to)));
            }
            if src.system != dst.system {
                return Err(GameError::InvalidCommand(format!(
                    "fleets {} and {} are in different systems",
                    from, to
                )));
            }
        }
        for &ship in ships {
            let s = self.remove_ship(from, ship)?;
            self.add_ship(to, s, ids)?;
        }
        Ok(())
    }

    /// Moves a whole squadron between two same-house fleets in the same
    /// system.
    pub fn transfer_squadron(
        &mut self,
        from: FleetId,
        squadron: SquadronId,
        to: FleetId,
    ) -> GameResult<()> {
        {
            let src = self.get(from)?;
            let dst = self.get(to)?;
            if src.house != dst.house {
                return Err(GameError::NotOwner(format!("fleet {}", to)));
            }
            if src.system != dst.system {
                return Err(GameError::InvalidCommand(format!(
                    "fleets {} and {} are in different systems",
                    from, to
                )));
            }
        }
        let src = self.get_mut(from)?;
        let pos = src
            .squadrons
            .iter()
            .position(|s| s.id == squadron)
            .ok_or(GameError::SquadronNotFound(squadron))?;
        let sq = src.squadrons.remove(pos);
        self.get_mut(to)?.squadrons.push(sq);
        Ok(())
    }

    /// Moves one escort between two squadrons of the same fleet.
    pub fn transfer_ship_between_squadrons(
        &mut self,
        fleet: FleetId,
        from_squadron: SquadronId,
        to_squadron: SquadronId,
        ship: ShipId,
    ) -> GameResult<()> {
        let f = self.get_mut(fleet)?;
        let from_pos = f
            .squadrons
            .iter()
            .position(|s| s.id == from_squadron)
            .ok_or(GameError::SquadronNotFound(from_squadron))?;
        let to_pos = f
            .squadrons
            .iter()
            .position(|s| s.id == to_squadron)
            .ok_or(GameError::SquadronNotFound(to_squadron))?;
        if from_pos == to_pos {
            return Err(GameError::InvalidCommand(
                "source and destination squadron are the same".into(),
            ));
        }
        let escort_pos = f.squadrons[from_pos]
            .escorts
            .iter()
            .position(|s| s.id == ship)
            .ok_or(GameError::ShipNotFound(ship))?;
        let moved = f.squadrons[from_pos].escorts.remove(escort_pos);
        f.squadrons[to_pos].escorts.push(moved);
        Ok(())
    }

    /// Total squadrons a house operates; Intel squadrons (scouts) are
    /// exempt from the cap and not counted.
    pub fn squadron_count_for_cap(&self, house: HouseId) -> usize {
        self.fleets
            .values()
            .filter(|f| f.house == house)
            .flat_map(|f| f.squadrons.iter())
            .filter(|s| s.kind != SquadronType::Intel)
            .count()
    }

    /// House-wide count of a ship class (planet-breaker cap check).
    pub fn count_class(&self, house: HouseId, class: ShipClass) -> usize {
        self.fleets
            .values()
            .filter(|f| f.house == house)
            .flat_map(|f| f.ships())
            .filter(|s| s.class == class)
            .count()
    }
}
