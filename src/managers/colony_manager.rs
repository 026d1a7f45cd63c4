// src/managers/colony_manager.rs
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::entities::{Colony, Facility};
use crate::core::types::*;

/// Owns colonies and their facilities. Exactly one colony per system; the
/// secondary index enforces that at creation time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColonyManager {
    colonies: BTreeMap<ColonyId, Colony>,
    facilities: BTreeMap<FacilityId, Facility>,
    by_system: BTreeMap<SystemId, ColonyId>,
}

impl ColonyManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_colony(&mut self, colony: Colony) -> GameResult<ColonyId> {
        if self.by_system.contains_key(&colony.system) {
            return Err(GameError::InvariantViolation(format!(
                "system {} already has a colony",
                colony.system
            )));
        }
        let id = colony.id;
        self.by_system.insert(colony.system, id);
        self.colonies.insert(id, colony);
        Ok(id)
    }

    pub fn get(&self, id: ColonyId) -> GameResult<&Colony> {
        self.colonies.get(&id).ok_or(GameError::ColonyNotFound(id))
    }

    pub fn get_mut(&mut self, id: ColonyId) -> GameResult<&mut Colony> {
        self.colonies
            .get_mut(&id)
            .ok_or(GameError::ColonyNotFound(id))
    }

    pub fn contains(&self, id: ColonyId) -> bool {
        self.colonies.contains_key(&id)
    }

    /// Ascending id order.
    pub fn ids(&self) -> Vec<ColonyId> {
        self.colonies.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Colony> {
        self.colonies.values()
    }

    pub fn len(&self) -> usize {
        self.colonies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colonies.is_empty()
    }

    pub fn colony_in_system(&self, system: SystemId) -> Option<ColonyId> {
        self.by_system.get(&system).copied()
    }

    pub fn ids_of_house(&self, house: HouseId) -> Vec<ColonyId> {
        self.colonies
            .values()
            .filter(|c| c.house == house)
            .map(|c| c.id)
            .collect()
    }

    pub fn count_of_house(&self, house: HouseId) -> usize {
        self.colonies.values().filter(|c| c.house == house).count()
    }

    // Facility arena

    pub fn insert_facility(&mut self, facility: Facility) -> FacilityId {
        let id = facility.id;
        self.facilities.insert(id, facility);
        id
    }

    pub fn facility(&self, id: FacilityId) -> GameResult<&Facility> {
        self.facilities
            .get(&id)
            .ok_or(GameError::FacilityNotFound(id))
    }

    pub fn facility_mut(&mut self, id: FacilityId) -> GameResult<&mut Facility> {
        self.facilities
            .get_mut(&id)
            .ok_or(GameError::FacilityNotFound(id))
    }

    pub fn has_facility(&self, id: FacilityId) -> bool {
        self.facilities.contains_key(&id)
    }

    /// Removes the facility record and its reference on the owning colony.
    pub fn remove_facility(&mut self, id: FacilityId) -> GameResult<Facility> {
        let facility = self
            .facilities
            .remove(&id)
            .ok_or(GameError::FacilityNotFound(id))?;
        if let Ok(colony) = self.get_mut(facility.colony) {
            colony.facility_list_mut(facility.kind).retain(|&f| f != id);
        }
        Ok(facility)
    }

    pub fn facility_ids(&self) -> Vec<FacilityId> {
        self.facilities.keys().copied().collect()
    }

    /// Temporarily pulls a facility record out of the arena (the colony's
    /// reference stays). Pair with `restore_facility`.
    pub fn take_facility(&mut self, id: FacilityId) -> Option<Facility> {
        self.facilities.remove(&id)
    }

    pub fn restore_facility(&mut self, facility: Facility) {
        self.facilities.insert(facility.id, facility);
    }

    /// All facilities of one kind at a colony, ascending id order.
    pub fn facilities_of_kind(&self, colony: ColonyId, kind: FacilityKind) -> Vec<FacilityId> {
        match self.get(colony) {
            Ok(c) => c.facility_list(kind).iter().copied().collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Recompute effective docks after a construction-tech change.
    pub fn refresh_effective_docks(&mut self, colony: ColonyId, cst: u8, bonus_per_level: f64) {
        let ids: Vec<FacilityId> = match self.get(colony) {
            Ok(c) => c.facility_ids().collect(),
            Err(_) => return,
        };
        for id in ids {
            if let Some(f) = self.facilities.get_mut(&id) {
                let scale = 1.0 + bonus_per_level * f64::from(cst.saturating_sub(1));
                f.effective_docks = ((f64::from(f.base_docks) * scale).floor() as u8).max(1);
            }
        }
    }
}
