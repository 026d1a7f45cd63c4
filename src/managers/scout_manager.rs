// src/managers/scout_manager.rs
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::entities::SpyScout;
use crate::core::types::*;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoutManager {
    scouts: BTreeMap<ScoutId, SpyScout>,
}

impl ScoutManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, scout: SpyScout) -> ScoutId {
        let id = scout.id;
        self.scouts.insert(id, scout);
        id
    }

    pub fn get(&self, id: ScoutId) -> GameResult<&SpyScout> {
        self.scouts.get(&id).ok_or(GameError::ScoutNotFound(id))
    }

    pub fn get_mut(&mut self, id: ScoutId) -> GameResult<&mut SpyScout> {
        self.scouts.get_mut(&id).ok_or(GameError::ScoutNotFound(id))
    }

    pub fn remove(&mut self, id: ScoutId) -> GameResult<SpyScout> {
        self.scouts.remove(&id).ok_or(GameError::ScoutNotFound(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpyScout> {
        self.scouts.values()
    }

    pub fn len(&self) -> usize {
        self.scouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scouts.is_empty()
    }

    /// Deterministic iteration order for detection rolls: (house, scout id).
    pub fn ids_by_house(&self) -> Vec<ScoutId> {
        let mut ids: Vec<(HouseId, ScoutId)> =
            self.scouts.values().map(|s| (s.house, s.id)).collect();
        ids.sort_unstable();
        ids.into_iter().map(|(_, id)| id).collect()
    }

    pub fn ids_at_system(&self, system: SystemId) -> Vec<ScoutId> {
        self.scouts
            .values()
            .filter(|s| s.system == system)
            .map(|s| s.id)
            .collect()
    }
}
