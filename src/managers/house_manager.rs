// src/managers/house_manager.rs
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::entities::House;
use crate::core::types::*;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HouseManager {
    houses: BTreeMap<HouseId, House>,
    next_id: HouseId,
}

impl HouseManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_house(&mut self, name: String) -> GameResult<HouseId> {
        let id = self.next_id;
        self.next_id += 1;
        self.houses.insert(id, House::new(id, name));
        Ok(id)
    }

    pub fn get(&self, id: HouseId) -> GameResult<&House> {
        self.houses.get(&id).ok_or(GameError::HouseNotFound(id))
    }

    pub fn get_mut(&mut self, id: HouseId) -> GameResult<&mut House> {
        self.houses.get_mut(&id).ok_or(GameError::HouseNotFound(id))
    }

    pub fn contains(&self, id: HouseId) -> bool {
        self.houses.contains_key(&id)
    }

    /// Ascending id order; every phase iterates houses this way.
    pub fn ids(&self) -> Vec<HouseId> {
        self.houses.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &House> {
        self.houses.values()
    }

    pub fn len(&self) -> usize {
        self.houses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.houses.is_empty()
    }

    pub fn credit(&mut self, id: HouseId, amount: i64) -> GameResult<()> {
        let house = self.get_mut(id)?;
        house.treasury += amount;
        Ok(())
    }

    /// Debits only when the treasury covers the full amount.
    pub fn debit(&mut self, id: HouseId, amount: i64) -> GameResult<()> {
        let house = self.get_mut(id)?;
        if house.treasury < amount {
            return Err(GameError::InsufficientTreasury {
                required: amount,
                available: house.treasury,
            });
        }
        house.treasury -= amount;
        Ok(())
    }

    /// Diplomatic state between two houses; belligerence is checked in
    /// either direction so an undeclared victim still fights back.
    pub fn are_belligerent(&self, a: HouseId, b: HouseId) -> bool {
        if a == b {
            return false;
        }
        let ab = self
            .houses
            .get(&a)
            .map(|h| h.relation_to(b))
            .unwrap_or(DiplomaticStatus::Neutral);
        let ba = self
            .houses
            .get(&b)
            .map(|h| h.relation_to(a))
            .unwrap_or(DiplomaticStatus::Neutral);
        ab.is_belligerent() || ba.is_belligerent()
    }
}
