// src/core/starmap.rs
//! The star map: systems joined by jump lanes, an unweighted undirected
//! graph. Adjacency is the primary query; shortest path by lane count the
//! secondary one. Neighbor iteration is sorted so path choice is stable
//! across runs.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::core::types::{GameError, GameResult, PlanetClass, ResourceRating, SystemId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Planet {
    pub class: PlanetClass,
    pub resources: ResourceRating,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarSystem {
    pub id: SystemId,
    pub name: String,
    pub planet: Option<Planet>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StarMap {
    systems: BTreeMap<SystemId, StarSystem>,
    /// Normalized lane set: (low, high) per undirected lane.
    lanes: BTreeSet<(SystemId, SystemId)>,
}

impl StarMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_system(&mut self, system: StarSystem) {
        self.systems.insert(system.id, system);
    }

    pub fn add_lane(&mut self, a: SystemId, b: SystemId) -> GameResult<()> {
        if a == b {
            return Err(GameError::InvalidCommand(format!(
                "jump lane from system {} to itself",
                a
            )));
        }
        if !self.systems.contains_key(&a) {
            return Err(GameError::SystemNotFound(a));
        }
        if !self.systems.contains_key(&b) {
            return Err(GameError::SystemNotFound(b));
        }
        self.lanes.insert((a.min(b), a.max(b)));
        Ok(())
    }

    pub fn system(&self, id: SystemId) -> GameResult<&StarSystem> {
        self.systems.get(&id).ok_or(GameError::SystemNotFound(id))
    }

    pub fn contains(&self, id: SystemId) -> bool {
        self.systems.contains_key(&id)
    }

    pub fn system_ids(&self) -> impl Iterator<Item = SystemId> + '_ {
        self.systems.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Neighbors in ascending id order.
    pub fn adjacent(&self, id: SystemId) -> Vec<SystemId> {
        let mut out = Vec::new();
        for &(a, b) in &self.lanes {
            if a == id {
                out.push(b);
            } else if b == id {
                out.push(a);
            }
        }
        out.sort_unstable();
        out
    }

    /// Breadth-first shortest path by lane count, inclusive of both ends.
    /// Ties break toward lower-id neighbors, so the route is deterministic.
    pub fn shortest_path(&self, from: SystemId, to: SystemId) -> Option<Vec<SystemId>> {
        if !self.contains(from) || !self.contains(to) {
            return None;
        }
        if from == to {
            return Some(vec![from]);
        }
        let mut parent: BTreeMap<SystemId, SystemId> = BTreeMap::new();
        let mut queue = VecDeque::new();
        queue.push_back(from);
        while let Some(current) = queue.pop_front() {
            for next in self.adjacent(current) {
                if next == from || parent.contains_key(&next) {
                    continue;
                }
                parent.insert(next, current);
                if next == to {
                    let mut path = vec![to];
                    let mut node = to;
                    while let Some(&p) = parent.get(&node) {
                        path.push(p);
                        node = p;
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(next);
            }
        }
        None
    }

    /// Lane-count distance, `None` when disconnected.
    pub fn distance(&self, from: SystemId, to: SystemId) -> Option<u32> {
        self.shortest_path(from, to).map(|p| (p.len() - 1) as u32)
    }

    /// Next hop along the shortest route, `None` at destination or when
    /// disconnected.
    pub fn next_hop(&self, from: SystemId, to: SystemId) -> Option<SystemId> {
        let path = self.shortest_path(from, to)?;
        path.get(1).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(n: SystemId) -> StarMap {
        let mut map = StarMap::new();
        for id in 0..n {
            map.add_system(StarSystem {
                id,
                name: format!("S{}", id),
                planet: None,
            });
        }
        for id in 0..n {
            map.add_lane(id, (id + 1) % n).unwrap();
        }
        map
    }

    #[test]
    fn adjacency_is_sorted() {
        let map = ring(6);
        assert_eq!(map.adjacent(0), vec![1, 5]);
        assert_eq!(map.adjacent(3), vec![2, 4]);
    }

    #[test]
    fn shortest_path_goes_the_short_way_around() {
        let map = ring(6);
        assert_eq!(map.shortest_path(0, 2), Some(vec![0, 1, 2]));
        assert_eq!(map.distance(0, 3), Some(3));
        // Equidistant routes break toward the lower-id neighbor.
        assert_eq!(map.next_hop(0, 3), Some(1));
    }

    #[test]
    fn disconnected_systems_have_no_path() {
        let mut map = ring(4);
        map.add_system(StarSystem {
            id: 9,
            name: "lone".into(),
            planet: None,
        });
        assert_eq!(map.shortest_path(0, 9), None);
        assert_eq!(map.distance(0, 9), None);
    }

    #[test]
    fn self_lane_is_rejected() {
        let mut map = ring(3);
        assert!(map.add_lane(1, 1).is_err());
    }
}
