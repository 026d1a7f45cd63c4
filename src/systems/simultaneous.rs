// src/systems/simultaneous.rs
//! Simultaneous-resolution protocol. Order categories where execution order
//! would hand out first-mover advantage (blockades, planetary assaults,
//! colonization races, covert strikes on one target) go through this
//! funnel: collect every candidate, sort by a deterministic key, draw all
//! randomness for a conflict group before any state change, then apply
//! effects in one pass.

use crate::core::types::{FleetId, HouseId};

/// One candidate order in a simultaneous category.
#[derive(Debug, Clone)]
pub struct Submission<T> {
    /// Conflict-group key (colony id, system id, target house id...).
    pub target: u64,
    pub house: HouseId,
    pub fleet: FleetId,
    pub payload: T,
}

/// Canonical ordering: (target, attacker house, fleet).
pub fn sort_submissions<T>(submissions: &mut [Submission<T>]) {
    submissions.sort_by_key(|s| (s.target, s.house, s.fleet));
}

/// Sorts and partitions into conflict groups, one per target, groups in
/// ascending target order.
pub fn into_groups<T>(mut submissions: Vec<Submission<T>>) -> Vec<(u64, Vec<Submission<T>>)> {
    sort_submissions(&mut submissions);
    let mut groups: Vec<(u64, Vec<Submission<T>>)> = Vec::new();
    for sub in submissions {
        match groups.last_mut() {
            Some((target, members)) if *target == sub.target => members.push(sub),
            _ => groups.push((sub.target, vec![sub])),
        }
    }
    groups
}

/// Winner-takes-all selection inside one group: the lowest fleet id claims
/// the prize (the same tie-break Rendezvous uses for its host).
pub fn winner_index<T>(group: &[Submission<T>]) -> Option<usize> {
    group
        .iter()
        .enumerate()
        .min_by_key(|(_, s)| (s.fleet, s.house))
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_are_sorted_and_partitioned() {
        let subs = vec![
            Submission { target: 2, house: 1, fleet: 9, payload: () },
            Submission { target: 1, house: 0, fleet: 4, payload: () },
            Submission { target: 2, house: 0, fleet: 7, payload: () },
        ];
        let groups = into_groups(subs);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, 1);
        assert_eq!(groups[1].1.len(), 2);
        assert_eq!(groups[1].1[0].house, 0);
    }

    #[test]
    fn winner_is_lowest_fleet_id() {
        let group = vec![
            Submission { target: 5, house: 0, fleet: 7, payload: () },
            Submission { target: 5, house: 1, fleet: 3, payload: () },
        ];
        assert_eq!(winner_index(&group), Some(1));
    }
}
