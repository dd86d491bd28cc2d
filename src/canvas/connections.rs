//! Edge-snap connections between cards.
//!
//! An undirected adjacency plus the groups derived from it. Groups are
//! the unit of joint movement: dragging any member translates the whole
//! group. A group only exists while it has at least two members; anything
//! smaller is pruned and its cards revert to ungrouped.

use std::collections::{HashMap, HashSet};

use super::DocPath;

/// Opaque group token, allocated from a monotonic counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub(crate) u64);

#[derive(Debug, Default)]
pub struct ConnectionGraph {
    adjacency: HashMap<DocPath, HashSet<DocPath>>,
    groups: HashMap<GroupId, HashSet<DocPath>>,
    group_of: HashMap<DocPath, GroupId>,
    next_group_id: u64,
}

impl ConnectionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects two cards, merging their groups.
    ///
    /// Returns the group both cards belong to afterwards, or `None` for a
    /// self-connection, which is ignored.
    pub fn connect(&mut self, a: &DocPath, b: &DocPath) -> Option<GroupId> {
        if a == b {
            return None;
        }

        self.adjacency
            .entry(a.clone())
            .or_default()
            .insert(b.clone());
        self.adjacency
            .entry(b.clone())
            .or_default()
            .insert(a.clone());

        let id = match (self.group_of.get(a).copied(), self.group_of.get(b).copied()) {
            (Some(ga), Some(gb)) if ga == gb => ga,
            (Some(ga), Some(gb)) => {
                // Merge the smaller-id group away so repeated connects
                // stay deterministic.
                let (keep, gone) = if ga < gb { (ga, gb) } else { (gb, ga) };
                let members = self.groups.remove(&gone).unwrap_or_default();
                for member in &members {
                    self.group_of.insert(member.clone(), keep);
                }
                self.groups.entry(keep).or_default().extend(members);
                keep
            }
            (Some(g), None) => {
                self.groups.entry(g).or_default().insert(b.clone());
                self.group_of.insert(b.clone(), g);
                g
            }
            (None, Some(g)) => {
                self.groups.entry(g).or_default().insert(a.clone());
                self.group_of.insert(a.clone(), g);
                g
            }
            (None, None) => {
                self.next_group_id += 1;
                let g = GroupId(self.next_group_id);
                self.groups
                    .insert(g, HashSet::from([a.clone(), b.clone()]));
                self.group_of.insert(a.clone(), g);
                self.group_of.insert(b.clone(), g);
                g
            }
        };

        Some(id)
    }

    /// Removes a card from every adjacency and from its group.
    ///
    /// The remaining members of the old group are re-partitioned into
    /// connected components; components that shrink below two cards
    /// revert to ungrouped.
    pub fn disconnect(&mut self, path: &DocPath) {
        let Some(neighbors) = self.adjacency.remove(path) else {
            return;
        };
        for neighbor in &neighbors {
            if let Some(set) = self.adjacency.get_mut(neighbor) {
                set.remove(path);
                if set.is_empty() {
                    self.adjacency.remove(neighbor);
                }
            }
        }

        let Some(group) = self.group_of.remove(path) else {
            return;
        };
        let Some(mut members) = self.groups.remove(&group) else {
            return;
        };
        members.remove(path);
        for member in &members {
            self.group_of.remove(member);
        }

        // Deterministic order so component ids do not depend on hashing.
        let mut remaining: Vec<DocPath> = members.into_iter().collect();
        remaining.sort();

        let mut kept_original = false;
        let mut assigned: HashSet<DocPath> = HashSet::new();
        for start in remaining {
            if assigned.contains(&start) {
                continue;
            }
            let component = self.component_of(&start);
            assigned.extend(component.iter().cloned());
            if component.len() < 2 {
                continue;
            }

            let id = if !kept_original {
                kept_original = true;
                group
            } else {
                self.next_group_id += 1;
                GroupId(self.next_group_id)
            };
            for member in &component {
                self.group_of.insert(member.clone(), id);
            }
            self.groups.insert(id, component);
        }
    }

    /// Drops a card from the graph entirely; used when its state is
    /// removed.
    pub fn remove(&mut self, path: &DocPath) {
        self.disconnect(path);
    }

    pub fn connected(&self, a: &DocPath, b: &DocPath) -> bool {
        self.adjacency
            .get(a)
            .is_some_and(|set| set.contains(b))
    }

    pub fn neighbors(&self, path: &DocPath) -> impl Iterator<Item = &DocPath> {
        self.adjacency.get(path).into_iter().flatten()
    }

    pub fn group_of(&self, path: &DocPath) -> Option<GroupId> {
        self.group_of.get(path).copied()
    }

    /// The whole connected group of a card, or just the card itself when
    /// it is ungrouped. Drags translate every returned member.
    pub fn group_members(&self, path: &DocPath) -> HashSet<DocPath> {
        match self.group_of.get(path) {
            Some(group) => self.groups[group].clone(),
            None => HashSet::from([path.clone()]),
        }
    }

    pub fn groups(&self) -> impl Iterator<Item = (GroupId, &HashSet<DocPath>)> {
        self.groups.iter().map(|(&id, members)| (id, members))
    }

    fn component_of(&self, start: &DocPath) -> HashSet<DocPath> {
        let mut component = HashSet::from([start.clone()]);
        let mut queue = vec![start.clone()];
        while let Some(path) = queue.pop() {
            for neighbor in self.neighbors(&path) {
                if component.insert(neighbor.clone()) {
                    queue.push(neighbor.clone());
                }
            }
        }
        component
    }

    #[cfg(test)]
    pub(crate) fn verify_invariants(&self) {
        // Adjacency is symmetric and free of self-loops and empty sets.
        for (path, neighbors) in &self.adjacency {
            assert!(!neighbors.is_empty(), "empty adjacency set for {path}");
            for neighbor in neighbors {
                assert_ne!(path, neighbor, "self-connection on {path}");
                assert!(
                    self.connected(neighbor, path),
                    "asymmetric connection {path} -> {neighbor}"
                );
            }
        }

        // Groups have at least two members and partition their cards.
        let mut grouped = std::collections::HashSet::new();
        for (id, members) in &self.groups {
            assert!(members.len() >= 2, "group {id:?} below two members");
            for member in members {
                assert!(
                    grouped.insert(member.clone()),
                    "{member} appears in more than one group"
                );
                assert_eq!(
                    self.group_of.get(member),
                    Some(id),
                    "group index out of sync for {member}"
                );
                // Every member is connected to someone in its group.
                assert!(
                    self.neighbors(member)
                        .any(|neighbor| members.contains(neighbor)),
                    "{member} has no connection into its group"
                );
            }
        }
        assert_eq!(
            grouped.len(),
            self.group_of.len(),
            "group index and membership disagree"
        );
    }
}
