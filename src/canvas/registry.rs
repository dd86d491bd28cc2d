//! The authoritative card state store.
//!
//! One entry per document path, holding everything that must survive the
//! rendered card being destroyed and recreated: geometry, manual order,
//! group membership, and the lifecycle phase. All mutation goes through
//! here; the reconciler and the interaction controller never touch card
//! geometry behind the registry's back.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use kurbo::{Point, Size};

use super::connections::{ConnectionGraph, GroupId};
use super::DocPath;

/// Lifecycle of a card's registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardPhase {
    /// In the open set; rendered unless filtered by search.
    Open,
    /// In the open set but suppressed by the session hidden list.
    Hidden,
    /// No longer open; geometry kept so reopening restores the card.
    Retained,
}

/// Authoritative visual state of one card.
#[derive(Debug, Clone, PartialEq)]
pub struct CardState {
    /// Canvas-space top-left corner.
    pub pos: Point,
    pub size: Size,

    /// Manual-sort position. Dense and unique across all entries.
    pub order_index: usize,

    /// User-resized dimensions, taking precedence over layout sizing.
    pub custom_size: Option<Size>,

    /// Cached group membership; the connection graph is authoritative.
    pub group: Option<GroupId>,

    pub phase: CardPhase,
}

#[derive(Debug, Default)]
pub struct CardRegistry {
    states: HashMap<DocPath, CardState>,
    connections: ConnectionGraph,

    /// Total number of entries ever created; drives the staggered default
    /// position so new cards do not stack at the origin.
    created: u64,
}

impl CardRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn get(&self, path: &DocPath) -> Option<&CardState> {
        self.states.get(path)
    }

    pub(crate) fn get_mut(&mut self, path: &DocPath) -> Option<&mut CardState> {
        self.states.get_mut(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DocPath, &CardState)> {
        self.states.iter()
    }

    pub fn connections(&self) -> &ConnectionGraph {
        &self.connections
    }

    /// Returns the existing state for a path, or creates one with the
    /// caller-supplied initial geometry and the next order index.
    ///
    /// The initializer receives the creation ordinal, letting free-form
    /// placement stagger consecutive cards.
    pub fn upsert_with(
        &mut self,
        path: &DocPath,
        init: impl FnOnce(u64) -> (Point, Size),
    ) -> &mut CardState {
        let order_index = self.states.len();
        match self.states.entry(path.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let (pos, size) = init(self.created);
                self.created += 1;
                entry.insert(CardState {
                    pos,
                    size,
                    order_index,
                    custom_size: None,
                    group: None,
                    phase: CardPhase::Open,
                })
            }
        }
    }

    /// Deletes the entry and compacts order indices. Prunes any group
    /// left trivial by the departure.
    pub fn remove(&mut self, path: &DocPath) {
        let Some(state) = self.states.remove(path) else {
            return;
        };
        self.connections.remove(path);
        self.refresh_group_cache();

        for other in self.states.values_mut() {
            if other.order_index > state.order_index {
                other.order_index -= 1;
            }
        }
    }

    pub(crate) fn set_phase(&mut self, path: &DocPath, phase: CardPhase) {
        if let Some(state) = self.states.get_mut(path) {
            state.phase = phase;
        }
    }

    /// All paths ordered by manual order index.
    pub fn paths_by_order(&self) -> Vec<DocPath> {
        let mut paths: Vec<_> = self.states.iter().collect();
        paths.sort_by_key(|(_, state)| state.order_index);
        paths.into_iter().map(|(path, _)| path.clone()).collect()
    }

    /// Moves a card to a new order index, shifting everything in between
    /// by one. A shift, not a swap: the dense total order is preserved.
    pub fn move_to_index(&mut self, path: &DocPath, new_index: usize) {
        let Some(state) = self.states.get(path) else {
            return;
        };
        let old_index = state.order_index;
        let new_index = new_index.min(self.states.len().saturating_sub(1));
        if old_index == new_index {
            return;
        }

        for (other, state) in self.states.iter_mut() {
            if other == path {
                continue;
            }
            if old_index < new_index {
                // Moving down: everything in (old, new] steps up.
                if state.order_index > old_index && state.order_index <= new_index {
                    state.order_index -= 1;
                }
            } else {
                // Moving up: everything in [new, old) steps down.
                if state.order_index >= new_index && state.order_index < old_index {
                    state.order_index += 1;
                }
            }
        }
        self.states.get_mut(path).unwrap().order_index = new_index;
    }

    // =========================================================================
    // Connections
    // =========================================================================

    /// Connects two cards and refreshes the group caches. No-op unless
    /// both paths have state.
    pub fn connect(&mut self, a: &DocPath, b: &DocPath) -> Option<GroupId> {
        if !self.states.contains_key(a) || !self.states.contains_key(b) {
            return None;
        }
        let group = self.connections.connect(a, b);
        self.refresh_group_cache();
        group
    }

    pub fn disconnect(&mut self, path: &DocPath) {
        self.connections.disconnect(path);
        self.refresh_group_cache();
    }

    /// The card's whole connected group, or the card alone.
    pub fn group_members(&self, path: &DocPath) -> HashSet<DocPath> {
        self.connections.group_members(path)
    }

    fn refresh_group_cache(&mut self) {
        for (path, state) in self.states.iter_mut() {
            state.group = self.connections.group_of(path);
        }
    }

    // =========================================================================
    // Layout reset
    // =========================================================================

    /// Clears geometry memory for an explicit layout reset: retained
    /// entries are dropped, custom sizes cleared, and order reassigned
    /// from the given path order. Connections survive; the hidden set is
    /// session state and is not touched here.
    pub(crate) fn reset_layout(&mut self, order: &[DocPath]) {
        let dropped: Vec<DocPath> = self
            .states
            .iter()
            .filter(|&(_, state)| state.phase == CardPhase::Retained)
            .map(|(path, _)| path.clone())
            .collect();
        for path in &dropped {
            self.connections.remove(path);
        }
        self.states
            .retain(|_, state| state.phase != CardPhase::Retained);

        let mut next = 0;
        for path in order {
            if let Some(state) = self.states.get_mut(path) {
                state.custom_size = None;
                state.order_index = next;
                next += 1;
            }
        }
        // Entries outside the given order (hidden cards) keep their
        // relative order after the visible ones.
        let mut rest: Vec<_> = self
            .states
            .iter()
            .filter(|&(path, _)| !order.contains(path))
            .map(|(path, state)| (state.order_index, path.clone()))
            .collect();
        rest.sort();
        for (_, path) in rest {
            let state = self.states.get_mut(&path).unwrap();
            state.custom_size = None;
            state.order_index = next;
            next += 1;
        }

        self.refresh_group_cache();
    }

    #[cfg(test)]
    pub(crate) fn verify_invariants(&self) {
        // Dense, unique order indices.
        let mut indices: Vec<_> = self.states.values().map(|s| s.order_index).collect();
        indices.sort_unstable();
        for (expected, actual) in indices.iter().enumerate() {
            assert_eq!(expected, *actual, "order indices must form 0..n");
        }

        // Grouped paths must have state; the graph may not reference
        // cards the registry has forgotten.
        for (_, members) in self.connections.groups() {
            for member in members {
                assert!(
                    self.states.contains_key(member),
                    "connection graph references unknown card {member}"
                );
            }
        }

        self.connections.verify_invariants();
    }
}
