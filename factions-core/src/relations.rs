//! Directed relation edges between factions and the traversals over them.
//!
//! The graph stores exactly what it is told. Ally and Enemy edges are meant
//! to be symmetric, and a `Liege` edge from V to L mirrors a `Vassal` edge
//! from L to V, but keeping both directions in step is the job of
//! [`crate::diplomacy`]. Traversals tolerate inconsistent or cyclic data.

use crate::state::FactionId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Ally,
    Enemy,
    /// The recording faction is the liege; the peer is its vassal.
    Vassal,
    /// The recording faction is the vassal; the peer is its liege.
    Liege,
}

/// A single directed edge, used for checkpoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationEdge {
    pub from: FactionId,
    pub to: FactionId,
    pub kind: RelationKind,
}

#[derive(Debug, Clone, Default)]
pub struct RelationGraph {
    edges: HashMap<FactionId, HashMap<FactionId, RelationKind>>,
}

impl RelationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// The relation `from` records toward `to`.
    pub fn relation_of(&self, from: FactionId, to: FactionId) -> Option<RelationKind> {
        self.edges.get(&from).and_then(|m| m.get(&to)).copied()
    }

    /// Set the directed edge `from -> to`, replacing any previous kind.
    ///
    /// Self-loops are refused and reported as `false`.
    pub fn set_relation(&mut self, from: FactionId, to: FactionId, kind: RelationKind) -> bool {
        if from == to {
            log::warn!("Refusing {:?} self-relation on faction {}", kind, from);
            return false;
        }
        self.edges.entry(from).or_default().insert(to, kind);
        true
    }

    pub fn clear_relation(&mut self, from: FactionId, to: FactionId) -> Option<RelationKind> {
        let removed = self.edges.get_mut(&from).and_then(|m| m.remove(&to));
        if self.edges.get(&from).is_some_and(|m| m.is_empty()) {
            self.edges.remove(&from);
        }
        removed
    }

    pub fn peers_with(&self, id: FactionId, kind: RelationKind) -> BTreeSet<FactionId> {
        self.edges
            .get(&id)
            .map(|m| {
                m.iter()
                    .filter(|(_, k)| **k == kind)
                    .map(|(peer, _)| *peer)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn vassals_of(&self, id: FactionId) -> BTreeSet<FactionId> {
        self.peers_with(id, RelationKind::Vassal)
    }

    pub fn liege_of(&self, id: FactionId) -> Option<FactionId> {
        let lieges = self.peers_with(id, RelationKind::Liege);
        if lieges.len() > 1 {
            log::warn!(
                "Faction {} records {} lieges; using the lowest id",
                id,
                lieges.len()
            );
        }
        lieges.into_iter().next()
    }

    pub fn is_hostile(&self, a: FactionId, b: FactionId) -> bool {
        self.relation_of(a, b) == Some(RelationKind::Enemy)
    }

    pub fn is_ally(&self, a: FactionId, b: FactionId) -> bool {
        self.relation_of(a, b) == Some(RelationKind::Ally)
    }

    /// Remove every edge into or out of `id`. Returns how many were dropped.
    pub fn purge(&mut self, id: FactionId) -> usize {
        let mut removed = self.edges.remove(&id).map(|m| m.len()).unwrap_or(0);
        for peers in self.edges.values_mut() {
            if peers.remove(&id).is_some() {
                removed += 1;
            }
        }
        self.edges.retain(|_, peers| !peers.is_empty());
        removed
    }

    /// Every faction politically entangled with `start`, including `start`.
    ///
    /// Breadth-first: each visited faction contributes its liege, its liege's
    /// vassals and its own vassals. The visited set bounds the walk even when
    /// the edges contain cycles.
    pub fn vassalage_tree(&self, start: FactionId) -> BTreeSet<FactionId> {
        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::new();
        visited.insert(start);
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            let mut found = Vec::new();
            if let Some(liege) = self.liege_of(current) {
                found.push(liege);
                found.extend(self.vassals_of(liege));
            }
            found.extend(self.vassals_of(current));

            for faction in found {
                if visited.insert(faction) {
                    queue.push_back(faction);
                }
            }
        }
        visited
    }

    /// Every direct and indirect vassal of `id`, excluding `id` itself.
    pub fn descendants(&self, id: FactionId) -> BTreeSet<FactionId> {
        let mut out = BTreeSet::new();
        let mut stack: Vec<FactionId> = self.vassals_of(id).into_iter().collect();
        while let Some(next) = stack.pop() {
            if next == id || !out.insert(next) {
                continue;
            }
            stack.extend(self.vassals_of(next));
        }
        out
    }

    /// All edges, sorted.
    pub fn edges(&self) -> Vec<RelationEdge> {
        let mut out: Vec<RelationEdge> = self
            .edges
            .iter()
            .flat_map(|(from, peers)| {
                peers.iter().map(move |(to, kind)| RelationEdge {
                    from: *from,
                    to: *to,
                    kind: *kind,
                })
            })
            .collect();
        out.sort();
        out
    }
}

impl FromIterator<RelationEdge> for RelationGraph {
    fn from_iter<I: IntoIterator<Item = RelationEdge>>(iter: I) -> Self {
        let mut graph = RelationGraph::new();
        for edge in iter {
            graph.set_relation(edge.from, edge.to, edge.kind);
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn vassalize(graph: &mut RelationGraph, vassal: u32, liege: u32) {
        graph.set_relation(FactionId(liege), FactionId(vassal), RelationKind::Vassal);
        graph.set_relation(FactionId(vassal), FactionId(liege), RelationKind::Liege);
    }

    fn ids(raw: &[u32]) -> BTreeSet<FactionId> {
        raw.iter().copied().map(FactionId).collect()
    }

    #[test]
    fn test_self_loop_rejected() {
        let mut graph = RelationGraph::new();
        assert!(!graph.set_relation(FactionId(1), FactionId(1), RelationKind::Liege));
        assert_eq!(graph.relation_of(FactionId(1), FactionId(1)), None);
    }

    #[test]
    fn test_one_kind_per_ordered_pair() {
        let mut graph = RelationGraph::new();
        graph.set_relation(FactionId(1), FactionId(2), RelationKind::Ally);
        graph.set_relation(FactionId(1), FactionId(2), RelationKind::Enemy);
        assert_eq!(
            graph.relation_of(FactionId(1), FactionId(2)),
            Some(RelationKind::Enemy)
        );
        assert_eq!(graph.edges().len(), 1);
    }

    #[test]
    fn test_liege_and_vassals() {
        let mut graph = RelationGraph::new();
        vassalize(&mut graph, 2, 1);
        vassalize(&mut graph, 3, 1);

        assert_eq!(graph.liege_of(FactionId(2)), Some(FactionId(1)));
        assert_eq!(graph.liege_of(FactionId(1)), None);
        assert_eq!(graph.vassals_of(FactionId(1)), ids(&[2, 3]));
    }

    #[test]
    fn test_vassalage_tree_reaches_siblings_and_grandchildren() {
        let mut graph = RelationGraph::new();
        vassalize(&mut graph, 2, 1);
        vassalize(&mut graph, 3, 1);
        vassalize(&mut graph, 4, 3);
        // Unrelated pair
        vassalize(&mut graph, 6, 5);

        assert_eq!(graph.vassalage_tree(FactionId(2)), ids(&[1, 2, 3, 4]));
        assert_eq!(graph.vassalage_tree(FactionId(6)), ids(&[5, 6]));
        assert_eq!(graph.vassalage_tree(FactionId(9)), ids(&[9]));
    }

    #[test]
    fn test_traversals_survive_cycles() {
        let mut graph = RelationGraph::new();
        // Corrupt data: 1 -> 2 -> 3 -> 1
        vassalize(&mut graph, 2, 1);
        vassalize(&mut graph, 3, 2);
        vassalize(&mut graph, 1, 3);

        assert_eq!(graph.vassalage_tree(FactionId(1)), ids(&[1, 2, 3]));
        assert_eq!(graph.descendants(FactionId(1)), ids(&[2, 3]));
    }

    #[test]
    fn test_purge_removes_both_directions() {
        let mut graph = RelationGraph::new();
        vassalize(&mut graph, 2, 1);
        graph.set_relation(FactionId(3), FactionId(2), RelationKind::Enemy);
        graph.set_relation(FactionId(2), FactionId(3), RelationKind::Enemy);

        assert_eq!(graph.purge(FactionId(2)), 4);
        assert!(graph.edges().is_empty());
    }

    /// Random forest as a parent list: faction `i + 1` optionally swears to a lower id.
    fn forest_strategy() -> impl Strategy<Value = Vec<Option<u32>>> {
        (2..12usize).prop_flat_map(|n| {
            proptest::collection::vec(proptest::option::of(0..1000u32), n).prop_map(|raw| {
                raw.into_iter()
                    .enumerate()
                    .map(|(i, p)| if i == 0 { None } else { p.map(|v| v % i as u32 + 1) })
                    .collect()
            })
        })
    }

    proptest! {
        #[test]
        fn prop_vassalage_tree_is_symmetric(parents in forest_strategy()) {
            let mut graph = RelationGraph::new();
            for (i, parent) in parents.iter().enumerate() {
                if let Some(liege) = parent {
                    vassalize(&mut graph, i as u32 + 1, *liege);
                }
            }

            for start in 1..=parents.len() as u32 {
                let tree = graph.vassalage_tree(FactionId(start));
                prop_assert!(tree.contains(&FactionId(start)));
                prop_assert_eq!(&tree, &graph.vassalage_tree(FactionId(start)));
                for member in &tree {
                    prop_assert!(graph.vassalage_tree(*member).contains(&FactionId(start)));
                }
            }
        }
    }
}
