//! Immutable topology snapshot
//!
//! One instant of the constellation graph: every node with its position and
//! every feasible link weighted by its length in km. Built once, never
//! mutated, shared read-only with routers.

use crate::{NodeId, Result, TopologyError};
use orbital_mechanics::Position;
use petgraph::algo::astar;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Link types in the constellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkKind {
    /// Inter-satellite link
    InterSatellite,
    /// Satellite to ground station
    Ground,
}

/// An edge (link) in a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub kind: LinkKind,
    /// Straight-line length, also the routing weight
    pub distance_km: f64,
}

impl Link {
    pub fn new(kind: LinkKind, distance_km: f64) -> Self {
        Self { kind, distance_km }
    }
}

#[derive(Debug, Clone, Copy)]
struct TopologyNode {
    id: NodeId,
    position: Position,
}

#[derive(Debug)]
pub struct TopologySnapshot {
    time_s: f64,
    graph: UnGraph<TopologyNode, Link>,
    node_index: HashMap<NodeId, NodeIndex>,
}

impl TopologySnapshot {
    /// Nodes only, no links. Duplicate ids keep their first position.
    pub(crate) fn with_nodes(time_s: f64, nodes: impl IntoIterator<Item = (NodeId, Position)>) -> Self {
        let mut graph = UnGraph::default();
        let mut node_index = HashMap::new();

        for (id, position) in nodes {
            node_index
                .entry(id)
                .or_insert_with(|| graph.add_node(TopologyNode { id, position }));
        }

        Self {
            time_s,
            graph,
            node_index,
        }
    }

    pub(crate) fn insert_link(&mut self, a: NodeIndex, b: NodeIndex, link: Link) {
        self.graph.add_edge(a, b, link);
    }

    /// Builds a snapshot from explicit nodes and links.
    ///
    /// Rejects links to unknown nodes, self-loops and a second link between
    /// the same pair.
    pub fn from_parts(
        time_s: f64,
        nodes: impl IntoIterator<Item = (NodeId, Position)>,
        links: impl IntoIterator<Item = (NodeId, NodeId, Link)>,
    ) -> Result<Self> {
        let mut snapshot = Self::with_nodes(time_s, nodes);

        for (a, b, link) in links {
            if a == b {
                return Err(TopologyError::SelfLoop(a));
            }
            let a_idx = snapshot.index_of(a)?;
            let b_idx = snapshot.index_of(b)?;
            if snapshot.graph.find_edge(a_idx, b_idx).is_some() {
                return Err(TopologyError::DuplicateLink(a, b));
            }
            snapshot.insert_link(a_idx, b_idx, link);
        }

        Ok(snapshot)
    }

    fn index_of(&self, id: NodeId) -> Result<NodeIndex> {
        self.node_index
            .get(&id)
            .copied()
            .ok_or(TopologyError::NodeNotFound(id))
    }

    pub fn time_s(&self) -> f64 {
        self.time_s
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node_index.contains_key(&id)
    }

    /// Node ids in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_weights().map(|n| n.id)
    }

    pub fn position(&self, id: NodeId) -> Option<Position> {
        self.node_index.get(&id).map(|idx| self.graph[*idx].position)
    }

    pub fn link(&self, a: NodeId, b: NodeId) -> Option<&Link> {
        let a_idx = self.node_index.get(&a)?;
        let b_idx = self.node_index.get(&b)?;
        self.graph
            .find_edge(*a_idx, *b_idx)
            .map(|edge| &self.graph[edge])
    }

    pub fn has_edge(&self, a: NodeId, b: NodeId) -> bool {
        self.link(a, b).is_some()
    }

    /// Neighbours of `id` with their link, sorted by node id
    pub fn neighbors(&self, id: NodeId) -> Vec<(NodeId, Link)> {
        let Some(idx) = self.node_index.get(&id) else {
            return Vec::new();
        };

        let mut neighbors: Vec<(NodeId, Link)> = self
            .graph
            .edges(*idx)
            .map(|edge| {
                let other = if edge.source() == *idx {
                    edge.target()
                } else {
                    edge.source()
                };
                (self.graph[other].id, *edge.weight())
            })
            .collect();
        neighbors.sort_by_key(|(id, _)| *id);
        neighbors
    }

    /// All links as (lower id, higher id, link), in insertion order
    pub fn links(&self) -> impl Iterator<Item = (NodeId, NodeId, &Link)> + '_ {
        self.graph.edge_references().map(move |e| {
            let a = self.graph[e.source()].id;
            let b = self.graph[e.target()].id;
            (a.min(b), a.max(b), e.weight())
        })
    }

    /// Shortest path by link distance, `from` and `to` included
    pub fn find_path(&self, from: NodeId, to: NodeId) -> Option<Vec<NodeId>> {
        self.find_path_by(from, to, |_, _, link| link.distance_km)
    }

    /// Shortest path under a caller-supplied edge cost.
    ///
    /// The cost receives both endpoints (lower id first) and the link; it must
    /// be non-negative. Ties resolve by node and edge insertion order, so the
    /// same snapshot always yields the same path.
    pub fn find_path_by<F>(&self, from: NodeId, to: NodeId, mut cost: F) -> Option<Vec<NodeId>>
    where
        F: FnMut(NodeId, NodeId, &Link) -> f64,
    {
        let from_idx = *self.node_index.get(&from)?;
        let to_idx = *self.node_index.get(&to)?;

        // A* with a zero heuristic is Dijkstra that also returns the path
        let (_, path) = astar(
            &self.graph,
            from_idx,
            |n| n == to_idx,
            |e| {
                let a = self.graph[e.source()].id;
                let b = self.graph[e.target()].id;
                cost(a.min(b), a.max(b), e.weight())
            },
            |_| 0.0,
        )?;

        Some(path.into_iter().map(|idx| self.graph[idx].id).collect())
    }

    /// Total link distance along `path`; `None` if a hop is not a link
    pub fn path_length_km(&self, path: &[NodeId]) -> Option<f64> {
        path.windows(2)
            .map(|hop| self.link(hop[0], hop[1]).map(|l| l.distance_km))
            .sum()
    }

    pub fn stats(&self) -> SnapshotStats {
        let satellites = self.nodes().filter(|n| n.is_satellite()).count();
        let mut isl_links = 0;
        let mut ground_links = 0;

        for link in self.graph.edge_weights() {
            match link.kind {
                LinkKind::InterSatellite => isl_links += 1,
                LinkKind::Ground => ground_links += 1,
            }
        }

        SnapshotStats {
            time_s: self.time_s,
            total_nodes: self.node_count(),
            satellites,
            ground_stations: self.node_count() - satellites,
            total_links: self.edge_count(),
            isl_links,
            ground_links,
        }
    }
}

/// Snapshot statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapshotStats {
    pub time_s: f64,
    pub total_nodes: usize,
    pub satellites: usize,
    pub ground_stations: usize,
    pub total_links: usize,
    pub isl_links: usize,
    pub ground_links: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn sat(plane: u32, slot: u32) -> NodeId {
        NodeId::satellite(plane, slot)
    }

    fn isl(d: f64) -> Link {
        Link::new(LinkKind::InterSatellite, d)
    }

    fn create_test_snapshot() -> TopologySnapshot {
        let nodes = [sat(0, 0), sat(0, 1), sat(0, 2), sat(0, 3), NodeId::Ground]
            .into_iter()
            .map(|id| (id, Vector3::zeros()));

        let links = vec![
            (sat(0, 0), sat(0, 1), isl(1.0)),
            (sat(0, 1), sat(0, 2), isl(1.0)),
            (sat(0, 0), sat(0, 3), isl(2.0)),
            (sat(0, 3), sat(0, 2), isl(1.0)),
            (NodeId::Ground, sat(0, 0), Link::new(LinkKind::Ground, 800.0)),
        ];

        TopologySnapshot::from_parts(3.0, nodes, links).unwrap()
    }

    #[test]
    fn test_find_path_prefers_shorter_distance() {
        let snapshot = create_test_snapshot();
        let path = snapshot.find_path(sat(0, 0), sat(0, 2)).unwrap();
        assert_eq!(path, vec![sat(0, 0), sat(0, 1), sat(0, 2)]);
        assert_eq!(snapshot.path_length_km(&path), Some(2.0));
    }

    #[test]
    fn test_find_path_with_custom_cost() {
        let snapshot = create_test_snapshot();
        // Make the 0-1 link expensive so the detour through slot 3 wins
        let path = snapshot
            .find_path_by(sat(0, 0), sat(0, 2), |a, b, link| {
                if (a, b) == (sat(0, 0), sat(0, 1)) {
                    100.0
                } else {
                    link.distance_km
                }
            })
            .unwrap();
        assert_eq!(path, vec![sat(0, 0), sat(0, 3), sat(0, 2)]);
    }

    #[test]
    fn test_no_path_between_components() {
        let nodes = [(sat(0, 0), Vector3::zeros()), (sat(1, 0), Vector3::zeros())];
        let snapshot = TopologySnapshot::from_parts(0.0, nodes, Vec::new()).unwrap();
        assert!(snapshot.find_path(sat(0, 0), sat(1, 0)).is_none());
        assert!(snapshot.find_path(sat(0, 0), sat(9, 9)).is_none());
    }

    #[test]
    fn test_neighbors_sorted() {
        let snapshot = create_test_snapshot();
        let neighbors: Vec<NodeId> = snapshot.neighbors(sat(0, 0)).into_iter().map(|(id, _)| id).collect();
        assert_eq!(neighbors, vec![sat(0, 1), sat(0, 3), NodeId::Ground]);
        assert!(snapshot.neighbors(sat(5, 5)).is_empty());
    }

    #[test]
    fn test_rejects_bad_links() {
        let nodes = || [(sat(0, 0), Vector3::zeros()), (sat(0, 1), Vector3::zeros())];

        let self_loop = TopologySnapshot::from_parts(0.0, nodes(), vec![(sat(0, 0), sat(0, 0), isl(1.0))]);
        assert_eq!(self_loop.err(), Some(TopologyError::SelfLoop(sat(0, 0))));

        let duplicate = TopologySnapshot::from_parts(
            0.0,
            nodes(),
            vec![(sat(0, 0), sat(0, 1), isl(1.0)), (sat(0, 1), sat(0, 0), isl(1.0))],
        );
        assert!(matches!(duplicate, Err(TopologyError::DuplicateLink(_, _))));

        let unknown = TopologySnapshot::from_parts(0.0, nodes(), vec![(sat(0, 0), sat(3, 3), isl(1.0))]);
        assert_eq!(unknown.err(), Some(TopologyError::NodeNotFound(sat(3, 3))));
    }

    #[test]
    fn test_stats() {
        let stats = create_test_snapshot().stats();
        assert_eq!(stats.total_nodes, 5);
        assert_eq!(stats.satellites, 4);
        assert_eq!(stats.ground_stations, 1);
        assert_eq!(stats.isl_links, 4);
        assert_eq!(stats.ground_links, 1);
        assert_eq!(stats.time_s, 3.0);
    }
}
