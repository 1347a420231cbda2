// QRoute: QoS-constrained routing over weighted network graphs
// Copyright (C) 2023-2024 Tibor Schneider <sctibor@ethz.ch>
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! The attributed network graph. Nodes carry a processing delay and a
//! reliability, links carry a delay, a capacity and a reliability. The graph
//! is stored on a [Petgraph](https://docs.rs/petgraph) undirected graph and
//! is treated as read-only by every algorithm; state that must evolve during
//! a search (like ACO pheromones) lives in per-run side tables instead.

use std::collections::BTreeMap;

use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::types::{NodeId, RoutingError, Topology};

/// QoS attributes of a single node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeParams {
    /// Time spent forwarding a packet through this node, in milliseconds.
    #[serde(default, alias = "proc_delay", alias = "s_ms")]
    pub processing_delay_ms: f64,
    /// Probability that the node operates correctly, in `(0, 1]`.
    #[serde(default = "default_reliability", alias = "r_node")]
    pub node_reliability: f64,
}

impl Default for NodeParams {
    fn default() -> Self {
        Self {
            processing_delay_ms: 0.0,
            node_reliability: 1.0,
        }
    }
}

impl NodeParams {
    /// Check the attribute ranges (`processing_delay_ms >= 0`,
    /// `node_reliability` in `(0, 1]`).
    pub fn check(&self) -> Result<(), RoutingError> {
        if !(self.processing_delay_ms.is_finite() && self.processing_delay_ms >= 0.0) {
            return Err(RoutingError::InvalidConfig(format!(
                "processing_delay_ms must be non-negative, got {}",
                self.processing_delay_ms
            )));
        }
        if !(self.node_reliability > 0.0 && self.node_reliability <= 1.0) {
            return Err(RoutingError::InvalidConfig(format!(
                "node_reliability must be in (0, 1], got {}",
                self.node_reliability
            )));
        }
        Ok(())
    }
}

/// QoS attributes of a single (undirected) link.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkParams {
    /// Propagation delay of the link, in milliseconds.
    #[serde(default, alias = "link_delay", alias = "delay_ms")]
    pub link_delay_ms: f64,
    /// Capacity of the link in Mbps.
    #[serde(
        default = "default_capacity",
        alias = "bandwidth_mbps",
        alias = "bandwidth"
    )]
    pub capacity_mbps: f64,
    /// Probability that the link operates correctly, in `(0, 1]`.
    #[serde(default = "default_reliability", alias = "r_link")]
    pub link_reliability: f64,
}

impl Default for LinkParams {
    fn default() -> Self {
        Self {
            link_delay_ms: 0.0,
            capacity_mbps: default_capacity(),
            link_reliability: 1.0,
        }
    }
}

impl LinkParams {
    /// Check the attribute ranges (`link_delay_ms >= 0`, `capacity_mbps > 0`,
    /// `link_reliability` in `(0, 1]`).
    pub fn check(&self) -> Result<(), RoutingError> {
        if !(self.link_delay_ms.is_finite() && self.link_delay_ms >= 0.0) {
            return Err(RoutingError::InvalidConfig(format!(
                "link_delay_ms must be non-negative, got {}",
                self.link_delay_ms
            )));
        }
        if !(self.capacity_mbps.is_finite() && self.capacity_mbps > 0.0) {
            return Err(RoutingError::InvalidConfig(format!(
                "capacity_mbps must be positive, got {}",
                self.capacity_mbps
            )));
        }
        if !(self.link_reliability > 0.0 && self.link_reliability <= 1.0) {
            return Err(RoutingError::InvalidConfig(format!(
                "link_reliability must be in (0, 1], got {}",
                self.link_reliability
            )));
        }
        Ok(())
    }
}

fn default_reliability() -> f64 {
    1.0
}

fn default_capacity() -> f64 {
    1000.0
}

/// A node as supplied by a collaborator on ingest. The attribute names accept
/// the legacy aliases of older data sets and are canonicalized by
/// deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct NodeRecord {
    /// External identifier of the node.
    pub id: u64,
    /// The (canonicalized) node attributes.
    #[serde(flatten)]
    pub params: NodeParams,
}

/// A link as supplied by a collaborator on ingest.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LinkRecord {
    /// External identifier of one endpoint.
    #[serde(alias = "u", alias = "from")]
    pub source: u64,
    /// External identifier of the other endpoint.
    #[serde(alias = "v", alias = "to")]
    pub target: u64,
    /// The (canonicalized) link attributes.
    #[serde(flatten)]
    pub params: LinkParams,
}

/// Order an unordered node pair. Used as the key of every per-link side
/// table (pheromones, heuristic caches), so that `(a, b)` and `(b, a)`
/// address the same entry.
pub(crate) fn link_key(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// The attributed, undirected network graph.
#[derive(Debug, Clone, Default)]
pub struct Network {
    graph: Topology,
}

impl Network {
    /// Create an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node with the given attributes and return its identifier.
    pub fn add_node(&mut self, params: NodeParams) -> NodeId {
        self.graph.add_node(params)
    }

    /// Add an undirected link between `a` and `b`. If the link already
    /// exists, its attributes are overwritten. Self loops and out-of-range
    /// attributes are rejected.
    pub fn add_link(&mut self, a: NodeId, b: NodeId, params: LinkParams) -> Result<(), RoutingError> {
        if a == b {
            return Err(RoutingError::InvalidConfig(format!(
                "self loop on node {:?} is not allowed",
                a
            )));
        }
        for n in [a, b] {
            if !self.contains_node(n) {
                return Err(RoutingError::NodeNotFound(n));
            }
        }
        params.check()?;
        self.graph.update_edge(a, b, params);
        Ok(())
    }

    /// The number of nodes in the network.
    pub fn num_nodes(&self) -> usize {
        self.graph.node_count()
    }

    /// The number of links in the network.
    pub fn num_links(&self) -> usize {
        self.graph.edge_count()
    }

    /// Check whether the node exists.
    pub fn contains_node(&self, node: NodeId) -> bool {
        self.graph.node_weight(node).is_some()
    }

    /// Get the attributes of a node.
    pub fn node(&self, node: NodeId) -> Result<&NodeParams, RoutingError> {
        self.graph
            .node_weight(node)
            .ok_or(RoutingError::NodeNotFound(node))
    }

    /// Get the attributes of the link between `a` and `b` (in either
    /// direction).
    pub fn link(&self, a: NodeId, b: NodeId) -> Result<&LinkParams, RoutingError> {
        self.find_link(a, b).ok_or(RoutingError::LinkNotFound(a, b))
    }

    /// Get the attributes of the link between `a` and `b`, or `None` if no
    /// such link exists.
    pub fn find_link(&self, a: NodeId, b: NodeId) -> Option<&LinkParams> {
        self.graph
            .find_edge(a, b)
            .and_then(|e| self.graph.edge_weight(e))
    }

    /// Iterate over all node identifiers.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_indices()
    }

    /// Iterate over the neighbors of a node.
    pub fn neighbors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.neighbors(node)
    }

    /// Iterate over the neighbors of a node reachable over a link that can
    /// carry `demand` Mbps. With `demand = None` this is the plain neighbor
    /// iteration. This is the capacity filter shared by the ACO walk and the
    /// Q-Learning action set.
    pub fn feasible_neighbors(
        &self,
        node: NodeId,
        demand: Option<f64>,
    ) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.edges(node).filter_map(move |e| {
            let other = if e.source() == node {
                e.target()
            } else {
                e.source()
            };
            match demand {
                Some(b) if e.weight().capacity_mbps < b => None,
                _ => Some(other),
            }
        })
    }

    /// Iterate over all links as `(a, b, params)` triples.
    pub fn links(&self) -> impl Iterator<Item = (NodeId, NodeId, &LinkParams)> + '_ {
        self.graph
            .edge_references()
            .map(|e| (e.source(), e.target(), e.weight()))
    }

    /// Access the underlying graph.
    pub fn topology(&self) -> &Topology {
        &self.graph
    }

    /// Build a network from ingest records and return it together with the
    /// mapping from external node ids to [`NodeId`]s.
    ///
    /// Duplicate node ids, links referencing unknown ids, and out-of-range
    /// attributes are rejected with [`RoutingError::InvalidConfig`].
    pub fn from_records<N, L>(
        nodes: N,
        links: L,
    ) -> Result<(Self, BTreeMap<u64, NodeId>), RoutingError>
    where
        N: IntoIterator<Item = NodeRecord>,
        L: IntoIterator<Item = LinkRecord>,
    {
        let mut net = Self::new();
        let mut ids: BTreeMap<u64, NodeId> = BTreeMap::new();
        for record in nodes {
            record.params.check()?;
            if ids.contains_key(&record.id) {
                return Err(RoutingError::InvalidConfig(format!(
                    "duplicate node id {} on ingest",
                    record.id
                )));
            }
            ids.insert(record.id, net.add_node(record.params));
        }
        for record in links {
            let lookup = |id: u64| {
                ids.get(&id).copied().ok_or_else(|| {
                    RoutingError::InvalidConfig(format!("link references unknown node id {}", id))
                })
            };
            let a = lookup(record.source)?;
            let b = lookup(record.target)?;
            net.add_link(a, b, record.params)?;
        }
        Ok((net, ids))
    }
}
