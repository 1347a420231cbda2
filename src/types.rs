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

//! Core type definitions shared by every subsystem: node identifiers, the
//! multi-objective weight triple, the per-path metrics vector, the routing
//! request, cooperative cancellation, and the error taxonomy.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use petgraph::graph::{Graph, NodeIndex};
use petgraph::Undirected;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::network::{LinkParams, NodeParams};

/// The index type used by the underlying graph.
pub type IndexType = u32;

/// Identifier of a single node in the network.
pub type NodeId = NodeIndex<IndexType>;

/// The underlying attributed, undirected topology.
pub type Topology = Graph<NodeParams, LinkParams, Undirected, IndexType>;

/// Reference bandwidth (in Mbps) used by the resource cost, unless the engine
/// is configured otherwise.
pub const DEFAULT_REFERENCE_BANDWIDTH: f64 = 1000.0;

/// Smallest reliability value fed into the logarithm. Values below this floor
/// are clamped so that the reliability cost stays finite.
pub const RELIABILITY_FLOOR: f64 = 1e-12;

/// Penalty added to the scalar cost of a path that cannot carry the requested
/// demand.
pub const DEFAULT_INFEASIBLE_PENALTY: f64 = 1e9;

/// The weight triple of the multi-objective cost model.
///
/// A `Weights` value is always normalized: the constructor rejects negative
/// components and an all-zero triple, and divides by the sum, so that every
/// consumer observes `delay + reliability + resource == 1`. This makes the
/// scalarization invariant under positive scaling of the requested triple and
/// guarantees a single normalization point across the engine, the baseline
/// router, and all optimizers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    /// Weight of the total path delay (ms).
    pub delay: f64,
    /// Weight of the reliability cost (sum of negative log reliabilities).
    pub reliability: f64,
    /// Weight of the resource cost (sum of reference-bandwidth ratios).
    pub resource: f64,
}

impl Weights {
    /// Create a normalized weight triple. Fails with
    /// [`RoutingError::InvalidWeights`] if any component is negative (or not
    /// finite), or if all components are zero.
    pub fn new(delay: f64, reliability: f64, resource: f64) -> Result<Self, RoutingError> {
        let ok = |x: f64| x.is_finite() && x >= 0.0;
        if !(ok(delay) && ok(reliability) && ok(resource)) {
            return Err(RoutingError::InvalidWeights);
        }
        let total = delay + reliability + resource;
        if total <= 0.0 {
            return Err(RoutingError::InvalidWeights);
        }
        Ok(Self {
            delay: delay / total,
            reliability: reliability / total,
            resource: resource / total,
        })
    }

    /// The balanced triple `(1/3, 1/3, 1/3)`.
    pub fn balanced() -> Self {
        Self {
            delay: 1.0 / 3.0,
            reliability: 1.0 / 3.0,
            resource: 1.0 / 3.0,
        }
    }

    /// A triple that only considers the total delay.
    pub fn delay_only() -> Self {
        Self {
            delay: 1.0,
            reliability: 0.0,
            resource: 0.0,
        }
    }
}

impl Default for Weights {
    fn default() -> Self {
        Self::balanced()
    }
}

/// The derived metrics of a single path, as computed by
/// [`MetricsEngine::compute`](crate::metrics::MetricsEngine::compute).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathMetrics {
    /// Sum of link delays plus the processing delay of all interior nodes
    /// (source and destination excluded).
    pub total_delay_ms: f64,
    /// Sum of `-log(reliability)` over all links and all nodes of the path.
    pub reliability_cost: f64,
    /// Sum of `reference_bandwidth / capacity` over all links.
    pub resource_cost: f64,
    /// End-to-end reliability, `exp(-reliability_cost)`.
    pub total_reliability: f64,
    /// The smallest link capacity along the path.
    pub bottleneck_capacity_mbps: f64,
    /// Whether the requested demand fits through the bottleneck. Always
    /// `true` when no demand was requested.
    pub feasible_for_demand: bool,
}

/// A routing request: route from `source` to `target` under the given weight
/// triple, optionally with a bandwidth demand in Mbps.
///
/// Whether the demand acts as a hard filter or as a soft penalty is decided
/// by the algorithm answering the request (see
/// [`RouteOptimizer::hard_demand`](crate::optimizers::RouteOptimizer::hard_demand)).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// The source node.
    pub source: NodeId,
    /// The destination node.
    pub target: NodeId,
    /// The (normalized) weight triple.
    pub weights: Weights,
    /// The requested bandwidth in Mbps, if any.
    pub demand: Option<f64>,
}

impl Request {
    /// Create a request without a bandwidth demand.
    pub fn new(source: NodeId, target: NodeId, weights: Weights) -> Self {
        Self {
            source,
            target,
            weights,
            demand: None,
        }
    }

    /// Attach a bandwidth demand (in Mbps) to the request.
    pub fn with_demand(mut self, demand: f64) -> Self {
        self.demand = Some(demand);
        self
    }
}

/// Cooperative cancellation flag, shared between a driver and a running
/// optimizer.
///
/// Optimizers check the token at every outer-loop boundary (iteration,
/// generation, episode, or cooling step) and return their best-so-far result
/// when the flag is raised. The token is cheap to clone; all clones observe
/// the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a new, unraised token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Every optimizer holding a clone will stop at its next
    /// outer-loop boundary.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Check whether the flag has been raised.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Ways in which a candidate or returned path can violate the path
/// invariants.
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
pub enum PathError {
    /// A path must contain at least two nodes.
    #[error("a path must contain at least two nodes")]
    TooShort,
    /// The path does not start at the requested source.
    #[error("path does not start at the requested source")]
    WrongSource,
    /// The path does not end at the requested destination.
    #[error("path does not end at the requested destination")]
    WrongDestination,
    /// The path visits a node more than once.
    #[error("path visits node {0:?} more than once")]
    RepeatedNode(NodeId),
    /// Two consecutive nodes of the path are not connected.
    #[error("consecutive nodes are not connected: {0:?} -- {1:?}")]
    MissingLink(NodeId, NodeId),
    /// A link of the path cannot carry the (hard) bandwidth demand.
    #[error("link {0:?} -- {1:?} has capacity {2} Mbps, below the demand")]
    CapacityBelowDemand(NodeId, NodeId, f64),
}

/// The error type of all core operations.
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
pub enum RoutingError {
    /// Source and destination must be distinct.
    #[error("source and destination are the same node: {0:?}")]
    SourceIsDestination(NodeId),
    /// The node is not present in the topology.
    #[error("node was not found in the topology: {0:?}")]
    NodeNotFound(NodeId),
    /// The link is not present in the topology.
    #[error("link does not exist: {0:?} -- {1:?}")]
    LinkNotFound(NodeId, NodeId),
    /// Weights must be non-negative with a positive sum.
    #[error("weights must be non-negative with a positive sum")]
    InvalidWeights,
    /// A path violates the path invariants.
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),
    /// Source and destination are not connected.
    #[error("no path between {0:?} and {1:?}")]
    NoPath(NodeId, NodeId),
    /// No path can carry the requested bandwidth demand.
    #[error("no path satisfies the bandwidth demand of {0} Mbps")]
    BandwidthInfeasible(f64),
    /// Cooperative cancellation was observed.
    #[error("the operation was cancelled")]
    Cancelled,
    /// A parameter value could not be interpreted.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A numeric or invariant violation that should not occur.
    #[error("internal error: {0}")]
    Internal(String),
}
