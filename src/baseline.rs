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

//! The deterministic baseline router: Dijkstra over the scalarized per-hop
//! edge cost. Since the per-hop cost is non-negative, the baseline path is
//! optimal for the scalar objective; the stochastic optimizers can match it
//! but never beat it (beyond float noise).
//!
//! The per-hop cost charges the processing delay and reliability of the hop
//! *destination*, so summing it over a path covers every node except the
//! source. The source terms are constant across all candidate paths and thus
//! never change which path is shortest; the adapter re-scores the returned
//! path with the [`MetricsEngine`](crate::metrics::MetricsEngine), which
//! accounts for them.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use ordered_float::NotNan;
use petgraph::visit::EdgeRef;

use crate::network::{LinkParams, Network};
use crate::types::{NodeId, RoutingError, Weights, DEFAULT_REFERENCE_BANDWIDTH, RELIABILITY_FLOOR};

/// Compute the minimum-scalar-cost path from `source` to `target`.
///
/// Returns [`RoutingError::NoPath`] when the two nodes are disconnected.
pub fn route(
    net: &Network,
    source: NodeId,
    target: NodeId,
    weights: &Weights,
) -> Result<Vec<NodeId>, RoutingError> {
    route_filtered(net, source, target, weights, None)
}

/// Compute the minimum-scalar-cost path on the working graph that only keeps
/// links with `capacity_mbps >= min_capacity`.
pub fn route_filtered(
    net: &Network,
    source: NodeId,
    target: NodeId,
    weights: &Weights,
    min_capacity: Option<f64>,
) -> Result<Vec<NodeId>, RoutingError> {
    check_endpoints(net, source, target)?;
    let cost = |_: NodeId, v: NodeId, link: &LinkParams| {
        // the node weight exists for every id handed out by the graph
        let node = match net.topology().node_weight(v) {
            Some(node) => *node,
            None => return f64::INFINITY,
        };
        let proc = if v == source || v == target {
            0.0
        } else {
            node.processing_delay_ms
        };
        let delay_part = link.link_delay_ms + proc;
        let rel_part = -link.link_reliability.max(RELIABILITY_FLOOR).ln()
            + -node.node_reliability.max(RELIABILITY_FLOOR).ln();
        let res_part = DEFAULT_REFERENCE_BANDWIDTH / link.capacity_mbps;
        weights.delay * delay_part + weights.reliability * rel_part + weights.resource * res_part
    };
    dijkstra(net, source, target, min_capacity, cost)
        .ok_or(RoutingError::NoPath(source, target))
}

/// Compute the minimum-delay path (by `link_delay_ms` only), optionally on
/// the capacity-filtered working graph. Used by simulated annealing for its
/// initial solution and for every tail rewrite.
pub fn shortest_delay_path(
    net: &Network,
    source: NodeId,
    target: NodeId,
    min_capacity: Option<f64>,
) -> Option<Vec<NodeId>> {
    if source == target || !net.contains_node(source) || !net.contains_node(target) {
        return None;
    }
    dijkstra(net, source, target, min_capacity, |_, _, link| {
        link.link_delay_ms
    })
}

fn check_endpoints(net: &Network, source: NodeId, target: NodeId) -> Result<(), RoutingError> {
    if source == target {
        return Err(RoutingError::SourceIsDestination(source));
    }
    for n in [source, target] {
        if !net.contains_node(n) {
            return Err(RoutingError::NodeNotFound(n));
        }
    }
    Ok(())
}

/// Binary-heap Dijkstra with a predecessor map. `None` when `target` is not
/// reachable from `source` (under the capacity filter).
fn dijkstra<F>(
    net: &Network,
    source: NodeId,
    target: NodeId,
    min_capacity: Option<f64>,
    mut edge_cost: F,
) -> Option<Vec<NodeId>>
where
    F: FnMut(NodeId, NodeId, &LinkParams) -> f64,
{
    let zero = NotNan::new(0.0).ok()?;
    let mut dist: HashMap<NodeId, NotNan<f64>> = HashMap::from([(source, zero)]);
    let mut prev: HashMap<NodeId, NodeId> = HashMap::new();
    let mut heap: BinaryHeap<Reverse<(NotNan<f64>, NodeId)>> = BinaryHeap::new();
    heap.push(Reverse((zero, source)));

    while let Some(Reverse((d, u))) = heap.pop() {
        if u == target {
            return Some(reconstruct(&prev, source, target));
        }
        if dist.get(&u).map_or(true, |best| d > *best) {
            continue; // stale heap entry
        }
        for edge in net.topology().edges(u) {
            let v = if edge.source() == u {
                edge.target()
            } else {
                edge.source()
            };
            let link = edge.weight();
            if matches!(min_capacity, Some(b) if link.capacity_mbps < b) {
                continue;
            }
            let step = match NotNan::new(edge_cost(u, v, link)) {
                Ok(step) => step,
                Err(_) => continue,
            };
            let next = d + step;
            if dist.get(&v).map_or(true, |best| next < *best) {
                dist.insert(v, next);
                prev.insert(v, u);
                heap.push(Reverse((next, v)));
            }
        }
    }
    None
}

fn reconstruct(prev: &HashMap<NodeId, NodeId>, source: NodeId, target: NodeId) -> Vec<NodeId> {
    let mut path = vec![target];
    let mut current = target;
    while current != source {
        match prev.get(&current) {
            Some(&p) => {
                path.push(p);
                current = p;
            }
            None => break,
        }
    }
    path.reverse();
    path
}
