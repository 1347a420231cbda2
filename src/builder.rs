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

//! Seeded random topology generation for experiments and tests: a G(n, p)
//! graph with QoS attributes drawn from the ranges of the reference data set
//! (processing delay 0.5-2 ms, link delay 3-15 ms, capacity 100-1000 Mbps,
//! reliabilities 0.95-0.999).

use std::collections::VecDeque;

use rand::prelude::*;

use crate::network::{LinkParams, Network, NodeParams};
use crate::types::{NodeId, RoutingError};

/// How often [`build_connected_gnp`] re-draws the graph before it falls back
/// to the largest connected component.
const CONNECT_ATTEMPTS: usize = 30;

fn random_node_params<R: Rng + ?Sized>(rng: &mut R) -> NodeParams {
    NodeParams {
        processing_delay_ms: rng.gen_range(0.5..2.0),
        node_reliability: rng.gen_range(0.95..0.999),
    }
}

fn random_link_params<R: Rng + ?Sized>(rng: &mut R) -> LinkParams {
    LinkParams {
        link_delay_ms: rng.gen_range(3.0..15.0),
        capacity_mbps: rng.gen_range(100.0..1000.0),
        link_reliability: rng.gen_range(0.95..0.999),
    }
}

/// Build a G(n, p) network: every unordered node pair becomes a link with
/// probability `p`, attributes are drawn uniformly from the reference
/// ranges.
pub fn build_gnp<R: Rng + ?Sized>(
    n: usize,
    p: f64,
    rng: &mut R,
) -> Result<Network, RoutingError> {
    if n < 2 {
        return Err(RoutingError::InvalidConfig(format!(
            "a topology needs at least two nodes, got {}",
            n
        )));
    }
    if !(0.0..=1.0).contains(&p) {
        return Err(RoutingError::InvalidConfig(format!(
            "link probability must be in [0, 1], got {}",
            p
        )));
    }
    let mut net = Network::new();
    let nodes: Vec<NodeId> = (0..n).map(|_| net.add_node(random_node_params(rng))).collect();
    for i in 0..n {
        for j in (i + 1)..n {
            if rng.gen_bool(p) {
                net.add_link(nodes[i], nodes[j], random_link_params(rng))?;
            }
        }
    }
    Ok(net)
}

/// Build a *connected* G(n, p) network. The graph is re-drawn up to 30 times;
/// if no draw comes out connected, the largest connected component of the
/// last draw is used instead (so the returned network may have fewer than `n`
/// nodes).
pub fn build_connected_gnp<R: Rng + ?Sized>(
    n: usize,
    p: f64,
    rng: &mut R,
) -> Result<Network, RoutingError> {
    let mut net = build_gnp(n, p, rng)?;
    for _ in 1..CONNECT_ATTEMPTS {
        if is_connected(&net) {
            return Ok(net);
        }
        net = build_gnp(n, p, rng)?;
    }
    if is_connected(&net) {
        return Ok(net);
    }
    log::warn!(
        "no connected G({}, {}) draw after {} attempts, using the largest component",
        n,
        p,
        CONNECT_ATTEMPTS
    );
    Ok(induced_subnetwork(&net, &largest_component(&net)))
}

/// Check whether every node is reachable from the first one.
pub fn is_connected(net: &Network) -> bool {
    let mut ids = net.node_ids();
    let start = match ids.next() {
        Some(start) => start,
        None => return true,
    };
    reachable_from(net, start).len() == net.num_nodes()
}

fn reachable_from(net: &Network, start: NodeId) -> Vec<NodeId> {
    let mut seen = vec![false; net.num_nodes()];
    let mut queue = VecDeque::from([start]);
    let mut out = Vec::new();
    seen[start.index()] = true;
    while let Some(u) = queue.pop_front() {
        out.push(u);
        for v in net.neighbors(u) {
            if !seen[v.index()] {
                seen[v.index()] = true;
                queue.push_back(v);
            }
        }
    }
    out
}

fn largest_component(net: &Network) -> Vec<NodeId> {
    let mut assigned = vec![false; net.num_nodes()];
    let mut best: Vec<NodeId> = Vec::new();
    for start in net.node_ids() {
        if assigned[start.index()] {
            continue;
        }
        let component = reachable_from(net, start);
        for n in &component {
            assigned[n.index()] = true;
        }
        if component.len() > best.len() {
            best = component;
        }
    }
    best
}

fn induced_subnetwork(net: &Network, nodes: &[NodeId]) -> Network {
    let mut out = Network::new();
    let mut mapping = vec![None; net.num_nodes()];
    for &old in nodes {
        // node lookups cannot fail for ids coming out of `net` itself
        if let Ok(params) = net.node(old) {
            mapping[old.index()] = Some(out.add_node(*params));
        }
    }
    for (a, b, params) in net.links() {
        if let (Some(na), Some(nb)) = (mapping[a.index()], mapping[b.index()]) {
            let _ = out.add_link(na, nb, *params);
        }
    }
    out
}
