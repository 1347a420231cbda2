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

//! Shared fixtures of the test suite.

use crate::network::{LinkParams, Network, NodeParams};
use crate::types::NodeId;

mod test_baseline;
mod test_harness;
mod test_metrics;
mod test_network;

/// A node with no processing delay and perfect reliability.
fn perfect_node() -> NodeParams {
    NodeParams {
        processing_delay_ms: 0.0,
        node_reliability: 1.0,
    }
}

fn link(delay_ms: f64, capacity_mbps: f64, reliability: f64) -> LinkParams {
    LinkParams {
        link_delay_ms: delay_ms,
        capacity_mbps,
        link_reliability: reliability,
    }
}

/// The trivial triangle: three fully-connected nodes, every link with
/// delay 1 ms, capacity 100 Mbps, reliability 0.99.
fn triangle() -> (Network, Vec<NodeId>) {
    let mut net = Network::new();
    let nodes: Vec<NodeId> = (0..3).map(|_| net.add_node(perfect_node())).collect();
    for (a, b) in [(0, 1), (1, 2), (0, 2)] {
        net.add_link(nodes[a], nodes[b], link(1.0, 100.0, 0.99)).unwrap();
    }
    (net, nodes)
}

/// Four nodes in a line `0-1-2-3` plus the shortcut `0-2`. The line links
/// carry `line_cap` Mbps with 5 ms delay; the shortcut carries
/// `shortcut_cap` Mbps with 1 ms delay, so it is strictly cheaper whenever
/// its capacity suffices.
fn line_with_shortcut(shortcut_cap: f64, line_cap: f64) -> (Network, Vec<NodeId>) {
    let mut net = Network::new();
    let nodes: Vec<NodeId> = (0..4).map(|_| net.add_node(perfect_node())).collect();
    for (a, b) in [(0, 1), (1, 2), (2, 3)] {
        net.add_link(nodes[a], nodes[b], link(5.0, line_cap, 0.99)).unwrap();
    }
    net.add_link(nodes[0], nodes[2], link(1.0, shortcut_cap, 0.99))
        .unwrap();
    (net, nodes)
}

/// Two disjoint routes between the endpoints: a short one over two links
/// with reliability 0.5, and a long one over four links with reliability
/// 0.99 and double the delay. Returns the network, the endpoints, and the
/// two expected routes.
#[allow(clippy::type_complexity)]
fn reliability_trap() -> (Network, (NodeId, NodeId), (Vec<NodeId>, Vec<NodeId>)) {
    let mut net = Network::new();
    let ids: Vec<NodeId> = (0..6).map(|_| net.add_node(perfect_node())).collect();
    let (s, risky, b, c, d, t) = (ids[0], ids[1], ids[2], ids[3], ids[4], ids[5]);
    // short but unreliable
    net.add_link(s, risky, link(1.0, 100.0, 0.5)).unwrap();
    net.add_link(risky, t, link(1.0, 100.0, 0.5)).unwrap();
    // long but safe
    for (a, b) in [(s, b), (b, c), (c, d), (d, t)] {
        net.add_link(a, b, link(2.0, 100.0, 0.99)).unwrap();
    }
    (
        net,
        (s, t),
        (vec![s, risky, t], vec![s, b, c, d, t]),
    )
}

/// Two components: `0-1` and `2-3`.
fn disconnected_pairs() -> (Network, Vec<NodeId>) {
    let mut net = Network::new();
    let nodes: Vec<NodeId> = (0..4).map(|_| net.add_node(perfect_node())).collect();
    net.add_link(nodes[0], nodes[1], link(1.0, 100.0, 0.99)).unwrap();
    net.add_link(nodes[2], nodes[3], link(1.0, 100.0, 0.99)).unwrap();
    (net, nodes)
}
