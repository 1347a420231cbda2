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

use approx::assert_abs_diff_eq;
use pretty_assertions::assert_eq;
use rand::prelude::*;
use serde_json::json;

use crate::builder;
use crate::network::{LinkRecord, Network, NodeRecord};
use crate::test::{link, perfect_node, triangle};
use crate::types::RoutingError;

#[test]
fn self_loops_are_rejected() {
    let mut net = Network::new();
    let a = net.add_node(perfect_node());
    assert!(matches!(
        net.add_link(a, a, link(1.0, 100.0, 0.99)),
        Err(RoutingError::InvalidConfig(_))
    ));
}

#[test]
fn attribute_ranges_are_enforced() {
    let mut net = Network::new();
    let a = net.add_node(perfect_node());
    let b = net.add_node(perfect_node());
    for bad in [
        link(-1.0, 100.0, 0.99),
        link(1.0, 0.0, 0.99),
        link(1.0, 100.0, 0.0),
        link(1.0, 100.0, 1.5),
    ] {
        assert!(matches!(
            net.add_link(a, b, bad),
            Err(RoutingError::InvalidConfig(_))
        ));
    }
}

#[test]
fn re_adding_a_link_overwrites_its_attributes() {
    let mut net = Network::new();
    let a = net.add_node(perfect_node());
    let b = net.add_node(perfect_node());
    net.add_link(a, b, link(1.0, 100.0, 0.99)).unwrap();
    net.add_link(b, a, link(7.0, 300.0, 0.98)).unwrap();
    assert_eq!(net.num_links(), 1);
    assert_abs_diff_eq!(net.link(a, b).unwrap().link_delay_ms, 7.0);
    // undirected: both directions address the same link
    assert_abs_diff_eq!(net.link(b, a).unwrap().capacity_mbps, 300.0);
}

#[test]
fn feasible_neighbors_filter_by_capacity() {
    let mut net = Network::new();
    let a = net.add_node(perfect_node());
    let b = net.add_node(perfect_node());
    let c = net.add_node(perfect_node());
    net.add_link(a, b, link(1.0, 50.0, 0.99)).unwrap();
    net.add_link(a, c, link(1.0, 500.0, 0.99)).unwrap();

    let mut all: Vec<_> = net.feasible_neighbors(a, None).collect();
    all.sort();
    assert_eq!(all, vec![b, c]);
    assert_eq!(net.feasible_neighbors(a, Some(100.0)).collect::<Vec<_>>(), vec![c]);
    assert!(net.feasible_neighbors(a, Some(1000.0)).next().is_none());
}

#[test]
fn ingest_canonicalizes_legacy_aliases() {
    let nodes: Vec<NodeRecord> = serde_json::from_value(json!([
        { "id": 10, "proc_delay": 1.5, "r_node": 0.97 },
        { "id": 20, "s_ms": 0.5, "node_reliability": 0.95 },
        { "id": 30 },
    ]))
    .unwrap();
    let links: Vec<LinkRecord> = serde_json::from_value(json!([
        { "u": 10, "v": 20, "bandwidth": 400.0, "link_delay": 3.0, "r_link": 0.96 },
        { "from": 20, "to": 30, "capacity_mbps": 800.0, "delay_ms": 4.0 },
    ]))
    .unwrap();

    let (net, ids) = Network::from_records(nodes, links).unwrap();
    assert_eq!(net.num_nodes(), 3);
    assert_eq!(net.num_links(), 2);

    let n10 = net.node(ids[&10]).unwrap();
    assert_abs_diff_eq!(n10.processing_delay_ms, 1.5);
    assert_abs_diff_eq!(n10.node_reliability, 0.97);
    // missing attributes fall back to the defaults
    let n30 = net.node(ids[&30]).unwrap();
    assert_abs_diff_eq!(n30.processing_delay_ms, 0.0);
    assert_abs_diff_eq!(n30.node_reliability, 1.0);

    let l = net.link(ids[&10], ids[&20]).unwrap();
    assert_abs_diff_eq!(l.capacity_mbps, 400.0);
    assert_abs_diff_eq!(l.link_delay_ms, 3.0);
    assert_abs_diff_eq!(l.link_reliability, 0.96);
    let l = net.link(ids[&20], ids[&30]).unwrap();
    assert_abs_diff_eq!(l.link_reliability, 1.0);
}

#[test]
fn ingest_rejects_broken_records() {
    let node = |id: u64| NodeRecord {
        id,
        params: perfect_node(),
    };
    // duplicate node id
    assert!(matches!(
        Network::from_records([node(1), node(1)], Vec::<LinkRecord>::new()),
        Err(RoutingError::InvalidConfig(_))
    ));
    // link referencing an unknown node
    let bad_link: LinkRecord =
        serde_json::from_value(json!({ "u": 1, "v": 99, "bandwidth_mbps": 100.0 })).unwrap();
    assert!(matches!(
        Network::from_records([node(1), node(2)], [bad_link]),
        Err(RoutingError::InvalidConfig(_))
    ));
}

#[test]
fn cloned_networks_are_independent() {
    let (net, n) = triangle();
    let mut copy = net.clone();
    copy.add_link(n[0], n[1], link(9.0, 10.0, 0.9)).unwrap();
    assert_abs_diff_eq!(net.link(n[0], n[1]).unwrap().link_delay_ms, 1.0);
    assert_abs_diff_eq!(copy.link(n[0], n[1]).unwrap().link_delay_ms, 9.0);
}

#[test]
fn random_topologies_are_seeded() {
    let build = |seed: u64| {
        let mut rng = StdRng::seed_from_u64(seed);
        builder::build_connected_gnp(30, 0.2, &mut rng).unwrap()
    };
    let a = build(42);
    let b = build(42);
    let c = build(43);
    assert_eq!(a.num_nodes(), b.num_nodes());
    assert_eq!(a.num_links(), b.num_links());
    assert!(builder::is_connected(&a));
    // attributes come out of the reference ranges
    for (u, v, params) in a.links() {
        assert!(params.link_delay_ms >= 3.0 && params.link_delay_ms < 15.0);
        assert!(params.capacity_mbps >= 100.0 && params.capacity_mbps < 1000.0);
        assert!(a.find_link(u, v).is_some());
    }
    // different seeds practically never agree on everything
    assert!(
        a.num_links() != c.num_links()
            || a.links().zip(c.links()).any(|((_, _, x), (_, _, y))| x != y)
    );
}
