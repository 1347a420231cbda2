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

use crate::metrics::MetricsEngine;
use crate::network::{LinkParams, Network, NodeParams};
use crate::test::{link, triangle};
use crate::types::{PathError, RoutingError, Weights};

#[test]
fn triangle_direct_path() {
    let (net, n) = triangle();
    let engine = MetricsEngine::new(&net);
    let m = engine.compute(&[n[0], n[2]], Some(10.0)).unwrap();
    assert_abs_diff_eq!(m.total_delay_ms, 1.0);
    assert_abs_diff_eq!(m.reliability_cost, -(0.99f64.ln()));
    assert_abs_diff_eq!(m.resource_cost, 10.0);
    assert_abs_diff_eq!(m.bottleneck_capacity_mbps, 100.0);
    assert!(m.feasible_for_demand);
}

#[test]
fn interior_processing_and_all_node_reliability() {
    let mut net = Network::new();
    let params = |proc: f64, rel: f64| NodeParams {
        processing_delay_ms: proc,
        node_reliability: rel,
    };
    let a = net.add_node(params(1.0, 0.9));
    let b = net.add_node(params(2.0, 0.8));
    let c = net.add_node(params(3.0, 0.7));
    net.add_link(a, b, link(4.0, 200.0, 0.95)).unwrap();
    net.add_link(b, c, link(6.0, 400.0, 0.95)).unwrap();

    let engine = MetricsEngine::new(&net);
    let m = engine.compute(&[a, b, c], None).unwrap();

    // only the interior node contributes its processing delay
    assert_abs_diff_eq!(m.total_delay_ms, 4.0 + 6.0 + 2.0);
    // but all three nodes contribute reliability
    let expected_rel = -(0.9f64.ln()) - (0.8f64.ln()) - (0.7f64.ln()) - 2.0 * (0.95f64.ln());
    assert_abs_diff_eq!(m.reliability_cost, expected_rel, epsilon = 1e-12);
    assert_abs_diff_eq!(m.resource_cost, 1000.0 / 200.0 + 1000.0 / 400.0);
    assert_abs_diff_eq!(m.bottleneck_capacity_mbps, 200.0);
}

#[test]
fn reliability_law() {
    let (net, n) = triangle();
    let engine = MetricsEngine::new(&net);
    let m = engine.compute(&[n[0], n[1], n[2]], None).unwrap();
    assert!(m.total_reliability > 0.0 && m.total_reliability <= 1.0);
    assert_abs_diff_eq!(m.reliability_cost, -m.total_reliability.ln(), epsilon = 1e-9);
}

#[test]
fn weighted_sum_is_scale_invariant() {
    let (net, n) = triangle();
    let engine = MetricsEngine::new(&net);
    let m = engine.compute(&[n[0], n[2]], None).unwrap();
    let w1 = Weights::new(1.0, 2.0, 3.0).unwrap();
    let w2 = Weights::new(10.0, 20.0, 30.0).unwrap();
    assert_eq!(w1, w2);
    assert_eq!(engine.weighted_sum(&m, &w1), engine.weighted_sum(&m, &w2));
}

#[test]
fn infeasible_demand_is_penalized_not_rejected() {
    let (net, n) = triangle();
    let engine = MetricsEngine::new(&net);
    let feasible = engine.compute(&[n[0], n[2]], Some(100.0)).unwrap();
    let infeasible = engine.compute(&[n[0], n[2]], Some(100.1)).unwrap();

    // the demand exactly at the bottleneck is still feasible
    assert!(feasible.feasible_for_demand);
    assert!(!infeasible.feasible_for_demand);

    let w = Weights::balanced();
    let delta = engine.weighted_sum(&infeasible, &w) - engine.weighted_sum(&feasible, &w);
    assert_abs_diff_eq!(delta, 1e9);
}

#[test]
fn compute_is_deterministic() {
    let (net, n) = triangle();
    let engine = MetricsEngine::new(&net);
    let a = engine.compute(&[n[0], n[1], n[2]], Some(42.0)).unwrap();
    let b = engine.compute(&[n[0], n[1], n[2]], Some(42.0)).unwrap();
    // bit-identical, not just approximately equal
    assert_eq!(a, b);
}

#[test]
fn invalid_paths_are_rejected() {
    let (net, n) = triangle();
    let engine = MetricsEngine::new(&net);
    assert_eq!(
        engine.compute(&[n[0]], None),
        Err(RoutingError::InvalidPath(PathError::TooShort))
    );

    let mut line = Network::new();
    let a = line.add_node(NodeParams::default());
    let b = line.add_node(NodeParams::default());
    let c = line.add_node(NodeParams::default());
    line.add_link(a, b, LinkParams::default()).unwrap();
    line.add_link(b, c, LinkParams::default()).unwrap();
    assert_eq!(
        MetricsEngine::new(&line).compute(&[a, c], None),
        Err(RoutingError::InvalidPath(PathError::MissingLink(a, c)))
    );
}

#[test]
fn non_simple_walks_are_scored_without_complaint() {
    // simplicity is the adapter's concern, the engine only needs the links
    // to exist
    let (net, n) = triangle();
    let engine = MetricsEngine::new(&net);
    let m = engine.compute(&[n[0], n[1], n[0], n[2]], None).unwrap();
    assert_abs_diff_eq!(m.total_delay_ms, 3.0);
}

#[test]
fn invalid_weights_are_rejected() {
    assert_eq!(Weights::new(0.0, 0.0, 0.0), Err(RoutingError::InvalidWeights));
    assert_eq!(Weights::new(-1.0, 1.0, 1.0), Err(RoutingError::InvalidWeights));
    assert_eq!(Weights::new(f64::NAN, 1.0, 1.0), Err(RoutingError::InvalidWeights));
    let w = Weights::new(2.0, 0.0, 0.0).unwrap();
    assert_abs_diff_eq!(w.delay, 1.0);
}

#[test]
fn reference_bandwidth_is_configurable() {
    let (net, n) = triangle();
    let engine = MetricsEngine::new(&net).with_reference_bandwidth(100.0);
    let m = engine.compute(&[n[0], n[2]], None).unwrap();
    assert_abs_diff_eq!(m.resource_cost, 1.0);
}
