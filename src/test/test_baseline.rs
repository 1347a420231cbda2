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

use pretty_assertions::assert_eq;

use crate::baseline::{route, route_filtered, shortest_delay_path};
use crate::test::{disconnected_pairs, line_with_shortcut, reliability_trap, triangle};
use crate::types::{NodeId, RoutingError, Weights};

#[test]
fn triangle_takes_the_direct_link() {
    let (net, n) = triangle();
    let path = route(&net, n[0], n[2], &Weights::balanced()).unwrap();
    assert_eq!(path, vec![n[0], n[2]]);
}

#[test]
fn filtered_routing_takes_the_detour() {
    let (net, n) = line_with_shortcut(5.0, 100.0);
    let w = Weights::delay_only();
    // unfiltered, the low-delay shortcut wins
    let free = route(&net, n[0], n[3], &w).unwrap();
    assert_eq!(free, vec![n[0], n[2], n[3]]);
    // the capacity filter forces the long way around
    let filtered = route_filtered(&net, n[0], n[3], &w, Some(10.0)).unwrap();
    assert_eq!(filtered, vec![n[0], n[1], n[2], n[3]]);
}

#[test]
fn reliability_weights_pick_the_safe_route() {
    let (net, (s, t), (_, safe)) = reliability_trap();
    let w = Weights::new(0.0, 1.0, 0.0).unwrap();
    assert_eq!(route(&net, s, t, &w).unwrap(), safe);
}

#[test]
fn disconnected_endpoints_have_no_path() {
    let (net, n) = disconnected_pairs();
    assert_eq!(
        route(&net, n[0], n[3], &Weights::balanced()),
        Err(RoutingError::NoPath(n[0], n[3]))
    );
}

#[test]
fn endpoints_are_validated() {
    let (net, n) = triangle();
    assert_eq!(
        route(&net, n[0], n[0], &Weights::balanced()),
        Err(RoutingError::SourceIsDestination(n[0]))
    );
    let missing = NodeId::new(99);
    assert_eq!(
        route(&net, n[0], missing, &Weights::balanced()),
        Err(RoutingError::NodeNotFound(missing))
    );
}

#[test]
fn delay_only_helper_respects_the_filter() {
    let (net, n) = line_with_shortcut(5.0, 100.0);
    assert_eq!(
        shortest_delay_path(&net, n[0], n[3], None),
        Some(vec![n[0], n[2], n[3]])
    );
    assert_eq!(
        shortest_delay_path(&net, n[0], n[3], Some(10.0)),
        Some(vec![n[0], n[1], n[2], n[3]])
    );
    // a filter above every capacity disconnects the graph
    assert_eq!(shortest_delay_path(&net, n[0], n[3], Some(1000.0)), None);
}
