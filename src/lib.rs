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

#![deny(missing_docs, missing_debug_implementations, rust_2018_idioms)]

//! # QRoute
//!
//! QRoute computes Quality-of-Service constrained routes on weighted network
//! graphs under a multi-objective cost model, using a portfolio of four
//! stochastic optimizers — Ant Colony, Genetic Algorithm, Q-Learning, and
//! Simulated Annealing — plus a deterministic Dijkstra baseline, and lets a
//! driver compare them head-to-head over repeated trials on identical
//! inputs.
//!
//! ## Main concepts
//!
//! The [`network::Network`] stores nodes and links with their QoS attributes
//! (processing delay and reliability per node; delay, capacity, and
//! reliability per link) on a [Petgraph](https://docs.rs/petgraph) undirected
//! graph. The graph is read-only during a search; evolving optimizer state
//! (like ACO pheromones) lives in side tables owned by the individual run.
//!
//! The [`metrics::MetricsEngine`] turns a path into its metrics vector
//! (total delay, reliability cost, resource cost, bottleneck capacity) and
//! scalarizes it under a normalized [`types::Weights`] triple into the
//! single cost every algorithm minimizes. A bandwidth demand can ride along;
//! a path that cannot carry it is penalized (or, for algorithms that treat
//! the demand as hard, filtered out entirely).
//!
//! The optimizers live in [`optimizers`] behind the
//! [`optimizers::RouteOptimizer`] contract. Drivers usually do not call them
//! directly but go through [`adapter::run`], which validates the request and
//! the returned path, re-scores it with the engine, and falls back to the
//! [`baseline`] router when an optimizer misbehaves. The
//! [`harness::compare`] function orchestrates repeated seeded trials of the
//! whole portfolio and aggregates them into CSV-friendly tables (rendered by
//! [`formatter`]).
//!
//! ## Example
//!
//! ```
//! use qroute::prelude::*;
//!
//! fn main() -> Result<(), RoutingError> {
//!     let mut net = Network::new();
//!     let params = NodeParams { processing_delay_ms: 0.0, node_reliability: 1.0 };
//!     let a = net.add_node(params);
//!     let b = net.add_node(params);
//!     let c = net.add_node(params);
//!     let link = LinkParams {
//!         link_delay_ms: 1.0,
//!         capacity_mbps: 100.0,
//!         link_reliability: 0.99,
//!     };
//!     net.add_link(a, b, link)?;
//!     net.add_link(b, c, link)?;
//!     net.add_link(a, c, link)?;
//!
//!     let request = Request::new(a, c, Weights::balanced()).with_demand(10.0);
//!     let result = qroute::adapter::run(
//!         Algorithm::Aco,
//!         &net,
//!         &request,
//!         &ParamMap::new(),
//!         42,
//!         &CancelToken::new(),
//!     )?;
//!     assert_eq!(result.path, vec![a, c]);
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod baseline;
pub mod builder;
pub mod formatter;
pub mod harness;
pub mod metrics;
pub mod network;
pub mod optimizers;
pub mod types;

#[cfg(test)]
mod test;

/// Re-exports of the types a driver typically needs.
pub mod prelude {
    pub use crate::adapter::{Algorithm, ParamMap, RouteMetrics, RouteResult};
    pub use crate::harness::{compare, CompareOptions, Comparison};
    pub use crate::metrics::MetricsEngine;
    pub use crate::network::{LinkParams, Network, NodeParams};
    pub use crate::optimizers::{RouteOptimizer, SearchOutcome};
    pub use crate::types::{
        CancelToken, NodeId, PathMetrics, Request, RoutingError, Weights,
    };
}
