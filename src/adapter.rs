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

//! The adapter normalizes every algorithm behind one call shape: it
//! validates the request, interprets the parameter map, seeds the run's
//! RNG, dispatches, validates the returned path, and re-scores it with the
//! metric engine so that the reported metrics are authoritative and
//! independent of the optimizer's internal accounting.
//!
//! A path that fails post-validation is replaced by the baseline router's
//! answer, with a remark in the result's notes. `NoPath` and
//! `BandwidthInfeasible` surface as errors, so that a driver (or the
//! comparison harness) can account for failure modes explicitly.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use itertools::Itertools;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::baseline;
use crate::metrics::MetricsEngine;
use crate::network::{LinkParams, Network, NodeParams};
use crate::optimizers::{
    Aco, Annealing, Genetic, QLearning, RouteOptimizer, SearchOutcome,
};
use crate::types::{CancelToken, NodeId, PathError, Request, RoutingError, Weights};

pub use crate::optimizers::ParamMap;

/// The algorithms of the portfolio, in the fixed order used by the
/// comparison harness.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    /// Deterministic Dijkstra over the scalarized edge cost.
    Baseline,
    /// Ant Colony Optimization.
    Aco,
    /// Genetic Algorithm.
    Genetic,
    /// Q-Learning.
    QLearning,
    /// Simulated Annealing.
    Annealing,
}

impl Algorithm {
    /// All algorithms in the fixed comparison order.
    pub const ALL: [Algorithm; 5] = [
        Algorithm::Baseline,
        Algorithm::Aco,
        Algorithm::Genetic,
        Algorithm::QLearning,
        Algorithm::Annealing,
    ];

    /// The stable, lowercase name of the algorithm.
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Baseline => "baseline",
            Algorithm::Aco => "aco",
            Algorithm::Genetic => "genetic",
            Algorithm::QLearning => "q-learning",
            Algorithm::Annealing => "annealing",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = RoutingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Algorithm::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| RoutingError::InvalidConfig(format!("unknown algorithm `{}`", s)))
    }
}

/// The authoritative metrics of a returned route, re-computed by the metric
/// engine after the optimizer finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteMetrics {
    /// Total path delay in milliseconds.
    pub total_delay_ms: f64,
    /// End-to-end reliability in `(0, 1]`.
    pub total_reliability: f64,
    /// Sum of negative-log reliabilities.
    pub reliability_cost: f64,
    /// Sum of reference-bandwidth ratios.
    pub resource_cost: f64,
    /// The scalar weighted cost.
    pub total_cost: f64,
    /// The (normalized) weight triple the cost was computed under.
    pub weights: Weights,
    /// The links of the path, as node pairs.
    pub hops: Vec<(NodeId, NodeId)>,
}

/// The uniform result record of a single algorithm invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteResult {
    /// The algorithm that produced the result.
    pub algorithm: Algorithm,
    /// The route, or empty when no path was produced.
    pub path: Vec<NodeId>,
    /// Authoritative metrics of `path` (`None` iff `path` is empty).
    pub metrics: Option<RouteMetrics>,
    /// The attributes of every node along the path.
    pub per_node: Vec<NodeParams>,
    /// The attributes of every link along the path.
    pub per_edge: Vec<LinkParams>,
    /// Human-readable status: `"ok"`, `"cancelled"`, or an explanation of a
    /// fallback or ignored parameters.
    pub notes: String,
}

/// Check that the request endpoints are usable on this network.
pub(crate) fn check_request(net: &Network, request: &Request) -> Result<(), RoutingError> {
    if request.source == request.target {
        return Err(RoutingError::SourceIsDestination(request.source));
    }
    for n in [request.source, request.target] {
        if !net.contains_node(n) {
            return Err(RoutingError::NodeNotFound(n));
        }
    }
    Ok(())
}

/// Validate a returned path against the invariants: correct endpoints, a
/// simple node sequence, every consecutive pair an existing link, and (for
/// hard-demand optimizers) sufficient capacity on every link.
pub fn validate_path(
    net: &Network,
    request: &Request,
    path: &[NodeId],
    hard_demand: bool,
) -> Result<(), RoutingError> {
    if path.len() < 2 {
        return Err(PathError::TooShort.into());
    }
    if path[0] != request.source {
        return Err(PathError::WrongSource.into());
    }
    if path[path.len() - 1] != request.target {
        return Err(PathError::WrongDestination.into());
    }
    let mut seen = HashSet::with_capacity(path.len());
    for &n in path {
        if !seen.insert(n) {
            return Err(PathError::RepeatedNode(n).into());
        }
    }
    for (&u, &v) in path.iter().tuple_windows() {
        let link = net
            .find_link(u, v)
            .ok_or(PathError::MissingLink(u, v))?;
        if hard_demand {
            if let Some(b) = request.demand {
                if link.capacity_mbps < b {
                    return Err(PathError::CapacityBelowDemand(u, v, link.capacity_mbps).into());
                }
            }
        }
    }
    Ok(())
}

/// Invoke an algorithm on the network.
///
/// `seed` determines the RNG of a stochastic optimizer, so that any single
/// run can be re-executed exactly. The baseline ignores it. `cancel` is the
/// cooperative cancellation flag; on cancellation, the result carries the
/// best-so-far path (possibly empty) and `notes = "cancelled"`.
pub fn run(
    algorithm: Algorithm,
    net: &Network,
    request: &Request,
    params: &ParamMap,
    seed: u64,
    cancel: &CancelToken,
) -> Result<RouteResult, RoutingError> {
    check_request(net, request)?;

    if algorithm == Algorithm::Baseline {
        let mut notes = vec!["ok".to_string()];
        if !params.is_empty() {
            notes.push(format!(
                "ignored unknown parameters: {}",
                params.keys().join(", ")
            ));
        }
        let path = baseline::route(net, request.source, request.target, &request.weights)?;
        return finish(algorithm, net, request, path, notes);
    }

    let (optimizer, unknown): (Box<dyn RouteOptimizer>, Vec<String>) = match algorithm {
        Algorithm::Aco => {
            let (o, u) = Aco::from_config(params)?;
            (Box::new(o), u)
        }
        Algorithm::Genetic => {
            let (o, u) = Genetic::from_config(params)?;
            (Box::new(o), u)
        }
        Algorithm::QLearning => {
            let (o, u) = QLearning::from_config(params)?;
            (Box::new(o), u)
        }
        Algorithm::Annealing => {
            let (o, u) = Annealing::from_config(params)?;
            (Box::new(o), u)
        }
        Algorithm::Baseline => unreachable!("handled above"),
    };

    // the single point where the effective demand is resolved: a demand key
    // in the parameter map overrides the demand of the request
    let effective = Request {
        demand: optimizer.demand_override().or(request.demand),
        ..*request
    };

    let mut rng = StdRng::seed_from_u64(seed);
    let outcome = optimizer.optimize(net, &effective, &mut rng, cancel)?;

    let SearchOutcome {
        best,
        cost: _,
        cancelled,
    } = outcome;

    let path = match best {
        Some(path) => path,
        None => {
            // only cancellation before the first success ends up here
            return Ok(RouteResult {
                algorithm,
                path: Vec::new(),
                metrics: None,
                per_node: Vec::new(),
                per_edge: Vec::new(),
                notes: "cancelled".to_string(),
            });
        }
    };

    let mut notes = Vec::new();
    if cancelled {
        // the cancellation contract: the notes start with exactly "cancelled"
        notes.push("cancelled".to_string());
    } else {
        notes.push("ok".to_string());
        if let Some(remark) = optimizer.annotation() {
            notes.push(remark.to_string());
        }
        if !unknown.is_empty() {
            notes.push(format!(
                "ignored unknown parameters: {}",
                unknown.iter().join(", ")
            ));
        }
    }

    match validate_path(net, &effective, &path, optimizer.hard_demand()) {
        Ok(()) => finish(algorithm, net, &effective, path, notes),
        Err(e) => {
            log::warn!(
                "{} returned an invalid path ({}); falling back to the baseline router",
                optimizer.name(),
                e
            );
            let fallback =
                baseline::route(net, effective.source, effective.target, &effective.weights)?;
            notes.push(format!(
                "optimizer returned an invalid path ({}); fell back to the baseline router",
                e
            ));
            finish(algorithm, net, &effective, fallback, notes)
        }
    }
}

/// Re-score the path with the metric engine and assemble the result record.
fn finish(
    algorithm: Algorithm,
    net: &Network,
    request: &Request,
    path: Vec<NodeId>,
    notes: Vec<String>,
) -> Result<RouteResult, RoutingError> {
    let engine = MetricsEngine::new(net);
    let metrics = engine.compute(&path, request.demand)?;
    let total_cost = engine.weighted_sum(&metrics, &request.weights);

    let hops: Vec<(NodeId, NodeId)> = path.iter().copied().tuple_windows().collect();
    let per_node: Vec<NodeParams> = path
        .iter()
        .map(|&n| net.node(n).copied())
        .collect::<Result<_, _>>()?;
    let per_edge: Vec<LinkParams> = hops
        .iter()
        .map(|&(u, v)| net.link(u, v).copied())
        .collect::<Result<_, _>>()?;

    Ok(RouteResult {
        algorithm,
        path,
        metrics: Some(RouteMetrics {
            total_delay_ms: metrics.total_delay_ms,
            total_reliability: metrics.total_reliability,
            reliability_cost: metrics.reliability_cost,
            resource_cost: metrics.resource_cost,
            total_cost,
            weights: request.weights,
            hops,
        }),
        per_node,
        per_edge,
        notes: notes.join("; "),
    })
}
