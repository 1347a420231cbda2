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

//! Simulated Annealing with a pivot-tail rewrite neighborhood.
//!
//! Unlike the other optimizers, the bandwidth demand is a *hard* constraint
//! here: the search only ever touches the working graph consisting of links
//! that can carry the demand. Both the initial solution and every rewritten
//! tail are minimum-delay paths on that working graph.

use rand::{Rng, RngCore};

use crate::baseline::shortest_delay_path;
use crate::metrics::MetricsEngine;
use crate::network::Network;
use crate::optimizers::{
    bounded_param, f64_param, usize_param, ParamMap, RouteOptimizer, SearchOutcome,
};
use crate::types::{CancelToken, Request, RoutingError};

/// Guards the Metropolis exponent against a division by zero.
const TEMPERATURE_EPS: f64 = 1e-9;

/// The Simulated Annealing optimizer.
#[derive(Debug, Clone, PartialEq)]
pub struct Annealing {
    /// Initial temperature (`T0`).
    pub t0: f64,
    /// Multiplicative cooling factor in `(0, 1)` (`alpha`).
    pub alpha: f64,
    /// Iteration cap (`max_iter`).
    pub max_iter: usize,
    /// The search stops once the temperature falls below this floor.
    pub t_min: f64,
    /// Bandwidth demand configured on the optimizer (`demand_bw`), treated
    /// as a hard link filter.
    pub demand: Option<f64>,
}

impl Default for Annealing {
    fn default() -> Self {
        Self {
            t0: 100.0,
            alpha: 0.995,
            max_iter: 5000,
            t_min: 1e-6,
            demand: None,
        }
    }
}

impl Annealing {
    /// Build the optimizer from a parameter map. Recognized keys: `T0`,
    /// `alpha`, `max_iter`, `demand_bw`. Unrecognized keys are returned for
    /// the caller to report.
    pub fn from_config(params: &ParamMap) -> Result<(Self, Vec<String>), RoutingError> {
        let mut sa = Self::default();
        let mut unknown = Vec::new();
        for (key, value) in params {
            match key.as_str() {
                "T0" => sa.t0 = f64_param(key, value)?,
                "alpha" => sa.alpha = bounded_param(key, value, 0.0, 1.0)?,
                "max_iter" => sa.max_iter = usize_param(key, value)?,
                "demand_bw" => sa.demand = Some(f64_param(key, value)?),
                _ => unknown.push(key.clone()),
            }
        }
        Ok((sa, unknown))
    }
}

impl RouteOptimizer for Annealing {
    fn name(&self) -> &'static str {
        "annealing"
    }

    fn demand_override(&self) -> Option<f64> {
        self.demand
    }

    fn hard_demand(&self) -> bool {
        true
    }

    fn optimize(
        &self,
        net: &Network,
        request: &Request,
        rng: &mut dyn RngCore,
        cancel: &CancelToken,
    ) -> Result<SearchOutcome, RoutingError> {
        let demand = request.demand;

        let initial = match shortest_delay_path(net, request.source, request.target, demand) {
            Some(path) => path,
            None => {
                // distinguish a graph that is disconnected anyway from one
                // that the capacity filter disconnected
                return Err(match demand {
                    Some(b)
                        if shortest_delay_path(net, request.source, request.target, None)
                            .is_some() =>
                    {
                        RoutingError::BandwidthInfeasible(b)
                    }
                    _ => RoutingError::NoPath(request.source, request.target),
                });
            }
        };

        let engine = MetricsEngine::new(net);
        let mut current_cost = engine.scalar_cost(&initial, demand, &request.weights)?;
        let mut current = initial;
        let mut best = current.clone();
        let mut best_cost = current_cost;
        let mut temperature = self.t0;
        let mut cancelled = false;

        for _ in 0..self.max_iter {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            if temperature < self.t_min {
                break;
            }
            if current.len() < 3 {
                // a two-node path has no interior pivot to rewrite
                break;
            }

            let pivot_idx = rng.gen_range(1..current.len() - 1);
            let pivot = current[pivot_idx];
            if let Some(tail) = shortest_delay_path(net, pivot, request.target, demand) {
                let prefix = &current[..pivot_idx];
                // reject splices that would revisit a prefix node
                if tail.iter().all(|n| !prefix.contains(n)) {
                    let mut candidate = prefix.to_vec();
                    candidate.extend(tail);
                    let cost = engine.scalar_cost(&candidate, demand, &request.weights)?;
                    let delta = cost - current_cost;
                    let accept = delta < 0.0
                        || rng.gen::<f64>()
                            < (-delta / temperature.max(TEMPERATURE_EPS)).exp();
                    if accept {
                        current = candidate;
                        current_cost = cost;
                        if current_cost < best_cost {
                            best = current.clone();
                            best_cost = current_cost;
                        }
                    }
                }
            }
            temperature *= self.alpha;
        }

        // the working graph never contains an undersized link, but re-check
        // the invariant before handing the path out
        if let Some(b) = demand {
            let metrics = engine.compute(&best, Some(b))?;
            if !metrics.feasible_for_demand {
                return Err(RoutingError::BandwidthInfeasible(b));
            }
        }

        Ok(SearchOutcome {
            best: Some(best),
            cost: best_cost,
            cancelled,
        })
    }
}
