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

//! Ant Colony Optimization: pheromone-guided probabilistic walks with
//! evaporation and cost-proportional reinforcement.
//!
//! The network itself stays immutable. Pheromones live in a side table keyed
//! by the unordered node pair, owned by the single run, so concurrent trials
//! never share mutable state.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, RngCore};

use crate::metrics::MetricsEngine;
use crate::network::{link_key, Network};
use crate::optimizers::{
    bounded_param, f64_param, usize_param, ParamMap, RouteOptimizer, SearchOutcome,
};
use crate::types::{CancelToken, NodeId, Request, RoutingError};

/// Floor applied to the selection weight of every candidate step.
const MIN_STEP_WEIGHT: f64 = 1e-6;

/// Floor applied to the two-hop scalar cost before inverting it into the
/// heuristic.
const ETA_FLOOR: f64 = 1e-9;

/// The Ant Colony optimizer.
#[derive(Debug, Clone, PartialEq)]
pub struct Aco {
    /// Number of iterations (`num_iterations`).
    pub num_iterations: usize,
    /// Number of ants walking per iteration (`num_ants`).
    pub num_ants: usize,
    /// Evaporation rate in `(0, 1)` (`rho`).
    pub rho: f64,
    /// Deposit constant (`Q`).
    pub q: f64,
    /// Pheromone exponent (`alpha`).
    pub alpha: f64,
    /// Heuristic exponent (`beta`).
    pub beta: f64,
    /// Pheromone level assigned to every link at the start of a run
    /// (`initial_pheromone`).
    pub initial_pheromone: f64,
    /// Lower pheromone bound applied after evaporation.
    pub tau_min: f64,
    /// Upper pheromone bound applied on deposit and in the step weight.
    pub tau_max: f64,
    /// Bandwidth demand configured on the optimizer (`demand_bw`).
    pub demand: Option<f64>,
}

impl Default for Aco {
    fn default() -> Self {
        Self {
            num_iterations: 20,
            num_ants: 15,
            rho: 0.1,
            q: 10.0,
            alpha: 1.0,
            beta: 2.0,
            initial_pheromone: 0.1,
            tau_min: 0.01,
            tau_max: 10_000.0,
            demand: None,
        }
    }
}

impl Aco {
    /// Build the optimizer from a parameter map. Recognized keys:
    /// `num_iterations`, `num_ants`, `rho`, `Q`, `alpha`, `beta`,
    /// `initial_pheromone`, `demand_bw`. Unrecognized keys are returned for
    /// the caller to report.
    pub fn from_config(params: &ParamMap) -> Result<(Self, Vec<String>), RoutingError> {
        let mut aco = Self::default();
        let mut unknown = Vec::new();
        for (key, value) in params {
            match key.as_str() {
                "num_iterations" => aco.num_iterations = usize_param(key, value)?,
                "num_ants" => aco.num_ants = usize_param(key, value)?,
                "rho" => aco.rho = bounded_param(key, value, 0.0, 1.0)?,
                "Q" => aco.q = f64_param(key, value)?,
                "alpha" => aco.alpha = f64_param(key, value)?,
                "beta" => aco.beta = f64_param(key, value)?,
                "initial_pheromone" => aco.initial_pheromone = f64_param(key, value)?,
                "demand_bw" => aco.demand = Some(f64_param(key, value)?),
                _ => unknown.push(key.clone()),
            }
        }
        Ok((aco, unknown))
    }

    /// Walk a single ant from the source towards the destination. Returns
    /// `None` when the ant dead-ends or overstays the node budget.
    fn ant_walk(
        &self,
        net: &Network,
        request: &Request,
        pheromone: &HashMap<(NodeId, NodeId), f64>,
        eta: &mut EtaCache<'_>,
        rng: &mut dyn RngCore,
    ) -> Option<Vec<NodeId>> {
        let mut current = request.source;
        let mut visited: HashSet<NodeId> = HashSet::from([current]);
        let mut path = vec![current];

        while current != request.target {
            if path.len() > net.num_nodes() {
                return None;
            }
            let candidates: Vec<NodeId> = net
                .feasible_neighbors(current, request.demand)
                .filter(|n| !visited.contains(n))
                .collect();
            if candidates.is_empty() {
                return None;
            }
            let weights: Vec<f64> = candidates
                .iter()
                .map(|&n| {
                    let tau = pheromone
                        .get(&link_key(current, n))
                        .copied()
                        .unwrap_or(self.initial_pheromone)
                        .min(self.tau_max);
                    let step = tau.powf(self.alpha) * eta.get(current, n).powf(self.beta);
                    step.max(MIN_STEP_WEIGHT)
                })
                .collect();
            let next = match WeightedIndex::new(&weights) {
                Ok(dist) => candidates[dist.sample(rng)],
                // degenerate distribution, fall back to a uniform choice
                Err(_) => candidates[rng.gen_range(0..candidates.len())],
            };
            path.push(next);
            visited.insert(next);
            current = next;
        }
        Some(path)
    }
}

impl RouteOptimizer for Aco {
    fn name(&self) -> &'static str {
        "aco"
    }

    fn demand_override(&self) -> Option<f64> {
        self.demand
    }

    fn optimize(
        &self,
        net: &Network,
        request: &Request,
        rng: &mut dyn RngCore,
        cancel: &CancelToken,
    ) -> Result<SearchOutcome, RoutingError> {
        let engine = MetricsEngine::new(net);
        let mut eta = EtaCache::new(&engine, request);

        // every link starts at the initial pheromone level, so evaporation
        // acts uniformly on links the ants have not used yet
        let mut pheromone: HashMap<(NodeId, NodeId), f64> = net
            .links()
            .map(|(a, b, _)| (link_key(a, b), self.initial_pheromone))
            .collect();

        let mut best: Option<(Vec<NodeId>, f64)> = None;

        for iteration in 0..self.num_iterations {
            if cancel.is_cancelled() {
                return Ok(outcome_of(best).into_cancelled());
            }

            let mut successful: Vec<(Vec<NodeId>, f64)> = Vec::new();
            for _ in 0..self.num_ants {
                if let Some(path) = self.ant_walk(net, request, &pheromone, &mut eta, rng) {
                    let cost = engine.scalar_cost(&path, request.demand, &request.weights)?;
                    if best.as_ref().map_or(true, |(_, c)| cost < *c) {
                        best = Some((path.clone(), cost));
                    }
                    successful.push((path, cost));
                }
            }

            for tau in pheromone.values_mut() {
                *tau = (*tau * (1.0 - self.rho)).max(self.tau_min);
            }
            for (path, cost) in &successful {
                let addition = self.q / cost.max(0.1);
                for (&u, &v) in path.iter().tuple_windows() {
                    let tau = pheromone
                        .entry(link_key(u, v))
                        .or_insert(self.initial_pheromone);
                    *tau = (*tau + addition).min(self.tau_max);
                }
            }

            log::trace!(
                "aco iteration {}: {} of {} ants arrived, best cost {:?}",
                iteration,
                successful.len(),
                self.num_ants,
                best.as_ref().map(|(_, c)| *c)
            );
        }

        match best {
            Some((path, cost)) => Ok(SearchOutcome::found(path, cost)),
            None => Err(RoutingError::NoPath(request.source, request.target)),
        }
    }
}

fn outcome_of(best: Option<(Vec<NodeId>, f64)>) -> SearchOutcome {
    match best {
        Some((path, cost)) => SearchOutcome::found(path, cost),
        None => SearchOutcome {
            best: None,
            cost: f64::INFINITY,
            cancelled: false,
        },
    }
}

/// Per-run memoization of the heuristic `η(u, v) = 1 / max(cost([u, v]), ε)`.
/// The cache is keyed by the unordered pair; it is valid for a single weight
/// triple, which is fixed for the duration of a run.
struct EtaCache<'a> {
    engine: &'a MetricsEngine<'a>,
    request: &'a Request,
    cache: HashMap<(NodeId, NodeId), f64>,
}

impl<'a> EtaCache<'a> {
    fn new(engine: &'a MetricsEngine<'a>, request: &'a Request) -> Self {
        Self {
            engine,
            request,
            cache: HashMap::new(),
        }
    }

    fn get(&mut self, u: NodeId, v: NodeId) -> f64 {
        let key = link_key(u, v);
        if let Some(&eta) = self.cache.get(&key) {
            return eta;
        }
        // the fragment is scored without the demand: the capacity filter has
        // already excluded links that cannot carry it
        let eta = match self
            .engine
            .scalar_cost(&[u, v], None, &self.request.weights)
        {
            Ok(cost) => 1.0 / cost.max(ETA_FLOOR),
            Err(_) => MIN_STEP_WEIGHT,
        };
        self.cache.insert(key, eta);
        eta
    }
}
