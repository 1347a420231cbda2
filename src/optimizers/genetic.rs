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

//! Genetic Algorithm: a population of feasible paths evolved by elitist
//! truncation selection, common-node crossover, and tail-rewrite mutation.
//!
//! Replacement is generation-based (parents do not survive); the best
//! individual ever observed is tracked outside the population. Offspring of
//! the crossover are repaired by stripping the cycle between duplicate node
//! occurrences, so every individual stays a simple path.

use std::collections::{HashMap, HashSet};

use rand::{Rng, RngCore};

use crate::metrics::MetricsEngine;
use crate::network::Network;
use crate::optimizers::{
    bounded_param, usize_param, ParamMap, RouteOptimizer, SearchOutcome,
};
use crate::types::{CancelToken, NodeId, Request, RoutingError};

/// The Genetic Algorithm optimizer.
#[derive(Debug, Clone, PartialEq)]
pub struct Genetic {
    /// Population size (`pop_size`).
    pub pop_size: usize,
    /// Number of generations (`generations`).
    pub generations: usize,
    /// Probability of mutating an offspring, in `[0, 1]` (`mutation_rate`).
    pub mutation_rate: f64,
    /// Multiplier on `pop_size` bounding the retries of the initial
    /// population construction.
    pub attempts_multiplier: usize,
}

impl Default for Genetic {
    fn default() -> Self {
        Self {
            pop_size: 50,
            generations: 100,
            mutation_rate: 0.1,
            attempts_multiplier: 10,
        }
    }
}

impl Genetic {
    /// Build the optimizer from a parameter map. Recognized keys:
    /// `pop_size`, `generations`, `mutation_rate`. Unrecognized keys are
    /// returned for the caller to report.
    pub fn from_config(params: &ParamMap) -> Result<(Self, Vec<String>), RoutingError> {
        let mut ga = Self::default();
        let mut unknown = Vec::new();
        for (key, value) in params {
            match key.as_str() {
                "pop_size" => ga.pop_size = usize_param(key, value)?.max(2),
                "generations" => ga.generations = usize_param(key, value)?,
                "mutation_rate" => ga.mutation_rate = bounded_param(key, value, 0.0, 1.0)?,
                _ => unknown.push(key.clone()),
            }
        }
        Ok((ga, unknown))
    }

    /// With probability `mutation_rate`, keep a random prefix of the path
    /// and rebuild the tail randomly. The tail construction avoids the kept
    /// prefix, so the mutant stays simple. The individual is returned
    /// unchanged when no tail can be found.
    fn mutate(
        &self,
        net: &Network,
        path: Vec<NodeId>,
        target: NodeId,
        rng: &mut dyn RngCore,
    ) -> Vec<NodeId> {
        if path.len() < 3 || !rng.gen_bool(self.mutation_rate) {
            return path;
        }
        let pivot_idx = rng.gen_range(1..path.len() - 1);
        let forbidden: HashSet<NodeId> = path[..pivot_idx].iter().copied().collect();
        match random_simple_path(net, path[pivot_idx], target, &forbidden, rng) {
            Some(tail) => {
                let mut mutant = path[..pivot_idx].to_vec();
                mutant.extend(tail);
                mutant
            }
            None => path,
        }
    }
}

impl RouteOptimizer for Genetic {
    fn name(&self) -> &'static str {
        "genetic"
    }

    fn annotation(&self) -> Option<&'static str> {
        Some("crossover offspring repaired by cycle stripping")
    }

    fn optimize(
        &self,
        net: &Network,
        request: &Request,
        rng: &mut dyn RngCore,
        cancel: &CancelToken,
    ) -> Result<SearchOutcome, RoutingError> {
        let engine = MetricsEngine::new(net);
        let score = |path: &[NodeId]| {
            engine
                .scalar_cost(path, request.demand, &request.weights)
                .unwrap_or(f64::INFINITY)
        };

        // initial population of random simple paths, with a bounded retry
        // budget
        let mut population: Vec<Vec<NodeId>> = Vec::with_capacity(self.pop_size);
        let budget = self.pop_size * self.attempts_multiplier;
        let mut attempts = 0;
        while population.len() < self.pop_size && attempts < budget {
            attempts += 1;
            if let Some(path) =
                random_simple_path(net, request.source, request.target, &HashSet::new(), rng)
            {
                population.push(path);
            }
        }
        if population.is_empty() {
            return Err(RoutingError::NoPath(request.source, request.target));
        }
        if population.len() < self.pop_size {
            log::warn!(
                "population budget exhausted: continuing with {} of {} individuals",
                population.len(),
                self.pop_size
            );
        }

        let mut best: Option<(Vec<NodeId>, f64)> = None;

        for generation in 0..self.generations {
            if cancel.is_cancelled() {
                return Ok(best_outcome(best).into_cancelled());
            }

            // score and select the top half
            let mut scored: Vec<(Vec<NodeId>, f64)> = population
                .drain(..)
                .map(|path| {
                    let cost = score(&path);
                    (path, cost)
                })
                .collect();
            scored.sort_by(|a, b| a.1.total_cmp(&b.1));
            let num_parents = (scored.len() / 2).max(1);
            scored.truncate(num_parents);

            let (leader, leader_cost) = &scored[0];
            if !leader_cost.is_finite() {
                log::debug!("generation {}: no feasible parent left", generation);
                break;
            }
            if best.as_ref().map_or(true, |(_, c)| leader_cost < c) {
                best = Some((leader.clone(), *leader_cost));
            }

            let parents: Vec<Vec<NodeId>> = scored.into_iter().map(|(p, _)| p).collect();

            // offspring fully replace the generation
            let mut offspring = Vec::with_capacity(self.pop_size);
            while offspring.len() < self.pop_size {
                let p1 = &parents[rng.gen_range(0..parents.len())];
                let p2 = &parents[rng.gen_range(0..parents.len())];
                let (c1, c2) = crossover(p1, p2, rng);
                offspring.push(self.mutate(net, c1, request.target, rng));
                if offspring.len() < self.pop_size {
                    offspring.push(self.mutate(net, c2, request.target, rng));
                }
            }
            population = offspring;
        }

        match best {
            Some((path, cost)) => Ok(SearchOutcome::found(path, cost)),
            None => Err(RoutingError::NoPath(request.source, request.target)),
        }
    }
}

fn best_outcome(best: Option<(Vec<NodeId>, f64)>) -> SearchOutcome {
    match best {
        Some((path, cost)) => SearchOutcome::found(path, cost),
        None => SearchOutcome {
            best: None,
            cost: f64::INFINITY,
            cancelled: false,
        },
    }
}

/// Build a random simple path from `from` to `to` by uniform choice among
/// the not-yet-visited neighbors, never entering `forbidden`. `None` when the
/// walk dead-ends.
fn random_simple_path(
    net: &Network,
    from: NodeId,
    to: NodeId,
    forbidden: &HashSet<NodeId>,
    rng: &mut dyn RngCore,
) -> Option<Vec<NodeId>> {
    let mut visited = forbidden.clone();
    visited.insert(from);
    let mut path = vec![from];
    let mut current = from;
    while current != to {
        let candidates: Vec<NodeId> = net
            .neighbors(current)
            .filter(|n| !visited.contains(n))
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let next = candidates[rng.gen_range(0..candidates.len())];
        path.push(next);
        visited.insert(next);
        current = next;
    }
    Some(path)
}

/// Common-node crossover: exchange the tails of the two parents at a random
/// shared interior node. Parents without a shared interior node are returned
/// unchanged. Offspring are repaired into simple paths by cycle stripping.
fn crossover(
    p1: &[NodeId],
    p2: &[NodeId],
    rng: &mut dyn RngCore,
) -> (Vec<NodeId>, Vec<NodeId>) {
    let in_p2: HashSet<NodeId> = interior(p2).iter().copied().collect();
    let shared: Vec<NodeId> = interior(p1)
        .iter()
        .copied()
        .filter(|n| in_p2.contains(n))
        .collect();
    if shared.is_empty() {
        return (p1.to_vec(), p2.to_vec());
    }
    let cut = shared[rng.gen_range(0..shared.len())];
    let splice = |head: &[NodeId], tail: &[NodeId]| -> Vec<NodeId> {
        // the cut node occurs in both parents, position() cannot fail
        let hi = head.iter().position(|&n| n == cut).unwrap_or(0);
        let ti = tail.iter().position(|&n| n == cut).unwrap_or(0);
        let mut child = head[..=hi].to_vec();
        child.extend_from_slice(&tail[ti + 1..]);
        strip_cycles(child)
    };
    (splice(p1, p2), splice(p2, p1))
}

/// The interior nodes of a path (both endpoints stripped).
fn interior(p: &[NodeId]) -> &[NodeId] {
    if p.len() < 3 {
        &[]
    } else {
        &p[1..p.len() - 1]
    }
}

/// Remove every cycle from a walk by cutting the detour between the two
/// occurrences of a repeated node. The result visits each node at most once
/// and keeps the endpoints.
fn strip_cycles(path: Vec<NodeId>) -> Vec<NodeId> {
    let mut position: HashMap<NodeId, usize> = HashMap::new();
    let mut out: Vec<NodeId> = Vec::with_capacity(path.len());
    for node in path {
        match position.get(&node) {
            Some(&at) => {
                for removed in out.drain(at + 1..) {
                    position.remove(&removed);
                }
            }
            None => {
                position.insert(node, out.len());
                out.push(node);
            }
        }
    }
    out
}
