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

//! Tabular Q-Learning over `(current node, next node)` transitions with an
//! ε-greedy exploration policy.
//!
//! The state is the current node only; loops are prevented during an episode
//! by the episode's own path memory, which applies a penalty and ends the
//! episode on a revisit. Reaching the destination pays a reward inversely
//! proportional to the scalar cost of the walked path, so cheaper routes
//! accumulate larger action values.

use std::collections::{HashMap, HashSet};

use rand::{Rng, RngCore};

use crate::metrics::MetricsEngine;
use crate::network::Network;
use crate::optimizers::{
    bounded_param, f64_param, usize_param, ParamMap, RouteOptimizer, SearchOutcome,
};
use crate::types::{CancelToken, NodeId, Request, RoutingError};

/// Exploration rate at the first episode.
const EPSILON_START: f64 = 1.0;
/// Exploration never decays below this rate.
const EPSILON_MIN: f64 = 0.01;
/// Reward for stepping onto a node that is already part of the episode path.
const LOOP_PENALTY: f64 = -1000.0;
/// Reward for every ordinary step.
const STEP_PENALTY: f64 = -1.0;
/// Numerator of the goal reward `GOAL_SCALE / (cost + COST_EPS)`.
const GOAL_SCALE: f64 = 10_000.0;
/// Guards the goal reward against a division by zero.
const COST_EPS: f64 = 1e-9;

/// A learned action value table, keyed by the directed `(state, action)`
/// transition.
type QTable = HashMap<(NodeId, NodeId), f64>;

/// The Q-Learning optimizer.
#[derive(Debug, Clone, PartialEq)]
pub struct QLearning {
    /// Number of training episodes (`episodes`).
    pub episodes: usize,
    /// Learning rate (`alpha`).
    pub alpha: f64,
    /// Discount factor (`gamma`).
    pub gamma: f64,
    /// Multiplicative ε decay applied after every episode
    /// (`epsilon_decay`).
    pub epsilon_decay: f64,
    /// Bandwidth demand configured on the optimizer (`min_bandwidth`).
    pub demand: Option<f64>,
}

impl Default for QLearning {
    fn default() -> Self {
        Self {
            episodes: 500,
            alpha: 0.1,
            gamma: 0.9,
            epsilon_decay: 0.995,
            demand: None,
        }
    }
}

impl QLearning {
    /// Build the optimizer from a parameter map. Recognized keys:
    /// `episodes`, `alpha`, `gamma`, `epsilon_decay`, `min_bandwidth`.
    /// Unrecognized keys are returned for the caller to report.
    pub fn from_config(params: &ParamMap) -> Result<(Self, Vec<String>), RoutingError> {
        let mut ql = Self::default();
        let mut unknown = Vec::new();
        for (key, value) in params {
            match key.as_str() {
                "episodes" => ql.episodes = usize_param(key, value)?,
                "alpha" => ql.alpha = bounded_param(key, value, 0.0, 1.0)?,
                "gamma" => ql.gamma = bounded_param(key, value, 0.0, 1.0)?,
                "epsilon_decay" => ql.epsilon_decay = bounded_param(key, value, 0.0, 1.0)?,
                "min_bandwidth" => ql.demand = Some(f64_param(key, value)?),
                _ => unknown.push(key.clone()),
            }
        }
        Ok((ql, unknown))
    }

    fn q(table: &QTable, state: NodeId, action: NodeId) -> f64 {
        table.get(&(state, action)).copied().unwrap_or(0.0)
    }

    /// ε-greedy action selection among the feasible actions, ties broken
    /// uniformly at random.
    fn choose(
        &self,
        table: &QTable,
        state: NodeId,
        actions: &[NodeId],
        epsilon: f64,
        rng: &mut dyn RngCore,
    ) -> NodeId {
        if rng.gen::<f64>() < epsilon {
            return actions[rng.gen_range(0..actions.len())];
        }
        let max_q = actions
            .iter()
            .map(|&a| Self::q(table, state, a))
            .fold(f64::NEG_INFINITY, f64::max);
        let best: Vec<NodeId> = actions
            .iter()
            .copied()
            .filter(|&a| Self::q(table, state, a) == max_q)
            .collect();
        best[rng.gen_range(0..best.len())]
    }

    /// One Bellman update. The future value is the maximum over the feasible
    /// actions of the successor state, or zero when the successor is stuck.
    fn update(
        &self,
        table: &mut QTable,
        net: &Network,
        demand: Option<f64>,
        state: NodeId,
        action: NodeId,
        reward: f64,
    ) {
        let future = net
            .feasible_neighbors(action, demand)
            .map(|n| Self::q(table, action, n))
            .fold(f64::NEG_INFINITY, f64::max);
        let future = if future.is_finite() { future } else { 0.0 };
        let old = Self::q(table, state, action);
        table.insert(
            (state, action),
            old + self.alpha * (reward + self.gamma * future - old),
        );
    }

    /// Run a single training episode.
    fn episode(
        &self,
        net: &Network,
        request: &Request,
        engine: &MetricsEngine<'_>,
        table: &mut QTable,
        epsilon: f64,
        rng: &mut dyn RngCore,
    ) -> Result<(), RoutingError> {
        let cap = net.num_nodes();
        let mut state = request.source;
        let mut path = vec![state];

        while state != request.target {
            let actions: Vec<NodeId> = net.feasible_neighbors(state, request.demand).collect();
            if actions.is_empty() {
                break;
            }
            let action = self.choose(table, state, &actions, epsilon, rng);

            if path.contains(&action) {
                self.update(table, net, request.demand, state, action, LOOP_PENALTY);
                break;
            }
            path.push(action);

            let reward = if action == request.target {
                let cost = engine.scalar_cost(&path, request.demand, &request.weights)?;
                GOAL_SCALE / (cost + COST_EPS)
            } else {
                STEP_PENALTY
            };
            self.update(table, net, request.demand, state, action, reward);
            state = action;

            if path.len() > cap {
                break;
            }
        }
        Ok(())
    }

    /// Extract the greedy policy path: from the source, repeatedly take the
    /// feasible unvisited neighbor with the largest action value. `None`
    /// when the walk stalls before the destination.
    fn extract(&self, net: &Network, request: &Request, table: &QTable) -> Option<Vec<NodeId>> {
        let mut path = vec![request.source];
        let mut visited: HashSet<NodeId> = HashSet::from([request.source]);
        let mut state = request.source;
        while state != request.target {
            let candidates: Vec<NodeId> = net
                .feasible_neighbors(state, request.demand)
                .filter(|n| !visited.contains(n))
                .collect();
            let next = candidates
                .into_iter()
                .max_by(|&a, &b| {
                    Self::q(table, state, a).total_cmp(&Self::q(table, state, b))
                })?;
            path.push(next);
            visited.insert(next);
            state = next;
        }
        Some(path)
    }
}

impl RouteOptimizer for QLearning {
    fn name(&self) -> &'static str {
        "q-learning"
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
        let mut table = QTable::new();
        let mut epsilon = EPSILON_START;
        let mut cancelled = false;

        for episode in 0..self.episodes {
            if cancel.is_cancelled() {
                log::debug!("q-learning cancelled after {} episodes", episode);
                cancelled = true;
                break;
            }
            self.episode(net, request, &engine, &mut table, epsilon, rng)?;
            epsilon = (epsilon * self.epsilon_decay).max(EPSILON_MIN);
        }

        match self.extract(net, request, &table) {
            Some(path) => {
                let cost = engine.scalar_cost(&path, request.demand, &request.weights)?;
                Ok(SearchOutcome {
                    best: Some(path),
                    cost,
                    cancelled,
                })
            }
            None if cancelled => Ok(SearchOutcome {
                best: None,
                cost: f64::INFINITY,
                cancelled: true,
            }),
            None => Err(RoutingError::NoPath(request.source, request.target)),
        }
    }
}
