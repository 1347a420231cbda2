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

//! The portfolio of stochastic route optimizers, all behind the single
//! [`RouteOptimizer`] contract: Ant Colony ([`Aco`]), Genetic Algorithm
//! ([`Genetic`]), Q-Learning ([`QLearning`]), and Simulated Annealing
//! ([`Annealing`]).
//!
//! Every optimizer receives a read-only network, a request whose demand has
//! already been resolved by the adapter, its own seeded random number
//! generator, and a cancellation token that it checks at every outer-loop
//! boundary.

mod aco;
mod annealing;
mod genetic;
mod qlearning;

pub use aco::Aco;
pub use annealing::Annealing;
pub use genetic::Genetic;
pub use qlearning::QLearning;

use std::collections::BTreeMap;

use rand::RngCore;
use serde_json::Value;

use crate::network::Network;
use crate::types::{CancelToken, NodeId, Request, RoutingError};

/// A loosely-typed algorithm parameter map, as supplied by a driver. Keys
/// are the per-algorithm names enumerated in the adapter; values are
/// interpreted by each optimizer's `from_config`.
pub type ParamMap = BTreeMap<String, Value>;

/// The result of a single optimizer invocation: the best path found (if
/// any), its scalar cost as accounted by the optimizer, and whether the
/// search was cut short by cancellation.
///
/// The optimizer's own cost accounting is advisory; the adapter re-scores
/// the path with the metric engine before reporting it.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// The best path observed during the search.
    pub best: Option<Vec<NodeId>>,
    /// The scalar cost of `best` (infinite when `best` is `None`).
    pub cost: f64,
    /// Whether the search stopped because the cancellation flag was raised.
    pub cancelled: bool,
}

impl SearchOutcome {
    /// An outcome carrying a found path.
    pub fn found(best: Vec<NodeId>, cost: f64) -> Self {
        Self {
            best: Some(best),
            cost,
            cancelled: false,
        }
    }

    /// Mark the outcome as cancelled.
    pub fn into_cancelled(mut self) -> Self {
        self.cancelled = true;
        self
    }
}

/// The uniform invocation contract of all route optimizers.
pub trait RouteOptimizer {
    /// Stable, lowercase name of the optimizer.
    fn name(&self) -> &'static str;

    /// The bandwidth demand configured on the optimizer itself (the
    /// `demand_bw` / `min_bandwidth` parameter keys). Takes precedence over
    /// the demand of the request.
    fn demand_override(&self) -> Option<f64> {
        None
    }

    /// Whether the optimizer treats the demand as a hard constraint. Hard
    /// demand means the returned path must not contain a link below the
    /// demand; the adapter then validates capacities as well.
    fn hard_demand(&self) -> bool {
        false
    }

    /// A fixed remark about how this optimizer deviates from the plain
    /// textbook procedure, appended to the run's notes by the adapter.
    fn annotation(&self) -> Option<&'static str> {
        None
    }

    /// Search for a route answering `request` on `net`. The request's demand
    /// is already the effective one. Implementations must check `cancel` at
    /// every outer-loop boundary and return the best-so-far with
    /// `cancelled = true` when it is raised.
    fn optimize(
        &self,
        net: &Network,
        request: &Request,
        rng: &mut dyn RngCore,
        cancel: &CancelToken,
    ) -> Result<SearchOutcome, RoutingError>;
}

/// Interpret a configuration value as a float.
pub(crate) fn f64_param(key: &str, value: &Value) -> Result<f64, RoutingError> {
    value
        .as_f64()
        .filter(|x| x.is_finite())
        .ok_or_else(|| malformed(key, value, "a finite number"))
}

/// Interpret a configuration value as a non-negative integer. Integral
/// floats (`50.0`) are accepted.
pub(crate) fn usize_param(key: &str, value: &Value) -> Result<usize, RoutingError> {
    value
        .as_u64()
        .map(|x| x as usize)
        .or_else(|| {
            value
                .as_f64()
                .filter(|x| x.is_finite() && *x >= 0.0 && x.fract() == 0.0)
                .map(|x| x as usize)
        })
        .ok_or_else(|| malformed(key, value, "a non-negative integer"))
}

/// Interpret a configuration value as a float within the given bounds.
pub(crate) fn bounded_param(
    key: &str,
    value: &Value,
    min: f64,
    max: f64,
) -> Result<f64, RoutingError> {
    let x = f64_param(key, value)?;
    if x < min || x > max {
        return Err(RoutingError::InvalidConfig(format!(
            "parameter `{}` must be in [{}, {}], got {}",
            key, min, max, x
        )));
    }
    Ok(x)
}

fn malformed(key: &str, value: &Value, expected: &str) -> RoutingError {
    RoutingError::InvalidConfig(format!(
        "parameter `{}` expects {}, got {}",
        key, expected, value
    ))
}
