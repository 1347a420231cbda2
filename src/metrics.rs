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

//! The metric engine: computes the per-path metrics vector (delay,
//! reliability, resource, bottleneck) and scalarizes it into the single
//! weighted cost every algorithm minimizes.
//!
//! The engine is algorithm-agnostic and pure: [`MetricsEngine::compute`] is a
//! function of the path, the demand, and the graph state only, with a fixed
//! iteration order, so identical inputs produce bit-identical results.

use itertools::Itertools;

use crate::network::{LinkParams, Network};
use crate::types::{
    PathError, PathMetrics, RoutingError, Weights, DEFAULT_INFEASIBLE_PENALTY,
    DEFAULT_REFERENCE_BANDWIDTH, NodeId, RELIABILITY_FLOOR,
};

/// Computes path metrics and weighted costs on a borrowed network.
#[derive(Debug, Clone, Copy)]
pub struct MetricsEngine<'a> {
    net: &'a Network,
    reference_bandwidth: f64,
    reliability_floor: f64,
}

impl<'a> MetricsEngine<'a> {
    /// Create an engine with the default reference bandwidth (1000 Mbps) and
    /// reliability floor (1e-12).
    pub fn new(net: &'a Network) -> Self {
        Self {
            net,
            reference_bandwidth: DEFAULT_REFERENCE_BANDWIDTH,
            reliability_floor: RELIABILITY_FLOOR,
        }
    }

    /// Replace the reference bandwidth used by the resource cost.
    pub fn with_reference_bandwidth(mut self, reference_bandwidth: f64) -> Self {
        self.reference_bandwidth = reference_bandwidth;
        self
    }

    /// Replace the floor applied to reliabilities before the logarithm.
    pub fn with_reliability_floor(mut self, reliability_floor: f64) -> Self {
        self.reliability_floor = reliability_floor;
        self
    }

    /// Compute the metrics vector of a path.
    ///
    /// Fails with [`RoutingError::InvalidPath`] if the path has fewer than
    /// two nodes or if two consecutive nodes are not connected. The path is
    /// *not* required to be simple here, and an infeasible demand does not
    /// short-circuit the computation: the metrics are returned with
    /// `feasible_for_demand = false` and the caller decides.
    pub fn compute(
        &self,
        path: &[NodeId],
        demand: Option<f64>,
    ) -> Result<PathMetrics, RoutingError> {
        if path.len() < 2 {
            return Err(PathError::TooShort.into());
        }

        // total delay: all link delays, plus processing on interior nodes
        let mut total_delay_ms = 0.0;
        for (&u, &v) in path.iter().tuple_windows() {
            total_delay_ms += self.link(u, v)?.link_delay_ms;
        }
        for &n in &path[1..path.len() - 1] {
            total_delay_ms += self.net.node(n)?.processing_delay_ms;
        }

        // reliability: nodes first, then links, clamped before the log
        let mut reliability_cost = 0.0;
        for &n in path {
            let r = self.net.node(n)?.node_reliability.max(self.reliability_floor);
            reliability_cost += -r.ln();
        }
        for (&u, &v) in path.iter().tuple_windows() {
            let r = self.link(u, v)?.link_reliability.max(self.reliability_floor);
            reliability_cost += -r.ln();
        }
        let total_reliability = (-reliability_cost).exp();

        // resource cost and bottleneck
        let mut resource_cost = 0.0;
        let mut bottleneck_capacity_mbps = f64::INFINITY;
        for (&u, &v) in path.iter().tuple_windows() {
            let cap = self.link(u, v)?.capacity_mbps;
            bottleneck_capacity_mbps = bottleneck_capacity_mbps.min(cap);
            resource_cost += self.reference_bandwidth / cap;
        }

        let feasible_for_demand = match demand {
            Some(b) => b <= bottleneck_capacity_mbps,
            None => true,
        };

        Ok(PathMetrics {
            total_delay_ms,
            reliability_cost,
            resource_cost,
            total_reliability,
            bottleneck_capacity_mbps,
            feasible_for_demand,
        })
    }

    /// Scalarize a metrics vector with the default infeasibility penalty of
    /// 1e9.
    pub fn weighted_sum(&self, metrics: &PathMetrics, weights: &Weights) -> f64 {
        self.weighted_sum_with_penalty(metrics, weights, DEFAULT_INFEASIBLE_PENALTY)
    }

    /// Scalarize a metrics vector. The weight triple is normalized by
    /// construction (see [`Weights::new`]); `infeasible_penalty` is added iff
    /// the metrics were computed against a demand the path cannot carry.
    pub fn weighted_sum_with_penalty(
        &self,
        metrics: &PathMetrics,
        weights: &Weights,
        infeasible_penalty: f64,
    ) -> f64 {
        let mut score = weights.delay * metrics.total_delay_ms
            + weights.reliability * metrics.reliability_cost
            + weights.resource * metrics.resource_cost;
        if !metrics.feasible_for_demand {
            score += infeasible_penalty;
        }
        score
    }

    /// Compute and scalarize in one step.
    pub fn scalar_cost(
        &self,
        path: &[NodeId],
        demand: Option<f64>,
        weights: &Weights,
    ) -> Result<f64, RoutingError> {
        let metrics = self.compute(path, demand)?;
        Ok(self.weighted_sum(&metrics, weights))
    }

    fn link(&self, u: NodeId, v: NodeId) -> Result<&LinkParams, RoutingError> {
        self.net
            .find_link(u, v)
            .ok_or(RoutingError::InvalidPath(PathError::MissingLink(u, v)))
    }
}
