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

//! The comparison harness: N independent trials per algorithm on identical
//! inputs, with derived seeds, private graph copies, and per-run and
//! per-algorithm aggregate rows.
//!
//! The harness never propagates a per-run error: every failure becomes a
//! FAIL row with its reason, so that success rates and failure modes stay
//! measurable. Only invalid *inputs* (bad endpoints) are rejected up front.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::adapter::{self, Algorithm, ParamMap};
use crate::network::Network;
use crate::types::{CancelToken, NodeId, Request, RoutingError};

/// The harness always performs at least this many runs per algorithm.
pub const MIN_RUNS: usize = 5;

/// Options of a single comparison.
#[derive(Debug, Clone)]
pub struct CompareOptions {
    /// Number of runs per algorithm (clamped to at least [`MIN_RUNS`]).
    pub num_runs: usize,
    /// Base of the derived per-run seeds
    /// (`base_seed + algo_index * num_runs + run_index`).
    pub base_seed: u64,
    /// Identifier tagging every emitted row.
    pub scenario_id: u64,
    /// Fan the runs out on the rayon thread pool.
    pub parallel: bool,
    /// Per-algorithm parameter overrides. Algorithms without an entry run
    /// with their defaults.
    pub default_params: BTreeMap<Algorithm, ParamMap>,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            num_runs: MIN_RUNS,
            base_seed: 1000,
            scenario_id: 0,
            parallel: false,
            default_params: BTreeMap::new(),
        }
    }
}

/// Whether a run produced a usable route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    /// The run returned a valid route.
    Ok,
    /// The run failed; see the fail reason.
    Fail,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Ok => f.write_str("OK"),
            RunStatus::Fail => f.write_str("FAIL"),
        }
    }
}

/// Why a run failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailReason {
    /// Source and destination are disconnected under the active constraints.
    NoPath,
    /// The returned path violated the path invariants.
    InvalidPath,
    /// No path can carry the requested bandwidth.
    BandwidthConstraint,
    /// Any other error, with its diagnostic text.
    RuntimeError(String),
}

impl fmt::Display for FailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailReason::NoPath => f.write_str("no_path"),
            FailReason::InvalidPath => f.write_str("invalid_path"),
            FailReason::BandwidthConstraint => f.write_str("bandwidth_constraint"),
            FailReason::RuntimeError(detail) => write!(f, "runtime_error({})", detail),
        }
    }
}

impl From<RoutingError> for FailReason {
    fn from(e: RoutingError) -> Self {
        match e {
            RoutingError::NoPath(_, _) => FailReason::NoPath,
            RoutingError::InvalidPath(_) => FailReason::InvalidPath,
            RoutingError::BandwidthInfeasible(_) => FailReason::BandwidthConstraint,
            other => FailReason::RuntimeError(other.to_string()),
        }
    }
}

/// One row of the per-run table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    /// Identifier of the scenario this run belongs to.
    pub scenario_id: u64,
    /// Source node of the request.
    pub source: NodeId,
    /// Destination node of the request.
    pub target: NodeId,
    /// Bandwidth demand of the request, if any.
    pub demand: Option<f64>,
    /// The algorithm that ran.
    pub algorithm: Algorithm,
    /// Run index, starting at 1.
    pub run_id: usize,
    /// Whether the run succeeded.
    pub status: RunStatus,
    /// The failure reason of a FAIL row.
    pub fail_reason: Option<FailReason>,
    /// Total path delay in milliseconds (successes only).
    pub total_delay_ms: Option<f64>,
    /// Reliability cost (successes only).
    pub reliability_cost: Option<f64>,
    /// Resource cost (successes only).
    pub resource_cost: Option<f64>,
    /// Scalar weighted cost (successes only).
    pub total_cost: Option<f64>,
    /// Wall-clock duration of the run in milliseconds.
    pub runtime_ms: f64,
    /// The returned route (empty on failure).
    pub path: Vec<NodeId>,
}

/// One row of the per-algorithm summary table. The cost aggregates are
/// `None` when the algorithm never succeeded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlgorithmSummary {
    /// Identifier of the scenario.
    pub scenario_id: u64,
    /// The algorithm being summarized.
    pub algorithm: Algorithm,
    /// Number of successful runs.
    pub success_count: usize,
    /// `success_count / num_runs`.
    pub success_rate: f64,
    /// Mean total cost across successes.
    pub avg_total_cost: Option<f64>,
    /// Sample standard deviation of the total cost across successes.
    pub std_total_cost: Option<f64>,
    /// Smallest total cost across successes.
    pub best_total_cost: Option<f64>,
    /// Largest total cost across successes.
    pub worst_total_cost: Option<f64>,
    /// Mean runtime across all attempts (including failures).
    pub avg_runtime_ms: f64,
}

/// The fully-materialized result of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    /// All per-run rows, in the fixed algorithm order.
    pub runs: Vec<RunRecord>,
    /// One summary row per algorithm, in the fixed order.
    pub summary: Vec<AlgorithmSummary>,
    /// The cheapest successful route per algorithm.
    pub best_paths: BTreeMap<Algorithm, Vec<NodeId>>,
}

/// Apply the same request to every algorithm, `num_runs` times each, and
/// aggregate the outcomes.
///
/// Every run works on a private deep copy of the network and owns its RNG,
/// seeded as `base_seed + algo_index * num_runs + run_index`; with
/// `parallel` set, the runs fan out on the rayon pool and are re-collected
/// in order before any aggregation.
pub fn compare(
    net: &Network,
    request: &Request,
    options: &CompareOptions,
) -> Result<Comparison, RoutingError> {
    adapter::check_request(net, request)?;
    let num_runs = options.num_runs.max(MIN_RUNS);

    let jobs: Vec<(usize, Algorithm, usize)> = Algorithm::ALL
        .iter()
        .enumerate()
        .flat_map(|(ai, &algo)| (0..num_runs).map(move |run| (ai, algo, run)))
        .collect();

    let empty = ParamMap::new();
    let execute = |&(algo_index, algorithm, run): &(usize, Algorithm, usize)| -> RunRecord {
        let params = options.default_params.get(&algorithm).unwrap_or(&empty);
        let seed = options.base_seed + (algo_index * num_runs + run) as u64;
        // a private copy, so that concurrent trials never share state
        let private = net.clone();
        let start = Instant::now();
        let outcome = adapter::run(
            algorithm,
            &private,
            request,
            params,
            seed,
            &CancelToken::new(),
        );
        let runtime_ms = start.elapsed().as_secs_f64() * 1000.0;

        let mut record = RunRecord {
            scenario_id: options.scenario_id,
            source: request.source,
            target: request.target,
            demand: request.demand,
            algorithm,
            run_id: run + 1,
            status: RunStatus::Fail,
            fail_reason: None,
            total_delay_ms: None,
            reliability_cost: None,
            resource_cost: None,
            total_cost: None,
            runtime_ms,
            path: Vec::new(),
        };
        match outcome {
            Ok(result) => match result.metrics {
                Some(metrics) => {
                    record.status = RunStatus::Ok;
                    record.total_delay_ms = Some(metrics.total_delay_ms);
                    record.reliability_cost = Some(metrics.reliability_cost);
                    record.resource_cost = Some(metrics.resource_cost);
                    record.total_cost = Some(metrics.total_cost);
                    record.path = result.path;
                }
                None => {
                    record.fail_reason = Some(FailReason::RuntimeError(result.notes));
                }
            },
            Err(e) => {
                log::debug!("{} run {} failed: {}", algorithm, run + 1, e);
                record.fail_reason = Some(e.into());
            }
        }
        record
    };

    // rayon's collect preserves the job order, so the records come out in
    // the fixed algorithm order either way
    let runs: Vec<RunRecord> = if options.parallel {
        jobs.par_iter().map(execute).collect()
    } else {
        jobs.iter().map(execute).collect()
    };

    let mut summary = Vec::with_capacity(Algorithm::ALL.len());
    let mut best_paths = BTreeMap::new();
    for (algo_index, &algorithm) in Algorithm::ALL.iter().enumerate() {
        let rows = &runs[algo_index * num_runs..(algo_index + 1) * num_runs];
        summary.push(summarize(options.scenario_id, algorithm, rows));
        if let Some(best) = rows
            .iter()
            .filter(|r| r.status == RunStatus::Ok)
            .min_by(|a, b| {
                a.total_cost
                    .unwrap_or(f64::INFINITY)
                    .total_cmp(&b.total_cost.unwrap_or(f64::INFINITY))
            })
        {
            best_paths.insert(algorithm, best.path.clone());
        }
    }

    Ok(Comparison {
        runs,
        summary,
        best_paths,
    })
}

fn summarize(scenario_id: u64, algorithm: Algorithm, rows: &[RunRecord]) -> AlgorithmSummary {
    let costs: Vec<f64> = rows
        .iter()
        .filter(|r| r.status == RunStatus::Ok)
        .filter_map(|r| r.total_cost)
        .collect();
    let success_count = costs.len();
    let avg_runtime_ms = rows.iter().map(|r| r.runtime_ms).sum::<f64>() / rows.len() as f64;

    let (avg, std, best, worst) = if costs.is_empty() {
        (None, None, None, None)
    } else {
        let n = costs.len() as f64;
        let mean = costs.iter().sum::<f64>() / n;
        let std = if costs.len() > 1 {
            (costs.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        } else {
            0.0
        };
        let best = costs.iter().copied().fold(f64::INFINITY, f64::min);
        let worst = costs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        (Some(mean), Some(std), Some(best), Some(worst))
    };

    AlgorithmSummary {
        scenario_id,
        algorithm,
        success_count,
        success_rate: success_count as f64 / rows.len() as f64,
        avg_total_cost: avg,
        std_total_cost: std,
        best_total_cost: best,
        worst_total_cost: worst,
        avg_runtime_ms,
    }
}
