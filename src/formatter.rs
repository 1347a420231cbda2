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

//! Textual output of routes and result tables: the `"n0->n1->…->nk"` path
//! notation and the CSV emission of the harness tables. Missing values
//! (failed runs, empty aggregates) are emitted as empty fields.

use std::fmt::Write;

use itertools::Itertools;

use crate::harness::{AlgorithmSummary, RunRecord};
use crate::types::NodeId;

/// Serialize a path as `"n0->n1->…->nk"`. The empty path serializes as the
/// empty string.
pub fn fmt_path(path: &[NodeId]) -> String {
    path.iter().map(|n| n.index()).join("->")
}

fn opt_field<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(|v| v.to_string()).unwrap_or_default()
}

/// Render the per-run table as CSV.
pub fn runs_csv(records: &[RunRecord]) -> String {
    let mut out = String::from(
        "scenario_id,source,target,demand,algorithm,run_id,status,fail_reason,\
         total_delay_ms,reliability_cost,resource_cost,total_cost,runtime_ms,path\n",
    );
    for r in records {
        // fail reasons may carry free-form diagnostic text
        let fail_reason = opt_field(&r.fail_reason).replace(',', ";");
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            r.scenario_id,
            r.source.index(),
            r.target.index(),
            opt_field(&r.demand),
            r.algorithm,
            r.run_id,
            r.status,
            fail_reason,
            opt_field(&r.total_delay_ms),
            opt_field(&r.reliability_cost),
            opt_field(&r.resource_cost),
            opt_field(&r.total_cost),
            r.runtime_ms,
            fmt_path(&r.path),
        );
    }
    out
}

/// Render the per-algorithm summary table as CSV.
pub fn summary_csv(rows: &[AlgorithmSummary]) -> String {
    let mut out = String::from(
        "scenario_id,algorithm,success_count,success_rate,avg_total_cost,\
         std_total_cost,best_total_cost,worst_total_cost,avg_runtime_ms\n",
    );
    for r in rows {
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{},{}",
            r.scenario_id,
            r.algorithm,
            r.success_count,
            r.success_rate,
            opt_field(&r.avg_total_cost),
            opt_field(&r.std_total_cost),
            opt_field(&r.best_total_cost),
            opt_field(&r.worst_total_cost),
            r.avg_runtime_ms,
        );
    }
    out
}
