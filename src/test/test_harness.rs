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

use pretty_assertions::assert_eq;

use crate::adapter::Algorithm;
use crate::formatter::{fmt_path, runs_csv, summary_csv};
use crate::harness::{compare, CompareOptions, FailReason, RunStatus};
use crate::test::{disconnected_pairs, triangle};
use crate::types::{Request, RoutingError, Weights};

#[test]
fn comparison_on_the_triangle() {
    let (net, n) = triangle();
    let request = Request::new(n[0], n[2], Weights::balanced()).with_demand(10.0);
    let options = CompareOptions::default();
    let comparison = compare(&net, &request, &options).unwrap();

    assert_eq!(comparison.runs.len(), Algorithm::ALL.len() * 5);
    assert_eq!(comparison.summary.len(), Algorithm::ALL.len());

    for row in &comparison.summary {
        assert_eq!(row.success_count, 5, "{}", row.algorithm);
        assert_eq!(row.success_rate, 1.0);
        // a single optimum: zero spread, and the extremes collapse
        assert_eq!(row.std_total_cost, Some(0.0));
        assert_eq!(row.best_total_cost, row.worst_total_cost);
        assert_eq!(row.best_total_cost, row.avg_total_cost);
        assert!(row.avg_runtime_ms >= 0.0);
    }
    for (_, path) in &comparison.best_paths {
        assert_eq!(path, &vec![n[0], n[2]]);
    }
}

#[test]
fn comparison_is_deterministic() {
    let (net, n) = triangle();
    let request = Request::new(n[0], n[2], Weights::balanced());
    let options = CompareOptions {
        parallel: true,
        ..Default::default()
    };
    let a = compare(&net, &request, &options).unwrap();
    let b = compare(&net, &request, &options).unwrap();

    assert_eq!(a.runs.len(), b.runs.len());
    for (ra, rb) in a.runs.iter().zip(&b.runs) {
        assert_eq!(ra.algorithm, rb.algorithm);
        assert_eq!(ra.run_id, rb.run_id);
        assert_eq!(ra.path, rb.path);
        assert_eq!(ra.total_cost, rb.total_cost);
    }
}

#[test]
fn failures_become_rows() {
    let (net, n) = disconnected_pairs();
    let request = Request::new(n[0], n[3], Weights::balanced());
    let options = CompareOptions::default();
    let comparison = compare(&net, &request, &options).unwrap();

    for row in &comparison.runs {
        assert_eq!(row.status, RunStatus::Fail);
        assert_eq!(row.fail_reason, Some(FailReason::NoPath));
        assert!(row.path.is_empty());
        assert_eq!(row.total_cost, None);
    }
    for row in &comparison.summary {
        assert_eq!(row.success_count, 0);
        assert_eq!(row.success_rate, 0.0);
        assert_eq!(row.avg_total_cost, None);
    }
    assert!(comparison.best_paths.is_empty());
}

#[test]
fn run_count_is_clamped() {
    let (net, n) = triangle();
    let request = Request::new(n[0], n[2], Weights::balanced());
    let options = CompareOptions {
        num_runs: 2,
        ..Default::default()
    };
    let comparison = compare(&net, &request, &options).unwrap();
    assert_eq!(comparison.runs.len(), Algorithm::ALL.len() * 5);
}

#[test]
fn invalid_requests_are_rejected_up_front() {
    let (net, n) = triangle();
    let request = Request::new(n[0], n[0], Weights::balanced());
    assert_eq!(
        compare(&net, &request, &CompareOptions::default()),
        Err(RoutingError::SourceIsDestination(n[0]))
    );
}

#[test]
fn csv_rendering() {
    let (net, n) = triangle();
    let request = Request::new(n[0], n[2], Weights::balanced());
    let comparison = compare(&net, &request, &CompareOptions::default()).unwrap();

    let runs = runs_csv(&comparison.runs);
    assert!(runs.starts_with("scenario_id,source,target,demand,algorithm,run_id,status,"));
    assert!(runs.contains("baseline"));
    assert!(runs.contains("0->2"));
    // no demand was requested, the field stays empty
    assert!(runs.lines().nth(1).unwrap().contains(",,"));

    let summary = summary_csv(&comparison.summary);
    assert_eq!(summary.lines().count(), Algorithm::ALL.len() + 1);

    assert_eq!(fmt_path(&[]), "");
    assert_eq!(fmt_path(&[n[0], n[1], n[2]]), "0->1->2");
}

#[test]
fn empty_aggregates_are_empty_fields() {
    let (net, n) = disconnected_pairs();
    let request = Request::new(n[0], n[3], Weights::balanced());
    let comparison = compare(&net, &request, &CompareOptions::default()).unwrap();
    let summary = summary_csv(&comparison.summary);
    for line in summary.lines().skip(1) {
        // avg, std, best, worst are all missing
        assert!(line.contains(",0,0,,,,"), "unexpected row: {}", line);
    }
}
