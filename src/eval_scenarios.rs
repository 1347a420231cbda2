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

//! Batch experiment mode: one seeded topology, many random `(S, D, B)`
//! scenarios, the full algorithm comparison on each, and two accumulated
//! CSV tables.

use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use rand::prelude::*;

use qroute::builder;
use qroute::formatter::{runs_csv, summary_csv};
use qroute::harness::{self, AlgorithmSummary, CompareOptions, RunRecord};
use qroute::prelude::*;

/// Evaluate the whole algorithm portfolio over randomly drawn scenarios on a
/// fixed topology.
#[derive(Debug, Parser)]
struct Cli {
    /// Number of nodes of the random topology.
    #[clap(short = 'n', long, default_value = "250")]
    nodes: usize,
    /// Link probability of the random topology.
    #[clap(short = 'p', long, default_value = "0.4")]
    prob: f64,
    /// Seed of the topology generation and the scenario draws.
    #[clap(long, default_value = "42")]
    graph_seed: u64,
    /// Number of scenarios to draw.
    #[clap(short = 'k', long, default_value = "20")]
    scenarios: u64,
    /// Number of runs per algorithm and scenario.
    #[clap(short = 'N', long, default_value = "5")]
    runs: usize,
    /// Base seed of the per-run random number generators.
    #[clap(long, default_value = "1000")]
    base_seed: u64,
    /// Number of worker threads (defaults to the number of cores).
    #[clap(short = 't', long)]
    threads: Option<usize>,
    /// Directory the CSV tables are written to.
    #[clap(short = 'o', long, default_value = "results")]
    output: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_timed();

    let args = Cli::parse();

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads.unwrap_or_else(num_cpus::get))
        .build_global()?;

    let mut rng = StdRng::seed_from_u64(args.graph_seed);
    let net = builder::build_connected_gnp(args.nodes, args.prob, &mut rng)?;
    log::info!(
        "generated topology with {} nodes and {} links",
        net.num_nodes(),
        net.num_links()
    );

    let num_nodes = net.num_nodes();
    let weights = Weights::balanced();
    let runs_per_scenario = (Algorithm::ALL.len() * args.runs.max(harness::MIN_RUNS)) as u64;

    let mut all_runs: Vec<RunRecord> = Vec::new();
    let mut all_summaries: Vec<AlgorithmSummary> = Vec::new();

    for scenario_id in 0..args.scenarios {
        let source = NodeId::new(rng.gen_range(0..num_nodes));
        let target = loop {
            let t = NodeId::new(rng.gen_range(0..num_nodes));
            if t != source {
                break t;
            }
        };
        let demand = rng.gen_range(50.0..500.0);
        let request = Request::new(source, target, weights).with_demand(demand);

        let options = CompareOptions {
            num_runs: args.runs,
            // disjoint seed blocks, so any single run stays reproducible
            base_seed: args.base_seed + scenario_id * runs_per_scenario,
            scenario_id,
            parallel: true,
            ..Default::default()
        };

        let comparison = harness::compare(&net, &request, &options)?;
        log::info!(
            "scenario {}/{}: S={} D={} B={:.1} Mbps, {} rows",
            scenario_id + 1,
            args.scenarios,
            source.index(),
            target.index(),
            demand,
            comparison.runs.len()
        );
        all_runs.extend(comparison.runs);
        all_summaries.extend(comparison.summary);
    }

    create_dir_all(&args.output)?;
    write!(
        File::create(args.output.join("runs.csv"))?,
        "{}",
        runs_csv(&all_runs)
    )?;
    write!(
        File::create(args.output.join("summary.csv"))?,
        "{}",
        summary_csv(&all_summaries)
    )?;
    log::info!("tables written to {}", args.output.display());

    Ok(())
}
