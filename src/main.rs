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

use std::fs::{create_dir_all, read_to_string, File};
use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use rand::prelude::*;
use serde::Deserialize;

use qroute::adapter;
use qroute::builder;
use qroute::formatter::{fmt_path, runs_csv, summary_csv};
use qroute::harness;
use qroute::network::{LinkRecord, NodeRecord};
use qroute::prelude::*;

/// Route on a topology (a JSON record file, or a seeded random graph): run a
/// single algorithm, or compare the whole portfolio over repeated trials.
#[derive(Debug, Parser)]
struct Cli {
    /// Read the topology from this JSON file (`{"nodes": [...], "links":
    /// [...]}`) instead of generating a random one. Node and link attributes
    /// accept the legacy aliases.
    #[clap(short = 'g', long)]
    topology: Option<PathBuf>,
    /// Number of nodes of the random topology.
    #[clap(short = 'n', long, default_value = "50")]
    nodes: usize,
    /// Link probability of the random topology.
    #[clap(short = 'p', long, default_value = "0.15")]
    prob: f64,
    /// Seed of the topology generation.
    #[clap(long, default_value = "42")]
    graph_seed: u64,
    /// Source node.
    #[clap(short, long, default_value = "0")]
    source: usize,
    /// Destination node (defaults to the last node).
    #[clap(short = 'd', long)]
    target: Option<usize>,
    /// Requested bandwidth in Mbps.
    #[clap(short = 'b', long)]
    demand: Option<f64>,
    /// The weight triple (delay, reliability, resource); normalized
    /// internally.
    #[clap(short = 'w', long, num_args = 3, default_values = ["0.33", "0.33", "0.34"])]
    weights: Vec<f64>,
    /// Run only this algorithm instead of comparing all of them.
    #[clap(short = 'a', long)]
    algorithm: Option<Algorithm>,
    /// Number of runs per algorithm in comparison mode.
    #[clap(short = 'N', long, default_value = "5")]
    runs: usize,
    /// Base seed of the per-run random number generators.
    #[clap(long, default_value = "1000")]
    base_seed: u64,
    /// Number of worker threads (defaults to the number of cores).
    #[clap(short = 't', long)]
    threads: Option<usize>,
    /// Write the tables into this directory instead of stdout.
    #[clap(short = 'o', long)]
    output: Option<PathBuf>,
}

/// The JSON shape of an ingested topology file.
#[derive(Debug, Deserialize)]
struct TopologyFile {
    nodes: Vec<NodeRecord>,
    links: Vec<LinkRecord>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_timed();

    let args = Cli::parse();

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads.unwrap_or_else(num_cpus::get))
        .build_global()?;

    let (net, ids) = match &args.topology {
        Some(path) => {
            let file: TopologyFile = serde_json::from_str(&read_to_string(path)?)?;
            let (net, ids) = Network::from_records(file.nodes, file.links)?;
            log::info!(
                "loaded topology with {} nodes and {} links from {}",
                net.num_nodes(),
                net.num_links(),
                path.display()
            );
            (net, Some(ids))
        }
        None => {
            let mut rng = StdRng::seed_from_u64(args.graph_seed);
            let net = builder::build_connected_gnp(args.nodes, args.prob, &mut rng)?;
            log::info!(
                "generated topology with {} nodes and {} links",
                net.num_nodes(),
                net.num_links()
            );
            (net, None)
        }
    };

    let resolve = |id: usize| -> Result<NodeId, RoutingError> {
        match &ids {
            Some(map) => map.get(&(id as u64)).copied().ok_or_else(|| {
                RoutingError::InvalidConfig(format!("node id {} is not in the topology file", id))
            }),
            None => Ok(NodeId::new(id)),
        }
    };
    let source = resolve(args.source)?;
    let target = resolve(args.target.unwrap_or(net.num_nodes() - 1))?;
    let weights = Weights::new(args.weights[0], args.weights[1], args.weights[2])?;
    let mut request = Request::new(source, target, weights);
    if let Some(b) = args.demand {
        request = request.with_demand(b);
    }

    match args.algorithm {
        Some(algorithm) => {
            let result = adapter::run(
                algorithm,
                &net,
                &request,
                &ParamMap::new(),
                args.base_seed,
                &CancelToken::new(),
            )?;
            println!("algorithm: {}", result.algorithm);
            println!("path:      {}", fmt_path(&result.path));
            println!("notes:     {}", result.notes);
            if let Some(m) = &result.metrics {
                println!("delay:     {:.3} ms", m.total_delay_ms);
                println!("rel. cost: {:.6}", m.reliability_cost);
                println!("res. cost: {:.6}", m.resource_cost);
                println!("total:     {:.6}", m.total_cost);
            }
        }
        None => {
            let options = CompareOptions {
                num_runs: args.runs,
                base_seed: args.base_seed,
                parallel: true,
                ..Default::default()
            };
            let comparison = harness::compare(&net, &request, &options)?;
            let runs = runs_csv(&comparison.runs);
            let summary = summary_csv(&comparison.summary);
            match &args.output {
                Some(dir) => {
                    create_dir_all(dir)?;
                    write!(File::create(dir.join("runs.csv"))?, "{}", runs)?;
                    write!(File::create(dir.join("summary.csv"))?, "{}", summary)?;
                    log::info!("tables written to {}", dir.display());
                }
                None => {
                    println!("{}", runs);
                    println!("{}", summary);
                }
            }
            for (algorithm, path) in &comparison.best_paths {
                println!("best {}: {}", algorithm, fmt_path(path));
            }
        }
    }

    Ok(())
}
