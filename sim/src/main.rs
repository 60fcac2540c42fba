//! xfersched-sim: drive a transfer-scheduling strategy over a generated or
//! saved demand graph and report the round count against the Δ′ lower
//! bound.

mod persist;
mod runner;
mod topology;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::Parser;
use log::warn;
use rand::rngs::StdRng;
use rand::SeedableRng;
use xfersched::StrategyKind;

use persist::GraphSpec;
use topology::CapacityMode;

/// Simulates round-based transfer scheduling between capacity-bounded
/// storage devices.
///
/// A demand multigraph is generated (or loaded), then the chosen strategy
/// is asked for one conflict-free round of transfers at a time until all
/// demand is serviced. Transfers stream to the log; the final line reports
/// rounds taken versus the delta-prime lower bound.
#[derive(Debug, Parser)]
struct Opts {
    /// Scheduling strategy: in-order, edge-ranking, flatten-and-color,
    /// bipartite or greedy.
    strategy: String,

    /// Generate a random connected demand graph over N devices.
    #[clap(long, value_name = "N", conflicts_with_all = ["regular", "load"])]
    random: Option<usize>,

    /// Generate a complete demand graph over N devices.
    #[clap(long, value_name = "N", conflicts_with = "load")]
    regular: Option<usize>,

    /// Load a demand graph saved with --save instead of generating one.
    #[clap(long, value_name = "FILE")]
    load: Option<PathBuf>,

    /// Save the generated demand graph as JSON before running.
    #[clap(long, value_name = "FILE")]
    save: Option<PathBuf>,

    /// Fixed capacity for every device.
    #[clap(long, value_name = "CV", conflicts_with_all = ["rand_cv", "even_cv"])]
    static_cv: Option<u32>,

    /// Random capacity drawn from 1..=MAX per device.
    #[clap(long, value_name = "MAX", conflicts_with = "even_cv")]
    rand_cv: Option<u32>,

    /// Random even capacity drawn from 2..=MAX per device.
    #[clap(long, value_name = "MAX")]
    even_cv: Option<u32>,

    /// Seed for reproducible topology generation.
    #[clap(long, default_value = "0")]
    seed: u64,

    /// Increase verbosity (-v rounds, -vv transfers, -vvv internals).
    #[clap(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Opts {
    fn capacity_mode(&self) -> CapacityMode {
        if let Some(c) = self.static_cv {
            CapacityMode::Static(c)
        } else if let Some(max) = self.rand_cv {
            CapacityMode::Random(max)
        } else if let Some(max) = self.even_cv {
            CapacityMode::Even(max)
        } else {
            CapacityMode::Unit
        }
    }
}

fn obtain_graph(opts: &Opts) -> Result<GraphSpec> {
    if let Some(path) = &opts.load {
        return GraphSpec::load(path);
    }

    let mut rng = StdRng::seed_from_u64(opts.seed);
    let (n, edges) = if let Some(n) = opts.random {
        (n, topology::random_connected(n, &mut rng)?)
    } else if let Some(n) = opts.regular {
        (n, topology::complete(n))
    } else {
        bail!("one of --random, --regular or --load is required");
    };
    let capacities = topology::generate_capacities(n, opts.capacity_mode(), &mut rng)?;
    Ok(GraphSpec { capacities, edges })
}

fn main() -> Result<()> {
    let opts = Opts::parse();

    let llv = match opts.verbose {
        0 => simplelog::LevelFilter::Info,
        1 => simplelog::LevelFilter::Debug,
        _ => simplelog::LevelFilter::Trace,
    };
    let mut lcfg = simplelog::ConfigBuilder::new();
    lcfg.set_time_level(simplelog::LevelFilter::Error)
        .set_location_level(simplelog::LevelFilter::Off)
        .set_target_level(simplelog::LevelFilter::Off)
        .set_thread_level(simplelog::LevelFilter::Off);
    simplelog::TermLogger::init(
        llv,
        lcfg.build(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;

    let strategy: StrategyKind = opts
        .strategy
        .parse()
        .context("unrecognized strategy name")?;

    let spec = obtain_graph(&opts)?;
    if let Some(path) = &opts.save {
        spec.save(path)?;
    }

    let (mut devices, mut graph) = spec.build();
    let mut sched = strategy.build(opts.verbose);
    let stamp = Local::now().format("%Y-%m-%dT%H_%M_%S").to_string();

    let summary = runner::run(&mut graph, &mut devices, sched.as_mut())?;
    if summary.stalled {
        warn!("run ended early: demand dropped by the {strategy} stall policy");
    }
    println!(
        "{stamp} {strategy} rounds={} delta_prime={}{}",
        summary.rounds,
        summary.delta_prime,
        if summary.stalled { " stalled" } else { "" }
    );
    Ok(())
}
