//! The round controller: drives a strategy to completion as a pure
//! observer, forwarding transfer records to logging.

use anyhow::{bail, Result};
use log::{debug, info, trace, warn};
use xfersched::{normalized_max_degree, DemandGraph, DevicePool, Scheduler, TransferRecord};

/// Outcome of one simulation run.
#[derive(Debug)]
pub struct RunSummary {
    pub rounds: u32,
    /// Δ′ of the original demand graph, the round-count lower bound.
    pub delta_prime: u32,
    pub transfers: Vec<TransferRecord>,
    /// True when the strategy forced early termination with demand left.
    pub stalled: bool,
}

/// Loop `select`/`commit` until the demand graph is empty.
pub fn run(
    graph: &mut DemandGraph,
    devices: &mut DevicePool,
    sched: &mut dyn Scheduler,
) -> Result<RunSummary> {
    let delta_prime = normalized_max_degree(graph, devices);
    let mut rounds = 0;
    let mut transfers = Vec::new();
    let mut stalled = false;

    while graph.edge_count() > 0 {
        rounds += 1;
        debug!("round {rounds}: {} demand edges pending", graph.edge_count());

        let queue = sched.select(graph, devices)?;
        let before = graph.edge_count();
        let records = sched.commit(graph, devices, &queue, rounds);
        for r in &records {
            trace!("device {} -> device {} (round {})", r.from, r.to, r.round);
        }

        if records.is_empty() {
            if queue.is_empty() && graph.edge_count() == 0 {
                warn!("stalled in round {rounds}: {before} demand edges dropped");
                stalled = true;
            } else if graph.edge_count() == before {
                bail!("no progress in round {rounds} with {before} demand edges pending");
            }
        }
        transfers.extend(records);
    }

    info!(
        "completed in {rounds} rounds (delta' = {delta_prime}, {} transfers)",
        transfers.len()
    );
    Ok(RunSummary {
        rounds,
        delta_prime,
        transfers,
        stalled,
    })
}
