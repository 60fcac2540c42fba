//! Scheduling strategies over the demand graph.
//!
//! Each strategy is an independent [`Scheduler`] implementation owning only
//! the state it needs; acquire/release, degree normalization and capacity
//! splitting are shared as free functions.

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::device::{DeviceId, DevicePool};
use crate::graph::{DemandGraph, NodeId};
use crate::log_transfers;
use crate::models::TransferRecord;

mod bipartite;
mod edge_ranking;
mod flatten_color;
mod flow;
mod greedy;
mod in_order;

pub use bipartite::Bipartite;
pub use edge_ranking::EdgeRanking;
pub use flatten_color::FlattenAndColor;
pub use greedy::Greedy;
pub use in_order::InOrder;

/// Errors that can occur while building or driving a schedule.
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("unknown scheduling strategy: {0}")]
    UnknownStrategy(String),
    #[error("device {0} has unit capacity; parity relaxation would leave it unusable")]
    CapacityRelaxedToZero(DeviceId),
    #[error("device {0} has a device-local demand edge, which the euler walk cannot carry")]
    SelfDemandUnsupported(DeviceId),
    #[error("normalized graph has no eulerian circuit: {0}")]
    NotEulerian(&'static str),
    #[error("edge coloring exhausted with {0} demand edges still pending")]
    ColoringExhausted(usize),
}

/// One round of scheduling decisions.
///
/// `select` proposes an ordered candidate queue for the current round; it
/// may build or update strategy-internal caches (and, for Bipartite, relax
/// device capacities) but never removes demand-graph edges. `commit`
/// applies the admissible candidates: each removed from the graph exactly
/// once, endpoints reserved, a transfer record emitted.
pub trait Scheduler {
    fn select(
        &mut self,
        graph: &DemandGraph,
        devices: &mut DevicePool,
    ) -> Result<Vec<(NodeId, NodeId)>, ScheduleError>;

    fn commit(
        &mut self,
        graph: &mut DemandGraph,
        devices: &mut DevicePool,
        queue: &[(NodeId, NodeId)],
        round: u32,
    ) -> Vec<TransferRecord>;
}

/// Δ′: max over devices of `ceil(degree / capacity)`, a lower bound on the
/// achievable round count. Degree is summed over every node a device backs.
pub fn normalized_max_degree(graph: &DemandGraph, devices: &DevicePool) -> u32 {
    let degrees = graph.device_degrees();
    devices
        .iter()
        .map(|(id, dev)| {
            let degree = degrees.get(&id).copied().unwrap_or(0) as u32;
            degree.div_ceil(dev.capacity())
        })
        .max()
        .unwrap_or(0)
}

/// Rewrite every k-multiplicity edge (k > 1) between u and v into k simple
/// edges between k fresh aliases of u and of v, preserving total demand.
pub fn flatten_multiplicity(graph: &mut DemandGraph) {
    let mut occurrences: FxHashMap<(NodeId, NodeId), usize> = FxHashMap::default();
    for &(u, v) in graph.edges() {
        let key = (u.min(v), u.max(v));
        *occurrences.entry(key).or_insert(0) += 1;
    }

    for ((u, v), count) in occurrences {
        if count < 2 {
            continue;
        }
        for _ in 0..count {
            let removed = graph.remove_edge(u, v);
            debug_assert!(removed);
            let au = graph.add_alias(u);
            let av = graph.add_alias(v);
            graph.add_edge(au, av);
        }
    }
}

/// Capacity-splitting: a derived graph where each device of capacity c is
/// represented by c unit-capacity aliases, the device's incident demand
/// edges distributed round-robin among them.
///
/// A self-pair on a device with capacity > 1 lands on two distinct aliases;
/// with capacity 1 it stays a self-pair on the single alias.
pub(crate) fn build_alias_graph(graph: &DemandGraph, devices: &DevicePool) -> DemandGraph {
    let mut alias = DemandGraph::new();
    let mut slots: FxHashMap<DeviceId, Vec<NodeId>> = FxHashMap::default();
    let mut next_slot: FxHashMap<DeviceId, usize> = FxHashMap::default();

    for (id, dev) in devices.iter() {
        let nodes: Vec<NodeId> = (0..dev.capacity()).map(|_| alias.add_node(id)).collect();
        slots.insert(id, nodes);
        next_slot.insert(id, 0);
    }

    let pick = |device: DeviceId, next_slot: &mut FxHashMap<DeviceId, usize>| {
        let nodes = &slots[&device];
        let cursor = next_slot.get_mut(&device).unwrap();
        let node = nodes[*cursor % nodes.len()];
        *cursor += 1;
        node
    };

    for &(u, v) in graph.edges() {
        let au = pick(graph.device_of(u), &mut next_slot);
        let av = pick(graph.device_of(v), &mut next_slot);
        alias.add_edge(au, av);
    }
    alias
}

/// The shared commit pass: admit queued edges in order against current
/// availability, then release every acquisition at the round boundary.
///
/// A candidate whose edge is gone is stale and skipped; one whose endpoint
/// has no free slot is deferred and stays pending. A device-local edge
/// reserves its single endpoint once.
pub(crate) fn commit_in_order(
    graph: &mut DemandGraph,
    devices: &mut DevicePool,
    queue: &[(NodeId, NodeId)],
    round: u32,
    verbosity: u8,
) -> Vec<TransferRecord> {
    let mut active: Vec<DeviceId> = Vec::new();
    let mut records = Vec::new();

    for &(u, v) in queue {
        if !graph.has_edge(u, v) {
            log_transfers!(verbosity, "  stale candidate ({u}, {v}), skipping");
            continue;
        }
        let du = graph.device_of(u);
        let dv = graph.device_of(v);

        if du == dv {
            if devices.get(du).avail() == 0 {
                log_transfers!(verbosity, "  device {du} busy, deferring local transfer");
                continue;
            }
            devices.get_mut(du).acquire();
            graph.remove_edge(u, v);
            active.push(du);
            log_transfers!(verbosity, "  device {du} local transfer");
        } else {
            if devices.get(du).avail() == 0 || devices.get(dv).avail() == 0 {
                log_transfers!(verbosity, "  device {du} or {dv} busy, deferring");
                continue;
            }
            devices.get_mut(du).acquire();
            devices.get_mut(dv).acquire();
            graph.remove_edge(u, v);
            active.push(du);
            active.push(dv);
            log_transfers!(verbosity, "  device {du} transferring to device {dv}");
        }
        records.push(TransferRecord::new(du, dv, round));
    }

    for device in active {
        devices.get_mut(device).release();
    }
    records
}

#[cfg(test)]
pub(crate) mod tests_support {
    use super::*;

    /// Device pool plus demand graph with one primary node per device;
    /// `edges` index devices.
    pub(crate) fn setup(
        capacities: &[u32],
        edges: &[(usize, usize)],
    ) -> (DemandGraph, DevicePool) {
        let mut pool = DevicePool::new();
        for &c in capacities {
            pool.add(c);
        }
        let mut graph = DemandGraph::new();
        let nodes: Vec<NodeId> = pool.iter().map(|(id, _)| graph.add_node(id)).collect();
        for &(u, v) in edges {
            graph.add_edge(nodes[u], nodes[v]);
        }
        (graph, pool)
    }

    /// Run select/commit rounds to completion, the way an external round
    /// controller would. Returns (rounds, records, stalled).
    pub(crate) fn drive(
        sched: &mut dyn Scheduler,
        graph: &mut DemandGraph,
        devices: &mut DevicePool,
    ) -> (u32, Vec<TransferRecord>, bool) {
        let mut rounds = 0;
        let mut records = Vec::new();
        while graph.edge_count() > 0 {
            rounds += 1;
            assert!(rounds <= 10_000, "runaway schedule");
            let before = graph.edge_count();
            let queue = sched.select(graph, devices).unwrap();
            let committed = sched.commit(graph, devices, &queue, rounds);
            if committed.is_empty() && queue.is_empty() && graph.edge_count() == 0 {
                return (rounds, records, true);
            }
            assert!(
                !committed.is_empty() || graph.edge_count() < before,
                "no progress in round {rounds}"
            );
            records.extend(committed);
        }
        (rounds, records, false)
    }
}
