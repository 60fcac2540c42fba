//! Capacity-splitting plus per-round maximal matching.

use rustc_hash::FxHashSet;

use crate::device::DevicePool;
use crate::graph::{DemandGraph, NodeId};
use crate::log_rounds;
use crate::models::TransferRecord;

use super::{build_alias_graph, ScheduleError, Scheduler};

/// Matches greedily on the capacity-split alias graph each round.
///
/// No two matched edges share an alias endpoint, so the matching itself
/// guarantees admissibility and `commit` skips resource re-validation. An
/// empty round with demand remaining is an unrecoverable stall: the demand
/// graph is forcibly cleared, ending the run early by policy.
pub struct Greedy {
    verbosity: u8,
    alias: Option<DemandGraph>,
}

impl Greedy {
    pub fn new(verbosity: u8) -> Self {
        Self {
            verbosity,
            alias: None,
        }
    }

    /// Greedy maximal matching: scan edges in order, taking any edge whose
    /// alias endpoints are both unused. Self-pairs are unmatchable.
    fn maximal_matching(alias: &DemandGraph) -> Vec<(NodeId, NodeId)> {
        let mut used: FxHashSet<NodeId> = FxHashSet::default();
        let mut matched = Vec::new();
        for &(u, v) in alias.edges() {
            if u == v || used.contains(&u) || used.contains(&v) {
                continue;
            }
            used.insert(u);
            used.insert(v);
            matched.push((u, v));
        }
        matched
    }
}

impl Scheduler for Greedy {
    fn select(
        &mut self,
        graph: &DemandGraph,
        devices: &mut DevicePool,
    ) -> Result<Vec<(NodeId, NodeId)>, ScheduleError> {
        if self.alias.is_none() {
            self.alias = Some(build_alias_graph(graph, devices));
        }
        let alias = self.alias.as_mut().unwrap();

        let matched = Self::maximal_matching(alias);
        let mut queue = Vec::with_capacity(matched.len());
        for &(au, av) in &matched {
            alias.remove_edge(au, av);
            let u = graph.node_of(alias.device_of(au)).unwrap();
            let v = graph.node_of(alias.device_of(av)).unwrap();
            queue.push((u, v));
        }
        Ok(queue)
    }

    fn commit(
        &mut self,
        graph: &mut DemandGraph,
        devices: &mut DevicePool,
        queue: &[(NodeId, NodeId)],
        round: u32,
    ) -> Vec<TransferRecord> {
        if queue.is_empty() {
            if graph.edge_count() > 0 {
                log_rounds!(
                    self.verbosity,
                    "greedy: stalled with {} demand edges, forcing termination",
                    graph.edge_count()
                );
                graph.clear_edges();
            }
            return Vec::new();
        }

        // The matching already guarantees no alias reuse; emit directly.
        let mut records = Vec::with_capacity(queue.len());
        for &(u, v) in queue {
            if !graph.remove_edge(u, v) {
                continue;
            }
            let du = graph.device_of(u);
            let dv = graph.device_of(v);
            records.push(TransferRecord::new(du, dv, round));
        }
        records
    }
}
