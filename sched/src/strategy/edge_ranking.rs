//! Candidate ranking by normalized-degree weight.

use rustc_hash::FxHashMap;

use crate::device::{DeviceId, DevicePool};
use crate::graph::{DemandGraph, NodeId};
use crate::models::TransferRecord;

use super::{commit_in_order, ScheduleError, Scheduler};

/// Orders each round's candidates by the sum of their endpoints'
/// `ceil(degree / capacity)` weights, ascending, computed on the current
/// graph snapshot. The sort is stable, so insertion order breaks ties.
pub struct EdgeRanking {
    verbosity: u8,
}

impl EdgeRanking {
    pub fn new(verbosity: u8) -> Self {
        Self { verbosity }
    }

    /// Per-device `ceil(degree / capacity)` for the current round.
    fn device_weights(graph: &DemandGraph, devices: &DevicePool) -> FxHashMap<DeviceId, u32> {
        let degrees = graph.device_degrees();
        devices
            .iter()
            .map(|(id, dev)| {
                let degree = degrees.get(&id).copied().unwrap_or(0) as u32;
                (id, degree.div_ceil(dev.capacity()))
            })
            .collect()
    }
}

impl Scheduler for EdgeRanking {
    fn select(
        &mut self,
        graph: &DemandGraph,
        devices: &mut DevicePool,
    ) -> Result<Vec<(NodeId, NodeId)>, ScheduleError> {
        let weights = Self::device_weights(graph, devices);
        let mut queue = graph.edges().to_vec();
        queue.sort_by_key(|&(u, v)| {
            weights[&graph.device_of(u)] + weights[&graph.device_of(v)]
        });
        Ok(queue)
    }

    fn commit(
        &mut self,
        graph: &mut DemandGraph,
        devices: &mut DevicePool,
        queue: &[(NodeId, NodeId)],
        round: u32,
    ) -> Vec<TransferRecord> {
        commit_in_order(graph, devices, queue, round, self.verbosity)
    }
}
