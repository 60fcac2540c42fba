//! Baseline FIFO strategy.

use crate::device::DevicePool;
use crate::graph::{DemandGraph, NodeId};
use crate::models::TransferRecord;

use super::{commit_in_order, ScheduleError, Scheduler};

/// Admits transfers in the order the demand graph holds them.
pub struct InOrder {
    verbosity: u8,
}

impl InOrder {
    pub fn new(verbosity: u8) -> Self {
        Self { verbosity }
    }
}

impl Scheduler for InOrder {
    fn select(
        &mut self,
        graph: &DemandGraph,
        _devices: &mut DevicePool,
    ) -> Result<Vec<(NodeId, NodeId)>, ScheduleError> {
        Ok(graph.edges().to_vec())
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
