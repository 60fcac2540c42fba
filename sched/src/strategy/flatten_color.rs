//! Capacity-splitting plus greedy edge coloring.

use rustc_hash::FxHashSet;

use crate::device::DevicePool;
use crate::graph::{DemandGraph, NodeId};
use crate::log_rounds;
use crate::models::TransferRecord;

use super::{build_alias_graph, commit_in_order, ScheduleError, Scheduler};

/// Colors the capacity-split alias graph once, then replays one color class
/// per round.
///
/// Each edge takes the smallest color not already used by any edge incident
/// to either endpoint, so edges sharing a color form a conflict-free round
/// by construction: an alias carries one edge per class, hence a device of
/// capacity c carries at most c.
pub struct FlattenAndColor {
    verbosity: u8,
    plan: Option<ColorPlan>,
}

/// Color classes in ascending color order, as demand-graph node pairs.
struct ColorPlan {
    classes: Vec<Vec<(NodeId, NodeId)>>,
    next: usize,
}

impl FlattenAndColor {
    pub fn new(verbosity: u8) -> Self {
        Self {
            verbosity,
            plan: None,
        }
    }

    fn build_plan(&self, graph: &DemandGraph, devices: &DevicePool) -> ColorPlan {
        let alias = build_alias_graph(graph, devices);

        // Smallest-free-color assignment over the alias graph, tracking the
        // colors already present at each endpoint.
        let mut node_colors: Vec<FxHashSet<usize>> = vec![FxHashSet::default(); alias.node_count()];
        let mut classes: Vec<Vec<(NodeId, NodeId)>> = Vec::new();
        for &(au, av) in alias.edges() {
            let mut color = 0;
            while node_colors[au].contains(&color) || node_colors[av].contains(&color) {
                color += 1;
            }
            node_colors[au].insert(color);
            node_colors[av].insert(color);
            if color == classes.len() {
                classes.push(Vec::new());
            }
            // Map the alias endpoints back to the original-device nodes.
            let u = graph.node_of(alias.device_of(au)).unwrap();
            let v = graph.node_of(alias.device_of(av)).unwrap();
            classes[color].push((u, v));
        }

        log_rounds!(
            self.verbosity,
            "flatten-and-color: {} color classes over {} alias nodes",
            classes.len(),
            alias.node_count()
        );
        ColorPlan { classes, next: 0 }
    }
}

impl Scheduler for FlattenAndColor {
    fn select(
        &mut self,
        graph: &DemandGraph,
        devices: &mut DevicePool,
    ) -> Result<Vec<(NodeId, NodeId)>, ScheduleError> {
        if self.plan.is_none() {
            self.plan = Some(self.build_plan(graph, devices));
        }
        let plan = self.plan.as_mut().unwrap();

        match plan.classes.get(plan.next) {
            Some(class) => {
                plan.next += 1;
                Ok(class.clone())
            }
            None if graph.edge_count() == 0 => Ok(Vec::new()),
            None => Err(ScheduleError::ColoringExhausted(graph.edge_count())),
        }
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
