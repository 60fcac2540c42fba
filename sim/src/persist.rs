//! Demand-graph persistence as JSON.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use xfersched::{DemandGraph, DevicePool};

/// Serializable demand topology: per-device capacities plus device-indexed
/// edges.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSpec {
    pub capacities: Vec<u32>,
    pub edges: Vec<(usize, usize)>,
}

impl GraphSpec {
    pub fn validate(&self) -> Result<()> {
        if self.capacities.is_empty() {
            bail!("graph has no devices");
        }
        if self.capacities.iter().any(|&c| c == 0) {
            bail!("device capacities must be positive");
        }
        for &(u, v) in &self.edges {
            if u >= self.capacities.len() || v >= self.capacities.len() {
                bail!("edge ({u}, {v}) references a missing device");
            }
        }
        Ok(())
    }

    /// Materialize the device pool and demand graph, one node per device.
    pub fn build(&self) -> (DevicePool, DemandGraph) {
        let mut devices = DevicePool::new();
        let mut graph = DemandGraph::new();
        let nodes: Vec<_> = self
            .capacities
            .iter()
            .map(|&c| graph.add_node(devices.add(c)))
            .collect();
        for &(u, v) in &self.edges {
            graph.add_edge(nodes[u], nodes[v]);
        }
        (devices, graph)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("writing graph to {}", path.display()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("reading graph from {}", path.display()))?;
        let spec: Self = serde_json::from_str(&json).context("parsing graph JSON")?;
        spec.validate()?;
        Ok(spec)
    }
}
