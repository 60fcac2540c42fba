//! Demand multigraph over capacity-backed node identities.
//!
//! Nodes are records in a per-graph arena; each record stores the id of the
//! device backing it. Two nodes backed by the same device are distinct graph
//! identities (aliases) sharing one pool of capacity state, so a device can
//! occupy several node slots in a derived graph. Equality and hashing are by
//! node index; capacity operations dereference through the backing id.

use rustc_hash::FxHashMap;

use crate::device::DeviceId;

/// Node index into a graph's arena.
pub type NodeId = usize;

/// One directed traversal of an undirected edge inside an Euler circuit:
/// `(from, to, edge_index)`. Edge indices refer to the graph's edge list at
/// the time the circuit was computed.
pub type EulerStep = (NodeId, NodeId, usize);

/// Undirected multigraph of pending transfers.
///
/// Edges are unordered endpoint pairs kept in insertion order; parallel
/// edges and self-pairs are allowed. A self-pair contributes two to its
/// endpoint's degree, the usual multigraph convention. An edge is removed
/// exactly once, at the moment a round commits it.
#[derive(Clone, Debug, Default)]
pub struct DemandGraph {
    /// Node arena: node id -> backing device.
    backing: Vec<DeviceId>,
    /// First node registered for each device; aliases never override it.
    primary: FxHashMap<DeviceId, NodeId>,
    /// Edge multiset in insertion order.
    edges: Vec<(NodeId, NodeId)>,
    /// Per-node degree, self-pairs counted twice.
    degrees: Vec<usize>,
}

impl DemandGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the primary node for a device. Repeated calls for the same
    /// device return fresh aliases of the first node.
    pub fn add_node(&mut self, device: DeviceId) -> NodeId {
        let node = self.backing.len();
        self.backing.push(device);
        self.degrees.push(0);
        self.primary.entry(device).or_insert(node);
        node
    }

    /// Create a fresh node identity backed by the same device as `of`.
    ///
    /// Aliasing an alias resolves transitively: the new node stores the
    /// ultimate backing device, not the intermediate node.
    pub fn add_alias(&mut self, of: NodeId) -> NodeId {
        let device = self.backing[of];
        let node = self.backing.len();
        self.backing.push(device);
        self.degrees.push(0);
        node
    }

    /// Device backing a node.
    pub fn device_of(&self, node: NodeId) -> DeviceId {
        self.backing[node]
    }

    /// Primary node registered for a device, if any.
    pub fn node_of(&self, device: DeviceId) -> Option<NodeId> {
        self.primary.get(&device).copied()
    }

    pub fn node_count(&self) -> usize {
        self.backing.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Current edges in insertion order.
    pub fn edges(&self) -> &[(NodeId, NodeId)] {
        &self.edges
    }

    pub fn add_edge(&mut self, u: NodeId, v: NodeId) {
        assert!(u < self.backing.len() && v < self.backing.len());
        self.edges.push((u, v));
        self.degrees[u] += 1;
        self.degrees[v] += 1;
    }

    /// Remove one instance of the edge `(u, v)` (or `(v, u)`), returning
    /// whether an instance was present. Stale removals are not an error.
    pub fn remove_edge(&mut self, u: NodeId, v: NodeId) -> bool {
        let pos = self
            .edges
            .iter()
            .position(|&(a, b)| (a, b) == (u, v) || (a, b) == (v, u));
        match pos {
            Some(idx) => {
                self.edges.remove(idx);
                self.degrees[u] -= 1;
                self.degrees[v] -= 1;
                true
            }
            None => false,
        }
    }

    pub fn has_edge(&self, u: NodeId, v: NodeId) -> bool {
        self.edges
            .iter()
            .any(|&(a, b)| (a, b) == (u, v) || (a, b) == (v, u))
    }

    /// Drop every edge, keeping the node arena.
    pub fn clear_edges(&mut self) {
        self.edges.clear();
        self.degrees.iter_mut().for_each(|d| *d = 0);
    }

    /// Degree of a node, self-pairs counted twice.
    pub fn degree(&self, node: NodeId) -> usize {
        self.degrees[node]
    }

    /// Degree of each device, summed over every node it backs.
    pub fn device_degrees(&self) -> FxHashMap<DeviceId, usize> {
        let mut out = FxHashMap::default();
        for (node, &device) in self.backing.iter().enumerate() {
            *out.entry(device).or_insert(0) += self.degrees[node];
        }
        out
    }

    /// Whether every node is reachable from node 0. Vacuously true for the
    /// empty graph.
    pub fn is_connected(&self) -> bool {
        if self.backing.is_empty() {
            return true;
        }
        let adj = self.adjacency();
        let mut seen = vec![false; self.backing.len()];
        let mut stack = vec![0];
        seen[0] = true;
        while let Some(node) = stack.pop() {
            for &(next, _) in &adj[node] {
                if !seen[next] {
                    seen[next] = true;
                    stack.push(next);
                }
            }
        }
        seen.iter().all(|&s| s)
    }

    /// Closed walk traversing every edge exactly once (Hierholzer).
    ///
    /// Returns `None` when no such circuit exists: some node has odd degree,
    /// or the edges do not form a single connected component. The empty
    /// graph yields an empty circuit.
    pub fn eulerian_circuit(&self) -> Option<Vec<EulerStep>> {
        if self.edges.is_empty() {
            return Some(Vec::new());
        }
        if self.degrees.iter().any(|d| d % 2 != 0) {
            return None;
        }

        let adj = self.adjacency();
        let mut used = vec![false; self.edges.len()];
        let mut cursor = vec![0usize; self.backing.len()];

        let start = self.edges[0].0;
        // Each stack entry records the edge that led into its node; in the
        // reversed pop order that edge connects the entry to its predecessor.
        let mut stack: Vec<(NodeId, Option<usize>)> = vec![(start, None)];
        let mut walk: Vec<(NodeId, Option<usize>)> = Vec::with_capacity(self.edges.len() + 1);

        while let Some(&(node, _)) = stack.last() {
            let mut advanced = false;
            while cursor[node] < adj[node].len() {
                let (next, edge) = adj[node][cursor[node]];
                cursor[node] += 1;
                if !used[edge] {
                    used[edge] = true;
                    stack.push((next, Some(edge)));
                    advanced = true;
                    break;
                }
            }
            if !advanced {
                walk.push(stack.pop().unwrap());
            }
        }

        // A shorter walk means unreached edges: the graph is disconnected.
        if walk.len() != self.edges.len() + 1 {
            return None;
        }

        walk.reverse();
        let mut steps = Vec::with_capacity(self.edges.len());
        for pair in walk.windows(2) {
            let (from, _) = pair[0];
            let (to, edge) = pair[1];
            steps.push((from, to, edge.unwrap()));
        }
        Some(steps)
    }

    /// Adjacency lists as `(neighbour, edge_index)`, self-pairs listed twice
    /// on their single endpoint.
    fn adjacency(&self) -> Vec<Vec<(NodeId, usize)>> {
        let mut adj: Vec<Vec<(NodeId, usize)>> = vec![Vec::new(); self.backing.len()];
        for (idx, &(u, v)) in self.edges.iter().enumerate() {
            adj[u].push((v, idx));
            adj[v].push((u, idx));
        }
        adj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_graph(n: usize) -> DemandGraph {
        let mut g = DemandGraph::new();
        let nodes: Vec<NodeId> = (0..n).map(|d| g.add_node(d)).collect();
        for w in nodes.windows(2) {
            g.add_edge(w[0], w[1]);
        }
        g
    }

    #[test]
    fn test_multiplicity_removed_one_at_a_time() {
        let mut g = DemandGraph::new();
        let a = g.add_node(0);
        let b = g.add_node(1);
        g.add_edge(a, b);
        g.add_edge(a, b);
        assert_eq!(g.edge_count(), 2);
        assert!(g.remove_edge(b, a));
        assert_eq!(g.edge_count(), 1);
        assert!(g.has_edge(a, b));
        assert!(g.remove_edge(a, b));
        assert!(!g.remove_edge(a, b));
    }

    #[test]
    fn test_self_pair_degree_counts_twice() {
        let mut g = DemandGraph::new();
        let a = g.add_node(0);
        g.add_edge(a, a);
        assert_eq!(g.degree(a), 2);
        assert!(g.remove_edge(a, a));
        assert_eq!(g.degree(a), 0);
    }

    #[test]
    fn test_aliases_share_backing_device() {
        let mut g = DemandGraph::new();
        let a = g.add_node(7);
        let alias = g.add_alias(a);
        let alias2 = g.add_alias(alias);
        assert_ne!(a, alias);
        assert_eq!(g.device_of(alias), 7);
        assert_eq!(g.device_of(alias2), 7);
        assert_eq!(g.node_of(7), Some(a));
    }

    #[test]
    fn test_device_degrees_sum_over_aliases() {
        let mut g = DemandGraph::new();
        let a = g.add_node(0);
        let b = g.add_node(1);
        let a2 = g.add_alias(a);
        g.add_edge(a, b);
        g.add_edge(a2, b);
        let degrees = g.device_degrees();
        assert_eq!(degrees[&0], 2);
        assert_eq!(degrees[&1], 2);
    }

    #[test]
    fn test_connectivity() {
        let mut g = path_graph(3);
        assert!(g.is_connected());
        g.add_node(9);
        assert!(!g.is_connected());
    }

    #[test]
    fn test_euler_circuit_on_triangle() {
        let mut g = DemandGraph::new();
        let a = g.add_node(0);
        let b = g.add_node(1);
        let c = g.add_node(2);
        g.add_edge(a, b);
        g.add_edge(b, c);
        g.add_edge(c, a);

        let steps = g.eulerian_circuit().unwrap();
        assert_eq!(steps.len(), 3);
        // Closed walk covering each edge index exactly once.
        assert_eq!(steps[0].0, steps[steps.len() - 1].1);
        let mut covered: Vec<usize> = steps.iter().map(|s| s.2).collect();
        covered.sort_unstable();
        assert_eq!(covered, vec![0, 1, 2]);
        for w in steps.windows(2) {
            assert_eq!(w[0].1, w[1].0);
        }
    }

    #[test]
    fn test_euler_circuit_consumes_self_pairs_and_parallels() {
        let mut g = DemandGraph::new();
        let a = g.add_node(0);
        let b = g.add_node(1);
        g.add_edge(a, b);
        g.add_edge(a, b);
        g.add_edge(a, a);

        let steps = g.eulerian_circuit().unwrap();
        assert_eq!(steps.len(), 3);
        let mut covered: Vec<usize> = steps.iter().map(|s| s.2).collect();
        covered.sort_unstable();
        assert_eq!(covered, vec![0, 1, 2]);
    }

    #[test]
    fn test_euler_circuit_rejects_odd_degree() {
        let g = path_graph(2);
        assert!(g.eulerian_circuit().is_none());
    }

    #[test]
    fn test_euler_circuit_rejects_disconnected_edges() {
        let mut g = DemandGraph::new();
        let a = g.add_node(0);
        let b = g.add_node(1);
        let c = g.add_node(2);
        let d = g.add_node(3);
        g.add_edge(a, b);
        g.add_edge(b, a);
        g.add_edge(c, d);
        g.add_edge(d, c);
        assert!(g.eulerian_circuit().is_none());
    }
}
