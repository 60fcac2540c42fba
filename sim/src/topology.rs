//! Random demand-topology generation.

use std::collections::BTreeSet;

use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::Rng;

/// How device capacities are drawn.
#[derive(Clone, Copy, Debug)]
pub enum CapacityMode {
    /// Every device gets a single slot.
    Unit,
    /// Every device gets the same fixed capacity.
    Static(u32),
    /// Uniform in 1..=max.
    Random(u32),
    /// Even, uniform over {2, 4, ...} up to max.
    Even(u32),
}

pub fn generate_capacities(n: usize, mode: CapacityMode, rng: &mut StdRng) -> Result<Vec<u32>> {
    let capacities = match mode {
        CapacityMode::Unit => vec![1; n],
        CapacityMode::Static(c) => {
            if c == 0 {
                bail!("--static-cv must be positive");
            }
            vec![c; n]
        }
        CapacityMode::Random(max) => {
            if max == 0 {
                bail!("--rand-cv must be positive");
            }
            (0..n).map(|_| rng.random_range(1..=max)).collect()
        }
        CapacityMode::Even(max) => {
            if max < 2 {
                bail!("--even-cv must be at least 2");
            }
            (0..n).map(|_| 2 * rng.random_range(1..=max / 2)).collect()
        }
    };
    Ok(capacities)
}

/// Connected G(n, m) demand skeleton with self-loops stripped. The edge
/// count is drawn uniformly from [n, n²], clamped to the simple-graph
/// maximum, and the draw repeats until the result is connected.
pub fn random_connected(n: usize, rng: &mut StdRng) -> Result<Vec<(usize, usize)>> {
    if n < 2 {
        bail!("--random needs at least two devices");
    }
    let max_edges = n * (n - 1) / 2;
    for _ in 0..100 {
        let m = rng.random_range(n..=n * n).min(max_edges);
        let mut edges: BTreeSet<(usize, usize)> = BTreeSet::new();
        while edges.len() < m {
            let u = rng.random_range(0..n);
            let v = rng.random_range(0..n);
            if u != v {
                edges.insert((u.min(v), u.max(v)));
            }
        }
        if is_connected(n, &edges) {
            return Ok(edges.into_iter().collect());
        }
    }
    bail!("no connected graph over {n} devices after 100 draws");
}

/// Complete demand graph over n devices.
pub fn complete(n: usize) -> Vec<(usize, usize)> {
    let mut edges = Vec::with_capacity(n.saturating_sub(1) * n / 2);
    for u in 0..n {
        for v in (u + 1)..n {
            edges.push((u, v));
        }
    }
    edges
}

fn is_connected(n: usize, edges: &BTreeSet<(usize, usize)>) -> bool {
    let mut adj = vec![Vec::new(); n];
    for &(u, v) in edges {
        adj[u].push(v);
        adj[v].push(u);
    }
    let mut seen = vec![false; n];
    let mut stack = vec![0];
    seen[0] = true;
    while let Some(node) = stack.pop() {
        for &next in &adj[node] {
            if !seen[next] {
                seen[next] = true;
                stack.push(next);
            }
        }
    }
    seen.into_iter().all(|s| s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_random_graph_is_connected_and_loop_free() {
        for seed in 0..5 {
            let mut rng = StdRng::seed_from_u64(seed);
            let edges = random_connected(8, &mut rng).unwrap();
            assert!(edges.len() >= 7);
            for &(u, v) in &edges {
                assert_ne!(u, v);
                assert!(u < 8 && v < 8);
            }
            assert!(is_connected(8, &edges.iter().copied().collect()));
        }
    }

    #[test]
    fn test_random_graph_rejects_single_device() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(random_connected(1, &mut rng).is_err());
    }

    #[test]
    fn test_complete_graph_edge_count() {
        assert_eq!(complete(4).len(), 6);
        assert_eq!(complete(2), vec![(0, 1)]);
    }

    #[test]
    fn test_capacity_modes() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(
            generate_capacities(3, CapacityMode::Unit, &mut rng).unwrap(),
            vec![1, 1, 1]
        );
        assert_eq!(
            generate_capacities(2, CapacityMode::Static(4), &mut rng).unwrap(),
            vec![4, 4]
        );
        for c in generate_capacities(32, CapacityMode::Random(5), &mut rng).unwrap() {
            assert!((1..=5).contains(&c));
        }
        for c in generate_capacities(32, CapacityMode::Even(6), &mut rng).unwrap() {
            assert!(c % 2 == 0 && (2..=6).contains(&c));
        }
    }

    #[test]
    fn test_capacity_mode_bounds_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(generate_capacities(1, CapacityMode::Static(0), &mut rng).is_err());
        assert!(generate_capacities(1, CapacityMode::Even(1), &mut rng).is_err());
    }
}
