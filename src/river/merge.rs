//! Endpoint merging for delta graphs
//!
//! Independently grown branches often end within a few cells of each other,
//! which would carve two overlapping mouths. The merger walks the graph
//! breadth-first and snaps any endpoint that lands near an already finalized
//! one onto it, pruning everything downstream of the snapped node.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::geometry::Vec2;

use super::graph::{NodeId, RiverGraph};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Nodes whose end was snapped onto another endpoint
    pub merged_endpoints: usize,
    /// Nodes removed because they hung below a snapped node
    pub pruned_nodes: usize,
}

/// Collapse endpoints closer than `radius` into one.
///
/// Children are visited in an order shuffled by `rng`, which decides which of
/// two competing siblings keeps its mouth. Nodes already marked as merged are
/// left alone, so running the merger again on its own output changes nothing.
pub fn merge_endpoints<R: Rng + ?Sized>(graph: &mut RiverGraph, radius: f32, rng: &mut R) -> MergeStats {
    let mut stats = MergeStats::default();
    if graph.is_empty() {
        return stats;
    }

    let mut doomed = vec![false; graph.len()];
    let mut finalized: Vec<(Vec2, NodeId)> = Vec::new();
    let mut queue: VecDeque<NodeId> = graph.roots().iter().copied().collect();

    while let Some(id) = queue.pop_front() {
        if doomed[id.index()] || graph.node(id).merged {
            continue;
        }

        let end = graph.node(id).end;
        let target = finalized
            .iter()
            .filter(|(_, owner)| *owner != id && !graph.is_ancestor(*owner, id))
            .find(|(point, _)| point.distance(end) < radius)
            .map(|(point, owner)| (*point, *owner));

        match target {
            Some((point, owner)) => {
                tracing::trace!(
                    target: "river_generator::merge",
                    node = id.0,
                    onto = owner.0,
                    distance = point.distance(end),
                    "merge.snapped"
                );
                for d in graph.descendants(id) {
                    doomed[d.index()] = true;
                }
                let node = graph.node_mut(id);
                node.end = point;
                node.merged = true;
                stats.merged_endpoints += 1;
            }
            None => {
                finalized.push((end, id));
                let mut children = graph.children(id).to_vec();
                children.shuffle(rng);
                queue.extend(children);
            }
        }
    }

    stats.pruned_nodes = if doomed.iter().any(|d| *d) {
        let keep: Vec<bool> = doomed.iter().map(|d| !d).collect();
        graph.retain(&keep)
    } else {
        0
    };

    tracing::debug!(
        target: "river_generator::merge",
        merged = stats.merged_endpoints,
        pruned = stats.pruned_nodes,
        remaining = graph.len(),
        "merge.done"
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Root splitting into two branches whose ends land 4 units apart
    fn converging_fork() -> RiverGraph {
        let mut g = RiverGraph::new();
        let root = g.add_root(Vec2::new(50.0, 0.0), Vec2::new(50.0, 40.0), 12.0, Vec2::ZERO);
        let left = g.add_child(root, Vec2::new(48.0, 90.0), 6.0, Vec2::ZERO);
        let right = g.add_child(root, Vec2::new(52.0, 90.0), 6.0, Vec2::ZERO);
        g.add_child(left, Vec2::new(40.0, 140.0), 6.0, Vec2::ZERO);
        g.add_child(right, Vec2::new(60.0, 140.0), 6.0, Vec2::ZERO);
        g
    }

    #[test]
    fn test_close_endpoints_collapse() {
        let mut g = converging_fork();
        let stats = merge_endpoints(&mut g, 10.0, &mut ChaCha8Rng::seed_from_u64(5));

        assert_eq!(stats.merged_endpoints, 1);
        assert_eq!(stats.pruned_nodes, 1);
        assert_eq!(g.len(), 4);
        g.validate(3.0).expect("merged graph must stay well formed");

        let merged: Vec<_> = g.nodes().iter().filter(|n| n.merged).collect();
        assert_eq!(merged.len(), 1);
        assert!(merged[0].is_leaf());
        let snapped_to = merged[0].end;
        let owners = g.nodes().iter().filter(|n| !n.merged && n.end == snapped_to).count();
        assert_eq!(owners, 1, "snapped end must coincide with a surviving endpoint");
    }

    #[test]
    fn test_far_endpoints_untouched() {
        let mut g = converging_fork();
        let before = g.clone();
        let stats = merge_endpoints(&mut g, 2.0, &mut ChaCha8Rng::seed_from_u64(5));
        assert_eq!(stats, MergeStats::default());
        assert_eq!(g, before);
    }

    #[test]
    fn test_never_merges_into_ancestor() {
        let mut g = RiverGraph::new();
        let root = g.add_root(Vec2::new(0.0, 0.0), Vec2::new(0.0, 20.0), 8.0, Vec2::ZERO);
        // Child doubles back and ends right next to its parent's end
        g.add_child(root, Vec2::new(3.0, 22.0), 8.0, Vec2::ZERO);
        let stats = merge_endpoints(&mut g, 10.0, &mut ChaCha8Rng::seed_from_u64(1));
        assert_eq!(stats.merged_endpoints, 0);
        assert_eq!(g.len(), 2);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut g = converging_fork();
        merge_endpoints(&mut g, 10.0, &mut ChaCha8Rng::seed_from_u64(5));
        let once = g.clone();
        let stats = merge_endpoints(&mut g, 10.0, &mut ChaCha8Rng::seed_from_u64(77));
        assert_eq!(stats, MergeStats::default());
        assert_eq!(g, once);
    }

    #[test]
    fn test_shuffle_decides_winner() {
        let mut winners = std::collections::HashSet::new();
        for seed in 0..32 {
            let mut g = converging_fork();
            merge_endpoints(&mut g, 10.0, &mut ChaCha8Rng::seed_from_u64(seed));
            let survivor = g.nodes().iter().find(|n| n.depth == 1 && !n.merged).map(|n| n.end.x);
            winners.insert(survivor.map(|x| x as i32));
        }
        assert_eq!(winners.len(), 2, "both siblings should win for some seed");
    }
}
