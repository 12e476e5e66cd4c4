//! Node capacity planning.

use crate::placement::NodeArena;

/// The effective per-node replica cap.
///
/// A node can never hold more than one replica per partition, so the partition count is always an
/// upper bound. Any configured caps may only tighten it.
pub fn per_node_cap(partitions: usize, caps: impl IntoIterator<Item = Option<usize>>) -> usize {
    caps.into_iter().flatten().filter(|cap| *cap > 0).fold(partitions, usize::min)
}

/// Size each live node of the arena so that the given total demand is spread evenly.
///
/// Every live node gets `total_demand / |live|` replicas (bounded by `max_per_node` when it is
/// non-zero), and the remainder is handed out one replica at a time in live node order to nodes
/// still below the cap. Live nodes are marked alive. Returns the total capacity planned.
#[tracing::instrument(level = "trace", skip(arena))]
pub fn plan_capacity(arena: &mut NodeArena, total_demand: usize, max_per_node: usize) -> usize {
    let live = arena.live().to_vec();
    if live.is_empty() {
        return 0;
    }
    let dist_floor = total_demand / live.len();
    let mut dist_remainder = total_demand % live.len();

    let mut total = 0;
    for idx in live {
        let mut target = if max_per_node > 0 { dist_floor.min(max_per_node) } else { dist_floor };
        if dist_remainder > 0 && (max_per_node == 0 || target < max_per_node) {
            target += 1;
            dist_remainder -= 1;
        }
        let node = arena.node_mut(idx);
        node.is_alive = true;
        node.capacity = target;
        total += target;
    }
    tracing::trace!(total, dist_floor, "node capacity planned");
    total
}
