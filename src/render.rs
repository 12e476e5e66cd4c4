//! Rendering of the balanced node arena into an assignment record.

use crate::demand::StateDemand;
use crate::models::AssignmentRecord;
use crate::placement::NodeArena;

/// Write the buckets of every live node into the record's map & list fields.
///
/// The map fields hold the state of each node per partition. The list fields are built per
/// (state, replica ID) in priority order: a node is appended for each of its preferred replicas
/// matching that exact slot, and for each of its non-preferred replicas regardless of slot. Nodes
/// holding non-preferred replicas therefore appear once per slot iterated, unless `dedupe` is set.
#[tracing::instrument(level = "trace", skip_all)]
pub fn render(arena: &NodeArena, demand: &StateDemand, record: &mut AssignmentRecord, dedupe: bool) {
    for &idx in arena.live() {
        let node = arena.node(idx);
        for replica in node.preferred.iter().chain(node.non_preferred.iter()) {
            record
                .map_fields
                .entry(replica.partition.clone())
                .or_default()
                .insert(node.id.clone(), replica.state.clone());
        }
    }

    for (state, count) in demand.iter() {
        for replica_id in 0..count {
            for &idx in arena.live() {
                let node = arena.node(idx);
                let matching = node.preferred.iter().filter(|r| r.state == state && r.replica_id == replica_id);
                for replica in matching.chain(node.non_preferred.iter()) {
                    record.list_fields.entry(replica.partition.clone()).or_default().push(node.id.clone());
                }
            }
        }
    }

    if dedupe {
        for nodes in record.list_fields.values_mut() {
            let mut seen = Vec::with_capacity(nodes.len());
            nodes.retain(|node| {
                if seen.contains(node) {
                    return false;
                }
                seen.push(node.clone());
                true
            });
        }
    }
}
