//! Reconciliation of the current assignment against the preferred placement.
//!
//! Every observed (partition, node, state) entry counts toward its node's load. Each entry then
//! claims a replica slot of its (partition, state), first fit over replica IDs:
//!
//! - entries which find a free slot of the preferred placement claim it, whichever node holds them,
//!   and become existing-preferred replicas;
//! - entries left over claim the lowest slot still free, and become existing-non-preferred;
//! - slots of the preferred placement which nobody claimed are orphaned.
//!
//! Replicas therefore stay where they are held. Only orphans & overloaded nodes cause movement.

use std::collections::{BTreeMap, BTreeSet};

use crate::demand::{CurrentMapping, StateDemand};
use crate::placement::{NodeArena, PreferredPlacement, Replica};

/// The classification of a resource's current assignment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Replicas currently held by their preferred node.
    pub existing_preferred: BTreeMap<Replica, usize>,
    /// Replicas currently held by some other node, along with that node.
    pub existing_non_preferred: BTreeMap<Replica, usize>,
    /// Replica slots with no current holder.
    pub orphaned: BTreeSet<Replica>,
}

/// Classify the current mapping against the preferred placement.
///
/// This updates the load counters & buckets of all nodes found in the current mapping. Nodes
/// unknown to the arena are added to it as dead nodes.
#[tracing::instrument(level = "trace", skip_all)]
pub fn reconcile(current: &CurrentMapping, demand: &StateDemand, preferred: &PreferredPlacement, arena: &mut NodeArena) -> Reconciliation {
    let mut out = Reconciliation::default();
    for (partition, nodes) in current.iter() {
        let mut free: BTreeMap<&str, Vec<usize>> = demand.iter().map(|(state, count)| (state, (0..count).collect())).collect();

        let mut entries = Vec::with_capacity(nodes.len());
        for (node_id, state) in nodes.iter() {
            let idx = arena.index_or_insert(node_id);
            arena.node_mut(idx).currently_assigned += 1;
            entries.push((idx, state.as_str(), false));
        }

        // First fit over the slots of the preferred placement, regardless of holder.
        for (idx, state, claimed) in entries.iter_mut() {
            let state: &str = state;
            let ids = match free.get_mut(state) {
                Some(ids) => ids,
                None => continue,
            };
            let pos = ids.iter().position(|id| preferred.node_for(&Replica::new(partition, state, *id)).is_some());
            if let Some(pos) = pos {
                let replica = Replica::new(partition, state, ids.remove(pos));
                arena.node_mut(*idx).preferred.push(replica.clone());
                out.existing_preferred.insert(replica, *idx);
                *claimed = true;
            }
        }

        // Leftover entries take the lowest free slot of their state.
        for (idx, state, _) in entries.iter().filter(|(_, _, claimed)| !claimed) {
            match free.get_mut(*state).filter(|ids| !ids.is_empty()) {
                Some(ids) => {
                    let replica = Replica::new(partition, state, ids.remove(0));
                    arena.node_mut(*idx).non_preferred.push(replica.clone());
                    out.existing_non_preferred.insert(replica, *idx);
                }
                None => {
                    tracing::trace!(%partition, node = %arena.node(*idx).id, %state, "surplus holder has no free replica slot");
                }
            }
        }

        for (state, ids) in free {
            let unclaimed = ids.into_iter().map(|id| Replica::new(partition, state, id));
            out.orphaned.extend(unclaimed.filter(|replica| preferred.node_for(replica).is_some()));
        }
    }
    tracing::debug!(
        existing_preferred = out.existing_preferred.len(),
        existing_non_preferred = out.existing_non_preferred.len(),
        orphaned = out.orphaned.len(),
        "current assignment reconciled"
    );
    out
}
