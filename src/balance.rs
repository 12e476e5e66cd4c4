//! Load balancing over the node arena.
//!
//! Balancing runs three passes over the reconciled state, always in canonical replica order:
//!
//! 1. non-preferred replicas move to their preferred node, when their donor is over capacity & the
//!    preferred node can take them;
//! 2. orphaned replicas are placed on their preferred node where possible, and the rest are placed
//!    by hashed probing over the live nodes;
//! 3. nodes still over capacity shed their non-preferred replicas, again by hashed probing, until
//!    they are back within capacity.
//!
//! Insufficient capacity is tolerated: replicas or nodes which cannot be fixed are reported as
//! diagnostics and left as they are.

use serde::{Deserialize, Serialize};

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::placement::{NodeArena, PreferredPlacement, Replica};
use crate::reconcile::Reconciliation;

/// Counters describing the work done by a single invocation.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RebalanceStats {
    /// Non-preferred replicas moved back to their preferred node.
    pub migrated_to_preferred: usize,
    /// Orphaned replicas placed on their preferred node.
    pub orphans_placed_preferred: usize,
    /// Orphaned replicas placed by hashed probing.
    pub orphans_placed_fallback: usize,
    /// Replicas moved off overloaded nodes.
    pub replicas_relieved: usize,
    /// Orphaned replicas which no live node could admit.
    pub unplaced_replicas: usize,
    /// Live nodes left above capacity.
    pub overloaded_nodes: usize,
}

impl RebalanceStats {
    /// The number of replicas which changed hands, not counting orphan placement.
    pub fn migrations(&self) -> usize {
        self.migrated_to_preferred + self.replicas_relieved
    }
}

/// Run all balancing passes, mutating the arena's buckets & counters in place.
#[tracing::instrument(level = "trace", skip_all)]
pub fn balance(recon: Reconciliation, preferred: &PreferredPlacement, arena: &mut NodeArena, diagnostics: &mut Diagnostics) -> RebalanceStats {
    let mut stats = RebalanceStats::default();
    let Reconciliation {
        existing_non_preferred, orphaned, ..
    } = recon;

    let pending = migrate_to_preferred(existing_non_preferred.into_iter().collect(), preferred, arena, &mut stats);
    tracing::trace!(pending = pending.len(), "non-preferred replicas left in place");
    place_orphans(orphaned.into_iter().collect(), preferred, arena, diagnostics, &mut stats);
    relieve_overloaded(arena, diagnostics, &mut stats);

    tracing::debug!(?stats, "balancing complete");
    stats
}

/// Move non-preferred replicas of overloaded donors to their preferred node.
///
/// Returns the (replica, donor) pairs which stayed where they were.
fn migrate_to_preferred(
    mut pending: Vec<(Replica, usize)>, preferred: &PreferredPlacement, arena: &mut NodeArena, stats: &mut RebalanceStats,
) -> Vec<(Replica, usize)> {
    pending.retain(|(replica, donor)| {
        let receiver = match preferred.node_for(replica) {
            Some(receiver) => receiver,
            None => return true,
        };
        if !arena.node(*donor).is_overloaded() || !arena.node(receiver).can_admit(replica) {
            return true;
        }
        arena.release(*donor, replica);
        arena.admit(receiver, replica.clone(), true);
        stats.migrated_to_preferred += 1;
        false
    });
    pending
}

/// Place orphaned replicas, first on their preferred nodes and then by hashed probing.
///
/// Orphans are classified as non-preferred wherever they land.
fn place_orphans(
    mut orphaned: Vec<Replica>, preferred: &PreferredPlacement, arena: &mut NodeArena, diagnostics: &mut Diagnostics, stats: &mut RebalanceStats,
) {
    orphaned.retain(|replica| match preferred.node_for(replica) {
        Some(receiver) if arena.node(receiver).can_admit(replica) => {
            arena.admit(receiver, replica.clone(), false);
            stats.orphans_placed_preferred += 1;
            false
        }
        _ => true,
    });
    orphaned.retain(|replica| match arena.probe(replica) {
        Some(receiver) => {
            arena.admit(receiver, replica.clone(), false);
            stats.orphans_placed_fallback += 1;
            false
        }
        None => true,
    });
    for replica in orphaned {
        stats.unplaced_replicas += 1;
        diagnostics.push(DiagnosticKind::UnplacedReplica, replica.key());
    }
}

/// Shed non-preferred replicas from overloaded live nodes.
fn relieve_overloaded(arena: &mut NodeArena, diagnostics: &mut Diagnostics, stats: &mut RebalanceStats) {
    for donor in arena.live().to_vec() {
        if !arena.node(donor).is_overloaded() {
            continue;
        }
        arena.node_mut(donor).non_preferred.sort();
        let candidates = arena.node(donor).non_preferred.clone();
        for replica in candidates {
            if !arena.node(donor).is_overloaded() {
                break;
            }
            if let Some(receiver) = arena.probe(&replica) {
                arena.release(donor, &replica);
                arena.admit(receiver, replica, false);
                stats.replicas_relieved += 1;
            }
        }
        if arena.node(donor).is_overloaded() {
            stats.overloaded_nodes += 1;
            let node = arena.node(donor);
            diagnostics.push(
                DiagnosticKind::OverloadedNode,
                format!("{} ({} assigned, capacity {})", node.id, node.currently_assigned, node.capacity),
            );
        }
    }
}
