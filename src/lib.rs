//! Hadron automatic rebalancer.
//!
//! Given a snapshot of a partitioned & replicated resource and of the cluster it runs on, the
//! rebalancer computes the resource's new ideal state: which node should hold which state of which
//! partition. The computation is a pure function of the snapshot. It respects the state model's
//! replica counts, spreads replicas evenly over live nodes under a per-node capacity, keeps
//! replicas where they already are whenever it can, and tolerates insufficient capacity by
//! reporting what it could not place.
//!
//! ## Pipeline
//! - `demand`: resolve per-state replica counts and filter the observed assignment.
//! - `capacity`: size every live node.
//! - `placement`: compute the liveness-agnostic home node of every replica slot.
//! - `reconcile`: classify the observed assignment against those homes.
//! - `balance`: migrate, place orphans & relieve overloaded nodes.
//! - `render`: emit the record's map & list fields.

pub mod balance;
pub mod capacity;
pub mod config;
pub mod demand;
pub mod diagnostics;
pub mod error;
#[cfg(test)]
mod fixtures;
pub mod models;
pub mod placement;
pub mod prom;
pub mod reconcile;
pub mod render;

use serde::{Deserialize, Serialize};

pub use crate::balance::RebalanceStats;
pub use crate::config::RebalanceOptions;
pub use crate::diagnostics::{Diagnostic, DiagnosticKind};
pub use crate::error::{RebalanceError, Result};
pub use crate::models::{AssignmentRecord, RebalanceMode, ResourceSnapshot, StateModelDefinition};

use crate::diagnostics::Diagnostics;
use crate::placement::NodeArena;

/// The result of a single rebalancer invocation.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RebalanceOutcome {
    /// The resource's new ideal state.
    pub record: AssignmentRecord,
    /// Non-fatal conditions observed along the way, in the order they were found.
    pub diagnostics: Vec<Diagnostic>,
    /// Counters describing the work done.
    pub stats: RebalanceStats,
    /// The final state of every node seen during the invocation.
    pub nodes: Vec<NodeSummary>,
}

/// The final load of a node after rebalancing.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodeSummary {
    pub id: String,
    pub alive: bool,
    pub capacity: usize,
    pub assigned: usize,
}

/// The automatic rebalancer.
#[derive(Clone, Debug, Default)]
pub struct AutoRebalancer {
    options: RebalanceOptions,
}

impl AutoRebalancer {
    /// Create a new instance with the given options.
    pub fn new(options: RebalanceOptions) -> Self {
        Self { options }
    }

    /// Create a new instance with options taken from the runtime environment.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(RebalanceOptions::from_env()?))
    }

    pub fn options(&self) -> &RebalanceOptions {
        &self.options
    }

    /// Compute the new ideal state of the resource described by the given snapshot.
    ///
    /// The only error condition is a replica factor which is not a non-negative integer. All other
    /// irregularities, including a cluster without live nodes, yield a record & diagnostics.
    #[tracing::instrument(level = "debug", skip(self, snapshot), fields(resource = %snapshot.resource))]
    pub fn compute(&self, snapshot: &ResourceSnapshot) -> Result<RebalanceOutcome> {
        let replica_factor = snapshot.replica_factor()?;
        let mut diagnostics = Diagnostics::new(self.options.log_diagnostics);
        let mut record = AssignmentRecord::new_auto_rebalance(snapshot);
        let mut arena = NodeArena::new(&snapshot.all_nodes, &snapshot.live_nodes);

        let demand = demand::plan_state_demand(&snapshot.state_model, arena.live().len(), replica_factor, &mut diagnostics);
        if arena.live().is_empty() {
            diagnostics.push(DiagnosticKind::NoLiveNodes, snapshot.resource.as_str());
            return Ok(Self::finish(record, diagnostics, RebalanceStats::default(), &arena));
        }
        let current = demand::filter_current_assignment(&snapshot.partitions, &snapshot.current_states, &snapshot.pending_states, &demand);

        let max_per_node = capacity::per_node_cap(
            snapshot.partitions.len(),
            [self.options.max_partitions_per_node, snapshot.max_partitions_per_instance()],
        );
        let total_demand = demand.replicas_per_partition() * snapshot.partitions.len();
        let total_capacity = capacity::plan_capacity(&mut arena, total_demand, max_per_node);
        tracing::debug!(total_demand, total_capacity, max_per_node, live = arena.live().len(), "capacity planned");

        let preferred = placement::plan_preferred_placement(&snapshot.partitions, &demand, &arena);
        let recon = reconcile::reconcile(&current, &demand, &preferred, &mut arena);
        let stats = balance::balance(recon, &preferred, &mut arena, &mut diagnostics);
        render::render(&arena, &demand, &mut record, self.options.dedupe_preference_lists);

        Ok(Self::finish(record, diagnostics, stats, &arena))
    }

    fn finish(record: AssignmentRecord, diagnostics: Diagnostics, stats: RebalanceStats, arena: &NodeArena) -> RebalanceOutcome {
        prom::record(&stats);
        let nodes = arena
            .nodes()
            .iter()
            .map(|node| NodeSummary {
                id: node.id.clone(),
                alive: node.is_alive,
                capacity: node.capacity,
                assigned: node.currently_assigned,
            })
            .collect();
        RebalanceOutcome {
            record,
            diagnostics: diagnostics.into_inner(),
            stats,
            nodes,
        }
    }
}
