//! Rebalancer metrics.
//!
//! Metrics are recorded through the `metrics` facade. Nothing is recorded anywhere unless the
//! embedding process installs a recorder.

use crate::RebalanceStats;

pub const METRIC_INVOCATIONS: &str = "hadron_rebalance_invocations_total";
pub const METRIC_MIGRATED_TO_PREFERRED: &str = "hadron_rebalance_migrated_to_preferred_total";
pub const METRIC_ORPHANS_PLACED: &str = "hadron_rebalance_orphans_placed_total";
pub const METRIC_REPLICAS_RELIEVED: &str = "hadron_rebalance_replicas_relieved_total";
pub const METRIC_UNPLACED_REPLICAS: &str = "hadron_rebalance_unplaced_replicas_total";
pub const METRIC_OVERLOADED_NODES: &str = "hadron_rebalance_overloaded_nodes_total";

/// Register the rebalancer metrics.
///
/// This function should be called only once, early in the lifetime of the process.
pub fn register_metrics() {
    metrics::register_counter!(METRIC_INVOCATIONS, metrics::Unit::Count, "Number of rebalancer invocations.");
    metrics::register_counter!(METRIC_MIGRATED_TO_PREFERRED, metrics::Unit::Count, "Replicas migrated back to their preferred node.");
    metrics::register_counter!(METRIC_ORPHANS_PLACED, metrics::Unit::Count, "Orphaned replicas given a node.");
    metrics::register_counter!(METRIC_REPLICAS_RELIEVED, metrics::Unit::Count, "Replicas moved off overloaded nodes.");
    metrics::register_counter!(METRIC_UNPLACED_REPLICAS, metrics::Unit::Count, "Replicas which could not be placed on any node.");
    metrics::register_counter!(METRIC_OVERLOADED_NODES, metrics::Unit::Count, "Nodes left above capacity after rebalancing.");
}

/// Record the stats of a single invocation.
pub(crate) fn record(stats: &RebalanceStats) {
    metrics::increment_counter!(METRIC_INVOCATIONS);
    metrics::counter!(METRIC_MIGRATED_TO_PREFERRED, stats.migrated_to_preferred as u64);
    metrics::counter!(METRIC_ORPHANS_PLACED, (stats.orphans_placed_preferred + stats.orphans_placed_fallback) as u64);
    metrics::counter!(METRIC_REPLICAS_RELIEVED, stats.replicas_relieved as u64);
    metrics::counter!(METRIC_UNPLACED_REPLICAS, stats.unplaced_replicas as u64);
    metrics::counter!(METRIC_OVERLOADED_NODES, stats.overloaded_nodes as u64);
}
