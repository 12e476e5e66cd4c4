//! Runtime configuration.

use anyhow::Context;
use serde::Deserialize;

use crate::error::{RebalanceError, Result};

/// The prefix of all environment variables read by `RebalanceOptions::from_env`.
pub const ENV_PREFIX: &str = "REBALANCE_";

/// Rebalancer options.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct RebalanceOptions {
    /// An additional cap on the number of replicas any single node may hold.
    ///
    /// The effective cap is the minimum of this value, the resource's partition count, and the
    /// prior record's `MAX_PARTITIONS_PER_INSTANCE` field.
    #[serde(default)]
    pub max_partitions_per_node: Option<usize>,
    /// Collapse repeated node IDs in each partition's preference list, keeping first occurrences.
    ///
    /// Off by default, in which case lists are rendered exactly as accumulated.
    #[serde(default)]
    pub dedupe_preference_lists: bool,
    /// Mirror each diagnostic to the log as it is recorded.
    #[serde(default = "RebalanceOptions::default_log_diagnostics")]
    pub log_diagnostics: bool,
}

impl Default for RebalanceOptions {
    fn default() -> Self {
        Self {
            max_partitions_per_node: None,
            dedupe_preference_lists: false,
            log_diagnostics: Self::default_log_diagnostics(),
        }
    }
}

impl RebalanceOptions {
    /// Build options from the runtime environment, using variables prefixed with `REBALANCE_`.
    pub fn from_env() -> Result<Self> {
        envy::prefixed(ENV_PREFIX)
            .from_env()
            .context("error building rebalance options from env")
            .map_err(RebalanceError::Config)
    }

    /// Build options from the given key/value pairs, which use the same naming as the environment.
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Result<Self> {
        envy::prefixed(ENV_PREFIX)
            .from_iter(vars)
            .context("error building rebalance options from vars")
            .map_err(RebalanceError::Config)
    }

    fn default_log_diagnostics() -> bool {
        true
    }
}
