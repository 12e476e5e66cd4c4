//! Input snapshot & output record models.
//!
//! These are the data contracts shared with the surrounding controller. The controller builds a
//! `ResourceSnapshot` from its cluster data cache, hands it to the rebalancer, and persists the
//! returned `AssignmentRecord` as the resource's new ideal state.

use std::collections::BTreeMap;

use anyhow::Context;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{RebalanceError, Result};

/// The simple field holding the resource's ideal state mode.
pub const FIELD_IDEAL_STATE_MODE: &str = "IDEAL_STATE_MODE";
/// The simple field holding an optional cap on the number of partitions per node.
pub const FIELD_MAX_PARTITIONS_PER_INSTANCE: &str = "MAX_PARTITIONS_PER_INSTANCE";
/// The simple field holding the resource's replica factor.
pub const FIELD_REPLICAS: &str = "REPLICAS";

/// A node→state mapping for a single partition.
pub type NodeStateMap = BTreeMap<String, String>;

/// A full snapshot of a resource & its cluster, as consumed by the rebalancer.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSnapshot {
    /// The name of the resource being rebalanced.
    pub resource: String,
    /// The resource's partitions, in the order used for preferred placement.
    pub partitions: Vec<String>,
    /// The state model governing the resource's replicas.
    pub state_model: StateModelDefinition,
    /// The replica factor of the resource, as text.
    ///
    /// When blank, the prior record's `REPLICAS` simple field is used instead.
    #[serde(default)]
    pub replicas: String,
    /// The IDs of all currently live nodes, in roster order.
    pub live_nodes: Vec<String>,
    /// The IDs of all configured nodes, live or not, in roster order.
    pub all_nodes: Vec<String>,
    /// Observed current states, keyed by partition.
    #[serde(default)]
    pub current_states: BTreeMap<String, NodeStateMap>,
    /// Observed pending states, keyed by partition.
    ///
    /// Pending states take precedence over current states for the same node.
    #[serde(default)]
    pub pending_states: BTreeMap<String, NodeStateMap>,
    /// Simple configuration fields of the prior assignment record.
    #[serde(default)]
    pub simple_fields: BTreeMap<String, String>,
}

impl ResourceSnapshot {
    /// Parse a snapshot from its YAML representation.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .context("error deserializing resource snapshot from yaml")
            .map_err(RebalanceError::Serialization)
    }

    /// Parse a snapshot from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .context("error deserializing resource snapshot from json")
            .map_err(RebalanceError::Serialization)
    }

    /// The replica factor of the resource.
    ///
    /// Fails if neither the snapshot's replica text nor the prior record's `REPLICAS` field holds a
    /// non-negative integer.
    pub fn replica_factor(&self) -> Result<usize> {
        let text = match self.replicas.trim() {
            "" => self.simple_fields.get(FIELD_REPLICAS).map(|val| val.trim()).unwrap_or_default(),
            text => text,
        };
        text.parse::<usize>()
            .map_err(|_| RebalanceError::InvalidInput(format!("invalid replica factor {:?} for resource {}", text, self.resource)))
    }

    /// The per-node partition cap configured on the prior record, if any.
    pub fn max_partitions_per_instance(&self) -> Option<usize> {
        self.simple_fields
            .get(FIELD_MAX_PARTITIONS_PER_INSTANCE)
            .and_then(|val| val.trim().parse::<usize>().ok())
            .filter(|val| *val > 0)
    }
}

/// The definition of a state model: its legal states & how many replicas each state needs.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StateModelDefinition {
    /// The name of the state model.
    #[serde(default)]
    pub name: String,
    /// All legal states, highest priority first.
    pub states_priority_list: Vec<String>,
    /// Cardinality specifiers for each state.
    ///
    /// Each value is a non-negative integer, `N` for one replica per live node, or `R` for
    /// whatever remains of the replica budget.
    #[serde(default)]
    pub state_counts: BTreeMap<String, String>,
}

/// The mode of an ideal state record.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RebalanceMode {
    /// Placement is given explicitly by the preference lists.
    Auto,
    /// Placement is computed by the automatic rebalancer.
    AutoRebalance,
    /// Placement is fully controlled by the user.
    Customized,
}

impl Default for RebalanceMode {
    fn default() -> Self {
        Self::Auto
    }
}

impl std::fmt::Display for RebalanceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Auto => "AUTO",
                Self::AutoRebalance => "AUTO_REBALANCE",
                Self::Customized => "CUSTOMIZED",
            }
        )
    }
}

/// The output of the rebalancer: a resource's new ideal state.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRecord {
    /// The name of the resource this record describes.
    pub id: String,
    /// The mode of this record.
    #[serde(default)]
    pub mode: RebalanceMode,
    /// Simple configuration fields.
    #[serde(default)]
    pub simple_fields: BTreeMap<String, String>,
    /// For each partition, the state assigned to each node.
    #[serde(default)]
    pub map_fields: BTreeMap<String, NodeStateMap>,
    /// For each partition, node IDs in read/write priority order.
    #[serde(default)]
    pub list_fields: BTreeMap<String, Vec<String>>,
}

impl AssignmentRecord {
    /// Create a new automatic rebalance record for the given resource.
    ///
    /// Every partition starts with an empty map & list field.
    pub fn new_auto_rebalance(snapshot: &ResourceSnapshot) -> Self {
        let mut simple_fields = snapshot.simple_fields.clone();
        simple_fields.insert(FIELD_IDEAL_STATE_MODE.into(), RebalanceMode::AutoRebalance.to_string());
        let map_fields = snapshot.partitions.iter().map(|p| (p.clone(), NodeStateMap::new())).collect();
        let list_fields = snapshot.partitions.iter().map(|p| (p.clone(), Vec::new())).collect();
        Self {
            id: snapshot.resource.clone(),
            mode: RebalanceMode::AutoRebalance,
            simple_fields,
            map_fields,
            list_fields,
        }
    }

    /// Serialize this record as pretty printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .context("error serializing assignment record to json")
            .map_err(RebalanceError::Serialization)
    }

    /// Serialize this record as YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .context("error serializing assignment record to yaml")
            .map_err(RebalanceError::Serialization)
    }

    /// All partitions hosted by the given node, with their states.
    pub fn partitions_on(&self, node: &str) -> BTreeMap<&str, &str> {
        self.map_fields
            .iter()
            .filter_map(|(partition, nodes)| nodes.get(node).map(|state| (partition.as_str(), state.as_str())))
            .collect()
    }
}
