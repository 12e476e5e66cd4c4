use std::collections::BTreeMap;

use maplit::btreemap;

use crate::models::{NodeStateMap, ResourceSnapshot, StateModelDefinition};

/// A master/slave model with a single master, the remaining replicas being slaves.
pub fn master_slave_model() -> StateModelDefinition {
    StateModelDefinition {
        name: "MasterSlave".into(),
        states_priority_list: vec!["MASTER".into(), "SLAVE".into()],
        state_counts: btreemap! {
            "MASTER".into() => "1".into(),
            "SLAVE".into() => "R".into(),
        },
    }
}

/// A model with a single online replica per partition.
pub fn online_model() -> StateModelDefinition {
    StateModelDefinition {
        name: "OnlineOffline".into(),
        states_priority_list: vec!["ONLINE".into()],
        state_counts: btreemap! {"ONLINE".into() => "R".into()},
    }
}

/// Build a snapshot with the given partitions & nodes, and no observed state.
pub fn snapshot(model: StateModelDefinition, replicas: usize, partitions: &[&str], live: &[&str], all: &[&str]) -> ResourceSnapshot {
    ResourceSnapshot {
        resource: "events".into(),
        partitions: strings(partitions),
        state_model: model,
        replicas: replicas.to_string(),
        live_nodes: strings(live),
        all_nodes: strings(all),
        current_states: BTreeMap::new(),
        pending_states: BTreeMap::new(),
        simple_fields: btreemap! {"REPLICAS".into() => replicas.to_string()},
    }
}

/// The three partition, three node master/slave cluster with nothing assigned yet.
pub fn cold_cluster() -> ResourceSnapshot {
    snapshot(master_slave_model(), 2, &["P1", "P2", "P3"], &["N1", "N2", "N3"], &["N1", "N2", "N3"])
}

/// Build a node→state map from pairs.
pub fn node_states(pairs: &[(&str, &str)]) -> NodeStateMap {
    pairs.iter().map(|(node, state)| (node.to_string(), state.to_string())).collect()
}

pub fn strings(vals: &[&str]) -> Vec<String> {
    vals.iter().map(|val| val.to_string()).collect()
}

/// Install a test log subscriber, honoring `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
