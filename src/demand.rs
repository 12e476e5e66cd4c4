//! State demand planning & current assignment filtering.
//!
//! These are the normalization steps run before any placement work. The state model's
//! cardinality specifiers are resolved into a concrete replica count per state, and the observed
//! current & pending states of the cluster are reduced to the states the demand map recognizes.

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::RebalanceError;
use crate::models::{NodeStateMap, StateModelDefinition};

/// The specifier token for one replica per live node.
pub const COUNT_ALL_LIVE_NODES: &str = "N";
/// The specifier token for whatever remains of the replica budget.
pub const COUNT_REMAINING: &str = "R";

/// A parsed state cardinality specifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateCount {
    /// A fixed number of replicas.
    Fixed(usize),
    /// One replica per live node.
    AllLiveNodes,
    /// The replica budget left after all other states are accounted for.
    Remaining,
}

impl FromStr for StateCount {
    type Err = RebalanceError;

    fn from_str(val: &str) -> Result<Self, Self::Err> {
        match val.trim() {
            COUNT_ALL_LIVE_NODES => Ok(Self::AllLiveNodes),
            COUNT_REMAINING => Ok(Self::Remaining),
            other => other
                .parse::<usize>()
                .map(Self::Fixed)
                .map_err(|_| RebalanceError::InvalidInput(format!("unrecognized state count specifier {:?}", val))),
        }
    }
}

/// The number of replicas required of each state, in state priority order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StateDemand {
    entries: Vec<(String, usize)>,
}

impl StateDemand {
    /// The number of replicas required of the given state, if it is recognized.
    pub fn get(&self, state: &str) -> Option<usize> {
        self.entries.iter().find(|(name, _)| name == state).map(|(_, count)| *count)
    }

    /// Check if the given state is recognized.
    pub fn contains(&self, state: &str) -> bool {
        self.get(state).is_some()
    }

    /// Iterate over states & their counts in priority order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.entries.iter().map(|(name, count)| (name.as_str(), *count))
    }

    /// The total number of replicas of a single partition.
    pub fn replicas_per_partition(&self) -> usize {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    fn insert(&mut self, state: &str, count: usize) {
        match self.entries.iter_mut().find(|(name, _)| name == state) {
            Some((_, existing)) => *existing = count,
            None => self.entries.push((state.to_string(), count)),
        }
    }
}

impl<'a> FromIterator<(&'a str, usize)> for StateDemand {
    fn from_iter<T: IntoIterator<Item = (&'a str, usize)>>(iter: T) -> Self {
        let mut demand = Self::default();
        for (state, count) in iter {
            demand.insert(state, count);
        }
        demand
    }
}

/// Resolve the state model's cardinality specifiers into a concrete demand map.
///
/// States with an unparseable specifier are skipped and reported. Only the first state using the
/// remaining-budget specifier is honored.
#[tracing::instrument(level = "trace", skip(model, diagnostics))]
pub fn plan_state_demand(model: &StateModelDefinition, live_nodes: usize, replica_factor: usize, diagnostics: &mut Diagnostics) -> StateDemand {
    let mut demand = StateDemand::default();
    let mut budget = replica_factor as i64;
    let mut remaining_state = None;

    for state in model.states_priority_list.iter() {
        let count = match model.state_counts.get(state) {
            Some(spec) => match spec.parse::<StateCount>() {
                Ok(count) => count,
                Err(err) => {
                    diagnostics.push(DiagnosticKind::InvalidStateCount, format!("{}: {}", state, err));
                    continue;
                }
            },
            None => {
                diagnostics.push(DiagnosticKind::InvalidStateCount, format!("{}: no count specified", state));
                continue;
            }
        };
        match count {
            StateCount::AllLiveNodes => {
                demand.insert(state, live_nodes);
                budget -= live_nodes as i64;
            }
            StateCount::Fixed(0) => continue, // No replica slots to track.
            StateCount::Fixed(count) => {
                demand.insert(state, count);
                budget -= count as i64;
            }
            StateCount::Remaining => {
                if remaining_state.is_none() {
                    remaining_state = Some(state);
                }
            }
        }
    }

    // Wait until all other states are counted before resolving the remainder.
    if let Some(state) = remaining_state {
        demand.insert(state, budget.max(0) as usize);
    }
    tracing::trace!(?demand, "state demand planned");
    demand
}

/// The observed assignment of a resource, as (partition, node→state) pairs in partition order.
pub type CurrentMapping = Vec<(String, NodeStateMap)>;

/// Merge current & pending states, keeping only states recognized by the given demand map.
///
/// Pending states overwrite current states for the same node.
pub fn filter_current_assignment(
    partitions: &[String], current: &BTreeMap<String, NodeStateMap>, pending: &BTreeMap<String, NodeStateMap>, demand: &StateDemand,
) -> CurrentMapping {
    partitions
        .iter()
        .map(|partition| {
            let mut nodes = NodeStateMap::new();
            for source in [current.get(partition), pending.get(partition)].into_iter().flatten() {
                for (node, state) in source.iter().filter(|(_, state)| demand.contains(state)) {
                    nodes.insert(node.clone(), state.clone());
                }
            }
            (partition.clone(), nodes)
        })
        .collect()
}
