//! Replicas, the node arena & preferred placement.
//!
//! ## Preferred Placement
//! Every replica slot of a resource has a stable "home" node, computed purely from the order of
//! partitions, the priority order of states and the order of the node roster. Liveness and the
//! current assignment play no part in it. For partition index `p` and running replica index `r`
//! (counted across all states of the partition), the home node is roster position
//! `(p + r) mod |roster|`. For three partitions with a `MASTER:1, SLAVE:1` demand over three nodes:
//!
//! ```text
//! partition | MASTER | SLAVE
//! ----------+--------+------
//! P1        | N1     | N2
//! P2        | N2     | N3
//! P3        | N3     | N1
//! ```

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::demand::StateDemand;

/// A single replica slot of a resource.
///
/// Replicas are ordered by their canonical key `partition|state|replica_id`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Replica {
    pub partition: String,
    pub state: String,
    pub replica_id: usize,
    key: String,
}

impl Replica {
    /// Create a new instance.
    pub fn new(partition: &str, state: &str, replica_id: usize) -> Self {
        Self {
            partition: partition.into(),
            state: state.into(),
            replica_id,
            key: format!("{}|{}|{}", partition, state, replica_id),
        }
    }

    /// The canonical key of this replica.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The hash of this replica's canonical key, used to pick a starting node for fallback probing.
    ///
    /// This is the 32-bit Java string hash (`h = 31 * h + c` over UTF-16 code units) with the sign
    /// bit cleared, which keeps fallback placement reproducible across implementations.
    pub fn placement_hash(&self) -> u32 {
        let hash = self.key.encode_utf16().fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as i32));
        (hash & 0x7FFF_FFFF) as u32
    }
}

impl Ord for Replica {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl PartialOrd for Replica {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for Replica {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key)
    }
}

/// A node of the cluster along with its assignments for the current invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    /// The ID of this node.
    pub id: String,
    /// The number of replicas this node should hold.
    pub capacity: usize,
    /// The number of replicas currently counted against this node.
    pub currently_assigned: usize,
    /// Whether this node is live. Only live nodes ever receive replicas.
    pub is_alive: bool,
    /// Replicas held by this node which are at their preferred node.
    pub preferred: Vec<Replica>,
    /// Replicas held by this node which are not, or which were placed here during rebalancing.
    pub non_preferred: Vec<Replica>,
}

impl Node {
    /// Create a new dead node with no capacity.
    pub fn new(id: &str) -> Self {
        Self {
            id: id.into(),
            capacity: 0,
            currently_assigned: 0,
            is_alive: false,
            preferred: vec![],
            non_preferred: vec![],
        }
    }

    /// Check if this node holds more replicas than its capacity.
    pub fn is_overloaded(&self) -> bool {
        self.currently_assigned > self.capacity
    }

    /// Check if this node holds any replica of the given partition.
    pub fn hosts_partition(&self, partition: &str) -> bool {
        self.preferred.iter().chain(self.non_preferred.iter()).any(|r| r.partition == partition)
    }

    /// Check if this node may be given the replica: it must be live, below capacity, and must not
    /// already hold a replica of the same partition.
    pub fn can_admit(&self, replica: &Replica) -> bool {
        self.is_alive && self.currently_assigned < self.capacity && !self.hosts_partition(&replica.partition)
    }
}

/// All nodes known to an invocation, addressed by index.
#[derive(Clone, Debug, Default)]
pub struct NodeArena {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    /// Live nodes, in the order given by the snapshot.
    live: Vec<usize>,
    /// The full node roster used for preferred placement.
    roster: Vec<usize>,
}

impl NodeArena {
    /// Create a new arena from the configured & live node lists.
    ///
    /// The roster is the configured node list, followed by any live node missing from it. Repeated
    /// IDs are ignored.
    pub fn new(all_nodes: &[String], live_nodes: &[String]) -> Self {
        let mut arena = Self::default();
        for id in all_nodes.iter().chain(live_nodes.iter()) {
            if !arena.index.contains_key(id) {
                let idx = arena.insert(id);
                arena.roster.push(idx);
            }
        }
        for id in live_nodes {
            let idx = arena.index[id];
            if !arena.live.contains(&idx) {
                arena.live.push(idx);
            }
        }
        arena
    }

    fn insert(&mut self, id: &str) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(Node::new(id));
        self.index.insert(id.into(), idx);
        idx
    }

    /// Get the index of the given node, adding it as an unconfigured dead node if unknown.
    pub fn index_or_insert(&mut self, id: &str) -> usize {
        match self.index.get(id) {
            Some(idx) => *idx,
            None => self.insert(id),
        }
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn node(&self, idx: usize) -> &Node {
        &self.nodes[idx]
    }

    pub fn node_mut(&mut self, idx: usize) -> &mut Node {
        &mut self.nodes[idx]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn live(&self) -> &[usize] {
        &self.live
    }

    pub fn roster(&self) -> &[usize] {
        &self.roster
    }

    /// Find a live node able to admit the given replica, by linear probing from the replica's hash.
    pub fn probe(&self, replica: &Replica) -> Option<usize> {
        if self.live.is_empty() {
            return None;
        }
        let start = replica.placement_hash() as usize % self.live.len();
        (start..start + self.live.len())
            .map(|offset| self.live[offset % self.live.len()])
            .find(|idx| self.nodes[*idx].can_admit(replica))
    }

    /// Move a replica into a node's bucket, counting it against the node.
    pub fn admit(&mut self, idx: usize, replica: Replica, preferred: bool) {
        let node = &mut self.nodes[idx];
        node.currently_assigned += 1;
        if preferred {
            node.preferred.push(replica);
        } else {
            node.non_preferred.push(replica);
        }
    }

    /// Remove a replica from a node's non-preferred bucket, releasing its load.
    pub fn release(&mut self, idx: usize, replica: &Replica) -> bool {
        let node = &mut self.nodes[idx];
        match node.non_preferred.iter().position(|r| r == replica) {
            Some(pos) => {
                node.non_preferred.remove(pos);
                node.currently_assigned = node.currently_assigned.saturating_sub(1);
                true
            }
            None => false,
        }
    }
}

/// The preferred node of every replica slot, in canonical replica order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PreferredPlacement {
    slots: BTreeMap<Replica, usize>,
}

impl PreferredPlacement {
    /// The preferred node of the given replica.
    pub fn node_for(&self, replica: &Replica) -> Option<usize> {
        self.slots.get(replica).copied()
    }

    /// Iterate over all replica slots & their preferred nodes in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&Replica, usize)> + '_ {
        self.slots.iter().map(|(replica, idx)| (replica, *idx))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Compute the preferred placement of every replica slot over the arena's full roster.
#[tracing::instrument(level = "trace", skip(partitions, demand, arena))]
pub fn plan_preferred_placement(partitions: &[String], demand: &StateDemand, arena: &NodeArena) -> PreferredPlacement {
    let roster = arena.roster();
    let mut slots = BTreeMap::new();
    if roster.is_empty() {
        return PreferredPlacement { slots };
    }
    for (partition_idx, partition) in partitions.iter().enumerate() {
        let mut replica_idx = 0;
        for (state, count) in demand.iter() {
            for replica_id in 0..count {
                let node = roster[(partition_idx + replica_idx) % roster.len()];
                slots.insert(Replica::new(partition, state, replica_id), node);
                replica_idx += 1;
            }
        }
    }
    PreferredPlacement { slots }
}
