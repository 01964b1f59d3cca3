//! Innovation tracking for structural mutations.
//!
//! The tracker owns a monotone counter plus a lifetime cache keyed by the
//! structural mutation itself, so independently-arising identical mutations
//! resolve to the same innovation number. This is what lets crossover align
//! genes from different lineages: two genomes that grew the same edge in
//! different generations still agree on its number.
//!
//! Hidden node ids come from the same tracker. Splitting the same edge
//! anywhere in the population yields the same node id, keeping the two
//! replacement connections structurally identical as well.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::gene::{ConnKey, NodeId};

/// Population-scoped allocator for innovation numbers and hidden node ids.
///
/// Plain mutable state: mutation and evolve steps execute sequentially per
/// population, so no synchronization is carried here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InnovationTracker {
    /// Next unused innovation number.
    next: u64,
    /// Edge -> innovation number, kept for the population's lifetime.
    #[serde(with = "conn_keyed_map")]
    edges: HashMap<ConnKey, u64>,
    /// Split edge -> hidden node id created by that split.
    #[serde(with = "conn_keyed_map")]
    splits: HashMap<ConnKey, NodeId>,
    /// Next unused hidden node id.
    next_node_id: NodeId,
}

impl InnovationTracker {
    /// Create a tracker for a population whose outputs occupy `0..num_outputs`.
    #[must_use]
    pub fn new(num_outputs: usize) -> Self {
        Self {
            next: 0,
            edges: HashMap::new(),
            splits: HashMap::new(),
            next_node_id: num_outputs as NodeId,
        }
    }

    /// Innovation number for the edge `from -> to`, allocating a fresh
    /// number on first sight and reusing the cached one afterwards.
    pub fn connection(&mut self, from: NodeId, to: NodeId) -> u64 {
        if let Some(&inn) = self.edges.get(&(from, to)) {
            return inn;
        }
        let inn = self.next;
        self.next += 1;
        self.edges.insert((from, to), inn);
        inn
    }

    /// Hidden node id for splitting the edge `from -> to`. The same split
    /// always yields the same node id, so the replacement connections align
    /// across genomes too.
    pub fn split_node(&mut self, from: NodeId, to: NodeId) -> NodeId {
        if let Some(&id) = self.splits.get(&(from, to)) {
            return id;
        }
        let id = self.next_node_id;
        self.next_node_id += 1;
        self.splits.insert((from, to), id);
        id
    }
}

/// JSON object keys must be strings, so tuple-keyed maps round-trip as
/// `[from, to, value]` entry lists.
mod conn_keyed_map {
    use std::collections::HashMap;

    use serde::de::{Deserialize, Deserializer};
    use serde::ser::{Serialize, Serializer};

    use crate::gene::{ConnKey, NodeId};

    pub fn serialize<S, V>(map: &HashMap<ConnKey, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        V: Serialize,
    {
        serializer.collect_seq(map.iter().map(|(&(from, to), v)| (from, to, v)))
    }

    pub fn deserialize<'de, D, V>(deserializer: D) -> Result<HashMap<ConnKey, V>, D::Error>
    where
        D: Deserializer<'de>,
        V: Deserialize<'de>,
    {
        let entries: Vec<(NodeId, NodeId, V)> = Vec::deserialize(deserializer)?;
        Ok(entries
            .into_iter()
            .map(|(from, to, v)| ((from, to), v))
            .collect())
    }
}
