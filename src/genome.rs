//! CPPN genome representation and genetic operators.
//!
//! A [`Genome`] keys its nodes by semantic id and its connections by
//! `(from, to)` pair, so gene alignment during crossover needs no per-genome
//! translation and duplicate edges are unrepresentable. All stochastic
//! operators take a caller-supplied [`Rng`], keeping evolution reproducible
//! from a seed.
//!
//! Genomes are always acyclic feed-forward graphs: the add-connection
//! operator rejects edges that would close a cycle, and crossover inherits
//! the fitter parent's edge set wholesale, so acyclicity is preserved by
//! construction.

use std::collections::{BTreeMap, HashMap, HashSet};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::activation::Activation;
use crate::config::EvolutionConfig;
use crate::gene::{
    input_node_id, output_node_id, ConnKey, ConnectionGene, NodeGene, NodeId, NodeKind,
};
use crate::innovation::InnovationTracker;

/// The evolvable topology/weight encoding of one individual.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genome {
    /// Unique, monotonically increasing id. Never reused.
    pub id: u64,
    /// Node genes keyed by semantic node id.
    pub nodes: BTreeMap<NodeId, NodeGene>,
    /// Connection genes keyed by `(from, to)`.
    #[serde(with = "conn_map")]
    pub connections: BTreeMap<ConnKey, ConnectionGene>,
    /// Unset until explicitly assigned by the caller (or defaulted during
    /// an evolve step).
    pub fitness: Option<f64>,
    /// Species this genome was last assigned to, if any.
    pub species: Option<u32>,
}

impl Genome {
    /// Create a minimal genome: no hidden nodes, each input wired to each
    /// output with the configured probability.
    #[must_use]
    pub fn minimal<R: Rng>(
        id: u64,
        config: &EvolutionConfig,
        innovations: &mut InnovationTracker,
        rng: &mut R,
    ) -> Self {
        let mut nodes = BTreeMap::new();
        for i in 0..config.num_inputs {
            nodes.insert(input_node_id(i), NodeGene::input());
        }
        for i in 0..config.num_outputs {
            let bias = rng.random::<f64>() * 2.0 * config.bias_range - config.bias_range;
            nodes.insert(
                output_node_id(i),
                NodeGene::output(config.output_activation, bias),
            );
        }

        let mut connections = BTreeMap::new();
        for i in 0..config.num_inputs {
            for o in 0..config.num_outputs {
                if rng.random::<f64>() < config.initial_connection_prob {
                    let from = input_node_id(i);
                    let to = output_node_id(o);
                    let innovation = innovations.connection(from, to);
                    connections.insert(
                        (from, to),
                        ConnectionGene::new(innovation, random_weight(config, rng)),
                    );
                }
            }
        }

        Self {
            id,
            nodes,
            connections,
            fitness: None,
            species: None,
        }
    }

    /// Number of enabled connections.
    #[must_use]
    pub fn num_enabled_connections(&self) -> usize {
        self.connections.values().filter(|c| c.enabled).count()
    }

    /// Ids of hidden nodes.
    #[must_use]
    pub fn hidden_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.kind == NodeKind::Hidden)
            .map(|(&id, _)| id)
            .collect()
    }

    /// Apply all mutation operators, each gated by its configured
    /// probability.
    pub fn mutate<R: Rng>(
        &mut self,
        config: &EvolutionConfig,
        innovations: &mut InnovationTracker,
        rng: &mut R,
    ) {
        self.mutate_weights(config, rng);
        self.mutate_biases(config, rng);
        self.mutate_activations(config, rng);
        self.mutate_toggle_enabled(config, rng);
        self.mutate_add_connection(config, innovations, rng);
        self.mutate_add_node(config, innovations, rng);
    }

    /// Perturb or replace connection weights.
    fn mutate_weights<R: Rng>(&mut self, config: &EvolutionConfig, rng: &mut R) {
        // Clamp to keep weights from growing unboundedly, which would feed
        // Inf/NaN into compatibility distances.
        let weight_limit = config.weight_range * 10.0;

        for conn in self.connections.values_mut() {
            if rng.random::<f64>() < config.weight_mutation_prob {
                if rng.random::<f64>() < config.weight_replace_prob {
                    conn.weight = random_weight(config, rng);
                } else {
                    conn.weight +=
                        (rng.random::<f64>() * 2.0 - 1.0) * config.weight_mutation_power;
                }
                conn.weight = conn.weight.clamp(-weight_limit, weight_limit);
            }
        }
    }

    /// Perturb biases of hidden and output nodes.
    fn mutate_biases<R: Rng>(&mut self, config: &EvolutionConfig, rng: &mut R) {
        let bias_limit = config.bias_range * 10.0;

        for node in self.nodes.values_mut() {
            if node.kind == NodeKind::Input {
                continue;
            }
            if rng.random::<f64>() < config.bias_mutation_prob {
                node.bias += (rng.random::<f64>() * 2.0 - 1.0) * config.bias_mutation_power;
                node.bias = node.bias.clamp(-bias_limit, bias_limit);
            }
        }
    }

    /// Re-draw activation functions of hidden nodes.
    fn mutate_activations<R: Rng>(&mut self, config: &EvolutionConfig, rng: &mut R) {
        if config.hidden_activations.is_empty() {
            return;
        }

        for node in self.nodes.values_mut() {
            if node.kind == NodeKind::Hidden
                && rng.random::<f64>() < config.activation_mutation_prob
            {
                node.activation =
                    config.hidden_activations[rng.random_range(0..config.hidden_activations.len())];
            }
        }
    }

    /// Toggle enabled state of random connections.
    fn mutate_toggle_enabled<R: Rng>(&mut self, config: &EvolutionConfig, rng: &mut R) {
        for conn in self.connections.values_mut() {
            if rng.random::<f64>() < config.toggle_enable_prob {
                conn.enabled = !conn.enabled;
            }
        }
    }

    /// Try to add a connection between two currently unconnected nodes.
    fn mutate_add_connection<R: Rng>(
        &mut self,
        config: &EvolutionConfig,
        innovations: &mut InnovationTracker,
        rng: &mut R,
    ) {
        if rng.random::<f64>() >= config.add_connection_prob {
            return;
        }

        let sources: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.kind != NodeKind::Output)
            .map(|(&id, _)| id)
            .collect();
        let targets: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.kind != NodeKind::Input)
            .map(|(&id, _)| id)
            .collect();
        if sources.is_empty() || targets.is_empty() {
            return;
        }

        // A few random probes; dense genomes may simply have no free edge.
        for _ in 0..10 {
            let from = sources[rng.random_range(0..sources.len())];
            let to = targets[rng.random_range(0..targets.len())];

            if self.connections.contains_key(&(from, to)) {
                continue;
            }
            if self.would_create_cycle(from, to) {
                continue;
            }

            let innovation = innovations.connection(from, to);
            self.connections.insert(
                (from, to),
                ConnectionGene::new(innovation, random_weight(config, rng)),
            );
            return;
        }
    }

    /// Try to add a node by splitting a random enabled connection.
    ///
    /// The original connection is disabled; two fresh connections carry the
    /// signal through the new node: `from -> node` (weight 1.0, preserving
    /// the signal) and `node -> to` (original weight).
    fn mutate_add_node<R: Rng>(
        &mut self,
        config: &EvolutionConfig,
        innovations: &mut InnovationTracker,
        rng: &mut R,
    ) {
        if config.hidden_activations.is_empty() {
            return;
        }
        if rng.random::<f64>() >= config.add_node_prob {
            return;
        }

        let enabled: Vec<ConnKey> = self
            .connections
            .iter()
            .filter(|(_, c)| c.enabled)
            .map(|(&key, _)| key)
            .collect();
        if enabled.is_empty() {
            return;
        }

        let (from, to) = enabled[rng.random_range(0..enabled.len())];
        let node_id = innovations.split_node(from, to);
        if self.nodes.contains_key(&node_id) {
            // This edge was already split in this genome (possible after a
            // re-enable); splitting again would duplicate the node.
            return;
        }

        let original_weight = {
            let Some(conn) = self.connections.get_mut(&(from, to)) else {
                return;
            };
            conn.enabled = false;
            conn.weight
        };

        let activation =
            config.hidden_activations[rng.random_range(0..config.hidden_activations.len())];
        self.nodes.insert(node_id, NodeGene::hidden(activation, 0.0));

        let inn_a = innovations.connection(from, node_id);
        self.connections
            .insert((from, node_id), ConnectionGene::new(inn_a, 1.0));
        let inn_b = innovations.connection(node_id, to);
        self.connections
            .insert((node_id, to), ConnectionGene::new(inn_b, original_weight));
    }

    /// Whether adding `from -> to` would close a cycle: BFS over enabled
    /// connections from `to`, looking for `from`.
    fn would_create_cycle(&self, from: NodeId, to: NodeId) -> bool {
        if from == to {
            return true;
        }

        let mut visited = HashSet::with_capacity(self.nodes.len());
        let mut queue = vec![to];

        while let Some(current) = queue.pop() {
            if current == from {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            for (&(src, dst), conn) in &self.connections {
                if conn.enabled && src == current {
                    queue.push(dst);
                }
            }
        }

        false
    }

    /// Whether the enabled connections contain a cycle. Consistency check
    /// only: the operators above never produce one.
    #[must_use]
    pub fn has_cycle(&self) -> bool {
        crate::evaluator::CppnEvaluator::compile(self).is_err()
    }

    /// Serializable inspection view of this genome's structure.
    #[must_use]
    pub fn structure(&self) -> GenomeStructure {
        GenomeStructure {
            id: self.id,
            nodes: self
                .nodes
                .iter()
                .map(|(&id, n)| NodeView {
                    id,
                    kind: n.kind,
                    activation: n.activation,
                    bias: n.bias,
                })
                .collect(),
            connections: self
                .connections
                .iter()
                .map(|(&(from, to), c)| ConnectionView {
                    from,
                    to,
                    weight: c.weight,
                    enabled: c.enabled,
                    innovation: c.innovation,
                })
                .collect(),
        }
    }
}

/// Recombine two parents into a child genome.
///
/// Genes present in both parents (matched by innovation number, which the
/// shared tracker makes equivalent to matching `(from, to)` keys) are
/// inherited from a randomly chosen parent per gene. Genes unique to one
/// parent are inherited from the fitter parent only; a fitness tie is broken
/// by coin flip. A gene inherited disabled is re-enabled with the configured
/// probability.
///
/// The child's edge set equals the fitter parent's, so the child is acyclic
/// whenever its parents are.
#[must_use]
pub fn crossover<R: Rng>(
    parent1: &Genome,
    parent2: &Genome,
    child_id: u64,
    config: &EvolutionConfig,
    rng: &mut R,
) -> Genome {
    let f1 = parent1.fitness.unwrap_or(0.0);
    let f2 = parent2.fitness.unwrap_or(0.0);
    let (fitter, other) = if f1 > f2 {
        (parent1, parent2)
    } else if f2 > f1 {
        (parent2, parent1)
    } else if rng.random::<bool>() {
        (parent1, parent2)
    } else {
        (parent2, parent1)
    };

    let mut connections = BTreeMap::new();
    for (key, gene) in &fitter.connections {
        let mut inherited = match other.connections.get(key) {
            Some(other_gene) => {
                if rng.random::<bool>() {
                    gene.clone()
                } else {
                    other_gene.clone()
                }
            }
            None => gene.clone(),
        };
        if !inherited.enabled && rng.random::<f64>() < config.reenable_prob {
            inherited.enabled = true;
        }
        connections.insert(*key, inherited);
    }

    // Node genes: the fitter parent's node set; matching nodes take
    // bias/activation from a randomly chosen parent.
    let mut nodes = BTreeMap::new();
    for (&id, node) in &fitter.nodes {
        let gene = match other.nodes.get(&id) {
            Some(other_node) if rng.random::<bool>() => other_node.clone(),
            _ => node.clone(),
        };
        nodes.insert(id, gene);
    }

    Genome {
        id: child_id,
        nodes,
        connections,
        fitness: None,
        species: None,
    }
}

/// Compatibility distance between two genomes for speciation thresholding.
///
/// Weighted combination of excess and disjoint gene counts, normalized by
/// the larger genome's connection count (at least 1), plus the average
/// weight difference over matching genes.
#[must_use]
pub fn compatibility_distance(a: &Genome, b: &Genome, config: &EvolutionConfig) -> f64 {
    let max_a = a.connections.values().map(|c| c.innovation).max();
    let max_b = b.connections.values().map(|c| c.innovation).max();

    let b_by_innovation: HashMap<u64, &ConnectionGene> = b
        .connections
        .values()
        .map(|c| (c.innovation, c))
        .collect();

    let mut matching = 0usize;
    let mut weight_diff_sum = 0.0;
    let mut disjoint = 0usize;
    let mut excess = 0usize;

    for gene in a.connections.values() {
        match b_by_innovation.get(&gene.innovation) {
            Some(other) => {
                matching += 1;
                weight_diff_sum += (gene.weight - other.weight).abs();
            }
            None if max_b.is_none_or(|m| gene.innovation > m) => excess += 1,
            None => disjoint += 1,
        }
    }

    let a_innovations: HashSet<u64> = a.connections.values().map(|c| c.innovation).collect();
    for gene in b.connections.values() {
        if !a_innovations.contains(&gene.innovation) {
            if max_a.is_none_or(|m| gene.innovation > m) {
                excess += 1;
            } else {
                disjoint += 1;
            }
        }
    }

    let n = a.connections.len().max(b.connections.len()).max(1) as f64;
    let avg_weight_diff = if matching > 0 {
        weight_diff_sum / matching as f64
    } else {
        0.0
    };

    config.compatibility_excess_coeff * excess as f64 / n
        + config.compatibility_disjoint_coeff * disjoint as f64 / n
        + config.compatibility_weight_coeff * avg_weight_diff
}

fn random_weight<R: Rng>(config: &EvolutionConfig, rng: &mut R) -> f64 {
    rng.random::<f64>() * 2.0 * config.weight_range - config.weight_range
}

/// Inspection view of one node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeView {
    pub id: NodeId,
    pub kind: NodeKind,
    pub activation: Activation,
    pub bias: f64,
}

/// Inspection view of one connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionView {
    pub from: NodeId,
    pub to: NodeId,
    pub weight: f64,
    pub enabled: bool,
    pub innovation: u64,
}

/// Serializable structure view for visualization layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenomeStructure {
    pub id: u64,
    pub nodes: Vec<NodeView>,
    pub connections: Vec<ConnectionView>,
}

/// JSON object keys must be strings, so the connection map round-trips as a
/// `[from, to, gene]` entry list.
mod conn_map {
    use std::collections::BTreeMap;

    use serde::de::{Deserialize, Deserializer};
    use serde::ser::{Serialize, Serializer};

    use crate::gene::{ConnKey, ConnectionGene, NodeId};

    pub fn serialize<S>(
        map: &BTreeMap<ConnKey, ConnectionGene>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(map.iter().map(|(&(from, to), gene)| (from, to, gene)))
    }

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<BTreeMap<ConnKey, ConnectionGene>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries: Vec<(NodeId, NodeId, ConnectionGene)> = Vec::deserialize(deserializer)?;
        Ok(entries
            .into_iter()
            .map(|(from, to, gene)| ((from, to), gene))
            .collect())
    }
}
