//! Compiled feed-forward evaluator for CPPN genomes.
//!
//! [`CppnEvaluator::compile`] topologically sorts a genome's enabled
//! connections and lays the network out in flat arrays (CSR format for
//! incoming edges) for cache-friendly, allocation-free evaluation. Edges are
//! visited in connection-key order so floating-point summation is
//! bit-deterministic across equivalent genomes.
//!
//! Genomes are acyclic by construction, so a cycle at compile time is an
//! internal invariant violation, reported and never silently ignored.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::activation::Activation;
use crate::error::{EvolutionError, Result};
use crate::gene::{input_node_id, output_node_id, NodeId, NodeKind};
use crate::genome::Genome;

/// Number of CPPN inputs: x, y, z, d where d = sqrt(x² + y² + z²).
pub const CPPN_INPUTS: usize = 4;
/// Number of CPPN outputs: vx, vy, vz, r, g, b.
pub const CPPN_OUTPUTS: usize = 6;
/// Scale applied to raw velocity outputs, in m/s.
pub const VELOCITY_SCALE: f64 = 2.0;

/// One spatial query result: a velocity vector and a color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CppnSample {
    /// Velocity in m/s: [vx, vy, vz].
    pub velocity: [f64; 3],
    /// Color channels: [r, g, b].
    pub color: [u8; 3],
}

/// A compiled, evaluation-ready representation of a genome.
#[derive(Debug, Clone)]
pub struct CppnEvaluator {
    /// Node values, indexed by dense node index.
    values: Vec<f64>,
    /// Node biases, parallel to `values`.
    biases: Vec<f64>,
    /// Activation functions, parallel to `values`.
    activations: Vec<Activation>,
    // CSR format for incoming connections: for node i, incoming edges are
    // at [csr_offsets[i]..csr_offsets[i+1]).
    csr_offsets: Vec<usize>,
    csr_sources: Vec<usize>,
    csr_weights: Vec<f64>,
    /// Dense indices of input nodes, in semantic input order.
    input_indices: Vec<usize>,
    /// Dense indices of output nodes, in semantic output order.
    output_indices: Vec<usize>,
    /// Non-input nodes in topological order.
    eval_order: Vec<usize>,
}

impl CppnEvaluator {
    /// Compile a genome into an evaluator.
    ///
    /// # Errors
    ///
    /// Returns [`EvolutionError::InvariantViolation`] if the enabled
    /// connections contain a cycle or the genome's fixed input/output nodes
    /// are missing.
    pub fn compile(genome: &Genome) -> Result<Self> {
        // Dense indexing: BTreeMap iteration yields node ids sorted, so the
        // index assignment is deterministic.
        let node_ids: Vec<NodeId> = genome.nodes.keys().copied().collect();
        let node_count = node_ids.len();
        let index_of = |id: NodeId| node_ids.binary_search(&id).ok();

        // Enabled edges in key order for deterministic summation.
        let mut edges: Vec<(usize, usize, f64)> = Vec::new();
        for (&(from, to), conn) in &genome.connections {
            if !conn.enabled {
                continue;
            }
            let (Some(from_idx), Some(to_idx)) = (index_of(from), index_of(to)) else {
                return Err(EvolutionError::InvariantViolation(format!(
                    "connection ({from}, {to}) references a missing node in genome {}",
                    genome.id
                )));
            };
            edges.push((from_idx, to_idx, conn.weight));
        }

        // Kahn's algorithm over the enabled edges.
        let mut in_degree = vec![0usize; node_count];
        for &(_, to_idx, _) in &edges {
            in_degree[to_idx] += 1;
        }

        let mut queue: VecDeque<usize> = (0..node_count).filter(|&i| in_degree[i] == 0).collect();
        let mut topo_order = Vec::with_capacity(node_count);
        while let Some(idx) = queue.pop_front() {
            topo_order.push(idx);
            for &(from_idx, to_idx, _) in &edges {
                if from_idx == idx {
                    in_degree[to_idx] -= 1;
                    if in_degree[to_idx] == 0 {
                        queue.push_back(to_idx);
                    }
                }
            }
        }
        if topo_order.len() != node_count {
            return Err(EvolutionError::InvariantViolation(format!(
                "genome {} compiled to a cyclic network",
                genome.id
            )));
        }

        let nodes: Vec<&crate::gene::NodeGene> = node_ids
            .iter()
            .map(|id| &genome.nodes[id])
            .collect();

        let eval_order: Vec<usize> = topo_order
            .iter()
            .copied()
            .filter(|&idx| nodes[idx].kind != NodeKind::Input)
            .collect();

        // Build incoming-edge CSR arrays.
        let mut counts = vec![0usize; node_count];
        for &(_, to_idx, _) in &edges {
            counts[to_idx] += 1;
        }
        let mut csr_offsets = Vec::with_capacity(node_count + 1);
        csr_offsets.push(0usize);
        for &count in &counts {
            csr_offsets.push(csr_offsets.last().copied().unwrap_or(0) + count);
        }
        let total = *csr_offsets.last().unwrap_or(&0);
        let mut csr_sources = vec![0usize; total];
        let mut csr_weights = vec![0.0f64; total];
        let mut write_pos = csr_offsets[..node_count].to_vec();
        for &(from_idx, to_idx, weight) in &edges {
            let pos = write_pos[to_idx];
            csr_sources[pos] = from_idx;
            csr_weights[pos] = weight;
            write_pos[to_idx] += 1;
        }

        // Fixed id ranges give the semantic input/output ordering.
        let num_inputs = nodes.iter().filter(|n| n.kind == NodeKind::Input).count();
        let num_outputs = nodes.iter().filter(|n| n.kind == NodeKind::Output).count();
        let mut input_indices = Vec::with_capacity(num_inputs);
        for k in 0..num_inputs {
            let idx = index_of(input_node_id(k)).ok_or_else(|| {
                EvolutionError::InvariantViolation(format!(
                    "genome {} is missing input node {k}",
                    genome.id
                ))
            })?;
            input_indices.push(idx);
        }
        let mut output_indices = Vec::with_capacity(num_outputs);
        for k in 0..num_outputs {
            let idx = index_of(output_node_id(k)).ok_or_else(|| {
                EvolutionError::InvariantViolation(format!(
                    "genome {} is missing output node {k}",
                    genome.id
                ))
            })?;
            output_indices.push(idx);
        }

        Ok(Self {
            values: vec![0.0; node_count],
            biases: nodes.iter().map(|n| n.bias).collect(),
            activations: nodes.iter().map(|n| n.activation).collect(),
            csr_offsets,
            csr_sources,
            csr_weights,
            input_indices,
            output_indices,
            eval_order,
        })
    }

    /// Evaluate the network, writing outputs to a provided buffer.
    ///
    /// Allocation-free version for the pattern-generation hot path.
    ///
    /// # Panics
    ///
    /// Panics if input or output length doesn't match the network.
    pub fn activate_into(&mut self, inputs: &[f64], outputs: &mut [f64]) {
        assert_eq!(
            inputs.len(),
            self.input_indices.len(),
            "input length mismatch: expected {}, got {}",
            self.input_indices.len(),
            inputs.len()
        );
        assert_eq!(
            outputs.len(),
            self.output_indices.len(),
            "output length mismatch: expected {}, got {}",
            self.output_indices.len(),
            outputs.len()
        );

        for value in &mut self.values {
            *value = 0.0;
        }
        for (i, &idx) in self.input_indices.iter().enumerate() {
            self.values[idx] = inputs[i];
        }

        // Forward pass in topological order: each node's value is
        // activation(bias + sum of enabled incoming weight * source value).
        for &node_idx in &self.eval_order {
            let mut sum = self.biases[node_idx];
            let start = self.csr_offsets[node_idx];
            let end = self.csr_offsets[node_idx + 1];
            for i in start..end {
                sum += self.values[self.csr_sources[i]] * self.csr_weights[i];
            }
            self.values[node_idx] = self.activations[node_idx].apply(sum);
        }

        for (i, &idx) in self.output_indices.iter().enumerate() {
            outputs[i] = self.values[idx];
        }
    }

    /// Evaluate the network with the given inputs.
    ///
    /// # Panics
    ///
    /// Panics if input length doesn't match the network.
    pub fn activate(&mut self, inputs: &[f64]) -> Vec<f64> {
        let mut outputs = vec![0.0; self.output_indices.len()];
        self.activate_into(inputs, &mut outputs);
        outputs
    }

    /// Query the CPPN at a 3D position.
    ///
    /// The input vector is [x, y, z, d] with d = sqrt(x² + y² + z²), which
    /// gives the network radial symmetry as a free feature. Raw velocity
    /// outputs are scaled by [`VELOCITY_SCALE`]; raw color outputs are
    /// mapped from the nominal [-1, 1] range onto 0-255 and clamped, never
    /// an error.
    pub fn query(&mut self, x: f64, y: f64, z: f64) -> CppnSample {
        let d = (x * x + y * y + z * z).sqrt();
        let mut outputs = [0.0f64; CPPN_OUTPUTS];
        self.activate_into(&[x, y, z, d], &mut outputs);

        CppnSample {
            velocity: [
                outputs[0] * VELOCITY_SCALE,
                outputs[1] * VELOCITY_SCALE,
                outputs[2] * VELOCITY_SCALE,
            ],
            color: [
                scale_to_color(outputs[3]),
                scale_to_color(outputs[4]),
                scale_to_color(outputs[5]),
            ],
        }
    }

    /// Number of input nodes.
    #[must_use]
    pub fn num_inputs(&self) -> usize {
        self.input_indices.len()
    }

    /// Number of output nodes.
    #[must_use]
    pub fn num_outputs(&self) -> usize {
        self.output_indices.len()
    }
}

/// Map a raw output, nominally in [-1, 1], onto an 8-bit color channel.
#[inline]
fn scale_to_color(raw: f64) -> u8 {
    let scaled = ((raw + 1.0) / 2.0 * 255.0).round();
    scaled.clamp(0.0, 255.0) as u8
}
