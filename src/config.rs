//! Engine configuration.
//!
//! The surrounding layer deserializes these structs from whatever source it
//! owns (file, request body) and hands them to [`EvolutionSession::create`].
//! Validation is explicit and fatal: a malformed config aborts session
//! creation before any population is built.
//!
//! [`EvolutionSession::create`]: crate::session::EvolutionSession::create

use serde::{Deserialize, Serialize};

use crate::activation::Activation;
use crate::error::{EvolutionError, Result};
use crate::evaluator::{CPPN_INPUTS, CPPN_OUTPUTS};
use crate::pattern::PatternConfig;

/// Configuration for genome creation, mutation and reproduction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Number of input nodes. The CPPN query contract fixes this at 4
    /// (x, y, z, d).
    pub num_inputs: usize,
    /// Number of output nodes. Fixed at 6 (vx, vy, vz, r, g, b).
    pub num_outputs: usize,
    /// Number of genomes per generation. Constant across evolve steps.
    pub population_size: usize,
    /// Seed for the session's deterministic RNG.
    pub seed: u64,
    /// Probability that a given input-output pair is wired in a fresh
    /// minimal genome.
    pub initial_connection_prob: f64,
    /// Range for initial and replaced weights: [-weight_range, weight_range].
    pub weight_range: f64,
    /// Range for initial output biases: [-bias_range, bias_range].
    pub bias_range: f64,
    /// Probability of mutating a connection weight.
    pub weight_mutation_prob: f64,
    /// Probability that a weight mutation replaces instead of perturbs.
    pub weight_replace_prob: f64,
    /// Magnitude of weight perturbations.
    pub weight_mutation_power: f64,
    /// Probability of perturbing a node bias.
    pub bias_mutation_prob: f64,
    /// Magnitude of bias perturbations.
    pub bias_mutation_power: f64,
    /// Probability of adding a new connection during mutation.
    pub add_connection_prob: f64,
    /// Probability of adding a new node during mutation.
    pub add_node_prob: f64,
    /// Probability of toggling a connection's enabled state.
    pub toggle_enable_prob: f64,
    /// Probability of re-drawing a hidden node's activation function.
    pub activation_mutation_prob: f64,
    /// Probability that a gene inherited disabled is re-enabled in the child.
    pub reenable_prob: f64,
    /// Activation for output nodes.
    pub output_activation: Activation,
    /// Activation functions to choose from for hidden nodes.
    pub hidden_activations: Vec<Activation>,
    /// Coefficient for excess genes in compatibility distance.
    pub compatibility_excess_coeff: f64,
    /// Coefficient for disjoint genes in compatibility distance.
    pub compatibility_disjoint_coeff: f64,
    /// Coefficient for average weight difference in compatibility distance.
    pub compatibility_weight_coeff: f64,
    /// Compatibility distance below which a genome joins a species.
    pub species_threshold: f64,
    /// Generations without improvement before a species is dropped.
    pub stagnation_limit: u32,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            num_inputs: CPPN_INPUTS,
            num_outputs: CPPN_OUTPUTS,
            population_size: 20,
            seed: 42,
            initial_connection_prob: 1.0,
            weight_range: 1.0,
            bias_range: 1.0,
            weight_mutation_prob: 0.8,
            weight_replace_prob: 0.1,
            weight_mutation_power: 0.5,
            bias_mutation_prob: 0.3,
            bias_mutation_power: 0.3,
            add_connection_prob: 0.15,
            add_node_prob: 0.08,
            toggle_enable_prob: 0.02,
            activation_mutation_prob: 0.1,
            reenable_prob: 0.25,
            output_activation: Activation::Tanh,
            hidden_activations: Activation::CPPN.to_vec(),
            compatibility_excess_coeff: 1.0,
            compatibility_disjoint_coeff: 1.0,
            compatibility_weight_coeff: 0.4,
            species_threshold: 3.0,
            stagnation_limit: 15,
        }
    }
}

impl EvolutionConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EvolutionError::InvalidConfig`] for any field outside its
    /// documented range.
    pub fn validate(&self) -> Result<()> {
        if self.num_inputs != CPPN_INPUTS {
            return Err(EvolutionError::InvalidConfig(format!(
                "num_inputs must be {CPPN_INPUTS} (x, y, z, d), got {}",
                self.num_inputs
            )));
        }
        if self.num_outputs != CPPN_OUTPUTS {
            return Err(EvolutionError::InvalidConfig(format!(
                "num_outputs must be {CPPN_OUTPUTS} (vx, vy, vz, r, g, b), got {}",
                self.num_outputs
            )));
        }
        if self.population_size < 2 {
            return Err(EvolutionError::InvalidConfig(format!(
                "population_size must be at least 2, got {}",
                self.population_size
            )));
        }
        for (name, prob) in [
            ("initial_connection_prob", self.initial_connection_prob),
            ("weight_mutation_prob", self.weight_mutation_prob),
            ("weight_replace_prob", self.weight_replace_prob),
            ("bias_mutation_prob", self.bias_mutation_prob),
            ("add_connection_prob", self.add_connection_prob),
            ("add_node_prob", self.add_node_prob),
            ("toggle_enable_prob", self.toggle_enable_prob),
            ("activation_mutation_prob", self.activation_mutation_prob),
            ("reenable_prob", self.reenable_prob),
        ] {
            if !(0.0..=1.0).contains(&prob) {
                return Err(EvolutionError::InvalidConfig(format!(
                    "{name} must lie in [0, 1], got {prob}"
                )));
            }
        }
        for (name, value) in [
            ("weight_range", self.weight_range),
            ("bias_range", self.bias_range),
            ("weight_mutation_power", self.weight_mutation_power),
            ("bias_mutation_power", self.bias_mutation_power),
            ("species_threshold", self.species_threshold),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(EvolutionError::InvalidConfig(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }
        if self.hidden_activations.is_empty() {
            return Err(EvolutionError::InvalidConfig(
                "hidden_activations must name at least one function".into(),
            ));
        }
        Ok(())
    }
}

/// Everything a session needs: the genetic parameters plus the pattern
/// layout/timing parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Genetic operator and speciation parameters.
    pub evolution: EvolutionConfig,
    /// Drone layout and frame-rate parameters.
    pub pattern: PatternConfig,
}

impl SessionConfig {
    /// Validate both halves of the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EvolutionError::InvalidConfig`] when either half is
    /// malformed.
    pub fn validate(&self) -> Result<()> {
        self.evolution.validate()?;
        self.pattern.validate()
    }
}
