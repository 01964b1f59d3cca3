//! Evolution session: the orchestrator the surrounding layer talks to.
//!
//! A session owns one population across its lifetime, the deterministic RNG
//! every stochastic operator draws from, the precomputed drone layout, and
//! the append-only ancestry history. The session performs no internal
//! locking; callers serialize `evolve` and `assign_fitness*` per session.
//! `generate_pattern` is a pure function of the session's immutable state
//! and may be called concurrently across distinct genomes.

use std::collections::BTreeMap;

use log::info;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::animation::Animation;
use crate::config::SessionConfig;
use crate::error::{EvolutionError, Result};
use crate::evaluator::CppnEvaluator;
use crate::genome::{Genome, GenomeStructure};
use crate::pattern;
use crate::population::Population;
use crate::reproduction::{reproduce, GenerationRecord};

/// Result of one evolve step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolveOutcome {
    /// The new generation number.
    pub generation: u32,
    /// Population size, unchanged from the previous generation.
    pub population_size: usize,
}

/// Fitness assignment progress for the current generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FitnessStatus {
    pub total: usize,
    pub assigned: usize,
    pub unassigned: usize,
}

/// One interactive-breeding session.
pub struct EvolutionSession {
    config: SessionConfig,
    num_drones: usize,
    initial_positions: Vec<[f64; 3]>,
    population: Population,
    history: Vec<GenerationRecord>,
    rng: ChaCha8Rng,
}

impl EvolutionSession {
    /// Create a session with a fresh generation-0 population.
    ///
    /// # Errors
    ///
    /// Returns [`EvolutionError::InvalidConfig`] on a malformed config or a
    /// drone count inconsistent with the layout. Nothing is half-built on
    /// failure.
    pub fn create(config: SessionConfig, num_drones: usize) -> Result<Self> {
        config.validate()?;
        let initial_positions = config.pattern.layout.positions(num_drones)?;

        let mut rng = ChaCha8Rng::seed_from_u64(config.evolution.seed);
        let population = Population::new(&config.evolution, &mut rng);
        let history = vec![GenerationRecord::initial(&population)];

        info!(
            "session created: population {}, {} drones, seed {}",
            population.size(),
            num_drones,
            config.evolution.seed
        );

        Ok(Self {
            config,
            num_drones,
            initial_positions,
            population,
            history,
            rng,
        })
    }

    /// Ids of every genome in the current generation, ascending.
    #[must_use]
    pub fn list_genome_ids(&self) -> Vec<u64> {
        self.population.genomes.keys().copied().collect()
    }

    /// Look up a genome in the current generation.
    ///
    /// # Errors
    ///
    /// Returns [`EvolutionError::GenomeNotFound`] for an unknown id.
    pub fn get_genome(&self, genome_id: u64) -> Result<&Genome> {
        self.population
            .genomes
            .get(&genome_id)
            .ok_or(EvolutionError::GenomeNotFound(genome_id))
    }

    /// Serializable structure view of a genome, for inspection and
    /// visualization.
    ///
    /// # Errors
    ///
    /// Returns [`EvolutionError::GenomeNotFound`] for an unknown id.
    pub fn get_genome_structure(&self, genome_id: u64) -> Result<GenomeStructure> {
        Ok(self.get_genome(genome_id)?.structure())
    }

    /// Compile a genome and time-integrate it into a drone animation.
    ///
    /// # Errors
    ///
    /// Returns [`EvolutionError::GenomeNotFound`] for an unknown id,
    /// [`EvolutionError::InvalidArgument`] for a non-positive duration, and
    /// [`EvolutionError::InvariantViolation`] if the genome compiles to a
    /// cyclic network (ruled out by construction).
    pub fn generate_pattern(&self, genome_id: u64, duration: f64) -> Result<Animation> {
        if !(duration.is_finite() && duration > 0.0) {
            return Err(EvolutionError::InvalidArgument(format!(
                "duration must be positive and finite, got {duration}"
            )));
        }
        let genome = self.get_genome(genome_id)?;
        let mut evaluator = CppnEvaluator::compile(genome)?;
        pattern::generate(
            &mut evaluator,
            &self.initial_positions,
            genome_id,
            duration,
            self.config.pattern.fps,
        )
    }

    /// Assign a fitness value in [0, 1] to one genome.
    ///
    /// # Errors
    ///
    /// Returns [`EvolutionError::InvalidArgument`] outside [0, 1] and
    /// [`EvolutionError::GenomeNotFound`] for an unknown id, in both cases
    /// before any state changes.
    pub fn assign_fitness(&mut self, genome_id: u64, fitness: f64) -> Result<()> {
        validate_fitness(fitness)?;
        let genome = self
            .population
            .genomes
            .get_mut(&genome_id)
            .ok_or(EvolutionError::GenomeNotFound(genome_id))?;
        genome.fitness = Some(fitness);
        Ok(())
    }

    /// Assign fitness values to several genomes at once.
    ///
    /// The whole batch is validated first; any bad id or out-of-range value
    /// rejects the call without mutating anything.
    ///
    /// # Errors
    ///
    /// Returns [`EvolutionError::InvalidArgument`] or
    /// [`EvolutionError::GenomeNotFound`] for the first offending entry.
    pub fn assign_fitness_batch(&mut self, fitness_map: &BTreeMap<u64, f64>) -> Result<()> {
        for (&genome_id, &fitness) in fitness_map {
            validate_fitness(fitness)?;
            if !self.population.genomes.contains_key(&genome_id) {
                return Err(EvolutionError::GenomeNotFound(genome_id));
            }
        }
        for (&genome_id, &fitness) in fitness_map {
            if let Some(genome) = self.population.genomes.get_mut(&genome_id) {
                genome.fitness = Some(fitness);
            }
        }
        Ok(())
    }

    /// How many genomes of the current generation have fitness assigned.
    #[must_use]
    pub fn fitness_status(&self) -> FitnessStatus {
        let total = self.population.size();
        let assigned = self
            .population
            .genomes
            .values()
            .filter(|g| g.fitness.is_some())
            .count();
        FitnessStatus {
            total,
            assigned,
            unassigned: total - assigned,
        }
    }

    /// Advance one generation.
    ///
    /// Genomes without explicit fitness receive `default_fitness` first.
    /// The previous generation's history entry is finalized with the
    /// effective fitness values before the new generation's entry is
    /// appended.
    ///
    /// # Errors
    ///
    /// Returns [`EvolutionError::InvalidArgument`] for a default fitness
    /// outside [0, 1]; reproduction invariant violations leave the current
    /// generation in place.
    pub fn evolve(&mut self, default_fitness: f64) -> Result<EvolveOutcome> {
        validate_fitness(default_fitness)?;

        self.population.fill_default_fitness(default_fitness);
        if let Some(last) = self.history.last_mut() {
            for record in &mut last.genomes {
                if let Some(genome) = self.population.genomes.get(&record.genome_id) {
                    record.fitness = genome.fitness;
                }
            }
        }

        let record = reproduce(
            &mut self.population,
            &self.config.evolution,
            default_fitness,
            &mut self.rng,
        )?;
        self.history.push(record);

        let outcome = EvolveOutcome {
            generation: self.population.generation,
            population_size: self.population.size(),
        };
        info!(
            "evolved to generation {} ({} genomes)",
            outcome.generation, outcome.population_size
        );
        Ok(outcome)
    }

    /// The genome with the highest assigned fitness, ties broken by lowest
    /// id. None when no genome has fitness assigned.
    #[must_use]
    pub fn get_best_genome(&self) -> Option<&Genome> {
        let mut best: Option<&Genome> = None;
        for genome in self.population.genomes.values() {
            let Some(fitness) = genome.fitness else {
                continue;
            };
            // Strictly-greater keeps the lowest id on ties (ascending scan).
            if best.is_none_or(|b| fitness > b.fitness.unwrap_or(f64::NEG_INFINITY)) {
                best = Some(genome);
            }
        }
        best
    }

    /// The full ancestry history, oldest generation first. The current
    /// generation's entry reflects live fitness values at read time.
    #[must_use]
    pub fn get_history(&self) -> Vec<GenerationRecord> {
        let mut history = self.history.clone();
        if let Some(last) = history.last_mut() {
            for record in &mut last.genomes {
                if let Some(genome) = self.population.genomes.get(&record.genome_id) {
                    record.fitness = genome.fitness;
                }
            }
        }
        history
    }

    /// Current generation number, starting at 0.
    #[must_use]
    pub fn generation(&self) -> u32 {
        self.population.generation
    }

    /// Current population size.
    #[must_use]
    pub fn population_size(&self) -> usize {
        self.population.size()
    }

    /// Number of drones in this session's layout.
    #[must_use]
    pub fn num_drones(&self) -> usize {
        self.num_drones
    }
}

fn validate_fitness(fitness: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&fitness) || fitness.is_nan() {
        return Err(EvolutionError::InvalidArgument(format!(
            "fitness {fitness} outside [0, 1]"
        )));
    }
    Ok(())
}
