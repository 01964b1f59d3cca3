//! Population: the mutable active set of one generation's genomes.
//!
//! A population exclusively owns its current genomes; an evolve step
//! replaces them wholesale. Genome ids are allocated from a monotone
//! counter and never reused, so ancestry records stay unambiguous across
//! the session's lifetime.

use std::collections::BTreeMap;
use std::ops::Range;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::EvolutionConfig;
use crate::genome::Genome;
use crate::innovation::InnovationTracker;
use crate::species::{self, Species};

/// One generation of genomes plus the population-scoped counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Population {
    /// Generation counter, starting at 0.
    pub generation: u32,
    /// The active genomes, keyed by id. Fixed size across generations.
    pub genomes: BTreeMap<u64, Genome>,
    /// Current species partition.
    pub species: Vec<Species>,
    /// Innovation-number and hidden-node-id allocator.
    pub innovations: InnovationTracker,
    next_genome_id: u64,
    next_species_id: u32,
}

impl Population {
    /// Build generation 0: `population_size` minimal genomes.
    ///
    /// The config must already be validated.
    #[must_use]
    pub fn new<R: Rng>(config: &EvolutionConfig, rng: &mut R) -> Self {
        let mut innovations = InnovationTracker::new(config.num_outputs);
        let mut genomes = BTreeMap::new();
        for id in 0..config.population_size as u64 {
            genomes.insert(id, Genome::minimal(id, config, &mut innovations, rng));
        }

        Self {
            generation: 0,
            genomes,
            species: Vec::new(),
            innovations,
            next_genome_id: config.population_size as u64,
            next_species_id: 0,
        }
    }

    /// Number of genomes in the current generation.
    #[must_use]
    pub fn size(&self) -> usize {
        self.genomes.len()
    }

    /// Reserve a block of fresh genome ids.
    pub fn allocate_genome_ids(&mut self, count: usize) -> Range<u64> {
        let start = self.next_genome_id;
        self.next_genome_id += count as u64;
        start..self.next_genome_id
    }

    /// Give every genome without an explicit fitness the supplied default.
    pub fn fill_default_fitness(&mut self, default_fitness: f64) {
        for genome in self.genomes.values_mut() {
            if genome.fitness.is_none() {
                genome.fitness = Some(default_fitness);
            }
        }
    }

    /// Partition the current genomes into species.
    pub fn speciate(&mut self, config: &EvolutionConfig) {
        species::speciate(
            &mut self.genomes,
            &mut self.species,
            &mut self.next_species_id,
            config,
        );
    }

    /// Update stagnation counters and drop exhausted species.
    pub fn update_stagnation(&mut self, stagnation_limit: u32) {
        species::update_stagnation(&self.genomes, &mut self.species, stagnation_limit);
    }
}
