//! Reproduction engine: turns sparse, human-in-the-loop fitness into a
//! deterministic next generation.
//!
//! The selection policy is deliberately not fitness-proportionate. A genome
//! with fitness > 0 was *selected* by the breeder (human approval or an
//! automatic scorer), so every selected genome survives unmutated and only
//! selected genomes parent offspring. When nothing was selected, the whole
//! population becomes the parent pool with uniform sampling, so the pool is
//! never empty and evolution keeps drifting until the breeder intervenes.
//!
//! One step is atomic: the next generation is built completely before it
//! replaces the current one, so a failed step leaves the population
//! untouched.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::EvolutionConfig;
use crate::error::{EvolutionError, Result};
use crate::genome::{crossover, Genome};
use crate::population::Population;

/// Ancestry of one genome in one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenomeRecord {
    /// The genome's id.
    pub genome_id: u64,
    /// First parent, or the copied source for elites. None only for the
    /// initial generation.
    pub parent1: Option<u64>,
    /// Second parent. None for elites and the initial generation.
    pub parent2: Option<u64>,
    /// Fitness the genome ended up with, filled in once known.
    pub fitness: Option<f64>,
}

/// Append-only history entry for one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// Generation number.
    pub generation: u32,
    /// One record per genome, in id order of creation.
    pub genomes: Vec<GenomeRecord>,
}

impl GenerationRecord {
    /// Snapshot the given population as a parentless generation record.
    #[must_use]
    pub fn initial(population: &Population) -> Self {
        Self {
            generation: population.generation,
            genomes: population
                .genomes
                .values()
                .map(|g| GenomeRecord {
                    genome_id: g.id,
                    parent1: None,
                    parent2: None,
                    fitness: g.fitness,
                })
                .collect(),
        }
    }
}

/// Advance the population one generation.
///
/// Steps: default unset fitness, speciate, select under the sparse
/// human-selection policy, reproduce (elites verbatim, remaining slots by
/// crossover + mutation), and return the new generation's ancestry record.
///
/// # Errors
///
/// Returns [`EvolutionError::InvariantViolation`] if the eligible parent
/// pool ends up empty or the new generation misses its configured size.
/// Neither can occur given the fallback policy; on failure the current
/// generation stays in place.
pub fn reproduce<R: Rng>(
    population: &mut Population,
    config: &EvolutionConfig,
    default_fitness: f64,
    rng: &mut R,
) -> Result<GenerationRecord> {
    population.fill_default_fitness(default_fitness);
    population.speciate(config);
    population.update_stagnation(config.stagnation_limit);

    // Selected = breeder-approved. Elitism count equals the selected count;
    // no survival threshold is derived from it.
    let selected: Vec<u64> = population
        .genomes
        .values()
        .filter(|g| g.fitness.unwrap_or(0.0) > 0.0)
        .map(|g| g.id)
        .collect();
    let eligible: Vec<u64> = if selected.is_empty() {
        population.genomes.keys().copied().collect()
    } else {
        selected.clone()
    };
    if eligible.is_empty() {
        return Err(EvolutionError::InvariantViolation(
            "eligible parent pool is empty".into(),
        ));
    }

    let target_size = config.population_size;
    let mut fresh_ids = population.allocate_genome_ids(target_size);

    let genomes = &population.genomes;
    let innovations = &mut population.innovations;

    let mut next_genomes: BTreeMap<u64, Genome> = BTreeMap::new();
    let mut records: Vec<GenomeRecord> = Vec::with_capacity(target_size);

    let take_id = |ids: &mut std::ops::Range<u64>| {
        ids.next().ok_or_else(|| {
            EvolutionError::InvariantViolation("genome id block exhausted".into())
        })
    };

    // Elites survive unmutated under fresh ids, fitness unset.
    for &source_id in selected.iter().take(target_size) {
        let source = genomes.get(&source_id).ok_or_else(|| {
            EvolutionError::InvariantViolation(format!(
                "selected genome {source_id} disappeared during reproduction"
            ))
        })?;
        let new_id = take_id(&mut fresh_ids)?;
        let mut elite = source.clone();
        elite.id = new_id;
        elite.fitness = None;
        elite.species = None;
        next_genomes.insert(new_id, elite);
        records.push(GenomeRecord {
            genome_id: new_id,
            parent1: Some(source_id),
            parent2: None,
            fitness: None,
        });
    }

    // Fill the remaining slots by crossover + mutation over the pool.
    while next_genomes.len() < target_size {
        let parent1_id = eligible[rng.random_range(0..eligible.len())];
        let parent2_id = eligible[rng.random_range(0..eligible.len())];
        let parent1 = &genomes[&parent1_id];
        let parent2 = &genomes[&parent2_id];

        let new_id = take_id(&mut fresh_ids)?;
        let mut child = crossover(parent1, parent2, new_id, config, rng);
        child.mutate(config, innovations, rng);
        next_genomes.insert(new_id, child);
        records.push(GenomeRecord {
            genome_id: new_id,
            parent1: Some(parent1_id),
            parent2: Some(parent2_id),
            fitness: None,
        });
    }

    if next_genomes.len() != target_size {
        return Err(EvolutionError::InvariantViolation(format!(
            "next generation has {} genomes, expected {target_size}",
            next_genomes.len()
        )));
    }

    // Commit wholesale.
    population.genomes = next_genomes;
    population.generation += 1;

    log::debug!(
        "generation {}: {} selected, {} species, population {}",
        population.generation,
        selected.len(),
        population.species.len(),
        target_size
    );

    Ok(GenerationRecord {
        generation: population.generation,
        genomes: records,
    })
}
