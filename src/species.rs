//! Speciation: partitioning a population by structural similarity.
//!
//! Species protect novel topologies from immediate competition. Each genome
//! joins the first existing species whose representative lies within the
//! configured compatibility threshold, or founds a new species otherwise.
//! Under the sparse human-selection policy species never gate parenthood,
//! so stagnation tracking here is bookkeeping: chronically non-improving
//! species are dropped from the list and their members simply re-speciate
//! on the next evolve step.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::EvolutionConfig;
use crate::genome::{compatibility_distance, Genome};

/// A group of structurally similar genomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Species {
    /// Unique species id.
    pub id: u32,
    /// Snapshot of the genome new candidates are compared against.
    pub representative: Genome,
    /// Ids of member genomes in the current generation.
    pub members: Vec<u64>,
    /// Generations since the species' best fitness last improved.
    pub generations_since_improvement: u32,
    /// Best member fitness ever observed for this species.
    pub best_fitness: Option<f64>,
}

impl Species {
    /// Found a new species around a first member.
    #[must_use]
    pub fn new(id: u32, representative: Genome, first_member: u64) -> Self {
        Self {
            id,
            representative,
            members: vec![first_member],
            generations_since_improvement: 0,
            best_fitness: None,
        }
    }
}

/// Assign every genome to a species, founding new species as needed.
///
/// Genomes are visited in ascending id order; representatives carried over
/// from the previous generation are refreshed to the first member assigned
/// this round, and species that attracted no members are dropped.
pub fn speciate(
    genomes: &mut BTreeMap<u64, Genome>,
    species: &mut Vec<Species>,
    next_species_id: &mut u32,
    config: &EvolutionConfig,
) {
    for sp in species.iter_mut() {
        sp.members.clear();
    }

    for (&id, genome) in genomes.iter_mut() {
        let mut assigned = None;
        for sp in species.iter_mut() {
            if compatibility_distance(genome, &sp.representative, config)
                < config.species_threshold
            {
                sp.members.push(id);
                assigned = Some(sp.id);
                break;
            }
        }
        if assigned.is_none() {
            let sp_id = *next_species_id;
            *next_species_id += 1;
            species.push(Species::new(sp_id, genome.clone(), id));
            assigned = Some(sp_id);
        }
        genome.species = assigned;
    }

    species.retain(|sp| !sp.members.is_empty());

    for sp in species.iter_mut() {
        if let Some(&first) = sp.members.first() {
            if let Some(genome) = genomes.get(&first) {
                sp.representative = genome.clone();
            }
        }
    }
}

/// Update per-species stagnation counters from current member fitness and
/// drop species that exceeded the stagnation limit.
pub fn update_stagnation(
    genomes: &BTreeMap<u64, Genome>,
    species: &mut Vec<Species>,
    stagnation_limit: u32,
) {
    for sp in species.iter_mut() {
        let best = sp
            .members
            .iter()
            .filter_map(|id| genomes.get(id).and_then(|g| g.fitness))
            .fold(None, |acc: Option<f64>, f| {
                Some(acc.map_or(f, |a| a.max(f)))
            });

        match (best, sp.best_fitness) {
            (Some(b), Some(prev)) if b > prev => {
                sp.best_fitness = Some(b);
                sp.generations_since_improvement = 0;
            }
            (Some(b), None) => {
                sp.best_fitness = Some(b);
                sp.generations_since_improvement = 0;
            }
            _ => sp.generations_since_improvement += 1,
        }
    }

    species.retain(|sp| sp.generations_since_improvement <= stagnation_limit);
}
