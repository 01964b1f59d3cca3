//! # Swarm CPPN
//!
//! An interactive-breeding NEAT engine whose evolved CPPNs drive 3D
//! drone-swarm choreography.
//!
//! ## Features
//!
//! - **Semantic Gene Keys**: genomes key nodes by population-wide ids and
//!   connections by `(from, to)` pairs, so crossover aligns genes without
//!   per-genome translation and duplicate edges are unrepresentable
//! - **Lifetime Innovation Cache**: a monotone counter plus an edge cache
//!   gives structurally identical mutations the same innovation number,
//!   whenever and wherever they arise
//! - **CPPN Queries**: compiled genomes map a 3D position (plus radial
//!   distance) to a velocity vector and color, the fields a pattern
//!   generator integrates into drone animations
//! - **Sparse Human Selection**: breeder-approved genomes (fitness > 0)
//!   survive unmutated and parent the next generation; with no approvals
//!   the whole population breeds on, so evolution never stalls
//!
//! ## Quick Start
//!
//! ```rust
//! use swarm_cppn::{EvolutionSession, SessionConfig};
//!
//! // Five drones on the default circle layout.
//! let mut session = EvolutionSession::create(SessionConfig::default(), 5).unwrap();
//!
//! // Render a genome to a drone animation.
//! let ids = session.list_genome_ids();
//! let animation = session.generate_pattern(ids[0], 3.0).unwrap();
//! assert_eq!(animation.num_frames(), 91);
//!
//! // Approve it and breed the next generation.
//! session.assign_fitness(ids[0], 1.0).unwrap();
//! let outcome = session.evolve(0.0).unwrap();
//! assert_eq!(outcome.generation, 1);
//! ```
//!
//! ## Validating Animations
//!
//! ```rust
//! use swarm_cppn::{check_all, ConstraintParams, EvolutionSession, SessionConfig};
//!
//! let session = EvolutionSession::create(SessionConfig::default(), 5).unwrap();
//! let animations: Vec<_> = session
//!     .list_genome_ids()
//!     .into_iter()
//!     .map(|id| session.generate_pattern(id, 1.0).unwrap())
//!     .collect();
//!
//! let report = check_all(&animations, &ConstraintParams::default());
//! assert_eq!(report.summary.total, animations.len());
//! ```
//!
//! ## Architecture
//!
//! The session composes five layers, leaf first: genome representation and
//! genetic operators, the compiled network evaluator, the time-integrated
//! pattern generator, the geometric constraint checker, and the
//! reproduction engine that turns partial human fitness into the next
//! generation. The core is synchronous; callers serialize mutation per
//! session, while pattern generation and constraint checking are pure and
//! freely parallelizable.

pub mod activation;
pub mod animation;
pub mod config;
pub mod constraints;
pub mod error;
pub mod evaluator;
pub mod gene;
pub mod genome;
pub mod innovation;
pub mod pattern;
pub mod population;
pub mod reproduction;
pub mod session;
pub mod species;

// Re-exports for convenience
pub use activation::Activation;
pub use animation::{Animation, DroneState, Frame};
pub use config::{EvolutionConfig, SessionConfig};
pub use constraints::{
    check, check_all, ConstraintParams, ConstraintReport, ConstraintResult, ConstraintSummary,
};
pub use error::{EvolutionError, Result};
pub use evaluator::{CppnEvaluator, CppnSample, CPPN_INPUTS, CPPN_OUTPUTS, VELOCITY_SCALE};
pub use gene::{ConnKey, ConnectionGene, NodeGene, NodeId, NodeKind};
pub use genome::{
    compatibility_distance, crossover, ConnectionView, Genome, GenomeStructure, NodeView,
};
pub use innovation::InnovationTracker;
pub use pattern::{generate, Layout, PatternConfig};
pub use population::Population;
pub use reproduction::{reproduce, GenerationRecord, GenomeRecord};
pub use session::{EvolutionSession, EvolveOutcome, FitnessStatus};
pub use species::Species;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breed_and_render_cycle() {
        let mut session = EvolutionSession::create(SessionConfig::default(), 5).unwrap();

        for _ in 0..3 {
            let ids = session.list_genome_ids();
            session.assign_fitness(ids[0], 1.0).unwrap();
            session.assign_fitness(ids[1], 0.5).unwrap();
            session.evolve(0.0).unwrap();
        }

        assert_eq!(session.generation(), 3);
        assert_eq!(session.population_size(), 20);

        let id = session.list_genome_ids()[0];
        let animation = session.generate_pattern(id, 1.0).unwrap();
        assert_eq!(animation.num_drones(), 5);
    }

    #[test]
    fn test_session_serde_surface() {
        // Everything the surrounding API layer ships is JSON-serializable.
        let session = EvolutionSession::create(SessionConfig::default(), 5).unwrap();
        let id = session.list_genome_ids()[0];

        let structure = session.get_genome_structure(id).unwrap();
        serde_json::to_string(&structure).unwrap();

        let animation = session.generate_pattern(id, 0.5).unwrap();
        serde_json::to_string(&animation).unwrap();

        let history = session.get_history();
        serde_json::to_string(&history).unwrap();
    }
}
