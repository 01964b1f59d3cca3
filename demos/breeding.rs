//! Automated breeding example.
//!
//! Stands in for the human breeder with a constraint-based scorer: each
//! generation, every genome's animation is checked against the flight box,
//! speed limits and separation rules, and the cleanest animations get
//! approved. Over a few generations the swarm patterns drift toward
//! flyable choreography.
//!
//! Run with: `cargo run --example breeding`

use swarm_cppn::{
    check, ConstraintParams, EvolutionConfig, EvolutionSession, PatternConfig, SessionConfig,
};

fn main() {
    env_logger::init();

    println!("Interactive-breeding demo (automatic scorer)");
    println!("============================================\n");

    let config = SessionConfig {
        evolution: EvolutionConfig {
            population_size: 16,
            seed: 7,
            ..EvolutionConfig::default()
        },
        pattern: PatternConfig::default(),
    };
    let num_drones = 5;
    let duration = 3.0;
    let generations = 10;

    let mut session =
        EvolutionSession::create(config, num_drones).expect("valid default configuration");
    let params = ConstraintParams::default();

    println!("Population: {}", session.population_size());
    println!("Drones: {num_drones}, duration: {duration}s\n");

    for generation in 0..generations {
        let ids = session.list_genome_ids();

        // Score each genome by how cleanly its animation flies: full marks
        // for passing everything, partial credit per passing category.
        let mut scored: Vec<(u64, f64, bool)> = Vec::with_capacity(ids.len());
        for id in ids {
            let animation = session
                .generate_pattern(id, duration)
                .expect("current-generation ids are valid");
            let result = check(&animation, &params);

            let mut score = 0.0;
            if result.bounds_violations == 0 {
                score += 0.25;
            }
            if result.horizontal_speed_violations == 0 {
                score += 0.25;
            }
            if result.vertical_speed_violations == 0 {
                score += 0.25;
            }
            if result.distance_violations == 0 {
                score += 0.25;
            }
            scored.push((id, score, result.passes_all()));
        }

        // Approve the top quarter, breeder-style.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        let approvals = scored.len() / 4;
        for &(id, score, _) in scored.iter().take(approvals) {
            if score > 0.0 {
                session
                    .assign_fitness(id, score)
                    .expect("score stays in [0, 1]");
            }
        }

        let passing = scored.iter().filter(|(_, _, passes)| *passes).count();
        println!(
            "Gen {generation:2}: {passing:2}/{} pass all constraints, best score {:.2}",
            scored.len(),
            scored.first().map_or(0.0, |s| s.1)
        );

        session.evolve(0.0).expect("default fitness is valid");
    }

    println!("\nFinal generation: {}", session.generation());
    let history = session.get_history();
    let total_genomes: usize = history.iter().map(|h| h.genomes.len()).sum();
    println!("History: {} generations, {total_genomes} genomes bred", history.len());
}
