//! Integration tests for swarm-cppn.

use std::collections::{BTreeMap, HashSet};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use swarm_cppn::{
    check, check_all, generate, Animation, ConstraintParams, CppnEvaluator, DroneState,
    EvolutionConfig, EvolutionError, EvolutionSession, Frame, Genome, InnovationTracker, Layout,
    PatternConfig, SessionConfig,
};

fn small_session() -> EvolutionSession {
    let config = SessionConfig {
        evolution: EvolutionConfig {
            population_size: 12,
            ..EvolutionConfig::default()
        },
        pattern: PatternConfig::default(),
    };
    EvolutionSession::create(config, 5).unwrap()
}

#[test]
fn test_population_size_constant_across_generations() {
    let mut session = small_session();

    for generation in 1..=6 {
        // Alternate sparse approvals with none at all.
        if generation % 2 == 0 {
            let ids = session.list_genome_ids();
            session.assign_fitness(ids[0], 1.0).unwrap();
        }
        let outcome = session.evolve(0.0).unwrap();
        assert_eq!(outcome.generation, generation);
        assert_eq!(outcome.population_size, 12);
        assert_eq!(session.population_size(), 12);
    }
}

#[test]
fn test_identical_structural_mutations_share_innovation() {
    let config = EvolutionConfig::default();
    let mut innovations = InnovationTracker::new(config.num_outputs);
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    let a = Genome::minimal(0, &config, &mut innovations, &mut rng);
    let b = Genome::minimal(1, &config, &mut innovations, &mut rng);

    // Independently created identical edges carry identical numbers, and
    // the numbers persist across later queries.
    for (key, gene) in &a.connections {
        assert_eq!(gene.innovation, b.connections[key].innovation);
        assert_eq!(gene.innovation, innovations.connection(key.0, key.1));
    }
}

#[test]
fn test_evolved_genomes_stay_valid() {
    let mut session = small_session();
    for _ in 0..5 {
        let ids = session.list_genome_ids();
        session.assign_fitness(ids[2], 0.9).unwrap();
        session.evolve(0.0).unwrap();
    }

    for id in session.list_genome_ids() {
        let genome = session.get_genome(id).unwrap();

        // No duplicate (from, to) keys can exist by construction; every
        // endpoint must have a node gene and the network must compile.
        for &(from, to) in genome.connections.keys() {
            assert!(genome.nodes.contains_key(&from));
            assert!(genome.nodes.contains_key(&to));
        }
        let mut evaluator = CppnEvaluator::compile(genome).unwrap();
        let sample = evaluator.query(0.3, -0.7, 0.1);
        for v in sample.velocity {
            assert!(v.is_finite());
        }
    }
}

#[test]
fn test_query_is_deterministic() {
    let session = small_session();
    let genome = session.get_genome(0).unwrap();

    let mut eval_a = CppnEvaluator::compile(genome).unwrap();
    let mut eval_b = CppnEvaluator::compile(genome).unwrap();

    for point in [[0.0, 0.0, 0.0], [1.5, 0.0, 0.0], [-0.4, 2.2, -1.0]] {
        let a = eval_a.query(point[0], point[1], point[2]);
        let b = eval_b.query(point[0], point[1], point[2]);
        assert_eq!(a, b);
        let again = eval_a.query(point[0], point[1], point[2]);
        assert_eq!(a, again);
    }
}

#[test]
fn test_pattern_generation_is_pure() {
    let session = small_session();
    let id = session.list_genome_ids()[3];

    let a = session.generate_pattern(id, 2.5).unwrap();
    let b = session.generate_pattern(id, 2.5).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_circle_example_frame_math() {
    // 5 drones on a circle of radius 1.5 at 30 fps for 3 seconds.
    let session = small_session();
    let id = session.list_genome_ids()[0];
    let animation = session.generate_pattern(id, 3.0).unwrap();

    assert_eq!(animation.num_frames(), 91);
    assert_eq!(animation.num_drones(), 5);

    // Drone 0 starts at (1.5, 0, 0).
    let first = &animation.frames[0].drones[0];
    assert!((first.x - 1.5).abs() < 1e-12);
    assert!(first.y.abs() < 1e-12);
    assert!(first.z.abs() < 1e-12);

    // frame[1] = frame[0] + velocity_at(frame[0]) * (1/30).
    let genome = session.get_genome(id).unwrap();
    let mut evaluator = CppnEvaluator::compile(genome).unwrap();
    let dt = 1.0 / 30.0;
    for drone_idx in 0..5 {
        let p0 = &animation.frames[0].drones[drone_idx];
        let p1 = &animation.frames[1].drones[drone_idx];
        let sample = evaluator.query(p0.x, p0.y, p0.z);
        assert!((p1.x - (p0.x + sample.velocity[0] * dt)).abs() < 1e-12);
        assert!((p1.y - (p0.y + sample.velocity[1] * dt)).abs() < 1e-12);
        assert!((p1.z - (p0.z + sample.velocity[2] * dt)).abs() < 1e-12);
    }
}

#[test]
fn test_static_animation_passes_constraints() {
    // Zero-velocity drones inside the box, pairwise >= 0.5 m apart.
    let drones: Vec<DroneState> = (0..4)
        .map(|i| DroneState {
            x: i as f64,
            y: 0.0,
            z: 1.0,
            r: 0,
            g: 255,
            b: 0,
        })
        .collect();
    let animation = Animation {
        id: 0,
        frames: (0..60)
            .map(|i| Frame {
                t: i as f64 / 30.0,
                drones: drones.clone(),
            })
            .collect(),
    };

    let result = check(&animation, &ConstraintParams::default());
    assert!(result.passes_all());
    assert_eq!(result.bounds_violations, 0);
    assert_eq!(result.horizontal_speed_violations, 0);
    assert_eq!(result.vertical_speed_violations, 0);
    assert_eq!(result.distance_violations, 0);
}

#[test]
fn test_constraint_batch_over_generation() {
    let session = small_session();
    let animations: Vec<Animation> = session
        .list_genome_ids()
        .into_iter()
        .map(|id| session.generate_pattern(id, 1.0).unwrap())
        .collect();

    let report = check_all(&animations, &ConstraintParams::default());
    assert_eq!(report.summary.total, 12);
    assert_eq!(report.results.len(), 12);
    for (result, animation) in report.results.iter().zip(&animations) {
        assert_eq!(result.genome_id, animation.id);
    }
}

#[test]
fn test_out_of_range_fitness_rejected() {
    let mut session = small_session();
    let id = session.list_genome_ids()[0];

    assert!(matches!(
        session.assign_fitness(id, 1.5),
        Err(EvolutionError::InvalidArgument(_))
    ));
    assert!(session.get_genome(id).unwrap().fitness.is_none());
}

#[test]
fn test_evolve_with_no_positive_fitness_never_fails() {
    let mut session = small_session();

    // Every genome at zero, default zero: the fallback whole-population
    // pool must still produce a full generation.
    let ids = session.list_genome_ids();
    let batch: BTreeMap<u64, f64> = ids.iter().map(|&id| (id, 0.0)).collect();
    session.assign_fitness_batch(&batch).unwrap();

    let outcome = session.evolve(0.0).unwrap();
    assert_eq!(outcome.generation, 1);
    assert_eq!(outcome.population_size, 12);
}

#[test]
fn test_best_genome_max_fitness_lowest_id_tie() {
    let mut session = small_session();
    let ids = session.list_genome_ids();

    session.assign_fitness(ids[4], 0.6).unwrap();
    session.assign_fitness(ids[2], 0.6).unwrap();
    session.assign_fitness(ids[9], 0.3).unwrap();

    let best = session.get_best_genome().unwrap();
    assert_eq!(best.id, ids[2]);
    assert_eq!(best.fitness, Some(0.6));
}

#[test]
fn test_history_spans_all_generations() {
    let mut session = small_session();

    for _ in 0..3 {
        let ids = session.list_genome_ids();
        session.assign_fitness(ids[0], 1.0).unwrap();
        session.evolve(0.0).unwrap();
    }

    let history = session.get_history();
    assert_eq!(history.len(), 4);
    for (expected, record) in history.iter().enumerate() {
        assert_eq!(record.generation, expected as u32);
        assert_eq!(record.genomes.len(), 12);
    }

    // Ids never repeat across generations.
    let mut seen = HashSet::new();
    for record in &history {
        for genome in &record.genomes {
            assert!(seen.insert(genome.genome_id));
        }
    }

    // Every parent id comes from the preceding generation.
    for window in history.windows(2) {
        let previous: HashSet<u64> = window[0].genomes.iter().map(|g| g.genome_id).collect();
        for genome in &window[1].genomes {
            let parent1 = genome.parent1.expect("bred genomes record a parent");
            assert!(previous.contains(&parent1));
            if let Some(parent2) = genome.parent2 {
                assert!(previous.contains(&parent2));
            }
        }
    }
}

#[test]
fn test_grid_layout_session() {
    let config = SessionConfig {
        evolution: EvolutionConfig {
            population_size: 6,
            ..EvolutionConfig::default()
        },
        pattern: PatternConfig {
            layout: Layout::Grid {
                nx: 5,
                ny: 5,
                nz: 2,
                spacing: 1.0,
            },
            fps: 30.0,
        },
    };
    let session = EvolutionSession::create(config, 50).unwrap();

    let animation = session.generate_pattern(0, 1.0).unwrap();
    assert_eq!(animation.num_drones(), 50);
    // Centered lattice corner.
    let first = &animation.frames[0].drones[0];
    assert!((first.x - -2.0).abs() < 1e-12);
    assert!((first.y - -2.0).abs() < 1e-12);
    assert!((first.z - -0.5).abs() < 1e-12);
}

#[test]
fn test_same_seed_reproduces_evolution() {
    let make = || {
        let config = SessionConfig {
            evolution: EvolutionConfig {
                population_size: 8,
                seed: 123,
                ..EvolutionConfig::default()
            },
            pattern: PatternConfig::default(),
        };
        let mut session = EvolutionSession::create(config, 5).unwrap();
        let ids = session.list_genome_ids();
        session.assign_fitness(ids[1], 1.0).unwrap();
        session.evolve(0.0).unwrap();
        session.generate_pattern(session.list_genome_ids()[0], 1.0).unwrap()
    };

    assert_eq!(make(), make());
}

#[test]
fn test_standalone_generate_matches_session() {
    let session = small_session();
    let id = session.list_genome_ids()[0];
    let genome = session.get_genome(id).unwrap();

    let positions = Layout::Circle { radius: 1.5 }.positions(5).unwrap();
    let mut evaluator = CppnEvaluator::compile(genome).unwrap();
    let standalone = generate(&mut evaluator, &positions, id, 2.0, 30.0).unwrap();

    assert_eq!(standalone, session.generate_pattern(id, 2.0).unwrap());
}
