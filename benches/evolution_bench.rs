//! Benchmarks for swarm-cppn.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use swarm_cppn::{
    crossover, generate, CppnEvaluator, EvolutionConfig, EvolutionSession, Genome,
    InnovationTracker, Layout, SessionConfig,
};

fn bench_genome_creation(c: &mut Criterion) {
    let config = EvolutionConfig::default();

    c.bench_function("genome_minimal", |b| {
        let mut innovations = InnovationTracker::new(config.num_outputs);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut id = 0u64;
        b.iter(|| {
            id += 1;
            black_box(Genome::minimal(id, &config, &mut innovations, &mut rng));
        });
    });
}

fn bench_mutation(c: &mut Criterion) {
    let config = EvolutionConfig {
        add_connection_prob: 0.3,
        add_node_prob: 0.1,
        ..EvolutionConfig::default()
    };
    let mut innovations = InnovationTracker::new(config.num_outputs);
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let genome = Genome::minimal(0, &config, &mut innovations, &mut rng);

    c.bench_function("genome_mutation", |b| {
        let mut g = genome.clone();
        b.iter(|| {
            g.mutate(&config, &mut innovations, &mut rng);
            black_box(&g);
        });
    });
}

fn bench_crossover(c: &mut Criterion) {
    let config = EvolutionConfig::default();
    let mut innovations = InnovationTracker::new(config.num_outputs);
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    let mut parent1 = Genome::minimal(0, &config, &mut innovations, &mut rng);
    let mut parent2 = Genome::minimal(1, &config, &mut innovations, &mut rng);
    for _ in 0..5 {
        parent1.mutate(&config, &mut innovations, &mut rng);
        parent2.mutate(&config, &mut innovations, &mut rng);
    }
    parent1.fitness = Some(0.8);
    parent2.fitness = Some(0.3);

    c.bench_function("genome_crossover", |b| {
        b.iter(|| {
            black_box(crossover(&parent1, &parent2, 2, &config, &mut rng));
        });
    });
}

fn bench_query(c: &mut Criterion) {
    let config = EvolutionConfig {
        add_node_prob: 1.0,
        ..EvolutionConfig::default()
    };
    let mut innovations = InnovationTracker::new(config.num_outputs);
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut genome = Genome::minimal(0, &config, &mut innovations, &mut rng);
    for _ in 0..5 {
        genome.mutate(&config, &mut innovations, &mut rng);
    }
    let mut evaluator = CppnEvaluator::compile(&genome).unwrap();

    c.bench_function("cppn_query_single", |b| {
        b.iter(|| {
            black_box(evaluator.query(0.5, -0.5, 1.0));
        });
    });
}

fn bench_pattern_generation(c: &mut Criterion) {
    let config = EvolutionConfig::default();
    let mut innovations = InnovationTracker::new(config.num_outputs);
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let genome = Genome::minimal(0, &config, &mut innovations, &mut rng);
    let positions = Layout::Circle { radius: 1.5 }.positions(5).unwrap();

    c.bench_function("generate_3s_30fps_5drones", |b| {
        let mut evaluator = CppnEvaluator::compile(&genome).unwrap();
        b.iter(|| {
            black_box(generate(&mut evaluator, &positions, 0, 3.0, 30.0).unwrap());
        });
    });
}

fn bench_evolve_step(c: &mut Criterion) {
    c.bench_function("session_evolve_pop20", |b| {
        let mut session = EvolutionSession::create(SessionConfig::default(), 5).unwrap();
        b.iter(|| {
            let ids = session.list_genome_ids();
            session.assign_fitness(ids[0], 1.0).unwrap();
            black_box(session.evolve(0.0).unwrap());
        });
    });
}

criterion_group!(
    benches,
    bench_genome_creation,
    bench_mutation,
    bench_crossover,
    bench_query,
    bench_pattern_generation,
    bench_evolve_step,
);
criterion_main!(benches);
