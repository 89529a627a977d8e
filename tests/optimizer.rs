//! Tests that evolve signal plans on generated grids.

use assert_approx_eq::assert_approx_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use signal_evo::{
    GridBuilder, MutationMode, Population, PopulationConfig, Scenario, SelectionPolicy, Simulation,
};

fn scenario() -> Scenario {
    let builder = GridBuilder {
        street_length: 2,
        duration: 80,
        vehicles: 40,
        hops: 5,
        ..GridBuilder::new(3)
    };
    builder.build(&mut StdRng::seed_from_u64(99)).unwrap()
}

fn population(config: PopulationConfig) -> Population {
    let scenario = scenario();
    let sim = Simulation::from_scenario(&scenario).unwrap();
    Population::new(sim, scenario.adjacency(), config).unwrap()
}

/// The best genome always survives when parents compete with their children.
#[test]
fn best_fitness_never_drops() {
    for selection in [
        SelectionPolicy::Top,
        SelectionPolicy::Uniform,
        SelectionPolicy::Tournament { size: 2 },
        SelectionPolicy::TournamentBest { size: 2 },
    ] {
        let mut population = population(PopulationConfig {
            gen_size: 6,
            candidate_size: 4,
            mutation_rate: 0.3,
            selection,
            seed: Some(1),
            ..Default::default()
        });
        let history = population.run(8).unwrap();
        assert!(history.best.windows(2).all(|w| w[1] >= w[0]));
    }
}

#[test]
fn history_has_one_entry_per_generation() {
    let mut population = population(PopulationConfig {
        gen_size: 4,
        candidate_size: 4,
        seed: Some(2),
        ..Default::default()
    });
    let history = population.run(5).unwrap();
    assert_eq!(population.generation(), 5);
    let improvements = history.improvements;
    let (best, worst, mean) = history.into_parts();
    assert_eq!(best.len(), 5);
    assert_eq!(worst.len(), 5);
    assert_eq!(mean.len(), 5);
    assert!(improvements < 5);
    for ((b, w), m) in best.iter().zip(&worst).zip(&mean) {
        assert!(w <= b);
        assert!(*m >= *w as f64 && *m <= *b as f64);
    }
}

#[test]
fn stats_match_generation() {
    let mut population = population(PopulationConfig {
        gen_size: 5,
        candidate_size: 6,
        mutation_mode: MutationMode::Individual,
        mutation_rate: 0.5,
        seed: Some(3),
        ..Default::default()
    });
    let stats = population.next_generation().unwrap();
    let fitness: Vec<u64> = population
        .genomes()
        .iter()
        .map(|g| g.fitness().unwrap())
        .collect();
    assert_eq!(stats.best, fitness[0]);
    assert_eq!(stats.worst, *fitness.last().unwrap());
    let mean = fitness.iter().sum::<u64>() as f64 / fitness.len() as f64;
    assert_approx_eq!(stats.mean, mean);
}

#[test]
fn seeded_runs_are_reproducible() {
    let config = PopulationConfig {
        gen_size: 4,
        candidate_size: 4,
        mutation_rate: 0.2,
        selection: SelectionPolicy::Tournament { size: 2 },
        seed: Some(77),
        ..Default::default()
    };
    let a = population(config.clone()).run(4).unwrap();
    let b = population(config).run(4).unwrap();
    assert_eq!(a, b);
}

#[test]
fn best_genome_scores_its_fitness() {
    let mut population = population(PopulationConfig {
        gen_size: 4,
        candidate_size: 4,
        mutation_rate: 0.2,
        seed: Some(5),
        ..Default::default()
    });
    population.run(3).unwrap();
    let mut best = population.best().copy(false);
    let expected = population.best().fitness();
    let score = population.evaluate(&mut best).unwrap();
    assert_eq!(Some(score), expected);
    assert!(best
        .iter_schedules()
        .all(|(_, d)| d.iter().all(|x| (1..=10).contains(x))));
}

#[test]
fn config_reads_from_json() {
    let config: PopulationConfig = serde_json::from_str(
        r#"{ "gen_size": 8, "selection": { "tournament": { "size": 3 } }, "seed": 4 }"#,
    )
    .unwrap();
    assert_eq!(config.gen_size, 8);
    assert_eq!(config.selection, SelectionPolicy::Tournament { size: 3 });
    assert_eq!(config.candidate_size, PopulationConfig::default().candidate_size);
    assert!(config.validate().is_ok());
}
