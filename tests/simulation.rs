//! Tests that run whole scenarios through the simulator.

use rand::rngs::StdRng;
use rand::SeedableRng;
use signal_evo::{Genome, GridBuilder, Scenario, ScoringPolicy, Simulation};

fn scenario(seed: u64) -> Scenario {
    let builder = GridBuilder {
        street_length: 3,
        duration: 120,
        vehicles: 60,
        hops: 6,
        ..GridBuilder::new(4)
    };
    builder.build(&mut StdRng::seed_from_u64(seed)).unwrap()
}

/// A single vehicle on an uncontested 2x2 grid finishes well inside the horizon.
#[test]
fn lone_vehicle_earns_bonus() {
    let builder = GridBuilder {
        street_length: 1,
        duration: 10,
        vehicles: 1,
        hops: 2,
        bonus: 1000,
        ..GridBuilder::new(2)
    };
    for seed in 0..5 {
        let scenario = builder.build(&mut StdRng::seed_from_u64(seed)).unwrap();
        let mut sim = Simulation::from_scenario(&scenario).unwrap();
        assert_eq!(sim.run(), 1000);
        assert_eq!(sim.completed(), 1);
    }
}

#[test]
fn score_never_decreases() {
    let mut sim = Simulation::from_scenario(&scenario(1))
        .unwrap()
        .with_policy(ScoringPolicy {
            early_finish_bonus: true,
        });
    let mut score = sim.score();
    while sim.tick() < sim.horizon() {
        sim.step();
        assert!(sim.score() >= score);
        score = sim.score();
    }
}

#[test]
fn each_vehicle_scores_at_most_once() {
    let scenario = scenario(2);
    let mut sim = Simulation::from_scenario(&scenario).unwrap();
    let score = sim.run();
    assert!(sim.completed() <= scenario.routes.len());
    assert_eq!(score, sim.completed() as u64 * scenario.bonus);
    assert_eq!(
        sim.iter_vehicles().count(),
        scenario.routes.len() - sim.completed()
    );
}

#[test]
fn reset_then_rerun_is_deterministic() {
    let scenario = scenario(3);
    let mut sim = Simulation::from_scenario(&scenario)
        .unwrap()
        .with_policy(ScoringPolicy {
            early_finish_bonus: true,
        });
    let genome = Genome::random(&sim, 0.0, 5, &mut StdRng::seed_from_u64(3)).unwrap();
    sim.load_schedule(&genome).unwrap();

    let first = sim.run();
    sim.reset();
    assert_eq!(sim.run(), first);

    let mut fresh = Simulation::from_scenario(&scenario)
        .unwrap()
        .with_policy(sim.policy());
    fresh.load_schedule(&genome).unwrap();
    assert_eq!(fresh.run(), first);
}

#[test]
fn clones_run_independently() {
    let mut sim = Simulation::from_scenario(&scenario(4)).unwrap();
    let mut copy = sim.clone();
    for _ in 0..30 {
        copy.step();
    }
    assert_eq!(sim.tick(), 0);
    let score = sim.run();
    assert_eq!(copy.run(), score);
}

#[test]
fn text_scenario_matches_generated() {
    let generated = scenario(5);
    let parsed = Scenario::parse(&generated.to_text()).unwrap();
    let a = Simulation::from_scenario(&generated).unwrap().run();
    let b = Simulation::from_scenario(&parsed).unwrap().run();
    assert_eq!(a, b);
}

#[test]
fn default_schedule_round_trips_through_genome() {
    let mut sim = Simulation::from_scenario(&scenario(6)).unwrap();
    let genome = Genome::from_simulation(&sim, 0.0, 10).unwrap();
    assert!(genome.iter_schedules().all(|(_, d)| d.iter().all(|x| *x == 1)));
    let baseline = sim.run();
    sim.load_schedule(&genome).unwrap();
    sim.reset();
    assert_eq!(sim.run(), baseline);
}
