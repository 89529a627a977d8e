use anyhow::{Context, Result};
use clap::{arg, ArgMatches, Command};
use rand::rngs::StdRng;
use rand::SeedableRng;
use signal_evo::{GridBuilder, Population, PopulationConfig, Scenario, ScoringPolicy, Simulation};
use std::path::{Path, PathBuf};
use std::time::Instant;

fn cli() -> Command {
    Command::new("signal-evo")
        .about("Simulates traffic signal plans and evolves better ones")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("generate")
                .about("Generates a grid scenario with random routes")
                .arg(
                    arg!(<OUT> "Path of the scenario file")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--width [WIDTH] "Intersections along each side")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("4"),
                )
                .arg(
                    arg!(--duration [TICKS] "Ticks to simulate")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("700"),
                )
                .arg(
                    arg!(--cars [COUNT] "Number of vehicles")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("100"),
                )
                .arg(
                    arg!(--hops [COUNT] "Streets in each route")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("12"),
                )
                .arg(
                    arg!(--bonus [POINTS] "Points per finished vehicle")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("1000"),
                )
                .arg(
                    arg!(--length [TICKS] "Length of every street")
                        .value_parser(clap::value_parser!(u32))
                        .default_value("40"),
                )
                .arg(arg!(--seed [SEED] "Random seed").value_parser(clap::value_parser!(u64))),
        )
        .subcommand(
            Command::new("simulate")
                .about("Scores the scenario with every light green for one tick")
                .arg(
                    arg!(<SCENARIO> "Path of the scenario file")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--"early-bonus" "Award a point for every tick left when a vehicle finishes"),
                ),
        )
        .subcommand(
            Command::new("optimize")
                .about("Evolves signal plans for a scenario")
                .arg(
                    arg!(<SCENARIO> "Path of the scenario file")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--generations [COUNT] "Generations to run")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("100"),
                )
                .arg(
                    arg!(--config [CONFIG] "Population config json file")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--seed [SEED] "Random seed, overriding the config")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(--"early-bonus" "Award a point for every tick left when a vehicle finishes"),
                )
                .arg(
                    arg!(--output [OUTPUT] "Write the run history and best plan as json")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let matches = cli().get_matches();

    let result = match matches.subcommand() {
        Some(("generate", sub_m)) => generate(sub_m),
        Some(("simulate", sub_m)) => simulate(sub_m),
        Some(("optimize", sub_m)) => optimize(sub_m),
        _ => Err(anyhow::anyhow!("Invalid subcommand")),
    };
    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn rng(seed: Option<&u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(*seed),
        None => StdRng::from_entropy(),
    }
}

fn load(path: &Path, early_bonus: bool) -> Result<(Scenario, Simulation)> {
    let scenario = Scenario::from_file(path)
        .with_context(|| format!("Failed to read scenario {}", path.display()))?;
    let sim = Simulation::from_scenario(&scenario)?.with_policy(ScoringPolicy {
        early_finish_bonus: early_bonus,
    });
    Ok((scenario, sim))
}

fn generate(args: &ArgMatches) -> Result<()> {
    let builder = GridBuilder {
        width: *args.get_one("width").unwrap(),
        street_length: *args.get_one("length").unwrap(),
        duration: *args.get_one("duration").unwrap(),
        vehicles: *args.get_one("cars").unwrap(),
        hops: *args.get_one("hops").unwrap(),
        bonus: *args.get_one("bonus").unwrap(),
    };
    let scenario = builder.build(&mut rng(args.get_one("seed")))?;
    let out = args.get_one::<PathBuf>("OUT").unwrap();
    scenario
        .save(out)
        .with_context(|| format!("Failed to write {}", out.display()))?;
    println!(
        "Wrote {} intersections, {} streets and {} routes to {}",
        scenario.intersections,
        scenario.streets.len(),
        scenario.routes.len(),
        out.display()
    );
    Ok(())
}

fn simulate(args: &ArgMatches) -> Result<()> {
    let path = args.get_one::<PathBuf>("SCENARIO").unwrap();
    let (_, mut sim) = load(path, args.get_flag("early-bonus"))?;
    let start = Instant::now();
    let score = sim.run();
    println!(
        "Score {} ({} of {} vehicles finished) in {:?}",
        score,
        sim.completed(),
        sim.num_vehicles(),
        start.elapsed()
    );
    Ok(())
}

fn optimize(args: &ArgMatches) -> Result<()> {
    let path = args.get_one::<PathBuf>("SCENARIO").unwrap();
    let (scenario, sim) = load(path, args.get_flag("early-bonus"))?;

    let mut config = match args.get_one::<PathBuf>("config") {
        Some(config_path) => {
            let text = std::fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config {}", config_path.display()))?;
            serde_json::from_str::<PopulationConfig>(&text).context("Invalid population config")?
        }
        None => PopulationConfig::default(),
    };
    if let Some(seed) = args.get_one::<u64>("seed") {
        config.seed = Some(*seed);
    }

    let generations = *args.get_one::<usize>("generations").unwrap();
    let mut population = Population::new(sim, scenario.adjacency(), config)?;
    let start = Instant::now();
    let history = population.run(generations)?;
    let stats = population.stats();
    println!(
        "After {} generations: best {}, worst {}, mean {:.1} ({} improvements) in {:?}",
        generations,
        stats.best,
        stats.worst,
        stats.mean,
        history.improvements,
        start.elapsed()
    );

    if let Some(output) = args.get_one::<PathBuf>("output") {
        let report = serde_json::json!({
            "config": population.config(),
            "history": history,
            "best": population.best(),
        });
        std::fs::write(output, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("Failed to write {}", output.display()))?;
    }
    Ok(())
}
