use crate::{Adjacency, Error, Genome, IntersectionId, MutationMode, Result, Simulation};
use itertools::Itertools;
use log::{debug, info, warn};
use pathfinding::directed::bfs::bfs_reach;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// How parents are chosen for each pair of children.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Always breed the two fittest genomes.
    Top,
    /// Breed two distinct genomes drawn uniformly.
    Uniform,
    /// Draw two disjoint groups of `size` genomes and breed the least fit
    /// member of each group.
    ///
    /// This favours weak genomes even though the score is maximised; use
    /// [SelectionPolicy::TournamentBest] for a conventional tournament.
    Tournament { size: usize },
    /// Draw two disjoint groups of `size` genomes and breed the fittest
    /// member of each group.
    TournamentBest { size: usize },
}

/// The parameters of an evolutionary run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// The number of genomes kept after each generation.
    pub gen_size: usize,
    /// The number of children bred each generation. Must be even.
    pub candidate_size: usize,
    /// The longest green duration a genome may hold.
    pub timing_cap: u32,
    /// The chance of a mutation taking place.
    pub mutation_rate: f64,
    /// How children mutate.
    pub mutation_mode: MutationMode,
    /// How parents are chosen.
    pub selection: SelectionPolicy,
    /// Whether the parents are discarded rather than competing with their children.
    pub replace_parents: bool,
    /// The seed of the random number generator. Seeded from entropy when absent.
    pub seed: Option<u64>,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            gen_size: 10,
            candidate_size: 10,
            timing_cap: 10,
            mutation_rate: 0.001,
            mutation_mode: MutationMode::Schedule,
            selection: SelectionPolicy::Top,
            replace_parents: false,
            seed: None,
        }
    }
}

impl PopulationConfig {
    /// Checks the configuration for values no run could use.
    pub fn validate(&self) -> Result<()> {
        if self.gen_size < 2 {
            return Err(Error::InvalidGenerationSize(self.gen_size));
        }
        if self.candidate_size < 2
            || self.candidate_size % 2 != 0
            || (self.replace_parents && self.candidate_size < self.gen_size)
        {
            return Err(Error::InvalidCandidateSize(self.candidate_size));
        }
        crate::genome::check_mutation_params(self.mutation_rate, self.timing_cap)?;
        match self.selection {
            SelectionPolicy::Tournament { size } | SelectionPolicy::TournamentBest { size }
                if size < 2 || size > self.gen_size / 2 =>
            {
                Err(Error::InvalidTournamentSize {
                    size,
                    gen_size: self.gen_size,
                })
            }
            _ => Ok(()),
        }
    }
}

/// The fitness spread of one generation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub best: u64,
    pub worst: u64,
    pub mean: f64,
}

/// The fitness spread of every generation of a run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunHistory {
    pub best: Vec<u64>,
    pub worst: Vec<u64>,
    pub mean: Vec<f64>,
    /// The number of generations that raised the best fitness.
    pub improvements: usize,
}

impl RunHistory {
    fn push(&mut self, stats: GenerationStats) {
        if matches!(self.best.last(), Some(best) if stats.best > *best) {
            self.improvements += 1;
        }
        self.best.push(stats.best);
        self.worst.push(stats.worst);
        self.mean.push(stats.mean);
    }

    /// Splits the history into its best, worst and mean series.
    pub fn into_parts(self) -> (Vec<u64>, Vec<u64>, Vec<f64>) {
        (self.best, self.worst, self.mean)
    }
}

/// A population of signal timing plans evolving against one simulation.
///
/// Every evaluation reuses the same simulation, so evaluations run one at a time.
pub struct Population {
    /// The simulation used to score genomes.
    sim: Simulation,
    /// The intersection graph used to pick crossover regions.
    adjacency: Adjacency,
    /// The run parameters.
    config: PopulationConfig,
    /// The current generation, fittest first.
    genomes: Vec<Genome>,
    /// The source of all randomness in the run.
    rng: StdRng,
    /// The number of generations bred so far.
    generation: usize,
}

impl Population {
    /// Creates a population of random genomes and evaluates each of them.
    pub fn new(sim: Simulation, adjacency: Adjacency, config: PopulationConfig) -> Result<Self> {
        config.validate()?;
        if sim.iter_intersections().next().is_none() {
            return Err(Error::EmptyNetwork);
        }
        if sim.num_vehicles() == 0 {
            warn!("Scenario has no vehicles, every plan will score zero");
        }
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut population = Self {
            sim,
            adjacency,
            config,
            genomes: vec![],
            rng,
            generation: 0,
        };
        for _ in 0..population.config.gen_size {
            let mut genome = Genome::random(
                &population.sim,
                population.config.mutation_rate,
                population.config.timing_cap,
                &mut population.rng,
            )?;
            evaluate(&mut population.sim, &mut genome)?;
            population.genomes.push(genome);
        }
        population.genomes.sort_by_key(|g| Reverse(g.fitness()));

        let stats = population.stats();
        info!(
            "Initial population: best {}, worst {}, mean {:.1}",
            stats.best, stats.worst, stats.mean
        );
        Ok(population)
    }

    /// The run parameters.
    pub fn config(&self) -> &PopulationConfig {
        &self.config
    }

    /// The current generation, fittest first.
    pub fn genomes(&self) -> &[Genome] {
        &self.genomes
    }

    /// The fittest genome of the current generation.
    pub fn best(&self) -> &Genome {
        &self.genomes[0]
    }

    /// The number of generations bred so far.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// The simulation used to score genomes.
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Scores a genome and records its fitness.
    pub fn evaluate(&mut self, genome: &mut Genome) -> Result<u64> {
        evaluate(&mut self.sim, genome)
    }

    /// Computes the fitness spread of the current generation.
    pub fn stats(&self) -> GenerationStats {
        let fitness = self.genomes.iter().map(|g| g.fitness().unwrap_or(0));
        let (worst, best) = fitness.clone().minmax().into_option().unwrap_or((0, 0));
        let total: f64 = fitness.map(|f| f as f64).sum();
        GenerationStats {
            best,
            worst,
            mean: total / self.genomes.len().max(1) as f64,
        }
    }

    /// Breeds, scores and selects one generation.
    pub fn next_generation(&mut self) -> Result<GenerationStats> {
        let mut children = Vec::with_capacity(self.config.candidate_size);
        for _ in 0..self.config.candidate_size / 2 {
            let (a, b) = self.select_parents();
            let (first, second) = crossover(
                &self.genomes[a],
                &self.genomes[b],
                &self.adjacency,
                &mut self.rng,
            );
            for mut child in [first, second] {
                child.mutate(self.config.mutation_mode, &mut self.rng);
                evaluate(&mut self.sim, &mut child)?;
                children.push(child);
            }
        }

        let mut candidates = if self.config.replace_parents {
            children
        } else {
            let mut candidates = std::mem::take(&mut self.genomes);
            candidates.append(&mut children);
            candidates
        };
        candidates.sort_by_key(|g| Reverse(g.fitness()));
        candidates.truncate(self.config.gen_size);
        self.genomes = candidates;
        self.generation += 1;

        let stats = self.stats();
        info!(
            "Generation {}: best {}, worst {}, mean {:.1}",
            self.generation, stats.best, stats.worst, stats.mean
        );
        Ok(stats)
    }

    /// Runs a number of generations and collects their fitness spreads.
    pub fn run(&mut self, num_generations: usize) -> Result<RunHistory> {
        let mut history = RunHistory::default();
        for _ in 0..num_generations {
            history.push(self.next_generation()?);
        }
        info!(
            "Best fitness improved in {} of {} generations",
            history.improvements, num_generations
        );
        Ok(history)
    }

    /// Picks the indices of two distinct parents.
    fn select_parents(&mut self) -> (usize, usize) {
        let n = self.genomes.len();
        let fitness = |idx: &usize| self.genomes[*idx].fitness();
        match self.config.selection {
            SelectionPolicy::Top => (0, 1),
            SelectionPolicy::Uniform => {
                let picks = sample(&mut self.rng, n, 2);
                (picks.index(0), picks.index(1))
            }
            SelectionPolicy::Tournament { size } => {
                let picks = sample(&mut self.rng, n, 2 * size).into_vec();
                let (first, second) = picks.split_at(size);
                let winner = |group: &[usize]| group.iter().copied().min_by_key(|i| fitness(i));
                (winner(first).unwrap_or(0), winner(second).unwrap_or(1))
            }
            SelectionPolicy::TournamentBest { size } => {
                let picks = sample(&mut self.rng, n, 2 * size).into_vec();
                let (first, second) = picks.split_at(size);
                let winner =
                    |group: &[usize]| group.iter().copied().min_by_key(|i| Reverse(fitness(i)));
                (winner(first).unwrap_or(0), winner(second).unwrap_or(1))
            }
        }
    }
}

/// Loads a genome into the simulation, runs it from the start and records the score.
fn evaluate(sim: &mut Simulation, genome: &mut Genome) -> Result<u64> {
    sim.load_schedule(genome)?;
    sim.reset();
    let score = sim.run();
    genome.set_fitness(score);
    debug!("Evaluated genome: {}", score);
    Ok(score)
}

/// Breeds two children by swapping the schedules of a connected region of
/// intersections between the parents.
///
/// The region grows breadth first from a random intersection to a random
/// fraction, below one half, of the network.
pub(crate) fn crossover(
    first: &Genome,
    second: &Genome,
    adjacency: &Adjacency,
    rng: &mut impl Rng,
) -> (Genome, Genome) {
    let mut children = (first.copy(false), second.copy(false));
    let ids: Vec<IntersectionId> = first.intersection_ids().collect();
    if ids.is_empty() {
        return children;
    }

    let ratio: f64 = rng.gen_range(0.0..0.5);
    let seed = ids[rng.gen_range(0..ids.len())];
    let size = (ratio * ids.len() as f64) as usize;
    for id in connected_region(seed, size, adjacency, first) {
        if let (Some(a), Some(b)) = (first.schedule(id), second.schedule(id)) {
            children.0.set_schedule(id, b);
            children.1.set_schedule(id, a);
        }
    }
    children
}

/// Collects up to `size` intersections of the genome reachable from `seed`,
/// in breadth first order. The seed is always included.
pub(crate) fn connected_region(
    seed: IntersectionId,
    size: usize,
    adjacency: &Adjacency,
    genome: &Genome,
) -> Vec<IntersectionId> {
    bfs_reach(seed, |id| {
        adjacency
            .get(id)
            .into_iter()
            .flatten()
            .copied()
            .filter(|next| genome.contains(*next))
            .collect::<Vec<_>>()
    })
    .take(size.max(1))
    .collect()
}
