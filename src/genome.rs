use crate::{Error, IntersectionId, Result, Simulation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a genome mutates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationMode {
    /// Each intersection independently has one duration redrawn.
    #[default]
    Schedule,
    /// At most one intersection per genome has its whole schedule redrawn.
    Individual,
}

/// A candidate signal timing plan.
///
/// Holds the green durations of every intersection, in the slot order of the
/// simulation it was built for, along with the score of its last evaluation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    /// The green durations of each intersection.
    schedules: BTreeMap<IntersectionId, Vec<u32>>,
    /// The chance of a mutation taking place.
    mutation_rate: f64,
    /// The longest green duration a mutation may draw, inclusive.
    timing_cap: u32,
    /// The score of the last evaluation, if there has been one.
    fitness: Option<u64>,
}

impl Genome {
    /// Creates an unevaluated genome from a set of schedules.
    ///
    /// The mutation rate must lie in `[0, 1]` and the timing cap must be at least 1.
    pub fn new(
        schedules: BTreeMap<IntersectionId, Vec<u32>>,
        mutation_rate: f64,
        timing_cap: u32,
    ) -> Result<Self> {
        check_mutation_params(mutation_rate, timing_cap)?;
        Ok(Self {
            schedules,
            mutation_rate,
            timing_cap,
            fitness: None,
        })
    }

    /// Creates a genome shaped like the simulation's intersections,
    /// with every duration drawn uniformly from `1..=timing_cap`.
    pub fn random(
        sim: &Simulation,
        mutation_rate: f64,
        timing_cap: u32,
        rng: &mut impl Rng,
    ) -> Result<Self> {
        check_mutation_params(mutation_rate, timing_cap)?;
        let schedules = sim
            .iter_intersections()
            .map(|node| {
                let durations = (0..node.incoming().len())
                    .map(|_| rng.gen_range(1..=timing_cap))
                    .collect::<Vec<u32>>();
                (node.id(), durations)
            })
            .collect();
        Self::new(schedules, mutation_rate, timing_cap)
    }

    /// Creates a genome holding the simulation's current schedule.
    pub fn from_simulation(
        sim: &Simulation,
        mutation_rate: f64,
        timing_cap: u32,
    ) -> Result<Self> {
        let schedules = sim
            .iter_intersections()
            .map(|node| (node.id(), node.durations().to_vec()))
            .collect();
        Self::new(schedules, mutation_rate, timing_cap)
    }

    /// Gets the durations of one intersection.
    pub fn schedule(&self, id: IntersectionId) -> Option<&[u32]> {
        self.schedules.get(&id).map(Vec::as_slice)
    }

    /// Returns an iterator over the schedules, ordered by intersection ID.
    pub fn iter_schedules(&self) -> impl Iterator<Item = (IntersectionId, &[u32])> {
        self.schedules.iter().map(|(id, durations)| (*id, durations.as_slice()))
    }

    /// Returns an iterator over the IDs of the intersections in the genome.
    pub fn intersection_ids(&self) -> impl Iterator<Item = IntersectionId> + '_ {
        self.schedules.keys().copied()
    }

    /// Whether the genome holds a schedule for the intersection.
    pub fn contains(&self, id: IntersectionId) -> bool {
        self.schedules.contains_key(&id)
    }

    /// The number of intersections in the genome.
    pub fn num_intersections(&self) -> usize {
        self.schedules.len()
    }

    /// The total number of durations across every intersection.
    pub fn num_durations(&self) -> usize {
        self.schedules.values().map(Vec::len).sum()
    }

    /// Replaces the durations of one intersection with a copy of `durations`.
    pub(crate) fn set_schedule(&mut self, id: IntersectionId, durations: &[u32]) {
        if let Some(schedule) = self.schedules.get_mut(&id) {
            schedule.clear();
            schedule.extend_from_slice(durations);
        }
    }

    /// The chance of a mutation taking place.
    pub fn mutation_rate(&self) -> f64 {
        self.mutation_rate
    }

    /// The longest green duration a mutation may draw.
    pub fn timing_cap(&self) -> u32 {
        self.timing_cap
    }

    /// The score of the last evaluation.
    pub fn fitness(&self) -> Option<u64> {
        self.fitness
    }

    /// Records the score of an evaluation.
    pub fn set_fitness(&mut self, score: u64) {
        self.fitness = Some(score);
    }

    /// Copies the genome, optionally keeping its fitness.
    pub fn copy(&self, keep_fitness: bool) -> Self {
        let mut genome = self.clone();
        if !keep_fitness {
            genome.fitness = None;
        }
        genome
    }

    /// Randomly mutates the genome in place.
    pub fn mutate(&mut self, mode: MutationMode, rng: &mut impl Rng) {
        match mode {
            MutationMode::Schedule => {
                for durations in self.schedules.values_mut() {
                    if !rng.gen_bool(self.mutation_rate) || durations.is_empty() {
                        continue;
                    }
                    let idx = rng.gen_range(0..durations.len());
                    durations[idx] = rng.gen_range(1..=self.timing_cap);
                }
            }
            MutationMode::Individual => {
                if self.schedules.is_empty() || !rng.gen_bool(self.mutation_rate) {
                    return;
                }
                let idx = rng.gen_range(0..self.schedules.len());
                if let Some(durations) = self.schedules.values_mut().nth(idx) {
                    for duration in durations.iter_mut() {
                        *duration = rng.gen_range(1..=self.timing_cap);
                    }
                }
            }
        }
    }
}

/// Rejects parameters `mutate` could not draw with.
pub(crate) fn check_mutation_params(mutation_rate: f64, timing_cap: u32) -> Result<()> {
    if !(0.0..=1.0).contains(&mutation_rate) {
        return Err(Error::InvalidMutationRate(mutation_rate));
    }
    if timing_cap == 0 {
        return Err(Error::InvalidTimingCap);
    }
    Ok(())
}
