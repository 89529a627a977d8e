use crate::IntersectionId;
use thiserror::Error;

/// Errors raised while building or driving a simulation or population.
///
/// All of these describe a malformed scenario or configuration. None of them
/// are transient, so nothing in the crate retries on them.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Route references unknown street `{name}`")]
    UnknownStreet { name: String },

    #[error("Street `{name}` is declared more than once")]
    DuplicateStreet { name: String },

    #[error("Street `{name}` has zero length")]
    ZeroLengthStreet { name: String },

    #[error("Vehicle {vehicle} has an empty route")]
    EmptyRoute { vehicle: usize },

    #[error("Green duration for street `{street}` must be at least 1")]
    InvalidDuration { street: String },

    #[error("Genome does not match the shape of intersection {intersection}")]
    GenomeShape { intersection: IntersectionId },

    #[error("The network has no signalled intersections")]
    EmptyNetwork,

    #[error("Tournament size {size} must be between 2 and half the generation size ({gen_size})")]
    InvalidTournamentSize { size: usize, gen_size: usize },

    #[error("Generation size must be at least 2, got {0}")]
    InvalidGenerationSize(usize),

    #[error("Candidate size must be even, at least 2 and cover the generation when parents are replaced, got {0}")]
    InvalidCandidateSize(usize),

    #[error("Timing cap must be at least 1")]
    InvalidTimingCap,

    #[error("Mutation rate must lie in [0, 1], got {0}")]
    InvalidMutationRate(f64),

    #[error("Invalid grid: {0}")]
    InvalidGrid(&'static str),

    #[error("Line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
