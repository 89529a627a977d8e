pub use error::{Error, Result};
pub use genome::{Genome, MutationMode};
pub use grid::GridBuilder;
pub use intersection::Intersection;
pub use population::{GenerationStats, Population, PopulationConfig, RunHistory, SelectionPolicy};
pub use scenario::{Adjacency, Scenario};
pub use simulation::{ScoringPolicy, Simulation};
use slotmap::{new_key_type, SlotMap};
pub use slotmap::Key;
pub use street::Street;
pub use vehicle::Vehicle;

mod error;
mod genome;
mod grid;
mod intersection;
mod population;
mod scenario;
mod simulation;
mod street;
mod vehicle;

new_key_type! {
    /// Unique ID of a [Vehicle].
    pub struct VehicleId;
}

/// Identifier of an intersection, as numbered in the scenario.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct IntersectionId(pub usize);

/// Index of a [Street] within a [Simulation].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StreetId(pub(crate) usize);

impl StreetId {
    /// The position of the street in the order it was declared.
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for IntersectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

type VehicleSet = SlotMap<VehicleId, Vehicle>;
