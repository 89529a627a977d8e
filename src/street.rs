use crate::IntersectionId;
use serde::{Deserialize, Serialize};

/// A directed street between two intersections.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Street {
    /// The unique name of the street.
    pub name: String,
    /// The intersection the street leaves from.
    pub start: IntersectionId,
    /// The intersection whose signal controls the end of the street.
    pub end: IntersectionId,
    /// The number of ticks needed to drive the length of the street.
    pub length: u32,
}

impl Street {
    /// Creates a new street.
    pub fn new(name: impl Into<String>, start: usize, end: usize, length: u32) -> Self {
        Self {
            name: name.into(),
            start: IntersectionId(start),
            end: IntersectionId(end),
            length,
        }
    }
}
