use crate::{Error, Result, Scenario, Street};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const ALPHABET: &[u8] = b"abcdefghij";

/// Generates square grid scenarios with random routes.
///
/// The grid wraps around at its edges, so every intersection has a street to
/// and from each of its four neighbours.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridBuilder {
    /// The number of intersections along each side.
    pub width: usize,
    /// The length of every street in ticks.
    pub street_length: u32,
    /// The number of ticks to simulate.
    pub duration: usize,
    /// The number of vehicles.
    pub vehicles: usize,
    /// The number of streets in each route.
    pub hops: usize,
    /// The points earned by each vehicle that finishes its route.
    pub bonus: u64,
}

impl Default for GridBuilder {
    fn default() -> Self {
        Self {
            width: 4,
            street_length: 40,
            duration: 700,
            vehicles: 100,
            hops: 12,
            bonus: 1000,
        }
    }
}

impl GridBuilder {
    /// Creates a builder for a grid of the given width.
    pub fn new(width: usize) -> Self {
        Self {
            width,
            ..Default::default()
        }
    }

    /// Generates a scenario.
    pub fn build(&self, rng: &mut impl Rng) -> Result<Scenario> {
        if self.width == 0 {
            return Err(Error::InvalidGrid("width must be at least 1"));
        }
        if self.hops == 0 {
            return Err(Error::InvalidGrid("routes need at least one hop"));
        }
        if self.street_length == 0 {
            return Err(Error::InvalidGrid("streets need a length of at least 1"));
        }

        let count = self.width * self.width;
        let mut names = HashSet::new();
        let mut streets = vec![];
        for node in 0..count {
            for next in self.neighbours(node) {
                let name = street_name(node, next);
                if names.insert(name.clone()) {
                    streets.push(Street::new(name, node, next, self.street_length));
                }
            }
        }

        let routes: Vec<Vec<String>> = (0..self.vehicles)
            .map(|_| {
                let mut current = rng.gen_range(0..count);
                let mut prev = None;
                (0..self.hops)
                    .map(|_| {
                        let mut options = self.neighbours(current).to_vec();
                        let back = prev.and_then(|p| options.iter().position(|n| *n == p));
                        if let Some(idx) = back {
                            options.remove(idx);
                        }
                        let next = options[rng.gen_range(0..options.len())];
                        let name = street_name(current, next);
                        prev = Some(current);
                        current = next;
                        name
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        Ok(Scenario {
            duration: self.duration,
            intersections: count,
            streets,
            routes,
            bonus: self.bonus,
        })
    }

    /// The intersections above, below, left and right of `node`.
    fn neighbours(&self, node: usize) -> [usize; 4] {
        let w = self.width;
        let (row, col) = (node / w, node % w);
        [
            ((row + w - 1) % w) * w + col,
            ((row + 1) % w) * w + col,
            row * w + (col + w - 1) % w,
            row * w + (col + 1) % w,
        ]
    }
}

/// Names a street after the decimal digits of its end points, spelled with letters.
fn street_name(start: usize, end: usize) -> String {
    let spell = |id: usize| -> String {
        id.to_string()
            .bytes()
            .map(|digit| ALPHABET[(digit - b'0') as usize] as char)
            .collect()
    };
    format!("{}-{}", spell(start), spell(end))
}

#[cfg(test)]
mod test {
    use super::{street_name, GridBuilder};
    use crate::Simulation;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn names_streets_with_letters() {
        assert_eq!(street_name(0, 1), "a-b");
        assert_eq!(street_name(12, 209), "bc-caj");
    }

    #[test]
    fn every_intersection_has_four_streets() {
        let scenario = GridBuilder::new(3).build(&mut StdRng::seed_from_u64(0)).unwrap();
        assert_eq!(scenario.intersections, 9);
        assert_eq!(scenario.streets.len(), 36);
        let adjacency = scenario.adjacency();
        assert!(adjacency.values().all(|n| n.len() == 4));
    }

    #[test]
    fn small_grids_share_streets() {
        let scenario = GridBuilder::new(2).build(&mut StdRng::seed_from_u64(0)).unwrap();
        assert_eq!(scenario.streets.len(), 8);
    }

    #[test]
    fn routes_are_drivable() {
        let builder = GridBuilder {
            vehicles: 25,
            hops: 6,
            ..GridBuilder::new(4)
        };
        let scenario = builder.build(&mut StdRng::seed_from_u64(5)).unwrap();
        assert!(scenario.routes.iter().all(|route| route.len() == 6));
        for route in &scenario.routes {
            for pair in route.windows(2) {
                let end = pair[0].split('-').nth(1).unwrap();
                let start = pair[1].split('-').next().unwrap();
                assert_eq!(end, start);
            }
        }
        assert!(Simulation::from_scenario(&scenario).is_ok());
    }

    #[test]
    fn same_seed_same_scenario() {
        let builder = GridBuilder::new(5);
        let a = builder.build(&mut StdRng::seed_from_u64(9)).unwrap();
        let b = builder.build(&mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
    }
}
