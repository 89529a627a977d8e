use crate::intersection::Intersection;
use crate::vehicle::{Passage, Vehicle};
use crate::{
    Error, Genome, IntersectionId, Result, Scenario, Street, StreetId, VehicleId, VehicleSet,
};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// The green duration given to every street when a simulation is built.
const DEFAULT_DURATION: u32 = 1;

/// Extra scoring rules applied when a vehicle finishes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    /// Award one extra point for every tick left before the horizon.
    pub early_finish_bonus: bool,
}

/// Where a street's queue lives.
#[derive(Clone, Copy, Debug)]
struct Placement {
    /// The index of the street's destination in `Simulation::intersections`.
    node: usize,
    /// The street's slot at that intersection.
    slot: usize,
}

/// A discrete, tick-based traffic simulation.
///
/// Street and route data are shared between clones, so cloning a simulation
/// is the cheap way to give each evaluator its own independent copy.
#[derive(Clone)]
pub struct Simulation {
    /// The streets in the order they were declared.
    streets: Arc<[Street]>,
    /// Street lookup by name.
    street_ids: Arc<HashMap<String, StreetId>>,
    /// The queue of each street, indexed like `streets`.
    placements: Arc<[Placement]>,
    /// The signalled intersections, ordered by ID.
    intersections: Vec<Intersection>,
    /// Intersection lookup by ID.
    nodes: BTreeMap<IntersectionId, usize>,
    /// The route of every vehicle in the scenario.
    routes: Arc<[Arc<[StreetId]>]>,
    /// The vehicles still on the road.
    vehicles: VehicleSet,
    /// The points earned so far.
    score: u64,
    /// The points earned by each vehicle that finishes.
    score_per_vehicle: u64,
    /// The number of ticks simulated so far.
    tick: usize,
    /// The number of ticks in a full run.
    horizon: usize,
    /// The number of vehicles which have finished.
    completed: usize,
    /// Extra scoring rules.
    policy: ScoringPolicy,
}

impl Simulation {
    /// Creates a simulation from a set of streets and vehicle routes.
    ///
    /// One intersection is created for every street destination, and every
    /// vehicle starts queued at the end of the first street on its route.
    pub fn new(
        streets: &[Street],
        routes: &[Vec<String>],
        score_per_vehicle: u64,
        horizon: usize,
    ) -> Result<Self> {
        let mut street_ids = HashMap::with_capacity(streets.len());
        for (idx, street) in streets.iter().enumerate() {
            if street.length == 0 {
                return Err(Error::ZeroLengthStreet {
                    name: street.name.clone(),
                });
            }
            if street_ids.insert(street.name.clone(), StreetId(idx)).is_some() {
                return Err(Error::DuplicateStreet {
                    name: street.name.clone(),
                });
            }
        }

        let ends: BTreeSet<IntersectionId> = streets.iter().map(|street| street.end).collect();
        let nodes: BTreeMap<IntersectionId, usize> =
            ends.iter().enumerate().map(|(idx, id)| (*id, idx)).collect();
        let mut intersections: Vec<Intersection> =
            ends.iter().map(|id| Intersection::new(*id)).collect();
        let placements = streets
            .iter()
            .enumerate()
            .map(|(idx, street)| {
                let node = nodes[&street.end];
                let slot = intersections[node].add_incoming(StreetId(idx), DEFAULT_DURATION);
                Placement { node, slot }
            })
            .collect();

        let routes = routes
            .iter()
            .enumerate()
            .map(|(vehicle, route)| {
                if route.is_empty() {
                    return Err(Error::EmptyRoute { vehicle });
                }
                route
                    .iter()
                    .map(|name| {
                        street_ids
                            .get(name)
                            .copied()
                            .ok_or_else(|| Error::UnknownStreet { name: name.clone() })
                    })
                    .collect::<Result<Arc<[StreetId]>>>()
            })
            .collect::<Result<Arc<[_]>>>()?;

        debug!(
            "Built simulation with {} streets, {} intersections and {} vehicles",
            streets.len(),
            intersections.len(),
            routes.len()
        );

        let mut sim = Self {
            streets: streets.into(),
            street_ids: Arc::new(street_ids),
            placements,
            intersections,
            nodes,
            routes,
            vehicles: VehicleSet::with_key(),
            score: 0,
            score_per_vehicle,
            tick: 0,
            horizon,
            completed: 0,
            policy: ScoringPolicy::default(),
        };
        sim.spawn_vehicles();
        Ok(sim)
    }

    /// Creates a simulation of a parsed scenario.
    pub fn from_scenario(scenario: &Scenario) -> Result<Self> {
        Self::new(
            &scenario.streets,
            &scenario.routes,
            scenario.bonus,
            scenario.duration,
        )
    }

    /// Sets the scoring policy.
    pub fn with_policy(mut self, policy: ScoringPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Gets the scoring policy.
    pub fn policy(&self) -> ScoringPolicy {
        self.policy
    }

    /// Gets the points earned so far.
    pub fn score(&self) -> u64 {
        self.score
    }

    /// Gets the number of ticks simulated so far.
    pub fn tick(&self) -> usize {
        self.tick
    }

    /// Gets the number of ticks in a full run.
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Gets the number of vehicles which have finished their route.
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Gets the number of vehicles in the scenario.
    pub fn num_vehicles(&self) -> usize {
        self.routes.len()
    }

    /// Returns an iterator over the vehicles still on the road.
    pub fn iter_vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    /// Gets a reference to a vehicle still on the road.
    pub fn get_vehicle(&self, vehicle_id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(vehicle_id)
    }

    /// Returns an iterator over the intersections, ordered by ID.
    pub fn iter_intersections(&self) -> impl Iterator<Item = &Intersection> {
        self.intersections.iter()
    }

    /// Gets a reference to the intersection with the given ID.
    pub fn get_intersection(&self, id: IntersectionId) -> Option<&Intersection> {
        self.nodes.get(&id).map(|idx| &self.intersections[*idx])
    }

    /// Gets a reference to the street with the given ID.
    pub fn get_street(&self, street_id: StreetId) -> &Street {
        &self.streets[street_id.0]
    }

    /// Looks up a street by name.
    pub fn street_id(&self, name: &str) -> Option<StreetId> {
        self.street_ids.get(name).copied()
    }

    /// Sets the green duration of a single street.
    pub fn set_schedule(&mut self, street_name: &str, duration: u32) -> Result<()> {
        let street_id = self.street_id(street_name).ok_or_else(|| Error::UnknownStreet {
            name: street_name.to_owned(),
        })?;
        if duration == 0 {
            return Err(Error::InvalidDuration {
                street: street_name.to_owned(),
            });
        }
        let Placement { node, slot } = self.placements[street_id.0];
        self.intersections[node].set_duration(slot, duration);
        Ok(())
    }

    /// Overwrites the schedule of every intersection with the durations of a genome.
    ///
    /// The genome is checked in full first, so a rejected genome leaves every schedule as it was.
    pub fn load_schedule(&mut self, genome: &Genome) -> Result<()> {
        let mut loaded = Vec::with_capacity(self.intersections.len());
        for node in &self.intersections {
            let durations = genome
                .schedule(node.id())
                .filter(|durations| durations.len() == node.incoming().len())
                .ok_or(Error::GenomeShape {
                    intersection: node.id(),
                })?;
            if let Some(slot) = durations.iter().position(|duration| *duration == 0) {
                return Err(Error::InvalidDuration {
                    street: self.streets[node.incoming()[slot].0].name.clone(),
                });
            }
            loaded.push(durations);
        }
        for (node, durations) in self.intersections.iter_mut().zip(loaded) {
            node.set_durations(durations);
        }
        Ok(())
    }

    /// Advances the simulation by one tick.
    ///
    /// Every intersection lets its vehicle through before any vehicle drives,
    /// so a vehicle let through on this tick starts driving on the next.
    /// Once the horizon is reached this does nothing.
    pub fn step(&mut self) {
        if self.tick >= self.horizon {
            return;
        }

        for node in 0..self.intersections.len() {
            if let Some(vehicle_id) = self.intersections[node].step() {
                self.pass_light(vehicle_id);
            }
        }

        let intersections = &mut self.intersections;
        for (vehicle_id, vehicle) in &mut self.vehicles {
            if vehicle.travel() {
                let Placement { node, slot } = self.placements[vehicle.street().0];
                intersections[node].enqueue(slot, vehicle_id);
            }
        }

        self.tick += 1;
    }

    /// Simulates every remaining tick up to the horizon and returns the score.
    pub fn run(&mut self) -> u64 {
        while self.tick < self.horizon {
            self.step();
        }
        self.score
    }

    /// Returns the simulation to its initial state, keeping the schedule.
    pub fn reset(&mut self) {
        for node in &mut self.intersections {
            node.reset();
        }
        self.vehicles = VehicleSet::with_capacity_and_key(self.routes.len());
        self.score = 0;
        self.tick = 0;
        self.completed = 0;
        self.spawn_vehicles();
    }

    /// Creates every vehicle and queues it at the end of its first street.
    fn spawn_vehicles(&mut self) {
        for route in self.routes.iter() {
            let vehicle_id = self
                .vehicles
                .insert_with_key(|id| Vehicle::new(id, route.clone()));
            let Placement { node, slot } = self.placements[route[0].0];
            self.intersections[node].enqueue(slot, vehicle_id);
        }
    }

    /// Moves a vehicle through a green light, removing it if it has finished.
    fn pass_light(&mut self, vehicle_id: VehicleId) {
        let vehicle = self
            .vehicles
            .get_mut(vehicle_id)
            .expect("Queued vehicle is not in the simulation");
        if vehicle.pass_light(&self.streets) == Passage::Finished {
            self.vehicles.remove(vehicle_id);
            self.score += self.score_per_vehicle;
            if self.policy.early_finish_bonus {
                self.score += (self.horizon - self.tick) as u64;
            }
            self.completed += 1;
            trace!("Vehicle {:?} finished on tick {}", vehicle_id, self.tick);
        }
    }
}

#[cfg(test)]
mod test {
    use super::{ScoringPolicy, Simulation};
    use crate::{Error, Genome, IntersectionId, Street};
    use std::collections::BTreeMap;

    fn route(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    /// A triangle with one incoming street per intersection.
    fn ring(length: u32) -> Vec<Street> {
        vec![
            Street::new("a-b", 0, 1, length),
            Street::new("b-c", 1, 2, length),
            Street::new("c-a", 2, 0, length),
        ]
    }

    #[test]
    fn builds_one_intersection_per_destination() {
        let streets = vec![
            Street::new("x", 0, 1, 1),
            Street::new("y", 2, 1, 1),
            Street::new("z", 1, 0, 1),
        ];
        let sim = Simulation::new(&streets, &[], 1000, 10).unwrap();
        let ids: Vec<_> = sim.iter_intersections().map(|node| node.id()).collect();
        assert_eq!(ids, vec![IntersectionId(0), IntersectionId(1)]);
        let node = sim.get_intersection(IntersectionId(1)).unwrap();
        assert_eq!(node.incoming().len(), 2);
        assert_eq!(node.durations(), &[1, 1]);
    }

    #[test]
    fn unknown_street_fails_at_construction() {
        let result = Simulation::new(&ring(1), &[route(&["a-b", "nowhere"])], 1000, 10);
        assert!(matches!(result, Err(Error::UnknownStreet { name }) if name == "nowhere"));
    }

    #[test]
    fn empty_route_fails_at_construction() {
        let result = Simulation::new(&ring(1), &[route(&["a-b"]), vec![]], 1000, 10);
        assert!(matches!(result, Err(Error::EmptyRoute { vehicle: 1 })));
    }

    #[test]
    fn vehicles_start_queued() {
        let sim = Simulation::new(&ring(2), &[route(&["a-b", "b-c"])], 1000, 10).unwrap();
        let node = sim.get_intersection(IntersectionId(1)).unwrap();
        assert_eq!(node.waiting(), 1);
        assert_eq!(sim.iter_vehicles().count(), 1);
    }

    #[test]
    fn single_phase_never_blocks() {
        // Each hop costs the release tick plus the street length
        let length = 3;
        let horizon = 20;
        let routes = [route(&["a-b", "b-c", "c-a", "a-b"])];
        let mut sim = Simulation::new(&ring(length), &routes, 100, horizon)
            .unwrap()
            .with_policy(ScoringPolicy {
                early_finish_bonus: true,
            });
        for name in ["a-b", "b-c", "c-a"] {
            sim.set_schedule(name, 1000).unwrap();
        }
        let finish_tick = 2 * (length as usize + 1);
        assert_eq!(sim.run(), 100 + (horizon - finish_tick) as u64);
        assert_eq!(sim.completed(), 1);
    }

    #[test]
    fn finished_vehicles_leave_the_simulation() {
        let mut sim = Simulation::new(&ring(1), &[route(&["a-b", "b-c"])], 1000, 10).unwrap();
        sim.step();
        assert_eq!(sim.score(), 1000);
        assert_eq!(sim.iter_vehicles().count(), 0);
        assert_eq!(sim.run(), 1000);
        assert_eq!(sim.tick(), 10);
    }

    #[test]
    fn one_vehicle_per_light_per_tick() {
        let routes = vec![route(&["a-b", "b-c"]); 3];
        let mut sim = Simulation::new(&ring(1), &routes, 10, 10).unwrap();
        sim.step();
        assert_eq!(sim.score(), 10);
        sim.step();
        assert_eq!(sim.score(), 20);
        sim.step();
        assert_eq!(sim.score(), 30);
    }

    #[test]
    fn reset_replays_identically() {
        let routes = vec![
            route(&["a-b", "b-c", "c-a"]),
            route(&["c-a", "a-b", "b-c", "c-a"]),
            route(&["b-c", "c-a"]),
        ];
        let mut sim = Simulation::new(&ring(2), &routes, 50, 30)
            .unwrap()
            .with_policy(ScoringPolicy {
                early_finish_bonus: true,
            });
        let first = sim.run();
        sim.reset();
        assert_eq!(sim.tick(), 0);
        assert_eq!(sim.score(), 0);
        assert_eq!(sim.iter_vehicles().count(), 3);
        assert_eq!(sim.run(), first);
    }

    #[test]
    fn load_schedule_checks_shape() {
        let mut sim = Simulation::new(&ring(1), &[], 1, 1).unwrap();
        let mut schedules = BTreeMap::new();
        schedules.insert(IntersectionId(0), vec![4]);
        schedules.insert(IntersectionId(1), vec![5]);
        let genome = Genome::new(schedules.clone(), 0.0, 10).unwrap();
        assert!(matches!(
            sim.load_schedule(&genome),
            Err(Error::GenomeShape { intersection: IntersectionId(2) })
        ));

        schedules.insert(IntersectionId(2), vec![6]);
        sim.load_schedule(&Genome::new(schedules, 0.0, 10).unwrap()).unwrap();
        let durations: Vec<_> = sim.iter_intersections().map(|n| n.durations()[0]).collect();
        assert_eq!(durations, vec![4, 5, 6]);
    }

    #[test]
    fn rejected_genome_leaves_schedules_untouched() {
        let mut sim = Simulation::new(&ring(1), &[], 1, 1).unwrap();
        let mut schedules = BTreeMap::new();
        schedules.insert(IntersectionId(0), vec![7]);
        let partial = Genome::new(schedules.clone(), 0.0, 10).unwrap();
        assert!(sim.load_schedule(&partial).is_err());

        schedules.insert(IntersectionId(1), vec![3]);
        schedules.insert(IntersectionId(2), vec![0]);
        let zero = Genome::new(schedules, 0.0, 10).unwrap();
        assert!(matches!(
            sim.load_schedule(&zero),
            Err(Error::InvalidDuration { street }) if street == "b-c"
        ));

        let durations: Vec<_> = sim.iter_intersections().map(|n| n.durations()[0]).collect();
        assert_eq!(durations, vec![1, 1, 1]);
    }

    #[test]
    fn step_past_horizon_does_nothing() {
        let mut sim = Simulation::new(&ring(1), &[route(&["a-b", "b-c"])], 100, 3).unwrap();
        sim.run();
        assert_eq!(sim.tick(), 3);
        let score = sim.score();
        sim.step();
        sim.step();
        assert_eq!(sim.tick(), 3);
        assert_eq!(sim.score(), score);
    }

    #[test]
    fn zero_duration_is_rejected() {
        let mut sim = Simulation::new(&ring(1), &[], 1, 1).unwrap();
        assert!(matches!(
            sim.set_schedule("b-c", 0),
            Err(Error::InvalidDuration { street }) if street == "b-c"
        ));
    }
}
