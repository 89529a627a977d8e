use crate::{Street, StreetId, VehicleId};
use std::sync::Arc;

/// A simulated vehicle.
#[derive(Clone, Debug)]
pub struct Vehicle {
    /// The vehicle's ID.
    id: VehicleId,
    /// The vehicle's full route, shared with the simulation that spawned it.
    route: Arc<[StreetId]>,
    /// The index of the next street on the route still to be entered.
    next: usize,
    /// The street the vehicle is driving along or queued at the end of.
    street: StreetId,
    /// The number of ticks before the vehicle reaches the end of its street.
    distance: u32,
    /// Whether the vehicle passed a light during the current tick.
    departing: bool,
}

/// What happens to a vehicle once its light lets it through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Passage {
    /// The vehicle has moved onto its next street.
    Continues,
    /// The vehicle has entered the last street of its route.
    Finished,
}

impl Vehicle {
    /// Creates a vehicle queued at the end of the first street of its route.
    ///
    /// The route must not be empty.
    pub(crate) fn new(id: VehicleId, route: Arc<[StreetId]>) -> Self {
        let street = *route.first().expect("Vehicle route is empty");
        Self {
            id,
            route,
            next: 1,
            street,
            distance: 0,
            departing: false,
        }
    }

    /// Gets the vehicle's ID.
    pub fn id(&self) -> VehicleId {
        self.id
    }

    /// The street the vehicle is on.
    pub fn street(&self) -> StreetId {
        self.street
    }

    /// The number of ticks left before the vehicle joins the queue
    /// at the end of its current street.
    pub fn distance_remaining(&self) -> u32 {
        self.distance
    }

    /// The streets the vehicle has yet to enter.
    pub fn remaining_route(&self) -> &[StreetId] {
        &self.route[self.next.min(self.route.len())..]
    }

    /// Whether the vehicle is driving rather than waiting at a light.
    pub fn is_travelling(&self) -> bool {
        self.distance > 0
    }

    /// Moves the vehicle through the light at the end of its street.
    ///
    /// A vehicle finishes when it enters the last street on its route. A vehicle
    /// whose route held a single street finishes as soon as it is let through.
    pub(crate) fn pass_light(&mut self, streets: &[Street]) -> Passage {
        let Some(&street) = self.route.get(self.next) else {
            self.next = self.route.len();
            return Passage::Finished;
        };
        self.street = street;
        self.next += 1;
        if self.next < self.route.len() {
            self.distance = streets[street.0].length;
            self.departing = true;
            Passage::Continues
        } else {
            Passage::Finished
        }
    }

    /// Drives the vehicle for one tick. Returns `true` when it has just
    /// reached the end of its street and needs to join the queue there.
    ///
    /// A vehicle let through a light this tick starts driving on the next one.
    pub(crate) fn travel(&mut self) -> bool {
        if self.departing {
            self.departing = false;
            return false;
        }
        if self.distance == 0 {
            return false;
        }
        self.distance -= 1;
        self.distance == 0
    }
}
