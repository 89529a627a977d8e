use crate::{IntersectionId, StreetId, VehicleId};
use smallvec::SmallVec;
use std::collections::VecDeque;

/// A signalled intersection.
///
/// Each incoming street owns a slot, fixed when the street is registered.
/// The schedule, the queues and the phase index all use that slot ordering.
#[derive(Clone, Debug)]
pub struct Intersection {
    /// The intersection ID.
    id: IntersectionId,
    /// The incoming streets, in slot order.
    incoming: SmallVec<[StreetId; 4]>,
    /// The green duration of each slot in ticks.
    durations: SmallVec<[u32; 4]>,
    /// The vehicles waiting at the end of each incoming street.
    queues: SmallVec<[VecDeque<VehicleId>; 4]>,
    /// The slot currently showing green.
    phase: usize,
    /// The number of ticks since the current phase turned green.
    counter: u32,
}

impl Intersection {
    /// Creates an intersection with no incoming streets.
    pub(crate) fn new(id: IntersectionId) -> Self {
        Self {
            id,
            incoming: SmallVec::new(),
            durations: SmallVec::new(),
            queues: SmallVec::new(),
            phase: 0,
            counter: 0,
        }
    }

    /// Gets the intersection's ID.
    pub fn id(&self) -> IntersectionId {
        self.id
    }

    /// Registers an incoming street with the given green duration
    /// and returns the slot assigned to it.
    pub(crate) fn add_incoming(&mut self, street: StreetId, duration: u32) -> usize {
        self.incoming.push(street);
        self.durations.push(duration);
        self.queues.push(VecDeque::new());
        self.restart_cycle();
        self.incoming.len() - 1
    }

    /// The incoming streets in slot order.
    pub fn incoming(&self) -> &[StreetId] {
        &self.incoming
    }

    /// The green duration of every slot.
    pub fn durations(&self) -> &[u32] {
        &self.durations
    }

    /// Overwrites the green duration of one slot.
    pub(crate) fn set_duration(&mut self, slot: usize, duration: u32) {
        self.durations[slot] = duration;
        self.restart_cycle();
    }

    /// Overwrites the green durations of every slot at once.
    pub(crate) fn set_durations(&mut self, durations: &[u32]) {
        self.durations.copy_from_slice(durations);
        self.restart_cycle();
    }

    /// Adds a vehicle to the back of the queue of an incoming street.
    pub(crate) fn enqueue(&mut self, slot: usize, vehicle: VehicleId) {
        self.queues[slot].push_back(vehicle);
    }

    /// The slot currently showing green.
    pub fn green_slot(&self) -> usize {
        self.phase
    }

    /// The street currently showing green.
    pub fn green_street(&self) -> StreetId {
        self.incoming[self.phase]
    }

    /// The number of vehicles waiting on a slot.
    pub fn queue_len(&self, slot: usize) -> usize {
        self.queues[slot].len()
    }

    /// The number of vehicles waiting across every incoming street.
    pub fn waiting(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }

    /// Advances the signal by one tick, returning the vehicle let through, if any.
    ///
    /// The phase changes before the queue is served, so the first vehicle of a
    /// street can pass on the same tick its light turns green.
    pub(crate) fn step(&mut self) -> Option<VehicleId> {
        if self.counter >= self.durations[self.phase] {
            self.phase = (self.phase + 1) % self.durations.len();
            self.counter = 0;
        }
        let released = self.queues[self.phase].pop_front();
        self.counter += 1;
        released
    }

    /// Clears the queues and returns the cycle to its first slot.
    /// The durations are left untouched.
    pub(crate) fn reset(&mut self) {
        for queue in &mut self.queues {
            queue.clear();
        }
        self.restart_cycle();
    }

    fn restart_cycle(&mut self) {
        self.phase = 0;
        self.counter = 0;
    }
}
