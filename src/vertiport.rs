use crate::aircraft::{Aircraft, AircraftId};
use crate::geo::Position;
use crate::passenger::{Passenger, PassengerId};
use crate::time::Time;
use std::collections::HashMap;
use std::fmt;
use std::fmt::Formatter;
use std::sync::Arc;

pub type VertiportId = Arc<str>;

/// Waiting passengers bound for the same next stop.
#[derive(Debug, Clone, PartialEq)]
pub struct DemandGroup {
    pub destination: VertiportId,
    pub count: usize,
    pub max_wait_time: Time,
    /// in boarding (arrival) order
    pub passengers: Vec<PassengerId>,
}

#[derive(Debug, Clone)]
pub struct Vertiport {
    pub id: VertiportId,
    pub name: String,
    pub location: Position,
    parked: Vec<AircraftId>,
    waiting: Vec<PassengerId>,
}

impl fmt::Display for Vertiport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl Vertiport {
    pub fn new(id: VertiportId, name: String, location: Position) -> Vertiport {
        Vertiport {
            id,
            name,
            location,
            parked: vec![],
            waiting: vec![],
        }
    }

    pub fn parked(&self) -> &[AircraftId] {
        &self.parked
    }

    pub fn waiting(&self) -> &[PassengerId] {
        &self.waiting
    }

    pub fn is_parked(&self, aircraft: &AircraftId) -> bool {
        self.parked.contains(aircraft)
    }

    pub fn add_passenger(&mut self, passenger: PassengerId) {
        if !self.waiting.contains(&passenger) {
            self.waiting.push(passenger);
        }
    }

    pub fn remove_passenger(&mut self, passenger: PassengerId) {
        self.waiting.retain(|p| *p != passenger);
    }

    pub fn park_aircraft(&mut self, aircraft: &AircraftId) {
        if !self.is_parked(aircraft) {
            self.parked.push(aircraft.clone());
        }
    }

    pub fn remove_aircraft(&mut self, aircraft: &AircraftId) {
        self.parked.retain(|id| id != aircraft);
    }

    /// Parked aircraft the scheduler may pick right away, in parking order.
    pub fn available_aircraft(&self, fleet: &HashMap<AircraftId, Aircraft>) -> Vec<AircraftId> {
        self.parked
            .iter()
            .filter(|id| fleet.get(*id).is_some_and(|ac| ac.is_available()))
            .cloned()
            .collect()
    }

    /// Groups waiting passengers by their next stop. Groups come out in the
    /// order their first passenger arrived.
    pub fn check_demand(&self, passengers: &HashMap<PassengerId, Passenger>) -> Vec<DemandGroup> {
        let mut groups: Vec<DemandGroup> = vec![];
        for passenger in self.waiting.iter().filter_map(|id| passengers.get(id)) {
            let Some(next) = passenger.next_stop() else {
                continue;
            };
            match groups.iter_mut().find(|g| g.destination == *next) {
                Some(group) => {
                    group.count += 1;
                    group.max_wait_time = group.max_wait_time.max(passenger.wait_time);
                    group.passengers.push(passenger.id);
                }
                None => groups.push(DemandGroup {
                    destination: next.clone(),
                    count: 1,
                    max_wait_time: passenger.wait_time,
                    passengers: vec![passenger.id],
                }),
            }
        }
        groups
    }
}
