use crate::aircraft::AircraftId;
use crate::error::SimError;
use crate::mission::{FlightPlan, RouteId, VehicleType};
use crate::time::Time;
use crate::vertiport::VertiportId;
use std::collections::HashMap;
use std::sync::Arc;

pub type AirspaceId = (VertiportId, VertiportId);

/// Directed, capacity-limited corridor between two vertiports.
#[derive(Debug, Clone)]
pub struct Airspace {
    pub origin: VertiportId,
    pub destination: VertiportId,
    pub capacity: usize,
    pub route: RouteId,
    plans: HashMap<VehicleType, Arc<FlightPlan>>,
    occupants: Vec<AircraftId>,
    booked: Vec<AircraftId>,
}

impl Airspace {
    pub fn new(
        origin: VertiportId,
        destination: VertiportId,
        capacity: usize,
        route: RouteId,
        plans: HashMap<VehicleType, Arc<FlightPlan>>,
    ) -> Airspace {
        Airspace {
            origin,
            destination,
            capacity,
            route,
            plans,
            occupants: vec![],
            booked: vec![],
        }
    }

    pub fn id(&self) -> AirspaceId {
        (self.origin.clone(), self.destination.clone())
    }

    pub fn occupants(&self) -> &[AircraftId] {
        &self.occupants
    }

    /// Reserved aircraft ordered into the corridor that have not entered yet.
    pub fn booked(&self) -> &[AircraftId] {
        &self.booked
    }

    pub fn book(&mut self, aircraft: &AircraftId) {
        if !self.booked.contains(aircraft) {
            self.booked.push(aircraft.clone());
        }
    }

    pub fn contains(&self, aircraft: &AircraftId) -> bool {
        self.occupants.contains(aircraft)
    }

    pub fn can_accommodate(&self) -> bool {
        self.occupants.len() < self.capacity
    }

    /// Admits the aircraft if a slot is free, releasing its booking. A refused
    /// caller has to wait and try again; nothing is queued here.
    pub fn enter(&mut self, aircraft: &AircraftId) -> bool {
        if !self.contains(aircraft) {
            if !self.can_accommodate() {
                return false;
            }
            self.occupants.push(aircraft.clone());
        }
        self.booked.retain(|id| id != aircraft);
        true
    }

    pub fn exit(&mut self, aircraft: &AircraftId) {
        self.occupants.retain(|id| id != aircraft);
    }

    pub fn flight_plan(&self, vehicle: &VehicleType) -> Option<&Arc<FlightPlan>> {
        self.plans.get(vehicle)
    }

    /// Shortest flight time over the vehicle types flying this corridor; used
    /// as the edge weight for itineraries.
    pub fn flight_time(&self) -> Time {
        self.plans
            .values()
            .map(|plan| plan.total_duration())
            .min()
            .unwrap_or(Time::ZERO)
    }

    /// Earliest time until an occupant is expected to free its slot, less the
    /// entry margin. `None` when nobody occupies the corridor.
    pub fn time_until_availability<F>(&self, margin: Time, mut remaining: F) -> Result<Option<Time>, SimError>
    where
        F: FnMut(&AircraftId) -> Result<Time, SimError>,
    {
        let mut earliest: Option<Time> = None;
        for aircraft in &self.occupants {
            let left = remaining(aircraft)?;
            earliest = Some(earliest.map_or(left, |t| t.min(left)));
        }
        Ok(earliest.map(|t| t.saturating_sub(margin)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Arc<str> {
        Arc::from(s)
    }

    fn airspace(capacity: usize) -> Airspace {
        Airspace::new(id("A"), id("B"), capacity, id("wp_AB"), HashMap::new())
    }

    #[test]
    fn test_admission_respects_capacity() {
        let mut airspace = airspace(2);
        assert!(airspace.enter(&id("AC_1")));
        assert!(airspace.enter(&id("AC_2")));
        assert!(!airspace.can_accommodate());
        assert!(!airspace.enter(&id("AC_3")));
        assert_eq!(2, airspace.occupants().len());
    }

    #[test]
    fn test_reentry_does_not_duplicate() {
        let mut airspace = airspace(2);
        assert!(airspace.enter(&id("AC_1")));
        assert!(airspace.enter(&id("AC_1")));
        assert_eq!(1, airspace.occupants().len());
    }

    #[test]
    fn test_entry_releases_booking() {
        let mut airspace = airspace(1);
        airspace.book(&id("AC_1"));
        airspace.book(&id("AC_1"));
        airspace.book(&id("AC_2"));
        assert_eq!(2, airspace.booked().len());

        assert!(airspace.enter(&id("AC_1")));
        assert_eq!(&[id("AC_2")], airspace.booked());

        assert!(!airspace.enter(&id("AC_2")));
        assert_eq!(&[id("AC_2")], airspace.booked());
    }

    #[test]
    fn test_exit_is_unconditional() {
        let mut airspace = airspace(1);
        airspace.exit(&id("AC_9"));
        airspace.enter(&id("AC_1"));
        airspace.exit(&id("AC_1"));
        assert!(airspace.can_accommodate());
    }

    #[test]
    fn test_time_until_availability_takes_minimum_less_margin() {
        let mut airspace = airspace(2);
        assert_eq!(None, airspace.time_until_availability(Time(20), |_| Ok(Time(100))).unwrap());

        airspace.enter(&id("AC_1"));
        airspace.enter(&id("AC_2"));
        let wait = airspace
            .time_until_availability(Time(20), |ac| {
                Ok(if &**ac == "AC_1" { Time(300) } else { Time(120) })
            })
            .unwrap();
        assert_eq!(Some(Time(100)), wait);

        let clamped = airspace.time_until_availability(Time(20), |_| Ok(Time(5))).unwrap();
        assert_eq!(Some(Time::ZERO), clamped);
    }
}
