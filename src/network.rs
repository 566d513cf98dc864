use crate::aircraft::{Aircraft, AircraftId, AircraftState, ChargePolicy};
use crate::airspace::{Airspace, AirspaceId};
use crate::charger::ChargerModel;
use crate::error::{ConfigError, SimError};
use crate::mission::VehicleType;
use crate::passenger::{Passenger, PassengerId, PassengerState};
use crate::record::{AircraftSnapshot, DistributionRecord, EventLog, LiveState};
use crate::time::Time;
use crate::vertiport::{Vertiport, VertiportId};
use log::trace;
use pathfinding::prelude::dijkstra;
use std::collections::HashMap;

/// Owns every entity of a run. Cross references between entities are ids
/// resolved through the lookups here.
#[derive(Debug)]
pub struct Network {
    pub vertiports: HashMap<VertiportId, Vertiport>,
    pub airspaces: HashMap<AirspaceId, Airspace>,
    pub aircraft: HashMap<AircraftId, Aircraft>,
    pub passengers: HashMap<PassengerId, Passenger>,
    chargers: HashMap<VehicleType, ChargerModel>,
    vertiport_order: Vec<VertiportId>,
    aircraft_order: Vec<AircraftId>,
    initial_allocation: HashMap<VertiportId, usize>,
    pub charge_policy: ChargePolicy,
}

impl Network {
    pub fn new(charge_policy: ChargePolicy) -> Network {
        Network {
            vertiports: HashMap::new(),
            airspaces: HashMap::new(),
            aircraft: HashMap::new(),
            passengers: HashMap::new(),
            chargers: HashMap::new(),
            vertiport_order: vec![],
            aircraft_order: vec![],
            initial_allocation: HashMap::new(),
            charge_policy,
        }
    }

    pub fn add_vertiport(&mut self, vertiport: Vertiport) -> Result<(), ConfigError> {
        if self.vertiports.contains_key(&vertiport.id) {
            return Err(ConfigError::Duplicate {
                kind: "vertiport",
                id: vertiport.id.to_string(),
            });
        }
        self.vertiport_order.push(vertiport.id.clone());
        self.vertiports.insert(vertiport.id.clone(), vertiport);
        Ok(())
    }

    pub fn add_airspace(&mut self, airspace: Airspace) -> Result<(), ConfigError> {
        for end in [&airspace.origin, &airspace.destination] {
            if !self.vertiports.contains_key(end) {
                return Err(ConfigError::UnknownVertiport(end.clone()));
            }
        }
        if airspace.capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                origin: airspace.origin.clone(),
                destination: airspace.destination.clone(),
            });
        }
        let id = airspace.id();
        if self.airspaces.contains_key(&id) {
            return Err(ConfigError::Duplicate {
                kind: "airspace",
                id: format!("{}->{}", id.0, id.1),
            });
        }
        self.airspaces.insert(id, airspace);
        Ok(())
    }

    pub fn add_charger(&mut self, vehicle: VehicleType, charger: ChargerModel) {
        self.chargers.insert(vehicle, charger);
    }

    /// Registers the aircraft parked at its origin vertiport.
    pub fn add_aircraft(&mut self, aircraft: Aircraft) -> Result<(), ConfigError> {
        if self.aircraft.contains_key(&aircraft.id) {
            return Err(ConfigError::Duplicate {
                kind: "aircraft",
                id: aircraft.id.to_string(),
            });
        }
        if !self.chargers.contains_key(&aircraft.vehicle) {
            return Err(ConfigError::UnknownVehicle(aircraft.vehicle.clone()));
        }
        let vertiport = self
            .vertiports
            .get_mut(&aircraft.origin_vertiport)
            .ok_or_else(|| ConfigError::UnknownVertiport(aircraft.origin_vertiport.clone()))?;
        vertiport.park_aircraft(&aircraft.id);
        self.aircraft_order.push(aircraft.id.clone());
        self.aircraft.insert(aircraft.id.clone(), aircraft);
        Ok(())
    }

    /// Fixes the rebalancing baseline to the current parked counts. Only the
    /// first call has an effect.
    pub fn record_initial_allocation(&mut self) {
        if !self.initial_allocation.is_empty() {
            return;
        }
        self.initial_allocation = self
            .vertiports
            .iter()
            .map(|(id, v)| (id.clone(), v.parked().len()))
            .collect();
    }

    #[cfg(test)]
    pub fn set_initial_allocation(&mut self, vertiport: &str, target: usize) {
        self.initial_allocation.insert(VertiportId::from(vertiport), target);
    }

    pub fn initial_allocation(&self, vertiport: &VertiportId) -> usize {
        self.initial_allocation.get(vertiport).copied().unwrap_or(0)
    }

    pub fn vertiport_order(&self) -> &[VertiportId] {
        &self.vertiport_order
    }

    pub fn aircraft_order(&self) -> &[AircraftId] {
        &self.aircraft_order
    }

    pub fn vertiport(&self, id: &VertiportId) -> Result<&Vertiport, SimError> {
        self.vertiports
            .get(id)
            .ok_or_else(|| SimError::UnknownVertiport(id.clone()))
    }

    pub fn vertiport_mut(&mut self, id: &VertiportId) -> Result<&mut Vertiport, SimError> {
        self.vertiports
            .get_mut(id)
            .ok_or_else(|| SimError::UnknownVertiport(id.clone()))
    }

    pub fn aircraft(&self, id: &AircraftId) -> Result<&Aircraft, SimError> {
        self.aircraft.get(id).ok_or_else(|| SimError::UnknownAircraft(id.clone()))
    }

    pub fn aircraft_mut(&mut self, id: &AircraftId) -> Result<&mut Aircraft, SimError> {
        self.aircraft
            .get_mut(id)
            .ok_or_else(|| SimError::UnknownAircraft(id.clone()))
    }

    pub fn passenger(&self, id: PassengerId) -> Result<&Passenger, SimError> {
        self.passengers.get(&id).ok_or(SimError::UnknownPassenger(id))
    }

    pub fn passenger_mut(&mut self, id: PassengerId) -> Result<&mut Passenger, SimError> {
        self.passengers.get_mut(&id).ok_or(SimError::UnknownPassenger(id))
    }

    pub fn airspace(&self, origin: &VertiportId, destination: &VertiportId) -> Result<&Airspace, SimError> {
        self.airspaces
            .get(&(origin.clone(), destination.clone()))
            .ok_or_else(|| SimError::NoAirspace {
                origin: origin.clone(),
                destination: destination.clone(),
            })
    }

    pub fn airspace_mut(&mut self, origin: &VertiportId, destination: &VertiportId) -> Result<&mut Airspace, SimError> {
        self.airspaces
            .get_mut(&(origin.clone(), destination.clone()))
            .ok_or_else(|| SimError::NoAirspace {
                origin: origin.clone(),
                destination: destination.clone(),
            })
    }

    pub fn charger(&self, vehicle: &VehicleType) -> Result<&ChargerModel, SimError> {
        self.chargers
            .get(vehicle)
            .ok_or_else(|| SimError::MissingCharger(vehicle.clone()))
    }

    /// Vertiports reachable over one airspace, in vertiport order.
    pub fn outbound(&self, vertiport: &VertiportId) -> Vec<VertiportId> {
        self.vertiport_order
            .iter()
            .filter(|to| self.airspaces.contains_key(&(vertiport.clone(), (*to).clone())))
            .cloned()
            .collect()
    }

    /// Vertiports with an airspace into `vertiport`, in vertiport order.
    pub fn inbound_neighbors(&self, vertiport: &VertiportId) -> Vec<VertiportId> {
        self.vertiport_order
            .iter()
            .filter(|from| self.airspaces.contains_key(&((*from).clone(), vertiport.clone())))
            .cloned()
            .collect()
    }

    /// Fastest chain of stops from `origin` to `destination`, both included.
    pub fn compute_itinerary(
        &self,
        origin: &VertiportId,
        destination: &VertiportId,
    ) -> Result<Vec<VertiportId>, SimError> {
        let no_route = || SimError::NoRoute {
            origin: origin.clone(),
            destination: destination.clone(),
        };
        if origin == destination || !self.vertiports.contains_key(destination) {
            return Err(no_route());
        }
        let (path, _) = dijkstra(
            origin,
            |node| {
                self.outbound(node)
                    .into_iter()
                    .filter_map(|next| {
                        self.airspaces
                            .get(&(node.clone(), next.clone()))
                            .map(|a| (next, a.flight_time().0))
                    })
                    .collect::<Vec<_>>()
            },
            |node| node == destination,
        )
        .ok_or_else(no_route)?;
        Ok(path)
    }

    /// Registers a passenger waiting at the first stop of their itinerary.
    pub fn add_passenger(&mut self, passenger: Passenger) -> Result<(), SimError> {
        let vertiport = self
            .vertiports
            .get_mut(passenger.current_stop())
            .ok_or_else(|| SimError::UnknownVertiport(passenger.current_stop().clone()))?;
        vertiport.add_passenger(passenger.id);
        self.passengers.insert(passenger.id, passenger);
        Ok(())
    }

    /// Drops a passenger whose trip record is final.
    pub fn remove_passenger(&mut self, passenger: PassengerId) -> Option<Passenger> {
        for vertiport in self.vertiports.values_mut() {
            vertiport.remove_passenger(passenger);
        }
        self.passengers.remove(&passenger)
    }

    pub fn board_passenger(&mut self, passenger: PassengerId, aircraft: &AircraftId, now: Time) -> Result<(), SimError> {
        let ac = self
            .aircraft
            .get_mut(aircraft)
            .ok_or_else(|| SimError::UnknownAircraft(aircraft.clone()))?;
        let p = self
            .passengers
            .get_mut(&passenger)
            .ok_or(SimError::UnknownPassenger(passenger))?;
        if let Some(vertiport) = self.vertiports.get_mut(p.current_stop()) {
            vertiport.remove_passenger(passenger);
        }
        p.board(aircraft, now);
        ac.current_passengers.push(passenger);
        Ok(())
    }

    /// Claims a parked aircraft for a launch issued this tick and books it
    /// into the corridor toward `destination` until it enters.
    pub fn reserve_aircraft(&mut self, aircraft: &AircraftId, destination: &VertiportId, now: Time) -> Result<(), SimError> {
        let ac = self
            .aircraft
            .get_mut(aircraft)
            .ok_or_else(|| SimError::UnknownAircraft(aircraft.clone()))?;
        let charger = self
            .chargers
            .get(&ac.vehicle)
            .ok_or_else(|| SimError::MissingCharger(ac.vehicle.clone()))?;
        ac.reserve(now, charger, self.charge_policy)?;
        let origin = ac.origin_vertiport.clone();
        self.airspace_mut(&origin, destination)?.book(aircraft);
        Ok(())
    }

    /// Flying aircraft headed for `vertiport`, in fleet order.
    pub fn inbound_aircraft(&self, vertiport: &VertiportId) -> Vec<AircraftId> {
        self.aircraft_order
            .iter()
            .filter(|id| {
                self.aircraft.get(*id).is_some_and(|ac| {
                    ac.state == AircraftState::Flying && ac.destination_vertiport.as_ref() == Some(vertiport)
                })
            })
            .cloned()
            .collect()
    }

    /// Parked plus inbound aircraft.
    pub fn supply(&self, vertiport: &VertiportId) -> usize {
        let parked = self.vertiports.get(vertiport).map(|v| v.parked().len()).unwrap_or(0);
        parked + self.inbound_aircraft(vertiport).len()
    }

    /// See [`Airspace::time_until_availability`]; occupants are asked for
    /// their remaining flight time.
    pub fn time_until_availability(&self, airspace: &AirspaceId, margin: Time) -> Result<Option<Time>, SimError> {
        let airspace = self.airspace(&airspace.0, &airspace.1)?;
        airspace.time_until_availability(margin, |id| Ok(self.aircraft(id)?.expected_arrival()?.0))
    }

    /// Periodic refresh: accrues passenger waits and charges parked aircraft.
    pub fn update_network(&mut self, now: Time, log: &mut EventLog) -> Result<(), SimError> {
        let policy = self.charge_policy;
        for vertiport_id in &self.vertiport_order {
            let Some(vertiport) = self.vertiports.get(vertiport_id) else {
                continue;
            };
            for pid in vertiport.waiting() {
                if let Some(passenger) = self.passengers.get_mut(pid) {
                    passenger.update_wait_time(now);
                }
            }
            for aircraft_id in vertiport.parked() {
                let ac = self
                    .aircraft
                    .get_mut(aircraft_id)
                    .ok_or_else(|| SimError::UnknownAircraft(aircraft_id.clone()))?;
                match ac.state {
                    AircraftState::Charge => {
                        let charger = self
                            .chargers
                            .get(&ac.vehicle)
                            .ok_or_else(|| SimError::MissingCharger(ac.vehicle.clone()))?;
                        ac.update_soc(now, charger, policy)?;
                        trace!("{}: {} charging at {}, soc {:.3}", now, ac.id, vertiport_id, ac.soc());
                    }
                    AircraftState::Idle if ac.soc() < policy.full_soc => {
                        log.anomaly(
                            now,
                            format!(
                                "aircraft {} is idle at {} with soc {:.3} below full charge",
                                ac.id,
                                vertiport_id,
                                ac.soc()
                            ),
                        );
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    pub fn distribution(&self, now: Time) -> Vec<DistributionRecord> {
        self.vertiport_order
            .iter()
            .filter_map(|id| self.vertiports.get(id))
            .map(|v| DistributionRecord {
                time: now,
                vertiport: v.id.clone(),
                parked: v.parked().len(),
                inbound: self.inbound_aircraft(&v.id).len(),
            })
            .collect()
    }

    pub fn live_state(&self, now: Time) -> LiveState {
        LiveState {
            time: now,
            aircraft: self
                .aircraft_order
                .iter()
                .filter_map(|id| self.aircraft.get(id))
                .filter(|ac| ac.state == AircraftState::Flying)
                .map(AircraftSnapshot::from)
                .collect(),
        }
    }

    /// Human readable descriptions of broken resource invariants; empty when
    /// the network is consistent.
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut violations = vec![];

        for airspace in self.airspaces.values() {
            if airspace.occupants().len() > airspace.capacity {
                violations.push(format!(
                    "airspace {}->{} holds {} aircraft, capacity {}",
                    airspace.origin,
                    airspace.destination,
                    airspace.occupants().len(),
                    airspace.capacity
                ));
            }
        }

        for airspace in self.airspaces.values() {
            for id in airspace.booked() {
                let waiting = self
                    .vertiports
                    .get(&airspace.origin)
                    .is_some_and(|v| v.is_parked(id))
                    && self.aircraft.get(id).is_some_and(|ac| ac.is_reserved());
                if !waiting {
                    violations.push(format!(
                        "aircraft {} is booked into {}->{} but not reserved at its origin",
                        id, airspace.origin, airspace.destination
                    ));
                }
            }
        }

        for id in &self.aircraft_order {
            let parked = self.vertiports.values().filter(|v| v.is_parked(id)).count();
            let airborne = self.airspaces.values().filter(|a| a.contains(id)).count();
            if parked + airborne != 1 {
                violations.push(format!(
                    "aircraft {} is parked at {} vertiports and flies in {} airspaces",
                    id, parked, airborne
                ));
            }
            if let Some(ac) = self.aircraft.get(id) {
                if (ac.state == AircraftState::Flying) != (airborne == 1) {
                    violations.push(format!("aircraft {} is {} but airborne count is {}", id, ac.state, airborne));
                }
                if ac.current_passengers.len() > ac.passenger_capacity {
                    violations.push(format!(
                        "aircraft {} carries {} passengers, capacity {}",
                        id,
                        ac.current_passengers.len(),
                        ac.passenger_capacity
                    ));
                }
            }
        }

        for passenger in self.passengers.values() {
            let waiting_at = self
                .vertiports
                .values()
                .filter(|v| v.waiting().contains(&passenger.id))
                .count();
            let expected = usize::from(passenger.state == PassengerState::Waiting);
            if waiting_at != expected {
                violations.push(format!(
                    "passenger {} is {:?} but waits at {} vertiports",
                    passenger.id, passenger.state, waiting_at
                ));
            }
        }

        violations
    }

    pub fn assert_invariants(&self) {
        debug_assert!(
            self.invariant_violations().is_empty(),
            "network invariants violated: {:?}",
            self.invariant_violations()
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::aircraft::AircraftState;
    use crate::error::SimError;
    use crate::record::EventLog;
    use crate::scheduler::tests::utils::{add_aircraft, add_airspace, add_vertiport, id, network};
    use crate::time::Time;

    #[test]
    fn test_itinerary_prefers_fastest_chain() {
        let mut net = network();
        for v in ["A", "B", "C"] {
            add_vertiport(&mut net, v);
        }
        add_airspace(&mut net, "A", "C", 1, 2000, 10.0);
        add_airspace(&mut net, "A", "B", 1, 600, 5.0);
        add_airspace(&mut net, "B", "C", 1, 600, 5.0);

        assert_eq!(
            vec![id("A"), id("B"), id("C")],
            net.compute_itinerary(&id("A"), &id("C")).unwrap()
        );
        assert_eq!(vec![id("A"), id("B")], net.compute_itinerary(&id("A"), &id("B")).unwrap());
    }

    #[test]
    fn test_unreachable_or_self_route_fails() {
        let mut net = network();
        for v in ["A", "B"] {
            add_vertiport(&mut net, v);
        }
        add_airspace(&mut net, "A", "B", 1, 600, 5.0);
        assert!(matches!(
            net.compute_itinerary(&id("B"), &id("A")),
            Err(SimError::NoRoute { .. })
        ));
        assert!(net.compute_itinerary(&id("A"), &id("A")).is_err());
    }

    #[test]
    fn test_neighbors_follow_vertiport_order() {
        let mut net = network();
        for v in ["A", "B", "C"] {
            add_vertiport(&mut net, v);
        }
        add_airspace(&mut net, "C", "A", 1, 600, 5.0);
        add_airspace(&mut net, "B", "A", 1, 600, 5.0);
        add_airspace(&mut net, "A", "C", 1, 600, 5.0);
        assert_eq!(vec![id("B"), id("C")], net.inbound_neighbors(&id("A")));
        assert_eq!(vec![id("C")], net.outbound(&id("A")));
    }

    #[test]
    fn test_refresh_charges_and_flags_idle_below_full() {
        let mut net = network();
        add_vertiport(&mut net, "A");
        add_aircraft(&mut net, "AC_1", "A", 0.5);
        add_aircraft(&mut net, "AC_2", "A", 0.6);
        assert_eq!(AircraftState::Charge, net.aircraft[&id("AC_1")].state);
        net.aircraft.get_mut(&id("AC_2")).unwrap().state = AircraftState::Idle;

        let mut log = EventLog::default();
        net.update_network(Time(600), &mut log).unwrap();

        assert!(net.aircraft[&id("AC_1")].soc() > 0.5);
        assert_eq!(0.6, net.aircraft[&id("AC_2")].soc());
        let anomalies: Vec<_> = log.anomalies().collect();
        assert_eq!(1, anomalies.len());
        assert!(anomalies[0].contains("AC_2"));
    }

    #[test]
    fn test_invariants_catch_double_membership() {
        let mut net = network();
        for v in ["A", "B"] {
            add_vertiport(&mut net, v);
        }
        add_airspace(&mut net, "A", "B", 1, 600, 5.0);
        add_aircraft(&mut net, "AC_1", "A", 1.0);
        assert!(net.invariant_violations().is_empty());

        net.airspaces.get_mut(&(id("A"), id("B"))).unwrap().enter(&id("AC_1"));
        assert!(!net.invariant_violations().is_empty());
    }

    #[test]
    fn test_initial_allocation_is_fixed_once() {
        let mut net = network();
        add_vertiport(&mut net, "A");
        add_aircraft(&mut net, "AC_1", "A", 1.0);
        net.record_initial_allocation();
        add_aircraft(&mut net, "AC_2", "A", 1.0);
        net.record_initial_allocation();
        assert_eq!(1, net.initial_allocation(&id("A")));
        assert_eq!(2, net.supply(&id("A")));
    }
}
