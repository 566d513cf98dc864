use super::{Admission, LaunchOrder, Scheduler};
use crate::aircraft::{Aircraft, AircraftId, AircraftState};
use crate::error::SimError;
use crate::mission::FlightPlan;
use crate::network::Network;
use crate::record::{EventLog, FlightKind, SimEvent, SkipReason};
use crate::time::Time;
use crate::vertiport::{DemandGroup, VertiportId};
use log::{debug, info};

/// Which rule of the selection order produced the aircraft, or why none did.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Ready(AircraftId),
    Charged(AircraftId),
    NoAircraft,
    InsufficientCharge,
}

impl Scheduler {
    pub fn should_dispatch(&self, group: &DemandGroup) -> bool {
        group.count >= self.passenger_threshold || group.max_wait_time >= self.max_wait_time
    }

    /// Walks the vertiports in load order and launches one aircraft for each
    /// demand group that is large enough or has waited long enough.
    pub fn make_dispatch_decision(
        &self,
        net: &mut Network,
        now: Time,
        log: &mut EventLog,
        orders: &mut Vec<LaunchOrder>,
    ) -> Result<(), SimError> {
        for vertiport in net.vertiport_order().to_vec() {
            let groups = net.vertiport(&vertiport)?.check_demand(&net.passengers);
            for group in groups.into_iter().filter(|g| self.should_dispatch(g)) {
                let aircraft = match self.select_aircraft(net, &vertiport, &group.destination)? {
                    Selection::Ready(id) | Selection::Charged(id) => id,
                    Selection::NoAircraft => {
                        let expected_wait = self.expected_wait_time(net, &vertiport, &group.destination)?;
                        info!(
                            "{}: No aircraft at {} for {} waiting passengers to {}; expected wait {}",
                            now,
                            vertiport,
                            group.count,
                            group.destination,
                            expected_wait.map_or("unknown".to_string(), |t| format!("{}s", t.0))
                        );
                        skip(log, now, &vertiport, &group.destination, SkipReason::NoAircraft, expected_wait);
                        continue;
                    }
                    Selection::InsufficientCharge => {
                        debug!(
                            "{}: No aircraft at {} charged enough to fly to {}",
                            now, vertiport, group.destination
                        );
                        skip(log, now, &vertiport, &group.destination, SkipReason::InsufficientCharge, None);
                        continue;
                    }
                };

                let delay = match self.admission(net, &vertiport, &group.destination)? {
                    Admission::Now => Time::ZERO,
                    Admission::After(wait) => {
                        log.push(SimEvent::AirspaceWait {
                            at: now,
                            aircraft: aircraft.clone(),
                            origin: vertiport.clone(),
                            destination: group.destination.clone(),
                            wait,
                        });
                        wait
                    }
                    Admission::Full => {
                        debug!(
                            "{}: Airspace {}->{} is full for this tick",
                            now, vertiport, group.destination
                        );
                        skip(log, now, &vertiport, &group.destination, SkipReason::AirspaceFull, None);
                        continue;
                    }
                };

                let boarded = self.board_group(net, &aircraft, &vertiport, &group, now, log)?;
                net.reserve_aircraft(&aircraft, &group.destination, now)?;

                info!(
                    "{}: Aircraft {} dispatched from {} to {} with {} passengers.",
                    now, aircraft, vertiport, group.destination, boarded
                );
                log.push(SimEvent::Dispatched {
                    at: now,
                    aircraft: aircraft.clone(),
                    origin: vertiport.clone(),
                    destination: group.destination.clone(),
                    passengers: boarded,
                    kind: FlightKind::Passenger,
                });
                orders.push(LaunchOrder {
                    aircraft,
                    origin: vertiport.clone(),
                    destination: group.destination.clone(),
                    delay,
                    kind: FlightKind::Passenger,
                    passengers: boarded,
                });
            }
        }
        Ok(())
    }

    /// Selection order: a flight-ready aircraft; nothing if the vertiport is
    /// empty; else the first charging aircraft whose SoC covers the leg.
    pub fn select_aircraft(
        &self,
        net: &Network,
        vertiport: &VertiportId,
        destination: &VertiportId,
    ) -> Result<Selection, SimError> {
        let port = net.vertiport(vertiport)?;
        if let Some(ready) = port.available_aircraft(&net.aircraft).into_iter().next() {
            return Ok(Selection::Ready(ready));
        }
        if port.parked().is_empty() {
            return Ok(Selection::NoAircraft);
        }

        let airspace = net.airspace(vertiport, destination)?;
        for id in port.parked() {
            let ac = net.aircraft(id)?;
            if ac.state != AircraftState::Charge || ac.is_reserved() {
                continue;
            }
            let plan = airspace
                .flight_plan(&ac.vehicle)
                .ok_or_else(|| SimError::MissingFlightPlan {
                    vehicle: ac.vehicle.clone(),
                    origin: vertiport.clone(),
                    destination: destination.clone(),
                })?;
            if ac.soc() >= self.soc_requirement(ac, plan) {
                return Ok(Selection::Charged(id.clone()));
            }
        }
        Ok(Selection::InsufficientCharge)
    }

    pub fn soc_requirement(&self, aircraft: &Aircraft, plan: &FlightPlan) -> f64 {
        aircraft.soc_requirement(plan, self.energy_safety_factor, self.min_reserve_soc)
    }

    /// Soonest an aircraft flying toward `vertiport` could take off again for
    /// `destination`: remaining flight time plus the charge needed on arrival.
    /// `None` when nothing is inbound.
    pub fn expected_wait_time(
        &self,
        net: &Network,
        vertiport: &VertiportId,
        destination: &VertiportId,
    ) -> Result<Option<Time>, SimError> {
        let onward = net.airspace(vertiport, destination).ok();
        let mut best: Option<Time> = None;
        for id in net.inbound_aircraft(vertiport) {
            let ac = net.aircraft(&id)?;
            let (remaining, arrival_soc) = ac.expected_arrival()?;
            let required = onward
                .and_then(|a| a.flight_plan(&ac.vehicle))
                .map(|plan| self.soc_requirement(ac, plan))
                .unwrap_or(self.flight_ready_soc);
            let charging = net.charger(&ac.vehicle)?.query_charging_time(arrival_soc, required);
            let wait = remaining + Time::from_secs_f64(charging);
            best = Some(best.map_or(wait, |b| b.min(wait)));
        }
        Ok(best)
    }

    /// Boards the group FIFO, up to the threshold and the cabin size.
    fn board_group(
        &self,
        net: &mut Network,
        aircraft: &AircraftId,
        vertiport: &VertiportId,
        group: &DemandGroup,
        now: Time,
        log: &mut EventLog,
    ) -> Result<usize, SimError> {
        let ac = net.aircraft(aircraft)?;
        let seats = ac.passenger_capacity.saturating_sub(ac.current_passengers.len());
        let count = group.count.min(self.passenger_threshold).min(seats);
        for passenger in group.passengers.iter().take(count) {
            net.board_passenger(*passenger, aircraft, now)?;
            log.push(SimEvent::Boarded {
                at: now,
                passenger: *passenger,
                aircraft: aircraft.clone(),
                vertiport: vertiport.clone(),
            });
        }
        Ok(count)
    }
}

fn skip(
    log: &mut EventLog,
    now: Time,
    vertiport: &VertiportId,
    destination: &VertiportId,
    reason: SkipReason,
    expected_wait: Option<Time>,
) {
    log.push(SimEvent::DispatchSkipped {
        at: now,
        vertiport: vertiport.clone(),
        destination: destination.clone(),
        reason,
        expected_wait,
    });
}
