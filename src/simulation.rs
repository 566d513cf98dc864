use crate::aircraft::AircraftId;
use crate::config::SimConfig;
use crate::error::{ConfigError, SimError};
use crate::events::{Event, EventQueue};
use crate::network::Network;
use crate::passenger::{LegOutcome, Passenger, PassengerId, PassengerRequest};
use crate::record::{EventLog, LiveState, SimEvent};
use crate::scheduler::Scheduler;
use crate::time::Time;
use crate::vertiport::VertiportId;
use log::{debug, info};
use std::collections::HashSet;

struct Arrival {
    request: PassengerRequest,
    itinerary: Vec<VertiportId>,
}

/// Event loop tying the network, the scheduler and the arrival schedule
/// together.
pub struct Simulation {
    pub config: SimConfig,
    pub network: Network,
    pub scheduler: Scheduler,
    pub log: EventLog,
    queue: EventQueue,
    arrivals: Vec<Arrival>,
}

impl Simulation {
    /// Validates everything that could fail later, then queues the arrival
    /// process ahead of the first tick.
    pub fn new(config: SimConfig, mut network: Network, mut requests: Vec<PassengerRequest>) -> Result<Simulation, ConfigError> {
        config.validate()?;
        network.record_initial_allocation();

        requests.sort_by_key(|r| r.arrival_time);
        let total = requests.len();
        requests.retain(|r| r.arrival_time <= config.end_time);
        if requests.len() < total {
            debug!("dropped {} arrivals after {}", total - requests.len(), config.end_time);
        }

        let mut seen = HashSet::new();
        let arrivals = requests
            .into_iter()
            .map(|request| {
                if !seen.insert(request.id) {
                    return Err(ConfigError::Duplicate {
                        kind: "passenger",
                        id: request.id.to_string(),
                    });
                }
                let itinerary = network
                    .compute_itinerary(&request.origin, &request.destination)
                    .map_err(|_| ConfigError::Unroutable {
                        passenger: request.id,
                        origin: request.origin.clone(),
                        destination: request.destination.clone(),
                    })?;
                Ok(Arrival { request, itinerary })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut queue = EventQueue::new(Time::ZERO);
        if let Some(first) = arrivals.first() {
            queue.schedule_at(first.request.arrival_time, Event::PassengerArrival(0));
        }
        queue.schedule_at(Time::ZERO, Event::Tick);

        Ok(Simulation {
            scheduler: Scheduler::new(&config),
            config,
            network,
            log: EventLog::default(),
            queue,
            arrivals,
        })
    }

    pub fn now(&self) -> Time {
        self.queue.now()
    }

    pub fn is_finished(&self) -> bool {
        self.queue.is_empty()
    }

    /// Handles the next event. Returns its time, or `None` once nothing is
    /// left to simulate.
    pub fn step(&mut self) -> Result<Option<Time>, SimError> {
        let Some((now, event)) = self.queue.pop() else {
            return Ok(None);
        };
        match event {
            Event::PassengerArrival(index) => self.on_arrival(index, now)?,
            Event::Tick => self.on_tick(now)?,
            Event::Launch { aircraft, destination } => self.on_launch(&aircraft, &destination, now, false)?,
            Event::AdmissionRetry { aircraft, destination } => self.on_launch(&aircraft, &destination, now, true)?,
            Event::FlightStep(aircraft) => self.on_flight_step(&aircraft, now)?,
            Event::LegComplete(passenger) => self.on_leg_complete(passenger, now)?,
        }
        Ok(Some(now))
    }

    /// Handles every event up to and including `until`; the clock ends there.
    pub fn run_until(&mut self, until: Time) -> Result<(), SimError> {
        while self.queue.peek_time().is_some_and(|t| t <= until) {
            self.step()?;
        }
        self.queue.advance_to(until);
        Ok(())
    }

    pub fn run(&mut self) -> Result<(), SimError> {
        while self.step()?.is_some() {}
        info!("{}: simulation finished", self.now());
        Ok(())
    }

    /// Runs silently up to the configured start time.
    pub fn fast_forward(&mut self) -> Result<(), SimError> {
        self.run_until(self.config.start_time)
    }

    pub fn current_state(&self) -> LiveState {
        self.network.live_state(self.now())
    }

    fn on_arrival(&mut self, index: usize, now: Time) -> Result<(), SimError> {
        let Some(arrival) = self.arrivals.get(index) else {
            return Ok(());
        };
        let request = &arrival.request;
        let passenger = Passenger::new(request.id, arrival.itinerary.clone(), now)?;
        info!(
            "{}: Passenger {} arrived at {} bound for {}.",
            now, request.id, request.origin, request.destination
        );
        self.log.push(SimEvent::PassengerArrived {
            at: now,
            passenger: request.id,
            origin: request.origin.clone(),
            destination: request.destination.clone(),
        });
        self.network.add_passenger(passenger)?;

        if let Some(next) = self.arrivals.get(index + 1) {
            self.queue
                .schedule_at(next.request.arrival_time, Event::PassengerArrival(index + 1));
        }
        Ok(())
    }

    fn on_tick(&mut self, now: Time) -> Result<(), SimError> {
        self.network.update_network(now, &mut self.log)?;

        for order in self.scheduler.run(&mut self.network, now, &mut self.log)? {
            self.queue.schedule_in(
                order.delay,
                Event::Launch {
                    aircraft: order.aircraft,
                    destination: order.destination,
                },
            );
        }

        self.log.distribution.extend(self.network.distribution(now));
        if self.config.record_snapshots {
            self.log.snapshots.push(self.network.live_state(now));
        }
        self.network.assert_invariants();

        if now <= self.config.end_time {
            self.queue.schedule_in(self.config.update_interval, Event::Tick);
        }
        Ok(())
    }

    /// Admission attempt for a reserved aircraft. A refused first attempt
    /// waits for the soonest expected exit; a refused retry is fatal.
    fn on_launch(&mut self, id: &AircraftId, destination: &VertiportId, now: Time, retry: bool) -> Result<(), SimError> {
        let origin = self.network.aircraft(id)?.origin_vertiport.clone();
        if !self.network.vertiport(&origin)?.is_parked(id) {
            return Err(SimError::ReservedAircraftMissing {
                aircraft: id.clone(),
                vertiport: origin,
            });
        }
        if !retry {
            self.network.aircraft_mut(id)?.record_trip_start(now);
        }

        if !self.network.airspace_mut(&origin, destination)?.enter(id) {
            if retry {
                return Err(SimError::AirspaceRefused {
                    now,
                    aircraft: id.clone(),
                    origin,
                    destination: destination.clone(),
                });
            }
            let airspace = (origin.clone(), destination.clone());
            let wait = self
                .network
                .time_until_availability(&airspace, self.config.airspace_entry_margin)?
                .unwrap_or(Time::ZERO);
            info!(
                "{}: Airspace {}->{} is full, aircraft {} waits {}s.",
                now, origin, destination, id, wait.0
            );
            self.log.push(SimEvent::AirspaceWait {
                at: now,
                aircraft: id.clone(),
                origin,
                destination: destination.clone(),
                wait,
            });
            self.queue.schedule_in(
                wait,
                Event::AdmissionRetry {
                    aircraft: id.clone(),
                    destination: destination.clone(),
                },
            );
            return Ok(());
        }

        let airspace = self.network.airspace(&origin, destination)?;
        let vehicle = self.network.aircraft(id)?.vehicle.clone();
        let plan = airspace
            .flight_plan(&vehicle)
            .cloned()
            .ok_or_else(|| SimError::MissingFlightPlan {
                vehicle,
                origin: origin.clone(),
                destination: destination.clone(),
            })?;
        let airspace_id = airspace.id();

        self.network.vertiport_mut(&origin)?.remove_aircraft(id);
        self.network
            .aircraft_mut(id)?
            .begin_flight(now, destination.clone(), airspace_id, plan);
        debug!("{}: Aircraft {} departed {} for {}", now, id, origin, destination);
        self.log.push(SimEvent::Departed {
            at: now,
            aircraft: id.clone(),
            origin,
            destination: destination.clone(),
        });
        self.schedule_flight_step(id)
    }

    fn schedule_flight_step(&mut self, id: &AircraftId) -> Result<(), SimError> {
        let step = self
            .network
            .aircraft(id)?
            .next_step(self.config.run_mode)
            .unwrap_or(Time::ZERO);
        self.queue.schedule_in(step, Event::FlightStep(id.clone()));
        Ok(())
    }

    fn on_flight_step(&mut self, id: &AircraftId, now: Time) -> Result<(), SimError> {
        let mode = self.config.run_mode;
        let ac = self.network.aircraft_mut(id)?;
        if let Some(dt) = ac.next_step(mode) {
            ac.fly_for(dt, mode);
        }
        if ac.leg_finished() && ac.finish_leg()? {
            return self.on_arrive(id, now);
        }
        self.schedule_flight_step(id)
    }

    /// Leaves the airspace, parks, starts charging and hands every passenger
    /// their leg-complete signal.
    fn on_arrive(&mut self, id: &AircraftId, now: Time) -> Result<(), SimError> {
        let (airspace, destination) = {
            let ac = self.network.aircraft(id)?;
            match (&ac.flight, &ac.destination_vertiport) {
                (Some(flight), Some(destination)) => (flight.airspace.clone(), destination.clone()),
                _ => return Err(SimError::NotFlying(id.clone())),
            }
        };
        self.network.airspace_mut(&airspace.0, &airspace.1)?.exit(id);

        let vertiport = self
            .network
            .vertiports
            .get_mut(&destination)
            .ok_or_else(|| SimError::UnknownVertiport(destination.clone()))?;
        vertiport.park_aircraft(id);
        let ac = self
            .network
            .aircraft
            .get_mut(id)
            .ok_or_else(|| SimError::UnknownAircraft(id.clone()))?;
        let (record, passengers) = ac.finish_flight(now, vertiport);

        info!(
            "{}: Aircraft {} arrived at {} with {} passengers, soc {:.3}.",
            now,
            id,
            destination,
            passengers.len(),
            record.final_soc
        );
        self.log.push(SimEvent::Arrived {
            at: now,
            aircraft: id.clone(),
            vertiport: destination,
        });
        self.log.vehicle_trips.push(record);

        for pid in passengers {
            if self.network.passenger(pid)?.has_leg_handle(id) {
                self.queue.schedule_at(now, Event::LegComplete(pid));
            } else {
                self.log
                    .anomaly(now, format!("passenger {} left aircraft {} without an open leg", pid, id));
            }
        }
        Ok(())
    }

    fn on_leg_complete(&mut self, pid: PassengerId, now: Time) -> Result<(), SimError> {
        match self.network.passenger_mut(pid)?.complete_leg(now) {
            Some(LegOutcome::Transfer(stop)) => {
                debug!("{}: Passenger {} transfers at {}", now, pid, stop);
                self.network.vertiport_mut(&stop)?.add_passenger(pid);
            }
            Some(LegOutcome::Finished(trip)) => {
                info!(
                    "{}: Passenger {} reached {} after waiting {}s.",
                    now, pid, trip.destination, trip.total_wait_time.0
                );
                self.log.push(SimEvent::JourneyCompleted { at: now, passenger: pid });
                self.log.passenger_trips.push(trip);
                self.network.remove_passenger(pid);
            }
            None => self
                .log
                .anomaly(now, format!("passenger {} completed a leg that was never started", pid)),
        }
        Ok(())
    }
}
