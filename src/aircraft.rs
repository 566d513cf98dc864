use crate::airspace::AirspaceId;
use crate::battery::Battery;
use crate::charger::ChargerModel;
use crate::config::{RunMode, SimConfig};
use crate::error::SimError;
use crate::geo::Position;
use crate::mission::{FlightPlan, Leg, VehicleType};
use crate::passenger::PassengerId;
use crate::time::Time;
use crate::vertiport::{Vertiport, VertiportId};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

pub type AircraftId = Arc<str>;

/// Position refresh period while flying in visual mode.
pub const VISUAL_STEP: Time = Time(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AircraftState {
    Idle,
    Charge,
    Flying,
}

impl fmt::Display for AircraftState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AircraftState::Idle => write!(f, "idle"),
            AircraftState::Charge => write!(f, "charge"),
            AircraftState::Flying => write!(f, "flying"),
        }
    }
}

/// Charge levels at which a charging aircraft becomes dispatchable and idle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargePolicy {
    pub flight_ready_soc: f64,
    pub full_soc: f64,
}

impl From<&SimConfig> for ChargePolicy {
    fn from(config: &SimConfig) -> Self {
        ChargePolicy {
            flight_ready_soc: config.flight_ready_soc,
            full_soc: config.full_soc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripStart {
    pub time: Time,
    pub soc: f64,
    pub passengers: usize,
}

#[derive(Debug, Clone)]
pub struct ActiveFlight {
    pub airspace: AirspaceId,
    pub plan: Arc<FlightPlan>,
    pub leg_index: usize,
    pub leg_remaining: Time,
    pub energy_used: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleTripRecord {
    pub aircraft_id: AircraftId,
    pub vehicle: VehicleType,
    pub origin: VertiportId,
    pub destination: VertiportId,
    pub departure_time: Time,
    pub arrival_time: Time,
    pub initial_soc: f64,
    pub final_soc: f64,
    pub soc_delta: f64,
    pub passengers: usize,
    pub energy_consumed: f64,
}

#[derive(Debug, Clone)]
pub struct Aircraft {
    pub id: AircraftId,
    pub vehicle: VehicleType,
    pub state: AircraftState,
    pub battery: Battery,
    /// where the aircraft is parked, or last departed from while flying
    pub origin_vertiport: VertiportId,
    pub destination_vertiport: Option<VertiportId>,
    pub current_passengers: Vec<PassengerId>,
    pub passenger_capacity: usize,
    pub flight_ready: bool,
    reserved: bool,
    pub charging_start_time: Time,
    trip_start: Option<TripStart>,
    pub flight: Option<ActiveFlight>,
    pub position: Position,
    pub speed_horizontal: f64,
    pub speed_vertical: f64,
    pub heading: f64,
}

impl Aircraft {
    pub fn new(
        id: AircraftId,
        vehicle: VehicleType,
        battery: Battery,
        passenger_capacity: usize,
        parked_at: &Vertiport,
    ) -> Aircraft {
        Aircraft {
            id,
            vehicle,
            state: AircraftState::Idle,
            battery,
            origin_vertiport: parked_at.id.clone(),
            destination_vertiport: None,
            current_passengers: vec![],
            passenger_capacity,
            flight_ready: true,
            reserved: false,
            charging_start_time: Time::ZERO,
            trip_start: None,
            flight: None,
            position: parked_at.location,
            speed_horizontal: 0.0,
            speed_vertical: 0.0,
            heading: 0.0,
        }
    }

    pub fn soc(&self) -> f64 {
        self.battery.soc()
    }

    pub fn is_reserved(&self) -> bool {
        self.reserved
    }

    /// Free for the scheduler to pick without further feasibility checks.
    pub fn is_available(&self) -> bool {
        self.flight_ready && !self.reserved && self.state != AircraftState::Flying
    }

    /// SoC needed to fly `plan` with the energy safety factor applied and the
    /// landing reserve left over.
    pub fn soc_requirement(&self, plan: &FlightPlan, energy_safety_factor: f64, min_reserve_soc: f64) -> f64 {
        self.battery.energy_as_soc(plan.total_energy() * energy_safety_factor) + min_reserve_soc
    }

    /// Claims the aircraft for a flight that is about to be launched, so no
    /// other decision in the same tick can pick it.
    pub fn reserve(&mut self, now: Time, charger: &ChargerModel, policy: ChargePolicy) -> Result<(), SimError> {
        if self.state == AircraftState::Charge {
            self.update_soc(now, charger, policy)?;
        }
        self.flight_ready = false;
        self.reserved = true;
        Ok(())
    }

    pub fn record_trip_start(&mut self, now: Time) {
        self.trip_start = Some(TripStart {
            time: now,
            soc: self.soc(),
            passengers: self.current_passengers.len(),
        });
    }

    /// Switches to `flying` on the given corridor; the first leg starts now.
    pub fn begin_flight(&mut self, now: Time, destination: VertiportId, airspace: AirspaceId, plan: Arc<FlightPlan>) {
        if self.trip_start.is_none() {
            self.record_trip_start(now);
        }
        self.state = AircraftState::Flying;
        self.flight_ready = false;
        self.reserved = false;
        self.destination_vertiport = Some(destination);
        let leg_remaining = plan.legs.first().map(|leg| leg.duration).unwrap_or(Time::ZERO);
        self.flight = Some(ActiveFlight {
            airspace,
            plan,
            leg_index: 0,
            leg_remaining,
            energy_used: 0.0,
        });
        self.load_leg_kinematics();
    }

    pub fn current_leg(&self) -> Option<&Leg> {
        self.flight.as_ref().and_then(|f| f.plan.legs.get(f.leg_index))
    }

    fn load_leg_kinematics(&mut self) {
        if let Some(leg) = self.current_leg().cloned() {
            self.speed_horizontal = leg.v_horizontal;
            self.speed_vertical = leg.v_vertical;
            self.heading = leg.heading;
        }
    }

    /// Length of the next suspension inside the current leg.
    pub fn next_step(&self, mode: RunMode) -> Option<Time> {
        let flight = self.flight.as_ref()?;
        flight.plan.legs.get(flight.leg_index)?;
        Some(match mode {
            RunMode::Fast => flight.leg_remaining,
            RunMode::Visual => flight.leg_remaining.min(VISUAL_STEP),
        })
    }

    /// Spends `dt` inside the current leg, moving toward its end point when
    /// positions are tracked.
    pub fn fly_for(&mut self, dt: Time, mode: RunMode) {
        let Some(target) = self.current_leg().map(|leg| leg.position) else {
            return;
        };
        if mode == RunMode::Visual {
            self.position =
                self.position
                    .step_toward(&target, self.speed_horizontal, self.speed_vertical, dt.as_secs_f64());
        }
        if let Some(flight) = self.flight.as_mut() {
            flight.leg_remaining = flight.leg_remaining.saturating_sub(dt);
        }
    }

    pub fn leg_finished(&self) -> bool {
        self.flight.as_ref().is_some_and(|f| f.leg_remaining == Time::ZERO)
    }

    /// Closes the current leg: draws its energy budget and moves on. Returns
    /// `true` once the last leg is done.
    pub fn finish_leg(&mut self) -> Result<bool, SimError> {
        let Some(leg) = self.current_leg().cloned() else {
            return Ok(true);
        };
        self.battery
            .drain(leg.energy_budget)
            .map_err(|source| SimError::Battery {
                aircraft: self.id.clone(),
                source,
            })?;
        self.position = leg.position;

        let Some(flight) = self.flight.as_mut() else {
            return Ok(true);
        };
        flight.energy_used += leg.energy_budget;
        flight.leg_index += 1;
        match flight.plan.legs.get(flight.leg_index) {
            Some(next) => {
                flight.leg_remaining = next.duration;
                self.load_leg_kinematics();
                Ok(false)
            }
            None => Ok(true),
        }
    }

    /// Parks the aircraft at `destination` and starts charging. Returns the
    /// trip record and the passengers that were on board.
    pub fn finish_flight(&mut self, now: Time, destination: &Vertiport) -> (VehicleTripRecord, Vec<PassengerId>) {
        let flight = self.flight.take();
        let start = self.trip_start.take().unwrap_or(TripStart {
            time: now,
            soc: self.soc(),
            passengers: self.current_passengers.len(),
        });
        let origin = std::mem::replace(&mut self.origin_vertiport, destination.id.clone());
        self.destination_vertiport = None;
        self.position = destination.location;
        self.speed_horizontal = 0.0;
        self.speed_vertical = 0.0;

        let passengers = std::mem::take(&mut self.current_passengers);
        self.state = AircraftState::Charge;
        self.charging_start_time = now;

        let record = VehicleTripRecord {
            aircraft_id: self.id.clone(),
            vehicle: self.vehicle.clone(),
            origin,
            destination: destination.id.clone(),
            departure_time: start.time,
            arrival_time: now,
            initial_soc: start.soc,
            final_soc: self.soc(),
            soc_delta: start.soc - self.soc(),
            passengers: start.passengers,
            energy_consumed: flight.map(|f| f.energy_used).unwrap_or(0.0),
        };
        (record, passengers)
    }

    /// Applies the charge gained since the last update. Only valid while
    /// charging.
    pub fn update_soc(&mut self, now: Time, charger: &ChargerModel, policy: ChargePolicy) -> Result<(), SimError> {
        if self.state != AircraftState::Charge {
            return Err(SimError::NotCharging(self.id.clone()));
        }
        let elapsed = now.saturating_sub(self.charging_start_time);
        let soc = charger.query_final_soc(self.soc(), elapsed.as_secs_f64());
        self.battery.charge_to(soc);
        self.charging_start_time = now;

        if self.soc() >= policy.full_soc {
            self.state = AircraftState::Idle;
            self.flight_ready = !self.reserved;
        } else if self.soc() >= policy.flight_ready_soc && !self.reserved {
            self.flight_ready = true;
        }
        Ok(())
    }

    /// Remaining flight time and expected SoC on arrival, counting the
    /// current leg in full.
    pub fn expected_arrival(&self) -> Result<(Time, f64), SimError> {
        match (&self.state, &self.flight) {
            (AircraftState::Flying, Some(flight)) => {
                let (time, energy) = flight.plan.remaining_from(flight.leg_index);
                Ok((time, self.soc() - self.battery.energy_as_soc(energy)))
            }
            _ => Err(SimError::NotFlying(self.id.clone())),
        }
    }
}
