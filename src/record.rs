use crate::aircraft::{Aircraft, AircraftId, VehicleTripRecord};
use crate::mission::VehicleType;
use crate::passenger::{PassengerId, PassengerTripRecord};
use crate::time::Time;
use crate::vertiport::VertiportId;
use serde::Serialize;
use std::fs::File;
use std::io;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightKind {
    Passenger,
    Rebalance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// nothing parked at the vertiport at all
    NoAircraft,
    /// aircraft parked, but none ready or charged enough for the leg
    InsufficientCharge,
    /// corridor already promised to flights launched this tick
    AirspaceFull,
}

/// Everything worth auditing that happened during a run, in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SimEvent {
    PassengerArrived {
        at: Time,
        passenger: PassengerId,
        origin: VertiportId,
        destination: VertiportId,
    },
    Boarded {
        at: Time,
        passenger: PassengerId,
        aircraft: AircraftId,
        vertiport: VertiportId,
    },
    Dispatched {
        at: Time,
        aircraft: AircraftId,
        origin: VertiportId,
        destination: VertiportId,
        passengers: usize,
        kind: FlightKind,
    },
    DispatchSkipped {
        at: Time,
        vertiport: VertiportId,
        destination: VertiportId,
        reason: SkipReason,
        /// soonest an inbound aircraft could serve the group
        expected_wait: Option<Time>,
    },
    Deficit {
        at: Time,
        vertiport: VertiportId,
        supply: usize,
        target: usize,
    },
    AirspaceWait {
        at: Time,
        aircraft: AircraftId,
        origin: VertiportId,
        destination: VertiportId,
        wait: Time,
    },
    Departed {
        at: Time,
        aircraft: AircraftId,
        origin: VertiportId,
        destination: VertiportId,
    },
    Arrived {
        at: Time,
        aircraft: AircraftId,
        vertiport: VertiportId,
    },
    JourneyCompleted {
        at: Time,
        passenger: PassengerId,
    },
    Anomaly {
        at: Time,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionRecord {
    pub time: Time,
    pub vertiport: VertiportId,
    pub parked: usize,
    pub inbound: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AircraftSnapshot {
    pub vehicle: VehicleType,
    pub id: AircraftId,
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
    pub speed_horizontal: f64,
    pub speed_vertical: f64,
    pub heading: f64,
    pub soc: f64,
}

impl From<&Aircraft> for AircraftSnapshot {
    fn from(ac: &Aircraft) -> Self {
        AircraftSnapshot {
            vehicle: ac.vehicle.clone(),
            id: ac.id.clone(),
            lat: ac.position.lat,
            lon: ac.position.lon,
            alt: ac.position.alt,
            speed_horizontal: ac.speed_horizontal,
            speed_vertical: ac.speed_vertical,
            heading: ac.heading,
            soc: ac.soc(),
        }
    }
}

/// Positions of every flying aircraft at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveState {
    pub time: Time,
    pub aircraft: Vec<AircraftSnapshot>,
}

#[derive(Debug, Default)]
pub struct EventLog {
    pub events: Vec<SimEvent>,
    pub passenger_trips: Vec<PassengerTripRecord>,
    pub vehicle_trips: Vec<VehicleTripRecord>,
    pub distribution: Vec<DistributionRecord>,
    pub snapshots: Vec<LiveState>,
}

impl EventLog {
    pub fn push(&mut self, event: SimEvent) {
        self.events.push(event);
    }

    pub fn anomaly(&mut self, at: Time, message: String) {
        log::warn!("{}: {}", at, message);
        self.events.push(SimEvent::Anomaly { at, message });
    }

    pub fn anomalies(&self) -> impl Iterator<Item = &str> {
        self.events.iter().filter_map(|e| match e {
            SimEvent::Anomaly { message, .. } => Some(message.as_str()),
            _ => None,
        })
    }

    /// (aircraft, origin, destination, kind) of every launched flight.
    pub fn dispatches(&self) -> impl Iterator<Item = (&AircraftId, &VertiportId, &VertiportId, FlightKind)> {
        self.events.iter().filter_map(|e| match e {
            SimEvent::Dispatched {
                aircraft,
                origin,
                destination,
                kind,
                ..
            } => Some((aircraft, origin, destination, *kind)),
            _ => None,
        })
    }

    /// Writes every log as pretty JSON into `dir`, creating it if needed.
    pub fn export(&self, dir: &Path) -> io::Result<()> {
        std::fs::create_dir_all(dir)?;
        write_json(&dir.join("passenger_trips.json"), &self.passenger_trips)?;
        write_json(&dir.join("vehicle_trips.json"), &self.vehicle_trips)?;
        write_json(&dir.join("distribution.json"), &self.distribution)?;
        write_json(&dir.join("events.json"), &self.events)?;
        write_json(&dir.join("snapshots.json"), &self.snapshots)
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> io::Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}
