use crate::aircraft::AircraftId;
use crate::mission::{RouteId, VehicleType};
use crate::passenger::PassengerId;
use crate::time::Time;
use crate::vertiport::VertiportId;
use thiserror::Error;

/// Problems found while loading or validating a scenario. All of these abort
/// before the simulation clock starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read scenario: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse scenario: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("charge rate reaches zero at soc {soc:.3}, before the max target soc {max_target_soc:.3}")]
    ChargeRateExhausted { soc: f64, max_target_soc: f64 },
    #[error("unknown vertiport `{0}`")]
    UnknownVertiport(VertiportId),
    #[error("unknown vehicle type `{0}`")]
    UnknownVehicle(VehicleType),
    #[error("duplicate {kind} `{id}`")]
    Duplicate { kind: &'static str, id: String },
    #[error("airspace {origin}->{destination} must have a positive capacity")]
    ZeroCapacity {
        origin: VertiportId,
        destination: VertiportId,
    },
    #[error("no mission profile for route `{route}` and vehicle `{vehicle}`")]
    MissingProfile { route: RouteId, vehicle: VehicleType },
    #[error("mission profile `{route}`/`{vehicle}` is invalid: {reason}")]
    InvalidProfile {
        route: RouteId,
        vehicle: VehicleType,
        reason: String,
    },
    #[error("passenger {passenger} cannot travel from {origin} to {destination}")]
    Unroutable {
        passenger: PassengerId,
        origin: VertiportId,
        destination: VertiportId,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BatteryError {
    #[error("battery depleted: drawing {energy:.3} would leave soc at {soc:.4}")]
    Depleted { energy: f64, soc: f64 },
}

/// Unrecoverable invariant violations raised while the clock is running.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("{now}: aircraft {aircraft} refused twice by airspace {origin}->{destination}")]
    AirspaceRefused {
        now: Time,
        aircraft: AircraftId,
        origin: VertiportId,
        destination: VertiportId,
    },
    #[error("no airspace from {origin} to {destination}")]
    NoAirspace {
        origin: VertiportId,
        destination: VertiportId,
    },
    #[error("aircraft {0} was queried for its arrival while not flying")]
    NotFlying(AircraftId),
    #[error("aircraft {0} was asked to update its charge while not charging")]
    NotCharging(AircraftId),
    #[error("aircraft {aircraft}: {source}")]
    Battery {
        aircraft: AircraftId,
        #[source]
        source: BatteryError,
    },
    #[error("reserved aircraft {aircraft} is no longer parked at {vertiport}")]
    ReservedAircraftMissing {
        aircraft: AircraftId,
        vertiport: VertiportId,
    },
    #[error("no route from {origin} to {destination}")]
    NoRoute {
        origin: VertiportId,
        destination: VertiportId,
    },
    #[error("itinerary of passenger {0} has fewer than two stops")]
    ShortItinerary(PassengerId),
    #[error("no flight plan for vehicle `{vehicle}` on airspace {origin}->{destination}")]
    MissingFlightPlan {
        vehicle: VehicleType,
        origin: VertiportId,
        destination: VertiportId,
    },
    #[error("no charger model for vehicle `{0}`")]
    MissingCharger(VehicleType),
    #[error("unknown aircraft {0}")]
    UnknownAircraft(AircraftId),
    #[error("unknown vertiport {0}")]
    UnknownVertiport(VertiportId),
    #[error("unknown passenger {0}")]
    UnknownPassenger(PassengerId),
}
