use crate::aircraft::Aircraft;
use crate::airspace::Airspace;
use crate::battery::Battery;
use crate::charger::ChargerModel;
use crate::config::SimConfig;
use crate::error::ConfigError;
use crate::geo::Position;
use crate::mission::{FlightPlan, MissionProfiles, RawLeg, RouteId, VehicleType};
use crate::network::Network;
use crate::passenger::PassengerRequest;
use crate::simulation::Simulation;
use crate::vertiport::{Vertiport, VertiportId};
use log::info;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct RawVehicle {
    #[serde(rename = "type")]
    vehicle: VehicleType,
    battery_capacity: f64,
    passenger_capacity: usize,
}

#[derive(Debug, Deserialize)]
struct RawVertiport {
    id: VertiportId,
    #[serde(default)]
    name: Option<String>,
    location: Position,
    #[serde(default)]
    fleet: BTreeMap<VehicleType, usize>,
}

#[derive(Debug, Deserialize)]
struct RawAirspace {
    origin: VertiportId,
    destination: VertiportId,
    capacity: usize,
    route: RouteId,
}

#[derive(Debug, Deserialize)]
struct RawProfile {
    route: RouteId,
    vehicle: VehicleType,
    legs: Vec<RawLeg>,
}

#[derive(Debug, Deserialize)]
struct RawScenario {
    #[serde(default)]
    config: SimConfig,
    vehicles: Vec<RawVehicle>,
    vertiports: Vec<RawVertiport>,
    airspaces: Vec<RawAirspace>,
    mission_profiles: Vec<RawProfile>,
    #[serde(default)]
    passengers: Vec<PassengerRequest>,
}

/// A validated scenario, ready to be turned into a [`Simulation`].
#[derive(Debug)]
pub struct Scenario {
    pub config: SimConfig,
    pub network: Network,
    pub passengers: Vec<PassengerRequest>,
}

impl Scenario {
    pub fn load_from_file(path: &Path) -> Result<Scenario, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        let scenario = Scenario::from_json(&data)?;
        info!(
            "loaded {} with {} vertiports, {} aircraft and {} passengers",
            path.display(),
            scenario.network.vertiports.len(),
            scenario.network.aircraft.len(),
            scenario.passengers.len()
        );
        Ok(scenario)
    }

    pub fn from_json(data: &str) -> Result<Scenario, ConfigError> {
        let raw: RawScenario = serde_json::from_str(data)?;
        raw.config.validate()?;

        let mut vehicles: HashMap<VehicleType, RawVehicle> = HashMap::new();
        let mut network = Network::new((&raw.config).into());
        for vehicle in raw.vehicles {
            if vehicles.contains_key(&vehicle.vehicle) {
                return Err(ConfigError::Duplicate {
                    kind: "vehicle",
                    id: vehicle.vehicle.to_string(),
                });
            }
            if vehicle.passenger_capacity == 0 {
                return Err(ConfigError::InvalidParameter {
                    name: "passenger_capacity",
                    reason: format!("vehicle `{}` seats nobody", vehicle.vehicle),
                });
            }
            let charger = ChargerModel::precompute(&raw.config.charger, vehicle.battery_capacity)?;
            network.add_charger(vehicle.vehicle.clone(), charger);
            vehicles.insert(vehicle.vehicle.clone(), vehicle);
        }

        let mut profiles = MissionProfiles::default();
        for profile in raw.mission_profiles {
            let plan = FlightPlan::from_raw(&profile.route, &profile.vehicle, profile.legs)?;
            profiles.insert(profile.route, profile.vehicle, plan)?;
        }

        let fleet_types: BTreeSet<VehicleType> = raw
            .vertiports
            .iter()
            .flat_map(|v| v.fleet.keys().cloned())
            .collect();
        if let Some(unknown) = fleet_types.iter().find(|t| !vehicles.contains_key(*t)) {
            return Err(ConfigError::UnknownVehicle(unknown.clone()));
        }

        let mut fleets = vec![];
        for raw_vertiport in raw.vertiports {
            let name = raw_vertiport.name.unwrap_or_else(|| raw_vertiport.id.to_string());
            network.add_vertiport(Vertiport::new(raw_vertiport.id.clone(), name, raw_vertiport.location))?;
            fleets.push((raw_vertiport.id, raw_vertiport.fleet));
        }

        for airspace in raw.airspaces {
            let plans = fleet_types
                .iter()
                .map(|vehicle| Ok((vehicle.clone(), profiles.get(&airspace.route, vehicle)?)))
                .collect::<Result<HashMap<_, _>, ConfigError>>()?;
            network.add_airspace(Airspace::new(
                airspace.origin,
                airspace.destination,
                airspace.capacity,
                airspace.route,
                plans,
            ))?;
        }

        let mut next_id = 1;
        for (vertiport_id, fleet) in fleets {
            for (vehicle_type, count) in fleet {
                let vehicle = vehicles
                    .get(&vehicle_type)
                    .ok_or_else(|| ConfigError::UnknownVehicle(vehicle_type.clone()))?;
                for _ in 0..count {
                    let vertiport = network
                        .vertiports
                        .get(&vertiport_id)
                        .ok_or_else(|| ConfigError::UnknownVertiport(vertiport_id.clone()))?;
                    let aircraft = Aircraft::new(
                        Arc::from(format!("AC_{}", next_id)),
                        vehicle_type.clone(),
                        Battery::new(vehicle.battery_capacity),
                        vehicle.passenger_capacity,
                        vertiport,
                    );
                    network.add_aircraft(aircraft)?;
                    next_id += 1;
                }
            }
        }
        network.record_initial_allocation();

        for passenger in &raw.passengers {
            for stop in [&passenger.origin, &passenger.destination] {
                if !network.vertiports.contains_key(stop) {
                    return Err(ConfigError::UnknownVertiport(stop.clone()));
                }
            }
        }

        Ok(Scenario {
            config: raw.config,
            network,
            passengers: raw.passengers,
        })
    }

    pub fn into_simulation(self) -> Result<Simulation, ConfigError> {
        Simulation::new(self.config, self.network, self.passengers)
    }
}
