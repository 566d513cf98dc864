use crate::error::ConfigError;
use crate::geo::Position;
use crate::time::Time;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

pub type VehicleType = Arc<str>;
pub type RouteId = Arc<str>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    HoverClimb,
    ClimbTransition,
    Climb,
    Cruise,
    Descent,
    DescentTransition,
    HoverDescent,
}

/// One row of an externally generated mission profile, as it appears in the
/// scenario file.
#[derive(Debug, Clone, Deserialize)]
pub struct RawLeg {
    pub waypoint: Arc<str>,
    /// seconds, possibly fractional
    pub duration: f64,
    pub energy_budget: f64,
    pub position: Position,
    pub phase: Phase,
    #[serde(default)]
    pub v_horizontal: f64,
    #[serde(default)]
    pub v_vertical: f64,
    #[serde(default)]
    pub heading: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leg {
    pub waypoint: Arc<str>,
    pub duration: Time,
    pub energy_budget: f64,
    /// position reached at the end of the leg
    pub position: Position,
    pub phase: Phase,
    pub v_horizontal: f64,
    pub v_vertical: f64,
    pub heading: f64,
}

/// Validated leg schedule for one vehicle type on one route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightPlan {
    pub legs: Vec<Leg>,
}

impl FlightPlan {
    pub fn new(legs: Vec<Leg>) -> FlightPlan {
        FlightPlan { legs }
    }

    pub fn from_raw(route: &RouteId, vehicle: &VehicleType, raw: Vec<RawLeg>) -> Result<FlightPlan, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidProfile {
            route: route.clone(),
            vehicle: vehicle.clone(),
            reason,
        };

        if raw.is_empty() {
            return Err(invalid("no legs".to_string()));
        }

        let legs = raw
            .into_iter()
            .map(|leg| {
                if !(leg.duration.is_finite() && leg.duration >= 0.0) {
                    return Err(invalid(format!("leg `{}` has duration {}", leg.waypoint, leg.duration)));
                }
                if !(leg.energy_budget.is_finite() && leg.energy_budget >= 0.0) {
                    return Err(invalid(format!(
                        "leg `{}` has energy budget {}",
                        leg.waypoint, leg.energy_budget
                    )));
                }
                Ok(Leg {
                    waypoint: leg.waypoint,
                    duration: Time::from_secs_f64(leg.duration),
                    energy_budget: leg.energy_budget,
                    position: leg.position,
                    phase: leg.phase,
                    v_horizontal: leg.v_horizontal,
                    v_vertical: leg.v_vertical,
                    heading: leg.heading,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FlightPlan { legs })
    }

    pub fn total_duration(&self) -> Time {
        self.remaining_from(0).0
    }

    pub fn total_energy(&self) -> f64 {
        self.remaining_from(0).1
    }

    /// Duration and energy of the legs from `leg_index` (inclusive) onward.
    pub fn remaining_from(&self, leg_index: usize) -> (Time, f64) {
        self.legs
            .iter()
            .skip(leg_index)
            .fold((Time::ZERO, 0.0), |(t, e), leg| (t + leg.duration, e + leg.energy_budget))
    }
}

/// All mission profiles of a scenario, keyed by route and vehicle type.
#[derive(Debug, Default)]
pub struct MissionProfiles {
    plans: HashMap<(RouteId, VehicleType), Arc<FlightPlan>>,
}

impl MissionProfiles {
    pub fn insert(&mut self, route: RouteId, vehicle: VehicleType, plan: FlightPlan) -> Result<(), ConfigError> {
        let key = (route, vehicle);
        if self.plans.contains_key(&key) {
            return Err(ConfigError::Duplicate {
                kind: "mission profile",
                id: format!("{}/{}", key.0, key.1),
            });
        }
        self.plans.insert(key, Arc::new(plan));
        Ok(())
    }

    pub fn get(&self, route: &RouteId, vehicle: &VehicleType) -> Result<Arc<FlightPlan>, ConfigError> {
        self.plans
            .get(&(route.clone(), vehicle.clone()))
            .cloned()
            .ok_or_else(|| ConfigError::MissingProfile {
                route: route.clone(),
                vehicle: vehicle.clone(),
            })
    }
}
