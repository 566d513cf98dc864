use crate::aircraft::{Aircraft, AircraftState};
use crate::airspace::Airspace;
use crate::battery::Battery;
use crate::charger::ChargerModel;
use crate::config::SimConfig;
use crate::geo::Position;
use crate::mission::{FlightPlan, Leg, Phase};
use crate::network::Network;
use crate::passenger::{Passenger, PassengerId, PassengerRequest};
use crate::time::Time;
use proptest::prelude::Strategy;
use std::collections::HashMap;
use std::sync::Arc;

pub const EVTOL: &str = "evtol";
pub const BATTERY_CAPACITY: f64 = 160.0;
pub const SEATS: usize = 4;
const CRUISE_ALT: f64 = 300.0;

pub fn id(s: &str) -> Arc<str> {
    Arc::from(s)
}

pub fn config(passenger_threshold: usize) -> SimConfig {
    SimConfig {
        passenger_threshold,
        ..SimConfig::default()
    }
}

pub fn network() -> Network {
    network_with(&SimConfig::default())
}

pub fn network_with(config: &SimConfig) -> Network {
    let mut net = Network::new(config.into());
    net.add_charger(id(EVTOL), ChargerModel::precompute(&config.charger, BATTERY_CAPACITY).unwrap());
    net
}

/// Vertiports are laid out 0.1 degree apart along a meridian.
pub fn add_vertiport(net: &mut Network, vertiport_id: &str) {
    let lat = 37.0 + 0.1 * net.vertiports.len() as f64;
    net.add_vertiport(crate::vertiport::Vertiport::new(
        id(vertiport_id),
        format!("Vertiport {}", vertiport_id),
        Position::new(lat, -122.0, 0.0),
    ))
    .unwrap();
}

/// Climb, cruise and descent between the two vertiports; the climb and the
/// descent take a quarter of `duration` each and so does their energy.
pub fn plan(from: Position, to: Position, duration: u64, energy: f64) -> FlightPlan {
    let quarter = duration / 4;
    let cruise = duration - 2 * quarter;
    let leg = |waypoint: &str, secs: u64, share: f64, position: Position, phase: Phase, v_h: f64, v_v: f64| Leg {
        waypoint: id(waypoint),
        duration: Time(secs),
        energy_budget: energy * share,
        position,
        phase,
        v_horizontal: v_h,
        v_vertical: v_v,
        heading: 0.0,
    };
    let top_of_climb = Position::new(from.lat, from.lon, CRUISE_ALT);
    let top_of_descent = Position::new(to.lat, to.lon, CRUISE_ALT);
    let per_sec = |d: f64, secs: u64| if secs == 0 { 0.0 } else { d / secs as f64 };
    FlightPlan::new(vec![
        leg("climb", quarter, 0.25, top_of_climb, Phase::HoverClimb, 0.0, per_sec(CRUISE_ALT, quarter)),
        leg(
            "cruise",
            cruise,
            0.5,
            top_of_descent,
            Phase::Cruise,
            per_sec(from.ground_distance(&to), cruise),
            0.0,
        ),
        leg("descent", quarter, 0.25, to, Phase::HoverDescent, 0.0, per_sec(CRUISE_ALT, quarter)),
    ])
}

pub fn add_airspace(net: &mut Network, from: &str, to: &str, capacity: usize, duration: u64, energy: f64) {
    let start = net.vertiports[&id(from)].location;
    let end = net.vertiports[&id(to)].location;
    let mut plans = HashMap::new();
    plans.insert(id(EVTOL), Arc::new(plan(start, end, duration, energy)));
    net.add_airspace(Airspace::new(
        id(from),
        id(to),
        capacity,
        id(&format!("{}{}", from, to)),
        plans,
    ))
    .unwrap();
}

/// Parks an aircraft. Anything below full charge is put on the charger.
pub fn add_aircraft(net: &mut Network, aircraft_id: &str, at: &str, soc: f64) {
    let mut aircraft = Aircraft::new(
        id(aircraft_id),
        id(EVTOL),
        Battery::with_soc(BATTERY_CAPACITY, soc),
        SEATS,
        &net.vertiports[&id(at)],
    );
    let policy = net.charge_policy;
    if soc < policy.full_soc {
        aircraft.state = AircraftState::Charge;
        aircraft.flight_ready = soc >= policy.flight_ready_soc;
    }
    net.add_aircraft(aircraft).unwrap();
}

pub fn add_passenger(net: &mut Network, passenger_id: PassengerId, from: &str, to: &str, arrival: u64) {
    let itinerary = net.compute_itinerary(&id(from), &id(to)).unwrap();
    net.add_passenger(Passenger::new(passenger_id, itinerary, Time(arrival)).unwrap())
        .unwrap();
}

/// Takes the aircraft off its vertiport and into the airspace toward `to`.
pub fn launch(net: &mut Network, aircraft_id: &str, to: &str, now: u64) {
    let ac_id = id(aircraft_id);
    let origin = net.aircraft[&ac_id].origin_vertiport.clone();
    let airspace = net.airspaces.get_mut(&(origin.clone(), id(to))).unwrap();
    assert!(airspace.enter(&ac_id));
    let plan = airspace.flight_plan(&id(EVTOL)).unwrap().clone();
    net.vertiports.get_mut(&origin).unwrap().remove_aircraft(&ac_id);
    net.aircraft
        .get_mut(&ac_id)
        .unwrap()
        .begin_flight(Time(now), id(to), (origin, id(to)), plan);
}

pub fn request(passenger_id: PassengerId, arrival: u64, from: &str, to: &str) -> PassengerRequest {
    PassengerRequest {
        id: passenger_id,
        arrival_time: Time(arrival),
        origin: id(from),
        destination: id(to),
    }
}

/// Two vertiports with a corridor each way and one aircraft at `A`.
pub fn two_ports(config: &SimConfig, capacity: usize) -> Network {
    let mut net = network_with(config);
    add_vertiport(&mut net, "A");
    add_vertiport(&mut net, "B");
    add_airspace(&mut net, "A", "B", capacity, 600, 16.0);
    add_airspace(&mut net, "B", "A", capacity, 600, 16.0);
    add_aircraft(&mut net, "AC_1", "A", 1.0);
    net
}

pub const PORTS: [&str; 3] = ["A", "B", "C"];

/// Fully connected triangle with a roomy corridor on every edge and two
/// aircraft at each vertiport.
pub fn triangle(config: &SimConfig) -> Network {
    let mut net = network_with(config);
    for port in PORTS {
        add_vertiport(&mut net, port);
    }
    for from in PORTS {
        for to in PORTS.into_iter().filter(|to| *to != from) {
            add_airspace(&mut net, from, to, 10, 480, 12.0);
        }
    }
    let mut n = 1;
    for port in PORTS {
        for _ in 0..2 {
            add_aircraft(&mut net, &format!("AC_{}", n), port, 1.0);
            n += 1;
        }
    }
    net
}

pub fn arb_request() -> impl Strategy<Value = (u64, usize, usize)> {
    (0..7200u64, 0..PORTS.len(), 1..PORTS.len())
}

/// Maps `(arrival, origin, offset)` rows to requests with distinct ends.
pub fn requests(rows: &[(u64, usize, usize)]) -> Vec<PassengerRequest> {
    rows.iter()
        .enumerate()
        .map(|(i, (at, from, offset))| request(i as PassengerId + 1, *at, PORTS[*from], PORTS[(from + offset) % PORTS.len()]))
        .collect()
}
