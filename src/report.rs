use crate::aircraft::{AircraftState, VehicleTripRecord};
use crate::network::Network;
use crate::passenger::PassengerTripRecord;
use crate::record::{EventLog, FlightKind, SimEvent};
use crate::time::Time;
use tabled::Tabled;

#[derive(Debug, Tabled)]
pub struct AircraftRow {
    #[tabled(rename = "Aircraft")]
    pub id: String,
    #[tabled(rename = "Type")]
    pub vehicle: String,
    #[tabled(rename = "State")]
    pub state: String,
    #[tabled(rename = "At / From")]
    pub location: String,
    #[tabled(rename = "To")]
    pub destination: String,
    #[tabled(rename = "SoC")]
    pub soc: String,
    #[tabled(rename = "Ready")]
    pub ready: String,
    #[tabled(rename = "Pax")]
    pub passengers: usize,
}

#[derive(Debug, Tabled)]
pub struct VertiportRow {
    #[tabled(rename = "Vertiport")]
    pub id: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Parked")]
    pub parked: usize,
    #[tabled(rename = "Inbound")]
    pub inbound: usize,
    #[tabled(rename = "Target")]
    pub target: usize,
    #[tabled(rename = "Waiting")]
    pub waiting: usize,
}

#[derive(Debug, Tabled)]
pub struct AirspaceRow {
    #[tabled(rename = "Airspace")]
    pub id: String,
    #[tabled(rename = "Route")]
    pub route: String,
    #[tabled(rename = "Capacity")]
    pub capacity: usize,
    #[tabled(rename = "Occupants")]
    pub occupants: String,
    #[tabled(rename = "Flight time")]
    pub flight_time: String,
}

#[derive(Debug, Tabled)]
pub struct PassengerTripRow {
    #[tabled(rename = "Passenger")]
    pub id: u64,
    #[tabled(rename = "From")]
    pub origin: String,
    #[tabled(rename = "To")]
    pub destination: String,
    #[tabled(rename = "Arrived")]
    pub arrival: String,
    #[tabled(rename = "Completed")]
    pub completion: String,
    #[tabled(rename = "Wait")]
    pub wait: String,
    #[tabled(rename = "Travel")]
    pub travel: String,
    #[tabled(rename = "Legs")]
    pub legs: usize,
}

#[derive(Debug, Tabled)]
pub struct VehicleTripRow {
    #[tabled(rename = "Aircraft")]
    pub id: String,
    #[tabled(rename = "From")]
    pub origin: String,
    #[tabled(rename = "To")]
    pub destination: String,
    #[tabled(rename = "Departed")]
    pub departure: String,
    #[tabled(rename = "Arrived")]
    pub arrival: String,
    #[tabled(rename = "SoC used")]
    pub soc_delta: String,
    #[tabled(rename = "Pax")]
    pub passengers: usize,
    #[tabled(rename = "Energy")]
    pub energy: String,
}

fn minutes(t: Time) -> String {
    format!("{}m{:02}s", t.0 / 60, t.0 % 60)
}

fn percent(soc: f64) -> String {
    format!("{:.1}%", soc * 100.0)
}

pub fn aircraft_rows(net: &Network) -> Vec<AircraftRow> {
    net.aircraft_order()
        .iter()
        .filter_map(|id| net.aircraft.get(id))
        .map(|ac| AircraftRow {
            id: ac.id.to_string(),
            vehicle: ac.vehicle.to_string(),
            state: ac.state.to_string(),
            location: ac.origin_vertiport.to_string(),
            destination: ac
                .destination_vertiport
                .as_ref()
                .map(|d| d.to_string())
                .unwrap_or_default(),
            soc: percent(ac.soc()),
            ready: match (ac.state, ac.is_reserved(), ac.flight_ready) {
                (AircraftState::Flying, _, _) => "-".to_string(),
                (_, true, _) => "reserved".to_string(),
                (_, false, ready) => if ready { "yes" } else { "no" }.to_string(),
            },
            passengers: ac.current_passengers.len(),
        })
        .collect()
}

pub fn vertiport_rows(net: &Network) -> Vec<VertiportRow> {
    net.vertiport_order()
        .iter()
        .filter_map(|id| net.vertiports.get(id))
        .map(|v| VertiportRow {
            id: v.id.to_string(),
            name: v.name.clone(),
            parked: v.parked().len(),
            inbound: net.inbound_aircraft(&v.id).len(),
            target: net.initial_allocation(&v.id),
            waiting: v.waiting().len(),
        })
        .collect()
}

pub fn airspace_rows(net: &Network) -> Vec<AirspaceRow> {
    let mut airspaces: Vec<_> = net.airspaces.values().collect();
    airspaces.sort_by_key(|a| a.id());
    airspaces
        .into_iter()
        .map(|a| AirspaceRow {
            id: format!("{}->{}", a.origin, a.destination),
            route: a.route.to_string(),
            capacity: a.capacity,
            occupants: a.occupants().join(", "),
            flight_time: minutes(a.flight_time()),
        })
        .collect()
}

pub fn passenger_trip_rows(trips: &[PassengerTripRecord]) -> Vec<PassengerTripRow> {
    trips
        .iter()
        .map(|t| PassengerTripRow {
            id: t.passenger_id,
            origin: t.origin.to_string(),
            destination: t.destination.to_string(),
            arrival: t.arrival_time.to_string(),
            completion: t.completion_time.to_string(),
            wait: minutes(t.total_wait_time),
            travel: minutes(t.total_travel_time),
            legs: t.legs.len(),
        })
        .collect()
}

pub fn vehicle_trip_rows(trips: &[VehicleTripRecord]) -> Vec<VehicleTripRow> {
    trips
        .iter()
        .map(|t| VehicleTripRow {
            id: t.aircraft_id.to_string(),
            origin: t.origin.to_string(),
            destination: t.destination.to_string(),
            departure: t.departure_time.to_string(),
            arrival: t.arrival_time.to_string(),
            soc_delta: percent(t.soc_delta),
            passengers: t.passengers,
            energy: format!("{:.1}", t.energy_consumed),
        })
        .collect()
}

/// Aggregate figures of a finished (or paused) run.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub now: Time,
    pub journeys: usize,
    pub still_travelling: usize,
    pub passenger_flights: usize,
    pub rebalancing_flights: usize,
    pub skipped: usize,
    pub anomalies: usize,
    pub mean_wait: Time,
    pub mean_travel: Time,
}

impl Summary {
    pub fn new(now: Time, net: &Network, log: &EventLog) -> Summary {
        let journeys = log.passenger_trips.len();
        let mean = |total: u64| Time(if journeys == 0 { 0 } else { total / journeys as u64 });
        let flights = |kind: FlightKind| log.dispatches().filter(|d| d.3 == kind).count();
        Summary {
            now,
            journeys,
            still_travelling: net.passengers.len(),
            passenger_flights: flights(FlightKind::Passenger),
            rebalancing_flights: flights(FlightKind::Rebalance),
            skipped: log
                .events
                .iter()
                .filter(|e| matches!(e, SimEvent::DispatchSkipped { .. }))
                .count(),
            anomalies: log.anomalies().count(),
            mean_wait: mean(log.passenger_trips.iter().map(|t| t.total_wait_time.0).sum()),
            mean_travel: mean(log.passenger_trips.iter().map(|t| t.total_travel_time.0).sum()),
        }
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Simulation time:      {}", self.now)?;
        writeln!(f, "Completed journeys:   {}", self.journeys)?;
        writeln!(f, "Still travelling:     {}", self.still_travelling)?;
        writeln!(f, "Passenger flights:    {}", self.passenger_flights)?;
        writeln!(f, "Rebalancing flights:  {}", self.rebalancing_flights)?;
        writeln!(f, "Skipped dispatches:   {}", self.skipped)?;
        writeln!(f, "Anomalies:            {}", self.anomalies)?;
        writeln!(f, "Mean wait:            {}", minutes(self.mean_wait))?;
        write!(f, "Mean travel:          {}", minutes(self.mean_travel))
    }
}
