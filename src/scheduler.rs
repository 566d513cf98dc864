use crate::aircraft::AircraftId;
use crate::config::SimConfig;
use crate::error::SimError;
use crate::network::Network;
use crate::record::{EventLog, FlightKind};
use crate::time::Time;
use crate::vertiport::VertiportId;

mod dispatch;
mod rebalance;

pub use dispatch::Selection;
pub use rebalance::NodeSupply;


/// A flight decided this tick. The aircraft is already reserved and booked
/// into its airspace; the simulation tries admission after `delay`.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchOrder {
    pub aircraft: AircraftId,
    pub origin: VertiportId,
    pub destination: VertiportId,
    pub delay: Time,
    pub kind: FlightKind,
    pub passengers: usize,
}

/// Outcome of the admission check made before committing to a flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Now,
    After(Time),
    Full,
}

/// Dispatch and rebalancing policy. Holds configuration only; all state is
/// read from and written to the [`Network`].
#[derive(Debug, Clone)]
pub struct Scheduler {
    pub passenger_threshold: usize,
    pub max_wait_time: Time,
    pub energy_safety_factor: f64,
    pub min_reserve_soc: f64,
    pub flight_ready_soc: f64,
    pub airspace_entry_margin: Time,
    pub rebalancing: bool,
    pub deficit_buffer: f64,
    pub supply_buffer: f64,
}

impl Scheduler {
    pub fn new(config: &SimConfig) -> Scheduler {
        Scheduler {
            passenger_threshold: config.passenger_threshold,
            max_wait_time: config.max_wait_time,
            energy_safety_factor: config.energy_safety_factor,
            min_reserve_soc: config.min_reserve_soc,
            flight_ready_soc: config.flight_ready_soc,
            airspace_entry_margin: config.airspace_entry_margin,
            rebalancing: config.rebalancing,
            deficit_buffer: config.deficit_buffer,
            supply_buffer: config.supply_buffer,
        }
    }

    /// One scheduling pass: passenger dispatch, then rebalancing.
    pub fn run(&self, net: &mut Network, now: Time, log: &mut EventLog) -> Result<Vec<LaunchOrder>, SimError> {
        let mut orders = vec![];
        self.make_dispatch_decision(net, now, log, &mut orders)?;
        if self.rebalancing {
            self.rebalance(net, now, log, &mut orders)?;
        }
        Ok(orders)
    }

    /// Free slots count reserved aircraft that have not entered yet, whichever
    /// tick booked them. When the occupants hold every slot, the launch waits
    /// for the first one expected to leave.
    fn admission(&self, net: &Network, origin: &VertiportId, destination: &VertiportId) -> Result<Admission, SimError> {
        let airspace = net.airspace(origin, destination)?;
        let booked = airspace.booked().len();
        if airspace.occupants().len() + booked < airspace.capacity {
            return Ok(Admission::Now);
        }
        if booked > 0 {
            return Ok(Admission::Full);
        }
        Ok(match net.time_until_availability(&airspace.id(), self.airspace_entry_margin)? {
            Some(wait) => Admission::After(wait),
            None => Admission::Full,
        })
    }
}

/// `round(target * buffer)`, halves to even.
fn scaled_target(target: usize, buffer: f64) -> usize {
    (target as f64 * buffer).round_ties_even() as usize
}
