use crate::aircraft::AircraftId;
use crate::error::SimError;
use crate::time::{Time, deserialize_clock};
use crate::vertiport::VertiportId;
use serde::{Deserialize, Serialize};

pub type PassengerId = u64;

/// One row of the arrival schedule.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PassengerRequest {
    pub id: PassengerId,
    #[serde(deserialize_with = "deserialize_clock")]
    pub arrival_time: Time,
    pub origin: VertiportId,
    pub destination: VertiportId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassengerState {
    Waiting,
    Boarded,
    Done,
}

/// Outstanding "leg complete" signal, held from boarding until the carrying
/// aircraft parks at the leg's destination.
#[derive(Debug, Clone, PartialEq)]
pub struct LegHandle {
    pub leg_index: usize,
    pub aircraft: AircraftId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegRecord {
    pub origin: VertiportId,
    pub destination: VertiportId,
    pub aircraft: AircraftId,
    pub arrived_at: Time,
    pub boarded_at: Time,
    pub completed_at: Time,
    pub wait_time: Time,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassengerTripRecord {
    pub passenger_id: PassengerId,
    pub origin: VertiportId,
    pub destination: VertiportId,
    pub arrival_time: Time,
    pub completion_time: Time,
    pub total_wait_time: Time,
    pub total_travel_time: Time,
    pub legs: Vec<LegRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LegOutcome {
    /// Passenger now waits at this intermediate stop.
    Transfer(VertiportId),
    Finished(PassengerTripRecord),
}

#[derive(Debug, Clone)]
pub struct Passenger {
    pub id: PassengerId,
    pub itinerary: Vec<VertiportId>,
    pub leg_index: usize,
    pub arrival_time: Time,
    pub state: PassengerState,
    pub boarded_aircraft: Option<AircraftId>,
    /// time spent waiting at the current stop
    pub wait_time: Time,
    leg_arrival: Time,
    boarded_at: Time,
    leg_handle: Option<LegHandle>,
    history: Vec<LegRecord>,
}

impl Passenger {
    pub fn new(id: PassengerId, itinerary: Vec<VertiportId>, arrival_time: Time) -> Result<Passenger, SimError> {
        if itinerary.len() < 2 {
            return Err(SimError::ShortItinerary(id));
        }
        Ok(Passenger {
            id,
            itinerary,
            leg_index: 0,
            arrival_time,
            state: PassengerState::Waiting,
            boarded_aircraft: None,
            wait_time: Time::ZERO,
            leg_arrival: arrival_time,
            boarded_at: arrival_time,
            leg_handle: None,
            history: vec![],
        })
    }

    pub fn origin(&self) -> &VertiportId {
        &self.itinerary[0]
    }

    pub fn destination(&self) -> &VertiportId {
        &self.itinerary[self.itinerary.len() - 1]
    }

    pub fn current_stop(&self) -> &VertiportId {
        &self.itinerary[self.leg_index]
    }

    /// Stop the current leg flies to; `None` once the journey is over.
    pub fn next_stop(&self) -> Option<&VertiportId> {
        match self.state {
            PassengerState::Done => None,
            _ => self.itinerary.get(self.leg_index + 1),
        }
    }

    pub fn update_wait_time(&mut self, now: Time) {
        if self.state == PassengerState::Waiting {
            self.wait_time = now.saturating_sub(self.leg_arrival);
        }
    }

    pub fn board(&mut self, aircraft: &AircraftId, now: Time) {
        self.update_wait_time(now);
        self.state = PassengerState::Boarded;
        self.boarded_aircraft = Some(aircraft.clone());
        self.boarded_at = now;
        self.leg_handle = Some(LegHandle {
            leg_index: self.leg_index,
            aircraft: aircraft.clone(),
        });
    }

    pub fn has_leg_handle(&self, aircraft: &AircraftId) -> bool {
        self.leg_handle.as_ref().is_some_and(|h| h.aircraft == *aircraft)
    }

    /// Consumes the leg-complete signal. `None` when no leg was in progress.
    pub fn complete_leg(&mut self, now: Time) -> Option<LegOutcome> {
        let handle = self.leg_handle.take()?;
        let origin = self.itinerary[handle.leg_index].clone();
        let destination = self.itinerary[handle.leg_index + 1].clone();

        self.history.push(LegRecord {
            origin,
            destination: destination.clone(),
            aircraft: handle.aircraft,
            arrived_at: self.leg_arrival,
            boarded_at: self.boarded_at,
            completed_at: now,
            wait_time: self.wait_time,
        });

        self.boarded_aircraft = None;
        self.leg_index = handle.leg_index + 1;
        self.leg_arrival = now;
        self.wait_time = Time::ZERO;

        if self.leg_index + 1 < self.itinerary.len() {
            self.state = PassengerState::Waiting;
            return Some(LegOutcome::Transfer(destination));
        }

        self.state = PassengerState::Done;
        let total_wait_time = self.history.iter().fold(Time::ZERO, |acc, leg| acc + leg.wait_time);
        Some(LegOutcome::Finished(PassengerTripRecord {
            passenger_id: self.id,
            origin: self.origin().clone(),
            destination: self.destination().clone(),
            arrival_time: self.arrival_time,
            completion_time: now,
            total_wait_time,
            total_travel_time: now - self.arrival_time,
            legs: self.history.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn id(s: &str) -> Arc<str> {
        Arc::from(s)
    }

    #[test]
    fn test_single_stop_itinerary_is_rejected() {
        assert!(matches!(
            Passenger::new(7, vec![id("A")], Time(0)),
            Err(SimError::ShortItinerary(7))
        ));
    }

    #[test]
    fn test_two_leg_journey_accumulates_waits() {
        let mut passenger = Passenger::new(1, vec![id("A"), id("B"), id("C")], Time(100)).unwrap();
        assert_eq!(Some(&id("B")), passenger.next_stop());

        passenger.board(&id("AC_1"), Time(220));
        assert_eq!(Time(120), passenger.wait_time);
        assert!(passenger.has_leg_handle(&id("AC_1")));
        assert!(!passenger.has_leg_handle(&id("AC_2")));

        assert_eq!(Some(LegOutcome::Transfer(id("B"))), passenger.complete_leg(Time(600)));
        assert_eq!(PassengerState::Waiting, passenger.state);
        assert_eq!(Some(&id("C")), passenger.next_stop());

        passenger.update_wait_time(Time(660));
        passenger.board(&id("AC_2"), Time(720));

        let Some(LegOutcome::Finished(record)) = passenger.complete_leg(Time(1000)) else {
            panic!("journey should be finished");
        };
        assert_eq!(Time(120 + 120), record.total_wait_time);
        assert_eq!(Time(900), record.total_travel_time);
        assert_eq!(2, record.legs.len());
        let spans = record
            .legs
            .iter()
            .fold(Time::ZERO, |acc, leg| acc + (leg.completed_at - leg.boarded_at));
        assert_eq!(record.total_travel_time, spans + record.total_wait_time);
        assert_eq!(None, passenger.next_stop());
    }

    #[test]
    fn test_leg_completion_without_handle_is_none() {
        let mut passenger = Passenger::new(1, vec![id("A"), id("B")], Time(0)).unwrap();
        assert_eq!(None, passenger.complete_leg(Time(50)));
        assert_eq!(PassengerState::Waiting, passenger.state);
    }
}
