use crate::aircraft::AircraftId;
use crate::passenger::PassengerId;
use crate::time::Time;
use crate::vertiport::VertiportId;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Resumption points of the simulated processes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Passenger at this index of the arrival schedule shows up.
    PassengerArrival(usize),
    /// Periodic network refresh, dispatch and rebalancing.
    Tick,
    /// First admission attempt of a reserved aircraft.
    Launch {
        aircraft: AircraftId,
        destination: VertiportId,
    },
    /// Second and last admission attempt after an airspace-full wait.
    AdmissionRetry {
        aircraft: AircraftId,
        destination: VertiportId,
    },
    /// End of a flight sub-step (a whole leg in fast mode).
    FlightStep(AircraftId),
    /// The carrying aircraft parked at the end of the passenger's leg.
    LegComplete(PassengerId),
}

#[derive(Debug)]
struct Scheduled {
    at: Time,
    seq: u64,
    event: Event,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// min-heap on (at, seq)
impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        other.at.cmp(&self.at).then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Pending events ordered by time, ties resolved first-scheduled-first.
#[derive(Debug, Default)]
pub struct EventQueue {
    now: Time,
    next_seq: u64,
    queue: BinaryHeap<Scheduled>,
}

impl EventQueue {
    pub fn new(now: Time) -> EventQueue {
        EventQueue {
            now,
            ..EventQueue::default()
        }
    }

    pub fn now(&self) -> Time {
        self.now
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Events can't be scheduled in the past; earlier times run now.
    pub fn schedule_at(&mut self, at: Time, event: Event) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Scheduled {
            at: at.max(self.now),
            seq,
            event,
        });
    }

    pub fn schedule_in(&mut self, delay: Time, event: Event) {
        self.schedule_at(self.now + delay, event);
    }

    pub fn peek_time(&self) -> Option<Time> {
        self.queue.peek().map(|s| s.at)
    }

    /// Removes the next event and moves the clock to its time.
    pub fn pop(&mut self) -> Option<(Time, Event)> {
        let next = self.queue.pop()?;
        self.now = next.at;
        Some((next.at, next.event))
    }

    /// Moves the clock forward without handling anything, e.g. when a run
    /// stops between two events.
    pub fn advance_to(&mut self, at: Time) {
        self.now = self.now.max(at);
    }
}
