use crate::record::{EventLog, FlightKind, SimEvent, SkipReason};
use crate::scheduler::tests::utils::*;
use crate::scheduler::{LaunchOrder, Scheduler, Selection};
use crate::time::Time;

fn skips(log: &EventLog) -> Vec<(String, SkipReason, Option<Time>)> {
    log.events
        .iter()
        .filter_map(|e| match e {
            SimEvent::DispatchSkipped {
                destination,
                reason,
                expected_wait,
                ..
            } => Some((destination.to_string(), *reason, *expected_wait)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_full_group_is_dispatched() {
    let cfg = config(4);
    let mut net = two_ports(&cfg, 1);
    for pid in 1..=4 {
        add_passenger(&mut net, pid, "A", "B", 0);
    }
    let mut log = EventLog::default();

    let orders = Scheduler::new(&cfg).run(&mut net, Time(0), &mut log).unwrap();

    assert_eq!(
        vec![LaunchOrder {
            aircraft: id("AC_1"),
            origin: id("A"),
            destination: id("B"),
            delay: Time(0),
            kind: FlightKind::Passenger,
            passengers: 4,
        }],
        orders
    );
    assert!(net.vertiports[&id("A")].waiting().is_empty());
    assert_eq!(vec![1, 2, 3, 4], net.aircraft[&id("AC_1")].current_passengers);
    assert!(net.aircraft[&id("AC_1")].is_reserved());
    assert!(!net.aircraft[&id("AC_1")].is_available());
}

#[test]
fn test_group_below_threshold_waits_silently() {
    let cfg = config(4);
    let mut net = two_ports(&cfg, 1);
    for pid in 1..=3 {
        add_passenger(&mut net, pid, "A", "B", 0);
    }
    let mut log = EventLog::default();

    let orders = Scheduler::new(&cfg).run(&mut net, Time(0), &mut log).unwrap();

    assert!(orders.is_empty());
    assert!(skips(&log).is_empty());
    assert_eq!(3, net.vertiports[&id("A")].waiting().len());
    assert!(!net.aircraft[&id("AC_1")].is_reserved());
}

#[test]
fn test_long_wait_forces_dispatch() {
    let cfg = config(4);
    let mut net = two_ports(&cfg, 1);
    add_passenger(&mut net, 1, "A", "B", 0);
    let scheduler = Scheduler::new(&cfg);
    let mut log = EventLog::default();

    net.update_network(Time(899), &mut log).unwrap();
    assert!(scheduler.run(&mut net, Time(899), &mut log).unwrap().is_empty());

    net.update_network(Time(900), &mut log).unwrap();
    let orders = scheduler.run(&mut net, Time(900), &mut log).unwrap();
    assert_eq!(1, orders.len());
    assert_eq!(1, orders[0].passengers);
    assert_eq!(Time(900), net.passenger(1).unwrap().wait_time);
}

#[test]
fn test_boarding_stops_at_threshold_in_arrival_order() {
    let cfg = config(4);
    let mut net = two_ports(&cfg, 1);
    for pid in 1..=6 {
        add_passenger(&mut net, pid, "A", "B", pid * 10);
    }
    let mut log = EventLog::default();

    let orders = Scheduler::new(&cfg).run(&mut net, Time(60), &mut log).unwrap();

    assert_eq!(4, orders[0].passengers);
    assert_eq!(vec![1, 2, 3, 4], net.aircraft[&id("AC_1")].current_passengers);
    assert_eq!(&[5, 6], net.vertiports[&id("A")].waiting());
}

#[test]
fn test_boarding_stops_at_cabin_size() {
    let cfg = config(6);
    let mut net = two_ports(&cfg, 1);
    for pid in 1..=6 {
        add_passenger(&mut net, pid, "A", "B", 0);
    }
    let mut log = EventLog::default();

    let orders = Scheduler::new(&cfg).run(&mut net, Time(0), &mut log).unwrap();

    assert_eq!(SEATS, orders[0].passengers);
    assert_eq!(2, net.vertiports[&id("A")].waiting().len());
}

#[test]
fn test_empty_vertiport_reports_expected_wait() {
    let cfg = config(1);
    let mut net = network_with(&cfg);
    add_vertiport(&mut net, "A");
    add_vertiport(&mut net, "B");
    add_airspace(&mut net, "A", "B", 1, 600, 16.0);
    add_airspace(&mut net, "B", "A", 1, 600, 16.0);
    add_aircraft(&mut net, "AC_1", "B", 1.0);
    launch(&mut net, "AC_1", "A", 0);
    add_passenger(&mut net, 1, "A", "B", 0);
    let mut log = EventLog::default();

    let orders = Scheduler::new(&cfg).run(&mut net, Time(100), &mut log).unwrap();

    assert!(orders.is_empty());
    // the inbound aircraft lands with soc 0.9, above the 0.33 the leg needs
    assert_eq!(
        vec![("B".to_string(), SkipReason::NoAircraft, Some(Time(600)))],
        skips(&log)
    );
    assert_eq!(1, net.vertiports[&id("A")].waiting().len());
}

#[test]
fn test_nothing_inbound_means_unknown_wait() {
    let cfg = config(1);
    let mut net = two_ports(&cfg, 1);
    add_passenger(&mut net, 1, "B", "A", 0);
    let mut log = EventLog::default();

    Scheduler::new(&cfg).run(&mut net, Time(0), &mut log).unwrap();

    assert_eq!(vec![("A".to_string(), SkipReason::NoAircraft, None)], skips(&log));
}

#[test]
fn test_selection_order() {
    let cfg = config(1);
    let scheduler = Scheduler::new(&cfg);
    let mut net = network_with(&cfg);
    add_vertiport(&mut net, "A");
    add_vertiport(&mut net, "B");
    add_airspace(&mut net, "A", "B", 1, 600, 16.0);

    add_aircraft(&mut net, "AC_1", "A", 0.3);
    assert_eq!(
        Selection::InsufficientCharge,
        scheduler.select_aircraft(&net, &id("A"), &id("B")).unwrap()
    );

    // 16 kWh * 1.3 of 160 kWh plus the 0.2 reserve
    add_aircraft(&mut net, "AC_2", "A", 0.5);
    assert_eq!(
        Selection::Charged(id("AC_2")),
        scheduler.select_aircraft(&net, &id("A"), &id("B")).unwrap()
    );

    add_aircraft(&mut net, "AC_3", "A", 1.0);
    assert_eq!(
        Selection::Ready(id("AC_3")),
        scheduler.select_aircraft(&net, &id("A"), &id("B")).unwrap()
    );

    assert_eq!(
        Selection::NoAircraft,
        scheduler.select_aircraft(&net, &id("B"), &id("A")).unwrap()
    );
}

#[test]
fn test_charged_aircraft_is_dispatched() {
    let cfg = config(1);
    let mut net = network_with(&cfg);
    add_vertiport(&mut net, "A");
    add_vertiport(&mut net, "B");
    add_airspace(&mut net, "A", "B", 1, 600, 16.0);
    add_aircraft(&mut net, "AC_1", "A", 0.3);
    add_aircraft(&mut net, "AC_2", "A", 0.5);
    add_passenger(&mut net, 1, "A", "B", 0);
    let mut log = EventLog::default();

    let orders = Scheduler::new(&cfg).run(&mut net, Time(0), &mut log).unwrap();

    assert_eq!(id("AC_2"), orders[0].aircraft);
    assert!(net.aircraft[&id("AC_2")].is_reserved());
}

#[test]
fn test_aircraft_is_not_booked_twice_in_one_tick() {
    let cfg = config(1);
    let mut net = network_with(&cfg);
    for v in ["A", "B", "C"] {
        add_vertiport(&mut net, v);
    }
    add_airspace(&mut net, "A", "B", 1, 600, 16.0);
    add_airspace(&mut net, "A", "C", 1, 600, 16.0);
    add_aircraft(&mut net, "AC_1", "A", 1.0);
    add_passenger(&mut net, 1, "A", "C", 0);
    add_passenger(&mut net, 2, "A", "B", 10);
    let mut log = EventLog::default();

    let orders = Scheduler::new(&cfg).run(&mut net, Time(10), &mut log).unwrap();

    assert_eq!(1, orders.len());
    assert_eq!(id("C"), orders[0].destination);
    assert_eq!(
        vec![("B".to_string(), SkipReason::InsufficientCharge, None)],
        skips(&log)
    );
    assert_eq!(&[2], net.vertiports[&id("A")].waiting());
}

#[test]
fn test_pending_launch_fills_airspace() {
    let cfg = config(1);
    let scheduler = Scheduler::new(&cfg);
    let mut net = two_ports(&cfg, 1);
    add_aircraft(&mut net, "AC_2", "A", 1.0);
    add_passenger(&mut net, 1, "A", "B", 0);
    let mut log = EventLog::default();
    let mut orders = vec![];

    scheduler
        .make_dispatch_decision(&mut net, Time(0), &mut log, &mut orders)
        .unwrap();
    add_passenger(&mut net, 2, "A", "B", 0);
    scheduler
        .make_dispatch_decision(&mut net, Time(0), &mut log, &mut orders)
        .unwrap();

    assert_eq!(1, orders.len());
    assert_eq!(vec![("B".to_string(), SkipReason::AirspaceFull, None)], skips(&log));
    assert_eq!(&[2], net.vertiports[&id("A")].waiting());
    assert!(!net.aircraft[&id("AC_2")].is_reserved());
}

#[test]
fn test_occupied_airspace_delays_launch() {
    let cfg = config(1);
    let mut net = two_ports(&cfg, 1);
    add_aircraft(&mut net, "AC_2", "A", 1.0);
    launch(&mut net, "AC_2", "B", 0);
    add_passenger(&mut net, 1, "A", "B", 0);
    let mut log = EventLog::default();

    let orders = Scheduler::new(&cfg).run(&mut net, Time(100), &mut log).unwrap();

    // the occupant's current leg counts in full, less the entry margin
    assert_eq!(Time(580), orders[0].delay);
    assert!(log.events.iter().any(|e| matches!(
        e,
        SimEvent::AirspaceWait { wait: Time(580), .. }
    )));
    assert!(net.aircraft[&id("AC_1")].is_reserved());
    assert!(net.vertiports[&id("A")].is_parked(&id("AC_1")));
}

#[test]
fn test_launch_waiting_from_an_earlier_tick_fills_airspace() {
    let cfg = config(1);
    let scheduler = Scheduler::new(&cfg);
    let mut net = two_ports(&cfg, 1);
    add_aircraft(&mut net, "AC_2", "A", 1.0);
    add_aircraft(&mut net, "AC_3", "A", 1.0);
    launch(&mut net, "AC_3", "B", 0);
    add_passenger(&mut net, 1, "A", "B", 0);
    let mut log = EventLog::default();

    let first = scheduler.run(&mut net, Time(100), &mut log).unwrap();
    assert_eq!(Time(580), first[0].delay);
    assert_eq!(&[id("AC_1")], net.airspace(&id("A"), &id("B")).unwrap().booked());

    add_passenger(&mut net, 2, "A", "B", 200);
    let second = scheduler.run(&mut net, Time(220), &mut log).unwrap();

    assert!(second.is_empty());
    assert_eq!(vec![("B".to_string(), SkipReason::AirspaceFull, None)], skips(&log));
    assert!(!net.aircraft[&id("AC_2")].is_reserved());
    assert!(net.invariant_violations().is_empty());
}
