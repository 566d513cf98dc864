use super::{Admission, LaunchOrder, Scheduler, scaled_target};
use crate::error::SimError;
use crate::network::Network;
use crate::record::{EventLog, FlightKind, SimEvent};
use crate::time::Time;
use crate::vertiport::VertiportId;
use log::{debug, info};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSupply {
    pub vertiport: VertiportId,
    pub supply: usize,
    pub target: usize,
}

impl NodeSupply {
    pub fn surplus(&self) -> i64 {
        self.supply as i64 - self.target as i64
    }
}

impl Scheduler {
    /// Splits the vertiports into deficit nodes (most deficient first) and
    /// surplus nodes (largest surplus first). Ties keep vertiport order.
    pub fn assess_supply(&self, net: &Network) -> (Vec<NodeSupply>, Vec<NodeSupply>) {
        let nodes = net.vertiport_order().iter().map(|id| NodeSupply {
            vertiport: id.clone(),
            supply: net.supply(id),
            target: net.initial_allocation(id),
        });

        let (mut deficits, rest): (Vec<_>, Vec<_>) = nodes.partition(|n| self.is_deficit(n));
        let mut surpluses: Vec<_> = rest.into_iter().filter(|n| n.supply > n.target).collect();

        deficits.sort_by_key(|n| n.surplus());
        surpluses.sort_by_key(|n| std::cmp::Reverse(n.surplus()));
        (deficits, surpluses)
    }

    /// Vertiports that started without aircraft are never in deficit.
    fn is_deficit(&self, node: &NodeSupply) -> bool {
        node.target > 0 && node.supply <= scaled_target(node.target, self.deficit_buffer)
    }

    /// Moves at most one idle aircraft into each deficit vertiport, taken from
    /// the inbound neighbor with the largest surplus that can spare one.
    pub fn rebalance(
        &self,
        net: &mut Network,
        now: Time,
        log: &mut EventLog,
        orders: &mut Vec<LaunchOrder>,
    ) -> Result<(), SimError> {
        let (deficits, surpluses) = self.assess_supply(net);
        if deficits.is_empty() {
            return Ok(());
        }
        debug!(
            "{}: deficits {:?}, surpluses {:?}",
            now,
            deficits.iter().map(|n| n.vertiport.as_ref()).collect::<Vec<_>>(),
            surpluses.iter().map(|n| n.vertiport.as_ref()).collect::<Vec<_>>()
        );

        // supply as it stands after the relocations already decided this pass
        let mut supply: HashMap<VertiportId, usize> = net
            .vertiport_order()
            .iter()
            .map(|id| (id.clone(), net.supply(id)))
            .collect();

        for deficit in deficits {
            log.push(SimEvent::Deficit {
                at: now,
                vertiport: deficit.vertiport.clone(),
                supply: deficit.supply,
                target: deficit.target,
            });

            let mut best: Option<(VertiportId, i64)> = None;
            for source in net.inbound_neighbors(&deficit.vertiport) {
                let source_supply = supply.get(&source).copied().unwrap_or(0);
                let target = net.initial_allocation(&source);
                if source_supply <= scaled_target(target, self.supply_buffer) {
                    continue;
                }
                if net.vertiport(&source)?.available_aircraft(&net.aircraft).is_empty() {
                    continue;
                }
                let score = source_supply as i64 - target as i64;
                if best.as_ref().is_none_or(|(_, s)| score > *s) {
                    best = Some((source, score));
                }
            }

            let Some((source, _)) = best else {
                debug!("{}: no neighbor can spare an aircraft for {}", now, deficit.vertiport);
                continue;
            };

            let delay = match self.admission(net, &source, &deficit.vertiport)? {
                Admission::Now => Time::ZERO,
                Admission::After(wait) => wait,
                Admission::Full => {
                    debug!(
                        "{}: airspace {}->{} is full, relocation deferred",
                        now, source, deficit.vertiport
                    );
                    continue;
                }
            };

            let Some(aircraft) = net
                .vertiport(&source)?
                .available_aircraft(&net.aircraft)
                .into_iter()
                .next()
            else {
                continue;
            };
            net.reserve_aircraft(&aircraft, &deficit.vertiport, now)?;

            if let Some(s) = supply.get_mut(&source) {
                *s -= 1;
            }
            *supply.entry(deficit.vertiport.clone()).or_default() += 1;

            info!(
                "{}: Aircraft {} rebalanced from {} to {}.",
                now, aircraft, source, deficit.vertiport
            );
            if delay > Time::ZERO {
                log.push(SimEvent::AirspaceWait {
                    at: now,
                    aircraft: aircraft.clone(),
                    origin: source.clone(),
                    destination: deficit.vertiport.clone(),
                    wait: delay,
                });
            }
            log.push(SimEvent::Dispatched {
                at: now,
                aircraft: aircraft.clone(),
                origin: source.clone(),
                destination: deficit.vertiport.clone(),
                passengers: 0,
                kind: FlightKind::Rebalance,
            });
            orders.push(LaunchOrder {
                aircraft,
                origin: source,
                destination: deficit.vertiport,
                delay,
                kind: FlightKind::Rebalance,
                passengers: 0,
            });
        }
        Ok(())
    }
}
