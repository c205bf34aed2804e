/* discrete event driver
poisson arrivals between uniformly drawn node pairs,
exponential holding times, one control plane per replication.
time is simulated only, nothing here waits on a clock */

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, FlexgridConfig, SimulationConfig};
use crate::grmlsa::grooming::{NoTrafficGrooming, SimpleTrafficGrooming};
use crate::grmlsa::integrated::Grmlsa;
use crate::grmlsa::{RmlsaStrategy, TrafficGrooming};
use crate::optical_network::circuit::Request;
use crate::optical_network::control_plane::ControlPlane;
use crate::optical_network::mesh::NodeId;
use crate::scientific_computing::statistics::BlockingStatistics;

#[derive(Clone,Copy,Debug,PartialEq)]
enum EventKind {
    Arrival,
    Departure(Request),
}

#[derive(Clone,Copy,Debug)]
struct Event {
    time:f64,
    // insertion order, breaks ties between simultaneous events
    seq:u64,
    kind:EventKind,
}

impl PartialEq for Event {
    fn eq(&self,other:&Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self,other:&Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// reversed, the heap pops the earliest event
impl Ord for Event {
    fn cmp(&self,other:&Self) -> Ordering {
        other.time.total_cmp(&self.time).then_with(|| other.seq.cmp(&self.seq))
    }
}

pub struct Simulation {
    cp:ControlPlane,
    grooming:Box<dyn TrafficGrooming>,
    config:SimulationConfig,
    rng:StdRng,
    pairs:Vec<(NodeId,NodeId)>,
    queue:BinaryHeap<Event>,
    seq:u64,
}

impl Simulation {
    pub fn new(cp:ControlPlane,grooming:Box<dyn TrafficGrooming>,config:SimulationConfig) -> Self {
        let nodes = cp.mesh().nodes().len();
        let pairs = (0..nodes)
            .flat_map(|s| (0..nodes).map(move |d| (s,d)))
            .filter(|(s,d)| s != d)
            .collect();
        Self {
            rng:StdRng::seed_from_u64(config.seed),
            cp,
            grooming,
            config,
            pairs,
            queue:BinaryHeap::new(),
            seq:0,
        }
    }

    // k shortest paths with qot driven modulation, grooming as configured
    pub fn from_config(config:&FlexgridConfig) -> Result<Self,ConfigError> {
        let strategy:Box<dyn RmlsaStrategy> = Box::new(Grmlsa::k_shortest_first_fit_by_qot(config.simulation.k_routes));
        let cp = ControlPlane::from_config(config,strategy)?;
        let grooming:Box<dyn TrafficGrooming> = if config.simulation.grooming {
            Box::new(SimpleTrafficGrooming::new())
        } else {
            Box::new(NoTrafficGrooming::new())
        };
        Ok(Self::new(cp,grooming,config.simulation.clone()))
    }

    pub fn control_plane(&self) -> &ControlPlane {
        &self.cp
    }

    fn exponential(&mut self,rate:f64) -> f64 {
        let u:f64 = self.rng.random();
        -(1.0 - u).ln()/rate
    }

    fn schedule(&mut self,time:f64,kind:EventKind) {
        self.queue.push(Event {time,seq:self.seq,kind});
        self.seq += 1;
    }

    fn next_request(&mut self,id:u64) -> Option<Request> {
        if self.pairs.is_empty() || self.config.bandwidths.is_empty() {return None}
        let (source,destination) = self.pairs[self.rng.random_range(0..self.pairs.len())];
        let bandwidth = self.config.bandwidths[self.rng.random_range(0..self.config.bandwidths.len())];
        Some(Request {id,source,destination,bandwidth})
    }

    /* serves `requests` arrivals and lets every accepted one depart,
    the network is empty again when this returns */
    pub fn run(&mut self) -> BlockingStatistics {
        let mut stats = BlockingStatistics::new();
        let mut generated:u64 = 0;
        if self.config.requests > 0 {
            let first = self.exponential(self.config.arrival_rate);
            self.schedule(first,EventKind::Arrival);
        }

        while let Some(event) = self.queue.pop() {
            match event.kind {
                EventKind::Arrival => {
                    let Some(request) = self.next_request(generated) else {break};
                    generated += 1;
                    match self.grooming.accommodate(request,&mut self.cp) {
                        Ok(_) => {
                            stats.record_accept(request.bandwidth);
                            let hold = self.exponential(self.config.departure_rate);
                            self.schedule(event.time + hold,EventKind::Departure(request));
                        }
                        Err(e) => {
                            debug!(request = request.id,%e,"blocked");
                            stats.record_block(request.bandwidth,e.block_cause());
                        }
                    }
                    stats.observe_utilization(self.cp.mesh().max_utilization());
                    stats.observe_fragmentation(self.cp.mesh().mean_external_fragmentation());
                    if (generated as usize) < self.config.requests {
                        let gap = self.exponential(self.config.arrival_rate);
                        self.schedule(event.time + gap,EventKind::Arrival);
                    }
                }
                EventKind::Departure(request) => {
                    if let Err(e) = self.grooming.finish(&request,&mut self.cp) {
                        warn!(request = request.id,%e,"departure failed");
                    }
                }
            }
        }

        info!(
            seed = self.config.seed,
            requests = stats.requests,
            blocked = stats.blocked(),
            blocking_probability = stats.blocking_probability(),
            bandwidth_blocking_ratio = stats.bandwidth_blocking_ratio(),
            max_utilization = stats.max_utilization,
            mean_fragmentation = stats.mean_fragmentation(),
            "replication finished"
        );
        stats
    }
}

// independent replications, seeds counting up from the configured one
pub fn run_replications(config:&FlexgridConfig,replications:usize) -> Result<Vec<BlockingStatistics>,ConfigError> {
    (0..replications as u64).map(|i| {
        let mut replication = config.clone();
        replication.simulation.seed = config.simulation.seed.wrapping_add(i);
        Simulation::from_config(&replication).map(|mut simulation| simulation.run())
    }).collect()
}

#[cfg(test)]
mod tests {
    use super::{run_replications, Event, EventKind, Simulation};
    use crate::config::{FlexgridConfig, NetworkConfig, PhysicalLayerConfig, SimulationConfig};
    use crate::scientific_computing::statistics::BlockCause;

    fn config(slots:usize,simulation:SimulationConfig) -> FlexgridConfig {
        FlexgridConfig {
            network:NetworkConfig::ring(4,slots,100.0),
            physical:PhysicalLayerConfig::default(),
            simulation,
        }
    }

    fn light(requests:usize) -> SimulationConfig {
        SimulationConfig {requests,..SimulationConfig::default()}
    }

    #[test]
    fn test_events_pop_in_time_order() {
        let mut heap = std::collections::BinaryHeap::new();
        for (seq,time) in [3.0,1.0,2.0,1.0].into_iter().enumerate() {
            heap.push(Event {time,seq:seq as u64,kind:EventKind::Arrival});
        }
        let order:Vec<(f64,u64)> = std::iter::from_fn(|| heap.pop()).map(|e| (e.time,e.seq)).collect();
        assert_eq!(order,vec![(1.0,1),(1.0,3),(2.0,2),(3.0,0)]);
    }

    #[test]
    fn test_run_drains_the_network() {
        let mut simulation = Simulation::from_config(&config(64,light(200))).unwrap();
        let stats = simulation.run();
        assert_eq!(stats.requests,200);
        assert_eq!(stats.accepted + stats.blocked(),200);
        assert_eq!(simulation.control_plane().active_count(),0);
        assert!(simulation.control_plane().mesh().links().iter().all(|l| l.spectrum().used_slots() == 0));
    }

    #[test]
    fn test_same_seed_same_outcome() {
        let heavy = SimulationConfig {requests:300,arrival_rate:100.0,departure_rate:0.1,..SimulationConfig::default()};
        let a = Simulation::from_config(&config(16,heavy.clone())).unwrap().run();
        let b = Simulation::from_config(&config(16,heavy)).unwrap().run();
        assert_eq!(a,b);
        assert!(a.blocked() > 0);
        assert!(a.blocked_by(BlockCause::Spectrum) > 0);
        assert!(a.max_utilization > 0.0 && a.max_utilization <= 1.0);
        assert_eq!(a.fragmentation_samples,300);
        assert!(a.mean_fragmentation() >= 0.0 && a.mean_fragmentation() < 1.0);
    }

    #[test]
    fn test_grooming_replications() {
        let groomed = SimulationConfig {requests:100,grooming:true,..SimulationConfig::default()};
        let runs = run_replications(&config(64,groomed),3).unwrap();
        assert_eq!(runs.len(),3);
        assert!(runs.iter().all(|s| s.requests == 100));
    }
}
