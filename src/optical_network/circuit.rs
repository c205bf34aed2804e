use std::fmt::Display;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dsa::interval_set::SlotInterval;
use crate::optical_network::mesh::NodeId;
use crate::optical_network::modulation::Modulation;
use crate::optical_network::route::Route;

#[derive(Clone,Copy,Debug,PartialEq,Eq,Hash,PartialOrd,Ord,Serialize,Deserialize)]
pub struct CircuitId(pub u64);

impl nohash::IsEnabled for CircuitId {}

impl Display for CircuitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f,"circuit#{}",self.0)
    }
}

pub type CircuitTable = std::collections::HashMap<CircuitId,Circuit,nohash::BuildNoHashHasher<CircuitId>>;

pub type RequestId = u64;

// one logical connection, bandwidth in bit/s
#[derive(Clone,Copy,Debug,PartialEq)]
pub struct Request {
    pub id:RequestId,
    pub source:NodeId,
    pub destination:NodeId,
    pub bandwidth:f64,
}

// what a circuit has to carry when it is set up
#[derive(Clone,Debug,PartialEq)]
pub struct Demand {
    pub source:NodeId,
    pub destination:NodeId,
    pub requests:Vec<Request>,
}

impl Demand {
    pub fn new(source:NodeId,destination:NodeId,requests:Vec<Request>) -> Self {
        Self {source,destination,requests}
    }
    pub fn single(request:Request) -> Self {
        Self {source:request.source,destination:request.destination,requests:vec![request]}
    }
    pub fn bandwidth(&self) -> f64 {
        self.requests.iter().map(|r| r.bandwidth).sum()
    }
}

#[derive(Clone,Copy,Debug,PartialEq,Serialize)]
pub struct QotReport {
    pub snr_db:f64,
    pub snr_linear:f64,
    pub admissible:bool,
}

#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum CircuitState {
    Proposed,
    Allocated,
    SelfQotChecked,
    OthersQotChecked,
    Committed,
    RolledBack,
}

#[derive(Clone,Debug)]
pub struct Circuit {
    pub(crate) id:CircuitId,
    pub(crate) route:Route,
    pub(crate) modulation:Arc<Modulation>,
    pub(crate) band:SlotInterval,
    pub(crate) requests:Vec<Request>,
    // None until the qot engine has looked at it
    pub(crate) qot:Option<QotReport>,
    pub(crate) qot_for_others:Option<bool>,
    pub(crate) state:CircuitState,
}

impl Circuit {
    pub(crate) fn proposed(id:CircuitId,route:Route,modulation:Arc<Modulation>,
        band:SlotInterval,requests:Vec<Request>) -> Self {
        Self {id,route,modulation,band,requests,qot:None,qot_for_others:None,state:CircuitState::Proposed}
    }
    pub fn id(&self) -> CircuitId {
        self.id
    }
    pub fn source(&self) -> NodeId {
        self.route.source()
    }
    pub fn destination(&self) -> NodeId {
        self.route.destination()
    }
    pub fn route(&self) -> &Route {
        &self.route
    }
    pub fn modulation(&self) -> &Arc<Modulation> {
        &self.modulation
    }
    pub fn band(&self) -> SlotInterval {
        self.band
    }
    pub fn requests(&self) -> &[Request] {
        &self.requests
    }
    pub fn bandwidth(&self) -> f64 {
        self.requests.iter().map(|r| r.bandwidth).sum()
    }
    pub fn qot(&self) -> Option<QotReport> {
        self.qot
    }
    pub fn snr_db(&self) -> Option<f64> {
        self.qot.map(|q| q.snr_db)
    }
    pub fn qot_for_others(&self) -> Option<bool> {
        self.qot_for_others
    }
    pub fn state(&self) -> CircuitState {
        self.state
    }
    // spare capacity of the current band at the current modulation
    pub fn residual_bandwidth(&self) -> f64 {
        let data_slots = self.band.width().saturating_sub(self.modulation.guard_band);
        let capacity = data_slots as f64*self.modulation.bits_per_symbol*self.modulation.slot_spectrum_band;
        (capacity - self.bandwidth()).max(0.0)
    }
}
