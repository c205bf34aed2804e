/* admission control over circuits

establish goes Proposed -> Allocated -> SelfQotChecked -> OthersQotChecked -> Committed,
anything failing after the allocation frees every slot taken for the attempt
and leaves the rest of the network as it was. expand is transactional the same way.
qot values of other circuits are only written once the whole attempt succeeded.
stored qot always describes the current occupancy, the active_qot switches
only decide whether a report may refuse an attempt */

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{ConfigError, FlexgridConfig};
use crate::dsa::interval_set::SlotInterval;
use crate::grmlsa::{Proposal, RmlsaStrategy};
use crate::optical_network::circuit::{Circuit, CircuitId, CircuitState, CircuitTable, Demand, QotReport, Request, RequestId};
use crate::optical_network::composer;
use crate::optical_network::mesh::{LinkId, Mesh, MeshError, NodeId};
use crate::optical_network::modulation::Modulation;
use crate::optical_network::route::Route;
use crate::optical_network::spectrum::SpectrumError;
use crate::scientific_computing::qot::{Channel, QotEngine};
use crate::scientific_computing::statistics::BlockCause;

#[derive(Error,Debug,Clone,PartialEq)]
pub enum EstablishError {
    #[error("no free transmitter at node {from} or no free receiver at node {to}")]
    NoFreeTransponder{from:NodeId,to:NodeId},
    #[error("no route, modulation and band can carry the demand")]
    NoFeasibleAllocation,
    #[error("allocation on link {link} failed")]
    AllocationRace{link:LinkId,#[source] cause:SpectrumError},
    #[error("snr of {snr_db:.2} dB is not enough for {modulation}")]
    InadmissibleQoT{snr_db:f64,modulation:String},
    #[error("admitting the circuit would take {victim} below its threshold")]
    DegradesOthers{victim:CircuitId},
    #[error("{0} is not an active circuit")]
    UnknownCircuit(CircuitId),
    #[error("route does not belong to this mesh")]
    InvalidRoute(#[from] MeshError),
    #[error("band {band} is not an edge of {current}")]
    NotAdjacent{band:SlotInterval,current:SlotInterval},
    #[error("band {band} is narrower than the {required} slots the demand needs")]
    BandTooNarrow{band:SlotInterval,required:usize},
}

impl EstablishError {
    pub fn block_cause(&self) -> BlockCause {
        match self {
            Self::NoFreeTransponder {..} => BlockCause::Transponder,
            Self::NoFeasibleAllocation => BlockCause::Spectrum,
            Self::InadmissibleQoT {..} => BlockCause::QotNew,
            Self::DegradesOthers {..} => BlockCause::QotOthers,
            Self::AllocationRace {..} | Self::UnknownCircuit(_)
                | Self::InvalidRoute(_) | Self::NotAdjacent {..}
                | Self::BandTooNarrow {..} => BlockCause::Other,
        }
    }
}

type Result<T> = std::result::Result<T,EstablishError>;

// impact of a hypothetical circuit on the active ones it shares links with
#[derive(Clone,Copy,Debug,PartialEq)]
pub struct OthersImpact {
    pub all_admissible:bool,
    // lowest snr margin over threshold, dB, None without neighbours
    pub worst_margin_db:Option<f64>,
}

// qot values computed for an attempt, written back only on success
#[derive(Debug,Default)]
struct QotUpdate {
    own:Option<QotReport>,
    others:Vec<(CircuitId,QotReport)>,
}

pub struct ControlPlane {
    mesh:Mesh,
    qot:QotEngine,
    strategy:Box<dyn RmlsaStrategy>,
    modulations:Vec<Arc<Modulation>>,
    circuits:CircuitTable,
    // (source, destination) -> committed circuits
    active:BTreeMap<(NodeId,NodeId),Vec<CircuitId>>,
    next_id:u64,
}

impl ControlPlane {
    pub fn new(mesh:Mesh,qot:QotEngine,strategy:Box<dyn RmlsaStrategy>,modulations:Vec<Arc<Modulation>>) -> Self {
        Self {
            mesh,
            qot,
            strategy,
            modulations,
            circuits:CircuitTable::default(),
            active:BTreeMap::new(),
            next_id:0,
        }
    }

    pub fn from_config(config:&FlexgridConfig,strategy:Box<dyn RmlsaStrategy>) -> std::result::Result<Self,ConfigError> {
        config.validate()?;
        let mesh = config.network.build_mesh()?;
        let qot = QotEngine::new(config.physical.clone());
        Ok(Self::new(mesh,qot,strategy,config.network.modulations()))
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }
    pub fn qot_engine(&self) -> &QotEngine {
        &self.qot
    }
    pub fn modulations(&self) -> &[Arc<Modulation>] {
        &self.modulations
    }
    pub fn circuit(&self,id:CircuitId) -> Option<&Circuit> {
        self.circuits.get(&id)
    }
    pub fn circuits(&self) -> impl Iterator<Item = &Circuit> {
        self.circuits.values()
    }
    pub fn active_count(&self) -> usize {
        self.circuits.len()
    }
    pub fn active_circuits(&self,source:NodeId,destination:NodeId) -> &[CircuitId] {
        self.active.get(&(source,destination)).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn required_slots(&self,modulation:&Modulation,bandwidth:f64) -> usize {
        self.qot.required_slots(modulation,bandwidth)
    }

    pub fn compose_free_bands(&self,route:&Route,guard_band:usize) -> Vec<SlotInterval> {
        composer::merge(&self.mesh,route,guard_band)
    }

    // side effect free, `subject` names an active circuit being re-evaluated on a new band
    pub fn evaluate_qot(&self,subject:Option<CircuitId>,route:&Route,modulation:&Modulation,
        band:SlotInterval,count_own:bool) -> QotReport {
        let channel = Channel {id:subject,route,modulation,band};
        self.qot.evaluate(&self.mesh,&self.circuits,&channel,count_own,None)
    }

    // every active circuit re-evaluated as if the candidate were lit as well
    pub fn evaluate_others(&self,route:&Route,modulation:&Modulation,band:SlotInterval) -> OthersImpact {
        let candidate = Channel {id:None,route,modulation,band};
        let mut impact = OthersImpact {all_admissible:true,worst_margin_db:None};
        for id in self.neighbours(route,None) {
            let Some(circuit) = self.circuits.get(&id) else {continue};
            let channel = Channel {id:Some(id),route:&circuit.route,modulation:&circuit.modulation,band:circuit.band};
            let report = self.qot.evaluate(&self.mesh,&self.circuits,&channel,true,Some(&candidate));
            impact.all_admissible &= report.admissible;
            let margin = report.snr_db - circuit.modulation.snr_threshold_db;
            impact.worst_margin_db = Some(impact.worst_margin_db.map_or(margin,|w| w.min(margin)));
        }
        impact
    }

    // circuits registered on any link of `route`, ascending
    fn neighbours(&self,route:&Route,except:Option<CircuitId>) -> BTreeSet<CircuitId> {
        route.links().iter()
            .filter_map(|id| self.mesh.link(*id))
            .flat_map(|link| link.circuits())
            .filter(|id| Some(*id) != except)
            .collect()
    }

    fn check_transponders(&self,source:NodeId,destination:NodeId) -> Result<()> {
        let tx_free = self.mesh.node(source)?.transmitters().has_free();
        let rx_free = self.mesh.node(destination)?.receivers().has_free();
        if !tx_free || !rx_free {
            return Err(EstablishError::NoFreeTransponder {from:source,to:destination});
        }
        Ok(())
    }

    // the route must have been built over this mesh
    fn check_route(&self,route:&Route) -> Result<()> {
        for (pair,link) in route.nodes().windows(2).zip(route.links()) {
            let (source,destination) = (pair[0],pair[1]);
            if self.mesh.link_between(source,destination) != Some(*link) {
                return Err(EstablishError::InvalidRoute(MeshError::NoLink {from:source,to:destination}));
            }
        }
        Ok(())
    }

    pub fn establish(&mut self,demand:&Demand) -> Result<CircuitId> {
        self.check_transponders(demand.source,demand.destination)?;
        let Some(proposal) = self.strategy.propose(demand,self) else {
            debug!(source = demand.source,destination = demand.destination,"no feasible allocation");
            return Err(EstablishError::NoFeasibleAllocation);
        };
        self.admit(demand,proposal)
    }

    // establish with a proposal chosen by the caller instead of the strategy
    pub fn establish_with(&mut self,demand:&Demand,proposal:Proposal) -> Result<CircuitId> {
        self.check_transponders(demand.source,demand.destination)?;
        self.admit(demand,proposal)
    }

    fn admit(&mut self,demand:&Demand,proposal:Proposal) -> Result<CircuitId> {
        let Proposal {route,modulation,band} = proposal;
        self.check_route(&route)?;
        if route.source() != demand.source || route.destination() != demand.destination {
            return Err(EstablishError::InvalidRoute(MeshError::InvalidRoute {nodes:route.nodes().to_vec()}));
        }
        let required = self.required_slots(&modulation,demand.bandwidth());
        if band.width() < required {
            debug!(%band,required,"band too narrow");
            return Err(EstablishError::BandTooNarrow {band,required});
        }
        let id = CircuitId(self.next_id);
        self.next_id += 1;
        debug!(circuit = %id,%band,modulation = %modulation,hops = route.hops(),"proposed");

        self.allocate_band(id,route.links(),band,true)?;
        let links = route.links().to_vec();
        let mut circuit = Circuit::proposed(id,route,modulation,band,demand.requests.clone());
        circuit.state = CircuitState::Allocated;
        self.circuits.insert(id,circuit);
        debug!(circuit = %id,"allocated");

        let update = match self.verify_qot(id) {
            Ok(update) => update,
            Err(e) => {
                self.roll_back(id,&links,band);
                return Err(e);
            }
        };
        self.apply_qot(id,update);
        self.commit(id,demand.source,demand.destination);
        Ok(id)
    }

    fn commit(&mut self,id:CircuitId,source:NodeId,destination:NodeId) {
        if let Ok(node) = self.mesh.node_mut(source) {
            if !node.transmitters.allocate() {
                warn!(circuit = %id,node = source,"committed without a free transmitter");
            }
        }
        if let Ok(node) = self.mesh.node_mut(destination) {
            if !node.receivers.allocate() {
                warn!(circuit = %id,node = destination,"committed without a free receiver");
            }
        }
        self.active.entry((source,destination)).or_default().push(id);
        if let Some(circuit) = self.circuits.get_mut(&id) {
            circuit.state = CircuitState::Committed;
        }
        debug!(circuit = %id,"committed");
    }

    fn roll_back(&mut self,id:CircuitId,links:&[LinkId],band:SlotInterval) {
        self.free_band(id,links,band,true);
        if let Some(mut circuit) = self.circuits.remove(&id) {
            circuit.state = CircuitState::RolledBack;
            debug!(circuit = %id,state = ?circuit.state,"rolled back");
        }
    }

    /* takes `band` on every link or on none of them.
    `register` also records the circuit on each link it lights */
    fn allocate_band(&mut self,id:CircuitId,links:&[LinkId],band:SlotInterval,register:bool) -> Result<()> {
        for (done,link_id) in links.iter().enumerate() {
            let outcome = match self.mesh.link_mut(*link_id) {
                Some(link) => link.spectrum.allocate(band).map(|_| {
                    if register {
                        link.circuits.insert(id);
                    }
                }),
                None => Err(SpectrumError::NotFree {first:band.first,last:band.last}),
            };
            if let Err(cause) = outcome {
                warn!(circuit = %id,link = link_id,%band,%cause,"allocation failed, undoing {done} links");
                self.free_band(id,&links[..done],band,register);
                return Err(EstablishError::AllocationRace {link:*link_id,cause});
            }
        }
        Ok(())
    }

    // `unregister` drops the circuit from the link sets as well
    fn free_band(&mut self,id:CircuitId,links:&[LinkId],band:SlotInterval,unregister:bool) {
        for link_id in links {
            let Some(link) = self.mesh.link_mut(*link_id) else {continue};
            if let Err(cause) = link.spectrum.free(band) {
                warn!(circuit = %id,link = link_id,%band,%cause,"ledger inconsistency while freeing");
            }
            if unregister {
                link.circuits.remove(&id);
            }
        }
    }

    // qot of `id` and of every circuit sharing a link with it, nothing is written
    fn verify_qot(&self,id:CircuitId) -> Result<QotUpdate> {
        let Some(circuit) = self.circuits.get(&id) else {
            return Err(EstablishError::UnknownCircuit(id));
        };
        let config = self.qot.config();
        let mut update = QotUpdate::default();

        let report = self.evaluate_qot(Some(id),&circuit.route,&circuit.modulation,circuit.band,true);
        if config.active_qot {
            if !report.admissible {
                debug!(circuit = %id,snr_db = report.snr_db,"inadmissible qot");
                return Err(EstablishError::InadmissibleQoT {snr_db:report.snr_db,modulation:circuit.modulation.name.clone()});
            }
            debug!(circuit = %id,"self qot checked");
        }
        update.own = Some(report);

        for other in self.neighbours(&circuit.route,Some(id)) {
            let Some(neighbour) = self.circuits.get(&other) else {continue};
            let report = self.evaluate_qot(Some(other),&neighbour.route,&neighbour.modulation,neighbour.band,true);
            if config.active_qot_for_other && !report.admissible {
                debug!(circuit = %id,victim = %other,snr_db = report.snr_db,"degrades others");
                return Err(EstablishError::DegradesOthers {victim:other});
            }
            update.others.push((other,report));
        }
        if config.active_qot_for_other {
            debug!(circuit = %id,checked = update.others.len(),"others qot checked");
        }
        Ok(update)
    }

    fn apply_qot(&mut self,id:CircuitId,update:QotUpdate) {
        let (self_checked,others_checked) = (self.qot.config().active_qot,self.qot.config().active_qot_for_other);
        if let Some(circuit) = self.circuits.get_mut(&id) {
            circuit.qot = update.own;
            if self_checked {
                circuit.state = CircuitState::SelfQotChecked;
            }
            if others_checked {
                circuit.qot_for_others = Some(true);
                circuit.state = CircuitState::OthersQotChecked;
            }
        }
        for (other,report) in update.others {
            if let Some(neighbour) = self.circuits.get_mut(&other) {
                neighbour.qot = Some(report);
            }
        }
    }

    // fresh qot for a circuit and its neighbours, no admission decision
    fn refresh_qot(&mut self,id:CircuitId) {
        let Some(circuit) = self.circuits.get(&id) else {return};
        let mut targets:Vec<CircuitId> = self.neighbours(&circuit.route,Some(id)).into_iter().collect();
        targets.push(id);
        self.refresh_reports(targets);
    }

    fn refresh_reports(&mut self,targets:Vec<CircuitId>) {
        let reports:Vec<(CircuitId,QotReport)> = targets.into_iter().filter_map(|target| {
            let c = self.circuits.get(&target)?;
            Some((target,self.evaluate_qot(Some(target),&c.route,&c.modulation,c.band,true)))
        }).collect();
        for (target,report) in reports {
            if let Some(c) = self.circuits.get_mut(&target) {
                c.qot = Some(report);
            }
        }
    }

    // the only way a circuit leaves the table
    pub fn release(&mut self,id:CircuitId) -> Result<Circuit> {
        let Some(circuit) = self.circuits.get(&id) else {
            return Err(EstablishError::UnknownCircuit(id));
        };
        let links = circuit.route.links().to_vec();
        let (band,source,destination) = (circuit.band,circuit.source(),circuit.destination());
        let neighbours:Vec<CircuitId> = self.neighbours(&circuit.route,Some(id)).into_iter().collect();
        self.free_band(id,&links,band,true);
        if let Some(list) = self.active.get_mut(&(source,destination)) {
            list.retain(|c| *c != id);
            if list.is_empty() {
                self.active.remove(&(source,destination));
            }
        }
        if let Ok(node) = self.mesh.node_mut(source) {
            if !node.transmitters.release() {
                warn!(circuit = %id,node = source,"no transmitter in use to release");
            }
        }
        if let Ok(node) = self.mesh.node_mut(destination) {
            if !node.receivers.release() {
                warn!(circuit = %id,node = destination,"no receiver in use to release");
            }
        }
        debug!(circuit = %id,%band,"released");
        let released = self.circuits.remove(&id).ok_or(EstablishError::UnknownCircuit(id))?;
        // the neighbours lost an interferer
        self.refresh_reports(neighbours);
        Ok(released)
    }

    /* grows a circuit by bands touching its current edges.
    both halves succeed or nothing changes, including the qot checks */
    pub fn expand(&mut self,id:CircuitId,upper:Option<SlotInterval>,lower:Option<SlotInterval>) -> Result<()> {
        let Some(circuit) = self.circuits.get(&id) else {
            return Err(EstablishError::UnknownCircuit(id));
        };
        let current = circuit.band;
        let links = circuit.route.links().to_vec();
        if let Some(band) = upper {
            if !band.is_valid() || band.first != current.last + 1 {
                return Err(EstablishError::NotAdjacent {band,current});
            }
        }
        if let Some(band) = lower {
            if !band.is_valid() || band.last + 1 != current.first {
                return Err(EstablishError::NotAdjacent {band,current});
            }
        }

        if let Some(band) = upper {
            self.allocate_band(id,&links,band,false)?;
        }
        if let Some(band) = lower {
            if let Err(e) = self.allocate_band(id,&links,band,false) {
                if let Some(taken) = upper {
                    self.free_band(id,&links,taken,false);
                }
                return Err(e);
            }
        }
        let grown = SlotInterval::new(
            lower.map_or(current.first,|b| b.first),
            upper.map_or(current.last,|b| b.last));
        debug_assert!(grown.is_valid() && grown.contains(&current),"expanded {current} into {grown}");
        self.set_band(id,grown);

        match self.verify_qot(id) {
            Ok(update) => {
                self.apply_qot(id,update);
                self.set_state(id,CircuitState::Committed);
                debug!(circuit = %id,from = %current,to = %grown,"expanded");
                Ok(())
            }
            Err(e) => {
                self.set_band(id,current);
                for band in [upper,lower].into_iter().flatten() {
                    self.free_band(id,&links,band,false);
                }
                Err(e)
            }
        }
    }

    /* shrinks a circuit from its edges, `lower` must start at the first slot
    and `upper` end at the last one, at least one slot stays lit */
    pub fn retract(&mut self,id:CircuitId,lower:Option<SlotInterval>,upper:Option<SlotInterval>) -> Result<()> {
        let Some(circuit) = self.circuits.get(&id) else {
            return Err(EstablishError::UnknownCircuit(id));
        };
        let current = circuit.band;
        let links = circuit.route.links().to_vec();
        let first = match lower {
            Some(band) if band.is_valid() && band.first == current.first && band.last < current.last => band.last + 1,
            Some(band) => return Err(EstablishError::NotAdjacent {band,current}),
            None => current.first,
        };
        let last = match upper {
            Some(band) if band.is_valid() && band.last == current.last && band.first > current.first => band.first - 1,
            Some(band) => return Err(EstablishError::NotAdjacent {band,current}),
            None => current.last,
        };
        if first > last {
            let band = SlotInterval::new(current.first,current.last);
            return Err(EstablishError::NotAdjacent {band,current});
        }
        for band in [lower,upper].into_iter().flatten() {
            self.free_band(id,&links,band,false);
        }
        let shrunk = SlotInterval::new(first,last);
        debug_assert!(shrunk.is_valid() && current.contains(&shrunk),"retracted {current} into {shrunk}");
        self.set_band(id,shrunk);
        self.refresh_qot(id);
        debug!(circuit = %id,from = %current,to = %shrunk,"retracted");
        Ok(())
    }

    fn set_band(&mut self,id:CircuitId,band:SlotInterval) {
        if let Some(circuit) = self.circuits.get_mut(&id) {
            circuit.band = band;
        }
    }

    fn set_state(&mut self,id:CircuitId,state:CircuitState) {
        if let Some(circuit) = self.circuits.get_mut(&id) {
            circuit.state = state;
        }
    }

    pub fn attach_request(&mut self,id:CircuitId,request:Request) -> Result<()> {
        let circuit = self.circuits.get_mut(&id).ok_or(EstablishError::UnknownCircuit(id))?;
        circuit.requests.push(request);
        Ok(())
    }

    pub fn detach_request(&mut self,id:CircuitId,request:RequestId) -> Result<Option<Request>> {
        let circuit = self.circuits.get_mut(&id).ok_or(EstablishError::UnknownCircuit(id))?;
        let position = circuit.requests.iter().position(|r| r.id == request);
        Ok(position.map(|p| circuit.requests.remove(p)))
    }
}
