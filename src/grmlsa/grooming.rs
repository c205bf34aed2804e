use std::collections::HashMap;

use nohash::BuildNoHashHasher;
use tracing::debug;

use crate::dsa::interval_set::SlotInterval;
use crate::grmlsa::TrafficGrooming;
use crate::optical_network::circuit::{CircuitId, Demand, Request, RequestId};
use crate::optical_network::composer;
use crate::optical_network::control_plane::{ControlPlane, EstablishError};

type Served = HashMap<RequestId,CircuitId,BuildNoHashHasher<RequestId>>;

// one circuit per request
#[derive(Debug,Default)]
pub struct NoTrafficGrooming {
    served:Served,
}

impl NoTrafficGrooming {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TrafficGrooming for NoTrafficGrooming {
    fn accommodate(&mut self,request:Request,cp:&mut ControlPlane) -> Result<CircuitId,EstablishError> {
        let id = cp.establish(&Demand::single(request))?;
        self.served.insert(request.id,id);
        Ok(id)
    }

    // blocked requests have nothing to finish
    fn finish(&mut self,request:&Request,cp:&mut ControlPlane) -> Result<(),EstablishError> {
        let Some(id) = self.served.remove(&request.id) else {return Ok(())};
        cp.release(id).map(|_| ())
    }
}

/* requests between the same pair of nodes share circuits.
a circuit short of capacity grows into the free slots right
below it first and then above it, a new circuit is only set up
when no active one can take the request. on departure the
circuit gives back its upper slots, the last request releases it */
#[derive(Debug,Default)]
pub struct SimpleTrafficGrooming {
    served:Served,
}

impl SimpleTrafficGrooming {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn circuit_of(&self,request:RequestId) -> Option<CircuitId> {
        self.served.get(&request).copied()
    }

    // grows `id` enough to also carry `request`, false if it cannot
    fn groom_into(&self,id:CircuitId,request:&Request,cp:&mut ControlPlane) -> bool {
        let Some(circuit) = cp.circuit(id) else {return false};
        let band = circuit.band();
        let needed = cp.required_slots(circuit.modulation(),circuit.bandwidth() + request.bandwidth);
        if needed <= band.width() {return true}
        let below = composer::adjacent_below(cp.mesh(),circuit.route(),&band);
        let above = composer::adjacent_above(cp.mesh(),circuit.route(),&band);
        let Some((lower,upper)) = split_expansion(needed - band.width(),below,above) else {return false};
        match cp.expand(id,upper,lower) {
            Ok(()) => true,
            Err(e) => {
                debug!(circuit = %id,%e,"expansion refused");
                false
            }
        }
    }
}

// slots to take below and above, as much as possible below
fn split_expansion(extra:usize,below:Option<SlotInterval>,above:Option<SlotInterval>)
    -> Option<(Option<SlotInterval>,Option<SlotInterval>)> {
    let below_width = below.map_or(0,|b| b.width());
    let above_width = above.map_or(0,|b| b.width());
    if extra > below_width + above_width {return None}
    let take_below = extra.min(below_width);
    let take_above = extra - take_below;
    let lower = below.and_then(|b| SlotInterval::with_width(b.last + 1 - take_below,take_below));
    let upper = above.and_then(|b| SlotInterval::with_width(b.first,take_above));
    Some((lower,upper))
}

impl TrafficGrooming for SimpleTrafficGrooming {
    fn accommodate(&mut self,request:Request,cp:&mut ControlPlane) -> Result<CircuitId,EstablishError> {
        let candidates = cp.active_circuits(request.source,request.destination).to_vec();
        for id in candidates {
            if self.groom_into(id,&request,cp) {
                cp.attach_request(id,request)?;
                self.served.insert(request.id,id);
                debug!(circuit = %id,request = request.id,"groomed");
                return Ok(id);
            }
        }
        let id = cp.establish(&Demand::single(request))?;
        self.served.insert(request.id,id);
        Ok(id)
    }

    fn finish(&mut self,request:&Request,cp:&mut ControlPlane) -> Result<(),EstablishError> {
        let Some(id) = self.served.remove(&request.id) else {return Ok(())};
        let circuit = cp.circuit(id).ok_or(EstablishError::UnknownCircuit(id))?;
        if circuit.requests().len() <= 1 {
            return cp.release(id).map(|_| ());
        }
        let band = circuit.band();
        let needed = cp.required_slots(circuit.modulation(),circuit.bandwidth() - request.bandwidth).max(1);
        cp.detach_request(id,request.id)?;
        if needed < band.width() {
            cp.retract(id,None,Some(SlotInterval::new(band.first + needed,band.last)))?;
        }
        Ok(())
    }
}
