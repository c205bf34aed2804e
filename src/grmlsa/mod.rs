// routing, modulation level and spectrum assignment heuristics
// each one only proposes, the control plane decides and commits

use std::sync::Arc;

use crate::dsa::interval_set::SlotInterval;
use crate::optical_network::circuit::{CircuitId, Demand, Request};
use crate::optical_network::control_plane::{ControlPlane, EstablishError};
use crate::optical_network::modulation::Modulation;
use crate::optical_network::route::Route;

pub mod grooming;
pub mod integrated;
pub mod modulation_selection;
pub mod routing;
pub mod spectrum_assignment;

// a complete candidate for a demand, validated again on establish
#[derive(Clone,Debug,PartialEq)]
pub struct Proposal {
    pub route:Route,
    pub modulation:Arc<Modulation>,
    pub band:SlotInterval,
}

#[derive(Clone,Debug,PartialEq)]
pub struct ModulationChoice {
    pub modulation:Arc<Modulation>,
    pub band:SlotInterval,
}

pub trait Routing {
    // candidate routes from the demand's source to its destination, best first
    fn routes(&self,demand:&Demand,cp:&ControlPlane) -> Vec<Route>;
}

pub trait SpectrumAssignment {
    // picks `required_slots` contiguous slots out of the composed free bands
    fn policy(&self,required_slots:usize,free_bands:&[SlotInterval],
        demand:&Demand,cp:&ControlPlane) -> Option<SlotInterval>;
}

pub trait ModulationSelection {
    fn select(&self,demand:&Demand,route:&Route,assignment:&dyn SpectrumAssignment,
        cp:&ControlPlane) -> Option<ModulationChoice>;
}

pub trait RmlsaStrategy {
    fn propose(&self,demand:&Demand,cp:&ControlPlane) -> Option<Proposal>;
}

/* decides whether a request rides on an existing circuit
or gets a circuit of its own */
pub trait TrafficGrooming {
    fn accommodate(&mut self,request:Request,cp:&mut ControlPlane) -> Result<CircuitId,EstablishError>;
    fn finish(&mut self,request:&Request,cp:&mut ControlPlane) -> Result<(),EstablishError>;
}

// the band `assignment` picks for `modulation` on `route`, if any
pub fn assign(demand:&Demand,route:&Route,modulation:&Modulation,
    assignment:&dyn SpectrumAssignment,cp:&ControlPlane) -> Option<SlotInterval> {
    let required = cp.required_slots(modulation,demand.bandwidth());
    if required == 0 {return None}
    let free = cp.compose_free_bands(route,modulation.guard_band);
    assignment.policy(required,&free,demand,cp)
}
