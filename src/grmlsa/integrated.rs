use std::sync::Arc;

use crate::dsa::interval_set::SlotInterval;
use crate::grmlsa::modulation_selection::{ByDistance, ByQot};
use crate::grmlsa::routing::{KShortestPaths, ShortestPath};
use crate::grmlsa::spectrum_assignment::FirstFit;
use crate::grmlsa::{assign, ModulationSelection, Proposal, RmlsaStrategy, Routing, SpectrumAssignment};
use crate::optical_network::circuit::Demand;
use crate::optical_network::control_plane::ControlPlane;
use crate::optical_network::modulation::Modulation;
use crate::optical_network::route::Route;

/* routing, then modulation, then spectrum, route by route.
the first route whose proposal passes its own qot wins,
otherwise the first proposal found at all */
pub struct Grmlsa {
    routing:Box<dyn Routing>,
    modulation:Box<dyn ModulationSelection>,
    spectrum:Box<dyn SpectrumAssignment>,
}

impl Grmlsa {
    pub fn new(routing:Box<dyn Routing>,modulation:Box<dyn ModulationSelection>,
        spectrum:Box<dyn SpectrumAssignment>) -> Self {
        Self {routing,modulation,spectrum}
    }

    pub fn first_fit_by_distance() -> Self {
        Self::new(Box::new(ShortestPath),Box::new(ByDistance),Box::new(FirstFit))
    }

    pub fn k_shortest_first_fit_by_qot(k:usize) -> Self {
        Self::new(Box::new(KShortestPaths::new(k)),Box::new(ByQot),Box::new(FirstFit))
    }
}

impl RmlsaStrategy for Grmlsa {
    fn propose(&self,demand:&Demand,cp:&ControlPlane) -> Option<Proposal> {
        let check = cp.qot_engine().config().active_qot;
        let mut fallback = None;
        for route in self.routing.routes(demand,cp) {
            let Some(choice) = self.modulation.select(demand,&route,self.spectrum.as_ref(),cp) else {continue};
            let admissible = !check || cp.evaluate_qot(None,&route,&choice.modulation,choice.band,true).admissible;
            let proposal = Proposal {route,modulation:choice.modulation,band:choice.band};
            if admissible {
                return Some(proposal);
            }
            if fallback.is_none() {
                fallback = Some(proposal);
            }
        }
        fallback
    }
}

/* k shortest paths aware of the impact on other circuits.
per route the most efficient admissible format keeping at least
`sigma_db` of margin is used, or the most efficient admissible one.
among routes the one leaving the widest worst margin on the circuits
it would share links with wins, lower band on ties */
pub struct QotoAwareKsp {
    routing:KShortestPaths,
    spectrum:Box<dyn SpectrumAssignment>,
    sigma_db:f64,
}

impl QotoAwareKsp {
    pub fn new(k:usize) -> Self {
        Self {routing:KShortestPaths::new(k),spectrum:Box::new(FirstFit),sigma_db:0.0}
    }

    pub fn with_sigma_db(mut self,sigma_db:f64) -> Self {
        self.sigma_db = sigma_db;
        self
    }

    pub fn with_spectrum(mut self,spectrum:Box<dyn SpectrumAssignment>) -> Self {
        self.spectrum = spectrum;
        self
    }

    // format and band kept for one route, None if nothing is admissible
    fn choose(&self,demand:&Demand,route:&Route,cp:&ControlPlane,
        fallback:&mut Option<Proposal>) -> Option<(Arc<Modulation>,SlotInterval)> {
        let check = cp.qot_engine().config().active_qot;
        let mut modulations:Vec<&Arc<Modulation>> = cp.modulations().iter().collect();
        modulations.sort_by(|a,b| a.bits_per_symbol.total_cmp(&b.bits_per_symbol));

        let mut preferred = None;
        let mut efficient = None;
        for modulation in modulations {
            let Some(band) = assign(demand,route,modulation,self.spectrum.as_ref(),cp) else {continue};
            if fallback.is_none() {
                *fallback = Some(Proposal {route:route.clone(),modulation:Arc::clone(modulation),band});
            }
            let report = cp.evaluate_qot(None,route,modulation,band,true);
            if check && !report.admissible {continue}
            if !check || report.snr_db - modulation.snr_threshold_db >= self.sigma_db {
                preferred = Some((Arc::clone(modulation),band));
            }
            efficient = Some((Arc::clone(modulation),band));
        }
        preferred.or(efficient)
    }
}

impl RmlsaStrategy for QotoAwareKsp {
    fn propose(&self,demand:&Demand,cp:&ControlPlane) -> Option<Proposal> {
        let mut fallback = None;
        let mut best:Option<(f64,Proposal)> = None;
        for route in self.routing.routes(demand,cp) {
            let Some((modulation,band)) = self.choose(demand,&route,cp,&mut fallback) else {continue};
            let impact = cp.evaluate_others(&route,&modulation,band);
            if !impact.all_admissible {continue}
            let worst = impact.worst_margin_db.unwrap_or(f64::INFINITY);
            let better = match &best {
                None => true,
                Some((kept,proposal)) => worst > *kept || (worst == *kept && band.first < proposal.band.first),
            };
            if better {
                best = Some((worst,Proposal {route,modulation,band}));
            }
        }
        best.map(|(_,proposal)| proposal).or(fallback)
    }
}
