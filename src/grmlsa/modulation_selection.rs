use std::sync::Arc;

use crate::grmlsa::{assign, ModulationChoice, ModulationSelection, SpectrumAssignment};
use crate::optical_network::circuit::Demand;
use crate::optical_network::control_plane::ControlPlane;
use crate::optical_network::modulation::Modulation;
use crate::optical_network::route::Route;

fn by_efficiency(cp:&ControlPlane) -> Vec<&Arc<Modulation>> {
    let mut modulations:Vec<&Arc<Modulation>> = cp.modulations().iter().collect();
    modulations.sort_by(|a,b| a.bits_per_symbol.total_cmp(&b.bits_per_symbol));
    modulations
}

/* the most efficient format whose nominal reach covers the route.
past every reach the most robust format is tried and qot decides */
#[derive(Clone,Copy,Debug,Default)]
pub struct ByDistance;

impl ModulationSelection for ByDistance {
    fn select(&self,demand:&Demand,route:&Route,assignment:&dyn SpectrumAssignment,
        cp:&ControlPlane) -> Option<ModulationChoice> {
        let modulations = by_efficiency(cp);
        let modulation = modulations.iter()
            .rev()
            .find(|m| m.max_range_km >= route.distance_km())
            .or(modulations.first())?;
        let band = assign(demand,route,modulation,assignment,cp)?;
        Some(ModulationChoice {modulation:Arc::clone(modulation),band})
    }
}

/* tries formats from the most efficient down and keeps the first
whose own qot is admissible on the band it would get.
when none is, the most robust format that found a band is returned
so the control plane blocks it on qot rather than on spectrum */
#[derive(Clone,Copy,Debug,Default)]
pub struct ByQot;

impl ModulationSelection for ByQot {
    fn select(&self,demand:&Demand,route:&Route,assignment:&dyn SpectrumAssignment,
        cp:&ControlPlane) -> Option<ModulationChoice> {
        let check = cp.qot_engine().config().active_qot;
        let mut alternative = None;
        for modulation in by_efficiency(cp).into_iter().rev() {
            let Some(band) = assign(demand,route,modulation,assignment,cp) else {continue};
            let choice = ModulationChoice {modulation:Arc::clone(modulation),band};
            if !check || cp.evaluate_qot(None,route,modulation,band,true).admissible {
                return Some(choice);
            }
            alternative = Some(choice);
        }
        alternative
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{ByDistance, ByQot};
    use crate::config::NetworkConfig;
    use crate::grmlsa::ModulationSelection;
    use crate::grmlsa::integrated::Grmlsa;
    use crate::grmlsa::spectrum_assignment::FirstFit;
    use crate::optical_network::circuit::{Demand, Request};
    use crate::optical_network::control_plane::ControlPlane;
    use crate::optical_network::modulation::Modulation;
    use crate::optical_network::route::Route;
    use crate::scientific_computing::qot::QotEngine;

    // triangle, 0 -> 1 is a direct link of `distance_km`
    fn triangle(distance_km:f64) -> (ControlPlane,Route) {
        let network = NetworkConfig::ring(3,320,distance_km);
        let cp = ControlPlane::new(network.build_mesh().unwrap(),QotEngine::default(),
            Box::new(Grmlsa::first_fit_by_distance()),network.modulations());
        let route = Route::new(cp.mesh(),&[0,1]).unwrap();
        (cp,route)
    }

    fn demand(bandwidth:f64) -> Demand {
        Demand::single(Request {id:0,source:0,destination:1,bandwidth})
    }

    #[test]
    fn test_by_distance_picks_reach() {
        for (distance,expected) in [(100.0,"64QAM"),(1000.0,"16QAM"),(4000.0,"QPSK"),(20000.0,"BPSK")] {
            let (cp,route) = triangle(distance);
            let choice = ByDistance.select(&demand(100e9),&route,&FirstFit,&cp).unwrap();
            assert_eq!(choice.modulation.name,expected,"at {distance} km");
            assert_eq!(choice.band.first,1);
            assert_eq!(choice.band.width(),choice.modulation.required_slots(100e9));
        }
    }

    #[test]
    fn test_by_qot_keeps_first_admissible() {
        let (cp,route) = triangle(1000.0);
        let choice = ByQot.select(&demand(100e9),&route,&FirstFit,&cp).unwrap();
        let report = cp.evaluate_qot(None,&route,&choice.modulation,choice.band,true);
        assert!(report.admissible);
        // every more efficient format fails on its own band
        for better in cp.modulations().iter().filter(|m| m.bits_per_symbol > choice.modulation.bits_per_symbol) {
            let band = crate::grmlsa::assign(&demand(100e9),&route,better,&FirstFit,&cp).unwrap();
            assert!(!cp.evaluate_qot(None,&route,better,band,true).admissible,"{better} should fail");
        }
    }

    #[test]
    fn test_by_qot_falls_back_to_robust_format() {
        let network = NetworkConfig::ring(3,64,100.0);
        let strict = vec![
            Arc::new(Modulation::new("strict-a",2.0,10000.0,1.0,4.0,1,12.5e9).with_threshold_db(100.0)),
            Arc::new(Modulation::new("strict-b",4.0,10000.0,1.0,16.0,1,12.5e9).with_threshold_db(100.0)),
        ];
        let cp = ControlPlane::new(network.build_mesh().unwrap(),QotEngine::default(),
            Box::new(Grmlsa::first_fit_by_distance()),strict);
        let route = Route::new(cp.mesh(),&[0,1]).unwrap();
        let choice = ByQot.select(&demand(100e9),&route,&FirstFit,&cp).unwrap();
        assert_eq!(choice.modulation.name,"strict-a");
        assert!(ByQot.select(&demand(10e12),&route,&FirstFit,&cp).is_none());
    }
}
