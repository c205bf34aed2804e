/* slot selection over the bands free end to end on a route
bands come in ascending order and every policy only
takes the `required` lowest slots of the band it picks,
except last fit which takes the highest ones */

use crate::dsa::interval_set::SlotInterval;
use crate::grmlsa::SpectrumAssignment;
use crate::optical_network::circuit::Demand;
use crate::optical_network::control_plane::ControlPlane;

fn bottom(band:&SlotInterval,required:usize) -> Option<SlotInterval> {
    SlotInterval::with_width(band.first,required)
}

fn top(band:&SlotInterval,required:usize) -> Option<SlotInterval> {
    SlotInterval::with_width(band.last + 1 - required,required)
}

fn fitting(free_bands:&[SlotInterval],required:usize) -> impl Iterator<Item = &SlotInterval> {
    free_bands.iter().filter(move |band| required > 0 && band.width() >= required)
}

#[derive(Clone,Copy,Debug,Default)]
pub struct FirstFit;

impl SpectrumAssignment for FirstFit {
    fn policy(&self,required_slots:usize,free_bands:&[SlotInterval],
        _demand:&Demand,_cp:&ControlPlane) -> Option<SlotInterval> {
        fitting(free_bands,required_slots).next().and_then(|band| bottom(band,required_slots))
    }
}

#[derive(Clone,Copy,Debug,Default)]
pub struct LastFit;

impl SpectrumAssignment for LastFit {
    fn policy(&self,required_slots:usize,free_bands:&[SlotInterval],
        _demand:&Demand,_cp:&ControlPlane) -> Option<SlotInterval> {
        fitting(free_bands,required_slots).last().and_then(|band| top(band,required_slots))
    }
}

// the tightest band that still fits, lowest on ties
#[derive(Clone,Copy,Debug,Default)]
pub struct BestFit;

impl SpectrumAssignment for BestFit {
    fn policy(&self,required_slots:usize,free_bands:&[SlotInterval],
        _demand:&Demand,_cp:&ControlPlane) -> Option<SlotInterval> {
        fitting(free_bands,required_slots)
            .min_by_key(|band| (band.width(),band.first))
            .and_then(|band| bottom(band,required_slots))
    }
}

// a band of exactly the required width, otherwise the widest one
#[derive(Clone,Copy,Debug,Default)]
pub struct ExactFit;

impl SpectrumAssignment for ExactFit {
    fn policy(&self,required_slots:usize,free_bands:&[SlotInterval],
        _demand:&Demand,_cp:&ControlPlane) -> Option<SlotInterval> {
        let exact = fitting(free_bands,required_slots).find(|band| band.width() == required_slots);
        let chosen = exact.or_else(|| fitting(free_bands,required_slots)
            .min_by_key(|band| (std::cmp::Reverse(band.width()),band.first)))?;
        bottom(chosen,required_slots)
    }
}

#[cfg(test)]
mod tests {
    use super::{BestFit, ExactFit, FirstFit, LastFit};
    use crate::config::NetworkConfig;
    use crate::dsa::interval_set::SlotInterval;
    use crate::grmlsa::SpectrumAssignment;
    use crate::grmlsa::integrated::Grmlsa;
    use crate::optical_network::circuit::{Demand, Request};
    use crate::optical_network::control_plane::ControlPlane;
    use crate::scientific_computing::qot::QotEngine;

    fn si(first:usize,last:usize) -> SlotInterval {
        SlotInterval::new(first,last)
    }

    fn context() -> (Demand,ControlPlane) {
        let network = NetworkConfig::ring(3,32,100.0);
        let cp = ControlPlane::new(network.build_mesh().unwrap(),QotEngine::default(),
            Box::new(Grmlsa::first_fit_by_distance()),network.modulations());
        (Demand::single(Request {id:0,source:0,destination:1,bandwidth:10e9}),cp)
    }

    #[test]
    fn test_policies() {
        let (demand,cp) = context();
        let free = [si(1,5),si(8,10),si(14,16),si(20,32)];
        assert_eq!(FirstFit.policy(3,&free,&demand,&cp),Some(si(1,3)));
        assert_eq!(LastFit.policy(3,&free,&demand,&cp),Some(si(30,32)));
        assert_eq!(BestFit.policy(3,&free,&demand,&cp),Some(si(8,10)));
        assert_eq!(BestFit.policy(4,&free,&demand,&cp),Some(si(1,4)));
        assert_eq!(ExactFit.policy(3,&free,&demand,&cp),Some(si(8,10)));
        // nothing exact, fall back to the widest band
        assert_eq!(ExactFit.policy(4,&free,&demand,&cp),Some(si(20,23)));
    }

    #[test]
    fn test_nothing_fits() {
        let (demand,cp) = context();
        let free = [si(1,2),si(5,6)];
        assert_eq!(FirstFit.policy(3,&free,&demand,&cp),None);
        assert_eq!(LastFit.policy(3,&free,&demand,&cp),None);
        assert_eq!(BestFit.policy(3,&free,&demand,&cp),None);
        assert_eq!(ExactFit.policy(3,&free,&demand,&cp),None);
        assert_eq!(FirstFit.policy(0,&free,&demand,&cp),None);
        assert_eq!(FirstFit.policy(1,&[],&demand,&cp),None);
    }
}
