use thiserror::Error;

use crate::dsa::interval_set::{IntervalSet, SlotInterval};

#[derive(Error,Debug,Clone,PartialEq,Eq)]
pub enum SpectrumError {
    #[error("slot interval [{first},{last}] is malformed, first is after last")]
    InvalidInterval{first:usize,last:usize},
    #[error("slots [{first},{last}] are not inside a single free band")]
    NotFree{first:usize,last:usize},
    #[error("slots [{first},{last}] intersect a band that is already free")]
    AlreadyFree{first:usize,last:usize},
    #[error("slots [{first},{last}] fall outside the link spectrum [1,{num_slots}]")]
    OutOfRange{first:usize,last:usize,num_slots:usize},
}

type Result<T> = std::result::Result<T,SpectrumError>;

/* occupancy ledger of one link
free slots are kept as a coalesced interval set,
used_slots + free width == num_slots at all times */
#[derive(Clone,Debug)]
pub struct Spectrum {
    num_slots:usize,
    // width of one slot, Hz
    slot_spectrum_band:f64,
    used_slots:usize,
    free:IntervalSet,
}

impl Spectrum {
    pub fn new(num_slots:usize,slot_spectrum_band:f64) -> Self {
        Self {
            num_slots,
            slot_spectrum_band,
            used_slots:0,
            free:IntervalSet::from_interval(SlotInterval::new(1,num_slots))
        }
    }
    pub fn num_slots(&self) -> usize {
        self.num_slots
    }
    pub fn slot_spectrum_band(&self) -> f64 {
        self.slot_spectrum_band
    }
    pub fn used_slots(&self) -> usize {
        self.used_slots
    }
    pub fn free_slots(&self) -> usize {
        self.num_slots - self.used_slots
    }

    fn check(&self,interval:&SlotInterval) -> Result<()> {
        let SlotInterval {first,last} = *interval;
        if !interval.is_valid() {
            return Err(SpectrumError::InvalidInterval {first,last});
        }
        if first == 0 || last > self.num_slots {
            return Err(SpectrumError::OutOfRange {first,last,num_slots:self.num_slots});
        }
        Ok(())
    }

    pub fn allocate(&mut self,interval:SlotInterval) -> Result<()> {
        self.check(&interval)?;
        if !self.free.remove_within(&interval) {
            return Err(SpectrumError::NotFree {first:interval.first,last:interval.last});
        }
        self.used_slots += interval.width();
        debug_assert_eq!(self.used_slots + self.free.total_width(),self.num_slots);
        Ok(())
    }

    pub fn free(&mut self,interval:SlotInterval) -> Result<()> {
        self.check(&interval)?;
        if !self.free.insert_coalesced(&interval) {
            return Err(SpectrumError::AlreadyFree {first:interval.first,last:interval.last});
        }
        self.used_slots -= interval.width();
        debug_assert_eq!(self.used_slots + self.free.total_width(),self.num_slots);
        Ok(())
    }

    pub fn is_free(&self,interval:&SlotInterval) -> bool {
        self.check(interval).is_ok() && self.free.containing(interval).is_some()
    }

    // ascending by first slot
    pub fn free_bands(&self) -> Vec<SlotInterval> {
        self.free.to_vec()
    }

    pub fn utilization(&self) -> f64 {
        if self.num_slots == 0 {return 0.0}
        self.used_slots as f64 / self.num_slots as f64
    }

    // 1 - largest free band / free slots, 0 for an empty or full link
    pub fn external_fragmentation(&self) -> f64 {
        let total = self.free.total_width();
        match self.free.largest() {
            Some(largest) if total > 0 => 1.0 - largest.width() as f64 / total as f64,
            _ => 0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::{Spectrum, SpectrumError};
    use crate::dsa::interval_set::SlotInterval;

    fn si(first:usize,last:usize) -> SlotInterval {
        SlotInterval::new(first,last)
    }

    fn conserved(spectrum:&Spectrum) -> bool {
        let free:usize = spectrum.free_bands().iter().map(|b| b.width()).sum();
        spectrum.used_slots() + free == spectrum.num_slots()
    }

    #[test]
    fn test_allocate_and_free() {
        let mut spectrum = Spectrum::new(8,12.5e9);
        spectrum.allocate(si(1,4)).unwrap();
        assert_eq!(spectrum.free_bands(),vec![si(5,8)]);
        assert_eq!(spectrum.used_slots(),4);
        assert_eq!(spectrum.utilization(),0.5);
        spectrum.allocate(si(5,8)).unwrap();
        assert!(spectrum.free_bands().is_empty());

        spectrum.free(si(1,4)).unwrap();
        assert_eq!(spectrum.free_bands(),vec![si(1,4)]);
        spectrum.free(si(5,8)).unwrap();
        assert_eq!(spectrum.free_bands(),vec![si(1,8)]);
        assert_eq!(spectrum.used_slots(),0);
    }

    #[test]
    fn test_errors() {
        let mut spectrum = Spectrum::new(8,12.5e9);
        assert_eq!(spectrum.allocate(si(4,3)),Err(SpectrumError::InvalidInterval {first:4,last:3}));
        assert_eq!(spectrum.allocate(si(7,9)),Err(SpectrumError::OutOfRange {first:7,last:9,num_slots:8}));
        assert_eq!(spectrum.allocate(si(0,2)),Err(SpectrumError::OutOfRange {first:0,last:2,num_slots:8}));
        spectrum.allocate(si(3,5)).unwrap();
        assert_eq!(spectrum.allocate(si(5,6)),Err(SpectrumError::NotFree {first:5,last:6}));
        assert_eq!(spectrum.free(si(5,6)),Err(SpectrumError::AlreadyFree {first:5,last:6}));
        assert_eq!(spectrum.free(si(6,3)),Err(SpectrumError::InvalidInterval {first:6,last:3}));
        // failed calls leave the ledger alone
        assert_eq!(spectrum.free_bands(),vec![si(1,2),si(6,8)]);
        assert_eq!(spectrum.used_slots(),3);
    }

    #[test]
    fn test_round_trip_restores_bands() {
        let mut rng = rand::rng();
        let mut spectrum = Spectrum::new(64,12.5e9);
        for _ in 0..500 {
            let first = rng.random_range(1..=64);
            let last = rng.random_range(first..=64);
            let before = spectrum.free_bands();
            if spectrum.allocate(si(first,last)).is_ok() {
                spectrum.free(si(first,last)).unwrap();
                assert_eq!(spectrum.free_bands(),before);
                // keep part of it so later rounds see a fragmented ledger
                if rng.random_bool(0.3) {
                    spectrum.allocate(si(first,first)).unwrap();
                }
            }
            assert!(conserved(&spectrum));
        }
    }

    #[test]
    fn test_random_conservation() {
        let mut rng = rand::rng();
        let mut spectrum = Spectrum::new(100,12.5e9);
        let mut held:Vec<SlotInterval> = Vec::new();
        for _ in 0..2000 {
            if !held.is_empty() && rng.random_bool(0.4) {
                let band = held.swap_remove(rng.random_range(0..held.len()));
                spectrum.free(band).unwrap();
            } else {
                let first = rng.random_range(1..=100);
                let width = rng.random_range(1..=6);
                let Some(band) = SlotInterval::with_width(first,width) else {continue};
                if spectrum.allocate(band).is_ok() {
                    held.push(band);
                }
            }
            assert!(conserved(&spectrum));
            let bands = spectrum.free_bands();
            assert!(bands.windows(2).all(|w| w[0].last + 1 < w[1].first));
        }
    }

    #[test]
    fn test_external_fragmentation() {
        let mut spectrum = Spectrum::new(10,12.5e9);
        assert_eq!(spectrum.external_fragmentation(),0.0);
        spectrum.allocate(si(3,3)).unwrap();
        // free: [1,2] and [4,10], largest 7 of 9
        assert!((spectrum.external_fragmentation() - 2.0/9.0).abs() < 1e-12);
        spectrum.allocate(si(1,10).intersection(&si(4,10)).unwrap()).unwrap();
        spectrum.allocate(si(1,2)).unwrap();
        assert_eq!(spectrum.external_fragmentation(),0.0);
    }
}
