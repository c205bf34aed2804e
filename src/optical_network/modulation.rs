use std::fmt::Display;
use std::sync::Arc;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::scientific_computing::qot::{ber_mqam, db_to_linear};

// a modulation format, shared read-only by every circuit using it
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct Modulation {
    pub name:String,
    pub bits_per_symbol:f64,
    pub max_range_km:f64,
    // order of the format, drives the default snr threshold
    pub level:f64,
    // constellation size
    pub m:f64,
    pub snr_threshold_db:f64,
    #[serde(default)]
    pub guard_band:usize,
    // width of one slot, Hz
    pub slot_spectrum_band:f64,
}

impl Modulation {
    // admissibility threshold defaults to 3 dB per level
    pub fn new(name:&str,bits_per_symbol:f64,max_range_km:f64,level:f64,m:f64,
        guard_band:usize,slot_spectrum_band:f64) -> Self {
        Self {
            name:name.to_owned(),
            bits_per_symbol,
            max_range_km,
            level,
            m,
            snr_threshold_db:3.0*level,
            guard_band,
            slot_spectrum_band,
        }
    }

    pub fn with_threshold_db(mut self,snr_threshold_db:f64) -> Self {
        self.snr_threshold_db = snr_threshold_db;
        self
    }

    /* BPSK to 64QAM, each format doubles the constellation
    and halves the reach of the previous one */
    pub fn catalogue(guard_band:usize,slot_spectrum_band:f64) -> Vec<Modulation> {
        [
            ("BPSK",1.75,10000.0,2.0,2.0),
            ("QPSK",3.33,5000.0,3.0,4.0),
            ("8QAM",4.50,2500.0,4.0,8.0),
            ("16QAM",6.67,1250.0,5.0,16.0),
            ("32QAM",13.32,625.0,6.0,32.0),
            ("64QAM",23.64,312.0,7.0,64.0),
        ].into_iter().map(|(name,bps,range,level,m):(&str,f64,f64,f64,f64)| {
            Modulation::new(name,bps,range,level,m,guard_band,slot_spectrum_band)
        }).collect()
    }

    // slots needed to carry `bandwidth` bit/s, guard band included
    pub fn required_slots(&self,bandwidth:f64) -> usize {
        let raw = bandwidth/(self.bits_per_symbol*self.slot_spectrum_band);
        let slots = raw.ceil().max(0.0) as usize;
        slots + self.guard_band
    }

    /* slots for the symbol rate that carries `bandwidth` bit/s with `fec_rate`
    overhead, 1.1 roll-off over two polarisations, guard band added as above.
    formats with a single-point constellation fall back to the bit rate count */
    pub fn required_slots_by_qot(&self,bandwidth:f64,fec_rate:f64) -> usize {
        let bits = self.m.log2();
        if !(bits > 0.0) {return self.required_slots(bandwidth)}
        let symbol_band = 1.1*bandwidth*(1.0 + fec_rate)/(2.0*bits);
        let slots = (symbol_band/self.slot_spectrum_band).ceil().max(0.0) as usize;
        slots + self.guard_band
    }

    pub fn snr_threshold_linear(&self) -> f64 {
        db_to_linear(self.snr_threshold_db)
    }

    pub fn ber_threshold(&self) -> f64 {
        ber_mqam(self.snr_threshold_linear(),self.m)
    }
}

pub const STANDARD_SLOT_BAND:f64 = 12.5e9;
pub const STANDARD_GUARD_BAND:usize = 1;

lazy_static! {
    // catalogue for 12.5 GHz slots and one guard slot, shared by every mesh using that grid
    pub static ref STANDARD_CATALOGUE:Vec<Arc<Modulation>> = Modulation::catalogue(STANDARD_GUARD_BAND,STANDARD_SLOT_BAND)
        .into_iter().map(Arc::new).collect();
}

impl Display for Modulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f,"{}",self.name)
    }
}
