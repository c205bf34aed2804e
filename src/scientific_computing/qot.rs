/* quality of transmission of a channel along a route
amplified spontaneous emission of the amplifier chain plus
non-linear interference from the co-propagating channels,
closed form gaussian noise model per span */

use std::f64::consts::PI;

use crate::config::{AmplifierGain, PhysicalLayerConfig, QotTest};
use crate::dsa::interval_set::SlotInterval;
use crate::optical_network::circuit::{CircuitId, CircuitTable, QotReport};
use crate::optical_network::mesh::{Link, Mesh};
use crate::optical_network::modulation::Modulation;
use crate::optical_network::route::Route;
use crate::optical_network::spectrum::Spectrum;
use crate::scientific_computing::amplifier::Amplifier;

//unit in m/s
pub const C_SPEED_OF_LIGHT:f64 = 299792458.0;

// longest link the reach sweep will try, km
const REACH_HORIZON_KM:f64 = 50000.0;

pub fn db_to_linear(db:f64) -> f64 {
    10.0f64.powf(db/10.0)
}

pub fn linear_to_db(ratio:f64) -> f64 {
    10.0*ratio.log10()
}

pub fn dbm_to_watt(dbm:f64) -> f64 {
    db_to_linear(dbm)*1e-3
}

// dB/km to 1/m, e^(alpha*z) form
pub fn alpha_linear(db_per_km:f64) -> f64 {
    db_per_km/(1e4*std::f64::consts::LOG10_E)
}

// group velocity dispersion, s^2/m
pub fn beta2(dispersion:f64,frequency_hz:f64) -> f64 {
    let lambda = C_SPEED_OF_LIGHT/frequency_hz;
    -dispersion*lambda*lambda/(2.0*PI*C_SPEED_OF_LIGHT)
}

// closed form approximation, absolute error below 5e-4
pub fn erf(x:f64) -> f64 {
    const A:f64 = 0.140012;
    if x == 0.0 {return 0.0}
    let x2 = x*x;
    let inner = 1.0 - (-x2*((4.0/PI) + A*x2)/(1.0 + A*x2)).exp();
    x.signum()*inner.max(0.0).sqrt()
}

pub fn erfc(x:f64) -> f64 {
    1.0 - erf(x)
}

// bit error rate of square M-QAM at linear snr
pub fn ber_mqam(snr:f64,m:f64) -> f64 {
    let bits = m.log2();
    let argument = (3.0*snr/(2.0*(m - 1.0))).max(0.0);
    (2.0/bits)*((m.sqrt() - 1.0)/m.sqrt())*erfc(argument.sqrt())
}

// amplifiers between booster and pre-amplifier
pub fn line_amplifiers(distance_km:f64,span_length_km:f64) -> usize {
    let spans = distance_km/span_length_km - 1.0;
    if spans <= 0.0 {0} else {spans.ceil() as usize}
}

// a channel as seen by the engine, registered or hypothetical
#[derive(Clone,Copy,Debug)]
pub struct Channel<'a> {
    // None for a candidate with no id yet
    pub id:Option<CircuitId>,
    pub route:&'a Route,
    pub modulation:&'a Modulation,
    pub band:SlotInterval,
}

impl<'a> Channel<'a> {
    // occupied bandwidth without the guard band, at least one slot
    fn signal_bandwidth(&self) -> f64 {
        let slots = self.band.width().saturating_sub(self.modulation.guard_band).max(1);
        slots as f64*self.modulation.slot_spectrum_band
    }
}

// what the subject sees of one other channel on a link
#[derive(Clone,Copy,Debug)]
struct Interferer {
    bandwidth:f64,
    center:f64,
}

#[derive(Clone,Debug)]
pub struct QotEngine {
    config:PhysicalLayerConfig,
    linear_power:f64,
    alpha:f64,
    beta2_abs:f64,
    booster:Amplifier,
    line:Amplifier,
}

impl Default for QotEngine {
    fn default() -> Self {
        Self::new(PhysicalLayerConfig::default())
    }
}

impl QotEngine {
    pub fn new(config:PhysicalLayerConfig) -> Self {
        let c = &config;
        let amplifier = |gain_db:f64| Amplifier::new(gain_db,c.noise_figure_db,c.saturation_power_dbm,
            c.planck,c.amplification_frequency_hz,c.noise_factor_a1,c.noise_factor_a2);
        let booster = amplifier(c.switch_insertion_loss_db);
        let line = amplifier(c.fiber_loss_db_km*c.span_length_km);
        Self {
            linear_power:dbm_to_watt(c.power_dbm),
            alpha:alpha_linear(c.fiber_loss_db_km),
            beta2_abs:beta2(c.fiber_dispersion,c.center_frequency_hz).abs(),
            booster,
            line,
            config,
        }
    }

    pub fn config(&self) -> &PhysicalLayerConfig {
        &self.config
    }

    fn pre_amplifier(&self,last_segment_km:f64) -> Amplifier {
        let c = &self.config;
        let gain_db = c.fiber_loss_db_km*last_segment_km + c.switch_insertion_loss_db;
        Amplifier::new(gain_db,c.noise_figure_db,c.saturation_power_dbm,
            c.planck,c.amplification_frequency_hz,c.noise_factor_a1,c.noise_factor_a2)
    }

    fn lower_frequency(&self,spectrum:&Spectrum) -> f64 {
        self.config.center_frequency_hz - spectrum.slot_spectrum_band()*spectrum.num_slots() as f64/2.0
    }

    fn center_frequency(&self,spectrum:&Spectrum,band:&SlotInterval,bandwidth:f64) -> f64 {
        self.lower_frequency(spectrum) + spectrum.slot_spectrum_band()*(band.first as f64 - 1.0) + bandwidth/2.0
    }

    // psd of a channel occupying `bandwidth` Hz
    fn density(&self,bandwidth:f64) -> f64 {
        if self.config.fixed_power_spectral_density {
            self.linear_power/self.config.reference_bandwidth_hz
        } else {
            self.linear_power/bandwidth
        }
    }

    // launched power of a channel occupying `bandwidth` Hz
    fn launch_power(&self,bandwidth:f64) -> f64 {
        if self.config.fixed_power_spectral_density {
            self.density(bandwidth)*bandwidth
        } else {
            self.linear_power
        }
    }

    // every channel on `link` other than the subject
    fn interferers(&self,link:&Link,circuits:&CircuitTable,subject:&Channel,
        extra:Option<&Channel>) -> Vec<Interferer> {
        let spectrum = link.spectrum();
        let mut found = Vec::new();
        for id in link.circuits() {
            if Some(id) == subject.id {continue}
            let Some(circuit) = circuits.get(&id) else {continue};
            let channel = Channel {id:Some(id),route:&circuit.route,modulation:&circuit.modulation,band:circuit.band};
            let bandwidth = channel.signal_bandwidth();
            found.push(Interferer {bandwidth,center:self.center_frequency(spectrum,&channel.band,bandwidth)});
        }
        if let Some(extra) = extra {
            let distinct = extra.id.is_none() || extra.id != subject.id;
            let registered = extra.id.is_some_and(|id| link.carries(id));
            if distinct && !registered && extra.route.contains_link(link.id()) {
                let bandwidth = extra.signal_bandwidth();
                found.push(Interferer {bandwidth,center:self.center_frequency(spectrum,&extra.band,bandwidth)});
            }
        }
        found
    }

    // nli psd accumulated over one span
    fn gnli(&self,bandwidth:f64,center:f64,interferers:&[Interferer]) -> f64 {
        let gamma = self.config.fiber_nonlinearity;
        let gi = self.density(bandwidth);
        let mi = gi*3.0*gamma*gamma/(2.0*PI*self.alpha*self.beta2_abs);
        let ro = bandwidth*bandwidth*PI*PI*self.beta2_abs/(2.0*self.alpha);
        let own = gi*gi*ro.asinh();
        let mut cross = 0.0;
        for interferer in interferers {
            let gj = self.density(interferer.bandwidth);
            let delta = (center - interferer.center).abs();
            let ratio = ((delta + interferer.bandwidth/2.0)/(delta - interferer.bandwidth/2.0)).abs();
            if ratio.is_finite() && ratio > 0.0 {
                cross += gj*gj*ratio.ln();
            }
        }
        mi*(own + cross)
    }

    /* linear snr of `subject` given the current occupancy of its links
    `count_own` adds the subject's launched power to the total power seen
    by saturated amplifiers, `extra` is an interferer not registered on any link */
    pub fn compute_snr(&self,mesh:&Mesh,circuits:&CircuitTable,subject:&Channel,
        count_own:bool,extra:Option<&Channel>) -> f64 {
        let c = &self.config;
        let bandwidth = subject.signal_bandwidth();
        let mut ase = 0.0;
        let mut nli = 0.0;

        // a route over links this mesh does not have carries nothing
        let Some(links) = subject.route.links().iter().map(|id| mesh.link(*id)).collect::<Option<Vec<&Link>>>() else {
            return 0.0;
        };
        for link in links {
            let spans = line_amplifiers(link.distance_km(),c.span_length_km);
            let interferers = self.interferers(link,circuits,subject,extra);

            if c.active_nli {
                let center = self.center_frequency(link.spectrum(),&subject.band,bandwidth);
                // line spans plus the pre-amplifier span
                nli += (spans + 1) as f64*self.gnli(bandwidth,center,&interferers);
            }

            if c.active_ase {
                let total_power = match c.amplifier_gain {
                    AmplifierGain::Fixed => 0.0,
                    AmplifierGain::Saturated => {
                        let others:f64 = interferers.iter().map(|i| self.launch_power(i.bandwidth)).sum();
                        others + if count_own {self.launch_power(bandwidth)} else {0.0}
                    }
                };
                let last_segment = (link.distance_km() - spans as f64*c.span_length_km).max(0.0);
                let pre = self.pre_amplifier(last_segment);
                ase += self.booster.ase(total_power,c.amplifier_gain)
                    + spans as f64*self.line.ase(total_power,c.amplifier_gain)
                    + pre.ase(total_power,c.amplifier_gain);
            }
        }

        let signal = self.density(bandwidth);
        let noise = ase + nli;
        if noise > 0.0 {signal/noise} else {f64::INFINITY}
    }

    // slots a circuit needs, from the symbol rate when configured so
    pub fn required_slots(&self,modulation:&Modulation,bandwidth:f64) -> usize {
        let c = &self.config;
        if c.active_qot && c.slots_by_qot {
            modulation.required_slots_by_qot(bandwidth,c.fec_rate)
        } else {
            modulation.required_slots(bandwidth)
        }
    }

    pub fn is_admissible(&self,modulation:&Modulation,snr_db:f64,snr_linear:f64) -> bool {
        match self.config.qot_test {
            QotTest::Snr => snr_db >= modulation.snr_threshold_db,
            QotTest::Ber => ber_mqam(snr_linear,modulation.m) <= modulation.ber_threshold(),
        }
    }

    pub fn evaluate(&self,mesh:&Mesh,circuits:&CircuitTable,subject:&Channel,
        count_own:bool,extra:Option<&Channel>) -> QotReport {
        let snr_linear = self.compute_snr(mesh,circuits,subject,count_own,extra);
        let snr_db = linear_to_db(snr_linear);
        QotReport {snr_db,snr_linear,admissible:self.is_admissible(subject.modulation,snr_db,snr_linear)}
    }

    /* longest single-link distance at which `modulation` carries `bandwidth`
    alone on an otherwise empty fiber, 0 if never admissible.
    distances step by whole spans plus `last_segment_km` */
    pub fn modulation_reach(&self,modulation:&Modulation,bandwidth:f64,num_slots:usize,
        last_segment_km:f64) -> f64 {
        let span = self.config.span_length_km;
        let required = self.required_slots(modulation,bandwidth);
        let Some(band) = SlotInterval::with_width(1,required) else {return 0.0};
        if required > num_slots {return 0.0}
        let circuits = CircuitTable::default();

        let mut reach = 0.0;
        let max_spans = (REACH_HORIZON_KM/span) as usize;
        for spans in 0..=max_spans {
            let distance = spans as f64*span + last_segment_km;
            if !(distance > 0.0) {continue}
            let Some((mesh,route)) = single_link(num_slots,modulation.slot_spectrum_band,distance) else {continue};
            let subject = Channel {id:None,route:&route,modulation,band};
            let snr_db = linear_to_db(self.compute_snr(&mesh,&circuits,&subject,true,None));
            if snr_db >= modulation.snr_threshold_db && distance > reach {
                reach = distance;
            }
        }
        reach
    }
}

fn single_link(num_slots:usize,slot_spectrum_band:f64,distance_km:f64) -> Option<(Mesh,Route)> {
    use crate::optical_network::transponder::TransponderPool;
    let mut mesh = Mesh::new();
    let a = mesh.add_node("a",TransponderPool::default(),TransponderPool::default()).ok()?;
    let b = mesh.add_node("b",TransponderPool::default(),TransponderPool::default()).ok()?;
    mesh.add_link(a,b,Spectrum::new(num_slots,slot_spectrum_band),distance_km,distance_km).ok()?;
    let route = Route::new(&mesh,&[a,b]).ok()?;
    Some((mesh,route))
}
