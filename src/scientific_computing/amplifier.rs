use crate::config::AmplifierGain;
use crate::scientific_computing::qot::{db_to_linear, dbm_to_watt};

/* erbium amplifier noise model, stateless past its parameters
ase values are power spectral densities (W/Hz) on one polarisation */
#[derive(Clone,Copy,Debug,PartialEq)]
pub struct Amplifier {
    gain_linear:f64,
    noise_figure_linear:f64,
    saturation_power_watt:f64,
    // planck constant times the amplified frequency, J
    photon_energy:f64,
    a1:f64,
    a2:f64,
}

impl Amplifier {
    pub fn new(gain_db:f64,noise_figure_db:f64,saturation_power_dbm:f64,
        planck:f64,frequency_hz:f64,a1:f64,a2:f64) -> Self {
        Self {
            gain_linear:db_to_linear(gain_db),
            noise_figure_linear:db_to_linear(noise_figure_db),
            saturation_power_watt:dbm_to_watt(saturation_power_dbm),
            photon_energy:planck*frequency_hz,
            a1,
            a2,
        }
    }

    pub fn gain_linear(&self) -> f64 {
        self.gain_linear
    }

    // power dependent noise factor, falls back to the noise figure
    // when the model parameters make it undefined
    pub fn noise_factor(&self,input_power:f64) -> f64 {
        let denominator = 1.0 + input_power/self.a2;
        if !(self.a2 > 0.0) || !(denominator > 0.0) {
            return self.noise_figure_linear;
        }
        self.noise_figure_linear*(1.0 + self.a1 - self.a1/denominator)
    }

    // never below unity
    pub fn saturated_gain(&self,input_power:f64) -> f64 {
        let output_power = self.gain_linear*input_power;
        let gain = self.gain_linear/(1.0 + output_power/self.saturation_power_watt);
        gain.max(1.0)
    }

    pub fn gain(&self,input_power:f64,mode:AmplifierGain) -> f64 {
        match mode {
            AmplifierGain::Fixed => self.gain_linear,
            AmplifierGain::Saturated => self.saturated_gain(input_power),
        }
    }

    pub fn ase(&self,input_power:f64,mode:AmplifierGain) -> f64 {
        let gain = self.gain(input_power,mode);
        let factor = match mode {
            AmplifierGain::Fixed => self.noise_figure_linear,
            AmplifierGain::Saturated => self.noise_factor(input_power),
        };
        0.5*self.photon_energy*factor*(gain - 1.0)
    }
}
