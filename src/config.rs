use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::optical_network::mesh::Mesh;
use crate::optical_network::modulation::{Modulation, STANDARD_CATALOGUE, STANDARD_GUARD_BAND, STANDARD_SLOT_BAND};
use crate::optical_network::spectrum::Spectrum;
use crate::optical_network::transponder::TransponderPool;

#[derive(Error,Debug)]
pub enum ConfigError {
    #[error("could not read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

type Result<T> = std::result::Result<T,ConfigError>;

#[derive(Clone,Copy,Debug,PartialEq,Eq,Serialize,Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QotTest {
    Snr,
    Ber,
}

#[derive(Clone,Copy,Debug,PartialEq,Eq,Serialize,Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmplifierGain {
    Fixed,
    Saturated,
}

// physical layer knobs, units in the field names
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
#[serde(default)]
pub struct PhysicalLayerConfig {
    pub active_qot:bool,
    pub active_qot_for_other:bool,
    pub active_ase:bool,
    pub active_nli:bool,
    pub qot_test:QotTest,
    pub fec_rate:f64,
    // with active_qot, slot counts follow the symbol rate and fec_rate
    pub slots_by_qot:bool,

    pub power_dbm:f64,
    pub span_length_km:f64,
    pub fiber_loss_db_km:f64,
    // 1/(W·m)
    pub fiber_nonlinearity:f64,
    // s/m^2
    pub fiber_dispersion:f64,
    pub center_frequency_hz:f64,

    pub planck:f64,
    pub noise_figure_db:f64,
    pub saturation_power_dbm:f64,
    pub noise_factor_a1:f64,
    pub noise_factor_a2:f64,
    pub amplifier_gain:AmplifierGain,
    pub amplification_frequency_hz:f64,
    pub switch_insertion_loss_db:f64,

    pub fixed_power_spectral_density:bool,
    pub reference_bandwidth_hz:f64,
}

impl Default for PhysicalLayerConfig {
    fn default() -> Self {
        Self {
            active_qot:true,
            active_qot_for_other:true,
            active_ase:true,
            active_nli:true,
            qot_test:QotTest::Snr,
            fec_rate:0.07,
            slots_by_qot:false,
            power_dbm:0.0,
            span_length_km:80.0,
            fiber_loss_db_km:0.2,
            fiber_nonlinearity:1.3e-3,
            fiber_dispersion:17.0e-6,
            center_frequency_hz:193.4e12,
            planck:6.62607015e-34,
            noise_figure_db:5.0,
            saturation_power_dbm:50.0,
            noise_factor_a1:0.0,
            noise_factor_a2:1.0,
            amplifier_gain:AmplifierGain::Fixed,
            amplification_frequency_hz:193.4e12,
            switch_insertion_loss_db:0.0,
            fixed_power_spectral_density:true,
            reference_bandwidth_hz:4.0*12.5e9,
        }
    }
}

impl PhysicalLayerConfig {
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("span_length_km",self.span_length_km),
            ("fiber_loss_db_km",self.fiber_loss_db_km),
            ("center_frequency_hz",self.center_frequency_hz),
            ("amplification_frequency_hz",self.amplification_frequency_hz),
            ("reference_bandwidth_hz",self.reference_bandwidth_hz),
            ("planck",self.planck),
        ];
        for (name,value) in checks {
            if !positive(value) {
                return Err(ConfigError::Invalid(format!("{name} must be positive, got {value}")));
            }
        }
        if !(self.fec_rate >= 0.0) || !self.fec_rate.is_finite() {
            return Err(ConfigError::Invalid(format!("fec_rate must not be negative, got {}",self.fec_rate)));
        }
        if self.fiber_dispersion == 0.0 {
            return Err(ConfigError::Invalid("fiber_dispersion must not be zero".to_owned()));
        }
        Ok(())
    }
}

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct NodeConfig {
    pub name:String,
    // absent means unbounded
    #[serde(default)]
    pub transmitters:Option<usize>,
    #[serde(default)]
    pub receivers:Option<usize>,
}

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct LinkConfig {
    pub source:String,
    pub destination:String,
    pub slots:usize,
    #[serde(default = "default_slot_spectrum_band")]
    pub slot_spectrum_band:f64,
    pub distance_km:f64,
    // defaults to the distance
    #[serde(default)]
    pub cost:Option<f64>,
    #[serde(default = "default_bidirectional")]
    pub bidirectional:bool,
}

fn default_slot_spectrum_band() -> f64 {
    STANDARD_SLOT_BAND
}

fn default_bidirectional() -> bool {
    true
}

fn default_guard_band() -> usize {
    STANDARD_GUARD_BAND
}

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct NetworkConfig {
    pub nodes:Vec<NodeConfig>,
    pub links:Vec<LinkConfig>,
    // absent means the built-in BPSK..64QAM catalogue
    #[serde(default)]
    pub modulations:Option<Vec<Modulation>>,
    #[serde(default = "default_guard_band")]
    pub guard_band:usize,
}

fn positive(value:f64) -> bool {
    value > 0.0 && value.is_finite()
}

fn pool(capacity:Option<usize>) -> TransponderPool {
    capacity.map_or_else(TransponderPool::unbounded,TransponderPool::bounded)
}

impl NetworkConfig {
    // ring of `nodes` nodes named 1..=nodes, neighbours joined both ways
    pub fn ring(nodes:usize,slots:usize,distance_km:f64) -> Self {
        let names:Vec<String> = (1..=nodes).map(|i| i.to_string()).collect();
        let links = (0..nodes).map(|i| LinkConfig {
            source:names[i].clone(),
            destination:names[(i + 1) % nodes].clone(),
            slots,
            slot_spectrum_band:default_slot_spectrum_band(),
            distance_km,
            cost:None,
            bidirectional:true,
        }).collect();
        Self {
            nodes:names.into_iter().map(|name| NodeConfig {name,transmitters:None,receivers:None}).collect(),
            links,
            modulations:None,
            guard_band:default_guard_band(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.nodes.len() < 2 {
            return Err(ConfigError::Invalid("a network needs at least two nodes".to_owned()));
        }
        for link in self.links.iter() {
            if link.slots == 0 {
                return Err(ConfigError::Invalid(format!(
                    "link {} -> {} has no slots",link.source,link.destination)));
            }
            if !positive(link.distance_km) || !positive(link.slot_spectrum_band) {
                return Err(ConfigError::Invalid(format!(
                    "link {} -> {} needs a positive distance and slot width",link.source,link.destination)));
            }
            for end in [&link.source,&link.destination] {
                if !self.nodes.iter().any(|n| &n.name == end) {
                    return Err(ConfigError::Invalid(format!("link endpoint {end} is not a declared node")));
                }
            }
        }
        if let Some(modulations) = &self.modulations {
            if modulations.is_empty() {
                return Err(ConfigError::Invalid("modulation list is empty".to_owned()));
            }
            if let Some(bad) = modulations.iter().find(|m| !positive(m.bits_per_symbol) || !positive(m.slot_spectrum_band)) {
                return Err(ConfigError::Invalid(format!("modulation {bad} has a non-positive rate")));
            }
        }
        Ok(())
    }

    pub fn build_mesh(&self) -> Result<Mesh> {
        self.validate()?;
        let invalid = |e:crate::optical_network::mesh::MeshError| ConfigError::Invalid(e.to_string());
        let mut mesh = Mesh::new();
        for node in self.nodes.iter() {
            mesh.add_node(&node.name,pool(node.transmitters),pool(node.receivers)).map_err(invalid)?;
        }
        for link in self.links.iter() {
            let source = mesh.node_id(&link.source).map_err(invalid)?;
            let destination = mesh.node_id(&link.destination).map_err(invalid)?;
            let spectrum = Spectrum::new(link.slots,link.slot_spectrum_band);
            let cost = link.cost.unwrap_or(link.distance_km);
            if link.bidirectional {
                mesh.add_bidirectional_link(source,destination,spectrum,link.distance_km,cost).map_err(invalid)?;
            } else {
                mesh.add_link(source,destination,spectrum,link.distance_km,cost).map_err(invalid)?;
            }
        }
        Ok(mesh)
    }

    pub fn slot_spectrum_band(&self) -> f64 {
        self.links.first().map_or_else(default_slot_spectrum_band,|l| l.slot_spectrum_band)
    }

    pub fn modulations(&self) -> Vec<Arc<Modulation>> {
        match &self.modulations {
            Some(list) => list.iter().cloned().map(Arc::new).collect(),
            None if self.guard_band == STANDARD_GUARD_BAND && self.slot_spectrum_band() == STANDARD_SLOT_BAND => {
                STANDARD_CATALOGUE.clone()
            }
            None => Modulation::catalogue(self.guard_band,self.slot_spectrum_band())
                .into_iter().map(Arc::new).collect(),
        }
    }
}

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub seed:u64,
    pub requests:usize,
    // arrivals per unit of simulated time
    pub arrival_rate:f64,
    // 1 / mean holding time
    pub departure_rate:f64,
    // candidate request sizes, bit/s
    pub bandwidths:Vec<f64>,
    pub k_routes:usize,
    pub grooming:bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed:1,
            requests:10000,
            arrival_rate:20.0,
            departure_rate:1.0,
            bandwidths:vec![10e9,40e9,100e9,200e9,400e9],
            k_routes:3,
            grooming:false,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if !positive(self.arrival_rate) || !positive(self.departure_rate) {
            return Err(ConfigError::Invalid("arrival and departure rates must be positive".to_owned()));
        }
        if self.bandwidths.is_empty() || self.bandwidths.iter().any(|b| !positive(*b)) {
            return Err(ConfigError::Invalid("bandwidths must be a non-empty list of positive rates".to_owned()));
        }
        if self.k_routes == 0 {
            return Err(ConfigError::Invalid("k_routes must be at least 1".to_owned()));
        }
        Ok(())
    }
}

// everything one replication needs
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct FlexgridConfig {
    pub network:NetworkConfig,
    #[serde(default)]
    pub physical:PhysicalLayerConfig,
    #[serde(default)]
    pub simulation:SimulationConfig,
}

impl FlexgridConfig {
    pub fn from_json_str(json:&str) -> Result<Self> {
        let config:Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P:AsRef<Path>>(path:P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        self.network.validate()?;
        self.physical.validate()?;
        self.simulation.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::{AmplifierGain, ConfigError, FlexgridConfig, NetworkConfig, QotTest};

    const SMALL:&str = r#"{
        "network": {
            "nodes": [{"name":"A","transmitters":2},{"name":"B"},{"name":"C"}],
            "links": [
                {"source":"A","destination":"B","slots":8,"distance_km":100.0},
                {"source":"B","destination":"C","slots":8,"distance_km":50.0,"cost":1.0,"bidirectional":false}
            ],
            "guard_band": 0
        },
        "physical": {"qot_test":"ber","amplifier_gain":"saturated","power_dbm":1.0}
    }"#;

    #[test]
    fn test_parse_with_defaults() {
        let config = FlexgridConfig::from_json_str(SMALL).unwrap();
        assert_eq!(config.physical.qot_test,QotTest::Ber);
        assert_eq!(config.physical.amplifier_gain,AmplifierGain::Saturated);
        assert_eq!(config.physical.power_dbm,1.0);
        assert_eq!(config.physical.span_length_km,80.0);
        assert_eq!(config.simulation.k_routes,3);

        let mesh = config.network.build_mesh().unwrap();
        assert_eq!(mesh.nodes().len(),3);
        assert_eq!(mesh.links().len(),3);
        assert!(mesh.link_between(2,1).is_none());
        assert_eq!(mesh.link(0).unwrap().cost(),100.0);
        assert_eq!(config.network.modulations().len(),6);
        assert_eq!(config.network.modulations()[0].guard_band,0);
    }

    #[test]
    fn test_rejects_bad_networks() {
        let missing = SMALL.replace(r#""destination":"C""#,r#""destination":"Z""#);
        assert!(matches!(FlexgridConfig::from_json_str(&missing),Err(ConfigError::Invalid(_))));
        let no_slots = SMALL.replace(r#""slots":8,"distance_km":100.0"#,r#""slots":0,"distance_km":100.0"#);
        assert!(matches!(FlexgridConfig::from_json_str(&no_slots),Err(ConfigError::Invalid(_))));
        assert!(matches!(FlexgridConfig::from_json_str("{"),Err(ConfigError::Parse(_))));
        assert!(matches!(FlexgridConfig::load("/definitely/not/here.json"),Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_physical_checks() {
        let config = FlexgridConfig::from_json_str(SMALL).unwrap();
        assert!(config.physical.validate().is_ok());
        assert!(!config.physical.slots_by_qot);
        let short_span = SMALL.replace(r#""power_dbm":1.0"#,r#""power_dbm":1.0,"span_length_km":0.0"#);
        assert!(matches!(FlexgridConfig::from_json_str(&short_span),Err(ConfigError::Invalid(_))));
        let negative_fec = SMALL.replace(r#""power_dbm":1.0"#,r#""power_dbm":1.0,"fec_rate":-0.1"#);
        assert!(matches!(FlexgridConfig::from_json_str(&negative_fec),Err(ConfigError::Invalid(_))));
        let by_qot = SMALL.replace(r#""power_dbm":1.0"#,r#""power_dbm":1.0,"slots_by_qot":true,"fec_rate":0.2"#);
        let parsed = FlexgridConfig::from_json_str(&by_qot).unwrap();
        assert!(parsed.physical.slots_by_qot);
        assert_eq!(parsed.physical.fec_rate,0.2);
    }

    #[test]
    fn test_ring() {
        let ring = NetworkConfig::ring(5,64,300.0);
        let mesh = ring.build_mesh().unwrap();
        assert_eq!(mesh.links().len(),10);
        assert!(mesh.link_between(4,0).is_some());
    }
}
