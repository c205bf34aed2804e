pub mod config;
pub mod grmlsa;
pub mod optical_network;
pub mod simulation;

pub mod dsa {
    pub mod graph;
    pub mod interval_set;
}

pub mod scientific_computing {
    pub mod amplifier;
    pub mod qot;
    pub mod statistics;
}
