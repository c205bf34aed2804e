//! Random traffic over an elastic optical network.
//!
//! Usage:
//!   flexgrid_sim --config network.json --replications 5
//!   flexgrid_sim --ring 8 --slots 320 --requests 20000 --grooming

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use flexgrid::config::{ConfigError, FlexgridConfig, NetworkConfig, PhysicalLayerConfig, SimulationConfig};
use flexgrid::scientific_computing::statistics::{BlockCause, RunningStats};
use flexgrid::simulation::run_replications;

#[derive(Parser,Debug)]
#[command(name = "flexgrid_sim",about = "Blocking of random traffic in an elastic optical network")]
struct Args {
    /// JSON configuration, a ring is built when absent
    #[arg(short,long)]
    config:Option<PathBuf>,

    /// Nodes of the built-in ring
    #[arg(long,default_value_t = 6)]
    ring:usize,

    /// Slots per link of the built-in ring
    #[arg(long,default_value_t = 320)]
    slots:usize,

    /// Link length of the built-in ring, km
    #[arg(long,default_value_t = 400.0)]
    distance_km:f64,

    /// Overrides the configured seed
    #[arg(short,long)]
    seed:Option<u64>,

    /// Overrides the configured number of arrivals
    #[arg(short,long)]
    requests:Option<usize>,

    /// Overrides the configured arrival rate
    #[arg(long)]
    arrival_rate:Option<f64>,

    /// Independent replications, seeds counting up
    #[arg(long,default_value_t = 1)]
    replications:usize,

    /// Share circuits between requests of the same node pair
    #[arg(long)]
    grooming:bool,
}

fn main() -> Result<(),ConfigError> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("flexgrid=info")))
        .init();

    let mut config = match &args.config {
        Some(path) => FlexgridConfig::load(path)?,
        None => FlexgridConfig {
            network:NetworkConfig::ring(args.ring,args.slots,args.distance_km),
            physical:PhysicalLayerConfig::default(),
            simulation:SimulationConfig::default(),
        },
    };
    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }
    if let Some(requests) = args.requests {
        config.simulation.requests = requests;
    }
    if let Some(rate) = args.arrival_rate {
        config.simulation.arrival_rate = rate;
    }
    config.simulation.grooming |= args.grooming;
    config.validate()?;

    info!(nodes = config.network.nodes.len(),links = config.network.links.len(),
        replications = args.replications,"starting");
    let runs = run_replications(&config,args.replications)?;

    let blocking:RunningStats = runs.iter().map(|s| s.blocking_probability()).collect();
    let bandwidth:RunningStats = runs.iter().map(|s| s.bandwidth_blocking_ratio()).collect();
    let fragmentation:RunningStats = runs.iter().map(|s| s.mean_fragmentation()).collect();
    println!("replications               {}",runs.len());
    println!("blocking probability       {:.6} +- {:.6}",blocking.mean(),blocking.confidence_95());
    println!("bandwidth blocking ratio   {:.6} +- {:.6}",bandwidth.mean(),bandwidth.confidence_95());
    println!("external fragmentation     {:.6} +- {:.6}",fragmentation.mean(),fragmentation.confidence_95());
    for cause in [BlockCause::Transponder,BlockCause::Spectrum,BlockCause::QotNew,BlockCause::QotOthers,BlockCause::Other] {
        let blocked:usize = runs.iter().map(|s| s.blocked_by(cause)).sum();
        println!("blocked by {:<16}{}",format!("{cause:?}"),blocked);
    }
    Ok(())
}
