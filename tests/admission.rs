use std::sync::Arc;

use flexgrid::config::PhysicalLayerConfig;
use flexgrid::dsa::interval_set::SlotInterval;
use flexgrid::grmlsa::Proposal;
use flexgrid::grmlsa::integrated::Grmlsa;
use flexgrid::optical_network::circuit::{CircuitId, Demand, Request};
use flexgrid::optical_network::control_plane::{ControlPlane, EstablishError};
use flexgrid::optical_network::mesh::Mesh;
use flexgrid::optical_network::modulation::Modulation;
use flexgrid::optical_network::route::Route;
use flexgrid::optical_network::spectrum::Spectrum;
use flexgrid::optical_network::transponder::TransponderPool;
use flexgrid::scientific_computing::qot::QotEngine;

fn si(first:usize,last:usize) -> SlotInterval {
    SlotInterval::new(first,last)
}

// one bit per symbol and no guard band, 12.5 Gb/s per slot
fn unit() -> Modulation {
    Modulation::new("unit",1.0,10000.0,1.0,2.0,0,12.5e9)
}

// A - B - C, 100 km links of `slots` slots each way
fn line(slots:usize,modulations:Vec<Arc<Modulation>>) -> ControlPlane {
    let mut mesh = Mesh::new();
    for name in ["A","B","C"] {
        mesh.add_node(name,TransponderPool::default(),TransponderPool::default()).unwrap();
    }
    mesh.add_bidirectional_link(0,1,Spectrum::new(slots,12.5e9),100.0,1.0).unwrap();
    mesh.add_bidirectional_link(1,2,Spectrum::new(slots,12.5e9),100.0,1.0).unwrap();
    ControlPlane::new(mesh,QotEngine::new(PhysicalLayerConfig::default()),
        Box::new(Grmlsa::first_fit_by_distance()),modulations)
}

fn demand(id:u64,bandwidth:f64) -> Demand {
    Demand::single(Request {id,source:0,destination:2,bandwidth})
}

fn route(cp:&ControlPlane) -> Route {
    Route::new(cp.mesh(),&[0,1,2]).unwrap()
}

fn free_bands(cp:&ControlPlane) -> Vec<Vec<SlotInterval>> {
    let route = route(cp);
    route.links().iter().map(|id| cp.mesh().link(*id).unwrap().spectrum().free_bands()).collect()
}

fn link_circuits(cp:&ControlPlane) -> Vec<Vec<CircuitId>> {
    let route = route(cp);
    route.links().iter().map(|id| cp.mesh().link(*id).unwrap().circuits().collect()).collect()
}

#[test]
fn fills_releases_and_coalesces() {
    let mut cp = line(8,vec![Arc::new(unit())]);

    let first = cp.establish(&demand(0,50e9)).unwrap();
    assert_eq!(cp.circuit(first).unwrap().band(),si(1,4));
    for id in route(&cp).links() {
        assert_eq!(cp.mesh().link(*id).unwrap().spectrum().used_slots(),4);
    }

    let second = cp.establish(&demand(1,50e9)).unwrap();
    assert_eq!(cp.circuit(second).unwrap().band(),si(5,8));
    assert!(cp.compose_free_bands(&route(&cp),0).is_empty());

    assert_eq!(cp.establish(&demand(2,25e9)).unwrap_err(),EstablishError::NoFeasibleAllocation);
    assert_eq!(cp.active_count(),2);

    cp.release(first).unwrap();
    assert_eq!(free_bands(&cp),vec![vec![si(1,4)];2]);
    cp.release(second).unwrap();
    assert_eq!(free_bands(&cp),vec![vec![si(1,8)];2]);
    assert_eq!(link_circuits(&cp),vec![Vec::<CircuitId>::new();2]);
}

#[test]
fn inadmissible_qot_leaves_spectrum_untouched() {
    let hopeless = unit().with_threshold_db(100.0);
    let mut cp = line(8,vec![Arc::new(hopeless)]);
    let before = free_bands(&cp);
    let err = cp.establish(&demand(0,50e9)).unwrap_err();
    assert!(matches!(err,EstablishError::InadmissibleQoT {..}),"{err:?}");
    assert_eq!(free_bands(&cp),before);
    assert_eq!(cp.active_count(),0);
    assert!(cp.active_circuits(0,2).is_empty());
}

#[test]
fn degrading_others_rolls_back() {
    let mut cp = line(8,vec![Arc::new(unit())]);
    let route = route(&cp);

    // threshold right below what the circuit gets when alone
    let alone = cp.evaluate_qot(None,&route,&unit(),si(1,4),true);
    let strict = Arc::new(unit().with_threshold_db(alone.snr_db - 0.01));
    let victim = cp.establish_with(&demand(0,50e9),Proposal {route:route.clone(),modulation:strict,band:si(1,4)}).unwrap();
    let victim_qot = cp.circuit(victim).unwrap().qot().unwrap();
    assert!(victim_qot.admissible);
    let before = free_bands(&cp);

    let lenient = Arc::new(unit());
    let proposal = Proposal {route:route.clone(),modulation:lenient,band:si(5,8)};
    let err = cp.establish_with(&demand(1,50e9),proposal).unwrap_err();
    assert_eq!(err,EstablishError::DegradesOthers {victim});

    assert_eq!(free_bands(&cp),before);
    assert_eq!(link_circuits(&cp),vec![vec![victim];2]);
    assert_eq!(cp.circuit(victim).unwrap().qot().unwrap(),victim_qot);
    assert_eq!(cp.active_count(),1);
    assert_eq!(cp.active_circuits(0,2),&[victim]);
}

#[test]
fn others_are_ignored_when_their_check_is_off() {
    let physical = PhysicalLayerConfig {active_qot_for_other:false,..PhysicalLayerConfig::default()};
    let mut mesh = Mesh::new();
    for name in ["A","B","C"] {
        mesh.add_node(name,TransponderPool::default(),TransponderPool::default()).unwrap();
    }
    mesh.add_bidirectional_link(0,1,Spectrum::new(8,12.5e9),100.0,1.0).unwrap();
    mesh.add_bidirectional_link(1,2,Spectrum::new(8,12.5e9),100.0,1.0).unwrap();
    let mut cp = ControlPlane::new(mesh,QotEngine::new(physical),
        Box::new(Grmlsa::first_fit_by_distance()),vec![Arc::new(unit())]);
    let route = route(&cp);
    let alone = cp.evaluate_qot(None,&route,&unit(),si(1,4),true);
    let strict = Arc::new(unit().with_threshold_db(alone.snr_db - 0.01));
    cp.establish_with(&demand(0,50e9),Proposal {route:route.clone(),modulation:strict,band:si(1,4)}).unwrap();
    let proposal = Proposal {route,modulation:Arc::new(unit()),band:si(5,8)};
    assert!(cp.establish_with(&demand(1,50e9),proposal).is_ok());
    assert_eq!(cp.active_count(),2);
}

#[test]
fn snr_never_rises_with_more_neighbours() {
    let mut cp = line(32,vec![Arc::new(unit())]);
    let route = route(&cp);
    let subject = cp.establish(&demand(0,50e9)).unwrap();
    let snr = |cp:&ControlPlane| {
        let c = cp.circuit(subject).unwrap();
        cp.evaluate_qot(Some(subject),c.route(),c.modulation(),c.band(),true).snr_db
    };

    let mut last = snr(&cp);
    for (i,band) in [si(5,8),si(9,12),si(20,23),si(29,32)].into_iter().enumerate() {
        let proposal = Proposal {route:route.clone(),modulation:Arc::new(unit()),band};
        cp.establish_with(&demand(i as u64 + 1,50e9),proposal).unwrap();
        let now = snr(&cp);
        assert!(now <= last,"snr rose from {last} to {now} after {band}");
        last = now;
    }
    // the stored value follows the neighbours
    let stored = cp.circuit(subject).unwrap().snr_db().unwrap();
    assert!((stored - last).abs() < 1e-9);
}

#[test]
fn transponders_are_returned_on_release() {
    let mut mesh = Mesh::new();
    mesh.add_node("A",TransponderPool::bounded(1),TransponderPool::default()).unwrap();
    mesh.add_node("B",TransponderPool::default(),TransponderPool::bounded(1)).unwrap();
    mesh.add_bidirectional_link(0,1,Spectrum::new(16,12.5e9),100.0,1.0).unwrap();
    let mut cp = ControlPlane::new(mesh,QotEngine::default(),
        Box::new(Grmlsa::first_fit_by_distance()),vec![Arc::new(unit())]);
    let request = |id| Demand::single(Request {id,source:0,destination:1,bandwidth:25e9});

    let id = cp.establish(&request(0)).unwrap();
    assert_eq!(cp.mesh().node(0).unwrap().transmitters().in_use(),1);
    assert_eq!(cp.establish(&request(1)).unwrap_err(),EstablishError::NoFreeTransponder {from:0,to:1});
    cp.release(id).unwrap();
    assert_eq!(cp.mesh().node(1).unwrap().receivers().in_use(),0);
    assert!(cp.establish(&request(2)).is_ok());
}
