use crate::grmlsa::Routing;
use crate::optical_network::circuit::Demand;
use crate::optical_network::control_plane::ControlPlane;
use crate::optical_network::route::Route;

// dijkstra over link costs
#[derive(Clone,Copy,Debug,Default)]
pub struct ShortestPath;

impl Routing for ShortestPath {
    fn routes(&self,demand:&Demand,cp:&ControlPlane) -> Vec<Route> {
        let mesh = cp.mesh();
        mesh.graph().shortest_path(demand.source,demand.destination)
            .and_then(|(path,_)| Route::new(mesh,&path).ok())
            .into_iter()
            .collect()
    }
}

// yen's loopless k shortest paths, cheapest first
#[derive(Clone,Copy,Debug)]
pub struct KShortestPaths {
    k:usize,
}

impl KShortestPaths {
    pub fn new(k:usize) -> Self {
        Self {k:k.max(1)}
    }
    pub fn k(&self) -> usize {
        self.k
    }
}

impl Routing for KShortestPaths {
    fn routes(&self,demand:&Demand,cp:&ControlPlane) -> Vec<Route> {
        let mesh = cp.mesh();
        mesh.graph().k_shortest_paths(demand.source,demand.destination,self.k)
            .into_iter()
            .filter_map(|(path,_)| Route::new(mesh,&path).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{KShortestPaths, ShortestPath};
    use crate::config::NetworkConfig;
    use crate::grmlsa::Routing;
    use crate::grmlsa::integrated::Grmlsa;
    use crate::optical_network::circuit::{Demand, Request};
    use crate::optical_network::control_plane::ControlPlane;
    use crate::scientific_computing::qot::QotEngine;

    fn ring(nodes:usize) -> ControlPlane {
        let network = NetworkConfig::ring(nodes,16,100.0);
        let mesh = network.build_mesh().unwrap();
        ControlPlane::new(mesh,QotEngine::default(),Box::new(Grmlsa::first_fit_by_distance()),network.modulations())
    }

    fn demand(source:usize,destination:usize) -> Demand {
        Demand::single(Request {id:0,source,destination,bandwidth:10e9})
    }

    #[test]
    fn test_shortest_path_on_ring() {
        let cp = ring(6);
        let routes = ShortestPath.routes(&demand(0,2),&cp);
        assert_eq!(routes.len(),1);
        assert_eq!(routes[0].nodes(),&[0,1,2]);
        assert_eq!(routes[0].distance_km(),200.0);
        assert!(ShortestPath.routes(&demand(0,0),&cp).is_empty());
    }

    #[test]
    fn test_k_shortest_paths_on_ring() {
        let cp = ring(6);
        let routes = KShortestPaths::new(3).routes(&demand(0,2),&cp);
        // a ring only has the two directions
        assert_eq!(routes.len(),2);
        assert_eq!(routes[0].nodes(),&[0,1,2]);
        assert_eq!(routes[1].nodes(),&[0,5,4,3,2]);
        assert!(routes[0].distance_km() <= routes[1].distance_km());

        // at least one candidate is always asked for
        let one = KShortestPaths::new(0);
        assert_eq!(one.k(),1);
        assert_eq!(one.routes(&demand(0,2),&cp).len(),1);
    }
}
