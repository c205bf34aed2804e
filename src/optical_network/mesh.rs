use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

use crate::dsa::graph::WeightedGraph;
use crate::optical_network::circuit::CircuitId;
use crate::optical_network::spectrum::Spectrum;
use crate::optical_network::transponder::TransponderPool;

type NoHashMap<K,V> = std::collections::hash_map::HashMap<K,V,nohash::BuildNoHashHasher<usize>>;

pub type NodeId = usize;
pub type LinkId = usize;

#[derive(Error,Debug,Clone,PartialEq,Eq)]
pub enum MeshError {
    #[error("node {0} is not part of the mesh")]
    UnknownNode(String),
    #[error("node {0} was declared twice")]
    DuplicateNode(String),
    #[error("there is no link from node {from} to node {to}")]
    NoLink{from:NodeId,to:NodeId},
    #[error("a link from node {from} to node {to} already exists")]
    DuplicateLink{from:NodeId,to:NodeId},
    #[error("a route needs at least two distinct nodes without loops, got {nodes:?}")]
    InvalidRoute{nodes:Vec<NodeId>},
}

type Result<T> = std::result::Result<T,MeshError>;

#[derive(Clone,Debug)]
pub struct Node {
    name:String,
    pub(crate) transmitters:TransponderPool,
    pub(crate) receivers:TransponderPool,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn transmitters(&self) -> &TransponderPool {
        &self.transmitters
    }
    pub fn receivers(&self) -> &TransponderPool {
        &self.receivers
    }
}

/* unidirectional fiber between two nodes
`circuits` only names the circuits lit on it,
the control plane owns them */
#[derive(Clone,Debug)]
pub struct Link {
    id:LinkId,
    source:NodeId,
    destination:NodeId,
    distance_km:f64,
    cost:f64,
    pub(crate) spectrum:Spectrum,
    pub(crate) circuits:BTreeSet<CircuitId>,
}

impl Link {
    pub fn id(&self) -> LinkId {
        self.id
    }
    pub fn source(&self) -> NodeId {
        self.source
    }
    pub fn destination(&self) -> NodeId {
        self.destination
    }
    pub fn distance_km(&self) -> f64 {
        self.distance_km
    }
    pub fn cost(&self) -> f64 {
        self.cost
    }
    pub fn spectrum(&self) -> &Spectrum {
        &self.spectrum
    }
    pub fn circuits(&self) -> impl Iterator<Item = CircuitId> + '_ {
        self.circuits.iter().copied()
    }
    pub fn carries(&self,circuit:CircuitId) -> bool {
        self.circuits.contains(&circuit)
    }
}

// arena of nodes and links, ids are indices and never reused
#[derive(Clone,Debug,Default)]
pub struct Mesh {
    nodes:Vec<Node>,
    links:Vec<Link>,
    names:HashMap<String,NodeId>,
    // per node, next node -> link
    out_links:Vec<NoHashMap<NodeId,LinkId>>,
    graph:WeightedGraph,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self,name:&str,transmitters:TransponderPool,receivers:TransponderPool) -> Result<NodeId> {
        if self.names.contains_key(name) {
            return Err(MeshError::DuplicateNode(name.to_owned()));
        }
        let id = self.nodes.len();
        self.nodes.push(Node {name:name.to_owned(),transmitters,receivers});
        self.names.insert(name.to_owned(),id);
        self.out_links.push(NoHashMap::with_hasher(nohash::BuildNoHashHasher::default()));
        self.graph.push_node(id);
        Ok(id)
    }

    pub fn add_link(&mut self,source:NodeId,destination:NodeId,spectrum:Spectrum,
        distance_km:f64,cost:f64) -> Result<LinkId> {
        self.node(source)?;
        self.node(destination)?;
        if source == destination {
            return Err(MeshError::InvalidRoute {nodes:vec![source,destination]});
        }
        if self.out_links[source].contains_key(&destination) {
            return Err(MeshError::DuplicateLink {from:source,to:destination});
        }
        let id = self.links.len();
        self.links.push(Link {
            id,source,destination,distance_km,cost,spectrum,
            circuits:BTreeSet::new()
        });
        self.out_links[source].insert(destination,id);
        self.graph.push_edge(source,destination,cost);
        Ok(id)
    }

    // one fiber in each direction with independent spectra
    pub fn add_bidirectional_link(&mut self,a:NodeId,b:NodeId,spectrum:Spectrum,
        distance_km:f64,cost:f64) -> Result<(LinkId,LinkId)> {
        let forward = self.add_link(a,b,spectrum.clone(),distance_km,cost)?;
        let backward = self.add_link(b,a,spectrum,distance_km,cost)?;
        Ok((forward,backward))
    }

    pub fn node_id(&self,name:&str) -> Result<NodeId> {
        self.names.get(name).copied().ok_or_else(|| MeshError::UnknownNode(name.to_owned()))
    }
    pub fn node(&self,id:NodeId) -> Result<&Node> {
        self.nodes.get(id).ok_or_else(|| MeshError::UnknownNode(id.to_string()))
    }
    pub(crate) fn node_mut(&mut self,id:NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(id).ok_or_else(|| MeshError::UnknownNode(id.to_string()))
    }
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
    pub fn links(&self) -> &[Link] {
        &self.links
    }
    pub fn link(&self,id:LinkId) -> Option<&Link> {
        self.links.get(id)
    }
    pub(crate) fn link_mut(&mut self,id:LinkId) -> Option<&mut Link> {
        self.links.get_mut(id)
    }
    pub fn link_between(&self,source:NodeId,destination:NodeId) -> Option<LinkId> {
        self.out_links.get(source)?.get(&destination).copied()
    }
    pub fn graph(&self) -> &WeightedGraph {
        &self.graph
    }

    pub fn max_utilization(&self) -> f64 {
        self.links.iter().map(|l| l.spectrum.utilization()).fold(0.0,f64::max)
    }
    pub fn mean_external_fragmentation(&self) -> f64 {
        if self.links.is_empty() {return 0.0}
        let sum:f64 = self.links.iter().map(|l| l.spectrum.external_fragmentation()).sum();
        sum/self.links.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::{Mesh, MeshError};
    use crate::optical_network::spectrum::Spectrum;
    use crate::optical_network::transponder::TransponderPool;

    #[test]
    fn test_build_mesh() {
        let mut mesh = Mesh::new();
        let a = mesh.add_node("A",TransponderPool::unbounded(),TransponderPool::unbounded()).unwrap();
        let b = mesh.add_node("B",TransponderPool::bounded(1),TransponderPool::bounded(1)).unwrap();
        assert_eq!(mesh.add_node("A",TransponderPool::default(),TransponderPool::default()),
            Err(MeshError::DuplicateNode("A".to_owned())));
        let (ab,ba) = mesh.add_bidirectional_link(a,b,Spectrum::new(8,12.5e9),100.0,100.0).unwrap();
        assert_eq!(mesh.link_between(a,b),Some(ab));
        assert_eq!(mesh.link_between(b,a),Some(ba));
        assert_eq!(mesh.add_link(a,b,Spectrum::new(8,12.5e9),1.0,1.0),
            Err(MeshError::DuplicateLink {from:a,to:b}));
        assert!(mesh.add_link(a,7,Spectrum::new(8,12.5e9),1.0,1.0).is_err());
        assert_eq!(mesh.node_id("B"),Ok(b));
        assert!(mesh.node_id("C").is_err());
        assert_eq!(mesh.graph().edges_len(),2);
        assert_eq!(mesh.max_utilization(),0.0);
    }
}
