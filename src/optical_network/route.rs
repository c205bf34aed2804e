use crate::optical_network::mesh::{LinkId, Mesh, MeshError, NodeId};

// loop-free node sequence and the links joining it, immutable once built
#[derive(Clone,Debug,PartialEq)]
pub struct Route {
    nodes:Vec<NodeId>,
    links:Vec<LinkId>,
    distance_km:f64,
}

impl Route {
    pub fn new(mesh:&Mesh,nodes:&[NodeId]) -> Result<Self,MeshError> {
        let mut seen = nodes.to_vec();
        seen.sort_unstable();
        seen.dedup();
        if nodes.len() < 2 || seen.len() != nodes.len() {
            return Err(MeshError::InvalidRoute {nodes:nodes.to_vec()});
        }
        let mut links = Vec::with_capacity(nodes.len() - 1);
        let mut distance_km = 0.0;
        for pair in nodes.windows(2) {
            let (source,destination) = (pair[0],pair[1]);
            let missing = MeshError::NoLink {from:source,to:destination};
            let id = mesh.link_between(source,destination).ok_or(missing.clone())?;
            let link = mesh.link(id).ok_or(missing)?;
            distance_km += link.distance_km();
            links.push(id);
        }
        Ok(Self {nodes:nodes.to_vec(),links,distance_km})
    }

    pub fn by_names(mesh:&Mesh,names:&[&str]) -> Result<Self,MeshError> {
        let nodes = names.iter().map(|n| mesh.node_id(n)).collect::<Result<Vec<_>,_>>()?;
        Self::new(mesh,&nodes)
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }
    pub fn links(&self) -> &[LinkId] {
        &self.links
    }
    pub fn source(&self) -> NodeId {
        self.nodes[0]
    }
    pub fn destination(&self) -> NodeId {
        self.nodes[self.nodes.len() - 1]
    }
    pub fn hops(&self) -> usize {
        self.links.len()
    }
    pub fn distance_km(&self) -> f64 {
        self.distance_km
    }
    pub fn contains_link(&self,link:LinkId) -> bool {
        self.links.contains(&link)
    }
    pub fn shares_link_with(&self,other:&Route) -> bool {
        self.links.iter().any(|l| other.contains_link(*l))
    }
}
