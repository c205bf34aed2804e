use std::cmp::Ordering;
use std::collections::BinaryHeap;

type HashMap<K,V> = std::collections::hash_map::HashMap<K,V,nohash::BuildNoHashHasher<usize>>;
type HashSet<K> = std::collections::hash_set::HashSet<K,nohash::BuildNoHashHasher<usize>>;

pub type Path = Vec<usize>;

#[derive(Clone,Debug)]
struct Neighbours {
    // next node -> edge weight
    to:HashMap<usize,f64>,
    from:HashSet<usize>,
}

impl Neighbours {
    fn new() -> Self {
        Self {
            to:HashMap::with_hasher(nohash::BuildNoHashHasher::default()),
            from:HashSet::with_hasher(nohash::BuildNoHashHasher::default())
        }
    }
}

impl Default for Neighbours {
    fn default() -> Self {
        Self::new()
    }
}

// min-heap entry for dijkstra, ties broken by node id so that
// equal-cost paths are always resolved the same way
#[derive(Clone,Copy,Debug)]
struct Frontier {
    cost:f64,
    node:usize
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.total_cmp(&self.cost).then_with(|| other.node.cmp(&self.node))
    }
}

// directed graph with non-negative edge weights
#[derive(Clone,Debug)]
pub struct WeightedGraph {
    edges_len:usize,
    nodes:HashMap<usize,Neighbours>
}

impl Default for WeightedGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl WeightedGraph {
    pub fn new() -> Self {
        Self {edges_len:0,nodes:HashMap::with_hasher(nohash::BuildNoHashHasher::default())}
    }
    pub fn nodes_len(&self) -> usize {
        self.nodes.len()
    }
    pub fn edges_len(&self) -> usize {
        self.edges_len
    }
    pub fn contains_node(&self,node:usize) -> bool {
        self.nodes.contains_key(&node)
    }
    pub fn weight(&self,start:usize,end:usize) -> Option<f64> {
        self.nodes.get(&start)?.to.get(&end).copied()
    }
    pub fn push_node(&mut self,node:usize) {
        self.nodes.entry(node).or_default();
    }
    // re-pushing an existing edge only updates its weight
    pub fn push_edge(&mut self,start:usize,end:usize,weight:f64) {
        debug_assert!(weight >= 0.0,"edge {start} -> {end} has negative weight {weight}");
        let is_new = self.nodes.entry(start).or_default().to.insert(end,weight).is_none();
        self.nodes.entry(end).or_default().from.insert(start);
        if is_new {
            self.edges_len += 1;
        }
    }

    pub fn path_cost(&self,path:&[usize]) -> Option<f64> {
        let mut cost = 0.0;
        for pair in path.windows(2) {
            cost += self.weight(pair[0],pair[1])?;
        }
        Some(cost)
    }

    pub fn shortest_path(&self,start:usize,end:usize) -> Option<(Path,f64)> {
        let no_nodes = HashSet::with_hasher(nohash::BuildNoHashHasher::default());
        self.shortest_path_avoiding(start,end,&no_nodes,&[])
    }

    // dijkstra ignoring `banned_nodes` and the directed edges in `banned_edges`
    fn shortest_path_avoiding(&self,start:usize,end:usize,
        banned_nodes:&HashSet<usize>,banned_edges:&[(usize,usize)]) -> Option<(Path,f64)> {
        if !self.contains_node(start) || !self.contains_node(end) {
            return None;
        }
        if banned_nodes.contains(&start) || banned_nodes.contains(&end) {
            return None;
        }
        let mut distance:HashMap<usize,f64> = HashMap::with_capacity_and_hasher(
            self.nodes_len(), nohash::BuildNoHashHasher::default());
        let mut previous:HashMap<usize,usize> = HashMap::with_capacity_and_hasher(
            self.nodes_len(), nohash::BuildNoHashHasher::default());
        let mut heap = BinaryHeap::with_capacity(self.nodes_len());

        distance.insert(start,0.0);
        heap.push(Frontier {cost:0.0,node:start});

        while let Some(Frontier {cost,node}) = heap.pop() {
            if node == end {break}
            if cost > *distance.get(&node).unwrap_or(&f64::INFINITY) {
                continue;
            }
            let Some(neighbours) = self.nodes.get(&node) else {continue};
            // sorted so that relaxation order is independent of hashing
            let mut next:Vec<(usize,f64)> = neighbours.to.iter().map(|(n,w)| (*n,*w)).collect();
            next.sort_unstable_by_key(|(n,_)| *n);
            for (next_node,weight) in next {
                if banned_nodes.contains(&next_node) || banned_edges.contains(&(node,next_node)) {
                    continue;
                }
                let candidate = cost + weight;
                if candidate < *distance.get(&next_node).unwrap_or(&f64::INFINITY) {
                    distance.insert(next_node,candidate);
                    previous.insert(next_node,node);
                    heap.push(Frontier {cost:candidate,node:next_node});
                }
            }
        }

        let total = *distance.get(&end)?;
        let mut path = vec![end];
        let mut current = end;
        while current != start {
            current = *previous.get(&current)?;
            path.push(current);
        }
        path.reverse();
        Some((path,total))
    }

    // yen's algorithm, loopless paths in ascending cost order
    pub fn k_shortest_paths(&self,start:usize,end:usize,k:usize) -> Vec<(Path,f64)> {
        let mut accepted:Vec<(Path,f64)> = Vec::with_capacity(k);
        if k == 0 {return accepted}
        let Some(first) = self.shortest_path(start,end) else {return accepted};
        accepted.push(first);

        let mut candidates:Vec<(Path,f64)> = Vec::new();

        while accepted.len() < k {
            let Some((last_path,_)) = accepted.last().cloned() else {break};

            for spur_index in 0..last_path.len().saturating_sub(1) {
                let spur_node = last_path[spur_index];
                let root = &last_path[..=spur_index];

                let mut banned_edges = Vec::new();
                for (path,_) in accepted.iter() {
                    if path.len() > spur_index + 1 && &path[..=spur_index] == root {
                        banned_edges.push((path[spur_index],path[spur_index + 1]));
                    }
                }
                let banned_nodes:HashSet<usize> = root[..spur_index].iter().copied().collect();

                let Some((spur_path,_)) = self.shortest_path_avoiding(
                    spur_node,end,&banned_nodes,&banned_edges) else {continue};

                let mut total_path = root[..spur_index].to_vec();
                total_path.extend(spur_path);
                let Some(cost) = self.path_cost(&total_path) else {continue};

                let known = accepted.iter().chain(candidates.iter()).any(|(p,_)| *p == total_path);
                if !known {
                    candidates.push((total_path,cost));
                }
            }

            if candidates.is_empty() {break}
            // cheapest first, shorter hop count and then lexical order on ties
            candidates.sort_by(|(p1,c1),(p2,c2)| {
                c1.total_cmp(c2).then(p1.len().cmp(&p2.len())).then(p1.cmp(p2))
            });
            accepted.push(candidates.remove(0));
        }
        accepted
    }
}

impl FromIterator<(usize,usize,f64)> for WeightedGraph {
    fn from_iter<T: IntoIterator<Item = (usize,usize,f64)>>(iter: T) -> Self {
        let mut graph = Self::new();
        for (start,end,weight) in iter {
            graph.push_edge(start,end,weight);
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::WeightedGraph;

    fn undirected(edges:&[(usize,usize,f64)]) -> WeightedGraph {
        edges.iter().flat_map(|(a,b,w)| [(*a,*b,*w),(*b,*a,*w)]).collect()
    }

    #[test]
    fn test_shortest_path() {
        let graph = undirected(&[(0,1,1.0),(1,2,1.0),(0,2,5.0),(2,3,1.0)]);
        let (path,cost) = graph.shortest_path(0,3).unwrap();
        assert_eq!(path,vec![0,1,2,3]);
        assert_eq!(cost,3.0);
        assert!(graph.shortest_path(0,42).is_none());
        assert_eq!(graph.edges_len(),8);
    }

    #[test]
    fn test_unreachable() {
        let mut graph:WeightedGraph = [(0,1,1.0)].into_iter().collect();
        graph.push_node(7);
        assert!(graph.shortest_path(1,0).is_none());
        assert!(graph.shortest_path(0,7).is_none());
    }

    #[test]
    fn test_k_shortest_paths_ordered() {
        // two diamonds in series, four loopless paths
        let graph = undirected(&[
            (0,1,1.0),(0,2,2.0),(1,3,1.0),(2,3,1.0),
            (3,4,1.0),(3,5,3.0),(4,6,1.0),(5,6,1.0),
        ]);
        let paths = graph.k_shortest_paths(0,6,10);
        assert_eq!(paths.len(),4);
        assert_eq!(paths[0].0,vec![0,1,3,4,6]);
        assert_eq!(paths[1].0,vec![0,2,3,4,6]);
        let costs:Vec<f64> = paths.iter().map(|(_,c)| *c).collect();
        assert!(costs.windows(2).all(|w| w[0] <= w[1]));
        for (path,cost) in paths.iter() {
            assert_eq!(graph.path_cost(path),Some(*cost));
            let mut sorted = path.clone();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(sorted.len(),path.len(),"path {path:?} has a loop");
        }
    }

    #[test]
    fn test_k_limits_output() {
        let graph = undirected(&[(0,1,1.0),(1,2,1.0),(0,2,1.0)]);
        assert_eq!(graph.k_shortest_paths(0,2,1).len(),1);
        assert_eq!(graph.k_shortest_paths(0,2,0).len(),0);
        assert_eq!(graph.k_shortest_paths(0,2,5).len(),2);
    }
}
