//! Minimum-spanning-tree sink resolver (spec §4.4) — the hardest piece of
//! the pipeline. Treats each basin (connected component of the receiver
//! tree built by a prior single-flow router) as one node of a *basin
//! graph*, links basins by their lowest connecting pass, spans that graph
//! with a minimum spanning tree rooted at the set of real base levels, then
//! reroutes every non-outlet basin's pit across its spanning-tree parent
//! edge.
//!
//! Union-find with path compression and union-by-size is the same shape as
//! `petgraph`'s `unionfind` module; the Kruskal sort-and-union loop below
//! mirrors `petgraph::algo::min_spanning_tree`, generalized to our basin
//! graph's `(pass_elevation, lower_node, higher_node)` tie-break key. An
//! equivalent Boruvka pass is offered alongside it — same unique MST under
//! a strict total edge order, but its per-round "cheapest edge per
//! component" scan is embarrassingly parallel, which the sequential Kruskal
//! union loop is not.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::flow::graph::FlowGraphImpl;
use crate::flow::operator::{FlowDirection, Operator};
use crate::grid::Grid;

/// How a resolved pit's new route is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteVariant {
    /// Connect the pit directly to the neighboring basin's pass node. Cheap,
    /// but the new edge is not guaranteed to be downhill.
    Basic,
    /// Reverse the pit's old receiver chain back up to the pass node and
    /// lower elevation along it by [`CARVE_EPSILON`] increments so the new
    /// route is strictly downhill.
    Carve,
}

/// Selection strategy for the basin-graph MST; both produce the same tree
/// given a strict total edge order (see module docs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MstAlgorithm {
    Kruskal,
    Boruvka,
}

/// Elevation step CARVE uses to keep a carved channel strictly downhill
/// without perturbing unrelated nodes.
pub const CARVE_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy)]
struct BasinEdge {
    a: usize,
    b: usize,
    node_a: usize,
    node_b: usize,
    distance: f64,
    pass: f64,
}

impl BasinEdge {
    fn lower_node(&self) -> usize {
        self.node_a.min(self.node_b)
    }
    fn higher_node(&self) -> usize {
        self.node_a.max(self.node_b)
    }

    /// Total order: lowest pass first, then the spec's `(lower_endpoint,
    /// higher_endpoint)` index tie-break for determinism across runs.
    fn cmp_order(&self, other: &Self) -> Ordering {
        self.pass
            .total_cmp(&other.pass)
            .then_with(|| self.lower_node().cmp(&other.lower_node()))
            .then_with(|| self.higher_node().cmp(&other.higher_node()))
    }

    /// The endpoint on the `from` side and the endpoint it connects to.
    fn endpoint_in(&self, basin: usize) -> (usize, usize) {
        if self.a == basin {
            (self.node_a, self.node_b)
        } else {
            (self.node_b, self.node_a)
        }
    }

    fn other_basin(&self, basin: usize) -> usize {
        if self.a == basin {
            self.b
        } else {
            self.a
        }
    }
}

struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self { parent: (0..n).collect(), size: vec![1; n] }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    /// Returns `true` if `a` and `b` were in different components (and are
    /// now merged).
    fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        let (big, small) = if self.size[ra] >= self.size[rb] { (ra, rb) } else { (rb, ra) };
        self.parent[small] = big;
        self.size[big] += self.size[small];
        true
    }
}

/// Kruskal: sort all candidate edges by [`BasinEdge::cmp_order`], union-find
/// greedily.
fn kruskal_mst(num_nodes: usize, edges: &[BasinEdge]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..edges.len()).collect();
    order.sort_by(|&i, &j| edges[i].cmp_order(&edges[j]));

    let mut uf = UnionFind::new(num_nodes);
    let mut selected = Vec::new();
    for idx in order {
        if uf.union(edges[idx].a, edges[idx].b) {
            selected.push(idx);
        }
    }
    selected
}

/// Boruvka: each round, every component finds its cheapest edge leaving the
/// component (by the same total order); all such edges are unioned at
/// once. Produces the identical edge set to Kruskal whenever the order is a
/// strict total order (no two edges compare equal), which
/// `BasinEdge::cmp_order` guarantees as long as no two node pairs coincide.
fn boruvka_mst(num_nodes: usize, edges: &[BasinEdge]) -> Vec<usize> {
    let mut uf = UnionFind::new(num_nodes);
    let mut selected = Vec::new();
    let mut remaining_components = num_nodes;

    while remaining_components > 1 {
        let mut cheapest: Vec<Option<usize>> = vec![None; num_nodes];
        for (idx, e) in edges.iter().enumerate() {
            let (ra, rb) = (uf.find(e.a), uf.find(e.b));
            if ra == rb {
                continue;
            }
            for &root in &[ra, rb] {
                let is_better = match cheapest[root] {
                    None => true,
                    Some(existing) => e.cmp_order(&edges[existing]) == Ordering::Less,
                };
                if is_better {
                    cheapest[root] = Some(idx);
                }
            }
        }

        let mut merged_this_round = false;
        for slot in cheapest.into_iter().flatten() {
            let e = &edges[slot];
            if uf.union(e.a, e.b) {
                selected.push(slot);
                remaining_components -= 1;
                merged_this_round = true;
            }
        }
        if !merged_this_round {
            break; // disconnected basin graph; caller reports the shortfall
        }
    }
    selected
}

/// Resolves pits (basins with no real base-level outlet) by spanning the
/// basin graph with a minimum spanning tree and rerouting each pit across
/// its tree parent edge. Must run after a single-flow router has populated
/// `graph` (`in_flowdir`/`out_flowdir` are both `Single`).
#[derive(Debug, Clone, Copy)]
pub struct MSTSinkResolver {
    route: RouteVariant,
    algorithm: MstAlgorithm,
}

impl MSTSinkResolver {
    pub fn new(route: RouteVariant, algorithm: MstAlgorithm) -> Self {
        Self { route, algorithm }
    }
}

impl Operator for MSTSinkResolver {
    fn name(&self) -> &'static str {
        "mst_sink_resolver"
    }
    fn graph_updated(&self) -> bool {
        true
    }
    fn elevation_updated(&self) -> bool {
        self.route == RouteVariant::Carve
    }
    fn in_flowdir(&self) -> FlowDirection {
        FlowDirection::Single
    }
    fn out_flowdir(&self) -> FlowDirection {
        FlowDirection::Single
    }

    fn execute(&self, grid: &dyn Grid, graph: &mut FlowGraphImpl, elevation: &mut [f64]) -> Result<()> {
        graph.compute_basins()?;
        let basins = graph.basins().expect("just computed").to_vec();
        let n = grid.size();
        let num_basins = basins.iter().map(|&b| b as usize + 1).max().unwrap_or(0);
        if num_basins == 0 {
            return Ok(());
        }

        let mut roots = vec![usize::MAX; num_basins];
        for i in 0..n {
            if graph.rcount(i) == 0 {
                roots[basins[i] as usize] = i;
            }
        }

        let mut is_outlet = vec![false; num_basins];
        for b in 0..num_basins {
            is_outlet[b] = grid.status(roots[b]).is_base_level();
        }
        if !is_outlet.iter().any(|&x| x) {
            return Err(Error::InvariantViolated(
                "basin graph has no reachable base-level outlet".into(),
            ));
        }

        // Lowest-pass edge between every pair of basins the grid's
        // adjacency actually connects.
        let mut best: HashMap<(usize, usize), BasinEdge> = HashMap::new();
        for i in 0..n {
            if grid.status(i).is_ghost() {
                continue;
            }
            let bi = basins[i] as usize;
            for nb in grid.neighbors(i) {
                let bj = basins[nb.index] as usize;
                if bi == bj {
                    continue;
                }
                let (a, b, node_a, node_b) =
                    if bi < bj { (bi, bj, i, nb.index) } else { (bj, bi, nb.index, i) };
                let candidate = BasinEdge {
                    a,
                    b,
                    node_a,
                    node_b,
                    distance: nb.distance,
                    pass: elevation[i].max(elevation[nb.index]),
                };
                best.entry((a, b))
                    .and_modify(|existing| {
                        if candidate.cmp_order(existing) == Ordering::Less {
                            *existing = candidate;
                        }
                    })
                    .or_insert(candidate);
            }
        }

        // Virtual outlet node ties every real base-level basin together at
        // zero (negative-infinite) cost, so the MST always roots there.
        let virtual_node = num_basins;
        let mut edges: Vec<BasinEdge> = best.into_values().collect();
        for (b, &outlet) in is_outlet.iter().enumerate() {
            if outlet {
                edges.push(BasinEdge {
                    a: b,
                    b: virtual_node,
                    node_a: roots[b],
                    node_b: roots[b],
                    distance: 0.0,
                    pass: f64::NEG_INFINITY,
                });
            }
        }

        let total_nodes = num_basins + 1;
        let selected = match self.algorithm {
            MstAlgorithm::Kruskal => kruskal_mst(total_nodes, &edges),
            MstAlgorithm::Boruvka => boruvka_mst(total_nodes, &edges),
        };
        if selected.len() != num_basins {
            return Err(Error::InvariantViolated(
                "basin graph is not fully connected; some pits cannot reach any base level".into(),
            ));
        }

        // Adjacency of the spanning tree, in terms of basin ids ( `virtual_node` included ).
        let mut tree_adj: Vec<Vec<usize>> = vec![Vec::new(); total_nodes];
        for &idx in &selected {
            let e = &edges[idx];
            tree_adj[e.a].push(idx);
            tree_adj[e.b].push(idx);
        }

        // BFS from the virtual root assigns each basin its parent edge.
        let mut parent_edge: Vec<Option<usize>> = vec![None; num_basins];
        let mut visited = vec![false; total_nodes];
        visited[virtual_node] = true;
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(virtual_node);
        while let Some(node) = queue.pop_front() {
            for &idx in &tree_adj[node] {
                let e = &edges[idx];
                let other = if e.a == node { e.b } else { e.a };
                if visited[other] {
                    continue;
                }
                visited[other] = true;
                if other != virtual_node {
                    parent_edge[other] = Some(idx);
                }
                queue.push_back(other);
            }
        }

        for b in 0..num_basins {
            if is_outlet[b] {
                continue; // already a valid outlet, nothing to reroute
            }
            let idx = parent_edge[b].expect("basin graph MST is connected");
            let e = edges[idx];
            let (u, v) = e.endpoint_in(b); // u in basin b, v in e.other_basin(b)
            debug_assert_eq!(e.other_basin(b), basins[v] as usize);

            match self.route {
                RouteVariant::Basic => {
                    graph.set_single_receiver(roots[b], v, e.distance);
                }
                RouteVariant::Carve => {
                    let mut path = vec![u];
                    let mut cur = u;
                    while graph.rcount(cur) > 0 {
                        cur = graph.receivers(cur)[0].node;
                        path.push(cur);
                    }
                    debug_assert_eq!(*path.last().unwrap(), roots[b]);

                    let mut reversed_edges = Vec::with_capacity(path.len() - 1);
                    for w in path.windows(2) {
                        let (from, to) = (w[0], w[1]);
                        let dist = graph.receivers(from)[0].distance;
                        reversed_edges.push((from, to, dist));
                    }
                    for &(from, to, dist) in reversed_edges.iter().rev() {
                        graph.set_single_receiver(to, from, dist);
                    }
                    graph.set_single_receiver(u, v, e.distance);

                    // Walk the path downstream-first (v is fixed; path[0] is
                    // u, which now drains into v; path.last() is the old pit,
                    // now the most upstream node). Only lower a node when its
                    // original elevation would not already strictly exceed
                    // its new receiver's — preserves elevation wherever the
                    // reversed route happens to already be downhill.
                    let mut prev = elevation[v];
                    for &node in &path {
                        if elevation[node] <= prev {
                            elevation[node] = prev + CARVE_EPSILON;
                        }
                        prev = elevation[node];
                    }
                }
            }
        }

        graph.compute_donors();
        graph.compute_order()?;
        // The receiver graph changed; refresh the exposed basin array too,
        // so it reflects the post-resolution partition rather than the
        // stale pre-resolution one-basin-per-pit assignment `compute_basins`
        // produced at the top of this function.
        graph.compute_basins()?;
        Ok(())
    }
}
