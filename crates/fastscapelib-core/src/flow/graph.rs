//! `FlowGraphImpl` (spec §4.2): receiver/donor/order/basin storage and the
//! `accumulate` primitive.

use std::collections::{HashMap, VecDeque};

use crate::error::{Error, Result};
use crate::grid::Grid;

/// One outgoing edge of the receiver graph: `node` is the downstream
/// neighbor, `distance` its geometric length, `weight` its normalized
/// partition share.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Receiver {
    pub node: usize,
    pub distance: f64,
    pub weight: f64,
}

/// Compact storage for receivers/donors/order/basins, sized `N × F` (spec
/// §3). `single_flow` records the flow direction a pipeline sized this graph
/// for (its last concrete `out_flowdir`); operations that actually require
/// at-most-one receiver per node (like [`FlowGraphImpl::compute_basins`])
/// check the live receiver edges instead, since a graph sized
/// `single_flow = false` for an eventual multi-flow router is still
/// single-receiver at any point before that router runs.
#[derive(Clone)]
pub struct FlowGraphImpl {
    n: usize,
    single_flow: bool,
    receivers: Vec<Vec<Receiver>>,
    donors: Vec<Vec<usize>>,
    donors_valid: bool,
    order: Vec<usize>,
    order_valid: bool,
    basins: Option<Vec<u32>>,
}

impl FlowGraphImpl {
    pub fn new(n: usize, single_flow: bool) -> Self {
        Self {
            n,
            single_flow,
            receivers: vec![Vec::new(); n],
            donors: vec![Vec::new(); n],
            donors_valid: false,
            order: Vec::new(),
            order_valid: false,
            basins: None,
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn single_flow(&self) -> bool {
        self.single_flow
    }

    /// Marks receivers and order as stale, clearing all receiver edges. A
    /// router operator calls this before repopulating the graph for a new
    /// step.
    pub fn reset(&mut self) {
        for r in &mut self.receivers {
            r.clear();
        }
        self.donors_valid = false;
        self.order_valid = false;
        self.basins = None;
    }

    /// Overwrite node `i`'s receiver list with the single edge `i -> j`.
    pub fn set_single_receiver(&mut self, i: usize, j: usize, distance: f64) {
        self.receivers[i].clear();
        self.receivers[i].push(Receiver { node: j, distance, weight: 1.0 });
        self.donors_valid = false;
        self.order_valid = false;
    }

    /// Append receiver edge `i -> j` with partition weight `w`. Caller is
    /// responsible for the weights across all of `i`'s receivers summing to
    /// one (the multi-flow router normalizes before calling this).
    pub fn add_multi_receiver(&mut self, i: usize, j: usize, distance: f64, weight: f64) {
        self.receivers[i].push(Receiver { node: j, distance, weight });
        self.donors_valid = false;
        self.order_valid = false;
    }

    #[inline]
    pub fn receivers(&self, i: usize) -> &[Receiver] {
        &self.receivers[i]
    }

    #[inline]
    pub fn rcount(&self, i: usize) -> usize {
        self.receivers[i].len()
    }

    #[inline]
    pub fn donors(&self, i: usize) -> &[usize] {
        &self.donors[i]
    }

    #[inline]
    pub fn order(&self) -> Result<&[usize]> {
        if !self.order_valid {
            return Err(Error::InvariantViolated(
                "topological order requested before receivers populated".into(),
            ));
        }
        Ok(&self.order)
    }

    #[inline]
    pub fn basins(&self) -> Option<&[u32]> {
        self.basins.as_deref()
    }

    /// Rebuild donor lists from the current receiver edges. O(N·F).
    pub fn compute_donors(&mut self) {
        for d in &mut self.donors {
            d.clear();
        }
        for i in 0..self.n {
            for r in &self.receivers[i] {
                self.donors[r.node].push(i);
            }
        }
        self.donors_valid = true;
    }

    /// Produce a topological order (receivers before donors — spec §4.2) by
    /// peeling nodes whose receivers have all already been placed, starting
    /// from base-level/pit nodes (`rcount == 0`). This generalizes the
    /// single-flow reverse-DFS-from-base-levels description in spec.md to
    /// multi-flow fan-out via a Kahn-style in-degree peel over the donor
    /// adjacency built by [`FlowGraphImpl::compute_donors`] — the same BFS
    /// shape `hydraulic/basins.rs`'s outlet-to-donor sweep uses, generalized
    /// from a single D8 parent to an arbitrary receiver count.
    pub fn compute_order(&mut self) -> Result<()> {
        if !self.donors_valid {
            return Err(Error::InvariantViolated(
                "topological order requested before receivers populated".into(),
            ));
        }

        let mut remaining: Vec<usize> = (0..self.n).map(|i| self.receivers[i].len()).collect();
        let mut queue: VecDeque<usize> =
            (0..self.n).filter(|&i| remaining[i] == 0).collect();
        let mut order = Vec::with_capacity(self.n);

        while let Some(v) = queue.pop_front() {
            order.push(v);
            for &u in &self.donors[v] {
                remaining[u] -= 1;
                if remaining[u] == 0 {
                    queue.push_back(u);
                }
            }
        }

        if order.len() != self.n {
            return Err(Error::InvariantViolated(
                "cycle in receiver graph; cannot compute a topological order".into(),
            ));
        }

        self.order = order;
        self.order_valid = true;
        Ok(())
    }

    /// Assign each node the dense id of the basin (connected receiver-tree
    /// component) it belongs to, in discovery order. Requires every node to
    /// currently have at most one receiver — with multiple receivers a node
    /// has no single well-defined basin root. This is checked against the
    /// graph's actual receiver edges rather than the `single_flow` flag a
    /// pipeline sized the graph with: basin resolution runs pre-multi-flow-
    /// conversion in the pipelines this spec describes (spec §4.3 "MST
    /// resolver ... Multi(1.1)"), so a graph built `single_flow = false` to
    /// accommodate a later `MultiFlowRouter` still has ≤1 receiver per node
    /// at the point the MST resolver calls this.
    pub fn compute_basins(&mut self) -> Result<()> {
        if self.receivers.iter().any(|r| r.len() > 1) {
            return Err(Error::InvariantViolated(
                "compute_basins requires every node to have at most one receiver".into(),
            ));
        }

        const UNVISITED: usize = usize::MAX;
        let mut root_of = vec![UNVISITED; self.n];

        for start in 0..self.n {
            if root_of[start] != UNVISITED {
                continue;
            }
            let mut path = Vec::new();
            let mut cur = start;
            loop {
                if root_of[cur] != UNVISITED {
                    break;
                }
                path.push(cur);
                if self.receivers[cur].is_empty() {
                    root_of[cur] = cur;
                    break;
                }
                cur = self.receivers[cur][0].node;
            }
            let root = root_of[cur];
            for &p in &path {
                root_of[p] = root;
            }
        }

        let mut id_of_root: HashMap<usize, u32> = HashMap::new();
        let mut next_id = 0u32;
        let mut basins = vec![0u32; self.n];
        for i in 0..self.n {
            let root = root_of[i];
            let id = *id_of_root.entry(root).or_insert_with(|| {
                let id = next_id;
                next_id += 1;
                id
            });
            basins[i] = id;
        }

        self.basins = Some(basins);
        Ok(())
    }

    /// Accumulate `src[i]·area(i)` over the whole graph into a fresh array.
    pub fn accumulate(&self, grid: &dyn Grid, src: &[f64]) -> Result<Vec<f64>> {
        let mut acc = vec![0.0; self.n];
        self.accumulate_into(grid, src, &mut acc)?;
        Ok(acc)
    }

    /// Scalar overload of [`FlowGraphImpl::accumulate`]: every node
    /// contributes the same `src` value.
    pub fn accumulate_uniform(&self, grid: &dyn Grid, src: f64) -> Result<Vec<f64>> {
        let src_vec = vec![src; self.n];
        self.accumulate(grid, &src_vec)
    }

    /// Accumulate into a caller-provided buffer (zeroed first).
    ///
    /// Hot loop: for each node `i` in reverse topological order
    /// (upstream→downstream, i.e. `order` walked back to front), add
    /// `src[i]·area(i)` to `acc[i]`, then push `weight·acc[i]` onto each
    /// receiver. With the `rayon` feature, the embarrassingly-parallel
    /// `src[i]·area(i)` term is precomputed with a parallel map; the
    /// propagation walk itself stays sequential because each step depends
    /// on the accumulated value of its donors.
    pub fn accumulate_into(&self, grid: &dyn Grid, src: &[f64], acc: &mut [f64]) -> Result<()> {
        let order = self.order()?;
        for a in acc.iter_mut() {
            *a = 0.0;
        }

        #[cfg(feature = "rayon")]
        let local: Vec<f64> = {
            use rayon::prelude::*;
            (0..self.n).into_par_iter().map(|i| src[i] * grid.area(i)).collect()
        };
        #[cfg(not(feature = "rayon"))]
        let local: Vec<f64> = (0..self.n).map(|i| src[i] * grid.area(i)).collect();

        for &i in order.iter().rev() {
            acc[i] += local[i];
            let val = acc[i];
            for r in &self.receivers[i] {
                acc[r.node] += r.weight * val;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::raster::{Borders, Connectivity, RasterGrid};

    fn chain_graph(n: usize) -> FlowGraphImpl {
        // 0 <- 1 <- 2 <- ... <- n-1, node 0 is base level (no receiver)
        let mut g = FlowGraphImpl::new(n, true);
        for i in 1..n {
            g.set_single_receiver(i, i - 1, 1.0);
        }
        g.compute_donors();
        g.compute_order().unwrap();
        g
    }

    #[test]
    fn order_respects_topology() {
        let g = chain_graph(5);
        let order = g.order().unwrap();
        let pos: Vec<usize> = (0..5)
            .map(|n| order.iter().position(|&x| x == n).unwrap())
            .collect();
        for i in 1..5 {
            // edge i -> i-1: order_position(i) must exceed order_position(i-1)
            assert!(pos[i] > pos[i - 1]);
        }
    }

    #[test]
    fn order_before_donors_fails() {
        let g = FlowGraphImpl::new(4, true);
        assert!(matches!(g.order(), Err(Error::InvariantViolated(_))));
    }

    #[test]
    fn basins_collapse_chain_to_single_id() {
        let mut g = chain_graph(6);
        g.compute_basins().unwrap();
        let basins = g.basins().unwrap();
        assert!(basins.iter().all(|&b| b == basins[0]));
    }

    #[test]
    fn accumulate_uniform_integrates_area() {
        let grid =
            RasterGrid::new(3, 3, 2.0, 2.0, Borders::fixed_value(), &[], Connectivity::Eight)
                .unwrap();
        // all nodes drain into node 4 (center) for this synthetic test
        let mut g = FlowGraphImpl::new(9, true);
        for i in 0..9 {
            if i != 4 {
                g.set_single_receiver(i, 4, 2.0);
            }
        }
        g.compute_donors();
        g.compute_order().unwrap();
        use crate::grid::Grid as _;
        let acc = g.accumulate_uniform(&grid, 1.0).unwrap();
        let total_area: f64 = (0..9).map(|i| grid.area(i)).sum();
        assert!((acc[4] - total_area).abs() < 1e-9);
    }

    #[test]
    fn accumulate_is_linear() {
        let grid =
            RasterGrid::new(3, 3, 1.0, 1.0, Borders::fixed_value(), &[], Connectivity::Eight)
                .unwrap();
        let mut g = FlowGraphImpl::new(9, true);
        for i in 0..9 {
            if i != 4 {
                g.set_single_receiver(i, 4, 1.0);
            }
        }
        g.compute_donors();
        g.compute_order().unwrap();

        let x: Vec<f64> = (0..9).map(|i| i as f64).collect();
        let y: Vec<f64> = (0..9).map(|i| (9 - i) as f64).collect();
        let (a, b) = (2.0, 3.0);
        let combo: Vec<f64> = x.iter().zip(&y).map(|(&xi, &yi)| a * xi + b * yi).collect();

        let acc_combo = g.accumulate(&grid, &combo).unwrap();
        let acc_x = g.accumulate(&grid, &x).unwrap();
        let acc_y = g.accumulate(&grid, &y).unwrap();

        for i in 0..9 {
            let expected = a * acc_x[i] + b * acc_y[i];
            assert!((acc_combo[i] - expected).abs() < 1e-9);
        }
    }
}
