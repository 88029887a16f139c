//! Slope-weighted multiple-flow-direction router (spec §4.3).

use crate::error::{Error, Result};
use crate::flow::graph::FlowGraphImpl;
use crate::flow::operator::{FlowDirection, Operator};
use crate::grid::Grid;

/// Partitions each node's outflow across every downslope neighbor,
/// weighted by `slope^slope_exp` and normalized to sum to one. A node with
/// no downslope neighbor (a flat or a pit) gets zero receivers — per
/// spec.md's resolved open question, the same "pit" representation the
/// single-flow router uses rather than an arbitrary flat-routing rule.
#[derive(Debug)]
pub struct MultiFlowRouter {
    slope_exp: f64,
}

impl MultiFlowRouter {
    pub fn new(slope_exp: f64) -> Result<Self> {
        if !(slope_exp >= 0.0) {
            return Err(Error::InvalidArgument(format!(
                "multi-flow slope exponent must be non-negative, got {slope_exp}"
            )));
        }
        Ok(Self { slope_exp })
    }
}

impl Operator for MultiFlowRouter {
    fn name(&self) -> &'static str {
        "multi_flow_router"
    }
    fn graph_updated(&self) -> bool {
        true
    }
    fn elevation_updated(&self) -> bool {
        false
    }
    fn in_flowdir(&self) -> FlowDirection {
        FlowDirection::Undefined
    }
    fn out_flowdir(&self) -> FlowDirection {
        FlowDirection::Multi
    }

    fn execute(&self, grid: &dyn Grid, graph: &mut FlowGraphImpl, elevation: &mut [f64]) -> Result<()> {
        for i in 0..grid.size() {
            let status = grid.status(i);
            if status.is_base_level() || status.is_ghost() {
                continue;
            }

            let mut edges: Vec<(usize, f64, f64)> = Vec::new(); // (node, distance, weight)
            for nb in grid.neighbors(i) {
                let drop = elevation[i] - elevation[nb.index];
                if drop <= 0.0 {
                    continue;
                }
                let slope = drop / nb.distance;
                edges.push((nb.index, nb.distance, slope.powf(self.slope_exp)));
            }

            let total: f64 = edges.iter().map(|(_, _, w)| w).sum();
            if total > 0.0 {
                for (j, d, w) in edges {
                    graph.add_multi_receiver(i, j, d, w / total);
                }
            }
            // else: flat node or pit, zero receivers.
        }

        graph.compute_donors();
        graph.compute_order()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::raster::{Borders, Connectivity, RasterGrid};

    #[test]
    fn weights_normalize_to_one() {
        let grid = RasterGrid::new(3, 3, 1.0, 1.0, Borders::fixed_value(), &[], Connectivity::Eight).unwrap();
        let mut graph = FlowGraphImpl::new(9, false);
        let mut elevation = vec![0.5; 9];
        elevation[4] = 1.0;
        let router = MultiFlowRouter::new(1.5).unwrap();
        router.execute(&grid, &mut graph, &mut elevation).unwrap();
        let total: f64 = graph.receivers(4).iter().map(|r| r.weight).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn flat_node_gets_zero_receivers() {
        let grid = RasterGrid::new(3, 3, 1.0, 1.0, Borders::fixed_value(), &[], Connectivity::Eight).unwrap();
        let mut graph = FlowGraphImpl::new(9, false);
        let mut elevation = vec![1.0; 9]; // perfectly flat
        let router = MultiFlowRouter::new(1.1).unwrap();
        router.execute(&grid, &mut graph, &mut elevation).unwrap();
        assert_eq!(graph.rcount(4), 0);
    }

    #[test]
    fn negative_slope_exponent_is_rejected() {
        assert!(matches!(MultiFlowRouter::new(-1.0), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn zero_slope_exponent_yields_uniform_weights_over_downslope_neighbors() {
        let grid = RasterGrid::new(3, 3, 1.0, 1.0, Borders::fixed_value(), &[], Connectivity::Eight).unwrap();
        let mut graph = FlowGraphImpl::new(9, false);
        let mut elevation = vec![0.0; 9];
        elevation[4] = 1.0; // center drains to all 8 neighbors, unequal slopes
        let router = MultiFlowRouter::new(0.0).unwrap();
        router.execute(&grid, &mut graph, &mut elevation).unwrap();
        let weights: Vec<f64> = graph.receivers(4).iter().map(|r| r.weight).collect();
        let first = weights[0];
        assert!(weights.iter().all(|w| (w - first).abs() < 1e-9));
    }
}
