//! Steepest-descent (D8/D4/profile) single-flow router (spec §4.3).

use crate::error::Result;
use crate::flow::graph::FlowGraphImpl;
use crate::flow::operator::{FlowDirection, Operator};
use crate::grid::Grid;

/// Routes each node to its single steepest-descent neighbor. Ties (equal
/// slope) are broken by the smallest neighbor index, matching the compass
/// order `neighbors()` returns them in — a deterministic, reproducible
/// choice rather than an arbitrary one.
#[derive(Debug, Default)]
pub struct SingleFlowRouter;

impl Operator for SingleFlowRouter {
    fn name(&self) -> &'static str {
        "single_flow_router"
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
        FlowDirection::Single
    }

    fn execute(&self, grid: &dyn Grid, graph: &mut FlowGraphImpl, elevation: &mut [f64]) -> Result<()> {
        for i in 0..grid.size() {
            let status = grid.status(i);
            if status.is_base_level() || status.is_ghost() {
                continue;
            }

            let mut best: Option<(usize, f64, f64)> = None; // (index, slope, distance)
            for nb in grid.neighbors(i) {
                let slope = (elevation[i] - elevation[nb.index]) / nb.distance;
                if slope <= 0.0 {
                    continue;
                }
                let take = match best {
                    None => true,
                    Some((best_idx, best_slope, _)) => {
                        slope > best_slope || (slope == best_slope && nb.index < best_idx)
                    }
                };
                if take {
                    best = Some((nb.index, slope, nb.distance));
                }
            }

            if let Some((j, _, d)) = best {
                graph.set_single_receiver(i, j, d);
            }
            // else: pit, zero receivers (left untouched by reset()).
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
    fn routes_toward_lowest_neighbor() {
        let grid = RasterGrid::new(3, 3, 1.0, 1.0, Borders::fixed_value(), &[], Connectivity::Eight).unwrap();
        let mut graph = FlowGraphImpl::new(9, true);
        // a single bowl: center is lowest
        let mut elevation = vec![1.0; 9];
        elevation[4] = 0.0;
        SingleFlowRouter.execute(&grid, &mut graph, &mut elevation).unwrap();
        // corner/edge nodes should all route (eventually) toward 4, base levels excepted
        for i in 0..9 {
            if grid.status(i).is_base_level() {
                assert_eq!(graph.rcount(i), 0);
            }
        }
    }

    #[test]
    fn tie_breaks_to_smallest_index() {
        let grid = RasterGrid::new(3, 3, 1.0, 1.0, Borders::fixed_value(), &[], Connectivity::Eight).unwrap();
        let mut graph = FlowGraphImpl::new(9, true);
        // node 4 (center) has two equally-low non-base-level... use a profile-free raster
        // where two neighbors of node 1 (top edge, interior-ish) tie.
        let mut elevation = vec![5.0; 9];
        elevation[1] = 10.0; // will route to a neighbor
        elevation[0] = 0.0;
        elevation[2] = 0.0;
        SingleFlowRouter.execute(&grid, &mut graph, &mut elevation).unwrap();
        assert_eq!(graph.receivers(1)[0].node, 0);
    }

    #[test]
    fn pits_have_zero_receivers() {
        let grid = RasterGrid::new(3, 3, 1.0, 1.0, Borders::fixed_value(), &[], Connectivity::Eight).unwrap();
        let mut graph = FlowGraphImpl::new(9, true);
        let mut elevation = vec![1.0; 9];
        elevation[4] = -5.0; // an interior pit surrounded by higher ground
        SingleFlowRouter.execute(&grid, &mut graph, &mut elevation).unwrap();
        assert_eq!(graph.rcount(4), 0);
    }
}
