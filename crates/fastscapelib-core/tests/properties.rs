//! Property-based checks of the universal invariants spec §8 lists: every
//! elevation field, once routed and sink-resolved, must reach a base level;
//! receiver weights must sum to 0 or 1; accumulation must be linear. Uses
//! `proptest` to generate elevation fields rather than fixed literals, the
//! same randomized-input style `petgraph`'s and `terra-core`'s own
//! `proptest`-flavored invariant checks use.

use approx::assert_relative_eq;
use proptest::prelude::*;

use fastscapelib_core::flow::router::{MultiFlowRouter, SingleFlowRouter};
use fastscapelib_core::flow::sink::{MSTSinkResolver, MstAlgorithm, RouteVariant};
use fastscapelib_core::flow::{FlowGraphImpl, Operator};
use fastscapelib_core::grid::raster::{Borders, Connectivity, RasterGrid};
use fastscapelib_core::grid::{Grid, NodeStatus};

const ROWS: usize = 6;
const COLS: usize = 6;

fn fixed_value_raster() -> RasterGrid {
    RasterGrid::new(ROWS, COLS, 1.0, 1.0, Borders::fixed_value(), &[], Connectivity::Eight).unwrap()
}

/// Every non-base-level node must reach a base level by following receivers
/// (universal invariant 1). Requires single-flow, where the receiver chain
/// is unambiguous.
fn assert_every_node_reaches_a_base_level(grid: &dyn Grid, graph: &FlowGraphImpl) {
    for start in 0..grid.size() {
        let mut cur = start;
        let mut steps = 0;
        while graph.rcount(cur) > 0 {
            cur = graph.receivers(cur)[0].node;
            steps += 1;
            assert!(steps <= grid.size(), "cycle detected starting from node {start}");
        }
        assert!(grid.status(cur).is_base_level(), "node {start} never reaches a base level");
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Invariant 1, on an all-`FIXED_VALUE`-border raster after single-flow
    /// routing plus MST resolution (which must eliminate every pit): any
    /// elevation field resolves to a graph where every node reaches a base
    /// level.
    #[test]
    fn resolved_graph_always_reaches_a_base_level(
        elevations in prop::collection::vec(-10.0f64..10.0, ROWS * COLS)
    ) {
        let grid = fixed_value_raster();
        let mut elevation = elevations;
        let mut graph = FlowGraphImpl::new(grid.size(), true);
        SingleFlowRouter.execute(&grid, &mut graph, &mut elevation).unwrap();
        MSTSinkResolver::new(RouteVariant::Carve, MstAlgorithm::Kruskal)
            .execute(&grid, &mut graph, &mut elevation)
            .unwrap();
        assert_every_node_reaches_a_base_level(&grid, &graph);
    }

    /// Invariant 2: every node's receiver weights sum to exactly 0 (a pit or
    /// base level) or 1 (a routed node), for both single- and multi-flow.
    #[test]
    fn receiver_weights_sum_to_zero_or_one(
        elevations in prop::collection::vec(-10.0f64..10.0, ROWS * COLS),
        slope_exp in 0.0f64..3.0,
    ) {
        let grid = fixed_value_raster();
        let mut elevation = elevations;
        let mut graph = FlowGraphImpl::new(grid.size(), false);
        MultiFlowRouter::new(slope_exp).unwrap().execute(&grid, &mut graph, &mut elevation).unwrap();

        for i in 0..grid.size() {
            let total: f64 = graph.receivers(i).iter().map(|r| r.weight).sum();
            let is_zero = total.abs() < 1e-9;
            let is_one = (total - 1.0).abs() < 1e-9;
            prop_assert!(is_zero || is_one, "node {i} weight sum {total} is neither 0 nor 1");
        }
    }

    /// Invariant 3: accumulation is linear in its source field.
    #[test]
    fn accumulate_is_linear_over_random_fields(
        elevations in prop::collection::vec(0.1f64..10.0, ROWS * COLS),
        x in prop::collection::vec(0.0f64..5.0, ROWS * COLS),
        y in prop::collection::vec(0.0f64..5.0, ROWS * COLS),
        a in -3.0f64..3.0,
        b in -3.0f64..3.0,
    ) {
        let grid = fixed_value_raster();
        let mut elevation = elevations;
        let mut graph = FlowGraphImpl::new(grid.size(), true);
        SingleFlowRouter.execute(&grid, &mut graph, &mut elevation).unwrap();
        MSTSinkResolver::new(RouteVariant::Basic, MstAlgorithm::Boruvka)
            .execute(&grid, &mut graph, &mut elevation)
            .unwrap();

        let combo: Vec<f64> = x.iter().zip(&y).map(|(&xi, &yi)| a * xi + b * yi).collect();
        let acc_combo = graph.accumulate(&grid, &combo).unwrap();
        let acc_x = graph.accumulate(&grid, &x).unwrap();
        let acc_y = graph.accumulate(&grid, &y).unwrap();

        for i in 0..grid.size() {
            let expected = a * acc_x[i] + b * acc_y[i];
            prop_assert!(
                (acc_combo[i] - expected).abs() < 1e-6 * (1.0 + expected.abs()),
                "node {i}: accumulate(a*x+b*y) = {} but a*acc(x)+b*acc(y) = {expected}",
                acc_combo[i]
            );
        }
    }

    /// Invariant 4: accumulate(ones) at a base level equals the total area
    /// drained by that basin's resolved receiver tree -- summed over every
    /// base level, it must equal the grid's total area (spec property 4).
    #[test]
    fn total_drainage_area_at_base_levels_equals_grid_area(
        elevations in prop::collection::vec(-5.0f64..5.0, ROWS * COLS)
    ) {
        let grid = fixed_value_raster();
        let mut elevation = elevations;
        let mut graph = FlowGraphImpl::new(grid.size(), true);
        SingleFlowRouter.execute(&grid, &mut graph, &mut elevation).unwrap();
        MSTSinkResolver::new(RouteVariant::Basic, MstAlgorithm::Kruskal)
            .execute(&grid, &mut graph, &mut elevation)
            .unwrap();

        let drainage = graph.accumulate_uniform(&grid, 1.0).unwrap();
        let total_area: f64 = (0..grid.size()).map(|i| grid.area(i)).sum();
        let at_base_levels: f64 =
            (0..grid.size()).filter(|&i| grid.status(i).is_base_level()).map(|i| drainage[i]).sum();

        assert_relative_eq!(at_base_levels, total_area, epsilon = 1e-6, max_relative = 1e-9);
    }
}
