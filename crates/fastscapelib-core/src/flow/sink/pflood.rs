//! Priority-flood sink resolver (spec §4.4): corrects elevation in place so
//! every interior node has a downslope (or flat) path to a base level,
//! without touching the receiver graph.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::Result;
use crate::flow::graph::FlowGraphImpl;
use crate::flow::operator::{FlowDirection, Operator};
use crate::grid::Grid;

/// Min-heap entry ordered by elevation only, breaking ties by node index for
/// determinism — the same shape as `petgraph`'s `MinScored` used for its MST
/// priority queues, specialized to `f64` via `partial_cmp`.
struct MinScored(f64, usize);

impl PartialEq for MinScored {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 && self.1 == other.1
    }
}
impl Eq for MinScored {}
impl PartialOrd for MinScored {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for MinScored {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the lowest elevation pops first.
        other
            .0
            .partial_cmp(&self.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.1.cmp(&self.1))
    }
}

/// Priority-flood (Barnes, Lehman & Mulla 2014): grow a flood front from
/// every base-level node outward via a min-heap keyed on elevation, raising
/// each newly-visited node to at least its flooding neighbor's level.
/// Produces a depression-free elevation field in `O(N log N)`.
#[derive(Debug, Default)]
pub struct PFloodSinkResolver;

impl Operator for PFloodSinkResolver {
    fn name(&self) -> &'static str {
        "pflood_sink_resolver"
    }
    fn graph_updated(&self) -> bool {
        false
    }
    fn elevation_updated(&self) -> bool {
        true
    }
    fn in_flowdir(&self) -> FlowDirection {
        FlowDirection::Undefined
    }
    fn out_flowdir(&self) -> FlowDirection {
        FlowDirection::Undefined
    }

    fn execute(&self, grid: &dyn Grid, _graph: &mut FlowGraphImpl, elevation: &mut [f64]) -> Result<()> {
        let n = grid.size();
        let mut visited = vec![false; n];
        let mut heap = BinaryHeap::new();

        for i in 0..n {
            if grid.status(i).is_base_level() {
                visited[i] = true;
                heap.push(MinScored(elevation[i], i));
            }
        }

        while let Some(MinScored(level, i)) = heap.pop() {
            for nb in grid.neighbors(i) {
                if visited[nb.index] {
                    continue;
                }
                visited[nb.index] = true;
                if elevation[nb.index] < level {
                    elevation[nb.index] = level;
                }
                heap.push(MinScored(elevation[nb.index], nb.index));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::raster::{Borders, Connectivity, RasterGrid};

    #[test]
    fn fills_isolated_pit_to_its_spill_level() {
        let grid = RasterGrid::new(5, 5, 1.0, 1.0, Borders::fixed_value(), &[], Connectivity::Eight).unwrap();
        let mut elevation = vec![1.0; 25];
        elevation[12] = -10.0; // a pit at dead center
        let mut graph = FlowGraphImpl::new(25, true);
        PFloodSinkResolver.execute(&grid, &mut graph, &mut elevation).unwrap();
        assert!(elevation[12] >= 1.0 - 1e-9);
    }

    #[test]
    fn never_lowers_elevation() {
        let grid = RasterGrid::new(4, 4, 1.0, 1.0, Borders::fixed_value(), &[], Connectivity::Eight).unwrap();
        let original = vec![3.0, 2.0, 2.5, 1.0, 2.0, -5.0, 1.0, 0.5, 2.0, 1.0, 2.0, 0.5, 1.0, 0.5, 0.5, 0.0];
        let mut elevation = original.clone();
        let mut graph = FlowGraphImpl::new(16, true);
        PFloodSinkResolver.execute(&grid, &mut graph, &mut elevation).unwrap();
        for (before, after) in original.iter().zip(&elevation) {
            assert!(after >= before - 1e-9);
        }
    }
}
