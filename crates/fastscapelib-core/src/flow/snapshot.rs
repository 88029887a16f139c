//! `FlowSnapshot` operator (spec §4.3): a pass-through stage that files the
//! current graph and/or elevation away under a name for later retrieval.

use crate::error::Result;
use crate::flow::graph::FlowGraphImpl;
use crate::flow::operator::{FlowDirection, Operator, SnapshotRequest};
use crate::grid::Grid;

/// Captures the pipeline's state at this point in the chain without
/// touching it. `out_flowdir`/`in_flowdir` are both `Undefined` since a
/// snapshot never constrains what comes before or after it.
#[derive(Debug, Clone)]
pub struct FlowSnapshot {
    name: String,
    save_graph: bool,
    save_elevation: bool,
}

impl FlowSnapshot {
    pub fn new(name: impl Into<String>, save_graph: bool, save_elevation: bool) -> Self {
        Self { name: name.into(), save_graph, save_elevation }
    }
}

impl Operator for FlowSnapshot {
    fn name(&self) -> &'static str {
        "flow_snapshot"
    }
    fn graph_updated(&self) -> bool {
        false
    }
    fn elevation_updated(&self) -> bool {
        false
    }
    fn in_flowdir(&self) -> FlowDirection {
        FlowDirection::Undefined
    }
    fn out_flowdir(&self) -> FlowDirection {
        FlowDirection::Undefined
    }

    fn execute(&self, _grid: &dyn Grid, _graph: &mut FlowGraphImpl, _elevation: &mut [f64]) -> Result<()> {
        Ok(())
    }

    fn snapshot_request(&self) -> Option<SnapshotRequest> {
        Some(SnapshotRequest {
            name: self.name.clone(),
            save_graph: self.save_graph,
            save_elevation: self.save_elevation,
        })
    }
}
