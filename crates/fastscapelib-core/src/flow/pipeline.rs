//! `FlowOperatorPipeline` (spec §4.3): construction-time validation and the
//! `update_routes` driver loop.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::flow::graph::FlowGraphImpl;
use crate::flow::operator::{validate_chain, FlowDirection, Operator};
use crate::grid::Grid;

/// One named entry of the snapshot store, populated by
/// [`crate::flow::snapshot::FlowSnapshot`].
#[derive(Clone, Default)]
pub struct SnapshotEntry {
    pub graph: Option<FlowGraphImpl>,
    pub elevation: Option<Vec<f64>>,
}

/// An ordered sequence of [`Operator`]s, run in turn against one shared
/// [`FlowGraphImpl`] and elevation array.
pub struct FlowOperatorPipeline {
    operators: Vec<Box<dyn Operator>>,
    graph: Option<FlowGraphImpl>,
    /// Owned working copy of the caller's elevation (spec §4.3 step 1):
    /// operators mutate this, never the caller's own array.
    elevation: Vec<f64>,
    snapshots: HashMap<String, SnapshotEntry>,
}

impl FlowOperatorPipeline {
    /// Construct a pipeline, validating (spec §4.3):
    /// - the sequence is non-empty;
    /// - at least one operator updates the graph;
    /// - at least one operator produces a concrete (non-`Undefined`) flow
    ///   direction;
    /// - the first operator doesn't require a receiver graph nothing has
    ///   produced yet (`in_flowdir` must be `Undefined`);
    /// - each operator's `in_flowdir` is compatible with the previous
    ///   operator's `out_flowdir`.
    pub fn new(operators: Vec<Box<dyn Operator>>) -> Result<Self> {
        if operators.is_empty() {
            return Err(Error::InvalidArgument(
                "pipeline requires at least one operator".into(),
            ));
        }
        if !operators.iter().any(|op| op.graph_updated()) {
            return Err(Error::InvalidArgument(
                "pipeline requires at least one operator with graph_updated = true".into(),
            ));
        }
        if !operators.iter().any(|op| op.out_flowdir() != FlowDirection::Undefined) {
            return Err(Error::InvalidArgument(
                "pipeline requires at least one operator with a concrete out_flowdir".into(),
            ));
        }
        if operators[0].in_flowdir() != FlowDirection::Undefined {
            return Err(Error::InvalidArgument(format!(
                "first operator '{}' declares {:?} input, but no upstream operator exists to produce one",
                operators[0].name(),
                operators[0].in_flowdir(),
            )));
        }
        validate_chain(&operators)?;

        Ok(Self { operators, graph: None, elevation: Vec::new(), snapshots: HashMap::new() })
    }

    pub fn operators(&self) -> &[Box<dyn Operator>] {
        &self.operators
    }

    pub fn snapshot(&self, name: &str) -> Option<&SnapshotEntry> {
        self.snapshots.get(name)
    }

    /// The flavor of receiver graph the last routing-capable operator in the
    /// chain produces, used to size a fresh [`FlowGraphImpl`]. Defaults to
    /// `Single` when no operator declares a concrete `out_flowdir` (an
    /// all-`Undefined` chain, e.g. diagnostics-only).
    fn resolved_single_flow(&self) -> bool {
        self.operators
            .iter()
            .rev()
            .map(|op| op.out_flowdir())
            .find(|d| *d != FlowDirection::Undefined)
            .map(|d| d == FlowDirection::Single)
            .unwrap_or(true)
    }

    /// Run every operator once, in order, against `grid` and `elevation`
    /// (spec §4.3 steps 1-3):
    /// 1. copy `elevation` into this pipeline's owned working buffer — an
    ///    operator that corrects elevation (e.g. a CARVE `MSTSinkResolver`)
    ///    mutates that copy, never the caller's array;
    /// 2. run each operator's `execute`, threading the same graph/working
    ///    elevation through the whole chain;
    /// 3. after an operator runs, capture any snapshot it requests.
    ///
    /// Returns the resulting graph and the final working elevation — the
    /// caller's own `elevation` slice is left untouched. A pipeline owns one
    /// [`FlowGraphImpl`] across calls, rebuilt only when `grid.size()`
    /// changes.
    pub fn update_routes(
        &mut self,
        grid: &dyn Grid,
        elevation: &[f64],
    ) -> Result<(&FlowGraphImpl, &[f64])> {
        let n = grid.size();
        let needs_rebuild = !matches!(&self.graph, Some(g) if g.size() == n);
        if needs_rebuild {
            self.graph = Some(FlowGraphImpl::new(n, self.resolved_single_flow()));
        }

        self.elevation.clear();
        self.elevation.extend_from_slice(elevation);

        let graph = self.graph.as_mut().expect("just initialized above");
        graph.reset();

        for op in &self.operators {
            op.execute(grid, graph, &mut self.elevation)?;
            if let Some(req) = op.snapshot_request() {
                let entry = SnapshotEntry {
                    graph: req.save_graph.then(|| graph.clone()),
                    elevation: req.save_elevation.then(|| self.elevation.clone()),
                };
                self.snapshots.insert(req.name, entry);
            }
        }

        Ok((self.graph.as_ref().expect("just initialized above"), &self.elevation))
    }
}
