//! The `Operator` trait and flow-direction capability flags (spec §4.3).

use crate::error::Result;
use crate::flow::graph::FlowGraphImpl;
use crate::grid::Grid;

/// The flavor of receiver graph an operator expects on input, or leaves
/// behind on output. `Undefined` is a wildcard: it is compatible with any
/// neighbor in a pipeline (used by operators that don't touch routing at
/// all, like [`crate::flow::snapshot::FlowSnapshot`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowDirection {
    Undefined,
    Single,
    Multi,
}

impl FlowDirection {
    /// Whether a pipeline may place an operator declaring `self` as
    /// `in_flowdir` right after one declaring `upstream` as `out_flowdir`
    /// (spec §4.3: "either equal or B accepts UNDEFINED"). The wildcard
    /// runs both ways: a consumer declaring `Undefined` takes anything, and
    /// a pass-through producer declaring `Undefined` (e.g.
    /// [`crate::flow::snapshot::FlowSnapshot`], which never touches routing)
    /// does not erase whatever concrete direction was already established
    /// upstream of it, so a concrete consumer may still follow it.
    fn compatible_with(self, upstream: FlowDirection) -> bool {
        self == FlowDirection::Undefined
            || upstream == FlowDirection::Undefined
            || self == upstream
    }
}

/// A request made by an operator's [`Operator::snapshot_request`] after it
/// runs: save the current graph and/or elevation array under `name` in the
/// pipeline's snapshot store.
#[derive(Debug, Clone)]
pub struct SnapshotRequest {
    pub name: String,
    pub save_graph: bool,
    pub save_elevation: bool,
}

/// One stage of a [`crate::flow::pipeline::FlowOperatorPipeline`].
///
/// Capability flags are plain associated functions rather than fields so a
/// pipeline can validate a chain of `&dyn Operator` trait objects without
/// constructing them — the same object-safety tradeoff `Grid` makes.
pub trait Operator: std::fmt::Debug {
    fn name(&self) -> &'static str;

    /// Whether `execute` may add, remove, or re-route receiver edges.
    fn graph_updated(&self) -> bool;

    /// Whether `execute` may mutate the elevation array in place (sink
    /// resolvers correct pits; routers and snapshots never do).
    fn elevation_updated(&self) -> bool;

    /// The receiver-graph flavor this operator expects already populated.
    fn in_flowdir(&self) -> FlowDirection;

    /// The receiver-graph flavor this operator leaves behind.
    fn out_flowdir(&self) -> FlowDirection;

    /// Run this stage, mutating `graph` and/or `elevation` in place per the
    /// flags above.
    fn execute(&self, grid: &dyn Grid, graph: &mut FlowGraphImpl, elevation: &mut [f64]) -> Result<()>;

    /// After `execute` runs, an operator that wants its result captured into
    /// the pipeline's named snapshot store returns `Some` here. Only
    /// [`crate::flow::snapshot::FlowSnapshot`] overrides this.
    fn snapshot_request(&self) -> Option<SnapshotRequest> {
        None
    }
}

/// Validate that `out_flowdir` of each operator is compatible with
/// `in_flowdir` of the next (spec §4.3, pipeline construction rule). Called
/// by [`crate::flow::pipeline::FlowOperatorPipeline::new`].
pub(crate) fn validate_chain(ops: &[Box<dyn Operator>]) -> Result<()> {
    for window in ops.windows(2) {
        let (upstream, downstream) = (&window[0], &window[1]);
        if !downstream.in_flowdir().compatible_with(upstream.out_flowdir()) {
            return Err(crate::error::Error::InvalidArgument(format!(
                "operator '{}' requires {:?} input but '{}' produces {:?}",
                downstream.name(),
                downstream.in_flowdir(),
                upstream.name(),
                upstream.out_flowdir(),
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_is_compatible_with_anything() {
        assert!(FlowDirection::Undefined.compatible_with(FlowDirection::Single));
        assert!(FlowDirection::Multi.compatible_with(FlowDirection::Undefined));
    }

    #[test]
    fn mismatched_concrete_directions_are_incompatible() {
        assert!(!FlowDirection::Single.compatible_with(FlowDirection::Multi));
    }
}
