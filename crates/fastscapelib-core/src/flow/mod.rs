//! Flow graph, operator pipeline, routers, sink resolvers, and snapshots
//! (spec §4.2-4.3).

pub mod graph;
pub mod operator;
pub mod pipeline;
pub mod router;
pub mod sink;
pub mod snapshot;

pub use graph::{FlowGraphImpl, Receiver};
pub use operator::{FlowDirection, Operator, SnapshotRequest};
pub use pipeline::{FlowOperatorPipeline, SnapshotEntry};
pub use snapshot::FlowSnapshot;
