//! Sink resolvers: operators that give every interior node a path to a
//! base level, either by correcting elevation ([`pflood`]) or by rerouting
//! the receiver graph ([`mst`]).

pub mod mst;
pub mod pflood;

pub use mst::{MSTSinkResolver, MstAlgorithm, RouteVariant, CARVE_EPSILON};
pub use pflood::PFloodSinkResolver;
