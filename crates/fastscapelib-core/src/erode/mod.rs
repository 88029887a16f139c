//! Eroders: operate on an already-routed [`crate::flow::FlowGraphImpl`] and
//! elevation array to produce one timestep of landscape change (spec
//! §4.5). Unlike [`crate::flow::operator::Operator`], eroders take an
//! explicit timestep and are driven directly by the caller rather than
//! through the flow pipeline.

pub mod diffusion;
pub mod spl;

pub use diffusion::DiffusionAdiEroder;
pub use spl::{KCoef, SplEroder, SplOutcome};
