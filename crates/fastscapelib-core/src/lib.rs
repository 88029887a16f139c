//! Landscape evolution core: a grid abstraction, a flow-routing graph built
//! by a pipeline of composable operators, basin-graph sink resolution, and
//! two eroders (stream-power and linear diffusion).

pub mod erode;
pub mod error;
pub mod flow;
pub mod grid;

pub use error::{Error, Result};
