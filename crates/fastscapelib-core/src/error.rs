//! Error taxonomy for the landscape evolution core (spec §7).
//!
//! `NumericalNonconvergence` is deliberately absent here: the spec treats it
//! as a non-fatal warning, logged and then ignored by the caller, so it
//! never needs to travel through a `Result`. See [`crate::erode::spl`].

use thiserror::Error;

/// Errors surfaced by grid construction, pipeline construction, and
/// `update_routes`/`erode` calls.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Bad constructor arguments: shape mismatches, inconsistent `LOOPED`
    /// pairing, an empty operator sequence, incompatible adjacent operator
    /// flow-direction types.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A structural invariant the core depends on does not hold: the basin
    /// graph has no outlet, or a topological order was requested before
    /// receivers were populated.
    #[error("invariant violated: {0}")]
    InvariantViolated(String),

    /// A neighbor or node index fell outside `[0, len)`. This indicates an
    /// internal bug rather than bad caller input.
    #[error("node index {index} out of range [0, {len})")]
    OutOfRange { index: usize, len: usize },
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
