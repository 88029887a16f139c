use serde::{Deserialize, Serialize};

/// Per-node boundary tag (spec §3).
///
/// Status is immutable after grid construction — there is no setter on any
/// `Grid` implementation, only constructor arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeStatus {
    /// Ordinary interior node, free to receive and donate flow.
    Core,
    /// Dirichlet base level: a sink for accumulation, never a donor target
    /// for a receiver edge from outside itself.
    FixedValue,
    /// Neumann boundary: zero-flux for diffusion, ordinary for flow routing.
    FixedGradient,
    /// Paired with an opposite-border `Looped` node for periodic topology.
    Looped,
    /// Exists in storage but is skipped during flow construction and has no
    /// neighbors returned.
    Ghost,
}

impl NodeStatus {
    /// A base-level node acts as a sink for accumulation and has `rcount = 0`.
    #[inline]
    pub fn is_base_level(self) -> bool {
        matches!(self, NodeStatus::FixedValue)
    }

    #[inline]
    pub fn is_ghost(self) -> bool {
        matches!(self, NodeStatus::Ghost)
    }

    #[inline]
    pub fn is_looped(self) -> bool {
        matches!(self, NodeStatus::Looped)
    }
}
