//! Stream-power-law eroder (spec §4.5): implicit, per-node Newton solve
//! against each node's already-updated receiver, run outward from base
//! level along the receiver tree's topological order — the standard
//! Braun & Willett (2013) scheme.

use crate::error::{Error, Result};
use crate::flow::graph::FlowGraphImpl;
use crate::grid::Grid;

/// Newton's method gives up after this many iterations per node and the
/// node's best estimate is kept, logged via [`log::warn!`].
const MAX_NEWTON_ITERS: usize = 20;

/// Erodibility coefficient `K`, either uniform or spatially variable.
#[derive(Debug, Clone)]
pub enum KCoef {
    Scalar(f64),
    PerNode(Vec<f64>),
}

impl KCoef {
    fn at(&self, i: usize) -> f64 {
        match self {
            KCoef::Scalar(k) => *k,
            KCoef::PerNode(values) => values[i],
        }
    }
}

/// `dz/dt = -K·A^m·S^n`, solved implicitly per node in topological order.
#[derive(Debug, Clone)]
pub struct SplEroder {
    k_coef: KCoef,
    area_exp: f64,
    slope_exp: f64,
    tolerance: f64,
}

/// Per-node erosion amount (`z_before - z_after`) plus a count of nodes
/// whose Newton solve didn't converge within [`MAX_NEWTON_ITERS`]. Derefs to
/// the erosion slice so callers that don't care about convergence can use
/// it as `&[f64]` directly.
#[derive(Debug, Clone)]
pub struct SplOutcome {
    erosion: Vec<f64>,
    pub nonconverged: usize,
}

impl std::ops::Deref for SplOutcome {
    type Target = [f64];
    fn deref(&self) -> &[f64] {
        &self.erosion
    }
}

impl SplEroder {
    pub fn new(k_coef: KCoef, area_exp: f64, slope_exp: f64, tolerance: f64) -> Result<Self> {
        if area_exp < 0.0 {
            return Err(Error::InvalidArgument(format!(
                "SPL area exponent must be non-negative, got {area_exp}"
            )));
        }
        if slope_exp <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "SPL slope exponent must be positive, got {slope_exp}"
            )));
        }
        if tolerance <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "SPL Newton tolerance must be positive, got {tolerance}"
            )));
        }
        Ok(Self { k_coef, area_exp, slope_exp, tolerance })
    }

    /// Erode `elevation` in place by one step of size `dt`, given the
    /// drainage area per node (from [`FlowGraphImpl::accumulate`]). Works
    /// against either a single-flow or a multi-flow graph, as long as it
    /// carries a valid topological order; with multiple receivers the
    /// implicit equation is summed over `i`'s receivers weighted by
    /// `w(i -> j)` (spec §4.5 "multi-flow variant").
    pub fn erode(
        &self,
        graph: &FlowGraphImpl,
        _grid: &dyn Grid,
        elevation: &mut [f64],
        drainage_area: &[f64],
        dt: f64,
    ) -> Result<SplOutcome> {
        let order = graph.order()?;

        let mut erosion = vec![0.0; elevation.len()];
        let mut nonconverged = 0usize;

        for &i in order {
            if graph.rcount(i) == 0 {
                continue; // base level or unresolved pit: nothing to erode against
            }
            let k = self.k_coef.at(i);
            let area = drainage_area[i];
            if k <= 0.0 || area <= 0.0 {
                continue;
            }

            let z_old = elevation[i];
            let receivers = graph.receivers(i);

            let z_new = if receivers.len() == 1 {
                let receiver = receivers[0];
                let z_receiver = elevation[receiver.node]; // finalized: receiver precedes i in order
                let coeff = dt * k * area.powf(self.area_exp) / receiver.distance;

                if (self.slope_exp - 1.0).abs() < 1e-12 {
                    // n = 1: f(z) = z - z_old + coeff*(z - z_r) is linear, solve directly.
                    (z_old + coeff * z_receiver) / (1.0 + coeff)
                } else {
                    self.newton_solve_single(
                        z_old,
                        z_receiver,
                        k,
                        area,
                        receiver.distance,
                        dt,
                        &mut nonconverged,
                        i,
                    )
                }
            } else {
                self.solve_multi_receiver(z_old, k, area, dt, receivers, elevation, &mut nonconverged, i)
            };

            erosion[i] = z_old - z_new;
            elevation[i] = z_new;
        }

        Ok(SplOutcome { erosion, nonconverged })
    }

    /// Multi-receiver Newton solve: `f(z) = z - z_old + dt*K*A^m * Σ_j w_j *
    /// ((z - z_j)/d_j)^n = 0`, same per-node equation as the single-receiver
    /// case but summed across every downstream partition.
    #[allow(clippy::too_many_arguments)]
    fn solve_multi_receiver(
        &self,
        z_old: f64,
        k: f64,
        area: f64,
        dt: f64,
        receivers: &[crate::flow::graph::Receiver],
        elevation: &[f64],
        nonconverged: &mut usize,
        node: usize,
    ) -> f64 {
        let k_area_m = k * area.powf(self.area_exp);
        let max_z_receiver =
            receivers.iter().map(|r| elevation[r.node]).fold(f64::NEG_INFINITY, f64::max);
        let mut z = z_old.max(max_z_receiver);

        for _ in 0..MAX_NEWTON_ITERS {
            let mut f = z - z_old;
            let mut dfdz = 1.0;
            for r in receivers {
                let slope = ((z - elevation[r.node]) / r.distance).max(0.0);
                f += dt * k_area_m * r.weight * slope.powf(self.slope_exp);
                dfdz += dt * k_area_m * r.weight * self.slope_exp
                    * slope.powf(self.slope_exp - 1.0)
                    / r.distance;
            }
            if dfdz.abs() < 1e-300 {
                break;
            }
            let step = f / dfdz;
            z -= step;
            if step.abs() < self.tolerance {
                return z;
            }
        }

        *nonconverged += 1;
        log::warn!(
            "SPL eroder: node {node} did not converge after {MAX_NEWTON_ITERS} Newton iterations"
        );
        z
    }

    #[allow(clippy::too_many_arguments)]
    fn newton_solve_single(
        &self,
        z_old: f64,
        z_receiver: f64,
        k: f64,
        area: f64,
        distance: f64,
        dt: f64,
        nonconverged: &mut usize,
        node: usize,
    ) -> f64 {
        let k_area_m = k * area.powf(self.area_exp);
        let mut z = z_old.max(z_receiver);

        for _ in 0..MAX_NEWTON_ITERS {
            let slope = ((z - z_receiver) / distance).max(0.0);
            let f = z - z_old + dt * k_area_m * slope.powf(self.slope_exp);
            let dfdz = 1.0
                + dt * k_area_m * self.slope_exp * slope.powf(self.slope_exp - 1.0) / distance;
            if dfdz.abs() < 1e-300 {
                break;
            }
            let step = f / dfdz;
            z -= step;
            if step.abs() < self.tolerance {
                return z;
            }
        }

        *nonconverged += 1;
        log::warn!(
            "SPL eroder: node {node} did not converge after {MAX_NEWTON_ITERS} Newton iterations"
        );
        z
    }
}
