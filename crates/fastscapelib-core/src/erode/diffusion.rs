//! Alternating-direction-implicit linear diffusion eroder (spec §4.5),
//! raster-only: each half-step solves a tridiagonal system per row or
//! column via the Thomas algorithm.

use crate::error::{Error, Result};
use crate::grid::raster::RasterGrid;

/// `∂z/∂t = κ·∇²z`, advanced by `dt` via Peaceman-Rachford ADI splitting:
/// an implicit half-step along columns (x), explicit along rows (y), then
/// an implicit half-step along rows (y), explicit along columns (x) using
/// the already-updated field. Each implicit half-step is one tridiagonal
/// solve per line via the Thomas algorithm. `FixedValue` nodes are pinned
/// (an identity row); `Core`/`FixedGradient` edges get the natural
/// zero-flux Neumann closure (the missing neighbor term is dropped rather
/// than mirrored, which is the standard finite-volume no-flux boundary);
/// `LOOPED` axes turn the corresponding half-step's tridiagonal system into
/// a cyclic one, solved via the Sherman-Morrison reduction to two plain
/// Thomas solves (spec §4.5 `LOOPED` ⇒ periodic wraparound).
#[derive(Debug, Clone, Copy)]
pub struct DiffusionAdiEroder {
    kappa: f64,
}

impl DiffusionAdiEroder {
    pub fn new(kappa: f64) -> Result<Self> {
        if kappa <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "diffusivity must be positive, got {kappa}"
            )));
        }
        Ok(Self { kappa })
    }

    /// Erode `elevation` in place by one ADI step of size `dt`, returning
    /// the per-node erosion (`h_before - h_after`, §4.5/§6 — may be negative
    /// where diffusion deposits material rather than removing it).
    pub fn erode(&self, grid: &RasterGrid, elevation: &mut [f64], dt: f64) -> Result<Vec<f64>> {
        let (rows, cols) = (grid.rows(), grid.cols());
        let (spacing_y, spacing_x) = grid.spacing();
        let (periodic_rows, periodic_cols) = grid.periodic();
        let half_dt = dt / 2.0;
        let alpha_x = self.kappa * half_dt / (spacing_x * spacing_x);
        let alpha_y = self.kappa * half_dt / (spacing_y * spacing_y);

        let z0 = elevation.to_vec();
        let z_half = sweep_x(grid, &z0, rows, cols, alpha_x, alpha_y, periodic_cols);
        let z1 = sweep_y(grid, &z_half, rows, cols, alpha_x, alpha_y, periodic_rows);

        let erosion: Vec<f64> = z0.iter().zip(&z1).map(|(before, after)| before - after).collect();
        elevation.copy_from_slice(&z1);
        Ok(erosion)
    }
}

/// Implicit half-step along columns (x), explicit along rows (y).
/// `periodic_cols` selects the cyclic tridiagonal solve for each row's line.
fn sweep_x(
    grid: &RasterGrid,
    z: &[f64],
    rows: usize,
    cols: usize,
    alpha_x: f64,
    alpha_y: f64,
    periodic_cols: bool,
) -> Vec<f64> {
    let mut out = vec![0.0; rows * cols];
    for r in 0..rows {
        let solved = solve_line(
            cols,
            alpha_x,
            periodic_cols,
            |c| grid.status(r * cols + c).is_base_level(),
            |c| z[r * cols + c],
            |c| {
                let idx = r * cols + c;
                let north = grid.step(r, c, -1, 0);
                let south = grid.step(r, c, 1, 0);
                alpha_y
                    * ((north.map(|j| z[j]).unwrap_or(z[idx]) - z[idx])
                        + (south.map(|j| z[j]).unwrap_or(z[idx]) - z[idx]))
            },
        );
        out[r * cols..(r + 1) * cols].copy_from_slice(&solved);
    }
    out
}

/// Implicit half-step along rows (y), explicit along columns (x).
/// `periodic_rows` selects the cyclic tridiagonal solve for each column's
/// line.
fn sweep_y(
    grid: &RasterGrid,
    z: &[f64],
    rows: usize,
    cols: usize,
    alpha_x: f64,
    alpha_y: f64,
    periodic_rows: bool,
) -> Vec<f64> {
    let mut out = vec![0.0; rows * cols];
    for c in 0..cols {
        let solved = solve_line(
            rows,
            alpha_y,
            periodic_rows,
            |r| grid.status(r * cols + c).is_base_level(),
            |r| z[r * cols + c],
            |r| {
                let idx = r * cols + c;
                let west = grid.step(r, c, 0, -1);
                let east = grid.step(r, c, 0, 1);
                alpha_x
                    * ((west.map(|j| z[j]).unwrap_or(z[idx]) - z[idx])
                        + (east.map(|j| z[j]).unwrap_or(z[idx]) - z[idx]))
            },
        );
        for (r, value) in solved.into_iter().enumerate() {
            out[r * cols + c] = value;
        }
    }
    out
}

/// Build and solve one ADI half-step's line of length `n` along the implicit
/// direction: `base_level(k)` pins that position to its current value
/// (Dirichlet); `explicit_term(k)` folds in the already-known perpendicular
/// contribution; `z(k)` is the line's current value. When `periodic` is set,
/// position `0`'s "previous" neighbor and position `n-1`'s "next" neighbor
/// wrap around to each other, turning the tridiagonal system cyclic.
fn solve_line(
    n: usize,
    alpha: f64,
    periodic: bool,
    base_level: impl Fn(usize) -> bool,
    z: impl Fn(usize) -> f64,
    explicit_term: impl Fn(usize) -> f64,
) -> Vec<f64> {
    let mut lower = vec![0.0; n];
    let mut diag = vec![0.0; n];
    let mut upper = vec![0.0; n];
    let mut rhs = vec![0.0; n];

    for k in 0..n {
        if base_level(k) {
            diag[k] = 1.0;
            rhs[k] = z(k);
            continue;
        }
        rhs[k] = z(k) + explicit_term(k);

        let has_prev = periodic || k > 0;
        let has_next = periodic || k + 1 < n;
        diag[k] = 1.0 + alpha * (has_prev as u8 as f64 + has_next as u8 as f64);
        if k > 0 {
            lower[k] = -alpha;
        }
        if k + 1 < n {
            upper[k] = -alpha;
        }
    }

    if !periodic || n < 3 {
        if periodic && n == 2 {
            // A 2-node periodic line has both neighbor slots of each node
            // wrapping onto the single other node, doubling its coupling;
            // solve the resulting 2x2 system directly.
            return solve_periodic_pair(alpha, &base_level, &rhs);
        }
        return thomas_solve(&lower, &diag, &upper, &rhs);
    }

    // Corner coefficients of the cyclic system: position 0's coupling to
    // n-1, and position n-1's coupling to 0. Zero only when the *owning*
    // row is itself pinned (its equation is then a bare identity with no
    // off-diagonal terms at all).
    let corner_top_right = if base_level(0) { 0.0 } else { -alpha };
    let corner_bottom_left = if base_level(n - 1) { 0.0 } else { -alpha };
    thomas_solve_cyclic(&lower, &diag, &upper, &rhs, corner_top_right, corner_bottom_left)
}

/// Direct solve of the degenerate 2-node periodic line (see [`solve_line`]).
fn solve_periodic_pair(alpha: f64, base_level: &impl Fn(usize) -> bool, rhs: &[f64]) -> Vec<f64> {
    let (d0, off0) = if base_level(0) { (1.0, 0.0) } else { (1.0 + 2.0 * alpha, -2.0 * alpha) };
    let (d1, off1) = if base_level(1) { (1.0, 0.0) } else { (1.0 + 2.0 * alpha, -2.0 * alpha) };
    // [ d0   off0 ] [x0]   [rhs0]
    // [ off1  d1  ] [x1] = [rhs1]
    let det = d0 * d1 - off0 * off1;
    let x0 = (rhs[0] * d1 - off0 * rhs[1]) / det;
    let x1 = (d0 * rhs[1] - off1 * rhs[0]) / det;
    vec![x0, x1]
}

/// Solve a tridiagonal system `lower·x[i-1] + diag·x[i] + upper·x[i+1] =
/// rhs[i]` in `O(n)` (Thomas algorithm). `lower[0]` and `upper[n-1]` are
/// unused.
fn thomas_solve(lower: &[f64], diag: &[f64], upper: &[f64], rhs: &[f64]) -> Vec<f64> {
    let n = diag.len();
    let mut c_prime = vec![0.0; n];
    let mut d_prime = vec![0.0; n];

    c_prime[0] = upper[0] / diag[0];
    d_prime[0] = rhs[0] / diag[0];
    for i in 1..n {
        let m = diag[i] - lower[i] * c_prime[i - 1];
        c_prime[i] = upper[i] / m;
        d_prime[i] = (rhs[i] - lower[i] * d_prime[i - 1]) / m;
    }

    let mut x = vec![0.0; n];
    x[n - 1] = d_prime[n - 1];
    for i in (0..n - 1).rev() {
        x[i] = d_prime[i] - c_prime[i] * x[i + 1];
    }
    x
}

/// Solve a cyclic tridiagonal system (plain tridiagonal plus corner entries
/// `A[0][n-1] = corner_top_right` and `A[n-1][0] = corner_bottom_left`) via
/// the Sherman-Morrison reduction to two plain Thomas solves (Press et al.,
/// *Numerical Recipes*, "cyclic" tridiagonal algorithm). Requires `n > 2`.
fn thomas_solve_cyclic(
    lower: &[f64],
    diag: &[f64],
    upper: &[f64],
    rhs: &[f64],
    corner_top_right: f64,
    corner_bottom_left: f64,
) -> Vec<f64> {
    let n = diag.len();
    let gamma = -diag[0];

    let mut diag_mod = diag.to_vec();
    diag_mod[0] -= gamma;
    diag_mod[n - 1] -= corner_top_right * corner_bottom_left / gamma;

    let x = thomas_solve(lower, &diag_mod, upper, rhs);

    let mut u = vec![0.0; n];
    u[0] = gamma;
    u[n - 1] = corner_top_right;
    let zv = thomas_solve(lower, &diag_mod, upper, &u);

    let fact = (x[0] + corner_bottom_left * x[n - 1] / gamma)
        / (1.0 + zv[0] + corner_bottom_left * zv[n - 1] / gamma);

    x.iter().zip(&zv).map(|(xi, zi)| xi - fact * zi).collect()
}
