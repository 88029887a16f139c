//! Uniform 2-D raster grid (spec §4.1), queen (8-connected) by default with
//! an opt-in 4-connected rook stencil, and optional periodic (`LOOPED`)
//! borders along either axis.

use super::status::NodeStatus;
use super::{Grid, Neighbor, Shape};
use crate::error::{Error, Result};

/// Neighbor connectivity stencil.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    /// N/S/E/W only.
    Four,
    /// N/S/E/W plus the four diagonals (default per spec §4.1).
    Eight,
}

/// Per-border status, one tag per side of the raster.
#[derive(Debug, Clone, Copy)]
pub struct Borders {
    pub top: NodeStatus,
    pub bottom: NodeStatus,
    pub left: NodeStatus,
    pub right: NodeStatus,
}

impl Borders {
    pub fn fixed_value() -> Self {
        Self {
            top: NodeStatus::FixedValue,
            bottom: NodeStatus::FixedValue,
            left: NodeStatus::FixedValue,
            right: NodeStatus::FixedValue,
        }
    }
}

/// 8-connected offsets `(dr, dc)` in compass order starting at North.
/// Indices 0..8 map N, NE, E, SE, S, SW, W, NW.
pub(crate) const D8_OFFSETS: [(isize, isize); 8] = [
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
];

/// 4-connected (rook) offsets, indices into `D8_OFFSETS` (N, E, S, W).
const ROOK_OFFSETS: [usize; 4] = [0, 2, 4, 6];

pub struct RasterGrid {
    rows: usize,
    cols: usize,
    spacing_y: f64,
    spacing_x: f64,
    connectivity: Connectivity,
    statuses: Vec<NodeStatus>,
    /// Which axes are periodic: (rows-axis i.e. top/bottom, cols-axis i.e. left/right)
    periodic: (bool, bool),
}

impl RasterGrid {
    /// Build a raster from explicit per-axis spacing.
    ///
    /// `overrides` lets the caller mark individual nodes `(row, col,
    /// status)` that deviate from their border's default — applied after
    /// the border fill.
    pub fn new(
        rows: usize,
        cols: usize,
        spacing_y: f64,
        spacing_x: f64,
        borders: Borders,
        overrides: &[(usize, usize, NodeStatus)],
        connectivity: Connectivity,
    ) -> Result<Self> {
        if rows < 2 || cols < 2 {
            return Err(Error::InvalidArgument(
                "raster grid requires at least 2 rows and 2 cols".into(),
            ));
        }

        let top_bottom_looped = (borders.top.is_looped(), borders.bottom.is_looped());
        if top_bottom_looped.0 != top_bottom_looped.1 {
            return Err(Error::InvalidArgument(
                "LOOPED top border must be paired with a LOOPED bottom border".into(),
            ));
        }
        let left_right_looped = (borders.left.is_looped(), borders.right.is_looped());
        if left_right_looped.0 != left_right_looped.1 {
            return Err(Error::InvalidArgument(
                "LOOPED left border must be paired with a LOOPED right border".into(),
            ));
        }

        let n = rows * cols;
        let mut statuses = vec![NodeStatus::Core; n];
        for c in 0..cols {
            statuses[c] = borders.top;
            statuses[(rows - 1) * cols + c] = borders.bottom;
        }
        for r in 0..rows {
            // Corners resolved by column pass last so left/right wins over
            // top/bottom at the four corners, matching the order borders are
            // listed in `Borders`.
            statuses[r * cols] = borders.left;
            statuses[r * cols + cols - 1] = borders.right;
        }

        for &(r, c, status) in overrides {
            if r >= rows || c >= cols {
                return Err(Error::InvalidArgument(format!(
                    "status override ({r}, {c}) out of bounds for {rows}x{cols} raster"
                )));
            }
            statuses[r * cols + c] = status;
        }

        Ok(Self {
            rows,
            cols,
            spacing_y,
            spacing_x,
            connectivity,
            statuses,
            periodic: (top_bottom_looped.0, left_right_looped.0),
        })
    }

    /// Build a raster from total physical length along each axis instead of
    /// per-cell spacing.
    #[allow(clippy::too_many_arguments)]
    pub fn from_length(
        rows: usize,
        cols: usize,
        length_y: f64,
        length_x: f64,
        borders: Borders,
        overrides: &[(usize, usize, NodeStatus)],
        connectivity: Connectivity,
    ) -> Result<Self> {
        if rows < 2 || cols < 2 {
            return Err(Error::InvalidArgument(
                "raster grid requires at least 2 rows and 2 cols".into(),
            ));
        }
        let spacing_y = length_y / (rows - 1) as f64;
        let spacing_x = length_x / (cols - 1) as f64;
        Self::new(rows, cols, spacing_y, spacing_x, borders, overrides, connectivity)
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn spacing(&self) -> (f64, f64) {
        (self.spacing_y, self.spacing_x)
    }

    fn offsets(&self) -> &'static [usize] {
        match self.connectivity {
            Connectivity::Four => &ROOK_OFFSETS,
            Connectivity::Eight => &[0, 1, 2, 3, 4, 5, 6, 7],
        }
    }

    fn distance_for(&self, dr: isize, dc: isize) -> f64 {
        match (dr, dc) {
            (0, _) => self.spacing_x,
            (_, 0) => self.spacing_y,
            _ => (self.spacing_y * self.spacing_y + self.spacing_x * self.spacing_x).sqrt(),
        }
    }

    /// Flat index of the node one `(dr, dc)` step from `(r, c)`, honoring
    /// periodic axes; `None` past a non-periodic edge. Used both by
    /// [`Grid::neighbors`] and directly by the ADI diffusion eroder, which
    /// needs single cardinal steps rather than the full neighbor list.
    pub(crate) fn step(&self, r: usize, c: usize, dr: isize, dc: isize) -> Option<usize> {
        let mut nr = r as isize + dr;
        let mut nc = c as isize + dc;

        if nr < 0 || nr >= self.rows as isize {
            if self.periodic.0 {
                nr = nr.rem_euclid(self.rows as isize);
            } else {
                return None;
            }
        }
        if nc < 0 || nc >= self.cols as isize {
            if self.periodic.1 {
                nc = nc.rem_euclid(self.cols as isize);
            } else {
                return None;
            }
        }
        Some(nr as usize * self.cols + nc as usize)
    }

    #[inline]
    pub(crate) fn row_col(&self, i: usize) -> (usize, usize) {
        (i / self.cols, i % self.cols)
    }

    /// Which axes are periodic: `(rows-axis, cols-axis)`.
    #[inline]
    pub(crate) fn periodic(&self) -> (bool, bool) {
        self.periodic
    }
}

impl Grid for RasterGrid {
    fn size(&self) -> usize {
        self.rows * self.cols
    }

    fn shape(&self) -> Shape {
        Shape::D2(self.rows, self.cols)
    }

    fn status(&self, i: usize) -> NodeStatus {
        self.statuses[i]
    }

    fn area(&self, _i: usize) -> f64 {
        self.spacing_y * self.spacing_x
    }

    fn neighbors(&self, i: usize) -> Vec<Neighbor> {
        if self.statuses[i].is_ghost() {
            return Vec::new();
        }
        let (r, c) = self.row_col(i);
        let mut out = Vec::with_capacity(self.offsets().len());
        for &k in self.offsets() {
            let (dr, dc) = D8_OFFSETS[k];
            let Some(j) = self.step(r, c, dr, dc) else { continue };
            let status = self.statuses[j];
            if status.is_ghost() {
                continue;
            }
            out.push(Neighbor {
                index: j,
                distance: self.distance_for(dr, dc),
                status,
            });
        }
        out
    }

    fn max_neighbors(&self) -> usize {
        self.offsets().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_value_border_has_four_neighbors_minimum_at_corner() {
        let g = RasterGrid::new(4, 4, 1.0, 1.0, Borders::fixed_value(), &[], Connectivity::Eight)
            .unwrap();
        // top-left corner: only SE/S/E in-bounds on a non-periodic grid
        let nbs = g.neighbors(0);
        assert_eq!(nbs.len(), 3);
        crate::grid::test_support::assert_status_immutable_after_construction(&g);
    }

    #[test]
    fn inconsistent_looped_pairing_is_rejected() {
        let mut borders = Borders::fixed_value();
        borders.top = NodeStatus::Looped;
        // bottom left as FixedValue -> mismatched pairing
        let err = RasterGrid::new(4, 4, 1.0, 1.0, borders, &[], Connectivity::Eight);
        assert!(matches!(err, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn periodic_axis_wraps_with_identical_distance() {
        let mut borders = Borders::fixed_value();
        borders.top = NodeStatus::Looped;
        borders.bottom = NodeStatus::Looped;
        let g = RasterGrid::new(4, 4, 2.0, 1.0, borders, &[], Connectivity::Eight).unwrap();
        // node (0, 1) -- its "north" neighbor should wrap to (3, 1) with
        // distance == spacing_y
        let nbs = g.neighbors(1);
        let north = nbs.iter().find(|n| n.index == 3 * 4 + 1).unwrap();
        assert!((north.distance - 2.0).abs() < 1e-12);
    }

    #[test]
    fn from_length_rejects_too_small_shape_without_panicking() {
        let err = RasterGrid::from_length(
            1,
            4,
            100.0,
            100.0,
            Borders::fixed_value(),
            &[],
            Connectivity::Eight,
        );
        assert!(matches!(err, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn from_length_matches_spacing_derived_from_length() {
        let g = RasterGrid::from_length(
            5,
            3,
            40.0,
            20.0,
            Borders::fixed_value(),
            &[],
            Connectivity::Eight,
        )
        .unwrap();
        let (sy, sx) = g.spacing();
        assert!((sy - 10.0).abs() < 1e-12);
        assert!((sx - 10.0).abs() < 1e-12);
    }

    #[test]
    fn override_out_of_bounds_is_rejected() {
        let err = RasterGrid::new(
            4,
            4,
            1.0,
            1.0,
            Borders::fixed_value(),
            &[(10, 10, NodeStatus::Core)],
            Connectivity::Eight,
        );
        assert!(matches!(err, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn ghost_node_has_no_neighbors() {
        let g = RasterGrid::new(
            4,
            4,
            1.0,
            1.0,
            Borders::fixed_value(),
            &[(1, 1, NodeStatus::Ghost)],
            Connectivity::Eight,
        )
        .unwrap();
        assert!(g.neighbors(1 * 4 + 1).is_empty());
    }

    #[test]
    fn four_connected_has_at_most_four_neighbors() {
        let g = RasterGrid::new(5, 5, 1.0, 1.0, Borders::fixed_value(), &[], Connectivity::Four)
            .unwrap();
        for i in 0..g.size() {
            assert!(g.neighbors(i).len() <= 4);
        }
    }
}
