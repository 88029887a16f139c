//! 2-D unstructured triangular mesh grid (spec §4.1).
//!
//! Neighbor adjacency is derived from triangle edges; per-node area is the
//! Voronoi-dual area of the vertex star (spec §3/§4.1), built per triangle
//! with the mixed-area construction (Meyer et al., "Discrete
//! Differential-Geometry Operators"): a non-obtuse triangle splits its area
//! among its three vertices by the circumcenter-based cotangent weighting,
//! while an obtuse triangle falls back to half its area at the obtuse
//! vertex and a quarter at each of the other two (the circumcenter falls
//! outside the triangle, so the cotangent split would assign a vertex
//! negative area).

use std::collections::BTreeSet;

use super::status::NodeStatus;
use super::{Grid, Neighbor, Shape};
use crate::error::{Error, Result};

pub struct TriMeshGrid {
    points: Vec<(f64, f64)>,
    statuses: Vec<NodeStatus>,
    adjacency: Vec<Vec<usize>>,
    areas: Vec<f64>,
}

impl TriMeshGrid {
    /// `points` are vertex `(x, y)` coordinates; `triangles` are
    /// counter-clockwise-or-not index triples into `points`; `base_levels`
    /// marks which vertices are `FixedValue` (all others start `Core`).
    pub fn new(
        points: Vec<(f64, f64)>,
        triangles: Vec<[usize; 3]>,
        base_levels: &[usize],
    ) -> Result<Self> {
        let n = points.len();
        if n < 3 || triangles.is_empty() {
            return Err(Error::InvalidArgument(
                "trimesh requires at least one triangle over at least 3 points".into(),
            ));
        }

        for tri in &triangles {
            for &v in tri {
                if v >= n {
                    return Err(Error::InvalidArgument(format!(
                        "triangle references vertex {v}, but only {n} points exist"
                    )));
                }
            }
        }

        let mut adjacency: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
        let mut areas = vec![0.0; n];
        let mut covered = vec![false; n];

        for tri in &triangles {
            let [a, b, c] = *tri;
            adjacency[a].insert(b);
            adjacency[a].insert(c);
            adjacency[b].insert(a);
            adjacency[b].insert(c);
            adjacency[c].insert(a);
            adjacency[c].insert(b);
            covered[a] = true;
            covered[b] = true;
            covered[c] = true;

            for (v, share) in voronoi_dual_shares(points[a], points[b], points[c]) {
                areas[[a, b, c][v]] += share;
            }
        }

        if let Some(v) = covered.iter().position(|&c| !c) {
            return Err(Error::InvalidArgument(format!(
                "vertex {v} belongs to no triangle (disconnected mesh)"
            )));
        }

        let mut statuses = vec![NodeStatus::Core; n];
        for &b in base_levels {
            if b >= n {
                return Err(Error::InvalidArgument(format!(
                    "base-level index {b} out of bounds for {n} points"
                )));
            }
            statuses[b] = NodeStatus::FixedValue;
        }

        Ok(Self {
            points,
            statuses,
            adjacency: adjacency.into_iter().map(|s| s.into_iter().collect()).collect(),
            areas,
        })
    }
}

fn triangle_area(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    0.5 * ((b.0 - a.0) * (c.1 - a.1) - (c.0 - a.0) * (b.1 - a.1)).abs()
}

fn dist(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

/// `cot` of the angle at `at` subtended by `p1`/`p2`, via `cos/sin = dot/cross`
/// of the two edge vectors out of `at` — avoids an explicit `acos`/`atan2`.
fn cotangent(at: (f64, f64), p1: (f64, f64), p2: (f64, f64)) -> f64 {
    let v1 = (p1.0 - at.0, p1.1 - at.1);
    let v2 = (p2.0 - at.0, p2.1 - at.1);
    let dot = v1.0 * v2.0 + v1.1 * v2.1;
    let cross = v1.0 * v2.1 - v1.1 * v2.0;
    dot / cross
}

/// Each vertex's share of this triangle's Voronoi-dual area, as `(vertex
/// index into [a, b, c], area)` pairs. Obtuse-at-`v` triangles split
/// `area/2` to `v` and `area/4` to each of the other two; non-obtuse
/// triangles use the standard cotangent-weighted split.
fn voronoi_dual_shares(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> [(usize, f64); 3] {
    let pts = [a, b, c];
    let is_obtuse_at = |v: usize| {
        let (p1, p2) = match v {
            0 => (b, c),
            1 => (a, c),
            _ => (a, b),
        };
        let e1 = (p1.0 - pts[v].0, p1.1 - pts[v].1);
        let e2 = (p2.0 - pts[v].0, p2.1 - pts[v].1);
        e1.0 * e2.0 + e1.1 * e2.1 < 0.0
    };

    if let Some(obtuse) = (0..3).find(|&v| is_obtuse_at(v)) {
        let area = triangle_area(a, b, c);
        return std::array::from_fn(|v| (v, if v == obtuse { area / 2.0 } else { area / 4.0 }));
    }

    let cot_a = cotangent(a, b, c);
    let cot_b = cotangent(b, a, c);
    let cot_c = cotangent(c, a, b);
    let d_ab2 = dist(a, b).powi(2);
    let d_bc2 = dist(b, c).powi(2);
    let d_ac2 = dist(a, c).powi(2);

    [
        (0, (d_ab2 * cot_c + d_ac2 * cot_b) / 8.0),
        (1, (d_ab2 * cot_c + d_bc2 * cot_a) / 8.0),
        (2, (d_ac2 * cot_b + d_bc2 * cot_a) / 8.0),
    ]
}

impl Grid for TriMeshGrid {
    fn size(&self) -> usize {
        self.points.len()
    }

    fn shape(&self) -> Shape {
        Shape::D1(self.points.len())
    }

    fn status(&self, i: usize) -> NodeStatus {
        self.statuses[i]
    }

    fn area(&self, i: usize) -> f64 {
        self.areas[i]
    }

    fn neighbors(&self, i: usize) -> Vec<Neighbor> {
        if self.statuses[i].is_ghost() {
            return Vec::new();
        }
        self.adjacency[i]
            .iter()
            .filter(|&&j| !self.statuses[j].is_ghost())
            .map(|&j| Neighbor {
                index: j,
                distance: dist(self.points[i], self.points[j]),
                status: self.statuses[j],
            })
            .collect()
    }

    fn max_neighbors(&self) -> usize {
        self.adjacency.iter().map(|a| a.len()).max().unwrap_or(0)
    }
}
