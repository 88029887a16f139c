//! 1-D profile grid (spec §4.1): a line of evenly-spaced nodes.

use super::status::NodeStatus;
use super::{Grid, Neighbor, Shape};
use crate::error::{Error, Result};

pub struct ProfileGrid {
    size: usize,
    spacing: f64,
    statuses: Vec<NodeStatus>,
}

impl ProfileGrid {
    /// `left`/`right` set the endpoint statuses; `overrides` patches
    /// individual interior nodes.
    pub fn new(
        size: usize,
        spacing: f64,
        left: NodeStatus,
        right: NodeStatus,
        overrides: &[(usize, NodeStatus)],
    ) -> Result<Self> {
        if size < 2 {
            return Err(Error::InvalidArgument(
                "profile grid requires at least 2 nodes".into(),
            ));
        }
        if left.is_looped() != right.is_looped() {
            return Err(Error::InvalidArgument(
                "LOOPED left endpoint must be paired with a LOOPED right endpoint".into(),
            ));
        }

        let mut statuses = vec![NodeStatus::Core; size];
        statuses[0] = left;
        statuses[size - 1] = right;

        for &(i, status) in overrides {
            if i >= size {
                return Err(Error::InvalidArgument(format!(
                    "status override index {i} out of bounds for size {size}"
                )));
            }
            statuses[i] = status;
        }

        Ok(Self { size, spacing, statuses })
    }

    #[inline]
    pub fn spacing(&self) -> f64 {
        self.spacing
    }
}

impl Grid for ProfileGrid {
    fn size(&self) -> usize {
        self.size
    }

    fn shape(&self) -> Shape {
        Shape::D1(self.size)
    }

    fn status(&self, i: usize) -> NodeStatus {
        self.statuses[i]
    }

    fn area(&self, _i: usize) -> f64 {
        self.spacing
    }

    fn neighbors(&self, i: usize) -> Vec<Neighbor> {
        if self.statuses[i].is_ghost() {
            return Vec::new();
        }
        let looped = self.statuses[0].is_looped();
        let mut out = Vec::with_capacity(2);

        if i > 0 {
            out.push((i - 1) as isize);
        } else if looped {
            out.push(self.size as isize - 1);
        }

        if i + 1 < self.size {
            out.push((i + 1) as isize);
        } else if looped {
            out.push(0);
        }

        // A 2-node looped profile wraps each endpoint onto the same single
        // other node from both directions; list it once rather than twice.
        if self.size == 2 {
            out.dedup();
        }

        out.into_iter()
            .filter_map(|j| {
                let j = j as usize;
                let status = self.statuses[j];
                if status.is_ghost() {
                    None
                } else {
                    Some(Neighbor { index: j, distance: self.spacing, status })
                }
            })
            .collect()
    }

    fn max_neighbors(&self) -> usize {
        2
    }
}
