//! Partitioning of a dispatch into workgroups.
//!
//! One invocation handles one element.  Invocations are grouped into
//! workgroups of `workgroup_size` lanes and the number of workgroups is
//! rounded up, so the grid usually overshoots the array; the kernel guards
//! those extra lanes off.  When the number of workgroups exceeds the
//! device's per-dimension limit the grid wraps into a second dimension, and
//! the global index is linearised as `x + y * row_stride`.

use crate::error::{ComputeError, Result};

/// Calculate an (x, y) workgroup grid that covers `total_groups`
/// workgroups without exceeding the per-dimension limit.
fn split_workgroups(total_groups: u32, limit: u32) -> (u32, u32) {
    if total_groups <= limit {
        (total_groups, 1)
    } else {
        (limit, total_groups.div_ceil(limit))
    }
}

/// The launch shape for one dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DispatchGrid {
    workgroup_size: u32,
    groups_x: u32,
    groups_y: u32,
}

impl DispatchGrid {
    /// Plans a grid with at least `len` invocations.
    ///
    /// A zero length yields an empty grid with no workgroups.
    pub fn for_len(len: usize, workgroup_size: u32, max_groups_per_dim: u32) -> Result<Self> {
        if workgroup_size == 0 {
            return Err(ComputeError::InvalidWorkgroupSize {
                requested: 0,
                max: u32::MAX,
            });
        }
        let too_large = || ComputeError::GridTooLarge {
            len,
            workgroup_size,
        };
        if len == 0 {
            return Ok(Self {
                workgroup_size,
                groups_x: 0,
                groups_y: 0,
            });
        }
        let total_groups = u32::try_from(len.div_ceil(workgroup_size as usize))
            .map_err(|_| too_large())?;
        let limit = max_groups_per_dim.max(1);
        let (groups_x, groups_y) = split_workgroups(total_groups, limit);
        if groups_y > limit {
            return Err(too_large());
        }
        let grid = Self {
            workgroup_size,
            groups_x,
            groups_y,
        };
        // The kernel computes global indices in u32, so every lane of the
        // grid must be addressable without wrapping.
        if grid.invocation_count() > u64::from(u32::MAX) {
            return Err(too_large());
        }
        Ok(grid)
    }

    pub fn workgroup_size(&self) -> u32 {
        self.workgroup_size
    }

    /// Workgroups along x and y.
    pub fn groups(&self) -> (u32, u32) {
        (self.groups_x, self.groups_y)
    }

    pub fn workgroup_count(&self) -> u64 {
        u64::from(self.groups_x) * u64::from(self.groups_y)
    }

    pub fn invocation_count(&self) -> u64 {
        self.workgroup_count() * u64::from(self.workgroup_size)
    }

    pub fn is_empty(&self) -> bool {
        self.workgroup_count() == 0
    }

    /// Invocations in one row of the grid.
    pub fn row_stride(&self) -> u32 {
        self.groups_x * self.workgroup_size
    }

    pub fn covers(&self, len: usize) -> bool {
        self.invocation_count() >= len as u64
    }

    /// Number of launched lanes whose global index falls at or past `len`.
    pub fn padding(&self, len: usize) -> u64 {
        self.invocation_count().saturating_sub(len as u64)
    }

    /// Global index of `lane` within the workgroup at `(group_x, group_y)`.
    pub fn global_index(&self, (group_x, group_y): (u32, u32), lane: u32) -> u64 {
        let x = u64::from(group_x) * u64::from(self.workgroup_size) + u64::from(lane);
        x + u64::from(group_y) * u64::from(self.row_stride())
    }

    /// Grid coordinates of the `n`th workgroup in row-major order.
    pub fn group_coords(&self, n: u64) -> (u32, u32) {
        let x = self.groups_x.max(1) as u64;
        ((n % x) as u32, (n / x) as u32)
    }
}
