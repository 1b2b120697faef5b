//! CPU execution of the add kernel.
//!
//! Runs the same launch shape as the GPU: the grid is planned with
//! [`DispatchGrid`], each workgroup becomes one rayon task over its own
//! chunk of the output, and every lane runs the guarded kernel body.  The
//! borrow checker gives each workgroup a disjoint `&mut` chunk, which is
//! the host-side statement of "no two invocations write the same slot".

use log::debug;
use rayon::prelude::*;

use crate::config::KernelConfig;
use crate::error::{check_bindings, ComputeError, Result};
use crate::grid::DispatchGrid;
use crate::kernel::invoke;
use crate::vector::Vec3;

/// Mirrors wgpu's downlevel default, so CPU and GPU plans coincide.
const MAX_GROUPS_PER_DIMENSION: u32 = 65_535;

/// Plans the grid the CPU path uses for `len` elements.
pub fn plan(len: usize, config: &KernelConfig) -> Result<DispatchGrid> {
    plan_with_limit(len, config, MAX_GROUPS_PER_DIMENSION)
}

/// Like [`plan`], with an explicit cap on workgroups per grid dimension.
pub fn plan_with_limit(
    len: usize,
    config: &KernelConfig,
    max_groups_per_dim: u32,
) -> Result<DispatchGrid> {
    DispatchGrid::for_len(len, config.workgroup_size, max_groups_per_dim)
}

/// Computes `c[i] = a[i] + b[i]` for `i < len` over a planned grid.
///
/// `a`, `b` and `c` must share one capacity and `len` must not exceed it,
/// and `grid` must launch at least `len` invocations.  Slots of `c` at
/// `len` and beyond are left untouched.
pub fn dispatch(
    grid: &DispatchGrid,
    a: &[Vec3],
    b: &[Vec3],
    c: &mut [Vec3],
    len: usize,
) -> Result<()> {
    check_bindings(a.len(), b.len(), c.len(), len)?;
    if !grid.covers(len) {
        return Err(ComputeError::GridTooSmall {
            len,
            invocations: grid.invocation_count(),
        });
    }
    if len == 0 {
        return Ok(());
    }
    debug!(
        "cpu dispatch: {len} elements, {} workgroups of {} lanes",
        grid.workgroup_count(),
        grid.workgroup_size()
    );

    let lanes = grid.workgroup_size() as usize;
    let groups = grid.workgroup_count() as usize;
    c.par_chunks_mut(lanes)
        .take(groups)
        .enumerate()
        .for_each(|(n, chunk)| {
            let group = grid.group_coords(n as u64);
            for (lane, slot) in chunk.iter_mut().enumerate() {
                let i = grid.global_index(group, lane as u32) as usize;
                invoke(i, len, a, b, slot);
            }
        });
    Ok(())
}

/// Adds two equal-length slices into a freshly allocated vector.
pub fn add_vectors(a: &[Vec3], b: &[Vec3], config: &KernelConfig) -> Result<Vec<Vec3>> {
    let mut out = vec![Vec3::ZERO; a.len()];
    check_bindings(a.len(), b.len(), out.len(), a.len())?;
    let grid = plan(a.len(), config)?;
    dispatch(&grid, a, b, &mut out, a.len())?;
    Ok(out)
}
