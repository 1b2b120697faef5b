//! The elementwise add kernel.
//!
//! Every invocation owns exactly one slot: it reads `a[i]` and `b[i]`, adds
//! them component-wise and writes `c[i]`.  Invocations share no state and
//! may run in any order.  Lanes whose global index is at or past the
//! logical length return before touching memory, which makes grids padded
//! up to a workgroup multiple safe.
//!
//! Binding contract, group 0:
//!
//! | slot | contents          | access     |
//! |------|-------------------|------------|
//! | 0    | `a: array<Vec3>`  | read       |
//! | 1    | `b: array<Vec3>`  | read       |
//! | 2    | `c: array<Vec3>`  | read_write |
//! | 3    | [`DispatchParams`]| uniform    |

use bytemuck::{Pod, Zeroable};

use crate::grid::DispatchGrid;
use crate::vector::Vec3;

pub const ENTRY_POINT: &str = "add";

pub const BINDING_A: u32 = 0;
pub const BINDING_B: u32 = 1;
pub const BINDING_C: u32 = 2;
pub const BINDING_PARAMS: u32 = 3;

const WORKGROUP_SIZE_TOKEN: &str = "{{WORKGROUP_SIZE}}";

const SHADER_TEMPLATE: &str = r#"
struct Vec3 {
    x: f32,
    y: f32,
    z: f32,
}

struct Params {
    len: u32,
    row_stride: u32,
    _pad0: u32,
    _pad1: u32,
}

@group(0) @binding(0)
var<storage, read> a: array<Vec3>;
@group(0) @binding(1)
var<storage, read> b: array<Vec3>;
@group(0) @binding(2)
var<storage, read_write> c: array<Vec3>;
@group(0) @binding(3)
var<uniform> params: Params;

@compute @workgroup_size({{WORKGROUP_SIZE}})
fn add(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let i = global_id.x + global_id.y * params.row_stride;
    if (i >= params.len) {
        return;
    }
    let lhs = a[i];
    let rhs = b[i];
    c[i] = Vec3(lhs.x + rhs.x, lhs.y + rhs.y, lhs.z + rhs.z);
}
"#;

/// WGSL source of the kernel with `workgroup_size` lanes per workgroup.
pub fn wgsl_source(workgroup_size: u32) -> String {
    SHADER_TEMPLATE.replace(WORKGROUP_SIZE_TOKEN, &workgroup_size.to_string())
}

/// Per-dispatch uniform at [`BINDING_PARAMS`].  Padded to 16 bytes to
/// satisfy uniform buffer layout rules.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct DispatchParams {
    pub len: u32,
    pub row_stride: u32,
    _pad: [u32; 2],
}

impl DispatchParams {
    /// Callers must have checked that `len` fits in `u32`; a grid from
    /// [`DispatchGrid::for_len`] guarantees it.
    pub fn new(grid: &DispatchGrid, len: u32) -> Self {
        Self {
            len,
            row_stride: grid.row_stride(),
            _pad: [0; 2],
        }
    }
}

/// Host rendition of one kernel invocation: the body the WGSL entry point
/// runs for global index `i`.
#[inline]
pub(crate) fn invoke(i: usize, len: usize, a: &[Vec3], b: &[Vec3], slot: &mut Vec3) {
    if i >= len {
        return;
    }
    *slot = a[i] + b[i];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_carries_the_requested_workgroup_size() {
        let src = wgsl_source(64);
        assert!(src.contains("@workgroup_size(64)"));
        assert!(!src.contains(WORKGROUP_SIZE_TOKEN));
        assert!(src.contains(&format!("fn {ENTRY_POINT}(")));
        assert!(wgsl_source(256).contains("@workgroup_size(256)"));
    }

    #[test]
    fn bindings_are_declared_in_slot_order() {
        let src = wgsl_source(64);
        let pos = |needle: &str| src.find(needle).unwrap();
        assert!(pos("@binding(0)\nvar<storage, read> a") < pos("@binding(1)\nvar<storage, read> b"));
        assert!(pos("@binding(1)") < pos("@binding(2)\nvar<storage, read_write> c"));
        assert!(src.contains("@binding(3)\nvar<uniform> params"));
    }

    #[test]
    fn params_are_sixteen_bytes() {
        assert_eq!(std::mem::size_of::<DispatchParams>(), 16);
        let grid = DispatchGrid::for_len(65, 64, 65_535).unwrap();
        let params = DispatchParams::new(&grid, 65);
        assert_eq!(params.len, 65);
        assert_eq!(params.row_stride, 128);
    }

    #[test]
    fn out_of_range_invocation_leaves_the_slot_alone() {
        let a = [Vec3::splat(1.0)];
        let b = [Vec3::splat(2.0)];
        let mut slot = Vec3::splat(-1.0);
        invoke(1, 1, &a, &b, &mut slot);
        assert_eq!(slot, Vec3::splat(-1.0));
        invoke(0, 1, &a, &b, &mut slot);
        assert_eq!(slot, Vec3::splat(3.0));
    }
}
