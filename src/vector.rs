//! The element type shared by the host and the kernel.
//!
//! [`Vec3`] is three tightly packed `f32`s.  The kernel declares its element
//! as a WGSL struct with three `f32` members rather than `vec3<f32>`: the
//! struct has size 12, alignment 4 and array stride 12, whereas
//! `array<vec3<f32>>` has a stride of 16.  With the struct form a `&[Vec3]`
//! can be uploaded byte for byte through [`bytemuck::cast_slice`].

use std::ops::{Add, AddAssign};

use bytemuck::{Pod, Zeroable};

/// A 3-component single precision vector.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::splat(0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub const fn splat(v: f32) -> Self {
        Self { x: v, y: v, z: v }
    }

    pub const fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

/// Component-wise addition, the same operation each kernel invocation
/// performs for its slot.
impl Add for Vec3 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl AddAssign for Vec3 {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl From<[f32; 3]> for Vec3 {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<Vec3> for [f32; 3] {
    fn from(v: Vec3) -> Self {
        v.to_array()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_the_kernel_struct() {
        assert_eq!(std::mem::size_of::<Vec3>(), 12);
        assert_eq!(std::mem::align_of::<Vec3>(), 4);

        let v = [Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0)];
        let floats: &[f32] = bytemuck::cast_slice(&v);
        assert_eq!(floats, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn add_is_component_wise() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);
        assert_eq!(a + b, Vec3::new(5.0, 7.0, 9.0));
        assert_eq!(a + b, b + a);

        let mut c = a;
        c += b;
        assert_eq!(c, a + b);
    }

    #[test]
    fn non_finite_values_follow_float_semantics() {
        let a = Vec3::new(f32::NAN, f32::INFINITY, f32::INFINITY);
        let b = Vec3::new(1.0, 1.0, f32::NEG_INFINITY);
        let c = a + b;
        assert!(c.x.is_nan());
        assert_eq!(c.y, f32::INFINITY);
        assert!(c.z.is_nan());
    }

    #[test]
    fn array_conversions() {
        let v: Vec3 = [7.0, 8.0, 9.0].into();
        assert_eq!(v, Vec3::new(7.0, 8.0, 9.0));
        let back: [f32; 3] = v.into();
        assert_eq!(back, [7.0, 8.0, 9.0]);
        assert_eq!(Vec3::ZERO, Vec3::default());
    }
}
