use nalgebra::{UnitQuaternion, Vector3};

use super::constants::physics as consts;

/// Wraps `n` into `[0, len)`, including negative `n`.
///
/// `%` on a negative `isize` keeps the sign of the dividend, so ring buffer
/// look-backs must go through this instead.
pub fn wrap_index(n: isize, len: usize) -> usize {
    debug_assert!(len > 0, "wrap_index on an empty ring");
    n.rem_euclid(len as isize) as usize
}

/// Zeroes the vertical component.
pub fn horizontal_mask(v: Vector3<f32>) -> Vector3<f32> {
    Vector3::new(v.x, 0.0, v.z)
}

/// Zeroes both horizontal components.
pub fn vertical_mask(v: Vector3<f32>) -> Vector3<f32> {
    Vector3::new(0.0, v.y, 0.0)
}

/// Normalizes `v`, or returns `None` when it is too short to carry a direction.
pub fn try_normalize(v: Vector3<f32>) -> Option<Vector3<f32>> {
    v.try_normalize(consts::EPSILON)
}

/// Local +Z of a rotation.
pub fn forward_of(rotation: &UnitQuaternion<f32>) -> Vector3<f32> {
    rotation * Vector3::z()
}

/// Local +X of a rotation.
pub fn right_of(rotation: &UnitQuaternion<f32>) -> Vector3<f32> {
    rotation * Vector3::x()
}

pub fn to_array(v: Vector3<f32>) -> [f32; 3] {
    [v.x, v.y, v.z]
}

pub fn from_array(a: [f32; 3]) -> Vector3<f32> {
    Vector3::new(a[0], a[1], a[2])
}
