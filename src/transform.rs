//! 4x4 affine matrix helpers. Angles are in DEGREES, as in .bvh files.

use crate::types::*;
use cgmath::{Deg, EuclideanSpace, Matrix4, SquareMatrix};

pub fn identity() -> Transform {
    Matrix4::identity()
}

/// Identity with the translation column set to `v`.
pub fn translate(v: Position) -> Transform {
    Matrix4::from_translation(v)
}

/// Right-handed rotation about X.
pub fn rotate_x(degrees: f64) -> Transform {
    Matrix4::from_angle_x(Deg(degrees))
}

/// Right-handed rotation about Y.
pub fn rotate_y(degrees: f64) -> Transform {
    Matrix4::from_angle_y(Deg(degrees))
}

/// Right-handed rotation about Z.
pub fn rotate_z(degrees: f64) -> Transform {
    Matrix4::from_angle_z(Deg(degrees))
}

pub fn rotate_axis(axis: Axis, degrees: f64) -> Transform {
    match axis {
        Axis::X => rotate_x(degrees),
        Axis::Y => rotate_y(degrees),
        Axis::Z => rotate_z(degrees),
    }
}

/// Composes the three per-axis rotations left to right in `order`.
/// `angles` is indexed the same way as `order`.
pub fn rotate_ordered(order: &RotationOrder, angles: [f64; 3]) -> Transform {
    order
        .axes()
        .iter()
        .zip(angles)
        .fold(identity(), |acc, (&axis, angle)| {
            acc * rotate_axis(axis, angle)
        })
}

/// Diagonal scale matrix.
pub fn scale(v: Position) -> Transform {
    Matrix4::from_nonuniform_scale(v.x, v.y, v.z)
}

/// Translation column of an affine matrix.
pub fn position_of(m: &Transform) -> Point {
    Point::from_vec(m.w.truncate())
}

/// Something whose world transform can be set from a matrix (a scene object, a gizmo, a test probe...).
pub trait Transformable {
    fn set_world_transform(&mut self, transform: &Transform);
}

/// Hands `matrix` to `object` as its new world transform.
pub fn apply<T: Transformable + ?Sized>(object: &mut T, matrix: &Transform) {
    object.set_world_transform(matrix);
}
