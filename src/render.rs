//! The boundary to whatever draws the skeleton. The core only calls out through
//! [`RenderTarget`] and [`Transformable`]; nothing here knows about a scene graph.

use crate::pose::{bone_endpoints, rest_pose, Pose};
use crate::skeleton::*;
use crate::transform::{self, Transformable};
use crate::types::*;
use cgmath::{EuclideanSpace, InnerSpace, Matrix4, MetricSpace, Rad, Rotation3};

/// Creates the persistent visual handles of a skeleton (one per joint, one per bone).
pub trait RenderTarget {
    type Handle: Transformable;

    /// `transform` is the joint's rest pose world transform.
    fn create_joint(&mut self, joint: &Joint, transform: &Transform) -> Self::Handle;

    /// `transform` places a unit cylinder along the bone in rest pose, see [`bone_transform`].
    fn create_bone(&mut self, bone: &Bone, transform: &Transform) -> Self::Handle;
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Rotation taking +Y onto the direction of `v`.
pub fn rotate_towards(v: Position) -> Transform {
    // zero length bones keep pointing up (prevents NaNs)
    let dir = if v.magnitude2() > 0.0 {
        v.normalize()
    } else {
        Position::unit_y()
    };
    let axs = Position::unit_y();
    let dot = dir.dot(axs);
    let rotation: Quaternion = if dot < -0.9999 {
        // half turn about Z
        Quaternion::new(0.0, 0.0, 0.0, 1.0)
    } else if dot > 0.9999 {
        Quaternion::new(1.0, 0.0, 0.0, 0.0)
    } else {
        let angle = dot.acos();
        let axis = axs.cross(dir).normalize();
        Quaternion::from_axis_angle(axis, Rad(angle))
    };
    Matrix4::from(rotation)
}

/// Places a cylinder of height 2 and diameter 1, centred on the origin along +Y,
/// so that it spans `from`..`to` with the given diameter.
pub fn bone_transform(from: Point, to: Point, diameter: f64) -> Transform {
    let midpoint = from.midpoint(to);
    let half_length = from.distance(to) / 2.0;
    transform::translate(Position::new(midpoint.x, midpoint.y, midpoint.z))
        * rotate_towards(to - from)
        * transform::scale(Position::new(diameter, half_length, diameter))
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Visual handles of one skeleton, kept in sync with a [`Pose`].
#[derive(Debug)]
pub struct Rig<H> {
    joints: Vec<H>,
    bones: Vec<(Bone, H)>,
    bone_diameter: f64,
}

impl<H: Transformable> Rig<H> {
    /// Creates every handle through `target`, placed in rest pose.
    pub fn build<R>(skeleton: &Skeleton, target: &mut R, bone_diameter: f64) -> Self
    where
        R: RenderTarget<Handle = H>,
    {
        let rest = rest_pose(skeleton);
        let joints = skeleton
            .joints()
            .map(|joint| {
                let transform = rest.transform(joint.id).copied().unwrap_or_else(transform::identity);
                target.create_joint(joint, &transform)
            })
            .collect();
        let bones = skeleton
            .bones()
            .into_iter()
            .filter_map(|bone| {
                let (from, to) = bone_endpoints(&rest, &bone)?;
                let handle = target.create_bone(&bone, &bone_transform(from, to, bone_diameter));
                Some((bone, handle))
            })
            .collect();
        Rig {
            joints,
            bones,
            bone_diameter,
        }
    }

    pub fn joint_handles(&self) -> &[H] {
        &self.joints
    }

    pub fn bone_handles(&self) -> impl Iterator<Item = (&Bone, &H)> {
        self.bones.iter().map(|(bone, handle)| (bone, handle))
    }

    /// Sets every joint and bone handle from `pose`.
    pub fn apply(&mut self, pose: &Pose) {
        for (id, matrix) in pose.iter() {
            if let Some(handle) = self.joints.get_mut(id.index()) {
                transform::apply(handle, matrix);
            }
        }
        for (bone, handle) in self.bones.iter_mut() {
            if let Some((from, to)) = bone_endpoints(pose, bone) {
                transform::apply(handle, &bone_transform(from, to, self.bone_diameter));
            }
        }
    }
}
