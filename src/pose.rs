use crate::skeleton::*;
use crate::transform;
use crate::types::*;
use cgmath::{EuclideanSpace, Transform as _};

/// World transform of every animatable joint, indexed by `JointId`.
/// End sites have no entry; use [`Pose::endpoint`] for them.
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    transforms: Vec<Transform>,
}

impl Pose {
    /// Identity transform for every joint of `skeleton`.
    pub fn identity(skeleton: &Skeleton) -> Self {
        Pose {
            transforms: vec![transform::identity(); skeleton.joint_count()],
        }
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn transform(&self, id: JointId) -> Option<&Transform> {
        self.transforms.get(id.index())
    }

    /// World position of a joint.
    pub fn position(&self, id: JointId) -> Option<Point> {
        self.transform(id).map(transform::position_of)
    }

    /// Where a point given relative to `id` ends up in world space,
    /// e.g. an end site: `world(parent) * offset`.
    pub fn endpoint(&self, id: JointId, offset: Position) -> Option<Point> {
        self.transform(id)
            .map(|m| m.transform_point(Point::from_vec(offset)))
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (JointId, &Transform)> {
        self.transforms
            .iter()
            .enumerate()
            .map(|(index, m)| (JointId(index), m))
    }

    pub fn transforms(&self) -> &[Transform] {
        &self.transforms
    }
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Translation x rotation for one joint at one keyframe.
pub fn local_transform(joint: &Joint, row: &[f64]) -> Transform {
    let translation = match &joint.position_channels {
        Some(channels) => channels.read(row),
        None => joint.offset,
    };
    let rotation = match &joint.rotation_channels {
        Some(channels) => transform::rotate_ordered(&channels.order, channels.read(row)),
        None => transform::identity(),
    };
    transform::translate(translation) * rotation
}

/// Forward kinematics: world transform of every joint for one keyframe row.
///
/// # Panics
/// If `row` is shorter than the skeleton's channel count. Rows taken from
/// [`Skeleton::keyframe`] always fit.
pub fn compute_pose(skeleton: &Skeleton, row: &[f64]) -> Pose {
    let mut pose = Pose::identity(skeleton);
    compute_pose_into(skeleton, row, &mut pose);
    pose
}

/// Same as [`compute_pose`] but overwrites `pose` in place.
pub fn compute_pose_into(skeleton: &Skeleton, row: &[f64], pose: &mut Pose) {
    assert!(
        row.len() >= skeleton.channel_count(),
        "keyframe row has {} values, skeleton needs {}",
        row.len(),
        skeleton.channel_count()
    );
    pose.transforms.resize(skeleton.joint_count(), transform::identity());

    fn recursive_transform(joint: &Joint, parent_transform: &Transform, row: &[f64], out: &mut [Transform]) {
        let world = parent_transform * local_transform(joint, row);
        out[joint.id.index()] = world;
        for child in joint.child_joints() {
            recursive_transform(child, &world, row, out);
        }
    }

    recursive_transform(skeleton.root(), &transform::identity(), row, &mut pose.transforms);
}

/// Pose of `frame`, or `None` past the last frame.
pub fn compute_frame(skeleton: &Skeleton, frame: usize) -> Option<Pose> {
    skeleton.keyframe(frame).map(|row| compute_pose(skeleton, row))
}

/// Bind pose: offsets only, no rotation, position channels ignored.
pub fn rest_pose(skeleton: &Skeleton) -> Pose {
    fn recursive_transform(joint: &Joint, parent_transform: &Transform, out: &mut [Transform]) {
        let world = parent_transform * transform::translate(joint.offset);
        out[joint.id.index()] = world;
        for child in joint.child_joints() {
            recursive_transform(child, &world, out);
        }
    }

    let mut pose = Pose::identity(skeleton);
    recursive_transform(skeleton.root(), &transform::identity(), &mut pose.transforms);
    pose
}

/// World-space start and end of a bone.
pub fn bone_endpoints(pose: &Pose, bone: &Bone) -> Option<(Point, Point)> {
    let start = pose.position(bone.parent)?;
    let end = match bone.end {
        BoneEnd::Joint(child) => pose.position(child)?,
        BoneEnd::EndSite(offset) => pose.endpoint(bone.parent, offset)?,
    };
    Some((start, end))
}
