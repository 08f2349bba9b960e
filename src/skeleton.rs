use crate::types::*;

/////////////////////////////////////////////////////////////////////////////////////////////////

/// Column indices of a joint's position channels, indexed by axis (x, y, z).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionChannels(pub [Index; 3]);

impl PositionChannels {
    pub fn column(&self, axis: Axis) -> Index {
        self.0[axis.index()]
    }

    /// Reads the translation out of a keyframe row.
    pub fn read(&self, row: &[f64]) -> Position {
        Position::new(row[self.0[0]], row[self.0[1]], row[self.0[2]])
    }
}

/// Rotation channels of a joint: `columns[i]` holds the angle for `order[i]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationChannels {
    pub order: RotationOrder,
    pub columns: [Index; 3],
}

impl RotationChannels {
    pub fn column(&self, axis: Axis) -> Index {
        let slot = self
            .order
            .axes()
            .iter()
            .position(|&a| a == axis)
            .unwrap_or_default();
        self.columns[slot]
    }

    /// Angles in `order`, in degrees.
    pub fn read(&self, row: &[f64]) -> [f64; 3] {
        self.columns.map(|column| row[column])
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub name: String,
    pub id: JointId,
    /// Position relative to the parent in rest pose.
    pub offset: Position,
    pub position_channels: Option<PositionChannels>,
    pub rotation_channels: Option<RotationChannels>,
    pub children: Vec<Node>,
}

impl Joint {
    pub fn rotation_order(&self) -> Option<RotationOrder> {
        self.rotation_channels.map(|channels| channels.order)
    }

    pub fn channel_count(&self) -> usize {
        self.position_channels.map_or(0, |_| 3) + self.rotation_channels.map_or(0, |_| 3)
    }

    /// Joints without channels only ever sit at their offset.
    pub fn is_static(&self) -> bool {
        self.channel_count() == 0
    }

    pub fn child_joints(&self) -> impl Iterator<Item = &Joint> {
        self.children.iter().filter_map(Node::as_joint)
    }

    pub fn end_sites(&self) -> impl Iterator<Item = &EndSite> {
        self.children.iter().filter_map(Node::as_end_site)
    }
}

/// Terminal marker of a bone chain; only defines where the last bone ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EndSite {
    pub offset: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Joint(Joint),
    EndSite(EndSite),
}

impl Node {
    pub fn as_joint(&self) -> Option<&Joint> {
        match self {
            Node::Joint(joint) => Some(joint),
            Node::EndSite(_) => None,
        }
    }

    pub fn as_end_site(&self) -> Option<&EndSite> {
        match self {
            Node::Joint(_) => None,
            Node::EndSite(end_site) => Some(end_site),
        }
    }

    pub fn is_end_site(&self) -> bool {
        matches!(self, Node::EndSite(_))
    }

    pub fn offset(&self) -> Position {
        match self {
            Node::Joint(joint) => joint.offset,
            Node::EndSite(end_site) => end_site.offset,
        }
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// Keyframe table, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Motion {
    pub(crate) num_frames: usize,
    pub(crate) frame_length: f64,
    pub(crate) channel_count: usize,
    pub(crate) values: Vec<f64>,
}

impl Motion {
    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    /// Seconds per frame.
    pub fn frame_length(&self) -> f64 {
        self.frame_length
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    pub fn row(&self, frame: usize) -> Option<&[f64]> {
        let start = frame.checked_mul(self.channel_count)?;
        let end = start.checked_add(self.channel_count)?;
        self.values.get(start..end)
    }

    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[f64]> {
        self.values.chunks_exact(self.channel_count)
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// Where a bone ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoneEnd {
    Joint(JointId),
    EndSite(Position),
}

/// Segment from a joint to one of its children.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bone {
    pub parent: JointId,
    pub end: BoneEnd,
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// A parsed .bvh file: the joint tree plus its keyframes. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    pub(crate) root: Joint,
    pub(crate) motion: Motion,
    /// Indexed by `JointId`.
    pub(crate) parents: Vec<Option<JointId>>,
    pub(crate) depths: Vec<Depth>,
    /// Indexed by `JointId`: positions in `children` leading from the root to the joint.
    pub(crate) paths: Vec<Vec<Index>>,
}

impl Skeleton {
    /// Assembles a skeleton from an already validated tree and table.
    pub(crate) fn new(root: Joint, motion: Motion) -> Skeleton {
        let mut parents = Vec::new();
        let mut depths = Vec::new();
        let mut paths = Vec::new();
        let mut stack = vec![(&root, None, 0, Vec::new())];
        while let Some((joint, parent, depth, path)) = stack.pop() {
            debug_assert_eq!(joint.id.index(), parents.len());
            parents.push(parent);
            depths.push(depth);
            // reversed so the first child is popped first
            for (position, child) in joint.children.iter().enumerate().rev() {
                if let Node::Joint(child) = child {
                    let mut child_path = path.clone();
                    child_path.push(position);
                    stack.push((child, Some(joint.id), depth + 1, child_path));
                }
            }
            paths.push(path);
        }
        Skeleton {
            root,
            motion,
            parents,
            depths,
            paths,
        }
    }

    pub fn root(&self) -> &Joint {
        &self.root
    }

    pub fn motion(&self) -> &Motion {
        &self.motion
    }

    /// Number of animatable joints (end sites excluded).
    pub fn joint_count(&self) -> usize {
        self.parents.len()
    }

    pub fn channel_count(&self) -> usize {
        self.motion.channel_count
    }

    pub fn num_frames(&self) -> usize {
        self.motion.num_frames
    }

    pub fn frame_length(&self) -> f64 {
        self.motion.frame_length
    }

    /// Frames per second, rounded to the nearest integer.
    pub fn fps(&self) -> u32 {
        (1.0 / self.motion.frame_length).round() as u32
    }

    /// Clip length in seconds.
    pub fn duration(&self) -> f64 {
        self.motion.num_frames as f64 * self.motion.frame_length
    }

    pub fn keyframe(&self, frame: usize) -> Option<&[f64]> {
        self.motion.row(frame)
    }

    /// Depth-first (pre-order) walk over joints, end sites skipped. Yields joints in `JointId` order.
    pub fn joints(&self) -> Joints<'_> {
        Joints {
            stack: vec![&self.root],
        }
    }

    /// Walks the stored child path, so the cost is the joint's depth.
    pub fn joint(&self, id: JointId) -> Option<&Joint> {
        self.paths
            .get(id.index())?
            .iter()
            .try_fold(&self.root, |joint, &position| joint.children.get(position)?.as_joint())
    }

    /// First joint (depth-first) with the given name.
    pub fn find_joint(&self, name: &str) -> Option<&Joint> {
        self.joints().find(|joint| joint.name == name)
    }

    pub fn parent(&self, id: JointId) -> Option<JointId> {
        self.parents.get(id.index()).copied().flatten()
    }

    pub fn depth(&self, id: JointId) -> Option<Depth> {
        self.depths.get(id.index()).copied()
    }

    /// Splits the depth-first joint list into chains that break whenever a joint
    /// does not continue straight down from the previous one,
    /// e.g. `[[0,1,2,3],[4,5,6,7,8],[9,10,11],[12,13,14,15],[16,17,18]]`.
    /// For a humanoid these are usually the legs, arms and spine+head.
    pub fn kinematic_chains(&self) -> Vec<Vec<JointId>> {
        let mut chains: Vec<Vec<JointId>> = Vec::new();
        let mut chain: Vec<JointId> = Vec::new();
        let mut last_depth: Option<Depth> = None;
        for (index, &depth) in self.depths.iter().enumerate() {
            let continues = last_depth.is_some_and(|last| last + 1 == depth);
            if !continues && !chain.is_empty() {
                chains.push(std::mem::take(&mut chain));
            }
            last_depth = Some(depth);
            chain.push(JointId(index));
        }
        if !chain.is_empty() {
            chains.push(chain);
        }
        chains
    }

    /// Every parent-to-child segment, end sites included, in depth-first order.
    pub fn bones(&self) -> Vec<Bone> {
        let mut bones = Vec::new();
        for joint in self.joints() {
            for child in &joint.children {
                let end = match child {
                    Node::Joint(child) => BoneEnd::Joint(child.id),
                    Node::EndSite(end_site) => BoneEnd::EndSite(end_site.offset),
                };
                bones.push(Bone {
                    parent: joint.id,
                    end,
                });
            }
        }
        bones
    }
}

pub struct Joints<'a> {
    stack: Vec<&'a Joint>,
}

impl<'a> Iterator for Joints<'a> {
    type Item = &'a Joint;

    fn next(&mut self) -> Option<&'a Joint> {
        let joint = self.stack.pop()?;
        // reversed so the first child is visited first
        let children: Vec<&Joint> = joint.child_joints().collect();
        self.stack.extend(children.into_iter().rev());
        Some(joint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

    const TWO_ARMS: &str = "\
HIERARCHY
ROOT Hips
{
  OFFSET 0 0 0
  CHANNELS 6 Xposition Yposition Zposition Zrotation Xrotation Yrotation
  JOINT Spine
  {
    OFFSET 0 5 0
    CHANNELS 3 Zrotation Xrotation Yrotation
    JOINT Head
    {
      OFFSET 0 5 0
      End Site
      {
        OFFSET 0 2 0
      }
    }
  }
  JOINT LeftArm
  {
    OFFSET 3 4 0
    CHANNELS 3 Zrotation Xrotation Yrotation
    JOINT LeftHand
    {
      OFFSET 3 0 0
      CHANNELS 3 Zrotation Xrotation Yrotation
    }
  }
  JOINT RightArm
  {
    OFFSET -3 4 0
    CHANNELS 3 Zrotation Xrotation Yrotation
  }
}
MOTION
Frames: 1
Frame Time: 0.0333333
0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0
";

    #[test]
    fn joints_iterate_in_id_order() {
        let skeleton = parse(TWO_ARMS).unwrap();
        let names: Vec<&str> = skeleton.joints().map(|j| j.name.as_str()).collect();
        assert_eq!(names, ["Hips", "Spine", "Head", "LeftArm", "LeftHand", "RightArm"]);
        for (index, joint) in skeleton.joints().enumerate() {
            assert_eq!(joint.id, JointId(index));
        }
    }

    #[test]
    fn parents_and_depths() {
        let skeleton = parse(TWO_ARMS).unwrap();
        let hand = skeleton.find_joint("LeftHand").unwrap();
        let arm = skeleton.joint(skeleton.parent(hand.id).unwrap()).unwrap();
        assert_eq!(arm.name, "LeftArm");
        assert_eq!(skeleton.depth(hand.id), Some(2));
        assert_eq!(skeleton.parent(JointId::ROOT), None);
        assert_eq!(skeleton.depth(JointId::ROOT), Some(0));

        // each joint's parent is exactly one level above
        for joint in skeleton.joints().skip(1) {
            let parent = skeleton.parent(joint.id).unwrap();
            assert_eq!(skeleton.depth(joint.id).unwrap(), skeleton.depth(parent).unwrap() + 1);
        }
    }

    #[test]
    fn joint_lookup_by_id() {
        let skeleton = parse(TWO_ARMS).unwrap();
        for joint in skeleton.joints() {
            assert_eq!(skeleton.joint(joint.id), Some(joint));
        }
        assert_eq!(skeleton.joint(JointId(2)).map(|j| j.name.as_str()), Some("Head"));
        assert!(skeleton.joint(JointId(skeleton.joint_count())).is_none());
    }

    #[test]
    fn kinematic_chains_split_on_branches() {
        let skeleton = parse(TWO_ARMS).unwrap();
        let chains: Vec<Vec<usize>> = skeleton
            .kinematic_chains()
            .into_iter()
            .map(|chain| chain.into_iter().map(JointId::index).collect())
            .collect();
        assert_eq!(chains, vec![vec![0, 1, 2], vec![3, 4], vec![5]]);
    }

    #[test]
    fn bones_include_end_sites() {
        let skeleton = parse(TWO_ARMS).unwrap();
        let bones = skeleton.bones();
        assert_eq!(bones.len(), 6);
        assert_eq!(
            bones[4],
            Bone {
                parent: JointId(2),
                end: BoneEnd::EndSite(Position::new(0.0, 2.0, 0.0)),
            }
        );
        assert!(bones.iter().all(|bone| bone.end != BoneEnd::Joint(JointId::ROOT)));
    }

    #[test]
    fn metadata() {
        let skeleton = parse(TWO_ARMS).unwrap();
        assert_eq!(skeleton.joint_count(), 6);
        assert_eq!(skeleton.channel_count(), 18);
        assert_eq!(skeleton.fps(), 30);
        assert_eq!(skeleton.keyframe(0).map(<[f64]>::len), Some(18));
        assert!(skeleton.keyframe(1).is_none());
        assert!(skeleton.keyframe(usize::MAX / 18).is_none());
        assert!(skeleton.keyframe(usize::MAX).is_none());
        assert!(skeleton.find_joint("Tail").is_none());
    }
}
