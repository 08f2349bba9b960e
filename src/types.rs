use cgmath::{Matrix4, Point3, Quaternion as CgQuaternion, Vector3};
use std::fmt;

/////////////////////////////////////////////////////////////////////////////////////////////////

pub type Index = usize;
pub type Depth = usize;
pub type Quaternion = CgQuaternion<f64>;
pub type Position = Vector3<f64>;
pub type Point = Point3<f64>;
pub type Transform = Matrix4<f64>;

/////////////////////////////////////////////////////////////////////////////////////////////////

/// Index of an animatable joint, assigned depth-first (root is 0). End sites never get one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JointId(pub Index);

impl JointId {
    pub const ROOT: JointId = JointId(0);

    pub fn index(self) -> Index {
        self.0
    }
}

impl fmt::Display for JointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// A principal axis. Discriminants double as the component index of a vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> Index {
        self as Index
    }

    pub fn letter(self) -> char {
        match self {
            Axis::X => 'X',
            Axis::Y => 'Y',
            Axis::Z => 'Z',
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Axis order of a rotation, e.g. `[Z, X, Y]` for `Zrotation Xrotation Yrotation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RotationOrder(pub [Axis; 3]);

impl RotationOrder {
    pub fn axes(&self) -> &[Axis; 3] {
        &self.0
    }
}

impl fmt::Display for RotationOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|axis| write!(f, "{}", axis))
    }
}
