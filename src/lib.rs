//! Parses .bvh (Biovision Hierarchy) motion capture files and replays them:
//! the joint tree and keyframe table come out of [`parse::parse`], [`pose::compute_pose`]
//! turns one keyframe into world transforms, and [`playback::Player`] picks the keyframe
//! from elapsed time.
//!
//! ```
//! use std::sync::Arc;
//! use bvh_playback::{load_skeleton, Player};
//!
//! let text = "\
//! HIERARCHY
//! ROOT Hips
//! {
//!   OFFSET 0 0 0
//!   CHANNELS 3 Xposition Yposition Zposition
//! }
//! MOTION
//! Frames: 2
//! Frame Time: 0.5
//! 0 0 0
//! 1 0 0
//! ";
//! let skeleton = Arc::new(load_skeleton(text).unwrap());
//! let mut player = Player::new(skeleton);
//! player.set_playing(true);
//! let pose = player.tick(0.6);
//! assert_eq!(pose.position(bvh_playback::JointId::ROOT).unwrap().x, 1.0);
//! ```

pub mod error;
pub mod parse;
pub mod playback;
pub mod pose;
pub mod render;
pub mod skeleton;
pub mod transform;
pub mod types;
#[cfg(feature = "visualize")]
pub mod visualize;

pub use error::{FormatError, LoadError};
pub use parse::{load_skeleton, load_skeleton_from_file, parse};
pub use playback::{frame_index_at, PlaybackState, Player};
pub use pose::{compute_pose, compute_pose_into, rest_pose, Pose};
pub use render::{RenderTarget, Rig};
pub use skeleton::{Bone, BoneEnd, EndSite, Joint, Motion, Node, Skeleton};
pub use types::{Axis, JointId, RotationOrder};
