use approx::{abs_diff_eq, assert_abs_diff_eq};
use bvh_playback::pose::{compute_frame, local_transform};
use bvh_playback::transform::{rotate_x, rotate_y, rotate_z, translate};
use bvh_playback::types::{Point, Position};
use bvh_playback::*;
use cgmath::SquareMatrix;

const HUMANOID: &str = include_str!("data/mini_humanoid.bvh");

fn humanoid() -> Skeleton {
    parse(HUMANOID).unwrap()
}

#[test]
fn loads_fixture_from_disk() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/mini_humanoid.bvh");
    let skeleton = load_skeleton_from_file(path).unwrap();
    assert_eq!(skeleton, humanoid());
    assert_eq!(skeleton.joint_count(), 8);
    assert_eq!(skeleton.channel_count(), 24);
    assert_eq!(skeleton.num_frames(), 4);
    assert_eq!(skeleton.fps(), 120);

    let chains: Vec<Vec<usize>> = skeleton
        .kinematic_chains()
        .into_iter()
        .map(|chain| chain.into_iter().map(JointId::index).collect())
        .collect();
    assert_eq!(chains, vec![vec![0, 1, 2], vec![3, 4], vec![5, 6, 7]]);
}

#[test]
fn two_joint_round_trip() {
    let text = "\
HIERARCHY
ROOT Root
{
  OFFSET 0 0 0
  CHANNELS 6 Xposition Yposition Zposition Zrotation Xrotation Yrotation
  JOINT Tip
  {
    OFFSET 0 10 0
  }
}
MOTION
Frames: 1
Frame Time: 0.04
1 2 3 90 0 0
";
    let skeleton = parse(text).unwrap();
    let pose = compute_frame(&skeleton, 0).unwrap();
    let tip = skeleton.find_joint("Tip").unwrap();
    assert_abs_diff_eq!(pose.position(JointId::ROOT).unwrap(), Point::new(1.0, 2.0, 3.0), epsilon = 1e-5);
    assert_abs_diff_eq!(pose.position(tip.id).unwrap(), Point::new(-9.0, 2.0, 3.0), epsilon = 1e-5);
}

#[test]
fn hand_computed_humanoid_frame() {
    let skeleton = humanoid();
    let pose = compute_frame(&skeleton, 1).unwrap();
    let position = |name: &str| pose.position(skeleton.find_joint(name).unwrap().id).unwrap();

    // hips yawed 90 degrees: +X offsets end up along -Z
    assert_abs_diff_eq!(position("Hips"), Point::new(5.0, 90.0, 1.0), epsilon = 1e-5);
    assert_abs_diff_eq!(position("LeftUpLeg"), Point::new(5.0, 90.0, -9.0), epsilon = 1e-5);
    assert_abs_diff_eq!(position("RightUpLeg"), Point::new(5.0, 90.0, 11.0), epsilon = 1e-5);

    let half_sqrt3 = 3f64.sqrt() / 2.0;
    assert_abs_diff_eq!(
        position("LeftLeg"),
        Point::new(5.0, 90.0 - 40.0 * half_sqrt3, -9.0 - 20.0),
        epsilon = 1e-5
    );
}

#[test]
fn rotation_order_changes_the_result() {
    let with_order = |channels: &str, row: &str| {
        let text = format!(
            "HIERARCHY\nROOT J\n{{\nOFFSET 0 0 0\nCHANNELS 3 {}\n}}\nMOTION\nFrames: 1\nFrame Time: 0.1\n{}\n",
            channels, row
        );
        let skeleton = parse(&text).unwrap();
        *compute_frame(&skeleton, 0).unwrap().transform(JointId::ROOT).unwrap()
    };

    // same angles (x = 30, y = 60, z = 45), different declared order
    let xzy = with_order("Xrotation Zrotation Yrotation", "30 45 60");
    let zxy = with_order("Zrotation Xrotation Yrotation", "45 30 60");

    assert_ne!(xzy, zxy);
    assert!(!abs_diff_eq!(xzy, zxy, epsilon = 1e-3));
    assert_abs_diff_eq!(xzy, rotate_x(30.0) * rotate_z(45.0) * rotate_y(60.0), epsilon = 1e-12);
    assert_abs_diff_eq!(zxy, rotate_z(45.0) * rotate_x(30.0) * rotate_y(60.0), epsilon = 1e-12);
}

#[test]
fn compute_pose_is_deterministic() {
    let skeleton = humanoid();
    for frame in 0..skeleton.num_frames() {
        let row = skeleton.keyframe(frame).unwrap();
        let first = compute_pose(&skeleton, row);
        let second = compute_pose(&skeleton, row);
        assert_eq!(first, second);
        for (id, m) in first.iter() {
            assert_eq!(m, second.transform(id).unwrap());
        }
    }
}

#[test]
fn frame_index_under_jitter() {
    let frames: Vec<usize> = [0.0, 0.05, 0.31, 0.99, 1.00]
        .into_iter()
        .map(|elapsed| frame_index_at(elapsed, 0.1, 10))
        .collect();
    assert_eq!(frames, [0, 0, 3, 9, 0]);
}

#[test]
fn end_sites_get_no_transform() {
    let skeleton = humanoid();
    let pose = compute_frame(&skeleton, 0).unwrap();

    // 8 joints, 3 end sites: only joints are keyed
    assert_eq!(pose.len(), skeleton.joint_count());
    let ids: Vec<JointId> = pose.iter().map(|(id, _)| id).collect();
    let joint_ids: Vec<JointId> = skeleton.joints().map(|joint| joint.id).collect();
    assert_eq!(ids, joint_ids);
    assert!(pose.transform(JointId(skeleton.joint_count())).is_none());

    let head = skeleton.find_joint("Head").unwrap();
    let end_site = head.end_sites().next().unwrap();
    let tip = pose.endpoint(head.id, end_site.offset).unwrap();
    assert_abs_diff_eq!(tip, Point::new(0.0, 165.0, 0.0), epsilon = 1e-9);
}

#[test]
fn short_motion_row_is_a_format_error() {
    let mut lines: Vec<&str> = HUMANOID.lines().collect();
    let last = lines.len() - 1;
    let truncated = lines[last].rsplit_once(' ').unwrap().0.to_string();
    lines[last] = &truncated;
    let text = lines.join("\n");

    match parse(&text) {
        Err(FormatError::RowLength { expected, found, .. }) => {
            assert_eq!(expected, 24);
            assert_eq!(found, 23);
        }
        other => panic!("expected a row length error, got {:?}", other),
    }
}

#[test]
fn static_joint_keeps_its_offset() {
    let skeleton = humanoid();
    let neck = skeleton.find_joint("Neck").unwrap();
    let spine = skeleton.parent(neck.id).unwrap();
    assert!(neck.is_static());

    let expected = translate(Position::new(0.0, 40.0, 0.0));
    let mut root_positions = Vec::new();
    for frame in 0..skeleton.num_frames() {
        let row = skeleton.keyframe(frame).unwrap();
        assert_eq!(local_transform(neck, row), expected);

        let pose = compute_pose(&skeleton, row);
        let local = pose.transform(spine).unwrap().invert().unwrap() * pose.transform(neck.id).unwrap();
        assert_abs_diff_eq!(local, expected, epsilon = 1e-9);
        root_positions.push(pose.position(JointId::ROOT).unwrap());
    }
    // the root really moves
    assert_ne!(root_positions[0], root_positions[3]);
}

#[test]
fn player_drives_the_same_poses() {
    let skeleton = std::sync::Arc::new(humanoid());
    let mut player = Player::new(skeleton.clone());
    player.set_playing(true);
    let frame_length = skeleton.frame_length();

    player.tick(frame_length * 2.5);
    assert_eq!(player.frame(), 2);
    assert_eq!(player.pose(), &compute_frame(&skeleton, 2).unwrap());

    // a late tick that skips past the end wraps around
    player.tick(frame_length * 2.0);
    assert_eq!(player.frame(), 0);
}
