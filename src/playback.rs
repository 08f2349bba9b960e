use crate::pose::{compute_pose_into, Pose};
use crate::render::Rig;
use crate::skeleton::Skeleton;
use crate::transform::Transformable;
use log::debug;
use std::sync::Arc;

/// Frame shown `elapsed` seconds into a looping clip.
/// Computed from the absolute time, so late or skipped ticks never drift.
pub fn frame_index_at(elapsed: f64, frame_length: f64, num_frames: usize) -> usize {
    if num_frames == 0 || frame_length.is_nan() || frame_length <= 0.0 || !elapsed.is_finite() {
        return 0;
    }
    (elapsed / frame_length).floor().rem_euclid(num_frames as f64) as usize
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
}

/// Time-driven playback of a skeleton's keyframes. Starts stopped, on frame 0.
#[derive(Debug, Clone)]
pub struct Player {
    skeleton: Arc<Skeleton>,
    state: PlaybackState,
    /// Seconds of play time; only advances while playing.
    clock: f64,
    frame: usize,
    pose: Pose,
}

impl Player {
    pub fn new(skeleton: Arc<Skeleton>) -> Self {
        let mut pose = Pose::identity(&skeleton);
        if let Some(row) = skeleton.keyframe(0) {
            compute_pose_into(&skeleton, row, &mut pose);
        }
        Player {
            skeleton,
            state: PlaybackState::Stopped,
            clock: 0.0,
            frame: 0,
            pose,
        }
    }

    pub fn skeleton(&self) -> &Arc<Skeleton> {
        &self.skeleton
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn set_playing(&mut self, playing: bool) {
        let state = if playing {
            PlaybackState::Playing
        } else {
            PlaybackState::Stopped
        };
        if state != self.state {
            debug!("playback {:?} -> {:?} at frame {}", self.state, state, self.frame);
            self.state = state;
        }
    }

    pub fn toggle(&mut self) {
        self.set_playing(!self.is_playing());
    }

    pub fn frame(&self) -> usize {
        self.frame
    }

    /// Play time in seconds.
    pub fn elapsed(&self) -> f64 {
        self.clock
    }

    /// Last computed pose.
    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    /// Advances play time by `delta` seconds (ignored while stopped) and recomputes the pose.
    pub fn tick(&mut self, delta: f64) -> &Pose {
        if self.is_playing() {
            if delta.is_finite() && delta > 0.0 {
                self.clock += delta;
            }
            self.refresh();
        }
        &self.pose
    }

    /// [`Player::tick`], then pushes the pose into the rig's handles.
    pub fn tick_into<H: Transformable>(&mut self, delta: f64, rig: &mut Rig<H>) {
        self.tick(delta);
        rig.apply(&self.pose);
    }

    /// Jumps to an absolute play time. Works while stopped.
    pub fn seek(&mut self, time: f64) {
        if time.is_finite() {
            self.clock = time;
        }
        self.refresh();
    }

    /// Stops playback and moves `frames` frames forward (or back), wrapping around the clip.
    pub fn step(&mut self, frames: isize) {
        self.set_playing(false);
        let num_frames = self.skeleton.num_frames() as isize;
        let frame = (self.frame as isize + frames).rem_euclid(num_frames.max(1));
        // middle of the frame so float error never lands on the previous one
        self.seek((frame as f64 + 0.5) * self.skeleton.frame_length());
    }

    fn refresh(&mut self) {
        let frame = frame_index_at(self.clock, self.skeleton.frame_length(), self.skeleton.num_frames());
        self.frame = frame;
        if let Some(row) = self.skeleton.keyframe(frame) {
            compute_pose_into(&self.skeleton, row, &mut self.pose);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;
    use crate::pose::compute_frame;
    use crate::types::JointId;

    fn slide() -> Arc<Skeleton> {
        let mut text = String::from(
            "HIERARCHY\nROOT Hips\n{\nOFFSET 0 0 0\nCHANNELS 3 Xposition Yposition Zposition\n}\nMOTION\nFrames: 10\nFrame Time: 0.1\n",
        );
        for frame in 0..10 {
            text += &format!("{} 0 0\n", frame);
        }
        Arc::new(parse(&text).unwrap())
    }

    #[test]
    fn frame_index_is_time_based_and_wraps() {
        let frames: Vec<usize> = [0.0, 0.05, 0.31, 0.99, 1.00]
            .iter()
            .map(|&t| frame_index_at(t, 0.1, 10))
            .collect();
        assert_eq!(frames, vec![0, 0, 3, 9, 0]);
        assert_eq!(frame_index_at(2.55, 0.1, 10), 5);
        assert_eq!(frame_index_at(-0.05, 0.1, 10), 9);
    }

    #[test]
    fn frame_index_is_total() {
        assert_eq!(frame_index_at(1.0, 0.1, 0), 0);
        assert_eq!(frame_index_at(1.0, 0.0, 10), 0);
        assert_eq!(frame_index_at(f64::NAN, 0.1, 10), 0);
    }

    #[test]
    fn starts_stopped_on_first_frame() {
        let mut player = Player::new(slide());
        assert_eq!(player.state(), PlaybackState::Stopped);
        player.tick(0.5);
        assert_eq!(player.frame(), 0);
        assert_eq!(player.elapsed(), 0.0);
        assert_eq!(player.pose().position(JointId::ROOT).unwrap().x, 0.0);
    }

    #[test]
    fn late_ticks_skip_frames() {
        let mut player = Player::new(slide());
        player.set_playing(true);
        player.tick(0.05);
        assert_eq!(player.frame(), 0);
        player.tick(0.26);
        assert_eq!(player.frame(), 3);
        assert_eq!(player.pose().position(JointId::ROOT).unwrap().x, 3.0);
        player.tick(0.75);
        assert_eq!(player.frame(), 0);
    }

    #[test]
    fn stopping_freezes_pose() {
        let skeleton = slide();
        let mut player = Player::new(skeleton.clone());
        player.set_playing(true);
        player.tick(0.45);
        let frozen = player.pose().clone();
        player.set_playing(false);
        player.tick(0.3);
        assert_eq!(player.frame(), 4);
        assert_eq!(player.pose(), &frozen);
        assert_eq!(&frozen, &compute_frame(&skeleton, 4).unwrap());

        player.toggle();
        assert!(player.is_playing());
        player.tick(0.1);
        assert_eq!(player.frame(), 5);
    }

    #[test]
    fn step_wraps_and_stops() {
        let mut player = Player::new(slide());
        player.set_playing(true);
        player.step(-1);
        assert!(!player.is_playing());
        assert_eq!(player.frame(), 9);
        player.step(2);
        assert_eq!(player.frame(), 1);
    }

    #[test]
    fn seek_works_while_stopped() {
        let mut player = Player::new(slide());
        player.seek(0.75);
        assert_eq!(player.frame(), 7);
        assert_eq!(player.pose().position(JointId::ROOT).unwrap().x, 7.0);
    }
}
