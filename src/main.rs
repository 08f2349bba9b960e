use anyhow::{bail, Context, Result};
use bvh_playback::playback::frame_index_at;
use bvh_playback::pose::{compute_frame, rest_pose};
use bvh_playback::{load_skeleton_from_file, Pose, Skeleton};
use clap::Parser;
use std::path::PathBuf;

/// Prints the world position of every joint of a .bvh file at a given frame or time.
#[derive(Parser)]
#[command(name = "bvh_playback", version, about, long_about = None)]
struct Cli {
    /// Path to the .bvh file
    file: PathBuf,

    /// Frame to evaluate (wraps around the clip)
    #[arg(short, long, conflicts_with_all = ["time", "rest"])]
    frame: Option<usize>,

    /// Playback time in seconds; the frame is derived from the file's frame time
    #[arg(short, long, conflicts_with = "rest")]
    time: Option<f64>,

    /// Print the rest (bind) pose instead of a keyframe
    #[arg(long)]
    rest: bool,

    /// List kinematic chains instead of positions
    #[arg(long)]
    chains: bool,

    /// Open the interactive viewer
    #[cfg(feature = "visualize")]
    #[arg(long)]
    view: bool,

    /// Viewer units per file unit (0.01 for centimeter files)
    #[cfg(feature = "visualize")]
    #[arg(long, default_value_t = 0.01)]
    scale: f32,

    /// Verbosity level (can be repeated for more detail)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn print_pose(skeleton: &Skeleton, pose: &Pose) {
    for joint in skeleton.joints() {
        let depth = skeleton.depth(joint.id).unwrap_or_default();
        let Some(p) = pose.position(joint.id) else {
            continue;
        };
        let name = format!("{}{}", "  ".repeat(depth), joint.name);
        println!("{:<32} {:>10.4} {:>10.4} {:>10.4}", name, p.x, p.y, p.z);
    }
}

fn print_chains(skeleton: &Skeleton) {
    for (index, chain) in skeleton.kinematic_chains().iter().enumerate() {
        let names: Vec<&str> = chain
            .iter()
            .filter_map(|&id| skeleton.joint(id))
            .map(|joint| joint.name.as_str())
            .collect();
        println!("chain {}: {}", index, names.join(" -> "));
    }
}

#[cfg(feature = "visualize")]
fn open_viewer(cli: &Cli, skeleton: &Skeleton) -> bool {
    if cli.view {
        let skeleton = std::sync::Arc::new(skeleton.clone());
        bvh_playback::visualize::visualize_skeleton(skeleton, cli.scale, true);
    }
    cli.view
}

#[cfg(not(feature = "visualize"))]
fn open_viewer(_cli: &Cli, _skeleton: &Skeleton) -> bool {
    false
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG still wins over -v
    let default_filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let skeleton = load_skeleton_from_file(&cli.file)
        .with_context(|| format!("failed to load {}", cli.file.display()))?;

    if open_viewer(&cli, &skeleton) {
        return Ok(());
    }

    if cli.chains {
        print_chains(&skeleton);
        return Ok(());
    }

    println!(
        "{} joints, {} channels, {} frames at {} fps ({:.2}s)",
        skeleton.joint_count(),
        skeleton.channel_count(),
        skeleton.num_frames(),
        skeleton.fps(),
        skeleton.duration()
    );

    if cli.rest {
        println!("rest pose");
        print_pose(&skeleton, &rest_pose(&skeleton));
        return Ok(());
    }

    let frame = match (cli.frame, cli.time) {
        (Some(frame), _) => frame % skeleton.num_frames(),
        (None, Some(time)) => {
            if !time.is_finite() {
                bail!("time must be a finite number of seconds, got {}", time);
            }
            frame_index_at(time, skeleton.frame_length(), skeleton.num_frames())
        }
        (None, None) => 0,
    };
    let pose = compute_frame(&skeleton, frame).context("frame out of range")?;
    println!("frame {}", frame);
    print_pose(&skeleton, &pose);
    Ok(())
}
