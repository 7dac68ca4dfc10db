use std::path::{Path, PathBuf};

use ab_glyph::FontArc;
use clap::{Parser, Subcommand};
use pose_common::annotation::RawPoseAnnotation;
use pose_common::frame_result;
use pose_common::visualizer::Visualizer;
use tracing_subscriber::prelude::*;

#[derive(Debug, Parser)]
#[command(about = "Pose detection post-processing over video frames")]
pub struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the intrinsic properties of a video stream as JSON.
    Probe {
        /// Path to input video file (.mp4/.mkv).
        input: PathBuf,
    },
    /// Decode a video and save every Nth frame as a JPEG.
    Split {
        /// Path to input video file (.mp4/.mkv).
        input: PathBuf,
        /// Directory that receives the per-video frame directory.
        output_dir: PathBuf,
        /// Frame file name prefix.
        #[arg(long, default_value = "frame")]
        prefix: String,
        /// Keep every Nth frame; must be below the stream's frame rate.
        #[arg(long, default_value_t = 1)]
        step: u32,
        /// Fail instead of replacing an existing output directory.
        #[arg(long, action)]
        keep_existing: bool,
    },
    /// Draw detections from a JSON file onto a decoded frame image.
    Render {
        /// Path to the frame image (.jpg/.png).
        image: PathBuf,
        /// JSON file holding the frame's pose annotations.
        detections: PathBuf,
        /// Output image path.
        #[arg(long, short)]
        output: PathBuf,
        /// Proportional rescale factor for the rendered overlay.
        #[arg(long, default_value_t = 1.0)]
        scale: f32,
        /// TrueType font for box labels; labels are skipped without one.
        #[arg(long)]
        font: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,ffmpeg_pose=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    match args.command {
        Command::Probe { input } => {
            let metadata = ffmpeg_frames::meta::read_metadata(&input)?;
            println!("{}", serde_json::to_string_pretty(&metadata)?);
        }
        Command::Split {
            input,
            output_dir,
            prefix,
            step,
            keep_existing,
        } => {
            let options = ffmpeg_frames::sampler::SplitOptions {
                prefix,
                step,
                overwrite: !keep_existing,
            };
            let saved =
                ffmpeg_frames::sampler::split_video_to_frames(&input, &output_dir, &options)?;
            log::info!("{saved} frames written under {output_dir:?}");
        }
        Command::Render {
            image,
            detections,
            output,
            scale,
            font,
        } => {
            let annotations: Vec<RawPoseAnnotation> =
                serde_json::from_reader(std::fs::File::open(&detections)?)?;
            let buffer = image::open(&image)?;
            let frame = frame_result::assemble(buffer, image.as_path(), &annotations)?;

            let visualizer = match font {
                Some(path) => Visualizer::with_font(load_font(&path)?),
                None => Visualizer::new(),
            };
            let rendered = visualizer.render(&frame, scale)?;
            rendered.save(&output)?;
            log::info!(
                "Rendered {} detections from {:?} to {output:?}",
                frame.detections().len(),
                frame.path(),
            );
        }
    }

    Ok(())
}

fn load_font(path: &Path) -> anyhow::Result<FontArc> {
    let bytes = std::fs::read(path)?;
    Ok(FontArc::try_from_vec(bytes)?)
}
