// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use clap::{Args, Parser, Subcommand};

use crate::config::DEFAULT_INPUT_SIZE;
use crate::filter::DEFAULT_CONFIDENCE_THRESHOLD;
use crate::visualizer::Color;

/// Default cap on concurrent pose estimates for the command line.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 2;

/// CLI arguments parser.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = r#"Run Options:
    --model, -m <MODEL>    Path to a single-pose ONNX model (MoveNet layout)
    --source, -s <SOURCE>  Input source (image, directory, glob, or video)
    --conf <CONF>          Keypoint confidence threshold [default: 0.6]
    --imgsz <IMGSZ>        Model input size [default: 192]
    --width <WIDTH>        Output surface width
    --height <HEIGHT>      Output surface height
    --fps <FPS>            Scheduling rate in ticks per second [default: 60]
    --max-in-flight <N>    Pose estimates allowed to run at once [default: 2]
    --keypoint-color <C>   Keypoint color, name or #rrggbb [default: red]
    --edge-color <C>       Skeleton line color, name or #rrggbb [default: blue]
    --save                 Save rendered overlays to runs/pose/overlay
    --show                 Display overlays in a window
    --drop-stale           Discard poses that finish after a newer frame was drawn
    --verbose              Show verbose output

Examples:
    pose-overlay run --model movenet_lightning.onnx --source walk.mp4 --show
    pose-overlay run -m movenet_lightning.onnx -s frames/ --save
    pose-overlay run -m movenet_thunder.onnx -s walk.mp4 --imgsz 256 --conf 0.4
    pose-overlay run -m movenet_lightning.onnx -s walk.mp4 --width 640 --height 480 --show"#)]
pub struct Cli {
    #[command(subcommand)]
    /// Subcommand to execute.
    pub command: Commands,
}

/// Commands for the CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Play a source and draw the estimated pose over every frame
    Run(RunArgs),
}

/// Arguments for the run command.
#[derive(Args, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Path to a single-pose ONNX model file
    #[arg(short, long)]
    pub model: String,

    /// Input source (image, directory, glob, or video)
    #[arg(short, long)]
    pub source: String,

    /// Keypoint confidence threshold
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE_THRESHOLD)]
    pub conf: f32,

    /// Model input size
    #[arg(long, default_value_t = DEFAULT_INPUT_SIZE)]
    pub imgsz: u32,

    /// Output surface width (defaults to the source width)
    #[arg(long, requires = "height")]
    pub width: Option<u32>,

    /// Output surface height (defaults to the source height)
    #[arg(long, requires = "width")]
    pub height: Option<u32>,

    /// Scheduling rate in ticks per second
    #[arg(long, default_value_t = 60.0)]
    pub fps: f32,

    /// Pose estimates allowed to run at once; ticks past the cap are skipped
    #[arg(long, default_value_t = DEFAULT_MAX_IN_FLIGHT)]
    pub max_in_flight: usize,

    /// Save rendered overlays to runs/pose/overlay
    #[arg(long, default_value_t = false)]
    pub save: bool,

    /// Save individual frames for video sources instead of an mp4
    #[arg(long, default_value_t = false)]
    pub save_frames: bool,

    /// Display overlays in a window
    #[arg(long, default_value_t = false)]
    pub show: bool,

    /// Keypoint color (name or #rrggbb)
    #[arg(long, default_value = "red")]
    pub keypoint_color: Color,

    /// Skeleton line color (name or #rrggbb)
    #[arg(long, default_value = "blue")]
    pub edge_color: Color,

    /// Mirror estimated poses horizontally
    #[arg(long, default_value_t = false)]
    pub flip: bool,

    /// Discard poses that finish after a newer frame was drawn
    #[arg(long, default_value_t = false)]
    pub drop_stale: bool,

    /// Show verbose output
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub verbose: bool,
}

impl RunArgs {
    /// Explicit surface size, if both dimensions were given.
    #[must_use]
    pub const fn surface_size(&self) -> Option<(u32, u32)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some((w, h)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_args_defaults() {
        let args = Cli::parse_from(["app", "run", "--model", "movenet.onnx", "--source", "walk.mp4"]);
        match args.command {
            Commands::Run(run_args) => {
                assert_eq!(run_args.model, "movenet.onnx");
                assert_eq!(run_args.source, "walk.mp4");
                assert!((run_args.conf - 0.6).abs() < f32::EPSILON);
                assert_eq!(run_args.imgsz, 192);
                assert!((run_args.fps - 60.0).abs() < f32::EPSILON);
                assert_eq!(run_args.max_in_flight, DEFAULT_MAX_IN_FLIGHT);
                assert!(run_args.surface_size().is_none());
                assert!(!run_args.save);
                assert!(!run_args.show);
                assert!(!run_args.drop_stale);
                assert!(run_args.verbose);
                assert_eq!(run_args.keypoint_color, Color::RED);
                assert_eq!(run_args.edge_color, Color::BLUE);
            }
        }
    }

    #[test]
    fn test_run_args_custom() {
        let args = Cli::parse_from([
            "app",
            "run",
            "-m",
            "thunder.onnx",
            "-s",
            "frames/",
            "--conf",
            "0.4",
            "--imgsz",
            "256",
            "--width",
            "640",
            "--height",
            "480",
            "--drop-stale",
            "--max-in-flight",
            "4",
            "--edge-color",
            "#00ff00",
            "--verbose",
            "false",
        ]);
        match args.command {
            Commands::Run(run_args) => {
                assert_eq!(run_args.model, "thunder.onnx");
                assert!((run_args.conf - 0.4).abs() < f32::EPSILON);
                assert_eq!(run_args.imgsz, 256);
                assert_eq!(run_args.surface_size(), Some((640, 480)));
                assert!(run_args.drop_stale);
                assert_eq!(run_args.max_in_flight, 4);
                assert_eq!(run_args.edge_color, Color::GREEN);
                assert!(!run_args.verbose);
            }
        }
    }

    #[test]
    fn test_width_requires_height() {
        let result = Cli::try_parse_from([
            "app", "run", "-m", "a.onnx", "-s", "b.mp4", "--width", "640",
        ]);
        assert!(result.is_err());
    }
}
