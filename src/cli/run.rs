// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::path::PathBuf;
use std::process;

use crate::cli::args::RunArgs;
use crate::io::{FrameSink, NullSink, SaveResults, find_next_run_dir};
use crate::source::{Source, SourcePlayer};
use crate::{FrameLoop, OnnxPoseEstimator, OverlayConfig, VERSION};
use crate::{error, section, success, verbose, warn};

/// Build the overlay configuration from CLI arguments.
#[must_use]
pub fn config_from_args(args: &RunArgs) -> OverlayConfig {
    let mut config = OverlayConfig::new()
        .with_confidence(args.conf)
        .with_input_size(args.imgsz)
        .with_flip_horizontal(args.flip)
        .with_drop_stale(args.drop_stale)
        .with_colors(args.keypoint_color, args.edge_color)
        .with_max_in_flight(args.max_in_flight)
        .with_fps(args.fps);

    if let Some((width, height)) = args.surface_size() {
        config = config.with_surface_size(width, height);
    }
    config
}

/// Play a source and draw the estimated pose on every frame.
pub fn run_overlay(args: &RunArgs) {
    crate::cli::logging::set_verbose(args.verbose);

    if args.fps <= 0.0 {
        warn!("--fps must be positive, using the default rate");
    }
    let config = config_from_args(args);

    let source = Source::from(args.source.as_str());
    #[cfg(not(feature = "video"))]
    if source.is_video() {
        warn!(
            "Video source detected but 'video' feature is not enabled. Please compile with '--features video'"
        );
        process::exit(1);
    }

    let estimator = match OnnxPoseEstimator::load(&args.model, config.input_size) {
        Ok(e) => e,
        Err(e) => {
            error!("Error loading model: {e}");
            process::exit(1);
        }
    };

    let player = match SourcePlayer::open(source) {
        Ok(p) => p,
        Err(e) => {
            error!("Error opening source: {e}");
            process::exit(1);
        }
    };

    println!("pose-overlay {VERSION} 🚀 Rust ONNX");
    verbose!(
        "Model: {}, imgsz=({}, {}), conf={}",
        args.model,
        config.input_size,
        config.input_size,
        config.confidence_threshold
    );

    let save_dir = args
        .save
        .then(|| find_next_run_dir("runs/pose", "overlay"));
    let sinks = build_sinks(args, save_dir.clone());

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to start runtime: {e}");
            process::exit(1);
        }
    };

    section!("Playing {}", args.source);
    let mut frame_loop = FrameLoop::new(estimator, player, sinks, config);
    let stats = match runtime.block_on(frame_loop.run()) {
        Ok(stats) => stats,
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    };

    success!(
        "{} frames rendered, {} skipped ({} submitted over {} ticks)",
        stats.rendered,
        stats.skipped,
        stats.submitted,
        stats.ticks
    );
    if let Some(dir) = save_dir {
        verbose!("Results saved to {}", dir.display());
    }
}

/// Sinks requested on the command line. Falls back to a [`NullSink`].
fn build_sinks(args: &RunArgs, save_dir: Option<PathBuf>) -> Vec<Box<dyn FrameSink>> {
    let mut sinks: Vec<Box<dyn FrameSink>> = Vec::new();

    if let Some(dir) = save_dir {
        sinks.push(Box::new(SaveResults::new(dir, args.save_frames)));
    }

    #[cfg(feature = "visualize")]
    if args.show {
        sinks.push(Box::new(crate::visualizer::Viewer::new("pose-overlay")));
    }
    #[cfg(not(feature = "visualize"))]
    if args.show {
        warn!("--show requires the 'visualize' feature, frames will not be displayed");
    }

    if sinks.is_empty() {
        sinks.push(Box::new(NullSink));
    }
    sinks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::{Cli, Commands};
    use clap::Parser;

    fn parse(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["app", "run", "-m", "m.onnx", "-s", "clip.mp4"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Run(args) => args,
        }
    }

    #[test]
    fn test_config_from_args() {
        let args = parse(&["--conf", "0.3", "--width", "320", "--height", "240", "--fps", "30"]);
        let config = config_from_args(&args);

        assert!((config.confidence_threshold - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.surface_size, Some((320, 240)));
        assert_eq!(config.tick_interval.as_millis(), 33);
        assert!(!config.drop_stale);
        assert_eq!(config.max_in_flight, Some(2));
    }

    #[test]
    fn test_max_in_flight_flag() {
        let args = parse(&["--max-in-flight", "1"]);
        assert_eq!(config_from_args(&args).max_in_flight, Some(1));
    }

    #[test]
    fn test_default_sink_is_null() {
        let args = parse(&[]);
        let sinks = build_sinks(&args, None);
        assert_eq!(sinks.len(), 1);
    }
}
