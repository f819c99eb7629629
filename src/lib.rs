// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

#![allow(clippy::multiple_crate_versions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Pose Overlay
//!
//! Draw single-person pose skeletons over video in real time. A frame loop
//! plays a video or image sequence, runs a pose estimation model on each
//! frame, and draws the confident keypoints and the skeleton edges between
//! them on top of the frame.
//!
//! ## Features
//!
//! - **ONNX Runtime** - Runs MoveNet-style single-pose models through `ort`
//! - **Aspect-preserving fit** - Frames are letterboxed into the output surface
//!   and keypoints go through the same transform
//! - **Confidence gating** - Only keypoints above the threshold are drawn, and
//!   an edge needs both of its endpoints
//! - **Async frame loop** - Estimates overlap; results are drawn as they finish
//! - **Multiple Sources** - Images, directories, glob patterns, and video
//!
//! ## Quick Start (Library)
//!
//! ```no_run
//! use pose_overlay::{FrameLoop, OnnxPoseEstimator, OverlayConfig, SaveResults, SourcePlayer};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = OverlayConfig::new().with_confidence(0.5);
//!     let estimator = OnnxPoseEstimator::load("movenet_lightning.onnx", config.input_size)?;
//!     let source = SourcePlayer::open("walk.mp4".into())?;
//!     let sink = SaveResults::new("runs/pose/overlay".into(), true);
//!
//!     let runtime = tokio::runtime::Runtime::new()?;
//!     let mut frame_loop = FrameLoop::new(estimator, source, sink, config);
//!     let stats = runtime.block_on(frame_loop.run())?;
//!     println!("{} frames rendered", stats.rendered);
//!     Ok(())
//! }
//! ```
//!
//! ## Rendering a Single Frame
//!
//! ```rust
//! use image::{DynamicImage, RgbImage};
//! use pose_overlay::{OverlayRenderer, Pose, RasterSurface};
//!
//! let frame = DynamicImage::ImageRgb8(RgbImage::new(1920, 1080));
//! let mut triples = vec![(0.0, 0.0, 0.0); 17];
//! triples[5] = (900.0, 400.0, 0.9);
//! triples[7] = (850.0, 600.0, 0.95);
//! let pose = Pose::from_triples(&triples);
//!
//! let mut surface = RasterSurface::new(640, 480);
//! let drawn = OverlayRenderer::default().render_frame(&mut surface, &frame, &pose).unwrap();
//! assert_eq!(drawn.edges.len(), 1);
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! # Show the overlay in a window
//! pose-overlay run --model movenet_lightning.onnx --source walk.mp4 --show
//!
//! # Save overlays for a folder of frames
//! pose-overlay run -m movenet_lightning.onnx -s frames/ --save
//!
//! # Fixed output size and a looser threshold
//! pose-overlay run -m movenet_lightning.onnx -s walk.mp4 --width 640 --height 480 --conf 0.4
//! ```
//!
//! **CLI Options:**
//!
//! | Option | Short | Description | Default |
//! |--------|-------|-------------|---------|
//! | `--model` | `-m` | Path to ONNX model | required |
//! | `--source` | `-s` | Input source | required |
//! | `--conf` | | Keypoint confidence threshold | `0.6` |
//! | `--imgsz` | | Model input size | `192` |
//! | `--width`/`--height` | | Output surface size | source size |
//! | `--fps` | | Scheduling rate | `60` |
//! | `--save` | | Save rendered overlays | `false` |
//! | `--show` | | Display overlays in a window | `false` |
//! | `--drop-stale` | | Drop poses older than the last drawn frame | `false` |
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`pose`] | [`Keypoint`], [`Pose`] and [`KeypointIndex`] |
//! | [`filter`] | Confidence gating of keypoints and skeleton edges |
//! | [`letterbox`] | [`FitTransform`] between source and surface space |
//! | [`annotate`] | [`OverlayRenderer`] |
//! | [`surface`] | [`Surface`] trait and [`RasterSurface`] |
//! | [`model`] | [`PoseEstimator`] trait and [`OnnxPoseEstimator`] |
//! | [`source`] | Input sources ([`Source`], [`SourcePlayer`]) |
//! | [`io`] | Frame sinks ([`SaveResults`], [`NullSink`]) |
//! | [`driver`] | The [`FrameLoop`] |
//! | [`config`] | [`OverlayConfig`] |
//! | [`visualizer`] | Colors, the skeleton, and the window viewer |
//! | [`error`] | [`OverlayError`] and [`Result`] |
//!
//! ## Cargo Features
//!
//! - `visualize` (default) - minifb window viewer for `--show`
//! - `video` - video decoding and mp4 output through `video-rs`
//!
//! ## License
//!
//! This project is licensed under [AGPL-3.0](https://ultralytics.com/license).

// Modules
pub mod annotate;
pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod filter;
pub mod io;
pub mod letterbox;
pub mod model;
pub mod pose;
pub mod source;
pub mod surface;
pub mod visualizer;

// Re-export main types for convenience
pub use annotate::OverlayRenderer;
pub use config::OverlayConfig;
pub use driver::{FrameLoop, LoopState, LoopStats, StopHandle};
pub use error::{OverlayError, Result};
pub use filter::{FilteredPose, filter_pose};
pub use io::{FrameSink, NullSink, SaveResults};
pub use letterbox::FitTransform;
pub use model::{EstimateOptions, OnnxPoseEstimator, PoseEstimator};
pub use pose::{Keypoint, KeypointIndex, Pose};
pub use source::{Frame, FrameSource, Source, SourceMeta, SourcePlayer};
pub use surface::{RasterSurface, Surface};
pub use visualizer::{Color, SKELETON};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
