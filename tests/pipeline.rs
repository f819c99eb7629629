// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! End-to-end overlay rendering on real sources and sinks.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use image::{DynamicImage, Rgb, RgbImage};
use pose_overlay::{
    Color, EstimateOptions, FitTransform, FrameLoop, KeypointIndex, OverlayConfig,
    OverlayRenderer, Pose, PoseEstimator, RasterSurface, Result, SaveResults, Source, SourcePlayer,
    SKELETON, filter_pose,
};

const GRAY: [u8; 3] = [90, 90, 90];

fn gray_frame(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(GRAY)))
}

fn pose_with(points: &[(KeypointIndex, f32, f32, f32)]) -> Pose {
    let mut triples = vec![(0.0, 0.0, 0.0); 17];
    for &(kp, x, y, c) in points {
        triples[kp.index()] = (x, y, c);
    }
    Pose::from_triples(&triples)
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("pose-overlay-it-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

#[test]
fn low_confidence_shoulder_hides_its_arm_edge() {
    let pose = pose_with(&[
        (KeypointIndex::LeftShoulder, 100.0, 100.0, 0.5),
        (KeypointIndex::LeftElbow, 300.0, 200.0, 0.9),
    ]);

    let filtered = filter_pose(&pose, &SKELETON, 0.6);
    assert_eq!(filtered.keypoints.len(), 1);
    assert_eq!(filtered.keypoints[0].id, KeypointIndex::LeftElbow.index());
    assert!(filtered.edges.is_empty());

    let mut surface = RasterSurface::new(640, 480);
    OverlayRenderer::default()
        .render_frame(&mut surface, &gray_frame(640, 480), &pose)
        .unwrap();

    let image = surface.image();
    assert_eq!(image.get_pixel(300, 200).0, [255, 0, 0]);
    assert_eq!(image.get_pixel(100, 100).0, GRAY);
    // Midpoint of the would-be edge stays untouched.
    assert_eq!(image.get_pixel(200, 150).0, GRAY);
}

#[test]
fn confident_edge_is_drawn_in_surface_space() {
    // 1920x1080 into 640x480: scale 1/3, offset (0, 60).
    let fit = FitTransform::compute((1920, 1080), (640, 480)).unwrap();
    assert!((fit.draw_width - 640.0).abs() < 1e-3);
    assert!((fit.draw_height - 360.0).abs() < 1e-3);
    assert!((fit.offset_y - 60.0).abs() < 1e-3);

    let pose = pose_with(&[
        (KeypointIndex::LeftShoulder, 300.0, 540.0, 0.9),
        (KeypointIndex::RightShoulder, 1500.0, 540.0, 0.9),
    ]);

    let mut surface = RasterSurface::new(640, 480);
    let renderer = OverlayRenderer::new(&OverlayConfig::default().with_colors(Color::RED, Color::GREEN));
    renderer
        .render_frame(&mut surface, &gray_frame(1920, 1080), &pose)
        .unwrap();

    let image = surface.image();
    // Letterbox bars stay background black.
    assert_eq!(image.get_pixel(320, 10).0, [0, 0, 0]);
    assert_eq!(image.get_pixel(320, 470).0, [0, 0, 0]);
    // Edge between (100, 240) and (500, 240).
    assert_eq!(image.get_pixel(300, 240).0, [0, 255, 0]);
    // Circle pixels off the stroke keep the keypoint color.
    assert_eq!(image.get_pixel(100, 244).0, [255, 0, 0]);
}

/// Puts a confident nose at the frame center.
struct CenterNose;

impl PoseEstimator for CenterNose {
    #[allow(clippy::cast_precision_loss)]
    fn estimate(
        &self,
        frame: Arc<DynamicImage>,
        _options: EstimateOptions,
    ) -> impl Future<Output = Result<Pose>> + Send {
        let (cx, cy) = (frame.width() as f32 / 2.0, frame.height() as f32 / 2.0);
        async move { Ok(pose_with(&[(KeypointIndex::Nose, cx, cy, 0.95)])) }
    }
}

#[tokio::test]
async fn image_directory_is_rendered_and_saved() {
    let input = temp_dir("input");
    let output = temp_dir("output");
    std::fs::create_dir_all(&input).unwrap();
    for name in ["a.png", "b.png", "c.png"] {
        RgbImage::from_pixel(80, 60, Rgb(GRAY))
            .save(input.join(name))
            .unwrap();
    }

    let source = SourcePlayer::open(Source::from(input.clone())).unwrap();
    let config = OverlayConfig::default().with_tick_interval(Duration::from_millis(2));
    let mut frame_loop = FrameLoop::new(
        CenterNose,
        source,
        SaveResults::new(output.clone(), false),
        config,
    );

    let stats = tokio::time::timeout(Duration::from_secs(10), frame_loop.run())
        .await
        .expect("frame loop did not finish")
        .unwrap();

    assert_eq!(stats.rendered, 3);
    assert_eq!(frame_loop.sink().saved(), 3);
    for name in ["a.png", "b.png", "c.png"] {
        let saved = image::open(output.join(name)).unwrap().to_rgb8();
        assert_eq!(saved.dimensions(), (80, 60));
        assert_eq!(saved.get_pixel(40, 30).0, [255, 0, 0]);
        assert_eq!(saved.get_pixel(5, 5).0, GRAY);
    }

    let _ = std::fs::remove_dir_all(&input);
    let _ = std::fs::remove_dir_all(&output);
}
