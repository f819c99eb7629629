// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Overlay rendering: the video frame plus confident keypoints and skeleton edges.

use image::DynamicImage;

use crate::config::OverlayConfig;
use crate::error::Result;
use crate::filter::{FilteredPose, filter_pose};
use crate::letterbox::FitTransform;
use crate::pose::Pose;
use crate::surface::Surface;
use crate::visualizer::Color;
use crate::visualizer::skeleton::SKELETON;

/// Draws pose overlays onto a [`Surface`].
#[derive(Debug, Clone)]
pub struct OverlayRenderer {
    threshold: f32,
    keypoint_radius: f32,
    line_width: f32,
    keypoint_color: Color,
    edge_color: Color,
    skeleton: Vec<[usize; 2]>,
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self::new(&OverlayConfig::default())
    }
}

impl OverlayRenderer {
    /// Create a renderer using the default body skeleton.
    #[must_use]
    pub fn new(config: &OverlayConfig) -> Self {
        Self {
            threshold: config.confidence_threshold,
            keypoint_radius: config.keypoint_radius,
            line_width: config.line_width,
            keypoint_color: config.keypoint_color,
            edge_color: config.edge_color,
            skeleton: SKELETON.to_vec(),
        }
    }

    /// Replace the skeleton edge set.
    #[must_use]
    pub fn with_skeleton(mut self, skeleton: &[[usize; 2]]) -> Self {
        self.skeleton = skeleton.to_vec();
        self
    }

    /// Confidence threshold used by [`Self::render_frame`].
    #[must_use]
    pub const fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Skeleton edges used by [`Self::render_frame`].
    #[must_use]
    pub fn skeleton(&self) -> &[[usize; 2]] {
        &self.skeleton
    }

    /// Draw one overlay in a fixed order.
    ///
    /// Clears the surface, draws the frame through `fit`, then a filled circle
    /// per keypoint, then a line per edge. Keypoint positions go through the
    /// same `fit` as the frame.
    pub fn render<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        frame: &DynamicImage,
        fit: &FitTransform,
        pose: &FilteredPose,
    ) {
        surface.clear();
        surface.draw_image(frame, fit.offset_x, fit.offset_y, fit.draw_width, fit.draw_height);

        for kp in &pose.keypoints {
            let (x, y) = fit.apply(kp.x, kp.y);
            surface.draw_circle(x, y, self.keypoint_radius, self.keypoint_color);
        }

        for (start, end) in &pose.edges {
            surface.draw_line(
                fit.apply(start.x, start.y),
                fit.apply(end.x, end.y),
                self.line_width,
                self.edge_color,
            );
        }
    }

    /// Fit, filter and draw a frame with its estimated pose.
    ///
    /// # Errors
    ///
    /// Returns [`crate::OverlayError::InvalidDimensions`] if the frame or the
    /// surface is empty. The surface is left untouched in that case.
    pub fn render_frame<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        frame: &DynamicImage,
        pose: &Pose,
    ) -> Result<FilteredPose> {
        let fit = FitTransform::compute((frame.width(), frame.height()), surface.dimensions())?;
        let filtered = filter_pose(pose, &self.skeleton, self.threshold);
        self.render(surface, frame, &fit, &filtered);
        Ok(filtered)
    }
}
