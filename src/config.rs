// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Overlay configuration.
//!
//! This module defines the [`OverlayConfig`] struct, which controls the
//! confidence threshold, drawing style, output surface size, and frame loop
//! scheduling.

use std::time::Duration;

use crate::filter::DEFAULT_CONFIDENCE_THRESHOLD;
use crate::visualizer::Color;

/// Default square model input size for MoveNet-style single-pose models.
pub const DEFAULT_INPUT_SIZE: u32 = 192;

/// Default scheduling interval, roughly one display refresh at 60 Hz.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_micros(16_600);

/// Configuration for the overlay pipeline.
///
/// Uses a builder pattern for convenient construction.
///
/// # Example
///
/// ```rust
/// use pose_overlay::OverlayConfig;
///
/// let config = OverlayConfig::new()
///     .with_confidence(0.5)
///     .with_keypoint_radius(4.0)
///     .with_surface_size(640, 480);
/// ```
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    /// Keypoints at or below this confidence are not drawn.
    pub confidence_threshold: f32,
    /// Radius of keypoint circles in surface pixels.
    pub keypoint_radius: f32,
    /// Stroke width of skeleton lines in surface pixels.
    pub line_width: f32,
    /// Keypoint fill color.
    pub keypoint_color: Color,
    /// Skeleton line color.
    pub edge_color: Color,
    /// Surface background shown around a letterboxed frame.
    pub background: Color,
    /// Explicit output surface size (width, height).
    /// If `None`, the surface takes the source's intrinsic size at the first frame.
    pub surface_size: Option<(u32, u32)>,
    /// Square model input size in pixels.
    pub input_size: u32,
    /// Mirror estimated poses horizontally.
    pub flip_horizontal: bool,
    /// Time between scheduling ticks.
    pub tick_interval: Duration,
    /// Discard estimates that complete after a newer frame was already drawn.
    pub drop_stale: bool,
    /// Cap on concurrent estimates. `None` means unbounded.
    pub max_in_flight: Option<usize>,
    /// Stop the loop once the source is exhausted and no estimates are pending.
    pub stop_on_exhausted: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            keypoint_radius: 5.0,
            line_width: 2.0,
            keypoint_color: Color::RED,
            edge_color: Color::BLUE,
            background: Color::BLACK,
            surface_size: None,
            input_size: DEFAULT_INPUT_SIZE,
            flip_horizontal: false,
            tick_interval: DEFAULT_TICK_INTERVAL,
            drop_stale: false,
            max_in_flight: None,
            stop_on_exhausted: true,
        }
    }
}

impl OverlayConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the confidence threshold.
    ///
    /// Keypoints and edges with a confidence at or below this value are not drawn.
    #[must_use]
    pub const fn with_confidence(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Set the keypoint circle radius.
    #[must_use]
    pub const fn with_keypoint_radius(mut self, radius: f32) -> Self {
        self.keypoint_radius = radius;
        self
    }

    /// Set the skeleton line width.
    #[must_use]
    pub const fn with_line_width(mut self, width: f32) -> Self {
        self.line_width = width;
        self
    }

    /// Set the keypoint and skeleton colors.
    #[must_use]
    pub const fn with_colors(mut self, keypoint: Color, edge: Color) -> Self {
        self.keypoint_color = keypoint;
        self.edge_color = edge;
        self
    }

    /// Set the surface background color.
    #[must_use]
    pub const fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    /// Fix the output surface size instead of taking it from the source.
    #[must_use]
    pub const fn with_surface_size(mut self, width: u32, height: u32) -> Self {
        self.surface_size = Some((width, height));
        self
    }

    /// Set the square model input size.
    #[must_use]
    pub const fn with_input_size(mut self, size: u32) -> Self {
        self.input_size = size;
        self
    }

    /// Mirror estimated poses horizontally.
    #[must_use]
    pub const fn with_flip_horizontal(mut self, flip: bool) -> Self {
        self.flip_horizontal = flip;
        self
    }

    /// Set the time between scheduling ticks.
    #[must_use]
    pub const fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set the tick interval from a frame rate.
    ///
    /// Non-positive rates keep the current interval.
    #[must_use]
    pub fn with_fps(mut self, fps: f32) -> Self {
        if fps > 0.0 && fps.is_finite() {
            self.tick_interval = Duration::from_secs_f32(1.0 / fps);
        }
        self
    }

    /// Discard estimates older than the last drawn frame.
    #[must_use]
    pub const fn with_drop_stale(mut self, drop_stale: bool) -> Self {
        self.drop_stale = drop_stale;
        self
    }

    /// Cap the number of concurrent estimates.
    #[must_use]
    pub const fn with_max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = Some(max);
        self
    }

    /// Keep the loop alive after the source is exhausted.
    #[must_use]
    pub const fn with_stop_on_exhausted(mut self, stop: bool) -> Self {
        self.stop_on_exhausted = stop;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = OverlayConfig::default();
        assert!((config.confidence_threshold - 0.6).abs() < f32::EPSILON);
        assert!((config.keypoint_radius - 5.0).abs() < f32::EPSILON);
        assert!((config.line_width - 2.0).abs() < f32::EPSILON);
        assert_eq!(config.keypoint_color, Color::RED);
        assert_eq!(config.edge_color, Color::BLUE);
        assert!(!config.flip_horizontal);
        assert!(config.surface_size.is_none());
        assert!(config.stop_on_exhausted);
    }

    #[test]
    fn test_config_builder() {
        let config = OverlayConfig::new()
            .with_confidence(0.3)
            .with_surface_size(640, 480)
            .with_input_size(256)
            .with_max_in_flight(2)
            .with_fps(30.0);

        assert!((config.confidence_threshold - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.surface_size, Some((640, 480)));
        assert_eq!(config.input_size, 256);
        assert_eq!(config.max_in_flight, Some(2));
        assert_eq!(config.tick_interval.as_millis(), 33);
    }

    #[test]
    fn test_invalid_fps_keeps_interval() {
        let config = OverlayConfig::new().with_fps(0.0);
        assert_eq!(config.tick_interval, DEFAULT_TICK_INTERVAL);
    }
}
