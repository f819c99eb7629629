// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Aspect-preserving fit between a source frame and a target surface.
//!
//! The same [`FitTransform`] places the video frame on the output surface and
//! maps keypoints into surface coordinates, so the overlay always lines up with
//! the picture. The ONNX estimator also uses it in reverse to bring model-space
//! keypoints back into source pixels.

#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};

use crate::error::{OverlayError, Result};

/// Default letterbox padding color (gray).
pub const LETTERBOX_COLOR: [u8; 3] = [114, 114, 114];

/// Scale and offset mapping source coordinates into surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitTransform {
    /// Uniform scale factor applied to source coordinates.
    pub scale: f32,
    /// Horizontal padding on the left of the drawn frame.
    pub offset_x: f32,
    /// Vertical padding above the drawn frame.
    pub offset_y: f32,
    /// Width of the drawn frame on the surface.
    pub draw_width: f32,
    /// Height of the drawn frame on the surface.
    pub draw_height: f32,
}

impl FitTransform {
    /// Compute the letterbox fit of a `source` (width, height) into a `target` (width, height).
    ///
    /// The wider of the two aspect ratios decides which side is filled:
    /// a source wider than the target fills the target width and is centered
    /// vertically, otherwise it fills the target height and is centered horizontally.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::InvalidDimensions`] if any dimension is zero.
    pub fn compute(source: (u32, u32), target: (u32, u32)) -> Result<Self> {
        let (sw, sh) = source;
        let (tw, th) = target;
        if sw == 0 || sh == 0 || tw == 0 || th == 0 {
            return Err(OverlayError::InvalidDimensions(format!(
                "cannot fit source {sw}x{sh} into target {tw}x{th}"
            )));
        }

        let (sw, sh, tw, th) = (sw as f32, sh as f32, tw as f32, th as f32);
        let source_aspect = sw / sh;
        let target_aspect = tw / th;

        let (draw_width, draw_height) = if source_aspect > target_aspect {
            (tw, tw / source_aspect)
        } else {
            (th * source_aspect, th)
        };

        Ok(Self {
            scale: draw_width / sw,
            offset_x: (tw - draw_width) / 2.0,
            offset_y: (th - draw_height) / 2.0,
            draw_width,
            draw_height,
        })
    }

    /// The transform that leaves coordinates unchanged for a `width` x `height` frame.
    #[must_use]
    pub fn identity(width: u32, height: u32) -> Self {
        Self {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            draw_width: width as f32,
            draw_height: height as f32,
        }
    }

    /// Check whether this transform maps every point onto itself.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        const TOLERANCE: f32 = 1e-5;
        (self.scale - 1.0).abs() < TOLERANCE
            && self.offset_x.abs() < TOLERANCE
            && self.offset_y.abs() < TOLERANCE
    }

    /// Map a source point into surface coordinates.
    #[must_use]
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (x * self.scale + self.offset_x, y * self.scale + self.offset_y)
    }

    /// Map a surface point back into source coordinates.
    #[must_use]
    pub fn invert(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.offset_x) / self.scale, (y - self.offset_y) / self.scale)
    }

    /// Integer placement of the drawn frame: `(x, y, width, height)`.
    ///
    /// Sizes are rounded and never below one pixel.
    #[must_use]
    pub fn placement(&self) -> (i64, i64, u32, u32) {
        (
            self.offset_x.round() as i64,
            self.offset_y.round() as i64,
            (self.draw_width.round() as u32).max(1),
            (self.draw_height.round() as u32).max(1),
        )
    }
}

/// Letterbox `image` into a `target` (width, height) canvas padded with [`LETTERBOX_COLOR`].
///
/// Returns the padded image and the transform from source pixels to canvas pixels.
///
/// # Errors
///
/// Returns [`OverlayError::InvalidDimensions`] if the image or target is empty.
pub fn letterbox_image(image: &DynamicImage, target: (u32, u32)) -> Result<(RgbImage, FitTransform)> {
    let fit = FitTransform::compute((image.width(), image.height()), target)?;
    let mut canvas = RgbImage::from_pixel(target.0, target.1, Rgb(LETTERBOX_COLOR));

    let (x, y, w, h) = fit.placement();
    let resized = imageops::resize(&image.to_rgb8(), w, h, FilterType::Triangle);
    imageops::replace(&mut canvas, &resized, x, y);

    Ok((canvas, fit))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-3, "{a} != {b}");
    }

    #[test]
    fn test_fit_wide_source() {
        let fit = FitTransform::compute((1920, 1080), (640, 480)).unwrap();
        assert_close(fit.draw_width, 640.0);
        assert_close(fit.draw_height, 360.0);
        assert_close(fit.offset_x, 0.0);
        assert_close(fit.offset_y, 60.0);
        assert_close(fit.scale, 640.0 / 1920.0);
    }

    #[test]
    fn test_fit_tall_source() {
        let fit = FitTransform::compute((480, 640), (640, 480)).unwrap();
        assert_close(fit.draw_width, 360.0);
        assert_close(fit.draw_height, 480.0);
        assert_close(fit.offset_x, 140.0);
        assert_close(fit.offset_y, 0.0);
        assert_close(fit.scale, 0.75);
    }

    #[test]
    fn test_fit_same_size_is_identity() {
        let fit = FitTransform::compute((640, 480), (640, 480)).unwrap();
        assert!(fit.is_identity());
        assert!(FitTransform::identity(640, 480).is_identity());
    }

    #[test]
    fn test_fit_rejects_zero_dimensions() {
        assert!(matches!(
            FitTransform::compute((640, 480), (640, 0)),
            Err(OverlayError::InvalidDimensions(_))
        ));
        assert!(matches!(
            FitTransform::compute((640, 0), (640, 480)),
            Err(OverlayError::InvalidDimensions(_))
        ));
        assert!(FitTransform::compute((0, 480), (640, 480)).is_err());
    }

    #[test]
    fn test_apply_and_invert() {
        let fit = FitTransform::compute((1920, 1080), (640, 480)).unwrap();
        let (x, y) = fit.apply(960.0, 540.0);
        assert_close(x, 320.0);
        assert_close(y, 240.0);

        let (sx, sy) = fit.invert(x, y);
        assert_close(sx, 960.0);
        assert_close(sy, 540.0);
    }

    #[test]
    fn test_letterbox_image_pads_gray() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(200, 100, Rgb([255, 255, 255])));
        let (canvas, fit) = letterbox_image(&image, (100, 100)).unwrap();

        assert_eq!(canvas.dimensions(), (100, 100));
        assert_close(fit.offset_y, 25.0);
        assert_eq!(canvas.get_pixel(50, 5).0, LETTERBOX_COLOR);
        assert!(canvas.get_pixel(50, 50).0.iter().all(|&c| c > 250));
    }
}
