// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Output surfaces the overlay renderer draws onto.

#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_polygon_mut};
use imageproc::point::Point;

use crate::visualizer::Color;

/// A 2D raster drawing target with fixed pixel dimensions.
pub trait Surface {
    /// Surface size as (width, height).
    fn dimensions(&self) -> (u32, u32);

    /// Fill the whole surface with its background color.
    fn clear(&mut self);

    /// Draw `image` scaled into the rectangle at (`x`, `y`) of size `width` x `height`.
    fn draw_image(&mut self, image: &DynamicImage, x: f32, y: f32, width: f32, height: f32);

    /// Draw a filled circle centered at (`cx`, `cy`).
    fn draw_circle(&mut self, cx: f32, cy: f32, radius: f32, color: Color);

    /// Draw a straight line of the given stroke width.
    fn draw_line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Color);
}

/// In-memory RGB surface drawn with `imageproc`.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    image: RgbImage,
    background: Rgb<u8>,
}

impl RasterSurface {
    /// Create a surface cleared to black.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_background(width, height, Color::BLACK)
    }

    /// Create a surface cleared to `background`.
    #[must_use]
    pub fn with_background(width: u32, height: u32, background: Color) -> Self {
        let background = Rgb::from(background);
        Self {
            image: RgbImage::from_pixel(width, height, background),
            background,
        }
    }

    /// Current pixel contents.
    #[must_use]
    pub const fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Copy the contents out as a `DynamicImage`.
    #[must_use]
    pub fn snapshot(&self) -> DynamicImage {
        DynamicImage::ImageRgb8(self.image.clone())
    }

    /// Consume the surface, returning its pixels.
    #[must_use]
    pub fn into_image(self) -> RgbImage {
        self.image
    }
}

impl Surface for RasterSurface {
    fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = self.background;
        }
    }

    fn draw_image(&mut self, image: &DynamicImage, x: f32, y: f32, width: f32, height: f32) {
        let w = (width.round() as u32).max(1);
        let h = (height.round() as u32).max(1);
        let rgb = image.to_rgb8();
        let scaled = if rgb.dimensions() == (w, h) {
            rgb
        } else {
            imageops::resize(&rgb, w, h, FilterType::Triangle)
        };
        imageops::replace(&mut self.image, &scaled, x.round() as i64, y.round() as i64);
    }

    fn draw_circle(&mut self, cx: f32, cy: f32, radius: f32, color: Color) {
        draw_filled_circle_mut(
            &mut self.image,
            (cx.round() as i32, cy.round() as i32),
            radius.round() as i32,
            Rgb::from(color),
        );
    }

    fn draw_line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Color) {
        let color = Rgb::from(color);
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let length = dx.hypot(dy);

        if width <= 1.0 || length < f32::EPSILON {
            draw_line_segment_mut(&mut self.image, from, to, color);
            return;
        }

        // Stroke as a quad offset by half the width along the normal
        let half = width / 2.0;
        let (nx, ny) = (-dy / length * half, dx / length * half);
        let corner = |x: f32, y: f32| Point::new(x.round() as i32, y.round() as i32);
        let quad = [
            corner(from.0 + nx, from.1 + ny),
            corner(to.0 + nx, to.1 + ny),
            corner(to.0 - nx, to.1 - ny),
            corner(from.0 - nx, from.1 - ny),
        ];

        if quad[0] == quad[3] {
            draw_line_segment_mut(&mut self.image, from, to, color);
        } else {
            draw_polygon_mut(&mut self.image, &quad, color);
        }
    }
}
