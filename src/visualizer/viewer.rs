// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Window that presents rendered overlays.

use image::RgbImage;
use minifb::{Key, Window, WindowOptions};

use crate::config::DEFAULT_TICK_INTERVAL;
use crate::error::{OverlayError, Result};
use crate::io::FrameSink;
use crate::source::SourceMeta;
use crate::visualizer::Color;

/// A simple overlay window using minifb.
///
/// The window opens at the size of the first presented frame. Closing it or
/// pressing `Esc`/`Q` ends playback.
pub struct Viewer {
    title: String,
    window: Option<Window>,
    width: usize,
    height: usize,
    buffer: Vec<u32>,
}

impl Viewer {
    /// Create a viewer. The window is opened on the first frame.
    #[must_use]
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            window: None,
            width: 0,
            height: 0,
            buffer: Vec::new(),
        }
    }

    /// Size of the last presented frame.
    #[must_use]
    pub const fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn open(&mut self, width: usize, height: usize) -> Result<()> {
        let mut window = Window::new(
            &self.title,
            width,
            height,
            WindowOptions {
                resize: true,
                ..WindowOptions::default()
            },
        )
        .map_err(|e| OverlayError::VisualizerError(format!("Failed to create window: {e}")))?;

        window.limit_update_rate(Some(DEFAULT_TICK_INTERVAL));
        self.window = Some(window);
        Ok(())
    }
}

fn is_closed(window: &Window) -> bool {
    !window.is_open() || window.is_key_down(Key::Escape) || window.is_key_down(Key::Q)
}

/// Pack an RGB frame into minifb's `0x00RRGGBB` pixels.
fn pack_pixels(frame: &RgbImage, buffer: &mut Vec<u32>) {
    buffer.clear();
    buffer.extend(
        frame
            .pixels()
            .map(|p| Color::new(p[0], p[1], p[2]).to_u32()),
    );
}

impl FrameSink for Viewer {
    fn present(&mut self, frame: &RgbImage, _meta: &SourceMeta) -> Result<bool> {
        let (width, height) = (frame.width() as usize, frame.height() as usize);
        if self.window.is_none() {
            self.open(width, height)?;
        }

        pack_pixels(frame, &mut self.buffer);
        self.width = width;
        self.height = height;

        let Some(window) = self.window.as_mut() else {
            return Ok(false);
        };
        if is_closed(window) {
            return Ok(false);
        }

        window
            .update_with_buffer(&self.buffer, self.width, self.height)
            .map_err(|e| OverlayError::VisualizerError(format!("Failed to update window: {e}")))?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_pack_pixels() {
        let mut frame = RgbImage::new(2, 1);
        frame.put_pixel(0, 0, Rgb([255, 0, 0]));
        frame.put_pixel(1, 0, Rgb([0x12, 0x34, 0x56]));

        let mut buffer = vec![7; 10];
        pack_pixels(&frame, &mut buffer);
        assert_eq!(buffer, vec![0x00FF_0000, 0x0012_3456]);
    }
}
