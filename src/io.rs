// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Frame sinks: where rendered overlays go, including video encoding.

use std::path::{Path, PathBuf};

use image::RgbImage;
#[cfg(feature = "video")]
use video_rs::{Encoder, Time, encode::Settings as EncoderSettings};

#[cfg(feature = "video")]
use crate::error::OverlayError;
use crate::error::Result;
use crate::source::SourceMeta;

#[cfg(feature = "video")]
use std::sync::Once;

#[cfg(feature = "video")]
static INIT: Once = Once::new();

/// Initialize `video-rs` once per process. Safe to call repeatedly.
#[allow(clippy::missing_const_for_fn)]
pub fn init_video() {
    #[cfg(feature = "video")]
    INIT.call_once(|| {
        if let Err(e) = video_rs::init() {
            crate::error!("Failed to initialize video-rs: {e}");
        }
    });
}

/// Receives each rendered surface.
pub trait FrameSink {
    /// Present a rendered frame.
    ///
    /// Returns `Ok(false)` when the sink was closed (e.g. the window was shut)
    /// and the loop should stop.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame could not be shown or written.
    fn present(&mut self, frame: &RgbImage, meta: &SourceMeta) -> Result<bool>;

    /// Flush any buffered output.
    ///
    /// # Errors
    ///
    /// Returns an error if pending output could not be written.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<K: FrameSink + ?Sized> FrameSink for Box<K> {
    fn present(&mut self, frame: &RgbImage, meta: &SourceMeta) -> Result<bool> {
        (**self).present(frame, meta)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// Fan a frame out to several sinks. Stops once any sink closes.
impl<K: FrameSink> FrameSink for Vec<K> {
    fn present(&mut self, frame: &RgbImage, meta: &SourceMeta) -> Result<bool> {
        let mut open = true;
        for sink in self.iter_mut() {
            open &= sink.present(frame, meta)?;
        }
        Ok(open)
    }

    fn finish(&mut self) -> Result<()> {
        for sink in self.iter_mut() {
            sink.finish()?;
        }
        Ok(())
    }
}

/// Sink that discards every frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn present(&mut self, _frame: &RgbImage, _meta: &SourceMeta) -> Result<bool> {
        Ok(true)
    }
}

/// Find the next available run directory (overlay, overlay2, overlay3, etc.)
#[must_use]
pub fn find_next_run_dir(base: &str, prefix: &str) -> PathBuf {
    let base_path = Path::new(base);

    let first = base_path.join(prefix);
    if !first.exists() {
        return first;
    }

    (2..)
        .map(|i| base_path.join(format!("{prefix}{i}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(first)
}

/// A wrapper around `video-rs` encoder to simplify video saving.
#[cfg(feature = "video")]
pub struct VideoWriter {
    encoder: Encoder,
    frame_duration: Time,
    position: Time,
    width: usize,
    height: usize,
}

#[cfg(feature = "video")]
impl VideoWriter {
    /// Create a new `VideoWriter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder cannot be initialized.
    pub fn new<P: AsRef<Path>>(path: P, width: usize, height: usize, fps: f32) -> Result<Self> {
        init_video();
        let output_path = path.as_ref().to_path_buf();

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                OverlayError::IoError(format!(
                    "Failed to create directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let settings = EncoderSettings::preset_h264_yuv420p(width, height, false);
        let encoder = Encoder::new(output_path.as_path(), settings).map_err(|e| {
            OverlayError::VideoError(format!("Failed to create video encoder: {e}"))
        })?;

        let frame_duration = Time::from_secs_f64(1.0 / f64::from(fps));

        Ok(Self {
            encoder,
            frame_duration,
            position: Time::zero(),
            width,
            height,
        })
    }

    /// Write a frame to the video.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or frame dimensions don't match.
    pub fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let width = frame.width() as usize;
        let height = frame.height() as usize;

        if width != self.width || height != self.height {
            return Err(OverlayError::VideoError(format!(
                "Frame dimensions {width}x{height} do not match video dimensions {}x{}",
                self.width, self.height
            )));
        }

        let frame_array = ndarray::Array3::from_shape_vec((height, width, 3), frame.as_raw().clone())
            .map_err(|e| OverlayError::VideoError(e.to_string()))?;

        self.encoder
            .encode(&frame_array, self.position)
            .map_err(|e| OverlayError::VideoError(format!("Failed to encode frame: {e}")))?;

        self.position = self.position.aligned_with(self.frame_duration).add();
        Ok(())
    }

    /// Finish writing the video.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder fails to finish.
    pub fn finish(mut self) -> Result<()> {
        self.encoder.finish().map_err(|e| {
            OverlayError::VideoError(format!("Failed to finish video encoding: {e}"))
        })
    }
}

/// Saves rendered overlays to disk.
///
/// Video sources are written as a single mp4 when the `video` feature is
/// enabled; everything else is written as one image per frame.
pub struct SaveResults {
    save_dir: PathBuf,
    #[cfg_attr(not(feature = "video"), allow(dead_code))]
    save_frames: bool,
    #[cfg(feature = "video")]
    video_writer: Option<VideoWriter>,
    saved: usize,
}

impl SaveResults {
    /// Create a new `SaveResults`.
    ///
    /// # Arguments
    ///
    /// * `save_dir` - Directory to save results.
    /// * `save_frames` - If true, save individual frames even for video sources.
    #[must_use]
    pub fn new(save_dir: PathBuf, save_frames: bool) -> Self {
        Self {
            save_dir,
            save_frames,
            #[cfg(feature = "video")]
            video_writer: None,
            saved: 0,
        }
    }

    /// Directory results are written to.
    #[must_use]
    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    /// Number of frames written so far.
    #[must_use]
    pub const fn saved(&self) -> usize {
        self.saved
    }

    fn is_video(meta: &SourceMeta) -> bool {
        meta.fps.is_some()
    }

    /// Output file name for an image frame.
    fn frame_file_name(meta: &SourceMeta) -> String {
        let path = Path::new(&meta.path);
        let stem = path
            .file_stem()
            .map_or_else(|| "frame".to_string(), |s| s.to_string_lossy().to_string());

        if Self::is_video(meta) || meta.path.is_empty() {
            format!("{stem}_{}.png", meta.frame_idx)
        } else {
            path.file_name()
                .map_or_else(|| format!("{stem}.png"), |s| s.to_string_lossy().to_string())
        }
    }

    #[cfg(feature = "video")]
    fn write_video_frame(&mut self, frame: &RgbImage, meta: &SourceMeta) -> Result<()> {
        if self.video_writer.is_none() {
            let stem = Path::new(&meta.path)
                .file_stem()
                .map_or_else(|| "overlay".to_string(), |s| s.to_string_lossy().to_string());
            let save_path = self.save_dir.join(format!("{stem}.mp4"));
            let fps = meta.fps.unwrap_or(30.0);
            self.video_writer = Some(VideoWriter::new(
                save_path,
                frame.width() as usize,
                frame.height() as usize,
                fps,
            )?);
        }

        if let Some(writer) = &mut self.video_writer {
            writer.write_frame(frame)?;
        }
        Ok(())
    }
}

impl FrameSink for SaveResults {
    fn present(&mut self, frame: &RgbImage, meta: &SourceMeta) -> Result<bool> {
        #[cfg(feature = "video")]
        if Self::is_video(meta) && !self.save_frames {
            self.write_video_frame(frame, meta)?;
            self.saved += 1;
            return Ok(true);
        }

        if !self.save_dir.exists() {
            std::fs::create_dir_all(&self.save_dir)?;
        }

        let save_path = self.save_dir.join(Self::frame_file_name(meta));
        frame.save(&save_path)?;
        self.saved += 1;
        Ok(true)
    }

    fn finish(&mut self) -> Result<()> {
        #[cfg(feature = "video")]
        if let Some(writer) = self.video_writer.take() {
            writer.finish()?;
        }
        Ok(())
    }
}
