// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Input source handling.
//!
//! This module provides abstractions for the frame inputs the overlay loop
//! can play: single images, image sequences, and video files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;

use crate::error::{OverlayError, Result};

/// Represents different input sources.
#[derive(Debug, Clone)]
pub enum Source {
    /// Path to an image file.
    Image(PathBuf),
    /// In-memory image.
    ImageBuffer(DynamicImage),
    /// List of image paths, played in order.
    ImageList(Vec<PathBuf>),
    /// Path to a video file.
    Video(PathBuf),
    /// Directory containing images.
    Directory(PathBuf),
    /// Glob pattern for images.
    Glob(String),
}

impl Source {
    /// Check if this source is a video.
    #[must_use]
    pub const fn is_video(&self) -> bool {
        matches!(self, Self::Video(_))
    }

    /// Check if this source is a directory, glob pattern, or image list.
    #[must_use]
    pub const fn is_batch(&self) -> bool {
        matches!(
            self,
            Self::Directory(_) | Self::Glob(_) | Self::ImageList(_)
        )
    }

    /// Get the path if this source has one.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Image(p) | Self::Video(p) | Self::Directory(p) => Some(p),
            _ => None,
        }
    }
}

/// Convert from a string path to Source.
impl From<&str> for Source {
    fn from(s: &str) -> Self {
        // Check for glob pattern
        if s.contains('*') {
            return Self::Glob(s.to_string());
        }

        let path = PathBuf::from(s);

        // Check if it's a directory
        if path.is_dir() {
            return Self::Directory(path);
        }

        // Check file extension for video
        if let Some(ext) = path.extension() {
            let ext = ext.to_string_lossy().to_lowercase();
            if matches!(
                ext.as_str(),
                "mp4" | "avi" | "mov" | "mkv" | "wmv" | "flv" | "webm" | "m4v" | "mpeg" | "mpg"
            ) {
                return Self::Video(path);
            }
        }

        // Default to image
        Self::Image(path)
    }
}

impl From<String> for Source {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Self::from(path.to_string_lossy().as_ref())
    }
}

impl From<DynamicImage> for Source {
    fn from(img: DynamicImage) -> Self {
        Self::ImageBuffer(img)
    }
}

/// Metadata about a source frame.
#[derive(Debug, Clone)]
pub struct SourceMeta {
    /// Frame index (0 for single images).
    pub frame_idx: usize,
    /// Total frames (1 for single images, may be unknown for video).
    pub total_frames: Option<usize>,
    /// Source path or identifier.
    pub path: String,
    /// Frames per second (for video sources).
    pub fps: Option<f32>,
}

impl Default for SourceMeta {
    fn default() -> Self {
        Self {
            frame_idx: 0,
            total_frames: Some(1),
            path: String::new(),
            fps: None,
        }
    }
}

/// A decoded frame ready to present.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Decoded pixels, shared with in-flight estimates.
    pub image: Arc<DynamicImage>,
    /// Where the frame came from.
    pub meta: SourceMeta,
}

impl Frame {
    /// Wrap a decoded image.
    #[must_use]
    pub fn new(image: DynamicImage, meta: SourceMeta) -> Self {
        Self {
            image: Arc::new(image),
            meta,
        }
    }

    /// Intrinsic frame size as (width, height).
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

/// Supplies frames to the overlay loop.
pub trait FrameSource: Send {
    /// Decode the next frame.
    ///
    /// Returns `None` once the source is exhausted.
    fn next_frame(&mut self) -> Option<Result<Frame>>;

    /// Intrinsic size of the source, once known.
    fn dimensions(&self) -> Option<(u32, u32)>;

    /// Whether the source has produced a frame that can be presented.
    fn is_ready(&self) -> bool {
        self.dimensions().is_some()
    }
}

/// Iterator over frames from a source.
pub struct SourceIterator {
    source: Source,
    current_frame: usize,
    image_paths: Vec<PathBuf>,
    #[cfg(feature = "video")]
    decoder: Option<video_rs::decode::Decoder>,
    #[cfg(feature = "video")]
    total_frames: Option<usize>,
}

impl SourceIterator {
    /// Create a new source iterator.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be opened.
    pub fn new(source: Source) -> Result<Self> {
        let image_paths = match &source {
            Source::Directory(path) => Self::collect_images_from_dir(path)?,
            Source::Glob(pattern) => Self::collect_images_from_glob(pattern)?,
            Source::Image(path) => vec![path.clone()],
            Source::ImageList(paths) => paths.clone(),
            Source::ImageBuffer(_) | Source::Video(_) => vec![],
        };

        Ok(Self {
            source,
            current_frame: 0,
            image_paths,
            #[cfg(feature = "video")]
            decoder: None,
            #[cfg(feature = "video")]
            total_frames: None,
        })
    }

    /// Collect image paths from a directory.
    fn collect_images_from_dir(dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(OverlayError::ImageError(format!(
                "Not a directory: {}",
                dir.display()
            )));
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| Self::is_image_file(path))
            .collect();

        paths.sort();
        Ok(paths)
    }

    /// Collect image paths from a glob pattern.
    ///
    /// Only patterns of the form `dir/*.ext` or `dir/*` are supported.
    fn collect_images_from_glob(pattern: &str) -> Result<Vec<PathBuf>> {
        let Some(star_pos) = pattern.find('*') else {
            return Ok(vec![PathBuf::from(pattern)]);
        };

        let dir_part = &pattern[..star_pos];
        let dir = if dir_part.is_empty() {
            Path::new(".")
        } else {
            Path::new(dir_part.trim_end_matches('/').trim_end_matches('\\'))
        };

        // Get extension filter from pattern (e.g., "*.jpg" -> "jpg")
        let ext_filter: Option<String> = pattern[star_pos..]
            .strip_prefix("*.")
            .map(str::to_lowercase);

        if !dir.is_dir() {
            return Err(OverlayError::ImageError(format!(
                "Directory not found: {}",
                dir.display()
            )));
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                ext_filter.as_ref().map_or_else(
                    || Self::is_image_file(path),
                    |ext| {
                        path.extension()
                            .is_some_and(|e| e.to_string_lossy().to_lowercase() == *ext)
                    },
                )
            })
            .collect();

        paths.sort();
        Ok(paths)
    }

    /// Check if a path is an image file based on extension.
    fn is_image_file(path: &Path) -> bool {
        path.extension().is_some_and(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            matches!(
                ext.as_str(),
                "jpg" | "jpeg" | "png" | "bmp" | "webp" | "tiff" | "tif"
            )
        })
    }

    /// Get the next image from the source.
    fn next_image(&mut self) -> Option<Result<(DynamicImage, SourceMeta)>> {
        let path = self.image_paths.get(self.current_frame)?;
        let meta = SourceMeta {
            frame_idx: self.current_frame,
            total_frames: Some(self.image_paths.len()),
            path: path.to_string_lossy().to_string(),
            fps: None,
        };

        self.current_frame += 1;

        match image::open(path) {
            Ok(img) => Some(Ok((img, meta))),
            Err(e) => Some(Err(OverlayError::ImageError(format!(
                "Failed to load {}: {e}",
                path.display()
            )))),
        }
    }

    /// Get the next video frame.
    #[cfg(feature = "video")]
    fn next_video_frame(&mut self) -> Option<Result<(DynamicImage, SourceMeta)>> {
        if self.decoder.is_none()
            && let Source::Video(path) = &self.source
        {
            crate::io::init_video();
            match video_rs::decode::Decoder::new(path.as_path()) {
                Ok(d) => {
                    if let Ok(duration) = d.duration() {
                        let fps = d.frame_rate();
                        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                        {
                            self.total_frames =
                                Some((duration.as_secs_f64() * f64::from(fps)) as usize);
                        }
                    }
                    self.decoder = Some(d);
                }
                Err(e) => {
                    return Some(Err(OverlayError::VideoError(format!(
                        "Failed to create decoder: {e}"
                    ))));
                }
            }
        }

        let decoder = self.decoder.as_mut()?;
        // Decoding errors past the first frame are treated as end of stream
        let (_ts, frame) = decoder.decode().ok()?;
        let meta = SourceMeta {
            frame_idx: self.current_frame,
            total_frames: self.total_frames,
            path: self
                .source
                .path()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_default(),
            fps: Some(decoder.frame_rate()),
        };
        self.current_frame += 1;

        Some(video_frame_to_image(&frame).map(|img| (img, meta)))
    }

    #[cfg(not(feature = "video"))]
    fn next_video_frame(&mut self) -> Option<Result<(DynamicImage, SourceMeta)>> {
        if self.current_frame > 0 {
            return None;
        }
        self.current_frame = 1;
        Some(Err(OverlayError::FeatureNotEnabled(
            "Video support requires 'video' feature".to_string(),
        )))
    }
}

impl Iterator for SourceIterator {
    type Item = Result<(DynamicImage, SourceMeta)>;

    fn next(&mut self) -> Option<Self::Item> {
        match &self.source {
            Source::Image(_) | Source::Directory(_) | Source::Glob(_) | Source::ImageList(_) => {
                self.next_image()
            }
            Source::ImageBuffer(img) => {
                if self.current_frame == 0 {
                    self.current_frame = 1;
                    Some(Ok((img.clone(), SourceMeta::default())))
                } else {
                    None
                }
            }
            Source::Video(_) => self.next_video_frame(),
        }
    }
}

/// Plays a [`Source`] one frame per call, tracking its intrinsic size.
pub struct SourcePlayer {
    frames: SourceIterator,
    dimensions: Option<(u32, u32)>,
}

impl SourcePlayer {
    /// Open `source` for playback.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be opened.
    pub fn open(source: Source) -> Result<Self> {
        Ok(Self {
            frames: SourceIterator::new(source)?,
            dimensions: None,
        })
    }
}

impl FrameSource for SourcePlayer {
    fn next_frame(&mut self) -> Option<Result<Frame>> {
        let item = self.frames.next()?;
        Some(item.map(|(image, meta)| {
            let frame = Frame::new(image, meta);
            if self.dimensions.is_none() {
                self.dimensions = Some(frame.dimensions());
            }
            frame
        }))
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }
}

#[cfg(feature = "video")]
/// Convert a `video_rs` frame (HWC RGB) to `DynamicImage`.
fn video_frame_to_image(arr: &video_rs::Frame) -> Result<DynamicImage> {
    let shape = arr.shape();
    let height = u32::try_from(shape[0])
        .map_err(|_| OverlayError::ImageError("Image height exceeds u32::MAX".to_string()))?;
    let width = u32::try_from(shape[1])
        .map_err(|_| OverlayError::ImageError("Image width exceeds u32::MAX".to_string()))?;

    let rgb_data: Vec<u8> = arr.iter().copied().collect();
    let img_buffer = image::RgbImage::from_raw(width, height, rgb_data).ok_or_else(|| {
        OverlayError::ImageError("Failed to create image from video frame".to_string())
    })?;

    Ok(DynamicImage::ImageRgb8(img_buffer))
}
