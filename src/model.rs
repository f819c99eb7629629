// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Pose estimation.
//!
//! [`PoseEstimator`] is the seam between the frame loop and whatever model
//! produces poses. [`OnnxPoseEstimator`] runs MoveNet-style single-pose ONNX
//! models through ONNX Runtime.

use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex};

use image::DynamicImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;

use crate::error::{OverlayError, Result};
use crate::letterbox::{FitTransform, letterbox_image};
use crate::pose::{Keypoint, NUM_KEYPOINTS, Pose};

/// Options passed with every estimate request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EstimateOptions {
    /// Mirror the estimated pose around the frame's vertical center line.
    pub flip_horizontal: bool,
}

/// Produces a single-subject pose for a frame.
///
/// Estimates are asynchronous. The frame loop spawns one per tick and does not
/// wait for it before scheduling the next, so implementations must tolerate
/// overlapping calls.
pub trait PoseEstimator: Send + Sync + 'static {
    /// Estimate the pose in `frame`, in the frame's pixel coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::EstimationFailure`] if the model rejects the
    /// frame or fails to run.
    fn estimate(
        &self,
        frame: Arc<DynamicImage>,
        options: EstimateOptions,
    ) -> impl Future<Output = Result<Pose>> + Send;
}

/// ONNX session plus the names needed to drive it.
struct SessionHandle {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    input_size: u32,
}

/// Single-pose estimator for MoveNet-style ONNX models.
///
/// The model takes a `[1, size, size, 3]` int32 RGB tensor and returns
/// `[1, 1, 17, 3]` keypoints as normalized `(y, x, score)`. Frames are
/// letterboxed into the square input and keypoints are mapped back to source
/// pixels through the same fit.
///
/// # Example
///
/// ```no_run
/// use pose_overlay::OnnxPoseEstimator;
///
/// let estimator = OnnxPoseEstimator::load("movenet_lightning.onnx", 192)?;
/// # Ok::<(), pose_overlay::OverlayError>(())
/// ```
#[derive(Clone)]
pub struct OnnxPoseEstimator {
    handle: Arc<SessionHandle>,
}

impl OnnxPoseEstimator {
    /// Load a model from an ONNX file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the ONNX model file.
    /// * `input_size` - Square input size the model expects.
    ///
    /// # Errors
    ///
    /// Returns an error if the model file doesn't exist or can't be loaded.
    pub fn load<P: AsRef<Path>>(path: P, input_size: u32) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(OverlayError::ModelLoadError(format!(
                "Model file not found: {}",
                path.display()
            )));
        }
        if input_size == 0 {
            return Err(OverlayError::ConfigError(
                "Model input size must be positive".to_string(),
            ));
        }

        let session = Session::builder()
            .map_err(|e| {
                OverlayError::ModelLoadError(format!("Failed to create session builder: {e}"))
            })?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
            .map_err(|e| {
                OverlayError::ModelLoadError(format!("Failed to set optimization level: {e}"))
            })?
            .commit_from_file(path)
            .map_err(|e| OverlayError::ModelLoadError(format!("Failed to load model: {e}")))?;

        let input_name = session
            .inputs
            .first()
            .map_or_else(|| "input".to_string(), |i| i.name.clone());
        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| OverlayError::ModelLoadError("Model has no outputs".to_string()))?;

        Ok(Self {
            handle: Arc::new(SessionHandle {
                session: Mutex::new(session),
                input_name,
                output_name,
                input_size,
            }),
        })
    }

    /// Square input size the model runs at.
    #[must_use]
    pub fn input_size(&self) -> u32 {
        self.handle.input_size
    }

    /// Run the session synchronously on one frame.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn run_blocking(
        handle: &SessionHandle,
        frame: &DynamicImage,
        options: EstimateOptions,
    ) -> Result<Pose> {
        let size = handle.input_size;
        let (canvas, fit) = letterbox_image(frame, (size, size))?;

        let side = size as usize;
        let input = Array4::<i32>::from_shape_fn((1, side, side, 3), |(_, y, x, c)| {
            i32::from(canvas.get_pixel(x as u32, y as u32)[c])
        });
        let input_contiguous = input.as_standard_layout();
        let input_tensor = TensorRef::from_array_view(&input_contiguous).map_err(|e| {
            OverlayError::EstimationFailure(format!("Failed to create input tensor: {e}"))
        })?;

        let mut session = handle
            .session
            .lock()
            .map_err(|_| OverlayError::EstimationFailure("Session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![&handle.input_name => input_tensor])
            .map_err(|e| OverlayError::EstimationFailure(format!("Inference failed: {e}")))?;

        let output = outputs.get(handle.output_name.as_str()).ok_or_else(|| {
            OverlayError::EstimationFailure(format!("Output '{}' not found", handle.output_name))
        })?;

        let (shape, data) = output.try_extract_tensor::<f32>().map_err(|e| {
            OverlayError::EstimationFailure(format!("Failed to extract output: {e}"))
        })?;

        let shape: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
        let pose = decode_single_pose(data, &shape, &fit, size)?;

        if options.flip_horizontal {
            Ok(pose.flipped_horizontal(frame.width() as f32))
        } else {
            Ok(pose)
        }
    }
}

impl PoseEstimator for OnnxPoseEstimator {
    fn estimate(
        &self,
        frame: Arc<DynamicImage>,
        options: EstimateOptions,
    ) -> impl Future<Output = Result<Pose>> + Send {
        let handle = Arc::clone(&self.handle);
        async move {
            tokio::task::spawn_blocking(move || Self::run_blocking(&handle, &frame, options))
                .await
                .map_err(|e| OverlayError::EstimationFailure(format!("Estimator task failed: {e}")))?
        }
    }
}

impl std::fmt::Debug for OnnxPoseEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxPoseEstimator")
            .field("input_name", &self.handle.input_name)
            .field("output_name", &self.handle.output_name)
            .field("input_size", &self.handle.input_size)
            .finish()
    }
}

/// Decode a `[.., 17, 3]` `(y, x, score)` output into a pose in source pixels.
///
/// Coordinates are normalized to the letterboxed `input_size` square; `fit`
/// is the source-to-input transform used to build that square.
///
/// # Errors
///
/// Returns [`OverlayError::EstimationFailure`] if the output is too small or
/// not shaped as keypoint triples.
#[allow(clippy::cast_precision_loss)]
pub fn decode_single_pose(
    data: &[f32],
    shape: &[usize],
    fit: &FitTransform,
    input_size: u32,
) -> Result<Pose> {
    if shape.last() != Some(&3) || data.len() < NUM_KEYPOINTS * 3 {
        return Err(OverlayError::EstimationFailure(format!(
            "Unexpected pose output shape {shape:?} ({} values)",
            data.len()
        )));
    }

    let side = input_size as f32;
    let keypoints = data
        .chunks_exact(3)
        .take(NUM_KEYPOINTS)
        .enumerate()
        .map(|(id, triple)| {
            let (x, y) = fit.invert(triple[1] * side, triple[0] * side);
            Keypoint::new(id, x, y, triple[2])
        })
        .collect();

    Ok(Pose::new(keypoints))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_not_found() {
        let result = OnnxPoseEstimator::load("nonexistent.onnx", 192);
        assert!(matches!(result, Err(OverlayError::ModelLoadError(_))));
    }

    #[test]
    fn test_decode_maps_back_to_source() {
        // 400x200 source letterboxed into 200x200: scale 0.5, offset_y 50
        let fit = FitTransform::compute((400, 200), (200, 200)).unwrap();
        let mut data = vec![0.0_f32; NUM_KEYPOINTS * 3];
        // nose at canvas (100, 100) -> source (200, 100)
        data[0] = 0.5;
        data[1] = 0.5;
        data[2] = 0.8;

        let pose = decode_single_pose(&data, &[1, 1, 17, 3], &fit, 200).unwrap();
        let nose = pose.get(0).unwrap();
        assert_eq!(pose.len(), NUM_KEYPOINTS);
        assert!((nose.x - 200.0).abs() < 1e-3);
        assert!((nose.y - 100.0).abs() < 1e-3);
        assert!((nose.confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_decode_rejects_bad_shape() {
        let fit = FitTransform::identity(192, 192);
        let result = decode_single_pose(&[0.0; 10], &[1, 10], &fit, 192);
        assert!(matches!(result, Err(OverlayError::EstimationFailure(_))));
    }
}
