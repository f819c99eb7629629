// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! The frame loop.
//!
//! [`FrameLoop`] ticks at a fixed interval. Each tick pulls the next frame from
//! the [`FrameSource`] and spawns a pose estimate for it without waiting. When
//! an estimate completes, the loop renders that frame and its pose onto the
//! output surface and hands the surface to the [`FrameSink`]. Completions are
//! handled one at a time on the loop task, in the order they finish.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{self, MissedTickBehavior};

use crate::annotate::OverlayRenderer;
use crate::config::OverlayConfig;
use crate::error::{OverlayError, Result};
use crate::io::FrameSink;
use crate::model::{EstimateOptions, PoseEstimator};
use crate::pose::Pose;
use crate::source::{Frame, FrameSource};
use crate::surface::RasterSurface;
use crate::visualizer::Color;
use crate::{verbose, warn};

/// Playback state of a [`FrameLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    /// No frame has been produced yet.
    #[default]
    Idle,
    /// Frames are flowing and poses are being requested.
    Rendering,
}

/// Counters reported when a [`FrameLoop`] finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopStats {
    /// Scheduling ticks handled.
    pub ticks: u64,
    /// Frames sent for pose estimation.
    pub submitted: u64,
    /// Frames rendered and presented.
    pub rendered: u64,
    /// Frames dropped: unreadable, failed estimate, stale, or failed render.
    pub skipped: u64,
}

/// Ends a running [`FrameLoop`] from anywhere.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    /// Ask the loop to stop. Pending estimates are abandoned.
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    /// Whether a stop was requested.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

/// A finished estimate for one submitted frame.
struct Completion {
    seq: u64,
    frame: Frame,
    result: Result<Pose>,
}

/// Per-run bookkeeping.
#[derive(Default)]
struct RunState {
    next_seq: u64,
    last_rendered: Option<u64>,
    exhausted: bool,
    stats: LoopStats,
}

/// Drives a source, an estimator, the renderer and a sink.
///
/// # Example
///
/// ```no_run
/// use pose_overlay::{FrameLoop, NullSink, OnnxPoseEstimator, OverlayConfig, SourcePlayer};
///
/// # async fn demo() -> pose_overlay::Result<()> {
/// let estimator = OnnxPoseEstimator::load("movenet.onnx", 192)?;
/// let source = SourcePlayer::open("video.mp4".into())?;
/// let mut frame_loop = FrameLoop::new(estimator, source, NullSink, OverlayConfig::default());
/// let stats = frame_loop.run().await?;
/// println!("rendered {} frames", stats.rendered);
/// # Ok(())
/// # }
/// ```
pub struct FrameLoop<E, S, K> {
    estimator: Arc<E>,
    source: S,
    sink: K,
    renderer: OverlayRenderer,
    config: OverlayConfig,
    surface: Option<RasterSurface>,
    state: LoopState,
    stop: Arc<watch::Sender<bool>>,
}

impl<E, S, K> FrameLoop<E, S, K>
where
    E: PoseEstimator,
    S: FrameSource,
    K: FrameSink,
{
    /// Create a loop with a renderer built from `config`.
    pub fn new(estimator: E, source: S, sink: K, config: OverlayConfig) -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            estimator: Arc::new(estimator),
            source,
            sink,
            renderer: OverlayRenderer::new(&config),
            config,
            surface: None,
            state: LoopState::Idle,
            stop: Arc::new(stop),
        }
    }

    /// Replace the renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: OverlayRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// Handle that stops this loop.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: Arc::clone(&self.stop),
        }
    }

    /// Current playback state.
    #[must_use]
    pub const fn state(&self) -> LoopState {
        self.state
    }

    /// The output surface, once created.
    #[must_use]
    pub const fn surface(&self) -> Option<&RasterSurface> {
        self.surface.as_ref()
    }

    /// The sink frames are presented to.
    #[must_use]
    pub const fn sink(&self) -> &K {
        &self.sink
    }

    /// Run until stopped, the sink closes, or the source is exhausted.
    ///
    /// Per-frame failures are logged and counted in [`LoopStats::skipped`].
    ///
    /// # Errors
    ///
    /// Returns an error if the tick interval or the in-flight cap is zero, or
    /// if the source or sink fails in a way that affects every frame (see
    /// [`OverlayError::is_frame_local`]).
    pub async fn run(&mut self) -> Result<LoopStats> {
        if self.config.tick_interval.is_zero() {
            return Err(OverlayError::ConfigError(
                "Tick interval must be positive".to_string(),
            ));
        }
        if self.config.max_in_flight == Some(0) {
            return Err(OverlayError::ConfigError(
                "Max in-flight estimates must be at least 1".to_string(),
            ));
        }

        // Dropping the set aborts estimates still pending at exit.
        let mut pending = JoinSet::new();
        let mut stop_rx = self.stop.subscribe();
        let mut ticker = time::interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut run = RunState::default();

        loop {
            if *stop_rx.borrow() {
                verbose!("Stop requested");
                break;
            }
            if run.exhausted && pending.is_empty() && self.config.stop_on_exhausted {
                verbose!("Source exhausted");
                break;
            }

            tokio::select! {
                biased;
                _ = stop_rx.changed() => {}
                Some(joined) = pending.join_next(), if !pending.is_empty() => {
                    match joined {
                        Ok(done) => {
                            if !self.on_completion(&mut run, done)? {
                                verbose!("Output closed");
                                break;
                            }
                        }
                        Err(e) => {
                            warn!("Skipping frame: estimate task failed: {e}");
                            run.stats.skipped += 1;
                        }
                    }
                }
                _ = ticker.tick(), if !run.exhausted => {
                    self.on_tick(&mut run, &mut pending)?;
                }
            }
        }

        self.sink.finish()?;
        Ok(run.stats)
    }

    /// Pull the next frame and spawn its estimate.
    fn on_tick(&mut self, run: &mut RunState, pending: &mut JoinSet<Completion>) -> Result<()> {
        run.stats.ticks += 1;

        if let Some(max) = self.config.max_in_flight
            && pending.len() >= max
        {
            return Ok(());
        }

        let frame = match self.source.next_frame() {
            None => {
                run.exhausted = true;
                return Ok(());
            }
            Some(Ok(frame)) => frame,
            Some(Err(e)) if e.is_frame_local() => {
                warn!("Skipping unreadable frame: {e}");
                run.stats.skipped += 1;
                return Ok(());
            }
            Some(Err(e)) => return Err(e),
        };

        if self.state == LoopState::Idle && self.source.is_ready() {
            let (width, height) = frame.dimensions();
            verbose!("Source ready: {width}x{height}");
            self.state = LoopState::Rendering;
        }

        run.next_seq += 1;
        let seq = run.next_seq;
        let estimator = Arc::clone(&self.estimator);
        let options = EstimateOptions {
            flip_horizontal: self.config.flip_horizontal,
        };

        pending.spawn(async move {
            let result = estimator.estimate(Arc::clone(&frame.image), options).await;
            Completion { seq, frame, result }
        });

        run.stats.submitted += 1;
        Ok(())
    }

    /// Render and present one finished estimate.
    ///
    /// Returns `Ok(false)` once the sink has closed.
    fn on_completion(&mut self, run: &mut RunState, done: Completion) -> Result<bool> {
        let Completion { seq, frame, result } = done;

        let pose = match result {
            Ok(pose) => pose,
            Err(e) => {
                warn!("Skipping frame {}: {e}", frame.meta.frame_idx);
                run.stats.skipped += 1;
                return Ok(true);
            }
        };

        if self.config.drop_stale && run.last_rendered.is_some_and(|last| seq < last) {
            verbose!("Dropping stale pose for frame {}", frame.meta.frame_idx);
            run.stats.skipped += 1;
            return Ok(true);
        }

        let size = self
            .config
            .surface_size
            .or_else(|| self.source.dimensions());
        let surface = match ensure_surface(&mut self.surface, size, self.config.background) {
            Ok(surface) => surface,
            Err(e) => {
                warn!("Skipping frame {}: {e}", frame.meta.frame_idx);
                run.stats.skipped += 1;
                return Ok(true);
            }
        };

        if let Err(e) = self.renderer.render_frame(surface, &frame.image, &pose) {
            warn!("Skipping frame {}: {e}", frame.meta.frame_idx);
            run.stats.skipped += 1;
            return Ok(true);
        }
        run.last_rendered = Some(run.last_rendered.map_or(seq, |last| last.max(seq)));

        match self.sink.present(surface.image(), &frame.meta) {
            Ok(open) => {
                run.stats.rendered += 1;
                Ok(open)
            }
            Err(e) if e.is_frame_local() => {
                warn!("Failed to present frame {}: {e}", frame.meta.frame_idx);
                run.stats.skipped += 1;
                Ok(true)
            }
            Err(e) => Err(e),
        }
    }
}

/// Create the surface on first use.
fn ensure_surface(
    slot: &mut Option<RasterSurface>,
    size: Option<(u32, u32)>,
    background: Color,
) -> Result<&mut RasterSurface> {
    if slot.is_none() {
        let (width, height) = size.ok_or(OverlayError::UnreadyFrame)?;
        if width == 0 || height == 0 {
            return Err(OverlayError::InvalidDimensions(format!(
                "surface size {width}x{height}"
            )));
        }
        verbose!("Output surface: {width}x{height}");
        *slot = Some(RasterSurface::with_background(width, height, background));
    }
    slot.as_mut().ok_or(OverlayError::UnreadyFrame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::NullSink;
    use crate::source::SourceMeta;
    use image::{DynamicImage, RgbImage};
    use std::future::Future;
    use std::time::Duration;

    struct FixedEstimator;

    impl PoseEstimator for FixedEstimator {
        fn estimate(
            &self,
            _frame: Arc<DynamicImage>,
            _options: EstimateOptions,
        ) -> impl Future<Output = Result<Pose>> + Send {
            async { Ok(Pose::default()) }
        }
    }

    struct Frames {
        remaining: usize,
        dimensions: Option<(u32, u32)>,
    }

    impl FrameSource for Frames {
        fn next_frame(&mut self) -> Option<Result<Frame>> {
            if self.remaining == 0 {
                return None;
            }
            self.remaining -= 1;
            self.dimensions = Some((32, 24));
            Some(Ok(Frame::new(
                DynamicImage::ImageRgb8(RgbImage::new(32, 24)),
                SourceMeta::default(),
            )))
        }

        fn dimensions(&self) -> Option<(u32, u32)> {
            self.dimensions
        }
    }

    fn fast_config() -> OverlayConfig {
        OverlayConfig::default().with_tick_interval(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_surface_takes_source_size() {
        let source = Frames {
            remaining: 2,
            dimensions: None,
        };
        let mut frame_loop = FrameLoop::new(FixedEstimator, source, NullSink, fast_config());
        assert_eq!(frame_loop.state(), LoopState::Idle);

        let stats = frame_loop.run().await.unwrap();

        assert_eq!(stats.rendered, 2);
        assert_eq!(frame_loop.state(), LoopState::Rendering);
        let surface = frame_loop.surface().unwrap();
        assert_eq!(surface.image().dimensions(), (32, 24));
    }

    #[tokio::test]
    async fn test_configured_surface_size_wins() {
        let source = Frames {
            remaining: 1,
            dimensions: None,
        };
        let config = fast_config().with_surface_size(64, 64);
        let mut frame_loop = FrameLoop::new(FixedEstimator, source, NullSink, config);

        frame_loop.run().await.unwrap();
        assert_eq!(frame_loop.surface().unwrap().image().dimensions(), (64, 64));
    }

    #[tokio::test]
    async fn test_zero_interval_is_rejected() {
        let source = Frames {
            remaining: 1,
            dimensions: None,
        };
        let config = OverlayConfig::default().with_tick_interval(Duration::ZERO);
        let mut frame_loop = FrameLoop::new(FixedEstimator, source, NullSink, config);

        let result = frame_loop.run().await;
        assert!(matches!(result, Err(OverlayError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_stop_before_run() {
        let source = Frames {
            remaining: 100,
            dimensions: None,
        };
        let mut frame_loop = FrameLoop::new(FixedEstimator, source, NullSink, fast_config());
        let handle = frame_loop.stop_handle();
        handle.stop();
        assert!(handle.is_stopped());

        let stats = frame_loop.run().await.unwrap();
        assert_eq!(stats.ticks, 0);
    }

    #[tokio::test]
    async fn test_zero_in_flight_cap_is_rejected() {
        let source = Frames {
            remaining: 3,
            dimensions: None,
        };
        let config = fast_config().with_max_in_flight(0);
        let mut frame_loop = FrameLoop::new(FixedEstimator, source, NullSink, config);

        let result = tokio::time::timeout(Duration::from_secs(2), frame_loop.run())
            .await
            .expect("run did not return");
        assert!(matches!(result, Err(OverlayError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_idle_until_source_is_ready() {
        struct NeverReady(Frames);

        impl FrameSource for NeverReady {
            fn next_frame(&mut self) -> Option<Result<Frame>> {
                self.0.next_frame()
            }

            fn dimensions(&self) -> Option<(u32, u32)> {
                self.0.dimensions()
            }

            fn is_ready(&self) -> bool {
                false
            }
        }

        let source = NeverReady(Frames {
            remaining: 2,
            dimensions: None,
        });
        let mut frame_loop = FrameLoop::new(FixedEstimator, source, NullSink, fast_config());

        let stats = frame_loop.run().await.unwrap();
        assert_eq!(stats.submitted, 2);
        assert_eq!(frame_loop.state(), LoopState::Idle);
    }

    #[tokio::test]
    async fn test_in_flight_cap_still_drains_source() {
        let source = Frames {
            remaining: 5,
            dimensions: None,
        };
        let config = fast_config().with_max_in_flight(1);
        let mut frame_loop = FrameLoop::new(FixedEstimator, source, NullSink, config);

        let stats = frame_loop.run().await.unwrap();
        assert_eq!(stats.submitted, 5);
        assert_eq!(stats.rendered, 5);
    }
}
