//! Cancellable continuous-capture loop
//!
//! Each iteration reads one frame, runs the detection pipeline, annotates
//! the frame with a status bar and logs debounced detections into the
//! session. Iterations start at most once per `min_interval`; cancellation is
//! observed between iterations, never inside one.

use crate::camera::FrameSource;
use crate::config::VisionConfig;
use crate::error::VisionError;
use crate::processing::{draw_hud, hud_status, DetectionPipeline};
use crate::session::Session;
use chrono::Local;
use image::RgbImage;
use leafscan_core::EnrichedDetection;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// One processed frame, handed to a rendering collaborator
#[derive(Debug, Clone)]
pub struct FrameReport {
    /// 1-based index among processed frames
    pub frame_index: u64,
    pub image: RgbImage,
    pub detections: Vec<EnrichedDetection>,
    pub fps: f64,
    /// Detections that reached the history ledger
    pub logged: usize,
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    SourceExhausted,
    FrameLimit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSummary {
    pub frames_processed: u64,
    pub frames_skipped: u64,
    pub detections_logged: usize,
    pub fps: f64,
    pub stop_reason: StopReason,
}

pub struct CaptureLoop {
    source: Box<dyn FrameSource>,
    pipeline: Arc<DetectionPipeline>,
    min_interval: Duration,
    reports: Option<mpsc::Sender<FrameReport>>,
    max_frames: Option<u64>,
}

impl CaptureLoop {
    /// Capture from `source` at no more than `target_fps` frames per second
    pub fn new(source: Box<dyn FrameSource>, pipeline: Arc<DetectionPipeline>, target_fps: u32) -> Self {
        let target_fps = target_fps.max(1);
        Self {
            source,
            pipeline,
            min_interval: Duration::from_secs_f64(1.0 / target_fps as f64),
            reports: None,
            max_frames: None,
        }
    }

    /// Capture at the configured frame rate. The configuration is validated
    /// first.
    pub fn from_config(
        source: Box<dyn FrameSource>,
        pipeline: Arc<DetectionPipeline>,
        config: &VisionConfig,
    ) -> Result<Self, VisionError> {
        config.validate().map_err(VisionError::Config)?;
        Ok(Self::new(source, pipeline, config.frame_rate).with_min_interval(config.frame_interval()))
    }

    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Send every processed frame to `tx`. Reports are dropped while the
    /// channel is full and stop once the receiver goes away.
    pub fn with_reports(mut self, tx: mpsc::Sender<FrameReport>) -> Self {
        self.reports = Some(tx);
        self
    }

    /// Stop after `limit` processed frames
    pub fn with_max_frames(mut self, limit: u64) -> Self {
        self.max_frames = Some(limit);
        self
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Run until cancelled, the source is exhausted or the frame limit is
    /// reached. Fails only when the source cannot be opened.
    pub async fn run(mut self, session: &mut Session, cancel: CancellationToken) -> Result<CaptureSummary, VisionError> {
        self.source.open()?;
        session.begin_capture();
        info!(
            "Capture started from {} (min interval {:?})",
            self.source.describe(),
            self.min_interval
        );

        let mut ticker = tokio::time::interval(self.min_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut frames_processed = 0u64;
        let mut frames_skipped = 0u64;
        let mut detections_logged = 0usize;

        let stop_reason = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break StopReason::Cancelled,
                _ = ticker.tick() => {}
            }

            if self.max_frames.is_some_and(|limit| frames_processed >= limit) {
                break StopReason::FrameLimit;
            }

            let frame = match self.source.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break StopReason::SourceExhausted,
                Err(e) => {
                    warn!("Skipping frame: {}", e);
                    frames_skipped += 1;
                    continue;
                }
            };

            let mut annotation = match self.pipeline.analyze(&frame, session.settings()) {
                Ok(annotation) => annotation,
                Err(e) => {
                    warn!("Detection failed, skipping frame: {}", e);
                    frames_skipped += 1;
                    continue;
                }
            };

            let now = Local::now();
            let logged = session.observe_frame(&annotation.detections, now);
            detections_logged += logged;
            frames_processed += 1;

            let status = hud_status(
                &now.format("%H:%M:%S").to_string(),
                session.fps(),
                annotation.detections.len(),
            );
            draw_hud(&mut annotation.image, &status);

            if let Some(tx) = &self.reports {
                let report = FrameReport {
                    frame_index: frames_processed,
                    image: annotation.image,
                    detections: annotation.detections,
                    fps: session.fps(),
                    logged,
                };
                let receiver_gone = match tx.try_send(report) {
                    Ok(()) => false,
                    Err(TrySendError::Full(_)) => {
                        debug!("Report channel full, dropping frame {}", frames_processed);
                        false
                    }
                    Err(TrySendError::Closed(_)) => true,
                };
                if receiver_gone {
                    debug!("Report receiver dropped, no further frames will be reported");
                    self.reports = None;
                }
            }
        };

        self.source.release();
        session.end_capture();

        let summary = CaptureSummary {
            frames_processed,
            frames_skipped,
            detections_logged,
            fps: session.fps(),
            stop_reason,
        };
        info!(
            "Capture stopped ({:?}): {} frames processed, {} skipped, {} detections logged",
            summary.stop_reason, summary.frames_processed, summary.frames_skipped, summary.detections_logged
        );
        Ok(summary)
    }
}
