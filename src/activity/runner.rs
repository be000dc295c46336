//! Frame loop
//!
//! Drives one activity: loads the detector, acquires the camera, then on
//! every tick pulls a frame, detects and hands the result to the activity.
//! The camera is always released when the loop ends, including on drop.

use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use super::{
    Activity, ActivityError, ActivityResult, ActivityState, CameraStream, Detector, FrameReport,
};

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Target frame rate
    pub fps: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self { fps: 30 }
    }
}

/// Counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    /// Frames where something was detected
    pub detections: u64,
    pub detection_errors: u64,
    pub segments: u64,
}

pub struct ActivityRunner<C, D, A>
where
    C: CameraStream,
    D: Detector,
    A: Activity<Input = D::Output>,
{
    camera: C,
    detector: D,
    activity: A,
    config: RunnerConfig,
    state: ActivityState,
    reports: Option<mpsc::Sender<A::Report>>,
}

impl<C, D, A> ActivityRunner<C, D, A>
where
    C: CameraStream,
    D: Detector,
    A: Activity<Input = D::Output>,
{
    pub fn new(camera: C, detector: D, activity: A, config: RunnerConfig) -> Self {
        Self {
            camera,
            detector,
            activity,
            config,
            state: ActivityState::Loading,
            reports: None,
        }
    }

    /// Forward every frame report to a channel
    pub fn with_reports(mut self, tx: mpsc::Sender<A::Report>) -> Self {
        self.reports = Some(tx);
        self
    }

    pub fn state(&self) -> &ActivityState {
        &self.state
    }

    pub fn activity(&self) -> &A {
        &self.activity
    }

    pub fn activity_mut(&mut self) -> &mut A {
        &mut self.activity
    }

    /// Load the detection model. A failure disables the runner for good.
    pub async fn load(&mut self) -> ActivityResult<()> {
        match &self.state {
            ActivityState::Loading => {}
            ActivityState::Disabled { reason } => {
                return Err(ActivityError::Disabled(reason.clone()));
            }
            _ => return Ok(()),
        }

        match self.detector.load().await {
            Ok(()) => {
                tracing::info!(activity = self.activity.name(), "Detector loaded");
                self.state = ActivityState::Ready;
                Ok(())
            }
            Err(e) => {
                tracing::error!(activity = self.activity.name(), error = %e, "Detector failed to load");
                let reason = e.to_string();
                self.state = ActivityState::Disabled {
                    reason: reason.clone(),
                };
                Err(ActivityError::Disabled(reason))
            }
        }
    }

    /// Acquire the camera. On failure the runner stays ready for a retry.
    pub async fn activate(&mut self) -> ActivityResult<()> {
        match &self.state {
            ActivityState::Disabled { reason } => {
                return Err(ActivityError::Disabled(reason.clone()));
            }
            ActivityState::Loading => {
                return Err(ActivityError::InvalidState {
                    action: "activate",
                    state: self.state.clone(),
                });
            }
            state if state.is_running() => return Ok(()),
            _ => {}
        }

        match self.camera.start().await {
            Ok(info) => {
                tracing::info!(
                    activity = self.activity.name(),
                    width = info.width,
                    height = info.height,
                    fps = info.fps,
                    "Camera started"
                );
                self.state = ActivityState::Streaming;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(activity = self.activity.name(), error = %e, "Camera unavailable");
                self.state = ActivityState::Ready;
                Err(e.into())
            }
        }
    }

    /// Release the camera. Safe to call repeatedly; the device is stopped once.
    pub fn deactivate(&mut self) {
        if self.camera.is_active() {
            self.camera.stop();
            tracing::info!(activity = self.activity.name(), "Camera released");
        }
        if self.state.is_running() {
            self.state = ActivityState::Stopped;
        }
    }

    /// Run until `shutdown` flips to true, its sender is dropped, or the
    /// camera runs out of frames. Loads and activates first if needed.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> ActivityResult<RunSummary> {
        self.load().await?;
        self.activate().await?;
        self.activity.reset();

        let fps = self.config.fps.max(1);
        let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / fps as f64));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut summary = RunSummary::default();

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }

            self.state = ActivityState::Streaming;
            let frame = match self.camera.next_frame().await {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    tracing::info!(activity = self.activity.name(), "Camera stream ended");
                    break;
                }
                Err(e) => {
                    tracing::warn!(activity = self.activity.name(), error = %e, "Camera read failed");
                    break;
                }
            };
            summary.frames += 1;

            self.state = ActivityState::Detecting;
            let detection = match self.detector.detect(&frame).await {
                Ok(detection) => detection,
                Err(e) => {
                    tracing::debug!(sequence = frame.sequence, error = %e, "Detection failed, treating as empty frame");
                    summary.detection_errors += 1;
                    None
                }
            };
            if detection.is_some() {
                summary.detections += 1;
            }

            self.state = ActivityState::Rendering;
            let report = self.activity.process(detection.as_ref(), frame.timestamp_ms);
            summary.segments += report.segments_drawn() as u64;

            if let Some(tx) = &self.reports {
                // A dropped receiver only means nobody is listening
                let _ = tx.send(report).await;
            }
        }

        self.deactivate();
        tracing::info!(
            activity = self.activity.name(),
            frames = summary.frames,
            detections = summary.detections,
            errors = summary.detection_errors,
            "Run finished"
        );
        Ok(summary)
    }
}

impl<C, D, A> Drop for ActivityRunner<C, D, A>
where
    C: CameraStream,
    D: Detector,
    A: Activity<Input = D::Output>,
{
    fn drop(&mut self) {
        self.deactivate();
    }
}
