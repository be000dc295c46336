//! Webcam activities
//!
//! Each activity is a synchronous, single-owner state machine fed one
//! detection result per frame. Cameras and detection models are external
//! and reach the activities through the traits below; [`runner`] wires
//! them together on a tokio interval.
//!
//! - `magic_canvas`: draw in the air with the index finger
//! - `emotion_mirror`: match a target facial expression
//! - `drums`: hit virtual drum zones, free play or follow-the-sequence
//! - `replay`: camera and detector backed by a recorded landmark file

pub mod drums;
pub mod emotion_mirror;
pub mod magic_canvas;
pub mod replay;
pub mod runner;

pub use drums::{DrumGame, DrumMode, DrumZone, DrumsReport, SoundCue};
pub use emotion_mirror::{EmotionMirror, MatchEvent, MirrorReport};
pub use magic_canvas::{CanvasReport, MagicCanvas, MagicCanvasConfig};
pub use runner::{ActivityRunner, RunSummary, RunnerConfig};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::canvas::HistoryError;
use crate::vision::{FaceBlendshapes, HandLandmarks, LandmarkError, SmoothingError};

// ============================================================================
// LIFECYCLE
// ============================================================================

/// Lifecycle of a running activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ActivityState {
    /// Detection model loading
    Loading,
    /// Model loaded, camera not running
    Ready,
    /// Camera running, waiting for the next frame
    Streaming,
    /// Detector running on a frame
    Detecting,
    /// Activity consuming the detection result
    Rendering,
    /// Camera released
    Stopped,
    /// Model failed to load; permanent until the activity is rebuilt
    Disabled { reason: String },
}

impl ActivityState {
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            ActivityState::Streaming | ActivityState::Detecting | ActivityState::Rendering
        )
    }
}

impl std::fmt::Display for ActivityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivityState::Loading => f.write_str("loading"),
            ActivityState::Ready => f.write_str("ready"),
            ActivityState::Streaming => f.write_str("streaming"),
            ActivityState::Detecting => f.write_str("detecting"),
            ActivityState::Rendering => f.write_str("rendering"),
            ActivityState::Stopped => f.write_str("stopped"),
            ActivityState::Disabled { reason } => write!(f, "disabled ({reason})"),
        }
    }
}

// ============================================================================
// EXTERNAL COLLABORATORS
// ============================================================================

/// Properties of an acquired camera stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f32,
}

/// One captured video frame
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    /// Monotonic frame number from the start of the stream
    pub sequence: u64,
    pub timestamp_ms: u64,
    pub width: u32,
    pub height: u32,
    /// Raw pixel data, layout defined by the camera
    pub data: Vec<u8>,
}

/// Video source
#[async_trait]
pub trait CameraStream: Send {
    /// Acquire the device
    async fn start(&mut self) -> Result<FrameInfo, CameraError>;

    /// Next frame; `None` once the stream has ended
    async fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError>;

    /// Release the device
    fn stop(&mut self);

    fn is_active(&self) -> bool;
}

/// Landmark model over video frames
#[async_trait]
pub trait Detector: Send {
    type Output: Send;

    /// Load model weights
    async fn load(&mut self) -> Result<(), DetectError> {
        Ok(())
    }

    /// Run on one frame; `None` when nothing was found
    async fn detect(&mut self, frame: &VideoFrame) -> Result<Option<Self::Output>, DetectError>;
}

/// Detector producing one hand per frame
pub trait HandDetector: Detector<Output = HandLandmarks> {}
impl<T: Detector<Output = HandLandmarks>> HandDetector for T {}

/// Detector producing face blendshapes
pub trait FaceDetector: Detector<Output = FaceBlendshapes> {}
impl<T: Detector<Output = FaceBlendshapes>> FaceDetector for T {}

/// Per-frame consumer of detection results
pub trait Activity: Send {
    type Input: Send;
    type Report: FrameReport + Send;

    fn name(&self) -> &'static str;

    /// Consume one frame's result; `None` means nothing was detected
    fn process(&mut self, input: Option<&Self::Input>, now_ms: u64) -> Self::Report;

    /// Forget per-session state
    fn reset(&mut self);
}

/// Counters a runner aggregates from activity reports
pub trait FrameReport {
    /// Stroke segments drawn this frame
    fn segments_drawn(&self) -> usize {
        0
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("Camera permission denied")]
    PermissionDenied,

    #[error("No camera found")]
    NotFound,

    #[error("Camera unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid detector output: {0}")]
    InvalidOutput(#[from] LandmarkError),
}

#[derive(Debug, Error)]
pub enum ActivityError {
    #[error("Activity disabled: {0}. Reload to try again.")]
    Disabled(String),

    #[error(
        "Could not start the camera: {0}. Allow camera access for this application \
         in your system privacy settings, close other apps using the camera, then try again."
    )]
    Camera(#[from] CameraError),

    #[error("Cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: ActivityState,
    },

    #[error("Unsupported brush size: {0}")]
    InvalidBrush(u32),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("History error: {0}")]
    History(#[from] HistoryError),
}

impl From<SmoothingError> for ActivityError {
    fn from(err: SmoothingError) -> Self {
        ActivityError::Config(err.to_string())
    }
}

pub type ActivityResult<T> = Result<T, ActivityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_error_has_instructions() {
        let err = ActivityError::from(CameraError::PermissionDenied);
        let message = err.to_string();
        assert!(message.contains("permission denied"));
        assert!(message.contains("Allow camera access"));
    }

    #[test]
    fn test_running_states() {
        assert!(ActivityState::Detecting.is_running());
        assert!(!ActivityState::Ready.is_running());
        assert!(!ActivityState::Disabled {
            reason: "x".into()
        }
        .is_running());
    }
}
