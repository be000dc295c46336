//! Recorded landmark streams
//!
//! A recording is a JSON-lines file, one frame per line:
//!
//! ```text
//! {"timestamp_ms": 0, "landmarks": [{"x": 0.5, "y": 0.3, "z": 0.0}, ...]}
//! {"timestamp_ms": 33, "landmarks": []}
//! ```
//!
//! An empty landmark list is a frame without a hand. Face recordings carry
//! blendshape scores instead:
//!
//! ```text
//! {"timestamp_ms": 0, "face": {"mouthSmileLeft": 0.8, "mouthSmileRight": 0.7}}
//! ```
//!
//! Splitting a recording yields a camera and a detector that stand in for
//! the live devices.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::io::BufRead;
use std::path::Path;
use thiserror::Error;

use super::{CameraError, CameraStream, DetectError, Detector, FrameInfo, VideoFrame};
use crate::vision::{FaceBlendshapes, HandLandmarks, Landmark};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub timestamp_ms: u64,
    #[serde(default)]
    pub landmarks: Vec<Landmark>,
    /// Blendshape scores; absent when no face was found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face: Option<FaceBlendshapes>,
}

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Line {line}: {message}")]
    Parse { line: usize, message: String },
}

#[derive(Debug, Clone, Default)]
pub struct Recording {
    frames: Vec<RecordedFrame>,
}

impl Recording {
    pub fn new(frames: Vec<RecordedFrame>) -> Self {
        Self { frames }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Parse JSON lines; blank lines are skipped
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, ReplayError> {
        let mut frames = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let frame: RecordedFrame =
                serde_json::from_str(&line).map_err(|e| ReplayError::Parse {
                    line: index + 1,
                    message: e.to_string(),
                })?;
            frames.push(frame);
        }
        Ok(Self { frames })
    }

    pub fn frames(&self) -> &[RecordedFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Camera and hand detector replaying this recording
    pub fn into_devices(self, width: u32, height: u32) -> (RecordedCamera, RecordedDetector) {
        let camera = RecordedCamera::new(&self.frames, width, height);
        let hands = self.frames.into_iter().map(|f| f.landmarks).collect();
        (camera, RecordedDetector { hands })
    }

    /// Camera and face detector replaying this recording
    pub fn into_face_devices(self, width: u32, height: u32) -> (RecordedCamera, RecordedFaceDetector) {
        let camera = RecordedCamera::new(&self.frames, width, height);
        let faces = self.frames.into_iter().map(|f| f.face).collect();
        (camera, RecordedFaceDetector { faces })
    }
}

/// Camera yielding one empty frame per recorded line
#[derive(Debug)]
pub struct RecordedCamera {
    timestamps: VecDeque<u64>,
    next_sequence: u64,
    width: u32,
    height: u32,
    active: bool,
}

impl RecordedCamera {
    fn new(frames: &[RecordedFrame], width: u32, height: u32) -> Self {
        Self {
            timestamps: frames.iter().map(|f| f.timestamp_ms).collect(),
            next_sequence: 0,
            width,
            height,
            active: false,
        }
    }
}

#[async_trait]
impl CameraStream for RecordedCamera {
    async fn start(&mut self) -> Result<FrameInfo, CameraError> {
        self.active = true;
        Ok(FrameInfo {
            width: self.width,
            height: self.height,
            fps: 30.0,
        })
    }

    async fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        if !self.active {
            return Err(CameraError::Unavailable("stream not started".into()));
        }
        let timestamp_ms = match self.timestamps.pop_front() {
            Some(ts) => ts,
            None => return Ok(None),
        };
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        Ok(Some(VideoFrame {
            sequence,
            timestamp_ms,
            width: self.width,
            height: self.height,
            data: Vec::new(),
        }))
    }

    fn stop(&mut self) {
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// Detector answering with the landmarks recorded for each frame
#[derive(Debug)]
pub struct RecordedDetector {
    hands: Vec<Vec<Landmark>>,
}

#[async_trait]
impl Detector for RecordedDetector {
    type Output = HandLandmarks;

    async fn detect(&mut self, frame: &VideoFrame) -> Result<Option<HandLandmarks>, DetectError> {
        let points = self
            .hands
            .get(frame.sequence as usize)
            .ok_or_else(|| DetectError::Inference(format!("no frame {}", frame.sequence)))?;
        if points.is_empty() {
            return Ok(None);
        }
        Ok(Some(HandLandmarks::from_slice(points)?))
    }
}

/// Detector answering with the blendshapes recorded for each frame
#[derive(Debug)]
pub struct RecordedFaceDetector {
    faces: Vec<Option<FaceBlendshapes>>,
}

#[async_trait]
impl Detector for RecordedFaceDetector {
    type Output = FaceBlendshapes;

    async fn detect(&mut self, frame: &VideoFrame) -> Result<Option<FaceBlendshapes>, DetectError> {
        self.faces
            .get(frame.sequence as usize)
            .cloned()
            .ok_or_else(|| DetectError::Inference(format!("no frame {}", frame.sequence)))
    }
}
