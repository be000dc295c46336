//! Landmark types
//!
//! Hand landmarks follow the 21-point MediaPipe hand layout. Coordinates are
//! normalized to `[0, 1]` relative to the video frame, with `y` growing
//! downwards. Face input is consumed as named blendshape scores.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

// ============================================================================
// HAND LANDMARK INDICES
// ============================================================================

pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_DIP: usize = 7;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_PIP: usize = 14;
pub const RING_DIP: usize = 15;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_DIP: usize = 19;
pub const PINKY_TIP: usize = 20;

/// Number of points in a hand landmark frame
pub const HAND_LANDMARK_COUNT: usize = 21;

/// Fingertips of the four long fingers, paired with the joint they are
/// compared against when deciding extension.
pub const FINGER_TIPS: [(usize, usize); 4] = [
    (INDEX_TIP, INDEX_PIP),
    (MIDDLE_TIP, MIDDLE_PIP),
    (RING_TIP, RING_PIP),
    (PINKY_TIP, PINKY_PIP),
];

/// Hand skeleton connections, used for overlay rendering
pub const HAND_SKELETON: [(usize, usize); 21] = [
    (WRIST, THUMB_CMC), (THUMB_CMC, THUMB_MCP), (THUMB_MCP, THUMB_IP), (THUMB_IP, THUMB_TIP),
    (WRIST, INDEX_MCP), (INDEX_MCP, INDEX_PIP), (INDEX_PIP, INDEX_DIP), (INDEX_DIP, INDEX_TIP),
    (WRIST, MIDDLE_MCP), (MIDDLE_MCP, MIDDLE_PIP), (MIDDLE_PIP, MIDDLE_DIP), (MIDDLE_DIP, MIDDLE_TIP),
    (WRIST, RING_MCP), (RING_MCP, RING_PIP), (RING_PIP, RING_DIP), (RING_DIP, RING_TIP),
    (WRIST, PINKY_MCP), (PINKY_MCP, PINKY_PIP), (PINKY_PIP, PINKY_DIP), (PINKY_DIP, PINKY_TIP),
    (INDEX_MCP, MIDDLE_MCP),
];

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// A single normalized landmark
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// A point in canvas pixel space
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// One detected hand: exactly 21 landmarks
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct HandLandmarks {
    points: [Landmark; HAND_LANDMARK_COUNT],
}

impl HandLandmarks {
    /// Build from a slice, validating count and finiteness
    pub fn from_slice(points: &[Landmark]) -> Result<Self, LandmarkError> {
        if points.len() != HAND_LANDMARK_COUNT {
            return Err(LandmarkError::WrongCount {
                expected: HAND_LANDMARK_COUNT,
                actual: points.len(),
            });
        }
        if let Some(index) = points.iter().position(|p| !p.is_finite()) {
            return Err(LandmarkError::NonFinite { index });
        }

        let mut array = [Landmark::default(); HAND_LANDMARK_COUNT];
        array.copy_from_slice(points);
        Ok(Self { points: array })
    }

    /// Parse a JSON array of `{x, y, z}` objects
    pub fn from_json(json: &str) -> Result<Self, LandmarkError> {
        let points: Vec<Landmark> =
            serde_json::from_str(json).map_err(|e| LandmarkError::Parse(e.to_string()))?;
        Self::from_slice(&points)
    }

    /// Landmark at a MediaPipe index
    pub fn get(&self, index: usize) -> Landmark {
        self.points[index]
    }

    pub fn points(&self) -> &[Landmark; HAND_LANDMARK_COUNT] {
        &self.points
    }

    /// Canvas-space position of a landmark
    pub fn canvas_point(&self, index: usize, width: u32, height: u32, mirrored: bool) -> Point {
        to_canvas(self.points[index], width, height, mirrored)
    }
}

impl<'de> Deserialize<'de> for HandLandmarks {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let points = Vec::<Landmark>::deserialize(deserializer)?;
        HandLandmarks::from_slice(&points).map_err(serde::de::Error::custom)
    }
}

/// Convert a normalized landmark to canvas pixels.
///
/// With `mirrored` the horizontal axis is flipped so the result lines up
/// with a mirrored (selfie) video preview.
pub fn to_canvas(landmark: Landmark, width: u32, height: u32, mirrored: bool) -> Point {
    let x = if mirrored { 1.0 - landmark.x } else { landmark.x };
    Point {
        x: x * width as f32,
        y: landmark.y * height as f32,
    }
}

/// Face blendshape scores keyed by category name (e.g. `jawOpen`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceBlendshapes {
    scores: HashMap<String, f32>,
}

impl FaceBlendshapes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set a score
    pub fn with(mut self, name: impl Into<String>, score: f32) -> Self {
        self.scores.insert(name.into(), score);
        self
    }

    /// Score for a category; absent categories score zero
    pub fn score(&self, name: &str) -> f32 {
        self.scores.get(name).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Errors raised while building landmark frames
#[derive(Debug, Error, PartialEq)]
pub enum LandmarkError {
    #[error("Expected {expected} landmarks, got {actual}")]
    WrongCount { expected: usize, actual: usize },

    #[error("Landmark {index} has a non-finite coordinate")]
    NonFinite { index: usize },

    #[error("Invalid landmark data: {0}")]
    Parse(String),
}
