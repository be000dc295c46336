//! Landmark processing pipeline
//!
//! Pure per-frame logic shared by the local activities and the relay:
//! - `landmarks`: frame types and validation
//! - `gesture`: finger states, classification and hysteresis
//! - `smoothing`: EMA over cursor positions
//! - `tracker`: the stroke state machine
//! - `emotion`: blendshape expression classification

pub mod emotion;
pub mod gesture;
pub mod landmarks;
pub mod smoothing;
pub mod tracker;

pub use emotion::{classify_emotion, Emotion, EmotionThresholds};
pub use gesture::{classify, classify_hand, FingerStates, Gesture, GestureDebouncer};
pub use landmarks::{FaceBlendshapes, HandLandmarks, Landmark, LandmarkError, Point};
pub use smoothing::{EmaSmoother, SmoothingError};
pub use tracker::{CursorTracker, StrokeAction, TrackerConfig, TrackerUpdate};
