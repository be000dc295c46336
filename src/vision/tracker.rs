//! Cursor tracker
//!
//! Owns the single "current stroke" of a drawing session. Each frame it
//! classifies the hand, maps the index fingertip into canvas space,
//! smooths it, and tells the caller what to draw. It never touches a
//! raster itself, so the same tracker runs locally and inside the relay.

use serde::{Deserialize, Serialize};

use super::gesture::{classify_hand, Gesture, GestureDebouncer};
use super::landmarks::{HandLandmarks, Point, INDEX_TIP};
use super::smoothing::{EmaSmoother, SmoothingError, DEFAULT_ALPHA};

/// Tracker settings
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Canvas width in pixels
    pub width: u32,
    /// Canvas height in pixels
    pub height: u32,
    /// Flip the horizontal axis to match a mirrored preview
    pub mirrored: bool,
    /// EMA weight of new samples
    pub smoothing_alpha: f32,
    /// Gesture hysteresis window; 0 disables it
    pub debounce_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            mirrored: true,
            smoothing_alpha: DEFAULT_ALPHA,
            debounce_ms: 0,
        }
    }
}

/// What the caller should render for this frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrokeAction {
    /// Nothing to draw
    None,
    /// First point of a new stroke
    Dot { at: Point },
    /// Continue the current stroke
    Segment { from: Point, to: Point },
    /// Erase around a point
    Erase { at: Point },
    /// Wipe the canvas
    Clear,
}

/// Result of processing one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerUpdate {
    /// Gesture after hysteresis
    pub gesture: Gesture,
    /// Smoothed fingertip position, when a hand was present
    pub cursor: Option<Point>,
    pub action: StrokeAction,
}

impl TrackerUpdate {
    pub fn is_drawing(&self) -> bool {
        matches!(
            self.action,
            StrokeAction::Dot { .. } | StrokeAction::Segment { .. }
        )
    }
}

/// Per-session stroke state machine
#[derive(Debug, Clone)]
pub struct CursorTracker {
    config: TrackerConfig,
    smoother: EmaSmoother,
    debouncer: GestureDebouncer,
    previous: Option<Point>,
}

impl CursorTracker {
    pub fn new(config: TrackerConfig) -> Result<Self, SmoothingError> {
        let smoother = EmaSmoother::new(config.smoothing_alpha)?;
        let debouncer = GestureDebouncer::new(config.debounce_ms);
        Ok(Self {
            config,
            smoother,
            debouncer,
            previous: None,
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Last point of the stroke in progress
    pub fn previous(&self) -> Option<Point> {
        self.previous
    }

    /// Change canvas dimensions; the stroke in progress is ended
    pub fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width;
        self.config.height = height;
        self.end_stroke();
    }

    pub fn set_mirrored(&mut self, mirrored: bool) {
        self.config.mirrored = mirrored;
        self.end_stroke();
    }

    /// Process one frame. `None` means no hand (or a failed detection).
    pub fn update(&mut self, hand: Option<&HandLandmarks>, now_ms: u64) -> TrackerUpdate {
        // No hand is always reported as such, whatever the hysteresis holds
        let hand = match hand {
            Some(hand) => hand,
            None => {
                self.reset();
                return TrackerUpdate {
                    gesture: Gesture::None,
                    cursor: None,
                    action: StrokeAction::None,
                };
            }
        };

        let gesture = self.debouncer.update(classify_hand(Some(hand)), now_ms);

        let raw_point = hand.canvas_point(
            INDEX_TIP,
            self.config.width,
            self.config.height,
            self.config.mirrored,
        );
        let cursor = self.smoother.smooth(raw_point);

        let action = match gesture {
            Gesture::Draw => {
                let action = match self.previous {
                    Some(from) => StrokeAction::Segment { from, to: cursor },
                    None => StrokeAction::Dot { at: cursor },
                };
                self.previous = Some(cursor);
                action
            }
            Gesture::Erase => {
                self.end_stroke();
                StrokeAction::Erase { at: cursor }
            }
            Gesture::Clear => {
                self.end_stroke();
                StrokeAction::Clear
            }
            Gesture::Idle | Gesture::None => {
                self.end_stroke();
                StrokeAction::None
            }
        };

        TrackerUpdate {
            gesture,
            cursor: Some(cursor),
            action,
        }
    }

    /// Forget all carried state
    pub fn reset(&mut self) {
        self.end_stroke();
        self.smoother.reset();
        self.debouncer.reset();
    }

    fn end_stroke(&mut self) {
        self.previous = None;
    }
}
