//! Gesture classification
//!
//! Maps finger extension flags to a small fixed set of gestures. Matching
//! is a strict boolean AND across the five flags; there is no partial or
//! fuzzy matching.

use serde::{Deserialize, Serialize};

use super::landmarks::{HandLandmarks, FINGER_TIPS, THUMB_IP, THUMB_TIP};

/// Extension state of each finger
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerStates {
    pub thumb: bool,
    pub index: bool,
    pub middle: bool,
    pub ring: bool,
    pub pinky: bool,
}

impl FingerStates {
    /// Read extension flags from a hand.
    ///
    /// A long finger is extended when its tip is above (smaller `y` than)
    /// its PIP joint. The thumb is extended when its tip lies to the right
    /// of the IP joint in raw camera coordinates.
    pub fn from_hand(hand: &HandLandmarks) -> Self {
        let [index, middle, ring, pinky] =
            FINGER_TIPS.map(|(tip, pip)| hand.get(tip).y < hand.get(pip).y);
        let thumb = hand.get(THUMB_TIP).x > hand.get(THUMB_IP).x;

        Self {
            thumb,
            index,
            middle,
            ring,
            pinky,
        }
    }

    pub fn all_extended(&self) -> bool {
        self.thumb && self.index && self.middle && self.ring && self.pinky
    }

    /// Number of extended fingers
    pub fn count(&self) -> usize {
        [self.thumb, self.index, self.middle, self.ring, self.pinky]
            .iter()
            .filter(|f| **f)
            .count()
    }
}

/// Discrete gesture recognised in a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gesture {
    /// No hand in the frame
    None,
    /// Hand present but no recognised pose
    Idle,
    /// Index finger only: draw
    Draw,
    /// Index and middle finger: erase
    Erase,
    /// Open palm: clear the canvas
    Clear,
}

impl Gesture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gesture::None => "none",
            Gesture::Idle => "idle",
            Gesture::Draw => "draw",
            Gesture::Erase => "erase",
            Gesture::Clear => "clear",
        }
    }

    /// Human readable label as shown next to the preview
    pub fn label(&self) -> &'static str {
        match self {
            Gesture::None => "No hand",
            Gesture::Idle => "Not Drawing",
            Gesture::Draw => "Drawing",
            Gesture::Erase => "Erasing",
            Gesture::Clear => "Clearing",
        }
    }
}

impl std::fmt::Display for Gesture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify finger states. Checked in priority order: open palm, then
/// index+middle, then index alone.
pub fn classify(fingers: &FingerStates) -> Gesture {
    if fingers.all_extended() {
        Gesture::Clear
    } else if fingers.index && fingers.middle {
        Gesture::Erase
    } else if fingers.index && !fingers.middle {
        Gesture::Draw
    } else {
        Gesture::Idle
    }
}

/// Classify an optional hand; no hand yields [`Gesture::None`]
pub fn classify_hand(hand: Option<&HandLandmarks>) -> Gesture {
    match hand {
        Some(hand) => classify(&FingerStates::from_hand(hand)),
        None => Gesture::None,
    }
}

/// Time-window hysteresis over raw gestures.
///
/// A changed gesture is only adopted once it has been seen continuously
/// for `hold_ms`. Until then the previously adopted gesture is reported,
/// which suppresses stroke fragmentation from single-frame flicker.
#[derive(Debug, Clone)]
pub struct GestureDebouncer {
    hold_ms: u64,
    stable: Gesture,
    candidate: Option<(Gesture, u64)>,
}

impl GestureDebouncer {
    pub fn new(hold_ms: u64) -> Self {
        Self {
            hold_ms,
            stable: Gesture::None,
            candidate: None,
        }
    }

    /// Feed the raw gesture for the frame at `now_ms`, get the stable one
    pub fn update(&mut self, raw: Gesture, now_ms: u64) -> Gesture {
        if self.hold_ms == 0 || raw == self.stable {
            self.stable = raw;
            self.candidate = None;
            return self.stable;
        }

        match self.candidate {
            Some((gesture, since)) if gesture == raw => {
                if now_ms.saturating_sub(since) >= self.hold_ms {
                    self.stable = raw;
                    self.candidate = None;
                }
            }
            _ => {
                self.candidate = Some((raw, now_ms));
            }
        }

        self.stable
    }

    pub fn stable(&self) -> Gesture {
        self.stable
    }

    pub fn hold_ms(&self) -> u64 {
        self.hold_ms
    }

    pub fn reset(&mut self) {
        self.stable = Gesture::None;
        self.candidate = None;
    }
}

impl Default for GestureDebouncer {
    fn default() -> Self {
        Self::new(120)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::landmarks::fixtures;

    #[test]
    fn test_index_only_draws() {
        let hand = fixtures::index_only((0.5, 0.3));
        let fingers = FingerStates::from_hand(&hand);
        assert!(fingers.index);
        assert!(!fingers.middle && !fingers.ring && !fingers.pinky);
        assert_eq!(classify(&fingers), Gesture::Draw);
    }

    #[test]
    fn test_open_palm_clears() {
        let hand = fixtures::open_palm();
        let fingers = FingerStates::from_hand(&hand);
        assert!(fingers.all_extended());
        assert_eq!(classify(&fingers), Gesture::Clear);
    }

    #[test]
    fn test_index_and_middle_erases() {
        let hand = fixtures::hand_with([true, true, false, false], (0.5, 0.3));
        assert_eq!(classify_hand(Some(&hand)), Gesture::Erase);
    }

    #[test]
    fn test_four_fingers_without_thumb_erases() {
        // Not an open palm: the thumb flag fails the strict AND
        let fingers = FingerStates {
            thumb: false,
            index: true,
            middle: true,
            ring: true,
            pinky: true,
        };
        assert_eq!(classify(&fingers), Gesture::Erase);
    }

    #[test]
    fn test_fist_is_idle() {
        assert_eq!(classify_hand(Some(&fixtures::fist())), Gesture::Idle);
    }

    #[test]
    fn test_no_hand() {
        assert_eq!(classify_hand(None), Gesture::None);
    }

    #[test]
    fn test_finger_count() {
        let fingers = FingerStates::from_hand(&fixtures::open_palm());
        assert_eq!(fingers.count(), 5);
    }

    #[test]
    fn test_gesture_serializes_snake_case() {
        let json = serde_json::to_string(&Gesture::Draw).unwrap();
        assert_eq!(json, "\"draw\"");
    }

    #[test]
    fn test_debouncer_suppresses_flicker() {
        let mut debouncer = GestureDebouncer::new(100);
        assert_eq!(debouncer.update(Gesture::Draw, 0), Gesture::None);
        assert_eq!(debouncer.update(Gesture::Draw, 100), Gesture::Draw);

        // One-frame flicker to Idle is ignored
        assert_eq!(debouncer.update(Gesture::Idle, 133), Gesture::Draw);
        assert_eq!(debouncer.update(Gesture::Draw, 166), Gesture::Draw);

        // A sustained change is adopted once the window has elapsed
        assert_eq!(debouncer.update(Gesture::Idle, 200), Gesture::Draw);
        assert_eq!(debouncer.update(Gesture::Idle, 250), Gesture::Draw);
        assert_eq!(debouncer.update(Gesture::Idle, 300), Gesture::Idle);
    }

    #[test]
    fn test_debouncer_zero_window_passes_through() {
        let mut debouncer = GestureDebouncer::new(0);
        assert_eq!(debouncer.update(Gesture::Erase, 0), Gesture::Erase);
        assert_eq!(debouncer.update(Gesture::Draw, 1), Gesture::Draw);
    }

    #[test]
    fn test_debouncer_reset() {
        let mut debouncer = GestureDebouncer::new(0);
        debouncer.update(Gesture::Draw, 0);
        debouncer.reset();
        assert_eq!(debouncer.stable(), Gesture::None);
    }
}
