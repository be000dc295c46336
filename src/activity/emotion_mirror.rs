//! Emotion Mirror: copy the expression shown on screen

use rand::seq::SliceRandom;

use super::{Activity, FrameReport};
use crate::vision::emotion::{classify_emotion_with, Emotion, EmotionThresholds};
use crate::vision::FaceBlendshapes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchEvent {
    /// The target expression was just reached
    Matched(Emotion),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MirrorReport {
    pub target: Emotion,
    /// `None` when no face was found
    pub detected: Option<Emotion>,
    pub matched: bool,
    pub event: Option<MatchEvent>,
}

impl FrameReport for MirrorReport {}

pub struct EmotionMirror {
    target: Emotion,
    thresholds: EmotionThresholds,
    matched: bool,
    match_count: u32,
}

impl EmotionMirror {
    pub fn new(target: Emotion, thresholds: EmotionThresholds) -> Self {
        Self {
            target,
            thresholds,
            matched: false,
            match_count: 0,
        }
    }

    pub fn target(&self) -> Emotion {
        self.target
    }

    pub fn is_matched(&self) -> bool {
        self.matched
    }

    /// Times the target has been reached since creation
    pub fn match_count(&self) -> u32 {
        self.match_count
    }

    /// Pick a new target; the match flag resets
    pub fn set_target(&mut self, target: Emotion) {
        self.target = target;
        self.matched = false;
    }

    /// Switch to a random target different from the current one
    pub fn next_target(&mut self) -> Emotion {
        let others: Vec<Emotion> = Emotion::ALL
            .iter()
            .copied()
            .filter(|e| *e != self.target)
            .collect();
        let next = others
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(self.target);
        self.set_target(next);
        next
    }

    pub fn observe(&mut self, face: Option<&FaceBlendshapes>) -> MirrorReport {
        let detected = face.map(|f| classify_emotion_with(f, &self.thresholds));
        let now_matched = detected == Some(self.target);

        let event = if now_matched && !self.matched {
            self.match_count += 1;
            tracing::debug!(target_emotion = %self.target, "Expression matched");
            Some(MatchEvent::Matched(self.target))
        } else {
            None
        };
        self.matched = now_matched;

        MirrorReport {
            target: self.target,
            detected,
            matched: self.matched,
            event,
        }
    }
}

impl Default for EmotionMirror {
    fn default() -> Self {
        Self::new(Emotion::Happy, EmotionThresholds::default())
    }
}

impl Activity for EmotionMirror {
    type Input = FaceBlendshapes;
    type Report = MirrorReport;

    fn name(&self) -> &'static str {
        "emotion_mirror"
    }

    fn process(&mut self, input: Option<&FaceBlendshapes>, _now_ms: u64) -> MirrorReport {
        self.observe(input)
    }

    fn reset(&mut self) {
        self.matched = false;
    }
}
