//! Facial expression classification from blendshape scores

use serde::{Deserialize, Serialize};

use super::landmarks::FaceBlendshapes;

pub const MOUTH_SMILE_LEFT: &str = "mouthSmileLeft";
pub const MOUTH_SMILE_RIGHT: &str = "mouthSmileRight";
pub const JAW_OPEN: &str = "jawOpen";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Happy,
    Surprised,
    Neutral,
}

impl Emotion {
    pub const ALL: [Emotion; 3] = [Emotion::Happy, Emotion::Surprised, Emotion::Neutral];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Surprised => "surprised",
            Emotion::Neutral => "neutral",
        }
    }

    /// Prompt shown to the player
    pub fn prompt(&self) -> &'static str {
        match self {
            Emotion::Happy => "Can you make a happy face?",
            Emotion::Surprised => "Can you look surprised?",
            Emotion::Neutral => "Can you make a calm face?",
        }
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Emotion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "happy" => Ok(Emotion::Happy),
            "surprised" => Ok(Emotion::Surprised),
            "neutral" => Ok(Emotion::Neutral),
            other => Err(format!("unknown emotion: {other}")),
        }
    }
}

/// Decision thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionThresholds {
    /// Sum of both smile scores must exceed this
    pub smile: f32,
    /// Jaw-open score must exceed this
    pub surprise: f32,
}

impl Default for EmotionThresholds {
    fn default() -> Self {
        Self {
            smile: 0.8,
            surprise: 0.6,
        }
    }
}

/// Classify with the default thresholds
pub fn classify_emotion(shapes: &FaceBlendshapes) -> Emotion {
    classify_emotion_with(shapes, &EmotionThresholds::default())
}

/// Smile wins over surprise; anything else is neutral
pub fn classify_emotion_with(shapes: &FaceBlendshapes, thresholds: &EmotionThresholds) -> Emotion {
    let smile = shapes.score(MOUTH_SMILE_LEFT) + shapes.score(MOUTH_SMILE_RIGHT);
    if smile > thresholds.smile {
        Emotion::Happy
    } else if shapes.score(JAW_OPEN) > thresholds.surprise {
        Emotion::Surprised
    } else {
        Emotion::Neutral
    }
}
