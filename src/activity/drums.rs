//! Magic Drums: hit virtual drum pads with your fingertips
//!
//! Zones are normalized rectangles over the mirrored preview. In free
//! play every hit just sounds; in sequence mode the player repeats a
//! random pattern that grows with the level.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{Activity, FrameReport};
use crate::vision::landmarks::{HandLandmarks, INDEX_TIP, MIDDLE_TIP};

pub const DEFAULT_COOLDOWN_MS: u64 = 500;

/// Fingertips that can strike a drum
const STRIKING_TIPS: [usize; 2] = [INDEX_TIP, MIDDLE_TIP];

const POINTS_PER_HIT: u32 = 10;
const ROUND_BONUS: u32 = 50;
const LEVEL_UP_STREAK: u32 = 5;
const MAX_LEVEL: u8 = 3;

// ============================================================================
// ZONES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrumZone {
    pub name: String,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    #[serde(skip)]
    pub last_hit_ms: Option<u64>,
}

impl DrumZone {
    pub fn new(name: impl Into<String>, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            name: name.into(),
            x1,
            y1,
            x2,
            y2,
            last_hit_ms: None,
        }
    }

    /// Strictly inside, in mirrored normalized coordinates
    pub fn contains(&self, x: f32, y: f32) -> bool {
        self.x1 < x && x < self.x2 && self.y1 < y && y < self.y2
    }

    fn ready(&self, now_ms: u64, cooldown_ms: u64) -> bool {
        match self.last_hit_ms {
            Some(last) => now_ms.saturating_sub(last) > cooldown_ms,
            None => true,
        }
    }
}

/// Hi-hat and crash on top, kick and snare below
pub fn default_kit() -> Vec<DrumZone> {
    vec![
        DrumZone::new("hi_hat", 0.1, 0.1, 0.3, 0.4),
        DrumZone::new("crash", 0.7, 0.1, 0.9, 0.4),
        DrumZone::new("kick-drum", 0.1, 0.6, 0.3, 0.9),
        DrumZone::new("snare-drum", 0.7, 0.6, 0.9, 0.9),
    ]
}

// ============================================================================
// GAME STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrumMode {
    /// Every hit sounds, no scoring
    #[default]
    Free,
    /// Repeat the highlighted pattern
    Sequence,
}

impl std::str::FromStr for DrumMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "free" => Ok(DrumMode::Free),
            "sequence" => Ok(DrumMode::Sequence),
            other => Err(format!("unknown drum mode: {other}")),
        }
    }
}

/// Sound for the audio layer to play
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cue", content = "drum", rename_all = "snake_case")]
pub enum SoundCue {
    Drum(String),
    /// Round completed
    Success,
    /// Wrong drum
    Failure,
    /// Level up
    Fanfare,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    Correct { step: usize },
    RoundComplete { bonus: u32 },
    LevelUp { level: u8 },
    Miss { expected: String, hit: String },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DrumsReport {
    /// Zones that fired this frame
    pub hits: Vec<String>,
    pub cues: Vec<SoundCue>,
    pub events: Vec<GameEvent>,
    pub score: u32,
    pub streak: u32,
    pub level: u8,
    /// Next drum to hit in sequence mode
    pub expected: Option<String>,
}

impl FrameReport for DrumsReport {}

/// Pattern length at a level
pub fn sequence_length(level: u8) -> usize {
    match level {
        0 | 1 => 3,
        2 => 4,
        _ => 5,
    }
}

pub fn level_name(level: u8) -> &'static str {
    match level {
        0 | 1 => "Beginner",
        2 => "Intermediate",
        _ => "Advanced",
    }
}

pub struct DrumGame {
    zones: Vec<DrumZone>,
    cooldown_ms: u64,
    mode: DrumMode,
    sequence: Vec<String>,
    step: usize,
    score: u32,
    streak: u32,
    level: u8,
    rng: StdRng,
}

impl DrumGame {
    pub fn new(zones: Vec<DrumZone>, cooldown_ms: u64, mode: DrumMode) -> Self {
        Self::with_rng(zones, cooldown_ms, mode, StdRng::from_entropy())
    }

    /// Deterministic sequences for a given seed
    pub fn with_seed(zones: Vec<DrumZone>, cooldown_ms: u64, mode: DrumMode, seed: u64) -> Self {
        Self::with_rng(zones, cooldown_ms, mode, StdRng::seed_from_u64(seed))
    }

    fn with_rng(zones: Vec<DrumZone>, cooldown_ms: u64, mode: DrumMode, rng: StdRng) -> Self {
        let mut game = Self {
            zones,
            cooldown_ms,
            mode,
            sequence: Vec::new(),
            step: 0,
            score: 0,
            streak: 0,
            level: 1,
            rng,
        };
        if mode == DrumMode::Sequence {
            game.start_round();
        }
        game
    }

    pub fn zones(&self) -> &[DrumZone] {
        &self.zones
    }

    pub fn mode(&self) -> DrumMode {
        self.mode
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn sequence(&self) -> &[String] {
        &self.sequence
    }

    pub fn step(&self) -> usize {
        self.step
    }

    /// Drum the player should hit next
    pub fn expected(&self) -> Option<&str> {
        match self.mode {
            DrumMode::Sequence => self.sequence.get(self.step).map(String::as_str),
            DrumMode::Free => None,
        }
    }

    /// Switch mode; entering sequence mode starts a fresh game
    pub fn set_mode(&mut self, mode: DrumMode) {
        self.mode = mode;
        self.score = 0;
        self.streak = 0;
        self.level = 1;
        self.sequence.clear();
        self.step = 0;
        if mode == DrumMode::Sequence {
            self.start_round();
        }
    }

    /// Draw a new pattern for the current level. Drums may repeat.
    pub fn start_round(&mut self) {
        self.step = 0;
        if self.zones.is_empty() {
            self.sequence.clear();
            return;
        }
        let length = sequence_length(self.level);
        let zones = &self.zones;
        let rng = &mut self.rng;
        self.sequence = (0..length)
            .map(|_| zones[rng.gen_range(0..zones.len())].name.clone())
            .collect();
        tracing::debug!(level = self.level, sequence = ?self.sequence, "New drum round");
    }

    /// Hit-test the striking fingertips and apply game rules
    pub fn process(&mut self, hand: Option<&HandLandmarks>, now_ms: u64) -> DrumsReport {
        let mut report = DrumsReport::default();

        let cooldown_ms = self.cooldown_ms;
        if let Some(hand) = hand {
            for tip in STRIKING_TIPS {
                let point = hand.get(tip);
                let (x, y) = (1.0 - point.x, point.y);

                let fired: Vec<String> = self
                    .zones
                    .iter_mut()
                    .filter(|zone| zone.contains(x, y) && zone.ready(now_ms, cooldown_ms))
                    .map(|zone| {
                        zone.last_hit_ms = Some(now_ms);
                        zone.name.clone()
                    })
                    .collect();

                for name in fired {
                    self.hit(&name, &mut report);
                    report.hits.push(name);
                }
            }
        }

        report.score = self.score;
        report.streak = self.streak;
        report.level = self.level;
        report.expected = self.expected().map(str::to_string);
        report
    }

    fn hit(&mut self, name: &str, report: &mut DrumsReport) {
        report.cues.push(SoundCue::Drum(name.to_string()));

        if self.mode != DrumMode::Sequence {
            return;
        }
        let expected = match self.sequence.get(self.step) {
            Some(expected) => expected.clone(),
            None => return,
        };

        if name != expected {
            self.streak = 0;
            self.step = 0;
            report.cues.push(SoundCue::Failure);
            report.events.push(GameEvent::Miss {
                expected,
                hit: name.to_string(),
            });
            return;
        }

        self.score += POINTS_PER_HIT;
        self.streak += 1;
        report.events.push(GameEvent::Correct { step: self.step });

        if self.step + 1 < self.sequence.len() {
            self.step += 1;
            return;
        }

        self.score += ROUND_BONUS;
        report.cues.push(SoundCue::Success);
        report.events.push(GameEvent::RoundComplete { bonus: ROUND_BONUS });

        if self.streak >= LEVEL_UP_STREAK && self.level < MAX_LEVEL {
            self.level += 1;
            report.cues.push(SoundCue::Fanfare);
            report.events.push(GameEvent::LevelUp { level: self.level });
            tracing::info!(level = self.level, "Drum level up");
        }

        self.start_round();
    }
}

impl Default for DrumGame {
    fn default() -> Self {
        Self::new(default_kit(), DEFAULT_COOLDOWN_MS, DrumMode::Free)
    }
}

impl Activity for DrumGame {
    type Input = HandLandmarks;
    type Report = DrumsReport;

    fn name(&self) -> &'static str {
        "magic_drums"
    }

    fn process(&mut self, input: Option<&HandLandmarks>, now_ms: u64) -> DrumsReport {
        DrumGame::process(self, input, now_ms)
    }

    fn reset(&mut self) {
        for zone in &mut self.zones {
            zone.last_hit_ms = None;
        }
    }
}
