//! Magic Canvas: draw in the air
//!
//! Index finger draws, index + middle erases, an open palm wipes the
//! canvas. Every gesture run that changed the canvas becomes one undo step.

use super::{Activity, ActivityError, ActivityResult, FrameReport};
use crate::canvas::{
    Canvas, Color, History, ParticleSystem, BRUSH_SIZES, DEFAULT_BRUSH, DEFAULT_HISTORY_DEPTH,
    DEFAULT_PALETTE,
};
use crate::vision::{CursorTracker, Gesture, HandLandmarks, Point, StrokeAction, TrackerConfig};

/// Particles emitted per drawn point
const PARTICLES_PER_POINT: usize = 3;
const SKELETON_COLOR: Color = Color::GREEN;

#[derive(Debug, Clone)]
pub struct MagicCanvasConfig {
    pub tracker: TrackerConfig,
    pub background: Color,
    pub palette: Vec<Color>,
    pub brush_sizes: Vec<u32>,
    pub default_brush: u32,
    pub particles: bool,
    pub history_depth: usize,
}

impl Default for MagicCanvasConfig {
    fn default() -> Self {
        Self {
            tracker: TrackerConfig::default(),
            background: Color::WHITE,
            palette: DEFAULT_PALETTE.to_vec(),
            brush_sizes: BRUSH_SIZES.to_vec(),
            default_brush: DEFAULT_BRUSH,
            particles: true,
            history_depth: DEFAULT_HISTORY_DEPTH,
        }
    }
}

/// Outcome of one frame
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasReport {
    pub gesture: Gesture,
    pub cursor: Option<Point>,
    pub action: StrokeAction,
    /// A canvas-changing gesture run ended and was recorded for undo
    pub snapshot_taken: bool,
}

impl CanvasReport {
    pub fn is_drawing(&self) -> bool {
        matches!(
            self.action,
            StrokeAction::Dot { .. } | StrokeAction::Segment { .. }
        )
    }
}

impl FrameReport for CanvasReport {
    fn segments_drawn(&self) -> usize {
        usize::from(self.is_drawing())
    }
}

pub struct MagicCanvas {
    tracker: CursorTracker,
    canvas: Canvas,
    history: History,
    particles: Option<ParticleSystem>,
    palette: Vec<Color>,
    brush_sizes: Vec<u32>,
    color: Color,
    brush: u32,
    /// Gesture of the run currently modifying the canvas
    active_run: Option<Gesture>,
    /// Hand seen in the latest frame, for the overlay
    last_hand: Option<HandLandmarks>,
}

impl MagicCanvas {
    pub fn new(config: MagicCanvasConfig) -> ActivityResult<Self> {
        if config.palette.is_empty() {
            return Err(ActivityError::Config("palette is empty".into()));
        }
        if !config.brush_sizes.contains(&config.default_brush) {
            return Err(ActivityError::InvalidBrush(config.default_brush));
        }

        let canvas = Canvas::new(
            config.tracker.width,
            config.tracker.height,
            config.background,
        );
        let mut history = History::new(config.history_depth);
        history.push(&canvas)?;

        Ok(Self {
            tracker: CursorTracker::new(config.tracker)?,
            canvas,
            history,
            particles: config.particles.then(ParticleSystem::default),
            color: config.palette[0],
            palette: config.palette,
            brush_sizes: config.brush_sizes,
            brush: config.default_brush,
            active_run: None,
            last_hand: None,
        })
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn particles(&self) -> Option<&ParticleSystem> {
        self.particles.as_ref()
    }

    pub fn palette(&self) -> &[Color] {
        &self.palette
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn brush(&self) -> u32 {
        self.brush
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Apply one frame of hand input to the canvas
    pub fn process(&mut self, hand: Option<&HandLandmarks>, now_ms: u64) -> CanvasReport {
        let update = self.tracker.update(hand, now_ms);
        self.last_hand = hand.cloned();

        // A finished run is recorded before this frame touches the canvas
        let modifying = (update.action != StrokeAction::None).then_some(update.gesture);
        let snapshot_taken = match self.active_run {
            Some(run) if modifying != Some(run) => self.snapshot(),
            _ => false,
        };
        self.active_run = modifying;

        match update.action {
            StrokeAction::Dot { at } => {
                self.canvas.fill_circle(at, self.brush as f32 / 2.0, self.color);
                self.emit_particles(at, now_ms);
            }
            StrokeAction::Segment { from, to } => {
                self.canvas.draw_line(from, to, self.brush, self.color);
                self.emit_particles(to, now_ms);
            }
            StrokeAction::Erase { at } => self.canvas.erase(at),
            StrokeAction::Clear => self.canvas.clear(),
            StrokeAction::None => {}
        }

        if let Some(particles) = self.particles.as_mut() {
            particles.update(now_ms);
        }

        CanvasReport {
            gesture: update.gesture,
            cursor: update.cursor,
            action: update.action,
            snapshot_taken,
        }
    }

    /// Step back one recorded state; with nothing earlier the canvas clears
    pub fn undo(&mut self) -> ActivityResult<()> {
        if self.active_run.take().is_some() {
            self.snapshot();
        }
        match self.history.undo()? {
            Some(previous) => self.canvas = previous,
            None => self.canvas.clear(),
        }
        self.tracker.reset();
        Ok(())
    }

    /// Wipe the canvas as an undoable step
    pub fn clear(&mut self) -> ActivityResult<()> {
        self.active_run = None;
        self.canvas.clear();
        if let Some(particles) = self.particles.as_mut() {
            particles.clear();
        }
        self.history.push(&self.canvas)?;
        Ok(())
    }

    pub fn select_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn select_brush(&mut self, size: u32) -> ActivityResult<()> {
        if !self.brush_sizes.contains(&size) {
            return Err(ActivityError::InvalidBrush(size));
        }
        self.brush = size;
        Ok(())
    }

    /// Change the surface size. Content and history are discarded.
    pub fn resize(&mut self, width: u32, height: u32) -> ActivityResult<()> {
        self.canvas.resize(width, height);
        self.tracker.resize(width, height);
        self.active_run = None;
        self.history.clear();
        self.history.push(&self.canvas)?;
        Ok(())
    }

    /// Drawing with live particles stamped on top
    pub fn composite(&self, now_ms: u64) -> Canvas {
        let mut frame = self.canvas.clone();
        if let Some(particles) = &self.particles {
            particles.render(&mut frame, now_ms);
        }
        frame
    }

    /// Composite with the latest hand skeleton drawn over it
    pub fn overlay(&self, now_ms: u64) -> Canvas {
        let mut frame = self.composite(now_ms);
        if let Some(hand) = &self.last_hand {
            frame.draw_skeleton(hand, self.tracker.config().mirrored, SKELETON_COLOR);
        }
        frame
    }

    fn emit_particles(&mut self, at: Point, now_ms: u64) {
        let color = self.color;
        if let Some(particles) = self.particles.as_mut() {
            particles.spawn_burst(at, PARTICLES_PER_POINT, color, now_ms);
        }
    }

    fn snapshot(&mut self) -> bool {
        match self.history.push(&self.canvas) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to record undo snapshot");
                false
            }
        }
    }
}

impl Activity for MagicCanvas {
    type Input = HandLandmarks;
    type Report = CanvasReport;

    fn name(&self) -> &'static str {
        "magic_canvas"
    }

    fn process(&mut self, input: Option<&HandLandmarks>, now_ms: u64) -> CanvasReport {
        MagicCanvas::process(self, input, now_ms)
    }

    fn reset(&mut self) {
        self.tracker.reset();
        self.active_run = None;
        self.last_hand = None;
    }
}
