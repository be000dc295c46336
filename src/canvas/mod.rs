//! Drawing surface, undo history and particle effects

pub mod history;
pub mod particles;
pub mod raster;

pub use history::{History, HistoryError, DEFAULT_HISTORY_DEPTH};
pub use particles::{Particle, ParticleSystem};
pub use raster::{Canvas, Color, ColorError, BRUSH_SIZES, DEFAULT_BRUSH, DEFAULT_PALETTE, ERASER_WIDTH};
