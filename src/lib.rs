//! # Astra
//!
//! Gesture-driven therapy activities, a developmental screener and a typed
//! client for the Astra parent-support backend.
//!
//! ## Modules
//!
//! - [`vision`]: hand landmark model, gesture classification, smoothing,
//!   the cursor tracker and blendshape emotion classification
//! - [`canvas`]: raster surface, compressed undo history, particles
//! - [`activity`]: Magic Canvas, Emotion Mirror, Magic Drums and the
//!   camera/detector frame loop
//! - [`session`]: persisted auth session
//! - [`client`]: backend REST client
//! - [`app`]: login flow, navigation guard and forum board
//! - [`screener`]: the five-question screener
//! - [`relay`]: websocket service running the tracker for thin clients
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use astra::activity::{MagicCanvas, MagicCanvasConfig};
//! use astra::vision::HandLandmarks;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut canvas = MagicCanvas::new(MagicCanvasConfig::default())?;
//!
//!     let frame = r#"[{"x":0.5,"y":0.5,"z":0.0}]"#;
//!     let hand = HandLandmarks::from_json(frame).ok();
//!     let report = canvas.process(hand.as_ref(), 0);
//!
//!     println!("gesture: {}", report.gesture);
//!     Ok(())
//! }
//! ```

pub mod activity;
pub mod app;
pub mod canvas;
pub mod client;
pub mod config;
pub mod logging;
pub mod relay;
pub mod screener;
pub mod session;
pub mod vision;

pub use activity::{
    Activity, ActivityError, ActivityRunner, ActivityState, CameraError, CameraStream,
    DetectError, Detector, DrumGame, EmotionMirror, MagicCanvas, RunSummary,
};
pub use app::{App, AppError, ForumBoard, Route};
pub use canvas::{Canvas, Color, History};
pub use client::{ApiClient, ClientConfig, ClientError};
pub use config::{Config, ConfigError};
pub use relay::{build_router, serve, RelayError, RelayState};
pub use screener::{RiskLevel, Screener, ScreenerError, ScreenerOutcome};
pub use session::{AuthState, SessionStore};
pub use vision::{CursorTracker, Gesture, HandLandmarks, Point};
