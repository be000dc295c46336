//! Configuration System
//!
//! TOML file plus environment overrides. Every section has defaults, so
//! an empty or missing file is a valid configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::activity::{DrumMode, MagicCanvasConfig};
use crate::canvas::{Color, BRUSH_SIZES, DEFAULT_BRUSH, DEFAULT_HISTORY_DEPTH, DEFAULT_PALETTE};
use crate::client::{ClientConfig, DEFAULT_BASE_URL};
use crate::relay::ServerConfig;
use crate::vision::{EmotionThresholds, TrackerConfig};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub canvas: CanvasConfig,

    #[serde(default)]
    pub drums: DrumsConfig,

    #[serde(default)]
    pub emotion: EmotionConfig,

    #[serde(default)]
    pub relay: RelayConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

// ============================================================================
// SECTIONS
// ============================================================================

/// Backend API
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

impl ApiConfig {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// Local files (session)
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("astra").to_string_lossy().to_string())
        .unwrap_or_else(|| "./astra_data".to_string())
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl StorageConfig {
    /// Data directory with a leading `~` expanded
    pub fn data_path(&self) -> PathBuf {
        match self.data_dir.strip_prefix("~/") {
            Some(rest) => dirs::home_dir()
                .map(|home| home.join(rest))
                .unwrap_or_else(|| PathBuf::from(&self.data_dir)),
            None => PathBuf::from(&self.data_dir),
        }
    }
}

/// Magic Canvas drawing settings
#[derive(Debug, Clone, Deserialize)]
pub struct CanvasConfig {
    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    #[serde(default = "default_true")]
    pub mirrored: bool,

    #[serde(default = "default_alpha")]
    pub smoothing_alpha: f32,

    #[serde(default)]
    pub debounce_ms: u64,

    #[serde(default = "default_palette")]
    pub palette: Vec<String>,

    #[serde(default = "default_brush_sizes")]
    pub brush_sizes: Vec<u32>,

    #[serde(default = "default_brush")]
    pub default_brush: u32,

    #[serde(default = "default_true")]
    pub particles: bool,

    #[serde(default = "default_history_depth")]
    pub history_depth: usize,
}

fn default_width() -> u32 {
    640
}

fn default_height() -> u32 {
    480
}

fn default_true() -> bool {
    true
}

fn default_alpha() -> f32 {
    crate::vision::smoothing::DEFAULT_ALPHA
}

fn default_palette() -> Vec<String> {
    DEFAULT_PALETTE.iter().map(Color::to_hex).collect()
}

fn default_brush_sizes() -> Vec<u32> {
    BRUSH_SIZES.to_vec()
}

fn default_brush() -> u32 {
    DEFAULT_BRUSH
}

fn default_history_depth() -> usize {
    DEFAULT_HISTORY_DEPTH
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            mirrored: true,
            smoothing_alpha: default_alpha(),
            debounce_ms: 0,
            palette: default_palette(),
            brush_sizes: default_brush_sizes(),
            default_brush: default_brush(),
            particles: true,
            history_depth: default_history_depth(),
        }
    }
}

impl CanvasConfig {
    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            width: self.width,
            height: self.height,
            mirrored: self.mirrored,
            smoothing_alpha: self.smoothing_alpha,
            debounce_ms: self.debounce_ms,
        }
    }

    /// Activity settings; fails on an unparsable palette entry
    pub fn magic_canvas_config(&self) -> Result<MagicCanvasConfig, ConfigError> {
        let palette = self
            .palette
            .iter()
            .map(|hex| {
                hex.parse::<Color>().map_err(|e| ConfigError::Invalid {
                    field: "canvas.palette".to_string(),
                    error: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(MagicCanvasConfig {
            tracker: self.tracker_config(),
            palette,
            brush_sizes: self.brush_sizes.clone(),
            default_brush: self.default_brush,
            particles: self.particles,
            history_depth: self.history_depth,
            ..Default::default()
        })
    }
}

/// Magic Drums
#[derive(Debug, Clone, Deserialize)]
pub struct DrumsConfig {
    #[serde(default = "default_cooldown")]
    pub cooldown_ms: u64,

    #[serde(default)]
    pub mode: DrumMode,
}

fn default_cooldown() -> u64 {
    crate::activity::drums::DEFAULT_COOLDOWN_MS
}

impl Default for DrumsConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: default_cooldown(),
            mode: DrumMode::default(),
        }
    }
}

/// Emotion Mirror thresholds
#[derive(Debug, Clone, Deserialize)]
pub struct EmotionConfig {
    #[serde(default = "default_smile")]
    pub smile_threshold: f32,

    #[serde(default = "default_surprise")]
    pub surprise_threshold: f32,
}

fn default_smile() -> f32 {
    EmotionThresholds::default().smile
}

fn default_surprise() -> f32 {
    EmotionThresholds::default().surprise
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            smile_threshold: default_smile(),
            surprise_threshold: default_surprise(),
        }
    }
}

impl EmotionConfig {
    pub fn thresholds(&self) -> EmotionThresholds {
        EmotionThresholds {
            smile: self.smile_threshold,
            surprise: self.surprise_threshold,
        }
    }
}

/// Gesture relay server
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub require_auth: bool,

    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_max_connections() -> usize {
    1000
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            require_auth: false,
            max_connections: default_max_connections(),
        }
    }
}

impl RelayConfig {
    pub fn server_config(&self, canvas: &CanvasConfig) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            require_auth: self.require_auth,
            max_connections: self.max_connections,
            tracker: canvas.tracker_config(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// ============================================================================
// LOADING
// ============================================================================

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// An explicit path must load; otherwise the default locations are
    /// tried in order, then defaults
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load_with_env(path),
            None => Ok(Self::load_default()),
        }
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("astra").join("config.toml")),
            Some(PathBuf::from("./astra.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::debug!(path = %path.display(), "Loaded config");
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to load config");
                    }
                }
            }
        }

        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Overrides from any key lookup; split out so tests need not touch
    /// the process environment
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("ASTRA_API_URL") {
            self.api.base_url = url;
        }

        if let Some(data_dir) = var("ASTRA_DATA_DIR") {
            self.storage.data_dir = data_dir;
        }

        if let Some(host) = var("ASTRA_RELAY_HOST") {
            self.relay.host = host;
        }
        if let Some(port) = var("ASTRA_RELAY_PORT") {
            match port.parse() {
                Ok(p) => self.relay.port = p,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid ASTRA_RELAY_PORT"),
            }
        }

        if let Some(level) = var("ASTRA_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("ASTRA_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid value for {field}: {error}")]
    Invalid { field: String, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r##"# Astra Configuration
#
# Looked up at ~/.config/astra/config.toml, then ./astra.toml.
#
# Environment variables override these settings:
# - ASTRA_API_URL
# - ASTRA_DATA_DIR
# - ASTRA_RELAY_HOST
# - ASTRA_RELAY_PORT
# - ASTRA_LOG_LEVEL
# - ASTRA_LOG_FORMAT

[api]
# Backend REST API root, including the version prefix
base_url = "http://127.0.0.1:8000/api/v1"

# Request timeout in seconds
timeout_secs = 30

[storage]
# Directory holding auth-storage.json
data_dir = "~/.local/share/astra"

[canvas]
# Drawing surface size (pixels)
width = 640
height = 480

# Flip x to match a mirrored camera preview
mirrored = true

# Cursor smoothing: weight of the newest sample, in (0, 1]
smoothing_alpha = 0.5

# Gesture must hold this long before it is adopted (0 disables)
debounce_ms = 0

palette = ["#000000", "#ff0000", "#00ff00", "#0000ff", "#ffff00"]
brush_sizes = [4, 8, 16]
default_brush = 8

# Sparkle particles along strokes
particles = true

# Undo depth
history_depth = 20

[drums]
# Minimum time between two hits of the same drum (ms)
cooldown_ms = 500

# free or sequence
mode = "free"

[emotion]
# Sum of both mouth-smile scores must exceed this for "happy"
smile_threshold = 0.8

# Jaw-open score must exceed this for "surprised"
surprise_threshold = 0.6

[relay]
host = "0.0.0.0"
port = 8090

# Validate ?token= against the backend before accepting a socket
require_auth = false

max_connections = 1000

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"##
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_generated_config_matches_defaults() {
        let parsed = Config::parse(&generate_default_config()).unwrap();
        let defaults = Config::default();

        assert_eq!(parsed.api.base_url, defaults.api.base_url);
        assert_eq!(parsed.canvas.palette, defaults.canvas.palette);
        assert_eq!(parsed.canvas.brush_sizes, defaults.canvas.brush_sizes);
        assert_eq!(parsed.canvas.history_depth, defaults.canvas.history_depth);
        assert_eq!(parsed.drums.cooldown_ms, defaults.drums.cooldown_ms);
        assert_eq!(parsed.drums.mode, DrumMode::Free);
        assert_eq!(parsed.emotion.smile_threshold, 0.8);
        assert_eq!(parsed.relay.port, defaults.relay.port);
        assert_eq!(parsed.logging.format, "pretty");
    }

    #[test]
    fn test_empty_file_is_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.relay.max_connections, 1000);
        assert!(config.canvas.particles);
    }

    #[test]
    fn test_partial_section() {
        let config = Config::parse("[drums]\nmode = \"sequence\"\n").unwrap();
        assert_eq!(config.drums.mode, DrumMode::Sequence);
        assert_eq!(config.drums.cooldown_ms, 500);
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("astra.toml");
        std::fs::write(&path, "[relay]\nport = \"nope\"\n").unwrap();

        match Config::load(&path) {
            Err(ConfigError::Parse { path: p, .. }) => assert_eq!(p, path),
            other => panic!("Expected parse error, got {other:?}"),
        }
        assert!(matches!(
            Config::load(&dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("ASTRA_API_URL", "http://backend:9000/api/v1"),
            ("ASTRA_RELAY_PORT", "9100"),
            ("ASTRA_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.api.base_url, "http://backend:9000/api/v1");
        assert_eq!(config.relay.port, 9100);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_port_override_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|key| (key == "ASTRA_RELAY_PORT").then(|| "high".to_string()));
        assert_eq!(config.relay.port, 8090);
    }

    #[test]
    fn test_magic_canvas_config_rejects_bad_color() {
        let mut canvas = CanvasConfig::default();
        assert_eq!(canvas.magic_canvas_config().unwrap().palette.len(), 5);

        canvas.palette.push("purple".into());
        assert!(matches!(
            canvas.magic_canvas_config(),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_relay_server_config_carries_canvas_geometry() {
        let config = Config::parse("[canvas]\nwidth = 320\nheight = 240\n").unwrap();
        let server = config.relay.server_config(&config.canvas);
        assert_eq!(server.tracker.width, 320);
        assert_eq!(server.addr(), "0.0.0.0:8090");
    }
}
