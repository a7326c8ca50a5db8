use crate::client::tile_canvas::CanvasGeometry;
use crate::protocol::TilePos;
use porthole_keymaps::{KeyboardEnv, LayoutId};
use std::env;
use std::time::Duration;
use tracing::warn;
use url::Url;

pub const DEFAULT_TILE_SIZE: u32 = 64;

/// Loop timing. Every field can be overridden through `PORTHOLE_*_MS`
/// environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    /// Interval of the flush/update heartbeat.
    pub heartbeat: Duration,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    pub backoff_initial: Duration,
    pub backoff_max: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            heartbeat: Duration::from_millis(50),
            request_timeout: Duration::from_secs(30),
            backoff_initial: Duration::from_millis(250),
            backoff_max: Duration::from_secs(5),
        }
    }
}

impl TimingConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let backoff_initial = millis_from_env("PORTHOLE_BACKOFF_INITIAL_MS", defaults.backoff_initial);
        Self {
            heartbeat: millis_from_env("PORTHOLE_HEARTBEAT_MS", defaults.heartbeat),
            request_timeout: millis_from_env("PORTHOLE_REQUEST_TIMEOUT_MS", defaults.request_timeout),
            backoff_initial,
            backoff_max: millis_from_env("PORTHOLE_BACKOFF_MAX_MS", defaults.backoff_max)
                .max(backoff_initial),
        }
    }
}

fn millis_from_env(var: &str, default: Duration) -> Duration {
    match env::var(var) {
        Ok(raw) => match raw.trim().parse::<u64>() {
            Ok(ms) if ms > 0 => Duration::from_millis(ms),
            _ => {
                warn!(target: "porthole::config", var, value = %raw, "ignoring invalid duration");
                default
            }
        },
        Err(_) => default,
    }
}

/// Everything a viewer needs to attach to one console session.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Identifier of the host element the canvas renders into.
    pub panel_id: String,
    /// Initial sprite sheet; may be relative to `update_url`.
    pub image_url: String,
    pub update_url: Url,
    pub tile_map: Vec<TilePos>,
    pub full_image: bool,
    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub raw_keyboard: bool,
    pub layout: LayoutId,
    pub keyboard_env: KeyboardEnv,
    pub timing: TimingConfig,
}

impl ViewerConfig {
    pub fn new(update_url: Url, image_url: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            panel_id: "console".to_string(),
            image_url: image_url.into(),
            update_url,
            tile_map: Vec::new(),
            full_image: true,
            width,
            height,
            tile_width: DEFAULT_TILE_SIZE,
            tile_height: DEFAULT_TILE_SIZE,
            raw_keyboard: false,
            layout: LayoutId::Us,
            keyboard_env: KeyboardEnv::default(),
            timing: TimingConfig::default(),
        }
    }

    pub fn canvas_geometry(&self) -> CanvasGeometry {
        CanvasGeometry {
            width: self.width,
            height: self.height,
            tile_width: self.tile_width,
            tile_height: self.tile_height,
        }
    }
}
