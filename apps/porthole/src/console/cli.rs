use clap::{Args, Parser};
use porthole_keymaps::{Browser, GuestOs, KeyboardEnv, LayoutId};
use std::path::PathBuf;
use url::Url;

use crate::config::{DEFAULT_TILE_SIZE, TimingConfig, ViewerConfig};
use crate::console::error::CliError;
use crate::protocol::TilePos;
use crate::telemetry::logging::{LogConfig, LogLevel};

#[derive(Parser, Debug)]
#[command(
    name = "porthole",
    about = "Tile-based console viewer for remote virtual machines",
    author,
    version = concat!(env!("CARGO_PKG_VERSION"), "-", env!("BUILD_TIMESTAMP"))
)]
pub struct Cli {
    #[arg(
        long,
        env = "PORTHOLE_UPDATE_URL",
        value_name = "URL",
        help = "Console update endpoint; input is posted to the same URL with event=7"
    )]
    pub update_url: Url,

    #[arg(
        long,
        env = "PORTHOLE_IMAGE_URL",
        value_name = "URL",
        default_value = "image",
        help = "Initial sprite sheet, absolute or relative to the update URL"
    )]
    pub image_url: String,

    #[arg(long, default_value_t = 800, help = "Console width in pixels")]
    pub width: u32,

    #[arg(long, default_value_t = 600, help = "Console height in pixels")]
    pub height: u32,

    #[arg(long, default_value_t = DEFAULT_TILE_SIZE)]
    pub tile_width: u32,

    #[arg(long, default_value_t = DEFAULT_TILE_SIZE)]
    pub tile_height: u32,

    #[arg(
        long,
        value_name = "JSON",
        help = "Initial tile map as [[row,col],...]; defaults to the whole grid"
    )]
    pub tile_map: Option<String>,

    #[arg(
        long,
        help = "Treat the initial image as a strip of tiles in tile-map order"
    )]
    pub incremental: bool,

    #[arg(
        long,
        env = "PORTHOLE_KEYBOARD",
        default_value = "us",
        help = "Guest keyboard layout (us, jp, uk, fr)"
    )]
    pub keyboard: LayoutId,

    #[arg(long, help = "Forward every key transition without layout translation")]
    pub raw_keyboard: bool,

    #[arg(long, default_value = "other", help = "Guest OS (windows, linux, other)")]
    pub guest_os: GuestOs,

    #[arg(
        long,
        default_value = "other",
        help = "Browser whose key codes the input mimics (firefox, chrome, safari, other)"
    )]
    pub browser: Browser,

    #[arg(long, default_value = "console", help = "Identifier of the console panel")]
    pub panel_id: String,

    #[arg(
        long,
        value_name = "PATH",
        help = "Write the final framebuffer to a PNG file on exit"
    )]
    pub snapshot: Option<PathBuf>,

    #[command(flatten)]
    pub logging: LoggingArgs,
}

#[derive(Args, Debug, Clone)]
pub struct LoggingArgs {
    #[arg(
        long = "log-level",
        value_enum,
        env = "PORTHOLE_LOG_LEVEL",
        default_value_t = LogLevel::Warn,
        help = "Minimum log level (error, warn, info, debug, trace)"
    )]
    pub level: LogLevel,

    #[arg(
        long = "log-file",
        value_name = "PATH",
        env = "PORTHOLE_LOG_FILE",
        help = "Write logs to the specified file instead of stderr"
    )]
    pub file: Option<PathBuf>,
}

impl LoggingArgs {
    pub fn to_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            file: self.file.clone(),
        }
    }
}

impl Cli {
    pub fn viewer_config(&self) -> Result<ViewerConfig, CliError> {
        let mut config = ViewerConfig::new(
            self.update_url.clone(),
            self.image_url.clone(),
            self.width,
            self.height,
        );
        config.panel_id = self.panel_id.clone();
        config.tile_width = self.tile_width;
        config.tile_height = self.tile_height;
        config.full_image = !self.incremental;
        config.raw_keyboard = self.raw_keyboard;
        config.layout = self.keyboard;
        config.keyboard_env = KeyboardEnv {
            guest_os: self.guest_os,
            browser: self.browser,
        };
        config.timing = TimingConfig::from_env();

        let geometry = config
            .canvas_geometry()
            .validate()
            .map_err(|err| CliError::InvalidArgument(err.to_string()))?;
        config.tile_map = match &self.tile_map {
            Some(raw) => parse_tile_map(raw)?,
            None => (0..geometry.rows())
                .flat_map(|row| (0..geometry.cols()).map(move |col| TilePos::new(row, col)))
                .collect(),
        };
        Ok(config)
    }
}

fn parse_tile_map(raw: &str) -> Result<Vec<TilePos>, CliError> {
    serde_json::from_str(raw)
        .map_err(|err| CliError::InvalidArgument(format!("invalid --tile-map '{raw}': {err}")))
}
