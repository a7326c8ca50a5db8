//! Update-poll responses.
//!
//! A poll either returns an HTML document, which means the console session is
//! over, or a JSON directive describing what changed on screen.

use serde::{Deserialize, Serialize};
use thiserror::Error;

const SESSION_END_MARKER: &str = "<html>";

/// One dirty grid cell, carried on the wire as `[row, col]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct TilePos {
    pub row: u32,
    pub col: u32,
}

impl TilePos {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

impl From<[u32; 2]> for TilePos {
    fn from([row, col]: [u32; 2]) -> Self {
        Self { row, col }
    }
}

impl From<TilePos> for [u32; 2] {
    fn from(pos: TilePos) -> Self {
        [pos.row, pos.col]
    }
}

fn full_image_default() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpdateDirective {
    /// Reload the sprite sheet and repaint the listed tiles.
    Refresh {
        image_url: String,
        #[serde(default)]
        tile_map: Vec<TilePos>,
        #[serde(default = "full_image_default")]
        full_image: bool,
    },
    /// The guest framebuffer changed geometry; rebuild the grid first.
    Resize {
        width: u32,
        height: u32,
        tile_width: u32,
        tile_height: u32,
        image_url: String,
        #[serde(default)]
        tile_map: Vec<TilePos>,
        #[serde(default = "full_image_default")]
        full_image: bool,
    },
    Idle,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// The host replaced the console with an HTML page (session ended,
    /// token expired, ...). Carries the document for the embedder.
    SessionEnded(String),
    Update(UpdateDirective),
}

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("empty update response")]
    Empty,
    #[error("malformed update directive: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub fn classify_poll_response(body: &str) -> Result<PollOutcome, UpdateError> {
    let trimmed = body.trim_start();
    if trimmed.is_empty() {
        return Err(UpdateError::Empty);
    }
    if trimmed
        .get(..SESSION_END_MARKER.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(SESSION_END_MARKER))
    {
        return Ok(PollOutcome::SessionEnded(body.to_string()));
    }
    let directive = serde_json::from_str(trimmed)?;
    Ok(PollOutcome::Update(directive))
}
