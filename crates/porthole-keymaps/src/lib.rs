//! Keyboard layout tables shared by Porthole viewers.
//!
//! Each layout carries two ordered lists:
//! - `x11`: browser key codes of non-printable keys (`keydown`/`keyup`) mapped
//!   to X11 keysyms;
//! - `keypress`: character codes of printable `keypress` events mapped to the
//!   keysym (or key sequence) the guest needs to produce that character.
//!
//! Lookup is first-match-wins with filtered entries considered before
//! unconditional ones. Layouts other than `us` fall back to the `us` tables
//! when they have no entry of their own.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

mod fr;
mod jp;
pub mod keysym;
mod physical;
mod uk;
mod us;

pub use physical::{PhysicalKey, us_physical_key};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutId {
    Us,
    Jp,
    Uk,
    Fr,
}

impl LayoutId {
    pub const ALL: [LayoutId; 4] = [LayoutId::Us, LayoutId::Jp, LayoutId::Uk, LayoutId::Fr];

    pub fn as_str(self) -> &'static str {
        match self {
            LayoutId::Us => "us",
            LayoutId::Jp => "jp",
            LayoutId::Uk => "uk",
            LayoutId::Fr => "fr",
        }
    }

    pub fn keymap(self) -> &'static KeyMap {
        match self {
            LayoutId::Us => &us::KEYMAP,
            LayoutId::Jp => &jp::KEYMAP,
            LayoutId::Uk => &uk::KEYMAP,
            LayoutId::Fr => &fr::KEYMAP,
        }
    }
}

impl fmt::Display for LayoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseError {
    kind: &'static str,
    value: String,
}

impl ParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl FromStr for LayoutId {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            // "cooked" is the historical name of the U.S. table.
            "us" | "en-us" | "cooked" => Ok(LayoutId::Us),
            "jp" | "ja" | "ja-jp" => Ok(LayoutId::Jp),
            "uk" | "gb" | "en-gb" => Ok(LayoutId::Uk),
            "fr" | "fr-fr" => Ok(LayoutId::Fr),
            _ => Err(ParseError::new("keyboard layout", value)),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuestOs {
    Windows,
    Linux,
    #[default]
    Other,
}

impl FromStr for GuestOs {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "windows" | "win" => Ok(GuestOs::Windows),
            "linux" => Ok(GuestOs::Linux),
            "other" => Ok(GuestOs::Other),
            _ => Err(ParseError::new("guest os", value)),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    Firefox,
    Chrome,
    Safari,
    #[default]
    Other,
}

impl FromStr for Browser {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "firefox" | "gecko" => Ok(Browser::Firefox),
            "chrome" | "chromium" | "edge" => Ok(Browser::Chrome),
            "safari" => Ok(Browser::Safari),
            "other" => Ok(Browser::Other),
            _ => Err(ParseError::new("browser", value)),
        }
    }
}

/// The environment an entry filter is matched against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyboardEnv {
    pub guest_os: GuestOs,
    pub browser: Browser,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryFilter {
    pub guest_os: Option<GuestOs>,
    pub browser: Option<Browser>,
}

impl EntryFilter {
    pub const fn guest(guest_os: GuestOs) -> Self {
        Self {
            guest_os: Some(guest_os),
            browser: None,
        }
    }

    pub const fn browser(browser: Browser) -> Self {
        Self {
            guest_os: None,
            browser: Some(browser),
        }
    }

    pub fn matches(&self, env: &KeyboardEnv) -> bool {
        self.guest_os.is_none_or(|os| os == env.guest_os)
            && self.browser.is_none_or(|browser| browser == env.browser)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyActionKind {
    Down,
    Up,
}

/// One synthesized key transition inside a sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyAction {
    pub kind: KeyActionKind,
    pub code: u32,
}

impl KeyAction {
    pub const fn down(code: u32) -> Self {
        Self {
            kind: KeyActionKind::Down,
            code,
        }
    }

    pub const fn up(code: u32) -> Self {
        Self {
            kind: KeyActionKind::Up,
            code,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyTarget {
    Code(u32),
    Sequence(&'static [KeyAction]),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyMapEntry {
    pub browser_code: u32,
    pub filter: Option<EntryFilter>,
    pub target: KeyTarget,
}

impl KeyMapEntry {
    pub const fn code(browser_code: u32, target: u32) -> Self {
        Self {
            browser_code,
            filter: None,
            target: KeyTarget::Code(target),
        }
    }

    pub const fn filtered(browser_code: u32, filter: EntryFilter, target: u32) -> Self {
        Self {
            browser_code,
            filter: Some(filter),
            target: KeyTarget::Code(target),
        }
    }

    pub const fn sequence(browser_code: u32, actions: &'static [KeyAction]) -> Self {
        Self {
            browser_code,
            filter: None,
            target: KeyTarget::Sequence(actions),
        }
    }

    pub const fn filtered_sequence(
        browser_code: u32,
        filter: EntryFilter,
        actions: &'static [KeyAction],
    ) -> Self {
        Self {
            browser_code,
            filter: Some(filter),
            target: KeyTarget::Sequence(actions),
        }
    }
}

#[derive(Debug)]
pub struct KeyMap {
    pub id: LayoutId,
    pub x11: &'static [KeyMapEntry],
    pub keypress: &'static [KeyMapEntry],
    pub fallback: Option<&'static KeyMap>,
}

impl KeyMap {
    pub fn lookup_x11(&self, browser_code: u32, env: &KeyboardEnv) -> Option<KeyTarget> {
        lookup(self.x11, browser_code, env)
            .or_else(|| self.fallback.and_then(|map| map.lookup_x11(browser_code, env)))
    }

    pub fn lookup_keypress(&self, char_code: u32, env: &KeyboardEnv) -> Option<KeyTarget> {
        lookup(self.keypress, char_code, env)
            .or_else(|| self.fallback.and_then(|map| map.lookup_keypress(char_code, env)))
    }
}

fn lookup(entries: &[KeyMapEntry], code: u32, env: &KeyboardEnv) -> Option<KeyTarget> {
    let mut unconditional = None;
    for entry in entries.iter().filter(|entry| entry.browser_code == code) {
        match &entry.filter {
            Some(filter) if filter.matches(env) => return Some(entry.target),
            Some(_) => {}
            None => {
                if unconditional.is_none() {
                    unconditional = Some(entry.target);
                }
            }
        }
    }
    unconditional
}
