//! Wire model shared by the viewer and the console host.
//!
//! Input travels as an "event bag": a count-prefixed, pipe-delimited list of
//! queued mouse and keyboard events. Screen state comes back as structured
//! update directives (see [`update`]).

pub mod event_bag;
pub mod update;

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

pub use event_bag::{EventBagError, decode_event_bag, encode_event_bag};
pub use update::{PollOutcome, TilePos, UpdateDirective, UpdateError, classify_poll_response};

/// `event` query value marking a batched input submission.
pub const EVENT_BAG: u32 = 7;

pub const QUEUE_MOUSE_EVENT: u32 = 1;
pub const QUEUE_KEYBOARD_EVENT: u32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseEventKind {
    Move,
    Down,
    Up,
    DoubleClick,
}

impl MouseEventKind {
    pub const fn wire_code(self) -> u32 {
        match self {
            MouseEventKind::Move => 1,
            MouseEventKind::Down => 2,
            MouseEventKind::Up => 3,
            MouseEventKind::DoubleClick => 8,
        }
    }

    pub fn from_wire(code: u32) -> Option<Self> {
        match code {
            1 => Some(MouseEventKind::Move),
            2 => Some(MouseEventKind::Down),
            3 => Some(MouseEventKind::Up),
            8 => Some(MouseEventKind::DoubleClick),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyEventKind {
    Press,
    Down,
    Up,
}

impl KeyEventKind {
    pub const fn wire_code(self) -> u32 {
        match self {
            KeyEventKind::Press => 4,
            KeyEventKind::Down => 5,
            KeyEventKind::Up => 6,
        }
    }

    pub fn from_wire(code: u32) -> Option<Self> {
        match code {
            4 => Some(KeyEventKind::Press),
            5 => Some(KeyEventKind::Down),
            6 => Some(KeyEventKind::Up),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MouseButton {
    #[default]
    Left,
    Middle,
    Right,
}

impl MouseButton {
    pub const fn wire_code(self) -> u32 {
        match self {
            MouseButton::Left => 0,
            MouseButton::Middle => 1,
            MouseButton::Right => 2,
        }
    }

    pub fn from_wire(code: u32) -> Option<Self> {
        match code {
            0 => Some(MouseButton::Left),
            1 => Some(MouseButton::Middle),
            2 => Some(MouseButton::Right),
            _ => None,
        }
    }
}

/// Modifier bitmask using AWT input-event masks, which is what the console
/// host decodes.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers(u32);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const SHIFT: Modifiers = Modifiers(64);
    pub const CTRL: Modifiers = Modifiers(128);
    pub const META: Modifiers = Modifiers(256);
    pub const ALT: Modifiers = Modifiers(512);

    pub const fn from_bits(bits: u32) -> Self {
        Modifiers(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Modifiers) -> Modifiers {
        Modifiers(self.0 | rhs.0)
    }
}

impl BitOrAssign for Modifiers {
    fn bitor_assign(&mut self, rhs: Modifiers) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        for (flag, name) in [
            (Modifiers::SHIFT, "SHIFT"),
            (Modifiers::CTRL, "CTRL"),
            (Modifiers::META, "META"),
            (Modifiers::ALT, "ALT"),
        ] {
            if self.contains(flag) {
                names.push(name);
            }
        }
        if names.is_empty() {
            write!(f, "Modifiers({})", self.0)
        } else {
            write!(f, "Modifiers({})", names.join("|"))
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    pub x: i32,
    pub y: i32,
    pub button: MouseButton,
    pub modifiers: Modifiers,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub kind: KeyEventKind,
    pub code: u32,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub const fn new(kind: KeyEventKind, code: u32, modifiers: Modifiers) -> Self {
        Self {
            kind,
            code,
            modifiers,
        }
    }

    pub const fn down(code: u32, modifiers: Modifiers) -> Self {
        Self::new(KeyEventKind::Down, code, modifiers)
    }

    pub const fn up(code: u32, modifiers: Modifiers) -> Self {
        Self::new(KeyEventKind::Up, code, modifiers)
    }

    pub const fn press(code: u32, modifiers: Modifiers) -> Self {
        Self::new(KeyEventKind::Press, code, modifiers)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueuedEvent {
    Mouse(MouseEvent),
    Key(KeyEvent),
}

impl QueuedEvent {
    pub fn is_mouse_move(&self) -> bool {
        matches!(self, QueuedEvent::Mouse(event) if event.kind == MouseEventKind::Move)
    }

    pub fn as_key(&self) -> Option<&KeyEvent> {
        match self {
            QueuedEvent::Key(event) => Some(event),
            QueuedEvent::Mouse(_) => None,
        }
    }

    pub fn as_key_mut(&mut self) -> Option<&mut KeyEvent> {
        match self {
            QueuedEvent::Key(event) => Some(event),
            QueuedEvent::Mouse(_) => None,
        }
    }

    pub const fn queue_type(&self) -> u32 {
        match self {
            QueuedEvent::Mouse(_) => QUEUE_MOUSE_EVENT,
            QueuedEvent::Key(_) => QUEUE_KEYBOARD_EVENT,
        }
    }
}

impl From<MouseEvent> for QueuedEvent {
    fn from(event: MouseEvent) -> Self {
        QueuedEvent::Mouse(event)
    }
}

impl From<KeyEvent> for QueuedEvent {
    fn from(event: KeyEvent) -> Self {
        QueuedEvent::Key(event)
    }
}
