use super::{
    KeyEvent, KeyEventKind, Modifiers, MouseButton, MouseEvent, MouseEventKind, QUEUE_KEYBOARD_EVENT,
    QUEUE_MOUSE_EVENT, QueuedEvent,
};
use std::fmt::Write as _;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventBagError {
    #[error("event bag is missing its leading count")]
    MissingCount,
    #[error("invalid number '{0}' in event bag")]
    InvalidNumber(String),
    #[error("unknown queue entry type {0}")]
    UnknownEntryType(u32),
    #[error("unknown {queue} event code {code}")]
    UnknownEvent { queue: &'static str, code: u32 },
    #[error("event bag truncated inside entry {index}")]
    Truncated { index: usize },
    #[error("event bag declares {declared} entries but carries {actual}")]
    CountMismatch { declared: usize, actual: usize },
}

/// Serializes queued events as `"<N>|"` followed by one group per event.
///
/// Mouse groups are `type|event|x|y|code|modifiers|`, keyboard groups are
/// `type|event|code|modifiers|`.
pub fn encode_event_bag(events: &[QueuedEvent]) -> String {
    let mut out = String::with_capacity(8 + events.len() * 16);
    let _ = write!(out, "{}|", events.len());
    for event in events {
        match event {
            QueuedEvent::Mouse(mouse) => {
                let _ = write!(
                    out,
                    "{}|{}|{}|{}|{}|{}|",
                    QUEUE_MOUSE_EVENT,
                    mouse.kind.wire_code(),
                    mouse.x,
                    mouse.y,
                    mouse.button.wire_code(),
                    mouse.modifiers.bits()
                );
            }
            QueuedEvent::Key(key) => {
                let _ = write!(
                    out,
                    "{}|{}|{}|{}|",
                    QUEUE_KEYBOARD_EVENT,
                    key.kind.wire_code(),
                    key.code,
                    key.modifiers.bits()
                );
            }
        }
    }
    out
}

/// Parses an encoded event bag back into queued events. Used by fake console
/// hosts and diagnostics.
pub fn decode_event_bag(payload: &str) -> Result<Vec<QueuedEvent>, EventBagError> {
    let mut fields = payload.split('|');
    let declared = match fields.next() {
        Some(count) if !count.is_empty() => parse_usize(count)?,
        _ => return Err(EventBagError::MissingCount),
    };

    let mut events = Vec::with_capacity(declared);
    loop {
        let index = events.len();
        let entry_type = match fields.next() {
            None | Some("") => break,
            Some(raw) => parse_u32(raw)?,
        };
        let event = match entry_type {
            QUEUE_MOUSE_EVENT => {
                let code = parse_u32(take(&mut fields, index)?)?;
                let kind = MouseEventKind::from_wire(code).ok_or(EventBagError::UnknownEvent {
                    queue: "mouse",
                    code,
                })?;
                let x = parse_i32(take(&mut fields, index)?)?;
                let y = parse_i32(take(&mut fields, index)?)?;
                let button_code = parse_u32(take(&mut fields, index)?)?;
                let button =
                    MouseButton::from_wire(button_code).ok_or(EventBagError::UnknownEvent {
                        queue: "mouse button",
                        code: button_code,
                    })?;
                let modifiers = Modifiers::from_bits(parse_u32(take(&mut fields, index)?)?);
                QueuedEvent::Mouse(MouseEvent {
                    kind,
                    x,
                    y,
                    button,
                    modifiers,
                })
            }
            QUEUE_KEYBOARD_EVENT => {
                let code = parse_u32(take(&mut fields, index)?)?;
                let kind = KeyEventKind::from_wire(code).ok_or(EventBagError::UnknownEvent {
                    queue: "keyboard",
                    code,
                })?;
                let key_code = parse_u32(take(&mut fields, index)?)?;
                let modifiers = Modifiers::from_bits(parse_u32(take(&mut fields, index)?)?);
                QueuedEvent::Key(KeyEvent::new(kind, key_code, modifiers))
            }
            other => return Err(EventBagError::UnknownEntryType(other)),
        };
        events.push(event);
    }

    if events.len() != declared {
        return Err(EventBagError::CountMismatch {
            declared,
            actual: events.len(),
        });
    }
    Ok(events)
}

fn take<'a>(fields: &mut std::str::Split<'a, char>, index: usize) -> Result<&'a str, EventBagError> {
    match fields.next() {
        Some(raw) if !raw.is_empty() => Ok(raw),
        _ => Err(EventBagError::Truncated { index }),
    }
}

fn parse_u32(raw: &str) -> Result<u32, EventBagError> {
    raw.parse()
        .map_err(|_| EventBagError::InvalidNumber(raw.to_string()))
}

fn parse_i32(raw: &str) -> Result<i32, EventBagError> {
    raw.parse()
        .map_err(|_| EventBagError::InvalidNumber(raw.to_string()))
}

fn parse_usize(raw: &str) -> Result<usize, EventBagError> {
    raw.parse()
        .map_err(|_| EventBagError::InvalidNumber(raw.to_string()))
}
