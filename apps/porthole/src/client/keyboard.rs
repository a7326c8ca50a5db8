//! Keyboard input normalization.
//!
//! Browsers disagree about key codes, and guests disagree about which keysyms
//! produce a character. Every keyboard event passes through
//! [`KeyboardTranslator::submit`] on its way into the [`EventQueue`], which
//! repairs the event stream and applies the active layout table.

use super::event_queue::EventQueue;
use crate::protocol::{KeyEvent, KeyEventKind, Modifiers};
use porthole_keymaps::keysym::js;
use porthole_keymaps::{
    KeyActionKind, KeyMap, KeyTarget, KeyboardEnv, LayoutId, PhysicalKey, us_physical_key,
};
use tracing::{debug, trace, warn};

/// Key codes to back-fill into a zero-code KEY_DOWN, keyed by the character
/// of the KEY_PRESS that follows it.
fn zero_keycode_fix(char_code: u32) -> Option<u32> {
    match char::from_u32(char_code)? {
        '_' => Some(109),
        ':' => Some(59),
        '<' => Some(188),
        '>' => Some(190),
        '?' => Some(191),
        '|' => Some(220),
        '~' => Some(192),
        _ => None,
    }
}

#[derive(Debug)]
pub struct KeyboardTranslator {
    keymap: &'static KeyMap,
    env: KeyboardEnv,
    raw: bool,
    last_submitted: Option<KeyEventKind>,
}

impl KeyboardTranslator {
    pub fn new(layout: LayoutId, env: KeyboardEnv, raw: bool) -> Self {
        Self {
            keymap: layout.keymap(),
            env,
            raw,
            last_submitted: None,
        }
    }

    pub fn layout(&self) -> LayoutId {
        self.keymap.id
    }

    pub fn is_raw(&self) -> bool {
        self.raw
    }

    /// Forgets the previous event; a press after this counts as lone.
    pub fn reset(&mut self) {
        self.last_submitted = None;
    }

    /// Repairs, translates and queues one keyboard event.
    pub fn submit(&mut self, event: KeyEvent, queue: &mut EventQueue) {
        trace!(
            target: "porthole::keyboard",
            kind = ?event.kind,
            code = event.code,
            modifiers = ?event.modifiers,
            "keyboard event"
        );
        match event.kind {
            KeyEventKind::Press => self.submit_press(event, queue),
            KeyEventKind::Down | KeyEventKind::Up if self.raw => {
                self.submit_raw_transition(event, queue)
            }
            KeyEventKind::Down | KeyEventKind::Up => {
                match self.keymap.lookup_x11(event.code, &self.env) {
                    Some(target) => push_target(event, target, queue),
                    None => queue.send_keyboard_event(event),
                }
            }
        }
        self.last_submitted = Some(event.kind);
    }

    fn submit_press(&mut self, event: KeyEvent, queue: &mut EventQueue) {
        let follows_down = self.last_submitted == Some(KeyEventKind::Down);

        if follows_down {
            self.repair_zero_keycode(event.code, queue);
        } else {
            self.synthesize_key_down(event, queue);
        }

        if self.raw {
            queue.send_keyboard_event(event);
            return;
        }
        match self.keymap.lookup_keypress(event.code, &self.env) {
            Some(target) => push_target(event, target, queue),
            None => queue.send_keyboard_event(event),
        }
    }

    fn repair_zero_keycode(&self, char_code: u32, queue: &mut EventQueue) {
        let Some(down) = queue
            .last_key_mut()
            .filter(|key| key.kind == KeyEventKind::Down && key.code == 0)
        else {
            return;
        };
        match zero_keycode_fix(char_code) {
            Some(code) => {
                debug!(
                    target: "porthole::keyboard",
                    char_code,
                    code,
                    "back-filled zero key code"
                );
                down.code = code;
            }
            None => warn!(
                target: "porthole::keyboard",
                char_code,
                "no key code known for zero-code key down"
            ),
        }
    }

    fn synthesize_key_down(&self, press: KeyEvent, queue: &mut EventQueue) {
        match us_physical_key(press.code) {
            Some(PhysicalKey { code, shift }) => {
                let mut modifiers = press.modifiers;
                if shift {
                    modifiers |= Modifiers::SHIFT;
                }
                debug!(
                    target: "porthole::keyboard",
                    char_code = press.code,
                    code,
                    shift,
                    "synthesized key down for lone key press"
                );
                queue.send_keyboard_event(KeyEvent::down(code, modifiers));
            }
            None => warn!(
                target: "porthole::keyboard",
                char_code = press.code,
                "lone key press has no physical key; forwarding as-is"
            ),
        }
    }

    /// Raw mode forwards transitions untouched, except the numpad `*` and
    /// `+` keys which some guests only understand as their shifted top-row
    /// equivalents.
    fn submit_raw_transition(&self, event: KeyEvent, queue: &mut EventQueue) {
        let shifted = match event.code {
            js::NUMPAD_MULTIPLY => js::DIGIT_8,
            js::NUMPAD_ADD => js::EQUAL,
            _ => {
                queue.send_keyboard_event(event);
                return;
            }
        };
        let modifiers = event.modifiers | Modifiers::SHIFT;
        match event.kind {
            KeyEventKind::Down => {
                queue.send_keyboard_event(KeyEvent::down(js::SHIFT, modifiers));
                queue.send_keyboard_event(KeyEvent::down(shifted, modifiers));
            }
            KeyEventKind::Up => {
                queue.send_keyboard_event(KeyEvent::up(shifted, modifiers));
                queue.send_keyboard_event(KeyEvent::up(js::SHIFT, event.modifiers));
            }
            KeyEventKind::Press => queue.send_keyboard_event(event),
        }
    }
}

fn push_target(event: KeyEvent, target: KeyTarget, queue: &mut EventQueue) {
    match target {
        KeyTarget::Code(code) => queue.send_keyboard_event(KeyEvent { code, ..event }),
        KeyTarget::Sequence(actions) => {
            for action in actions {
                let kind = match action.kind {
                    KeyActionKind::Down => KeyEventKind::Down,
                    KeyActionKind::Up => KeyEventKind::Up,
                };
                queue.send_keyboard_event(KeyEvent::new(kind, action.code, event.modifiers));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::QueuedEvent;
    use porthole_keymaps::keysym::x11;
    use porthole_keymaps::{Browser, GuestOs};

    fn keys(queue: &EventQueue) -> Vec<KeyEvent> {
        queue.events().filter_map(QueuedEvent::as_key).copied().collect()
    }

    fn cooked(layout: LayoutId) -> KeyboardTranslator {
        KeyboardTranslator::new(layout, KeyboardEnv::default(), false)
    }

    #[test]
    fn zero_keycode_down_is_back_filled_from_press() {
        let mut translator = cooked(LayoutId::Us);
        let mut queue = EventQueue::new();
        translator.submit(KeyEvent::down(0, Modifiers::SHIFT), &mut queue);
        translator.submit(KeyEvent::press(95, Modifiers::SHIFT), &mut queue);

        assert_eq!(
            keys(&queue),
            vec![
                KeyEvent::down(109, Modifiers::SHIFT),
                KeyEvent::press(95, Modifiers::SHIFT),
            ]
        );
    }

    #[test]
    fn unmapped_zero_keycode_is_left_alone() {
        let mut translator = cooked(LayoutId::Us);
        let mut queue = EventQueue::new();
        translator.submit(KeyEvent::down(0, Modifiers::NONE), &mut queue);
        translator.submit(KeyEvent::press('q' as u32, Modifiers::NONE), &mut queue);
        assert_eq!(keys(&queue)[0], KeyEvent::down(0, Modifiers::NONE));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn lone_press_gets_synthesized_shifted_down() {
        let mut translator = cooked(LayoutId::Us);
        let mut queue = EventQueue::new();
        translator.submit(KeyEvent::press(65, Modifiers::NONE), &mut queue);

        assert_eq!(
            keys(&queue),
            vec![
                KeyEvent::down(65, Modifiers::SHIFT),
                KeyEvent::press(65, Modifiers::NONE),
            ]
        );
    }

    #[test]
    fn press_after_key_up_is_lone() {
        let mut translator = cooked(LayoutId::Us);
        let mut queue = EventQueue::new();
        translator.submit(KeyEvent::down(65, Modifiers::NONE), &mut queue);
        translator.submit(KeyEvent::press('a' as u32, Modifiers::NONE), &mut queue);
        translator.submit(KeyEvent::up(65, Modifiers::NONE), &mut queue);
        translator.submit(KeyEvent::press('b' as u32, Modifiers::NONE), &mut queue);

        let queued = keys(&queue);
        assert_eq!(queued.len(), 5);
        assert_eq!(queued[3], KeyEvent::down(66, Modifiers::NONE));
    }

    #[test]
    fn press_tracking_survives_a_flush() {
        let mut translator = cooked(LayoutId::Us);
        let mut queue = EventQueue::new();
        translator.submit(KeyEvent::down(65, Modifiers::NONE), &mut queue);
        let _ = queue.take_batch();
        translator.submit(KeyEvent::press('a' as u32, Modifiers::NONE), &mut queue);
        assert_eq!(keys(&queue), vec![KeyEvent::press('a' as u32, Modifiers::NONE)]);
    }

    #[test]
    fn non_printable_keys_translate_to_keysyms() {
        let mut translator = cooked(LayoutId::Us);
        let mut queue = EventQueue::new();
        translator.submit(KeyEvent::down(js::BACKSPACE, Modifiers::NONE), &mut queue);
        translator.submit(KeyEvent::up(js::BACKSPACE, Modifiers::NONE), &mut queue);
        assert_eq!(
            keys(&queue),
            vec![
                KeyEvent::down(x11::BACKSPACE, Modifiers::NONE),
                KeyEvent::up(x11::BACKSPACE, Modifiers::NONE),
            ]
        );
    }

    #[test]
    fn french_altgr_press_expands_in_place() {
        let env = KeyboardEnv {
            guest_os: GuestOs::Linux,
            browser: Browser::Chrome,
        };
        let mut translator = KeyboardTranslator::new(LayoutId::Fr, env, false);
        let mut queue = EventQueue::new();
        translator.submit(KeyEvent::down(48, Modifiers::ALT), &mut queue);
        translator.submit(KeyEvent::press('@' as u32, Modifiers::ALT), &mut queue);

        let codes: Vec<_> = keys(&queue).iter().map(|key| (key.kind, key.code)).collect();
        assert_eq!(
            codes,
            vec![
                (KeyEventKind::Down, 48),
                (KeyEventKind::Down, x11::ISO_LEVEL3_SHIFT),
                (KeyEventKind::Down, x11::AGRAVE),
                (KeyEventKind::Up, x11::AGRAVE),
                (KeyEventKind::Up, x11::ISO_LEVEL3_SHIFT),
            ]
        );
    }

    #[test]
    fn raw_numpad_multiply_expands_to_shift_eight() {
        let mut translator = KeyboardTranslator::new(LayoutId::Us, KeyboardEnv::default(), true);
        let mut queue = EventQueue::new();
        translator.submit(KeyEvent::down(js::NUMPAD_MULTIPLY, Modifiers::NONE), &mut queue);
        translator.submit(KeyEvent::up(js::NUMPAD_MULTIPLY, Modifiers::NONE), &mut queue);

        assert_eq!(
            keys(&queue),
            vec![
                KeyEvent::down(js::SHIFT, Modifiers::SHIFT),
                KeyEvent::down(js::DIGIT_8, Modifiers::SHIFT),
                KeyEvent::up(js::DIGIT_8, Modifiers::SHIFT),
                KeyEvent::up(js::SHIFT, Modifiers::NONE),
            ]
        );
    }

    #[test]
    fn raw_mode_forwards_browser_codes() {
        let mut translator = KeyboardTranslator::new(LayoutId::Us, KeyboardEnv::default(), true);
        let mut queue = EventQueue::new();
        translator.submit(KeyEvent::down(js::BACKSPACE, Modifiers::NONE), &mut queue);
        translator.submit(KeyEvent::down(js::NUMPAD_ADD, Modifiers::NONE), &mut queue);
        assert_eq!(
            keys(&queue),
            vec![
                KeyEvent::down(js::BACKSPACE, Modifiers::NONE),
                KeyEvent::down(js::SHIFT, Modifiers::SHIFT),
                KeyEvent::down(js::EQUAL, Modifiers::SHIFT),
            ]
        );
    }
}
