use crate::keysym::{js, x11};
use crate::{Browser, EntryFilter, KeyMap, KeyMapEntry, LayoutId};

const FIREFOX: EntryFilter = EntryFilter::browser(Browser::Firefox);
const SAFARI: EntryFilter = EntryFilter::browser(Browser::Safari);

pub(crate) static KEYMAP: KeyMap = KeyMap {
    id: LayoutId::Us,
    x11: X11,
    keypress: KEYPRESS,
    fallback: None,
};

static X11: &[KeyMapEntry] = &[
    KeyMapEntry::code(js::BACKSPACE, x11::BACKSPACE),
    KeyMapEntry::code(js::TAB, x11::TAB),
    KeyMapEntry::code(js::ENTER, x11::RETURN),
    KeyMapEntry::code(js::ESCAPE, x11::ESCAPE),
    KeyMapEntry::code(js::INSERT, x11::INSERT),
    KeyMapEntry::code(js::DELETE, x11::DELETE),
    KeyMapEntry::code(js::HOME, x11::HOME),
    KeyMapEntry::code(js::END, x11::END),
    KeyMapEntry::code(js::PAGE_UP, x11::PAGE_UP),
    KeyMapEntry::code(js::PAGE_DOWN, x11::PAGE_DOWN),
    KeyMapEntry::code(js::LEFT, x11::LEFT),
    KeyMapEntry::code(js::UP, x11::UP),
    KeyMapEntry::code(js::RIGHT, x11::RIGHT),
    KeyMapEntry::code(js::DOWN, x11::DOWN),
    KeyMapEntry::code(js::F1, x11::F1),
    KeyMapEntry::code(js::F1 + 1, x11::F1 + 1),
    KeyMapEntry::code(js::F1 + 2, x11::F1 + 2),
    KeyMapEntry::code(js::F1 + 3, x11::F1 + 3),
    KeyMapEntry::code(js::F1 + 4, x11::F1 + 4),
    KeyMapEntry::code(js::F1 + 5, x11::F1 + 5),
    KeyMapEntry::code(js::F1 + 6, x11::F1 + 6),
    KeyMapEntry::code(js::F1 + 7, x11::F1 + 7),
    KeyMapEntry::code(js::F1 + 8, x11::F1 + 8),
    KeyMapEntry::code(js::F1 + 9, x11::F1 + 9),
    KeyMapEntry::code(js::F1 + 10, x11::F1 + 10),
    KeyMapEntry::code(js::F1 + 11, x11::F1 + 11),
    KeyMapEntry::code(js::SHIFT, x11::SHIFT_L),
    KeyMapEntry::code(js::CTRL, x11::CONTROL_L),
    KeyMapEntry::code(js::ALT, x11::ALT_L),
    KeyMapEntry::code(js::CAPSLOCK, x11::CAPS_LOCK),
    KeyMapEntry::code(js::PAUSE, x11::PAUSE),
    KeyMapEntry::code(js::PRINT_SCREEN, x11::PRINT),
    KeyMapEntry::code(js::NUM_LOCK, x11::NUM_LOCK),
    KeyMapEntry::code(js::SCROLL_LOCK, x11::SCROLL_LOCK),
    KeyMapEntry::code(js::META_LEFT, x11::SUPER_L),
    KeyMapEntry::code(js::META_RIGHT, x11::SUPER_R),
    KeyMapEntry::filtered(js::FF_META, FIREFOX, x11::SUPER_L),
    KeyMapEntry::code(js::CONTEXT_MENU, x11::MENU),
    KeyMapEntry::code(js::NUMPAD_0, x11::KP_0),
    KeyMapEntry::code(js::NUMPAD_0 + 1, x11::KP_0 + 1),
    KeyMapEntry::code(js::NUMPAD_0 + 2, x11::KP_0 + 2),
    KeyMapEntry::code(js::NUMPAD_0 + 3, x11::KP_0 + 3),
    KeyMapEntry::code(js::NUMPAD_0 + 4, x11::KP_0 + 4),
    KeyMapEntry::code(js::NUMPAD_0 + 5, x11::KP_0 + 5),
    KeyMapEntry::code(js::NUMPAD_0 + 6, x11::KP_0 + 6),
    KeyMapEntry::code(js::NUMPAD_0 + 7, x11::KP_0 + 7),
    KeyMapEntry::code(js::NUMPAD_0 + 8, x11::KP_0 + 8),
    KeyMapEntry::code(js::NUMPAD_0 + 9, x11::KP_0 + 9),
    KeyMapEntry::code(js::NUMPAD_MULTIPLY, x11::KP_MULTIPLY),
    KeyMapEntry::code(js::NUMPAD_ADD, x11::KP_ADD),
    KeyMapEntry::code(js::NUMPAD_SUBTRACT, x11::KP_SUBTRACT),
    KeyMapEntry::code(js::NUMPAD_DECIMAL, x11::KP_DECIMAL),
    KeyMapEntry::code(js::NUMPAD_DIVIDE, x11::KP_DIVIDE),
    // Gecko punctuation codes normalised to the common ones.
    KeyMapEntry::filtered(js::FF_SEMICOLON, FIREFOX, js::SEMICOLON),
    KeyMapEntry::filtered(js::FF_EQUAL, FIREFOX, js::EQUAL),
    KeyMapEntry::filtered(js::FF_MINUS, FIREFOX, js::MINUS),
    // WebKit on macOS reports numpad '=' as the main-row key.
    KeyMapEntry::filtered(js::FF_EQUAL, SAFARI, js::EQUAL),
];

static KEYPRESS: &[KeyMapEntry] = &[];
