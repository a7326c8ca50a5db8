use crate::keysym::{js, x11};
use crate::{Browser, EntryFilter, GuestOs, KeyAction, KeyMap, KeyMapEntry, LayoutId};

const FIREFOX: EntryFilter = EntryFilter::browser(Browser::Firefox);
const WINDOWS: EntryFilter = EntryFilter::guest(GuestOs::Windows);

pub(crate) static KEYMAP: KeyMap = KeyMap {
    id: LayoutId::Fr,
    x11: X11,
    keypress: KEYPRESS,
    fallback: Some(&crate::us::KEYMAP),
};

static X11: &[KeyMapEntry] = &[
    KeyMapEntry::filtered(js::FF_CLOSE_PAREN, FIREFOX, x11::PARENRIGHT),
    KeyMapEntry::code(js::INTL_BACKSLASH, '<' as u32),
];

/// AltGr as X servers see it.
const fn altgr(key: u32) -> [KeyAction; 4] {
    [
        KeyAction::down(x11::ISO_LEVEL3_SHIFT),
        KeyAction::down(key),
        KeyAction::up(key),
        KeyAction::up(x11::ISO_LEVEL3_SHIFT),
    ]
}

/// AltGr as Windows guests see it: Ctrl+Alt.
const fn ctrl_alt(key: u32) -> [KeyAction; 6] {
    [
        KeyAction::down(x11::CONTROL_L),
        KeyAction::down(x11::ALT_L),
        KeyAction::down(key),
        KeyAction::up(key),
        KeyAction::up(x11::ALT_L),
        KeyAction::up(x11::CONTROL_L),
    ]
}

// AZERTY top row: the base characters of the keys AltGr is combined with.
const ALTGR_TILDE: [KeyAction; 4] = altgr(x11::EACUTE);
const ALTGR_HASH: [KeyAction; 4] = altgr('"' as u32);
const ALTGR_LBRACE: [KeyAction; 4] = altgr('\'' as u32);
const ALTGR_LBRACKET: [KeyAction; 4] = altgr('(' as u32);
const ALTGR_PIPE: [KeyAction; 4] = altgr(x11::MINUS);
const ALTGR_BACKTICK: [KeyAction; 4] = altgr(x11::EGRAVE);
const ALTGR_BACKSLASH: [KeyAction; 4] = altgr('_' as u32);
const ALTGR_CARET: [KeyAction; 4] = altgr(x11::CCEDILLA);
const ALTGR_AT: [KeyAction; 4] = altgr(x11::AGRAVE);
const ALTGR_RBRACKET: [KeyAction; 4] = altgr(x11::PARENRIGHT);
const ALTGR_RBRACE: [KeyAction; 4] = altgr(x11::EQUAL);
const ALTGR_EURO: [KeyAction; 4] = altgr('e' as u32);

const WIN_TILDE: [KeyAction; 6] = ctrl_alt(x11::EACUTE);
const WIN_HASH: [KeyAction; 6] = ctrl_alt('"' as u32);
const WIN_LBRACE: [KeyAction; 6] = ctrl_alt('\'' as u32);
const WIN_LBRACKET: [KeyAction; 6] = ctrl_alt('(' as u32);
const WIN_PIPE: [KeyAction; 6] = ctrl_alt(x11::MINUS);
const WIN_BACKTICK: [KeyAction; 6] = ctrl_alt(x11::EGRAVE);
const WIN_BACKSLASH: [KeyAction; 6] = ctrl_alt('_' as u32);
const WIN_CARET: [KeyAction; 6] = ctrl_alt(x11::CCEDILLA);
const WIN_AT: [KeyAction; 6] = ctrl_alt(x11::AGRAVE);
const WIN_RBRACKET: [KeyAction; 6] = ctrl_alt(x11::PARENRIGHT);
const WIN_RBRACE: [KeyAction; 6] = ctrl_alt(x11::EQUAL);
const WIN_EURO: [KeyAction; 6] = ctrl_alt('e' as u32);

static KEYPRESS: &[KeyMapEntry] = &[
    KeyMapEntry::filtered_sequence('~' as u32, WINDOWS, &WIN_TILDE),
    KeyMapEntry::filtered_sequence('#' as u32, WINDOWS, &WIN_HASH),
    KeyMapEntry::filtered_sequence('{' as u32, WINDOWS, &WIN_LBRACE),
    KeyMapEntry::filtered_sequence('[' as u32, WINDOWS, &WIN_LBRACKET),
    KeyMapEntry::filtered_sequence('|' as u32, WINDOWS, &WIN_PIPE),
    KeyMapEntry::filtered_sequence('`' as u32, WINDOWS, &WIN_BACKTICK),
    KeyMapEntry::filtered_sequence('\\' as u32, WINDOWS, &WIN_BACKSLASH),
    KeyMapEntry::filtered_sequence('^' as u32, WINDOWS, &WIN_CARET),
    KeyMapEntry::filtered_sequence('@' as u32, WINDOWS, &WIN_AT),
    KeyMapEntry::filtered_sequence(']' as u32, WINDOWS, &WIN_RBRACKET),
    KeyMapEntry::filtered_sequence('}' as u32, WINDOWS, &WIN_RBRACE),
    KeyMapEntry::filtered_sequence('€' as u32, WINDOWS, &WIN_EURO),
    KeyMapEntry::sequence('~' as u32, &ALTGR_TILDE),
    KeyMapEntry::sequence('#' as u32, &ALTGR_HASH),
    KeyMapEntry::sequence('{' as u32, &ALTGR_LBRACE),
    KeyMapEntry::sequence('[' as u32, &ALTGR_LBRACKET),
    KeyMapEntry::sequence('|' as u32, &ALTGR_PIPE),
    KeyMapEntry::sequence('`' as u32, &ALTGR_BACKTICK),
    KeyMapEntry::sequence('\\' as u32, &ALTGR_BACKSLASH),
    KeyMapEntry::sequence('^' as u32, &ALTGR_CARET),
    KeyMapEntry::sequence('@' as u32, &ALTGR_AT),
    KeyMapEntry::sequence(']' as u32, &ALTGR_RBRACKET),
    KeyMapEntry::sequence('}' as u32, &ALTGR_RBRACE),
    KeyMapEntry::sequence('€' as u32, &ALTGR_EURO),
    KeyMapEntry::code('é' as u32, x11::EACUTE),
    KeyMapEntry::code('è' as u32, x11::EGRAVE),
    KeyMapEntry::code('ç' as u32, x11::CCEDILLA),
    KeyMapEntry::code('à' as u32, x11::AGRAVE),
    KeyMapEntry::code('ù' as u32, x11::UGRAVE),
    KeyMapEntry::code('²' as u32, x11::TWOSUPERIOR),
    KeyMapEntry::code('°' as u32, x11::DEGREE),
    KeyMapEntry::code('£' as u32, x11::STERLING),
    KeyMapEntry::code('µ' as u32, x11::MU),
    KeyMapEntry::code('§' as u32, x11::SECTION),
    KeyMapEntry::code('¤' as u32, x11::CURRENCY),
    KeyMapEntry::code('¨' as u32, x11::DIAERESIS),
];
