use crate::keysym::{js, x11};
use crate::{Browser, EntryFilter, GuestOs, KeyMap, KeyMapEntry, LayoutId};

const FIREFOX: EntryFilter = EntryFilter::browser(Browser::Firefox);
const WINDOWS: EntryFilter = EntryFilter::guest(GuestOs::Windows);

pub(crate) static KEYMAP: KeyMap = KeyMap {
    id: LayoutId::Jp,
    x11: X11,
    keypress: KEYPRESS,
    fallback: Some(&crate::us::KEYMAP),
};

static X11: &[KeyMapEntry] = &[
    KeyMapEntry::code(js::CONVERT, x11::HENKAN),
    KeyMapEntry::code(js::NON_CONVERT, x11::MUHENKAN),
    KeyMapEntry::code(js::KATAKANA_HIRAGANA, x11::HIRAGANA_KATAKANA),
    KeyMapEntry::code(js::HANKAKU, x11::ZENKAKU_HANKAKU),
    KeyMapEntry::code(js::ZENKAKU, x11::ZENKAKU_HANKAKU),
    KeyMapEntry::code(js::EISU, x11::EISU_TOGGLE),
    // The "ro" key next to right shift.
    KeyMapEntry::code(js::INTL_BACKSLASH, x11::BACKSLASH),
    // Gecko reports the ':' key on JP layouts with the ';' code.
    KeyMapEntry::filtered(js::FF_SEMICOLON, FIREFOX, js::SEMICOLON),
];

static KEYPRESS: &[KeyMapEntry] = &[
    // Windows guests render the backslash glyph as a yen sign.
    KeyMapEntry::filtered('\\' as u32, WINDOWS, x11::YEN),
    KeyMapEntry::code('¥' as u32, x11::YEN),
    KeyMapEntry::code('￥' as u32, x11::YEN),
];
