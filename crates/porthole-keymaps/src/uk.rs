use crate::keysym::{js, x11};
use crate::{Browser, EntryFilter, GuestOs, KeyAction, KeyMap, KeyMapEntry, LayoutId};

const FIREFOX: EntryFilter = EntryFilter::browser(Browser::Firefox);
const WINDOWS: EntryFilter = EntryFilter::guest(GuestOs::Windows);

pub(crate) static KEYMAP: KeyMap = KeyMap {
    id: LayoutId::Uk,
    x11: X11,
    keypress: KEYPRESS,
    fallback: Some(&crate::us::KEYMAP),
};

static X11: &[KeyMapEntry] = &[
    KeyMapEntry::code(js::INTL_BACKSLASH, x11::BACKSLASH),
    KeyMapEntry::filtered(js::FF_HASH, FIREFOX, x11::NUMBERSIGN),
    KeyMapEntry::code(js::QUOTE, x11::NUMBERSIGN),
];

// Windows guests only accept the euro sign through AltGr+4.
const EURO_WINDOWS: [KeyAction; 6] = [
    KeyAction::down(x11::CONTROL_L),
    KeyAction::down(x11::ALT_L),
    KeyAction::down('4' as u32),
    KeyAction::up('4' as u32),
    KeyAction::up(x11::ALT_L),
    KeyAction::up(x11::CONTROL_L),
];

static KEYPRESS: &[KeyMapEntry] = &[
    KeyMapEntry::code('£' as u32, x11::STERLING),
    KeyMapEntry::code('¬' as u32, x11::NOTSIGN),
    KeyMapEntry::filtered_sequence('€' as u32, WINDOWS, &EURO_WINDOWS),
    KeyMapEntry::code('€' as u32, x11::EURO_SIGN),
];
