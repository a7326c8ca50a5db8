//! Browser key codes (as reported by `keydown`/`keyup`) and the X11 keysyms
//! the console host expects for them.

pub mod js {
    pub const BACKSPACE: u32 = 8;
    pub const TAB: u32 = 9;
    pub const ENTER: u32 = 13;
    pub const SHIFT: u32 = 16;
    pub const CTRL: u32 = 17;
    pub const ALT: u32 = 18;
    pub const PAUSE: u32 = 19;
    pub const CAPSLOCK: u32 = 20;
    pub const ESCAPE: u32 = 27;
    pub const SPACE: u32 = 32;
    pub const PAGE_UP: u32 = 33;
    pub const PAGE_DOWN: u32 = 34;
    pub const END: u32 = 35;
    pub const HOME: u32 = 36;
    pub const LEFT: u32 = 37;
    pub const UP: u32 = 38;
    pub const RIGHT: u32 = 39;
    pub const DOWN: u32 = 40;
    pub const PRINT_SCREEN: u32 = 44;
    pub const INSERT: u32 = 45;
    pub const DELETE: u32 = 46;
    pub const DIGIT_8: u32 = 56;
    pub const META_LEFT: u32 = 91;
    pub const META_RIGHT: u32 = 92;
    pub const CONTEXT_MENU: u32 = 93;
    pub const NUMPAD_0: u32 = 96;
    pub const NUMPAD_MULTIPLY: u32 = 106;
    pub const NUMPAD_ADD: u32 = 107;
    pub const NUMPAD_SUBTRACT: u32 = 109;
    pub const NUMPAD_DECIMAL: u32 = 110;
    pub const NUMPAD_DIVIDE: u32 = 111;
    pub const F1: u32 = 112;
    pub const NUM_LOCK: u32 = 144;
    pub const SCROLL_LOCK: u32 = 145;
    pub const SEMICOLON: u32 = 186;
    pub const EQUAL: u32 = 187;
    pub const COMMA: u32 = 188;
    pub const MINUS: u32 = 189;
    pub const PERIOD: u32 = 190;
    pub const SLASH: u32 = 191;
    pub const BACKQUOTE: u32 = 192;
    pub const OPEN_BRACKET: u32 = 219;
    pub const BACKSLASH: u32 = 220;
    pub const CLOSE_BRACKET: u32 = 221;
    pub const QUOTE: u32 = 222;
    pub const INTL_BACKSLASH: u32 = 226;

    // Gecko reports a handful of punctuation keys with its own codes.
    pub const FF_SEMICOLON: u32 = 59;
    pub const FF_EQUAL: u32 = 61;
    pub const FF_HASH: u32 = 163;
    pub const FF_CLOSE_PAREN: u32 = 169;
    pub const FF_MINUS: u32 = 173;
    pub const FF_META: u32 = 224;

    // Japanese IME keys.
    pub const CONVERT: u32 = 28;
    pub const NON_CONVERT: u32 = 29;
    pub const EISU: u32 = 240;
    pub const KATAKANA_HIRAGANA: u32 = 242;
    pub const HANKAKU: u32 = 243;
    pub const ZENKAKU: u32 = 244;
}

pub mod x11 {
    pub const BACKSPACE: u32 = 0xff08;
    pub const TAB: u32 = 0xff09;
    pub const RETURN: u32 = 0xff0d;
    pub const PAUSE: u32 = 0xff13;
    pub const SCROLL_LOCK: u32 = 0xff14;
    pub const ESCAPE: u32 = 0xff1b;
    pub const HOME: u32 = 0xff50;
    pub const LEFT: u32 = 0xff51;
    pub const UP: u32 = 0xff52;
    pub const RIGHT: u32 = 0xff53;
    pub const DOWN: u32 = 0xff54;
    pub const PAGE_UP: u32 = 0xff55;
    pub const PAGE_DOWN: u32 = 0xff56;
    pub const END: u32 = 0xff57;
    pub const PRINT: u32 = 0xff61;
    pub const INSERT: u32 = 0xff63;
    pub const MENU: u32 = 0xff67;
    pub const NUM_LOCK: u32 = 0xff7f;
    pub const KP_MULTIPLY: u32 = 0xffaa;
    pub const KP_ADD: u32 = 0xffab;
    pub const KP_SUBTRACT: u32 = 0xffad;
    pub const KP_DECIMAL: u32 = 0xffae;
    pub const KP_DIVIDE: u32 = 0xffaf;
    pub const KP_0: u32 = 0xffb0;
    pub const F1: u32 = 0xffbe;
    pub const SHIFT_L: u32 = 0xffe1;
    pub const CONTROL_L: u32 = 0xffe3;
    pub const CAPS_LOCK: u32 = 0xffe5;
    pub const ALT_L: u32 = 0xffe9;
    pub const SUPER_L: u32 = 0xffeb;
    pub const SUPER_R: u32 = 0xffec;
    pub const DELETE: u32 = 0xffff;
    pub const ISO_LEVEL3_SHIFT: u32 = 0xfe03;

    pub const MUHENKAN: u32 = 0xff22;
    pub const HENKAN: u32 = 0xff23;
    pub const HIRAGANA_KATAKANA: u32 = 0xff27;
    pub const ZENKAKU_HANKAKU: u32 = 0xff2a;
    pub const EISU_TOGGLE: u32 = 0xff30;

    pub const NUMBERSIGN: u32 = 0x23;
    pub const PARENRIGHT: u32 = 0x29;
    pub const SEMICOLON: u32 = 0x3b;
    pub const EQUAL: u32 = 0x3d;
    pub const MINUS: u32 = 0x2d;
    pub const BACKSLASH: u32 = 0x5c;
    pub const GRAVE: u32 = 0x60;
    pub const CURRENCY: u32 = 0xa4;
    pub const STERLING: u32 = 0xa3;
    pub const YEN: u32 = 0xa5;
    pub const SECTION: u32 = 0xa7;
    pub const DIAERESIS: u32 = 0xa8;
    pub const NOTSIGN: u32 = 0xac;
    pub const DEGREE: u32 = 0xb0;
    pub const TWOSUPERIOR: u32 = 0xb2;
    pub const MU: u32 = 0xb5;
    pub const AGRAVE: u32 = 0xe0;
    pub const CCEDILLA: u32 = 0xe7;
    pub const EGRAVE: u32 = 0xe8;
    pub const EACUTE: u32 = 0xe9;
    pub const UGRAVE: u32 = 0xf9;
    pub const EURO_SIGN: u32 = 0x20ac;
}
