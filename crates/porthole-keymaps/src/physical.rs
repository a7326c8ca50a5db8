use crate::keysym::js;

/// The U.S. keyboard key that produces a character, and whether SHIFT has to
/// be held for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhysicalKey {
    pub code: u32,
    pub shift: bool,
}

impl PhysicalKey {
    const fn plain(code: u32) -> Self {
        Self { code, shift: false }
    }

    const fn shifted(code: u32) -> Self {
        Self { code, shift: true }
    }
}

/// Looks up the physical key for a `keypress` character code on a U.S.
/// layout.
pub fn us_physical_key(char_code: u32) -> Option<PhysicalKey> {
    let ch = char::from_u32(char_code)?;
    let key = match ch {
        'a'..='z' => PhysicalKey::plain(ch.to_ascii_uppercase() as u32),
        'A'..='Z' | '0'..='9' => PhysicalKey {
            code: ch as u32,
            shift: ch.is_ascii_uppercase(),
        },
        ' ' => PhysicalKey::plain(js::SPACE),
        ')' => PhysicalKey::shifted('0' as u32),
        '!' => PhysicalKey::shifted('1' as u32),
        '@' => PhysicalKey::shifted('2' as u32),
        '#' => PhysicalKey::shifted('3' as u32),
        '$' => PhysicalKey::shifted('4' as u32),
        '%' => PhysicalKey::shifted('5' as u32),
        '^' => PhysicalKey::shifted('6' as u32),
        '&' => PhysicalKey::shifted('7' as u32),
        '*' => PhysicalKey::shifted('8' as u32),
        '(' => PhysicalKey::shifted('9' as u32),
        ';' => PhysicalKey::plain(js::SEMICOLON),
        ':' => PhysicalKey::shifted(js::SEMICOLON),
        '=' => PhysicalKey::plain(js::EQUAL),
        '+' => PhysicalKey::shifted(js::EQUAL),
        ',' => PhysicalKey::plain(js::COMMA),
        '<' => PhysicalKey::shifted(js::COMMA),
        '-' => PhysicalKey::plain(js::MINUS),
        '_' => PhysicalKey::shifted(js::MINUS),
        '.' => PhysicalKey::plain(js::PERIOD),
        '>' => PhysicalKey::shifted(js::PERIOD),
        '/' => PhysicalKey::plain(js::SLASH),
        '?' => PhysicalKey::shifted(js::SLASH),
        '`' => PhysicalKey::plain(js::BACKQUOTE),
        '~' => PhysicalKey::shifted(js::BACKQUOTE),
        '[' => PhysicalKey::plain(js::OPEN_BRACKET),
        '{' => PhysicalKey::shifted(js::OPEN_BRACKET),
        '\\' => PhysicalKey::plain(js::BACKSLASH),
        '|' => PhysicalKey::shifted(js::BACKSLASH),
        ']' => PhysicalKey::plain(js::CLOSE_BRACKET),
        '}' => PhysicalKey::shifted(js::CLOSE_BRACKET),
        '\'' => PhysicalKey::plain(js::QUOTE),
        '"' => PhysicalKey::shifted(js::QUOTE),
        _ => return None,
    };
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_carry_shift_only_when_upper_case() {
        assert_eq!(us_physical_key('a' as u32), Some(PhysicalKey::plain(65)));
        assert_eq!(us_physical_key('A' as u32), Some(PhysicalKey::shifted(65)));
        assert_eq!(us_physical_key('7' as u32), Some(PhysicalKey::plain(55)));
    }

    #[test]
    fn shifted_punctuation_uses_its_base_key() {
        assert_eq!(us_physical_key('*' as u32), Some(PhysicalKey::shifted(56)));
        assert_eq!(us_physical_key('"' as u32), Some(PhysicalKey::shifted(222)));
        assert_eq!(us_physical_key('_' as u32), Some(PhysicalKey::shifted(189)));
    }

    #[test]
    fn characters_outside_the_layout_are_unknown() {
        assert_eq!(us_physical_key('é' as u32), None);
        assert_eq!(us_physical_key(0x11_0000), None);
    }
}
