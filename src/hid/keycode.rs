//! ASCII → HID usage mapping for a US layout.
//!
//! [`lookup`] is total over `u8`: the documented domain is ASCII
//! `0..=127`, anything else (and any unlisted ASCII byte) maps to
//! [`KeyMapping::NONE`].  Callers skip no-op mappings instead of
//! treating them as errors.

/// HID Keyboard/Keypad page usage codes used by the tables below.
pub mod key {
    pub const NONE: u8 = 0x00;
    pub const A: u8 = 0x04;
    pub const R: u8 = 0x15;
    pub const Z: u8 = 0x1D;
    pub const N1: u8 = 0x1E;
    pub const N2: u8 = 0x1F;
    pub const N3: u8 = 0x20;
    pub const N4: u8 = 0x21;
    pub const N5: u8 = 0x22;
    pub const N6: u8 = 0x23;
    pub const N7: u8 = 0x24;
    pub const N8: u8 = 0x25;
    pub const N9: u8 = 0x26;
    pub const N0: u8 = 0x27;
    pub const ENTER: u8 = 0x28;
    pub const TAB: u8 = 0x2B;
    pub const SPACE: u8 = 0x2C;
    pub const MINUS: u8 = 0x2D;
    pub const EQUAL: u8 = 0x2E;
    pub const BRACKET_LEFT: u8 = 0x2F;
    pub const BRACKET_RIGHT: u8 = 0x30;
    pub const BACKSLASH: u8 = 0x31;
    pub const SEMICOLON: u8 = 0x33;
    pub const APOSTROPHE: u8 = 0x34;
    pub const GRAVE: u8 = 0x35;
    pub const COMMA: u8 = 0x36;
    pub const PERIOD: u8 = 0x37;
    pub const SLASH: u8 = 0x38;
}

/// Result of a character lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyMapping {
    pub keycode: u8,
    pub shift: bool,
}

impl KeyMapping {
    /// The "no mapping" result.
    pub const NONE: Self = Self {
        keycode: key::NONE,
        shift: false,
    };

    const fn plain(keycode: u8) -> Self {
        Self {
            keycode,
            shift: false,
        }
    }

    const fn shifted(keycode: u8) -> Self {
        Self {
            keycode,
            shift: true,
        }
    }

    pub fn is_none(&self) -> bool {
        self.keycode == key::NONE
    }
}

const fn build_plain() -> [u8; 128] {
    let mut t = [key::NONE; 128];
    let mut i = 0;
    while i < 26 {
        t[b'a' as usize + i] = key::A + i as u8;
        i += 1;
    }
    // '1'..'9' then '0', matching the usage order.
    let mut d = 0;
    while d < 9 {
        t[b'1' as usize + d] = key::N1 + d as u8;
        d += 1;
    }
    t[b'0' as usize] = key::N0;
    t[b' ' as usize] = key::SPACE;
    t[b'\n' as usize] = key::ENTER;
    t[b'\t' as usize] = key::TAB;
    t[b'-' as usize] = key::MINUS;
    t[b'=' as usize] = key::EQUAL;
    t[b'[' as usize] = key::BRACKET_LEFT;
    t[b']' as usize] = key::BRACKET_RIGHT;
    t[b'\\' as usize] = key::BACKSLASH;
    t[b';' as usize] = key::SEMICOLON;
    t[b'\'' as usize] = key::APOSTROPHE;
    t[b'`' as usize] = key::GRAVE;
    t[b',' as usize] = key::COMMA;
    t[b'.' as usize] = key::PERIOD;
    t[b'/' as usize] = key::SLASH;
    t
}

const fn build_shifted() -> [u8; 128] {
    let mut t = [key::NONE; 128];
    let mut i = 0;
    while i < 26 {
        t[b'A' as usize + i] = key::A + i as u8;
        i += 1;
    }
    t[b'!' as usize] = key::N1;
    t[b'@' as usize] = key::N2;
    t[b'#' as usize] = key::N3;
    t[b'$' as usize] = key::N4;
    t[b'%' as usize] = key::N5;
    t[b'^' as usize] = key::N6;
    t[b'&' as usize] = key::N7;
    t[b'*' as usize] = key::N8;
    t[b'(' as usize] = key::N9;
    t[b')' as usize] = key::N0;
    t[b'_' as usize] = key::MINUS;
    t[b'+' as usize] = key::EQUAL;
    t[b'{' as usize] = key::BRACKET_LEFT;
    t[b'}' as usize] = key::BRACKET_RIGHT;
    t[b'|' as usize] = key::BACKSLASH;
    t[b':' as usize] = key::SEMICOLON;
    t[b'"' as usize] = key::APOSTROPHE;
    t[b'~' as usize] = key::GRAVE;
    t[b'<' as usize] = key::COMMA;
    t[b'>' as usize] = key::PERIOD;
    t[b'?' as usize] = key::SLASH;
    t
}

static PLAIN: [u8; 128] = build_plain();
static SHIFTED: [u8; 128] = build_shifted();

/// Map one byte to its keycode and whether Left Shift must be held.
pub fn lookup(c: u8) -> KeyMapping {
    let idx = usize::from(c);
    if idx >= PLAIN.len() {
        return KeyMapping::NONE;
    }
    match (PLAIN[idx], SHIFTED[idx]) {
        (key::NONE, key::NONE) => KeyMapping::NONE,
        (_, key::NONE) => KeyMapping::plain(PLAIN[idx]),
        (_, code) => KeyMapping::shifted(code),
    }
}

/// `true` if `c` is typed with Left Shift held.
pub fn needs_shift(c: u8) -> bool {
    lookup(c).shift
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_follow_case() {
        assert_eq!(lookup(b'a'), KeyMapping::plain(key::A));
        assert_eq!(lookup(b'A'), KeyMapping::shifted(key::A));
        assert_eq!(lookup(b'z').keycode, key::Z);
        assert!(lookup(b'Z').shift);
        assert_eq!(lookup(b'r').keycode, key::R);
    }

    #[test]
    fn digits_and_their_shifted_symbols_share_keys() {
        for (digit, symbol) in b"1234567890".iter().zip(b"!@#$%^&*()".iter()) {
            let d = lookup(*digit);
            let s = lookup(*symbol);
            assert!(!d.shift);
            assert!(s.shift);
            assert_eq!(d.keycode, s.keycode, "{} vs {}", *digit as char, *symbol as char);
        }
    }

    #[test]
    fn whitespace_keys() {
        assert_eq!(lookup(b' ').keycode, key::SPACE);
        assert_eq!(lookup(b'\n').keycode, key::ENTER);
        assert_eq!(lookup(b'\t').keycode, key::TAB);
        assert!(!lookup(b'\n').shift);
    }

    #[test]
    fn unmapped_and_out_of_range_are_noop() {
        assert!(lookup(b'\r').is_none());
        assert!(lookup(0x00).is_none());
        assert!(lookup(0x7F).is_none());
        assert_eq!(lookup(0x80), KeyMapping::NONE);
        assert_eq!(lookup(0xFF), KeyMapping::NONE);
    }

    #[test]
    fn needs_shift_matches_symbol_set() {
        let shifted = b"!@#$%^&*()_+{}|:\"~<>?";
        for &c in shifted {
            assert!(needs_shift(c), "{}", c as char);
        }
        for &c in b"-=[]\\;'`,./ 0a" {
            assert!(!needs_shift(c), "{}", c as char);
        }
    }
}
