//! Scancode set 1 to ASCII.
//!
//! Only ever called from the keyboard interrupt, so the modifier state has
//! no locking of its own.

pub const LEFT_SHIFT_PRESSED: u8 = 0x2a;
pub const RIGHT_SHIFT_PRESSED: u8 = 0x36;
pub const LEFT_SHIFT_RELEASED: u8 = 0xaa;
pub const RIGHT_SHIFT_RELEASED: u8 = 0xb6;
pub const CAPS_LOCK_PRESSED: u8 = 0x3a;

const BACKTICK_PRESSED: u8 = 0x29;
const BACKSLASH_PRESSED: u8 = 0x2b;
const ENTER_PRESSED: u8 = 0x1c;
const SPACE_PRESSED: u8 = 0x39;
const BACKSPACE_PRESSED: u8 = 0x0e;
const TAB_PRESSED: u8 = 0x0f;

/// Byte emitted for the backspace key.
pub const BACKSPACE: u8 = 0x08;

const CASE_OFFSET: u8 = b'a' - b'A';

/// A run of consecutive scancodes and what they produce with and without
/// shift held.
struct Row {
    first: u8,
    normal: &'static [u8],
    shifted: &'static [u8],
}

impl Row {
    fn lookup(&self, scancode: u8, shift: bool) -> Option<u8> {
        let index = scancode.checked_sub(self.first)? as usize;
        let table = if shift { self.shifted } else { self.normal };
        table.get(index).copied()
    }
}

const ROWS: [Row; 4] = [
    Row { first: 0x02, normal: b"1234567890-=", shifted: b"!@#$%^&*()_+" },
    Row { first: 0x10, normal: b"qwertyuiop[]", shifted: b"QWERTYUIOP{}" },
    Row { first: 0x1e, normal: b"asdfghjkl;'", shifted: b"ASDFGHJKL:\"" },
    Row { first: 0x2c, normal: b"zxcvbnm,./", shifted: b"ZXCVBNM<>?" },
];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub caps_lock: bool,
}

#[derive(Debug, Default)]
pub struct ScancodeTranslator {
    modifiers: Modifiers,
}

impl ScancodeTranslator {
    pub const fn new() -> Self {
        ScancodeTranslator {
            modifiers: Modifiers {
                shift: false,
                caps_lock: false,
            },
        }
    }

    pub const fn with_modifiers(modifiers: Modifiers) -> Self {
        ScancodeTranslator { modifiers }
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Feeds one scancode. Modifier keys and anything unrecognised,
    /// including every key release, produce `None`.
    pub fn translate(&mut self, scancode: u8) -> Option<u8> {
        match scancode {
            LEFT_SHIFT_PRESSED | RIGHT_SHIFT_PRESSED => {
                self.modifiers.shift = true;
                None
            }
            LEFT_SHIFT_RELEASED | RIGHT_SHIFT_RELEASED => {
                self.modifiers.shift = false;
                None
            }
            CAPS_LOCK_PRESSED => {
                self.modifiers.caps_lock = !self.modifiers.caps_lock;
                None
            }
            _ => {
                let key = lookup(scancode, self.modifiers.shift)?;
                Some(if self.modifiers.caps_lock { flip_letter_case(key) } else { key })
            }
        }
    }
}

fn lookup(scancode: u8, shift: bool) -> Option<u8> {
    if let Some(key) = ROWS.iter().find_map(|row| row.lookup(scancode, shift)) {
        return Some(key);
    }

    match scancode {
        BACKTICK_PRESSED => Some(if shift { b'~' } else { b'`' }),
        BACKSLASH_PRESSED => Some(if shift { b'|' } else { b'\\' }),
        ENTER_PRESSED => Some(b'\n'),
        SPACE_PRESSED => Some(b' '),
        BACKSPACE_PRESSED => Some(BACKSPACE),
        TAB_PRESSED => Some(b'\t'),
        _ => None,
    }
}

/// Caps lock inverts letters whichever table they came from.
fn flip_letter_case(key: u8) -> u8 {
    match key {
        b'a'..=b'z' => key - CASE_OFFSET,
        b'A'..=b'Z' => key + CASE_OFFSET,
        _ => key,
    }
}
