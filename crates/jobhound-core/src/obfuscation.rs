//! Decoding of glyph-substituted digits.
//!
//! The site renders salary digits with private-use-area code points backed by
//! a custom web font, so the raw DOM text of `15-25K` is unreadable. The
//! substitution is a fixed ten-entry table.

/// First code point of the obfuscation range; it maps to `'0'`.
const RANGE_START: u32 = 0xE031;

/// Last code point of the obfuscation range; it maps to `'9'`.
const RANGE_END: u32 = 0xE03A;

/// Map a single character through the substitution table.
#[must_use]
pub fn decode_char(c: char) -> char {
    let code = u32::from(c);
    if (RANGE_START..=RANGE_END).contains(&code) {
        char::from_digit(code - RANGE_START, 10).unwrap_or(c)
    } else {
        c
    }
}

/// Replace every obfuscated digit in `text`; other characters pass through.
#[must_use]
pub fn decode(text: &str) -> String {
    text.chars().map(decode_char).collect()
}

/// Whether `text` still contains characters from the obfuscation range.
#[must_use]
pub fn is_obfuscated(text: &str) -> bool {
    text.chars()
        .any(|c| (RANGE_START..=RANGE_END).contains(&u32::from(c)))
}
