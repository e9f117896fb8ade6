//! Cursor-based decoding of a single response line.
//!
//! The helper writes every field as either a decimal number or a
//! length-prefixed escaped string, separated by single spaces. [`Buffer`]
//! pulls those fields off the front of the line one at a time. It is lenient
//! on purpose: a string whose declared length runs past the end of the line
//! is clamped and logged rather than rejected, so a partially corrupted
//! stream still yields as much data as possible.

use tracing::warn;

use crate::PROTOCOL_TARGET;
use crate::escape::unescape;

/// A read cursor over one line of response text.
///
/// String lengths are counted in characters, matching the helper, which
/// reports `utf8` character counts of the escaped text.
///
/// # Example
///
/// ```
/// use rfs_protocol::Buffer;
///
/// let mut buffer = Buffer::new("-123abc");
/// assert_eq!(buffer.get_long(), -123);
/// assert_eq!(buffer.remaining(), "abc");
/// ```
#[derive(Debug, Clone)]
pub struct Buffer<'a> {
    text: &'a str,
    cursor: usize,
}

impl<'a> Buffer<'a> {
    /// Creates a buffer positioned at the start of `text`.
    #[must_use]
    pub const fn new(text: &'a str) -> Self {
        Self { text, cursor: 0 }
    }

    /// Byte offset of the cursor.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.cursor
    }

    /// The text from the cursor to the end of the line.
    #[must_use]
    pub fn remaining(&self) -> &'a str {
        self.text.get(self.cursor..).unwrap_or_default()
    }

    /// Whether only spaces (or nothing) remain.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining().trim_start_matches(' ').is_empty()
    }

    /// Reads one character, skipping leading spaces and one trailing space.
    ///
    /// Returns `None` at the end of the line.
    pub fn get_char(&mut self) -> Option<char> {
        self.skip_spaces();
        let ch = self.remaining().chars().next()?;
        self.cursor += ch.len_utf8();
        self.skip_one_space();
        Some(ch)
    }

    /// Reads a decimal integer; see [`Buffer::get_long`] for the rules.
    ///
    /// Values outside the `i32` range saturate.
    pub fn get_int(&mut self) -> i32 {
        let value = self.get_long();
        i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
    }

    /// Reads an optionally negative decimal number.
    ///
    /// Leading spaces are skipped and digits are consumed greedily; the cursor
    /// stops at the first non-digit without consuming it. When no digits are
    /// present the cursor does not move and 0 is returned. Overflow saturates.
    pub fn get_long(&mut self) -> i64 {
        self.try_get_long().unwrap_or(0)
    }

    /// Like [`Buffer::get_long`], but returns `None` when no digits are present.
    pub fn try_get_long(&mut self) -> Option<i64> {
        self.skip_spaces();
        let rest = self.remaining();
        let negative = rest.starts_with('-');
        let sign_len = usize::from(negative);
        let digits = rest.get(sign_len..).unwrap_or_default();
        let digit_len = digits.bytes().take_while(u8::is_ascii_digit).count();
        if digit_len == 0 {
            return None;
        }

        let mut value: i64 = 0;
        let mut overflowed = false;
        for digit in digits.bytes().take(digit_len) {
            let unit = i64::from(digit - b'0');
            let signed_unit = if negative { -unit } else { unit };
            match value.checked_mul(10).and_then(|v| v.checked_add(signed_unit)) {
                Some(next) => value = next,
                None => {
                    overflowed = true;
                    value = if negative { i64::MIN } else { i64::MAX };
                    break;
                }
            }
        }
        if overflowed {
            warn!(
                target: PROTOCOL_TARGET,
                line = self.text,
                "numeric field overflows, saturating"
            );
        }

        self.cursor += sign_len + digit_len;
        Some(value)
    }

    /// Reads a length-prefixed escaped string and returns it unescaped.
    ///
    /// The length is read with [`Buffer::get_int`], then one separating space
    /// is skipped and that many characters are taken. A declared length that
    /// exceeds the rest of the line is clamped to what is available and logged.
    pub fn get_string(&mut self) -> String {
        let declared = self.get_int();
        self.skip_one_space();
        let rest = self.remaining();

        let wanted = usize::try_from(declared).unwrap_or_else(|_| {
            warn!(
                target: PROTOCOL_TARGET,
                line = self.text,
                declared,
                "negative string length, reading nothing"
            );
            0
        });
        let end = match rest.char_indices().nth(wanted) {
            Some((offset, _)) => offset,
            None => {
                let available = rest.chars().count();
                if wanted > available {
                    warn!(
                        target: PROTOCOL_TARGET,
                        line = self.text,
                        declared = wanted,
                        available,
                        "declared string length exceeds line, clamping"
                    );
                }
                rest.len()
            }
        };

        let raw = rest.get(..end).unwrap_or(rest);
        self.cursor += end;
        self.skip_one_space();
        unescape(raw)
    }

    /// Reads characters up to the next space, skipping leading spaces.
    pub fn get_word(&mut self) -> &'a str {
        self.skip_spaces();
        let rest = self.remaining();
        let end = rest.find(' ').unwrap_or(rest.len());
        self.cursor += end;
        self.skip_one_space();
        rest.get(..end).unwrap_or(rest)
    }

    /// Returns everything after the cursor without a trailing line break and
    /// moves the cursor to the end.
    pub fn get_rest(&mut self) -> &'a str {
        let rest = self.remaining();
        self.cursor = self.text.len();
        rest.trim_end_matches(['\n', '\r'])
    }

    fn skip_spaces(&mut self) {
        let rest = self.remaining();
        self.cursor += rest.len() - rest.trim_start_matches(' ').len();
    }

    fn skip_one_space(&mut self) {
        if self.remaining().starts_with(' ') {
            self.cursor += 1;
        }
    }
}
