//! String escaping shared by requests and responses.
//!
//! Only two characters are escaped: a newline becomes `\n` and a backslash
//! becomes `\\`. Everything else travels verbatim, which keeps every record on
//! a single line.

/// Escapes newlines and backslashes so the text fits on one protocol line.
///
/// # Example
///
/// ```
/// assert_eq!(rfs_protocol::escape("a\nb\\c"), "a\\nb\\\\c");
/// ```
#[must_use]
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\n' => escaped.push_str("\\n"),
            '\\' => escaped.push_str("\\\\"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Reverses [`escape`].
///
/// A backslash followed by anything other than `n` or another backslash, or
/// a trailing lone backslash, is kept as is.
///
/// # Example
///
/// ```
/// assert_eq!(rfs_protocol::unescape("a\\nb\\\\c"), "a\nb\\c");
/// assert_eq!(rfs_protocol::unescape("c:\\tmp"), "c:\\tmp");
/// ```
#[must_use]
pub fn unescape(text: &str) -> String {
    let mut unescaped = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            unescaped.push(ch);
            continue;
        }
        match chars.peek() {
            Some('n') => {
                unescaped.push('\n');
                chars.next();
            }
            Some('\\') => {
                unescaped.push('\\');
                chars.next();
            }
            _ => unescaped.push('\\'),
        }
    }
    unescaped
}
