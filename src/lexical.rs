//! Byte classification shared by the directive and item parsers.
//!
//! Every delimiter in the fixture grammar is ASCII, so classifying bytes is
//! enough even for UTF-8 input: the continuation bytes of a multi-byte
//! character are all word bytes and never split a token.

/// Separator between a directive line and the expected output block.
pub const SEPARATOR: &str = "----";

/// Returns true for the bytes the directive grammar treats as spacing.
pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\0')
}

/// Returns true for bytes that may appear inside a command, argument name or value.
pub fn is_word(b: u8) -> bool {
    !is_whitespace(b) && !matches!(b, b',' | b'=' | b'\n' | b'(' | b')')
}

/// Offset of the first non-whitespace byte at or after `from`.
pub fn skip_whitespace(bytes: &[u8], from: usize) -> usize {
    let mut at = from;
    while at < bytes.len() && is_whitespace(bytes[at]) {
        at += 1;
    }
    at
}

/// Offset just past the run of word bytes starting at `from`.
pub fn scan_word(bytes: &[u8], from: usize) -> usize {
    let mut at = from;
    while at < bytes.len() && is_word(bytes[at]) {
        at += 1;
    }
    at
}
