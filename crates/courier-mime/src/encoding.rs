//! Transfer and header encodings.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Maximum encoded line length (RFC 2045 §6.8).
const MAX_LINE_LENGTH: usize = 76;

/// Base64-encodes `data` and wraps it at 76 columns with CRLF.
#[must_use]
pub fn encode_base64_wrapped(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2 + 2);
    // Base64 output is ASCII, so byte chunks are valid UTF-8.
    for chunk in encoded.as_bytes().chunks(MAX_LINE_LENGTH) {
        out.push_str(&String::from_utf8_lossy(chunk));
        out.push_str("\r\n");
    }
    out
}

/// Input bytes per encoded word. 39 bytes give 52 base64 characters, so a
/// `utf-8` word is 64 long and fits after a field name on a 76 column line.
const ENCODED_WORD_INPUT: usize = 39;

/// Separator between encoded words: a folded header continuation.
pub const FOLD: &str = "\r\n ";

/// Encodes header text as RFC 2047 encoded words when it is not plain
/// printable ASCII; otherwise returns it unchanged.
///
/// Long text is split on character boundaries into several words joined
/// by [`FOLD`], each within the 75 character limit of RFC 2047 §2.
#[must_use]
pub fn encode_rfc2047(text: &str, charset: &str) -> String {
    if text
        .chars()
        .all(|c| c.is_ascii() && !c.is_ascii_control() && c != '=' && c != '?')
    {
        return text.to_string();
    }

    let mut words = Vec::new();
    let mut start = 0;
    let mut end = 0;
    for (index, c) in text.char_indices() {
        let next = index + c.len_utf8();
        if next - start > ENCODED_WORD_INPUT && end > start {
            words.push(encoded_word(&text[start..end], charset));
            start = end;
        }
        end = next;
    }
    if end > start || words.is_empty() {
        words.push(encoded_word(&text[start..end], charset));
    }
    words.join(FOLD)
}

fn encoded_word(chunk: &str, charset: &str) -> String {
    format!("=?{charset}?B?{}?=", STANDARD.encode(chunk.as_bytes()))
}
