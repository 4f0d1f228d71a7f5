//! Percent-encoding and decoding, re-implemented from first principles.
//!
//! The two encode variants differ only in their unreserved sets: the
//! component variant keeps `A-Z a-z 0-9 - _ . !`; the full-URI variant
//! additionally keeps `~ * ' ( ) ; / ? : @ & = + $ , #`. Everything
//! else is emitted as uppercase `%XX` UTF-8 bytes. Decoding reassembles
//! multi-byte sequences, so `decode(encode(s)) == s` holds across 1-,
//! 2- and 3-byte code points (and 4-byte ones beyond the BMP).

use std::fmt;

/// Malformed percent sequence error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriError {
    /// Byte offset of the offending sequence
    pub position: usize,
}

impl fmt::Display for UriError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Malformed URI sequence at offset {}", self.position)
    }
}

impl std::error::Error for UriError {}

fn is_component_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'!')
}

fn is_uri_unreserved(b: u8) -> bool {
    is_component_unreserved(b)
        || matches!(
            b,
            b'~' | b'*'
                | b'\''
                | b'('
                | b')'
                | b';'
                | b'/'
                | b'?'
                | b':'
                | b'@'
                | b'&'
                | b'='
                | b'+'
                | b'$'
                | b','
                | b'#'
        )
}

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

fn percent_encode(input: &str, keep: fn(u8) -> bool) -> String {
    let mut out = String::with_capacity(input.len());
    for &b in input.as_bytes() {
        if keep(b) {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX_UPPER[(b >> 4) as usize] as char);
            out.push(HEX_UPPER[(b & 0x0F) as usize] as char);
        }
    }
    out
}

/// Encode for use as a URI component (query keys/values, path segments).
#[must_use]
pub fn encode_uri_component(input: &str) -> String {
    percent_encode(input, is_component_unreserved)
}

/// Encode a full URI, leaving reserved separators intact.
#[must_use]
pub fn encode_uri(input: &str) -> String {
    percent_encode(input, is_uri_unreserved)
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn percent_decode(input: &str) -> Result<String, UriError> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if i + 2 >= bytes.len() {
                return Err(UriError { position: i });
            }
            let hi = hex_value(bytes[i + 1]).ok_or(UriError { position: i })?;
            let lo = hex_value(bytes[i + 2]).ok_or(UriError { position: i })?;
            out.push((hi << 4) | lo);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|e| UriError {
        position: e.utf8_error().valid_up_to(),
    })
}

/// Decode a percent-encoded URI component.
///
/// # Errors
///
/// Returns [`UriError`] on a truncated `%` sequence, non-hex digits,
/// or bytes that do not form valid UTF-8.
pub fn decode_uri_component(input: &str) -> Result<String, UriError> {
    percent_decode(input)
}

/// Decode a percent-encoded URI.
///
/// Decodes every `%XX` sequence, mirroring [`decode_uri_component`];
/// the encode variants differ, the decode variants do not.
///
/// # Errors
///
/// Returns [`UriError`] on a malformed sequence.
pub fn decode_uri(input: &str) -> Result<String, UriError> {
    percent_decode(input)
}
