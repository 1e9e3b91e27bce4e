//! Text decoding helpers.

use encoding_rs::Encoding;

/// Resolves an encoding label, falling back to UTF-8 for unknown labels.
///
/// GBK and GB2312 are widened to GB18030, which is a superset of both.
pub fn parse_encoding(label: &str) -> &'static Encoding {
    let label = label.trim();
    let normalized = if label.eq_ignore_ascii_case("GBK") || label.eq_ignore_ascii_case("GB2312") {
        "GB18030"
    } else {
        label
    };
    Encoding::for_label(normalized.as_bytes()).unwrap_or(encoding_rs::UTF_8)
}

/// Decodes a fixed-width, NUL-padded field, trimmed at the first NUL.
pub fn decode_fixed_text(bytes: &[u8], encoding: &'static Encoding) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    decode_text(&bytes[..end], encoding)
}

/// Decodes text, replacing malformed sequences.
pub fn decode_text(bytes: &[u8], encoding: &'static Encoding) -> String {
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}
