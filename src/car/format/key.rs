//! Rendition key codec.
//!
//! A key is stored as a run of `{identifier: u16, value: u16}` tokens. The
//! number of tokens is declared by the container header, not by the key.

use byteorder::{ByteOrder, LittleEndian};
use log::trace;

use crate::car::cursor::ByteCursor;
use crate::car::types::attributes::AttributeId;
use crate::car::types::error::{CarError, Result};
use crate::car::types::key::{KeyToken, RenditionKey, TOKEN_SIZE};

/// Decodes `count` tokens from the start of `bytes`.
///
/// Fails with [`CarError::TruncatedKey`] when fewer than `count * 4` bytes
/// are available, and with [`CarError::DuplicateAttribute`] when an
/// identifier repeats. Unknown identifiers are kept.
pub fn decode_key(bytes: &[u8], count: usize) -> Result<RenditionKey> {
    let expected = count.checked_mul(TOKEN_SIZE).unwrap_or(usize::MAX);
    if bytes.len() < expected {
        return Err(CarError::TruncatedKey {
            count,
            expected,
            available: bytes.len(),
        });
    }
    let tokens = bytes[..expected].chunks_exact(TOKEN_SIZE).map(|chunk| {
        KeyToken::new(
            AttributeId::from_u16(LittleEndian::read_u16(&chunk[0..2])),
            LittleEndian::read_u16(&chunk[2..4]),
        )
    });
    RenditionKey::from_tokens(tokens)
}

/// Reads a key of `count` tokens at the cursor and advances past it.
pub fn read_key(cursor: &mut ByteCursor<'_>, count: usize) -> Result<RenditionKey> {
    let available = cursor.remaining();
    let bytes = cursor
        .read_trailing(count, TOKEN_SIZE)
        .map_err(|_| CarError::TruncatedKey {
            count,
            expected: count.saturating_mul(TOKEN_SIZE),
            available,
        })?;
    let key = decode_key(bytes, count)?;
    trace!("Decoded key {}", key);
    Ok(key)
}

/// Serializes a key in its insertion order.
///
/// Only used for hashing and tests; catalogs are never written.
pub fn encode_key(key: &RenditionKey) -> Vec<u8> {
    let mut out = vec![0u8; key.len() * TOKEN_SIZE];
    for (chunk, token) in out.chunks_exact_mut(TOKEN_SIZE).zip(key.tokens()) {
        LittleEndian::write_u16(&mut chunk[0..2], token.identifier.as_u16());
        LittleEndian::write_u16(&mut chunk[2..4], token.value);
    }
    out
}
