//! Payload block decompression.
//!
//! Record payloads are either stored as-is (type 0) or zlib-compressed
//! (type 1). The declared decoded length must match exactly.

use std::io::Read;

use flate2::read::ZlibDecoder;
use log::trace;

use crate::car::source::Payload;
use crate::car::types::error::{CarError, Result};
use crate::car::types::models::CompressionType;

/// Initial output capacity relative to the stored size.
const MAX_RATIO_HINT: usize = 16;

/// Decodes a payload block.
///
/// Uncompressed payloads are returned as a view into the container without
/// copying; compressed payloads are inflated into an owned buffer.
///
/// # Validation
/// The result is exactly `expected_size` bytes, or the call fails with
/// [`CarError::SizeMismatch`].
pub fn decompress_payload(
    stored: &Payload,
    compression_type: CompressionType,
    expected_size: u64,
) -> Result<Payload> {
    match compression_type {
        CompressionType::None => {
            trace!("No compression, borrowing {} bytes", stored.len());
            if stored.len() as u64 != expected_size {
                return Err(CarError::SizeMismatch {
                    context: "uncompressed payload",
                    expected: expected_size,
                    found: stored.len() as u64,
                });
            }
            Ok(stored.clone())
        }
        CompressionType::Zlib => {
            trace!(
                "Decompressing with Zlib: {} bytes -> {} bytes (expected)",
                stored.len(),
                expected_size
            );
            // Capacity is capped so a corrupt declared size cannot force a huge allocation.
            let capacity =
                (expected_size as usize).min(stored.len().saturating_mul(MAX_RATIO_HINT));
            let mut output = Vec::with_capacity(capacity);
            // One byte past the declared size is enough to detect overlong streams.
            let mut decoder = ZlibDecoder::new(&stored[..]).take(expected_size + 1);
            decoder.read_to_end(&mut output).map_err(|e| {
                CarError::DecompressionError(format!("Zlib decompression failed: {}", e))
            })?;
            if output.len() as u64 != expected_size {
                return Err(CarError::SizeMismatch {
                    context: "zlib payload",
                    expected: expected_size,
                    found: output.len() as u64,
                });
            }
            Ok(Payload::owned(output))
        }
    }
}
