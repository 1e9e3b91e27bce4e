//! Custom error types for the car-reader crate.

use thiserror::Error;

use super::attributes::AttributeId;
use super::models::{Fourcc, RenditionKind};

/// The primary error type for all operations in this crate.
///
/// A missing rendition is not an error: lookups return `Ok(None)` when no
/// stored key shares the requested element.
#[derive(Debug, Error)]
pub enum CarError {
    /// An error originating from I/O operations.
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    /// The source is not an asset catalog, or is a revision this reader does not understand.
    #[error("Unrecognized format: {0}")]
    UnrecognizedFormat(String),

    /// A read would run past the end of the available bytes.
    #[error("Read out of bounds in {context}: {needed} bytes at offset {offset}, but only {available} available")]
    OutOfBounds {
        context: &'static str,
        offset: u64,
        needed: u64,
        available: u64,
    },

    /// A declared offset violates the format's alignment requirement.
    #[error("Misaligned {context}: offset {offset} is not a multiple of {alignment}")]
    Misaligned {
        context: &'static str,
        offset: u64,
        alignment: u64,
    },

    /// Fewer bytes remain than the declared number of key tokens needs.
    #[error("Truncated rendition key: {count} tokens need {expected} bytes, but only {available} available")]
    TruncatedKey {
        count: usize,
        expected: usize,
        available: usize,
    },

    /// The same attribute identifier appears twice in one key.
    #[error("Duplicate attribute {0} in rendition key")]
    DuplicateAttribute(AttributeId),

    /// A tagged record carries a different tag than its layout requires.
    #[error("Unexpected tag in {context}: expected '{expected}', found '{found}'")]
    UnexpectedTag {
        context: &'static str,
        expected: Fourcc,
        found: Fourcc,
    },

    /// The rendition table declares a kind this reader cannot decode.
    #[error("Unsupported rendition kind: {0}")]
    UnsupportedKind(u32),

    /// A lookup resolved to a rendition of the wrong kind for the request.
    #[error("Unexpected rendition kind: expected {expected}, found {found}")]
    UnexpectedKind {
        expected: &'static str,
        found: RenditionKind,
    },

    /// The embedded image data cannot be decoded by the image codec.
    #[error("Corrupt image payload: {0}")]
    CorruptImagePayload(String),

    /// The embedded vector document cannot be parsed.
    #[error("Corrupt vector payload: {0}")]
    CorruptVectorPayload(String),

    /// The embedded PDF document is malformed.
    #[error("Corrupt PDF payload: {0}")]
    CorruptPdfPayload(String),

    /// The vector payload format has no rasterizer available.
    #[error("Unsupported vector payload: {0}")]
    UnsupportedVectorPayload(String),

    /// Rasterization was asked for an empty or non-finite pixel size.
    #[error("Invalid rasterization target: {0}")]
    InvalidRasterTarget(String),

    /// A payload failed to decompress, often due to corrupted data or an unknown algorithm.
    #[error("Decompression failed: {0}")]
    DecompressionError(String),

    /// A buffer or data block has an unexpected size after an operation.
    #[error("Size mismatch for {context}: expected {expected} bytes, but found {found} bytes")]
    SizeMismatch {
        context: &'static str,
        expected: u64,
        found: u64,
    },
}

/// A convenience `Result` type alias using the crate's `CarError` type.
pub type Result<T> = std::result::Result<T, CarError>;
