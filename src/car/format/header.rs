//! Container header parsing.
//!
//! # Header Structure
//! ```text
//! [  4 bytes] tag (RATC or THST, little-endian fourcc)
//! [  4 bytes] core version
//! [  4 bytes] storage version
//! [  4 bytes] storage timestamp
//! [  4 bytes] schema version
//! [128 bytes] main version string (NUL-padded)
//! [256 bytes] version string (NUL-padded)
//! [ 16 bytes] uuid
//! [  4 bytes] rendition count
//! [  4 bytes] facet count
//! [  4 bytes] key token count
//! [  4 bytes] data offset
//! ```

use std::ops::RangeInclusive;

use encoding_rs::Encoding;
use log::{debug, info, trace};

use crate::car::cursor::{check_alignment, ByteCursor, RECORD_ALIGNMENT};
use crate::car::types::error::{CarError, Result};
use crate::car::types::models::{CarHeader, Fourcc};
use crate::car::utils;

/// Size of the fixed header record.
pub const HEADER_SIZE: usize = 436;

/// Tags accepted at offset 0.
pub const KNOWN_TAGS: [Fourcc; 2] = [Fourcc::CATALOG, Fourcc::THEME_STORE];

/// Storage revisions whose layout this reader understands.
pub const SUPPORTED_STORAGE_VERSIONS: RangeInclusive<u32> = 1..=17;

/// Parses the container header from the start of `bytes`.
///
/// Returns the header and the offset at which the facet and rendition
/// tables begin.
pub fn parse(bytes: &[u8], encoding: &'static Encoding) -> Result<(CarHeader, usize)> {
    if bytes.len() < 4 {
        return Err(CarError::UnrecognizedFormat(format!(
            "source is {} bytes, too short for a format tag",
            bytes.len()
        )));
    }

    let mut cursor = ByteCursor::new(bytes, "container header");

    // The tag gates every other interpretation.
    let tag = Fourcc(cursor.read_u32()?);
    if !KNOWN_TAGS.contains(&tag) {
        return Err(CarError::UnrecognizedFormat(format!("unknown tag '{}'", tag)));
    }
    trace!("Container tag: '{}'", tag);

    let core_version = cursor.read_u32()?;
    let storage_version = cursor.read_u32()?;
    if !SUPPORTED_STORAGE_VERSIONS.contains(&storage_version) {
        return Err(CarError::UnrecognizedFormat(format!(
            "unsupported storage version {} (supported: {}..={})",
            storage_version,
            SUPPORTED_STORAGE_VERSIONS.start(),
            SUPPORTED_STORAGE_VERSIONS.end()
        )));
    }
    let storage_timestamp = cursor.read_u32()?;
    let schema_version = cursor.read_u32()?;

    let main_version = utils::decode_fixed_text(cursor.take(128)?, encoding);
    let version_string = utils::decode_fixed_text(cursor.take(256)?, encoding);
    let uuid = cursor.read_array::<16>()?;

    let rendition_count = cursor.read_u32()?;
    let facet_count = cursor.read_u32()?;
    let key_token_count = cursor.read_u32()?;
    let data_offset = cursor.read_u32()?;
    debug_assert_eq!(cursor.position(), HEADER_SIZE);

    check_alignment(u64::from(data_offset), RECORD_ALIGNMENT as u64, "data region")?;
    if data_offset as usize > bytes.len() {
        return Err(CarError::OutOfBounds {
            context: "data region",
            offset: u64::from(data_offset),
            needed: 0,
            available: bytes.len() as u64,
        });
    }

    debug!(
        "Header counts: renditions={}, facets={}, tokens per key={}, data offset={}",
        rendition_count, facet_count, key_token_count, data_offset
    );

    let header = CarHeader {
        tag,
        core_version,
        storage_version,
        storage_timestamp,
        schema_version,
        main_version,
        version_string,
        uuid,
        rendition_count,
        facet_count,
        key_token_count,
        data_offset,
    };

    info!(
        "Header parsed: tag='{}', core version={}, storage version={}, version='{}'",
        header.tag, header.core_version, header.storage_version, header.main_version
    );

    Ok((header, HEADER_SIZE))
}
