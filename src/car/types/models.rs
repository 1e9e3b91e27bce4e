//! Core data structures for asset catalog components.
//!
//! This module defines the fundamental types used throughout the library:
//! - Container header and four-character tags
//! - Facet (name) and rendition table entries
//! - Resolution results handed from the index to the decoders

use std::fmt;

use super::error::{CarError, Result};
use super::key::RenditionKey;

/// A four-character tag stored as a little-endian `u32`.
///
/// The tag `RATC` is the value `u32::from_be_bytes(*b"RATC")`, which lands on
/// disk as the bytes `CTAR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fourcc(pub u32);

impl Fourcc {
    /// Top-level catalog container.
    pub const CATALOG: Fourcc = Fourcc::from_tag(b"RATC");
    /// Nested structured theme store container.
    pub const THEME_STORE: Fourcc = Fourcc::from_tag(b"THST");
    /// Common rendition record header.
    pub const RENDITION: Fourcc = Fourcc::from_tag(b"ISTC");
    /// Color record.
    pub const COLOR: Fourcc = Fourcc::from_tag(b"COLR");

    pub const fn from_tag(tag: &[u8; 4]) -> Self {
        Fourcc(u32::from_be_bytes(*tag))
    }

    pub fn tag(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for Fourcc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for byte in self.tag() {
            if byte.is_ascii_graphic() || byte == b' ' {
                write!(f, "{}", byte as char)?;
            } else {
                write!(f, "\\x{:02x}", byte)?;
            }
        }
        Ok(())
    }
}

/// Parsed container header.
///
/// The counts are not interpreted here; the index parser uses them to size
/// and locate the tables that follow the header.
#[derive(Debug, Clone)]
pub struct CarHeader {
    pub tag: Fourcc,
    pub core_version: u32,
    pub storage_version: u32,
    pub storage_timestamp: u32,
    pub schema_version: u32,
    pub main_version: String,
    pub version_string: String,
    /// Opaque identifier bytes, passed through unchanged.
    pub uuid: [u8; 16],
    pub rendition_count: u32,
    pub facet_count: u32,
    pub key_token_count: u32,
    /// Start of the record region; rendition offsets are relative to it.
    pub data_offset: u32,
}

impl CarHeader {
    pub fn uuid_hex(&self) -> String {
        hex::encode(self.uuid)
    }

    pub fn is_theme_store(&self) -> bool {
        self.tag == Fourcc::THEME_STORE
    }
}

/// Declared kind of a stored rendition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenditionKind {
    RasterImage,
    VectorImage,
    Color,
    PdfDocument,
    ThemeReference,
    /// A kind from a newer catalog revision, kept so the entry still indexes.
    Unknown(u32),
}

impl From<u32> for RenditionKind {
    fn from(value: u32) -> Self {
        match value {
            1 => Self::RasterImage,
            2 => Self::VectorImage,
            3 => Self::Color,
            4 => Self::PdfDocument,
            5 => Self::ThemeReference,
            other => Self::Unknown(other),
        }
    }
}

impl RenditionKind {
    pub fn as_u32(self) -> u32 {
        match self {
            Self::RasterImage => 1,
            Self::VectorImage => 2,
            Self::Color => 3,
            Self::PdfDocument => 4,
            Self::ThemeReference => 5,
            Self::Unknown(other) => other,
        }
    }
}

impl fmt::Display for RenditionKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::RasterImage => write!(f, "raster image"),
            Self::VectorImage => write!(f, "vector image"),
            Self::Color => write!(f, "color"),
            Self::PdfDocument => write!(f, "pdf document"),
            Self::ThemeReference => write!(f, "theme reference"),
            Self::Unknown(other) => write!(f, "unknown kind {}", other),
        }
    }
}

/// Compression applied to a record's payload block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    None,
    Zlib,
}

impl TryFrom<u32> for CompressionType {
    type Error = CarError;
    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Zlib),
            _ => Err(CarError::DecompressionError(format!(
                "Unknown compression type: {}",
                value
            ))),
        }
    }
}

/// A symbolic asset name with the key tokens it stands for.
#[derive(Debug, Clone)]
pub struct Facet {
    pub name: String,
    pub key: RenditionKey,
}

impl Facet {
    pub fn element(&self) -> Option<u16> {
        self.key.theme_element()
    }
}

/// One row of the rendition table.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub key: RenditionKey,
    pub kind: RenditionKind,
    /// Offset relative to the header's `data_offset`.
    pub offset: u32,
    pub length: u32,
}

/// Where a resolved rendition lives inside its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Locator {
    /// Position of the entry in the rendition table.
    pub index: usize,
    pub kind: RenditionKind,
    /// Absolute byte offset within the container.
    pub offset: u64,
    pub length: u64,
}

/// Outcome of resolving a query key against an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub locator: Locator,
    /// `true` when a stored key matched the query token-for-token.
    pub exact: bool,
}
