//! # Facet and rendition table parsing
//!
//! The two tables follow the container header back to back:
//!
//! ```text
//! Facet table (facet_count entries):
//!   [u16] name length   [u16] token count
//!   [name bytes]        (padding to a 4-byte boundary)
//!   [tokens]            token count × {u16 identifier, u16 value}
//!
//! Rendition table (rendition_count entries):
//!   [tokens]            key_token_count × {u16 identifier, u16 value}
//!   [u32] kind   [u32] offset (relative to data_offset)   [u32] length
//! ```
//!
//! Both tables are bounded by the header counts and checked against the
//! source length before anything is allocated, so a corrupt count fails
//! fast instead of reading garbage.

use std::collections::HashMap;

use encoding_rs::Encoding;
use log::{debug, info, warn};

use super::key::read_key;
use crate::car::cursor::ByteCursor;
use crate::car::types::error::{CarError, Result};
use crate::car::types::key::{RenditionKey, TOKEN_SIZE};
use crate::car::types::models::{CarHeader, Facet, IndexEntry, Locator, RenditionKind};
use crate::car::utils;

/// Smallest possible facet entry: two `u16` lengths.
const MIN_FACET_SIZE: usize = 4;
/// Fixed tail of a rendition table entry: kind, offset, length.
const ENTRY_TAIL_SIZE: usize = 12;

/// Mapping from rendition keys to record locations.
///
/// Entries keep table order; "first encountered" always means lowest index.
#[derive(Debug, Clone, Default)]
pub struct AssetIndex {
    pub(super) entries: Vec<IndexEntry>,
    pub(super) data_offset: u64,
    /// First entry for each distinct token set.
    pub(super) exact: HashMap<RenditionKey, usize>,
    /// Entries grouped by theme-element value, in table order.
    pub(super) by_element: HashMap<u16, Vec<usize>>,
}

impl AssetIndex {
    pub fn from_entries(entries: Vec<IndexEntry>, data_offset: u64) -> Self {
        let mut exact = HashMap::with_capacity(entries.len());
        let mut by_element: HashMap<u16, Vec<usize>> = HashMap::new();
        for (i, entry) in entries.iter().enumerate() {
            exact.entry(entry.key.clone()).or_insert(i);
            if let Some(element) = entry.key.theme_element() {
                by_element.entry(element).or_default().push(i);
            }
        }
        Self {
            entries,
            data_offset,
            exact,
            by_element,
        }
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn data_offset(&self) -> u64 {
        self.data_offset
    }

    /// All stored keys in table order.
    pub fn keys(&self) -> impl Iterator<Item = &RenditionKey> {
        self.entries.iter().map(|entry| &entry.key)
    }

    /// Locator of the entry at `index` in the rendition table.
    pub fn locator(&self, index: usize) -> Option<Locator> {
        let entry = self.entries.get(index)?;
        Some(Locator {
            index,
            kind: entry.kind,
            offset: self.data_offset + u64::from(entry.offset),
            length: u64::from(entry.length),
        })
    }
}

/// Parses the facet and rendition tables that begin at `tables_offset`.
pub fn parse(
    bytes: &[u8],
    header: &CarHeader,
    tables_offset: usize,
    encoding: &'static Encoding,
) -> Result<(Vec<Facet>, AssetIndex)> {
    info!("Parsing facet table ({} facets)", header.facet_count);
    let mut cursor = ByteCursor::at(bytes, tables_offset, "facet table")?;
    let facets = parse_facets(&mut cursor, header.facet_count as usize, encoding)?;

    info!("Parsing rendition table ({} renditions)", header.rendition_count);
    let mut cursor = ByteCursor::at(bytes, cursor.position(), "rendition table")?;
    let entries = parse_entries(
        &mut cursor,
        header.rendition_count as usize,
        header.key_token_count as usize,
    )?;

    if cursor.position() > header.data_offset as usize {
        warn!(
            "Tables end at {} but the data region starts at {}; records may overlap the tables",
            cursor.position(),
            header.data_offset
        );
    }

    let index = AssetIndex::from_entries(entries, u64::from(header.data_offset));
    info!(
        "Index built: {} renditions, {} distinct keys, {} elements",
        index.len(),
        index.exact.len(),
        index.by_element.len()
    );
    Ok((facets, index))
}

fn parse_facets(
    cursor: &mut ByteCursor<'_>,
    count: usize,
    encoding: &'static Encoding,
) -> Result<Vec<Facet>> {
    ensure_room(cursor, count, MIN_FACET_SIZE)?;

    let mut facets = Vec::with_capacity(count);
    for _ in 0..count {
        let name_len = cursor.read_u16()? as usize;
        let token_count = cursor.read_u16()? as usize;
        let name = utils::decode_text(cursor.take(name_len)?, encoding);
        cursor.align(4)?;
        let key = read_key(cursor, token_count)?;
        debug!("Facet '{}' -> {}", name, key);
        facets.push(Facet { name, key });
    }
    Ok(facets)
}

fn parse_entries(
    cursor: &mut ByteCursor<'_>,
    count: usize,
    key_token_count: usize,
) -> Result<Vec<IndexEntry>> {
    let entry_size = key_token_count
        .checked_mul(TOKEN_SIZE)
        .and_then(|n| n.checked_add(ENTRY_TAIL_SIZE))
        .ok_or_else(|| CarError::OutOfBounds {
            context: "rendition table",
            offset: cursor.position() as u64,
            needed: u64::MAX,
            available: cursor.remaining() as u64,
        })?;
    ensure_room(cursor, count, entry_size)?;

    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let key = read_key(cursor, key_token_count)?;
        let kind = RenditionKind::from(cursor.read_u32()?);
        let offset = cursor.read_u32()?;
        let length = cursor.read_u32()?;
        if let RenditionKind::Unknown(raw) = kind {
            warn!("Rendition {} has unknown kind {}; it will not decode", key, raw);
        }
        entries.push(IndexEntry {
            key,
            kind,
            offset,
            length,
        });
    }
    Ok(entries)
}

/// Fails unless `count` items of at least `item_size` bytes can fit.
fn ensure_room(cursor: &ByteCursor<'_>, count: usize, item_size: usize) -> Result<()> {
    let needed = count.checked_mul(item_size).unwrap_or(usize::MAX);
    if needed > cursor.remaining() {
        return Err(CarError::OutOfBounds {
            context: cursor.context(),
            offset: cursor.position() as u64,
            needed: needed as u64,
            available: cursor.remaining() as u64,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::car::format::header::HEADER_SIZE;
    use crate::car::format::key::encode_key;
    use crate::car::types::attributes::AttributeId;
    use crate::car::types::models::Fourcc;

    fn header(
        rendition_count: u32,
        facet_count: u32,
        key_token_count: u32,
        data_offset: u32,
    ) -> CarHeader {
        CarHeader {
            tag: Fourcc::CATALOG,
            core_version: 1,
            storage_version: 1,
            storage_timestamp: 0,
            schema_version: 0,
            main_version: String::new(),
            version_string: String::new(),
            uuid: [0; 16],
            rendition_count,
            facet_count,
            key_token_count,
            data_offset,
        }
    }

    fn key(element: u16, scale: u16) -> RenditionKey {
        RenditionKey::new()
            .with(AttributeId::Element, element)
            .with(AttributeId::Scale, scale)
    }

    fn tables() -> Vec<u8> {
        let mut out = vec![0u8; HEADER_SIZE];
        // Facet "Icon" -> element 42; name padded to 4 bytes already.
        out.extend_from_slice(&4u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(b"Icon");
        out.extend_from_slice(&encode_key(&RenditionKey::new().with(AttributeId::Element, 42)));
        // Facet "Go" needs two bytes of padding.
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(b"Go\0\0");
        out.extend_from_slice(&encode_key(&RenditionKey::new().with(AttributeId::Element, 7)));
        let rows = [(key(42, 1), 1u32, 0u32), (key(42, 2), 1, 64), (key(7, 1), 3, 128)];
        for (k, kind, offset) in rows {
            out.extend_from_slice(&encode_key(&k));
            out.extend_from_slice(&kind.to_le_bytes());
            out.extend_from_slice(&offset.to_le_bytes());
            out.extend_from_slice(&64u32.to_le_bytes());
        }
        out
    }

    #[test]
    fn parses_facets_and_entries() {
        let bytes = tables();
        let data_offset = bytes.len() as u32;
        let header = header(3, 2, 2, data_offset);
        let (facets, index) = parse(&bytes, &header, HEADER_SIZE, encoding_rs::UTF_8).unwrap();

        assert_eq!(facets.len(), 2);
        assert_eq!(facets[0].name, "Icon");
        assert_eq!(facets[0].element(), Some(42));
        assert_eq!(facets[1].name, "Go");
        assert_eq!(facets[1].element(), Some(7));

        assert_eq!(index.len(), 3);
        assert_eq!(index.entries()[2].kind, RenditionKind::Color);
        let locator = index.locator(1).unwrap();
        assert_eq!(locator.offset, u64::from(data_offset) + 64);
        assert_eq!(locator.length, 64);
        assert_eq!(index.by_element[&42], vec![0, 1]);
    }

    #[test]
    fn inflated_counts_fail_before_allocating() {
        let bytes = tables();
        let data_offset = bytes.len() as u32;
        let inflated = header(u32::MAX, 2, 2, data_offset);
        let err = parse(&bytes, &inflated, HEADER_SIZE, encoding_rs::UTF_8).unwrap_err();
        assert!(matches!(err, CarError::OutOfBounds { context: "rendition table", .. }));

        let inflated = header(3, u32::MAX, 2, data_offset);
        let err = parse(&bytes, &inflated, HEADER_SIZE, encoding_rs::UTF_8).unwrap_err();
        assert!(matches!(err, CarError::OutOfBounds { context: "facet table", .. }));
    }

    #[test]
    fn duplicate_keys_keep_the_first_entry() {
        let entries = vec![
            IndexEntry { key: key(1, 1), kind: RenditionKind::RasterImage, offset: 0, length: 4 },
            IndexEntry { key: key(1, 1), kind: RenditionKind::Color, offset: 4, length: 4 },
        ];
        let index = AssetIndex::from_entries(entries, 0);
        assert_eq!(index.exact[&key(1, 1)], 0);
        assert_eq!(index.keys().count(), 2);
    }
}
