//! In-memory catalog fixtures.
//!
//! Builds containers byte for byte in the on-disk layout so tests do not
//! depend on binary files checked into the repository.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use car_reader::{AttributeId, Fourcc, RenditionKey, RenditionKind};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::{ImageFormat, Rgba, RgbaImage};

pub const HEADER_SIZE: usize = 436;
pub const RECORD_NAME_SIZE: usize = 128;

/// Builds a rendition key from `(identifier, value)` pairs, in order.
pub fn key(tokens: &[(AttributeId, u16)]) -> RenditionKey {
    tokens
        .iter()
        .fold(RenditionKey::new(), |key, &(id, value)| key.with(id, value))
}

/// `{element, scale, state}`, the shape most fixtures use.
pub fn image_key(element: u16, scale: u16, state: u16) -> RenditionKey {
    key(&[
        (AttributeId::Element, element),
        (AttributeId::Scale, scale),
        (AttributeId::State, state),
    ])
}

enum Placement {
    Record(Vec<u8>),
    /// An entry pointing at an arbitrary location, for boundary tests.
    At { offset: u32, length: u32 },
}

pub struct CatalogBuilder {
    tag: Fourcc,
    storage_version: u32,
    facets: Vec<(Vec<u8>, RenditionKey)>,
    renditions: Vec<(RenditionKey, RenditionKind, Placement)>,
}

impl Default for CatalogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self {
            tag: Fourcc::CATALOG,
            storage_version: 17,
            facets: Vec::new(),
            renditions: Vec::new(),
        }
    }

    pub fn tag(mut self, tag: Fourcc) -> Self {
        self.tag = tag;
        self
    }

    pub fn storage_version(mut self, version: u32) -> Self {
        self.storage_version = version;
        self
    }

    pub fn facet(self, name: &str, element: u16) -> Self {
        self.facet_bytes(name.as_bytes(), element)
    }

    /// A facet whose name is stored as raw, possibly non-UTF-8, bytes.
    pub fn facet_bytes(mut self, name: &[u8], element: u16) -> Self {
        self.facets
            .push((name.to_vec(), key(&[(AttributeId::Element, element)])));
        self
    }

    pub fn rendition(mut self, key: RenditionKey, kind: RenditionKind, record: Vec<u8>) -> Self {
        self.renditions.push((key, kind, Placement::Record(record)));
        self
    }

    pub fn rendition_at(
        mut self,
        key: RenditionKey,
        kind: RenditionKind,
        offset: u32,
        length: u32,
    ) -> Self {
        self.renditions
            .push((key, kind, Placement::At { offset, length }));
        self
    }

    /// Serializes the container. Every key must have the same token count.
    pub fn build(&self) -> Vec<u8> {
        let key_token_count = self.renditions.first().map_or(0, |(k, _, _)| k.len());
        assert!(
            self.renditions.iter().all(|(k, _, _)| k.len() == key_token_count),
            "fixture keys must share one token count"
        );

        let mut tables = Vec::new();
        for (name, facet_key) in &self.facets {
            tables.extend_from_slice(&(name.len() as u16).to_le_bytes());
            tables.extend_from_slice(&(facet_key.len() as u16).to_le_bytes());
            tables.extend_from_slice(name);
            pad4(&mut tables);
            tables.extend(encode_key(facet_key));
        }

        // Records are laid out back to back, each padded to 4 bytes.
        let mut data = Vec::new();
        let mut placements = Vec::new();
        for (_, _, placement) in &self.renditions {
            match placement {
                Placement::Record(record) => {
                    placements.push((data.len() as u32, record.len() as u32));
                    data.extend_from_slice(record);
                    pad4(&mut data);
                }
                Placement::At { offset, length } => placements.push((*offset, *length)),
            }
        }
        for ((key, kind, _), (offset, length)) in self.renditions.iter().zip(&placements) {
            tables.extend(encode_key(key));
            tables.extend_from_slice(&kind.as_u32().to_le_bytes());
            tables.extend_from_slice(&offset.to_le_bytes());
            tables.extend_from_slice(&length.to_le_bytes());
        }

        let data_offset = HEADER_SIZE + tables.len();
        let mut out = header(
            self.tag,
            self.storage_version,
            self.renditions.len() as u32,
            self.facets.len() as u32,
            key_token_count as u32,
            data_offset as u32,
        );
        out.extend(tables);
        out.extend(data);
        out
    }
}

pub fn header(
    tag: Fourcc,
    storage_version: u32,
    rendition_count: u32,
    facet_count: u32,
    key_token_count: u32,
    data_offset: u32,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_SIZE);
    out.extend_from_slice(&tag.0.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&storage_version.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend(fixed_text("car-reader fixtures", 128));
    out.extend(fixed_text("Fixture 1.0", 256));
    out.extend((0u8..16).collect::<Vec<_>>());
    for field in [rendition_count, facet_count, key_token_count, data_offset] {
        out.extend_from_slice(&field.to_le_bytes());
    }
    assert_eq!(out.len(), HEADER_SIZE);
    out
}

pub fn encode_key(key: &RenditionKey) -> Vec<u8> {
    key.tokens()
        .iter()
        .flat_map(|t| {
            let mut bytes = t.identifier.as_u16().to_le_bytes().to_vec();
            bytes.extend_from_slice(&t.value.to_le_bytes());
            bytes
        })
        .collect()
}

fn fixed_text(text: &str, width: usize) -> Vec<u8> {
    let mut out = text.as_bytes().to_vec();
    out.resize(width, 0);
    out
}

fn pad4(out: &mut Vec<u8>) {
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

// ---- Records ----

pub fn record_header(name: &str, compression: u32) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&Fourcc::RENDITION.0.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend(fixed_text(name, RECORD_NAME_SIZE));
    out.extend_from_slice(&compression.to_le_bytes());
    out
}

/// Image attributes with no flags, no slices, opacity 1.
pub fn image_attributes(scale: f32, width: f32, height: f32) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&1i32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    for field in [0i32, 0, 0] {
        out.extend_from_slice(&field.to_le_bytes());
    }
    out.extend_from_slice(&1.0f32.to_le_bytes());
    out.extend_from_slice(&0i32.to_le_bytes());
    for field in [scale, width, height] {
        out.extend_from_slice(&field.to_le_bytes());
    }
    out.extend_from_slice(&0u32.to_le_bytes());
    out
}

pub fn payload_block(stored: &[u8], decoded_len: usize) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(stored.len() as u32).to_le_bytes());
    out.extend_from_slice(&(decoded_len as u32).to_le_bytes());
    out.extend_from_slice(stored);
    out
}

pub fn png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    RgbaImage::from_pixel(width, height, Rgba(color))
        .write_to(&mut out, ImageFormat::Png)
        .expect("encode fixture png");
    out.into_inner()
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("compress fixture");
    encoder.finish().expect("finish fixture stream")
}

/// A raster record whose PNG is `scale` pixels per point of a 4×4 pt image.
pub fn raster_record(name: &str, scale: u16, color: [u8; 4]) -> Vec<u8> {
    let side = 4 * u32::from(scale.max(1));
    let image = png(side, side, color);
    let mut out = record_header(name, 0);
    out.extend(image_attributes(f32::from(scale), 4.0, 4.0));
    out.extend(payload_block(&image, image.len()));
    out
}

/// Same as [`raster_record`], with the payload zlib-compressed.
pub fn compressed_raster_record(name: &str, scale: u16, color: [u8; 4]) -> Vec<u8> {
    let side = 4 * u32::from(scale.max(1));
    let image = png(side, side, color);
    let mut out = record_header(name, 1);
    out.extend(image_attributes(f32::from(scale), 4.0, 4.0));
    out.extend(payload_block(&zlib(&image), image.len()));
    out
}

pub fn color_record_with_tag(name: &str, tag: Fourcc, components: &[f64]) -> Vec<u8> {
    let mut out = record_header(name, 0);
    out.extend_from_slice(&tag.0.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&(components.len() as u32).to_le_bytes());
    for c in components {
        out.extend_from_slice(&c.to_le_bytes());
    }
    out
}

pub fn color_record(name: &str, components: &[f64]) -> Vec<u8> {
    color_record_with_tag(name, Fourcc::COLOR, components)
}

pub fn system_color_record(name: &str, system_name: &str) -> Vec<u8> {
    let mut out = record_header(name, 0);
    out.extend_from_slice(&Fourcc::COLOR.0.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&(1u32 << 8).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&(system_name.len() as u32).to_le_bytes());
    out.extend_from_slice(system_name.as_bytes());
    out
}

pub const PDF: &[u8] = b"%PDF-1.6\n\
    1 0 obj << /Type /Pages /Count 1 >> endobj\n\
    2 0 obj << /Type /Page >> endobj\n\
    %%EOF\n";

pub fn pdf_record(name: &str, document: &[u8]) -> Vec<u8> {
    let mut out = record_header(name, 0);
    out.extend(payload_block(document, document.len()));
    out
}

/// A vector record; `format` is 0 for PDF and 1 for SVG.
pub fn vector_record(name: &str, format: u32, document: &[u8]) -> Vec<u8> {
    let mut out = record_header(name, 0);
    let mut attributes = image_attributes(1.0, 10.0, 10.0);
    // Mark as vector based.
    attributes[4..8].copy_from_slice(&(1u32 << 2).to_le_bytes());
    out.extend(attributes);
    out.extend_from_slice(&0i32.to_le_bytes());
    out.extend_from_slice(&1i32.to_le_bytes());
    out.extend_from_slice(&format.to_le_bytes());
    out.extend(payload_block(document, document.len()));
    out
}

pub const SVG: &[u8] = b"<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"10\" height=\"10\">\
    <rect width=\"10\" height=\"10\" fill=\"#00ff00\"/></svg>";

/// A theme-reference record wrapping a whole nested container.
pub fn theme_reference_record(name: &str, nested: &[u8]) -> Vec<u8> {
    let mut out = record_header(name, 1);
    out.extend(payload_block(&zlib(nested), nested.len()));
    out
}
