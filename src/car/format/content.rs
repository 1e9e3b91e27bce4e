//! Rendition record decoding.
//!
//! # Record Structure
//! ```text
//! Common header (140 bytes):
//!   [u32] tag 'ISTC'   [u32] version   [128 bytes] name   [u32] compression
//!
//! Payload block:
//!   [u32] stored length   [u32] decoded length   [stored bytes]
//!
//! Raster:    header, image attributes, payload block (PNG/JPEG/...)
//! Vector:    header, image attributes, [i32] layout direction,
//!            [i32] display gamut, [u32] payload format, payload block
//! Color:     header, [u32] 'COLR', [u32] version, [u32] flags,
//!            [u32] component count, [f64 × count], optional system color name
//! PDF:       header, payload block
//! Theme ref: header, payload block holding a nested container
//! ```
//!
//! Records are located and validated one at a time, so a damaged record
//! fails its own lookup and nothing else.

use encoding_rs::Encoding;
use log::{debug, trace};

use crate::car::codec::{compression, pdf, raster};
use crate::car::cursor::{check_alignment, ByteCursor, RECORD_ALIGNMENT};
use crate::car::source::Payload;
use crate::car::types::error::{CarError, Result};
use crate::car::types::models::{CompressionType, Fourcc, Locator, RenditionKind};
use crate::car::types::rendition::{
    ColorSpace, ImageAttributes, NamedColor, PdfDocument, RasterImage, Size, SliceRect,
    VectorFormat, VectorImage,
};
use crate::car::utils;

/// Size of the common record header.
pub const RECORD_HEADER_SIZE: usize = 140;

const NAME_FIELD_SIZE: usize = 128;
const SLICE_SIZE: usize = 16;

const FLAG_STRUCTURED: u32 = 1 << 0;
const FLAG_TEMPLATE: u32 = 1 << 1;
const FLAG_VECTOR_BASED: u32 = 1 << 2;

const COLOR_SPACE_MASK: u32 = 0xFF;
const FLAG_SUBSTITUTE_SYSTEM_COLOR: u32 = 1 << 8;

/// The common header every record starts with.
#[derive(Debug, Clone)]
pub struct RecordHeader {
    pub version: u32,
    pub name: String,
    pub compression: CompressionType,
}

/// Body of a decoded record, one variant per rendition kind.
#[derive(Debug, Clone)]
pub enum RecordBody {
    Image(RasterImage),
    Vector(VectorImage),
    Color(NamedColor),
    Document(PdfDocument),
    /// Bytes of a nested container, opened by the storage layer.
    ThemeStore(Payload),
}

#[derive(Debug, Clone)]
pub struct DecodedRecord {
    pub header: RecordHeader,
    pub body: RecordBody,
}

/// Slices the record a locator points at out of the container.
///
/// Fails with [`CarError::Misaligned`] or [`CarError::OutOfBounds`]; the
/// container itself is never touched beyond the check.
pub fn record_at(container: &Payload, locator: &Locator) -> Result<Payload> {
    check_alignment(locator.offset, RECORD_ALIGNMENT as u64, "rendition record")?;
    let out_of_bounds = || CarError::OutOfBounds {
        context: "rendition record",
        offset: locator.offset,
        needed: locator.length,
        available: (container.len() as u64).saturating_sub(locator.offset),
    };
    let start = usize::try_from(locator.offset).map_err(|_| out_of_bounds())?;
    let end = usize::try_from(locator.length)
        .ok()
        .and_then(|len| start.checked_add(len))
        .ok_or_else(out_of_bounds)?;
    if end > container.len() {
        return Err(out_of_bounds());
    }
    container.slice(start..end, "rendition record")
}

/// Reads only the common header of a record, leaving its body untouched.
pub fn decode_header(record: &Payload, encoding: &'static Encoding) -> Result<RecordHeader> {
    read_record_header(&mut ByteCursor::new(record, "rendition record"), encoding)
}

/// Decodes one record of the declared `kind`.
pub fn decode(
    record: &Payload,
    kind: RenditionKind,
    encoding: &'static Encoding,
) -> Result<DecodedRecord> {
    if let RenditionKind::Unknown(raw) = kind {
        return Err(CarError::UnsupportedKind(raw));
    }

    let mut cursor = ByteCursor::new(record, "rendition record");
    let header = read_record_header(&mut cursor, encoding)?;
    debug!(
        "Decoding {} record '{}' (version {}, {:?})",
        kind, header.name, header.version, header.compression
    );

    let body = match kind {
        RenditionKind::RasterImage => {
            let attributes = read_image_attributes(&mut cursor)?;
            let payload = read_payload_block(record, &mut cursor, header.compression)?;
            RecordBody::Image(raster::decode_raster(attributes, payload)?)
        }
        RenditionKind::VectorImage => {
            let attributes = read_image_attributes(&mut cursor)?;
            let layout_direction = cursor.read_i32()?;
            let display_gamut = cursor.read_i32()?;
            let format = VectorFormat::try_from(cursor.read_u32()?)?;
            let payload = read_payload_block(record, &mut cursor, header.compression)?;
            trace!(
                "Vector payload: {} ({} bytes), direction {}, gamut {}",
                format,
                payload.len(),
                layout_direction,
                display_gamut
            );
            RecordBody::Vector(VectorImage {
                attributes,
                layout_direction,
                display_gamut,
                format,
                payload,
            })
        }
        RenditionKind::Color => RecordBody::Color(read_color(&mut cursor, encoding)?),
        RenditionKind::PdfDocument => {
            let payload = read_payload_block(record, &mut cursor, header.compression)?;
            RecordBody::Document(pdf::parse(payload)?)
        }
        RenditionKind::ThemeReference => {
            RecordBody::ThemeStore(read_payload_block(record, &mut cursor, header.compression)?)
        }
        RenditionKind::Unknown(raw) => return Err(CarError::UnsupportedKind(raw)),
    };

    Ok(DecodedRecord { header, body })
}

fn read_record_header(
    cursor: &mut ByteCursor<'_>,
    encoding: &'static Encoding,
) -> Result<RecordHeader> {
    let tag = Fourcc(cursor.read_u32()?);
    if tag != Fourcc::RENDITION {
        return Err(CarError::UnexpectedTag {
            context: "rendition record",
            expected: Fourcc::RENDITION,
            found: tag,
        });
    }
    let version = cursor.read_u32()?;
    let name = utils::decode_fixed_text(cursor.take(NAME_FIELD_SIZE)?, encoding);
    let compression = CompressionType::try_from(cursor.read_u32()?)?;
    Ok(RecordHeader {
        version,
        name,
        compression,
    })
}

fn read_image_attributes(cursor: &mut ByteCursor<'_>) -> Result<ImageAttributes> {
    let exif_orientation = cursor.read_i32()?;
    let flags = cursor.read_u32()?;
    let template_rendering_mode = cursor.read_i32()?;
    let resizing_mode = cursor.read_i32()?;
    let blend_mode = cursor.read_i32()?;
    let opacity = cursor.read_f32()?;
    let image_type = cursor.read_i32()?;
    let scale = cursor.read_f32()?;
    let size = Size::new(cursor.read_f32()?, cursor.read_f32()?);

    let slice_count = cursor.read_u32()? as usize;
    let slice_bytes = cursor.read_trailing(slice_count, SLICE_SIZE)?;
    let mut slice_cursor = ByteCursor::new(slice_bytes, "slice table");
    let mut slices = Vec::with_capacity(slice_count);
    for _ in 0..slice_count {
        slices.push(SliceRect {
            x: slice_cursor.read_u32()?,
            y: slice_cursor.read_u32()?,
            width: slice_cursor.read_u32()?,
            height: slice_cursor.read_u32()?,
        });
    }

    trace!(
        "Image attributes: flags={:#x}, scale={}, size={}x{}, {} slices",
        flags,
        scale,
        size.width,
        size.height,
        slices.len()
    );

    Ok(ImageAttributes {
        exif_orientation,
        is_structured: flags & FLAG_STRUCTURED != 0,
        is_template: flags & FLAG_TEMPLATE != 0,
        is_vector_based: flags & FLAG_VECTOR_BASED != 0,
        template_rendering_mode,
        resizing_mode,
        blend_mode,
        opacity,
        image_type,
        scale,
        size,
        slices,
    })
}

/// Reads a payload block and inflates it when the record is compressed.
fn read_payload_block(
    record: &Payload,
    cursor: &mut ByteCursor<'_>,
    compression_type: CompressionType,
) -> Result<Payload> {
    let stored_len = cursor.read_u32()? as usize;
    let decoded_len = cursor.read_u32()?;
    let start = cursor.position();
    cursor.skip(stored_len)?;
    let stored = record.slice(start..start + stored_len, "payload block")?;
    compression::decompress_payload(&stored, compression_type, u64::from(decoded_len))
}

fn read_color(cursor: &mut ByteCursor<'_>, encoding: &'static Encoding) -> Result<NamedColor> {
    let tag = Fourcc(cursor.read_u32()?);
    if tag != Fourcc::COLOR {
        return Err(CarError::UnexpectedTag {
            context: "color record",
            expected: Fourcc::COLOR,
            found: tag,
        });
    }
    let _version = cursor.read_u32()?;
    let flags = cursor.read_u32()?;
    let component_count = cursor.read_u32()? as usize;

    let component_bytes = cursor.read_trailing(component_count, 8)?;
    let mut components_cursor = ByteCursor::new(component_bytes, "color components");
    let components = (0..component_count)
        .map(|_| components_cursor.read_f64())
        .collect::<Result<Vec<_>>>()?;

    let substitute_with_system_color = flags & FLAG_SUBSTITUTE_SYSTEM_COLOR != 0;
    let system_color_name = if substitute_with_system_color {
        let len = cursor.read_u32()? as usize;
        Some(utils::decode_text(cursor.take(len)?, encoding))
    } else {
        None
    };

    let color_space = ColorSpace::from((flags & COLOR_SPACE_MASK) as u8);
    trace!(
        "Color: {:?}, {} components, system color {:?}",
        color_space, component_count, system_color_name
    );

    Ok(NamedColor {
        color_space,
        components,
        substitute_with_system_color,
        system_color_name,
    })
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use image::{ImageFormat, Rgba, RgbaImage};

    use super::*;

    fn record_header(compression: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&Fourcc::RENDITION.0.to_le_bytes());
        out.extend_from_slice(&1u32.to_le_bytes());
        let mut name = [0u8; NAME_FIELD_SIZE];
        name[..8].copy_from_slice(b"icon.png");
        out.extend_from_slice(&name);
        out.extend_from_slice(&compression.to_le_bytes());
        out
    }

    fn attributes(scale: f32, width: f32, height: f32, slices: &[[u32; 4]]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&1i32.to_le_bytes());
        out.extend_from_slice(&(FLAG_STRUCTURED | FLAG_TEMPLATE).to_le_bytes());
        for field in [2i32, 1, 0] {
            out.extend_from_slice(&field.to_le_bytes());
        }
        out.extend_from_slice(&0.5f32.to_le_bytes());
        out.extend_from_slice(&3i32.to_le_bytes());
        for field in [scale, width, height] {
            out.extend_from_slice(&field.to_le_bytes());
        }
        out.extend_from_slice(&(slices.len() as u32).to_le_bytes());
        for slice in slices {
            for field in slice {
                out.extend_from_slice(&field.to_le_bytes());
            }
        }
        out
    }

    fn payload_block(stored: &[u8], decoded_len: usize) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(stored.len() as u32).to_le_bytes());
        out.extend_from_slice(&(decoded_len as u32).to_le_bytes());
        out.extend_from_slice(stored);
        out
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        RgbaImage::from_pixel(width, height, Rgba([0, 128, 255, 255]))
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn color_body(
        tag: Fourcc,
        flags: u32,
        components: &[f64],
        system_name: Option<&str>,
    ) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&tag.0.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&flags.to_le_bytes());
        out.extend_from_slice(&(components.len() as u32).to_le_bytes());
        for c in components {
            out.extend_from_slice(&c.to_le_bytes());
        }
        if let Some(name) = system_name {
            out.extend_from_slice(&(name.len() as u32).to_le_bytes());
            out.extend_from_slice(name.as_bytes());
        }
        out
    }

    fn decode_bytes(bytes: Vec<u8>, kind: RenditionKind) -> Result<DecodedRecord> {
        decode(&Payload::owned(bytes), kind, encoding_rs::UTF_8)
    }

    #[test]
    fn decodes_a_zlib_compressed_raster() {
        let image = png(4, 2);
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&image).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut bytes = record_header(1);
        bytes.extend(attributes(2.0, 2.0, 1.0, &[[1, 1, 2, 0]]));
        bytes.extend(payload_block(&compressed, image.len()));

        let record = decode_bytes(bytes, RenditionKind::RasterImage).unwrap();
        assert_eq!(record.header.name, "icon.png");
        assert_eq!(record.header.compression, CompressionType::Zlib);
        let RecordBody::Image(raster) = record.body else {
            panic!("expected a raster image");
        };
        assert_eq!((raster.width(), raster.height()), (4, 2));
        assert!(raster.attributes.is_template);
        assert!(raster.attributes.has_slice_information());
        assert!(!raster.attributes.is_vector_based);
        assert_eq!(raster.attributes.opacity, 0.5);
        assert_eq!(raster.attributes.slices, vec![SliceRect { x: 1, y: 1, width: 2, height: 0 }]);
        assert_eq!(&*raster.payload, &image[..]);
    }

    #[test]
    fn undecodable_pixels_are_corrupt_image_payloads() {
        let mut bytes = record_header(0);
        bytes.extend(attributes(1.0, 1.0, 1.0, &[]));
        bytes.extend(payload_block(b"not a png", 9));
        assert!(matches!(
            decode_bytes(bytes, RenditionKind::RasterImage),
            Err(CarError::CorruptImagePayload(_))
        ));
    }

    #[test]
    fn decodes_colors_with_and_without_system_names() {
        let mut bytes = record_header(0);
        bytes.extend(color_body(Fourcc::COLOR, 2, &[1.0, 0.5, 0.25, 1.0], None));
        let record = decode_bytes(bytes, RenditionKind::Color).unwrap();
        let RecordBody::Color(color) = record.body else {
            panic!("expected a color");
        };
        assert_eq!(color.color_space, ColorSpace::DisplayP3);
        assert_eq!(color.components, vec![1.0, 0.5, 0.25, 1.0]);
        assert!(!color.substitute_with_system_color);

        let mut bytes = record_header(0);
        let flags = FLAG_SUBSTITUTE_SYSTEM_COLOR;
        bytes.extend(color_body(Fourcc::COLOR, flags, &[0.0], Some("labelColor")));
        let record = decode_bytes(bytes, RenditionKind::Color).unwrap();
        let RecordBody::Color(color) = record.body else {
            panic!("expected a color");
        };
        assert!(color.substitute_with_system_color);
        assert_eq!(color.system_color_name.as_deref(), Some("labelColor"));
    }

    #[test]
    fn wrong_color_tag_is_unexpected() {
        let mut bytes = record_header(0);
        bytes.extend(color_body(Fourcc::from_tag(b"XXXX"), 0, &[1.0], None));
        let err = decode_bytes(bytes, RenditionKind::Color).unwrap_err();
        assert!(matches!(
            err,
            CarError::UnexpectedTag { context: "color record", expected: Fourcc::COLOR, .. }
        ));
    }

    #[test]
    fn truncated_components_are_out_of_bounds() {
        let mut bytes = record_header(0);
        let mut body = color_body(Fourcc::COLOR, 0, &[1.0, 1.0], None);
        body.truncate(body.len() - 4);
        bytes.extend(body);
        assert!(matches!(
            decode_bytes(bytes, RenditionKind::Color),
            Err(CarError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn decodes_pdf_and_vector_records() {
        let doc = b"%PDF-1.3\n<< /Type /Page >>\n%%EOF";
        let mut bytes = record_header(0);
        bytes.extend(payload_block(doc, doc.len()));
        let record = decode_bytes(bytes, RenditionKind::PdfDocument).unwrap();
        let RecordBody::Document(pdf) = record.body else {
            panic!("expected a document");
        };
        assert_eq!(pdf.version, "1.3");
        assert_eq!(pdf.page_count(), 1);

        let mut bytes = record_header(0);
        bytes.extend(attributes(1.0, 8.0, 8.0, &[]));
        bytes.extend_from_slice(&1i32.to_le_bytes());
        bytes.extend_from_slice(&2i32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend(payload_block(doc, doc.len()));
        let record = decode_bytes(bytes, RenditionKind::VectorImage).unwrap();
        let RecordBody::Vector(vector) = record.body else {
            panic!("expected a vector image");
        };
        assert_eq!(vector.format, VectorFormat::Pdf);
        assert_eq!((vector.layout_direction, vector.display_gamut), (1, 2));
        assert!(vector.pdf_document().unwrap().is_some());
    }

    #[test]
    fn record_level_failures() {
        let mut bytes = record_header(0);
        bytes[0] = b'X';
        assert!(matches!(
            decode_bytes(bytes, RenditionKind::PdfDocument),
            Err(CarError::UnexpectedTag { context: "rendition record", .. })
        ));
        assert!(matches!(
            decode_bytes(record_header(0), RenditionKind::Unknown(42)),
            Err(CarError::UnsupportedKind(42))
        ));
        assert!(matches!(
            decode_bytes(record_header(7), RenditionKind::PdfDocument),
            Err(CarError::DecompressionError(_))
        ));
        let mut bytes = record_header(0);
        bytes.extend(payload_block(b"%PDF-1.0", 8));
        bytes.truncate(bytes.len() - 3);
        assert!(matches!(
            decode_bytes(bytes, RenditionKind::PdfDocument),
            Err(CarError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn records_are_located_with_alignment_and_bounds_checks() {
        let container = Payload::owned(vec![0u8; 64]);
        let locator = |offset: u64, length: u64| Locator {
            index: 0,
            kind: RenditionKind::Color,
            offset,
            length,
        };
        assert_eq!(record_at(&container, &locator(8, 16)).unwrap().len(), 16);
        assert!(matches!(
            record_at(&container, &locator(6, 4)),
            Err(CarError::Misaligned { offset: 6, .. })
        ));
        assert!(matches!(
            record_at(&container, &locator(60, 8)),
            Err(CarError::OutOfBounds { .. })
        ));
        assert!(matches!(
            record_at(&container, &locator(8, u64::MAX)),
            Err(CarError::OutOfBounds { .. })
        ));
    }
}
