//! Bitmap payload decoding through the `image` crate.

use std::sync::Arc;

use image::RgbaImage;
use log::{trace, warn};

use crate::car::source::Payload;
use crate::car::types::error::{CarError, Result};
use crate::car::types::rendition::{ImageAttributes, RasterImage};

/// Decodes an embedded image (PNG, JPEG, ...) into RGBA pixels.
pub fn decode_pixels(bytes: &[u8]) -> Result<RgbaImage> {
    let format = image::guess_format(bytes)
        .map_err(|e| CarError::CorruptImagePayload(format!("unrecognized image data: {}", e)))?;
    trace!("Decoding {:?} image payload ({} bytes)", format, bytes.len());
    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| CarError::CorruptImagePayload(e.to_string()))?;
    Ok(decoded.to_rgba8())
}

/// Builds a [`RasterImage`] from its attributes and inflated payload.
///
/// A pixel size that disagrees with the declared size and scale is logged
/// and tolerated; the decoded pixels are authoritative.
pub fn decode_raster(attributes: ImageAttributes, payload: Payload) -> Result<RasterImage> {
    let pixels = decode_pixels(&payload)?;
    let declared = attributes.pixel_size();
    if declared != (0, 0) && declared != pixels.dimensions() {
        warn!(
            "Raster payload is {}x{} pixels but attributes declare {}x{} at scale {}",
            pixels.width(),
            pixels.height(),
            declared.0,
            declared.1,
            attributes.scale
        );
    }
    Ok(RasterImage {
        attributes,
        payload,
        pixels: Arc::new(pixels),
    })
}
