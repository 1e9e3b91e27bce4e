//! On-demand rasterization of vector renditions.
//!
//! SVG payloads are rendered with `resvg`. PDF payloads need an external
//! renderer, supplied through [`VectorRasterizer`] and
//! [`VectorImage::rasterize_with`].

use image::RgbaImage;
use log::{debug, trace};

use super::pdf;
use crate::car::types::error::{CarError, Result};
use crate::car::types::rendition::{PdfDocument, Size, VectorFormat, VectorImage};

/// Largest raster edge, in pixels, that rasterization will allocate.
pub const MAX_RASTER_DIMENSION: u32 = 16_384;

/// Renders a vector rendition into an RGBA bitmap of exactly `width` × `height` pixels.
pub trait VectorRasterizer {
    fn rasterize(&self, image: &VectorImage, width: u32, height: u32) -> Result<RgbaImage>;
}

/// Built-in rasterizer for SVG payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgRasterizer;

impl VectorRasterizer for SvgRasterizer {
    fn rasterize(&self, image: &VectorImage, width: u32, height: u32) -> Result<RgbaImage> {
        if image.format != VectorFormat::Svg {
            return Err(CarError::UnsupportedVectorPayload(format!(
                "the SVG rasterizer cannot draw {} payloads",
                image.format
            )));
        }
        let tree = usvg::Tree::from_data(&image.payload, &usvg::Options::default())
            .map_err(|e| CarError::CorruptVectorPayload(e.to_string()))?;

        let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height).ok_or_else(|| {
            CarError::InvalidRasterTarget(format!("cannot allocate a {}x{} pixmap", width, height))
        })?;
        let sx = width as f32 / tree.size().width();
        let sy = height as f32 / tree.size().height();
        trace!("Rendering SVG at {}x{} (scale {}, {})", width, height, sx, sy);
        resvg::render(&tree, resvg::tiny_skia::Transform::from_scale(sx, sy), &mut pixmap.as_mut());

        // tiny-skia stores premultiplied alpha; image buffers are straight.
        let data = pixmap
            .pixels()
            .iter()
            .flat_map(|pixel| {
                let color = pixel.demultiply();
                [color.red(), color.green(), color.blue(), color.alpha()]
            })
            .collect();
        RgbaImage::from_raw(width, height, data).ok_or_else(|| {
            CarError::SizeMismatch {
                context: "rasterized pixmap",
                expected: u64::from(width) * u64::from(height) * 4,
                found: 0,
            }
        })
    }
}

/// Pixel dimensions for drawing `target_size` points at `scale`.
fn raster_dimensions(scale: f32, target_size: Size) -> Result<(u32, u32)> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(CarError::InvalidRasterTarget(format!("scale {} is not positive", scale)));
    }
    if !target_size.is_drawable() {
        return Err(CarError::InvalidRasterTarget(format!(
            "target size {}x{} is empty",
            target_size.width, target_size.height
        )));
    }
    let to_px = |points: f32| ((points * scale).ceil() as u32).max(1);
    let (width, height) = (to_px(target_size.width), to_px(target_size.height));
    if width > MAX_RASTER_DIMENSION || height > MAX_RASTER_DIMENSION {
        return Err(CarError::InvalidRasterTarget(format!(
            "raster size {}x{} exceeds {}x{}",
            width, height, MAX_RASTER_DIMENSION, MAX_RASTER_DIMENSION
        )));
    }
    Ok((width, height))
}

impl VectorImage {
    /// Rasterizes at `scale` for a target of `target_size` points.
    ///
    /// Pure: the same inputs always produce the same bitmap, and nothing is
    /// cached. Only SVG payloads have a built-in renderer; PDF payloads fail
    /// with [`CarError::UnsupportedVectorPayload`], use
    /// [`rasterize_with`](Self::rasterize_with) for those.
    pub fn rasterize(&self, scale: f32, target_size: Size) -> Result<RgbaImage> {
        match self.format {
            VectorFormat::Svg => self.rasterize_with(&SvgRasterizer, scale, target_size),
            VectorFormat::Pdf => Err(CarError::UnsupportedVectorPayload(
                "PDF-backed vector images need an external rasterizer".to_string(),
            )),
        }
    }

    /// Rasterizes through a caller-supplied renderer.
    pub fn rasterize_with<R>(
        &self,
        rasterizer: &R,
        scale: f32,
        target_size: Size,
    ) -> Result<RgbaImage>
    where
        R: VectorRasterizer + ?Sized,
    {
        let (width, height) = raster_dimensions(scale, target_size)?;
        debug!("Rasterizing {} vector image to {}x{} pixels", self.format, width, height);
        let pixels = rasterizer.rasterize(self, width, height)?;
        if pixels.dimensions() != (width, height) {
            return Err(CarError::SizeMismatch {
                context: "rasterized image",
                expected: u64::from(width) * u64::from(height),
                found: u64::from(pixels.width()) * u64::from(pixels.height()),
            });
        }
        Ok(pixels)
    }

    /// The embedded PDF, for PDF-backed vector images.
    pub fn pdf_document(&self) -> Result<Option<PdfDocument>> {
        match self.format {
            VectorFormat::Pdf => pdf::parse(self.payload.clone()).map(Some),
            VectorFormat::Svg => Ok(None),
        }
    }
}
