//! Decoded renditions.
//!
//! Every decoded value holds its payload through a [`Payload`], which keeps
//! the container bytes alive for as long as the rendition is in use.

use std::fmt;
use std::sync::Arc;

use image::RgbaImage;

use super::attributes::{theme_state_name, ThemeState};
use super::error::{CarError, Result};
use super::key::RenditionKey;
use super::models::RenditionKind;
use crate::car::source::Payload;
use crate::car::storage::StructuredThemeStore;

/// Width and height in points.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Both dimensions finite and strictly positive.
    pub fn is_drawable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// A stretchable region of a sliced image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SliceRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Presentation metadata shared by raster and vector images.
///
/// Blend mode and opacity are reported as stored; nothing in this crate
/// applies them.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAttributes {
    pub exif_orientation: i32,
    pub is_structured: bool,
    pub is_template: bool,
    pub is_vector_based: bool,
    pub template_rendering_mode: i32,
    pub resizing_mode: i32,
    pub blend_mode: i32,
    pub opacity: f32,
    pub image_type: i32,
    pub scale: f32,
    /// Declared size in points.
    pub size: Size,
    pub slices: Vec<SliceRect>,
}

impl ImageAttributes {
    pub fn has_slice_information(&self) -> bool {
        self.is_structured
    }

    /// Declared size multiplied by the scale, rounded to whole pixels.
    pub fn pixel_size(&self) -> (u32, u32) {
        let scale = if self.scale > 0.0 { self.scale } else { 1.0 };
        (
            (self.size.width * scale).round().max(0.0) as u32,
            (self.size.height * scale).round().max(0.0) as u32,
        )
    }
}

/// A bitmap rendition, decoded eagerly into RGBA pixels.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub attributes: ImageAttributes,
    /// The encoded image bytes (PNG, JPEG, ...) as stored, after inflation.
    pub payload: Payload,
    pub pixels: Arc<RgbaImage>,
}

impl RasterImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Document format embedded in a vector rendition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorFormat {
    Pdf,
    Svg,
}

impl TryFrom<u32> for VectorFormat {
    type Error = CarError;
    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(Self::Pdf),
            1 => Ok(Self::Svg),
            other => Err(CarError::UnsupportedVectorPayload(format!(
                "unknown vector payload format {}",
                other
            ))),
        }
    }
}

impl fmt::Display for VectorFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Pdf => write!(f, "PDF"),
            Self::Svg => write!(f, "SVG"),
        }
    }
}

/// A page-described vector rendition, rasterized on demand.
///
/// See [`VectorImage::rasterize`](crate::car::codec::vector) for the
/// rasterization entry points.
#[derive(Debug, Clone)]
pub struct VectorImage {
    pub attributes: ImageAttributes,
    pub layout_direction: i32,
    pub display_gamut: i32,
    pub format: VectorFormat,
    pub payload: Payload,
}

/// Color space of a named color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Srgb,
    GrayGamma22,
    DisplayP3,
    ExtendedRangeSrgb,
    ExtendedLinearSrgb,
    ExtendedGray,
    Unknown(u8),
}

impl From<u8> for ColorSpace {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Srgb,
            1 => Self::GrayGamma22,
            2 => Self::DisplayP3,
            3 => Self::ExtendedRangeSrgb,
            4 => Self::ExtendedLinearSrgb,
            5 => Self::ExtendedGray,
            other => Self::Unknown(other),
        }
    }
}

impl ColorSpace {
    pub fn id(self) -> u8 {
        match self {
            Self::Srgb => 0,
            Self::GrayGamma22 => 1,
            Self::DisplayP3 => 2,
            Self::ExtendedRangeSrgb => 3,
            Self::ExtendedLinearSrgb => 4,
            Self::ExtendedGray => 5,
            Self::Unknown(other) => other,
        }
    }
}

/// A color rendition.
///
/// When `substitute_with_system_color` is set, the platform's named-color
/// registry decides the final color; `components` are only a fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedColor {
    pub color_space: ColorSpace,
    pub components: Vec<f64>,
    pub substitute_with_system_color: bool,
    pub system_color_name: Option<String>,
}

impl NamedColor {
    /// Components as 8-bit RGBA, for gray (1-2 components) and RGB (3-4 components) colors.
    pub fn to_rgba8(&self) -> Option<[u8; 4]> {
        let (r, g, b, a) = match *self.components.as_slice() {
            [gray] => (gray, gray, gray, 1.0),
            [gray, alpha] => (gray, gray, gray, alpha),
            [r, g, b] => (r, g, b, 1.0),
            [r, g, b, a] => (r, g, b, a),
            _ => return None,
        };
        let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Some([channel(r), channel(g), channel(b), channel(a)])
    }
}

/// An embedded PDF file.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    /// Version from the `%PDF-x.y` marker.
    pub version: String,
    pub payload: Payload,
}

/// The decoded body of a rendition; exactly one variant per kind.
#[derive(Debug, Clone)]
pub enum RenditionContent {
    Image(RasterImage),
    Vector(VectorImage),
    Color(NamedColor),
    Document(PdfDocument),
    ThemeStore(Arc<StructuredThemeStore>),
}

impl RenditionContent {
    pub fn kind(&self) -> RenditionKind {
        match self {
            Self::Image(_) => RenditionKind::RasterImage,
            Self::Vector(_) => RenditionKind::VectorImage,
            Self::Color(_) => RenditionKind::Color,
            Self::Document(_) => RenditionKind::PdfDocument,
            Self::ThemeStore(_) => RenditionKind::ThemeReference,
        }
    }
}

/// The result of a successful lookup.
#[derive(Debug, Clone)]
pub struct NamedRendition {
    /// The name the lookup asked for, or the facet name for key lookups.
    pub name: Option<String>,
    /// The name stored in the record header.
    pub rendition_name: String,
    /// The stored key that was matched.
    pub key: RenditionKey,
    pub kind: RenditionKind,
    /// `true` when the stored key equals the query token for token.
    pub exact: bool,
    pub content: RenditionContent,
}

impl NamedRendition {
    /// Display scale: from the image attributes when present, else the key's scale token.
    pub fn scale(&self) -> f32 {
        match &self.content {
            RenditionContent::Image(image) if image.attributes.scale > 0.0 => {
                image.attributes.scale
            }
            RenditionContent::Vector(vector) if vector.attributes.scale > 0.0 => {
                vector.attributes.scale
            }
            _ => self.key.theme_scale().map_or(1.0, f32::from),
        }
    }

    pub fn theme_state(&self) -> Option<ThemeState> {
        self.key.state()
    }

    pub fn theme_state_name(&self) -> Option<&'static str> {
        self.key
            .theme_state()
            .and_then(|state| theme_state_name(i64::from(state)))
    }

    pub fn as_image(&self) -> Option<&RasterImage> {
        match &self.content {
            RenditionContent::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&VectorImage> {
        match &self.content {
            RenditionContent::Vector(vector) => Some(vector),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<&NamedColor> {
        match &self.content {
            RenditionContent::Color(color) => Some(color),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&PdfDocument> {
        match &self.content {
            RenditionContent::Document(document) => Some(document),
            _ => None,
        }
    }

    pub fn as_theme_store(&self) -> Option<&Arc<StructuredThemeStore>> {
        match &self.content {
            RenditionContent::ThemeStore(store) => Some(store),
            _ => None,
        }
    }
}
