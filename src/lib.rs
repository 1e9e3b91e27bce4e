//! # car-reader
//!
//! A reader for compiled asset catalogs (`.car` files).
//!
//! Opens a catalog, lists its asset names, and resolves lookups by name and
//! scale (or by a full rendition key) to the best stored rendition: a raster
//! image, a vector image, a color, a PDF document or a nested theme store.
//!
//! ```no_run
//! use car_reader::open_catalog;
//!
//! let catalog = open_catalog("Assets.car")?;
//! for name in catalog.names() {
//!     if let Some(rendition) = catalog.lookup(name, 2.0)? {
//!         println!("{} -> {} @{}x", name, rendition.kind, rendition.scale());
//!     }
//! }
//! # Ok::<(), car_reader::CarError>(())
//! ```
pub mod car;

// Re-export the main types for convenience
pub use car::{
    codec::vector::{SvgRasterizer, VectorRasterizer},
    iter::{Entries, Names, Renditions},
    reader::{open_catalog, Catalog, CatalogOptions, RenditionQuery},
    storage::{AssetStorage, StructuredThemeStore},
    types::{
        attributes::{attribute_name, theme_state_name, AttributeId, ThemeState, THEME_STATE_NONE},
        error::{CarError, Result},
        key::{KeyToken, RenditionKey},
        models::{CarHeader, Facet, Fourcc, Locator, RenditionKind, Resolution},
        rendition::{
            ColorSpace, ImageAttributes, NamedColor, NamedRendition, PdfDocument, RasterImage,
            RenditionContent, Size, SliceRect, VectorFormat, VectorImage,
        },
    },
};
