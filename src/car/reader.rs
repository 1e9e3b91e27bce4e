use std::path::{Path, PathBuf};
use std::sync::Arc;

use encoding_rs::Encoding;
use log::{debug, info};

use super::iter::{Entries, Names};
use super::source::{ByteSource, Payload};
use super::storage::StructuredThemeStore;
use super::types::attributes::{AttributeId, ThemeState};
use super::types::error::Result;
use super::types::key::{KeyToken, RenditionKey};
use super::types::models::{CarHeader, Facet, RenditionKind};
use super::types::rendition::{NamedRendition, PdfDocument};
use super::utils;

/// Settings applied when opening a catalog.
#[derive(Debug, Clone)]
pub struct CatalogOptions {
    /// Text encoding label for header and facet names (default UTF-8).
    pub encoding: Option<String>,
    /// Memory-map the file instead of reading it into memory.
    pub memory_map: bool,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            encoding: None,
            memory_map: true,
        }
    }
}

impl CatalogOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = Some(label.into());
        self
    }

    pub fn with_memory_map(mut self, memory_map: bool) -> Self {
        self.memory_map = memory_map;
        self
    }

    fn resolved_encoding(&self) -> &'static Encoding {
        self.encoding
            .as_deref()
            .map(utils::parse_encoding)
            .unwrap_or(encoding_rs::UTF_8)
    }
}

/// A lookup by asset name plus the attributes to match.
///
/// Attributes left unset are simply absent from the query key; resolution
/// then picks the best stored rendition among those the name covers.
#[derive(Debug, Clone)]
pub struct RenditionQuery {
    name: String,
    scale: Option<f64>,
    state: Option<ThemeState>,
    extra: Vec<KeyToken>,
}

impl RenditionQuery {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scale: None,
            state: None,
            extra: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display scale factor; rounded to the nearest whole scale. Non-positive values are ignored.
    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn state(mut self, state: ThemeState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn direction(self, direction: u16) -> Self {
        self.attribute(AttributeId::Direction, direction)
    }

    pub fn idiom(self, idiom: u16) -> Self {
        self.attribute(AttributeId::Idiom, idiom)
    }

    pub fn appearance(self, appearance: u16) -> Self {
        self.attribute(AttributeId::Appearance, appearance)
    }

    pub fn size_classes(self, horizontal: u16, vertical: u16) -> Self {
        self.attribute(AttributeId::HorizontalSizeClass, horizontal)
            .attribute(AttributeId::VerticalSizeClass, vertical)
    }

    /// Any other attribute; a later value for the same identifier wins.
    pub fn attribute(mut self, identifier: AttributeId, value: u16) -> Self {
        self.extra.push(KeyToken::new(identifier, value));
        self
    }

    /// The query key for this request against a facet.
    pub fn key_for(&self, facet: &Facet) -> RenditionKey {
        let mut key = facet.key.clone();
        if let Some(scale) = self.scale.and_then(scale_token) {
            key.set(AttributeId::Scale, scale);
        }
        if let Some(state) = self.state {
            key.set(AttributeId::State, state.value());
        }
        for token in &self.extra {
            key.set(token.identifier, token.value);
        }
        key
    }
}

fn scale_token(scale: f64) -> Option<u16> {
    if scale.is_finite() && scale > 0.0 {
        Some(scale.round().clamp(1.0, f64::from(u16::MAX)) as u16)
    } else {
        None
    }
}

/// An open asset catalog.
///
/// A `Catalog` only exists in the open state: construction fails when the
/// header or tables cannot be parsed, and [`close`](Self::close) consumes it.
/// All lookups take `&self` and may run concurrently.
#[derive(Debug)]
pub struct Catalog {
    path: Option<PathBuf>,
    store: Arc<StructuredThemeStore>,
}

impl Catalog {
    /// Opens the catalog at `path` with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, CatalogOptions::default())
    }

    /// Opens the catalog at `path`.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The tag or storage version is not recognized
    /// - The header or tables run past the end of the file or are misaligned
    /// - A rendition key repeats an attribute
    pub fn open_with(path: impl AsRef<Path>, options: CatalogOptions) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening asset catalog: {}", path.display());
        let source = if options.memory_map {
            ByteSource::map(path)?
        } else {
            ByteSource::read(path)?
        };
        let mut catalog = Self::from_source(source, &options)?;
        catalog.path = Some(path.to_path_buf());
        Ok(catalog)
    }

    /// Opens a catalog held in memory.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>, options: CatalogOptions) -> Result<Self> {
        Self::from_source(ByteSource::from(bytes.into()), &options)
    }

    fn from_source(source: ByteSource, options: &CatalogOptions) -> Result<Self> {
        let encoding = options.resolved_encoding();
        if encoding != encoding_rs::UTF_8 {
            info!("Text encoding overridden: '{}'", encoding.name());
        }
        let store = StructuredThemeStore::from_payload(Payload::whole(Arc::new(source)), encoding)?;
        info!(
            "Catalog opened: {} renditions, {} names",
            store.theme_store().index().len(),
            store.theme_store().facets().len()
        );
        Ok(Self {
            path: None,
            store: Arc::new(store),
        })
    }

    /// Closes the catalog.
    ///
    /// Renditions already handed out stay valid; they share the container bytes.
    pub fn close(self) {
        info!(
            "Closing asset catalog{}",
            self.path
                .as_ref()
                .map(|p| format!(": {}", p.display()))
                .unwrap_or_default()
        );
    }

    pub fn header(&self) -> &CarHeader {
        self.store.theme_store().header()
    }

    /// The path the catalog was opened from, if it came from a file.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of stored renditions.
    pub fn len(&self) -> usize {
        self.store.theme_store().index().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The catalog's structured theme store.
    pub fn theme_store(&self) -> &Arc<StructuredThemeStore> {
        &self.store
    }

    /// All asset names, in facet table order.
    pub fn names(&self) -> Names<'_> {
        Names::new(self.store.theme_store().facets())
    }

    /// Every stored key, in table order.
    pub fn all_asset_keys(&self) -> Vec<RenditionKey> {
        self.store.theme_store().all_asset_keys()
    }

    /// Iterates `(key, locator)` pairs over the rendition table.
    ///
    /// Chain with `.with_renditions()` to decode each entry.
    pub fn iter_entries(&self) -> Entries<'_> {
        Entries::new(&self.store)
    }

    /// Looks up the Normal-state rendition of `name` closest to `scale`.
    pub fn lookup(&self, name: &str, scale: f64) -> Result<Option<NamedRendition>> {
        self.lookup_query(&RenditionQuery::new(name).scale(scale).state(ThemeState::Normal))
    }

    /// Looks up a rendition by name and attributes.
    ///
    /// Unknown names and names without any stored rendition yield `Ok(None)`.
    pub fn lookup_query(&self, query: &RenditionQuery) -> Result<Option<NamedRendition>> {
        let Some(facet) = self.store.theme_store().facet(query.name()) else {
            debug!("No facet named '{}'", query.name());
            return Ok(None);
        };
        let key = query.key_for(facet);
        let rendition = self.store.rendition_with_key(&key)?;
        Ok(rendition.map(|r| NamedRendition {
            name: Some(query.name().to_string()),
            ..r
        }))
    }

    /// Looks up a rendition by a full query key.
    pub fn lookup_by_key(&self, key: &RenditionKey) -> Result<Option<NamedRendition>> {
        self.store.rendition_with_key(key)
    }

    /// The PDF document stored under `name`.
    ///
    /// PDF document renditions are preferred; PDF-backed vector images are
    /// used when the name has none.
    pub fn pdf_document(&self, name: &str) -> Result<Option<PdfDocument>> {
        let Some(facet) = self.store.theme_store().facet(name) else {
            return Ok(None);
        };
        let key = &facet.key;

        let document = self
            .store
            .rendition_matching(key, |entry| entry.kind == RenditionKind::PdfDocument)?;
        if let Some(document) = document.as_ref().and_then(NamedRendition::as_document) {
            return Ok(Some(document.clone()));
        }

        let vector = self
            .store
            .rendition_matching(key, |entry| entry.kind == RenditionKind::VectorImage)?;
        match vector.as_ref().and_then(NamedRendition::as_vector) {
            Some(vector) => vector.pdf_document(),
            None => Ok(None),
        }
    }
}

/// Opens the catalog at `path` with default options.
pub fn open_catalog(path: impl AsRef<Path>) -> Result<Catalog> {
    Catalog::open(path)
}
