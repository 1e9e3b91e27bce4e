//! Asset storage and structured theme stores.
//!
//! [`AssetStorage`] is one parsed container: header, facets and index over
//! an immutable payload. [`StructuredThemeStore`] adds record decoding on
//! top, and opens theme-reference records as nested stores on first use.
//! Nested stores are cached for as long as their parent lives.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use encoding_rs::Encoding;
use log::{debug, info};

use super::format::content::{self, DecodedRecord, RecordBody};
use super::format::index::AssetIndex;
use super::format::{header, index};
use super::source::Payload;
use super::types::error::{CarError, Result};
use super::types::key::RenditionKey;
use super::types::models::{CarHeader, Facet, IndexEntry, Locator, RenditionKind, Resolution};
use super::types::rendition::{NamedRendition, RenditionContent};

/// A parsed container: header, facet table and rendition index.
#[derive(Debug)]
pub struct AssetStorage {
    data: Payload,
    header: CarHeader,
    facets: Vec<Facet>,
    /// First facet per name.
    by_name: HashMap<String, usize>,
    /// First facet per theme-element.
    by_element: HashMap<u16, usize>,
    index: AssetIndex,
    encoding: &'static Encoding,
}

impl AssetStorage {
    /// Parses the header and tables of the container in `data`.
    pub fn parse(data: Payload, encoding: &'static Encoding) -> Result<Self> {
        let (header, tables_offset) = header::parse(&data, encoding)?;
        let (facets, index) = index::parse(&data, &header, tables_offset, encoding)?;

        let mut by_name = HashMap::with_capacity(facets.len());
        let mut by_element = HashMap::with_capacity(facets.len());
        for (i, facet) in facets.iter().enumerate() {
            by_name.entry(facet.name.clone()).or_insert(i);
            if let Some(element) = facet.element() {
                by_element.entry(element).or_insert(i);
            }
        }

        Ok(Self {
            data,
            header,
            facets,
            by_name,
            by_element,
            index,
            encoding,
        })
    }

    pub fn header(&self) -> &CarHeader {
        &self.header
    }

    pub fn facets(&self) -> &[Facet] {
        &self.facets
    }

    pub fn facet(&self, name: &str) -> Option<&Facet> {
        self.by_name.get(name).map(|&i| &self.facets[i])
    }

    /// The facet naming the given theme-element, if any.
    pub fn facet_for_element(&self, element: u16) -> Option<&Facet> {
        self.by_element.get(&element).map(|&i| &self.facets[i])
    }

    pub fn index(&self) -> &AssetIndex {
        &self.index
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Every stored key, in table order.
    pub fn all_asset_keys(&self) -> Vec<RenditionKey> {
        self.index.keys().cloned().collect()
    }

    /// The raw bytes of the record a locator points at.
    pub fn record(&self, locator: &Locator) -> Result<Payload> {
        content::record_at(&self.data, locator)
    }

    /// Resolves `key` and returns the matched record's raw bytes.
    pub fn lookup_asset(&self, key: &RenditionKey) -> Result<Option<Payload>> {
        self.index
            .resolve(key)
            .map(|resolution| self.record(&resolution.locator))
            .transpose()
    }

    /// Locates and decodes one record.
    pub fn decode(&self, locator: &Locator) -> Result<DecodedRecord> {
        let record = self.record(locator)?;
        content::decode(&record, locator.kind, self.encoding)
    }
}

/// A catalog-within-a-catalog, addressable by the same key resolution.
#[derive(Debug)]
pub struct StructuredThemeStore {
    storage: AssetStorage,
    /// One slot per rendition table entry, filled for theme references on first use.
    nested: Vec<OnceLock<Arc<StructuredThemeStore>>>,
}

impl StructuredThemeStore {
    pub fn new(storage: AssetStorage) -> Self {
        let nested = (0..storage.index().len()).map(|_| OnceLock::new()).collect();
        Self { storage, nested }
    }

    /// Parses a container held in `payload`.
    pub fn from_payload(payload: Payload, encoding: &'static Encoding) -> Result<Self> {
        AssetStorage::parse(payload, encoding).map(Self::new)
    }

    /// The underlying container.
    pub fn theme_store(&self) -> &AssetStorage {
        &self.storage
    }

    /// Raw bytes of the best match for `key`.
    pub fn lookup_asset_for_key(&self, key: &RenditionKey) -> Result<Option<Payload>> {
        self.storage.lookup_asset(key)
    }

    /// Resolves and decodes the best match for `key`.
    pub fn rendition_with_key(&self, key: &RenditionKey) -> Result<Option<NamedRendition>> {
        self.rendition_matching(key, |_| true)
    }

    /// Like [`rendition_with_key`](Self::rendition_with_key), restricted to
    /// entries `accept` allows.
    pub fn rendition_matching<F>(
        &self,
        key: &RenditionKey,
        accept: F,
    ) -> Result<Option<NamedRendition>>
    where
        F: Fn(&IndexEntry) -> bool,
    {
        match self.storage.index().resolve_matching(key, accept) {
            Some(resolution) => self.rendition(&resolution).map(Some),
            None => {
                debug!("No rendition shares the element of {}", key);
                Ok(None)
            }
        }
    }

    /// Decodes the rendition a resolution points at.
    ///
    /// A theme reference whose nested store is already open only has its
    /// record header read; the nested container is not inflated again.
    pub fn rendition(&self, resolution: &Resolution) -> Result<NamedRendition> {
        let locator = &resolution.locator;
        let entry = self.entry(locator)?;

        let (rendition_name, content) = match self.cached_nested(locator) {
            Some(store) => {
                let record = self.storage.record(locator)?;
                let header = content::decode_header(&record, self.storage.encoding())?;
                debug!("Reusing nested theme store at entry {}", locator.index);
                (header.name, RenditionContent::ThemeStore(store))
            }
            None => {
                let DecodedRecord { header, body } = self.storage.decode(locator)?;
                let content = match body {
                    RecordBody::Image(image) => RenditionContent::Image(image),
                    RecordBody::Vector(vector) => RenditionContent::Vector(vector),
                    RecordBody::Color(color) => RenditionContent::Color(color),
                    RecordBody::Document(document) => RenditionContent::Document(document),
                    RecordBody::ThemeStore(payload) => {
                        RenditionContent::ThemeStore(self.nested_from(locator, payload)?)
                    }
                };
                (header.name, content)
            }
        };

        let name = entry
            .key
            .theme_element()
            .and_then(|element| self.storage.facet_for_element(element))
            .map(|facet| facet.name.clone());

        Ok(NamedRendition {
            name,
            rendition_name,
            key: entry.key.clone(),
            kind: content.kind(),
            exact: resolution.exact,
            content,
        })
    }

    /// The nested store behind a theme-reference entry, opened on first use.
    pub fn nested(&self, locator: &Locator) -> Result<Arc<StructuredThemeStore>> {
        if locator.kind != RenditionKind::ThemeReference {
            return Err(CarError::UnexpectedKind {
                expected: "theme reference",
                found: locator.kind,
            });
        }
        if let Some(store) = self.cached_nested(locator) {
            return Ok(store);
        }
        match self.storage.decode(locator)?.body {
            RecordBody::ThemeStore(payload) => self.nested_from(locator, payload),
            _ => Err(CarError::UnexpectedKind {
                expected: "theme reference",
                found: locator.kind,
            }),
        }
    }

    /// The nested store for a theme-reference entry, if it has been opened.
    fn cached_nested(&self, locator: &Locator) -> Option<Arc<StructuredThemeStore>> {
        if locator.kind != RenditionKind::ThemeReference {
            return None;
        }
        self.nested.get(locator.index)?.get().map(Arc::clone)
    }

    fn nested_from(
        &self,
        locator: &Locator,
        payload: Payload,
    ) -> Result<Arc<StructuredThemeStore>> {
        let slot = self.slot(locator)?;
        if let Some(store) = slot.get() {
            return Ok(Arc::clone(store));
        }
        info!("Opening nested theme store at entry {} ({} bytes)", locator.index, payload.len());
        let store = Arc::new(StructuredThemeStore::from_payload(payload, self.storage.encoding())?);
        // A concurrent opener may have won; everyone shares the first stored value.
        Ok(Arc::clone(slot.get_or_init(|| store)))
    }

    fn slot(&self, locator: &Locator) -> Result<&OnceLock<Arc<StructuredThemeStore>>> {
        self.nested.get(locator.index).ok_or_else(|| self.bad_locator(locator))
    }

    fn entry(&self, locator: &Locator) -> Result<&IndexEntry> {
        self.storage
            .index()
            .entries()
            .get(locator.index)
            .ok_or_else(|| self.bad_locator(locator))
    }

    fn bad_locator(&self, locator: &Locator) -> CarError {
        CarError::OutOfBounds {
            context: "rendition table",
            offset: locator.index as u64,
            needed: 1,
            available: self.storage.index().len() as u64,
        }
    }
}
