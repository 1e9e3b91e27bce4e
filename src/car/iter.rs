//! Iterators for sequential access to catalog contents.
//!
//! Enumeration is layered the same way as lookups:
//!
//! 1. [`Names`] - asset names from the facet table
//! 2. [`Entries`] - `(key, locator)` pairs straight from the rendition table
//! 3. [`Renditions`] - every entry decoded into a [`NamedRendition`]
//!
//! # Example
//! ```no_run
//! # use car_reader::Catalog;
//! # let catalog = Catalog::open("Assets.car").unwrap();
//! for result in catalog.iter_entries().with_renditions() {
//!     let rendition = result.unwrap();
//!     println!("{} ({})", rendition.rendition_name, rendition.kind);
//! }
//! ```

use std::slice;

use super::storage::StructuredThemeStore;
use super::types::error::Result;
use super::types::key::RenditionKey;
use super::types::models::{Facet, IndexEntry, Locator, Resolution};
use super::types::rendition::NamedRendition;

/// Asset names in facet table order.
///
/// A clone continues from the same position. Call
/// [`Catalog::names`](crate::Catalog::names) again to start over.
#[derive(Debug, Clone)]
pub struct Names<'a> {
    facets: slice::Iter<'a, Facet>,
}

impl<'a> Names<'a> {
    pub(super) fn new(facets: &'a [Facet]) -> Self {
        Self {
            facets: facets.iter(),
        }
    }
}

impl<'a> Iterator for Names<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        self.facets.next().map(|facet| facet.name.as_str())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.facets.size_hint()
    }
}

impl ExactSizeIterator for Names<'_> {}

/// `(key, locator)` pairs for every stored rendition, without decoding.
///
/// Created by [`Catalog::iter_entries()`](crate::Catalog::iter_entries).
#[derive(Debug, Clone)]
pub struct Entries<'a> {
    store: &'a StructuredThemeStore,
    entries: std::iter::Enumerate<slice::Iter<'a, IndexEntry>>,
}

impl<'a> Entries<'a> {
    pub(super) fn new(store: &'a StructuredThemeStore) -> Self {
        Self {
            store,
            entries: store.theme_store().index().entries().iter().enumerate(),
        }
    }

    /// Transforms this iterator to decode each entry.
    ///
    /// A record that fails to decode yields an `Err` for that entry only;
    /// iteration continues with the next one.
    pub fn with_renditions(self) -> Renditions<'a> {
        Renditions {
            store: self.store,
            entries: self,
        }
    }
}

impl<'a> Iterator for Entries<'a> {
    type Item = (&'a RenditionKey, Locator);

    fn next(&mut self) -> Option<Self::Item> {
        let (index, entry) = self.entries.next()?;
        let locator = self.store.theme_store().index().locator(index)?;
        Some((&entry.key, locator))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

/// Every stored rendition, decoded.
///
/// Created by [`Entries::with_renditions()`].
pub struct Renditions<'a> {
    entries: Entries<'a>,
    store: &'a StructuredThemeStore,
}

impl Iterator for Renditions<'_> {
    type Item = Result<NamedRendition>;

    fn next(&mut self) -> Option<Self::Item> {
        let (_, locator) = self.entries.next()?;
        Some(self.store.rendition(&Resolution { locator, exact: true }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}
