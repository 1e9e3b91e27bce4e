//! File format parsing layer for asset catalogs.
//!
//! This module sits between the raw byte source and the high-level
//! [`Catalog`](crate::car::reader::Catalog).
//!
//! # Module Organization
//!
//! - [`header`]: Parses the fixed container header
//! - [`key`]: Decodes rendition key token runs
//! - [`index`]: Parses the facet and rendition tables into an [`AssetIndex`](index::AssetIndex)
//! - [`resolve`]: Exact and scored fallback resolution over the index
//! - [`content`]: Decodes individual rendition records
//!
//! # Architecture
//!
//! ```text
//! Container Structure:
//! ┌──────────────────┐
//! │  Header (436 B)  │ ← header::parse()
//! ├──────────────────┤
//! │  Facet table     │ ← index::parse()
//! │  Rendition table │
//! ├──────────────────┤ ← data_offset
//! │  Records         │ ← content::decode()
//! │  (zlib payloads, │
//! │   nested stores) │
//! └──────────────────┘
//! ```

pub mod content;
pub mod header;
pub mod index;
pub mod key;
pub mod resolve;
