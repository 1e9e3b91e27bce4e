//! Payload codecs: decompression, bitmap decoding, vector rasterization and PDF handling.

pub mod compression;
pub mod pdf;
pub mod raster;
pub mod vector;
