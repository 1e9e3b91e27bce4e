//! Foundational data structures and error types.

pub mod attributes;
pub mod error;
pub mod key;
pub mod models;
pub mod rendition;
