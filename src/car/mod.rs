//! Core asset catalog reader module.

pub mod codec;
pub mod cursor;
pub mod format;
pub mod iter;
pub mod reader;
pub mod source;
pub mod storage;
pub mod types;
pub mod utils;
