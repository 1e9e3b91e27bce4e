//! Byte sources and shared payload handles.
//!
//! A container is read once at open time, either memory-mapped or read into
//! a buffer. Everything decoded afterwards refers back into that buffer
//! through a reference-counted [`Payload`], so the container bytes live as
//! long as the longest-lived rendition derived from them.

use std::fmt;
use std::fs::File;
use std::ops::{Deref, Range};
use std::path::Path;
use std::sync::Arc;

use log::debug;
use memmap2::Mmap;

use super::types::error::{CarError, Result};

/// The immutable bytes of an opened container.
pub enum ByteSource {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl ByteSource {
    /// Memory-maps `path`. Empty files are read instead, since they cannot be mapped.
    pub fn map(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        if file.metadata()?.len() == 0 {
            return Ok(Self::Owned(Vec::new()));
        }
        // SAFETY: the map is only ever read. Truncating the file while it is
        // mapped is outside this crate's contract, as with any mapped reader.
        let map = unsafe { Mmap::map(&file)? };
        debug!("Mapped {} bytes from {}", map.len(), path.as_ref().display());
        Ok(Self::Mapped(map))
    }

    /// Reads `path` into memory in one bounded read.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        debug!("Read {} bytes from {}", bytes.len(), path.as_ref().display());
        Ok(Self::Owned(bytes))
    }
}

impl Deref for ByteSource {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Self::Mapped(map) => map,
            Self::Owned(bytes) => bytes,
        }
    }
}

impl From<Vec<u8>> for ByteSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Owned(bytes)
    }
}

#[derive(Clone)]
enum Backing {
    Source(Arc<ByteSource>),
    Owned(Arc<[u8]>),
}

impl Backing {
    fn bytes(&self) -> &[u8] {
        match self {
            Backing::Source(source) => source,
            Backing::Owned(bytes) => bytes,
        }
    }
}

/// A cheaply clonable view of bytes inside a container (or of bytes
/// inflated from it).
#[derive(Clone)]
pub struct Payload {
    backing: Backing,
    start: usize,
    end: usize,
}

impl Payload {
    /// The whole of `source`.
    pub fn whole(source: Arc<ByteSource>) -> Self {
        let end = source.len();
        Self {
            backing: Backing::Source(source),
            start: 0,
            end,
        }
    }

    /// Wraps bytes produced during decoding (e.g. decompressed data).
    pub fn owned(bytes: Vec<u8>) -> Self {
        let end = bytes.len();
        Self {
            backing: Backing::Owned(bytes.into()),
            start: 0,
            end,
        }
    }

    /// A sub-range of this payload, relative to its start.
    pub fn slice(&self, range: Range<usize>, context: &'static str) -> Result<Payload> {
        if range.start > range.end || range.end > self.len() {
            return Err(CarError::OutOfBounds {
                context,
                offset: range.start as u64,
                needed: range.end.saturating_sub(range.start) as u64,
                available: self.len().saturating_sub(range.start) as u64,
            });
        }
        Ok(Payload {
            backing: self.backing.clone(),
            start: self.start + range.start,
            end: self.start + range.end,
        })
    }

    /// `true` when the bytes still point into the container rather than a copy.
    pub fn is_borrowed(&self) -> bool {
        matches!(self.backing, Backing::Source(_))
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.deref().to_vec()
    }
}

impl Deref for Payload {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.backing.bytes()[self.start..self.end]
    }
}

impl AsRef<[u8]> for Payload {
    fn as_ref(&self) -> &[u8] {
        self
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Payload")
            .field("len", &self.len())
            .field("borrowed", &self.is_borrowed())
            .finish()
    }
}
