//! Bounds-checked little-endian reading over a byte slice.
//!
//! Every structure in a catalog is read through a [`ByteCursor`]. A cursor
//! carries a context label that ends up in [`CarError::OutOfBounds`], so a
//! failure names the table or record it happened in.

use byteorder::{ByteOrder, LittleEndian};

use super::types::error::{CarError, Result};

/// Alignment of records and the data region.
pub const RECORD_ALIGNMENT: usize = 4;

/// Fails with [`CarError::Misaligned`] unless `offset` is a multiple of `alignment`.
pub fn check_alignment(offset: u64, alignment: u64, context: &'static str) -> Result<()> {
    if alignment > 1 && offset % alignment != 0 {
        return Err(CarError::Misaligned {
            context,
            offset,
            alignment,
        });
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    context: &'static str,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8], context: &'static str) -> Self {
        Self {
            data,
            pos: 0,
            context,
        }
    }

    /// A cursor positioned at `offset`, which may equal the length but not exceed it.
    pub fn at(data: &'a [u8], offset: usize, context: &'static str) -> Result<Self> {
        let mut cursor = Self::new(data, context);
        cursor.seek(offset)?;
        Ok(cursor)
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn context(&self) -> &'static str {
        self.context
    }

    fn out_of_bounds(&self, offset: usize, needed: usize) -> CarError {
        CarError::OutOfBounds {
            context: self.context,
            offset: offset as u64,
            needed: needed as u64,
            available: self.data.len().saturating_sub(offset) as u64,
        }
    }

    pub fn seek(&mut self, offset: usize) -> Result<()> {
        if offset > self.data.len() {
            return Err(self.out_of_bounds(offset, 0));
        }
        self.pos = offset;
        Ok(())
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.take(len).map(|_| ())
    }

    /// Advances to the next multiple of `alignment`.
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        let rem = self.pos % alignment;
        if rem != 0 {
            self.skip(alignment - rem)?;
        }
        Ok(())
    }

    /// Borrows the next `len` bytes and advances past them.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(self.out_of_bounds(self.pos, len));
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Borrows a trailing array of `count` elements of `element_size` bytes.
    pub fn read_trailing(&mut self, count: usize, element_size: usize) -> Result<&'a [u8]> {
        let len = count
            .checked_mul(element_size)
            .ok_or_else(|| self.out_of_bounds(self.pos, usize::MAX))?;
        self.take(len)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.take(4)?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.take(4)?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(LittleEndian::read_f64(self.take(8)?))
    }
}
