// SPDX-License-Identifier: MIT

//! Growable, cursor-based byte stream with selectable byte order.
//!
//! A [`BinaryStream`] owns one contiguous buffer and tracks three positions:
//! the cursor (`offset`), the high-water mark of valid data
//! (`written_extent`), and the allocated size (`capacity`). The invariant
//! `offset <= written_extent <= capacity` holds after every operation.
//!
//! Streams come in two flavours that differ only in their initial
//! high-water mark:
//! - [`BinaryStream::reader`] wraps existing bytes, all of which count as data.
//! - [`BinaryStream::writer`] allocates a zeroed buffer with no data yet.
//!
//! # Example
//! ```rust
//! use dicomweb_multipart::stream::{BinaryStream, ByteOrder};
//!
//! fn round_trip() -> Result<(), dicomweb_multipart::error::WireError> {
//!     let mut stream = BinaryStream::writer(4, ByteOrder::BigEndian);
//!     stream.write_u16(0x0102)?;
//!     stream.write_u32("0xCAFEBABE")?;
//!     assert_eq!(stream.written_bytes(), &[0x01, 0x02, 0xCA, 0xFE, 0xBA, 0xBE]);
//!
//!     stream.reset();
//!     assert_eq!(stream.read_u16()?, 0x0102);
//!     Ok(())
//! }
//! ```

use crate::error::WireError;
use crate::numeric::Numeric;
use log::trace;

/// Byte order applied to every multi-byte read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    #[default]
    LittleEndian,
    BigEndian,
}

#[derive(Debug, Clone)]
pub struct BinaryStream {
    // buffer.len() is the capacity; bytes past written_extent are zero or stale
    buffer: Vec<u8>,
    offset: usize,
    written_extent: usize,
    order: ByteOrder,
}

impl BinaryStream {
    /// Wrap existing bytes as a read-oriented stream.
    pub fn reader(bytes: Vec<u8>, order: ByteOrder) -> Self {
        let written_extent = bytes.len();
        Self {
            buffer: bytes,
            offset: 0,
            written_extent,
            order,
        }
    }

    /// Allocate a zeroed, write-oriented stream.
    pub fn writer(capacity: usize, order: ByteOrder) -> Self {
        Self {
            buffer: vec![0; capacity],
            offset: 0,
            written_extent: 0,
            order,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn written_extent(&self) -> usize {
        self.written_extent
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    /// Change the byte order for all subsequent operations.
    pub fn set_byte_order(&mut self, order: ByteOrder) {
        self.order = order;
    }

    pub fn is_little_endian(&self) -> bool {
        self.order == ByteOrder::LittleEndian
    }

    // Navigation

    pub fn reset(&mut self) {
        self.offset = 0;
    }

    pub fn at_end(&self) -> bool {
        self.offset >= self.buffer.len()
    }

    pub fn seek_to_end(&mut self) {
        self.offset = self.buffer.len();
        self.mark_extent();
    }

    /// Copy `length` bytes from the cursor into a new read-oriented stream
    /// and advance past them.
    pub fn slice(&mut self, length: usize) -> Result<BinaryStream, WireError> {
        let bytes = self.take(length)?.to_vec();
        Ok(BinaryStream::reader(bytes, self.order))
    }

    /// Replace the backing buffer with `self[0..offset] ++ other[0..written_extent]`
    /// and move the cursor to its end. Returns the new capacity.
    pub fn concat(&mut self, other: &BinaryStream) -> usize {
        let appended = other.written_bytes();
        let mut combined = Vec::with_capacity(self.offset + appended.len());
        combined.extend_from_slice(&self.buffer[..self.offset]);
        combined.extend_from_slice(appended);

        self.buffer = combined;
        self.offset += appended.len();
        self.written_extent = self.offset;
        self.buffer.len()
    }

    /// Copy of `[start, end)`.
    pub fn byte_range(&self, start: usize, end: usize) -> Result<Vec<u8>, WireError> {
        if end > self.buffer.len() {
            return Err(WireError::insufficient_data(end, self.buffer.len()));
        }
        if start > end {
            return Err(WireError::insufficient_data(start, end));
        }
        Ok(self.buffer[start..end].to_vec())
    }

    /// The data region `[0, written_extent)`.
    pub fn written_bytes(&self) -> &[u8] {
        &self.buffer[..self.written_extent]
    }

    pub fn into_bytes(mut self) -> Vec<u8> {
        self.buffer.truncate(self.written_extent);
        self.buffer
    }

    /// First index at or after `from` where `pattern` starts within the data region.
    pub fn find(&self, pattern: &[u8], from: usize) -> Option<usize> {
        let data = self.written_bytes();
        if pattern.is_empty() || from > data.len() || data.len() - from < pattern.len() {
            return None;
        }
        data[from..]
            .windows(pattern.len())
            .position(|window| window == pattern)
            .map(|pos| from + pos)
    }

    pub fn matches_at(&self, pattern: &[u8], at: usize) -> bool {
        self.written_bytes()
            .get(at..)
            .is_some_and(|rest| rest.starts_with(pattern))
    }

    // Writes

    pub fn write_u8<'a, N: Into<Numeric<'a>>>(&mut self, value: N) -> Result<(), WireError> {
        self.write_integer(value.into(), 1)
    }

    pub fn write_i8<'a, N: Into<Numeric<'a>>>(&mut self, value: N) -> Result<(), WireError> {
        self.write_integer(value.into(), 1)
    }

    pub fn write_u16<'a, N: Into<Numeric<'a>>>(&mut self, value: N) -> Result<(), WireError> {
        self.write_integer(value.into(), 2)
    }

    pub fn write_i16<'a, N: Into<Numeric<'a>>>(&mut self, value: N) -> Result<(), WireError> {
        self.write_integer(value.into(), 2)
    }

    pub fn write_u32<'a, N: Into<Numeric<'a>>>(&mut self, value: N) -> Result<(), WireError> {
        self.write_integer(value.into(), 4)
    }

    pub fn write_i32<'a, N: Into<Numeric<'a>>>(&mut self, value: N) -> Result<(), WireError> {
        self.write_integer(value.into(), 4)
    }

    pub fn write_f32<'a, N: Into<Numeric<'a>>>(&mut self, value: N) -> Result<(), WireError> {
        let value = value.into().to_float()? as f32;
        let bytes = match self.order {
            ByteOrder::LittleEndian => value.to_le_bytes(),
            ByteOrder::BigEndian => value.to_be_bytes(),
        };
        self.put_bytes(&bytes);
        Ok(())
    }

    pub fn write_f64<'a, N: Into<Numeric<'a>>>(&mut self, value: N) -> Result<(), WireError> {
        let value = value.into().to_float()?;
        let bytes = match self.order {
            ByteOrder::LittleEndian => value.to_le_bytes(),
            ByteOrder::BigEndian => value.to_be_bytes(),
        };
        self.put_bytes(&bytes);
        Ok(())
    }

    /// Write `text` as UTF-8. Returns the number of bytes written.
    pub fn write_utf8(&mut self, text: &str) -> usize {
        self.put_bytes(text.as_bytes());
        text.len()
    }

    /// Write UTF-16 code units as UTF-8, joining surrogate pairs.
    /// Unpaired surrogates are written as U+FFFD.
    pub fn write_utf16(&mut self, units: &[u16]) -> usize {
        let text: String = char::decode_utf16(units.iter().copied())
            .map(|unit| unit.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect();
        self.write_utf8(&text)
    }

    /// Decode hex digit pairs and write the bytes. A trailing lone digit
    /// is written as its own byte. Returns the number of bytes written.
    pub fn write_hex(&mut self, hex_digits: &str) -> Result<usize, WireError> {
        let digits = hex_digits.as_bytes();
        let paired = digits.len() & !1;

        let mut bytes =
            hex::decode(&digits[..paired]).map_err(|_| WireError::not_a_number(hex_digits))?;
        if let Some(&lone) = digits.get(paired) {
            let value = char::from(lone)
                .to_digit(16)
                .ok_or_else(|| WireError::not_a_number(hex_digits))?;
            bytes.push(value as u8);
        }

        self.put_bytes(&bytes);
        Ok(bytes.len())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.put_bytes(bytes);
    }

    // Reads

    pub fn read_u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take_array::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, WireError> {
        Ok(self.take_array::<1>()?[0] as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16, WireError> {
        let bytes = self.take_array::<2>()?;
        Ok(match self.order {
            ByteOrder::LittleEndian => u16::from_le_bytes(bytes),
            ByteOrder::BigEndian => u16::from_be_bytes(bytes),
        })
    }

    pub fn read_i16(&mut self) -> Result<i16, WireError> {
        let bytes = self.take_array::<2>()?;
        Ok(match self.order {
            ByteOrder::LittleEndian => i16::from_le_bytes(bytes),
            ByteOrder::BigEndian => i16::from_be_bytes(bytes),
        })
    }

    pub fn read_u32(&mut self) -> Result<u32, WireError> {
        let bytes = self.take_array::<4>()?;
        Ok(match self.order {
            ByteOrder::LittleEndian => u32::from_le_bytes(bytes),
            ByteOrder::BigEndian => u32::from_be_bytes(bytes),
        })
    }

    pub fn read_i32(&mut self) -> Result<i32, WireError> {
        let bytes = self.take_array::<4>()?;
        Ok(match self.order {
            ByteOrder::LittleEndian => i32::from_le_bytes(bytes),
            ByteOrder::BigEndian => i32::from_be_bytes(bytes),
        })
    }

    pub fn read_f32(&mut self) -> Result<f32, WireError> {
        let bytes = self.take_array::<4>()?;
        Ok(match self.order {
            ByteOrder::LittleEndian => f32::from_le_bytes(bytes),
            ByteOrder::BigEndian => f32::from_be_bytes(bytes),
        })
    }

    pub fn read_f64(&mut self) -> Result<f64, WireError> {
        let bytes = self.take_array::<8>()?;
        Ok(match self.order {
            ByteOrder::LittleEndian => f64::from_le_bytes(bytes),
            ByteOrder::BigEndian => f64::from_be_bytes(bytes),
        })
    }

    /// Read `length` bytes as a one-byte-per-character string.
    pub fn read_string(&mut self, length: usize) -> Result<String, WireError> {
        Ok(self.take(length)?.iter().map(|&b| char::from(b)).collect())
    }

    /// Read `length` bytes as lowercase hex digit pairs.
    pub fn read_hex(&mut self, length: usize) -> Result<String, WireError> {
        Ok(hex::encode(self.take(length)?))
    }

    pub fn read_bytes(&mut self, length: usize) -> Result<Vec<u8>, WireError> {
        Ok(self.take(length)?.to_vec())
    }

    pub fn read_u8_array(&mut self, count: usize) -> Result<Vec<u8>, WireError> {
        self.read_bytes(count)
    }

    pub fn read_u16_array(&mut self, count: usize) -> Result<Vec<u16>, WireError> {
        self.ensure_readable(count.saturating_mul(2))?;
        (0..count).map(|_| self.read_u16()).collect()
    }

    pub fn read_u32_array(&mut self, count: usize) -> Result<Vec<u32>, WireError> {
        self.ensure_readable(count.saturating_mul(4))?;
        (0..count).map(|_| self.read_u32()).collect()
    }

    // Internals

    fn write_integer(&mut self, value: Numeric<'_>, width: usize) -> Result<(), WireError> {
        // Keeping the low `width` bytes wraps out-of-range values
        let bits = value.to_integer()? as u64;
        match self.order {
            ByteOrder::LittleEndian => self.put_bytes(&bits.to_le_bytes()[..width]),
            ByteOrder::BigEndian => self.put_bytes(&bits.to_be_bytes()[8 - width..]),
        }
        Ok(())
    }

    fn put_bytes(&mut self, bytes: &[u8]) {
        self.grow_to_fit(bytes.len());
        let end = self.offset + bytes.len();
        self.buffer[self.offset..end].copy_from_slice(bytes);
        self.offset = end;
        self.mark_extent();
    }

    fn grow_to_fit(&mut self, additional: usize) {
        let required = self.offset + additional;
        if required <= self.buffer.len() {
            return;
        }

        let mut capacity = self.buffer.len().max(1);
        while capacity < required {
            capacity *= 2;
        }
        trace!(
            "Growing stream buffer from {} to {capacity} bytes",
            self.buffer.len()
        );
        self.buffer.resize(capacity, 0);
    }

    fn ensure_readable(&self, length: usize) -> Result<(), WireError> {
        let available = self.buffer.len() - self.offset;
        if length > available {
            return Err(WireError::insufficient_data(length, available));
        }
        Ok(())
    }

    fn take(&mut self, length: usize) -> Result<&[u8], WireError> {
        self.ensure_readable(length)?;
        let start = self.offset;
        self.offset += length;
        self.mark_extent();
        Ok(&self.buffer[start..self.offset])
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn mark_extent(&mut self) {
        if self.offset > self.written_extent {
            self.written_extent = self.offset;
        }
    }
}

impl From<Vec<u8>> for BinaryStream {
    fn from(bytes: Vec<u8>) -> Self {
        BinaryStream::reader(bytes, ByteOrder::default())
    }
}
