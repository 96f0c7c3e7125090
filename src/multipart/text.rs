// SPDX-License-Identifier: MIT

//! Adapter for bodies that were read as text.
//!
//! Each UTF-16 code unit of the decoded body stands for one byte of the
//! original response. That only holds when the body was decoded without
//! re-encoding (Latin-1 or byte-transparent); a code unit above 0xFF inside
//! the payload means the bytes are already lost, and extraction fails with
//! [`WireError::NotByteTransparent`] rather than returning altered bytes.
//! Prefer [`BinaryBody`](super::BinaryBody) whenever raw bytes are available.

use super::{MultipartBody, find_ascii, starts_with_ascii};
use crate::error::WireError;

#[derive(Debug, Clone)]
pub struct TextBody {
    units: Vec<u16>,
}

impl TextBody {
    pub fn new(body: &str) -> Self {
        Self {
            units: body.encode_utf16().collect(),
        }
    }

    pub fn from_units(units: Vec<u16>) -> Self {
        Self { units }
    }

    /// Decode raw bytes one byte per code unit, as a Latin-1 reader would.
    pub fn from_latin1(bytes: &[u8]) -> Self {
        Self {
            units: bytes.iter().map(|&b| u16::from(b)).collect(),
        }
    }

    fn range(&self, start: usize, end: usize) -> Result<&[u16], WireError> {
        if start > end || end > self.units.len() {
            return Err(WireError::insufficient_data(end, self.units.len()));
        }
        Ok(&self.units[start..end])
    }
}

impl MultipartBody for TextBody {
    fn len(&self) -> usize {
        self.units.len()
    }

    fn find(&self, pattern: &[u8], from: usize) -> Option<usize> {
        find_ascii(self.units.as_slice(), pattern, from)
    }

    fn matches_at(&self, pattern: &[u8], at: usize) -> bool {
        self.units
            .get(at..)
            .is_some_and(|rest| starts_with_ascii(rest, pattern))
    }

    fn header_text(&self, start: usize, end: usize) -> Result<String, WireError> {
        Ok(String::from_utf16_lossy(self.range(start, end)?))
    }

    fn payload(&self, start: usize, end: usize) -> Result<Vec<u8>, WireError> {
        self.range(start, end)?
            .iter()
            .enumerate()
            .map(|(index, &unit)| {
                u8::try_from(unit).map_err(|_| WireError::NotByteTransparent {
                    offset: start + index,
                    code_unit: unit,
                })
            })
            .collect()
    }
}
