// SPDX-License-Identifier: MIT

//! Adapter for raw byte bodies, searched through a read-oriented stream.

use super::MultipartBody;
use crate::error::WireError;
use crate::stream::{BinaryStream, ByteOrder};

#[derive(Debug, Clone)]
pub struct BinaryBody {
    stream: BinaryStream,
}

impl BinaryBody {
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            stream: BinaryStream::reader(body, ByteOrder::LittleEndian),
        }
    }

    pub fn from_stream(stream: BinaryStream) -> Self {
        Self { stream }
    }

    pub fn into_stream(self) -> BinaryStream {
        self.stream
    }
}

impl MultipartBody for BinaryBody {
    fn len(&self) -> usize {
        self.stream.written_extent()
    }

    fn find(&self, pattern: &[u8], from: usize) -> Option<usize> {
        self.stream.find(pattern, from)
    }

    fn matches_at(&self, pattern: &[u8], at: usize) -> bool {
        self.stream.matches_at(pattern, at)
    }

    fn header_text(&self, start: usize, end: usize) -> Result<String, WireError> {
        // Header bytes outside ASCII are kept one char per byte
        let bytes = self.stream.byte_range(start, end)?;
        Ok(bytes.into_iter().map(char::from).collect())
    }

    fn payload(&self, start: usize, end: usize) -> Result<Vec<u8>, WireError> {
        self.stream.byte_range(start, end)
    }
}
