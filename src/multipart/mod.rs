// SPDX-License-Identifier: MIT

//! Single-payload extraction from `multipart/related` responses.
//!
//! DICOMweb retrieve endpoints wrap bulk data, pixel data and Part-10
//! instances in a multipart body even when only one part is returned. This
//! module locates that first part and hands back exactly its content bytes,
//! guided by the `Content-Type` boundary and, when present and verifiable,
//! the part's own `Content-Length`.
//!
//! The algorithm is written once against [`MultipartBody`]; the
//! [`binary`] adapter searches raw bytes through a [`BinaryStream`], the
//! [`text`] adapter searches a body that was already decoded to a string.
//!
//! # Example
//! ```rust
//! use dicomweb_multipart::multipart::extract_from_bytes;
//!
//! fn first_part() -> Result<(), dicomweb_multipart::error::WireError> {
//!     let headers = [("Content-Type", "multipart/related; boundary=B")];
//!     let body = b"--B\r\nContent-Length: 4\r\n\r\n\xDE\xAD\xBE\xEF\r\n--B--".to_vec();
//!
//!     let payload = extract_from_bytes(&headers, body)?;
//!     assert_eq!(payload.data, vec![0xDE, 0xAD, 0xBE, 0xEF]);
//!     assert!(payload.used_content_length);
//!     Ok(())
//! }
//! ```
//!
//! [`BinaryStream`]: crate::stream::BinaryStream

pub mod binary;
pub mod encode;
pub mod text;

use crate::error::WireError;
use crate::headers::HeaderLookup;
use log::{debug, warn};
use std::collections::HashMap;

pub use binary::BinaryBody;
pub use text::TextBody;

const DEFAULT_MAX_HEADER_BLOCK: usize = 8 * 1024;
const CRLF: &[u8] = b"\r\n";
const BLANK_LINE: &[u8] = b"\r\n\r\n";
// How far into a part the first header field name is looked for
const FIELD_NAME_WINDOW: usize = 1024;

/// Extraction settings
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Use a part's Content-Length when the closing delimiter confirms it
    pub trust_content_length: bool,
    /// Largest accepted part header block, terminator included
    pub max_header_block: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            trust_content_length: true,
            max_header_block: DEFAULT_MAX_HEADER_BLOCK,
        }
    }
}

/// A response body the extraction steps can search and slice.
///
/// Positions are in the body's own units: bytes for raw bodies, UTF-16 code
/// units for decoded text. Patterns are always ASCII.
pub trait MultipartBody {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First position at or after `from` where `pattern` begins.
    fn find(&self, pattern: &[u8], from: usize) -> Option<usize>;

    fn matches_at(&self, pattern: &[u8], at: usize) -> bool;

    /// Header block `[start, end)` rendered as text.
    fn header_text(&self, start: usize, end: usize) -> Result<String, WireError>;

    /// Payload `[start, end)` as an owned byte copy.
    fn payload(&self, start: usize, end: usize) -> Result<Vec<u8>, WireError>;
}

/// Parsed `multipart/<subtype>; key=value...` content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartContentType {
    pub subtype: String,
    /// Parameter names lower-cased, quotes stripped from values
    pub parameters: HashMap<String, String>,
}

impl MultipartContentType {
    pub fn parse(content_type: &str) -> Result<Self, WireError> {
        let rest = content_type
            .trim()
            .strip_prefix("multipart/")
            .ok_or_else(|| WireError::not_multipart(content_type))?;

        let mut segments = split_parameters(rest).into_iter();
        let subtype = segments.next().unwrap_or_default().trim().to_string();
        if subtype.is_empty() {
            return Err(WireError::not_multipart(content_type));
        }

        let parameters = segments
            .filter_map(|segment| {
                let (key, value) = segment.split_once('=')?;
                Some((key.trim().to_lowercase(), unquote(value.trim()).to_string()))
            })
            .collect();

        Ok(Self {
            subtype,
            parameters,
        })
    }

    pub fn boundary(&self) -> Result<Boundary, WireError> {
        match self.parameters.get("boundary") {
            Some(token) if !token.is_empty() => {
                let boundary = Boundary(token.clone());
                boundary.validate()?;
                Ok(boundary)
            }
            _ => Err(WireError::MissingBoundary),
        }
    }

    /// The `type` parameter, e.g. `application/dicom`
    pub fn root_type(&self) -> Option<&str> {
        self.parameters.get("type").map(String::as_str)
    }
}

/// Split on `;` outside double quotes.
fn split_parameters(input: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (index, ch) in input.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                segments.push(&input[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    segments.push(&input[start..]);
    segments
}

fn unquote(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Boundary token from the `Content-Type` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary(String);

impl Boundary {
    pub fn new<S: Into<String>>(token: S) -> Self {
        Boundary(token.into())
    }

    /// Read and parse the `content-type` response header.
    pub fn from_headers<H: HeaderLookup + ?Sized>(headers: &H) -> Result<Self, WireError> {
        let content_type = headers
            .header("content-type")
            .ok_or_else(|| WireError::not_multipart(""))?;
        MultipartContentType::parse(content_type)?.boundary()
    }

    pub fn token(&self) -> &str {
        &self.0
    }

    /// Tokens must be printable ASCII so that delimiters mean the same
    /// units in raw and decoded bodies.
    pub fn validate(&self) -> Result<(), WireError> {
        if self.0.is_empty() {
            return Err(WireError::MissingBoundary);
        }
        if !self.0.bytes().all(|b| b.is_ascii_graphic() || b == b' ') {
            return Err(WireError::InvalidBoundary(format!(
                "'{}' is not printable ASCII",
                self.0
            )));
        }
        Ok(())
    }

    /// `--token\r\n`
    pub fn opening_delimiter(&self) -> Vec<u8> {
        format!("--{}\r\n", self.0).into_bytes()
    }

    /// `\r\n--token--`
    pub fn closing_delimiter(&self) -> Vec<u8> {
        format!("\r\n--{}--", self.0).into_bytes()
    }
}

/// Header fields of one part, names lower-cased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartHeaders {
    pub fields: HashMap<String, String>,
    /// Offset of the first header byte within the body
    pub start: usize,
    /// Offset just past the terminating blank line
    pub end: usize,
}

impl PartHeaders {
    /// Parse `name: value` lines. Lines starting with a tab continue the
    /// previous field, joined with a single space.
    pub fn parse(block: &str, start: usize, end: usize) -> Self {
        let mut fields: HashMap<String, String> = HashMap::new();
        let mut current: Option<String> = None;

        for line in block.split("\r\n") {
            if let Some(continuation) = line.strip_prefix('\t') {
                match current.as_ref().and_then(|name| fields.get_mut(name)) {
                    Some(value) => {
                        value.push(' ');
                        value.push_str(continuation.trim_end());
                    }
                    None => debug!("Ignoring continuation line with no preceding field"),
                }
                continue;
            }

            if line.is_empty() {
                continue;
            }

            match line.split_once(':') {
                Some((name, value)) if !name.trim().is_empty() => {
                    let name = name.trim().to_lowercase();
                    fields.insert(name.clone(), value.trim().to_string());
                    current = Some(name);
                }
                _ => {
                    debug!("Ignoring malformed part header line: {line:?}");
                    current = None;
                }
            }
        }

        Self { fields, start, end }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.get("content-type")
    }

    /// Content-Length when it is a positive integer
    pub fn content_length(&self) -> Option<usize> {
        self.get("content-length")?
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|&length| length > 0)
    }
}

/// The first part's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPayload {
    /// Content start within the body
    pub start: usize,
    /// Content end (exclusive) within the body
    pub end: usize,
    pub data: Vec<u8>,
    /// `None` when the part had no header block
    pub headers: Option<PartHeaders>,
    /// True when the range came from a verified Content-Length
    pub used_content_length: bool,
}

impl ExtractedPayload {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.as_ref().and_then(PartHeaders::content_type)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MultipartExtractor {
    config: ExtractorConfig,
}

impl MultipartExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract from a raw byte body.
    pub fn extract_bytes<H: HeaderLookup + ?Sized>(
        &self,
        headers: &H,
        body: Vec<u8>,
    ) -> Result<ExtractedPayload, WireError> {
        self.extract(headers, &BinaryBody::new(body))
    }

    /// Extract from a body that was read as text.
    pub fn extract_text<H: HeaderLookup + ?Sized>(
        &self,
        headers: &H,
        body: &str,
    ) -> Result<ExtractedPayload, WireError> {
        self.extract(headers, &TextBody::new(body))
    }

    pub fn extract<H, B>(&self, headers: &H, body: &B) -> Result<ExtractedPayload, WireError>
    where
        H: HeaderLookup + ?Sized,
        B: MultipartBody + ?Sized,
    {
        let boundary = Boundary::from_headers(headers)?;
        debug!("Multipart boundary: {}", boundary.token());
        self.extract_with_boundary(&boundary, body)
    }

    /// Run the delimiter and header steps for an already known boundary.
    pub fn extract_with_boundary<B: MultipartBody + ?Sized>(
        &self,
        boundary: &Boundary,
        body: &B,
    ) -> Result<ExtractedPayload, WireError> {
        boundary.validate()?;
        let opening = boundary.opening_delimiter();
        let opening_at = body.find(&opening, 0).ok_or_else(|| {
            WireError::delimiter_not_found(String::from_utf8_lossy(&opening))
        })?;
        let mut cursor = opening_at + opening.len();

        if body.matches_at(CRLF, cursor) {
            return self.scan_to_closing(boundary, body, cursor + CRLF.len(), None);
        }

        // A part header block always opens with a `name: value` line
        if !self.first_line_is_header_field(body, cursor)? {
            debug!("No part header block at offset {cursor}, treating as content");
            return self.scan_to_closing(boundary, body, cursor, None);
        }

        let headers = match body.find(BLANK_LINE, cursor) {
            Some(blank_line) if blank_line > cursor => {
                self.parse_part_headers(body, cursor, blank_line)?
            }
            _ => {
                return Err(WireError::header_parse(format!(
                    "no blank line after part headers starting at offset {cursor}"
                )));
            }
        };
        cursor = headers.end;

        if self.config.trust_content_length {
            if let Some(length) = headers.content_length() {
                let closing = boundary.closing_delimiter();
                match cursor.checked_add(length) {
                    Some(candidate_end) if body.matches_at(&closing, candidate_end) => {
                        debug!("Content-Length {length} confirmed by closing delimiter");
                        return Ok(ExtractedPayload {
                            start: cursor,
                            end: candidate_end,
                            data: body.payload(cursor, candidate_end)?,
                            headers: Some(headers),
                            used_content_length: true,
                        });
                    }
                    _ => warn!(
                        "Content-Length {length} does not line up with the closing delimiter, scanning instead"
                    ),
                }
            }
        }

        self.scan_to_closing(boundary, body, cursor, Some(headers))
    }

    fn parse_part_headers<B: MultipartBody + ?Sized>(
        &self,
        body: &B,
        cursor: usize,
        blank_line: usize,
    ) -> Result<PartHeaders, WireError> {
        let end = blank_line + BLANK_LINE.len();
        if end - cursor > self.config.max_header_block {
            return Err(WireError::header_parse(format!(
                "part header block of {} bytes exceeds limit of {}",
                end - cursor,
                self.config.max_header_block
            )));
        }

        let block = body.header_text(cursor, blank_line)?;
        Ok(PartHeaders::parse(&block, cursor, end))
    }

    /// True when the part opens with a `name: value` line whose name ends
    /// within the first `FIELD_NAME_WINDOW` units.
    fn first_line_is_header_field<B: MultipartBody + ?Sized>(
        &self,
        body: &B,
        cursor: usize,
    ) -> Result<bool, WireError> {
        let limit = cursor.saturating_add(FIELD_NAME_WINDOW).min(body.len());
        let line_end = body
            .find(CRLF, cursor)
            .map_or(limit, |index| index.min(limit));
        let line = body.header_text(cursor, line_end)?;
        Ok(is_header_field_line(&line))
    }

    fn scan_to_closing<B: MultipartBody + ?Sized>(
        &self,
        boundary: &Boundary,
        body: &B,
        cursor: usize,
        headers: Option<PartHeaders>,
    ) -> Result<ExtractedPayload, WireError> {
        let closing = boundary.closing_delimiter();
        let closing_at = match body.find(&closing, cursor) {
            Some(index) if index >= cursor => index,
            _ => {
                return Err(WireError::delimiter_not_found(String::from_utf8_lossy(
                    &closing,
                )));
            }
        };

        debug!("Payload spans [{cursor}, {closing_at}) by delimiter scan");
        Ok(ExtractedPayload {
            start: cursor,
            end: closing_at,
            data: body.payload(cursor, closing_at)?,
            headers,
            used_content_length: false,
        })
    }
}

/// Extract the first part of a raw byte body with default settings.
pub fn extract_from_bytes<H: HeaderLookup + ?Sized>(
    headers: &H,
    body: Vec<u8>,
) -> Result<ExtractedPayload, WireError> {
    MultipartExtractor::default().extract_bytes(headers, body)
}

/// Extract the first part of a text body with default settings.
pub fn extract_from_text<H: HeaderLookup + ?Sized>(
    headers: &H,
    body: &str,
) -> Result<ExtractedPayload, WireError> {
    MultipartExtractor::default().extract_text(headers, body)
}

/// `token ":" ...` per RFC 7230 field-name rules
fn is_header_field_line(line: &str) -> bool {
    match line.split_once(':') {
        Some((name, _)) => {
            !name.is_empty()
                && name
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
        }
        None => false,
    }
}

/// ASCII `needle` search over a slice of byte or code-unit values.
pub(crate) fn find_ascii<T: Copy + Into<u32>>(
    haystack: &[T],
    needle: &[u8],
    from: usize,
) -> Option<usize> {
    if needle.is_empty() || from > haystack.len() || haystack.len() - from < needle.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| starts_with_ascii(window, needle))
        .map(|pos| from + pos)
}

pub(crate) fn starts_with_ascii<T: Copy + Into<u32>>(haystack: &[T], needle: &[u8]) -> bool {
    haystack.len() >= needle.len()
        && haystack
            .iter()
            .zip(needle)
            .all(|(&unit, &byte)| unit.into() == u32::from(byte))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_parsing() {
        let parsed = MultipartContentType::parse(
            r#"multipart/related; type="application/dicom"; boundary="abc;def""#,
        )
        .unwrap();
        assert_eq!(parsed.subtype, "related");
        assert_eq!(parsed.root_type(), Some("application/dicom"));
        assert_eq!(parsed.boundary().unwrap().token(), "abc;def");
    }

    #[test]
    fn test_multipart_prefix_is_case_sensitive() {
        assert!(matches!(
            MultipartContentType::parse("Multipart/related; boundary=x"),
            Err(WireError::NotMultipart(_))
        ));
        assert!(matches!(
            MultipartContentType::parse("application/dicom"),
            Err(WireError::NotMultipart(_))
        ));
        assert!(matches!(
            MultipartContentType::parse("multipart/; boundary=x"),
            Err(WireError::NotMultipart(_))
        ));
    }

    #[test]
    fn test_missing_or_empty_boundary() {
        let no_boundary = MultipartContentType::parse("multipart/related; type=application/dicom")
            .unwrap()
            .boundary();
        assert!(matches!(no_boundary, Err(WireError::MissingBoundary)));

        let empty = MultipartContentType::parse(r#"multipart/related; boundary="""#)
            .unwrap()
            .boundary();
        assert!(matches!(empty, Err(WireError::MissingBoundary)));
    }

    #[test]
    fn test_boundary_from_headers() {
        let headers = [("content-type", "multipart/mixed;boundary=XYZ")];
        let boundary = Boundary::from_headers(&headers).unwrap();
        assert_eq!(boundary.opening_delimiter(), b"--XYZ\r\n".to_vec());
        assert_eq!(boundary.closing_delimiter(), b"\r\n--XYZ--".to_vec());

        let none: [(&str, &str); 0] = [];
        assert!(matches!(
            Boundary::from_headers(&none),
            Err(WireError::NotMultipart(_))
        ));
    }

    #[test]
    fn test_part_header_folding() {
        let block = "Content-Type: application/dicom;\r\n\ttype=whatever\r\nContent-Length: 12";
        let headers = PartHeaders::parse(block, 0, block.len() + 4);
        assert_eq!(
            headers.content_type(),
            Some("application/dicom; type=whatever")
        );
        assert_eq!(headers.content_length(), Some(12));
    }

    #[test]
    fn test_content_length_must_be_positive_integer() {
        for value in ["0", "-4", "abc", "4.5", ""] {
            let block = format!("Content-Length: {value}");
            let headers = PartHeaders::parse(&block, 0, 0);
            assert_eq!(headers.content_length(), None, "value {value:?}");
        }
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let block = "garbage line\r\n\tcontinued garbage\r\nX-Ok: yes";
        let headers = PartHeaders::parse(block, 0, 0);
        assert_eq!(headers.fields.len(), 1);
        assert_eq!(headers.get("X-OK"), Some("yes"));
    }

    #[test]
    fn test_header_field_line_detection() {
        assert!(is_header_field_line("Content-Type: application/dicom"));
        assert!(is_header_field_line("X-Empty:"));
        assert!(!is_header_field_line("\u{00CA}\u{00FE}"));
        assert!(!is_header_field_line(": no name"));
        assert!(!is_header_field_line("two words: value"));
    }

    #[test]
    fn test_find_ascii_over_code_units() {
        let units: Vec<u16> = "ab\u{00E9}--B".encode_utf16().collect();
        assert_eq!(find_ascii(units.as_slice(), b"--B", 0), Some(3));
        assert_eq!(find_ascii(units.as_slice(), b"--B", 4), None);
        assert!(starts_with_ascii(&units[3..], b"--"));
    }

    #[test]
    fn test_header_block_size_limit() {
        let extractor = MultipartExtractor::new(ExtractorConfig {
            max_header_block: 8,
            ..Default::default()
        });
        assert_eq!(extractor.config().max_header_block, 8);
        assert!(extractor.config().trust_content_length);

        let body = BinaryBody::new(b"--B\r\nContent-Type: x\r\n\r\ndata\r\n--B--".to_vec());
        let result = extractor.extract_with_boundary(&Boundary::new("B"), &body);
        assert!(matches!(result, Err(WireError::HeaderParseError(_))));

        // Only a real header block counts against the limit
        let mut headerless = b"--B\r\n".to_vec();
        headerless.extend_from_slice(&[0xAA; 64]);
        headerless.extend_from_slice(b"\r\n\r\n\x01\r\n--B--");
        let payload = extractor
            .extract_with_boundary(&Boundary::new("B"), &BinaryBody::new(headerless))
            .unwrap();
        assert_eq!(payload.len(), 64 + 5);
        assert!(payload.headers.is_none());
    }

    #[test]
    fn test_boundary_must_be_printable_ascii() {
        let parsed = MultipartContentType::parse("multipart/related; boundary=\u{00E9}").unwrap();
        assert!(matches!(parsed.boundary(), Err(WireError::InvalidBoundary(_))));
        assert!(Boundary::new("a\tb").validate().is_err());
        assert!(Boundary::new("").validate().is_err());
        assert!(Boundary::new("1.2.3 x").validate().is_ok());

        let body = BinaryBody::new("--\u{00E9}\r\n\r\nab\r\n--\u{00E9}--".as_bytes().to_vec());
        let result =
            MultipartExtractor::default().extract_with_boundary(&Boundary::new("\u{00E9}"), &body);
        assert!(matches!(result, Err(WireError::InvalidBoundary(_))));
    }
}
