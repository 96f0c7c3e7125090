// SPDX-License-Identifier: MIT

//! Single-part `multipart/related` encoding for STOW uploads.
//!
//! [`encode_single_part`] produces the framing STOW-RS servers have
//! historically accepted from viewers: a leading CRLF before the opening
//! delimiter and a `Content-Type` part header. [`encode_part`] produces the
//! canonical framing with a `Content-Length` header, which the extractor
//! resolves without scanning.

use crate::error::WireError;
use crate::stream::{BinaryStream, ByteOrder};
use log::debug;

const MAX_BOUNDARY_LENGTH: usize = 70; // RFC 2046 limit
const HEADER_ALLOWANCE: usize = 128;

/// Content type of a DICOM Part-10 part
pub const APPLICATION_DICOM: &str = "application/dicom";

/// Check `boundary` against the RFC 2046 `bchars` grammar.
pub fn validate_boundary(boundary: &str) -> Result<(), WireError> {
    if boundary.is_empty() {
        return Err(WireError::InvalidBoundary("empty boundary".to_string()));
    }

    if boundary.len() > MAX_BOUNDARY_LENGTH {
        return Err(WireError::InvalidBoundary(format!(
            "boundary is {} characters, limit is {MAX_BOUNDARY_LENGTH}",
            boundary.len()
        )));
    }

    if !boundary
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "'()+_,-./:=? ".contains(c))
    {
        return Err(WireError::InvalidBoundary(format!(
            "'{boundary}' contains characters outside RFC 2046 bchars"
        )));
    }

    if boundary.ends_with(' ') {
        return Err(WireError::InvalidBoundary(format!(
            "'{boundary}' ends with a space"
        )));
    }

    Ok(())
}

/// `multipart/related; type=<part_type>; boundary=<boundary>`
pub fn related_content_type(boundary: &str, part_type: &str) -> String {
    if boundary.contains(' ') {
        format!("multipart/related; type=\"{part_type}\"; boundary=\"{boundary}\"")
    } else {
        format!("multipart/related; type=\"{part_type}\"; boundary={boundary}")
    }
}

/// `\r\n--B\r\nContent-Type: T\r\n\r\n` + payload + `\r\n--B--`
pub fn encode_single_part(
    payload: &[u8],
    boundary: &str,
    content_type: &str,
) -> Result<Vec<u8>, WireError> {
    validate_boundary(boundary)?;
    let header = format!("\r\n--{boundary}\r\nContent-Type: {content_type}\r\n\r\n");
    Ok(frame(&header, payload, boundary))
}

/// `--B\r\nContent-Type: T\r\nContent-Length: N\r\n\r\n` + payload + `\r\n--B--`
pub fn encode_part(
    payload: &[u8],
    boundary: &str,
    content_type: &str,
) -> Result<Vec<u8>, WireError> {
    validate_boundary(boundary)?;
    let header = format!(
        "--{boundary}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\n\r\n",
        payload.len()
    );
    Ok(frame(&header, payload, boundary))
}

fn frame(header: &str, payload: &[u8], boundary: &str) -> Vec<u8> {
    let mut stream = BinaryStream::writer(HEADER_ALLOWANCE, ByteOrder::LittleEndian);
    stream.write_utf8(header);

    let content = BinaryStream::reader(payload.to_vec(), ByteOrder::LittleEndian);
    stream.concat(&content);

    stream.write_utf8(&format!("\r\n--{boundary}--"));
    debug!(
        "Encoded {} payload bytes into a {} byte multipart body",
        payload.len(),
        stream.written_extent()
    );
    stream.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_validation() {
        assert!(validate_boundary("simple").is_ok());
        assert!(validate_boundary("1.2.826.0.1.3680043.8.498.1").is_ok());
        assert!(validate_boundary("with space").is_ok());

        assert!(validate_boundary("").is_err());
        assert!(validate_boundary("bound\rary").is_err());
        assert!(validate_boundary("bound\nary").is_err());
        assert!(validate_boundary("trailing ").is_err());
        assert!(validate_boundary(&"a".repeat(71)).is_err());
    }

    #[test]
    fn test_single_part_layout() {
        let body = encode_single_part(b"DATA", "B", APPLICATION_DICOM).unwrap();
        assert_eq!(
            body,
            b"\r\n--B\r\nContent-Type: application/dicom\r\n\r\nDATA\r\n--B--".to_vec()
        );
    }

    #[test]
    fn test_part_with_length_layout() {
        let body = encode_part(&[0xCA, 0xFE], "xyz", "application/octet-stream").unwrap();
        let mut expected =
            b"--xyz\r\nContent-Type: application/octet-stream\r\nContent-Length: 2\r\n\r\n".to_vec();
        expected.extend_from_slice(&[0xCA, 0xFE]);
        expected.extend_from_slice(b"\r\n--xyz--");
        assert_eq!(body, expected);
    }

    #[test]
    fn test_related_content_type() {
        assert_eq!(
            related_content_type("abc", APPLICATION_DICOM),
            "multipart/related; type=\"application/dicom\"; boundary=abc"
        );
        assert_eq!(
            related_content_type("a b", APPLICATION_DICOM),
            "multipart/related; type=\"application/dicom\"; boundary=\"a b\""
        );
    }
}
