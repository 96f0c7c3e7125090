// SPDX-License-Identifier: MIT

use std::fmt;

#[derive(Debug)]
pub enum WireError {
    Io(std::io::Error),
    // Stream errors
    NotANumber(String), // Contains the rejected input
    InsufficientData { requested: usize, available: usize },
    // Multipart errors
    NotMultipart(String), // Contains the offending content type, empty when absent
    MissingBoundary,
    DelimiterNotFound(String), // Contains the delimiter that could not be located
    HeaderParseError(String),
    NotByteTransparent { offset: usize, code_unit: u16 },
    InvalidBoundary(String), // Contains the rejected token
    InvalidConfiguration(String),
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireError::Io(err) => write!(f, "IO error: {err}"),
            WireError::NotANumber(input) => write!(f, "Not a number: '{input}'"),
            WireError::InsufficientData {
                requested,
                available,
            } => write!(
                f,
                "Insufficient data: requested {requested} bytes, {available} available"
            ),
            WireError::NotMultipart(content_type) if content_type.is_empty() => {
                write!(f, "Response has no Content-Type header")
            }
            WireError::NotMultipart(content_type) => {
                write!(f, "Not a multipart content type: '{content_type}'")
            }
            WireError::MissingBoundary => {
                write!(f, "No boundary parameter in multipart Content-Type")
            }
            WireError::DelimiterNotFound(delimiter) => {
                write!(f, "Multipart delimiter not found: {delimiter:?}")
            }
            WireError::HeaderParseError(msg) => write!(f, "Part header parse error: {msg}"),
            WireError::NotByteTransparent { offset, code_unit } => write!(
                f,
                "Text body is not byte transparent: code unit {code_unit:#06x} at offset {offset}"
            ),
            WireError::InvalidBoundary(msg) => write!(f, "Invalid multipart boundary: {msg}"),
            WireError::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {msg}"),
        }
    }
}

impl From<std::io::Error> for WireError {
    fn from(err: std::io::Error) -> Self {
        WireError::Io(err)
    }
}

impl std::error::Error for WireError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WireError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl WireError {
    /// Creates a NotANumber error for the rejected input
    pub fn not_a_number<S: Into<String>>(input: S) -> Self {
        WireError::NotANumber(input.into())
    }

    pub fn insufficient_data(requested: usize, available: usize) -> Self {
        WireError::InsufficientData {
            requested,
            available,
        }
    }

    pub fn not_multipart<S: Into<String>>(content_type: S) -> Self {
        WireError::NotMultipart(content_type.into())
    }

    pub fn delimiter_not_found<S: Into<String>>(delimiter: S) -> Self {
        WireError::DelimiterNotFound(delimiter.into())
    }

    pub fn header_parse<S: Into<String>>(msg: S) -> Self {
        WireError::HeaderParseError(msg.into())
    }

    /// Checks if the error was raised by the binary stream layer
    pub fn is_stream_error(&self) -> bool {
        matches!(
            self,
            WireError::NotANumber(_) | WireError::InsufficientData { .. }
        )
    }

    /// Checks if the error was raised while extracting a multipart payload
    pub fn is_multipart_error(&self) -> bool {
        matches!(
            self,
            WireError::NotMultipart(_)
                | WireError::MissingBoundary
                | WireError::DelimiterNotFound(_)
                | WireError::HeaderParseError(_)
                | WireError::NotByteTransparent { .. }
                | WireError::InvalidBoundary(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let errors = [
            WireError::not_a_number("abc"),
            WireError::insufficient_data(16, 4),
            WireError::not_multipart("application/json"),
            WireError::not_multipart(""),
            WireError::MissingBoundary,
            WireError::delimiter_not_found("--B\r\n"),
            WireError::header_parse("no blank line"),
        ];

        let expected = [
            "Not a number: 'abc'",
            "Insufficient data: requested 16 bytes, 4 available",
            "Not a multipart content type: 'application/json'",
            "Response has no Content-Type header",
            "No boundary parameter in multipart Content-Type",
            "Multipart delimiter not found: \"--B\\r\\n\"",
            "Part header parse error: no blank line",
        ];

        for (error, expected_msg) in errors.iter().zip(expected.iter()) {
            assert_eq!(error.to_string(), *expected_msg);
        }
    }

    #[test]
    fn test_error_classification() {
        assert!(WireError::not_a_number("x").is_stream_error());
        assert!(WireError::insufficient_data(1, 0).is_stream_error());
        assert!(!WireError::MissingBoundary.is_stream_error());

        let multipart_errors = vec![
            WireError::not_multipart("text/plain"),
            WireError::MissingBoundary,
            WireError::delimiter_not_found("x"),
            WireError::header_parse("x"),
            WireError::NotByteTransparent {
                offset: 0,
                code_unit: 0x100,
            },
        ];
        for error in multipart_errors {
            assert!(
                error.is_multipart_error(),
                "Expected {error} to be a multipart error"
            );
        }
        assert!(!WireError::InvalidConfiguration("x".into()).is_multipart_error());
    }

    #[test]
    fn test_io_error_source() {
        let error: WireError = std::io::Error::other("disk gone").into();
        assert!(std::error::Error::source(&error).is_some());
        assert_eq!(error.to_string(), "IO error: disk gone");
    }
}
