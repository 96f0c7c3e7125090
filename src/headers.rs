// SPDX-License-Identifier: MIT

//! Case-insensitive access to HTTP response headers.
//!
//! The extractor only ever reads `content-type`, but callers hand it headers
//! in whatever shape their HTTP client produced, so lookup is a trait.

use std::collections::HashMap;

pub trait HeaderLookup {
    /// Value of the header called `name`, compared ASCII case-insensitively.
    fn header(&self, name: &str) -> Option<&str>;
}

impl HeaderLookup for HashMap<String, String> {
    fn header(&self, name: &str) -> Option<&str> {
        self.get(name)
            .or_else(|| {
                self.iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(name))
                    .map(|(_, value)| value)
            })
            .map(String::as_str)
    }
}

impl HeaderLookup for [(&str, &str)] {
    fn header(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| *value)
    }
}

impl<const N: usize> HeaderLookup for [(&str, &str); N] {
    fn header(&self, name: &str) -> Option<&str> {
        self.as_slice().header(name)
    }
}

impl HeaderLookup for Vec<(String, String)> {
    fn header(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Response headers keyed by lower-cased name.
#[derive(Debug, Clone, Default)]
pub struct ResponseHeaders {
    fields: HashMap<String, String>,
}

impl ResponseHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header; repeated names are joined with ", ".
    pub fn insert(&mut self, name: &str, value: &str) {
        let key = name.trim().to_lowercase();
        let value = value.trim();
        if let Some(existing) = self.fields.get(&key) {
            let joined = format!("{existing}, {value}");
            self.fields.insert(key, joined);
        } else {
            self.fields.insert(key, value.to_string());
        }
    }

    /// Parse a saved response header block.
    ///
    /// Accepts CRLF or LF line endings, skips an `HTTP/...` status line and
    /// stops at the first blank line. Lines without a colon are ignored.
    pub fn parse(raw: &str) -> Self {
        let mut headers = Self::new();
        for line in raw.lines() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                break;
            }
            if line.starts_with("HTTP/") {
                continue;
            }
            if let Some((name, value)) = line.split_once(':') {
                headers.insert(name, value);
            }
        }
        headers
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl HeaderLookup for ResponseHeaders {
    fn header(&self, name: &str) -> Option<&str> {
        self.fields.get(&name.to_lowercase()).map(String::as_str)
    }
}

impl<H: HeaderLookup + ?Sized> HeaderLookup for &H {
    fn header(&self, name: &str) -> Option<&str> {
        (**self).header(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashmap_lookup_is_case_insensitive() {
        let mut map = HashMap::new();
        map.insert("Content-Type".to_string(), "multipart/related".to_string());
        assert_eq!(map.header("content-type"), Some("multipart/related"));
        assert_eq!(map.header("CONTENT-TYPE"), Some("multipart/related"));
        assert_eq!(map.header("content-length"), None);
    }

    #[test]
    fn test_pair_slice_lookup() {
        let headers = [("CONTENT-TYPE", "text/plain")];
        assert_eq!(headers.header("Content-Type"), Some("text/plain"));
    }

    #[test]
    fn test_parse_raw_block() {
        let raw = "HTTP/1.1 200 OK\r\nContent-Type: multipart/related; boundary=abc\r\nX-Dup: a\r\nx-dup: b\r\n\r\nbody";
        let headers = ResponseHeaders::parse(raw);
        assert_eq!(headers.len(), 2);
        assert_eq!(
            headers.header("content-type"),
            Some("multipart/related; boundary=abc")
        );
        assert_eq!(headers.header("X-Dup"), Some("a, b"));
    }
}
