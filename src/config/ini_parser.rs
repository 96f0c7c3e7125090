//! Minimal INI reader for the extractor's settings file
//! Supports sections, key=value pairs, `#`/`;` comments and typed getters

use crate::error::WireError;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct IniConfig {
    // "" holds keys that appear before any section header
    sections: HashMap<String, HashMap<String, String>>,
}

impl IniConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self, WireError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            WireError::InvalidConfiguration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, WireError> {
        let mut config = Self::new();
        let mut section = String::new();

        for (index, raw_line) in content.lines().enumerate() {
            let line = raw_line.trim();
            let line_number = index + 1;

            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(name) = line.strip_prefix('[') {
                let name = name.strip_suffix(']').ok_or_else(|| {
                    WireError::InvalidConfiguration(format!(
                        "unterminated section header at line {line_number}: {line}"
                    ))
                })?;
                section = name.trim().to_lowercase();
                if section.is_empty() {
                    return Err(WireError::InvalidConfiguration(format!(
                        "empty section name at line {line_number}"
                    )));
                }
                config.sections.entry(section.clone()).or_default();
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(WireError::InvalidConfiguration(format!(
                    "expected key=value at line {line_number}: {line}"
                )));
            };

            let key = key.trim();
            if key.is_empty() {
                return Err(WireError::InvalidConfiguration(format!(
                    "empty key at line {line_number}"
                )));
            }

            // Inline comments
            let value = value
                .split(['#', ';'])
                .next()
                .unwrap_or_default()
                .trim();

            config
                .sections
                .entry(section.clone())
                .or_default()
                .insert(key.to_lowercase(), value.to_string());
        }

        Ok(config)
    }

    pub fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.sections
            .get(&section.to_lowercase())?
            .get(&key.to_lowercase())
            .cloned()
    }

    pub fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>, WireError> {
        self.get_string(section, key)
            .map(|value| {
                parse_bool(&value).ok_or_else(|| {
                    WireError::InvalidConfiguration(format!(
                        "[{section}] {key}: expected a boolean, got '{value}'"
                    ))
                })
            })
            .transpose()
    }

    pub fn get_usize(&self, section: &str, key: &str) -> Result<Option<usize>, WireError> {
        self.get_string(section, key)
            .map(|value| {
                value.parse::<usize>().map_err(|_| {
                    WireError::InvalidConfiguration(format!(
                        "[{section}] {key}: expected a non-negative integer, got '{value}'"
                    ))
                })
            })
            .transpose()
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(&section.to_lowercase())
    }
}

/// true/false, yes/no, on/off, 1/0
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}
