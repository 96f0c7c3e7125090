//! Configuration for the command line tool
//! Precedence: CLI > environment > INI file > defaults

pub mod ini_parser;

use crate::cli::{Cli, Command};
use crate::error::WireError;
use crate::multipart::ExtractorConfig;
use ini_parser::{IniConfig, parse_bool};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "DICOMWEB_MULTIPART_";
const CONFIG_FILE_NAME: &str = "dicomweb-multipart.ini";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    // Extraction settings
    pub trust_content_length: bool,
    pub max_header_block: usize,

    // Logging settings
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        let extractor = ExtractorConfig::default();
        Self {
            trust_content_length: extractor.trust_content_length,
            max_header_block: extractor.max_header_block,
            verbose: false,
        }
    }
}

impl Config {
    /// Load configuration from the process environment and the first
    /// configuration file found.
    pub fn load(cli: &Cli) -> Result<Self, WireError> {
        let ini = match Self::find_config_file(cli)? {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                IniConfig::load_file(&path)?
            }
            None => IniConfig::new(),
        };
        Self::resolve(cli, &ini, |name| std::env::var(name).ok())
    }

    /// Combine the layers. `env` looks up a full variable name.
    pub fn resolve<F>(cli: &Cli, ini: &IniConfig, env: F) -> Result<Self, WireError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let extract_args = match &cli.command {
            Command::Extract(args) => Some(args),
            Command::Encode(_) => None,
        };

        let trust_content_length = if extract_args.is_some_and(|args| args.no_content_length) {
            false
        } else if let Some(value) = env_bool(&env, "TRUST_CONTENT_LENGTH")? {
            value
        } else if let Some(value) = ini.get_bool("extract", "trust_content_length")? {
            value
        } else {
            defaults.trust_content_length
        };

        let max_header_block = if let Some(value) = extract_args.and_then(|a| a.max_header_block) {
            value
        } else if let Some(value) = env_usize(&env, "MAX_HEADER_BLOCK")? {
            value
        } else if let Some(value) = ini.get_usize("extract", "max_header_block")? {
            value
        } else {
            defaults.max_header_block
        };

        let verbose = if cli.verbose {
            true
        } else if let Some(value) = env_bool(&env, "VERBOSE")? {
            value
        } else if let Some(value) = ini.get_bool("logging", "verbose")? {
            value
        } else {
            defaults.verbose
        };

        let config = Self {
            trust_content_length,
            max_header_block,
            verbose,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), WireError> {
        if self.max_header_block < 4 {
            return Err(WireError::InvalidConfiguration(format!(
                "max_header_block must be at least 4 bytes, got {}",
                self.max_header_block
            )));
        }
        Ok(())
    }

    pub fn extractor_config(&self) -> ExtractorConfig {
        ExtractorConfig {
            trust_content_length: self.trust_content_length,
            max_header_block: self.max_header_block,
        }
    }

    /// Explicit `--config-file`, then the working directory, then the
    /// user config directory.
    fn find_config_file(cli: &Cli) -> Result<Option<PathBuf>, WireError> {
        if let Some(ref config_path) = cli.config_file {
            let path = PathBuf::from(config_path);
            if path.is_file() {
                return Ok(Some(path));
            }
            return Err(WireError::InvalidConfiguration(format!(
                "config file specified but not found: {config_path}"
            )));
        }

        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.is_file() {
            return Ok(Some(local));
        }

        if let Some(home_dir) = std::env::var_os("HOME") {
            let user_config = Path::new(&home_dir)
                .join(".config")
                .join("dicomweb-multipart")
                .join("config.ini");
            if user_config.is_file() {
                return Ok(Some(user_config));
            }
        }

        Ok(None)
    }
}

fn env_bool<F>(env: &F, key: &str) -> Result<Option<bool>, WireError>
where
    F: Fn(&str) -> Option<String>,
{
    let name = format!("{ENV_PREFIX}{key}");
    env(&name)
        .map(|value| {
            parse_bool(&value).ok_or_else(|| {
                WireError::InvalidConfiguration(format!(
                    "{name}: expected a boolean, got '{value}'"
                ))
            })
        })
        .transpose()
}

fn env_usize<F>(env: &F, key: &str) -> Result<Option<usize>, WireError>
where
    F: Fn(&str) -> Option<String>,
{
    let name = format!("{ENV_PREFIX}{key}");
    env(&name)
        .map(|value| {
            value.trim().parse::<usize>().map_err(|_| {
                WireError::InvalidConfiguration(format!(
                    "{name}: expected a non-negative integer, got '{value}'"
                ))
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::collections::HashMap;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(args)
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults() {
        let cli = cli(&["dicomweb-multipart", "extract", "--headers", "h", "--body", "b"]);
        let config = Config::resolve(&cli, &IniConfig::new(), no_env).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.extractor_config().trust_content_length);
    }

    #[test]
    fn test_precedence_cli_env_ini() {
        let ini = IniConfig::parse(
            "[extract]\ntrust_content_length = true\nmax_header_block = 100\n[logging]\nverbose = true",
        )
        .unwrap();
        let env: HashMap<&str, &str> = [("DICOMWEB_MULTIPART_MAX_HEADER_BLOCK", "200")].into();
        let lookup = |name: &str| env.get(name).map(|v| v.to_string());

        let plain = cli(&["dicomweb-multipart", "extract", "--headers", "h", "--body", "b"]);
        let config = Config::resolve(&plain, &ini, lookup).unwrap();
        assert!(config.trust_content_length);
        assert_eq!(config.max_header_block, 200);
        assert!(config.verbose);

        let overridden = cli(&[
            "dicomweb-multipart",
            "extract",
            "--headers",
            "h",
            "--body",
            "b",
            "--no-content-length",
            "--max-header-block",
            "300",
        ]);
        let config = Config::resolve(&overridden, &ini, lookup).unwrap();
        assert!(!config.trust_content_length);
        assert_eq!(config.max_header_block, 300);
    }

    #[test]
    fn test_invalid_env_value() {
        let cli = cli(&["dicomweb-multipart", "extract", "--headers", "h", "--body", "b"]);
        let result = Config::resolve(&cli, &IniConfig::new(), |name| {
            (name == "DICOMWEB_MULTIPART_VERBOSE").then(|| "sometimes".to_string())
        });
        assert!(matches!(result, Err(WireError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_header_block_lower_bound() {
        let ini = IniConfig::parse("[extract]\nmax_header_block = 2").unwrap();
        let cli = cli(&["dicomweb-multipart", "extract", "--headers", "h", "--body", "b"]);
        assert!(Config::resolve(&cli, &ini, no_env).is_err());
    }
}
