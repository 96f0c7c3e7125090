use crate::config::Config;
use crate::error::WireError;
use crate::headers::ResponseHeaders;
use crate::multipart::encode::{
    APPLICATION_DICOM, encode_part, encode_single_part, related_content_type,
};
use crate::multipart::{Boundary, ExtractedPayload, MultipartExtractor, TextBody};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Command line for pulling the payload out of a saved DICOMweb multipart
/// response, or wrapping a payload for a STOW request.
#[derive(Parser, Clone, Debug)]
#[command(
    version,
    about = "Extract or build single-part multipart/related DICOMweb bodies",
    long_about = "Reads a saved DICOMweb response (header block and raw body) and writes out the exact bytes of the first multipart part: bulk data, pixel data or a DICOM Part-10 instance.\n The part's Content-Length is used when the closing delimiter confirms it, otherwise the body is scanned for the closing delimiter.\n The encode subcommand wraps a payload as a single-part multipart/related body for STOW-RS."
)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (INI). Defaults to ./dicomweb-multipart.ini or ~/.config/dicomweb-multipart/config.ini
    #[arg(long, global = true, value_parser = validate_config_file)]
    pub config_file: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Extract the first part's payload from a saved response
    Extract(ExtractArgs),
    /// Wrap a payload as a single-part multipart/related body
    Encode(EncodeArgs),
}

#[derive(Args, Clone, Debug)]
pub struct ExtractArgs {
    /// File holding the response headers, one `Name: value` per line
    #[arg(long)]
    pub headers: PathBuf,

    /// File holding the raw response body
    #[arg(long)]
    pub body: PathBuf,

    /// Where to write the payload (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Decode the body as Latin-1 text and use the text-backed extractor
    #[arg(long)]
    pub text: bool,

    /// Ignore part Content-Length headers and always scan for the closing delimiter
    #[arg(long)]
    pub no_content_length: bool,

    /// Largest accepted part header block in bytes
    #[arg(long, value_parser = validate_header_block)]
    pub max_header_block: Option<usize>,
}

#[derive(Args, Clone, Debug)]
pub struct EncodeArgs {
    /// File holding the payload to wrap
    #[arg(long)]
    pub payload: PathBuf,

    /// Boundary token
    #[arg(long)]
    pub boundary: String,

    /// Content-Type of the part
    #[arg(long, default_value = APPLICATION_DICOM)]
    pub content_type: String,

    /// Emit `--B` framing with a Content-Length part header
    #[arg(long)]
    pub with_length: bool,

    /// Where to write the body (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Validate config file path exists and is a file
fn validate_config_file(s: &str) -> Result<String, String> {
    if s.is_empty() {
        return Err("Config file path cannot be empty".to_string());
    }

    let path = PathBuf::from(s);
    if !path.exists() {
        return Err(format!("Config file does not exist: {s}"));
    }
    if !path.is_file() {
        return Err(format!("Config path is not a file: {s}"));
    }
    Ok(s.to_string())
}

fn validate_header_block(s: &str) -> Result<usize, String> {
    let size: usize = s
        .parse()
        .map_err(|_| "Header block size must be a positive number".to_string())?;
    if size < 4 {
        return Err("Header block size must be at least 4 bytes".to_string());
    }
    Ok(size)
}

/// Run the selected subcommand.
pub fn execute(cli: &Cli, config: &Config) -> Result<(), WireError> {
    match &cli.command {
        Command::Extract(args) => {
            let payload = run_extract(args, config)?;
            write_output(args.output.as_ref(), &payload.data)
        }
        Command::Encode(args) => {
            let (content_type, body) = run_encode(args)?;
            write_output(args.output.as_ref(), &body)?;
            eprintln!("Content-Type: {content_type}");
            Ok(())
        }
    }
}

pub fn run_extract(args: &ExtractArgs, config: &Config) -> Result<ExtractedPayload, WireError> {
    let raw_headers = fs::read_to_string(&args.headers)?;
    let headers = ResponseHeaders::parse(&raw_headers);
    let body = fs::read(&args.body)?;
    let extractor = MultipartExtractor::new(config.extractor_config());

    let payload = if args.text {
        extractor.extract(&headers, &TextBody::from_latin1(&body))?
    } else {
        extractor.extract_bytes(&headers, body)?
    };

    info!(
        "Extracted {} bytes [{}, {}) via {} (part content type: {})",
        payload.len(),
        payload.start,
        payload.end,
        if payload.used_content_length {
            "Content-Length"
        } else {
            "delimiter scan"
        },
        payload.content_type().unwrap_or("none")
    );
    Ok(payload)
}

/// Returns the request Content-Type and the encoded body.
pub fn run_encode(args: &EncodeArgs) -> Result<(String, Vec<u8>), WireError> {
    let payload = fs::read(&args.payload)?;
    let boundary = Boundary::new(args.boundary.as_str());

    let body = if args.with_length {
        encode_part(&payload, boundary.token(), &args.content_type)?
    } else {
        encode_single_part(&payload, boundary.token(), &args.content_type)?
    };

    Ok((related_content_type(boundary.token(), &args.content_type), body))
}

fn write_output(path: Option<&PathBuf>, bytes: &[u8]) -> Result<(), WireError> {
    match path {
        Some(path) => fs::write(path, bytes)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_header_block() {
        assert_eq!(validate_header_block("4").unwrap(), 4);
        assert_eq!(validate_header_block("8192").unwrap(), 8192);
        assert!(validate_header_block("3").is_err());
        assert!(validate_header_block("-1").is_err());
        assert!(validate_header_block("big").is_err());
    }

    #[test]
    fn test_validate_config_file() {
        assert!(validate_config_file("").is_err());
        assert!(validate_config_file("/nonexistent/dicomweb-multipart.ini").is_err());
        assert!(validate_config_file(env!("CARGO_MANIFEST_DIR")).is_err());
    }

    #[test]
    fn test_subcommand_parsing() {
        let cli = Cli::parse_from([
            "dicomweb-multipart",
            "--verbose",
            "encode",
            "--payload",
            "in.dcm",
            "--boundary",
            "abc",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Command::Encode(args) => {
                assert_eq!(args.content_type, APPLICATION_DICOM);
                assert!(!args.with_length);
            }
            Command::Extract(_) => panic!("expected encode"),
        }
    }
}
