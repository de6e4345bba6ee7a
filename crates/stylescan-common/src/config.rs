use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::Severity;

/// File name searched for when no explicit configuration path is given.
pub const CONFIG_FILE_NAME: &str = "Stylescan.toml";

/// Default capacity of the buffer placed in front of streaming input.
pub const DEFAULT_READER_BUFFER_SIZE: usize = 8192;

/// The parsed Stylescan.toml configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StylescanConfig {
    pub tokenizer: TokenizerSection,
    pub diagnostics: DiagnosticsSection,
    pub output: OutputSection,
    /// The file this configuration was loaded from, if any.
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenizerSection {
    /// Drop whitespace, comments, CDO and CDC from the token stream.
    #[serde(default = "default_skip_insignificant")]
    pub skip_insignificant: bool,
    #[serde(default = "default_reader_buffer_size")]
    pub reader_buffer_size: usize,
}

impl Default for TokenizerSection {
    fn default() -> Self {
        Self {
            skip_insignificant: default_skip_insignificant(),
            reader_buffer_size: default_reader_buffer_size(),
        }
    }
}

fn default_skip_insignificant() -> bool {
    true
}
fn default_reader_buffer_size() -> usize {
    DEFAULT_READER_BUFFER_SIZE
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiagnosticsSection {
    #[serde(default)]
    pub malformed: MalformedPolicy,
}

/// How malformed tokens (bad strings, urls and comments) are reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    #[default]
    Error,
    Warning,
    Ignore,
}

impl MalformedPolicy {
    /// Severity to report malformed tokens with, or `None` to stay silent.
    pub fn severity(self) -> Option<Severity> {
        match self {
            MalformedPolicy::Error => Some(Severity::Error),
            MalformedPolicy::Warning => Some(Severity::Warning),
            MalformedPolicy::Ignore => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSection {
    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One human-readable line per token.
    #[default]
    Text,
    /// One JSON object per token.
    Json,
    /// Tokens serialized back to CSS source.
    Css,
}

/// Raw TOML structure for deserialization.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    tokenizer: TokenizerSection,
    #[serde(default)]
    diagnostics: DiagnosticsSection,
    #[serde(default)]
    output: OutputSection,
}

/// Errors that can occur when loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no Stylescan.toml found (searched from {0})")]
    NotFound(String),
    #[error("failed to read Stylescan.toml: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("invalid Stylescan.toml: {0}")]
    ParseError(String),
    #[error("invalid Stylescan.toml: [tokenizer] reader_buffer_size must be greater than zero")]
    InvalidBufferSize,
}

/// Walk up from `start_dir` looking for `Stylescan.toml`.
/// Returns the path to the configuration file if found.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Load and validate a configuration file.
pub fn load_config(path: &Path) -> Result<StylescanConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config = parse_config(&content)?;
    config.source = Some(path.to_path_buf());
    Ok(config)
}

/// Parse and validate configuration from a TOML string.
pub fn parse_config(content: &str) -> Result<StylescanConfig, ConfigError> {
    let raw: RawConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    if raw.tokenizer.reader_buffer_size == 0 {
        return Err(ConfigError::InvalidBufferSize);
    }

    Ok(StylescanConfig {
        tokenizer: raw.tokenizer,
        diagnostics: raw.diagnostics,
        output: raw.output,
        source: None,
    })
}

/// Find and load the configuration governing `input`, searching from its directory.
pub fn find_and_load_config(input: &Path) -> Result<StylescanConfig, ConfigError> {
    let start_dir = if input.is_dir() {
        input
    } else {
        input.parent().unwrap_or_else(|| Path::new("."))
    };
    let config_path = find_config(start_dir)
        .ok_or_else(|| ConfigError::NotFound(start_dir.display().to_string()))?;
    load_config(&config_path)
}
