//! Error types for the notices pipeline

use thiserror::Error;

/// Result type alias for notices operations
pub type Result<T> = std::result::Result<T, NoticeError>;

/// Main error type for notices operations
#[derive(Error, Debug)]
pub enum NoticeError {
    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("XML parsing error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("Archive error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("No direct package references found in {0}")]
    NoDirectPackages(String),

    #[error("Could not resolve a version for: {}", .0.join(", "))]
    UnresolvedPackages(Vec<String>),

    #[error("Missing licenses for: {}", .0.join(", "))]
    MissingLicenses(Vec<String>),
}

impl NoticeError {
    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
