//! Application error types using thiserror
//!
//! Error hierarchy:
//! - NonSemverError: a specifier was asked for semver text it does not carry
//! - ConfigError: invalid rcfile or CLI configuration (fatal, raised before any write)
//! - ManifestError: Issues with package.json reading, parsing and writing
//! - RegistryError: Issues with npm registry communication

use std::path::PathBuf;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Manifest file related errors
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Package registry related errors
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Configuration related errors
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Raised when semver text is requested from a specifier which has none
/// (git urls, tags, file paths, ...)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("'{raw}' is a {kind} specifier and has no semver version")]
pub struct NonSemverError {
    /// The raw specifier text
    pub raw: String,
    /// The specifier kind name (e.g. `hosted-git`)
    pub kind: &'static str,
}

impl NonSemverError {
    /// Creates a new NonSemverError
    pub fn new(raw: impl Into<String>, kind: &'static str) -> Self {
        Self {
            raw: raw.into(),
            kind,
        }
    }
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file could not be parsed
    #[error("failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    /// A semver group entry is invalid
    #[error("invalid semver group at index {index}: {message}")]
    InvalidSemverGroup { index: usize, message: String },

    /// A version group entry is invalid
    #[error("invalid version group at index {index}: {message}")]
    InvalidVersionGroup { index: usize, message: String },

    /// The --filter regex is invalid
    #[error("invalid filter '{value}': {message}")]
    InvalidFilter { value: String, message: String },

    /// A glob pattern is invalid
    #[error("invalid pattern '{value}': {message}")]
    InvalidPattern { value: String, message: String },

    /// A semver range token is not supported
    #[error("unsupported semver range '{value}': expected one of '', '*', '>', '>=', '.x', '<', '<=', '^', '~'")]
    InvalidSemverRange { value: String },

    /// A custom dependency type is invalid
    #[error("invalid custom type '{name}': {message}")]
    InvalidCustomType { name: String, message: String },
}

/// Errors related to manifest file operations
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest file not found
    #[error("manifest file not found: {path}")]
    NotFound { path: PathBuf },

    /// Failed to read manifest file
    #[error("failed to read manifest file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write manifest file
    #[error("failed to write manifest file {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON parsing error
    #[error("failed to parse JSON in {path}: {message}")]
    JsonParseError { path: PathBuf, message: String },

    /// The manifest root is not a JSON object
    #[error("manifest {path} is not a JSON object")]
    NotAnObject { path: PathBuf },

    /// Failed to render the modified manifest
    #[error("failed to serialize {path}: {message}")]
    SerializeError { path: PathBuf, message: String },
}

/// Errors related to package registry communication
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Package not found in registry
    #[error("package '{package}' not found in {registry} registry")]
    PackageNotFound { package: String, registry: String },

    /// Network request failed
    #[error("failed to fetch package '{package}' from {registry}: {message}")]
    NetworkError {
        package: String,
        registry: String,
        message: String,
    },

    /// Rate limit exceeded
    #[error("rate limit exceeded for {registry} registry")]
    RateLimitExceeded { registry: String },

    /// Invalid response from registry
    #[error("invalid response from {registry} for '{package}': {message}")]
    InvalidResponse {
        package: String,
        registry: String,
        message: String,
    },

    /// Timeout
    #[error("timeout while fetching '{package}' from {registry}")]
    Timeout { package: String, registry: String },
}

impl ConfigError {
    /// Creates a new ParseError
    pub fn parse_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ConfigError::ParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new InvalidSemverGroup error
    pub fn semver_group(index: usize, message: impl Into<String>) -> Self {
        ConfigError::InvalidSemverGroup {
            index,
            message: message.into(),
        }
    }

    /// Creates a new InvalidVersionGroup error
    pub fn version_group(index: usize, message: impl Into<String>) -> Self {
        ConfigError::InvalidVersionGroup {
            index,
            message: message.into(),
        }
    }
}

impl ManifestError {
    /// Creates a new NotFound error
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        ManifestError::NotFound { path: path.into() }
    }

    /// Creates a new ReadError
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ManifestError::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Creates a new WriteError
    pub fn write_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ManifestError::WriteError {
            path: path.into(),
            source,
        }
    }

    /// Creates a new JsonParseError
    pub fn json_parse_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ManifestError::JsonParseError {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl RegistryError {
    /// Creates a new PackageNotFound error
    pub fn package_not_found(package: impl Into<String>, registry: impl Into<String>) -> Self {
        RegistryError::PackageNotFound {
            package: package.into(),
            registry: registry.into(),
        }
    }

    /// Creates a new NetworkError
    pub fn network_error(
        package: impl Into<String>,
        registry: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        RegistryError::NetworkError {
            package: package.into(),
            registry: registry.into(),
            message: message.into(),
        }
    }

    /// Creates a new RateLimitExceeded error
    pub fn rate_limit_exceeded(registry: impl Into<String>) -> Self {
        RegistryError::RateLimitExceeded {
            registry: registry.into(),
        }
    }

    /// Creates a new Timeout error
    pub fn timeout(package: impl Into<String>, registry: impl Into<String>) -> Self {
        RegistryError::Timeout {
            package: package.into(),
            registry: registry.into(),
        }
    }
}
