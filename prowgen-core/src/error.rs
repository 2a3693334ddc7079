//! Error types for prowgen-core.
//!
//! Every [`ConfigError`] is a configuration-authoring defect. None of them are
//! retried or skipped: the run that hits one fails as a whole.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// Position of a node inside the configuration document.
///
/// Rendered as `presubmits > knative/serving > [1] > env-vars`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Location {
    segments: Vec<String>,
}

impl Location {
    /// Location of a top-level key.
    pub fn root(key: impl Into<String>) -> Self {
        Self { segments: vec![key.into()] }
    }

    /// Location of a child key below `self`.
    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(key.into());
        Self { segments }
    }

    /// Location of a sequence element below `self`.
    pub fn index(&self, index: usize) -> Self {
        self.child(format!("[{index}]"))
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("<document>");
        }
        f.write_str(&self.segments.join(" > "))
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Category of a configuration defect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefectKind {
    MalformedEnvVar,
    ServiceAccountPath,
    MissingKey,
    UnexpectedType,
    UnknownKey,
    InvalidRepoKey,
}

/// A malformed value in the configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An `env-vars` entry without a `=` separator.
    #[error("{location}: env var {entry:?} is not in KEY=VALUE form")]
    MalformedEnvVar { location: Location, entry: String },

    /// A service-account path that is not `/etc/<name>/service-account.json`.
    #[error("{location}: service account {path:?} does not match /etc/<name>/service-account.json")]
    ServiceAccountPath { location: Location, path: String },

    /// A key that must be present was not found.
    #[error("{location}: missing required key {key:?}")]
    MissingKey { location: Location, key: String },

    /// A value of the wrong shape (e.g. a scalar where a map is required).
    #[error("{location}: expected {expected}, found {found}")]
    UnexpectedType {
        location: Location,
        expected: &'static str,
        found: &'static str,
    },

    /// A key that no override rule recognises.
    #[error("{location}: unrecognized key {key:?}")]
    UnknownKey { location: Location, key: String },

    /// A repository key that is not `<org>/<repo>`.
    #[error("{location}: repository key {key:?} is not of the form <org>/<repo>")]
    InvalidRepoKey { location: Location, key: String },
}

impl ConfigError {
    pub fn kind(&self) -> DefectKind {
        match self {
            ConfigError::MalformedEnvVar { .. } => DefectKind::MalformedEnvVar,
            ConfigError::ServiceAccountPath { .. } => DefectKind::ServiceAccountPath,
            ConfigError::MissingKey { .. } => DefectKind::MissingKey,
            ConfigError::UnexpectedType { .. } => DefectKind::UnexpectedType,
            ConfigError::UnknownKey { .. } => DefectKind::UnknownKey,
            ConfigError::InvalidRepoKey { .. } => DefectKind::InvalidRepoKey,
        }
    }

    pub fn location(&self) -> &Location {
        match self {
            ConfigError::MalformedEnvVar { location, .. }
            | ConfigError::ServiceAccountPath { location, .. }
            | ConfigError::MissingKey { location, .. }
            | ConfigError::UnexpectedType { location, .. }
            | ConfigError::UnknownKey { location, .. }
            | ConfigError::InvalidRepoKey { location, .. } => location,
        }
    }
}

// ---------------------------------------------------------------------------
// DocumentError
// ---------------------------------------------------------------------------

/// Errors from loading a configuration document off disk.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Underlying I/O failure.
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document file does not exist.
    #[error("configuration document not found at {path}")]
    NotFound { path: PathBuf },

    /// YAML parse error, with line context from serde_yaml.
    #[error("failed to parse configuration at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Parsed YAML that does not fit the configuration tree.
    #[error("invalid configuration at {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },
}
