//! Error types for prowgen-generator.

use std::path::PathBuf;

use thiserror::Error;

use prowgen_core::{ConfigError, DocumentError};
use prowgen_renderer::RenderError;

/// All errors that can arise from a generation run.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// A defect in the job configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The configuration document could not be loaded.
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// An error from the rendering engine.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// Serializing the dashboard configuration failed.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`GenerateError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> GenerateError {
    GenerateError::Io {
        path: path.into(),
        source,
    }
}
