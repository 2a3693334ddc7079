//! Loading the job configuration document.
//!
//! The document is YAML whose top level is a map; it is converted into a
//! [`ConfigMap`] with document order intact.

use std::path::Path;

use crate::error::{DocumentError, Location};
use crate::node::{ConfigMap, ConfigNode};

/// Parse `contents` as a configuration document. `path` is used for errors only.
pub fn parse_document(path: &Path, contents: &str) -> Result<ConfigMap, DocumentError> {
    let value: serde_yaml::Value = serde_yaml::from_str(contents).map_err(|e| DocumentError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    let invalid = |source| DocumentError::Invalid { path: path.to_path_buf(), source };
    match ConfigNode::from_yaml(value, &Location::default()).map_err(invalid)? {
        ConfigNode::Map(map) => Ok(map),
        ConfigNode::Absent => Ok(ConfigMap::new()),
        other => Err(invalid(crate::error::ConfigError::UnexpectedType {
            location: Location::default(),
            expected: "a map",
            found: other.shape(),
        })),
    }
}

/// Load the document at `path`.
///
/// Returns `DocumentError::NotFound` if absent,
/// `DocumentError::Parse` (with line context) if malformed YAML.
pub fn load_document(path: &Path) -> Result<ConfigMap, DocumentError> {
    if !path.exists() {
        return Err(DocumentError::NotFound { path: path.to_path_buf() });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| DocumentError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let document = parse_document(path, &contents)?;
    tracing::debug!(path = %path.display(), sections = document.len(), "loaded configuration");
    Ok(document)
}
