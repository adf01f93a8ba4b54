use std::path::Path;
use std::path::PathBuf;

use attrguard_validate::ConfigTree;
use attrguard_validate::DecodeError;
use attrguard_validate::Schema;
use thiserror::Error;
use tracing::debug;

/// Error type for instance loading failures
#[derive(Debug, Error)]
pub enum InstanceError {
    #[error("failed to read instance {}: {error}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
    #[error("instance {} is not valid JSON: {error}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        error: serde_json::Error,
    },
    #[error("instance {} does not match the schema: {error}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        error: DecodeError,
    },
}

/// Read a JSON configuration instance and decode it against `schema`.
pub fn load_instance(schema: &Schema, path: impl AsRef<Path>) -> Result<ConfigTree, InstanceError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|error| InstanceError::Io {
        path: path.to_path_buf(),
        error,
    })?;
    let json: serde_json::Value =
        serde_json::from_str(&content).map_err(|error| InstanceError::Json {
            path: path.to_path_buf(),
            error,
        })?;
    debug!(path = %path.display(), "decoding instance");
    ConfigTree::from_json(schema, &json).map_err(|error| InstanceError::Decode {
        path: path.to_path_buf(),
        error,
    })
}
