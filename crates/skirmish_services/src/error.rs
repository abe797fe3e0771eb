use skirmish_battle::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed settings in {path}: {source}")]
    Settings {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed catalog in {path}: {source}")]
    Catalog {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },
}
