use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Catalogue error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Catalogue '{path}' is corrupt or has an unsupported layout: {detail}")]
    Corrupt { path: String, detail: String },

    #[error(
        "Catalogue '{path}' has {missing} file record(s) without a fingerprint; \
         run an index update before comparing"
    )]
    Incomplete { path: String, missing: usize },
}

impl Error {
    pub fn corrupt(path: &Path, detail: impl Into<String>) -> Self {
        Error::Corrupt {
            path: path.display().to_string(),
            detail: detail.into(),
        }
    }
}
