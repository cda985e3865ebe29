//! Error types for the harvesting pipeline.
//!
//! Only conditions that stop a stage (or the whole run) are errors. A document
//! pair that fails extraction or alignment is not an error: it is described by
//! a [`crate::validate::Rejection`] and skipped.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TSV error: {0}")]
    Tsv(#[from] csv::Error),

    #[error("invalid URL \"{url}\": {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Two accepted records hashed to the same identifier.
    #[error("duplicate document id: {0}")]
    DuplicateId(String),

    #[error("invalid year-month range: {0}")]
    InvalidRange(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
