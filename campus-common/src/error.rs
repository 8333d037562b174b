//! Error type shared by the campus crates

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Config file or database directory could not be read or created
    #[error("Failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Bootstrap configuration is malformed or inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller-supplied value rejected
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A stored value could not be decoded
    #[error("Corrupt stored record: {0}")]
    CorruptRecord(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
