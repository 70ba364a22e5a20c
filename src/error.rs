//! Error types shared across the crate

use std::path::PathBuf;

/// Everything that can go wrong outside of ordinary play.
///
/// Illegal moves are not errors: commands report them by returning `false`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A persisted value exists but cannot be decoded
    #[error("persisted `{key}` is corrupt: {reason}")]
    PersistenceCorrupt { key: &'static str, reason: String },

    #[error("storage i/o failed for {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not determine a data directory")]
    NoDataDir,

    #[error("failed to parse settings: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to serialize settings: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// The tetromino catalog is malformed (programmer error)
    #[error("invalid tetromino catalog: {0}")]
    InvalidCatalog(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl Error {
    pub(crate) fn corrupt(key: &'static str, reason: impl ToString) -> Self {
        Error::PersistenceCorrupt {
            key,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Storage {
            path: path.into(),
            source,
        }
    }

    /// True for errors a caller should answer by starting a fresh game
    pub fn is_corrupt_state(&self) -> bool {
        matches!(self, Error::PersistenceCorrupt { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
