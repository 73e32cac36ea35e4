use thiserror::Error;

#[derive(Error, Debug)]
pub enum ZipsumError {
    /// The bytes could not be parsed as a ZIP container
    #[error("Failed to process {archive}. Is it a valid ZIP file? ({reason})")]
    InvalidArchive { archive: String, reason: String },

    /// An entry path could not be normalized, or collides with another entry
    #[error("Invalid entry '{path}' in {archive}: {reason}")]
    InvalidEntry {
        archive: String,
        path: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Report error: {0}")]
    Report(String),

    #[error("Processing cancelled")]
    Cancelled,
}

impl ZipsumError {
    pub fn invalid_archive(archive: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidArchive {
            archive: archive.into(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_entry(
        archive: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidEntry {
            archive: archive.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ZipsumError>;
