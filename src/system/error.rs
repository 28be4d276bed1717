use thiserror::Error;

/// Failures that abort a whole call.
///
/// Per-process enrichment failures never show up here; they leave the
/// corresponding field of the record empty.
#[derive(Debug, Error)]
pub enum Error {
    /// The OS-wide process table could not be opened at all.
    #[error("failed to open process table snapshot: {message}")]
    Snapshot { code: Option<i32>, message: String },
}

impl Error {
    pub fn snapshot(code: Option<i32>, message: impl Into<String>) -> Self {
        Error::Snapshot {
            code,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
