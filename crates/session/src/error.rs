/// Errors from the session storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file or a stored value is not valid JSON of the expected shape.
    #[error("Corrupt stored value: {0}")]
    Corrupt(String),

    /// Only one half of the token/principal pair is present.
    #[error("Incomplete session in storage: {0}")]
    Incomplete(&'static str),
}
