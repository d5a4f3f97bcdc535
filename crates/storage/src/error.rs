/// Crate-wide result type for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed storage errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Underlying database error.
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    /// Stored envelope does not parse.
    #[error("invalid stored envelope for key {key}: {source}")]
    Envelope {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Envelope payload is not valid base64.
    #[error("invalid stored payload for key {key}: {source}")]
    Payload {
        key: String,
        #[source]
        source: base64::DecodeError,
    },

    /// Stored value is not valid UTF-8 (string accessors only).
    #[error("stored value for key {key} is not valid UTF-8")]
    NotUtf8 { key: String },
}
