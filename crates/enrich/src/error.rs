use std::error::Error as StdError;

/// Crate-wide result type for enrichment operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed enrichment errors. None of these abort an invocation; sub-operation
/// failures degrade to "done, no enrichment applied".
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Category registry read or write failed.
    #[error("category registry unavailable: {message}")]
    RegistryUnavailable { message: String },

    /// Attachment download failed with a wrapped transport error.
    #[error("attachment fetch failed: {context}: {source}")]
    Fetch {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// Attachment host answered with a non-success status.
    #[error("attachment fetch failed: unexpected status {status}")]
    FetchStatus { status: reqwest::StatusCode },

    /// Local filesystem error while materializing an attachment.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    #[must_use]
    pub fn registry_unavailable(message: impl std::fmt::Display) -> Self {
        Self::RegistryUnavailable {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn fetch(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Fetch {
            context: context.into(),
            source: Box::new(source),
        }
    }
}
