use thiserror::Error;

/// Errors returned by the table stores and the repositories built on them.
///
/// An absent row is never an error: reads return an empty list, updates
/// return `None` and deletes return `false`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("store rejected request to '{table}' ({status}): {body}")]
    Status {
        table: String,
        status: u16,
        body: String,
    },

    #[error("{0}")]
    Validation(String),

    #[error("unexpected row shape: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("store returned no row for '{0}'")]
    MissingRow(String),

    #[error("local storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl Error {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// True for failures of the transport or the remote service.
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Status { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
