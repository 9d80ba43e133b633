use thiserror::Error;

/// Errors surfaced by the quote service to its callers.
#[derive(Debug, Error)]
pub enum Error {
    /// Request parameters were missing or malformed. Raised before any store access.
    #[error("{0}")]
    Validation(String),

    /// Connectivity or constraint failure in the quote store.
    #[error("store error: {0:#}")]
    Store(#[from] anyhow::Error),

    /// A quote row could not be converted into the processed view.
    #[error("failed to process quotes: {0}")]
    Transform(String),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
