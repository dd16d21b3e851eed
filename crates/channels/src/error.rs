use std::error::Error as StdError;

/// Crate-wide result type for transport operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed transport errors. Every one of them ends the session.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Outbound text the protocol cannot carry.
    #[error("invalid outbound input: {message}")]
    InvalidInput { message: String },

    /// The peer sent something that breaks the protocol.
    #[error("protocol violation: {message}")]
    Protocol { message: String },

    /// The connection is already closed.
    #[error("connection closed")]
    Closed,

    /// Connecting did not finish in time.
    #[error("timed out {context}")]
    Timeout { context: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapped source error from an external dependency.
    #[error("transport operation failed: {context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn invalid_input(message: impl std::fmt::Display) -> Self {
        Self::InvalidInput {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn protocol(message: impl std::fmt::Display) -> Self {
        Self::Protocol {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn timeout(context: impl Into<String>) -> Self {
        Self::Timeout {
            context: context.into(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }
}
