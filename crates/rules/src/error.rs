use std::path::PathBuf;

/// Crate-wide result type for rule loading.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while fetching, parsing or compiling a rules document.
///
/// Every variant is fatal for session start: there are no partial rule sets.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A single pattern failed to compile.
    #[error("invalid {field} pattern #{index} `{pattern}`: {source}")]
    InvalidPattern {
        field: &'static str,
        index: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The individual patterns compiled but their alternation did not
    /// (usually the combined size limit).
    #[error("cannot combine {field} patterns: {source}")]
    Combine {
        field: &'static str,
        #[source]
        source: regex::Error,
    },

    /// The document is not the expected JSON shape.
    #[error("malformed rules document: {0}")]
    Document(#[from] serde_json::Error),

    #[error("failed to read rules file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch rules from {location}: {source}")]
    Fetch {
        location: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid rules location `{location}`: {message}")]
    Location { location: String, message: String },
}

impl Error {
    #[must_use]
    pub fn location(location: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Location {
            location: location.into(),
            message: message.to_string(),
        }
    }
}
