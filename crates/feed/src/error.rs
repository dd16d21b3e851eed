pub type Result<T> = std::result::Result<T, Error>;

/// Feed errors.
///
/// [`Error::is_fatal`] separates per-record problems (skip and carry on) from
/// the subscription giving up.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The record is not valid JSON or lacks a required field.
    #[error("malformed change record: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A required field is missing for this kind of record.
    #[error("change record of type `{kind}` has no {field}")]
    MissingField { kind: String, field: &'static str },

    /// A record type the relay does not render (categorize, external, ...).
    #[error("unsupported change type `{kind}`")]
    Unsupported { kind: String },

    /// The subscription URL could not be built.
    #[error("invalid feed url: {0}")]
    Url(#[from] url::ParseError),

    /// Reconnect budget spent; the feed is gone.
    #[error("feed gave up after {attempts} consecutive failed attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

impl Error {
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Url(_) | Self::Exhausted { .. })
    }
}
