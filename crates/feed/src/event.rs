use serde::Deserialize;

use crate::{Error, Result};

/// What kind of change an [`Event`] describes, with the id that links to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A page edit or creation.
    Edit { revision_new_id: u64 },
    /// A log entry (block, protect, move, ...).
    LogAction { log_id: u64 },
}

/// One change from the feed, reduced to the fields used for filtering and
/// formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub title: String,
    pub actor: String,
    /// Edit summary, or the log action comment for log entries.
    pub summary_text: String,
    pub timestamp_unix: i64,
    pub server_name: String,
}

impl Event {
    #[must_use]
    pub fn revision_new_id(&self) -> Option<u64> {
        match self.kind {
            EventKind::Edit { revision_new_id } => Some(revision_new_id),
            EventKind::LogAction { .. } => None,
        }
    }

    #[must_use]
    pub fn log_id(&self) -> Option<u64> {
        match self.kind {
            EventKind::LogAction { log_id } => Some(log_id),
            EventKind::Edit { .. } => None,
        }
    }

    /// Parse one recent-change record.
    ///
    /// Returns `Ok(None)` for canary records, which EventStreams injects to
    /// monitor itself and which never describe a real change.
    pub fn from_record(raw: &str) -> Result<Option<Self>> {
        let record: RawChange = serde_json::from_str(raw)?;
        if record.is_canary() {
            return Ok(None);
        }
        record.try_into().map(Some)
    }
}

#[derive(Debug, Deserialize)]
struct RawMeta {
    #[serde(default)]
    domain: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRevision {
    #[serde(default)]
    new: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawChange {
    #[serde(rename = "type")]
    kind: String,
    title: String,
    user: String,
    timestamp: i64,
    server_name: String,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    log_action_comment: Option<String>,
    #[serde(default)]
    log_id: Option<u64>,
    #[serde(default)]
    revision: Option<RawRevision>,
    #[serde(default)]
    meta: Option<RawMeta>,
}

impl RawChange {
    fn is_canary(&self) -> bool {
        self.meta
            .as_ref()
            .and_then(|m| m.domain.as_deref())
            .is_some_and(|d| d == "canary")
    }
}

impl TryFrom<RawChange> for Event {
    type Error = Error;

    fn try_from(raw: RawChange) -> Result<Self> {
        let missing = |field| Error::MissingField {
            kind: raw.kind.clone(),
            field,
        };
        let (kind, summary_text) = match raw.kind.as_str() {
            "edit" | "new" => {
                let revision_new_id = raw
                    .revision
                    .as_ref()
                    .and_then(|r| r.new)
                    .ok_or_else(|| missing("revision.new"))?;
                (
                    EventKind::Edit { revision_new_id },
                    raw.comment.clone().unwrap_or_default(),
                )
            },
            "log" => {
                let log_id = raw.log_id.ok_or_else(|| missing("log_id"))?;
                let summary = raw
                    .log_action_comment
                    .clone()
                    .or_else(|| raw.comment.clone())
                    .unwrap_or_default();
                (EventKind::LogAction { log_id }, summary)
            },
            other => {
                return Err(Error::Unsupported {
                    kind: other.to_string(),
                });
            },
        };

        Ok(Self {
            kind,
            title: raw.title,
            actor: raw.user,
            summary_text,
            timestamp_unix: raw.timestamp,
            server_name: raw.server_name,
        })
    }
}
