use serde::{Deserialize, Serialize};

use crate::Result;

/// The hand-authored rules document, as stored on the wiki.
///
/// All six keys are required. Unknown keys are ignored so the page can carry
/// notes for other tools.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesDocument {
    /// Regexes searched in the page title; a match forwards the change.
    pub page_include_patterns: Vec<String>,
    /// Regexes searched in the page title; a match suppresses the change.
    pub page_exclude_patterns: Vec<String>,
    /// Regexes searched in the edit summary; a match forwards the change.
    pub summary_include_patterns: Vec<String>,
    /// Regexes searched in the edit summary; a match suppresses the change.
    pub summary_exclude_patterns: Vec<String>,
    /// Exact user names whose changes are always suppressed.
    pub user_exclude_list: Vec<String>,
    /// Exact user names whose changes are forwarded unless an exclude rule
    /// matched first.
    pub user_include_list: Vec<String>,
}

impl RulesDocument {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Total number of entries across all lists.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.page_include_patterns.len()
            + self.page_exclude_patterns.len()
            + self.summary_include_patterns.len()
            + self.summary_exclude_patterns.len()
            + self.user_exclude_list.len()
            + self.user_include_list.len()
    }
}
