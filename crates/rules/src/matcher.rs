use {
    regex::{Regex, RegexBuilder},
    tracing::warn,
};

use crate::{Error, Result};

/// A compiled, case-insensitive alternation of hand-authored patterns.
///
/// Matching is an unanchored search, so `Sandbox` matches
/// `Wikipedia:Sandbox`. Patterns that want anchoring must say so with `^`/`$`.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    regex: Regex,
    patterns: usize,
}

impl PatternMatcher {
    /// Compile a pattern list.
    ///
    /// Returns `Ok(None)` when the list has no usable pattern: an absent
    /// matcher never matches. Blank entries are skipped, since an empty
    /// alternative would match every input.
    pub fn compile(field: &'static str, patterns: &[String]) -> Result<Option<Self>> {
        let mut parts = Vec::with_capacity(patterns.len());
        for (index, pattern) in patterns.iter().enumerate() {
            if pattern.trim().is_empty() {
                warn!(field, index, "ignoring blank pattern");
                continue;
            }
            // Compile on its own first so the error names the culprit.
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|source| Error::InvalidPattern {
                    field,
                    index,
                    pattern: pattern.clone(),
                    source,
                })?;
            parts.push(format!("(?:{pattern})"));
        }

        if parts.is_empty() {
            return Ok(None);
        }

        let regex = RegexBuilder::new(&parts.join("|"))
            .case_insensitive(true)
            .build()
            .map_err(|source| Error::Combine { field, source })?;

        Ok(Some(Self {
            regex,
            patterns: parts.len(),
        }))
    }

    #[must_use]
    pub fn is_match(&self, haystack: &str) -> bool {
        self.regex.is_match(haystack)
    }

    /// Number of patterns in the alternation.
    #[must_use]
    pub fn pattern_count(&self) -> usize {
        self.patterns
    }
}
