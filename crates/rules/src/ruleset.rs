use std::collections::HashSet;

use crate::{RulesDocument, Result, matcher::PatternMatcher};

/// Outcome of classifying one change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Forward,
    Suppress,
}

/// Which precedence step produced a [`Decision`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    ActorExcluded,
    TitleExcluded,
    SummaryExcluded,
    ActorIncluded,
    TitleIncluded,
    SummaryIncluded,
    NoRuleMatched,
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ActorExcluded => write!(f, "actor excluded"),
            Self::TitleExcluded => write!(f, "title excluded"),
            Self::SummaryExcluded => write!(f, "summary excluded"),
            Self::ActorIncluded => write!(f, "actor included"),
            Self::TitleIncluded => write!(f, "title included"),
            Self::SummaryIncluded => write!(f, "summary included"),
            Self::NoRuleMatched => write!(f, "no rule matched"),
        }
    }
}

/// A decision together with the rule that made it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub decision: Decision,
    pub reason: Reason,
}

impl Verdict {
    fn forward(reason: Reason) -> Self {
        Self {
            decision: Decision::Forward,
            reason,
        }
    }

    fn suppress(reason: Reason) -> Self {
        Self {
            decision: Decision::Suppress,
            reason,
        }
    }
}

/// The fields of a change that the rules look at.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub actor: &'a str,
    pub title: &'a str,
    pub summary: &'a str,
}

/// Compiled include/exclude rules. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    title_include: Option<PatternMatcher>,
    title_exclude: Option<PatternMatcher>,
    summary_include: Option<PatternMatcher>,
    summary_exclude: Option<PatternMatcher>,
    actor_exclude: HashSet<String>,
    actor_include: HashSet<String>,
}

impl RuleSet {
    /// Compile every list of `doc`. Any invalid pattern fails the whole set.
    pub fn from_document(doc: &RulesDocument) -> Result<Self> {
        Ok(Self {
            title_include: PatternMatcher::compile(
                "pageIncludePatterns",
                &doc.page_include_patterns,
            )?,
            title_exclude: PatternMatcher::compile(
                "pageExcludePatterns",
                &doc.page_exclude_patterns,
            )?,
            summary_include: PatternMatcher::compile(
                "summaryIncludePatterns",
                &doc.summary_include_patterns,
            )?,
            summary_exclude: PatternMatcher::compile(
                "summaryExcludePatterns",
                &doc.summary_exclude_patterns,
            )?,
            actor_exclude: doc.user_exclude_list.iter().cloned().collect(),
            actor_include: doc.user_include_list.iter().cloned().collect(),
        })
    }

    /// Run the precedence chain and report which step decided.
    ///
    /// Order: actor exclude, title exclude, summary exclude, actor include,
    /// title include, summary include, otherwise suppress.
    #[must_use]
    pub fn evaluate(&self, candidate: Candidate<'_>) -> Verdict {
        if self.actor_exclude.contains(candidate.actor) {
            return Verdict::suppress(Reason::ActorExcluded);
        }
        if matches(&self.title_exclude, candidate.title) {
            return Verdict::suppress(Reason::TitleExcluded);
        }
        if matches(&self.summary_exclude, candidate.summary) {
            return Verdict::suppress(Reason::SummaryExcluded);
        }
        if self.actor_include.contains(candidate.actor) {
            return Verdict::forward(Reason::ActorIncluded);
        }
        if matches(&self.title_include, candidate.title) {
            return Verdict::forward(Reason::TitleIncluded);
        }
        if matches(&self.summary_include, candidate.summary) {
            return Verdict::forward(Reason::SummaryIncluded);
        }
        Verdict::suppress(Reason::NoRuleMatched)
    }

    #[must_use]
    pub fn classify(&self, candidate: Candidate<'_>) -> Decision {
        self.evaluate(candidate).decision
    }

    /// One-line description for startup logs.
    #[must_use]
    pub fn summary(&self) -> String {
        let count = |m: &Option<PatternMatcher>| m.as_ref().map_or(0, PatternMatcher::pattern_count);
        format!(
            "title +{}/-{}, summary +{}/-{}, actors +{}/-{}",
            count(&self.title_include),
            count(&self.title_exclude),
            count(&self.summary_include),
            count(&self.summary_exclude),
            self.actor_include.len(),
            self.actor_exclude.len(),
        )
    }
}

fn matches(matcher: &Option<PatternMatcher>, haystack: &str) -> bool {
    matcher.as_ref().is_some_and(|m| m.is_match(haystack))
}

/// Classify `candidate` against `rules`.
#[must_use]
pub fn classify(candidate: Candidate<'_>, rules: &RuleSet) -> Decision {
    rules.classify(candidate)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn candidate<'a>(actor: &'a str, title: &'a str, summary: &'a str) -> Candidate<'a> {
        Candidate {
            actor,
            title,
            summary,
        }
    }

    /// Every rule list populated; each one matches a distinct marker.
    fn full_rules() -> RuleSet {
        RuleSet::from_document(&RulesDocument {
            page_include_patterns: strings(&["IncludedPage"]),
            page_exclude_patterns: strings(&["ExcludedPage"]),
            summary_include_patterns: strings(&["included summary"]),
            summary_exclude_patterns: strings(&["excluded summary"]),
            user_exclude_list: strings(&["BadActor"]),
            user_include_list: strings(&["GoodActor"]),
        })
        .unwrap()
    }

    #[test]
    fn empty_rules_suppress_everything() {
        let rules = RuleSet::from_document(&RulesDocument::default()).unwrap();
        let verdict = rules.evaluate(candidate("Anyone", "Any page", "any summary"));
        assert_eq!(verdict.decision, Decision::Suppress);
        assert_eq!(verdict.reason, Reason::NoRuleMatched);
    }

    #[test]
    fn empty_string_title_does_not_match_absent_matcher() {
        let rules = RuleSet::from_document(&RulesDocument::default()).unwrap();
        assert_eq!(rules.classify(candidate("", "", "")), Decision::Suppress);
    }

    #[rstest]
    // Actor exclude wins over everything.
    #[case("BadActor", "IncludedPage", "included summary", Reason::ActorExcluded)]
    #[case("BadActor", "ExcludedPage", "excluded summary", Reason::ActorExcluded)]
    // Title exclude beats summary exclude and every include.
    #[case("GoodActor", "ExcludedPage", "included summary", Reason::TitleExcluded)]
    #[case("Someone", "ExcludedPage IncludedPage", "", Reason::TitleExcluded)]
    #[case("Someone", "ExcludedPage", "excluded summary", Reason::TitleExcluded)]
    // Summary exclude beats every include.
    #[case("GoodActor", "IncludedPage", "excluded summary", Reason::SummaryExcluded)]
    #[case("Someone", "Other", "included summary, excluded summary", Reason::SummaryExcluded)]
    // Actor include is checked before title and summary include.
    #[case("GoodActor", "IncludedPage", "included summary", Reason::ActorIncluded)]
    #[case("GoodActor", "Other", "nothing", Reason::ActorIncluded)]
    // Title include before summary include.
    #[case("Someone", "IncludedPage", "included summary", Reason::TitleIncluded)]
    #[case("Someone", "Other", "included summary", Reason::SummaryIncluded)]
    #[case("Someone", "Other", "nothing", Reason::NoRuleMatched)]
    fn precedence(
        #[case] actor: &str,
        #[case] title: &str,
        #[case] summary: &str,
        #[case] expected: Reason,
    ) {
        let verdict = full_rules().evaluate(candidate(actor, title, summary));
        assert_eq!(verdict.reason, expected);
        let expected_decision = match expected {
            Reason::ActorIncluded | Reason::TitleIncluded | Reason::SummaryIncluded => {
                Decision::Forward
            },
            _ => Decision::Suppress,
        };
        assert_eq!(verdict.decision, expected_decision);
    }

    #[test]
    fn actor_in_both_sets_is_suppressed() {
        let rules = RuleSet::from_document(&RulesDocument {
            user_exclude_list: strings(&["Twice"]),
            user_include_list: strings(&["Twice"]),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            rules.classify(candidate("Twice", "p", "s")),
            Decision::Suppress
        );
    }

    #[test]
    fn actor_names_are_case_sensitive() {
        let rules = RuleSet::from_document(&RulesDocument {
            user_include_list: strings(&["ArbClerkBot"]),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            rules.classify(candidate("ArbClerkBot", "p", "s")),
            Decision::Forward
        );
        assert_eq!(
            rules.classify(candidate("arbclerkbot", "p", "s")),
            Decision::Suppress
        );
    }

    #[test]
    fn include_patterns_are_case_insensitive() {
        let rules = RuleSet::from_document(&RulesDocument {
            page_include_patterns: strings(&["wikipedia:arbitration"]),
            summary_include_patterns: strings(&["CLERK NOTE"]),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            rules.classify(candidate("x", "Wikipedia:Arbitration/Requests", "")),
            Decision::Forward
        );
        assert_eq!(
            rules.classify(candidate("x", "Other", "adding a clerk note")),
            Decision::Forward
        );
    }

    #[test]
    fn exclude_patterns_are_case_insensitive() {
        let rules = RuleSet::from_document(&RulesDocument {
            page_exclude_patterns: strings(&["SANDBOX"]),
            user_include_list: strings(&["ArbClerkBot"]),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            rules.classify(candidate("ArbClerkBot", "Wikipedia:sandbox", "")),
            Decision::Suppress
        );
    }

    #[test]
    fn invalid_pattern_fails_the_whole_set() {
        let doc = RulesDocument {
            summary_exclude_patterns: strings(&["fine", "[broken"]),
            user_include_list: strings(&["ArbClerkBot"]),
            ..Default::default()
        };
        let err = RuleSet::from_document(&doc).unwrap_err();
        assert!(err.to_string().contains("summaryExcludePatterns"), "{err}");
    }

    #[test]
    fn free_function_matches_method() {
        let rules = full_rules();
        let c = candidate("GoodActor", "Other", "nothing");
        assert_eq!(classify(c, &rules), rules.classify(c));
    }

    #[test]
    fn summary_counts_rules() {
        assert_eq!(
            full_rules().summary(),
            "title +1/-1, summary +1/-1, actors +1/-1"
        );
    }
}
