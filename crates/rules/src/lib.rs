//! Relay rules: which recent changes get forwarded.
//!
//! A [`RuleSet`] is compiled once from a [`RulesDocument`] and never mutated.
//! Classification checks the exclude rules first, then the include rules; the
//! first rule that matches decides.

pub mod document;
pub mod error;
pub mod loader;
pub mod matcher;
pub mod ruleset;

pub use {
    document::RulesDocument,
    error::{Error, Result},
    loader::{RulesSource, fetch_document, load_rules},
    matcher::PatternMatcher,
    ruleset::{Candidate, Decision, Reason, RuleSet, Verdict, classify},
};
