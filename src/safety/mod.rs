//! Statement safety classification.
//!
//! Flags statements containing data-mutating or destructive keywords so the
//! caller can ask for confirmation before a batch runs. This is a keyword
//! scan, not a parse: it errs towards flagging.

mod classifier;

pub use classifier::SafetyClassifier;

use serde::Serialize;

/// Keywords that make a statement dangerous to run without confirmation.
pub const DANGEROUS_KEYWORDS: &[&str] = &[
    "DELETE", "UPDATE", "DROP", "RENAME", "TRUNCATE", "ALTER", "GRANT", "REVOKE",
];

/// Returns true if `statement` contains a dangerous keyword outside of
/// full-line comments.
pub fn is_dangerous(statement: &str) -> bool {
    SafetyClassifier::shared().is_dangerous(statement)
}

/// Returns the dangerous keywords found in `statement`.
pub fn matched_keywords(statement: &str) -> Vec<&'static str> {
    SafetyClassifier::shared().matched_keywords(statement)
}

/// Safety verdict for one statement, as reported by `dbrun check`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assessment {
    pub dangerous: bool,
    pub keywords: Vec<&'static str>,
}

impl Assessment {
    /// Classifies a statement.
    pub fn of(statement: &str) -> Self {
        let keywords = matched_keywords(statement);
        Self {
            dangerous: !keywords.is_empty(),
            keywords,
        }
    }
}
