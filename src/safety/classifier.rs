//! Keyword matching behind the safety classification.

use std::sync::LazyLock;

use regex::Regex;

use super::DANGEROUS_KEYWORDS;

static DEFAULT_CLASSIFIER: LazyLock<SafetyClassifier> = LazyLock::new(SafetyClassifier::new);

/// Whole-word, case-insensitive matcher over the dangerous keyword table.
#[derive(Debug, Clone)]
pub struct SafetyClassifier {
    pattern: Regex,
}

impl Default for SafetyClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SafetyClassifier {
    /// Creates a classifier for [`DANGEROUS_KEYWORDS`].
    pub fn new() -> Self {
        let alternation = DANGEROUS_KEYWORDS.join("|");
        let pattern = Regex::new(&format!(r"(?i)\b(?:{alternation})\b"))
            .expect("keyword table is a valid pattern");
        Self { pattern }
    }

    /// Returns the shared classifier instance.
    pub fn shared() -> &'static Self {
        &DEFAULT_CLASSIFIER
    }

    /// Returns true if the statement contains any dangerous keyword.
    pub fn is_dangerous(&self, statement: &str) -> bool {
        self.pattern.is_match(&strip_comment_lines(statement))
    }

    /// Returns the dangerous keywords found, upper-cased, each once, in
    /// order of first appearance.
    pub fn matched_keywords(&self, statement: &str) -> Vec<&'static str> {
        let uncommented = strip_comment_lines(statement);
        let mut found: Vec<&'static str> = Vec::new();

        for m in self.pattern.find_iter(&uncommented) {
            let keyword = DANGEROUS_KEYWORDS
                .iter()
                .copied()
                .find(|k| k.eq_ignore_ascii_case(m.as_str()));
            if let Some(keyword) = keyword {
                if !found.contains(&keyword) {
                    found.push(keyword);
                }
            }
        }

        found
    }
}

/// Drops lines that are entirely `--` comments.
///
/// Trailing inline comments and block comments are left in place, so
/// `SELECT 1 /* DROP TABLE x */` still matches.
fn strip_comment_lines(statement: &str) -> String {
    statement
        .split('\n')
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n")
}
