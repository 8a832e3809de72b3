//! Statement segmentation for SQL editor buffers.
//!
//! Splits a raw multi-statement buffer into individually addressable
//! statements with 1-based line ranges, and groups them into the logical
//! blocks ("query zones") the editor renders run/copy affordances on.
//!
//! Statements that start on the line where the previous one ended belong to
//! the same block and share its line range, so `SELECT 1; SELECT 2;` on one
//! line yields two statements with identical ranges.

mod scanner;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// A single SQL statement located in an editor buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statement {
    /// Statement text without its terminator or leading comments.
    pub text: String,
    /// First line of the statement's logical block (1-based, inclusive).
    pub start_line: usize,
    /// Last line of the statement's logical block (1-based, inclusive).
    pub end_line: usize,
}

impl Statement {
    /// Creates a statement covering the given line range.
    pub fn new(text: impl Into<String>, start_line: usize, end_line: usize) -> Self {
        Self {
            text: text.into(),
            start_line,
            end_line,
        }
    }

    /// Returns true if `line` falls inside this statement's range.
    pub fn contains_line(&self, line: usize) -> bool {
        (self.start_line..=self.end_line).contains(&line)
    }
}

/// A group of statements sharing one line range in the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryBlock {
    pub start_line: usize,
    pub end_line: usize,
    pub statements: Vec<String>,
}

/// Scanner knobs that differ between engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SegmenterOptions {
    /// Treat `\` inside single-quoted strings as an escape character.
    pub backslash_escapes: bool,
    /// Treat `[...]` as a quoted identifier, with `]]` as the escape.
    pub bracket_identifiers: bool,
}

/// Construct left open at the end of the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnterminatedKind {
    SingleQuote,
    DoubleQuote,
    Backtick,
    Bracket,
    BlockComment,
    DollarQuote(String),
    /// A `BEGIN ... END` procedural block.
    Block,
}

/// Diagnostic for a buffer whose tail could not be split reliably.
///
/// Segmentation still succeeds: everything from the last boundary onwards is
/// returned as one final statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unterminated {
    pub kind: UnterminatedKind,
    /// Line where the construct was opened.
    pub line: usize,
}

impl fmt::Display for Unterminated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match &self.kind {
            UnterminatedKind::SingleQuote => "string literal".to_string(),
            UnterminatedKind::DoubleQuote => "quoted identifier".to_string(),
            UnterminatedKind::Backtick => "backtick identifier".to_string(),
            UnterminatedKind::Bracket => "bracketed identifier".to_string(),
            UnterminatedKind::BlockComment => "block comment".to_string(),
            UnterminatedKind::DollarQuote(tag) => format!("dollar-quoted block {tag}"),
            UnterminatedKind::Block => "BEGIN ... END block".to_string(),
        };
        write!(f, "unterminated {what} starting on line {}", self.line)
    }
}

/// Result of segmenting a buffer, with any degradation diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Segmentation {
    pub statements: Vec<Statement>,
    pub unterminated: Option<Unterminated>,
}

/// Splits buffers into statements.
#[derive(Debug, Clone, Copy, Default)]
pub struct Segmenter {
    options: SegmenterOptions,
}

impl Segmenter {
    /// Creates a segmenter with the given options.
    pub fn new(options: SegmenterOptions) -> Self {
        Self { options }
    }

    /// Splits `buffer` into statements, in source order.
    pub fn segment(&self, buffer: &str) -> Vec<Statement> {
        self.segment_with_diagnostics(buffer).statements
    }

    /// Splits `buffer` and reports an unterminated trailing construct, if any.
    pub fn segment_with_diagnostics(&self, buffer: &str) -> Segmentation {
        let output = scanner::scan(buffer, self.options);

        if let Some(unterminated) = &output.unterminated {
            warn!("Segmentation degraded: {unterminated}");
        }

        let mut statements: Vec<Statement> = Vec::with_capacity(output.statements.len());
        let mut block_start = 0;

        for raw in output.statements {
            let continues_block = statements
                .last()
                .is_some_and(|prev| raw.start_line <= prev.end_line);

            if continues_block {
                let start_line = statements[block_start].start_line;
                for stmt in &mut statements[block_start..] {
                    stmt.end_line = raw.end_line;
                }
                statements.push(Statement::new(raw.text, start_line, raw.end_line));
            } else {
                block_start = statements.len();
                statements.push(Statement::new(raw.text, raw.start_line, raw.end_line));
            }
        }

        Segmentation {
            statements,
            unterminated: output.unterminated,
        }
    }
}

/// Splits `buffer` using standard SQL string rules.
pub fn segment(buffer: &str) -> Vec<Statement> {
    Segmenter::default().segment(buffer)
}

/// Groups consecutive statements sharing a line range into blocks.
pub fn blocks(statements: &[Statement]) -> Vec<QueryBlock> {
    let mut blocks: Vec<QueryBlock> = Vec::new();
    for stmt in statements {
        match blocks.last_mut() {
            Some(block)
                if block.start_line == stmt.start_line && block.end_line == stmt.end_line =>
            {
                block.statements.push(stmt.text.clone());
            }
            _ => blocks.push(QueryBlock {
                start_line: stmt.start_line,
                end_line: stmt.end_line,
                statements: vec![stmt.text.clone()],
            }),
        }
    }
    blocks
}

/// Returns the statements whose block touches any of `lines`, in buffer order.
///
/// This is the "run selected" projection: selecting any line of a block
/// selects every statement in it.
pub fn select_lines(statements: &[Statement], lines: &[usize]) -> Vec<Statement> {
    statements
        .iter()
        .filter(|stmt| lines.iter().any(|&line| stmt.contains_line(line)))
        .cloned()
        .collect()
}
