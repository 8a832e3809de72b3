//! Byte-level scanner that finds statement boundaries.
//!
//! Only ASCII bytes are significant to the state machine, so scanning bytes
//! is safe for UTF-8 input: every slice boundary lands on an ASCII byte.

use super::{SegmenterOptions, Unterminated, UnterminatedKind};

/// Words that turn a leading `BEGIN` into a transaction statement.
const TRANSACTION_WORDS: &[&str] = &[
    "TRANSACTION",
    "TRAN",
    "WORK",
    "ISOLATION",
    "DEFERRED",
    "IMMEDIATE",
    "EXCLUSIVE",
    "READ",
    "DISTRIBUTED",
];

/// Leading words of a statement that is procedural code throughout.
const PROCEDURAL_LEADS: &[&str] = &["DO", "DECLARE"];

/// Leading words of a definition that may carry a routine body.
const DEFINITION_LEADS: &[&str] = &["CREATE", "ALTER"];

/// Object kinds whose definition has a `BEGIN ... END` body.
const ROUTINE_KINDS: &[&str] = &["PROCEDURE", "PROC", "FUNCTION", "TRIGGER", "EVENT"];

/// Words after `END` that close a control-flow construct, not a block.
const CONTROL_FLOW_WORDS: &[&str] = &["IF", "LOOP", "WHILE", "REPEAT"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State<'a> {
    Code,
    LineComment,
    BlockComment,
    SingleQuoted,
    DoubleQuoted,
    Backticked,
    Bracketed,
    DollarQuoted(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookahead<'a> {
    End,
    Semicolon,
    Word(&'a str),
    Other,
}

/// A statement located in the buffer, before logical-block grouping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct RawStatement<'a> {
    pub text: &'a str,
    pub start_line: usize,
    pub end_line: usize,
}

#[derive(Debug)]
pub(super) struct ScanOutput<'a> {
    pub statements: Vec<RawStatement<'a>>,
    pub unterminated: Option<Unterminated>,
}

pub(super) fn scan(src: &str, options: SegmenterOptions) -> ScanOutput<'_> {
    let mut scanner = Scanner::new(src, options);
    scanner.run();
    scanner.finish()
}

struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    options: SegmenterOptions,
    pos: usize,
    line: usize,
    state: State<'a>,
    /// Line on which the current non-code state was entered.
    opened_line: usize,
    /// Byte offset and line of the first code character of the statement.
    start: Option<(usize, usize)>,
    depth: usize,
    block_line: usize,
    /// First word of the current statement.
    lead: Option<&'a str>,
    /// Set once the current statement is known to hold procedural code.
    procedural: bool,
    statements: Vec<RawStatement<'a>>,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str, options: SegmenterOptions) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            options,
            pos: 0,
            line: 1,
            state: State::Code,
            opened_line: 1,
            start: None,
            depth: 0,
            block_line: 1,
            lead: None,
            procedural: false,
            statements: Vec::new(),
        }
    }

    fn run(&mut self) {
        while self.pos < self.bytes.len() {
            match self.state {
                State::Code => self.code(),
                State::LineComment => self.skip_until("\n", false),
                State::BlockComment => self.skip_until("*/", true),
                State::DollarQuoted(tag) => self.skip_until(tag, true),
                State::SingleQuoted => self.quoted(b'\'', self.options.backslash_escapes),
                State::DoubleQuoted => self.quoted(b'"', false),
                State::Backticked => self.quoted(b'`', false),
                State::Bracketed => self.quoted(b']', false),
            }
        }
    }

    fn finish(mut self) -> ScanOutput<'a> {
        let unterminated = match self.state {
            State::Code | State::LineComment if self.depth > 0 => Some(Unterminated {
                kind: UnterminatedKind::Block,
                line: self.block_line,
            }),
            State::Code | State::LineComment => None,
            State::BlockComment => Some(self.unterminated(UnterminatedKind::BlockComment)),
            State::SingleQuoted => Some(self.unterminated(UnterminatedKind::SingleQuote)),
            State::DoubleQuoted => Some(self.unterminated(UnterminatedKind::DoubleQuote)),
            State::Backticked => Some(self.unterminated(UnterminatedKind::Backtick)),
            State::Bracketed => Some(self.unterminated(UnterminatedKind::Bracket)),
            State::DollarQuoted(tag) => {
                Some(self.unterminated(UnterminatedKind::DollarQuote(tag.to_string())))
            }
        };

        if let Some((start, start_line)) = self.start.take() {
            self.statements.push(RawStatement {
                text: self.src[start..].trim_end(),
                start_line,
                end_line: self.line,
            });
        }

        ScanOutput {
            statements: self.statements,
            unterminated,
        }
    }

    fn unterminated(&self, kind: UnterminatedKind) -> Unterminated {
        Unterminated {
            kind,
            line: self.opened_line,
        }
    }

    fn code(&mut self) {
        let b = self.bytes[self.pos];
        match b {
            b';' if self.depth == 0 => {
                self.terminate();
                self.advance(1);
            }
            b'-' if self.peek(1) == Some(b'-') => {
                self.enter(State::LineComment);
                self.advance(2);
            }
            b'/' if self.peek(1) == Some(b'*') => {
                self.enter(State::BlockComment);
                self.advance(2);
            }
            b'\'' => self.open_quote(State::SingleQuoted),
            b'"' => self.open_quote(State::DoubleQuoted),
            b'`' => self.open_quote(State::Backticked),
            b'[' if self.options.bracket_identifiers => self.open_quote(State::Bracketed),
            b'$' => {
                self.mark_start();
                match self.dollar_tag() {
                    Some(tag) => {
                        self.enter(State::DollarQuoted(tag));
                        self.advance(tag.len());
                    }
                    None => self.advance(1),
                }
            }
            b if is_word_start(b) => self.word(),
            b if b.is_ascii_whitespace() => self.advance(1),
            _ => {
                self.mark_start();
                self.advance(1);
            }
        }
    }

    fn open_quote(&mut self, state: State<'a>) {
        self.mark_start();
        self.enter(state);
        self.advance(1);
    }

    fn quoted(&mut self, quote: u8, backslash_escapes: bool) {
        let b = self.bytes[self.pos];
        if backslash_escapes && b == b'\\' {
            self.advance(2);
        } else if b == quote {
            if self.peek(1) == Some(quote) {
                self.advance(2);
            } else {
                self.state = State::Code;
                self.advance(1);
            }
        } else {
            self.advance(1);
        }
    }

    /// Skips to just past `needle`, or to the end of input if it never appears.
    fn skip_until(&mut self, needle: &str, consume: bool) {
        match self.src[self.pos..].find(needle) {
            Some(offset) => {
                let skip = if consume {
                    offset + needle.len()
                } else {
                    offset
                };
                self.advance(skip);
                self.state = State::Code;
            }
            None => self.advance(self.bytes.len() - self.pos),
        }
    }

    fn word(&mut self) {
        let begin = self.pos;
        let end = self.word_end(begin);
        let word = &self.src[begin..end];
        let first_word = self.start.is_none();

        self.mark_start();
        self.advance(end - begin);
        self.note_header(word, first_word);

        if word.eq_ignore_ascii_case("BEGIN") {
            self.on_begin(first_word);
        } else if self.depth > 0 {
            if word.eq_ignore_ascii_case("CASE") {
                self.depth += 1;
            } else if word.eq_ignore_ascii_case("END") {
                self.on_end();
            }
        }
    }

    fn note_header(&mut self, word: &'a str, first_word: bool) {
        if first_word {
            self.lead = Some(word);
            self.procedural = contains_ignore_case(PROCEDURAL_LEADS, word);
        } else if !self.procedural
            && self.depth == 0
            && self
                .lead
                .is_some_and(|lead| contains_ignore_case(DEFINITION_LEADS, lead))
            && contains_ignore_case(ROUTINE_KINDS, word)
        {
            self.procedural = true;
        }
    }

    /// A `BEGIN` past the first word only opens a block inside procedural
    /// code; elsewhere it is an ordinary identifier.
    fn on_begin(&mut self, first_word: bool) {
        if self.depth == 0 && !first_word && !self.procedural {
            return;
        }
        if self.depth == 0 && first_word {
            let is_transaction = match self.lookahead() {
                (Lookahead::End | Lookahead::Semicolon, _) => true,
                (Lookahead::Word(next), _) => contains_ignore_case(TRANSACTION_WORDS, next),
                (Lookahead::Other, _) => false,
            };
            if is_transaction {
                return;
            }
        }
        if self.depth == 0 {
            self.block_line = self.line;
        }
        self.depth += 1;
    }

    fn on_end(&mut self) {
        match self.lookahead() {
            (Lookahead::Word(next), next_end) if contains_ignore_case(CONTROL_FLOW_WORDS, next) => {
                self.advance(next_end - self.pos);
            }
            (Lookahead::Word(next), next_end) if next.eq_ignore_ascii_case("CASE") => {
                self.advance(next_end - self.pos);
                self.depth -= 1;
            }
            _ => self.depth -= 1,
        }
    }

    /// Peeks past whitespace at the next token; returns it and the offset
    /// just after it (only meaningful for words).
    fn lookahead(&self) -> (Lookahead<'a>, usize) {
        let mut idx = self.pos;
        while idx < self.bytes.len() && self.bytes[idx].is_ascii_whitespace() {
            idx += 1;
        }
        match self.bytes.get(idx) {
            None => (Lookahead::End, idx),
            Some(b';') => (Lookahead::Semicolon, idx),
            Some(&b) if is_word_start(b) => {
                let end = self.word_end(idx);
                (Lookahead::Word(&self.src[idx..end]), end)
            }
            Some(_) => (Lookahead::Other, idx),
        }
    }

    fn word_end(&self, begin: usize) -> usize {
        let mut end = begin;
        while end < self.bytes.len() && is_word_char(self.bytes[end]) {
            end += 1;
        }
        end
    }

    /// Matches `$$` or `$tag$` at the current position.
    fn dollar_tag(&self) -> Option<&'a str> {
        let rest = &self.bytes[self.pos + 1..];
        for (len, &b) in rest.iter().enumerate() {
            if b == b'$' {
                return Some(&self.src[self.pos..self.pos + len + 2]);
            }
            let valid = if len == 0 {
                b.is_ascii_alphabetic() || b == b'_'
            } else {
                b.is_ascii_alphanumeric() || b == b'_'
            };
            if !valid {
                return None;
            }
        }
        None
    }

    fn terminate(&mut self) {
        self.lead = None;
        self.procedural = false;
        if let Some((start, start_line)) = self.start.take() {
            self.statements.push(RawStatement {
                text: self.src[start..self.pos].trim_end(),
                start_line,
                end_line: self.line,
            });
        }
    }

    fn mark_start(&mut self) {
        if self.start.is_none() {
            self.start = Some((self.pos, self.line));
        }
    }

    fn enter(&mut self, state: State<'a>) {
        self.state = state;
        self.opened_line = self.line;
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn advance(&mut self, count: usize) {
        let end = (self.pos + count).min(self.bytes.len());
        self.line += self.bytes[self.pos..end]
            .iter()
            .filter(|&&b| b == b'\n')
            .count();
        self.pos = end;
    }
}

fn is_word_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_word_char(b: u8) -> bool {
    is_word_start(b) || b.is_ascii_digit() || b == b'$'
}

fn contains_ignore_case(words: &[&str], word: &str) -> bool {
    words.iter().any(|w| w.eq_ignore_ascii_case(word))
}
