//! Segmentation properties over realistic editor buffers.

use db_runner::dialect::Dialect;
use db_runner::safety;
use db_runner::segment::{blocks, segment, select_lines, Segmenter};
use pretty_assertions::assert_eq;

const BUFFERS: &[&str] = &[
    "SELECT 1; SELECT 2;",
    "SELECT 'a;b' AS x, \"weird;col\" FROM t;\nINSERT INTO t VALUES ('it''s; fine');",
    "UPDATE accounts\n   SET balance = balance - 10\n WHERE id = $1;\n\nSELECT balance FROM accounts WHERE id = $1",
    "CREATE FUNCTION f() RETURNS int AS $$ SELECT 1; $$ LANGUAGE sql;\nSELECT f();",
    "SELECT 1 -- trailing; note\n, 2;\nSELECT 3 /* inline; */ + 4;",
    "BEGIN; DELETE FROM logs WHERE ts < now() - interval '30 days'; COMMIT;",
];

/// Whitespace/semicolon separated tokens.
fn tokens(sql: &str) -> Vec<&str> {
    sql.split(|c: char| c.is_whitespace() || c == ';')
        .filter(|t| !t.is_empty())
        .collect()
}

#[test]
fn test_rejoined_statements_preserve_tokens() {
    for buffer in BUFFERS {
        let statements = segment(buffer);
        let rejoined = statements
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(";\n");
        assert_eq!(tokens(&rejoined), tokens(buffer), "buffer: {buffer}");
    }
}

#[test]
fn test_segmentation_is_deterministic() {
    for buffer in BUFFERS {
        assert_eq!(segment(buffer), segment(buffer));
    }
}

#[test]
fn test_line_ranges_are_ordered_and_in_bounds() {
    for buffer in BUFFERS {
        let line_count = buffer.lines().count();
        let statements = segment(buffer);
        for pair in statements.windows(2) {
            assert!(pair[0].start_line <= pair[1].start_line, "buffer: {buffer}");
        }
        for stmt in &statements {
            assert!(stmt.start_line >= 1);
            assert!(stmt.start_line <= stmt.end_line);
            assert!(stmt.end_line <= line_count);
        }
    }
}

#[test]
fn test_commented_drop_then_split_drop() {
    assert!(!safety::is_dangerous("-- DROP TABLE x;\nSELECT 1;"));

    let statements = segment("SELECT 1; DROP TABLE x;");
    assert_eq!(statements.len(), 2);
    assert!(!safety::is_dangerous(&statements[0].text));
    assert!(safety::is_dangerous(&statements[1].text));
}

#[test]
fn test_blocks_cover_every_statement_once() {
    let buffer = BUFFERS.join("\n");
    let statements = segment(&buffer);
    let total: usize = blocks(&statements).iter().map(|b| b.statements.len()).sum();
    assert_eq!(total, statements.len());
}

#[test]
fn test_run_selected_line_takes_whole_block() {
    let buffer = "SELECT 1;\nSELECT 2; SELECT\n  3;\nSELECT 4;";
    let statements = segment(buffer);
    let selected = select_lines(&statements, &[3]);
    let texts: Vec<&str> = selected.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(texts, vec!["SELECT 2", "SELECT\n  3"]);
}

#[test]
fn test_mysql_backslash_escape_changes_boundaries() {
    let buffer = r"SELECT 'C:\'; SELECT 2;";

    let postgres = Segmenter::new(Dialect::Postgres.segmenter_options()).segment(buffer);
    assert_eq!(postgres.len(), 2);

    // The backslash escapes the closing quote, so the string never ends.
    let mysql = Segmenter::new(Dialect::Mysql.segmenter_options()).segment_with_diagnostics(buffer);
    assert_eq!(mysql.statements.len(), 1);
    assert!(mysql.unterminated.is_some());
}

#[test]
fn test_begin_column_keeps_drop_separate() {
    let statements = segment("SELECT begin FROM events;\nSELECT 2;\nDROP TABLE x;");
    let texts: Vec<_> = statements.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(texts, vec!["SELECT begin FROM events", "SELECT 2", "DROP TABLE x"]);

    let dangerous: Vec<_> = statements
        .iter()
        .filter(|s| safety::is_dangerous(&s.text))
        .map(|s| s.text.as_str())
        .collect();
    assert_eq!(dangerous, vec!["DROP TABLE x"]);
}

#[test]
fn test_mssql_bracketed_identifier_hides_semicolon() {
    let buffer = "SELECT [a;b] FROM t; SELECT 2;";

    let mssql = Segmenter::new(Dialect::Mssql.segmenter_options()).segment(buffer);
    let texts: Vec<_> = mssql.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(texts, vec!["SELECT [a;b] FROM t", "SELECT 2"]);

    let postgres = Segmenter::new(Dialect::Postgres.segmenter_options()).segment(buffer);
    assert_eq!(postgres.len(), 3);
}
