//! Unit tests for spans and the line index.

use indoc::indoc;

use super::source::{SourceFile, Span};

#[test]
fn line_col_of_offsets() {
    let file = SourceFile::new(
        "test.vp",
        indoc! {"
            a = 1
            b = 2
        "},
    );
    assert_eq!(file.line_count(), 3); // two lines plus trailing newline

    let lc = file.line_col(0);
    assert_eq!((lc.line, lc.col), (1, 1));

    let lc = file.line_col(4); // the `1`
    assert_eq!((lc.line, lc.col), (1, 5));

    let lc = file.line_col(6); // the `b`
    assert_eq!((lc.line, lc.col), (2, 1));
}

#[test]
fn slice_and_cover() {
    let file = SourceFile::new("test.vp", "x = 10 + 2");
    let lhs = Span::new(4, 6);
    let rhs = Span::new(9, 10);
    assert_eq!(file.slice(lhs), "10");
    assert_eq!(file.slice(rhs), "2");
    assert_eq!(file.slice(lhs.cover(rhs)), "10 + 2");
}

#[test]
fn empty_file_has_one_line() {
    let file = SourceFile::new("empty.vp", "");
    assert_eq!(file.line_count(), 1);
    let lc = file.line_col(0);
    assert_eq!((lc.line, lc.col), (1, 1));
}

#[test]
fn line_of_span() {
    let file = SourceFile::new("test.vp", "a = 1\nb = 2\nc = 3\n");
    assert_eq!(file.line_of(Span::new(12, 13)), 3);
}
