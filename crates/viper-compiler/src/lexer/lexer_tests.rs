//! Unit tests for the lexer and layout pass.

use indoc::indoc;

use super::{Keyword, TokenKind, lex, token_text};
use crate::op::Op;

fn kinds(source: &str) -> Vec<TokenKind> {
    lex(source).unwrap().into_iter().map(|t| t.kind).collect()
}

#[test]
fn simple_assignment() {
    assert_eq!(
        kinds("x = 1\n"),
        vec![
            TokenKind::Ident,
            TokenKind::Op(Op::Assign),
            TokenKind::Number,
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn indentation_opens_and_closes_blocks() {
    let source = indoc! {"
        if x:
            y = 1
        z = 2
    "};
    assert_eq!(
        kinds(source),
        vec![
            TokenKind::Keyword(Keyword::If),
            TokenKind::Ident,
            TokenKind::Colon,
            TokenKind::Newline,
            TokenKind::BlockBegin,
            TokenKind::Ident,
            TokenKind::Op(Op::Assign),
            TokenKind::Number,
            TokenKind::Newline,
            TokenKind::BlockEnd,
            TokenKind::Ident,
            TokenKind::Op(Op::Assign),
            TokenKind::Number,
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn eof_closes_open_blocks() {
    let source = "def f():\n    return 1";
    let ks = kinds(source);
    let ends = ks.iter().filter(|k| **k == TokenKind::BlockEnd).count();
    let begins = ks.iter().filter(|k| **k == TokenKind::BlockBegin).count();
    assert_eq!(begins, 1);
    assert_eq!(ends, 1);
    assert_eq!(*ks.last().unwrap(), TokenKind::Eof);
    // the final line gets its newline even without one in the source
    assert!(ks.contains(&TokenKind::Newline));
}

#[test]
fn newlines_suppressed_inside_brackets() {
    let source = "x = [1,\n     2,\n     3]\n";
    let ks = kinds(source);
    assert_eq!(ks.iter().filter(|k| **k == TokenKind::Newline).count(), 1);
    assert!(!ks.contains(&TokenKind::BlockBegin));
}

#[test]
fn blank_lines_and_comments_vanish() {
    let source = indoc! {"
        a = 1

        # a comment
        b = 2
    "};
    let ks = kinds(source);
    assert_eq!(ks.iter().filter(|k| **k == TokenKind::Newline).count(), 2);
}

#[test]
fn multichar_operators() {
    assert_eq!(
        kinds("a **= 2 // 3\n"),
        vec![
            TokenKind::Ident,
            TokenKind::Op(Op::PowAssign),
            TokenKind::Number,
            TokenKind::Op(Op::FloorDiv),
            TokenKind::Number,
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn string_span_includes_quotes() {
    let source = "s = \"hi\"\n";
    let tokens = lex(source).unwrap();
    let s = tokens.iter().find(|t| t.kind == TokenKind::Str).unwrap();
    assert_eq!(token_text(source, s), "\"hi\"");
}

#[test]
fn bad_dedent_is_an_error() {
    let source = "if x:\n        y = 1\n    z = 2\n";
    assert!(lex(source).is_err());
}

#[test]
fn unbalanced_bracket_is_an_error() {
    assert!(lex("x = (1\n").is_err());
    assert!(lex("x = 1)\n").is_err());
}

#[test]
fn keywords_are_recognized() {
    let ks = kinds("for x in y:\n    pass\n");
    assert_eq!(ks[0], TokenKind::Keyword(Keyword::For));
    assert_eq!(ks[2], TokenKind::Keyword(Keyword::In));
    assert!(ks.contains(&TokenKind::Keyword(Keyword::Pass)));
}

#[test]
fn arrow_token() {
    let ks = kinds("def f() -> int:\n    pass\n");
    assert!(ks.contains(&TokenKind::Arrow));
}
