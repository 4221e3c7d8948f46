//! Lexer for the source language.
//!
//! Two stages: a `logos`-derived raw scanner that produces span-based tokens
//! without storing text, and a layout pass that turns raw newlines and
//! leading whitespace into the indentation structure
//! (`BlockBegin`/`BlockEnd`/`Newline`) the parser consumes. Newlines are
//! suppressed while any bracket is open; comments and blank lines vanish.
//!
//! Consecutive unrecognizable characters are coalesced into one error rather
//! than reported one by one.

mod layout;

#[cfg(test)]
mod lexer_tests;

use logos::Logos;
use serde::Serialize;
use viper_core::Span;

use crate::diagnostics::CompileError;
use crate::op::Op;

pub use layout::lex;

/// Reserved words. All of them are recognized here; several are rejected
/// later (`import`, `with`, `lambda`, ...) so the message can say what they
/// are rather than "unexpected token".
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum Keyword {
    And,
    As,
    Assert,
    Break,
    Class,
    Continue,
    Def,
    Del,
    Elif,
    Else,
    Except,
    False,
    Finally,
    For,
    From,
    Global,
    If,
    Import,
    In,
    Is,
    Lambda,
    None,
    Nonlocal,
    Not,
    Or,
    Pass,
    Raise,
    Return,
    True,
    Try,
    While,
    With,
    Yield,
}

impl Keyword {
    pub fn from_str(word: &str) -> Option<Keyword> {
        let kw = match word {
            "and" => Keyword::And,
            "as" => Keyword::As,
            "assert" => Keyword::Assert,
            "break" => Keyword::Break,
            "class" => Keyword::Class,
            "continue" => Keyword::Continue,
            "def" => Keyword::Def,
            "del" => Keyword::Del,
            "elif" => Keyword::Elif,
            "else" => Keyword::Else,
            "except" => Keyword::Except,
            "False" => Keyword::False,
            "finally" => Keyword::Finally,
            "for" => Keyword::For,
            "from" => Keyword::From,
            "global" => Keyword::Global,
            "if" => Keyword::If,
            "import" => Keyword::Import,
            "in" => Keyword::In,
            "is" => Keyword::Is,
            "lambda" => Keyword::Lambda,
            "None" => Keyword::None,
            "nonlocal" => Keyword::Nonlocal,
            "not" => Keyword::Not,
            "or" => Keyword::Or,
            "pass" => Keyword::Pass,
            "raise" => Keyword::Raise,
            "return" => Keyword::Return,
            "True" => Keyword::True,
            "try" => Keyword::Try,
            "while" => Keyword::While,
            "with" => Keyword::With,
            "yield" => Keyword::Yield,
            _ => return None,
        };
        Some(kw)
    }
}

/// Structured token kind after the layout pass.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum TokenKind {
    Ident,
    Number,
    /// String literal; the span includes the quotes.
    Str,
    Keyword(Keyword),
    Op(Op),
    Comma,
    Colon,
    Dot,
    Arrow,
    OpenParen,
    CloseParen,
    OpenSquare,
    CloseSquare,
    OpenCurly,
    CloseCurly,
    Newline,
    BlockBegin,
    BlockEnd,
    Eof,
}

/// Zero-copy token: kind + span, text retrieved via [`token_text`].
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    #[inline]
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Retrieves the text slice for a token. O(1) slice into source.
#[inline]
pub fn token_text<'s>(source: &'s str, token: &Token) -> &'s str {
    &source[token.span.range()]
}

/// Raw scanner kinds, before layout.
#[derive(Logos, Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum RawKind {
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    #[regex(r"[0-9][0-9_]*(\.[0-9]*)?f?")]
    Number,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    #[regex(r#"'([^'\\\n]|\\.)*'"#)]
    Str,

    #[regex(r"#[^\n]*", allow_greedy = true)]
    Comment,

    #[regex(r"[ \t\r]+")]
    Whitespace,

    #[token("\n")]
    Newline,

    // Three-char operators before their two-char prefixes.
    #[token("//=")]
    FloorDivAssign,
    #[token("**=")]
    PowAssign,
    #[token(">>=")]
    RshiftAssign,
    #[token("<<=")]
    LshiftAssign,

    #[token("**")]
    Pow,
    #[token("//")]
    FloorDiv,
    #[token("==")]
    Equal,
    #[token("!=")]
    NotEqual,
    #[token(">=")]
    GreaterEqual,
    #[token("<=")]
    LessEqual,
    #[token("<<")]
    Lshift,
    #[token(">>")]
    Rshift,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    MultAssign,
    #[token("/=")]
    DivAssign,
    #[token("%=")]
    ModAssign,
    #[token("&=")]
    AndAssign,
    #[token("|=")]
    OrAssign,
    #[token("^=")]
    XorAssign,
    #[token("->")]
    Arrow,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Mult,
    #[token("/")]
    Div,
    #[token("%")]
    Mod,
    #[token("=")]
    Assign,
    #[token(">")]
    Greater,
    #[token("<")]
    Less,
    #[token("&")]
    BitwiseAnd,
    #[token("|")]
    BitwiseOr,
    #[token("^")]
    BitwiseXor,
    #[token("~")]
    BitwiseNot,

    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("(")]
    OpenParen,
    #[token(")")]
    CloseParen,
    #[token("[")]
    OpenSquare,
    #[token("]")]
    CloseSquare,
    #[token("{")]
    OpenCurly,
    #[token("}")]
    CloseCurly,
}

impl RawKind {
    /// The structured kind for a raw punctuation/operator token. `None` for
    /// the kinds layout handles itself (whitespace, comments, newlines) and
    /// for identifiers/numbers/strings which need the source text.
    pub(crate) fn plain_kind(self) -> Option<TokenKind> {
        let kind = match self {
            RawKind::FloorDivAssign => TokenKind::Op(Op::FloorDivAssign),
            RawKind::PowAssign => TokenKind::Op(Op::PowAssign),
            RawKind::RshiftAssign => TokenKind::Op(Op::RshiftAssign),
            RawKind::LshiftAssign => TokenKind::Op(Op::LshiftAssign),
            RawKind::Pow => TokenKind::Op(Op::Pow),
            RawKind::FloorDiv => TokenKind::Op(Op::FloorDiv),
            RawKind::Equal => TokenKind::Op(Op::Equal),
            RawKind::NotEqual => TokenKind::Op(Op::NotEqual),
            RawKind::GreaterEqual => TokenKind::Op(Op::GreaterEqual),
            RawKind::LessEqual => TokenKind::Op(Op::LessEqual),
            RawKind::Lshift => TokenKind::Op(Op::Lshift),
            RawKind::Rshift => TokenKind::Op(Op::Rshift),
            RawKind::PlusAssign => TokenKind::Op(Op::PlusAssign),
            RawKind::MinusAssign => TokenKind::Op(Op::MinusAssign),
            RawKind::MultAssign => TokenKind::Op(Op::MultAssign),
            RawKind::DivAssign => TokenKind::Op(Op::DivAssign),
            RawKind::ModAssign => TokenKind::Op(Op::ModAssign),
            RawKind::AndAssign => TokenKind::Op(Op::AndAssign),
            RawKind::OrAssign => TokenKind::Op(Op::OrAssign),
            RawKind::XorAssign => TokenKind::Op(Op::XorAssign),
            RawKind::Arrow => TokenKind::Arrow,
            RawKind::Plus => TokenKind::Op(Op::Plus),
            RawKind::Minus => TokenKind::Op(Op::Minus),
            RawKind::Mult => TokenKind::Op(Op::Mult),
            RawKind::Div => TokenKind::Op(Op::Div),
            RawKind::Mod => TokenKind::Op(Op::Mod),
            RawKind::Assign => TokenKind::Op(Op::Assign),
            RawKind::Greater => TokenKind::Op(Op::Greater),
            RawKind::Less => TokenKind::Op(Op::Less),
            RawKind::BitwiseAnd => TokenKind::Op(Op::BitwiseAnd),
            RawKind::BitwiseOr => TokenKind::Op(Op::BitwiseOr),
            RawKind::BitwiseXor => TokenKind::Op(Op::BitwiseXor),
            RawKind::BitwiseNot => TokenKind::Op(Op::BitwiseNot),
            RawKind::Comma => TokenKind::Comma,
            RawKind::Colon => TokenKind::Colon,
            RawKind::Dot => TokenKind::Dot,
            RawKind::OpenParen => TokenKind::OpenParen,
            RawKind::CloseParen => TokenKind::CloseParen,
            RawKind::OpenSquare => TokenKind::OpenSquare,
            RawKind::CloseSquare => TokenKind::CloseSquare,
            RawKind::OpenCurly => TokenKind::OpenCurly,
            RawKind::CloseCurly => TokenKind::CloseCurly,
            RawKind::Ident
            | RawKind::Number
            | RawKind::Str
            | RawKind::Comment
            | RawKind::Whitespace
            | RawKind::Newline => return None,
        };
        Some(kind)
    }
}

pub(crate) fn raw_lex(source: &str) -> Result<Vec<(RawKind, Span)>, CompileError> {
    let mut out = Vec::new();
    let mut lexer = RawKind::lexer(source);
    let mut error_start: Option<usize> = None;

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(kind) => {
                if let Some(start) = error_start.take() {
                    return Err(garbage_error(start, span.start));
                }
                out.push((kind, Span::new(span.start as u32, span.end as u32)));
            }
            Err(()) => {
                if error_start.is_none() {
                    error_start = Some(span.start);
                }
            }
        }
    }
    if let Some(start) = error_start {
        return Err(garbage_error(start, source.len()));
    }
    Ok(out)
}

fn garbage_error(start: usize, end: usize) -> CompileError {
    CompileError::syntax(
        Span::new(start as u32, end as u32),
        "unrecognized characters in input",
    )
}
