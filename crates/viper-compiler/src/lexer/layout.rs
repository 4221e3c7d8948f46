//! Layout pass: raw tokens to the indentation-structured stream.
//!
//! Tracks a stack of indentation widths. An increase opens a block
//! (`BlockBegin`), a decrease closes one `BlockEnd` per popped level and must
//! land exactly on an enclosing width. Inside `(` `[` `{` both newlines and
//! indentation are ignored, so expressions can span lines.

use viper_core::Span;

use super::{Keyword, RawKind, Token, TokenKind, raw_lex};
use crate::diagnostics::CompileError;

/// Tokenize a whole source file, layout applied. The stream always ends with
/// a single `Eof` token; every `BlockBegin` has a matching `BlockEnd`.
pub fn lex(source: &str) -> Result<Vec<Token>, CompileError> {
    let raw = raw_lex(source)?;
    let mut layout = Layout::new(source);
    for &(kind, span) in &raw {
        layout.push_raw(kind, span)?;
    }
    layout.finish(source.len() as u32)
}

struct Layout<'s> {
    source: &'s str,
    out: Vec<Token>,
    /// Enclosing indentation widths; never empty, starts at [0].
    indents: Vec<u32>,
    /// Open `(`/`[`/`{` count; newlines are suppressed while positive.
    bracket_depth: u32,
    at_line_start: bool,
    /// Width of the leading whitespace of the current line.
    line_indent: u32,
    /// Whether the current logical line produced any tokens.
    line_has_content: bool,
}

impl<'s> Layout<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            out: Vec::new(),
            indents: vec![0],
            bracket_depth: 0,
            at_line_start: true,
            line_indent: 0,
            line_has_content: false,
        }
    }

    fn push_raw(&mut self, kind: RawKind, span: Span) -> Result<(), CompileError> {
        match kind {
            RawKind::Comment => Ok(()),
            RawKind::Whitespace => {
                if self.at_line_start && !self.line_has_content {
                    self.line_indent = span.len() as u32;
                }
                Ok(())
            }
            RawKind::Newline => {
                if self.bracket_depth == 0 {
                    if self.line_has_content {
                        self.out.push(Token::new(TokenKind::Newline, span));
                    }
                    self.at_line_start = true;
                    self.line_indent = 0;
                    self.line_has_content = false;
                }
                Ok(())
            }
            _ => {
                if self.at_line_start && self.bracket_depth == 0 {
                    self.apply_indent(span)?;
                }
                self.at_line_start = false;
                self.line_has_content = true;
                self.push_token(kind, span)
            }
        }
    }

    /// Open/close blocks so the indent stack matches the current line.
    fn apply_indent(&mut self, span: Span) -> Result<(), CompileError> {
        let width = self.line_indent;
        let current = *self.indents.last().expect("indent stack never empty");

        if width > current {
            self.indents.push(width);
            self.out
                .push(Token::new(TokenKind::BlockBegin, Span::point(span.start)));
            return Ok(());
        }

        while width < *self.indents.last().expect("indent stack never empty") {
            self.indents.pop();
            self.out
                .push(Token::new(TokenKind::BlockEnd, Span::point(span.start)));
        }
        if width != *self.indents.last().expect("indent stack never empty") {
            return Err(CompileError::syntax(
                span,
                "dedent does not match any enclosing indentation level",
            ));
        }
        Ok(())
    }

    fn push_token(&mut self, kind: RawKind, span: Span) -> Result<(), CompileError> {
        let kind = match kind {
            RawKind::Ident => {
                let text = &self.source[span.range()];
                match Keyword::from_str(text) {
                    Some(kw) => TokenKind::Keyword(kw),
                    None => TokenKind::Ident,
                }
            }
            RawKind::Number => TokenKind::Number,
            RawKind::Str => TokenKind::Str,
            RawKind::OpenParen | RawKind::OpenSquare | RawKind::OpenCurly => {
                self.bracket_depth += 1;
                kind.plain_kind().expect("bracket has a plain kind")
            }
            RawKind::CloseParen | RawKind::CloseSquare | RawKind::CloseCurly => {
                if self.bracket_depth == 0 {
                    return Err(CompileError::syntax(span, "unbalanced closing bracket"));
                }
                self.bracket_depth -= 1;
                kind.plain_kind().expect("bracket has a plain kind")
            }
            other => other
                .plain_kind()
                .expect("layout handles whitespace/comment/newline before this point"),
        };
        self.out.push(Token::new(kind, span));
        Ok(())
    }

    fn finish(mut self, eof_offset: u32) -> Result<Vec<Token>, CompileError> {
        let eof = Span::point(eof_offset);
        if self.bracket_depth > 0 {
            return Err(CompileError::syntax(eof, "unclosed bracket at end of input"));
        }
        if self.line_has_content {
            self.out.push(Token::new(TokenKind::Newline, eof));
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.out.push(Token::new(TokenKind::BlockEnd, eof));
        }
        self.out.push(Token::new(TokenKind::Eof, eof));
        Ok(self.out)
    }
}
