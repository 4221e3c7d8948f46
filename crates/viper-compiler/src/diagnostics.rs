//! Compiler errors and their rendering.
//!
//! Every error carries a byte span into the source; rendering attaches the
//! source window through `annotate-snippets`. There is no recoverable error
//! path: the first error aborts the pipeline and the CLI exits 1.

use annotate_snippets::{AnnotationKind, Group, Level, Renderer, Snippet};
use viper_core::{SourceFile, Span};

/// The four externally distinguished error classes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ErrorKind {
    /// Malformed input surface: bad indentation, unexpected token, bad
    /// unpacking target.
    Syntax,
    /// Operator result untyped, arity/kwarg mismatch, calling a
    /// non-callable, incompatible re-assignment.
    Type,
    /// Identifier not in any scope, unknown class member, unknown container
    /// builtin method.
    Name,
    /// Recognized by the parser but not lowerable (tuples, slices,
    /// comprehensions, `with`, imports, ...).
    Unsupported,
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::Type => "TypeError",
            ErrorKind::Name => "NameError",
            ErrorKind::Unsupported => "Unsupported",
        }
    }
}

/// A located, fatal compiler error.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{}: {}", .kind.label(), .message)]
pub struct CompileError {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Span,
}

impl CompileError {
    pub fn new(kind: ErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
        }
    }

    pub fn syntax(span: Span, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, span, message)
    }

    pub fn type_error(span: Span, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Type, span, message)
    }

    pub fn name_error(span: Span, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Name, span, message)
    }

    pub fn unsupported(span: Span, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unsupported, span, message)
    }
}

/// Renderer for compile errors with source context.
pub struct ErrorPrinter<'e, 's> {
    error: &'e CompileError,
    source: &'s SourceFile,
    colored: bool,
}

impl<'e, 's> ErrorPrinter<'e, 's> {
    pub fn new(error: &'e CompileError, source: &'s SourceFile) -> Self {
        Self {
            error,
            source,
            colored: false,
        }
    }

    pub fn colored(mut self, value: bool) -> Self {
        self.colored = value;
        self
    }

    pub fn render(&self) -> String {
        let renderer = if self.colored {
            Renderer::styled()
        } else {
            Renderer::plain()
        };

        let title = format!("{}: {}", self.error.kind.label(), self.error.message);
        let range = adjust_range(self.error.span, self.source.text().len());

        let snippet = Snippet::source(self.source.text())
            .line_start(1)
            .path(self.source.path())
            .annotation(AnnotationKind::Primary.span(range).label(&self.error.message));

        let report: Vec<Group> = vec![Level::ERROR.primary_title(&title).element(snippet)];
        renderer.render(&report)
    }
}

/// Widen zero-length spans so the caret has something to point at.
fn adjust_range(span: Span, limit: usize) -> std::ops::Range<usize> {
    let start = span.start as usize;
    let end = span.end as usize;
    if start == end {
        return start..(start + 1).min(limit);
    }
    start..end
}
