//! Error types for compilation and strict evaluation.
//!
//! [`CompileError`] is produced when a template source is malformed and
//! carries the source span for diagnostic formatting. [`EvalError`] only
//! surfaces when evaluating in strict mode; the default evaluation path
//! degrades every anomaly to empty text instead.

use crate::ast::span::Span;
use std::sync::Arc;
use thiserror::Error;

// ── Compile errors ──────────────────────────────────────────────────────

/// Why a template failed to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CompileErrorKind {
    #[error("unterminated field reference")]
    UnterminatedField,
    #[error("unterminated function call")]
    UnterminatedCall,
    #[error("expected '(' after function name")]
    ExpectedArgumentList,
    #[error("empty identifier")]
    EmptyIdentifier,
    #[error("invalid character {0:?} in field name")]
    InvalidIdentifier(char),
    #[error("dangling escape at end of input")]
    DanglingEscape,
    #[error("calls nested deeper than {limit} levels")]
    NestingTooDeep { limit: usize },
    #[error("template holds more than {limit} text bytes, nodes or arguments")]
    TemplateTooLarge { limit: usize },
}

impl CompileErrorKind {
    /// Stable reason code, suitable as a key for localized messages.
    pub fn code(&self) -> &'static str {
        match self {
            CompileErrorKind::UnterminatedField => "unterminated-field",
            CompileErrorKind::UnterminatedCall => "unterminated-call",
            CompileErrorKind::ExpectedArgumentList => "expected-argument-list",
            CompileErrorKind::EmptyIdentifier => "empty-identifier",
            CompileErrorKind::InvalidIdentifier(_) => "invalid-identifier",
            CompileErrorKind::DanglingEscape => "dangling-escape",
            CompileErrorKind::NestingTooDeep { .. } => "nesting-too-deep",
            CompileErrorKind::TemplateTooLarge { .. } => "template-too-large",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at offset {}", .span.start)]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub span: Span,
    pub hint: Option<String>,
}

impl CompileError {
    pub fn new(kind: CompileErrorKind, span: Span) -> Self {
        Self {
            kind,
            span,
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Byte offset of the offending character.
    pub fn offset(&self) -> usize {
        self.span.start
    }

    /// Format the error with source context for display
    pub fn format_with_source(&self, source: &str, template_name: Option<&str>) -> String {
        let (line, col) = offset_to_line_col(source, self.span.start);
        let source_line = source.lines().nth(line.saturating_sub(1)).unwrap_or("");

        let location = if let Some(name) = template_name {
            format!(" --> {name}:{line}:{col}")
        } else {
            format!(" --> {line}:{col}")
        };

        let pointer = " ".repeat(col.saturating_sub(1)) + &"^".repeat(self.span.len().max(1));

        let mut output = format!(
            "Error: {}\n{location}\n  |\n{line:>3} | {source_line}\n    | {pointer}",
            self.kind
        );

        if let Some(hint) = &self.hint {
            output.push_str(&format!("\n  = hint: {hint}"));
        }

        output
    }
}

fn offset_to_line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;
    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

// ── Eval errors ─────────────────────────────────────────────────────────

/// An anomaly hit while evaluating in strict mode.
///
/// Carries a structured [`EvalErrorKind`], a human-readable message, an
/// optional source [`Span`] of the call that failed, and an optional
/// underlying cause.
///
/// A [`TemplateFunction`](crate::TemplateFunction) that wraps a fallible
/// operation can keep the original error using
/// [`with_source`](EvalError::with_source):
///
/// ```rust
/// use trackfmt::EvalError;
///
/// fn parse_rating(text: &str) -> Result<u8, EvalError> {
///     text.parse::<u8>()
///         .map_err(|e| EvalError::function_error("rating", "not a rating").with_source(e))
/// }
/// assert!(parse_rating("five").is_err());
/// ```
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub span: Option<Span>,
    pub message: String,
    /// Wrapped in `Arc` so that `EvalError` remains `Clone`.
    #[source]
    pub source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl EvalError {
    pub fn new(kind: EvalErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            span: None,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Attach an underlying error cause to this evaluation error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    pub fn unknown_function(name: &str) -> Self {
        Self::new(
            EvalErrorKind::UnknownFunction,
            format!("unknown function: {name}"),
        )
    }

    pub fn arity_mismatch(name: &str, expected: impl std::fmt::Display, got: usize) -> Self {
        Self::new(
            EvalErrorKind::ArityMismatch,
            format!("{name} expects {expected} argument(s), got {got}"),
        )
    }

    pub fn type_mismatch(expected: &str, got: &str) -> Self {
        Self::new(
            EvalErrorKind::TypeMismatch,
            format!("expected {expected}, got {got:?}"),
        )
    }

    pub fn function_error(name: &str, message: impl std::fmt::Display) -> Self {
        Self::new(EvalErrorKind::FunctionError, format!("{name}: {message}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalErrorKind {
    UnknownFunction,
    ArityMismatch,
    /// An operand or field value could not be used as the required type.
    TypeMismatch,
    /// Calls nested deeper than the evaluation depth limit.
    RecursionLimit,
    /// A registered function reported its own failure.
    FunctionError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reason_codes_are_distinct() {
        let kinds = [
            CompileErrorKind::UnterminatedField,
            CompileErrorKind::UnterminatedCall,
            CompileErrorKind::ExpectedArgumentList,
            CompileErrorKind::EmptyIdentifier,
            CompileErrorKind::InvalidIdentifier(' '),
            CompileErrorKind::DanglingEscape,
            CompileErrorKind::NestingTooDeep { limit: 4 },
            CompileErrorKind::TemplateTooLarge { limit: 4 },
        ];
        let mut codes: Vec<_> = kinds.iter().map(|k| k.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn test_display_includes_offset() {
        let err = CompileError::new(CompileErrorKind::UnterminatedField, Span::at(6));
        assert_eq!(err.to_string(), "unterminated field reference at offset 6");
    }

    #[test]
    fn test_format_with_source_points_at_offset() {
        let source = "%artist% - %title";
        let err = CompileError::new(CompileErrorKind::UnterminatedField, Span::at(11))
            .with_hint("close the field with '%'");
        let rendered = err.format_with_source(source, Some("playlist"));
        let expected = format!(
            "Error: unterminated field reference\n --> playlist:1:12\n  |\n  1 | %artist% - %title\n    | {}^\n  = hint: close the field with '%'",
            " ".repeat(11)
        );
        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_format_with_source_second_line() {
        let source = "line one\n$upper(";
        let err = CompileError::new(CompileErrorKind::UnterminatedCall, Span::new(9, 16));
        let rendered = err.format_with_source(source, None);
        assert!(rendered.contains(" --> 2:1"));
        assert!(rendered.contains("  2 | $upper("));
        assert!(rendered.ends_with("| ^^^^^^^"));
    }

    #[test]
    fn test_eval_error_keeps_source() {
        let cause = "x".parse::<i64>().unwrap_err();
        let err = EvalError::function_error("left", "bad count").with_source(cause);
        let cloned = err.clone();
        assert_eq!(cloned.kind, EvalErrorKind::FunctionError);
        assert!(std::error::Error::source(&cloned).is_some());
        assert_eq!(cloned.to_string(), "left: bad count");
    }
}
