//! Template compiler.
//!
//! A single left-to-right scan over the source with recursive descent for
//! call arguments. Nested sequences are written into a
//! [`TemplateBuilder`](crate::ast::template::TemplateBuilder) arena as soon
//! as they are complete.
//!
//! Use [`compile`] to turn source text into a [`Template`], which can then
//! be evaluated via [`crate::evaluate`] any number of times.
//!
//! Grammar:
//!
//! ```text
//! template   := segment*
//! segment    := literal | field_ref | call
//! field_ref  := '%' identifier '%'
//! call       := '$' identifier '(' arglist? ')'
//! arglist    := template (',' template)*
//! ```

use tracing::debug;

use crate::ast::span::{Span, Spanned};
use crate::ast::template::{ArgList, Node, NodeKind, Template, TemplateBuilder};
use crate::error::{CompileError, CompileErrorKind};

mod cursor;

use cursor::Cursor;

/// Default limit on call nesting, see [`CompileOptions::max_depth`].
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Configuration for template compilation.
///
/// ```rust
/// use trackfmt::{compile_with_options, CompileErrorKind, CompileOptions};
///
/// let opts = CompileOptions::new().max_depth(1);
/// assert!(compile_with_options("$upper(%title%)", opts).is_ok());
///
/// let err = compile_with_options("$upper($lower(%title%))", opts).unwrap_err();
/// assert_eq!(err.kind, CompileErrorKind::NestingTooDeep { limit: 1 });
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Maximum call nesting depth. Deeper templates fail with
    /// [`NestingTooDeep`](CompileErrorKind::NestingTooDeep) instead of
    /// growing the parser's stack without bound.
    pub max_depth: usize,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_depth(mut self, limit: usize) -> Self {
        self.max_depth = limit;
        self
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Compile source text into a [`Template`] with default options.
///
/// Compilation either fully succeeds or returns the first
/// [`CompileError`]; no partial template is ever produced. Function names
/// are not checked here, so `$nosuchfn(x)` compiles fine.
pub fn compile(source: &str) -> Result<Template, CompileError> {
    compile_with_options(source, CompileOptions::default())
}

/// Compile source text into a [`Template`] with custom options.
pub fn compile_with_options(
    source: &str,
    options: CompileOptions,
) -> Result<Template, CompileError> {
    let result = Parser::new(source, options).parse_template();
    match &result {
        Ok(template) => debug!(
            len = source.len(),
            nodes = template.node_count(),
            depth = template.depth(),
            "compiled template"
        ),
        Err(err) => debug!(
            code = err.kind.code(),
            offset = err.offset(),
            "template failed to compile"
        ),
    }
    result
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

fn is_escapable(ch: char) -> bool {
    matches!(ch, '%' | '$' | '(' | ')' | ',' | '\\')
}

/// Where a sequence is being parsed. Inside an argument, `,` and `)` end
/// the sequence; at the top level they are plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    TopLevel,
    Argument,
}

struct Parser<'a> {
    cursor: Cursor<'a>,
    builder: TemplateBuilder,
    max_depth: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, options: CompileOptions) -> Self {
        Self {
            cursor: Cursor::new(source),
            builder: TemplateBuilder::new(),
            max_depth: options.max_depth,
            depth: 0,
        }
    }

    fn parse_template(mut self) -> Result<Template, CompileError> {
        let root = self.parse_sequence(Context::TopLevel)?;
        let limit = self.builder.limit();
        self.builder.finish(root).ok_or(CompileError::new(
            CompileErrorKind::TemplateTooLarge { limit },
            Span::at(self.cursor.pos()),
        ))
    }

    // -- Sequences -------------------------------------------------------

    fn parse_sequence(&mut self, context: Context) -> Result<Vec<Node>, CompileError> {
        let mut nodes = Vec::new();
        let mut literal = String::new();
        let mut literal_start = self.cursor.pos();
        // Bare parentheses opened inside the current argument.
        let mut groups = 0usize;

        while let Some(ch) = self.cursor.peek() {
            match ch {
                '%' | '$' => {
                    self.flush_literal(&mut nodes, &mut literal, literal_start)?;
                    let node = if ch == '%' {
                        self.parse_field()?
                    } else {
                        self.parse_call()?
                    };
                    nodes.push(node);
                    literal_start = self.cursor.pos();
                }
                '\\' => self.parse_escape(&mut literal)?,
                ',' | ')' if context == Context::Argument && groups == 0 => break,
                '(' if context == Context::Argument => {
                    groups += 1;
                    literal.push(ch);
                    self.cursor.bump();
                }
                ')' if context == Context::Argument => {
                    groups -= 1;
                    literal.push(ch);
                    self.cursor.bump();
                }
                _ => {
                    literal.push(ch);
                    self.cursor.bump();
                }
            }
        }

        self.flush_literal(&mut nodes, &mut literal, literal_start)?;
        Ok(nodes)
    }

    fn flush_literal(
        &mut self,
        nodes: &mut Vec<Node>,
        literal: &mut String,
        start: usize,
    ) -> Result<(), CompileError> {
        if literal.is_empty() {
            return Ok(());
        }
        let text = self.builder.push_text(literal).ok_or_else(|| self.too_large())?;
        nodes.push(Spanned::new(
            NodeKind::Literal(text),
            Span::new(start, self.cursor.pos()),
        ));
        literal.clear();
        Ok(())
    }

    fn parse_escape(&mut self, literal: &mut String) -> Result<(), CompileError> {
        let start = self.cursor.pos();
        self.cursor.bump();
        match self.cursor.bump() {
            Some(ch) if is_escapable(ch) => literal.push(ch),
            Some(ch) => {
                literal.push('\\');
                literal.push(ch);
            }
            None => {
                return Err(
                    CompileError::new(CompileErrorKind::DanglingEscape, Span::at(start))
                        .with_hint("write '\\\\' for a literal backslash"),
                );
            }
        }
        Ok(())
    }

    // -- Field references ------------------------------------------------

    fn parse_field(&mut self) -> Result<Node, CompileError> {
        let start = self.cursor.pos();
        self.cursor.bump();
        let name = self.cursor.eat_while(is_ident_char);

        match self.cursor.peek() {
            Some('%') if name.is_empty() => Err(CompileError::new(
                CompileErrorKind::EmptyIdentifier,
                Span::new(start, start + 2),
            )
            .with_hint("write '\\%' for a literal percent sign")),
            Some('%') => {
                self.cursor.bump();
                let name = self.builder.push_text(name).ok_or_else(|| self.too_large())?;
                Ok(Spanned::new(
                    NodeKind::Field(name),
                    Span::new(start, self.cursor.pos()),
                ))
            }
            // With a closing '%' further on, the name itself is malformed.
            Some(ch) if self.cursor.rest()[ch.len_utf8()..].contains('%') => Err(
                CompileError::new(
                    CompileErrorKind::InvalidIdentifier(ch),
                    Span::new(self.cursor.pos(), self.cursor.pos() + ch.len_utf8()),
                )
                .with_hint("field names may only contain letters, digits and '_'"),
            ),
            _ => Err(
                CompileError::new(CompileErrorKind::UnterminatedField, Span::at(start))
                    .with_hint("write '\\%' for a literal percent sign"),
            ),
        }
    }

    // -- Calls -----------------------------------------------------------

    fn parse_call(&mut self) -> Result<Node, CompileError> {
        let start = self.cursor.pos();
        self.cursor.bump();
        let name = self.cursor.eat_while(is_ident_char);

        if name.is_empty() {
            return Err(
                CompileError::new(CompileErrorKind::EmptyIdentifier, Span::at(start))
                    .with_hint("write '\\$' for a literal dollar sign"),
            );
        }

        if !self.cursor.eat('(') {
            let kind = if self.cursor.peek().is_none() {
                CompileErrorKind::UnterminatedCall
            } else {
                CompileErrorKind::ExpectedArgumentList
            };
            return Err(CompileError::new(kind, Span::new(start, self.cursor.pos())));
        }

        if self.depth >= self.max_depth {
            return Err(CompileError::new(
                CompileErrorKind::NestingTooDeep {
                    limit: self.max_depth,
                },
                Span::new(start, self.cursor.pos()),
            ));
        }

        self.depth += 1;
        let args = self.parse_arguments(start)?;
        self.depth -= 1;

        let name = self.builder.push_text(name).ok_or_else(|| self.too_large())?;
        Ok(Spanned::new(
            NodeKind::Call { name, args },
            Span::new(start, self.cursor.pos()),
        ))
    }

    /// Parse everything after a call's `(` up to and including its `)`.
    fn parse_arguments(&mut self, call_start: usize) -> Result<ArgList, CompileError> {
        let mut args = Vec::new();

        if !self.cursor.eat(')') {
            loop {
                let nodes = self.parse_sequence(Context::Argument)?;
                let seq = self.builder.finish_seq(nodes).ok_or_else(|| self.too_large())?;
                args.push(seq);

                match self.cursor.bump() {
                    Some(')') => break,
                    // ','
                    Some(_) => {}
                    None => {
                        return Err(CompileError::new(
                            CompileErrorKind::UnterminatedCall,
                            Span::new(call_start, self.cursor.pos()),
                        )
                        .with_hint("close the argument list with ')'"));
                    }
                }
            }
        }

        self.builder.finish_args(args).ok_or_else(|| self.too_large())
    }

    fn too_large(&self) -> CompileError {
        CompileError::new(
            CompileErrorKind::TemplateTooLarge {
                limit: self.builder.limit(),
            },
            Span::at(self.cursor.pos()),
        )
    }
}
