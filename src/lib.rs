//! # trackfmt
//!
//! A small template language for turning music-metadata records into
//! display strings. Templates mix literal text, `%field%` references and
//! `$function(arg,...)` calls; they are compiled once and then evaluated
//! any number of times against different records.
//!
//! The crate is split into two layers:
//!
//! - **The language** (compiling, node model, evaluation) lives here and
//!   knows nothing about where metadata comes from.
//! - **The host** implements [`Record`] to expose a track's fields and may
//!   extend a [`Registry`] with its own functions.
//!
//! ## Quick start
//!
//! ```rust
//! use trackfmt::{render, SimpleRecord};
//!
//! let record = SimpleRecord::new()
//!     .with("artist", "Miles Davis")
//!     .with("title", "So What");
//!
//! let output = render("%artist% - $upper(%title%)", &record).unwrap();
//! assert_eq!(output, "Miles Davis - SO WHAT");
//! ```
//!
//! ## Compiled templates
//!
//! For track lists, compile once with [`CompiledTemplate::compile`] and
//! evaluate per row:
//!
//! ```rust
//! use trackfmt::{CompiledTemplate, SimpleRecord};
//!
//! let template = CompiledTemplate::compile("$if(%track%,%track%. ,)%title%").unwrap();
//!
//! let first = SimpleRecord::new().with("track", 1i64).with("title", "So What");
//! let bonus = SimpleRecord::new().with("title", "Flamenco Sketches (alt)");
//! assert_eq!(template.evaluate(&first), "1. So What");
//! assert_eq!(template.evaluate(&bonus), "Flamenco Sketches (alt)");
//! ```
//!
//! ## Degradation and strict mode
//!
//! Evaluation never fails by default. Missing fields, unknown functions
//! and wrong operand counts render as empty text. Use [`EvalOptions`] to
//! surface them as errors instead:
//!
//! ```rust
//! use trackfmt::{compile, evaluate, evaluate_with_options, EvalOptions, Registry, SimpleRecord};
//!
//! let template = compile("[$nosuchfn(%title%)]").unwrap();
//! let record = SimpleRecord::new();
//! assert_eq!(evaluate(&template, &record), "[]");
//!
//! let opts = EvalOptions::new().strict(true);
//! assert!(evaluate_with_options(&template, &record, Registry::builtins(), opts).is_err());
//! ```

pub mod ast;
pub mod error;
pub mod eval;
mod parser;
pub mod registry;

use std::str::FromStr;

pub use ast::span::{Span, Spanned};
pub use ast::template::Template;
pub use ast::value::Value;
pub use error::{CompileError, CompileErrorKind, EvalError, EvalErrorKind};
pub use eval::{
    Args, EvalOptions, Record, SimpleRecord, evaluate, evaluate_with, evaluate_with_options,
};
pub use parser::{CompileOptions, DEFAULT_MAX_DEPTH, compile, compile_with_options};
pub use registry::{Arity, ClosureFunction, Registry, Signature, TemplateFunction};

/// Compile source text and evaluate it in a single step with the builtin
/// functions.
///
/// For repeated evaluation of the same source, prefer [`CompiledTemplate`]
/// to avoid recompiling.
pub fn render(source: &str, record: &impl Record) -> Result<String, CompileError> {
    let template = compile(source)?;
    Ok(evaluate(&template, record))
}

/// A compiled template kept together with its source text.
///
/// Compiling is the expensive half of formatting. A `CompiledTemplate` is
/// immutable, `Send + Sync`, and can be shared across threads and evaluated
/// against any number of records.
///
/// ```rust
/// use trackfmt::{CompiledTemplate, SimpleRecord};
///
/// let template: CompiledTemplate = "%album% ($default(%year%,n.d.))".parse().unwrap();
/// assert_eq!(template.source(), "%album% ($default(%year%,n.d.))");
///
/// let mut record = SimpleRecord::new().with("album", "Kind of Blue");
/// assert_eq!(template.evaluate(&record), "Kind of Blue (n.d.)");
///
/// record.set("year", 1959i64);
/// assert_eq!(template.evaluate(&record), "Kind of Blue (1959)");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTemplate {
    source: String,
    template: Template,
}

impl CompiledTemplate {
    /// Compile source text with the default options.
    pub fn compile(source: &str) -> Result<Self, CompileError> {
        Self::compile_with_options(source, CompileOptions::default())
    }

    pub fn compile_with_options(
        source: &str,
        options: CompileOptions,
    ) -> Result<Self, CompileError> {
        let template = compile_with_options(source, options)?;
        Ok(Self {
            source: source.to_string(),
            template,
        })
    }

    /// Evaluate against a record with the builtin functions.
    pub fn evaluate(&self, record: &impl Record) -> String {
        evaluate(&self.template, record)
    }

    /// Evaluate against a record with a custom registry.
    pub fn evaluate_with(&self, record: &impl Record, registry: &Registry) -> String {
        evaluate_with(&self.template, record, registry)
    }

    /// Evaluate with custom options.
    pub fn evaluate_with_options(
        &self,
        record: &impl Record,
        registry: &Registry,
        options: EvalOptions,
    ) -> Result<String, EvalError> {
        evaluate_with_options(&self.template, record, registry, options)
    }

    /// The source text this template was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Access the underlying node tree for inspection or analysis.
    pub fn ast(&self) -> &Template {
        &self.template
    }
}

impl FromStr for CompiledTemplate {
    type Err = CompileError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        Self::compile(source)
    }
}
