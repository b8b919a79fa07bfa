//! Template evaluation engine.
//!
//! The evaluator walks a compiled [`Template`] depth-first against a
//! [`Record`] and concatenates the text of every node. It keeps no state
//! between calls and never mutates the template or the record.
//!
//! By default evaluation is total: a missing field, an unknown function, a
//! wrong operand count or a value with no text form contributes empty text
//! at the point where it happens and the rest of the template still
//! renders. [`EvalOptions::strict`] turns those anomalies into an
//! [`EvalError`] instead.

use tracing::trace;

use crate::ast::span::Span;
use crate::ast::template::{ArgList, Node, NodeKind, Seq, Template};
use crate::error::{EvalError, EvalErrorKind};
use crate::parser::DEFAULT_MAX_DEPTH;
use crate::registry::Registry;

mod record;

pub use record::{Record, SimpleRecord};

/// Evaluate a template against a record with the builtin functions.
///
/// Never fails; see the [module docs](self) for how anomalies degrade.
///
/// ```rust
/// use trackfmt::{compile, evaluate, SimpleRecord};
///
/// let template = compile("$if(%year%,%year%,unknown)").unwrap();
///
/// let record = SimpleRecord::new().with("year", 1999i64);
/// assert_eq!(evaluate(&template, &record), "1999");
/// assert_eq!(evaluate(&template, &SimpleRecord::new()), "unknown");
/// ```
pub fn evaluate(template: &Template, record: &impl Record) -> String {
    evaluate_with(template, record, Registry::builtins())
}

/// Evaluate a template against a record with a custom function registry.
pub fn evaluate_with(template: &Template, record: &impl Record, registry: &Registry) -> String {
    // Lenient evaluation has no error path.
    evaluate_with_options(template, record, registry, EvalOptions::default()).unwrap_or_default()
}

/// Evaluate a template with custom options.
///
/// Only returns `Err` when [`EvalOptions::strict`] is enabled.
///
/// ```rust
/// use trackfmt::{compile, evaluate_with_options, EvalErrorKind, EvalOptions, Registry, SimpleRecord};
///
/// let template = compile("$upper(%title%,extra)").unwrap();
/// let record = SimpleRecord::new().with("title", "Freddie Freeloader");
/// let registry = Registry::builtins();
///
/// let lenient = evaluate_with_options(&template, &record, registry, EvalOptions::new());
/// assert_eq!(lenient.unwrap(), "");
///
/// let strict = evaluate_with_options(&template, &record, registry, EvalOptions::new().strict(true));
/// assert_eq!(strict.unwrap_err().kind, EvalErrorKind::ArityMismatch);
/// ```
pub fn evaluate_with_options(
    template: &Template,
    record: &impl Record,
    registry: &Registry,
    options: EvalOptions,
) -> Result<String, EvalError> {
    let evaluator = Evaluator {
        template,
        record,
        registry,
        options,
    };
    let mut output = String::new();
    evaluator.eval_seq(template.root(), 0, &mut output)?;
    Ok(output)
}

// ── Evaluation options ──────────────────────────────────────────────────

/// Configuration for template evaluation.
///
/// ```rust
/// use trackfmt::EvalOptions;
///
/// let opts = EvalOptions::new().strict(true).max_depth(16);
/// assert!(opts.strict);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalOptions {
    /// When `true`, the first anomaly aborts evaluation with an
    /// [`EvalError`]. Missing fields are never anomalies.
    pub strict: bool,

    /// Maximum call nesting followed during evaluation. Calls beyond it
    /// render as empty text, or fail with
    /// [`RecursionLimit`](EvalErrorKind::RecursionLimit) in strict mode.
    pub max_depth: usize,
}

impl EvalOptions {
    /// Lenient evaluation with the default depth limit.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn max_depth(mut self, limit: usize) -> Self {
        self.max_depth = limit;
        self
    }
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            strict: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

// ── Operand access ──────────────────────────────────────────────────────

/// The operands of one call, evaluated on demand.
///
/// Each accessor evaluates the requested argument sequence against the
/// current record when it is called. Asking for an index past the end
/// yields empty text.
pub struct Args<'e, 'a> {
    evaluator: &'e Evaluator<'a>,
    seqs: &'a [Seq],
    depth: usize,
}

impl Args<'_, '_> {
    pub fn len(&self) -> usize {
        self.seqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seqs.is_empty()
    }

    /// Evaluate operand `index` to text.
    pub fn text(&self, index: usize) -> Result<String, EvalError> {
        let mut output = String::new();
        if let Some(seq) = self.seqs.get(index) {
            let nodes = self.evaluator.template.seq(*seq);
            self.evaluator.eval_seq(nodes, self.depth, &mut output)?;
        }
        Ok(output)
    }

    /// Evaluate operand `index` and apply the truthiness rule.
    pub fn is_true(&self, index: usize) -> Result<bool, EvalError> {
        Ok(!self.text(index)?.is_empty())
    }

    /// Evaluate operand `index` and parse it as a decimal integer,
    /// ignoring surrounding whitespace.
    pub fn integer(&self, index: usize) -> Result<i64, EvalError> {
        let text = self.text(index)?;
        text.trim()
            .parse()
            .map_err(|_| EvalError::type_mismatch("integer", &text))
    }

    /// Evaluate operand `index` and parse it as a float, ignoring
    /// surrounding whitespace.
    pub fn float(&self, index: usize) -> Result<f64, EvalError> {
        let text = self.text(index)?;
        text.trim()
            .parse()
            .map_err(|_| EvalError::type_mismatch("number", &text))
    }

    /// Evaluate every operand in order.
    pub fn texts(&self) -> Result<Vec<String>, EvalError> {
        (0..self.len()).map(|index| self.text(index)).collect()
    }
}

// ── Evaluator ───────────────────────────────────────────────────────────

struct Evaluator<'a> {
    template: &'a Template,
    record: &'a dyn Record,
    registry: &'a Registry,
    options: EvalOptions,
}

impl<'a> Evaluator<'a> {
    fn eval_seq(&self, nodes: &[Node], depth: usize, output: &mut String) -> Result<(), EvalError> {
        for node in nodes {
            match node.node {
                NodeKind::Literal(text) => output.push_str(self.template.text(text)),
                NodeKind::Field(name) => {
                    self.eval_field(self.template.text(name), node.span, output)?;
                }
                NodeKind::Call { name, args } => {
                    let name = self.template.text(name);
                    match self.eval_call(name, args, node.span, depth) {
                        Ok(text) => output.push_str(&text),
                        Err(err) if self.options.strict => return Err(err),
                        Err(err) => {
                            trace!(function = name, error = %err, "call degraded to empty text");
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn eval_field(&self, name: &str, span: Span, output: &mut String) -> Result<(), EvalError> {
        let Some(value) = self.record.get(name) else {
            return Ok(());
        };
        let type_name = value.type_name();
        match value.into_text() {
            Some(text) => output.push_str(&text),
            None if self.options.strict => {
                return Err(EvalError::new(
                    EvalErrorKind::TypeMismatch,
                    format!("field {name} holds a {type_name} with no text form"),
                )
                .with_span(span));
            }
            None => trace!(field = name, "field value has no text form, rendering empty"),
        }
        Ok(())
    }

    fn eval_call(
        &self,
        name: &str,
        args: ArgList,
        span: Span,
        depth: usize,
    ) -> Result<String, EvalError> {
        if depth >= self.options.max_depth {
            return Err(EvalError::new(
                EvalErrorKind::RecursionLimit,
                format!(
                    "calls nested deeper than {} levels",
                    self.options.max_depth
                ),
            )
            .with_span(span));
        }

        let args = Args {
            evaluator: self,
            seqs: self.template.args(args),
            depth: depth + 1,
        };
        self.registry.call(name, &args).map_err(|e| {
            if e.span.is_none() {
                e.with_span(span)
            } else {
                e
            }
        })
    }
}

// ── Tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::value::Value;
    use crate::parser::compile;
    use crate::registry::{Arity, ClosureFunction};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn eval_simple(source: &str) -> String {
        let template = compile(source).expect("compile failed");
        evaluate(&template, &SimpleRecord::new())
    }

    fn eval_with_record(source: &str, record: &SimpleRecord) -> String {
        let template = compile(source).expect("compile failed");
        evaluate(&template, record)
    }

    fn eval_strict(source: &str, record: &SimpleRecord) -> Result<String, EvalError> {
        let template = compile(source).expect("compile failed");
        evaluate_with_options(
            &template,
            record,
            Registry::builtins(),
            EvalOptions::new().strict(true),
        )
    }

    /// A registry with the builtins plus `probe`, which counts how often
    /// it runs and returns `"probed"`.
    fn probing_registry() -> (Registry, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut registry = Registry::with_builtins();
        registry.register(ClosureFunction::new("probe", Arity::Exact(0), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok("probed".to_string())
        }));
        (registry, calls)
    }

    #[test]
    fn test_literal() {
        assert_eq!(eval_simple("Hello, world!"), "Hello, world!");
        assert_eq!(eval_simple(""), "");
    }

    #[test]
    fn test_field_substitution() {
        let record = SimpleRecord::new().with("title", "Foo");
        assert_eq!(eval_with_record("%title%", &record), "Foo");
        assert_eq!(eval_simple("%title%"), "");
    }

    #[test]
    fn test_typed_field_rendering() {
        let record = SimpleRecord::new()
            .with("track", 7i64)
            .with("gain", -3.25f64)
            .with("rate", 44100.0f64);
        assert_eq!(
            eval_with_record("%track%|%gain%|%rate%", &record),
            "7|-3.25|44100"
        );
    }

    #[test]
    fn test_non_finite_field_degrades() {
        let record = SimpleRecord::new().with("peak", f64::NAN);
        assert_eq!(eval_with_record("[%peak%]", &record), "[]");
        let err = eval_strict("[%peak%]", &record).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::TypeMismatch);
        assert_eq!(err.span, Some(Span::new(1, 7)));
    }

    #[test]
    fn test_if_present_and_absent() {
        let source = "$if(%year%,%year%,unknown)";
        let record = SimpleRecord::new().with("year", "1999");
        assert_eq!(eval_with_record(source, &record), "1999");
        assert_eq!(eval_simple(source), "unknown");
    }

    #[test]
    fn test_escapes_evaluate_literally() {
        let record = SimpleRecord::new().with("literal", "nope");
        assert_eq!(eval_with_record("\\%literal\\%", &record), "%literal%");
        assert_eq!(eval_simple("\\%literal\\%"), "%literal%");
    }

    #[test]
    fn test_nested_calls() {
        let source = "$upper($if(%a%,%a%,%b%))";
        let a = SimpleRecord::new().with("a", "x");
        let b = SimpleRecord::new().with("b", "y");
        assert_eq!(eval_with_record(source, &a), "X");
        assert_eq!(eval_with_record(source, &b), "Y");
    }

    #[test]
    fn test_unknown_function_degrades_segment_only() {
        assert_eq!(eval_simple("$nosuchfn(x)"), "");
        assert_eq!(eval_simple("a$nosuchfn(x)b"), "ab");
        let err = eval_strict("$nosuchfn(x)", &SimpleRecord::new()).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::UnknownFunction);
        assert_eq!(err.span, Some(Span::new(0, 12)));
    }

    #[test]
    fn test_wrong_arity_degrades() {
        assert_eq!(eval_simple("[$if(a,b)]"), "[]");
        assert_eq!(eval_simple("[$upper()]"), "[]");
        assert_eq!(eval_simple("[$concat()]"), "[]");
        let err = eval_strict("$if(a,b)", &SimpleRecord::new()).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::ArityMismatch);
        assert_eq!(err.message, "if expects 3 argument(s), got 2");
    }

    #[test]
    fn test_inner_failure_keeps_outer_call() {
        // The unknown inner call becomes "", which the outer call then sees.
        assert_eq!(eval_simple("$default($nosuchfn(),fallback)"), "fallback");
    }

    #[test]
    fn test_missing_field_is_not_an_error_in_strict_mode() {
        assert_eq!(
            eval_strict("$if(%year%,%year%,unknown)", &SimpleRecord::new()).unwrap(),
            "unknown"
        );
    }

    #[test]
    fn test_truthiness_builtins() {
        assert_eq!(eval_simple("$not()"), "");
        assert_eq!(eval_simple("$not(x)"), "");
        assert_eq!(eval_simple("$not(%missing%)"), "1");
        assert_eq!(eval_simple("$and(a,b)"), "1");
        assert_eq!(eval_simple("$and(a,)"), "");
        assert_eq!(eval_simple("$or(,b)"), "1");
        assert_eq!(eval_simple("$or(,)"), "");
        // " " is non-empty, so it is true.
        assert_eq!(eval_simple("$if( ,yes,no)"), "yes");
        assert_eq!(eval_simple("$if(0,yes,no)"), "yes");
    }

    #[test]
    fn test_equal_is_case_sensitive() {
        let record = SimpleRecord::new().with("genre", "Jazz");
        assert_eq!(eval_with_record("$equal(%genre%,Jazz)", &record), "1");
        assert_eq!(eval_with_record("$equal(%genre%,jazz)", &record), "");
        assert_eq!(eval_simple("$equal(,)"), "1");
    }

    #[test]
    fn test_equal_compares_rendered_text() {
        let record = SimpleRecord::new().with("track", 3i64);
        assert_eq!(eval_with_record("$equal(%track%,3)", &record), "1");
    }

    #[test]
    fn test_case_transforms() {
        let record = SimpleRecord::new().with("artist", "Björk");
        assert_eq!(eval_with_record("$upper(%artist%)", &record), "BJÖRK");
        assert_eq!(eval_with_record("$lower(%artist%)", &record), "björk");
    }

    #[test]
    fn test_length_counts_characters() {
        let record = SimpleRecord::new().with("artist", "Björk");
        assert_eq!(eval_with_record("$length(%artist%)", &record), "5");
        assert_eq!(eval_simple("$length()"), "");
        assert_eq!(eval_simple("$length(%missing%)"), "0");
    }

    #[test]
    fn test_default() {
        let record = SimpleRecord::new().with("album", "Kind of Blue");
        assert_eq!(
            eval_with_record("$default(%album%,Unknown album)", &record),
            "Kind of Blue"
        );
        assert_eq!(eval_simple("$default(%album%,Unknown album)"), "Unknown album");
    }

    #[test]
    fn test_trim_concat_left() {
        assert_eq!(eval_simple("[$trim(  padded  )]"), "[padded]");
        assert_eq!(eval_simple("$concat(a,b,c)"), "abc");
        assert_eq!(eval_simple("$concat(solo)"), "solo");
        assert_eq!(eval_simple("$left(Mingus Ah Um,6)"), "Mingus");
        assert_eq!(eval_simple("$left(abc, 10 )"), "abc");
    }

    #[test]
    fn test_left_type_mismatch() {
        assert_eq!(eval_simple("[$left(abc,two)]"), "[]");
        assert_eq!(eval_simple("[$left(abc,-1)]"), "[]");
        let err = eval_strict("$left(abc,two)", &SimpleRecord::new()).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::TypeMismatch);
    }

    #[test]
    fn test_if_evaluates_only_selected_branch() {
        let (registry, calls) = probing_registry();
        let template = compile("$if(x,taken,$probe())").unwrap();
        let out = evaluate_with(&template, &SimpleRecord::new(), &registry);
        assert_eq!(out, "taken");
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let template = compile("$if(,skipped,$probe())").unwrap();
        let out = evaluate_with(&template, &SimpleRecord::new(), &registry);
        assert_eq!(out, "probed");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_and_or_short_circuit() {
        let (registry, calls) = probing_registry();
        let record = SimpleRecord::new();
        let and = compile("$and(,$probe())").unwrap();
        let or = compile("$or(x,$probe())").unwrap();
        let fallback = compile("$default(x,$probe())").unwrap();
        assert_eq!(evaluate_with(&and, &record, &registry), "");
        assert_eq!(evaluate_with(&or, &record, &registry), "1");
        assert_eq!(evaluate_with(&fallback, &record, &registry), "x");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_eager_closure_sees_all_operands() {
        let mut registry = Registry::new();
        registry.register(ClosureFunction::new("join", Arity::AtLeast(1), |args| {
            Ok(args.join("/"))
        }));
        let template = compile("$join(%a%,b,$join(c,d))").unwrap();
        let record = SimpleRecord::new().with("a", 1i64);
        assert_eq!(evaluate_with(&template, &record, &registry), "1/b/c/d");
    }

    #[test]
    fn test_empty_registry_degrades_every_call() {
        let template = compile("<$upper(x)>").unwrap();
        assert_eq!(
            evaluate_with(&template, &SimpleRecord::new(), &Registry::new()),
            "<>"
        );
    }

    #[test]
    fn test_function_error_degrades() {
        let mut registry = Registry::with_builtins();
        registry.register(ClosureFunction::new("fail", Arity::Exact(0), |_| {
            Err(EvalError::function_error("fail", "always fails"))
        }));
        let template = compile("a$fail()b").unwrap();
        let record = SimpleRecord::new();
        assert_eq!(evaluate_with(&template, &record, &registry), "ab");
        let err = evaluate_with_options(&template, &record, &registry, EvalOptions::new().strict(true))
            .unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::FunctionError);
        assert_eq!(err.span, Some(Span::new(1, 8)));
    }

    #[test]
    fn test_strict_error_keeps_innermost_span() {
        let err = eval_strict("$upper($nosuchfn())", &SimpleRecord::new()).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::UnknownFunction);
        assert_eq!(err.span, Some(Span::new(7, 18)));
    }

    #[test]
    fn test_eval_depth_limit() {
        let template = compile("a$upper($lower(x))b").unwrap();
        let record = SimpleRecord::new();
        let registry = Registry::builtins();

        let shallow = EvalOptions::new().max_depth(1);
        // The inner call is cut off, the outer one still runs.
        assert_eq!(
            evaluate_with_options(&template, &record, registry, shallow).unwrap(),
            "ab"
        );
        let err = evaluate_with_options(&template, &record, registry, shallow.strict(true))
            .unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::RecursionLimit);

        let enough = EvalOptions::new().max_depth(2);
        assert_eq!(
            evaluate_with_options(&template, &record, registry, enough).unwrap(),
            "aXb"
        );
    }

    #[test]
    fn test_repeated_evaluation_against_different_records() {
        let template = compile("%artist% - %title%").unwrap();
        let records = [
            SimpleRecord::new().with("artist", "Coltrane").with("title", "Naima"),
            SimpleRecord::new().with("artist", "Monk"),
            SimpleRecord::new(),
        ];
        let out: Vec<String> = records.iter().map(|r| evaluate(&template, r)).collect();
        assert_eq!(out, vec!["Coltrane - Naima", "Monk - ", " - "]);
    }

    #[test]
    fn test_map_record() {
        let mut map = std::collections::HashMap::new();
        map.insert("codec".to_string(), Value::from("FLAC"));
        let template = compile("$lower(%codec%)").unwrap();
        assert_eq!(evaluate(&template, &map), "flac");
    }
}
