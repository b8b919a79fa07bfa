//! Function registration for trackfmt.
//!
//! The [`Registry`] maps the names used in `$name(...)` calls to
//! [`TemplateFunction`]s. Names are resolved at evaluation time, so
//! templates compile without knowing which functions exist.
//!
//! There are two ways to register functions:
//!
//! - **Closure-based**: [`ClosureFunction`] wraps an eager
//!   `Fn(&[String]) -> Result<String, EvalError>`. Every operand is
//!   evaluated before the closure runs.
//! - **Trait-based**: implement [`TemplateFunction`] directly to get lazy
//!   access to operands through [`Args`], as the conditional builtins do.
//!   The `#[template_function]` macro in the `trackfmt-macros` crate can
//!   generate an implementation from a plain function signature.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use crate::error::EvalError;
use crate::eval::Args;

mod builtins;

pub use builtins::TRUE;

// ── Trait definitions ───────────────────────────────────────────────────

/// A function callable from templates as `$name(args)`.
///
/// Operands are text. [`Args`] evaluates each one only when the function
/// asks for it, so a function that ignores an operand never pays for the
/// field lookups and nested calls inside it.
pub trait TemplateFunction: Send + Sync {
    /// Run the function. The registry has already checked the operand
    /// count against [`signature`](TemplateFunction::signature).
    fn call(&self, args: &Args<'_, '_>) -> Result<String, EvalError>;

    /// Declare this function's name and accepted operand count.
    fn signature(&self) -> Signature;
}

// ── Signatures ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub arity: Arity,
}

impl Signature {
    pub fn new(name: impl Into<String>, arity: Arity) -> Self {
        Self {
            name: name.into(),
            arity,
        }
    }
}

/// Number of operands a function accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::AtLeast(n) => write!(f, "at least {n}"),
        }
    }
}

// ── Registry ────────────────────────────────────────────────────────────

static BUILTINS: LazyLock<Registry> = LazyLock::new(Registry::with_builtins);

/// Stores the functions available to templates during evaluation.
///
/// [`Registry::default`] and [`Registry::with_builtins`] start from the
/// builtin catalog; [`Registry::new`] starts empty.
///
/// ```rust
/// use trackfmt::{Arity, ClosureFunction, Registry};
///
/// let mut registry = Registry::with_builtins();
/// registry.register(ClosureFunction::new("reverse", Arity::Exact(1), |args| {
///     Ok(args[0].chars().rev().collect())
/// }));
/// assert!(registry.contains("reverse"));
/// assert!(registry.contains("if"));
/// ```
pub struct Registry {
    functions: HashMap<String, Entry>,
}

/// A registered function. `arity` is copied out of its signature once at
/// registration.
struct Entry {
    arity: Arity,
    function: Box<dyn TemplateFunction>,
}

impl Registry {
    /// An empty registry: every call degrades to empty text.
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// A registry holding the builtin catalog (`if`, `equal`, `not`, `and`,
    /// `or`, `upper`, `lower`, `length`, `default`, `trim`, `concat`,
    /// `left`).
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtins::register_all(&mut registry);
        registry
    }

    /// The shared, immutable builtin registry used by
    /// [`evaluate`](crate::evaluate).
    pub fn builtins() -> &'static Registry {
        &BUILTINS
    }

    /// Register a function. A function already registered under the same
    /// name is replaced.
    pub fn register(&mut self, function: impl TemplateFunction + 'static) {
        let sig = function.signature();
        self.functions.insert(
            sig.name,
            Entry {
                arity: sig.arity,
                function: Box::new(function),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&dyn TemplateFunction> {
        self.functions.get(name).map(|entry| &*entry.function)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered function names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Dispatch a call. Fails if the function is not registered or does
    /// not accept `args.len()` operands.
    pub fn call(&self, name: &str, args: &Args<'_, '_>) -> Result<String, EvalError> {
        let entry = self
            .functions
            .get(name)
            .ok_or_else(|| EvalError::unknown_function(name))?;
        if !entry.arity.accepts(args.len()) {
            return Err(EvalError::arity_mismatch(name, entry.arity, args.len()));
        }
        entry.function.call(args)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("functions", &self.names())
            .finish()
    }
}

// ── Closure-based convenience wrapper ───────────────────────────────────

/// A [`TemplateFunction`] backed by a closure over fully evaluated operands.
///
/// ```rust
/// use trackfmt::{Arity, ClosureFunction};
///
/// let shout = ClosureFunction::new("shout", Arity::Exact(1), |args| {
///     Ok(format!("{}!", args[0].to_uppercase()))
/// });
/// # let _ = shout;
/// ```
pub struct ClosureFunction<F>
where
    F: Fn(&[String]) -> Result<String, EvalError> + Send + Sync,
{
    sig: Signature,
    func: F,
}

impl<F> ClosureFunction<F>
where
    F: Fn(&[String]) -> Result<String, EvalError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, arity: Arity, func: F) -> Self {
        Self {
            sig: Signature::new(name, arity),
            func,
        }
    }
}

impl<F> TemplateFunction for ClosureFunction<F>
where
    F: Fn(&[String]) -> Result<String, EvalError> + Send + Sync,
{
    fn call(&self, args: &Args<'_, '_>) -> Result<String, EvalError> {
        (self.func)(&args.texts()?)
    }

    fn signature(&self) -> Signature {
        self.sig.clone()
    }
}
