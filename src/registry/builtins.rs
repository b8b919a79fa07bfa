//! The builtin function catalog.
//!
//! Conditionals share one truthiness rule: text is true iff it is
//! non-empty. Functions that produce a boolean return [`TRUE`] or the
//! empty string.

use super::{Arity, ClosureFunction, Registry, Signature, TemplateFunction};
use crate::error::EvalError;
use crate::eval::Args;

/// Canonical non-empty marker returned by boolean builtins.
pub const TRUE: &str = "1";

fn marker(value: bool) -> String {
    if value {
        TRUE.to_string()
    } else {
        String::new()
    }
}

pub(super) fn register_all(registry: &mut Registry) {
    registry.register(If);
    registry.register(And);
    registry.register(Or);
    registry.register(DefaultTo);
    registry.register(Left);

    registry.register(ClosureFunction::new("equal", Arity::Exact(2), |args| {
        Ok(marker(args[0] == args[1]))
    }));
    registry.register(ClosureFunction::new("not", Arity::Exact(1), |args| {
        Ok(marker(args[0].is_empty()))
    }));
    registry.register(ClosureFunction::new("upper", Arity::Exact(1), |args| {
        Ok(args[0].to_uppercase())
    }));
    registry.register(ClosureFunction::new("lower", Arity::Exact(1), |args| {
        Ok(args[0].to_lowercase())
    }));
    registry.register(ClosureFunction::new("length", Arity::Exact(1), |args| {
        Ok(args[0].chars().count().to_string())
    }));
    registry.register(ClosureFunction::new("trim", Arity::Exact(1), |args| {
        Ok(args[0].trim().to_string())
    }));
    registry.register(ClosureFunction::new("concat", Arity::AtLeast(1), |args| {
        Ok(args.concat())
    }));
}

/// `$if(cond,then,else)`. Only the selected branch is evaluated.
struct If;

impl TemplateFunction for If {
    fn call(&self, args: &Args<'_, '_>) -> Result<String, EvalError> {
        if args.is_true(0)? {
            args.text(1)
        } else {
            args.text(2)
        }
    }

    fn signature(&self) -> Signature {
        Signature::new("if", Arity::Exact(3))
    }
}

struct And;

impl TemplateFunction for And {
    fn call(&self, args: &Args<'_, '_>) -> Result<String, EvalError> {
        Ok(marker(args.is_true(0)? && args.is_true(1)?))
    }

    fn signature(&self) -> Signature {
        Signature::new("and", Arity::Exact(2))
    }
}

struct Or;

impl TemplateFunction for Or {
    fn call(&self, args: &Args<'_, '_>) -> Result<String, EvalError> {
        Ok(marker(args.is_true(0)? || args.is_true(1)?))
    }

    fn signature(&self) -> Signature {
        Signature::new("or", Arity::Exact(2))
    }
}

/// `$default(value,fallback)`.
struct DefaultTo;

impl TemplateFunction for DefaultTo {
    fn call(&self, args: &Args<'_, '_>) -> Result<String, EvalError> {
        let value = args.text(0)?;
        if value.is_empty() {
            args.text(1)
        } else {
            Ok(value)
        }
    }

    fn signature(&self) -> Signature {
        Signature::new("default", Arity::Exact(2))
    }
}

/// `$left(text,n)`: the first `n` characters of `text`.
struct Left;

impl TemplateFunction for Left {
    fn call(&self, args: &Args<'_, '_>) -> Result<String, EvalError> {
        let count = args.integer(1)?;
        let count = usize::try_from(count)
            .map_err(|_| EvalError::type_mismatch("non-negative integer", &count.to_string()))?;
        Ok(args.text(0)?.chars().take(count).collect())
    }

    fn signature(&self) -> Signature {
        Signature::new("left", Arity::Exact(2))
    }
}
