//! Compiled representation of a template.
//!
//! - [`template`]: the arena-backed [`Template`] and its node kinds.
//! - [`span`]: byte spans linking nodes back to their source.
//! - [`value`]: typed field values looked up from a record.

pub mod span;
pub mod template;
pub mod value;

pub use span::{Span, Spanned};
pub use template::{ArgList, Node, NodeKind, Seq, Template, TextRef};
pub use value::Value;
