//! Arena-backed compiled template.
//!
//! All nodes of a template live in one `Vec<Node>`, all argument lists in
//! one `Vec<Seq>`, and all literal text and names in one `String`. Nodes
//! refer to their children through the index ranges [`Seq`], [`ArgList`]
//! and [`TextRef`], so a template is a handful of allocations no matter how
//! deeply its calls nest.

use super::span::Spanned;

/// A range of nodes forming one sequence (the root, or one call argument).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Seq {
    start: u32,
    len: u32,
}

/// A range of argument sequences belonging to one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ArgList {
    start: u32,
    len: u32,
}

/// A range of bytes in the template's text buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextRef {
    start: u32,
    len: u32,
}

impl Seq {
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl ArgList {
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

pub type Node = Spanned<NodeKind>;

/// The kinds of content that can appear in a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Verbatim output text, with escapes already resolved.
    /// For example, `"Track "` in `Track %tracknumber%`.
    Literal(TextRef),

    /// A `%name%` reference resolved against the record at evaluation time.
    Field(TextRef),

    /// A `$name(arg, ...)` call. Each argument is a full nested sequence.
    Call { name: TextRef, args: ArgList },
}

/// A compiled template: an ordered forest of nodes whose evaluated outputs
/// are concatenated.
///
/// Produced by [`compile`](crate::compile). Immutable, `Send + Sync`, and
/// structurally comparable: compiling the same source twice yields two
/// templates that are `==`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    nodes: Vec<Node>,
    args: Vec<Seq>,
    text: String,
    root: Seq,
}

impl Template {
    /// The top-level node sequence.
    pub fn root(&self) -> &[Node] {
        self.seq(self.root)
    }

    /// Resolve a node sequence.
    pub fn seq(&self, seq: Seq) -> &[Node] {
        let start = seq.start as usize;
        &self.nodes[start..start + seq.len as usize]
    }

    /// Resolve the argument sequences of a call.
    pub fn args(&self, list: ArgList) -> &[Seq] {
        let start = list.start as usize;
        &self.args[start..start + list.len as usize]
    }

    /// Resolve a literal text or a field/function name.
    pub fn text(&self, text: TextRef) -> &str {
        let start = text.start as usize;
        &self.text[start..start + text.len as usize]
    }

    /// Total number of nodes across every nesting level.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// `true` if the template produces no output for any record.
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Deepest call nesting in the template. A template with no calls has
    /// depth 0.
    pub fn depth(&self) -> usize {
        self.seq_depth(self.root)
    }

    fn seq_depth(&self, seq: Seq) -> usize {
        self.seq(seq)
            .iter()
            .map(|node| match node.node {
                NodeKind::Call { args, .. } => {
                    1 + self
                        .args(args)
                        .iter()
                        .map(|arg| self.seq_depth(*arg))
                        .max()
                        .unwrap_or(0)
                }
                _ => 0,
            })
            .max()
            .unwrap_or(0)
    }
}

/// Incremental arena writer used by the parser.
///
/// Sequences are appended only once they are complete. A nested call's
/// argument sequences therefore always land in the arena before the
/// sequence that contains the call, and every sequence stays contiguous.
///
/// Every range is stored as `u32`. Each push fails with `None` instead of
/// growing a buffer past [`limit`](TemplateBuilder::limit) entries.
#[derive(Debug)]
pub(crate) struct TemplateBuilder {
    nodes: Vec<Node>,
    args: Vec<Seq>,
    text: String,
    limit: u32,
}

impl TemplateBuilder {
    pub(crate) fn new() -> Self {
        Self::with_limit(u32::MAX)
    }

    pub(crate) fn with_limit(limit: u32) -> Self {
        Self {
            nodes: Vec::new(),
            args: Vec::new(),
            text: String::new(),
            limit,
        }
    }

    /// Maximum bytes of text, nodes, or argument sequences in one template.
    pub(crate) fn limit(&self) -> usize {
        self.limit as usize
    }

    /// Reserve `len` more entries in a buffer currently holding `used`.
    fn range(&self, used: usize, len: usize) -> Option<(u32, u32)> {
        let start = u32::try_from(used).ok()?;
        let len = u32::try_from(len).ok()?;
        (start.checked_add(len)? <= self.limit).then_some((start, len))
    }

    pub(crate) fn push_text(&mut self, text: &str) -> Option<TextRef> {
        let (start, len) = self.range(self.text.len(), text.len())?;
        self.text.push_str(text);
        Some(TextRef { start, len })
    }

    pub(crate) fn finish_seq(&mut self, nodes: Vec<Node>) -> Option<Seq> {
        let (start, len) = self.range(self.nodes.len(), nodes.len())?;
        self.nodes.extend(nodes);
        Some(Seq { start, len })
    }

    pub(crate) fn finish_args(&mut self, args: Vec<Seq>) -> Option<ArgList> {
        let (start, len) = self.range(self.args.len(), args.len())?;
        self.args.extend(args);
        Some(ArgList { start, len })
    }

    pub(crate) fn finish(mut self, root: Vec<Node>) -> Option<Template> {
        let root = self.finish_seq(root)?;
        Some(Template {
            nodes: self.nodes,
            args: self.args,
            text: self.text,
            root,
        })
    }
}
