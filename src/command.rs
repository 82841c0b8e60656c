//! Declarative command grammar and dispatch.
//!
//! Commands are trees of [`CommandNode`]s. A root is always a literal
//! token (e.g. `!!ms`); below it, literal and argument nodes form the
//! accepted grammar. Each node may carry a requirement (checked when the
//! node is entered) and a handler (run when the input ends at that node).
//!
//! ```text
//! !!ms ──┬── list
//!        ├── new ── <name: quotable>
//!        └── reload
//! ```
//!
//! Trees are built once from configuration and then only read. Nodes are
//! cheap to clone because requirements and handlers are reference-counted,
//! which lets a [`CommandTree`] hand out a root without holding a lock
//! while the handler runs.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::text::RText;

/// The entity that issued a command.
pub trait CommandSource: Send + Sync {
    /// Display name of the issuer (player name, `Console`, ...).
    fn name(&self) -> &str;

    /// Permission level in `0..=4`.
    fn permission_level(&self) -> u8;

    /// Locale used to render replies.
    fn locale(&self) -> &str;

    /// Send `text` to this source only.
    fn reply(&self, text: RText);

    fn has_permission(&self, level: u8) -> bool {
        self.permission_level() >= level
    }
}

/// Arguments captured while walking the tree.
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    args: HashMap<String, String>,
}

impl CommandContext {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.args.get(name).map(String::as_str)
    }

    fn insert(&mut self, name: &str, value: String) {
        self.args.insert(name.to_string(), value);
    }
}

pub type Requirement = Arc<dyn Fn(&dyn CommandSource, &CommandContext) -> bool + Send + Sync>;
pub type Handler = Arc<dyn Fn(Arc<dyn CommandSource>, &CommandContext) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Matches one exact token.
    Literal(String),
    /// Consumes the rest of the input (must be non-empty).
    GreedyText(String),
    /// Consumes one token, or a double-quoted string with `\"` / `\\` escapes.
    QuotableText(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("unknown argument: {0}")]
    UnknownArgument(String),
    #[error("requirement not met at {0}")]
    RequirementNotMet(String),
    #[error("incomplete command")]
    Incomplete,
}

#[derive(Clone)]
pub struct CommandNode {
    kind: NodeKind,
    requirement: Option<Requirement>,
    handler: Option<Handler>,
    children: Vec<CommandNode>,
}

impl fmt::Debug for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandNode")
            .field("kind", &self.kind)
            .field("guarded", &self.requirement.is_some())
            .field("runnable", &self.handler.is_some())
            .field("children", &self.children)
            .finish()
    }
}

impl CommandNode {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            requirement: None,
            handler: None,
            children: Vec::new(),
        }
    }

    pub fn literal(token: impl Into<String>) -> Self {
        Self::new(NodeKind::Literal(token.into()))
    }

    pub fn greedy_text(name: impl Into<String>) -> Self {
        Self::new(NodeKind::GreedyText(name.into()))
    }

    pub fn quotable_text(name: impl Into<String>) -> Self {
        Self::new(NodeKind::QuotableText(name.into()))
    }

    /// Guard this node on a property of the source.
    pub fn requires<F>(self, f: F) -> Self
    where
        F: Fn(&dyn CommandSource) -> bool + Send + Sync + 'static,
    {
        self.requires_ctx(move |src, _| f(src))
    }

    /// Guard this node on the source and the arguments parsed so far,
    /// including this node's own argument.
    pub fn requires_ctx<F>(mut self, f: F) -> Self
    where
        F: Fn(&dyn CommandSource, &CommandContext) -> bool + Send + Sync + 'static,
    {
        self.requirement = Some(Arc::new(f));
        self
    }

    pub fn runs<F>(mut self, f: F) -> Self
    where
        F: Fn(Arc<dyn CommandSource>, &CommandContext) + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(f));
        self
    }

    pub fn then(mut self, child: CommandNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn children(&self) -> &[CommandNode] {
        &self.children
    }

    pub fn is_runnable(&self) -> bool {
        self.handler.is_some()
    }

    pub fn is_guarded(&self) -> bool {
        self.requirement.is_some()
    }

    /// Literal token of this node, if it is a literal.
    pub fn literal_token(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Literal(token) => Some(token),
            _ => None,
        }
    }

    /// Find a direct child literal by token.
    pub fn child_literal(&self, token: &str) -> Option<&CommandNode> {
        self.children
            .iter()
            .find(|c| c.literal_token() == Some(token))
    }

    fn is_literal(&self) -> bool {
        matches!(self.kind, NodeKind::Literal(_))
    }

    /// Try to consume input for this node. Returns the parsed argument
    /// (for argument nodes) and the unconsumed remainder.
    fn accept<'a>(&self, input: &'a str) -> Option<(Option<String>, &'a str)> {
        match &self.kind {
            NodeKind::Literal(token) => {
                let (head, rest) = split_token(input);
                (head == token.as_str()).then_some((None, rest))
            }
            NodeKind::GreedyText(_) => {
                let text = input.trim_end();
                (!text.is_empty()).then(|| (Some(text.to_string()), ""))
            }
            NodeKind::QuotableText(_) => parse_quotable(input).map(|(v, rest)| (Some(v), rest)),
        }
    }

    fn arg_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Literal(_) => None,
            NodeKind::GreedyText(name) | NodeKind::QuotableText(name) => Some(name),
        }
    }

    fn label(&self) -> String {
        match &self.kind {
            NodeKind::Literal(token) => token.clone(),
            NodeKind::GreedyText(name) | NodeKind::QuotableText(name) => format!("<{}>", name),
        }
    }

    fn walk(
        &self,
        source: Arc<dyn CommandSource>,
        remaining: &str,
        ctx: &mut CommandContext,
    ) -> Result<(), CommandError> {
        if let Some(requirement) = &self.requirement {
            if !requirement(source.as_ref(), ctx) {
                return Err(CommandError::RequirementNotMet(self.label()));
            }
        }

        let remaining = remaining.trim_start();
        if remaining.is_empty() {
            return match &self.handler {
                Some(handler) => {
                    handler(source, ctx);
                    Ok(())
                }
                None => Err(CommandError::Incomplete),
            };
        }

        let literals = self.children.iter().filter(|c| c.is_literal());
        let arguments = self.children.iter().filter(|c| !c.is_literal());
        for child in literals.chain(arguments) {
            if let Some((value, rest)) = child.accept(remaining) {
                if let (Some(name), Some(value)) = (child.arg_name(), value) {
                    ctx.insert(name, value);
                }
                return child.walk(source, rest, ctx);
            }
        }

        Err(CommandError::UnknownArgument(remaining.to_string()))
    }
}

/// A set of registered root commands.
#[derive(Debug, Clone, Default)]
pub struct CommandTree {
    roots: Vec<CommandNode>,
}

impl CommandTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a root node. Roots must be literals; a later registration
    /// with the same token shadows nothing, the first match wins.
    pub fn register(&mut self, node: CommandNode) {
        self.roots.push(node);
    }

    pub fn clear(&mut self) {
        self.roots.clear();
    }

    pub fn roots(&self) -> &[CommandNode] {
        &self.roots
    }

    pub fn find_root(&self, token: &str) -> Option<&CommandNode> {
        self.roots.iter().find(|n| n.literal_token() == Some(token))
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Parse `line` and run the matching handler.
    pub fn dispatch(&self, source: Arc<dyn CommandSource>, line: &str) -> Result<(), CommandError> {
        let root = self.resolve_root(line)?.clone();
        dispatch_from(&root, source, line)
    }

    fn resolve_root(&self, line: &str) -> Result<&CommandNode, CommandError> {
        let (head, _) = split_token(line.trim_start());
        self.find_root(head)
            .ok_or_else(|| CommandError::UnknownCommand(head.to_string()))
    }
}

/// Walk `root` with `line`, whose first token must be the root's literal.
pub fn dispatch_from(
    root: &CommandNode,
    source: Arc<dyn CommandSource>,
    line: &str,
) -> Result<(), CommandError> {
    let line = line.trim_start();
    let (_, rest) = root
        .accept(line)
        .ok_or_else(|| CommandError::UnknownCommand(split_token(line).0.to_string()))?;
    let mut ctx = CommandContext::default();
    root.walk(source, rest, &mut ctx)
}

/// Split off the first whitespace-delimited token.
fn split_token(input: &str) -> (&str, &str) {
    match input.find(char::is_whitespace) {
        Some(idx) => (&input[..idx], &input[idx..]),
        None => (input, ""),
    }
}

fn parse_quotable(input: &str) -> Option<(String, &str)> {
    let Some(body) = input.strip_prefix('"') else {
        let (head, rest) = split_token(input);
        return (!head.is_empty()).then(|| (head.to_string(), rest));
    };

    let mut value = String::new();
    let mut escaped = false;
    for (idx, ch) in body.char_indices() {
        if escaped {
            value.push(ch);
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == '"' {
            return Some((value, &body[idx + 1..]));
        } else {
            value.push(ch);
        }
    }
    None
}
