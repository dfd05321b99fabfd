use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// AST node kinds produced by the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AstKind {
    Program,
    Package,
    Import,
    Class,
    Interface,
    Method,
    Constructor,
    Field,
    Parameter,
    Block,
    If,
    ForLoop,
    WhileLoop,
    DoLoop,
    Return,
    Statement,
    Call,
    Error,
}

impl AstKind {
    pub fn is_loop(self) -> bool {
        matches!(self, AstKind::ForLoop | AstKind::WhileLoop | AstKind::DoLoop)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRange {
    pub start: Position,
    pub end: Position,
}

impl SourceRange {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn cover(self, other: SourceRange) -> SourceRange {
        let start = if other.start.offset < self.start.offset {
            other.start
        } else {
            self.start
        };
        let end = if other.end.offset > self.end.offset {
            other.end
        } else {
            self.end
        };
        SourceRange { start, end }
    }

    /// `line:column` of the range start
    pub fn location(&self) -> String {
        format!("{}:{}", self.start.line, self.start.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AstNode {
    pub kind: AstKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<AstNode>,
    pub range: SourceRange,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl AstNode {
    pub fn new(kind: AstKind, range: SourceRange) -> Self {
        Self {
            kind,
            name: None,
            children: Vec::new(),
            range,
            attributes: BTreeMap::new(),
        }
    }

    pub fn named(kind: AstKind, name: impl Into<String>, range: SourceRange) -> Self {
        let mut node = Self::new(kind, range);
        node.name = Some(name.into());
        node
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Empty values are not stored.
    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if !value.is_empty() {
            self.attributes.insert(key.to_string(), value);
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn children_of(&self, kind: AstKind) -> impl Iterator<Item = &AstNode> {
        self.children.iter().filter(move |c| c.kind == kind)
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(AstNode::size).sum::<usize>()
    }

    pub fn count_kind(&self, kind: AstKind) -> usize {
        let own = usize::from(self.kind == kind);
        own + self
            .children
            .iter()
            .map(|c| c.count_kind(kind))
            .sum::<usize>()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A recoverable syntax problem found while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub range: SourceRange,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, range: SourceRange) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            range,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.range.location(), self.message)
    }
}

/// Parser output: the AST plus every diagnostic recorded on the way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseOutput {
    pub ast: AstNode,
    pub diagnostics: Vec<Diagnostic>,
}
