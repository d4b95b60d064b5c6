//! Syntax tree produced by the parser.
//!
//! Nodes own their children and carry the [`Location`] they were parsed
//! from. Trees are built once per parse and never shared.

use crate::location::Location;
use indexmap::IndexMap;

/// Bindings of a resource block or object expression, one per name
pub type Bindings = IndexMap<String, Binding>;

/// A resource block, or the synthetic root of a file
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Resource {
    /// Span of the block
    pub location: Location,
    /// Keyword introducing the block; empty for the root
    pub name: String,
    /// Positional literals following the keyword
    pub descriptors: Vec<Expr>,
    /// Parenthesised expression list, if any
    pub attributes: Vec<Expr>,
    /// Bindings declared in the block body
    pub bindings: Bindings,
    /// Nested resource blocks in declaration order
    pub resources: Vec<Resource>,
}

impl Resource {
    /// Create the synthetic root node of a file
    #[must_use]
    pub fn root() -> Self {
        Self::new(
            "",
            Location {
                line: 1,
                column: 1,
                ..Location::default()
            },
        )
    }

    /// Create an empty block
    #[must_use]
    pub fn new(name: impl Into<String>, location: Location) -> Self {
        Self {
            location,
            name: name.into(),
            ..Self::default()
        }
    }

    /// Text of the positional literal at `index`
    #[must_use]
    pub fn descriptor(&self, index: usize) -> Option<&str> {
        self.descriptors.get(index).and_then(Expr::literal_text)
    }

    /// Nested blocks introduced by `name`
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Resource> + 'a {
        self.resources.iter().filter(move |r| r.name == name)
    }
}

/// A `name = expr` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Location of the bound name
    pub location: Location,
    /// Bound name
    pub name: String,
    /// Bound expression
    pub expr: Expr,
}

/// An expression node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    /// Span of the expression
    pub location: Location,
    /// Node payload
    pub kind: ExprKind,
}

/// Expression payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    /// Quoted string literal
    String(String),
    /// Bare identifier
    Reference(String),
    /// `name(args...)`
    Call {
        /// Function name
        name: String,
        /// Arguments in order
        args: Vec<Expr>,
    },
    /// `expr.a.b`; the first element is the base expression
    Chain(Vec<Expr>),
    /// `[items...]`
    Array(Vec<Expr>),
    /// `{ name = expr ... }`
    Object(Bindings),
}

impl Expr {
    /// Create an expression node
    #[must_use]
    pub const fn new(location: Location, kind: ExprKind) -> Self {
        Self { location, kind }
    }

    /// Text of a string literal or bare identifier
    #[must_use]
    pub fn literal_text(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::String(s) | ExprKind::Reference(s) => Some(s),
            _ => None,
        }
    }

    /// Human-readable node kind
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self.kind {
            ExprKind::String(_) => "string",
            ExprKind::Reference(_) => "reference",
            ExprKind::Call { .. } => "function call",
            ExprKind::Chain(_) => "expression chain",
            ExprKind::Array(_) => "array",
            ExprKind::Object(_) => "object",
        }
    }
}
