//! Compilation errors.
//!
//! Compilation is fail-fast: the first error aborts the whole pass and no
//! partial graph is returned. Syntax problems are not errors here, they are
//! reported as [`gantry_lang::Diagnostic`]s by the parser.

use crate::registry::AttributeError;
use crate::world::WorldError;
use gantry_core::CoreError;
use gantry_lang::Location;
use std::fmt;
use std::path::PathBuf;

/// Result type for compilation
pub type CompileResult<T> = Result<T, CompileError>;

/// Which end of an edge failed to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeSide {
    /// Source endpoint
    From,
    /// Target endpoint
    To,
}

impl fmt::Display for EdgeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::From => write!(f, "from"),
            Self::To => write!(f, "to"),
        }
    }
}

/// Fatal compilation error
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// Expression kind the evaluator cannot resolve
    #[error("{location}: {what} not supported")]
    UnsupportedExpression {
        /// Description of the expression
        what: String,
        /// Where the expression starts
        location: Location,
    },

    /// `resource` block without a kind descriptor
    #[error("{location}: resource kind not specified after `resource` keyword")]
    MissingKind {
        /// Location of the block
        location: Location,
    },

    /// No factory registered for the kind
    #[error("unknown resource kind `{kind}`")]
    UnknownResourceKind {
        /// Kind as declared
        kind: String,
    },

    /// Block carries more descriptors than it accepts
    #[error("{location}: unexpected descriptor `{descriptor}` in `{block}` block")]
    UnexpectedDescriptor {
        /// Location of the block
        location: Location,
        /// Block keyword
        block: String,
        /// First surplus descriptor
        descriptor: String,
    },

    /// Attribute rejected by the kind's setter
    #[error("{kind}[{name}]: {source}")]
    InvalidAttribute {
        /// Kind of the resource
        kind: String,
        /// Name of the resource
        name: String,
        /// Why the attribute was rejected
        source: AttributeError,
    },

    /// Malformed `edge` block
    #[error("{location}: invalid edge: {reason}")]
    InvalidEdge {
        /// Location of the block
        location: Location,
        /// What is wrong with it
        reason: String,
    },

    /// Two local resources share a kind and name
    #[error("duplicate resource {kind}[{name}]")]
    DuplicateResource {
        /// Canonical kind
        kind: String,
        /// Resource name
        name: String,
    },

    /// Edge endpoint was never declared
    #[error("can't find '{side}' resource {kind}[{name}]")]
    MissingEdgeEndpoint {
        /// Unresolved end
        side: EdgeSide,
        /// Kind as declared on the edge
        kind: String,
        /// Resource name
        name: String,
    },

    /// The world rejected the exported batch
    #[error("could not export resources: {0}")]
    ExportFailure(#[source] WorldError),

    /// Source file could not be read
    #[error("could not read {}: {source}", path.display())]
    Io {
        /// File that was being read
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Graph invariant violated
    #[error(transparent)]
    Core(#[from] CoreError),
}
