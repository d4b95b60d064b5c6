//! GANTRY Language
//!
//! Error-tolerant front end for resource declaration files: a byte cursor,
//! a recursive-descent parser, and the syntax tree it produces.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod cursor;
pub mod location;
pub mod parser;
pub mod trace;

pub use ast::{Binding, Bindings, Expr, ExprKind, Resource};
pub use cursor::Cursor;
pub use location::{Diagnostic, Location};
pub use parser::{parse, ParseOutput, Parser};
pub use trace::{TRACE_TARGET, TraceEvent, Tracer, TracingTracer};
