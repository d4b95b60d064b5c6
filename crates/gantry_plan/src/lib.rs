//! GANTRY Plan
//!
//! Compiles parsed resource files into dependency graphs. Resources are
//! built through a registry of kinds, exported resources are published to
//! a shared world, and unchanged vertices are carried across reloads.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compiler;
pub mod config;
pub mod error;
pub mod eval;
pub mod gapi;
pub mod graph;
pub mod registry;
pub mod resource;
pub mod world;

pub use compiler::{CompileOptions, Compiled, GraphCompiler};
pub use config::{EdgeDecl, EdgeEndpoint, GraphConfig};
pub use error::{CompileError, CompileResult, EdgeSide};
pub use eval::{evaluate, evaluate_bindings};
pub use gapi::{Gapi, GapiData, GapiError, Signal, WatchEvent};
pub use graph::{Edge, Graph, Vertex, VertexKey};
pub use registry::{canonical_kind, AttributeError, Field, ResourceKind, ResourceRegistry, Schema, Shape};
pub use resource::{ManagedResource, EXPORT_PREFIX};
pub use world::{MemoryWorld, World, WorldError};
