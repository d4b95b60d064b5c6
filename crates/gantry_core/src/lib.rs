//! GANTRY Core Types
//!
//! Pure types shared by the language front end and the graph compiler.
//! No I/O happens in this crate.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod hash;
pub mod id;
pub mod value;

// Re-exports
pub use error::{CoreError, CoreResult};
pub use hash::ContentHash;
pub use id::VertexId;
pub use value::{Value, ValueMap};
