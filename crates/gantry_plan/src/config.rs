//! Compiled configuration extracted from a parsed file.

use crate::error::{CompileError, CompileResult};
use crate::eval::evaluate_bindings;
use crate::registry::ResourceRegistry;
use crate::resource::ManagedResource;
use gantry_core::{Value, ValueMap};
use gantry_lang::{ExprKind, Resource};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Block name declaring a resource
pub const RESOURCE_BLOCK: &str = "resource";
/// Block name declaring an edge
pub const EDGE_BLOCK: &str = "edge";
/// Sub-block holding metaparameters
pub const META_BLOCK: &str = "meta";
/// Top-level binding naming the graph
pub const GRAPH_BINDING: &str = "graph";
/// Graph name used when the file sets none
pub const DEFAULT_GRAPH_NAME: &str = "Graph";

/// One side of an edge declaration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeEndpoint {
    /// Kind as declared
    pub kind: String,
    /// Resource name
    pub name: String,
}

impl EdgeEndpoint {
    /// Create an endpoint
    #[must_use]
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }
}

/// Edge as written in the source, before resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDecl {
    /// Edge name
    pub name: String,
    /// Source endpoint
    pub from: EdgeEndpoint,
    /// Target endpoint
    pub to: EdgeEndpoint,
    /// Notify flag
    #[serde(default)]
    pub notify: bool,
}

/// Resources and edges of one file, ready for graph compilation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Graph name
    pub graph: String,
    /// Resources in declaration order
    pub resources: Vec<ManagedResource>,
    /// Edges in declaration order
    pub edges: Vec<EdgeDecl>,
}

impl GraphConfig {
    /// Create an empty configuration
    #[must_use]
    pub fn new(graph: impl Into<String>) -> Self {
        Self {
            graph: graph.into(),
            resources: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Build the configuration from the root of a parsed file
    ///
    /// # Errors
    ///
    /// Returns the first kind, attribute, expression or edge error found
    pub fn from_ast(root: &Resource, registry: &ResourceRegistry) -> CompileResult<Self> {
        let mut config = Self::new(graph_name(root));

        for name in root.bindings.keys().filter(|name| *name != GRAPH_BINDING) {
            debug!(binding = %name, "ignoring top-level binding");
        }

        for block in &root.resources {
            match block.name.as_str() {
                RESOURCE_BLOCK => config.resources.push(resource_from_block(block, registry)?),
                EDGE_BLOCK => config.edges.push(edge_from_block(block)?),
                other => debug!(block = %other, location = %block.location, "ignoring block"),
            }
        }

        Ok(config)
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self::new(DEFAULT_GRAPH_NAME)
    }
}

fn graph_name(root: &Resource) -> String {
    match root.bindings.get(GRAPH_BINDING).map(|b| &b.expr.kind) {
        Some(ExprKind::String(name)) => name.clone(),
        _ => DEFAULT_GRAPH_NAME.to_string(),
    }
}

fn resource_from_block(
    block: &Resource,
    registry: &ResourceRegistry,
) -> CompileResult<ManagedResource> {
    check_descriptors(block, 2)?;
    let kind = block
        .descriptor(0)
        .ok_or(CompileError::MissingKind {
            location: block.location,
        })?;
    let name = block.descriptor(1).unwrap_or_default();
    let resource = registry.construct(kind, name)?;

    let attributes = evaluate_bindings(&block.bindings)?;
    let mut meta = ValueMap::new();
    for child in &block.resources {
        if child.name == META_BLOCK {
            meta.extend(evaluate_bindings(&child.bindings)?);
        } else {
            debug!(block = %child.name, location = %child.location, "ignoring nested block");
        }
    }

    registry.apply(resource, attributes, meta)
}

fn check_descriptors(block: &Resource, max: usize) -> CompileResult<()> {
    match block.descriptors.get(max) {
        Some(extra) => Err(CompileError::UnexpectedDescriptor {
            location: block.location,
            block: block.name.clone(),
            descriptor: extra.literal_text().unwrap_or_default().to_string(),
        }),
        None => Ok(()),
    }
}

fn edge_from_block(block: &Resource) -> CompileResult<EdgeDecl> {
    check_descriptors(block, 1)?;
    let values = evaluate_bindings(&block.bindings)?;
    let invalid = |reason: String| CompileError::InvalidEdge {
        location: block.location,
        reason,
    };

    let from = endpoint(&values, "from").map_err(invalid)?;
    let to = endpoint(&values, "to").map_err(invalid)?;
    let notify = match values.get("notify") {
        None => false,
        Some(Value::String(s)) if s == "true" => true,
        Some(Value::String(s)) if s == "false" => false,
        Some(other) => {
            return Err(invalid(format!(
                "`notify` must be \"true\" or \"false\", got {}",
                other
            )))
        }
    };

    Ok(EdgeDecl {
        name: block.descriptor(0).unwrap_or_default().to_string(),
        from,
        to,
        notify,
    })
}

fn endpoint(values: &ValueMap, side: &str) -> Result<EdgeEndpoint, String> {
    let map = values
        .get(side)
        .ok_or_else(|| format!("missing `{}`", side))?
        .as_map()
        .ok_or_else(|| format!("`{}` must be an object", side))?;
    let field = |key: &str| {
        map.get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| format!("`{}.{}` must be a string", side, key))
    };
    Ok(EdgeEndpoint::new(field("kind")?, field("name")?))
}
