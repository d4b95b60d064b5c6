//! Graph compiler.
//!
//! Turns a [`GraphConfig`] into a [`Graph`], publishing exported resources
//! to the [`World`] on the way. A previous graph may be supplied so that
//! unchanged vertices keep their identity across reloads.

use crate::config::{EdgeDecl, GraphConfig};
use crate::error::{CompileError, CompileResult, EdgeSide};
use crate::graph::{Edge, Graph, Vertex, VertexKey};
use crate::registry::ResourceRegistry;
use crate::world::World;
use gantry_lang::{Diagnostic, Parser, TracingTracer};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Compilation options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Host the graph is compiled for
    pub hostname: String,
    /// Compute exported resources without publishing them
    pub noop: bool,
    /// Forward parser trace events to `tracing`
    pub trace: bool,
}

/// Output of compiling source text
#[derive(Debug)]
pub struct Compiled {
    /// The compiled graph
    pub graph: Graph,
    /// Syntax diagnostics reported while parsing
    pub diagnostics: Vec<Diagnostic>,
}

/// Compiles configurations into resource graphs
pub struct GraphCompiler {
    registry: Arc<ResourceRegistry>,
    world: Arc<dyn World>,
    options: CompileOptions,
}

impl GraphCompiler {
    /// Create a compiler with default options
    #[must_use]
    pub fn new(registry: Arc<ResourceRegistry>, world: Arc<dyn World>) -> Self {
        Self {
            registry,
            world,
            options: CompileOptions::default(),
        }
    }

    /// Replace the options
    #[must_use]
    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    /// Current options
    #[must_use]
    pub const fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Registry used to construct resources
    #[must_use]
    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Compile a configuration into a graph
    ///
    /// # Errors
    ///
    /// Returns the first duplicate, export or edge resolution error. No
    /// partial graph is returned.
    pub fn compile(&self, config: &GraphConfig, previous: Option<&Graph>) -> CompileResult<Graph> {
        let mut graph = Graph::new(config.graph.clone());
        let mut exported = Vec::new();
        let mut reused = 0usize;

        for resource in &config.resources {
            if let Some(export) = resource.to_exported() {
                if self.options.noop {
                    debug!(kind = %export.kind, name = %export.name, "noop: not exporting");
                } else {
                    exported.push(export);
                }
                continue;
            }

            let key = VertexKey::of(resource);
            if graph.vertex(&key).is_some() {
                return Err(CompileError::DuplicateResource {
                    kind: resource.kind.clone(),
                    name: resource.name.clone(),
                });
            }

            let hash = resource.content_hash()?;
            let vertex = match previous.and_then(|g| g.get_vertex_match(&key, hash)) {
                Some(vertex) => {
                    reused += 1;
                    vertex
                }
                None => Arc::new(Vertex::with_hash(resource.clone(), hash)),
            };
            graph.add_vertex(vertex)?;
        }

        let export_count = exported.len();
        self.world
            .export(exported)
            .map_err(CompileError::ExportFailure)?;

        for decl in &config.edges {
            graph.add_edge(self.resolve_edge(&graph, decl)?)?;
        }

        info!(
            graph = %graph.name(),
            hostname = %self.options.hostname,
            vertices = graph.vertex_count(),
            edges = graph.edge_count(),
            reused,
            exported = export_count,
            "compiled graph"
        );
        Ok(graph)
    }

    /// Parse and compile source text
    ///
    /// Syntax diagnostics do not stop compilation; they are returned next to
    /// the graph.
    ///
    /// # Errors
    ///
    /// Returns the first evaluation or compilation error
    pub fn compile_source(&self, source: &str, previous: Option<&Graph>) -> CompileResult<Compiled> {
        let output = if self.options.trace {
            let mut tracer = TracingTracer;
            Parser::new(source).with_tracer(&mut tracer).parse()
        } else {
            Parser::new(source).parse()
        };

        let config = GraphConfig::from_ast(&output.root, &self.registry)?;
        let graph = self.compile(&config, previous)?;
        Ok(Compiled {
            graph,
            diagnostics: output.diagnostics,
        })
    }

    /// Read, parse and compile a file
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::Io`] if the file cannot be read, otherwise as
    /// [`GraphCompiler::compile_source`]
    pub fn compile_file(&self, path: &Path, previous: Option<&Graph>) -> CompileResult<Compiled> {
        let source = std::fs::read_to_string(path).map_err(|source| CompileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.compile_source(&source, previous)
    }

    fn resolve_edge(&self, graph: &Graph, decl: &EdgeDecl) -> CompileResult<Edge> {
        let resolve = |side: EdgeSide, kind: &str, name: &str| {
            let key = VertexKey::new(kind, name);
            if graph.vertex(&key).is_some() {
                Ok(key)
            } else {
                Err(CompileError::MissingEdgeEndpoint {
                    side,
                    kind: kind.to_string(),
                    name: name.to_string(),
                })
            }
        };
        let from = resolve(EdgeSide::From, &decl.from.kind, &decl.from.name)?;
        let to = resolve(EdgeSide::To, &decl.to.kind, &decl.to.name)?;
        Ok(Edge::new(decl.name.clone(), from, to).with_notify(decl.notify))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EdgeEndpoint;
    use crate::world::{MemoryWorld, WorldError};
    use gantry_core::Value;
    use proptest::prelude::*;

    fn compiler(world: Arc<MemoryWorld>, noop: bool) -> GraphCompiler {
        GraphCompiler::new(Arc::new(ResourceRegistry::builtin()), world).with_options(
            CompileOptions {
                hostname: "h1".to_string(),
                noop,
                trace: false,
            },
        )
    }

    fn compile(src: &str) -> Compiled {
        compiler(Arc::new(MemoryWorld::new()), false)
            .compile_source(src, None)
            .unwrap()
    }

    const PIPELINE: &str = r#"
resource exec a {
  cmd = "echo a"
}
resource exec b {
  cmd = "echo b"
}
edge "a-b" {
  from = { kind = "exec", name = "a" }
  to = { kind = "exec", name = "b" }
  notify = "true"
}
"#;

    #[test]
    fn test_minimal_file_resource() {
        let out = compile("resource file 1 {\n  path = \"/etc/motd\"\n}\n");
        assert!(out.diagnostics.is_empty());
        let graph = out.graph;
        assert_eq!(graph.vertex_count(), 1);
        assert_eq!(graph.edge_count(), 0);

        let vertex = graph.find("file", "1").unwrap();
        let res = vertex.resource();
        assert_eq!(res.kind, "file");
        assert_eq!(res.name, "1");
        assert_eq!(res.attributes.len(), 1);
        assert_eq!(res.attribute("path"), Some(&Value::from("/etc/motd")));
    }

    #[test]
    fn test_compile_twice_structurally_equal() {
        let first = compile(PIPELINE).graph;
        let second = compile(PIPELINE).graph;
        assert!(first.structurally_eq(&second));
        let a1 = first.find("exec", "a").unwrap();
        let a2 = second.find("exec", "a").unwrap();
        assert!(!Arc::ptr_eq(a1, a2));
    }

    #[test]
    fn test_hot_reload_reuses_unchanged_vertex() {
        let compiler = compiler(Arc::new(MemoryWorld::new()), false);
        let first = compiler.compile_source(PIPELINE, None).unwrap().graph;

        let changed = PIPELINE.replace("echo b", "echo B");
        let second = compiler
            .compile_source(&changed, Some(&first))
            .unwrap()
            .graph;

        let a1 = first.find("exec", "a").unwrap();
        let a2 = second.find("exec", "a").unwrap();
        assert!(Arc::ptr_eq(a1, a2));

        let b1 = first.find("exec", "b").unwrap();
        let b2 = second.find("exec", "b").unwrap();
        assert!(!Arc::ptr_eq(b1, b2));
        assert_eq!(b2.resource().attribute("cmd"), Some(&Value::from("echo B")));
    }

    #[test]
    fn test_meta_change_replaces_vertex() {
        let compiler = compiler(Arc::new(MemoryWorld::new()), false);
        let src = "resource noop n {\n  meta {\n    retry = \"1\"\n  }\n}";
        let first = compiler.compile_source(src, None).unwrap().graph;
        let second = compiler
            .compile_source(&src.replace("\"1\"", "\"2\""), Some(&first))
            .unwrap()
            .graph;
        assert!(!Arc::ptr_eq(
            first.find("noop", "n").unwrap(),
            second.find("noop", "n").unwrap()
        ));
    }

    #[test]
    fn test_accumulate_single_and_many() {
        let graph = compile("resource noop p {\n  comment += \"a\"\n}").graph;
        let names = graph.find("noop", "p").unwrap().resource().attribute("comment").cloned();
        assert_eq!(names, Some(Value::List(vec![Value::from("a")])));

        let graph = compile("resource noop p {\n  comment += \"a\"\n  comment += \"b\"\n  comment += \"c\"\n}").graph;
        let names = graph.find("noop", "p").unwrap().resource().attribute("comment").cloned();
        assert_eq!(
            names,
            Some(Value::List(vec![
                Value::from("a"),
                Value::from("b"),
                Value::from("c")
            ]))
        );
    }

    #[test]
    fn test_exported_resource_goes_to_world() {
        let world = Arc::new(MemoryWorld::new());
        let src = "resource file @@x {\n  path = \"/tmp/x\"\n}\nresource file y {}";
        let graph = compiler(world.clone(), false)
            .compile_source(src, None)
            .unwrap()
            .graph;

        assert_eq!(graph.vertex_count(), 1);
        assert!(graph.find("file", "@@x").is_none());
        assert!(graph.find("file", "x").is_none());

        assert_eq!(world.export_count(), 1);
        let exported = world.exported();
        assert_eq!(exported.len(), 1);
        assert_eq!(exported[0].kind, "file");
        assert_eq!(exported[0].name, "x");
        assert_eq!(exported[0].attribute("path"), Some(&Value::from("/tmp/x")));
    }

    #[test]
    fn test_exported_resource_noop() {
        let world = Arc::new(MemoryWorld::new());
        let graph = compiler(world.clone(), true)
            .compile_source("resource file @@x {}", None)
            .unwrap()
            .graph;
        assert!(graph.is_empty());
        assert_eq!(world.export_count(), 1);
        assert!(world.exported().is_empty());
    }

    #[test]
    fn test_export_called_once_when_empty() {
        let world = Arc::new(MemoryWorld::new());
        compiler(world.clone(), false)
            .compile_source("resource noop n {}", None)
            .unwrap();
        assert_eq!(world.batches(), vec![Vec::new()]);
    }

    #[test]
    fn test_export_failure_aborts() {
        let world = Arc::new(MemoryWorld::failing(WorldError::Unavailable {
            reason: "no quorum".to_string(),
        }));
        let err = compiler(world, false)
            .compile_source("resource file @@x {}", None)
            .unwrap_err();
        assert!(matches!(err, CompileError::ExportFailure(_)));
    }

    #[test]
    fn test_edges_resolved_with_notify() {
        let graph = compile(PIPELINE).graph;
        assert_eq!(graph.edge_count(), 1);
        let edge = &graph.edges()[0];
        assert_eq!(edge.name, "a-b");
        assert_eq!(edge.from, VertexKey::new("Exec", "a"));
        assert_eq!(edge.to, VertexKey::new("exec", "b"));
        assert!(edge.notify);
        assert_eq!(
            graph.topological_order().unwrap(),
            vec![VertexKey::new("exec", "a"), VertexKey::new("exec", "b")]
        );
    }

    #[test]
    fn test_edge_kind_is_normalized() {
        let compiler = compiler(Arc::new(MemoryWorld::new()), false);
        let mut config = GraphConfig::default();
        config.resources.push(crate::resource::ManagedResource::new("file", "a"));
        config.resources.push(crate::resource::ManagedResource::new("exec", "b"));
        config.edges.push(EdgeDecl {
            name: "e".to_string(),
            from: EdgeEndpoint::new("File", "a"),
            to: EdgeEndpoint::new("exec", "b"),
            notify: false,
        });
        let graph = compiler.compile(&config, None).unwrap();
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_missing_edge_endpoint() {
        let src = PIPELINE.replace("name = \"b\" }", "name = \"c\" }");
        let err = compiler(Arc::new(MemoryWorld::new()), false)
            .compile_source(&src, None)
            .unwrap_err();
        match err {
            CompileError::MissingEdgeEndpoint { side, kind, name } => {
                assert_eq!(side, EdgeSide::To);
                assert_eq!(kind, "exec");
                assert_eq!(name, "c");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_exported_endpoint_is_missing() {
        let src = r#"
resource file @@a {}
resource exec b {}
edge e {
  from = { kind = "file", name = "@@a" }
  to = { kind = "exec", name = "b" }
}
"#;
        let err = compiler(Arc::new(MemoryWorld::new()), false)
            .compile_source(src, None)
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::MissingEdgeEndpoint {
                side: EdgeSide::From,
                ..
            }
        ));
    }

    #[test]
    fn test_duplicate_resource() {
        let err = compiler(Arc::new(MemoryWorld::new()), false)
            .compile_source("resource file a {}\nresource File a {}", None)
            .unwrap_err();
        assert!(matches!(err, CompileError::DuplicateResource { .. }));
    }

    #[test]
    fn test_syntax_error_keeps_first_vertex() {
        let src = "resource file a {\n  path = \"/a\"\n}\nresource file b\n";
        let out = compile(src);
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].location.line, 4);
        assert!(out.graph.find("file", "a").is_some());
        assert!(out.graph.find("file", "b").is_none());
    }

    #[test]
    fn test_block_missing_brace_mid_file() {
        let src = "resource file 1 {path=\"/a\"}\nresource file 2\nresource file 3 {path=\"/c\"}";
        let out = compile(src);
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].location.line, 2);
        assert_eq!(out.graph.vertex_count(), 2);
        assert!(out.graph.find("file", "2").is_none());
        let third = out.graph.find("file", "3").unwrap();
        assert_eq!(third.resource().attribute("path"), Some(&Value::from("/c")));
        let first = out.graph.find("file", "1").unwrap();
        assert_eq!(first.resource().attribute("path"), Some(&Value::from("/a")));
    }

    #[test]
    fn test_surplus_descriptor_aborts() {
        let err = compiler(Arc::new(MemoryWorld::new()), false)
            .compile_source("resource file 2 resource file 3 {path=\"/c\"}", None)
            .unwrap_err();
        assert!(matches!(err, CompileError::UnexpectedDescriptor { .. }));
    }

    #[test]
    fn test_unsupported_expression_aborts() {
        let err = compiler(Arc::new(MemoryWorld::new()), false)
            .compile_source("resource file a {\n  path = f1\n}", None)
            .unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedExpression { .. }));
    }

    #[test]
    fn test_compile_with_trace() {
        let compiler = GraphCompiler::new(
            Arc::new(ResourceRegistry::builtin()),
            Arc::new(MemoryWorld::new()),
        )
        .with_options(CompileOptions {
            trace: true,
            ..CompileOptions::default()
        });
        let out = compiler.compile_source("resource noop n {}", None).unwrap();
        assert_eq!(out.graph.vertex_count(), 1);
    }

    #[test]
    fn test_compile_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.gantry");
        std::fs::write(&path, PIPELINE).unwrap();
        let compiler = compiler(Arc::new(MemoryWorld::new()), false);
        let out = compiler.compile_file(&path, None).unwrap();
        assert_eq!(out.graph.vertex_count(), 2);

        let missing = compiler.compile_file(&dir.path().join("nope"), None);
        assert!(matches!(missing, Err(CompileError::Io { .. })));
    }

    #[test]
    fn test_options_from_json() {
        let options: CompileOptions = serde_json::from_str(r#"{"hostname":"h2"}"#).unwrap();
        assert_eq!(options.hostname, "h2");
        assert!(!options.noop);
    }

    proptest! {
        #[test]
        fn test_accumulate_length(values in proptest::collection::vec("[a-z]{0,6}", 1..12)) {
            let body: String = values
                .iter()
                .map(|v| format!("  comment += \"{}\"\n", v))
                .collect();
            let src = format!("resource noop p {{\n{}}}\n", body);
            let graph = compile(&src).graph;
            let names = graph.find("noop", "p").unwrap().resource().attribute("comment").cloned();
            let expected = Value::List(values.iter().map(|v| Value::from(v.as_str())).collect());
            prop_assert_eq!(names, Some(expected));
        }
    }
}
