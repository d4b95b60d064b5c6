//! Resource dependency graph.
//!
//! The graph is the result of compiling a resource file. Vertices are
//! reference-counted so that a vertex carried over from the previous
//! generation keeps its identity, along with any runtime state the
//! reconciliation engine attached to it.

use crate::registry::canonical_kind;
use crate::resource::ManagedResource;
use gantry_core::{ContentHash, CoreError, CoreResult, VertexId};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Lookup key of a vertex: canonical kind and name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexKey {
    /// Canonical kind
    pub kind: String,
    /// Resource name
    pub name: String,
}

impl VertexKey {
    /// Create a key, normalizing the kind
    #[must_use]
    pub fn new(kind: &str, name: &str) -> Self {
        Self {
            kind: canonical_kind(kind),
            name: name.to_string(),
        }
    }

    /// Key of a resource
    #[must_use]
    pub fn of(resource: &ManagedResource) -> Self {
        Self::new(&resource.kind, &resource.name)
    }
}

impl fmt::Display for VertexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.kind, self.name)
    }
}

/// A vertex wrapping exactly one resource
#[derive(Debug)]
pub struct Vertex {
    id: VertexId,
    resource: ManagedResource,
    hash: ContentHash,
}

impl Vertex {
    /// Create a vertex, hashing the resource content
    ///
    /// # Errors
    ///
    /// Returns error if the resource cannot be encoded
    pub fn new(resource: ManagedResource) -> CoreResult<Self> {
        let hash = resource.content_hash()?;
        Ok(Self::with_hash(resource, hash))
    }

    /// Create a vertex from an already computed hash
    #[must_use]
    pub fn with_hash(resource: ManagedResource, hash: ContentHash) -> Self {
        Self {
            id: VertexId::new(),
            resource,
            hash,
        }
    }

    /// Stable identity of this vertex object
    #[must_use]
    pub const fn id(&self) -> VertexId {
        self.id
    }

    /// Wrapped resource
    #[must_use]
    pub const fn resource(&self) -> &ManagedResource {
        &self.resource
    }

    /// Content hash of the wrapped resource
    #[must_use]
    pub const fn content_hash(&self) -> ContentHash {
        self.hash
    }

    /// Lookup key
    #[must_use]
    pub fn key(&self) -> VertexKey {
        VertexKey::of(&self.resource)
    }
}

/// A directed edge between two vertices
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Edge name
    pub name: String,
    /// Source vertex
    pub from: VertexKey,
    /// Target vertex
    pub to: VertexKey,
    /// Whether the target is notified when the source changes
    pub notify: bool,
}

impl Edge {
    /// Create a non-notifying edge
    #[must_use]
    pub fn new(name: impl Into<String>, from: VertexKey, to: VertexKey) -> Self {
        Self {
            name: name.into(),
            from,
            to,
            notify: false,
        }
    }

    /// Set the notify flag
    #[must_use]
    pub fn with_notify(mut self, notify: bool) -> Self {
        self.notify = notify;
        self
    }
}

/// A directed graph of resources
#[derive(Debug, Clone)]
pub struct Graph {
    name: String,
    vertices: IndexMap<VertexKey, Arc<Vertex>>,
    edges: Vec<Edge>,
}

impl Graph {
    /// Create a new empty graph
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vertices: IndexMap::new(),
            edges: Vec::new(),
        }
    }

    /// Graph name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a vertex
    ///
    /// # Errors
    ///
    /// Returns error if a vertex with the same key already exists
    pub fn add_vertex(&mut self, vertex: Arc<Vertex>) -> CoreResult<()> {
        let key = vertex.key();
        if self.vertices.contains_key(&key) {
            return Err(CoreError::AlreadyExists {
                kind: "Vertex".to_string(),
                id: key.to_string(),
            });
        }
        self.vertices.insert(key, vertex);
        Ok(())
    }

    /// Add an edge
    ///
    /// # Errors
    ///
    /// Returns error if either endpoint is not a vertex of this graph
    pub fn add_edge(&mut self, edge: Edge) -> CoreResult<()> {
        for key in [&edge.from, &edge.to] {
            if !self.vertices.contains_key(key) {
                return Err(CoreError::NotFound {
                    kind: "Vertex".to_string(),
                    id: key.to_string(),
                });
            }
        }
        self.edges.push(edge);
        Ok(())
    }

    /// Vertex by key
    #[must_use]
    pub fn vertex(&self, key: &VertexKey) -> Option<&Arc<Vertex>> {
        self.vertices.get(key)
    }

    /// Vertex by kind and name
    #[must_use]
    pub fn find(&self, kind: &str, name: &str) -> Option<&Arc<Vertex>> {
        self.vertex(&VertexKey::new(kind, name))
    }

    /// Vertex with the same key and identical content, if any
    #[must_use]
    pub fn get_vertex_match(&self, key: &VertexKey, hash: ContentHash) -> Option<Arc<Vertex>> {
        self.vertices
            .get(key)
            .filter(|v| v.content_hash() == hash)
            .cloned()
    }

    /// All vertices in insertion order
    pub fn vertices(&self) -> impl Iterator<Item = &Arc<Vertex>> {
        self.vertices.values()
    }

    /// All edges in insertion order
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Vertices that the given vertex points to
    #[must_use]
    pub fn dependents(&self, key: &VertexKey) -> Vec<&VertexKey> {
        self.edges
            .iter()
            .filter(|e| &e.from == key)
            .map(|e| &e.to)
            .collect()
    }

    /// Vertices that point to the given vertex
    #[must_use]
    pub fn dependencies(&self, key: &VertexKey) -> Vec<&VertexKey> {
        self.edges
            .iter()
            .filter(|e| &e.to == key)
            .map(|e| &e.from)
            .collect()
    }

    /// Vertex keys ordered so that every edge points forward, or `None`
    /// if the graph has a cycle
    #[must_use]
    pub fn topological_order(&self) -> Option<Vec<VertexKey>> {
        let mut in_degree: IndexMap<&VertexKey, usize> =
            self.vertices.keys().map(|k| (k, 0)).collect();
        for edge in &self.edges {
            if let Some(d) = in_degree.get_mut(&edge.to) {
                *d += 1;
            }
        }

        let mut ready: Vec<&VertexKey> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(k, _)| *k)
            .rev()
            .collect();
        let mut order = Vec::with_capacity(self.vertices.len());

        while let Some(current) = ready.pop() {
            order.push(current.clone());
            for next in self.dependents(current) {
                if let Some(d) = in_degree.get_mut(next) {
                    *d -= 1;
                    if *d == 0 {
                        ready.push(next);
                    }
                }
            }
        }

        (order.len() == self.vertices.len()).then_some(order)
    }

    /// Check for a directed cycle
    #[must_use]
    pub fn has_cycle(&self) -> bool {
        self.topological_order().is_none()
    }

    /// Compare vertex content and edges, ignoring vertex identity
    #[must_use]
    pub fn structurally_eq(&self, other: &Self) -> bool {
        let mine: IndexSet<(&VertexKey, ContentHash)> = self
            .vertices
            .iter()
            .map(|(k, v)| (k, v.content_hash()))
            .collect();
        let theirs: IndexSet<(&VertexKey, ContentHash)> = other
            .vertices
            .iter()
            .map(|(k, v)| (k, v.content_hash()))
            .collect();
        let my_edges: IndexSet<&Edge> = self.edges.iter().collect();
        let their_edges: IndexSet<&Edge> = other.edges.iter().collect();
        mine == theirs && my_edges == their_edges
    }

    /// Get total vertex count
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get total edge count
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Check if graph has no vertices
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Plain JSON form for display
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "vertices": self
                .vertices
                .values()
                .map(|v| {
                    let mut json = v.resource().to_json();
                    json["id"] = serde_json::Value::String(v.id().to_string());
                    json
                })
                .collect::<Vec<_>>(),
            "edges": self
                .edges
                .iter()
                .map(|e| serde_json::json!({
                    "name": e.name,
                    "from": e.from.to_string(),
                    "to": e.to.to_string(),
                    "notify": e.notify,
                }))
                .collect::<Vec<_>>(),
        })
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("Graph")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(kind: &str, name: &str) -> Arc<Vertex> {
        Arc::new(Vertex::new(ManagedResource::new(kind, name)).unwrap())
    }

    fn chain(names: &[&str]) -> Graph {
        let mut graph = Graph::default();
        for name in names {
            graph.add_vertex(vertex("exec", name)).unwrap();
        }
        for pair in names.windows(2) {
            graph
                .add_edge(Edge::new(
                    "e",
                    VertexKey::new("exec", pair[0]),
                    VertexKey::new("exec", pair[1]),
                ))
                .unwrap();
        }
        graph
    }

    #[test]
    fn test_graph_new() {
        let graph = Graph::default();
        assert!(graph.is_empty());
        assert_eq!(graph.name(), "Graph");
        assert_eq!(graph.vertex_count(), 0);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_vertex_key_normalizes_kind() {
        let key = VertexKey::new("file", "motd");
        assert_eq!(key, VertexKey::new("File", "motd"));
        assert_eq!(key.to_string(), "File[motd]");
    }

    #[test]
    fn test_add_vertex_duplicate() {
        let mut graph = Graph::default();
        graph.add_vertex(vertex("file", "a")).unwrap();
        let result = graph.add_vertex(vertex("File", "a"));
        assert!(matches!(result, Err(CoreError::AlreadyExists { .. })));
    }

    #[test]
    fn test_find() {
        let mut graph = Graph::default();
        let v = vertex("file", "a");
        graph.add_vertex(v.clone()).unwrap();
        assert!(Arc::ptr_eq(graph.find("file", "a").unwrap(), &v));
        assert!(graph.find("file", "b").is_none());
    }

    #[test]
    fn test_add_edge_missing_endpoint() {
        let mut graph = Graph::default();
        graph.add_vertex(vertex("file", "a")).unwrap();
        let result = graph.add_edge(Edge::new(
            "e",
            VertexKey::new("file", "a"),
            VertexKey::new("file", "b"),
        ));
        assert!(matches!(result, Err(CoreError::NotFound { .. })));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_dependents_and_dependencies() {
        let graph = chain(&["a", "b", "c"]);
        let b = VertexKey::new("exec", "b");
        assert_eq!(graph.dependents(&b), vec![&VertexKey::new("exec", "c")]);
        assert_eq!(graph.dependencies(&b), vec![&VertexKey::new("exec", "a")]);
    }

    #[test]
    fn test_topological_order() {
        let graph = chain(&["a", "b", "c"]);
        let order = graph.topological_order().unwrap();
        let names: Vec<_> = order.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(!graph.has_cycle());
    }

    #[test]
    fn test_cycle_detected() {
        let mut graph = chain(&["a", "b"]);
        graph
            .add_edge(Edge::new(
                "back",
                VertexKey::new("exec", "b"),
                VertexKey::new("exec", "a"),
            ))
            .unwrap();
        assert!(graph.has_cycle());
        assert!(graph.topological_order().is_none());
    }

    #[test]
    fn test_get_vertex_match() {
        let mut graph = Graph::default();
        let res = ManagedResource::new("file", "a").with_attribute("path", "/a");
        let v = Arc::new(Vertex::new(res.clone()).unwrap());
        graph.add_vertex(v.clone()).unwrap();

        let key = VertexKey::of(&res);
        let same = graph.get_vertex_match(&key, res.content_hash().unwrap());
        assert!(Arc::ptr_eq(&same.unwrap(), &v));

        let changed = res.with_attribute("path", "/b");
        assert!(graph
            .get_vertex_match(&key, changed.content_hash().unwrap())
            .is_none());
    }

    #[test]
    fn test_structurally_eq_ignores_identity() {
        let a = chain(&["x", "y"]);
        let b = chain(&["x", "y"]);
        assert!(a.structurally_eq(&b));
        let first = a.find("exec", "x").unwrap();
        let second = b.find("exec", "x").unwrap();
        assert_ne!(first.id(), second.id());

        let c = chain(&["x", "z"]);
        assert!(!a.structurally_eq(&c));
    }

    #[test]
    fn test_edge_with_notify() {
        let edge = Edge::new("e", VertexKey::new("file", "a"), VertexKey::new("exec", "b"))
            .with_notify(true);
        assert!(edge.notify);
        assert_eq!(edge.from.kind, "File");
    }

    #[test]
    fn test_to_json() {
        let graph = chain(&["a", "b"]);
        let json = graph.to_json();
        assert_eq!(json["vertices"].as_array().unwrap().len(), 2);
        assert_eq!(json["edges"][0]["from"], "Exec[a]");
    }
}
