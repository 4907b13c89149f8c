//! Path-to-resolved-properties index
//!
//! [`ResolvedPropertiesCollector`] is a [`SchemaVisitor`] that records, for every
//! node with a non-empty resolved property set, the node's [`CheckContext`] and
//! a reference to its resolved properties. The resulting [`NodeIndex`] is what
//! the compatibility engine aligns across schema versions.

use std::collections::BTreeMap;

use tracing::debug;

use super::handler::CheckContext;
use crate::path::PathSpec;
use crate::schema::{DataSchema, ResolvedProperties};
use crate::traverse::{Order, SchemaTraverser, SchemaVisitor, TraverserContext};

/// One indexed node
#[derive(Debug, Clone)]
pub struct IndexedNode<'s> {
    pub context: CheckContext<'s>,
    pub properties: &'s ResolvedProperties,
}

/// Resolved properties of one schema version, keyed by path.
///
/// Iteration is in path order.
#[derive(Debug, Clone, Default)]
pub struct NodeIndex<'s> {
    entries: BTreeMap<PathSpec, IndexedNode<'s>>,
}

impl<'s> NodeIndex<'s> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, returning whatever was previously stored at `path`
    pub fn insert(&mut self, path: PathSpec, node: IndexedNode<'s>) -> Option<IndexedNode<'s>> {
        self.entries.insert(path, node)
    }

    pub fn get(&self, path: &PathSpec) -> Option<&IndexedNode<'s>> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &PathSpec) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathSpec, &IndexedNode<'s>)> {
        self.entries.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathSpec> {
        self.entries.keys()
    }
}

/// Visitor that builds a [`NodeIndex`]
#[derive(Debug, Default)]
pub struct ResolvedPropertiesCollector<'s> {
    index: NodeIndex<'s>,
}

impl<'s> ResolvedPropertiesCollector<'s> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The index built so far. Complete only once traversal has returned.
    pub fn node_index(&self) -> &NodeIndex<'s> {
        &self.index
    }

    pub fn into_node_index(self) -> NodeIndex<'s> {
        self.index
    }
}

impl<'s> SchemaVisitor<'s> for ResolvedPropertiesCollector<'s> {
    fn callback(&mut self, context: &TraverserContext<'s, '_>, order: Order) {
        if order == Order::PostOrder {
            return;
        }

        let properties = context.current_schema().resolved_properties();
        if properties.is_empty() {
            return;
        }

        let check_context = CheckContext::from_traverser(context);
        let path = check_context.path_to_schema().clone();
        let node = IndexedNode {
            context: check_context,
            properties,
        };
        if self.index.insert(path, node).is_some() {
            // typeref and its target share a path; the deeper node wins
            debug!(path = %context.schema_path_spec(), "replaced indexed node at shared path");
        }
    }
}

/// Traverse `schema` and index its resolved properties
pub fn build_node_index(schema: &DataSchema) -> NodeIndex<'_> {
    let mut collector = ResolvedPropertiesCollector::new();
    SchemaTraverser::new(&mut collector).traverse(schema);
    collector.into_node_index()
}
