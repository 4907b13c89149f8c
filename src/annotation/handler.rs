//! Handler contract for annotation namespaces

use serde_json::Value;

use crate::compatibility::CompatibilityResult;
use crate::path::PathSpec;
use crate::schema::{DataSchema, Field, ResolvedProperties, UnionMember};
use crate::traverse::TraverserContext;

/// Where an annotated node sits, captured once when the node is indexed
#[derive(Debug, Clone)]
pub struct CheckContext<'s> {
    schema: &'s DataSchema,
    schema_field: Option<&'s Field>,
    union_member: Option<&'s UnionMember>,
    path_to_schema: PathSpec,
}

impl<'s> CheckContext<'s> {
    pub fn new(
        schema: &'s DataSchema,
        schema_field: Option<&'s Field>,
        union_member: Option<&'s UnionMember>,
        path_to_schema: PathSpec,
    ) -> Self {
        Self {
            schema,
            schema_field,
            union_member,
            path_to_schema,
        }
    }

    /// Snapshot a traversal position. The path is copied out of the context chain.
    pub fn from_traverser(context: &TraverserContext<'s, '_>) -> Self {
        Self::new(
            context.current_schema(),
            context.enclosing_field(),
            context.enclosing_union_member(),
            context.schema_path_spec(),
        )
    }

    pub fn schema(&self) -> &'s DataSchema {
        self.schema
    }

    pub fn schema_field(&self) -> Option<&'s Field> {
        self.schema_field
    }

    pub fn union_member(&self) -> Option<&'s UnionMember> {
        self.union_member
    }

    pub fn path_to_schema(&self) -> &PathSpec {
        &self.path_to_schema
    }
}

/// Compatibility logic for one annotation namespace.
///
/// The engine calls [`check`](AnnotationHandler::check) for every path present
/// in both schema versions where either side carries this handler's namespace.
/// A handler that wants to flag an added or removed annotation does so by
/// looking for its namespace key on each side.
pub trait AnnotationHandler {
    /// Namespace key this handler owns (e.g. "validate")
    fn namespace(&self) -> &str;

    /// Problems with a declared annotation value, reported during resolution.
    /// An empty list means the value is acceptable.
    fn validate(&self, _value: &Value, _path: &PathSpec) -> Vec<String> {
        Vec::new()
    }

    /// Compare the resolved properties of one node across versions
    fn check(
        &self,
        older: &ResolvedProperties,
        newer: &ResolvedProperties,
        older_context: &CheckContext<'_>,
        newer_context: &CheckContext<'_>,
    ) -> anyhow::Result<CompatibilityResult>;
}
