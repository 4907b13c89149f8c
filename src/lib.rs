//! Schema Annotation Compatibility
//!
//! Checks whether the annotations attached to a schema (validation rules,
//! deprecation markers, ...) stay backward compatible between an older and a
//! newer version of that schema.
//!
//! ## Features
//!
//! - **Context-aware traversal**: every node is visited once with its path,
//!   enclosing record field and enclosing union member
//! - **Path indexing**: resolved annotations are indexed by structural path
//! - **Pluggable handlers**: each annotation namespace is judged by its own
//!   [`AnnotationHandler`]
//! - **Fail-fast**: resolution or handler failures abort the whole check
//!
//! ## Architecture
//!
//! ```text
//! older schema ──resolve──▶ traverse ──▶ NodeIndex ─┐
//!                                                   ├─▶ check_indexes ──▶ Vec<CompatibilityResult>
//! newer schema ──resolve──▶ traverse ──▶ NodeIndex ─┘        ▲
//!                                                            │
//!                                             handlers (one per namespace)
//! ```
//!
//! Only paths present in the older index are visited. An annotated node that
//! exists only in the newer schema is never reported.

pub mod annotation;
pub mod compatibility;
pub mod config;
pub mod error;
pub mod path;
pub mod schema;
pub mod traverse;

pub use annotation::{
    build_node_index, AnnotationHandler, CheckContext, DeclaredPropertiesResolver,
    GenericAnnotationHandler, IndexedNode, NodeIndex, PropertyResolver,
    ResolvedPropertiesCollector,
};
pub use compatibility::{
    check_indexes, is_backward_compatible, AnnotationCompatibilityChecker, CompatibilityMessage,
    CompatibilityResult, Impact,
};
pub use config::{CheckerConfig, HandlerConfig};
pub use error::{AnnotationError, Result};
pub use path::PathSpec;
pub use schema::{DataSchema, Field, PrimitiveKind, ResolvedProperties, UnionMember};
pub use traverse::{Order, SchemaTraverser, SchemaVisitor, TraverserContext};
