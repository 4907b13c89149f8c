//! Annotation resolution, indexing and the handler contract
//!
//! - [`resolver`]: turns declared properties into resolved properties
//! - [`collector`]: indexes resolved properties by schema path
//! - [`handler`]: the per-namespace compatibility contract
//! - [`generic`]: a configurable handler for plain key/value annotations

pub mod collector;
pub mod generic;
pub mod handler;
pub mod resolver;

pub use collector::{build_node_index, IndexedNode, NodeIndex, ResolvedPropertiesCollector};
pub use generic::GenericAnnotationHandler;
pub use handler::{AnnotationHandler, CheckContext};
pub use resolver::{DeclaredPropertiesResolver, PropertyResolver, ResolutionIssue, ResolutionOutcome};
