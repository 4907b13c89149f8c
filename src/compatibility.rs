//! Annotation compatibility checking
//!
//! Aligns the annotated nodes of two schema versions by path and asks each
//! registered [`AnnotationHandler`] to judge the nodes that carry its namespace.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::annotation::{
    build_node_index, AnnotationHandler, DeclaredPropertiesResolver, NodeIndex, PropertyResolver,
};
use crate::error::{AnnotationError, Result};
use crate::path::PathSpec;
use crate::schema::DataSchema;

/// How a change affects readers of the older schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Impact {
    /// The annotation changed in a backward compatible way
    AnnotationCompatibleChange,
    /// The annotation changed in a way that breaks backward compatibility
    AnnotationIncompatibleChange,
}

impl Impact {
    pub fn is_breaking(&self) -> bool {
        matches!(self, Impact::AnnotationIncompatibleChange)
    }
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Impact::AnnotationCompatibleChange => write!(f, "ANNOTATION_COMPATIBLE_CHANGE"),
            Impact::AnnotationIncompatibleChange => write!(f, "ANNOTATION_INCOMPATIBLE_CHANGE"),
        }
    }
}

/// One finding reported by a handler.
///
/// The text is kept as a template with `{}` placeholders plus its arguments so
/// reporting layers can re-render or match on the arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityMessage {
    path: PathSpec,
    impact: Impact,
    template: String,
    args: Vec<String>,
}

impl CompatibilityMessage {
    pub fn new<I, S>(path: PathSpec, impact: Impact, template: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path,
            impact,
            template: template.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn path(&self) -> &PathSpec {
        &self.path
    }

    pub fn impact(&self) -> Impact {
        self.impact
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn is_breaking(&self) -> bool {
        self.impact.is_breaking()
    }

    /// The template with each `{}` replaced by the next argument.
    /// Placeholders without a matching argument are left in place.
    pub fn message(&self) -> String {
        let mut rendered = String::with_capacity(self.template.len());
        let mut args = self.args.iter();
        let mut rest = self.template.as_str();
        while let Some(pos) = rest.find("{}") {
            rendered.push_str(&rest[..pos]);
            match args.next() {
                Some(arg) => rendered.push_str(arg),
                None => rendered.push_str("{}"),
            }
            rest = &rest[pos + 2..];
        }
        rendered.push_str(rest);
        rendered
    }
}

impl fmt::Display for CompatibilityMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.path, self.impact, self.message())
    }
}

/// Messages produced by one handler invocation, in emission order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityResult {
    messages: Vec<CompatibilityMessage>,
}

impl CompatibilityResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: CompatibilityMessage) {
        self.messages.push(message);
    }

    /// Build and append a message
    pub fn add<I, S>(&mut self, path: PathSpec, impact: Impact, template: impl Into<String>, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(CompatibilityMessage::new(path, impact, template, args));
    }

    pub fn messages(&self) -> &[CompatibilityMessage] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<CompatibilityMessage> {
        self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// No message in this result is breaking
    pub fn is_compatible(&self) -> bool {
        !self.messages.iter().any(CompatibilityMessage::is_breaking)
    }

    pub fn breaking_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_breaking()).count()
    }
}

/// True when none of the results carries a breaking message
pub fn is_backward_compatible(results: &[CompatibilityResult]) -> bool {
    results.iter().all(CompatibilityResult::is_compatible)
}

/// Run every handler over the paths the two indexes share.
///
/// Handlers run in list order. For each handler, the older index is walked in
/// path order; a path missing from the newer index is skipped, and a handler is
/// only invoked when its namespace appears on at least one side. Paths present
/// only in the newer index are never visited.
///
/// The first handler failure aborts the whole check.
pub fn check_indexes(
    older: &NodeIndex<'_>,
    newer: &NodeIndex<'_>,
    handlers: &[Box<dyn AnnotationHandler>],
) -> Result<Vec<CompatibilityResult>> {
    let mut results = Vec::new();
    for handler in handlers {
        let namespace = handler.namespace();
        for (path, older_node) in older.iter() {
            let Some(newer_node) = newer.get(path) else {
                continue;
            };

            if !older_node.properties.contains_key(namespace)
                && !newer_node.properties.contains_key(namespace)
            {
                continue;
            }

            debug!(%path, namespace, "checking annotation compatibility");
            let result = handler
                .check(
                    older_node.properties,
                    newer_node.properties,
                    &older_node.context,
                    &newer_node.context,
                )
                .map_err(|source| AnnotationError::Handler {
                    namespace: namespace.to_string(),
                    path: path.to_string(),
                    source,
                })?;
            results.push(result);
        }
    }
    Ok(results)
}

/// Checks annotation compatibility between two versions of a schema
#[derive(Debug, Clone, Default)]
pub struct AnnotationCompatibilityChecker<R = DeclaredPropertiesResolver> {
    resolver: R,
}

impl AnnotationCompatibilityChecker<DeclaredPropertiesResolver> {
    /// Checker that resolves nodes to their declared properties
    pub fn with_declared_properties() -> Self {
        Self::new(DeclaredPropertiesResolver)
    }
}

impl<R: PropertyResolver> AnnotationCompatibilityChecker<R> {
    /// Create a checker using a custom resolver
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Resolve both schemas, index their annotated nodes and compare them.
    ///
    /// Fails with [`AnnotationError::ResolutionFailed`] naming the schema if
    /// either side cannot be resolved, and with [`AnnotationError::Handler`] if
    /// a handler fails.
    pub fn check(
        &self,
        older: &DataSchema,
        newer: &DataSchema,
        handlers: &[Box<dyn AnnotationHandler>],
    ) -> Result<Vec<CompatibilityResult>> {
        let older_resolved = self.resolve(older, handlers)?;
        let newer_resolved = self.resolve(newer, handlers)?;

        let older_index = build_node_index(&older_resolved);
        let newer_index = build_node_index(&newer_resolved);
        debug!(
            older = %older.display_name(),
            newer = %newer.display_name(),
            older_nodes = older_index.len(),
            newer_nodes = newer_index.len(),
            "indexed annotated schema nodes"
        );

        check_indexes(&older_index, &newer_index, handlers)
    }

    fn resolve(
        &self,
        schema: &DataSchema,
        handlers: &[Box<dyn AnnotationHandler>],
    ) -> Result<DataSchema> {
        let outcome = self.resolver.resolve(schema, handlers);
        if outcome.has_error() {
            return Err(AnnotationError::ResolutionFailed {
                schema: schema.display_name(),
                details: outcome.error_message(),
            });
        }
        Ok(outcome.schema)
    }
}
