//! Annotation resolution
//!
//! Resolution computes the effective annotation set of every schema node.
//! The compatibility engine only depends on the [`PropertyResolver`] contract;
//! [`DeclaredPropertiesResolver`] is the default implementation.

use std::fmt;

use serde_json::Value;

use super::handler::AnnotationHandler;
use crate::path::{PathSpec, ARRAY_ITEMS_SEGMENT, MAP_VALUES_SEGMENT};
use crate::schema::{DataSchema, Properties, ResolvedProperties};

/// A problem found while resolving one annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionIssue {
    pub path: PathSpec,
    pub namespace: String,
    pub message: String,
}

impl fmt::Display for ResolutionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.path, self.namespace, self.message)
    }
}

/// Output of resolving one schema
#[derive(Debug, Clone)]
pub struct ResolutionOutcome {
    /// Copy of the input schema with resolved properties filled in
    pub schema: DataSchema,
    pub issues: Vec<ResolutionIssue>,
}

impl ResolutionOutcome {
    pub fn has_error(&self) -> bool {
        !self.issues.is_empty()
    }

    /// All issues joined into one line
    pub fn error_message(&self) -> String {
        self.issues
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Computes the resolved properties of every node in a schema
pub trait PropertyResolver {
    fn resolve(
        &self,
        schema: &DataSchema,
        handlers: &[Box<dyn AnnotationHandler>],
    ) -> ResolutionOutcome;
}

/// Resolves each node to the properties declared on it.
///
/// Properties declared on a record field or union member are layered over the
/// declared properties of that field's or member's value node, with the field
/// or member winning on conflict. The target of a typeref inherits the
/// typeref's resolved set, with its own declarations filling in only the
/// namespaces the typeref lacks. Only namespaces owned by one of the handlers
/// are kept, and each declared value must pass that handler's `validate`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredPropertiesResolver;

impl PropertyResolver for DeclaredPropertiesResolver {
    fn resolve(
        &self,
        schema: &DataSchema,
        handlers: &[Box<dyn AnnotationHandler>],
    ) -> ResolutionOutcome {
        let mut resolved = schema.clone();
        let mut issues = Vec::new();
        let path = match schema.name() {
            Some(name) => PathSpec::new([name]),
            None => PathSpec::root(),
        };
        resolve_node(&mut resolved, None, None, path, handlers, &mut issues);
        ResolutionOutcome {
            schema: resolved,
            issues,
        }
    }
}

fn resolve_node(
    node: &mut DataSchema,
    enclosing: Option<&Properties>,
    inherited: Option<&ResolvedProperties>,
    path: PathSpec,
    handlers: &[Box<dyn AnnotationHandler>],
    issues: &mut Vec<ResolutionIssue>,
) {
    let mut resolved = ResolvedProperties::new();
    for handler in handlers {
        let namespace = handler.namespace();
        // already validated where it was declared
        if let Some(value) = inherited.and_then(|props| props.get(namespace)) {
            resolved.insert(namespace.to_string(), value.clone());
            continue;
        }
        let value = enclosing
            .and_then(|props| props.get(namespace))
            .or_else(|| node.properties().get(namespace));
        if let Some(value) = value {
            record_issues(handler.as_ref(), value, &path, issues);
            resolved.insert(namespace.to_string(), value.clone());
        }
    }
    *node.resolved_properties_mut() = resolved;

    match node {
        DataSchema::Record(record) => {
            for field in &mut record.fields {
                let child_path = path.child(field.name.as_str());
                resolve_node(
                    &mut field.schema,
                    Some(&field.properties),
                    None,
                    child_path,
                    handlers,
                    issues,
                );
            }
        }
        DataSchema::Union(union) => {
            for member in &mut union.members {
                let child_path = path.child(member.key());
                resolve_node(
                    &mut member.schema,
                    Some(&member.properties),
                    None,
                    child_path,
                    handlers,
                    issues,
                );
            }
        }
        DataSchema::Array(array) => {
            let child_path = path.child(ARRAY_ITEMS_SEGMENT);
            resolve_node(&mut array.items, None, None, child_path, handlers, issues);
        }
        DataSchema::Map(map) => {
            let child_path = path.child(MAP_VALUES_SEGMENT);
            resolve_node(&mut map.values, None, None, child_path, handlers, issues);
        }
        // The target shares the typeref's path and is indexed in its place, so
        // it carries the typeref's set and only fills in missing namespaces.
        DataSchema::Typeref(typeref) => {
            resolve_node(
                &mut typeref.referenced,
                None,
                Some(&typeref.resolved_properties),
                path,
                handlers,
                issues,
            );
        }
        DataSchema::Enum(_) | DataSchema::Fixed(_) | DataSchema::Primitive(_) => {}
    }
}

fn record_issues(
    handler: &dyn AnnotationHandler,
    value: &Value,
    path: &PathSpec,
    issues: &mut Vec<ResolutionIssue>,
) {
    for message in handler.validate(value, path) {
        issues.push(ResolutionIssue {
            path: path.clone(),
            namespace: handler.namespace().to_string(),
            message,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::handler::CheckContext;
    use crate::compatibility::CompatibilityResult;
    use crate::schema::{Field, PrimitiveKind, UnionMember};
    use serde_json::json;

    struct Namespace {
        name: &'static str,
        reject_strings: bool,
    }

    impl AnnotationHandler for Namespace {
        fn namespace(&self) -> &str {
            self.name
        }

        fn validate(&self, value: &Value, _path: &PathSpec) -> Vec<String> {
            if self.reject_strings && value.is_string() {
                vec!["string values are not supported".to_string()]
            } else {
                Vec::new()
            }
        }

        fn check(
            &self,
            _older: &ResolvedProperties,
            _newer: &ResolvedProperties,
            _older_context: &CheckContext<'_>,
            _newer_context: &CheckContext<'_>,
        ) -> anyhow::Result<CompatibilityResult> {
            Ok(CompatibilityResult::new())
        }
    }

    fn handlers(names: &[&'static str]) -> Vec<Box<dyn AnnotationHandler>> {
        names
            .iter()
            .map(|&name| {
                Box::new(Namespace {
                    name,
                    reject_strings: true,
                }) as Box<dyn AnnotationHandler>
            })
            .collect()
    }

    fn field_schema(schema: &DataSchema, index: usize) -> &DataSchema {
        match schema {
            DataSchema::Record(record) => &record.fields[index].schema,
            other => panic!("expected record, got {}", other.type_keyword()),
        }
    }

    #[test]
    fn test_field_properties_override_type_properties() {
        let schema = DataSchema::record(
            "Rec",
            vec![Field::new(
                "count",
                DataSchema::primitive(PrimitiveKind::Int)
                    .with_property("validate", json!({"min": 0}))
                    .with_property("deprecated", json!(true)),
            )
            .with_property("validate", json!({"min": 1}))],
        );

        let outcome = DeclaredPropertiesResolver.resolve(&schema, &handlers(&["validate", "deprecated"]));
        assert!(!outcome.has_error());

        let resolved = field_schema(&outcome.schema, 0).resolved_properties();
        assert_eq!(resolved.get("validate"), Some(&json!({"min": 1})));
        assert_eq!(resolved.get("deprecated"), Some(&json!(true)));
    }

    #[test]
    fn test_unhandled_namespaces_are_dropped() {
        let schema = DataSchema::record("Rec", vec![])
            .with_property("validate", json!({}))
            .with_property("other", json!({}));

        let outcome = DeclaredPropertiesResolver.resolve(&schema, &handlers(&["validate"]));
        let resolved = outcome.schema.resolved_properties();
        assert!(resolved.contains_key("validate"));
        assert!(!resolved.contains_key("other"));

        let none = DeclaredPropertiesResolver.resolve(&schema, &[]);
        assert!(none.schema.resolved_properties().is_empty());
    }

    #[test]
    fn test_member_properties_resolve_onto_member_schema() {
        let schema = DataSchema::union(vec![UnionMember::aliased(
            "n",
            DataSchema::primitive(PrimitiveKind::Long),
        )
        .with_property("validate", json!({"max": 9}))]);

        let outcome = DeclaredPropertiesResolver.resolve(&schema, &handlers(&["validate"]));
        let DataSchema::Union(union) = &outcome.schema else {
            panic!("expected union");
        };
        assert_eq!(
            union.members[0].schema.resolved_properties().get("validate"),
            Some(&json!({"max": 9}))
        );
        assert!(outcome.schema.resolved_properties().is_empty());
    }

    #[test]
    fn test_validation_failures_are_reported_with_path() {
        let schema = DataSchema::record(
            "Rec",
            vec![Field::new("name", DataSchema::primitive(PrimitiveKind::String))
                .with_property("validate", json!("not-an-object"))],
        );

        let outcome = DeclaredPropertiesResolver.resolve(&schema, &handlers(&["validate"]));
        assert!(outcome.has_error());
        assert_eq!(outcome.issues.len(), 1);
        assert_eq!(outcome.issues[0].path, PathSpec::new(["Rec", "name"]));
        assert!(outcome.error_message().contains("string values are not supported"));
    }

    #[test]
    fn test_input_schema_untouched() {
        let schema = DataSchema::record("Rec", vec![]).with_property("validate", json!({}));
        let _ = DeclaredPropertiesResolver.resolve(&schema, &handlers(&["validate"]));
        assert!(schema.resolved_properties().is_empty());
    }

    #[test]
    fn test_typeref_target_inherits_typeref_properties() {
        let schema = DataSchema::record(
            "R",
            vec![Field::new(
                "f",
                DataSchema::typeref(
                    "Url",
                    DataSchema::primitive(PrimitiveKind::String)
                        .with_property("deprecated", json!({"since": 2}))
                        .with_property("validate", json!({"min": 0})),
                ),
            )
            .with_property("validate", json!({"min": 1}))],
        );

        let outcome = DeclaredPropertiesResolver.resolve(&schema, &handlers(&["validate", "deprecated"]));
        assert!(!outcome.has_error());

        let typeref = field_schema(&outcome.schema, 0);
        assert_eq!(typeref.resolved_properties().get("validate"), Some(&json!({"min": 1})));
        assert!(!typeref.resolved_properties().contains_key("deprecated"));

        let DataSchema::Typeref(inner) = typeref else {
            panic!("expected typeref");
        };
        let target = inner.referenced.resolved_properties();
        assert_eq!(target.get("validate"), Some(&json!({"min": 1})));
        assert_eq!(target.get("deprecated"), Some(&json!({"since": 2})));
    }

    #[test]
    fn test_inherited_values_are_validated_once() {
        let schema = DataSchema::record(
            "R",
            vec![Field::new(
                "f",
                DataSchema::typeref("Url", DataSchema::primitive(PrimitiveKind::String)),
            )
            .with_property("validate", json!("bad"))],
        );

        let outcome = DeclaredPropertiesResolver.resolve(&schema, &handlers(&["validate"]));
        assert_eq!(outcome.issues.len(), 1);
        assert_eq!(outcome.issues[0].path, PathSpec::new(["R", "f"]));
    }
}
