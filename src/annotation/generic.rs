//! Built-in handler for key/value annotations
//!
//! Treats an annotation namespace as an object of independent fields:
//! adding or removing the whole namespace is breaking, removing a field is
//! breaking, and updating or adding a field is compatible unless configured
//! otherwise.

use serde_json::Value;

use super::handler::{AnnotationHandler, CheckContext};
use crate::compatibility::{CompatibilityResult, Impact};
use crate::config::HandlerConfig;
use crate::path::PathSpec;
use crate::schema::ResolvedProperties;

/// Configurable handler for one namespace
#[derive(Debug, Clone)]
pub struct GenericAnnotationHandler {
    namespace: String,
    allow_value_updates: bool,
    allow_field_additions: bool,
}

impl GenericAnnotationHandler {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            allow_value_updates: true,
            allow_field_additions: true,
        }
    }

    /// Whether changing a field's value is backward compatible
    pub fn allow_value_updates(mut self, allow: bool) -> Self {
        self.allow_value_updates = allow;
        self
    }

    /// Whether adding a field to an existing annotation is backward compatible
    pub fn allow_field_additions(mut self, allow: bool) -> Self {
        self.allow_field_additions = allow;
        self
    }

    fn impact(compatible: bool) -> Impact {
        if compatible {
            Impact::AnnotationCompatibleChange
        } else {
            Impact::AnnotationIncompatibleChange
        }
    }

    fn wording(compatible: bool) -> &'static str {
        if compatible {
            "compatible"
        } else {
            "incompatible"
        }
    }

    fn compare_fields(
        &self,
        older: &serde_json::Map<String, Value>,
        newer: &serde_json::Map<String, Value>,
        path: &PathSpec,
        result: &mut CompatibilityResult,
    ) {
        for (field, older_value) in older {
            match newer.get(field) {
                None => result.add(
                    path.clone(),
                    Impact::AnnotationIncompatibleChange,
                    "remove annotation field \"{}\" is backward incompatible change",
                    [field.as_str()],
                ),
                Some(newer_value) if newer_value != older_value => result.add(
                    path.clone(),
                    Self::impact(self.allow_value_updates),
                    format!(
                        "Updating annotation field \"{{}}\" value is backward {} change",
                        Self::wording(self.allow_value_updates)
                    ),
                    [field.as_str()],
                ),
                Some(_) => {}
            }
        }

        for field in newer.keys().filter(|k| !older.contains_key(*k)) {
            result.add(
                path.clone(),
                Self::impact(self.allow_field_additions),
                format!(
                    "Adding annotation field \"{{}}\" is backward {} change",
                    Self::wording(self.allow_field_additions)
                ),
                [field.as_str()],
            );
        }
    }
}

impl From<&HandlerConfig> for GenericAnnotationHandler {
    fn from(config: &HandlerConfig) -> Self {
        Self::new(config.namespace.clone())
            .allow_value_updates(config.allow_value_updates)
            .allow_field_additions(config.allow_field_additions)
    }
}

impl AnnotationHandler for GenericAnnotationHandler {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn validate(&self, value: &Value, _path: &PathSpec) -> Vec<String> {
        if value.is_null() {
            vec![format!("annotation \"{}\" must not be null", self.namespace)]
        } else {
            Vec::new()
        }
    }

    fn check(
        &self,
        older: &ResolvedProperties,
        newer: &ResolvedProperties,
        older_context: &CheckContext<'_>,
        _newer_context: &CheckContext<'_>,
    ) -> anyhow::Result<CompatibilityResult> {
        let path = older_context.path_to_schema();
        let mut result = CompatibilityResult::new();

        match (older.get(&self.namespace), newer.get(&self.namespace)) {
            (None, None) => {}
            (None, Some(_)) => result.add(
                path.clone(),
                Impact::AnnotationIncompatibleChange,
                "Adding new annotation \"{}\" is backward incompatible change",
                [self.namespace.as_str()],
            ),
            (Some(_), None) => result.add(
                path.clone(),
                Impact::AnnotationIncompatibleChange,
                "Deleting existed annotation \"{}\" is backward incompatible change",
                [self.namespace.as_str()],
            ),
            (Some(Value::Object(older_fields)), Some(Value::Object(newer_fields))) => {
                self.compare_fields(older_fields, newer_fields, path, &mut result);
            }
            (Some(older_value), Some(newer_value)) => {
                if older_value != newer_value {
                    result.add(
                        path.clone(),
                        Self::impact(self.allow_value_updates),
                        format!(
                            "Updating annotation \"{{}}\" value is backward {} change",
                            Self::wording(self.allow_value_updates)
                        ),
                        [self.namespace.as_str()],
                    );
                }
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DataSchema, PrimitiveKind};
    use serde_json::json;

    fn props(entries: &[(&str, Value)]) -> ResolvedProperties {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn run(
        handler: &GenericAnnotationHandler,
        older: ResolvedProperties,
        newer: ResolvedProperties,
    ) -> Vec<String> {
        let schema = DataSchema::primitive(PrimitiveKind::Int);
        let path = PathSpec::new(["TestSchema", "field1"]);
        let older_ctx = CheckContext::new(&schema, None, None, path.clone());
        let newer_ctx = CheckContext::new(&schema, None, None, path);
        handler
            .check(&older, &newer, &older_ctx, &newer_ctx)
            .unwrap()
            .messages()
            .iter()
            .map(|m| format!("{}|{}", m.impact(), m.message()))
            .collect()
    }

    #[test]
    fn test_field_update_is_compatible() {
        let handler = GenericAnnotationHandler::new("bar");
        let messages = run(
            &handler,
            props(&[("bar", json!({"foo": 1}))]),
            props(&[("bar", json!({"foo": 2}))]),
        );
        assert_eq!(
            messages,
            vec!["ANNOTATION_COMPATIBLE_CHANGE|Updating annotation field \"foo\" value is backward compatible change"]
        );
    }

    #[test]
    fn test_field_update_can_be_disallowed() {
        let handler = GenericAnnotationHandler::new("bar").allow_value_updates(false);
        let messages = run(
            &handler,
            props(&[("bar", json!({"foo": 1}))]),
            props(&[("bar", json!({"foo": 2}))]),
        );
        assert_eq!(
            messages,
            vec!["ANNOTATION_INCOMPATIBLE_CHANGE|Updating annotation field \"foo\" value is backward incompatible change"]
        );
    }

    #[test]
    fn test_added_namespace_is_incompatible() {
        let handler = GenericAnnotationHandler::new("bar");
        let messages = run(&handler, props(&[]), props(&[("bar", json!({"foo": 1}))]));
        assert_eq!(
            messages,
            vec!["ANNOTATION_INCOMPATIBLE_CHANGE|Adding new annotation \"bar\" is backward incompatible change"]
        );
    }

    #[test]
    fn test_removed_namespace_is_incompatible() {
        let handler = GenericAnnotationHandler::new("bar");
        let messages = run(&handler, props(&[("bar", json!({"foo": 1}))]), props(&[]));
        assert_eq!(
            messages,
            vec!["ANNOTATION_INCOMPATIBLE_CHANGE|Deleting existed annotation \"bar\" is backward incompatible change"]
        );
    }

    #[test]
    fn test_field_removal_and_addition() {
        let handler = GenericAnnotationHandler::new("bar").allow_field_additions(false);
        let messages = run(
            &handler,
            props(&[("bar", json!({"foo": 1}))]),
            props(&[("bar", json!({"baz": 1}))]),
        );
        assert_eq!(
            messages,
            vec![
                "ANNOTATION_INCOMPATIBLE_CHANGE|remove annotation field \"foo\" is backward incompatible change",
                "ANNOTATION_INCOMPATIBLE_CHANGE|Adding annotation field \"baz\" is backward incompatible change",
            ]
        );
    }

    #[test]
    fn test_identical_properties_report_nothing() {
        let handler = GenericAnnotationHandler::new("bar");
        let same = props(&[("bar", json!({"foo": 1, "nested": {"a": [1, 2]}}))]);
        assert!(run(&handler, same.clone(), same).is_empty());

        let scalar = props(&[("bar", json!(true))]);
        assert!(run(&handler, scalar.clone(), scalar).is_empty());
    }

    #[test]
    fn test_scalar_value_change() {
        let handler = GenericAnnotationHandler::new("deprecated");
        let messages = run(
            &handler,
            props(&[("deprecated", json!(false))]),
            props(&[("deprecated", json!(true))]),
        );
        assert_eq!(
            messages,
            vec!["ANNOTATION_COMPATIBLE_CHANGE|Updating annotation \"deprecated\" value is backward compatible change"]
        );
    }

    #[test]
    fn test_null_rejected_during_validation() {
        let handler = GenericAnnotationHandler::new("bar");
        assert_eq!(handler.validate(&Value::Null, &PathSpec::root()).len(), 1);
        assert!(handler.validate(&json!({}), &PathSpec::root()).is_empty());
    }
}
