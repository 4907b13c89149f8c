//! Schema tree model
//!
//! The tree the traversal walks. Each node carries the properties declared on
//! it in the source document, plus a resolved property set that stays empty
//! until a [`PropertyResolver`](crate::annotation::PropertyResolver) fills it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::error::{AnnotationError, Result};

/// Annotation properties keyed by namespace
pub type Properties = BTreeMap<String, Value>;

/// Effective (post-resolution) annotation properties of one schema node
pub type ResolvedProperties = Properties;

/// Primitive schema kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
}

impl PrimitiveKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            PrimitiveKind::Null => "null",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::Bytes => "bytes",
            PrimitiveKind::String => "string",
        }
    }
}

/// A node in a schema tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DataSchema {
    Record(RecordSchema),
    Union(UnionSchema),
    Array(ArraySchema),
    Map(MapSchema),
    Typeref(TyperefSchema),
    Enum(EnumSchema),
    Fixed(FixedSchema),
    Primitive(PrimitiveSchema),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSchema {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: Properties,
    #[serde(skip)]
    pub resolved_properties: ResolvedProperties,
}

/// A record field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub schema: DataSchema,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionSchema {
    pub members: Vec<UnionMember>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: Properties,
    #[serde(skip)]
    pub resolved_properties: ResolvedProperties,
}

/// A union branch, optionally aliased
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionMember {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(rename = "type")]
    pub schema: DataSchema,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArraySchema {
    pub items: Box<DataSchema>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: Properties,
    #[serde(skip)]
    pub resolved_properties: ResolvedProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapSchema {
    pub values: Box<DataSchema>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: Properties,
    #[serde(skip)]
    pub resolved_properties: ResolvedProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TyperefSchema {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(rename = "ref")]
    pub referenced: Box<DataSchema>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: Properties,
    #[serde(skip)]
    pub resolved_properties: ResolvedProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumSchema {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: Properties,
    #[serde(skip)]
    pub resolved_properties: ResolvedProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedSchema {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub size: usize,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: Properties,
    #[serde(skip)]
    pub resolved_properties: ResolvedProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveSchema {
    pub kind: PrimitiveKind,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: Properties,
    #[serde(skip)]
    pub resolved_properties: ResolvedProperties,
}

fn qualify(namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => format!("{}.{}", ns, name),
        _ => name.to_string(),
    }
}

impl DataSchema {
    pub fn primitive(kind: PrimitiveKind) -> Self {
        DataSchema::Primitive(PrimitiveSchema {
            kind,
            properties: Properties::new(),
            resolved_properties: ResolvedProperties::new(),
        })
    }

    pub fn record(name: impl Into<String>, fields: Vec<Field>) -> Self {
        DataSchema::Record(RecordSchema {
            name: name.into(),
            namespace: None,
            fields,
            properties: Properties::new(),
            resolved_properties: ResolvedProperties::new(),
        })
    }

    pub fn union(members: Vec<UnionMember>) -> Self {
        DataSchema::Union(UnionSchema {
            members,
            properties: Properties::new(),
            resolved_properties: ResolvedProperties::new(),
        })
    }

    pub fn array(items: DataSchema) -> Self {
        DataSchema::Array(ArraySchema {
            items: Box::new(items),
            properties: Properties::new(),
            resolved_properties: ResolvedProperties::new(),
        })
    }

    pub fn map(values: DataSchema) -> Self {
        DataSchema::Map(MapSchema {
            values: Box::new(values),
            properties: Properties::new(),
            resolved_properties: ResolvedProperties::new(),
        })
    }

    pub fn typeref(name: impl Into<String>, referenced: DataSchema) -> Self {
        DataSchema::Typeref(TyperefSchema {
            name: name.into(),
            namespace: None,
            referenced: Box::new(referenced),
            properties: Properties::new(),
            resolved_properties: ResolvedProperties::new(),
        })
    }

    pub fn enumeration<I, S>(name: impl Into<String>, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DataSchema::Enum(EnumSchema {
            name: name.into(),
            namespace: None,
            symbols: symbols.into_iter().map(Into::into).collect(),
            properties: Properties::new(),
            resolved_properties: ResolvedProperties::new(),
        })
    }

    pub fn fixed(name: impl Into<String>, size: usize) -> Self {
        DataSchema::Fixed(FixedSchema {
            name: name.into(),
            namespace: None,
            size,
            properties: Properties::new(),
            resolved_properties: ResolvedProperties::new(),
        })
    }

    /// Attach a declared property (builder style)
    pub fn with_property(mut self, namespace: impl Into<String>, value: Value) -> Self {
        self.properties_mut().insert(namespace.into(), value);
        self
    }

    /// Set the namespace of a named schema; no-op for anonymous kinds
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = Some(namespace.into());
        match &mut self {
            DataSchema::Record(s) => s.namespace = namespace,
            DataSchema::Typeref(s) => s.namespace = namespace,
            DataSchema::Enum(s) => s.namespace = namespace,
            DataSchema::Fixed(s) => s.namespace = namespace,
            _ => {}
        }
        self
    }

    /// Load a schema from a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let schema: DataSchema = serde_json::from_str(json)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Read and load a schema document from disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Load a schema from a JSON value
    pub fn from_value(value: Value) -> Result<Self> {
        let schema: DataSchema = serde_json::from_value(value)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Check structural constraints serde cannot express.
    ///
    /// Field names must be unique within a record and member keys unique
    /// within a union, otherwise two nodes would share a path.
    pub fn validate(&self) -> Result<()> {
        match self {
            DataSchema::Record(record) => {
                let mut seen = HashSet::new();
                for field in &record.fields {
                    if !seen.insert(field.name.as_str()) {
                        return Err(AnnotationError::InvalidSchema(format!(
                            "duplicate field \"{}\" in record {}",
                            field.name,
                            qualify(record.namespace.as_deref(), &record.name)
                        )));
                    }
                    field.schema.validate()?;
                }
                Ok(())
            }
            DataSchema::Union(union) => {
                let mut seen = HashSet::new();
                for member in &union.members {
                    let key = member.key();
                    if !seen.insert(key.clone()) {
                        return Err(AnnotationError::InvalidSchema(format!(
                            "duplicate union member \"{}\"",
                            key
                        )));
                    }
                    member.schema.validate()?;
                }
                Ok(())
            }
            DataSchema::Array(array) => array.items.validate(),
            DataSchema::Map(map) => map.values.validate(),
            DataSchema::Typeref(typeref) => typeref.referenced.validate(),
            DataSchema::Enum(_) | DataSchema::Fixed(_) | DataSchema::Primitive(_) => Ok(()),
        }
    }

    /// Type keyword of this node (e.g. "record", "int")
    pub fn type_keyword(&self) -> &'static str {
        match self {
            DataSchema::Record(_) => "record",
            DataSchema::Union(_) => "union",
            DataSchema::Array(_) => "array",
            DataSchema::Map(_) => "map",
            DataSchema::Typeref(_) => "typeref",
            DataSchema::Enum(_) => "enum",
            DataSchema::Fixed(_) => "fixed",
            DataSchema::Primitive(p) => p.kind.keyword(),
        }
    }

    /// Simple name of a named schema
    pub fn name(&self) -> Option<&str> {
        match self {
            DataSchema::Record(s) => Some(&s.name),
            DataSchema::Typeref(s) => Some(&s.name),
            DataSchema::Enum(s) => Some(&s.name),
            DataSchema::Fixed(s) => Some(&s.name),
            _ => None,
        }
    }

    /// Namespace-qualified name of a named schema
    pub fn full_name(&self) -> Option<String> {
        match self {
            DataSchema::Record(s) => Some(qualify(s.namespace.as_deref(), &s.name)),
            DataSchema::Typeref(s) => Some(qualify(s.namespace.as_deref(), &s.name)),
            DataSchema::Enum(s) => Some(qualify(s.namespace.as_deref(), &s.name)),
            DataSchema::Fixed(s) => Some(qualify(s.namespace.as_deref(), &s.name)),
            _ => None,
        }
    }

    /// Label used in error messages: full name, or type keyword for anonymous kinds
    pub fn display_name(&self) -> String {
        self.full_name()
            .unwrap_or_else(|| self.type_keyword().to_string())
    }

    /// Key identifying this schema as an unaliased union member
    pub fn union_member_key(&self) -> String {
        self.display_name()
    }

    pub fn properties(&self) -> &Properties {
        match self {
            DataSchema::Record(s) => &s.properties,
            DataSchema::Union(s) => &s.properties,
            DataSchema::Array(s) => &s.properties,
            DataSchema::Map(s) => &s.properties,
            DataSchema::Typeref(s) => &s.properties,
            DataSchema::Enum(s) => &s.properties,
            DataSchema::Fixed(s) => &s.properties,
            DataSchema::Primitive(s) => &s.properties,
        }
    }

    pub fn properties_mut(&mut self) -> &mut Properties {
        match self {
            DataSchema::Record(s) => &mut s.properties,
            DataSchema::Union(s) => &mut s.properties,
            DataSchema::Array(s) => &mut s.properties,
            DataSchema::Map(s) => &mut s.properties,
            DataSchema::Typeref(s) => &mut s.properties,
            DataSchema::Enum(s) => &mut s.properties,
            DataSchema::Fixed(s) => &mut s.properties,
            DataSchema::Primitive(s) => &mut s.properties,
        }
    }

    pub fn resolved_properties(&self) -> &ResolvedProperties {
        match self {
            DataSchema::Record(s) => &s.resolved_properties,
            DataSchema::Union(s) => &s.resolved_properties,
            DataSchema::Array(s) => &s.resolved_properties,
            DataSchema::Map(s) => &s.resolved_properties,
            DataSchema::Typeref(s) => &s.resolved_properties,
            DataSchema::Enum(s) => &s.resolved_properties,
            DataSchema::Fixed(s) => &s.resolved_properties,
            DataSchema::Primitive(s) => &s.resolved_properties,
        }
    }

    pub fn resolved_properties_mut(&mut self) -> &mut ResolvedProperties {
        match self {
            DataSchema::Record(s) => &mut s.resolved_properties,
            DataSchema::Union(s) => &mut s.resolved_properties,
            DataSchema::Array(s) => &mut s.resolved_properties,
            DataSchema::Map(s) => &mut s.resolved_properties,
            DataSchema::Typeref(s) => &mut s.resolved_properties,
            DataSchema::Enum(s) => &mut s.resolved_properties,
            DataSchema::Fixed(s) => &mut s.resolved_properties,
            DataSchema::Primitive(s) => &mut s.resolved_properties,
        }
    }
}

impl Field {
    pub fn new(name: impl Into<String>, schema: DataSchema) -> Self {
        Self {
            name: name.into(),
            schema,
            optional: false,
            properties: Properties::new(),
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_property(mut self, namespace: impl Into<String>, value: Value) -> Self {
        self.properties.insert(namespace.into(), value);
        self
    }
}

impl UnionMember {
    pub fn new(schema: DataSchema) -> Self {
        Self {
            alias: None,
            schema,
            properties: Properties::new(),
        }
    }

    pub fn aliased(alias: impl Into<String>, schema: DataSchema) -> Self {
        Self {
            alias: Some(alias.into()),
            schema,
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, namespace: impl Into<String>, value: Value) -> Self {
        self.properties.insert(namespace.into(), value);
        self
    }

    /// Alias if present, otherwise the member schema's union member key
    pub fn key(&self) -> String {
        self.alias
            .clone()
            .unwrap_or_else(|| self.schema.union_member_key())
    }
}
