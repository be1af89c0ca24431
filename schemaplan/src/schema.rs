//! Schema model types: the canonical in-memory form of a data model.
//!
//! These are plain data. A `SchemaModel` is produced by an external parser and
//! handed to [`crate::snapshot::make_snapshot`], which validates and hashes it.

use serde::{Deserialize, Serialize};

/// The logical schema: every model and enum, in caller-provided order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaModel {
    #[serde(default)]
    pub models: Vec<Model>,

    #[serde(default)]
    pub enums: Vec<EnumDef>,
}

impl SchemaModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: Model) -> Self {
        self.models.push(model);
        self
    }

    pub fn with_enum(mut self, def: EnumDef) -> Self {
        self.enums.push(def);
        self
    }
}

/// A single model (table / collection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    /// Model name, unique within the schema (e.g., "User")
    pub name: String,

    /// Fields, unique by name
    #[serde(default)]
    pub fields: Vec<Field>,

    /// Secondary indexes, unique by name
    #[serde(default)]
    pub indexes: Vec<IndexDef>,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_index(mut self, index: IndexDef) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Information about a single field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Field name
    pub name: String,

    /// Declared type as written in the schema source (e.g., "String", "Int", "Role")
    #[serde(rename = "type")]
    pub field_type: String,

    #[serde(default)]
    pub nullable: bool,

    #[serde(default)]
    pub has_default: bool,

    #[serde(default)]
    pub is_unique: bool,

    #[serde(default)]
    pub is_list: bool,
}

impl Field {
    /// A required, scalar, non-unique field without a default.
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            nullable: false,
            has_default: false,
            is_unique: false,
            is_list: false,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    pub fn list(mut self) -> Self {
        self.is_list = true;
        self
    }

    /// Whether existing rows can absorb this field without a backfill.
    pub fn is_optional(&self) -> bool {
        self.nullable || self.has_default
    }
}

/// Secondary index over one or more fields of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDef {
    pub name: String,

    /// Indexed fields; order is significant
    pub fields: Vec<String>,

    #[serde(default)]
    pub unique: bool,
}

impl IndexDef {
    pub fn new<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Enumeration with an ordered list of values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDef {
    pub name: String,

    /// Declared values. Order is meaningful and preserved through hashing.
    #[serde(default)]
    pub values: Vec<String>,
}

impl EnumDef {
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// Join identity segments into a dotted target path (`Model.field`).
pub fn target_path(owner: &str, member: &str) -> String {
    format!("{owner}.{member}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_json_uses_camel_case() {
        let field = Field::new("email", "String").unique();
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["type"], "String");
        assert_eq!(json["isUnique"], true);
        assert_eq!(json["hasDefault"], false);
    }

    #[test]
    fn test_field_flags_default_when_missing() {
        let json = r#"{"name":"age","type":"Int","nullable":true}"#;
        let field: Field = serde_json::from_str(json).unwrap();
        assert!(field.nullable);
        assert!(!field.has_default);
        assert!(!field.is_list);
        assert!(field.is_optional());
    }

    #[test]
    fn test_schema_model_parses_without_enums() {
        let json = r#"{"models":[{"name":"User","fields":[{"name":"id","type":"String"}]}]}"#;
        let schema: SchemaModel = serde_json::from_str(json).unwrap();
        assert_eq!(schema.models.len(), 1);
        assert!(schema.enums.is_empty());
        assert!(schema.models[0].field("id").is_some());
        assert!(schema.models[0].indexes.is_empty());
    }

    #[test]
    fn test_target_path() {
        assert_eq!(target_path("User", "email"), "User.email");
    }
}
