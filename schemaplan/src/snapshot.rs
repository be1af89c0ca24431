//! Snapshot engine: validate, canonicalize and content-address a schema.
//!
//! A snapshot's `schema_hash` depends only on models and enums, never on the
//! order the caller declared them in. Models, fields and indexes are sorted by
//! identity key before encoding; enum values keep their declared order since
//! that order is part of the enum's meaning.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::{PlanError, PlanResult};
use crate::schema::{EnumDef, Model, SchemaModel, target_path};

/// Prefix carried by every schema hash.
pub const HASH_PREFIX: &str = "sha256:";

/// Immutable, hashed representation of a schema at one point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub models: Vec<Model>,
    pub enums: Vec<EnumDef>,
    pub schema_hash: String,
    pub created_at: DateTime<Utc>,
}

/// The exact structure that gets hashed. Field order here is the encoding order.
#[derive(Serialize)]
struct CanonicalSchema<'a> {
    models: &'a [Model],
    enums: &'a [EnumDef],
}

impl Snapshot {
    /// Whether both snapshots describe the same schema. Hash equality is the only test.
    pub fn same_schema(&self, other: &Snapshot) -> bool {
        self.schema_hash == other.schema_hash
    }

    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Recompute the hash from content and compare it with the stored one.
    ///
    /// Used for snapshots read back from disk, where the stored hash may no
    /// longer describe a hand-edited body.
    pub fn verify(&self) -> PlanResult<()> {
        let rebuilt = make_snapshot(self.to_schema_model())?;
        if rebuilt.schema_hash != self.schema_hash {
            return Err(PlanError::malformed(
                "schemaHash",
                format!(
                    "stored hash {} does not match content hash {}",
                    self.schema_hash, rebuilt.schema_hash
                ),
            ));
        }
        Ok(())
    }

    pub fn to_schema_model(&self) -> SchemaModel {
        SchemaModel {
            models: self.models.clone(),
            enums: self.enums.clone(),
        }
    }
}

/// Wrap a schema into a snapshot, failing fast on malformed input.
pub fn make_snapshot(schema: SchemaModel) -> PlanResult<Snapshot> {
    validate(&schema)?;

    let SchemaModel { mut models, mut enums } = schema;
    canonicalize(&mut models, &mut enums);

    let schema_hash = hash_canonical(&models, &enums)?;
    log::debug!(
        "snapshot: {} model(s), {} enum(s) -> {schema_hash}",
        models.len(),
        enums.len()
    );

    Ok(Snapshot {
        models,
        enums,
        schema_hash,
        created_at: Utc::now(),
    })
}

/// Canonical hash of a schema without keeping the snapshot around.
pub fn schema_hash(schema: SchemaModel) -> PlanResult<String> {
    make_snapshot(schema).map(|snapshot| snapshot.schema_hash)
}

fn canonicalize(models: &mut [Model], enums: &mut [EnumDef]) {
    models.sort_by(|a, b| a.name.cmp(&b.name));
    for model in models.iter_mut() {
        model.fields.sort_by(|a, b| a.name.cmp(&b.name));
        model.indexes.sort_by(|a, b| a.name.cmp(&b.name));
    }
    enums.sort_by(|a, b| a.name.cmp(&b.name));
}

fn hash_canonical(models: &[Model], enums: &[EnumDef]) -> PlanResult<String> {
    let bytes = serde_json::to_vec(&CanonicalSchema { models, enums })?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{HASH_PREFIX}{}", hex::encode(digest)))
}

fn validate(schema: &SchemaModel) -> PlanResult<()> {
    let mut model_names = BTreeSet::new();
    for model in &schema.models {
        check_name(&model.name, &model.name)?;
        if !model_names.insert(model.name.as_str()) {
            return Err(PlanError::malformed(&model.name, "duplicate model name"));
        }

        let mut field_names = BTreeSet::new();
        for field in &model.fields {
            let key = target_path(&model.name, &field.name);
            check_name(&field.name, &key)?;
            if field.field_type.trim().is_empty() {
                return Err(PlanError::malformed(key, "field type is empty"));
            }
            if !field_names.insert(field.name.as_str()) {
                return Err(PlanError::malformed(key, "duplicate field name"));
            }
        }

        let mut index_names = BTreeSet::new();
        for index in &model.indexes {
            let key = target_path(&model.name, &index.name);
            check_name(&index.name, &key)?;
            if !index_names.insert(index.name.as_str()) {
                return Err(PlanError::malformed(key, "duplicate index name"));
            }
            if index.fields.is_empty() {
                return Err(PlanError::malformed(key, "index covers no fields"));
            }
            for covered in &index.fields {
                if !field_names.contains(covered.as_str()) {
                    return Err(PlanError::malformed(
                        key,
                        format!("index references unknown field '{covered}'"),
                    ));
                }
            }
        }
    }

    let mut enum_names = BTreeSet::new();
    for def in &schema.enums {
        check_name(&def.name, &def.name)?;
        if !enum_names.insert(def.name.as_str()) {
            return Err(PlanError::malformed(&def.name, "duplicate enum name"));
        }

        let mut values = BTreeSet::new();
        for value in &def.values {
            let key = target_path(&def.name, value);
            check_name(value, &key)?;
            if !values.insert(value.as_str()) {
                return Err(PlanError::malformed(key, "duplicate enum value"));
            }
        }
    }

    Ok(())
}

/// Names become segments of dotted target paths, so they must be non-empty and dot-free.
fn check_name(name: &str, key: &str) -> PlanResult<()> {
    if name.trim().is_empty() {
        return Err(PlanError::malformed(key, "name is empty"));
    }
    if name.contains('.') {
        return Err(PlanError::malformed(key, "name contains '.'"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, IndexDef};

    fn user() -> Model {
        Model::new("User")
            .with_field(Field::new("id", "String"))
            .with_field(Field::new("email", "String").unique())
            .with_index(IndexDef::new("user_email", ["email"]).unique())
    }

    fn assert_malformed(schema: SchemaModel, expected_key: &str) {
        match make_snapshot(schema) {
            Err(PlanError::MalformedSchema { key, .. }) => assert_eq!(key, expected_key),
            other => panic!("expected malformed schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_hash_has_prefix_and_hex_digest() {
        let snapshot = make_snapshot(SchemaModel::new().with_model(user())).unwrap();
        assert!(snapshot.schema_hash.starts_with(HASH_PREFIX));
        assert_eq!(snapshot.schema_hash.len(), HASH_PREFIX.len() + 64);
    }

    #[test]
    fn test_hash_ignores_declaration_order() {
        let a = SchemaModel::new()
            .with_model(user())
            .with_model(Model::new("Order").with_field(Field::new("id", "String")))
            .with_enum(EnumDef::new("Role", ["USER", "ADMIN"]));

        let mut reordered_user = user();
        reordered_user.fields.reverse();
        let b = SchemaModel::new()
            .with_enum(EnumDef::new("Role", ["USER", "ADMIN"]))
            .with_model(Model::new("Order").with_field(Field::new("id", "String")))
            .with_model(reordered_user);

        let left = make_snapshot(a).unwrap();
        let right = make_snapshot(b).unwrap();
        assert!(left.same_schema(&right));
        assert_eq!(left.models, right.models);
    }

    #[test]
    fn test_enum_value_order_changes_hash() {
        let a = SchemaModel::new().with_enum(EnumDef::new("Role", ["USER", "ADMIN"]));
        let b = SchemaModel::new().with_enum(EnumDef::new("Role", ["ADMIN", "USER"]));
        assert_ne!(schema_hash(a).unwrap(), schema_hash(b).unwrap());
    }

    #[test]
    fn test_nullable_flag_changes_hash() {
        let status = Field::new("status", "String");
        let a = SchemaModel::new().with_model(Model::new("Order").with_field(status.clone()));
        let b = SchemaModel::new().with_model(Model::new("Order").with_field(status.nullable()));
        assert_ne!(schema_hash(a).unwrap(), schema_hash(b).unwrap());
    }

    #[test]
    fn test_duplicate_model_is_malformed() {
        let schema = SchemaModel::new().with_model(user()).with_model(user());
        assert_malformed(schema, "User");
    }

    #[test]
    fn test_duplicate_field_is_malformed() {
        let model = Model::new("User")
            .with_field(Field::new("email", "String"))
            .with_field(Field::new("email", "Text"));
        assert_malformed(SchemaModel::new().with_model(model), "User.email");
    }

    #[test]
    fn test_duplicate_enum_value_is_malformed() {
        let schema = SchemaModel::new().with_enum(EnumDef::new("Role", ["USER", "USER"]));
        assert_malformed(schema, "Role.USER");
    }

    #[test]
    fn test_index_on_unknown_field_is_malformed() {
        let model = Model::new("User")
            .with_field(Field::new("id", "String"))
            .with_index(IndexDef::new("by_email", ["email"]));
        assert_malformed(SchemaModel::new().with_model(model), "User.by_email");
    }

    #[test]
    fn test_dotted_name_is_malformed() {
        let model = Model::new("User").with_field(Field::new("a.b", "String"));
        assert_malformed(SchemaModel::new().with_model(model), "User.a.b");
    }

    #[test]
    fn test_index_may_share_its_field_name() {
        let plain = Model::new("User").with_field(Field::new("email", "String"));
        let indexed = plain.clone().with_index(IndexDef::new("email", ["email"]));

        let from = make_snapshot(SchemaModel::new().with_model(plain)).unwrap();
        let to = make_snapshot(SchemaModel::new().with_model(indexed)).unwrap();

        let steps = crate::diff::diff(&from, &to).unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].kind, crate::step::StepKind::AddIndex);
        assert_eq!(steps[0].target.as_deref(), Some("User.email"));
    }

    #[test]
    fn test_enum_may_share_a_model_name() {
        let schema = SchemaModel::new()
            .with_model(Model::new("Status").with_field(Field::new("id", "String")))
            .with_enum(EnumDef::new("Status", ["OPEN", "CLOSED"]));
        assert!(make_snapshot(schema).is_ok());
    }

    #[test]
    fn test_verify_detects_edited_body() {
        let mut snapshot = make_snapshot(SchemaModel::new().with_model(user())).unwrap();
        assert!(snapshot.verify().is_ok());

        snapshot.models[0].fields.push(Field::new("age", "Int"));
        assert!(matches!(snapshot.verify(), Err(PlanError::MalformedSchema { .. })));
    }

    #[test]
    fn test_snapshot_json_round_trips_hash() {
        let snapshot = make_snapshot(SchemaModel::new().with_model(user())).unwrap();
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"schemaHash\""));
        assert!(json.contains("\"createdAt\""));

        let decoded: Snapshot = serde_json::from_str(&json).unwrap();
        assert!(decoded.same_schema(&snapshot));
        assert!(decoded.verify().is_ok());
    }
}
