//! Diff engine: structural delta between two snapshots.
//!
//! Every collection is compared through identity-keyed maps and classified as
//! only-left, only-right or present-in-both. Output order is fixed by
//! [`Step::plan_order`], so identical inputs always yield identical plans.
//! Renames are not inferred: a dropped field and an added field stay two steps.

use std::collections::{BTreeMap, BTreeSet};

use crate::errors::{PlanError, PlanResult};
use crate::schema::{EnumDef, Field, IndexDef, Model, target_path};
use crate::snapshot::Snapshot;
use crate::step::{Step, StepKind, StepPayload, Transition};

/// Compare two snapshots and produce unclassified steps in plan order.
pub fn diff(from: &Snapshot, to: &Snapshot) -> PlanResult<Vec<Step>> {
    if from.same_schema(to) {
        log::debug!("diff: {} unchanged, nothing to do", to.schema_hash);
        return Ok(Vec::new());
    }

    let mut steps = Vec::new();
    diff_models(&from.models, &to.models, &mut steps)?;
    diff_enums(&from.enums, &to.enums, &mut steps)?;

    if steps.is_empty() {
        return Err(PlanError::unsupported(
            "<schema>",
            format!(
                "hashes differ ({} -> {}) but no step describes the change",
                from.schema_hash, to.schema_hash
            ),
        ));
    }

    steps.sort_by(Step::plan_order);
    log::debug!(
        "diff: {} step(s) between {} and {}",
        steps.len(),
        from.schema_hash,
        to.schema_hash
    );
    Ok(steps)
}

fn diff_models(old: &[Model], new: &[Model], steps: &mut Vec<Step>) -> PlanResult<()> {
    let old_models: BTreeMap<&str, &Model> = old.iter().map(|m| (m.name.as_str(), m)).collect();
    let new_models: BTreeMap<&str, &Model> = new.iter().map(|m| (m.name.as_str(), m)).collect();

    for (name, new_model) in &new_models {
        if !old_models.contains_key(name) {
            let payload = StepPayload::Model((*new_model).clone());
            steps.push(Step::new(StepKind::AddModel, *name).with_payload(payload));
        }
    }

    for (name, old_model) in &old_models {
        match new_models.get(name) {
            None => steps.push(Step::new(StepKind::DropModel, *name)),
            Some(new_model) => {
                diff_fields(name, &old_model.fields, &new_model.fields, steps)?;
                diff_indexes(name, &old_model.indexes, &new_model.indexes, steps);
            }
        }
    }

    Ok(())
}

fn diff_fields(model: &str, old: &[Field], new: &[Field], steps: &mut Vec<Step>) -> PlanResult<()> {
    let old_fields: BTreeMap<&str, &Field> = old.iter().map(|f| (f.name.as_str(), f)).collect();
    let new_fields: BTreeMap<&str, &Field> = new.iter().map(|f| (f.name.as_str(), f)).collect();

    for (name, new_field) in &new_fields {
        if !old_fields.contains_key(name) {
            steps.push(
                Step::new(StepKind::AddField, target_path(model, name))
                    .with_payload(StepPayload::Field((*new_field).clone())),
            );
        }
    }

    for (name, old_field) in &old_fields {
        let target = target_path(model, name);
        let Some(new_field) = new_fields.get(name) else {
            steps.push(Step::new(StepKind::DropField, target));
            continue;
        };

        if old_field.field_type != new_field.field_type {
            return Err(PlanError::unsupported(
                target,
                format!("type change {} -> {}", old_field.field_type, new_field.field_type),
            ));
        }
        if old_field.is_list != new_field.is_list {
            return Err(PlanError::unsupported(
                target,
                format!("list cardinality change {} -> {}", old_field.is_list, new_field.is_list),
            ));
        }

        match (old_field.nullable, new_field.nullable) {
            (true, false) => steps.push(Step::new(StepKind::SetNotNull, target.clone())),
            (false, true) => steps.push(Step::new(StepKind::SetNullable, target.clone())),
            _ => {}
        }

        let has_default = transition(old_field.has_default, new_field.has_default);
        let is_unique = transition(old_field.is_unique, new_field.is_unique);
        if has_default.is_some() || is_unique.is_some() {
            steps.push(
                Step::new(StepKind::AlterField, target)
                    .with_payload(StepPayload::AlterField { has_default, is_unique }),
            );
        }
    }

    Ok(())
}

fn transition(from: bool, to: bool) -> Option<Transition<bool>> {
    (from != to).then_some(Transition { from, to })
}

fn diff_indexes(model: &str, old: &[IndexDef], new: &[IndexDef], steps: &mut Vec<Step>) {
    let old_indexes: BTreeMap<&str, &IndexDef> = old.iter().map(|i| (i.name.as_str(), i)).collect();
    let new_indexes: BTreeMap<&str, &IndexDef> = new.iter().map(|i| (i.name.as_str(), i)).collect();

    for (name, new_index) in &new_indexes {
        match old_indexes.get(name) {
            None => steps.push(add_index(model, new_index)),
            // Redefined under the same name: rebuild it.
            Some(old_index) if old_index != new_index => {
                steps.push(drop_index(model, old_index));
                steps.push(add_index(model, new_index));
            }
            _ => {}
        }
    }

    for (name, old_index) in &old_indexes {
        if !new_indexes.contains_key(name) {
            steps.push(drop_index(model, old_index));
        }
    }
}

fn add_index(model: &str, index: &IndexDef) -> Step {
    Step::new(StepKind::AddIndex, target_path(model, &index.name))
        .with_payload(index_payload(index))
}

fn drop_index(model: &str, index: &IndexDef) -> Step {
    Step::new(StepKind::DropIndex, target_path(model, &index.name))
        .with_payload(index_payload(index))
}

fn index_payload(index: &IndexDef) -> StepPayload {
    StepPayload::Index {
        fields: index.fields.clone(),
        unique: index.unique,
    }
}

fn diff_enums(old: &[EnumDef], new: &[EnumDef], steps: &mut Vec<Step>) -> PlanResult<()> {
    let old_enums: BTreeMap<&str, &EnumDef> = old.iter().map(|e| (e.name.as_str(), e)).collect();
    let new_enums: BTreeMap<&str, &EnumDef> = new.iter().map(|e| (e.name.as_str(), e)).collect();

    for (name, new_enum) in &new_enums {
        if !old_enums.contains_key(name) {
            steps.push(Step::new(StepKind::AddEnum, *name).with_payload(StepPayload::Enum {
                values: new_enum.values.clone(),
            }));
        }
    }

    for (name, old_enum) in &old_enums {
        match new_enums.get(name) {
            None => steps.push(Step::new(StepKind::DropEnum, *name)),
            Some(new_enum) => diff_enum_values(name, &old_enum.values, &new_enum.values, steps)?,
        }
    }

    Ok(())
}

fn diff_enum_values(
    name: &str,
    old: &[String],
    new: &[String],
    steps: &mut Vec<Step>,
) -> PlanResult<()> {
    let old_values: BTreeSet<&str> = old.iter().map(String::as_str).collect();
    let new_values: BTreeSet<&str> = new.iter().map(String::as_str).collect();

    // Values kept on both sides must keep their relative order.
    let kept_before: Vec<&str> = old
        .iter()
        .map(String::as_str)
        .filter(|v| new_values.contains(v))
        .collect();
    let kept_after: Vec<&str> = new
        .iter()
        .map(String::as_str)
        .filter(|v| old_values.contains(v))
        .collect();
    if kept_before != kept_after {
        return Err(PlanError::unsupported(
            name,
            format!(
                "existing values reordered ({} -> {})",
                kept_before.join(","),
                kept_after.join(",")
            ),
        ));
    }

    for value in new {
        if !old_values.contains(value.as_str()) {
            steps.push(Step::new(StepKind::AddEnumValue, target_path(name, value)));
        }
    }
    for value in old {
        if !new_values.contains(value.as_str()) {
            steps.push(Step::new(StepKind::DropEnumValue, target_path(name, value)));
        }
    }

    Ok(())
}
