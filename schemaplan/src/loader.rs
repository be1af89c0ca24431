//! Snapshot-ref loading utilities.
//!
//! A ref is a JSON document holding either a bare schema
//! (`{"models": [...], "enums": [...]}`) or a snapshot previously written by
//! [`write_snapshot`]. Snapshot documents are re-hashed on load.

use std::path::Path;

use serde_json::Value;

use crate::errors::{PlanError, PlanResult};
use crate::schema::SchemaModel;
use crate::snapshot::{Snapshot, make_snapshot};

/// Load a schema or snapshot file and return a verified snapshot.
pub fn load_snapshot(path: &Path) -> PlanResult<Snapshot> {
    let content = std::fs::read_to_string(path)?;
    log::debug!("loading schema ref {}", path.display());
    parse_snapshot(&content)
}

/// Parse a schema or snapshot document.
pub fn parse_snapshot(content: &str) -> PlanResult<Snapshot> {
    let value: Value = serde_json::from_str(content)?;

    if value.get("schemaHash").is_some() {
        let snapshot: Snapshot = serde_json::from_value(value)?;
        snapshot.verify()?;
        return Ok(snapshot);
    }

    let schema: SchemaModel = serde_json::from_value(value)?;
    make_snapshot(schema)
}

/// Write a snapshot document, pretty-printed.
pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> PlanResult<()> {
    let write_error = |source| PlanError::Write {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }
    let json = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(path, json).map_err(write_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER_SCHEMA: &str = r#"{
        "models": [
            {"name": "User", "fields": [
                {"name": "id", "type": "String"},
                {"name": "email", "type": "String", "isUnique": true}
            ]}
        ]
    }"#;

    #[test]
    fn test_parse_bare_schema() {
        let snapshot = parse_snapshot(USER_SCHEMA).unwrap();
        assert_eq!(snapshot.models.len(), 1);
        // Canonical order puts email before id.
        assert_eq!(snapshot.models[0].fields[0].name, "email");
    }

    #[test]
    fn test_snapshot_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("user.snapshot.json");

        let snapshot = parse_snapshot(USER_SCHEMA).unwrap();
        write_snapshot(&path, &snapshot).unwrap();

        let loaded = load_snapshot(&path).unwrap();
        assert!(loaded.same_schema(&snapshot));
        assert_eq!(loaded.created_at, snapshot.created_at);
    }

    #[test]
    fn test_tampered_snapshot_is_rejected() {
        let snapshot = parse_snapshot(USER_SCHEMA).unwrap();
        let mut value = serde_json::to_value(&snapshot).unwrap();
        value["models"][0]["fields"][0]["nullable"] = Value::Bool(true);

        let result = parse_snapshot(&value.to_string());
        assert!(matches!(result, Err(PlanError::MalformedSchema { .. })));
    }

    #[test]
    fn test_invalid_json_is_reported() {
        assert!(matches!(parse_snapshot("{not json"), Err(PlanError::Json(_))));
    }

    #[test]
    fn test_unwritable_destination_is_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("snapshots");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let snapshot = parse_snapshot(USER_SCHEMA).unwrap();
        let result = write_snapshot(&blocker.join("v1.json"), &snapshot);
        match result {
            Err(err @ PlanError::Write { .. }) => assert!(!err.is_input_error()),
            other => panic!("expected write error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_snapshot(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(PlanError::Io(_))));
    }
}
