pub mod baseline;
pub mod hash;
pub mod plan;
pub mod snapshot;

use std::path::Path;

use anyhow::{Context, Result};
use schemaplan::{Snapshot, load_snapshot};

/// Load a schema or snapshot ref, naming the file on failure.
pub fn load_ref(path: &Path) -> Result<Snapshot> {
    load_snapshot(path).with_context(|| format!("Failed to load schema ref: {}", path.display()))
}
