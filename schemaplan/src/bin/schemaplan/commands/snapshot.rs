use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use schemaplan::write_snapshot;

use crate::commands::load_ref;
use crate::examples::ExampleGroup;
use crate::output::OutputManager;

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Freeze a Schema",
    commands: &[
        "schemaplan snapshot schema.json                          # print snapshot JSON",
        "schemaplan snapshot schema.json --out snapshots/v3.json  # write snapshot file",
    ],
}];

#[derive(Args)]
pub struct SnapshotArgs {
    /// Schema or snapshot file to freeze
    #[arg(value_name = "SCHEMA_REF")]
    pub schema: PathBuf,

    /// Write the snapshot here instead of stdout
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}

pub fn handle_snapshot(args: SnapshotArgs, output: &OutputManager) -> Result<()> {
    let snapshot = load_ref(&args.schema)?;

    match args.out {
        Some(path) => {
            write_snapshot(&path, &snapshot)
                .with_context(|| format!("Failed to write snapshot: {}", path.display()))?;
            output.success(&format!("Wrote {} ({})", path.display(), snapshot.schema_hash));
        }
        None => output.raw(&serde_json::to_string_pretty(&snapshot)?),
    }

    Ok(())
}
