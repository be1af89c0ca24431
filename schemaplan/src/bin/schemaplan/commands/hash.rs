use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::commands::load_ref;
use crate::examples::ExampleGroup;
use crate::output::OutputManager;

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Drift Detection",
    commands: &[
        "schemaplan hash schema.json",
        "test \"$(schemaplan hash schema.json)\" = \"$(cat deployed.hash)\"",
    ],
}];

#[derive(Args)]
pub struct HashArgs {
    /// Schema or snapshot file to hash
    #[arg(value_name = "SCHEMA_REF")]
    pub schema: PathBuf,
}

pub fn handle_hash(args: HashArgs, output: &OutputManager) -> Result<()> {
    let snapshot = load_ref(&args.schema)?;
    output.raw(&snapshot.schema_hash);
    Ok(())
}
