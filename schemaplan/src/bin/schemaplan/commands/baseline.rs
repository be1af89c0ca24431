use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use schemaplan::{Baseline, BaselineStore, DriftStatus, FileBaselineStore, check_drift};

use crate::commands::load_ref;
use crate::context::ProjectContext;
use crate::examples::ExampleGroup;
use crate::output::OutputManager;
use crate::utils::{format_datetime, parse_expected_hash};

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Inspect",
        commands: &[
            "schemaplan baseline show                    # Print the last applied hash",
            "schemaplan baseline status schema.json      # Exit 1 if schema drifted",
        ],
    },
    ExampleGroup {
        title: "Record an Applied Plan",
        commands: &[
            "schemaplan baseline accept schema.json --expect none",
            "schemaplan baseline accept schema.json --expect sha256:9f86d0...",
        ],
    },
];

#[derive(Subcommand)]
pub enum BaselineCommands {
    /// Print the stored baseline hash
    #[command(name = "show")]
    Show,

    /// Compare a schema against the stored baseline
    #[command(name = "status")]
    Status {
        /// Schema or snapshot file to compare
        #[arg(value_name = "SCHEMA_REF")]
        schema: PathBuf,
    },

    /// Record a schema as applied (compare-and-swap on the stored hash)
    #[command(name = "accept")]
    Accept {
        /// Schema or snapshot file the executor just applied
        #[arg(value_name = "SCHEMA_REF")]
        schema: PathBuf,

        /// Hash the baseline must currently hold, or "none" for a first baseline
        #[arg(long, value_name = "HASH")]
        expect: String,
    },
}

pub fn handle_baseline_commands(
    command: BaselineCommands,
    ctx: &ProjectContext,
    output: &OutputManager,
) -> Result<()> {
    let mut store = FileBaselineStore::new(ctx.baseline_path());
    output.verbose(&format!("baseline file: {}", store.path().display()));

    match command {
        BaselineCommands::Show => handle_show(&store, output),
        BaselineCommands::Status { schema } => handle_status(&store, &schema, output),
        BaselineCommands::Accept { schema, expect } => {
            handle_accept(&mut store, &schema, &expect, output)
        }
    }
}

fn handle_show(store: &FileBaselineStore, output: &OutputManager) -> Result<()> {
    match store.load().context("Failed to read baseline")? {
        Some(baseline) => {
            output.raw(&baseline.schema_hash);
            output.key_value("applied at", &format_datetime(baseline.applied_at));
        }
        None => output.warning("No baseline recorded yet"),
    }
    Ok(())
}

fn handle_status(store: &FileBaselineStore, schema: &Path, output: &OutputManager) -> Result<()> {
    let snapshot = load_ref(schema)?;

    match check_drift(store, &snapshot).context("Failed to read baseline")? {
        DriftStatus::NoBaseline => {
            output.warning("No baseline recorded yet");
            output.info(&format!("Current schema: {}", snapshot.schema_hash));
        }
        DriftStatus::InSync => {
            output.success(&format!("In sync with baseline {}", snapshot.schema_hash));
        }
        DriftStatus::Drifted { baseline, current } => {
            output.key_value("baseline", &baseline);
            output.key_value("current", &current);
            anyhow::bail!("Schema has drifted from the applied baseline");
        }
    }
    Ok(())
}

fn handle_accept(
    store: &mut FileBaselineStore,
    schema: &Path,
    expect: &str,
    output: &OutputManager,
) -> Result<()> {
    let snapshot = load_ref(schema)?;
    let expected = parse_expected_hash(expect);

    store
        .compare_and_swap(expected, Baseline::new(snapshot.schema_hash.clone()))
        .context("Failed to update baseline")?;

    output.success(&format!("Baseline set to {}", snapshot.schema_hash));
    Ok(())
}
